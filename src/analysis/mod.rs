use petgraph::visit::EdgeRef;

use crate::domain::model::{ClassCounts, ClassifiedEdge, EdgeClass};
use crate::geo::{densify, PointGrid};
use crate::osm::graph::PathGraph;

/// Tuning for the map-matching pass.
#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    /// Spacing of samples taken along each edge, metres.
    pub sample_spacing_m: f64,
    /// A sample counts as covered when a point lies within this radius.
    pub match_radius_m: f64,
    /// Fraction of samples that must be covered by RoW points for the edge
    /// to count as a recorded right of way.
    pub row_coverage: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            sample_spacing_m: 10.0,
            match_radius_m: 20.0,
            row_coverage: 0.5,
        }
    }
}

/// Decide the class of one edge, if it is worth keeping at all. Edges that
/// are neither recorded rights of way nor publicly walked carry no signal.
pub fn classify(activity_pct: f64, is_row: bool) -> Option<EdgeClass> {
    let active = activity_pct > 0.0;
    match (active, is_row) {
        (true, true) => Some(EdgeClass::Both),
        (true, false) => Some(EdgeClass::PublicOnly),
        (false, true) => Some(EdgeClass::RowOnly),
        (false, false) => None,
    }
}

/// Walk every edge of the way network, sample its geometry, and compare the
/// samples against the RoW and public point indexes.
///
/// `activity` is the percentage of edge samples with a public trace point
/// within the match radius, always in 0..=100.
pub fn match_edges(
    graph: &PathGraph,
    row_grid: &PointGrid,
    public_grid: &PointGrid,
    params: &MatchParams,
) -> (Vec<ClassifiedEdge>, ClassCounts) {
    let mut edges = Vec::new();
    let mut counts = ClassCounts::default();

    for edge in graph.edge_references() {
        let data = edge.weight();
        if data.geometry.is_empty() {
            continue;
        }

        let samples = densify(&data.geometry, params.sample_spacing_m);
        let total = samples.len() as f64;

        let mut public_hits = 0usize;
        let mut row_hits = 0usize;
        for &sample in &samples {
            if public_grid.has_within(sample) {
                public_hits += 1;
            }
            if row_grid.has_within(sample) {
                row_hits += 1;
            }
        }

        let activity = public_hits as f64 / total * 100.0;
        let is_row = row_hits as f64 / total >= params.row_coverage;

        if let Some(class) = classify(activity, is_row) {
            counts.record(class);
            edges.push(ClassifiedEdge {
                way_id: data.way_id,
                from_node: graph[edge.source()].id,
                to_node: graph[edge.target()].id,
                highway: data.highway.clone(),
                class,
                activity,
                geometry: data.geometry.clone(),
            });
        }
    }

    (edges, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{GraphChunk, OsmNode, OsmWay};
    use crate::geo::Point;
    use crate::osm::graph::build_graph;

    fn straight_way(id: u64, lat0: f64, lat1: f64, lon: f64) -> OsmWay {
        OsmWay {
            id,
            highway: "footway".to_string(),
            nodes: vec![
                OsmNode {
                    id: id * 10,
                    lat: lat0,
                    lon,
                },
                OsmNode {
                    id: id * 10 + 1,
                    lat: lat1,
                    lon,
                },
            ],
        }
    }

    fn points_along(lat0: f64, lat1: f64, lon: f64, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(lat0 + (lat1 - lat0) * i as f64 / (n - 1) as f64, lon))
            .collect()
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(classify(50.0, true), Some(EdgeClass::Both));
        assert_eq!(classify(50.0, false), Some(EdgeClass::PublicOnly));
        assert_eq!(classify(0.0, true), Some(EdgeClass::RowOnly));
        assert_eq!(classify(0.0, false), None);
    }

    #[test]
    fn test_walked_row_edge_is_both() {
        let way = straight_way(1, 51.0, 51.001, -1.0);
        let graph = build_graph(&[GraphChunk {
            index: 0,
            ways: vec![way],
        }]);

        let covering = points_along(51.0, 51.001, -1.0, 20);
        let row_grid = PointGrid::build(&covering, 20.0);
        let public_grid = PointGrid::build(&covering, 20.0);

        let (edges, counts) = match_edges(&graph, &row_grid, &public_grid, &MatchParams::default());

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].class, EdgeClass::Both);
        assert!(edges[0].activity > 99.0);
        assert_eq!(counts.both, 1);
    }

    #[test]
    fn test_walked_unrecorded_edge_is_public_only() {
        let way = straight_way(1, 51.0, 51.001, -1.0);
        let graph = build_graph(&[GraphChunk {
            index: 0,
            ways: vec![way],
        }]);

        let walkers = points_along(51.0, 51.001, -1.0, 20);
        let row_grid = PointGrid::build(&[], 20.0);
        let public_grid = PointGrid::build(&walkers, 20.0);

        let (edges, counts) = match_edges(&graph, &row_grid, &public_grid, &MatchParams::default());

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].class, EdgeClass::PublicOnly);
        assert_eq!(counts.public_only, 1);
    }

    #[test]
    fn test_unwalked_row_edge_is_row_only() {
        let way = straight_way(1, 51.0, 51.001, -1.0);
        let graph = build_graph(&[GraphChunk {
            index: 0,
            ways: vec![way],
        }]);

        let row_points = points_along(51.0, 51.001, -1.0, 20);
        let row_grid = PointGrid::build(&row_points, 20.0);
        let public_grid = PointGrid::build(&[], 20.0);

        let (edges, counts) = match_edges(&graph, &row_grid, &public_grid, &MatchParams::default());

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].class, EdgeClass::RowOnly);
        assert_eq!(edges[0].activity, 0.0);
        assert_eq!(counts.row_only, 1);
    }

    #[test]
    fn test_untouched_edge_is_dropped() {
        let way = straight_way(1, 51.0, 51.001, -1.0);
        let graph = build_graph(&[GraphChunk {
            index: 0,
            ways: vec![way],
        }]);

        let far_away = vec![Point::new(52.0, -2.0)];
        let row_grid = PointGrid::build(&far_away, 20.0);
        let public_grid = PointGrid::build(&far_away, 20.0);

        let (edges, counts) = match_edges(&graph, &row_grid, &public_grid, &MatchParams::default());

        assert!(edges.is_empty());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_partial_row_coverage_below_threshold() {
        // RoW points only cover the first quarter of the edge, below the
        // default 0.5 coverage, so the edge should not count as RoW
        let way = straight_way(1, 51.0, 51.002, -1.0);
        let graph = build_graph(&[GraphChunk {
            index: 0,
            ways: vec![way],
        }]);

        let row_points = points_along(51.0, 51.0005, -1.0, 10);
        let walkers = points_along(51.0, 51.002, -1.0, 40);
        let row_grid = PointGrid::build(&row_points, 20.0);
        let public_grid = PointGrid::build(&walkers, 20.0);

        let (edges, _) = match_edges(&graph, &row_grid, &public_grid, &MatchParams::default());

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].class, EdgeClass::PublicOnly);
    }

    #[test]
    fn test_activity_bounds() {
        let way = straight_way(1, 51.0, 51.001, -1.0);
        let graph = build_graph(&[GraphChunk {
            index: 0,
            ways: vec![way],
        }]);

        let half = points_along(51.0, 51.0005, -1.0, 10);
        let row_grid = PointGrid::build(&points_along(51.0, 51.001, -1.0, 20), 20.0);
        let public_grid = PointGrid::build(&half, 20.0);

        let (edges, _) = match_edges(&graph, &row_grid, &public_grid, &MatchParams::default());
        assert_eq!(edges.len(), 1);
        assert!(edges[0].activity > 0.0 && edges[0].activity < 100.0);
    }
}
