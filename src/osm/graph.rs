use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::domain::model::{GraphChunk, OsmNode};
use crate::geo::Point;

/// Per-edge payload of the way network: which way the segment came from and
/// its geometry as drawn on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub way_id: u64,
    pub highway: String,
    pub geometry: Vec<Point>,
}

/// Undirected way network. Nodes are OSM nodes (intersections and geometry
/// vertices, ways are not simplified), edges are consecutive node pairs.
pub type PathGraph = UnGraph<OsmNode, EdgeData>;

/// Assemble the graph from downloaded chunks. Nodes shared between chunks
/// are merged by OSM id, so ways crossing a chunk boundary stay connected.
pub fn build_graph(chunks: &[GraphChunk]) -> PathGraph {
    let mut graph = PathGraph::new_undirected();
    let mut index_by_id: HashMap<u64, NodeIndex> = HashMap::new();

    for chunk in chunks {
        for way in &chunk.ways {
            for pair in way.nodes.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let ia = *index_by_id
                    .entry(a.id)
                    .or_insert_with(|| graph.add_node(a));
                let ib = *index_by_id
                    .entry(b.id)
                    .or_insert_with(|| graph.add_node(b));

                // the same segment can appear in overlapping chunks
                let duplicate = graph
                    .edges_connecting(ia, ib)
                    .any(|e| e.weight().way_id == way.id);
                if duplicate {
                    continue;
                }

                graph.add_edge(
                    ia,
                    ib,
                    EdgeData {
                        way_id: way.id,
                        highway: way.highway.clone(),
                        geometry: vec![a.point(), b.point()],
                    },
                );
            }
        }
    }

    graph
}
