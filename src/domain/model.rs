use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::geo::Point;

/// One sample from a GPS track, flattened for the CSV point cache.
/// Column names mirror the upstream trace dumps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub trackid: u64,
}

impl TracePoint {
    pub fn new(latitude: f64, longitude: f64, trackid: u64) -> Self {
        Self {
            latitude,
            longitude,
            trackid,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.latitude, self.longitude)
    }
}

/// A node of the OSM way network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OsmNode {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
}

impl OsmNode {
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// An OSM way restricted to the path-like highway classes, with inline
/// node geometry as returned by `out geom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmWay {
    pub id: u64,
    pub highway: String,
    pub nodes: Vec<OsmNode>,
}

/// The way network downloaded for one analysis chunk. Cached to disk as
/// JSON so a re-run skips the Overpass round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphChunk {
    pub index: usize,
    pub ways: Vec<OsmWay>,
}

/// Identity of one authority run: the rowmaps authority, its dataset code
/// and the public-trace region that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityJob {
    pub authority: String,
    pub code: String,
    pub region: String,
}

/// Everything the extract stage gathers for one authority.
#[derive(Debug, Clone)]
pub struct SurveyData {
    pub authority_code: String,
    pub row_points: Vec<TracePoint>,
    pub public_points: Vec<TracePoint>,
    pub chunks: Vec<GraphChunk>,
}

/// Edge classification from comparing public activity against the official
/// rights-of-way network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeClass {
    /// Public activity on a recorded right of way.
    Both,
    /// Public activity on a path that is not a recorded right of way; the
    /// candidates this analysis exists to find.
    PublicOnly,
    /// A recorded right of way with no observed public activity.
    RowOnly,
}

impl EdgeClass {
    pub fn letter(&self) -> &'static str {
        match self {
            EdgeClass::Both => "B",
            EdgeClass::PublicOnly => "P",
            EdgeClass::RowOnly => "R",
        }
    }
}

/// A way-network edge that survived classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEdge {
    pub way_id: u64,
    pub from_node: u64,
    pub to_node: u64,
    pub highway: String,
    pub class: EdgeClass,
    /// Share of edge samples with a nearby public trace point, 0-100.
    pub activity: f64,
    pub geometry: Vec<Point>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub both: usize,
    pub public_only: usize,
    pub row_only: usize,
}

impl ClassCounts {
    pub fn total(&self) -> usize {
        self.both + self.public_only + self.row_only
    }

    pub fn record(&mut self, class: EdgeClass) {
        match class {
            EdgeClass::Both => self.both += 1,
            EdgeClass::PublicOnly => self.public_only += 1,
            EdgeClass::RowOnly => self.row_only += 1,
        }
    }
}

/// Output of the transform stage for one authority.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub authority_code: String,
    pub edges: Vec<ClassifiedEdge>,
    pub counts: ClassCounts,
}

/// Result of one authority run inside a batch.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub authority: String,
    pub code: String,
    pub region: String,
    pub counts: ClassCounts,
    pub duration: Duration,
    pub output_path: String,
    pub skipped: bool,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_counts_record() {
        let mut counts = ClassCounts::default();
        counts.record(EdgeClass::Both);
        counts.record(EdgeClass::PublicOnly);
        counts.record(EdgeClass::PublicOnly);
        counts.record(EdgeClass::RowOnly);

        assert_eq!(counts.both, 1);
        assert_eq!(counts.public_only, 2);
        assert_eq!(counts.row_only, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_edge_class_letters() {
        assert_eq!(EdgeClass::Both.letter(), "B");
        assert_eq!(EdgeClass::PublicOnly.letter(), "P");
        assert_eq!(EdgeClass::RowOnly.letter(), "R");
    }
}
