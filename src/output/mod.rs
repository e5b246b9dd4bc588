use serde_json::{json, Value};

use crate::domain::model::{ClassifiedEdge, EdgeClass};
use crate::utils::error::Result;

/// Relative output files for one authority, under `<output_dir>/<code>/`.
pub fn output_files(code: &str) -> [String; 4] {
    [
        format!("{}/B.geojson", code),
        format!("{}/P.geojson", code),
        format!("{}/R.geojson", code),
        format!("{}/edges.csv", code),
    ]
}

/// Build a GeoJSON FeatureCollection for the edges of one class. Each edge
/// becomes a LineString carrying its way id, highway tag and activity level.
pub fn feature_collection(edges: &[ClassifiedEdge], class: EdgeClass) -> Value {
    let features: Vec<Value> = edges
        .iter()
        .filter(|e| e.class == class)
        .map(|e| {
            let coords: Vec<Value> = e
                .geometry
                .iter()
                .map(|p| json!([p.lon, p.lat]))
                .collect();
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": coords,
                },
                "properties": {
                    "way_id": e.way_id,
                    "from_node": e.from_node,
                    "to_node": e.to_node,
                    "highway": e.highway,
                    "class": e.class.letter(),
                    "activity": e.activity,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Flat CSV summary of every retained edge, one row per edge.
pub fn edges_csv(edges: &[ClassifiedEdge]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["way_id", "from_node", "to_node", "highway", "class", "activity"])?;

    for e in edges {
        writer.write_record([
            e.way_id.to_string(),
            e.from_node.to_string(),
            e.to_node.to_string(),
            e.highway.clone(),
            e.class.letter().to_string(),
            format!("{:.1}", e.activity),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
