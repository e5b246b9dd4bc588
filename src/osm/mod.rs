pub mod authorities;
pub mod graph;

use reqwest::Client;
use serde::Deserialize;

use crate::domain::model::{OsmNode, OsmWay};
use crate::geo::BoundingBox;
use crate::utils::error::{ProwError, Result};

/// Highway classes included in the way network. Matches what walkers and
/// riders actually use; roads are out of scope.
pub const PATH_HIGHWAY_FILTER: &str = "footway|cycleway|bridleway|path|track";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: u64,
    #[serde(default)]
    nodes: Vec<u64>,
    #[serde(default)]
    geometry: Vec<OverpassCoord>,
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCoord {
    lat: f64,
    lon: f64,
}

/// Client for an Overpass-style API serving the OSM way network.
pub struct OverpassClient {
    client: Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn chunk_query(bbox: &BoundingBox) -> String {
        format!(
            "[out:json][timeout:90];way[\"highway\"~\"{}\"]({},{},{},{});out geom;",
            PATH_HIGHWAY_FILTER, bbox.south, bbox.west, bbox.north, bbox.east
        )
    }

    /// Download all path-class ways inside a chunk. An empty chunk is a
    /// normal outcome, not an error.
    pub async fn fetch_ways(&self, bbox: &BoundingBox) -> Result<Vec<OsmWay>> {
        let query = Self::chunk_query(bbox);
        tracing::debug!("Overpass query: {}", query);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProwError::OverpassError {
                message: format!("server returned {}", response.status()),
            });
        }

        let body: OverpassResponse = response.json().await?;
        let mut ways = Vec::new();

        for element in body.elements {
            if element.element_type != "way" {
                continue;
            }
            if element.nodes.len() != element.geometry.len() {
                return Err(ProwError::OverpassError {
                    message: format!(
                        "way {} has {} node refs but {} coordinates",
                        element.id,
                        element.nodes.len(),
                        element.geometry.len()
                    ),
                });
            }

            let highway = element
                .tags
                .get("highway")
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());

            let nodes = element
                .nodes
                .iter()
                .zip(&element.geometry)
                .map(|(&id, coord)| OsmNode {
                    id,
                    lat: coord.lat,
                    lon: coord.lon,
                })
                .collect();

            ways.push(OsmWay {
                id: element.id,
                highway,
                nodes,
            });
        }

        Ok(ways)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    boundingbox: Vec<String>,
}

/// Client for a Nominatim-style geocoder, used to resolve an authority name
/// to its bounding box.
pub struct Geocoder {
    client: Client,
    endpoint: String,
}

impl Geocoder {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub async fn bounding_box(&self, authority: &str) -> Result<BoundingBox> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", authority), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProwError::GeocodeError {
                query: authority.to_string(),
                reason: format!("server returned {}", response.status()),
            });
        }

        let results: Vec<GeocodeResult> = response.json().await?;
        let first = results.first().ok_or_else(|| ProwError::GeocodeError {
            query: authority.to_string(),
            reason: "no results".to_string(),
        })?;

        // Nominatim order: south, north, west, east, as strings
        if first.boundingbox.len() != 4 {
            return Err(ProwError::GeocodeError {
                query: authority.to_string(),
                reason: format!("bounding box has {} entries", first.boundingbox.len()),
            });
        }

        let mut coords = [0.0f64; 4];
        for (i, raw) in first.boundingbox.iter().enumerate() {
            coords[i] = raw.parse().map_err(|_| ProwError::GeocodeError {
                query: authority.to_string(),
                reason: format!("unparseable bounding box value '{}'", raw),
            })?;
        }

        Ok(BoundingBox::new(coords[0], coords[2], coords[1], coords[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_ways_parses_geometry() {
        let server = MockServer::start();
        let body = serde_json::json!({
            "version": 0.6,
            "elements": [
                {
                    "type": "way",
                    "id": 42,
                    "nodes": [1, 2],
                    "geometry": [
                        {"lat": 51.0, "lon": -1.0},
                        {"lat": 51.001, "lon": -1.001}
                    ],
                    "tags": {"highway": "footway"}
                },
                {"type": "node", "id": 1, "nodes": [], "geometry": [], "tags": {}}
            ]
        });

        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/interpreter");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(body);
        });

        let client = OverpassClient::new(Client::new(), server.url("/api/interpreter"));
        let bbox = BoundingBox::new(51.0, -1.1, 51.1, -1.0);
        let ways = client.fetch_ways(&bbox).await.unwrap();

        mock.assert();
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].id, 42);
        assert_eq!(ways[0].highway, "footway");
        assert_eq!(ways[0].nodes.len(), 2);
        assert_eq!(ways[0].nodes[0].id, 1);
    }

    #[tokio::test]
    async fn test_fetch_ways_mismatched_geometry_is_error() {
        let server = MockServer::start();
        let body = serde_json::json!({
            "elements": [
                {
                    "type": "way",
                    "id": 7,
                    "nodes": [1, 2, 3],
                    "geometry": [{"lat": 51.0, "lon": -1.0}],
                    "tags": {"highway": "path"}
                }
            ]
        });

        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(body);
        });

        let client = OverpassClient::new(Client::new(), server.url("/"));
        let bbox = BoundingBox::new(51.0, -1.1, 51.1, -1.0);
        let err = client.fetch_ways(&bbox).await.unwrap_err();
        assert!(matches!(err, ProwError::OverpassError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_ways_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(429);
        });

        let client = OverpassClient::new(Client::new(), server.url("/"));
        let bbox = BoundingBox::new(51.0, -1.1, 51.1, -1.0);
        assert!(client.fetch_ways(&bbox).await.is_err());
    }

    #[tokio::test]
    async fn test_geocoder_parses_bounding_box() {
        let server = MockServer::start();
        let body = serde_json::json!([
            {"boundingbox": ["50.9", "51.1", "-1.2", "-0.8"], "display_name": "Testshire"}
        ]);

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "Testshire")
                .query_param("format", "json");
            then.status(200).json_body(body);
        });

        let geocoder = Geocoder::new(Client::new(), server.url("/search"));
        let bbox = geocoder.bounding_box("Testshire").await.unwrap();

        mock.assert();
        assert_eq!(bbox, BoundingBox::new(50.9, -1.2, 51.1, -0.8));
    }

    #[tokio::test]
    async fn test_geocoder_no_results_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!([]));
        });

        let geocoder = Geocoder::new(Client::new(), server.url("/search"));
        let err = geocoder.bounding_box("Nowhere").await.unwrap_err();
        assert!(matches!(err, ProwError::GeocodeError { .. }));
    }
}
