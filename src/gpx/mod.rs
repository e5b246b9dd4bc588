use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::domain::model::TracePoint;
use crate::geo::Point;
use crate::utils::error::{ProwError, Result};

/// One `<trk>` or `<rte>` element as an ordered point list. Track segments
/// are concatenated; rowmaps serves the RoW network as routes, the public
/// dumps as tracks, and downstream code treats both the same.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub points: Vec<Point>,
}

/// Parse GPX 1.0/1.1 bytes into tracks. Unknown elements are skipped;
/// malformed XML or a point without coordinates is an error.
pub fn parse_gpx(bytes: &[u8]) -> Result<Vec<Track>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut tracks = Vec::new();
    let mut current: Option<Track> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"trk" | b"rte" => {
                    current = Some(Track { points: Vec::new() });
                }
                b"trkpt" | b"rtept" => {
                    if let Some(track) = current.as_mut() {
                        track.points.push(parse_point(&e)?);
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if matches!(e.name().as_ref(), b"trkpt" | b"rtept") {
                    if let Some(track) = current.as_mut() {
                        track.points.push(parse_point(&e)?);
                    }
                }
            }
            Event::End(e) => {
                if matches!(e.name().as_ref(), b"trk" | b"rte") {
                    if let Some(track) = current.take() {
                        tracks.push(track);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tracks)
}

fn parse_point(e: &BytesStart) -> Result<Point> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| ProwError::GpxError {
            message: format!("bad attribute on track point: {}", err),
        })?;
        let value = attr.unescape_value().map_err(|err| ProwError::GpxError {
            message: format!("bad attribute value on track point: {}", err),
        })?;
        match attr.key.as_ref() {
            b"lat" => lat = Some(parse_coord("lat", &value)?),
            b"lon" => lon = Some(parse_coord("lon", &value)?),
            _ => {}
        }
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Point::new(lat, lon)),
        _ => Err(ProwError::GpxError {
            message: "track point is missing lat or lon".to_string(),
        }),
    }
}

fn parse_coord(name: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| ProwError::GpxError {
        message: format!("invalid {} value '{}'", name, raw),
    })
}

/// Flatten tracks into trace points with sequential track ids starting at
/// `base_track_id`. Points at (0, 0) are GPS dropouts and are discarded.
pub fn tracks_to_points(tracks: &[Track], base_track_id: u64) -> Vec<TracePoint> {
    let mut out = Vec::new();
    for (i, track) in tracks.iter().enumerate() {
        let trackid = base_track_id + i as u64;
        for p in &track.points {
            if p.lat == 0.0 && p.lon == 0.0 {
                continue;
            }
            out.push(TracePoint::new(p.lat, p.lon, trackid));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>morning walk</name>
    <trkseg>
      <trkpt lat="51.5000" lon="-1.2000"><ele>120</ele></trkpt>
      <trkpt lat="51.5010" lon="-1.2010"/>
    </trkseg>
    <trkseg>
      <trkpt lat="51.5020" lon="-1.2020"/>
    </trkseg>
  </trk>
  <trk>
    <trkseg>
      <trkpt lat="52.0000" lon="-1.5000"/>
    </trkseg>
  </trk>
</gpx>"#;

    const ROUTE_GPX: &str = r#"<?xml version="1.0"?>
<gpx version="1.0">
  <rte>
    <rtept lat="51.1" lon="-2.1"/>
    <rtept lat="51.2" lon="-2.2"/>
  </rte>
</gpx>"#;

    #[test]
    fn test_parse_tracks_with_segments() {
        let tracks = parse_gpx(TRACK_GPX.as_bytes()).unwrap();
        assert_eq!(tracks.len(), 2);
        // segments of the same trk are concatenated
        assert_eq!(tracks[0].points.len(), 3);
        assert_eq!(tracks[0].points[0], Point::new(51.5, -1.2));
        assert_eq!(tracks[1].points.len(), 1);
    }

    #[test]
    fn test_parse_routes() {
        let tracks = parse_gpx(ROUTE_GPX.as_bytes()).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].points, vec![Point::new(51.1, -2.1), Point::new(51.2, -2.2)]);
    }

    #[test]
    fn test_parse_empty_gpx() {
        let tracks = parse_gpx(br#"<gpx version="1.1"></gpx>"#).unwrap();
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_parse_point_missing_lon_is_error() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="51.0"/></trkseg></trk></gpx>"#;
        assert!(parse_gpx(gpx.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_invalid_coordinate_is_error() {
        let gpx = r#"<gpx><trk><trkseg><trkpt lat="abc" lon="-1.0"/></trkseg></trk></gpx>"#;
        assert!(parse_gpx(gpx.as_bytes()).is_err());
    }

    #[test]
    fn test_tracks_to_points_assigns_ids_and_drops_null_island() {
        let tracks = vec![
            Track {
                points: vec![Point::new(51.0, -1.0), Point::new(0.0, 0.0)],
            },
            Track {
                points: vec![Point::new(52.0, -2.0)],
            },
        ];

        let points = tracks_to_points(&tracks, 100);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], TracePoint::new(51.0, -1.0, 100));
        assert_eq!(points[1], TracePoint::new(52.0, -2.0, 101));
    }
}
