pub mod grid;

use serde::{Deserialize, Serialize};

pub use grid::PointGrid;

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance between two points in metres.
pub fn haversine_m(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

pub fn metres_to_deg_lat(m: f64) -> f64 {
    m / EARTH_RADIUS_M * 180.0 / std::f64::consts::PI
}

pub fn metres_to_deg_lon(m: f64, at_lat: f64) -> f64 {
    metres_to_deg_lat(m) / at_lat.to_radians().cos()
}

/// Linear interpolation along a polyline so that consecutive samples are at
/// most `spacing_m` apart. Original vertices are always kept.
pub fn densify(points: &[Point], spacing_m: f64) -> Vec<Point> {
    if points.len() < 2 || spacing_m <= 0.0 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);

        let dist = haversine_m(a, b);
        if dist > spacing_m {
            let steps = (dist / spacing_m).ceil() as usize;
            for i in 1..steps {
                let t = i as f64 / steps as f64;
                out.push(Point::new(
                    a.lat + (b.lat - a.lat) * t,
                    a.lon + (b.lon - a.lon) * t,
                ));
            }
        }
    }
    out.push(points[points.len() - 1]);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn centre(&self) -> Point {
        Point::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Expand every side outwards by `m` metres.
    pub fn buffered(&self, m: f64) -> Self {
        let dlat = metres_to_deg_lat(m);
        let dlon = metres_to_deg_lon(m, self.centre().lat);
        Self {
            south: self.south - dlat,
            west: self.west - dlon,
            north: self.north + dlat,
            east: self.east + dlon,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }

    /// Cut into square chunks of roughly `chunk_len_m` per side. Smaller
    /// chunks keep each map download and match pass bounded.
    pub fn split(&self, chunk_len_m: f64) -> Vec<BoundingBox> {
        let dlat = metres_to_deg_lat(chunk_len_m);
        let dlon = metres_to_deg_lon(chunk_len_m, self.centre().lat);

        let rows = (((self.north - self.south) / dlat).ceil() as usize).max(1);
        let cols = (((self.east - self.west) / dlon).ceil() as usize).max(1);

        let mut chunks = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let south = self.south + r as f64 * dlat;
                let west = self.west + c as f64 * dlon;
                chunks.push(BoundingBox::new(
                    south,
                    west,
                    (south + dlat).min(self.north),
                    (west + dlon).min(self.east),
                ));
            }
        }
        chunks
    }
}
