use std::collections::HashMap;

use super::{haversine_m, metres_to_deg_lat, metres_to_deg_lon, Point};

/// Uniform hash-grid index over a point cloud. Cells are sized to the query
/// radius so a lookup only has to scan a small neighborhood of cells.
pub struct PointGrid {
    cells: HashMap<(i64, i64), Vec<Point>>,
    cell_deg: f64,
    radius_m: f64,
}

impl PointGrid {
    pub fn build(points: &[Point], radius_m: f64) -> Self {
        // cell side = radius in degrees of latitude; a degree of longitude
        // covers fewer metres, so east-west lookups scan extra cells
        let cell_deg = metres_to_deg_lat(radius_m.max(1.0));
        let mut cells: HashMap<(i64, i64), Vec<Point>> = HashMap::new();

        for &p in points {
            cells.entry(Self::key(p, cell_deg)).or_default().push(p);
        }

        Self {
            cells,
            cell_deg,
            radius_m,
        }
    }

    fn key(p: Point, cell_deg: f64) -> (i64, i64) {
        (
            (p.lat / cell_deg).floor() as i64,
            (p.lon / cell_deg).floor() as i64,
        )
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether any indexed point lies within the query radius of `p`.
    pub fn has_within(&self, p: Point) -> bool {
        let (ci, cj) = Self::key(p, self.cell_deg);
        let lon_cells = ((metres_to_deg_lon(self.radius_m, p.lat) / self.cell_deg).ceil() as i64)
            .max(1);
        for di in -1..=1 {
            for dj in -lon_cells..=lon_cells {
                if let Some(bucket) = self.cells.get(&(ci + di, cj + dj)) {
                    if bucket.iter().any(|&q| haversine_m(p, q) <= self.radius_m) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_finds_nearby_point() {
        let points = vec![Point::new(51.0, -1.0)];
        let grid = PointGrid::build(&points, 20.0);

        // ~11 m north of the indexed point
        assert!(grid.has_within(Point::new(51.0001, -1.0)));
        // ~111 m north, outside the radius
        assert!(!grid.has_within(Point::new(51.001, -1.0)));
    }

    #[test]
    fn test_grid_across_cell_boundary() {
        // point sits just on one side of a cell edge, query on the other
        let points = vec![Point::new(51.00018, -1.0)];
        let grid = PointGrid::build(&points, 20.0);
        assert!(grid.has_within(Point::new(51.00017, -1.0)));
    }

    #[test]
    fn test_grid_finds_point_due_east() {
        // a degree of longitude covers fewer metres than a degree of
        // latitude here, so an in-radius point due east can sit more than
        // one cell away
        let east = Point::new(51.0, -1.0 + metres_to_deg_lon(19.0, 51.0));
        let grid = PointGrid::build(&[east], 20.0);

        assert!(grid.has_within(Point::new(51.0, -1.0)));

        // ~31 m east of the indexed point, outside the radius
        let far_east = Point::new(51.0, -1.0 + metres_to_deg_lon(50.0, 51.0));
        assert!(!grid.has_within(far_east));
    }

    #[test]
    fn test_grid_finds_point_due_west() {
        let west = Point::new(51.0, -1.0 - metres_to_deg_lon(19.0, 51.0));
        let grid = PointGrid::build(&[west], 20.0);
        assert!(grid.has_within(Point::new(51.0, -1.0)));
    }

    #[test]
    fn test_empty_grid() {
        let grid = PointGrid::build(&[], 20.0);
        assert!(grid.is_empty());
        assert_eq!(grid.len(), 0);
        assert!(!grid.has_within(Point::new(51.0, -1.0)));
    }

    #[test]
    fn test_grid_len() {
        let points = vec![
            Point::new(51.0, -1.0),
            Point::new(51.5, -1.5),
            Point::new(52.0, -2.0),
        ];
        let grid = PointGrid::build(&points, 20.0);
        assert_eq!(grid.len(), 3);
    }
}
