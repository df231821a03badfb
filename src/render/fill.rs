//! The constant-foldable polygon used to fill tiles that lie entirely inside a source polygon.

use geo_types::{Coord, Geometry, LineString, Polygon};

/// `FILL` covers a full tile plus a generous buffer in tile-local coordinates: `[-5, 261]^2`.
/// Any tile the slicer marks as filled is emitted with this exact geometry so the encoder can
/// recognize and coalesce repeated fills instead of re-encoding the same square per tile.
pub const FILL_MIN: f64 = -5.0;
pub const FILL_MAX: f64 = 261.0;

/// Build the `FILL` polygon geometry.
pub fn fill_geometry() -> Geometry<f64> {
    let ring = LineString(vec![
        Coord { x: FILL_MIN, y: FILL_MIN },
        Coord { x: FILL_MAX, y: FILL_MIN },
        Coord { x: FILL_MAX, y: FILL_MAX },
        Coord { x: FILL_MIN, y: FILL_MAX },
        Coord { x: FILL_MIN, y: FILL_MIN },
    ]);
    Geometry::Polygon(Polygon::new(ring, vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_geometry_is_a_closed_square_covering_the_buffer() {
        match fill_geometry() {
            Geometry::Polygon(poly) => {
                assert_eq!(poly.exterior().0.len(), 5);
                assert_eq!(poly.exterior().0.first(), poly.exterior().0.last());
            }
            _ => panic!("expected a polygon"),
        }
    }
}
