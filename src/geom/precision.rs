//! Compact 64-bit point packing and coordinate-grid precision reduction.

use geo_types::{Coord, LineString, Polygon};

/// Fractional-bit precision used to pack a world coordinate into 32 bits: `x * 2^30`.
const PACK_SHIFT: u32 = 30;

/// Pack a world-space point into a single 64-bit value (upper 32 bits = x, lower 32 = y), each
/// scaled by `2^30`. Used as the value stored in the mmap long->long table for node coordinates.
pub fn encode_flat_location(x: f64, y: f64) -> u64 {
    let xi = (x * (1u64 << PACK_SHIFT) as f64).round() as u32;
    let yi = (y * (1u64 << PACK_SHIFT) as f64).round() as u32;
    ((xi as u64) << 32) | (yi as u64)
}

/// Recover the world-space x coordinate from a value packed by [`encode_flat_location`].
pub fn decode_world_x(packed: u64) -> f64 {
    ((packed >> 32) as u32) as f64 / (1u64 << PACK_SHIFT) as f64
}

/// Recover the world-space y coordinate from a value packed by [`encode_flat_location`].
pub fn decode_world_y(packed: u64) -> f64 {
    ((packed & 0xFFFF_FFFF) as u32) as f64 / (1u64 << PACK_SHIFT) as f64
}

/// Round every coordinate of `ring` onto a grid of spacing `precision` (in the same units as the
/// ring, i.e. already-scaled tile coordinates). Consecutive duplicate points introduced by the
/// rounding are dropped.
pub fn reduce_precision(ring: &LineString<f64>, precision: f64) -> LineString<f64> {
    if precision <= 0.0 {
        return ring.clone();
    }
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        let rounded = Coord {
            x: (c.x / precision).round() * precision,
            y: (c.y / precision).round() * precision,
        };
        if out.last() != Some(&rounded) {
            out.push(rounded);
        }
    }
    LineString(out)
}

/// Apply [`reduce_precision`] to every ring of a polygon.
pub fn reduce_polygon_precision(poly: &Polygon<f64>, precision: f64) -> Polygon<f64> {
    Polygon::new(
        reduce_precision(poly.exterior(), precision),
        poly.interiors()
            .iter()
            .map(|r| reduce_precision(r, precision))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack_round_trips_within_grid_resolution() {
        let x = 0.123_456_789;
        let y = 0.987_654_321;
        let packed = encode_flat_location(x, y);
        assert!((decode_world_x(packed) - x).abs() < 1e-9);
        assert!((decode_world_y(packed) - y).abs() < 1e-9);
    }

    #[test]
    fn zero_packs_to_zero_which_collides_with_missing() {
        // Callers must never store a node at the exact origin as a table value without knowing
        // it round-trips to the MISSING sentinel; this documents that sharp edge.
        assert_eq!(encode_flat_location(0.0, 0.0), 0);
    }

    #[test]
    fn reduce_precision_drops_collapsed_duplicates() {
        let ring = LineString(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.01, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
        ]);
        let reduced = reduce_precision(&ring, 1.0);
        assert_eq!(reduced.0.len(), 2);
    }
}
