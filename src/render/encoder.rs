//! The boundary between this crate's renderer and the tile-container layer.
//!
//! This crate never serializes a tile to bytes; it hands off already-sliced geometry to a
//! [`GeometryEncoder`] and treats the result as opaque. [`CommandStreamEncoder`] is a reference
//! implementation (move-to/line-to/close-path command integers with zigzag-delta coordinates, the
//! scheme MVT wire encoders use) provided so the renderer is independently testable without a
//! real protobuf container.

use std::sync::Arc;

use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, Point, Polygon};

/// The geometry type an [`EncodedGeometry`] carries, mirroring the MVT closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeomType {
    Point,
    LineString,
    Polygon,
}

/// An encoder's opaque output for one geometry. This crate only ever constructs these through a
/// [`GeometryEncoder`] implementation; it never inspects their contents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedGeometry {
    pub geom_type: GeomType,
    pub commands: Vec<u32>,
}

/// Encodes a world/tile-local geometry into whatever the tile-container layer needs.
///
/// `scale` carries extra fixed-point bits of precision for line geometry during subsequent
/// line-merging (`min(max(maxzoom, 14) - z, 31 - 14)`, per the renderer); polygons always encode
/// at `scale = 0`.
pub trait GeometryEncoder: Send + Sync {
    fn encode_geometry(&self, geom: &Geometry<f64>, scale: u8) -> Arc<EncodedGeometry>;
}

/// MVT-style command-integer encoder: `MoveTo`/`LineTo`/`ClosePath` command words followed by
/// zigzag-delta-encoded coordinate pairs, scaled by `2^scale` before rounding to integers.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandStreamEncoder;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

impl CommandStreamEncoder {
    fn command(id: u32, count: u32) -> u32 {
        (id & 0x7) | (count << 3)
    }

    fn zigzag(n: i32) -> u32 {
        ((n << 1) ^ (n >> 31)) as u32
    }

    fn scaled(v: f64, scale: u8) -> i32 {
        (v * (1u64 << scale) as f64).round() as i32
    }

    fn encode_point(&self, p: &Point<f64>, scale: u8) -> Vec<u32> {
        vec![
            Self::command(CMD_MOVE_TO, 1),
            Self::zigzag(Self::scaled(p.x(), scale)),
            Self::zigzag(Self::scaled(p.y(), scale)),
        ]
    }

    fn encode_multipoint(&self, mp: &MultiPoint<f64>, scale: u8) -> Vec<u32> {
        let mut out = vec![Self::command(CMD_MOVE_TO, mp.0.len() as u32)];
        for p in &mp.0 {
            out.push(Self::zigzag(Self::scaled(p.x(), scale)));
            out.push(Self::zigzag(Self::scaled(p.y(), scale)));
        }
        out
    }

    fn encode_open_path(&self, ls: &LineString<f64>, scale: u8) -> Vec<u32> {
        if ls.0.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut cursor = (0i32, 0i32);

        let first = ls.0[0];
        let (fx, fy) = (Self::scaled(first.x, scale), Self::scaled(first.y, scale));
        out.push(Self::command(CMD_MOVE_TO, 1));
        out.push(Self::zigzag(fx - cursor.0));
        out.push(Self::zigzag(fy - cursor.1));
        cursor = (fx, fy);

        if ls.0.len() > 1 {
            out.push(Self::command(CMD_LINE_TO, (ls.0.len() - 1) as u32));
            for c in &ls.0[1..] {
                let (x, y) = (Self::scaled(c.x, scale), Self::scaled(c.y, scale));
                out.push(Self::zigzag(x - cursor.0));
                out.push(Self::zigzag(y - cursor.1));
                cursor = (x, y);
            }
        }
        out
    }

    fn encode_ring(&self, ring: &LineString<f64>, scale: u8) -> Vec<u32> {
        if ring.0.len() < 3 {
            return Vec::new();
        }
        // Encode without the closing point; ClosePath implies the return edge.
        let open_count = if ring.0.first() == ring.0.last() {
            ring.0.len() - 1
        } else {
            ring.0.len()
        };
        let open = LineString(ring.0[..open_count].to_vec());
        let mut out = self.encode_open_path(&open, scale);
        out.push(Self::command(CMD_CLOSE_PATH, 1));
        out
    }

    fn encode_polygon(&self, poly: &Polygon<f64>, scale: u8) -> Vec<u32> {
        let mut out = self.encode_ring(poly.exterior(), scale);
        for interior in poly.interiors() {
            out.extend(self.encode_ring(interior, scale));
        }
        out
    }
}

impl GeometryEncoder for CommandStreamEncoder {
    fn encode_geometry(&self, geom: &Geometry<f64>, scale: u8) -> Arc<EncodedGeometry> {
        let (geom_type, commands) = match geom {
            Geometry::Point(p) => (GeomType::Point, self.encode_point(p, scale)),
            Geometry::MultiPoint(mp) => (GeomType::Point, self.encode_multipoint(mp, scale)),
            Geometry::LineString(ls) => (GeomType::LineString, self.encode_open_path(ls, scale)),
            Geometry::MultiLineString(mls) => {
                let mut out = Vec::new();
                for ls in &mls.0 {
                    out.extend(self.encode_open_path(ls, scale));
                }
                (GeomType::LineString, out)
            }
            Geometry::Polygon(poly) => (GeomType::Polygon, self.encode_polygon(poly, scale)),
            Geometry::MultiPolygon(mp) => {
                let mut out = Vec::new();
                for poly in &mp.0 {
                    out.extend(self.encode_polygon(poly, scale));
                }
                (GeomType::Polygon, out)
            }
            _ => (GeomType::Point, Vec::new()),
        };
        Arc::new(EncodedGeometry { geom_type, commands })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_matches_reference_values() {
        assert_eq!(CommandStreamEncoder::zigzag(0), 0);
        assert_eq!(CommandStreamEncoder::zigzag(-1), 1);
        assert_eq!(CommandStreamEncoder::zigzag(1), 2);
        assert_eq!(CommandStreamEncoder::zigzag(-2), 3);
    }

    #[test]
    fn command_packs_id_and_count() {
        assert_eq!(CommandStreamEncoder::command(1, 1), 9);
        assert_eq!(CommandStreamEncoder::command(2, 3), 26);
        assert_eq!(CommandStreamEncoder::command(7, 1), 15);
    }

    #[test]
    fn point_encodes_to_a_single_move_to() {
        let encoder = CommandStreamEncoder;
        let geom = Geometry::Point(Point::new(3.0, 4.0));
        let encoded = encoder.encode_geometry(&geom, 0);
        assert_eq!(encoded.geom_type, GeomType::Point);
        assert_eq!(encoded.commands[0], 9);
    }

    #[test]
    fn polygon_ring_ends_with_close_path() {
        let encoder = CommandStreamEncoder;
        let ring = LineString(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let poly = Polygon::new(ring, vec![]);
        let geom = Geometry::Polygon(poly);
        let encoded = encoder.encode_geometry(&geom, 0);
        assert_eq!(encoded.geom_type, GeomType::Polygon);
        assert_eq!(*encoded.commands.last().unwrap(), 15);
    }

    #[test]
    fn higher_scale_produces_larger_magnitude_deltas() {
        let encoder = CommandStreamEncoder;
        let geom = Geometry::Point(Point::new(1.0, 1.0));
        let at_zero = encoder.encode_geometry(&geom, 0);
        let at_four = encoder.encode_geometry(&geom, 4);
        assert!(at_four.commands[1] > at_zero.commands[1]);
    }
}
