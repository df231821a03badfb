//! The coordinate-reference-system boundary.
//!
//! §4.1 deliberately keeps the renderer agnostic to which CRS pair a deployment uses (the
//! original ships EPSG:3031 <-> WGS84 for Antarctic mapping; this design accepts any pair). The
//! core only ever operates on the post-projection "world" coordinates in `[0, 1]^2`, so the
//! concrete transform is an external collaborator reached through this trait.

use geo_types::{Coord, Geometry};

/// Projects between a source CRS and normalized world coordinates.
pub trait Projection: Send + Sync {
    /// Project a single source-CRS point into world space.
    fn project_point(&self, coord: Coord<f64>) -> Coord<f64>;

    /// Unproject a single world-space point back to the source CRS.
    fn unproject_point(&self, coord: Coord<f64>) -> Coord<f64>;

    /// Project an entire geometry into world space by mapping every coordinate.
    fn project_to_world(&self, geom: &Geometry<f64>) -> Geometry<f64> {
        map_coords(geom, |c| self.project_point(c))
    }

    /// Unproject an entire geometry out of world space.
    fn unproject_from_world(&self, geom: &Geometry<f64>) -> Geometry<f64> {
        map_coords(geom, |c| self.unproject_point(c))
    }
}

/// No-op projection: the source CRS already is `[0, 1]^2` world space. Used by tests and by
/// embedders that pre-project upstream of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn project_point(&self, coord: Coord<f64>) -> Coord<f64> {
        coord
    }

    fn unproject_point(&self, coord: Coord<f64>) -> Coord<f64> {
        coord
    }
}

/// Web Mercator (EPSG:3857) source longitude/latitude <-> world `[0, 1]^2`.
///
/// A concrete, ready-to-use stand-in for the EPSG:3031 transform the original ships; any other
/// CRS pair plugs in the same way by implementing [`Projection`] directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorProjection;

const MAX_LATITUDE: f64 = 85.051_129;

impl Projection for WebMercatorProjection {
    fn project_point(&self, coord: Coord<f64>) -> Coord<f64> {
        let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let x = coord.x / 360.0 + 0.5;
        let sin_lat = lat.to_radians().sin();
        let y = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * std::f64::consts::PI);
        Coord { x, y }
    }

    fn unproject_point(&self, coord: Coord<f64>) -> Coord<f64> {
        let lon = (coord.x - 0.5) * 360.0;
        let n = std::f64::consts::PI * (1.0 - 2.0 * coord.y);
        let lat = n.sinh().atan().to_degrees();
        Coord { x: lon, y: lat }
    }
}

/// Apply `f` to every coordinate of a geometry, recursing through collections.
fn map_coords(geom: &Geometry<f64>, f: impl Fn(Coord<f64>) -> Coord<f64> + Copy) -> Geometry<f64> {
    use geo_types::{LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

    match geom {
        Geometry::Point(p) => Geometry::Point(Point(f(p.0))),
        Geometry::MultiPoint(mp) => {
            Geometry::MultiPoint(MultiPoint(mp.0.iter().map(|p| Point(f(p.0))).collect()))
        }
        Geometry::LineString(ls) => Geometry::LineString(map_linestring(ls, f)),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString(
            mls.0.iter().map(|ls| map_linestring(ls, f)).collect(),
        )),
        Geometry::Polygon(poly) => Geometry::Polygon(map_polygon(poly, f)),
        Geometry::MultiPolygon(mp) => {
            Geometry::MultiPolygon(MultiPolygon(mp.0.iter().map(|p| map_polygon(p, f)).collect()))
        }
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(
            gc.0.iter()
                .map(|g| map_coords(g, f))
                .collect::<Vec<_>>()
                .into(),
        ),
        other => other.clone(),
    }
}

fn map_linestring(
    ls: &geo_types::LineString<f64>,
    f: impl Fn(Coord<f64>) -> Coord<f64>,
) -> geo_types::LineString<f64> {
    geo_types::LineString(ls.0.iter().map(|&c| f(c)).collect())
}

fn map_polygon(
    poly: &geo_types::Polygon<f64>,
    f: impl Fn(Coord<f64>) -> Coord<f64> + Copy,
) -> geo_types::Polygon<f64> {
    geo_types::Polygon::new(
        map_linestring(poly.exterior(), f),
        poly.interiors().iter().map(|r| map_linestring(r, f)).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let c = Coord { x: 0.3, y: 0.7 };
        let p = IdentityProjection;
        assert_eq!(p.project_point(c), c);
        assert_eq!(p.unproject_point(c), c);
    }

    #[test]
    fn web_mercator_round_trips_within_tolerance() {
        let p = WebMercatorProjection;
        let lon_lat = Coord { x: -122.4194, y: 37.7749 };
        let world = p.project_point(lon_lat);
        assert!(world.x >= 0.0 && world.x <= 1.0);
        assert!(world.y >= 0.0 && world.y <= 1.0);

        let back = p.unproject_point(world);
        assert!((back.x - lon_lat.x).abs() < 1e-9);
        assert!((back.y - lon_lat.y).abs() < 1e-6);
    }
}
