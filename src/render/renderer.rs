//! Orchestrates per-zoom scaling, simplification, slicing, repair, and encoding for one feature.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geo::algorithm::simplify::Simplify;
use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use tracing::{error, warn};

use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::geom::label_grid::label_grid_id;
use crate::geom::repair::snap_and_fix_polygon;
use crate::render::encoder::GeometryEncoder;
use crate::render::feature::{AttrValue, Attributes, Feature, Group, RenderedFeature, VectorFeature};
use crate::render::fill;
use crate::slice::{self, RingGroup};
use crate::stats::Stats;

/// Tile-local coordinate grid precision used when snapping polygons. `1/4096` matches the
/// sub-pixel resolution this crate's reference [`crate::render::encoder::CommandStreamEncoder`]
/// is built around.
const SNAP_PRECISION: f64 = 1.0 / 4096.0;

/// Smallest label-grid cell size, in world-scaled units, worth bucketing by.
const MIN_LABEL_GRID_CELL: f64 = 1.0 / 4096.0;

/// Process-wide monotonic feature id counter, shared by every [`FeatureRenderer`] instance.
static NEXT_FEATURE_ID: AtomicU64 = AtomicU64::new(0);

fn next_feature_id() -> u64 {
    NEXT_FEATURE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stateless orchestrator for turning one [`Feature`] into [`RenderedFeature`]s across its zoom
/// range. Safe to share across worker threads: the only mutable state is the process-wide
/// feature id counter, which is atomic.
pub struct FeatureRenderer<'a> {
    config: &'a dyn RenderConfig,
    stats: &'a dyn Stats,
    encoder: &'a dyn GeometryEncoder,
}

impl<'a> FeatureRenderer<'a> {
    pub fn new(config: &'a dyn RenderConfig, stats: &'a dyn Stats, encoder: &'a dyn GeometryEncoder) -> Self {
        Self { config, stats, encoder }
    }

    /// Render `feature` across its zoom range, invoking `emit` once per resulting tile fragment.
    pub fn render(&self, feature: &dyn Feature, mut emit: impl FnMut(RenderedFeature)) -> Result<()> {
        let geom = feature.geometry();

        if is_empty_geometry(geom) {
            warn!(source_id = feature.source_id(), "empty geometry; dropping feature");
            self.stats.data_error("empty_geometry");
            return Ok(());
        }

        match geom {
            Geometry::Point(_) | Geometry::MultiPoint(_) => self.render_points(feature, &mut emit),
            Geometry::LineString(_)
            | Geometry::MultiLineString(_)
            | Geometry::Polygon(_)
            | Geometry::MultiPolygon(_) => self.render_shapes(feature, &mut emit),
            other => {
                warn!(
                    source_id = feature.source_id(),
                    geometry = ?other,
                    "unrecognized geometry type; dropping feature"
                );
                self.stats.data_error("unrecognized_geometry_type");
                Ok(())
            }
        }
    }

    fn render_points(&self, feature: &dyn Feature, emit: &mut impl FnMut(RenderedFeature)) -> Result<()> {
        let feature_id = next_feature_id();
        self.stats.processed_element("point", feature.layer());

        let geom = feature.geometry();
        let is_single = matches!(geom, Geometry::Point(_));
        let base_points: Vec<Coord<f64>> = match geom {
            Geometry::Point(p) => vec![p.0],
            Geometry::MultiPoint(mp) => mp.0.iter().map(|p| p.0).collect(),
            _ => unreachable!("dispatched only for point geometries"),
        };

        for z in (feature.min_zoom()..=feature.max_zoom()).rev() {
            let attrs = feature.attrs(z);
            let buffer = feature.buffer_pixels(z) / 256.0;
            let scale = (1u64 << z) as f64;
            let tiles_at_zoom = 1u64 << z;
            let extents = self.config.tile_extent(z);
            let grid_cell_size = feature
                .grid_pixel_size(z)
                .map(|px| px / 256.0)
                .filter(|&g| g >= MIN_LABEL_GRID_CELL);

            let mut emitted = 0usize;
            let decompose = !is_single && grid_cell_size.is_some();

            if !decompose {
                let scaled: Vec<Coord<f64>> = base_points.iter().map(|&c| scale_coord(c, scale)).collect();
                let group = if is_single {
                    grid_cell_size.map(|g| Group {
                        grid_id: label_grid_id(tiles_at_zoom, g, scaled[0].x, scaled[0].y),
                        limit: feature.grid_limit(z).unwrap_or(u32::MAX),
                    })
                } else {
                    None
                };

                let tiled = slice::slice_points_into_tiles(&extents, buffer, z, &scaled, feature.source_id());
                for (tile, groups) in &tiled.tile_data {
                    let pts = flatten_points(groups);
                    let local_geom = point_or_multipoint(pts);
                    let encoded = self.encoder.encode_geometry(&local_geom, 0);
                    let vf = VectorFeature {
                        layer: feature.layer().to_string(),
                        feature_id,
                        geometry: encoded,
                        attributes: attrs.clone(),
                        group_hash: group.map(|g| g.grid_id),
                    };
                    emit(RenderedFeature {
                        tile: *tile,
                        feature: vf,
                        sort_key: feature.sort_key(),
                        group,
                    });
                    emitted += 1;
                }
            } else {
                for &c in &base_points {
                    let scaled = scale_coord(c, scale);
                    let group = grid_cell_size.map(|g| Group {
                        grid_id: label_grid_id(tiles_at_zoom, g, scaled.x, scaled.y),
                        limit: feature.grid_limit(z).unwrap_or(u32::MAX),
                    });
                    let tiled = slice::slice_points_into_tiles(
                        &extents,
                        buffer,
                        z,
                        std::slice::from_ref(&scaled),
                        feature.source_id(),
                    );
                    for (tile, groups) in &tiled.tile_data {
                        for p in flatten_points(groups) {
                            let encoded = self.encoder.encode_geometry(&Geometry::Point(Point(p)), 0);
                            let vf = VectorFeature {
                                layer: feature.layer().to_string(),
                                feature_id,
                                geometry: encoded,
                                attributes: attrs.clone(),
                                group_hash: group.map(|g| g.grid_id),
                            };
                            emit(RenderedFeature {
                                tile: *tile,
                                feature: vf,
                                sort_key: feature.sort_key(),
                                group,
                            });
                            emitted += 1;
                        }
                    }
                }
            }

            self.stats.emitted_features(z, feature.layer(), emitted);
        }
        Ok(())
    }

    fn render_shapes(&self, feature: &dyn Feature, emit: &mut impl FnMut(RenderedFeature)) -> Result<()> {
        let feature_id = next_feature_id();
        let geom = feature.geometry();
        let is_area = matches!(geom, Geometry::Polygon(_) | Geometry::MultiPolygon(_));
        self.stats
            .processed_element(if is_area { "polygon" } else { "line" }, feature.layer());

        let world_length = match geom {
            Geometry::LineString(ls) => Some(line_length(ls)),
            _ => None,
        };

        for z in (feature.min_zoom()..=feature.max_zoom()).rev() {
            let scale = (1u64 << z) as f64;
            let tolerance = feature.pixel_tolerance(z) / 256.0;
            let mut min_size = feature.min_pixel_size(z) / 256.0;
            if is_area {
                min_size *= min_size;
            } else if let Some(len) = world_length {
                if len * scale < min_size {
                    continue;
                }
            }

            let scaled_geom = scale_geometry(geom, scale);
            let simplified = simplify_geometry(&scaled_geom, tolerance);
            let groups = extract_groups(&simplified, is_area, min_size);
            if groups.is_empty() {
                continue;
            }

            let buffer = feature.buffer_pixels(z) / 256.0;
            let extents = self.config.tile_extent(z);
            let tiled = slice::slice_into_tiles(&groups, buffer, is_area, z, &extents, feature.source_id());

            let mut attrs = feature.attrs(z);
            if let Some(attr_name) = feature.num_points_attr(z) {
                let count: usize = groups.iter().flat_map(|g| g.iter().map(|s| s.len())).sum();
                attrs.insert(attr_name, AttrValue::Number(count as f64));
            }

            let mut emitted = 0usize;
            let line_scale = line_scale_for_zoom(self.config.max_zoom(), z);

            for (tile, ring_groups) in &tiled.tile_data {
                for group in ring_groups {
                    let result = if is_area {
                        self.encode_polygon_fragment(group, feature.layer(), feature_id, &attrs)
                    } else {
                        self.encode_line_fragment(group, feature.layer(), feature_id, &attrs, line_scale)
                    };
                    match result {
                        Ok(vf) => {
                            emit(RenderedFeature {
                                tile: *tile,
                                feature: vf,
                                sort_key: feature.sort_key(),
                                group: None,
                            });
                            emitted += 1;
                        }
                        Err(err) => {
                            error!(
                                source_id = feature.source_id(),
                                tile = %tile,
                                %err,
                                "per-tile feature write failed; skipping tile"
                            );
                            self.stats.data_error("write_tile_features");
                        }
                    }
                }
            }

            if is_area && !tiled.filled_tiles.is_empty() {
                let fill_encoded = self.encoder.encode_geometry(&fill::fill_geometry(), 0);
                for tile in &tiled.filled_tiles {
                    let vf = VectorFeature {
                        layer: feature.layer().to_string(),
                        feature_id,
                        geometry: Arc::clone(&fill_encoded),
                        attributes: attrs.clone(),
                        group_hash: None,
                    };
                    emit(RenderedFeature {
                        tile: *tile,
                        feature: vf,
                        sort_key: feature.sort_key(),
                        group: None,
                    });
                    emitted += 1;
                }
            }

            self.stats.emitted_features(z, feature.layer(), emitted);
        }
        Ok(())
    }

    fn encode_polygon_fragment(
        &self,
        group: &RingGroup,
        layer: &str,
        feature_id: u64,
        attrs: &Attributes,
    ) -> Result<VectorFeature> {
        let exterior = LineString(close_ring(&group[0]));
        let interiors: Vec<LineString<f64>> = group[1..].iter().map(|r| LineString(close_ring(r))).collect();
        let poly = Polygon::new(exterior, interiors);

        let fixed = snap_and_fix_polygon(&poly, SNAP_PRECISION, self.stats, "write_tile_features")
            .map_err(|_| Error::geometry("polygon snap-and-fix exhausted all repair attempts"))?;

        let encoded = self.encoder.encode_geometry(&Geometry::Polygon(fixed), 0);
        Ok(VectorFeature {
            layer: layer.to_string(),
            feature_id,
            geometry: encoded,
            attributes: attrs.clone(),
            group_hash: None,
        })
    }

    fn encode_line_fragment(
        &self,
        group: &RingGroup,
        layer: &str,
        feature_id: u64,
        attrs: &Attributes,
        line_scale: u8,
    ) -> Result<VectorFeature> {
        let coords = group.first().ok_or_else(|| Error::geometry("empty line fragment"))?;
        if coords.len() < 2 {
            return Err(Error::geometry("line fragment has fewer than two points"));
        }
        let ls = LineString(coords.clone());
        let encoded = self.encoder.encode_geometry(&Geometry::LineString(ls), line_scale);
        Ok(VectorFeature {
            layer: layer.to_string(),
            feature_id,
            geometry: encoded,
            attributes: attrs.clone(),
            group_hash: None,
        })
    }
}

/// `min(max(maxzoom, 14) - z, 31 - 14)`: extra fixed-point bits of precision kept on line
/// geometry so a downstream line-merge pass can work sub-pixel before the final unscale.
fn line_scale_for_zoom(max_zoom: u8, z: u8) -> u8 {
    let a = max_zoom.max(14).saturating_sub(z);
    a.min(31 - 14)
}

fn is_empty_geometry(geom: &Geometry<f64>) -> bool {
    match geom {
        Geometry::Point(_) => false,
        Geometry::MultiPoint(mp) => mp.0.is_empty(),
        Geometry::LineString(ls) => ls.0.is_empty(),
        Geometry::MultiLineString(mls) => mls.0.is_empty() || mls.0.iter().all(|l| l.0.is_empty()),
        Geometry::Polygon(poly) => poly.exterior().0.is_empty(),
        Geometry::MultiPolygon(mp) => mp.0.is_empty() || mp.0.iter().all(|p| p.exterior().0.is_empty()),
        Geometry::GeometryCollection(gc) => gc.0.is_empty(),
        _ => false,
    }
}

fn scale_coord(c: Coord<f64>, scale: f64) -> Coord<f64> {
    Coord {
        x: c.x * scale,
        y: c.y * scale,
    }
}

fn scale_linestring(ls: &LineString<f64>, scale: f64) -> LineString<f64> {
    LineString(ls.0.iter().map(|&c| scale_coord(c, scale)).collect())
}

fn scale_polygon(poly: &Polygon<f64>, scale: f64) -> Polygon<f64> {
    Polygon::new(
        scale_linestring(poly.exterior(), scale),
        poly.interiors().iter().map(|r| scale_linestring(r, scale)).collect(),
    )
}

fn scale_geometry(geom: &Geometry<f64>, scale: f64) -> Geometry<f64> {
    match geom {
        Geometry::LineString(ls) => Geometry::LineString(scale_linestring(ls, scale)),
        Geometry::MultiLineString(mls) => {
            Geometry::MultiLineString(MultiLineString(mls.0.iter().map(|l| scale_linestring(l, scale)).collect()))
        }
        Geometry::Polygon(poly) => Geometry::Polygon(scale_polygon(poly, scale)),
        Geometry::MultiPolygon(mp) => {
            Geometry::MultiPolygon(MultiPolygon(mp.0.iter().map(|p| scale_polygon(p, scale)).collect()))
        }
        other => other.clone(),
    }
}

fn simplify_geometry(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    if tolerance <= 0.0 {
        return geom.clone();
    }
    match geom {
        Geometry::LineString(ls) => Geometry::LineString(ls.simplify(&tolerance)),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(mls.simplify(&tolerance)),
        Geometry::Polygon(poly) => Geometry::Polygon(poly.simplify(&tolerance)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.simplify(&tolerance)),
        other => other.clone(),
    }
}

/// Pull out the connected rings/lines to slice, filtered by `min_size` (an area threshold for
/// polygons, a length threshold for lines).
fn extract_groups(geom: &Geometry<f64>, is_area: bool, min_size: f64) -> Vec<RingGroup> {
    match geom {
        Geometry::Polygon(poly) => polygon_group(poly, min_size).into_iter().collect(),
        Geometry::MultiPolygon(mp) => mp.0.iter().filter_map(|p| polygon_group(p, min_size)).collect(),
        Geometry::LineString(ls) if !is_area => line_group(ls, min_size).into_iter().collect(),
        Geometry::MultiLineString(mls) if !is_area => {
            mls.0.iter().filter_map(|l| line_group(l, min_size)).collect()
        }
        _ => Vec::new(),
    }
}

fn polygon_group(poly: &Polygon<f64>, min_area: f64) -> Option<RingGroup> {
    if ring_area(poly.exterior()) < min_area {
        return None;
    }
    let mut group = vec![poly.exterior().0.clone()];
    group.extend(poly.interiors().iter().map(|r| r.0.clone()));
    Some(group)
}

fn line_group(ls: &LineString<f64>, min_length: f64) -> Option<RingGroup> {
    if ls.0.len() < 2 || line_length(ls) < min_length {
        return None;
    }
    Some(vec![ls.0.clone()])
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    let pts = &ring.0;
    if pts.len() < 3 {
        return 0.0;
    }
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum / 2.0).abs()
}

fn line_length(ls: &LineString<f64>) -> f64 {
    ls.0.windows(2)
        .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
        .sum()
}

fn close_ring(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out = coords.to_vec();
    if out.first() != out.last() {
        if let Some(&first) = out.first() {
            out.push(first);
        }
    }
    out
}

fn flatten_points(groups: &[RingGroup]) -> Vec<Coord<f64>> {
    groups
        .iter()
        .flat_map(|g| g.iter().flat_map(|seq| seq.iter().copied()))
        .collect()
}

fn point_or_multipoint(pts: Vec<Coord<f64>>) -> Geometry<f64> {
    if pts.len() == 1 {
        Geometry::Point(Point(pts[0]))
    } else {
        Geometry::MultiPoint(MultiPoint(pts.into_iter().map(Point).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticRenderConfig;
    use crate::render::encoder::CommandStreamEncoder;
    use crate::stats::AtomicStats;
    use std::collections::HashMap;

    struct TestPoint {
        geometry: Geometry<f64>,
        layer: String,
        grid: bool,
    }

    impl TestPoint {
        fn new(coord: Coord<f64>, layer: &str, grid: bool) -> Self {
            Self {
                geometry: Geometry::Point(Point(coord)),
                layer: layer.to_string(),
                grid,
            }
        }
    }

    impl Feature for TestPoint {
        fn geometry(&self) -> &Geometry<f64> {
            &self.geometry
        }
        fn layer(&self) -> &str {
            &self.layer
        }
        fn sort_key(&self) -> f64 {
            0.0
        }
        fn min_zoom(&self) -> u8 {
            4
        }
        fn max_zoom(&self) -> u8 {
            4
        }
        fn attrs(&self, _z: u8) -> Attributes {
            HashMap::new()
        }
        fn buffer_pixels(&self, _z: u8) -> f64 {
            8.0
        }
        fn pixel_tolerance(&self, _z: u8) -> f64 {
            1.0
        }
        fn min_pixel_size(&self, _z: u8) -> f64 {
            0.0
        }
        fn grid_pixel_size(&self, _z: u8) -> Option<f64> {
            self.grid.then_some(32.0)
        }
        fn grid_limit(&self, _z: u8) -> Option<u32> {
            self.grid.then_some(5)
        }
        fn source_id(&self) -> &str {
            "test-point"
        }
    }

    #[test]
    fn point_feature_shares_one_feature_id_across_its_tile_fragments() {
        let config = StaticRenderConfig::new(4);
        let stats = AtomicStats::new();
        let encoder = CommandStreamEncoder;
        let renderer = FeatureRenderer::new(&config, &stats, &encoder);

        let feature = TestPoint::new(Coord { x: 0.5, y: 0.5 }, "places", false);

        let mut ids = Vec::new();
        renderer
            .render(&feature, |rf| ids.push(rf.feature.feature_id))
            .unwrap();

        assert!(!ids.is_empty());
        assert!(ids.iter().all(|&id| id == ids[0]));
    }

    #[test]
    fn labeled_single_point_carries_a_group() {
        let config = StaticRenderConfig::new(4);
        let stats = AtomicStats::new();
        let encoder = CommandStreamEncoder;
        let renderer = FeatureRenderer::new(&config, &stats, &encoder);

        let feature = TestPoint::new(Coord { x: 0.5, y: 0.5 }, "places", true);

        let mut groups = Vec::new();
        renderer.render(&feature, |rf| groups.push(rf.group)).unwrap();

        assert!(groups.iter().all(|g| g.is_some()));
    }
}
