//! The input contract the renderer consumes, and the output types it produces.

use std::collections::HashMap;
use std::sync::Arc;

use geo_types::Geometry;

use crate::render::encoder::EncodedGeometry;
use crate::tile::TileCoord;

/// A scalar attribute value. Deliberately small and closed: this crate never needs anything
/// richer than what a tile-attribute table can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Number(f64),
    Bool(bool),
}

/// A map of attribute name to value, as returned by [`Feature::attrs`].
pub type Attributes = HashMap<String, AttrValue>;

/// An immutable input feature. Implemented by the embedder; this crate never constructs one
/// itself, only consumes it through `&dyn Feature`.
pub trait Feature: Send + Sync {
    /// The geometry, already projected into world coordinates `[0, 1]^2`.
    fn geometry(&self) -> &Geometry<f64>;

    /// Destination layer name. Non-empty.
    fn layer(&self) -> &str;

    /// Numeric sort key carried through to every [`RenderedFeature`] this feature produces.
    fn sort_key(&self) -> f64;

    /// Inclusive zoom range this feature renders at (`0 <= min <= max <= MAX_MAXZOOM`).
    fn min_zoom(&self) -> u8;
    fn max_zoom(&self) -> u8;

    /// Attributes at zoom `z`.
    fn attrs(&self, z: u8) -> Attributes;

    /// Tile buffer, in pixels (out of 256), at zoom `z`.
    fn buffer_pixels(&self, z: u8) -> f64;

    /// Douglas-Peucker tolerance, in pixels, at zoom `z`.
    fn pixel_tolerance(&self, z: u8) -> f64;

    /// Minimum feature size, in pixels (or pixels^2 for polygons), at zoom `z`.
    fn min_pixel_size(&self, z: u8) -> f64;

    /// Label-grid cell size, in pixels, at zoom `z`. `None` if this feature has no label grid.
    fn grid_pixel_size(&self, _z: u8) -> Option<f64> {
        None
    }

    /// Label-grid occupancy limit at zoom `z`. Only consulted when `grid_pixel_size` is `Some`.
    fn grid_limit(&self, _z: u8) -> Option<u32> {
        None
    }

    /// If set, the emitted attributes at each zoom carry the pre-tiling simplified point count
    /// under this attribute name.
    fn num_points_attr(&self, _z: u8) -> Option<String> {
        None
    }

    /// Opaque identifier, used only for diagnostics.
    fn source_id(&self) -> &str;
}

/// Identifies a label-grid cell and the maximum number of features permitted in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    pub grid_id: u64,
    pub limit: u32,
}

/// One encoded feature fragment, scoped to a single tile.
#[derive(Debug, Clone)]
pub struct VectorFeature {
    pub layer: String,
    pub feature_id: u64,
    pub geometry: Arc<EncodedGeometry>,
    pub attributes: Attributes,
    pub group_hash: Option<u64>,
}

/// One unit of renderer output: a tile-scoped, encoded feature fragment plus its sort key and
/// optional label-grid group.
#[derive(Debug, Clone)]
pub struct RenderedFeature {
    pub tile: TileCoord,
    pub feature: VectorFeature,
    pub sort_key: f64,
    pub group: Option<Group>,
}
