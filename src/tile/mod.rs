//! Tile coordinates and the per-zoom extents a renderer is allowed to emit into.

pub mod coord;
pub mod extent;

pub use coord::TileCoord;
pub use extent::TileExtent;

/// Highest zoom level the core will ever scale or slice to.
///
/// Mirrors Planetiler's `PlanetilerConfig.MAX_MAXZOOM`; render configs reject zoom levels above
/// this rather than clamp them.
pub const MAX_MAXZOOM: u8 = 24;
