//! # Meridian Tiler Core
//!
//! The rendering and node-storage substrate of a vector-tile generator: scaling, simplifying,
//! and slicing feature geometries into per-tile encoded output, and a disk-backed memory-mapped
//! key-value table for node coordinate lookups during way/relation assembly.
//!
//! ## Scope
//!
//! This crate owns geometry processing, not I/O policy or wire formats. It never reads a data
//! source, never writes a tile container, and never runs a server; those are external
//! collaborators reached through the [`config::RenderConfig`], [`stats::Stats`],
//! [`render::feature::Feature`], and [`render::encoder::GeometryEncoder`] traits.
//!
//! ## Example
//!
//! ```no_run
//! use meridian_tiler_core::config::StaticRenderConfig;
//! use meridian_tiler_core::stats::NoopStats;
//! use meridian_tiler_core::render::renderer::FeatureRenderer;
//!
//! # fn example(feature: &dyn meridian_tiler_core::render::feature::Feature,
//! #            encoder: &dyn meridian_tiler_core::render::encoder::GeometryEncoder) {
//! let config = StaticRenderConfig::new(14);
//! let stats = NoopStats;
//! let renderer = FeatureRenderer::new(&config, &stats, encoder);
//! let _ = renderer.render(feature, 10);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod geom;
pub mod mmap;
pub mod render;
pub mod slice;
pub mod stats;
pub mod tile;

pub use config::{RenderConfig, StaticRenderConfig};
pub use error::{Error, Result};
pub use stats::{NoopStats, Stats};
pub use tile::{TileCoord, TileExtent, MAX_MAXZOOM};
