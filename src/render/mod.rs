//! Turns a [`feature::Feature`] into per-tile encoded output across its zoom range.

pub mod encoder;
pub mod feature;
pub mod fill;
pub mod renderer;

pub use encoder::{CommandStreamEncoder, EncodedGeometry, GeomType, GeometryEncoder};
pub use feature::{AttrValue, Attributes, Feature, Group, RenderedFeature, VectorFeature};
pub use renderer::FeatureRenderer;
