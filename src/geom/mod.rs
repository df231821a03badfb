//! Geometry-level building blocks the renderer composes: CRS projection, precision reduction,
//! polygon repair, convexity, zoom thresholds, and label-grid bucketing.

pub mod convex;
pub mod label_grid;
pub mod precision;
pub mod projection;
pub mod repair;
pub mod zoom;

pub use convex::is_convex;
pub use label_grid::label_grid_id;
pub use precision::{decode_world_x, decode_world_y, encode_flat_location, reduce_polygon_precision, reduce_precision};
pub use projection::{IdentityProjection, Projection, WebMercatorProjection};
pub use repair::{fix_polygon, fix_polygon_aggressive, fix_polygon_buffered, snap_and_fix_polygon};
pub use zoom::min_zoom_for_pixel_size;
