//! Error types for the renderer and the mmap long->long table.

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type, covering both the renderer (geometry-level errors, §7 `empty_geometry`,
/// `unrecognized_geometry_type`, `geometry_robustness`) and the mmap table (`io_failure`,
/// `misuse`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input geometry had no coordinates.
    #[error("empty geometry for source id {source_id}")]
    EmptyGeometry { source_id: String },

    /// Geometry dispatch found a variant outside the closed set this renderer handles.
    #[error("unrecognized geometry type: {0}")]
    UnrecognizedGeometryType(String),

    /// `snap_and_fix_polygon` exhausted all repair attempts.
    #[error("geometry robustness failure at stage '{stage}': {tag}")]
    GeometryRobustness { stage: String, tag: String },

    /// A ring or coordinate sequence was geometrically malformed in a way that isn't a
    /// robustness failure per se (e.g. fewer than 3 vertices).
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// I/O error from the mmap table's write, flush, or mapping path. Treated as fatal; never
    /// swallowed by the renderer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `put` was called on a writer handle after the table sealed.
    #[error("table is sealed; no further writes are permitted")]
    Sealed,

    /// A writer issued a key smaller than one it had already written.
    #[error("writer issued non-monotonic key {key} after {last_key}")]
    NonMonotonicKey { key: u64, last_key: u64 },

    /// A writer attempted to store the reserved `MISSING` sentinel.
    #[error("value 0 is reserved for MISSING and cannot be stored (key {key})")]
    ReservedValue { key: u64 },
}

impl Error {
    pub fn empty_geometry<S: Into<String>>(source_id: S) -> Self {
        Error::EmptyGeometry {
            source_id: source_id.into(),
        }
    }

    pub fn geometry<S: Into<String>>(msg: S) -> Self {
        Error::Geometry(msg.into())
    }

    pub fn robustness<S: Into<String>>(stage: S, tag: S) -> Self {
        Error::GeometryRobustness {
            stage: stage.into(),
            tag: tag.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robustness_error_names_stage_and_tag() {
        let err = Error::robustness("write_tile_features", "snap_third_time_failed");
        assert_eq!(
            err.to_string(),
            "geometry robustness failure at stage 'write_tile_features': snap_third_time_failed"
        );
    }

    #[test]
    fn reserved_value_names_offending_key() {
        let err = Error::ReservedValue { key: 42 };
        assert!(err.to_string().contains("42"));
    }
}
