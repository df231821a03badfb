//! The statistics sink: an external collaborator the renderer and mmap table report through
//! instead of owning any metrics surface themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Observability hook implemented by the embedder. None of this crate's own code reads these
/// counters back; they exist purely so a caller can wire them into its own metrics stack.
pub trait Stats: Send + Sync {
    /// Called once per source element the renderer processes, tagged with the element kind
    /// (e.g. `"point"`, `"polygon"`) and the destination layer name.
    fn processed_element(&self, _kind: &str, _layer: &str) {}

    /// Called once per tile/layer write with the number of features emitted.
    fn emitted_features(&self, _z: u8, _layer: &str, _count: usize) {}

    /// Called whenever a recoverable data problem occurs (e.g. a repair-pipeline retry), tagged
    /// with a short machine-readable label such as `"snap_third_time_failed"`.
    fn data_error(&self, _tag: &str) {}
}

/// A [`Stats`] implementation that discards everything. Suitable for tests and for embedders
/// that don't care about these counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStats;

impl Stats for NoopStats {}

/// An atomics-backed [`Stats`] implementation for tests that need to assert on call counts.
#[derive(Debug, Default)]
pub struct AtomicStats {
    processed: AtomicU64,
    emitted: AtomicU64,
    errors: Mutex<Vec<String>>,
}

impl AtomicStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn error_tags(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Stats for AtomicStats {
    fn processed_element(&self, _kind: &str, _layer: &str) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn emitted_features(&self, _z: u8, _layer: &str, count: usize) {
        self.emitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn data_error(&self, tag: &str) {
        self.errors.lock().unwrap().push(tag.to_string());
    }
}
