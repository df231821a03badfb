//! A disk-backed, memory-mapped `u64 -> u64` table, used to resolve node identifiers to packed
//! coordinates. Supports many concurrent writers during a write phase, then transitions once
//! into a read-only, memory-mapped phase.

pub mod table;
pub mod writer;

pub use table::{LongLongTable, MAX_PENDING, MISSING, SEG_BITS, SEG_BYTES};
pub use writer::TableWriter;
