//! Per-writer handle over a [`super::table::LongLongTable`].

use std::cell::{Cell, RefCell};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

use super::table::{LongLongTable, SEG_BITS, SEG_BYTES};

/// A single writer's view of the table. Keys `put` through one handle must be non-decreasing;
/// different handles may write concurrently from different threads, each to its own key range.
pub struct TableWriter<'a> {
    pub(crate) table: &'a LongLongTable,
    pub(crate) id: u64,
    pub(crate) current: RefCell<Option<(u64, Arc<Mutex<Vec<u8>>>)>>,
    pub(crate) last_key: Cell<Option<u64>>,
}

impl<'a> TableWriter<'a> {
    /// Store `value` for `key`. `key` must be greater than or equal to every key previously
    /// passed to this handle; `value` must not be zero (`MISSING` is reserved for absent keys).
    /// Returns `Error::Sealed` once the table has transitioned to its read phase, even if `key`
    /// would have hit this handle's cached segment buffer.
    pub fn put(&self, key: u64, value: u64) -> Result<()> {
        if self.table.is_sealed() {
            return Err(Error::Sealed);
        }
        if value == 0 {
            return Err(Error::ReservedValue { key });
        }
        if let Some(last) = self.last_key.get() {
            if key < last {
                return Err(Error::NonMonotonicKey { key, last_key: last });
            }
        }

        let offset = key * 8;
        let segment = offset >> SEG_BITS;
        let local = (offset & (SEG_BYTES - 1)) as usize;

        let buf = {
            let cached = self.current.borrow();
            match &*cached {
                Some((seg, buf)) if *seg == segment => Some(Arc::clone(buf)),
                _ => None,
            }
        };
        let buf = match buf {
            Some(buf) => buf,
            None => {
                let buf = self.table.transition(self.id, segment)?;
                *self.current.borrow_mut() = Some((segment, Arc::clone(&buf)));
                buf
            }
        };

        {
            let mut data = buf.lock().unwrap();
            data[local..local + 8].copy_from_slice(&value.to_le_bytes());
        }
        self.last_key.set(Some(key));
        Ok(())
    }
}

impl Drop for TableWriter<'_> {
    fn drop(&mut self) {
        self.table.forget_writer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::super::table::LongLongTable;

    #[test]
    fn dropping_an_idle_writer_stops_it_blocking_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idle_writer.bin");
        let table = LongLongTable::new(&path).unwrap();

        let idle = table.new_writer();
        drop(idle);

        let writer = table.new_writer();
        let keys_per_segment = super::SEG_BYTES / 8;
        writer.put(0, 1).unwrap();
        writer.put(keys_per_segment, 2).unwrap();
        drop(writer);

        assert_eq!(table.get(0).unwrap(), 1);
        table.close().unwrap();
    }
}
