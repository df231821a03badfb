//! The disk-backed long->long table: parallel writers during a write phase, then a one-way
//! transition into a memory-mapped, read-only phase.
//!
//! Concurrency is simplified relative to the fully lock-free design this is grounded on: cross-
//! segment transitions (including the bounded-pending-buffer semaphore wait) run under one
//! table-wide [`Mutex`], rather than only contending on the semaphore outside any lock. Segment
//! boundaries are rare (every 128 MiB of key space) so this trades a small amount of concurrency
//! for a table whose correctness doesn't depend on a more intricate lock-free handoff.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};

use crate::error::{Error, Result};

/// Bits of the byte offset that select a segment: `key * 8 >> SEG_BITS`.
pub const SEG_BITS: u32 = 27;
/// Size of one segment, in bytes (128 MiB).
pub const SEG_BYTES: u64 = 1 << SEG_BITS;
/// Maximum number of pending (unflushed) segment buffers held in memory at once.
pub const MAX_PENDING: usize = 20;
/// Sentinel value meaning "no entry for this key". Writers must never store it.
pub const MISSING: u64 = 0;

struct Semaphore {
    count: Mutex<usize>,
    condvar: Condvar,
    max: usize,
}

impl Semaphore {
    fn new(max: usize) -> Self {
        Self {
            count: Mutex::new(0),
            condvar: Condvar::new(),
            max,
        }
    }

    fn acquire(&self) {
        let mut count = self.count.lock().unwrap();
        while *count >= self.max {
            count = self.condvar.wait(count).unwrap();
        }
        *count += 1;
    }

    fn release(&self) {
        let mut count = self.count.lock().unwrap();
        *count -= 1;
        self.condvar.notify_one();
    }
}

pub(crate) struct WriteState {
    file: Option<File>,
    pending: HashMap<u64, Arc<Mutex<Vec<u8>>>>,
    writer_positions: HashMap<u64, u64>,
}

struct MappedTable {
    mmap: memmap2::Mmap,
}

impl MappedTable {
    fn get(&self, key: u64) -> u64 {
        let offset = (key * 8) as usize;
        if offset + 8 > self.mmap.len() {
            return MISSING;
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.mmap[offset..offset + 8]);
        u64::from_le_bytes(bytes)
    }
}

/// A disk-backed, parallel-writer key->value table over dense `u64` keys.
pub struct LongLongTable {
    path: PathBuf,
    write: Mutex<WriteState>,
    semaphore: Semaphore,
    next_writer_id: AtomicU64,
    sealed: AtomicBool,
    seal_lock: Mutex<()>,
    mapped: RwLock<Option<Arc<MappedTable>>>,
}

impl LongLongTable {
    /// Create a new table backed by a fresh file at `path`, truncating any existing content.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            write: Mutex::new(WriteState {
                file: Some(file),
                pending: HashMap::new(),
                writer_positions: HashMap::new(),
            }),
            semaphore: Semaphore::new(MAX_PENDING),
            next_writer_id: AtomicU64::new(0),
            sealed: AtomicBool::new(false),
            seal_lock: Mutex::new(()),
            mapped: RwLock::new(None),
        })
    }

    /// A new, independent writer handle. Safe to use concurrently with other handles on other
    /// threads; a single handle must only be used from one thread at a time.
    pub fn new_writer(&self) -> super::writer::TableWriter<'_> {
        let id = self.next_writer_id.fetch_add(1, Ordering::Relaxed);
        self.write.lock().unwrap().writer_positions.insert(id, 0);
        super::writer::TableWriter {
            table: self,
            id,
            current: RefCell::new(None),
            last_key: Cell::new(None),
        }
    }

    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Remove a writer's advertised position so it no longer blocks eviction once dropped.
    pub(crate) fn forget_writer(&self, writer_id: u64) {
        self.write.lock().unwrap().writer_positions.remove(&writer_id);
    }

    pub(crate) fn transition(&self, writer_id: u64, segment: u64) -> Result<Arc<Mutex<Vec<u8>>>> {
        if self.is_sealed() {
            return Err(Error::Sealed);
        }

        let mut state = self.write.lock().unwrap();
        state.writer_positions.insert(writer_id, segment);
        let min_segment = state.writer_positions.values().copied().min().unwrap_or(segment);

        let to_evict: Vec<u64> = state
            .pending
            .keys()
            .copied()
            .filter(|&s| s < min_segment)
            .collect();
        for s in to_evict {
            if let Some(buf) = state.pending.remove(&s) {
                Self::flush_segment(&mut state, s, &buf)?;
                self.semaphore.release();
            }
        }

        if let Some(existing) = state.pending.get(&segment) {
            return Ok(Arc::clone(existing));
        }
        drop(state);

        self.semaphore.acquire();

        let mut state = self.write.lock().unwrap();
        if let Some(existing) = state.pending.get(&segment) {
            // Another writer created this segment's buffer while we waited for a permit.
            self.semaphore.release();
            return Ok(Arc::clone(existing));
        }
        let buf = Arc::new(Mutex::new(vec![0u8; SEG_BYTES as usize]));
        state.pending.insert(segment, Arc::clone(&buf));
        Ok(buf)
    }

    fn flush_segment(state: &mut WriteState, segment: u64, buf: &Arc<Mutex<Vec<u8>>>) -> Result<()> {
        let data = buf.lock().unwrap();
        let file = state.file.as_mut().expect("write file handle open before seal");
        file.seek(SeekFrom::Start(segment * SEG_BYTES))?;
        file.write_all(&data)?;
        Ok(())
    }

    /// Flush remaining pending buffers, close the write channel, and memory-map the file
    /// read-only. Idempotent; safe to call from multiple threads concurrently (double-checked
    /// under [`Self::seal_lock`]).
    pub fn seal(&self) -> Result<()> {
        if self.is_sealed() {
            return Ok(());
        }
        let _guard = self.seal_lock.lock().unwrap();
        if self.is_sealed() {
            return Ok(());
        }

        {
            let mut state = self.write.lock().unwrap();
            let pending = std::mem::take(&mut state.pending);
            for (segment, buf) in pending {
                Self::flush_segment(&mut state, segment, &buf)?;
            }
            if let Some(mut file) = state.file.take() {
                file.flush()?;
            }
        }

        let file = OpenOptions::new().read(true).open(&self.path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        *self.mapped.write().unwrap() = Some(Arc::new(MappedTable { mmap }));
        self.sealed.store(true, Ordering::Release);
        Ok(())
    }

    /// Same as [`Self::seal`]; the upstream name for the write-to-read transition.
    pub fn init(&self) -> Result<()> {
        self.seal()
    }

    /// Look up `key`. Seals the table on first call if it hasn't been sealed already.
    pub fn get(&self, key: u64) -> Result<u64> {
        if !self.is_sealed() {
            self.seal()?;
        }
        let guard = self.mapped.read().unwrap();
        let mapped = guard.as_ref().expect("seal() populates the mapped table");
        Ok(mapped.get(key))
    }

    /// Size of the backing file, in bytes.
    pub fn disk_usage_bytes(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// This table's resident memory is entirely OS-paged-in mmap pages, not counted here.
    pub fn estimate_memory_usage_bytes(&self) -> u64 {
        0
    }

    /// Unmap, drop the read handle, and delete the backing file. Idempotent.
    pub fn close(&self) -> Result<()> {
        *self.mapped.write().unwrap() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }
}
