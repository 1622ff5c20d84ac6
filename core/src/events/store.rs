use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{DepositEvent, EventCache};
use crate::error::{Error, Result};

/// Per-denomination persisted deposit history
///
/// The synchronizer is the only writer and only ever appends validated
/// events or cuts the sequence back to a validated prefix.
pub trait EventStore: Send + Sync {
    /// Cached events and watermark, empty if nothing was stored yet
    fn load(&self, label: &str) -> Result<EventCache>;

    /// Append `events` and move the watermark to `last_block`
    fn append(&self, label: &str, events: &[DepositEvent], last_block: Option<u64>)
    -> Result<()>;

    /// Keep only the first `len` events; the watermark drops to just before
    /// the block of the last kept event so that block is scanned again
    fn truncate(&self, label: &str, len: usize) -> Result<()>;
}

/// Highest block known to be fully scanned when `last` is the newest event kept
pub(super) fn rescan_watermark(last: Option<&DepositEvent>) -> Option<u64> {
    last.and_then(|e| e.block_number.checked_sub(1))
}

fn truncated(mut cache: EventCache, len: usize) -> EventCache {
    cache.events.truncate(len);
    cache.last_block = rescan_watermark(cache.events.last());
    cache
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryEventStore {
    caches: Mutex<HashMap<String, EventCache>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache, replacing whatever was stored for `label`
    pub fn insert(&self, label: &str, cache: EventCache) {
        if let Ok(mut caches) = self.caches.lock() {
            caches.insert(label.to_string(), cache);
        }
    }

    fn with_caches<T>(&self, f: impl FnOnce(&mut HashMap<String, EventCache>) -> T) -> Result<T> {
        let mut caches = self
            .caches
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("event store lock poisoned")))?;
        Ok(f(&mut caches))
    }
}

impl EventStore for MemoryEventStore {
    fn load(&self, label: &str) -> Result<EventCache> {
        self.with_caches(|caches| caches.get(label).cloned().unwrap_or_default())
    }

    fn append(
        &self,
        label: &str,
        events: &[DepositEvent],
        last_block: Option<u64>,
    ) -> Result<()> {
        self.with_caches(|caches| {
            let cache = caches.entry(label.to_string()).or_default();
            cache.events.extend_from_slice(events);
            cache.last_block = last_block;
        })
    }

    fn truncate(&self, label: &str, len: usize) -> Result<()> {
        self.with_caches(|caches| {
            let cache = caches.remove(label).unwrap_or_default();
            caches.insert(label.to_string(), truncated(cache, len));
        })
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Cache file of one denomination, e.g. `deposits_eth_0.1.json`
pub fn cache_file_name(label: &str) -> String {
    format!("deposits_eth_{}.json", label)
}

/// One pretty-printed JSON file per denomination under `dir`
pub struct FileEventStore {
    dir: PathBuf,
}

impl FileEventStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(cache_file_name(label))
    }

    fn write(&self, label: &str, cache: &EventCache) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(label);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(cache)?)?;
        fs::rename(&tmp, &path)?;
        debug!(
            "wrote {} events (last block {:?}) to {}",
            cache.events.len(),
            cache.last_block,
            path.display()
        );
        Ok(())
    }

    fn read(path: &Path) -> Result<EventCache> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EventCache::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl EventStore for FileEventStore {
    fn load(&self, label: &str) -> Result<EventCache> {
        Self::read(&self.path_for(label))
    }

    fn append(
        &self,
        label: &str,
        events: &[DepositEvent],
        last_block: Option<u64>,
    ) -> Result<()> {
        let mut cache = self.load(label)?;
        cache.events.extend_from_slice(events);
        cache.last_block = last_block;
        self.write(label, &cache)
    }

    fn truncate(&self, label: &str, len: usize) -> Result<()> {
        let cache = truncated(self.load(label)?, len);
        self.write(label, &cache)
    }
}
