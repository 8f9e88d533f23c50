use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tracing::{Level, debug};

use super::cache_keys::MarkCacheKey;
use super::cache_stats::CacheStats;
use crate::engine::core::mark::MarksInCompressedFile;

/// Shared store of decoded marks. Implementations are internally synchronized;
/// published entries are immutable.
pub trait MarkCache: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &MarkCacheKey) -> Option<MarksInCompressedFile>;
    fn put(&self, key: MarkCacheKey, marks: MarksInCompressedFile);
}

#[derive(Debug)]
pub struct LruMarkCache {
    inner: Mutex<LruCache<MarkCacheKey, MarksInCompressedFile>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LruMarkCache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            current_weight: guard.len(),
            capacity: guard.cap().get(),
        }
    }
}

impl MarkCache for LruMarkCache {
    fn get(&self, key: &MarkCacheKey) -> Option<MarksInCompressedFile> {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match guard.get(key) {
            Some(marks) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(marks.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: MarkCacheKey, marks: MarksInCompressedFile) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((evicted, _)) = guard.push(key.clone(), marks) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                if tracing::enabled!(Level::DEBUG) {
                    debug!(
                        target: "cache::marks::evict",
                        path = %evicted.path.display(),
                        "Evicted marks"
                    );
                }
            }
        }
    }
}
