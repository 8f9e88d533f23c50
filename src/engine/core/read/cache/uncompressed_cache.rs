use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;

use super::cache_keys::UncompressedCacheKey;
use super::cache_stats::CacheStats;
use super::decompressed_block::DecompressedBlock;

/// Shared store of decompressed data blocks. Implementations are internally
/// synchronized; published blocks are immutable.
pub trait UncompressedCache: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &UncompressedCacheKey) -> Option<Arc<DecompressedBlock>>;
    fn put(&self, key: UncompressedCacheKey, block: Arc<DecompressedBlock>);
}

/// Byte-bounded LRU. The underlying `LruCache` is unbounded by count; we keep
/// a byte counter and pop LRU entries until back under capacity.
#[derive(Debug)]
pub struct LruUncompressedCache {
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug)]
struct Inner {
    blocks: LruCache<UncompressedCacheKey, Arc<DecompressedBlock>>,
    current_bytes: usize,
    capacity_bytes: usize,
}

impl LruUncompressedCache {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                blocks: LruCache::unbounded(),
                current_bytes: 0,
                capacity_bytes,
            }),
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
            current_weight: guard.current_bytes,
            capacity: guard.capacity_bytes,
        }
    }

    pub fn resize_bytes(&self, capacity_bytes: usize) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.capacity_bytes = capacity_bytes;
        self.evict_until_within_cap(&mut guard);
    }

    fn evict_until_within_cap(&self, inner: &mut Inner) {
        while inner.current_bytes > inner.capacity_bytes {
            match inner.blocks.pop_lru() {
                Some((_k, v)) => {
                    inner.current_bytes -= v.len();
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }
}

impl UncompressedCache for LruUncompressedCache {
    fn get(&self, key: &UncompressedCacheKey) -> Option<Arc<DecompressedBlock>> {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match guard.blocks.get(key) {
            Some(block) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(block))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: UncompressedCacheKey, block: Arc<DecompressedBlock>) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let size = block.len();
        if let Some(prev) = guard.blocks.put(key, block) {
            guard.current_bytes -= prev.len();
        }
        guard.current_bytes += size;
        self.evict_until_within_cap(&mut guard);
    }
}
