#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries for the mark cache, bytes for the uncompressed cache.
    pub current_weight: usize,
    pub capacity: usize,
}
