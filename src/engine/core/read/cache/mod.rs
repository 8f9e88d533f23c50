pub mod cache_keys;
pub mod cache_stats;
pub mod decompressed_block;
pub mod mark_cache;
pub mod uncompressed_cache;

pub use cache_keys::{MarkCacheKey, UncompressedCacheKey};
pub use cache_stats::CacheStats;
pub use decompressed_block::DecompressedBlock;
pub use mark_cache::{LruMarkCache, MarkCache};
pub use uncompressed_cache::{LruUncompressedCache, UncompressedCache};
