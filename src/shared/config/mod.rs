pub mod global;
pub mod model;

pub use global::CONFIG;
pub use model::{CacheConfig, LoggingConfig, ReaderConfig, Settings, StorageConfig, load_settings};
