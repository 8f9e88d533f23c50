use crate::shared::config::ReaderConfig;

/// I/O tuning of a part reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Estimated bytes to read per file above which the file is
    /// memory-mapped. 0 disables mapping.
    pub aio_threshold: usize,
    pub max_read_buffer_size: usize,
    /// Insert marks loaded from disk into the mark cache.
    pub save_marks_in_cache: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            aio_threshold: 0,
            max_read_buffer_size: 1024 * 1024,
            save_marks_in_cache: true,
        }
    }
}

impl ReaderSettings {
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            aio_threshold: config.aio_threshold,
            max_read_buffer_size: config.max_read_buffer_size,
            save_marks_in_cache: config.save_marks_in_cache,
        }
    }
}
