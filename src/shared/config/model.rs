use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub storage: StorageConfig,
    pub reader: ReaderConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Rows per mark in every part written by the engine.
    pub index_granularity: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReaderConfig {
    /// Estimated bytes to read above which files are memory-mapped instead
    /// of read through a buffer. 0 disables the switch.
    #[serde(default)]
    pub aio_threshold: usize,
    #[serde(default = "default_max_read_buffer_size")]
    pub max_read_buffer_size: usize,
    /// When false, marks missing from the mark cache are loaded but not
    /// inserted, to avoid evicting hotter entries.
    #[serde(default = "default_save_marks_in_cache")]
    pub save_marks_in_cache: bool,
}

#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    pub mark_cache_max_entries: usize,
    /// 0 disables the uncompressed block cache.
    pub uncompressed_cache_max_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

fn default_max_read_buffer_size() -> usize {
    1024 * 1024
}

fn default_save_marks_in_cache() -> bool {
    true
}

pub const CONFIG_ENV_VAR: &str = "PART_READER_CONFIG";

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| "config".to_string());
    load_settings_from(&config_path)
}

pub fn load_settings_from(config_path: &str) -> Result<Settings, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(config_path))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
