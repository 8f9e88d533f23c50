use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::shared::config::model::{CONFIG_ENV_VAR, Settings, load_settings};

/// Engine settings, loaded on first access from the file named by
/// `PART_READER_CONFIG` (default `config.toml`).
pub static CONFIG: Lazy<Arc<Settings>> = Lazy::new(|| match load_settings() {
    Ok(settings) => Arc::new(settings),
    Err(e) => panic!("part_reader configuration (${CONFIG_ENV_VAR}) could not be loaded: {e}"),
});
