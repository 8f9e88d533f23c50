use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::warn;

use crate::engine::core::part::data_part::NameAndType;
use crate::engine::errors::ConfigError;
use crate::shared::config::Settings;

/// Told about parts whose files failed to read, so they can be checked.
pub trait BrokenPartReporter: Send + Sync + Debug {
    fn report_broken_part(&self, part_name: &str);
}

/// Table-wide facts a part reader needs from its storage.
#[derive(Debug, Clone)]
pub struct StorageContext {
    pub index_granularity: usize,
    columns: Vec<NameAndType>,
    broken_part_reporter: Option<Arc<dyn BrokenPartReporter>>,
}

impl StorageContext {
    pub fn new(index_granularity: usize, columns: Vec<NameAndType>) -> Self {
        Self {
            index_granularity,
            columns,
            broken_part_reporter: None,
        }
    }

    pub fn from_settings(settings: &Settings, columns: Vec<NameAndType>) -> Self {
        Self::new(settings.storage.index_granularity, columns)
    }

    pub fn with_broken_part_reporter(mut self, reporter: Arc<dyn BrokenPartReporter>) -> Self {
        self.broken_part_reporter = Some(reporter);
        self
    }

    pub fn columns(&self) -> &[NameAndType] {
        &self.columns
    }

    /// Typed columns for `names`, in the given order.
    pub fn resolve_columns<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<NameAndType>, ConfigError> {
        let mut seen = HashSet::new();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if !seen.insert(name) {
                    return Err(ConfigError::DuplicateColumn(name.to_string()));
                }
                self.columns
                    .iter()
                    .find(|c| c.name == name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownColumn(name.to_string()))
            })
            .collect()
    }

    pub fn report_broken_part(&self, part_name: &str) {
        warn!(target: "part_reader::storage", part = part_name, "Reporting broken part");
        if let Some(reporter) = &self.broken_part_reporter {
            reporter.report_broken_part(part_name);
        }
    }
}
