use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::core::column::DataType;
use crate::engine::errors::{ConfigError, PartReadError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAndType {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl NameAndType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    pub file_size: u64,
    pub crc32: u32,
}

/// Metadata of one immutable part, stored next to its files as `part.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPart {
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub marks_count: usize,
    pub rows_count: u64,
    pub columns: Vec<NameAndType>,
    #[serde(default)]
    pub checksums: BTreeMap<String, FileChecksum>,
}

impl DataPart {
    pub const METADATA_FILE: &'static str = "part.json";

    pub fn load(path: &Path) -> Result<Self, PartReadError> {
        if !path.is_dir() {
            return Err(ConfigError::PartPathMissing(path.to_path_buf()).into());
        }
        let metadata_path = path.join(Self::METADATA_FILE);
        let raw = fs::read(&metadata_path).map_err(|e| PartReadError::io(&metadata_path, e))?;
        let mut part: DataPart = serde_json::from_slice(&raw).map_err(|e| {
            ConfigError::Metadata(format!("{}: {e}", metadata_path.display()))
        })?;
        part.path = path.to_path_buf();
        debug!(
            target: "part_reader::part",
            part = %part.name,
            marks = part.marks_count,
            rows = part.rows_count,
            "Loaded part metadata"
        );
        Ok(part)
    }

    pub fn save(&self) -> Result<(), PartReadError> {
        let metadata_path = self.path.join(Self::METADATA_FILE);
        let raw = serde_json::to_vec_pretty(self)
            .map_err(|e| ConfigError::Metadata(e.to_string()))?;
        fs::write(&metadata_path, raw).map_err(|e| PartReadError::io(&metadata_path, e))
    }

    /// Size recorded for `file_name` in the checksums.
    pub fn file_size(&self, file_name: &str) -> Option<u64> {
        self.checksums.get(file_name).map(|c| c.file_size)
    }

    pub fn column(&self, name: &str) -> Option<&NameAndType> {
        self.columns.iter().find(|c| c.name == name)
    }
}
