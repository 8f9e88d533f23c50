use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{Level, debug, info};

use crate::engine::core::column::stream_path::column_stream_stems;
use crate::engine::core::column::{Block, Column};
use crate::engine::core::io::{ReadInstrumentation, SeekStats};
use crate::engine::core::mark::MarkRange;
use crate::engine::core::part::{DataPart, NameAndType, StorageContext};
use crate::engine::core::read::cache::{
    LruMarkCache, LruUncompressedCache, MarkCache, UncompressedCache,
};
use crate::engine::core::read::missing_columns::fill_missing_columns;
use crate::engine::core::read::settings::ReaderSettings;
use crate::engine::core::read::stream::{DATA_FILE_EXTENSION, Stream, StreamOptions};
use crate::engine::core::read::stream_registry::{RangeRead, StreamRegistry};
use crate::engine::errors::{ConfigError, LogicError, PartReadError};
use crate::shared::config::CacheConfig;

/// Caches a reader may use; either can be absent.
#[derive(Debug, Clone, Default)]
pub struct ReaderCaches {
    pub mark_cache: Option<Arc<dyn MarkCache>>,
    pub uncompressed_cache: Option<Arc<dyn UncompressedCache>>,
}

impl ReaderCaches {
    pub fn none() -> Self {
        Self::default()
    }

    /// LRU caches sized from configuration; a zero uncompressed size
    /// disables that cache.
    pub fn from_config(config: &CacheConfig) -> Self {
        let uncompressed_cache: Option<Arc<dyn UncompressedCache>> =
            if config.uncompressed_cache_max_bytes > 0 {
                Some(Arc::new(LruUncompressedCache::new(
                    config.uncompressed_cache_max_bytes,
                )))
            } else {
                None
            };
        Self {
            mark_cache: Some(Arc::new(LruMarkCache::new(config.mark_cache_max_entries))),
            uncompressed_cache,
        }
    }
}

/// Reads mark ranges of one data part into blocks.
///
/// Streams are opened once at construction for every physical file the
/// requested columns need, each positioned at the first mark any of
/// `all_mark_ranges` starts at. Reading ranges in increasing order lets every
/// stream continue where the previous range ended without seeking.
#[derive(Debug)]
pub struct PartReader {
    data_part: Arc<DataPart>,
    storage: Arc<StorageContext>,
    columns: Vec<NameAndType>,
    /// Per column: every stream it needs exists in the part.
    readable: Vec<bool>,
    registry: StreamRegistry,
}

impl PartReader {
    pub fn new(
        data_part: Arc<DataPart>,
        columns: Vec<NameAndType>,
        caches: ReaderCaches,
        storage: Arc<StorageContext>,
        all_mark_ranges: &[MarkRange],
        settings: &ReaderSettings,
        instrumentation: ReadInstrumentation,
    ) -> Result<Self, PartReadError> {
        if !data_part.path.is_dir() {
            return Err(ConfigError::PartPathMissing(data_part.path.clone()).into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(ConfigError::DuplicateColumn(dup.name.clone()).into());
        }
        let marks_count = data_part.marks_count;
        for range in all_mark_ranges {
            check_range(range.begin, range.end, marks_count)?;
        }

        let mut registry = StreamRegistry::new();
        let mut readable = Vec::with_capacity(columns.len());
        for column in &columns {
            let stems = column_stream_stems(&column.name, &column.data_type);
            for stem in &stems {
                if registry.contains(stem) {
                    continue;
                }
                let stream = Stream::open(
                    stem,
                    StreamOptions {
                        part_path: &data_part.path,
                        marks_count,
                        all_mark_ranges,
                        mark_cache: caches.mark_cache.clone(),
                        uncompressed_cache: caches.uncompressed_cache.clone(),
                        settings,
                        instrumentation: &instrumentation,
                        file_size: data_part.file_size(&format!("{stem}{DATA_FILE_EXTENSION}")),
                    },
                )
                .map_err(|e| e.in_column(&column.name))?;
                registry.insert(stream);
            }
            readable.push(
                stems
                    .iter()
                    .all(|stem| registry.get(stem).is_some_and(|s| !s.is_empty())),
            );
        }

        info!(
            target: "part_reader::reader",
            part = %data_part.name,
            columns = columns.len(),
            streams = registry.len(),
            ranges = all_mark_ranges.len(),
            "Created part reader"
        );

        Ok(Self {
            data_part,
            storage,
            columns,
            readable,
            registry,
        })
    }

    /// Starts with the value size hints gathered by an earlier reader.
    pub fn with_value_size_hints(mut self, hints: BTreeMap<String, f64>) -> Self {
        self.registry.seed_value_size_hints(hints);
        self
    }

    pub fn avg_value_size_hints(&self) -> &BTreeMap<String, f64> {
        self.registry.avg_value_size_hints()
    }

    pub fn columns(&self) -> &[NameAndType] {
        &self.columns
    }

    pub fn data_part(&self) -> &DataPart {
        &self.data_part
    }

    pub fn stream(&self, stem: &str) -> Option<&Stream> {
        self.registry.get(stem)
    }

    pub fn seek_stats(&self, stem: &str) -> Option<SeekStats> {
        self.registry.get(stem).map(Stream::seek_stats)
    }

    /// Appends the rows of marks `[from_mark, to_mark)` to `block` and
    /// returns how many rows were read. Columns without files in this part
    /// are skipped. On error `block` is left as it was.
    pub fn read_range(
        &mut self,
        from_mark: usize,
        to_mark: usize,
        block: &mut Block,
    ) -> Result<usize, PartReadError> {
        self.read_range_impl(from_mark, to_mark, block)
            .map_err(|e| {
                if !e.is_logic_error() {
                    self.storage.report_broken_part(&self.data_part.name);
                }
                PartReadError::Range {
                    part: self.data_part.path.clone(),
                    from_mark,
                    to_mark,
                    source: Box::new(e),
                }
            })
    }

    fn read_range_impl(
        &mut self,
        from_mark: usize,
        to_mark: usize,
        block: &mut Block,
    ) -> Result<usize, PartReadError> {
        check_range(from_mark, to_mark, self.data_part.marks_count)?;
        let rows = (to_mark - from_mark) * self.storage.index_granularity;

        let mut shared_sizes = HashMap::new();
        let mut range = RangeRead {
            from_mark,
            to_mark,
            shared_sizes: &mut shared_sizes,
        };
        let mut decoded = Vec::with_capacity(self.columns.len());
        for (column, readable) in self.columns.iter().zip(&self.readable) {
            if !readable {
                continue;
            }
            if let Some(present) = block.get(&column.name) {
                if present.data_type != column.data_type {
                    return Err(LogicError::TypeMismatch {
                        column: column.name.clone(),
                        expected: present.data_type.to_string(),
                        actual: column.data_type.to_string(),
                    }
                    .into());
                }
            }
            let mut data = Column::empty(&column.data_type);
            self.registry
                .read_column(&column.name, &column.data_type, &mut data, rows, &mut range)
                .map_err(|e| e.in_column(&column.name))?;
            decoded.push((column, data));
        }

        let mut read_rows = 0;
        for (column, data) in decoded {
            read_rows = read_rows.max(data.len());
            match block.get_mut(&column.name) {
                Some(present) => present.column.append(&column.name, data)?,
                None => block.insert(column.name.clone(), column.data_type.clone(), data),
            }
        }

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                target: "part_reader::read_range",
                part = %self.data_part.name,
                from_mark,
                to_mark,
                rows = read_rows,
                "Read range"
            );
        }
        Ok(read_rows)
    }

    /// Default-fills columns of `ordered_names` missing from `block`; see
    /// [`fill_missing_columns`].
    pub fn fill_missing_columns<S: AsRef<str>>(
        &self,
        block: &mut Block,
        ordered_names: &[S],
        always_reorder: bool,
    ) -> Result<(), PartReadError> {
        fill_missing_columns(block, &self.columns, ordered_names, always_reorder)
    }

    pub fn fill_missing_columns_and_reorder<S: AsRef<str>>(
        &self,
        block: &mut Block,
        ordered_names: &[S],
    ) -> Result<(), PartReadError> {
        self.fill_missing_columns(block, ordered_names, true)
    }
}

fn check_range(from_mark: usize, to_mark: usize, marks_count: usize) -> Result<(), LogicError> {
    if from_mark >= to_mark || to_mark > marks_count {
        return Err(LogicError::InvalidMarkRange {
            from_mark,
            to_mark,
            marks_count,
        });
    }
    Ok(())
}
