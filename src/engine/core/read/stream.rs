use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{Level, debug, trace};

use crate::engine::core::io::{
    CachedBlockSource, CompressedRead, CompressedReadBuffer, FileBlockSource, FileReadOptions,
    ReadInstrumentation, SeekStats,
};
use crate::engine::core::mark::{Mark, MarkRange, MarksInCompressedFile, load_marks};
use crate::engine::core::read::cache::{MarkCache, MarkCacheKey, UncompressedCache};
use crate::engine::core::read::settings::ReaderSettings;
use crate::engine::errors::{LogicError, PartReadError};
use crate::shared::path::{absolutize, with_suffix};
use crate::shared::storage_header::BinaryHeader;

pub const DATA_FILE_EXTENSION: &str = ".bin";
pub const MARKS_FILE_EXTENSION: &str = ".mrk";

/// Marks either loaded by this stream or borrowed from the mark cache.
#[derive(Debug)]
enum LoadedMarks {
    Owned(Vec<Mark>),
    Shared(MarksInCompressedFile),
}

impl LoadedMarks {
    fn as_slice(&self) -> &[Mark] {
        match self {
            LoadedMarks::Owned(marks) => marks,
            LoadedMarks::Shared(marks) => marks,
        }
    }
}

/// Lazily loaded marks of one stream. Loaded at most once.
#[derive(Debug)]
pub struct MarkIndex {
    path: PathBuf,
    marks_count: usize,
    cache: Option<Arc<dyn MarkCache>>,
    save_in_cache: bool,
    loaded: Option<LoadedMarks>,
}

impl MarkIndex {
    pub fn new(
        path: PathBuf,
        marks_count: usize,
        cache: Option<Arc<dyn MarkCache>>,
        save_in_cache: bool,
    ) -> Self {
        Self {
            path,
            marks_count,
            cache,
            save_in_cache,
            loaded: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self.loaded, Some(LoadedMarks::Shared(_)))
    }

    pub fn get(&mut self, index: usize) -> Result<Mark, PartReadError> {
        if index >= self.marks_count {
            return Err(LogicError::MarkOutOfBounds {
                index,
                marks_count: self.marks_count,
            }
            .into());
        }
        let marks = match self.loaded.take() {
            Some(loaded) => loaded,
            None => self.load()?,
        };
        let mark = marks.as_slice()[index];
        self.loaded = Some(marks);
        Ok(mark)
    }

    fn load(&self) -> Result<LoadedMarks, PartReadError> {
        let Some(cache) = &self.cache else {
            return Ok(LoadedMarks::Owned(load_marks(&self.path, self.marks_count)?));
        };
        let key = MarkCacheKey::new(self.path.clone());
        if let Some(marks) = cache.get(&key) {
            if marks.len() != self.marks_count {
                return Err(PartReadError::Corrupted(format!(
                    "cached marks of {} hold {} entries, expected {}",
                    self.path.display(),
                    marks.len(),
                    self.marks_count
                )));
            }
            return Ok(LoadedMarks::Shared(marks));
        }

        let marks = load_marks(&self.path, self.marks_count)?;
        debug!(
            target: "part_reader::marks",
            path = %self.path.display(),
            count = marks.len(),
            save = self.save_in_cache,
            "Loaded marks from disk"
        );
        if !self.save_in_cache {
            return Ok(LoadedMarks::Owned(marks));
        }
        let shared: MarksInCompressedFile = marks.into();
        cache.put(key, Arc::clone(&shared));
        Ok(LoadedMarks::Shared(shared))
    }
}

#[derive(Debug)]
enum DataCursor {
    Cached(CompressedReadBuffer<CachedBlockSource>),
    Plain(CompressedReadBuffer<FileBlockSource>),
}

impl DataCursor {
    fn as_read(&mut self) -> &mut dyn CompressedRead {
        match self {
            DataCursor::Cached(buffer) => buffer,
            DataCursor::Plain(buffer) => buffer,
        }
    }

    fn seek_stats(&self) -> SeekStats {
        match self {
            DataCursor::Cached(buffer) => buffer.seek_stats(),
            DataCursor::Plain(buffer) => buffer.seek_stats(),
        }
    }
}

/// Where the data cursor stands with respect to the marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPosition {
    Unpositioned,
    At(usize),
}

/// Bytes and rows produced by one decode of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamRead {
    pub rows: usize,
    pub bytes: u64,
}

/// Everything a stream needs besides its own name.
pub struct StreamOptions<'a> {
    pub part_path: &'a Path,
    pub marks_count: usize,
    pub all_mark_ranges: &'a [MarkRange],
    pub mark_cache: Option<Arc<dyn MarkCache>>,
    pub uncompressed_cache: Option<Arc<dyn UncompressedCache>>,
    pub settings: &'a ReaderSettings,
    pub instrumentation: &'a ReadInstrumentation,
    /// Data file size recorded in part metadata, if any. Only used to
    /// estimate how much will be read.
    pub file_size: Option<u64>,
}

/// Read state of one physical stream (`<stem>.bin` + `<stem>.mrk`).
#[derive(Debug)]
pub struct Stream {
    stem: String,
    marks: MarkIndex,
    data: Option<DataCursor>,
    position: StreamPosition,
}

impl Stream {
    /// Placeholder for a stream whose data file does not exist in the part.
    pub fn empty(stem: impl Into<String>, marks_path: PathBuf) -> Self {
        Self {
            stem: stem.into(),
            marks: MarkIndex::new(marks_path, 0, None, false),
            data: None,
            position: StreamPosition::Unpositioned,
        }
    }

    pub fn open(stem: &str, options: StreamOptions<'_>) -> Result<Self, PartReadError> {
        let stream_path = absolutize(options.part_path.join(stem));
        let data_path = with_suffix(&stream_path, DATA_FILE_EXTENSION);
        let marks_path = with_suffix(&stream_path, MARKS_FILE_EXTENSION);

        let file_len = match fs::metadata(&data_path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    target: "part_reader::stream",
                    path = %data_path.display(),
                    "Data file is absent, stream is empty"
                );
                return Ok(Self::empty(stem, marks_path));
            }
            Err(e) => return Err(PartReadError::io(&data_path, e)),
        };

        let marks_count = options.marks_count;
        let settings = options.settings;
        let mut marks = MarkIndex::new(
            marks_path,
            marks_count,
            options.mark_cache,
            settings.save_marks_in_cache,
        );

        let buffer_size = compute_buffer_size(
            &mut marks,
            options.all_mark_ranges,
            marks_count,
            settings.max_read_buffer_size,
        )?;
        let estimated_size = if settings.aio_threshold > 0 {
            // Checksummed sizes only steer the estimate; reads stop at the real end of file.
            let file_size = options.file_size.unwrap_or(file_len);
            estimate_read_size(&mut marks, options.all_mark_ranges, marks_count, file_size)?
        } else {
            0
        };

        let first_mark = options
            .all_mark_ranges
            .iter()
            .map(|range| range.begin)
            .min()
            .unwrap_or(0);
        let start = if first_mark == 0 {
            Mark::new(BinaryHeader::TOTAL_LEN as u64, 0)
        } else {
            marks.get(first_mark)?
        };

        let file_options = FileReadOptions {
            start_offset: start.offset_in_compressed_file,
            estimated_size,
            aio_threshold: settings.aio_threshold,
            buffer_size,
            instrumentation: options.instrumentation.clone(),
        };
        let data = match options.uncompressed_cache {
            Some(cache) => DataCursor::Cached(CompressedReadBuffer::new(
                CachedBlockSource::new(data_path, file_len, file_options, cache),
                start,
            )),
            None => DataCursor::Plain(CompressedReadBuffer::new(
                FileBlockSource::open(&data_path, &file_options)?,
                start,
            )),
        };

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                target: "part_reader::stream",
                stream = stem,
                buffer_size,
                estimated_size,
                first_mark,
                cached = matches!(data, DataCursor::Cached(_)),
                "Opened stream"
            );
        }

        Ok(Self {
            stem: stem.to_string(),
            marks,
            data: Some(data),
            position: StreamPosition::At(first_mark),
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn position(&self) -> StreamPosition {
        self.position
    }

    pub fn marks_loaded(&self) -> bool {
        self.marks.is_loaded()
    }

    pub fn marks_from_cache(&self) -> bool {
        self.marks.is_from_cache()
    }

    pub fn get_mark(&mut self, index: usize) -> Result<Mark, PartReadError> {
        self.marks.get(index)
    }

    /// Positions the cursor at mark `index`. Free when already there.
    pub fn seek_to_mark(&mut self, index: usize) -> Result<(), PartReadError> {
        if self.data.is_none() || self.position == StreamPosition::At(index) {
            return Ok(());
        }
        let mark = self.marks.get(index)?;
        if let Some(data) = &mut self.data {
            data.as_read().seek(mark)?;
        }
        if tracing::enabled!(Level::TRACE) {
            trace!(
                target: "part_reader::stream",
                stream = %self.stem,
                index,
                ?mark,
                "Seek to mark"
            );
        }
        self.position = StreamPosition::At(index);
        Ok(())
    }

    /// Decodes the data of marks `[from, to)`. On success the stream is left
    /// at mark `to`; on failure it is unpositioned.
    pub fn read_marks<F>(
        &mut self,
        from: usize,
        to: usize,
        decode: F,
    ) -> Result<StreamRead, PartReadError>
    where
        F: FnOnce(&mut dyn CompressedRead) -> Result<usize, PartReadError>,
    {
        if self.data.is_none() {
            return Ok(StreamRead::default());
        }
        self.seek_to_mark(from)?;
        self.position = StreamPosition::Unpositioned;
        let Some(data) = &mut self.data else {
            return Ok(StreamRead::default());
        };
        let reader = data.as_read();
        let before = reader.bytes_consumed();
        let rows = decode(&mut *reader)?;
        let bytes = reader.bytes_consumed() - before;
        self.position = StreamPosition::At(to);
        Ok(StreamRead { rows, bytes })
    }

    pub fn seek_stats(&self) -> SeekStats {
        self.data
            .as_ref()
            .map(DataCursor::seek_stats)
            .unwrap_or_default()
    }
}

/// Smallest buffer that holds the largest compressed span of any range,
/// extended to the end of the block the range ends in.
pub(crate) fn compute_buffer_size(
    marks: &mut MarkIndex,
    ranges: &[MarkRange],
    marks_count: usize,
    max_read_buffer_size: usize,
) -> Result<usize, PartReadError> {
    let mut max_span = 0u64;
    for range in ranges {
        let mut right = range.end;
        if right < marks_count && marks.get(right)?.offset_in_decompressed_block > 0 {
            let end_offset = marks.get(range.end)?.offset_in_compressed_file;
            while right < marks_count && marks.get(right)?.offset_in_compressed_file == end_offset
            {
                right += 1;
            }
        }

        // Ranges reaching the end of the part read through to the last block.
        if right >= marks_count
            || (right + 1 == marks_count
                && marks.get(right)?.offset_in_compressed_file
                    == marks.get(range.end)?.offset_in_compressed_file)
        {
            max_span = max_read_buffer_size as u64;
            break;
        }

        let span = marks.get(right)?.offset_in_compressed_file
            - marks.get(range.begin)?.offset_in_compressed_file;
        max_span = max_span.max(span);
    }
    Ok((max_read_buffer_size as u64).min(max_span) as usize)
}

pub(crate) fn estimate_read_size(
    marks: &mut MarkIndex,
    ranges: &[MarkRange],
    marks_count: usize,
    file_size: u64,
) -> Result<u64, PartReadError> {
    let mut estimated = 0u64;
    for range in ranges {
        let begin = if range.begin > 0 {
            marks.get(range.begin)?.offset_in_compressed_file
        } else {
            0
        };
        let end = if range.end < marks_count {
            marks.get(range.end)?.offset_in_compressed_file
        } else {
            file_size
        };
        estimated += end.saturating_sub(begin);
    }
    Ok(estimated)
}
