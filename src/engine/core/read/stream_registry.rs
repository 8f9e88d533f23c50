use std::collections::{BTreeMap, HashMap};

use crate::engine::core::column::serialization::{deserialize_fixed, deserialize_leaf};
use crate::engine::core::column::stream_path::{is_shared_nested_sizes, stream_file_stem};
use crate::engine::core::column::{Column, DataType, Substream, SubstreamPath};
use crate::engine::core::io::CompressedRead;
use crate::engine::core::read::stream::{Stream, StreamRead};
use crate::engine::errors::{LogicError, PartReadError};

const HINT_MIN_ROWS: usize = 10;
const HINT_MAX_VALUE_SIZE: f64 = 1024.0;

/// Mark range being read, plus sizes of nested tables already read for it.
pub struct RangeRead<'a> {
    pub from_mark: usize,
    pub to_mark: usize,
    pub shared_sizes: &'a mut HashMap<String, Vec<u64>>,
}

/// Streams of a reader by file stem, and the per-stream value size hints.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: BTreeMap<String, Stream>,
    avg_value_size_hints: BTreeMap<String, f64>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.streams.contains_key(stem)
    }

    pub fn insert(&mut self, stream: Stream) {
        self.streams.insert(stream.stem().to_string(), stream);
    }

    pub fn get(&self, stem: &str) -> Option<&Stream> {
        self.streams.get(stem)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn avg_value_size_hints(&self) -> &BTreeMap<String, f64> {
        &self.avg_value_size_hints
    }

    pub fn seed_value_size_hints(&mut self, hints: BTreeMap<String, f64>) {
        self.avg_value_size_hints.extend(hints);
    }

    /// Decodes up to `rows` rows of `column` for the range into `out`,
    /// descending through every stream of its type.
    pub fn read_column(
        &mut self,
        name: &str,
        data_type: &DataType,
        out: &mut Column,
        rows: usize,
        range: &mut RangeRead<'_>,
    ) -> Result<usize, PartReadError> {
        self.read_data(name, data_type, out, &mut Vec::new(), rows, range)
    }

    fn read_data(
        &mut self,
        name: &str,
        data_type: &DataType,
        out: &mut Column,
        path: &mut SubstreamPath,
        limit: usize,
        range: &mut RangeRead<'_>,
    ) -> Result<usize, PartReadError> {
        match (data_type, out) {
            (DataType::Array(element), Column::Array { offsets, data }) => {
                path.push(Substream::ArraySizes);
                let sizes = self.read_sizes(name, path, limit, range);
                path.pop();
                let sizes = sizes?;

                let start = offsets.last().copied().unwrap_or(0);
                let mut end = start;
                offsets.extend(sizes.iter().map(|size| {
                    end += size;
                    end
                }));
                let expected = (end - start) as usize;

                path.push(Substream::ArrayElements);
                let read = self.read_data(name, element, data, path, expected, range);
                path.pop();
                let read = read?;
                if read != expected {
                    return Err(PartReadError::Corrupted(format!(
                        "cannot read array data: read {read} of {expected} elements"
                    )));
                }
                Ok(sizes.len())
            }
            (DataType::Nullable(inner), Column::Nullable { null_map, nested }) => {
                path.push(Substream::NullMap);
                let stem = stream_file_stem(name, path);
                path.pop();
                let rows = self.read_stream(&stem, range, |reader| {
                    deserialize_fixed(reader, null_map, limit)
                })?;

                path.push(Substream::NullableElements);
                let read = self.read_data(name, inner, nested, path, rows, range);
                path.pop();
                let read = read?;
                if read != rows {
                    return Err(PartReadError::Corrupted(format!(
                        "null map has {rows} rows but values have {read}"
                    )));
                }
                Ok(rows)
            }
            (DataType::Tuple(elems), Column::Tuple(columns)) => {
                let mut rows = None;
                for (i, (elem, column)) in elems.iter().zip(columns.iter_mut()).enumerate() {
                    path.push(Substream::TupleElement(i));
                    let read = self.read_data(name, elem, column, path, limit, range);
                    path.pop();
                    let read = read?;
                    match rows {
                        Some(prev) if prev != read => {
                            return Err(PartReadError::Corrupted(format!(
                                "tuple elements have different sizes: {prev} and {read}"
                            )));
                        }
                        _ => rows = Some(read),
                    }
                }
                Ok(rows.unwrap_or(0))
            }
            (_, out) => {
                let stem = stream_file_stem(name, path);
                if let (Some(hint), Column::String { chars, .. }) =
                    (self.avg_value_size_hints.get(&stem), &mut *out)
                {
                    chars.reserve((hint * limit as f64) as usize);
                }
                self.read_stream(&stem, range, |reader| deserialize_leaf(reader, out, limit))
            }
        }
    }

    /// Array sizes; the level-0 sizes of a nested table are read once per
    /// range and handed to every column of the table.
    fn read_sizes(
        &mut self,
        name: &str,
        path: &[Substream],
        limit: usize,
        range: &mut RangeRead<'_>,
    ) -> Result<Vec<u64>, PartReadError> {
        let stem = stream_file_stem(name, path);
        let shared = is_shared_nested_sizes(name, path);
        if shared {
            if let Some(sizes) = range.shared_sizes.get(&stem) {
                return Ok(sizes.clone());
            }
        }
        let mut sizes = Vec::with_capacity(limit);
        self.read_stream(&stem, range, |reader| {
            deserialize_fixed(reader, &mut sizes, limit)
        })?;
        if shared {
            range.shared_sizes.insert(stem, sizes.clone());
        }
        Ok(sizes)
    }

    fn read_stream<F>(
        &mut self,
        stem: &str,
        range: &RangeRead<'_>,
        decode: F,
    ) -> Result<usize, PartReadError>
    where
        F: FnOnce(&mut dyn CompressedRead) -> Result<usize, PartReadError>,
    {
        let stream = self
            .streams
            .get_mut(stem)
            .ok_or_else(|| LogicError::MissingStream(stem.to_string()))?;
        let read = stream.read_marks(range.from_mark, range.to_mark, decode)?;
        self.update_value_size_hint(stem, read);
        Ok(read.rows)
    }

    /// Rises at once to a larger observed average, decays slowly when the
    /// observation falls under half the hint.
    fn update_value_size_hint(&mut self, stem: &str, read: StreamRead) {
        if read.rows <= HINT_MIN_ROWS {
            return;
        }
        let observed = read.bytes as f64 / read.rows as f64;
        let hint = self
            .avg_value_size_hints
            .entry(stem.to_string())
            .or_insert(0.0);
        if observed > *hint {
            *hint = observed.min(HINT_MAX_VALUE_SIZE);
        } else if observed * 2.0 < *hint {
            *hint = (observed + *hint * 3.0) / 4.0;
        }
    }
}
