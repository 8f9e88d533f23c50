use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crc32fast::Hasher as Crc32Hasher;

use crate::engine::core::column::serialization::{FixedWidth, serialize_leaf};
use crate::engine::core::column::stream_path::{stream_file_stem, stream_paths};
use crate::engine::core::column::{Column, DataType, Substream};
use crate::engine::core::compression::{METHOD_LZ4, codec_for, compress_block};
use crate::engine::core::mark::{Mark, write_marks};
use crate::engine::core::part::{DataPart, FileChecksum, NameAndType};
use crate::shared::storage_header::{BinaryHeader, FileKind};

/// Writes a complete part directory: one `.bin`/`.mrk` pair per stream,
/// one mark per granule, and `part.json`.
pub struct PartWriterFactory {
    dir: PathBuf,
    name: String,
    index_granularity: usize,
    method: u8,
    max_block_size: usize,
    columns: Vec<(NameAndType, Column)>,
    metadata_only: Vec<NameAndType>,
}

impl PartWriterFactory {
    pub fn new() -> Self {
        Self {
            dir: PathBuf::from("/tmp/parts/all_1_1_0"),
            name: "all_1_1_0".to_string(),
            index_granularity: 10,
            method: METHOD_LZ4,
            max_block_size: 1 << 20,
            columns: Vec::new(),
            metadata_only: Vec::new(),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_granularity(mut self, rows: usize) -> Self {
        self.index_granularity = rows;
        self
    }

    pub fn with_method(mut self, method: u8) -> Self {
        self.method = method;
        self
    }

    /// Decompressed bytes gathered before a block is compressed and flushed.
    pub fn with_max_block_size(mut self, bytes: usize) -> Self {
        self.max_block_size = bytes;
        self
    }

    pub fn with_column(mut self, name: &str, data_type: DataType, column: Column) -> Self {
        self.columns.push((NameAndType::new(name, data_type), column));
        self
    }

    /// Column listed in the part metadata but without any files.
    pub fn with_metadata_only_column(mut self, name: &str, data_type: DataType) -> Self {
        self.metadata_only.push(NameAndType::new(name, data_type));
        self
    }

    pub fn create(&self) -> Arc<DataPart> {
        std::fs::create_dir_all(&self.dir).expect("create part dir");
        let rows = self.columns.first().map_or(0, |(_, c)| c.len());
        let granularity = self.index_granularity.max(1);
        let marks_count = rows.div_ceil(granularity);
        let granules: Vec<(usize, usize)> = (0..marks_count)
            .map(|g| (g * granularity, ((g + 1) * granularity).min(rows)))
            .collect();

        let mut written = HashSet::new();
        let mut checksums = BTreeMap::new();
        for (column, data) in &self.columns {
            assert_eq!(data.len(), rows, "column {} has a different length", column.name);
            for path in stream_paths(&column.data_type) {
                let stem = stream_file_stem(&column.name, &path);
                if !written.insert(stem.clone()) {
                    continue;
                }
                let mut writer = StreamWriter::new(self.method, self.max_block_size);
                for &(from, to) in &granules {
                    let mut bytes = Vec::new();
                    serialize_stream(data, &path, from, to, &mut bytes);
                    writer.write_granule(&bytes);
                }
                let (file, marks) = writer.finish();

                let bin_name = format!("{stem}.bin");
                let mrk_name = format!("{stem}.mrk");
                std::fs::write(self.dir.join(&bin_name), &file).expect("write data file");
                write_marks(&self.dir.join(&mrk_name), &marks).expect("write marks");
                checksums.insert(bin_name, checksum(&file));
                let mrk = std::fs::read(self.dir.join(&mrk_name)).expect("read marks back");
                checksums.insert(mrk_name, checksum(&mrk));
            }
        }

        let mut columns: Vec<NameAndType> = self.columns.iter().map(|(c, _)| c.clone()).collect();
        columns.extend(self.metadata_only.iter().cloned());
        let part = DataPart {
            name: self.name.clone(),
            path: self.dir.clone(),
            marks_count,
            rows_count: rows as u64,
            columns,
            checksums,
        };
        part.save().expect("save part metadata");
        Arc::new(part)
    }
}

fn checksum(bytes: &[u8]) -> FileChecksum {
    let mut hasher = Crc32Hasher::new();
    hasher.update(bytes);
    FileChecksum {
        file_size: bytes.len() as u64,
        crc32: hasher.finalize(),
    }
}

fn row_start(offsets: &[u64], row: usize) -> usize {
    if row == 0 { 0 } else { offsets[row - 1] as usize }
}

/// Bytes of one stream for top-level rows `from..to`.
fn serialize_stream(
    column: &Column,
    path: &[Substream],
    from: usize,
    to: usize,
    out: &mut Vec<u8>,
) {
    let Some((step, rest)) = path.split_first() else {
        serialize_leaf(column, from, to, out);
        return;
    };
    match (step, column) {
        (Substream::ArraySizes, Column::Array { offsets, .. }) => {
            for row in from..to {
                let size = (offsets[row] as usize - row_start(offsets, row)) as u64;
                size.write_le(out);
            }
        }
        (Substream::ArrayElements, Column::Array { offsets, data }) => {
            let start = row_start(offsets, from);
            let end = row_start(offsets, to);
            serialize_stream(data, rest, start, end, out);
        }
        (Substream::NullMap, Column::Nullable { null_map, .. }) => {
            out.extend_from_slice(&null_map[from..to]);
        }
        (Substream::NullableElements, Column::Nullable { nested, .. }) => {
            serialize_stream(nested, rest, from, to, out);
        }
        (Substream::TupleElement(i), Column::Tuple(elems)) => {
            serialize_stream(&elems[*i], rest, from, to, out);
        }
        (step, column) => panic!("stream step {step:?} does not apply to {}", column.kind()),
    }
}

struct StreamWriter {
    method: u8,
    max_block_size: usize,
    file: Vec<u8>,
    pending: Vec<u8>,
    marks: Vec<Mark>,
}

impl StreamWriter {
    fn new(method: u8, max_block_size: usize) -> Self {
        let mut file = Vec::new();
        BinaryHeader::new(FileKind::ColumnData.magic(), 1, 0)
            .write_to(&mut file)
            .expect("write header");
        Self {
            method,
            max_block_size,
            file,
            pending: Vec::new(),
            marks: Vec::new(),
        }
    }

    fn write_granule(&mut self, bytes: &[u8]) {
        if self.pending.len() >= self.max_block_size {
            self.flush();
        }
        self.marks.push(Mark::new(
            self.file.len() as u64,
            self.pending.len() as u64,
        ));
        self.pending.extend_from_slice(bytes);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let codec = codec_for(self.method).expect("known codec");
        let framed = compress_block(codec, &self.pending).expect("compress block");
        self.file.extend_from_slice(&framed);
        self.pending.clear();
    }

    fn finish(mut self) -> (Vec<u8>, Vec<Mark>) {
        self.flush();
        (self.file, self.marks)
    }
}
