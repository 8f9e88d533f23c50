use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::engine::core::compression::{METHOD_LZ4, codec_for, compress_block};
use crate::shared::storage_header::{BinaryHeader, FileKind};

/// Writes a standalone `.bin` file out of explicit decompressed blocks.
pub struct DataFileFactory {
    blocks: Vec<Vec<u8>>,
    method: u8,
}

impl DataFileFactory {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            method: METHOD_LZ4,
        }
    }

    pub fn with_block(mut self, data: Vec<u8>) -> Self {
        self.blocks.push(data);
        self
    }

    pub fn with_method(mut self, method: u8) -> Self {
        self.method = method;
        self
    }

    /// Blocks of `block_len` bytes whose contents are the running byte index
    /// modulo 251, so any offset can be checked by value.
    pub fn with_patterned_blocks(mut self, count: usize, block_len: usize) -> Self {
        let start = self.blocks.iter().map(Vec::len).sum::<usize>();
        for b in 0..count {
            let base = start + b * block_len;
            self.blocks
                .push((0..block_len).map(|i| ((base + i) % 251) as u8).collect());
        }
        self
    }

    /// Writes the file and returns the compressed offset of every block.
    pub fn create(&self, path: &Path) -> Vec<u64> {
        let codec = codec_for(self.method).expect("known codec");
        let mut out = BufWriter::new(File::create(path).expect("create data file"));
        BinaryHeader::new(FileKind::ColumnData.magic(), 1, 0)
            .write_to(&mut out)
            .expect("write header");

        let mut offset = BinaryHeader::TOTAL_LEN as u64;
        let mut offsets = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let framed = compress_block(codec, block).expect("compress block");
            out.write_all(&framed).expect("write block");
            offsets.push(offset);
            offset += framed.len() as u64;
        }
        out.flush().expect("flush data file");
        offsets
    }
}

/// Expected byte at decompressed stream position `i` of a patterned file.
pub fn pattern_byte(i: usize) -> u8 {
    (i % 251) as u8
}
