use std::sync::Arc;

/// Position of a granule boundary inside a column data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mark {
    pub offset_in_compressed_file: u64,
    pub offset_in_decompressed_block: u64,
}

impl Mark {
    pub const ENCODED_LEN: usize = 16;

    pub fn new(offset_in_compressed_file: u64, offset_in_decompressed_block: u64) -> Self {
        Self {
            offset_in_compressed_file,
            offset_in_decompressed_block,
        }
    }
}

/// Marks as published in the mark cache. Immutable once shared.
pub type MarksInCompressedFile = Arc<[Mark]>;

/// Half-open interval of marks `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkRange {
    pub begin: usize,
    pub end: usize,
}

impl MarkRange {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }
}

pub type MarkRanges = Vec<MarkRange>;
