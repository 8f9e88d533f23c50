use std::path::PathBuf;

/// Marks are cached per marks file.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MarkCacheKey {
    pub path: PathBuf,
}

impl MarkCacheKey {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Decompressed blocks are cached per data file and compressed offset.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UncompressedCacheKey {
    pub path: PathBuf,
    pub offset: u64,
}

impl UncompressedCacheKey {
    pub fn new(path: PathBuf, offset: u64) -> Self {
        Self { path, offset }
    }
}
