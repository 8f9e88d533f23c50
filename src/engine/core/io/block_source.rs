use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{Level, trace};

use crate::engine::core::compression::{CompressedBlockHeader, decompress_block};
use crate::engine::core::io::file_source::{FileReadOptions, FileSource};
use crate::engine::core::read::cache::{DecompressedBlock, UncompressedCache, UncompressedCacheKey};
use crate::engine::errors::PartReadError;

/// A decompressed block together with the compressed offset it was read from.
#[derive(Debug, Clone)]
pub struct LoadedBlock {
    pub offset: u64,
    pub block: Arc<DecompressedBlock>,
}

impl LoadedBlock {
    pub fn next_offset(&self) -> u64 {
        self.offset + self.block.compressed_size
    }
}

/// Supplies decompressed blocks by compressed offset. `None` means end of file.
pub trait BlockSource {
    fn load_block(&mut self, offset: u64) -> Result<Option<LoadedBlock>, PartReadError>;

    /// Number of times the underlying file had to be repositioned.
    fn file_seeks(&self) -> u64;
}

fn read_block_at(
    file: &mut FileSource,
    offset: u64,
    file_seeks: &mut u64,
) -> Result<Arc<DecompressedBlock>, PartReadError> {
    if file.position() != offset {
        file.seek(offset)?;
        *file_seeks += 1;
    }
    let mut head = [0u8; CompressedBlockHeader::LEN];
    file.read_exact(&mut head)?;
    let header = CompressedBlockHeader::parse(&head);
    let mut payload = vec![0u8; header.compressed_size as usize];
    file.read_exact(&mut payload)?;
    let data = decompress_block(&header, &payload).map_err(|e| match e {
        PartReadError::Corrupted(msg) => PartReadError::Corrupted(format!(
            "{msg} in {} at offset {offset}",
            file.path().display()
        )),
        other => other,
    })?;
    Ok(Arc::new(DecompressedBlock::from_bytes(
        data,
        header.total_len(),
    )))
}

/// Reads blocks straight from the file.
#[derive(Debug)]
pub struct FileBlockSource {
    file: FileSource,
    file_seeks: u64,
}

impl FileBlockSource {
    pub fn open(path: &Path, options: &FileReadOptions) -> Result<Self, PartReadError> {
        Ok(Self {
            file: FileSource::open(path, options)?,
            file_seeks: 0,
        })
    }

    pub fn is_mapped(&self) -> bool {
        self.file.is_mapped()
    }
}

impl BlockSource for FileBlockSource {
    fn load_block(&mut self, offset: u64) -> Result<Option<LoadedBlock>, PartReadError> {
        if offset >= self.file.len() {
            return Ok(None);
        }
        let block = read_block_at(&mut self.file, offset, &mut self.file_seeks)?;
        Ok(Some(LoadedBlock { offset, block }))
    }

    fn file_seeks(&self) -> u64 {
        self.file_seeks
    }
}

/// Looks blocks up in the uncompressed cache and only touches the file on a
/// miss. The file is opened lazily, at the offset of the first miss.
#[derive(Debug)]
pub struct CachedBlockSource {
    path: PathBuf,
    file_len: u64,
    file: Option<FileSource>,
    options: FileReadOptions,
    cache: Arc<dyn UncompressedCache>,
    file_seeks: u64,
}

impl CachedBlockSource {
    pub fn new(
        path: PathBuf,
        file_len: u64,
        options: FileReadOptions,
        cache: Arc<dyn UncompressedCache>,
    ) -> Self {
        Self {
            path,
            file_len,
            file: None,
            options,
            cache,
            file_seeks: 0,
        }
    }

    pub fn is_file_open(&self) -> bool {
        self.file.is_some()
    }
}

impl BlockSource for CachedBlockSource {
    fn load_block(&mut self, offset: u64) -> Result<Option<LoadedBlock>, PartReadError> {
        if offset >= self.file_len {
            return Ok(None);
        }
        let key = UncompressedCacheKey::new(self.path.clone(), offset);
        if let Some(block) = self.cache.get(&key) {
            if tracing::enabled!(Level::TRACE) {
                trace!(
                    target: "cache::uncompressed::hit",
                    path = %self.path.display(),
                    offset,
                    "Using cached block"
                );
            }
            return Ok(Some(LoadedBlock { offset, block }));
        }

        let file = match &mut self.file {
            Some(file) => file,
            slot => {
                let mut options = self.options.clone();
                options.start_offset = offset;
                slot.insert(FileSource::open(&self.path, &options)?)
            }
        };
        let block = read_block_at(file, offset, &mut self.file_seeks)?;
        self.cache.put(key, Arc::clone(&block));
        Ok(Some(LoadedBlock { offset, block }))
    }

    fn file_seeks(&self) -> u64 {
        self.file_seeks
    }
}
