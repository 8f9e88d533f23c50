use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tracing::{Level, debug};

use crate::engine::core::io::instrumentation::ReadInstrumentation;
use crate::engine::errors::PartReadError;
use crate::shared::storage_header::{FileKind, open_and_header_offset};

const MIN_BUFFER_SIZE: usize = 4096;

/// How a data file should be opened.
#[derive(Debug, Clone)]
pub struct FileReadOptions {
    /// First byte that will be read; the file is positioned there on open.
    pub start_offset: u64,
    /// Bytes expected to be read over the reader's lifetime.
    pub estimated_size: u64,
    /// Above this estimate the file is memory-mapped. 0 disables mapping.
    pub aio_threshold: usize,
    pub buffer_size: usize,
    pub instrumentation: ReadInstrumentation,
}

#[derive(Debug)]
enum Access {
    Buffered(BufReader<File>),
    Mapped(Mmap),
}

/// Positioned byte access to one data file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    access: Access,
    position: u64,
    len: u64,
    instrumentation: ReadInstrumentation,
}

impl FileSource {
    pub fn open(path: &Path, options: &FileReadOptions) -> Result<Self, PartReadError> {
        let (mut file, _header_len) = open_and_header_offset(path, FileKind::ColumnData.magic())
            .map_err(|e| PartReadError::io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| PartReadError::io(path, e))?
            .len();

        let use_mmap =
            options.aio_threshold > 0 && options.estimated_size >= options.aio_threshold as u64;
        let access = if use_mmap {
            let mmap = unsafe { MmapOptions::new().map(&file) }
                .map_err(|e| PartReadError::io(path, e))?;
            Access::Mapped(mmap)
        } else {
            file.seek(SeekFrom::Start(options.start_offset))
                .map_err(|e| PartReadError::io(path, e))?;
            Access::Buffered(BufReader::with_capacity(
                options.buffer_size.max(MIN_BUFFER_SIZE),
                file,
            ))
        };

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                target: "part_reader::file",
                path = %path.display(),
                mapped = use_mmap,
                buffer_size = options.buffer_size,
                estimated_size = options.estimated_size,
                start_offset = options.start_offset,
                "Opened data file"
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            access,
            position: options.start_offset,
            len,
            instrumentation: options.instrumentation.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.access, Access::Mapped(_))
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), PartReadError> {
        if let Access::Buffered(reader) = &mut self.access {
            let delta = offset as i64 - self.position as i64;
            reader
                .seek_relative(delta)
                .map_err(|e| PartReadError::io(&self.path, e))?;
        }
        self.position = offset;
        Ok(())
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), PartReadError> {
        let position = self.position as usize;
        let path = &self.path;
        let result = match &mut self.access {
            Access::Buffered(reader) => self
                .instrumentation
                .timed(path, buf.len(), || reader.read_exact(buf).map(|_| buf.len())),
            Access::Mapped(mmap) => self.instrumentation.timed(path, buf.len(), || {
                let end = position + buf.len();
                if end > mmap.len() {
                    return Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "read past end of mapped file",
                    ));
                }
                buf.copy_from_slice(&mmap[position..end]);
                Ok(buf.len())
            }),
        };
        match result {
            Ok(n) => {
                self.position += n as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(PartReadError::Corrupted(
                format!(
                    "unexpected end of file {} at offset {} reading {} bytes",
                    self.path.display(),
                    position,
                    buf.len()
                ),
            )),
            Err(e) => Err(PartReadError::io(&self.path, e)),
        }
    }
}
