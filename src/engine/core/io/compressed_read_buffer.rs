use crate::engine::core::io::block_source::{BlockSource, LoadedBlock};
use crate::engine::core::mark::Mark;
use crate::engine::errors::PartReadError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeekStats {
    /// Seeks that repositioned the underlying file.
    pub file_seeks: u64,
    /// Seeks served by moving inside the already decompressed block.
    pub in_buffer_seeks: u64,
}

/// Random access over a file of compressed blocks, addressed by marks.
pub trait CompressedRead {
    fn seek(&mut self, mark: Mark) -> Result<(), PartReadError>;

    /// Fills `out` as far as the file allows. Returns 0 only at end of file.
    fn read(&mut self, out: &mut [u8]) -> Result<usize, PartReadError>;

    fn eof(&mut self) -> Result<bool, PartReadError>;

    /// Decompressed bytes handed out by `read` so far.
    fn bytes_consumed(&self) -> u64;

    fn seek_stats(&self) -> SeekStats;
}

#[derive(Debug)]
pub struct CompressedReadBuffer<S: BlockSource> {
    source: S,
    current: Option<LoadedBlock>,
    pos: usize,
    next_offset: u64,
    pending_skip: u64,
    consumed: u64,
    in_buffer_seeks: u64,
}

impl<S: BlockSource> CompressedReadBuffer<S> {
    /// Cursor positioned at `start`; nothing is read until the first access.
    pub fn new(source: S, start: Mark) -> Self {
        Self {
            source,
            current: None,
            pos: 0,
            next_offset: start.offset_in_compressed_file,
            pending_skip: start.offset_in_decompressed_block,
            consumed: 0,
            in_buffer_seeks: 0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Makes sure unread bytes are available; false at end of file.
    fn ensure_block(&mut self) -> Result<bool, PartReadError> {
        loop {
            if let Some(current) = &self.current {
                if self.pos < current.block.len() {
                    return Ok(true);
                }
            }
            match self.source.load_block(self.next_offset)? {
                None => {
                    self.current = None;
                    self.pos = 0;
                    if self.pending_skip > 0 {
                        return Err(PartReadError::Corrupted(format!(
                            "mark points {} bytes into a block past end of file (offset {})",
                            self.pending_skip, self.next_offset
                        )));
                    }
                    return Ok(false);
                }
                Some(loaded) => {
                    let skip = std::mem::take(&mut self.pending_skip);
                    if skip > loaded.block.len() as u64 {
                        return Err(PartReadError::Corrupted(format!(
                            "mark offset {} exceeds decompressed block size {} at offset {}",
                            skip,
                            loaded.block.len(),
                            loaded.offset
                        )));
                    }
                    self.next_offset = loaded.next_offset();
                    self.pos = skip as usize;
                    self.current = Some(loaded);
                }
            }
        }
    }
}

impl<S: BlockSource> CompressedRead for CompressedReadBuffer<S> {
    fn seek(&mut self, mark: Mark) -> Result<(), PartReadError> {
        if let Some(current) = &self.current {
            if current.offset == mark.offset_in_compressed_file {
                if mark.offset_in_decompressed_block > current.block.len() as u64 {
                    return Err(PartReadError::Corrupted(format!(
                        "seek past end of decompressed block: {} > {}",
                        mark.offset_in_decompressed_block,
                        current.block.len()
                    )));
                }
                self.pos = mark.offset_in_decompressed_block as usize;
                self.pending_skip = 0;
                self.in_buffer_seeks += 1;
                return Ok(());
            }
        }
        self.current = None;
        self.pos = 0;
        self.next_offset = mark.offset_in_compressed_file;
        self.pending_skip = mark.offset_in_decompressed_block;
        Ok(())
    }

    fn read(&mut self, out: &mut [u8]) -> Result<usize, PartReadError> {
        let mut written = 0;
        while written < out.len() {
            if !self.ensure_block()? {
                break;
            }
            let Some(current) = &self.current else {
                break;
            };
            let available = &current.block.as_bytes()[self.pos..];
            let n = available.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&available[..n]);
            self.pos += n;
            written += n;
        }
        self.consumed += written as u64;
        Ok(written)
    }

    fn eof(&mut self) -> Result<bool, PartReadError> {
        Ok(!self.ensure_block()?)
    }

    fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    fn seek_stats(&self) -> SeekStats {
        SeekStats {
            file_seeks: self.source.file_seeks(),
            in_buffer_seeks: self.in_buffer_seeks,
        }
    }
}
