use crate::engine::core::io::{CompressedRead, SeekStats};
use crate::engine::core::mark::Mark;
use crate::engine::errors::PartReadError;

/// `CompressedRead` over a plain byte vector; marks address it with
/// `offset_in_decompressed_block` only.
pub struct MemoryReader {
    data: Vec<u8>,
    pos: usize,
    consumed: u64,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            consumed: 0,
        }
    }
}

impl CompressedRead for MemoryReader {
    fn seek(&mut self, mark: Mark) -> Result<(), PartReadError> {
        self.pos = mark.offset_in_decompressed_block as usize;
        Ok(())
    }

    fn read(&mut self, out: &mut [u8]) -> Result<usize, PartReadError> {
        let n = out.len().min(self.data.len().saturating_sub(self.pos));
        out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        self.consumed += n as u64;
        Ok(n)
    }

    fn eof(&mut self) -> Result<bool, PartReadError> {
        Ok(self.pos >= self.data.len())
    }

    fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    fn seek_stats(&self) -> SeekStats {
        SeekStats::default()
    }
}
