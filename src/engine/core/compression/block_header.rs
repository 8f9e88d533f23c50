use crc32fast::Hasher as Crc32Hasher;

use crate::engine::core::compression::compression_codec::{CompressionCodec, codec_for};
use crate::engine::errors::PartReadError;

/// Header preceding every compressed block of a data file:
/// `[crc32 u32][method u8][compressed_size u32][decompressed_size u32]`.
/// The checksum covers the rest of the header and the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedBlockHeader {
    pub checksum: u32,
    pub method: u8,
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl CompressedBlockHeader {
    pub const LEN: usize = 4 + 1 + 4 + 4;

    pub fn parse(buf: &[u8; Self::LEN]) -> Self {
        Self {
            checksum: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            method: buf[4],
            compressed_size: u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]),
            decompressed_size: u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]),
        }
    }

    fn body_bytes(&self) -> [u8; Self::LEN - 4] {
        let mut out = [0u8; Self::LEN - 4];
        out[0] = self.method;
        out[1..5].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[5..9].copy_from_slice(&self.decompressed_size.to_le_bytes());
        out
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..4].copy_from_slice(&self.checksum.to_le_bytes());
        out[4..].copy_from_slice(&self.body_bytes());
        out
    }

    /// Header plus payload, i.e. the distance to the next block.
    pub fn total_len(&self) -> u64 {
        Self::LEN as u64 + self.compressed_size as u64
    }

    fn compute_checksum(&self, payload: &[u8]) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(&self.body_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}

/// Frames `data` as one compressed block (header + payload).
pub fn compress_block(
    codec: &dyn CompressionCodec,
    data: &[u8],
) -> Result<Vec<u8>, PartReadError> {
    let payload = codec.compress(data)?;
    let mut header = CompressedBlockHeader {
        checksum: 0,
        method: codec.method(),
        compressed_size: payload.len() as u32,
        decompressed_size: data.len() as u32,
    };
    header.checksum = header.compute_checksum(&payload);

    let mut out = Vec::with_capacity(CompressedBlockHeader::LEN + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Verifies the checksum of a block and decompresses its payload.
pub fn decompress_block(
    header: &CompressedBlockHeader,
    payload: &[u8],
) -> Result<Vec<u8>, PartReadError> {
    if payload.len() != header.compressed_size as usize {
        return Err(PartReadError::Corrupted(format!(
            "compressed block truncated: {} of {} bytes",
            payload.len(),
            header.compressed_size
        )));
    }
    let actual = header.compute_checksum(payload);
    if actual != header.checksum {
        return Err(PartReadError::Corrupted(format!(
            "checksum mismatch in compressed block: expected {:08x}, got {:08x}",
            header.checksum, actual
        )));
    }
    let codec = codec_for(header.method)?;
    let data = codec.decompress(payload, header.decompressed_size as usize)?;
    if data.len() != header.decompressed_size as usize {
        return Err(PartReadError::Corrupted(format!(
            "decompressed size mismatch: {} != {}",
            data.len(),
            header.decompressed_size
        )));
    }
    Ok(data)
}
