use crate::engine::errors::PartReadError;

use lz4_flex::block::{compress as lz4_compress, decompress as lz4_decompress};

pub const METHOD_NONE: u8 = 0x02;
pub const METHOD_LZ4: u8 = 0x82;
pub const METHOD_ZSTD: u8 = 0x90;

const ZSTD_LEVEL: i32 = 1;

pub trait CompressionCodec: Sync {
    fn method(&self) -> u8;
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, PartReadError>;
    fn decompress(&self, input: &[u8], uncompressed_len: usize)
    -> Result<Vec<u8>, PartReadError>;
}

pub struct NoneCodec;

impl CompressionCodec for NoneCodec {
    fn method(&self) -> u8 {
        METHOD_NONE
    }
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, PartReadError> {
        Ok(input.to_vec())
    }
    fn decompress(
        &self,
        input: &[u8],
        uncompressed_len: usize,
    ) -> Result<Vec<u8>, PartReadError> {
        if input.len() != uncompressed_len {
            return Err(PartReadError::Corrupted(format!(
                "uncompressed block size mismatch: {} != {}",
                input.len(),
                uncompressed_len
            )));
        }
        Ok(input.to_vec())
    }
}

pub struct Lz4Codec;

impl CompressionCodec for Lz4Codec {
    fn method(&self) -> u8 {
        METHOD_LZ4
    }
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, PartReadError> {
        Ok(lz4_compress(input))
    }
    fn decompress(
        &self,
        input: &[u8],
        uncompressed_len: usize,
    ) -> Result<Vec<u8>, PartReadError> {
        lz4_decompress(input, uncompressed_len)
            .map_err(|e| PartReadError::Corrupted(format!("lz4 decompress: {e}")))
    }
}

pub struct ZstdCodec;

impl CompressionCodec for ZstdCodec {
    fn method(&self) -> u8 {
        METHOD_ZSTD
    }
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, PartReadError> {
        zstd::bulk::compress(input, ZSTD_LEVEL)
            .map_err(|e| PartReadError::Corrupted(format!("zstd compress: {e}")))
    }
    fn decompress(
        &self,
        input: &[u8],
        uncompressed_len: usize,
    ) -> Result<Vec<u8>, PartReadError> {
        zstd::bulk::decompress(input, uncompressed_len)
            .map_err(|e| PartReadError::Corrupted(format!("zstd decompress: {e}")))
    }
}

static NONE: NoneCodec = NoneCodec;
static LZ4: Lz4Codec = Lz4Codec;
static ZSTD: ZstdCodec = ZstdCodec;

/// Resolves the codec for a method byte found in a block header.
pub fn codec_for(method: u8) -> Result<&'static dyn CompressionCodec, PartReadError> {
    match method {
        METHOD_NONE => Ok(&NONE),
        METHOD_LZ4 => Ok(&LZ4),
        METHOD_ZSTD => Ok(&ZSTD),
        other => Err(PartReadError::Corrupted(format!(
            "unknown compression method 0x{other:02x}"
        ))),
    }
}
