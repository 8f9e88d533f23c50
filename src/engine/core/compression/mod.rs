pub mod block_header;
pub mod compression_codec;

pub use block_header::{CompressedBlockHeader, compress_block, decompress_block};
pub use compression_codec::{
    CompressionCodec, Lz4Codec, METHOD_LZ4, METHOD_NONE, METHOD_ZSTD, NoneCodec, ZstdCodec,
    codec_for,
};
