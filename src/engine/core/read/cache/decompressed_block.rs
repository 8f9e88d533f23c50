/// A decompressed data block as held by the uncompressed cache. Carries the
/// size of its compressed frame so a cache hit can locate the next block.
#[derive(Debug)]
pub struct DecompressedBlock {
    data: Vec<u8>,
    pub compressed_size: u64,
}

impl DecompressedBlock {
    pub fn from_bytes(bytes: Vec<u8>, compressed_size: u64) -> Self {
        Self {
            data: bytes,
            compressed_size,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
