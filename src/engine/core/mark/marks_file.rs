use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::MmapOptions;

use crate::engine::core::mark::mark::Mark;
use crate::engine::errors::PartReadError;
use crate::shared::storage_header::{BinaryHeader, FileKind, open_and_header_offset};

/// Reads a `.mrk` file: header followed by `(u64, u64)` little-endian pairs.
/// The entry count must match the part's marks count.
pub fn load_marks(path: &Path, expected_count: usize) -> Result<Vec<Mark>, PartReadError> {
    let (file, header_offset) = open_and_header_offset(path, FileKind::ColumnMarks.magic())
        .map_err(|e| PartReadError::io(path, e))?;
    let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| PartReadError::io(path, e))?;
    let body = &mmap[header_offset..];

    let expected_len = expected_count * Mark::ENCODED_LEN;
    if body.len() != expected_len {
        return Err(PartReadError::Corrupted(format!(
            "bad size of marks file {}: {} bytes, expected {} ({} marks)",
            path.display(),
            body.len(),
            expected_len,
            expected_count
        )));
    }

    let marks = body
        .chunks_exact(Mark::ENCODED_LEN)
        .map(|entry| {
            let mut compressed = [0u8; 8];
            let mut decompressed = [0u8; 8];
            compressed.copy_from_slice(&entry[..8]);
            decompressed.copy_from_slice(&entry[8..]);
            Mark::new(
                u64::from_le_bytes(compressed),
                u64::from_le_bytes(decompressed),
            )
        })
        .collect();
    Ok(marks)
}

pub fn write_marks(path: &Path, marks: &[Mark]) -> Result<(), PartReadError> {
    let file = File::create(path).map_err(|e| PartReadError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let write = |writer: &mut BufWriter<File>| -> std::io::Result<()> {
        BinaryHeader::new(FileKind::ColumnMarks.magic(), 1, 0).write_to(&mut *writer)?;
        for mark in marks {
            writer.write_all(&mark.offset_in_compressed_file.to_le_bytes())?;
            writer.write_all(&mark.offset_in_decompressed_block.to_le_bytes())?;
        }
        writer.flush()
    };
    write(&mut writer).map_err(|e| PartReadError::io(path, e))
}
