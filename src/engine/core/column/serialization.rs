use crate::engine::core::column::column::Column;
use crate::engine::core::io::CompressedRead;
use crate::engine::errors::PartReadError;

const CHUNK_VALUES: usize = 8192;
const MAX_VAR_UINT_BYTES: usize = 10;
const STRING_CHUNK_BYTES: usize = 64 * 1024;

/// Fixed-width little-endian value.
pub trait FixedWidth: Copy + Default {
    const WIDTH: usize;

    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_fixed_width {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Reads up to `limit` values. Stops early only at end of file; a value cut
/// in half is corruption.
pub fn deserialize_fixed<T: FixedWidth>(
    reader: &mut dyn CompressedRead,
    out: &mut Vec<T>,
    limit: usize,
) -> Result<usize, PartReadError> {
    let mut buf = vec![0u8; limit.min(CHUNK_VALUES) * T::WIDTH];
    let mut total = 0;
    while total < limit {
        let want = (limit - total).min(CHUNK_VALUES) * T::WIDTH;
        let got = reader.read(&mut buf[..want])?;
        if got % T::WIDTH != 0 {
            return Err(PartReadError::Corrupted(format!(
                "cannot read all data: {} trailing bytes of a {}-byte value",
                got % T::WIDTH,
                T::WIDTH
            )));
        }
        out.extend(buf[..got].chunks_exact(T::WIDTH).map(T::read_le));
        total += got / T::WIDTH;
        if got < want {
            break;
        }
    }
    Ok(total)
}

/// LEB128 unsigned integer; `None` at a clean end of file.
pub fn read_var_uint(reader: &mut dyn CompressedRead) -> Result<Option<u64>, PartReadError> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VAR_UINT_BYTES {
        if reader.read(&mut byte)? == 0 {
            if i == 0 {
                return Ok(None);
            }
            return Err(PartReadError::Corrupted(
                "unexpected end of file inside a variable-length integer".into(),
            ));
        }
        value |= ((byte[0] & 0x7f) as u64) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
    }
    Err(PartReadError::Corrupted(
        "variable-length integer is too long".into(),
    ))
}

pub fn write_var_uint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Reads up to `limit` length-prefixed strings.
pub fn deserialize_strings(
    reader: &mut dyn CompressedRead,
    chars: &mut Vec<u8>,
    offsets: &mut Vec<u64>,
    limit: usize,
) -> Result<usize, PartReadError> {
    for row in 0..limit {
        let Some(len) = read_var_uint(reader)? else {
            return Ok(row);
        };
        read_string_bytes(reader, chars, len)?;
        offsets.push(chars.len() as u64);
    }
    Ok(limit)
}

/// Appends exactly `len` bytes. The buffer grows by at most one chunk ahead
/// of the data actually read, so a corrupt length fails at end of file.
fn read_string_bytes(
    reader: &mut dyn CompressedRead,
    chars: &mut Vec<u8>,
    len: u64,
) -> Result<(), PartReadError> {
    let mut got = 0u64;
    while got < len {
        let want = (len - got).min(STRING_CHUNK_BYTES as u64) as usize;
        let at = chars.len();
        chars
            .try_reserve(want)
            .map_err(|e| PartReadError::Corrupted(format!("string of {len} bytes: {e}")))?;
        chars.resize(at + want, 0);
        let n = reader.read(&mut chars[at..])?;
        chars.truncate(at + n);
        got += n as u64;
        if n < want {
            return Err(PartReadError::Corrupted(format!(
                "cannot read all data: string of {len} bytes cut at {got}"
            )));
        }
    }
    Ok(())
}

pub fn deserialize_fixed_strings(
    reader: &mut dyn CompressedRead,
    n: usize,
    chars: &mut Vec<u8>,
    limit: usize,
) -> Result<usize, PartReadError> {
    if n == 0 {
        return Ok(0);
    }
    let start = chars.len();
    chars.resize(start + n * limit, 0);
    let got = reader.read(&mut chars[start..])?;
    chars.truncate(start + got);
    if got % n != 0 {
        return Err(PartReadError::Corrupted(format!(
            "cannot read all data: {} trailing bytes of a FixedString({n})",
            got % n
        )));
    }
    Ok(got / n)
}

/// Decodes up to `limit` rows of a single-stream column.
pub fn deserialize_leaf(
    reader: &mut dyn CompressedRead,
    column: &mut Column,
    limit: usize,
) -> Result<usize, PartReadError> {
    match column {
        Column::UInt8(v) => deserialize_fixed(reader, v, limit),
        Column::UInt16(v) => deserialize_fixed(reader, v, limit),
        Column::UInt32(v) => deserialize_fixed(reader, v, limit),
        Column::UInt64(v) => deserialize_fixed(reader, v, limit),
        Column::Int8(v) => deserialize_fixed(reader, v, limit),
        Column::Int16(v) => deserialize_fixed(reader, v, limit),
        Column::Int32(v) => deserialize_fixed(reader, v, limit),
        Column::Int64(v) => deserialize_fixed(reader, v, limit),
        Column::Float32(v) => deserialize_fixed(reader, v, limit),
        Column::Float64(v) => deserialize_fixed(reader, v, limit),
        Column::String { chars, offsets } => deserialize_strings(reader, chars, offsets, limit),
        Column::FixedString { n, chars } => deserialize_fixed_strings(reader, *n, chars, limit),
        other => Err(PartReadError::Corrupted(format!(
            "{} column is not stored in a single stream",
            other.kind()
        ))),
    }
}

/// Encodes rows `from..to` of a single-stream column.
pub fn serialize_leaf(column: &Column, from: usize, to: usize, out: &mut Vec<u8>) {
    fn fixed<T: FixedWidth>(values: &[T], from: usize, to: usize, out: &mut Vec<u8>) {
        for value in &values[from..to] {
            value.write_le(out);
        }
    }
    match column {
        Column::UInt8(v) => fixed(v, from, to, out),
        Column::UInt16(v) => fixed(v, from, to, out),
        Column::UInt32(v) => fixed(v, from, to, out),
        Column::UInt64(v) => fixed(v, from, to, out),
        Column::Int8(v) => fixed(v, from, to, out),
        Column::Int16(v) => fixed(v, from, to, out),
        Column::Int32(v) => fixed(v, from, to, out),
        Column::Int64(v) => fixed(v, from, to, out),
        Column::Float32(v) => fixed(v, from, to, out),
        Column::Float64(v) => fixed(v, from, to, out),
        Column::String { chars, offsets } => {
            for row in from..to {
                let start = if row == 0 { 0 } else { offsets[row - 1] as usize };
                let end = offsets[row] as usize;
                write_var_uint((end - start) as u64, out);
                out.extend_from_slice(&chars[start..end]);
            }
        }
        Column::FixedString { n, chars } => out.extend_from_slice(&chars[from * n..to * n]),
        Column::Array { .. } | Column::Nullable { .. } | Column::Tuple(_) => {}
    }
}
