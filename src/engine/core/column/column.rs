use crate::engine::core::column::data_type::DataType;
use crate::engine::core::column::value::Value;
use crate::engine::errors::LogicError;

/// In-memory values of one column. Strings and arrays keep cumulative end
/// offsets per row, so row `i` spans `offsets[i - 1]..offsets[i]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String { chars: Vec<u8>, offsets: Vec<u64> },
    FixedString { n: usize, chars: Vec<u8> },
    Array { offsets: Vec<u64>, data: Box<Column> },
    Nullable { null_map: Vec<u8>, nested: Box<Column> },
    Tuple(Vec<Column>),
}

macro_rules! each_numeric {
    ($column:expr, $v:ident => $body:expr, $other:ident => $fallback:expr) => {
        match $column {
            Column::UInt8($v) => $body,
            Column::UInt16($v) => $body,
            Column::UInt32($v) => $body,
            Column::UInt64($v) => $body,
            Column::Int8($v) => $body,
            Column::Int16($v) => $body,
            Column::Int32($v) => $body,
            Column::Int64($v) => $body,
            Column::Float32($v) => $body,
            Column::Float64($v) => $body,
            $other => $fallback,
        }
    };
}

fn row_span(offsets: &[u64], row: usize) -> (usize, usize) {
    let start = if row == 0 { 0 } else { offsets[row - 1] as usize };
    (start, offsets[row] as usize)
}

impl Column {
    pub fn empty(data_type: &DataType) -> Self {
        Self::with_defaults(data_type, 0)
    }

    /// `rows` default values: zeros, empty strings, zero-filled fixed
    /// strings, empty arrays, NULLs, and tuples of element defaults.
    pub fn with_defaults(data_type: &DataType, rows: usize) -> Self {
        match data_type {
            DataType::UInt8 => Column::UInt8(vec![0; rows]),
            DataType::UInt16 => Column::UInt16(vec![0; rows]),
            DataType::UInt32 => Column::UInt32(vec![0; rows]),
            DataType::UInt64 => Column::UInt64(vec![0; rows]),
            DataType::Int8 => Column::Int8(vec![0; rows]),
            DataType::Int16 => Column::Int16(vec![0; rows]),
            DataType::Int32 => Column::Int32(vec![0; rows]),
            DataType::Int64 => Column::Int64(vec![0; rows]),
            DataType::Float32 => Column::Float32(vec![0.0; rows]),
            DataType::Float64 => Column::Float64(vec![0.0; rows]),
            DataType::String => Column::String {
                chars: Vec::new(),
                offsets: vec![0; rows],
            },
            DataType::FixedString(n) => Column::FixedString {
                n: *n,
                chars: vec![0; n * rows],
            },
            DataType::Array(inner) => Column::Array {
                offsets: vec![0; rows],
                data: Box::new(Column::empty(inner)),
            },
            DataType::Nullable(inner) => Column::Nullable {
                null_map: vec![1; rows],
                nested: Box::new(Column::with_defaults(inner, rows)),
            },
            DataType::Tuple(elems) => Column::Tuple(
                elems
                    .iter()
                    .map(|elem| Column::with_defaults(elem, rows))
                    .collect(),
            ),
        }
    }

    /// Arrays shaped by `offsets` whose elements are all defaults.
    pub fn arrays_of_defaults(element: &DataType, offsets: &[u64]) -> Self {
        let total = offsets.last().copied().unwrap_or(0) as usize;
        Column::Array {
            offsets: offsets.to_vec(),
            data: Box::new(Column::with_defaults(element, total)),
        }
    }

    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut chars = Vec::new();
        let mut offsets = Vec::new();
        for value in values {
            chars.extend_from_slice(value.as_ref());
            offsets.push(chars.len() as u64);
        }
        Column::String { chars, offsets }
    }

    /// Array column from per-row sizes over an already flattened `data`.
    pub fn arrays(sizes: &[u64], data: Column) -> Self {
        let mut total = 0;
        let offsets = sizes
            .iter()
            .map(|size| {
                total += size;
                total
            })
            .collect();
        Column::Array {
            offsets,
            data: Box::new(data),
        }
    }

    pub fn len(&self) -> usize {
        each_numeric!(self, v => v.len(), other => match other {
            Column::String { offsets, .. } | Column::Array { offsets, .. } => offsets.len(),
            Column::FixedString { n, chars } => {
                if *n == 0 { 0 } else { chars.len() / n }
            }
            Column::Nullable { null_map, .. } => null_map.len(),
            Column::Tuple(elems) => elems.first().map_or(0, Column::len),
            _ => 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate memory held by the values.
    pub fn byte_size(&self) -> usize {
        each_numeric!(self, v => std::mem::size_of_val(v.as_slice()), other => match other {
            Column::String { chars, offsets } => chars.len() + offsets.len() * 8,
            Column::FixedString { chars, .. } => chars.len(),
            Column::Array { offsets, data } => offsets.len() * 8 + data.byte_size(),
            Column::Nullable { null_map, nested } => null_map.len() + nested.byte_size(),
            Column::Tuple(elems) => elems.iter().map(Column::byte_size).sum(),
            _ => 0,
        })
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Column::UInt8(_) => "UInt8",
            Column::UInt16(_) => "UInt16",
            Column::UInt32(_) => "UInt32",
            Column::UInt64(_) => "UInt64",
            Column::Int8(_) => "Int8",
            Column::Int16(_) => "Int16",
            Column::Int32(_) => "Int32",
            Column::Int64(_) => "Int64",
            Column::Float32(_) => "Float32",
            Column::Float64(_) => "Float64",
            Column::String { .. } => "String",
            Column::FixedString { .. } => "FixedString",
            Column::Array { .. } => "Array",
            Column::Nullable { .. } => "Nullable",
            Column::Tuple(_) => "Tuple",
        }
    }

    /// Cumulative offsets of an array column.
    pub fn array_offsets(&self) -> Option<&[u64]> {
        match self {
            Column::Array { offsets, .. } => Some(offsets),
            _ => None,
        }
    }

    /// Moves the rows of `other` to the end of `self`.
    pub fn append(&mut self, column: &str, other: Column) -> Result<(), LogicError> {
        let mismatch = |expected: &str, actual: &str| LogicError::TypeMismatch {
            column: column.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        };
        let expected = self.kind();
        let actual = other.kind();

        match (self, other) {
            (Column::UInt8(a), Column::UInt8(b)) => a.extend(b),
            (Column::UInt16(a), Column::UInt16(b)) => a.extend(b),
            (Column::UInt32(a), Column::UInt32(b)) => a.extend(b),
            (Column::UInt64(a), Column::UInt64(b)) => a.extend(b),
            (Column::Int8(a), Column::Int8(b)) => a.extend(b),
            (Column::Int16(a), Column::Int16(b)) => a.extend(b),
            (Column::Int32(a), Column::Int32(b)) => a.extend(b),
            (Column::Int64(a), Column::Int64(b)) => a.extend(b),
            (Column::Float32(a), Column::Float32(b)) => a.extend(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend(b),
            (
                Column::String { chars, offsets },
                Column::String {
                    chars: more_chars,
                    offsets: more_offsets,
                },
            ) => {
                let base = chars.len() as u64;
                offsets.extend(more_offsets.into_iter().map(|o| o + base));
                chars.extend(more_chars);
            }
            (
                Column::FixedString { n, chars },
                Column::FixedString {
                    n: other_n,
                    chars: more_chars,
                },
            ) => {
                if *n != other_n {
                    return Err(mismatch(
                        &format!("FixedString({n})"),
                        &format!("FixedString({other_n})"),
                    ));
                }
                chars.extend(more_chars);
            }
            (
                Column::Array { offsets, data },
                Column::Array {
                    offsets: more_offsets,
                    data: more_data,
                },
            ) => {
                let base = offsets.last().copied().unwrap_or(0);
                data.append(column, *more_data)?;
                offsets.extend(more_offsets.into_iter().map(|o| o + base));
            }
            (
                Column::Nullable { null_map, nested },
                Column::Nullable {
                    null_map: more_nulls,
                    nested: more_nested,
                },
            ) => {
                nested.append(column, *more_nested)?;
                null_map.extend(more_nulls);
            }
            (Column::Tuple(elems), Column::Tuple(more)) => {
                if elems.len() != more.len() {
                    return Err(mismatch(
                        &format!("Tuple of {}", elems.len()),
                        &format!("Tuple of {}", more.len()),
                    ));
                }
                for (elem, other_elem) in elems.iter_mut().zip(more) {
                    elem.append(column, other_elem)?;
                }
            }
            _ => return Err(mismatch(expected, actual)),
        }
        Ok(())
    }

    pub fn value_at(&self, row: usize) -> Option<Value> {
        if row >= self.len() {
            return None;
        }
        let value = match self {
            Column::UInt8(v) => Value::UInt(v[row] as u64),
            Column::UInt16(v) => Value::UInt(v[row] as u64),
            Column::UInt32(v) => Value::UInt(v[row] as u64),
            Column::UInt64(v) => Value::UInt(v[row]),
            Column::Int8(v) => Value::Int(v[row] as i64),
            Column::Int16(v) => Value::Int(v[row] as i64),
            Column::Int32(v) => Value::Int(v[row] as i64),
            Column::Int64(v) => Value::Int(v[row]),
            Column::Float32(v) => Value::Float(v[row] as f64),
            Column::Float64(v) => Value::Float(v[row]),
            Column::String { chars, offsets } => {
                let (start, end) = row_span(offsets, row);
                Value::String(chars.get(start..end)?.to_vec())
            }
            Column::FixedString { n, chars } => {
                Value::String(chars.get(row * n..(row + 1) * n)?.to_vec())
            }
            Column::Array { offsets, data } => {
                let (start, end) = row_span(offsets, row);
                Value::Array(
                    (start..end)
                        .map(|i| data.value_at(i))
                        .collect::<Option<Vec<_>>>()?,
                )
            }
            Column::Nullable { null_map, nested } => {
                if null_map[row] != 0 {
                    Value::Null
                } else {
                    nested.value_at(row)?
                }
            }
            Column::Tuple(elems) => Value::Tuple(
                elems
                    .iter()
                    .map(|elem| elem.value_at(row))
                    .collect::<Option<Vec<_>>>()?,
            ),
        };
        Some(value)
    }
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Column {
                fn from(values: Vec<$ty>) -> Self {
                    Column::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec!(
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
);
