use std::fmt;

/// A single cell, detached from its column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    UInt(u64),
    Int(i64),
    Float(f64),
    String(Vec<u8>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(bytes) => write!(f, "'{}'", String::from_utf8_lossy(bytes)),
            other => write!(f, "{other}"),
        }
    }

    fn fmt_list(
        f: &mut fmt::Formatter<'_>,
        open: &str,
        values: &[Value],
        close: &str,
    ) -> fmt::Result {
        f.write_str(open)?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            value.fmt_nested(f)?;
        }
        f.write_str(close)
    }
}

/// Tab-separated style: top-level strings are printed raw, strings inside
/// arrays and tuples are quoted.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Value::Array(values) => Value::fmt_list(f, "[", values, "]"),
            Value::Tuple(values) => Value::fmt_list(f, "(", values, ")"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.as_bytes().to_vec())
    }
}
