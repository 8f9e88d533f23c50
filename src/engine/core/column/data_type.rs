use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::core::column::type_parser::parse_data_type;
use crate::engine::errors::ConfigError;

/// Closed set of column types a part can store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    Array(Box<DataType>),
    Nullable(Box<DataType>),
    Tuple(Vec<DataType>),
}

impl DataType {
    pub fn array(inner: DataType) -> Self {
        DataType::Array(Box::new(inner))
    }

    pub fn nullable(inner: DataType) -> Self {
        DataType::Nullable(Box::new(inner))
    }

    /// Serialized width of one value, for types stored as fixed-size values.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            DataType::UInt8 | DataType::Int8 => Some(1),
            DataType::UInt16 | DataType::Int16 => Some(2),
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => Some(4),
            DataType::UInt64 | DataType::Int64 | DataType::Float64 => Some(8),
            DataType::FixedString(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array(_))
    }

    /// Element type of an array, `None` otherwise.
    pub fn array_element(&self) -> Option<&DataType> {
        match self {
            DataType::Array(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::UInt8 => f.write_str("UInt8"),
            DataType::UInt16 => f.write_str("UInt16"),
            DataType::UInt32 => f.write_str("UInt32"),
            DataType::UInt64 => f.write_str("UInt64"),
            DataType::Int8 => f.write_str("Int8"),
            DataType::Int16 => f.write_str("Int16"),
            DataType::Int32 => f.write_str("Int32"),
            DataType::Int64 => f.write_str("Int64"),
            DataType::Float32 => f.write_str("Float32"),
            DataType::Float64 => f.write_str("Float64"),
            DataType::String => f.write_str("String"),
            DataType::FixedString(n) => write!(f, "FixedString({n})"),
            DataType::Array(inner) => write!(f, "Array({inner})"),
            DataType::Nullable(inner) => write!(f, "Nullable({inner})"),
            DataType::Tuple(elems) => {
                f.write_str("Tuple(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for DataType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_data_type(s)
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
