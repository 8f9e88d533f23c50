use crate::engine::core::column::data_type::DataType;
use crate::engine::errors::ConfigError;

peg::parser! {
    grammar data_type_grammar() for str {
        rule _() = quiet!{ [' ' | '\t']* }

        rule number() -> usize
            = n:$(['0'..='9']+) {? n.parse().or(Err("number")) }

        rule wrapped<T>(inner: rule<T>) -> T
            = _ "(" _ v:inner() _ ")" { v }

        rule simple() -> DataType
            = "UInt8" { DataType::UInt8 }
            / "UInt16" { DataType::UInt16 }
            / "UInt32" { DataType::UInt32 }
            / "UInt64" { DataType::UInt64 }
            / "Int8" { DataType::Int8 }
            / "Int16" { DataType::Int16 }
            / "Int32" { DataType::Int32 }
            / "Int64" { DataType::Int64 }
            / "Float32" { DataType::Float32 }
            / "Float64" { DataType::Float64 }
            / "String" { DataType::String }

        rule any_type() -> DataType
            = "Array" t:wrapped(<any_type()>) { DataType::array(t) }
            / "Nullable" t:wrapped(<any_type()>) { DataType::nullable(t) }
            / "FixedString" n:wrapped(<number()>) { DataType::FixedString(n) }
            / "Tuple" _ "(" _ elems:(any_type() ++ (_ "," _)) _ ")" { DataType::Tuple(elems) }
            / simple()

        pub rule data_type() -> DataType
            = _ t:any_type() _ { t }
    }
}

/// Parses a textual type name such as `Array(Nullable(String))`.
pub fn parse_data_type(input: &str) -> Result<DataType, ConfigError> {
    data_type_grammar::data_type(input)
        .map_err(|e| ConfigError::InvalidType(format!("{input}: {e}")))
}
