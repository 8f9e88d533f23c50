pub mod block;
pub mod column;
pub mod data_type;
pub mod serialization;
pub mod stream_path;
pub mod type_parser;
pub mod value;

pub use block::{Block, ColumnWithType};
pub use column::Column;
pub use data_type::DataType;
pub use stream_path::{Substream, SubstreamPath};
pub use value::Value;
