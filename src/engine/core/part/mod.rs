pub mod data_part;
pub mod storage_context;

pub use data_part::{DataPart, FileChecksum, NameAndType};
pub use storage_context::{BrokenPartReporter, StorageContext};
