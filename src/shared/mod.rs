pub mod config;
pub mod path;
pub mod storage_header;
