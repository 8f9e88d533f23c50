pub mod cache;
pub mod missing_columns;
pub mod part_reader;
pub mod settings;
pub mod stream;
pub mod stream_registry;

pub use part_reader::{PartReader, ReaderCaches};
pub use settings::ReaderSettings;
pub use stream::{Stream, StreamPosition};

#[cfg(test)]
mod part_reader_test;
