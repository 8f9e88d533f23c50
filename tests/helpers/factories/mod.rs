pub mod data_file_factory;
pub mod part_writer_factory;

pub use data_file_factory::{DataFileFactory, pattern_byte};
pub use part_writer_factory::PartWriterFactory;
