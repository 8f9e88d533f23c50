pub use super::factories::{DataFileFactory, PartWriterFactory};

pub struct Factory;

impl Factory {
    pub fn part_writer() -> PartWriterFactory {
        PartWriterFactory::new()
    }

    pub fn data_file() -> DataFileFactory {
        DataFileFactory::new()
    }
}
