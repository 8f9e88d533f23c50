pub mod block_source;
pub mod compressed_read_buffer;
pub mod file_source;
pub mod instrumentation;

pub use block_source::{BlockSource, CachedBlockSource, FileBlockSource, LoadedBlock};
pub use compressed_read_buffer::{CompressedRead, CompressedReadBuffer, SeekStats};
pub use file_source::{FileReadOptions, FileSource};
pub use instrumentation::{
    Clock, ManualClock, MonotonicClock, ReadInstrumentation, ReadObserver, ReadProfile,
};
