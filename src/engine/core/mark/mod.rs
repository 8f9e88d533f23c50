pub mod mark;
pub mod marks_file;

pub use mark::{Mark, MarkRange, MarkRanges, MarksInCompressedFile};
pub use marks_file::{load_marks, write_marks};
