pub mod column;
pub mod compression;
pub mod io;
pub mod mark;
pub mod part;
pub mod read;
