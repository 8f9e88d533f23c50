use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised while binding a reader to a part: the request or the part
/// layout cannot be satisfied. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column requested twice: {0}")]
    DuplicateColumn(String),

    #[error("Part directory does not exist: {}", .0.display())]
    PartPathMissing(PathBuf),

    #[error("Invalid data type: {0}")]
    InvalidType(String),

    #[error("Part metadata error: {0}")]
    Metadata(String),
}

/// Caller contract violations. Kept apart from I/O failures since they point
/// at misuse rather than a broken environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogicError {
    #[error("Invalid mark range [{from_mark}, {to_mark}) for part with {marks_count} marks")]
    InvalidMarkRange {
        from_mark: usize,
        to_mark: usize,
        marks_count: usize,
    },

    #[error("Mark {index} is out of bounds ({marks_count} marks)")]
    MarkOutOfBounds { index: usize, marks_count: usize },

    #[error("Empty block passed to fill missing columns")]
    EmptyBlock,

    #[error("Sizes of columns doesn't match: {first} has {first_rows} rows, {column} has {rows} rows")]
    RowCountMismatch {
        first: String,
        first_rows: usize,
        column: String,
        rows: usize,
    },

    #[error("Cannot append {actual} data to {expected} column {column}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Column {0} is neither present in the block nor read by this reader")]
    UnsatisfiableOrder(String),

    #[error("No stream registered for {0}")]
    MissingStream(String),
}

/// Top-level error of the part reading core.
#[derive(Debug, Error)]
pub enum PartReadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logical error: {0}")]
    Logic(#[from] LogicError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("{source} (while reading column {column})")]
    Column {
        column: String,
        #[source]
        source: Box<PartReadError>,
    },

    #[error(
        "{source} (while reading from part {} from mark {from_mark} to {to_mark})",
        .part.display()
    )]
    Range {
        part: PathBuf,
        from_mark: usize,
        to_mark: usize,
        #[source]
        source: Box<PartReadError>,
    },
}

impl PartReadError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PartReadError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn in_column(self, column: &str) -> Self {
        PartReadError::Column {
            column: column.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with column and range context stripped.
    pub fn root(&self) -> &PartReadError {
        match self {
            PartReadError::Column { source, .. } | PartReadError::Range { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    /// True when the error stems from caller misuse rather than the part's
    /// files or the environment.
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self.root(),
            PartReadError::Logic(_) | PartReadError::Config(_)
        )
    }

    pub fn log_error(&self) {
        match self.root() {
            PartReadError::Config(e) => {
                error!("Part reader configuration error: {}", e);
                debug!("Configuration error details: {:?}", e);
            }
            PartReadError::Logic(e) => {
                error!("Part reader logical error: {}", e);
                debug!("Logical error details: {:?}", e);
            }
            PartReadError::Io { path, source } => {
                error!("I/O error on {}: {}", path.display(), source);
                debug!("I/O error details: {:?}", source);
            }
            PartReadError::Corrupted(msg) => {
                error!("Corrupted part data: {}", msg);
            }
            PartReadError::Column { .. } | PartReadError::Range { .. } => {}
        }
        debug!("Full error chain: {}", self);
    }
}
