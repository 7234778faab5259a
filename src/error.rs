//! Error types shared by the reader, writer and mapping layers.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CsvError>;

/// An error raised while reading, coercing or writing CSV data.
///
/// Malformed CSV structure (unterminated quotes, ragged rows) is *not* an
/// error: the reader degrades to best-effort field boundaries instead of
/// aborting a pass. Errors are reserved for invalid configuration, I/O
/// failures from the underlying source, and field access/coercion problems.
#[derive(Error, Debug)]
pub enum CsvError {
    /// The session options are invalid, detected at construction.
    #[error("invalid options: {0}")]
    Config(String),

    /// The underlying byte source failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A field index outside `[0, field_count)` for the current row.
    #[error("field index {index} is out of range for row {row}, which has {count} fields")]
    IndexOutOfRange { row: u64, index: usize, count: usize },

    /// A field's raw text could not be coerced to the requested type.
    #[error("cannot parse {value:?} (field {index}, row {row}) as {target}")]
    InvalidField {
        row: u64,
        index: usize,
        value: String,
        target: &'static str,
    },
}
