//! # flexcsv
//!
//! Tolerant, dialect-configurable CSV reading and writing.
//!
//! The reader is a streaming tokenizer over any seekable byte source. It
//! handles RFC-4180 quoting plus the extensions found in real spreadsheet
//! and database exports: custom separators, custom quote characters,
//! backslash-escaped quotes, optional header rows and BOM-detected
//! encodings. It never rejects malformed structure — unterminated quotes
//! and ragged rows degrade to best-effort field boundaries.
//!
//! The writer inverts the reader: typed values are rendered, escaped and
//! assembled under an independent set of output options.
//!
//! ## Example
//!
//! ```rust
//! use flexcsv::{Csv, CsvBuilder, CsvOptions, WriteOptions};
//!
//! // Read rows of raw fields with typed access.
//! let options = CsvOptions {
//!     has_header_row: true,
//!     ..CsvOptions::default()
//! };
//! let csv = Csv::from_string("item,count\nonion,12\nolive oil,7", options)?;
//!
//! assert_eq!(csv.header_row()?, ["item", "count"]);
//! for row in csv.rows() {
//!     let row = row?;
//!     let _name: String = row.get_string(0)?;
//!     let _count: i64 = row.get(1)?;
//! }
//!
//! // Write a CSV back out.
//! let mut builder = CsvBuilder::new();
//! builder
//!     .with_headers(["item", "count"])
//!     .add_row(["onion".into(), flexcsv::CsvValue::Int(12)]);
//!
//! let text = builder.render(&WriteOptions::default());
//! assert_eq!(text, "\"item\",\"count\"\r\n\"onion\",\"12\"\r\n");
//! # Ok::<(), flexcsv::CsvError>(())
//! ```

mod common;
mod csv;
mod error;
mod map;
mod reader;
mod value;
mod writer;

// Re-export public API
pub use common::TextEncoding;
pub use csv::{Csv, Row, Rows};
pub use error::{CsvError, Result};
pub use map::{MapRows, RowBinding};
pub use reader::CsvOptions;
pub use value::{CsvValue, FormatContext, FromField};
pub use writer::{CsvBuilder, WriteOptions};
