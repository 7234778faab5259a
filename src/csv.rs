//! The `Csv` session: source constructors, restartable row iteration and
//! typed access to the current row.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::common::TextEncoding;
use crate::error::{CsvError, Result};
use crate::map::{MapRows, RowBinding};
use crate::reader::{CsvOptions, CsvReader};
use crate::value::{coerce, FormatContext, FromField};

/// A CSV decode session over a seekable byte source.
///
/// The session wraps the source in one buffered decoding layer which is
/// reused across rewinds. Reading is single-threaded and synchronous; the
/// engine's mutable state sits behind a mutex, so calls from the row
/// iterator, typed getters and the header accessor serialize against each
/// other but never deadlock (no lock is held between calls).
///
/// ```
/// use flexcsv::{Csv, CsvOptions};
///
/// let csv = Csv::from_string("a,b,1\nc,d,2", CsvOptions::default())?;
/// for row in csv.rows() {
///     let row = row?;
///     println!("{} -> {}", row.get_string(0)?, row.get::<i64>(2)?);
/// }
/// # Ok::<(), flexcsv::CsvError>(())
/// ```
pub struct Csv<R: Read + Seek> {
    inner: Mutex<CsvReader<R>>,
}

impl<R: Read + Seek> Csv<R> {
    /// Open a session over any seekable reader. The session takes ownership
    /// of the source; [`into_inner`](Self::into_inner) hands it back without
    /// closing it.
    pub fn from_reader(source: R, options: CsvOptions) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(CsvReader::new(source, options)?),
        })
    }

    /// Consume the session and return the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_source()
    }

    fn lock(&self) -> MutexGuard<'_, CsvReader<R>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Column names from the header row, computed at most once per session
    /// and identical across rewinds. Empty when the dialect has no header
    /// row. Never disturbs an in-progress row iteration.
    pub fn header_row(&self) -> Result<Vec<String>> {
        Ok(self.lock().header_row()?.to_vec())
    }

    /// Iterate the data rows. Every call starts an independent pass from
    /// the beginning of the source, skipping the header row when the
    /// dialect has one. Passes over the same session always yield the same
    /// rows; run one pass at a time.
    pub fn rows(&self) -> Rows<'_, R> {
        Rows {
            csv: self,
            started: false,
            done: false,
            next_index: 0,
        }
    }

    /// Snapshot every row of a fresh pass.
    pub fn all_rows(&self) -> Result<Vec<Vec<String>>> {
        let mut result = Vec::new();
        for row in self.rows() {
            result.push(row?.values());
        }
        Ok(result)
    }

    /// Map every data row to a `T` through an explicit binding, resolving
    /// name-bound columns against the header row once up front.
    pub fn map_rows<'a, T: Default>(
        &'a self,
        binding: &'a RowBinding<T>,
    ) -> Result<MapRows<'a, R, T>> {
        self.map_rows_with(binding, FormatContext::default())
    }

    /// [`map_rows`](Self::map_rows) with an explicit format context for the
    /// typed coercions.
    pub fn map_rows_with<'a, T: Default>(
        &'a self,
        binding: &'a RowBinding<T>,
        format: FormatContext,
    ) -> Result<MapRows<'a, R, T>> {
        let header = self.header_row()?;
        let columns = binding.resolve(&header);
        Ok(MapRows::new(self, binding, columns, format))
    }

    pub(crate) fn with_reader<T>(&self, f: impl FnOnce(&mut CsvReader<R>) -> T) -> T {
        f(&mut self.lock())
    }
}

impl Csv<Cursor<Vec<u8>>> {
    /// Decode CSV from a string, materializing it under the dialect's
    /// encoding (UTF-8 unless configured otherwise).
    pub fn from_string(contents: &str, options: CsvOptions) -> Result<Self> {
        let encoding = options.encoding.unwrap_or(TextEncoding::Utf8);
        Self::from_reader(Cursor::new(encoding.encode(contents)), options)
    }

    /// Decode CSV from an in-memory byte buffer.
    pub fn from_bytes(bytes: Vec<u8>, options: CsvOptions) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes), options)
    }
}

impl Csv<File> {
    /// Open a CSV file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, CsvOptions::default())
    }

    /// Open a CSV file with the given options. The file is owned by the
    /// session and closed when it is dropped.
    pub fn open_with<P: AsRef<Path>>(path: P, options: CsvOptions) -> Result<Self> {
        debug!("opening csv file {}", path.as_ref().display());
        Self::from_reader(File::open(path)?, options)
    }
}

/// Restartable iterator over the data rows of a [`Csv`] session.
///
/// Rewinds the engine when the first row is requested, so constructing it
/// is free and each new `Rows` value is an independent pass.
pub struct Rows<'c, R: Read + Seek> {
    csv: &'c Csv<R>,
    started: bool,
    done: bool,
    next_index: u64,
}

impl<'c, R: Read + Seek> Iterator for Rows<'c, R> {
    type Item = Result<Row<'c, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let started = self.started;
        let advanced = self.csv.with_reader(|reader| {
            if !started {
                reader.seek_start(true)?;
            }
            reader.read_row()
        });
        self.started = true;

        match advanced {
            Ok(true) => {
                let index = self.next_index;
                self.next_index += 1;
                Some(Ok(Row {
                    csv: self.csv,
                    index,
                }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// A view of the row currently held in the engine's buffer.
///
/// The view is only valid until the iterator advances or the session
/// rewinds: the buffer underneath is overwritten on every read. Getters
/// copy out of the buffer; use [`values`](Self::values) to snapshot the
/// whole row before advancing.
pub struct Row<'c, R: Read + Seek> {
    csv: &'c Csv<R>,
    index: u64,
}

impl<R: Read + Seek> Row<'_, R> {
    /// Zero-based index of this row among the data rows of the pass.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Number of fields in the row.
    pub fn field_count(&self) -> usize {
        self.csv.with_reader(|reader| reader.fields().len())
    }

    /// Snapshot of all field values, owned by the caller.
    pub fn values(&self) -> Vec<String> {
        self.csv.with_reader(|reader| reader.fields().to_vec())
    }

    /// Coerce one field to `T` using the invariant format context.
    ///
    /// `Option<T>` maps an empty field to `None`; for other types an empty
    /// field produces the type's zero-equivalent or an error, depending on
    /// the dialect's `default_empty_values` policy.
    pub fn get<T: FromField>(&self, index: usize) -> Result<T> {
        self.get_with(index, &FormatContext::default())
    }

    /// Coerce one field to `T` under an explicit format context.
    pub fn get_with<T: FromField>(&self, index: usize, format: &FormatContext) -> Result<T> {
        self.csv.with_reader(|reader| {
            let fields = reader.fields();
            let raw = fields.get(index).ok_or(CsvError::IndexOutOfRange {
                row: self.index,
                index,
                count: fields.len(),
            })?;
            coerce(
                raw,
                self.index,
                index,
                format,
                reader.options().default_empty_values,
            )
        })
    }

    pub fn get_string(&self, index: usize) -> Result<String> {
        self.get(index)
    }

    pub fn get_i16(&self, index: usize) -> Result<i16> {
        self.get(index)
    }

    pub fn get_i32(&self, index: usize) -> Result<i32> {
        self.get(index)
    }

    pub fn get_i64(&self, index: usize) -> Result<i64> {
        self.get(index)
    }

    pub fn get_f32(&self, index: usize) -> Result<f32> {
        self.get(index)
    }

    pub fn get_f64(&self, index: usize) -> Result<f64> {
        self.get(index)
    }

    pub fn get_bool(&self, index: usize) -> Result<bool> {
        self.get(index)
    }

    pub fn get_decimal(&self, index: usize) -> Result<rust_decimal::Decimal> {
        self.get(index)
    }

    pub fn get_date(&self, index: usize) -> Result<chrono::NaiveDate> {
        self.get(index)
    }

    pub fn get_datetime(&self, index: usize) -> Result<chrono::NaiveDateTime> {
        self.get(index)
    }
}
