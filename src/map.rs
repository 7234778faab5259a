//! Row-to-struct mapping through explicit, caller-built bindings.

use std::io::{Read, Seek};

use crate::csv::Csv;
use crate::error::{CsvError, Result};
use crate::value::{coerce, FormatContext, FromField};

/// How one bound setter locates its column.
#[derive(Debug, Clone)]
enum ColumnRef {
    /// Explicit zero-based column index.
    Index(usize),
    /// Column name, matched case-insensitively (then whitespace-trimmed)
    /// against the cached header row.
    Name(String),
    /// Declaration order among the binding's setters.
    Positional(usize),
}

type Apply<T> = Box<dyn Fn(&mut T, &str, u64, usize, &FormatContext, bool) -> Result<()>>;

struct Setter<T> {
    column: ColumnRef,
    apply: Apply<T>,
}

/// An ordered list of (column selector, typed setter) pairs describing how
/// to populate a `T` from one row, built once per target type.
///
/// Column resolution follows a three-tier precedence: an explicit index
/// ([`bind_column`](Self::bind_column)) is used as-is; an explicit name
/// ([`bind_named`](Self::bind_named)) is matched against the header row; a
/// bare [`bind`](Self::bind) falls back to the setter's declaration order.
/// A name with no matching header column leaves the target field at its
/// default value.
///
/// ```
/// use flexcsv::{Csv, CsvOptions, RowBinding};
///
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     age: i32,
/// }
///
/// let binding = RowBinding::new()
///     .bind(|p: &mut Person, v: String| p.name = v)
///     .bind(|p: &mut Person, v: i32| p.age = v);
///
/// let csv = Csv::from_string("ada,36\ngrace,45", CsvOptions::default())?;
/// let people: Vec<Person> = csv.map_rows(&binding)?.collect::<Result<_, _>>()?;
/// assert_eq!(people[1].name, "grace");
/// # Ok::<(), flexcsv::CsvError>(())
/// ```
pub struct RowBinding<T> {
    setters: Vec<Setter<T>>,
}

impl<T> Default for RowBinding<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RowBinding<T> {
    pub fn new() -> Self {
        Self {
            setters: Vec::new(),
        }
    }

    /// Bind the next column by declaration order.
    pub fn bind<V, F>(self, set: F) -> Self
    where
        V: FromField,
        F: Fn(&mut T, V) + 'static,
    {
        let position = self.setters.len();
        self.push(ColumnRef::Positional(position), set)
    }

    /// Bind an explicit zero-based column index.
    pub fn bind_column<V, F>(self, index: usize, set: F) -> Self
    where
        V: FromField,
        F: Fn(&mut T, V) + 'static,
    {
        self.push(ColumnRef::Index(index), set)
    }

    /// Bind a column by header name (case-insensitive, falling back to a
    /// whitespace-trimmed comparison).
    pub fn bind_named<V, F>(self, name: impl Into<String>, set: F) -> Self
    where
        V: FromField,
        F: Fn(&mut T, V) + 'static,
    {
        self.push(ColumnRef::Name(name.into()), set)
    }

    fn push<V, F>(mut self, column: ColumnRef, set: F) -> Self
    where
        V: FromField,
        F: Fn(&mut T, V) + 'static,
    {
        let apply: Apply<T> = Box::new(move |target, raw, row, index, ctx, default_empty| {
            let value: V = coerce(raw, row, index, ctx, default_empty)?;
            set(target, value);
            Ok(())
        });
        self.setters.push(Setter { column, apply });
        self
    }

    /// Resolve every setter to a column index against a header row.
    /// Unresolvable names yield `None` and are skipped when mapping.
    pub(crate) fn resolve(&self, header: &[String]) -> Vec<Option<usize>> {
        self.setters
            .iter()
            .map(|setter| match &setter.column {
                ColumnRef::Index(index) => Some(*index),
                ColumnRef::Positional(position) => Some(*position),
                ColumnRef::Name(name) => find_column(header, name),
            })
            .collect()
    }
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|column| column.eq_ignore_ascii_case(name))
        .or_else(|| {
            header
                .iter()
                .position(|column| column.trim().eq_ignore_ascii_case(name.trim()))
        })
}

/// Iterator yielding one constructed `T` per data row.
pub struct MapRows<'a, R: Read + Seek, T> {
    csv: &'a Csv<R>,
    binding: &'a RowBinding<T>,
    columns: Vec<Option<usize>>,
    format: FormatContext,
    started: bool,
    done: bool,
    next_index: u64,
}

impl<'a, R: Read + Seek, T> MapRows<'a, R, T> {
    pub(crate) fn new(
        csv: &'a Csv<R>,
        binding: &'a RowBinding<T>,
        columns: Vec<Option<usize>>,
        format: FormatContext,
    ) -> Self {
        Self {
            csv,
            binding,
            columns,
            format,
            started: false,
            done: false,
            next_index: 0,
        }
    }
}

impl<R: Read + Seek, T: Default> Iterator for MapRows<'_, R, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let started = self.started;
        let index = self.next_index;
        let result = self.csv.with_reader(|reader| -> Result<Option<T>> {
            if !started {
                reader.seek_start(true)?;
            }
            if !reader.read_row()? {
                return Ok(None);
            }

            let default_empty = reader.options().default_empty_values;
            let mut target = T::default();
            let fields = reader.fields();

            for (setter, column) in self.binding.setters.iter().zip(&self.columns) {
                let Some(column) = *column else {
                    // Unmatched header name: leave the field at its default.
                    continue;
                };
                let raw = fields.get(column).ok_or(CsvError::IndexOutOfRange {
                    row: index,
                    index: column,
                    count: fields.len(),
                })?;
                (setter.apply)(&mut target, raw, index, column, &self.format, default_empty)?;
            }

            Ok(Some(target))
        });
        self.started = true;

        match result {
            Ok(Some(target)) => {
                self.next_index += 1;
                Some(Ok(target))
            }
            Ok(None) => {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CsvOptions;

    #[derive(Debug, Default, PartialEq)]
    struct Name {
        first: String,
        middle: String,
        surname: String,
    }

    fn positional_binding() -> RowBinding<Name> {
        RowBinding::new()
            .bind(|n: &mut Name, v: String| n.first = v)
            .bind(|n: &mut Name, v: String| n.middle = v)
            .bind(|n: &mut Name, v: String| n.surname = v)
    }

    #[test]
    fn test_positional_mapping() {
        let csv = Csv::from_string(
            "fred,bob,smith\ncharles,biggs,frompton\nemily,,sutland",
            CsvOptions::default(),
        )
        .unwrap();
        let binding = positional_binding();

        let names: Vec<Name> = csv
            .map_rows(&binding)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(names.len(), 3);
        assert_eq!(names[0].first, "fred");
        assert_eq!(names[1].surname, "frompton");
        assert_eq!(names[2].middle, "");
    }

    #[test]
    fn test_explicit_columns_ignore_unbound_fields() {
        let csv = Csv::from_string("fred,bob,smith", CsvOptions::default()).unwrap();
        let binding = RowBinding::new()
            .bind_column(1, |n: &mut Name, v: String| n.middle = v)
            .bind_column(2, |n: &mut Name, v: String| n.surname = v);

        let names: Vec<Name> = csv
            .map_rows(&binding)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(names[0].first, "");
        assert_eq!(names[0].middle, "bob");
        assert_eq!(names[0].surname, "smith");
    }

    #[test]
    fn test_named_mapping_is_case_insensitive() {
        let options = CsvOptions {
            has_header_row: true,
            ..CsvOptions::default()
        };
        let csv = Csv::from_string(
            "surname,FIRSTNAME,green\nbloggs,joe,no\nshaw,susan,no",
            options,
        )
        .unwrap();

        let binding = RowBinding::new()
            .bind_named("firstname", |n: &mut Name, v: String| n.first = v)
            .bind_named("middlename", |n: &mut Name, v: String| n.middle = v)
            .bind_named("Surname", |n: &mut Name, v: String| n.surname = v);

        let names: Vec<Name> = csv
            .map_rows(&binding)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(names.len(), 2);
        assert_eq!(names[0].first, "joe");
        // No "middlename" column: stays at its default.
        assert_eq!(names[0].middle, "");
        assert_eq!(names[0].surname, "bloggs");
        assert_eq!(names[1].first, "susan");
    }

    #[test]
    fn test_named_mapping_trims_whitespace_as_fallback() {
        let options = CsvOptions {
            has_header_row: true,
            ..CsvOptions::default()
        };
        let csv = Csv::from_string("id,\"  label \"\n4,x", options).unwrap();

        #[derive(Debug, Default)]
        struct Item {
            id: i64,
            label: String,
        }

        let binding = RowBinding::new()
            .bind_named("id", |t: &mut Item, v: i64| t.id = v)
            .bind_named("label", |t: &mut Item, v: String| t.label = v);

        let items: Vec<Item> = csv
            .map_rows(&binding)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items[0].id, 4);
        assert_eq!(items[0].label, "x");
    }

    #[test]
    fn test_nullable_field_mapping() {
        let options = CsvOptions {
            has_header_row: true,
            ..CsvOptions::default()
        };
        let csv =
            Csv::from_string("name,price,time\nJim,5,100\nJane,,12\nBob,3,7", options).unwrap();

        #[derive(Debug, Default)]
        struct Entry {
            name: String,
            price: Option<i32>,
            time: i32,
        }

        let binding = RowBinding::new()
            .bind_named("name", |e: &mut Entry, v: String| e.name = v)
            .bind_named("price", |e: &mut Entry, v: Option<i32>| e.price = v)
            .bind_named("time", |e: &mut Entry, v: i32| e.time = v);

        let entries: Vec<Entry> = csv
            .map_rows(&binding)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(entries[0].price, Some(5));
        assert_eq!(entries[1].price, None);
        assert_eq!(entries[1].time, 12);
        assert_eq!(entries[2].name, "Bob");
    }

    #[test]
    fn test_bound_column_beyond_row_is_an_index_error() {
        let csv = Csv::from_string("a,b", CsvOptions::default()).unwrap();
        let binding = RowBinding::new().bind_column(5, |n: &mut Name, v: String| n.first = v);

        let result: Result<Vec<Name>> = csv.map_rows(&binding).unwrap().collect();
        assert!(matches!(
            result,
            Err(CsvError::IndexOutOfRange { index: 5, .. })
        ));
    }
}
