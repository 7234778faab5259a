//! CSV output: field escaping, quoting policy and row assembly.

use std::borrow::Cow;
use std::io;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::common::TextEncoding;
use crate::value::{CsvValue, FormatContext};

/// Options controlling the rendered output.
///
/// Independent from the decode dialect. Passed to every render call rather
/// than stored on the builder, so the same accumulated data can be rendered
/// under several dialects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Field separator, defaults to comma.
    pub separator: char,
    /// Character used to quote fields. Defaults to `"`.
    pub quote_char: char,
    /// Quote every field, not only those requiring escaping. Defaults to
    /// `true`.
    pub quote_all_fields: bool,
    /// Escape quote characters with a backslash instead of doubling them.
    /// Defaults to `true`.
    pub use_backslash_escape: bool,
    /// Line terminator between rows. Defaults to `\r\n`.
    pub newline: String,
    /// Whether the final line ends with the terminator. Defaults to `true`.
    pub end_with_newline: bool,
    /// Formatting rules for numeric and temporal values.
    pub format: FormatContext,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            quote_char: '"',
            quote_all_fields: true,
            use_backslash_escape: true,
            newline: "\r\n".to_string(),
            end_with_newline: true,
            format: FormatContext::default(),
        }
    }
}

/// Accumulates header names and rows of typed values, then renders them as
/// CSV text, bytes or into a sink.
///
/// ```
/// use flexcsv::{CsvBuilder, CsvValue, WriteOptions};
///
/// let mut builder = CsvBuilder::new();
/// builder
///     .with_headers(["Id", "Name"])
///     .add_row([CsvValue::Int(1), "Algonquin".into()]);
///
/// let text = builder.render(&WriteOptions::default());
/// assert_eq!(text, "\"Id\",\"Name\"\r\n\"1\",\"Algonquin\"\r\n");
/// ```
#[derive(Debug, Default)]
pub struct CsvBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<CsvValue>>,
}

impl CsvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header row, replacing any previously set headers.
    pub fn with_headers<I>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Remove the headers; no header line will be written.
    pub fn clear_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    /// Append one row of values in field order.
    pub fn add_row<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<CsvValue>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Append several rows.
    pub fn add_rows<I>(&mut self, rows: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoIterator,
        <I::Item as IntoIterator>::Item: Into<CsvValue>,
    {
        for row in rows {
            self.add_row(row);
        }
        self
    }

    /// Render the accumulated data as CSV text under the given options.
    pub fn render(&self, options: &WriteOptions) -> String {
        trace!(
            "rendering csv: {} header fields, {} rows",
            self.headers.len(),
            self.rows.len()
        );
        let mut out = String::new();

        if !self.headers.is_empty() {
            for (i, header) in self.headers.iter().enumerate() {
                if i > 0 {
                    out.push(options.separator);
                }
                push_field(&mut out, header, options);
            }
            if options.end_with_newline || !self.rows.is_empty() {
                out.push_str(&options.newline);
            }
        }

        for (i, row) in self.rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push(options.separator);
                }
                // Null is a fully empty field, never quoted.
                if let Some(text) = value.render(&options.format) {
                    push_field(&mut out, &text, options);
                }
            }
            if i + 1 < self.rows.len() || options.end_with_newline {
                out.push_str(&options.newline);
            }
        }

        out
    }

    /// Render to bytes under the chosen encoding. No BOM is written.
    pub fn to_bytes(&self, options: &WriteOptions, encoding: TextEncoding) -> Vec<u8> {
        encoding.encode(&self.render(options))
    }

    /// Render into a caller-supplied sink as UTF-8 text.
    pub fn write_to<W: io::Write>(&self, sink: &mut W, options: &WriteOptions) -> io::Result<()> {
        sink.write_all(self.render(options).as_bytes())
    }
}

/// Escape quote characters and append the field, quoting it when escaping
/// changed the content or the options demand quotes everywhere.
fn push_field(out: &mut String, text: &str, options: &WriteOptions) {
    let escaped = escape_quotes(text, options);
    let quote = options.quote_all_fields || matches!(escaped, Cow::Owned(_));

    if quote {
        out.push(options.quote_char);
        out.push_str(&escaped);
        out.push(options.quote_char);
    } else {
        out.push_str(&escaped);
    }
}

fn escape_quotes<'a>(text: &'a str, options: &WriteOptions) -> Cow<'a, str> {
    if !text.contains(options.quote_char) {
        return Cow::Borrowed(text);
    }

    let quote = options.quote_char;
    let replacement = if options.use_backslash_escape {
        format!("\\{quote}")
    } else {
        format!("{quote}{quote}")
    };

    Cow::Owned(text.replace(quote, &replacement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_header_only_under_three_option_sets() {
        let mut builder = CsvBuilder::new();
        builder.with_headers(["Onion", "Backpack", "Id", "Olive \"Oil\""]);

        let unix = WriteOptions {
            newline: "\n".to_string(),
            ..WriteOptions::default()
        };
        assert_eq!(
            builder.render(&unix),
            "\"Onion\",\"Backpack\",\"Id\",\"Olive \\\"Oil\\\"\"\n"
        );

        // Same builder, different options: render is pure in its options.
        let bare = WriteOptions {
            end_with_newline: false,
            quote_all_fields: false,
            ..WriteOptions::default()
        };
        assert_eq!(
            builder.render(&bare),
            "Onion,Backpack,Id,\"Olive \\\"Oil\\\"\""
        );

        let single_quoted = WriteOptions {
            quote_char: '\'',
            separator: '\t',
            ..WriteOptions::default()
        };
        assert_eq!(
            builder.render(&single_quoted),
            "'Onion'\t'Backpack'\t'Id'\t'Olive \"Oil\"'\r\n"
        );
    }

    #[test]
    fn test_typed_rows_render_with_invariant_formats() {
        let mut builder = CsvBuilder::new();
        builder.with_headers(["Id", "Cost", "Created", "Name"]);
        builder.add_row([
            CsvValue::from(512),
            Decimal::new(670, 2).into(),
            NaiveDate::from_ymd_opt(2021, 5, 16)
                .unwrap()
                .and_hms_opt(13, 42, 16)
                .unwrap()
                .into(),
            "Algonquin".into(),
        ]);
        builder.add_row([
            CsvValue::from(164323),
            12221.23.into(),
            NaiveDate::from_ymd_opt(2021, 5, 16)
                .unwrap()
                .and_hms_opt(13, 55, 20)
                .unwrap()
                .into(),
            "Richard".into(),
        ]);

        let expected = "\"Id\",\"Cost\",\"Created\",\"Name\"\r\n\
                        \"512\",\"6.70\",\"05/16/2021 13:42:16\",\"Algonquin\"\r\n\
                        \"164323\",\"12221.23\",\"05/16/2021 13:55:20\",\"Richard\"\r\n";
        assert_eq!(builder.render(&WriteOptions::default()), expected);
    }

    #[test]
    fn test_header_without_rows_or_trailing_newline() {
        let mut builder = CsvBuilder::new();
        builder.with_headers(["Onion", "Id"]);

        let options = WriteOptions {
            quote_all_fields: false,
            end_with_newline: false,
            ..WriteOptions::default()
        };
        assert_eq!(builder.render(&options), "Onion,Id");
    }

    #[test]
    fn test_doubled_quote_escaping_mode() {
        let mut builder = CsvBuilder::new();
        builder.add_row(["say \"hi\"", "b"]);

        let options = WriteOptions {
            quote_all_fields: false,
            use_backslash_escape: false,
            end_with_newline: false,
            ..WriteOptions::default()
        };
        assert_eq!(builder.render(&options), "\"say \"\"hi\"\"\",b");
    }

    #[test]
    fn test_quote_only_when_escaping_changed_content() {
        let mut builder = CsvBuilder::new();
        builder.add_row(["plain", "has \" quote", "last"]);

        let options = WriteOptions {
            quote_all_fields: false,
            end_with_newline: false,
            ..WriteOptions::default()
        };
        assert_eq!(builder.render(&options), "plain,\"has \\\" quote\",last");
    }

    #[test]
    fn test_null_renders_as_empty_unquoted_field() {
        let mut builder = CsvBuilder::new();
        builder.add_row([CsvValue::Null, CsvValue::from("x"), CsvValue::Null]);

        assert_eq!(builder.render(&WriteOptions::default()), ",\"x\",\r\n");
    }

    #[test]
    fn test_clear_headers() {
        let mut builder = CsvBuilder::new();
        builder.with_headers(["a"]).clear_headers().add_row(["1"]);

        let options = WriteOptions {
            quote_all_fields: false,
            end_with_newline: false,
            ..WriteOptions::default()
        };
        assert_eq!(builder.render(&options), "1");
    }

    #[test]
    fn test_newline_between_rows_only_when_configured() {
        let mut builder = CsvBuilder::new();
        builder.add_rows([["1", "2"], ["3", "4"]]);

        let options = WriteOptions {
            quote_all_fields: false,
            end_with_newline: false,
            newline: "\n".to_string(),
            ..WriteOptions::default()
        };
        assert_eq!(builder.render(&options), "1,2\n3,4");
    }

    #[test]
    fn test_to_bytes_utf16() {
        let mut builder = CsvBuilder::new();
        builder.add_row(["a"]);

        let options = WriteOptions {
            quote_all_fields: false,
            end_with_newline: false,
            ..WriteOptions::default()
        };
        assert_eq!(
            builder.to_bytes(&options, TextEncoding::Utf16Le),
            vec![b'a', 0]
        );
    }

    #[test]
    fn test_write_to_sink() {
        let mut builder = CsvBuilder::new();
        builder.add_row(["a", "b"]);

        let options = WriteOptions {
            quote_all_fields: false,
            end_with_newline: false,
            ..WriteOptions::default()
        };
        let mut sink = Vec::new();
        builder.write_to(&mut sink, &options).unwrap();
        assert_eq!(sink, b"a,b");
    }
}
