//! Streaming CSV tokenizer: dialect options, char-level source cursor and
//! the row state machine.

use std::io::{self, BufReader, Read, Seek, SeekFrom};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::common::TextEncoding;
use crate::error::{CsvError, Result};

/// Dialect options for reading a CSV source.
///
/// Decoding options are fully independent from [`WriteOptions`]: a session
/// may read with one dialect and write with another.
///
/// The separator and quote character must differ; this is checked when a
/// session is constructed.
///
/// [`WriteOptions`]: crate::WriteOptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator, defaults to comma.
    pub separator: char,
    /// Character which quotes text fields when `quoting_enabled` is set.
    pub quote_char: char,
    /// Whether fields may be surrounded with quotes. Defaults to `true`.
    pub quoting_enabled: bool,
    /// Whether a backslash before the quote character suppresses its
    /// closing role inside quoted fields. Doubled quotes are always
    /// recognized regardless of this setting. Defaults to `false`.
    pub backslash_escapes_quotes: bool,
    /// Whether the first row holds column names. Defaults to `false`.
    pub has_header_row: bool,
    /// Byte encoding of the source. `None` auto-detects from a byte-order
    /// mark and falls back to UTF-8.
    pub encoding: Option<TextEncoding>,
    /// Whether non-nullable typed getters return the type's zero-equivalent
    /// for an empty field instead of failing. Defaults to `true`.
    pub default_empty_values: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            quote_char: '"',
            quoting_enabled: true,
            backslash_escapes_quotes: false,
            has_header_row: false,
            encoding: None,
            default_empty_values: true,
        }
    }
}

impl CsvOptions {
    /// Default options with the given field separator.
    pub fn with_separator(separator: char) -> Self {
        Self {
            separator,
            ..Self::default()
        }
    }

    /// Default options for tab-separated sources.
    pub fn tab_separated() -> Self {
        Self::with_separator('\t')
    }

    fn validate(&self) -> Result<()> {
        if self.separator == self.quote_char {
            return Err(CsvError::Config(format!(
                "separator and quote character are both {:?}",
                self.separator
            )));
        }
        if self.separator == '\r' || self.separator == '\n' {
            return Err(CsvError::Config(
                "separator cannot be a line-break character".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_newline(ch: char) -> bool {
    ch == '\r' || ch == '\n'
}

/// Buffered char-at-a-time cursor over a seekable byte source.
///
/// Tracks the exact byte offset of the next character so the reader can
/// save and restore its position across the isolated header pass, and
/// supports the one character of lookahead the tokenizer needs.
struct CharCursor<R: Read + Seek> {
    inner: BufReader<R>,
    encoding: TextEncoding,
    data_start: u64,
    pos: u64,
    pending: Option<(char, u32)>,
}

impl<R: Read + Seek> CharCursor<R> {
    fn new(source: R, requested: Option<TextEncoding>) -> Result<Self> {
        let mut inner = BufReader::new(source);

        let mut prefix = [0u8; 3];
        let mut got = 0;
        while got < prefix.len() {
            match inner.read(&mut prefix[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let (encoding, data_start) = match requested {
            Some(encoding) => {
                let bom = encoding.bom();
                let skip = if got >= bom.len() && prefix[..bom.len()] == *bom {
                    bom.len() as u64
                } else {
                    0
                };
                (encoding, skip)
            }
            None => TextEncoding::detect(&prefix[..got]),
        };

        inner.seek(SeekFrom::Start(data_start))?;

        Ok(Self {
            inner,
            encoding,
            data_start,
            pos: data_start,
            pending: None,
        })
    }

    fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Byte offset of the next character to be returned.
    fn position(&self) -> u64 {
        self.pos
    }

    /// Seek to the start of the data, just past any byte-order mark,
    /// discarding buffered read-ahead.
    fn rewind(&mut self) -> Result<()> {
        self.seek_to(self.data_start)
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        self.pending = None;
        Ok(())
    }

    fn next_char(&mut self) -> Result<Option<char>> {
        let decoded = match self.pending.take() {
            Some(pending) => Some(pending),
            None => self.decode_one()?,
        };

        Ok(decoded.map(|(ch, len)| {
            self.pos += u64::from(len);
            ch
        }))
    }

    fn peek_char(&mut self) -> Result<Option<char>> {
        if self.pending.is_none() {
            self.pending = self.decode_one()?;
        }
        Ok(self.pending.map(|(ch, _)| ch))
    }

    fn into_source(self) -> R {
        self.inner.into_inner()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn decode_one(&mut self) -> Result<Option<(char, u32)>> {
        match self.encoding {
            TextEncoding::Utf8 => self.decode_utf8(),
            TextEncoding::Utf16Le => self.decode_utf16(false),
            TextEncoding::Utf16Be => self.decode_utf16(true),
        }
    }

    // Invalid sequences decode to U+FFFD rather than aborting the pass.
    fn decode_utf8(&mut self) -> Result<Option<(char, u32)>> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };

        if lead < 0x80 {
            return Ok(Some((lead as char, 1)));
        }

        let len = match lead {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Ok(Some((char::REPLACEMENT_CHARACTER, 1))),
        };

        let mut buf = [lead, 0, 0, 0];
        for slot in 1..len {
            match self.read_byte()? {
                Some(byte) => buf[slot] = byte,
                None => return Ok(Some((char::REPLACEMENT_CHARACTER, slot as u32))),
            }
        }

        match std::str::from_utf8(&buf[..len]) {
            Ok(text) => Ok(text.chars().next().map(|ch| (ch, len as u32))),
            Err(_) => Ok(Some((char::REPLACEMENT_CHARACTER, len as u32))),
        }
    }

    fn decode_utf16(&mut self, big_endian: bool) -> Result<Option<(char, u32)>> {
        let unit = |hi: u8, lo: u8| {
            if big_endian {
                u16::from_be_bytes([hi, lo])
            } else {
                u16::from_le_bytes([hi, lo])
            }
        };

        let Some(b0) = self.read_byte()? else {
            return Ok(None);
        };
        let Some(b1) = self.read_byte()? else {
            return Ok(Some((char::REPLACEMENT_CHARACTER, 1)));
        };
        let first = unit(b0, b1);

        if (0xD800..=0xDBFF).contains(&first) {
            let Some(b2) = self.read_byte()? else {
                return Ok(Some((char::REPLACEMENT_CHARACTER, 2)));
            };
            let Some(b3) = self.read_byte()? else {
                return Ok(Some((char::REPLACEMENT_CHARACTER, 3)));
            };
            let second = unit(b2, b3);

            if (0xDC00..=0xDFFF).contains(&second) {
                let scalar =
                    0x10000 + ((u32::from(first) - 0xD800) << 10) + (u32::from(second) - 0xDC00);
                return Ok(char::from_u32(scalar).map(|ch| (ch, 4)));
            }
            return Ok(Some((char::REPLACEMENT_CHARACTER, 4)));
        }

        if (0xDC00..=0xDFFF).contains(&first) {
            return Ok(Some((char::REPLACEMENT_CHARACTER, 2)));
        }

        Ok(char::from_u32(u32::from(first)).map(|ch| (ch, 2)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Before a field: leading whitespace is insignificant here.
    Start,
    InField,
    InQuotedField,
    /// Between a closing quote and the next separator or line end;
    /// characters here are discarded.
    AfterClosingQuote,
    /// A terminator was just seen; the completed row is about to be handed
    /// out. Transient within one `read_row` call.
    AtLineEnd,
    /// Past a terminator: remaining newline characters of the sequence (and
    /// blank lines) are swallowed here.
    AtLineEndConsumed,
    Done,
}

/// The decoding engine: turns the character stream into rows of fields.
///
/// Owns one reusable row buffer which is overwritten on every
/// [`read_row`](Self::read_row); callers copy out what they need to keep.
pub(crate) struct CsvReader<R: Read + Seek> {
    source: CharCursor<R>,
    options: CsvOptions,
    state: ParseState,
    fields: Vec<String>,
    field: String,
    header: Option<Vec<String>>,
    tab_is_whitespace: bool,
}

impl<R: Read + Seek> CsvReader<R> {
    pub(crate) fn new(source: R, options: CsvOptions) -> Result<Self> {
        options.validate()?;

        let source = CharCursor::new(source, options.encoding)?;
        debug!(
            "csv session opened: encoding {:?}, separator {:?}",
            source.encoding(),
            options.separator
        );

        // A tab separator means tabs are data, not skippable whitespace.
        let tab_is_whitespace = options.separator != '\t';
        let header = if options.has_header_row {
            None
        } else {
            Some(Vec::new())
        };

        Ok(Self {
            source,
            options,
            state: ParseState::Start,
            fields: Vec::new(),
            field: String::new(),
            header,
            tab_is_whitespace,
        })
    }

    pub(crate) fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Fields of the most recently read row. Valid until the next
    /// `read_row` or rewind.
    pub(crate) fn fields(&self) -> &[String] {
        &self.fields
    }

    pub(crate) fn into_source(self) -> R {
        self.source.into_source()
    }

    fn is_quote(&self, ch: char) -> bool {
        self.options.quoting_enabled && ch == self.options.quote_char
    }

    fn is_whitespace(&self, ch: char) -> bool {
        ch == ' ' || (self.tab_is_whitespace && ch == '\t')
    }

    fn end_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.field));
    }

    /// Advance to the next complete row. Returns `false` once the source is
    /// exhausted. Structural problems never fail the call: the row is
    /// terminated at end-of-input from whatever was accumulated.
    pub(crate) fn read_row(&mut self) -> Result<bool> {
        if self.state == ParseState::Done {
            return Ok(false);
        }

        self.fields.clear();
        self.field.clear();

        while let Some(ch) = self.source.next_char()? {
            match self.state {
                ParseState::AtLineEndConsumed => {
                    if is_newline(ch) {
                        // rest of a \r\n pair, or a blank line
                    } else if self.is_whitespace(ch) {
                        self.state = ParseState::Start;
                    } else if self.is_quote(ch) {
                        self.state = ParseState::InQuotedField;
                    } else if ch == self.options.separator {
                        self.end_field();
                        self.state = ParseState::Start;
                    } else {
                        self.state = ParseState::InField;
                        self.field.push(ch);
                    }
                }
                ParseState::Start => {
                    if self.is_whitespace(ch) {
                        // leading whitespace before a field
                    } else if is_newline(ch) {
                        self.end_field();
                        self.state = ParseState::AtLineEnd;
                    } else if self.is_quote(ch) {
                        self.state = ParseState::InQuotedField;
                    } else if ch == self.options.separator {
                        self.end_field();
                    } else {
                        self.state = ParseState::InField;
                        self.field.push(ch);
                    }
                }
                ParseState::InField => {
                    if ch == self.options.separator {
                        self.end_field();
                        self.state = ParseState::Start;
                    } else if is_newline(ch) {
                        self.end_field();
                        self.state = ParseState::AtLineEnd;
                    } else {
                        self.field.push(ch);
                    }
                }
                ParseState::InQuotedField => {
                    if self.is_quote(ch) {
                        if self.source.peek_char()? == Some(self.options.quote_char) {
                            // doubled quote collapses to one literal quote
                            self.source.next_char()?;
                            self.field.push(ch);
                        } else {
                            self.end_field();
                            self.state = ParseState::AfterClosingQuote;
                        }
                    } else if ch == '\\' && self.options.backslash_escapes_quotes {
                        match self.source.peek_char()? {
                            Some(next) if next == self.options.quote_char => {
                                self.source.next_char()?;
                                self.field.push(next);
                            }
                            Some('\\') => {
                                self.source.next_char()?;
                                self.field.push('\\');
                            }
                            _ => self.field.push('\\'),
                        }
                    } else {
                        self.field.push(ch);
                    }
                }
                ParseState::AfterClosingQuote => {
                    // discard anything between the closing quote and the
                    // next separator or line end
                    if ch == self.options.separator {
                        self.state = ParseState::Start;
                    } else if is_newline(ch) {
                        self.state = ParseState::AtLineEnd;
                    }
                }
                ParseState::AtLineEnd | ParseState::Done => unreachable!(),
            }

            if self.state == ParseState::AtLineEnd {
                self.state = ParseState::AtLineEndConsumed;
                return Ok(true);
            }
        }

        // End of input: close out whatever was accumulated, including an
        // unterminated quoted field.
        let emit = match self.state {
            ParseState::Start | ParseState::InField | ParseState::InQuotedField => {
                self.end_field();
                true
            }
            ParseState::AfterClosingQuote => true,
            _ => false,
        };
        self.state = ParseState::Done;
        Ok(emit)
    }

    /// Reset to the start of the data. With `skip_header` the cursor lands
    /// on the first data row (consuming the header row when the dialect has
    /// one, caching it as a side effect).
    pub(crate) fn seek_start(&mut self, skip_header: bool) -> Result<()> {
        trace!("rewinding csv source (skip_header: {})", skip_header);
        self.state = ParseState::Start;
        self.source.rewind()?;

        if skip_header && self.options.has_header_row {
            self.read_row()?;
            if self.header.is_none() {
                self.header = Some(self.fields.clone());
            }
        }

        self.state = if skip_header {
            ParseState::AtLineEndConsumed
        } else {
            ParseState::Start
        };

        Ok(())
    }

    /// The cached header row, computing it on first access via an isolated
    /// pass that restores the cursor position and parse state afterwards,
    /// so an in-progress row iteration is never perturbed.
    pub(crate) fn header_row(&mut self) -> Result<&[String]> {
        if self.header.is_none() {
            debug!("computing header row via isolated pass");
            let saved_position = self.source.position();
            let saved_state = self.state;
            let saved_fields = std::mem::take(&mut self.fields);

            self.seek_start(false)?;
            let header = if self.read_row()? {
                self.fields.clone()
            } else {
                Vec::new()
            };

            self.source.seek_to(saved_position)?;
            self.state = saved_state;
            self.fields = saved_fields;
            self.header = Some(header);
        }

        Ok(self.header.as_deref().unwrap_or(&[]))
    }
}
