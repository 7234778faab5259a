//! Typed field values: coercion from raw field text and rendering for output

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CsvError, Result};

/// Formatting rules applied when coercing field text to typed values and
/// when rendering typed values back to text.
///
/// The defaults correspond to an invariant style: `.` decimal point, `,`
/// accepted as a thousands separator on input (never emitted), and
/// `%m/%d/%Y %H:%M:%S` timestamps. The date patterns are chrono `strftime`
/// patterns; an invalid pattern surfaces as a formatting panic from chrono,
/// so treat these as configuration rather than untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatContext {
    /// Character accepted (and emitted) as the decimal point.
    pub decimal_separator: char,
    /// Grouping character stripped before numeric parsing, if any.
    pub thousands_separator: Option<char>,
    /// Pattern for [`chrono::NaiveDate`] values.
    pub date_format: String,
    /// Pattern for [`chrono::NaiveDateTime`] values.
    pub datetime_format: String,
}

impl Default for FormatContext {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            thousands_separator: Some(','),
            date_format: "%m/%d/%Y".to_string(),
            datetime_format: "%m/%d/%Y %H:%M:%S".to_string(),
        }
    }
}

/// Normalize numeric field text: trim, strip the thousands separator and
/// map the configured decimal separator to `.`.
///
/// Borrows when the text is already in canonical form.
fn normalize_numeric<'a>(raw: &'a str, ctx: &FormatContext) -> Cow<'a, str> {
    let trimmed = raw.trim();

    let needs_rewrite = ctx
        .thousands_separator
        .map(|sep| trimmed.contains(sep))
        .unwrap_or(false)
        || (ctx.decimal_separator != '.' && trimmed.contains(ctx.decimal_separator));

    if !needs_rewrite {
        return Cow::Borrowed(trimmed);
    }

    let mut result = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if Some(ch) == ctx.thousands_separator {
            continue;
        }
        if ch == ctx.decimal_separator {
            result.push('.');
        } else {
            result.push(ch);
        }
    }

    Cow::Owned(result)
}

/// Conversion from a raw CSV field to a typed value.
///
/// This is the seam shared by the typed [`Row`](crate::Row) getters and the
/// [`RowBinding`](crate::RowBinding) mapping layer. `Option<T>` is
/// implemented for every implementor and maps an empty field to `None`
/// without attempting a parse.
pub trait FromField: Sized {
    /// Type name used in error messages.
    fn type_name() -> &'static str;

    /// Parse a non-empty raw field. `None` signals a format failure.
    fn from_field(raw: &str, ctx: &FormatContext) -> Option<Self>;

    /// Value to use for an empty field. `use_default` carries the session's
    /// default-empty-values policy; `None` signals a format failure.
    fn from_empty(use_default: bool) -> Option<Self>;
}

macro_rules! numeric_from_field {
    ($($ty:ty),* $(,)?) => {$(
        impl FromField for $ty {
            fn type_name() -> &'static str {
                stringify!($ty)
            }

            fn from_field(raw: &str, ctx: &FormatContext) -> Option<Self> {
                normalize_numeric(raw, ctx).parse().ok()
            }

            fn from_empty(use_default: bool) -> Option<Self> {
                use_default.then_some(<$ty>::default())
            }
        }
    )*};
}

numeric_from_field!(i16, i32, i64, u32, u64, f32, f64);

impl FromField for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn from_field(raw: &str, _ctx: &FormatContext) -> Option<Self> {
        Some(raw.to_owned())
    }

    // An empty string field is a value, not an absence.
    fn from_empty(_use_default: bool) -> Option<Self> {
        Some(String::new())
    }
}

impl FromField for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_field(raw: &str, _ctx: &FormatContext) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
            Some(true)
        } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
            Some(false)
        } else {
            None
        }
    }

    fn from_empty(use_default: bool) -> Option<Self> {
        use_default.then_some(false)
    }
}

impl FromField for Decimal {
    fn type_name() -> &'static str {
        "decimal"
    }

    fn from_field(raw: &str, ctx: &FormatContext) -> Option<Self> {
        Decimal::from_str(&normalize_numeric(raw, ctx)).ok()
    }

    fn from_empty(use_default: bool) -> Option<Self> {
        use_default.then_some(Decimal::ZERO)
    }
}

impl FromField for NaiveDateTime {
    fn type_name() -> &'static str {
        "datetime"
    }

    fn from_field(raw: &str, ctx: &FormatContext) -> Option<Self> {
        let trimmed = raw.trim();
        NaiveDateTime::parse_from_str(trimmed, &ctx.datetime_format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, &ctx.date_format)
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }

    fn from_empty(use_default: bool) -> Option<Self> {
        use_default.then_some(NaiveDateTime::UNIX_EPOCH)
    }
}

impl FromField for NaiveDate {
    fn type_name() -> &'static str {
        "date"
    }

    fn from_field(raw: &str, ctx: &FormatContext) -> Option<Self> {
        NaiveDate::parse_from_str(raw.trim(), &ctx.date_format).ok()
    }

    fn from_empty(use_default: bool) -> Option<Self> {
        use_default.then_some(NaiveDateTime::UNIX_EPOCH.date())
    }
}

impl<T: FromField> FromField for Option<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn from_field(raw: &str, ctx: &FormatContext) -> Option<Self> {
        T::from_field(raw, ctx).map(Some)
    }

    fn from_empty(_use_default: bool) -> Option<Self> {
        Some(None)
    }
}

/// Coerce one raw field, applying the empty-field policy uniformly and
/// wrapping failures with their position.
pub(crate) fn coerce<T: FromField>(
    raw: &str,
    row: u64,
    index: usize,
    ctx: &FormatContext,
    default_empty: bool,
) -> Result<T> {
    let parsed = if raw.is_empty() {
        T::from_empty(default_empty)
    } else {
        T::from_field(raw, ctx)
    };

    parsed.ok_or_else(|| CsvError::InvalidField {
        row,
        index,
        value: raw.to_owned(),
        target: T::type_name(),
    })
}

/// A single typed field value handed to the [`CsvBuilder`](crate::CsvBuilder).
///
/// `Null` renders as a fully empty field (no quotes, even under
/// `quote_all_fields`). All other variants render their natural textual
/// form under the active [`FormatContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum CsvValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Str(String),
}

impl CsvValue {
    /// Textual form of the value, or `None` for `Null`.
    pub(crate) fn render(&self, ctx: &FormatContext) -> Option<String> {
        match self {
            CsvValue::Null => None,
            CsvValue::Bool(value) => Some(value.to_string()),
            CsvValue::Int(value) => Some(value.to_string()),
            CsvValue::Float(value) => Some(localize_point(value.to_string(), ctx)),
            CsvValue::Decimal(value) => Some(localize_point(value.to_string(), ctx)),
            CsvValue::Date(value) => Some(value.format(&ctx.date_format).to_string()),
            CsvValue::DateTime(value) => Some(value.format(&ctx.datetime_format).to_string()),
            CsvValue::Str(value) => Some(value.clone()),
        }
    }
}

fn localize_point(text: String, ctx: &FormatContext) -> String {
    if ctx.decimal_separator == '.' {
        text
    } else {
        text.replace('.', &ctx.decimal_separator.to_string())
    }
}

impl From<&str> for CsvValue {
    fn from(value: &str) -> Self {
        CsvValue::Str(value.to_owned())
    }
}

impl From<String> for CsvValue {
    fn from(value: String) -> Self {
        CsvValue::Str(value)
    }
}

impl From<bool> for CsvValue {
    fn from(value: bool) -> Self {
        CsvValue::Bool(value)
    }
}

impl From<i32> for CsvValue {
    fn from(value: i32) -> Self {
        CsvValue::Int(value.into())
    }
}

impl From<i64> for CsvValue {
    fn from(value: i64) -> Self {
        CsvValue::Int(value)
    }
}

impl From<f64> for CsvValue {
    fn from(value: f64) -> Self {
        CsvValue::Float(value)
    }
}

impl From<Decimal> for CsvValue {
    fn from(value: Decimal) -> Self {
        CsvValue::Decimal(value)
    }
}

impl From<NaiveDate> for CsvValue {
    fn from(value: NaiveDate) -> Self {
        CsvValue::Date(value)
    }
}

impl From<NaiveDateTime> for CsvValue {
    fn from(value: NaiveDateTime) -> Self {
        CsvValue::DateTime(value)
    }
}

impl<T: Into<CsvValue>> From<Option<T>> for CsvValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CsvValue::Null)
    }
}
