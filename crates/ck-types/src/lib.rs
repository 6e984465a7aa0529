#![forbid(unsafe_code)]

use std::fmt;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed type tag carried by every concrete column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    Short,
    Int,
    Long,
    Float,
    Double,
    Category,
    Date,
    Time,
    DateTime,
}

impl ColumnType {
    pub const ALL: [Self; 10] = [
        Self::Boolean,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Category,
        Self::Date,
        Self::Time,
        Self::DateTime,
    ];

    #[must_use]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating()
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Short | Self::Int | Self::Long)
    }

    #[must_use]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::DateTime)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Category => "category",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date_time",
        }
    }

    fn integer_rank(self) -> u8 {
        match self {
            Self::Short => 1,
            Self::Int => 2,
            Self::Long => 3,
            _ => 0,
        }
    }

    /// Result type of element-wise arithmetic between two numeric types.
    ///
    /// Integer operands widen to the wider integer type. Any floating operand
    /// promotes to the widest floating operand, except that `long` with `float`
    /// goes to `double`. Division always yields a floating type, and two
    /// integer operands divide into `double`.
    pub fn arithmetic_result(self, other: Self, divide: bool) -> Result<Self, TypeError> {
        if !self.is_numeric() || !other.is_numeric() {
            return Err(TypeError::IncompatibleTypes {
                left: self,
                right: other,
            });
        }

        let out = if self.is_integer() && other.is_integer() {
            if divide {
                Self::Double
            } else if self.integer_rank() >= other.integer_rank() {
                self
            } else {
                other
            }
        } else if self == Self::Double
            || other == Self::Double
            || self == Self::Long
            || other == Self::Long
        {
            Self::Double
        } else {
            Self::Float
        };

        Ok(out)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Missing-value sentinels ────────────────────────────────────────────

/// Reserved in-domain values standing for "no data", one per column type.
///
/// Legitimate data never takes these values: parsers and arithmetic reject
/// any result that collides with the sentinel of its target type.
pub mod missing {
    pub const BOOLEAN: i8 = i8::MIN;
    pub const SHORT: i16 = i16::MIN;
    pub const INT: i32 = i32::MIN;
    pub const LONG: i64 = i64::MIN;
    pub const FLOAT: f32 = f32::NAN;
    pub const DOUBLE: f64 = f64::NAN;
    pub const CATEGORY: &str = "";
    /// Days since 0001-01-01.
    pub const DATE: i32 = i32::MIN;
    /// Milliseconds after midnight.
    pub const TIME: i32 = -1;
    /// Milliseconds since the Unix epoch.
    pub const DATE_TIME: i64 = i64::MIN;
}

// ── Scalars ────────────────────────────────────────────────────────────

/// A single dynamically-typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Missing,
    Bool(bool),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Scalar {
    /// The column type this value belongs to; `None` for [`Scalar::Missing`].
    #[must_use]
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Missing => None,
            Self::Bool(_) => Some(ColumnType::Boolean),
            Self::Short(_) => Some(ColumnType::Short),
            Self::Int(_) => Some(ColumnType::Int),
            Self::Long(_) => Some(ColumnType::Long),
            Self::Float(_) => Some(ColumnType::Float),
            Self::Double(_) => Some(ColumnType::Double),
            Self::Text(_) => Some(ColumnType::Category),
            Self::Date(_) => Some(ColumnType::Date),
            Self::Time(_) => Some(ColumnType::Time),
            Self::DateTime(_) => Some(ColumnType::DateTime),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Float(v) => v.is_nan(),
            Self::Double(v) => v.is_nan(),
            Self::Text(v) => v.is_empty(),
            _ => false,
        }
    }

    /// NaN-aware equality: two missing values compare equal.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        if self.is_missing() || other.is_missing() {
            return self.is_missing() && other.is_missing();
        }
        self == other
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Short(v) => Ok(f64::from(*v)),
            Self::Int(v) => Ok(f64::from(*v)),
            Self::Long(v) => Ok(*v as f64),
            Self::Float(v) if !v.is_nan() => Ok(f64::from(*v)),
            Self::Double(v) if !v.is_nan() => Ok(*v),
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Missing | Self::Float(_) | Self::Double(_) => Err(TypeError::ValueIsMissing),
            other => Err(TypeError::NonNumericValue {
                value: other.to_string(),
                column_type: other.column_type().unwrap_or(ColumnType::Category),
            }),
        }
    }

    /// Integer view of integral scalars.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Short(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_nan() => Ok(()),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) if v.is_nan() => Ok(()),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Time(v) => f.write_str(&render_time(*v)),
            Self::DateTime(v) => f.write_str(&render_date_time(*v)),
        }
    }
}

/// `HH:MM:SS`, with `.mmm` only when the milliseconds are non-zero.
#[must_use]
pub fn render_time(time: NaiveTime) -> String {
    if time.nanosecond() / 1_000_000 == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.3f").to_string()
    }
}

#[must_use]
pub fn render_date_time(value: NaiveDateTime) -> String {
    format!("{}T{}", value.date().format("%Y-%m-%d"), render_time(value.time()))
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i16> for Scalar {
    fn from(value: i16) -> Self {
        Self::Short(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for Scalar {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

// ── Errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("no arithmetic result type for {left} and {right}")]
    IncompatibleTypes { left: ColumnType, right: ColumnType },
    #[error("value {value:?} of type {column_type} is not numeric")]
    NonNumericValue {
        value: String,
        column_type: ColumnType,
    },
    #[error("value is missing")]
    ValueIsMissing,
}

/// Text that could not be converted into a column's native cell type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot parse {text:?} as {column_type}: {detail}")]
pub struct ParseError {
    pub text: String,
    pub column_type: ColumnType,
    pub detail: String,
}

impl ParseError {
    #[must_use]
    pub fn new(text: &str, column_type: ColumnType, detail: impl Into<String>) -> Self {
        Self {
            text: text.to_owned(),
            column_type,
            detail: detail.into(),
        }
    }
}

// ── Parse options ──────────────────────────────────────────────────────

/// Configuration for turning cell text into native values.
///
/// Every field has a default, so a partial JSON/TOML document deserializes
/// into a complete set of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ParseOptions {
    /// Exact (trimmed, case-sensitive) tokens that append a missing cell.
    pub missing_tokens: Vec<String>,
    /// Tokens read as `true`, compared case-insensitively.
    pub true_tokens: Vec<String>,
    /// Tokens read as `false`, compared case-insensitively.
    pub false_tokens: Vec<String>,
    /// `chrono` formats tried in order for date cells.
    pub date_formats: Vec<String>,
    pub time_formats: Vec<String>,
    pub date_time_formats: Vec<String>,
    /// Initial buffer capacity for newly created columns.
    pub default_capacity: usize,
}

fn owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| (*t).to_owned()).collect()
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            missing_tokens: owned(&["", "NA", "N/A", "NaN", "null", "-"]),
            true_tokens: owned(&["true", "t", "yes", "y", "1"]),
            false_tokens: owned(&["false", "f", "no", "n", "0"]),
            date_formats: owned(&["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d", "%d-%b-%Y"]),
            time_formats: owned(&["%H:%M:%S%.f", "%H:%M:%S", "%H:%M", "%I:%M %p"]),
            date_time_formats: owned(&[
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M",
                "%Y-%m-%d %H:%M",
            ]),
            default_capacity: 128,
        }
    }
}

impl ParseOptions {
    /// Process-wide default options.
    #[must_use]
    pub fn standard() -> &'static Self {
        static STANDARD: OnceLock<ParseOptions> = OnceLock::new();
        STANDARD.get_or_init(Self::default)
    }

    #[must_use]
    pub fn is_missing_token(&self, text: &str) -> bool {
        self.missing_tokens.iter().any(|token| token == text)
    }

    #[must_use]
    pub fn parse_bool(&self, text: &str) -> Option<bool> {
        if self
            .true_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(text))
        {
            Some(true)
        } else if self
            .false_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(text))
        {
            Some(false)
        } else {
            None
        }
    }

    #[must_use]
    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        self.date_formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
    }

    #[must_use]
    pub fn parse_time(&self, text: &str) -> Option<NaiveTime> {
        self.time_formats
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
    }

    #[must_use]
    pub fn parse_date_time(&self, text: &str) -> Option<NaiveDateTime> {
        self.date_time_formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ColumnType, ParseOptions, Scalar, TypeError};

    #[test]
    fn integer_arithmetic_widens_to_larger_integer() {
        assert_eq!(
            ColumnType::Short.arithmetic_result(ColumnType::Int, false),
            Ok(ColumnType::Int)
        );
        assert_eq!(
            ColumnType::Long.arithmetic_result(ColumnType::Int, false),
            Ok(ColumnType::Long)
        );
        assert_eq!(
            ColumnType::Int.arithmetic_result(ColumnType::Int, false),
            Ok(ColumnType::Int)
        );
    }

    #[test]
    fn division_always_promotes_to_floating() {
        assert_eq!(
            ColumnType::Int.arithmetic_result(ColumnType::Int, true),
            Ok(ColumnType::Double)
        );
        assert_eq!(
            ColumnType::Float.arithmetic_result(ColumnType::Short, true),
            Ok(ColumnType::Float)
        );
    }

    #[test]
    fn floating_operand_promotes_to_widest_float() {
        assert_eq!(
            ColumnType::Int.arithmetic_result(ColumnType::Float, false),
            Ok(ColumnType::Float)
        );
        assert_eq!(
            ColumnType::Float.arithmetic_result(ColumnType::Double, false),
            Ok(ColumnType::Double)
        );
        assert_eq!(
            ColumnType::Long.arithmetic_result(ColumnType::Float, false),
            Ok(ColumnType::Double)
        );
    }

    #[test]
    fn arithmetic_rejects_non_numeric_types() {
        let err = ColumnType::Category
            .arithmetic_result(ColumnType::Int, false)
            .expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "no arithmetic result type for category and int"
        );
    }

    #[test]
    fn scalar_display_shows_millis_only_when_present() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 17).expect("date");
        let whole = day.and_hms_opt(9, 30, 0).expect("time");
        let fractional = day.and_hms_milli_opt(9, 30, 0, 125).expect("time");
        assert_eq!(Scalar::Time(whole.time()).to_string(), "09:30:00");
        assert_eq!(Scalar::Time(fractional.time()).to_string(), "09:30:00.125");
        assert_eq!(Scalar::DateTime(whole).to_string(), "2024-05-17T09:30:00");
        assert_eq!(
            Scalar::DateTime(fractional).to_string(),
            "2024-05-17T09:30:00.125"
        );
    }

    #[test]
    fn scalar_missingness_covers_nan_and_empty_text() {
        assert!(Scalar::Missing.is_missing());
        assert!(Scalar::Double(f64::NAN).is_missing());
        assert!(Scalar::Float(f32::NAN).is_missing());
        assert!(Scalar::Text(String::new()).is_missing());
        assert!(!Scalar::Int(0).is_missing());
        assert!(Scalar::Double(f64::NAN).semantic_eq(&Scalar::Missing));
    }

    #[test]
    fn scalar_to_f64_projects_numeric_values() {
        assert_eq!(Scalar::Int(7).to_f64(), Ok(7.0));
        assert_eq!(Scalar::Short(-2).to_f64(), Ok(-2.0));
        assert_eq!(Scalar::Missing.to_f64(), Err(TypeError::ValueIsMissing));
        assert!(matches!(
            Scalar::from("x").to_f64(),
            Err(TypeError::NonNumericValue { .. })
        ));
    }

    #[test]
    fn default_options_recognize_missing_tokens() {
        let options = ParseOptions::standard();
        assert!(options.is_missing_token(""));
        assert!(options.is_missing_token("NA"));
        assert!(!options.is_missing_token("na"));
        assert_eq!(options.parse_bool("YES"), Some(true));
        assert_eq!(options.parse_bool("F"), Some(false));
        assert_eq!(options.parse_bool("maybe"), None);
    }

    #[test]
    fn default_options_try_date_formats_in_order() {
        let options = ParseOptions::default();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
        assert_eq!(options.parse_date("2024-03-09"), Some(expected));
        assert_eq!(options.parse_date("03/09/2024"), Some(expected));
        assert_eq!(options.parse_date("20240309"), Some(expected));
        assert_eq!(options.parse_date("9 March"), None);
    }

    #[test]
    fn partial_options_document_fills_defaults() {
        let options: ParseOptions =
            serde_json::from_str(r#"{"missing_tokens": ["?"], "default_capacity": 16}"#)
                .expect("options parse");
        assert_eq!(options.missing_tokens, vec!["?".to_owned()]);
        assert_eq!(options.default_capacity, 16);
        assert_eq!(options.date_formats, ParseOptions::default().date_formats);
    }
}
