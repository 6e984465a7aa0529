//! Cell kinds: the per-type storage, parsing and ordering rules behind
//! [`TypedColumn`](crate::TypedColumn).
//!
//! A kind is a zero-sized marker naming a native storage type, its missing
//! sentinel and the conversions between native cells and user-facing values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use ck_types::{
    ColumnType, ParseError, ParseOptions, Scalar, missing, render_date_time, render_time,
};

pub trait CellKind: fmt::Debug + Clone + Copy + Default + Send + Sync + 'static {
    type Native: Copy + fmt::Debug + PartialEq + PartialOrd + Send + Sync + 'static;
    type Value: Clone + fmt::Debug + PartialEq;

    const COLUMN_TYPE: ColumnType;
    const MISSING: Self::Native;

    fn is_missing(native: Self::Native) -> bool;

    /// Parses trimmed, non-missing text.
    fn parse(text: &str, options: &ParseOptions) -> Result<Self::Native, ParseError>;

    /// Text of a non-missing cell.
    fn render(native: Self::Native) -> String;

    /// Total order in which the missing sentinel is the minimum.
    fn compare(a: Self::Native, b: Self::Native) -> Ordering;

    /// Identity used for distinct-value counting.
    fn hash_key(native: Self::Native) -> u64;

    fn encode(value: Self::Value) -> Self::Native;

    fn decode(native: Self::Native) -> Option<Self::Value>;

    fn to_scalar(native: Self::Native) -> Scalar;

    /// Double view used by summaries; `None` for non-numeric kinds.
    fn numeric_value(_native: Self::Native) -> Option<f64> {
        None
    }
}

/// Kinds whose cells are numbers.
pub trait NumericKind: CellKind {
    const ZERO: Self::Native;

    /// Raw conversion; sentinels convert verbatim.
    fn to_f64(native: Self::Native) -> f64;

    /// Integer view, `None` for floating kinds.
    fn as_i64(native: Self::Native) -> Option<i64>;

    fn negate(native: Self::Native) -> Self::Native;

    fn absolute(native: Self::Native) -> Self::Native;
}

pub trait IntegerKind: NumericKind {
    fn to_i64(native: Self::Native) -> i64;

    /// `None` when `value` does not fit or equals the missing sentinel.
    fn from_i64(value: i64) -> Option<Self::Native>;
}

pub trait FloatingKind: NumericKind {
    fn from_f64(value: f64) -> Self::Native;
}

pub trait TemporalKind: CellKind {}

/// Kinds with a calendar date component.
pub trait CalendarKind: TemporalKind {
    fn date_of(native: Self::Native) -> Option<NaiveDate>;
}

/// Kinds with a wall-clock time component.
pub trait ClockKind: TemporalKind {
    fn time_of(native: Self::Native) -> Option<NaiveTime>;
}

fn collides(text: &str, column_type: ColumnType) -> ParseError {
    ParseError::new(text, column_type, "value collides with the missing sentinel")
}

// ── Integers ───────────────────────────────────────────────────────────

macro_rules! integer_kind {
    ($(#[$meta:meta])* $kind:ident, $native:ty, $column_type:ident, $sentinel:expr, $scalar:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $kind;

        impl CellKind for $kind {
            type Native = $native;
            type Value = $native;

            const COLUMN_TYPE: ColumnType = ColumnType::$column_type;
            const MISSING: $native = $sentinel;

            fn is_missing(native: $native) -> bool {
                native == $sentinel
            }

            fn parse(text: &str, _options: &ParseOptions) -> Result<$native, ParseError> {
                let value = text
                    .parse::<$native>()
                    .map_err(|err| ParseError::new(text, Self::COLUMN_TYPE, err.to_string()))?;
                if value == $sentinel {
                    return Err(collides(text, Self::COLUMN_TYPE));
                }
                Ok(value)
            }

            fn render(native: $native) -> String {
                native.to_string()
            }

            fn compare(a: $native, b: $native) -> Ordering {
                a.cmp(&b)
            }

            fn hash_key(native: $native) -> u64 {
                native as u64
            }

            fn encode(value: $native) -> $native {
                value
            }

            fn decode(native: $native) -> Option<$native> {
                (native != $sentinel).then_some(native)
            }

            fn to_scalar(native: $native) -> Scalar {
                if native == $sentinel {
                    Scalar::Missing
                } else {
                    Scalar::$scalar(native)
                }
            }

            fn numeric_value(native: $native) -> Option<f64> {
                (native != $sentinel).then_some(native as f64)
            }
        }

        impl NumericKind for $kind {
            const ZERO: $native = 0;

            fn to_f64(native: $native) -> f64 {
                native as f64
            }

            fn as_i64(native: $native) -> Option<i64> {
                (native != $sentinel).then_some(i64::from(native))
            }

            fn negate(native: $native) -> $native {
                if native == $sentinel { native } else { -native }
            }

            fn absolute(native: $native) -> $native {
                if native == $sentinel { native } else { native.abs() }
            }
        }

        impl IntegerKind for $kind {
            fn to_i64(native: $native) -> i64 {
                i64::from(native)
            }

            fn from_i64(value: i64) -> Option<$native> {
                <$native>::try_from(value).ok().filter(|v| *v != $sentinel)
            }
        }
    };
}

integer_kind!(ShortKind, i16, Short, missing::SHORT, Short);
integer_kind!(IntKind, i32, Int, missing::INT, Int);
integer_kind!(LongKind, i64, Long, missing::LONG, Long);

// ── Floating point ─────────────────────────────────────────────────────

macro_rules! floating_kind {
    ($kind:ident, $native:ty, $column_type:ident, $scalar:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $kind;

        impl CellKind for $kind {
            type Native = $native;
            type Value = $native;

            const COLUMN_TYPE: ColumnType = ColumnType::$column_type;
            const MISSING: $native = <$native>::NAN;

            fn is_missing(native: $native) -> bool {
                native.is_nan()
            }

            fn parse(text: &str, _options: &ParseOptions) -> Result<$native, ParseError> {
                let value = text
                    .parse::<$native>()
                    .map_err(|err| ParseError::new(text, Self::COLUMN_TYPE, err.to_string()))?;
                if value.is_nan() {
                    return Err(collides(text, Self::COLUMN_TYPE));
                }
                Ok(value)
            }

            fn render(native: $native) -> String {
                native.to_string()
            }

            fn compare(a: $native, b: $native) -> Ordering {
                match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    // -0.0 and 0.0 compare equal
                    (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                }
            }

            fn hash_key(native: $native) -> u64 {
                // -0.0 and 0.0 are the same value
                if native == 0.0 {
                    0
                } else {
                    u64::from(native.to_bits())
                }
            }

            fn encode(value: $native) -> $native {
                value
            }

            fn decode(native: $native) -> Option<$native> {
                (!native.is_nan()).then_some(native)
            }

            fn to_scalar(native: $native) -> Scalar {
                if native.is_nan() {
                    Scalar::Missing
                } else {
                    Scalar::$scalar(native)
                }
            }

            fn numeric_value(native: $native) -> Option<f64> {
                (!native.is_nan()).then_some(f64::from(native))
            }
        }

        impl NumericKind for $kind {
            const ZERO: $native = 0.0;

            fn to_f64(native: $native) -> f64 {
                f64::from(native)
            }

            fn as_i64(_native: $native) -> Option<i64> {
                None
            }

            fn negate(native: $native) -> $native {
                -native
            }

            fn absolute(native: $native) -> $native {
                native.abs()
            }
        }
    };
}

floating_kind!(FloatKind, f32, Float, Float);
floating_kind!(DoubleKind, f64, Double, Double);

impl FloatingKind for FloatKind {
    fn from_f64(value: f64) -> f32 {
        value as f32
    }
}

impl FloatingKind for DoubleKind {
    fn from_f64(value: f64) -> f64 {
        value
    }
}

// ── Boolean ────────────────────────────────────────────────────────────

/// Booleans stored as `i8`: `1` true, `0` false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BooleanKind;

impl CellKind for BooleanKind {
    type Native = i8;
    type Value = bool;

    const COLUMN_TYPE: ColumnType = ColumnType::Boolean;
    const MISSING: i8 = missing::BOOLEAN;

    fn is_missing(native: i8) -> bool {
        native == missing::BOOLEAN
    }

    fn parse(text: &str, options: &ParseOptions) -> Result<i8, ParseError> {
        options
            .parse_bool(text)
            .map(Self::encode)
            .ok_or_else(|| ParseError::new(text, Self::COLUMN_TYPE, "not a boolean token"))
    }

    fn render(native: i8) -> String {
        (native == 1).to_string()
    }

    fn compare(a: i8, b: i8) -> Ordering {
        a.cmp(&b)
    }

    fn hash_key(native: i8) -> u64 {
        native as u64
    }

    fn encode(value: bool) -> i8 {
        i8::from(value)
    }

    fn decode(native: i8) -> Option<bool> {
        (native != missing::BOOLEAN).then_some(native == 1)
    }

    fn to_scalar(native: i8) -> Scalar {
        Self::decode(native).map_or(Scalar::Missing, Scalar::Bool)
    }
}

// ── Temporal ───────────────────────────────────────────────────────────

const MILLIS_PER_SECOND: u32 = 1_000;
const NANOS_PER_MILLI: u32 = 1_000_000;

fn time_to_millis(time: NaiveTime) -> i32 {
    // leap seconds report nanos above one second
    let millis = (time.nanosecond() / NANOS_PER_MILLI).min(MILLIS_PER_SECOND - 1);
    (time.num_seconds_from_midnight() * MILLIS_PER_SECOND + millis) as i32
}

fn millis_to_time(millis: i32) -> Option<NaiveTime> {
    let millis = u32::try_from(millis).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(
        millis / MILLIS_PER_SECOND,
        (millis % MILLIS_PER_SECOND) * NANOS_PER_MILLI,
    )
}

/// Calendar dates stored as chrono's day number counted from 0001-01-01.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateKind;

impl CellKind for DateKind {
    type Native = i32;
    type Value = NaiveDate;

    const COLUMN_TYPE: ColumnType = ColumnType::Date;
    const MISSING: i32 = missing::DATE;

    fn is_missing(native: i32) -> bool {
        native == missing::DATE
    }

    fn parse(text: &str, options: &ParseOptions) -> Result<i32, ParseError> {
        options
            .parse_date(text)
            .map(Self::encode)
            .ok_or_else(|| ParseError::new(text, Self::COLUMN_TYPE, "no date format matched"))
    }

    fn render(native: i32) -> String {
        Self::decode(native).map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string())
    }

    fn compare(a: i32, b: i32) -> Ordering {
        a.cmp(&b)
    }

    fn hash_key(native: i32) -> u64 {
        native as u64
    }

    fn encode(value: NaiveDate) -> i32 {
        value.num_days_from_ce()
    }

    fn decode(native: i32) -> Option<NaiveDate> {
        if native == missing::DATE {
            return None;
        }
        NaiveDate::from_num_days_from_ce_opt(native)
    }

    fn to_scalar(native: i32) -> Scalar {
        Self::decode(native).map_or(Scalar::Missing, Scalar::Date)
    }
}

impl TemporalKind for DateKind {}

impl CalendarKind for DateKind {
    fn date_of(native: i32) -> Option<NaiveDate> {
        Self::decode(native)
    }
}

/// Wall-clock times stored as milliseconds after midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimeKind;

impl CellKind for TimeKind {
    type Native = i32;
    type Value = NaiveTime;

    const COLUMN_TYPE: ColumnType = ColumnType::Time;
    const MISSING: i32 = missing::TIME;

    fn is_missing(native: i32) -> bool {
        native == missing::TIME
    }

    fn parse(text: &str, options: &ParseOptions) -> Result<i32, ParseError> {
        options
            .parse_time(text)
            .map(Self::encode)
            .ok_or_else(|| ParseError::new(text, Self::COLUMN_TYPE, "no time format matched"))
    }

    fn render(native: i32) -> String {
        millis_to_time(native).map_or_else(String::new, render_time)
    }

    fn compare(a: i32, b: i32) -> Ordering {
        a.cmp(&b)
    }

    fn hash_key(native: i32) -> u64 {
        native as u64
    }

    fn encode(value: NaiveTime) -> i32 {
        time_to_millis(value)
    }

    fn decode(native: i32) -> Option<NaiveTime> {
        millis_to_time(native)
    }

    fn to_scalar(native: i32) -> Scalar {
        Self::decode(native).map_or(Scalar::Missing, Scalar::Time)
    }
}

impl TemporalKind for TimeKind {}

impl ClockKind for TimeKind {
    fn time_of(native: i32) -> Option<NaiveTime> {
        Self::decode(native)
    }
}

/// Naive date-times stored as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateTimeKind;

impl CellKind for DateTimeKind {
    type Native = i64;
    type Value = NaiveDateTime;

    const COLUMN_TYPE: ColumnType = ColumnType::DateTime;
    const MISSING: i64 = missing::DATE_TIME;

    fn is_missing(native: i64) -> bool {
        native == missing::DATE_TIME
    }

    fn parse(text: &str, options: &ParseOptions) -> Result<i64, ParseError> {
        options
            .parse_date_time(text)
            .map(Self::encode)
            .ok_or_else(|| {
                ParseError::new(text, Self::COLUMN_TYPE, "no date-time format matched")
            })
    }

    fn render(native: i64) -> String {
        Self::decode(native).map_or_else(String::new, render_date_time)
    }

    fn compare(a: i64, b: i64) -> Ordering {
        a.cmp(&b)
    }

    fn hash_key(native: i64) -> u64 {
        native as u64
    }

    fn encode(value: NaiveDateTime) -> i64 {
        value.and_utc().timestamp_millis()
    }

    fn decode(native: i64) -> Option<NaiveDateTime> {
        if native == missing::DATE_TIME {
            return None;
        }
        DateTime::from_timestamp_millis(native).map(|dt| dt.naive_utc())
    }

    fn to_scalar(native: i64) -> Scalar {
        Self::decode(native).map_or(Scalar::Missing, Scalar::DateTime)
    }
}

impl TemporalKind for DateTimeKind {}

impl CalendarKind for DateTimeKind {
    fn date_of(native: i64) -> Option<NaiveDate> {
        Self::decode(native).map(|dt| dt.date())
    }
}

impl ClockKind for DateTimeKind {
    fn time_of(native: i64) -> Option<NaiveTime> {
        Self::decode(native).map(|dt| dt.time())
    }
}
