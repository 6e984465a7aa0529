#![forbid(unsafe_code)]

//! The column family.
//!
//! Every concrete column implements [`Column`]; the numeric ones also
//! implement [`NumericColumn`], whose statistics all route through
//! `ck-stats`. [`AnyColumn`] closes the family into one enum for callers
//! that do not know a column's type statically.

mod any;
mod arithmetic;
mod boolean;
mod category;
mod kind;
mod numeric;
mod temporal;
mod typed;

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use ck_selection::Selection;
use ck_stats::{Stats, StatsError};
use ck_types::{ColumnType, ParseError, ParseOptions, TypeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use any::AnyColumn;
pub use arithmetic::{ArithmeticOp, Operand, binary, binary_scalar, evaluate};
pub use category::CategoryColumn;
pub use kind::{
    BooleanKind, CalendarKind, CellKind, ClockKind, DateKind, DateTimeKind, DoubleKind,
    FloatKind, FloatingKind, IntKind, IntegerKind, LongKind, NumericKind, ShortKind,
    TemporalKind, TimeKind,
};
pub use typed::{
    BooleanColumn, DateColumn, DateTimeColumn, DoubleColumn, FloatColumn, IntColumn,
    LongColumn, ShortColumn, TimeColumn, TypedColumn,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("column type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ColumnType,
        found: ColumnType,
    },
    #[error("{operation} is not supported for {column_type} columns")]
    Unsupported {
        operation: &'static str,
        column_type: ColumnType,
    },
    #[error("row {row} is out of bounds for a column of {size} rows")]
    RowOutOfBounds { row: usize, size: usize },
    #[error("result at row {row} does not fit in a {column_type} column")]
    Overflow { row: usize, column_type: ColumnType },
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl From<regex::Error> for ColumnError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}

/// Opaque per-instance column identity.
///
/// Fresh ids come from a process-wide counter; only [`Column::copy`]
/// carries an id over to a new column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(u64);

impl ColumnId {
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Labelled per-column description, rendered by tables as a two-column
/// sub-table.
#[derive(Debug, Clone)]
pub struct Summary {
    pub title: String,
    pub labels: CategoryColumn,
    pub values: AnyColumn,
}

impl Summary {
    fn titled(column_name: &str, labels: CategoryColumn, values: AnyColumn) -> Self {
        Self {
            title: format!("Column: {column_name}"),
            labels,
            values,
        }
    }
}

pub(crate) fn check_rows(rows: &[usize], size: usize) -> Result<(), ColumnError> {
    match rows.iter().find(|row| **row >= size) {
        Some(&row) => Err(ColumnError::RowOutOfBounds { row, size }),
        None => Ok(()),
    }
}

pub(crate) fn check_lengths(left: usize, right: usize) -> Result<(), ColumnError> {
    if left == right {
        Ok(())
    } else {
        Err(ColumnError::LengthMismatch { left, right })
    }
}

pub(crate) fn clamp_range(range: Range<usize>, size: usize) -> Range<usize> {
    let end = range.end.min(size);
    range.start.min(end)..end
}

/// The contract shared by every column.
///
/// Row accessors that take a bare `row` index panic when it is out of
/// bounds, like slice indexing. Selection-driven operations report
/// [`ColumnError::RowOutOfBounds`] instead.
pub trait Column: fmt::Debug {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    fn column_type(&self) -> ColumnType;

    fn id(&self) -> ColumnId;

    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn count_missing(&self) -> usize;

    /// Distinct non-missing values.
    fn count_unique(&self) -> usize;

    /// Canonical text of a cell; missing cells render as `""`.
    fn get_string(&self, row: usize) -> String;

    fn is_missing_at(&self, row: usize) -> bool;

    fn is_missing(&self) -> Selection {
        (0..self.size()).filter(|row| self.is_missing_at(*row)).collect()
    }

    fn is_not_missing(&self) -> Selection {
        (0..self.size()).filter(|row| !self.is_missing_at(*row)).collect()
    }

    fn append_cell(&mut self, text: &str) -> Result<(), ColumnError> {
        self.append_cell_with(text, ParseOptions::standard())
    }

    /// Parses `text` and appends it. Missing tokens append the sentinel;
    /// on error the column is unchanged.
    fn append_cell_with(&mut self, text: &str, options: &ParseOptions) -> Result<(), ColumnError>;

    fn append_missing(&mut self);

    fn clear(&mut self);

    /// Missing sorts first.
    fn sort_ascending(&mut self);

    /// Missing sorts last.
    fn sort_descending(&mut self);

    /// Orders two rows of this column the way `sort_ascending` would.
    fn compare_rows(&self, a: usize, b: usize) -> Ordering;

    fn summary(&self) -> Summary;

    /// Deep copy keeping name and id.
    fn copy(&self) -> Self
    where
        Self: Sized;

    fn empty_copy(&self, row_size_hint: usize) -> Self
    where
        Self: Sized;

    /// Each distinct non-missing value once, in first-occurrence order.
    fn unique(&self) -> Self
    where
        Self: Sized;

    /// Gathers `rows` in the given order; repeats are allowed.
    fn take(&self, rows: &[usize]) -> Result<Self, ColumnError>
    where
        Self: Sized;

    /// Contiguous rows, with the range clamped to the column.
    fn slice(&self, range: Range<usize>) -> Self
    where
        Self: Sized;

    fn append_column(&mut self, other: &Self) -> Result<(), ColumnError>
    where
        Self: Sized;

    fn subset(&self, selection: &Selection) -> Result<Self, ColumnError>
    where
        Self: Sized,
    {
        tracing::debug!(column = self.name(), rows = selection.len(), "subset");
        self.take(&selection.to_vec())
    }

    fn first(&self, n: usize) -> Self
    where
        Self: Sized,
    {
        self.slice(0..n)
    }

    fn last(&self, n: usize) -> Self
    where
        Self: Sized,
    {
        let size = self.size();
        self.slice(size.saturating_sub(n)..size)
    }
}

/// Columns whose cells read as doubles.
///
/// All statistics are computed over [`NumericColumn::non_missing_f64`], so
/// missing cells never contribute.
pub trait NumericColumn: Column {
    /// Cell as a double, `NaN` when missing.
    fn double_at(&self, row: usize) -> f64;

    /// Cell as an integer; `None` when missing or floating.
    fn long_at(&self, row: usize) -> Option<i64>;

    /// Every cell converted verbatim, sentinels included.
    fn to_double_array(&self) -> Vec<f64>;

    fn non_missing_f64(&self) -> Vec<f64> {
        (0..self.size())
            .filter(|row| !self.is_missing_at(*row))
            .map(|row| self.double_at(row))
            .collect()
    }

    fn stats(&self) -> Stats {
        Stats::compute(&self.non_missing_f64())
    }

    fn sum(&self) -> f64 {
        ck_stats::sum(&self.non_missing_f64())
    }

    fn product(&self) -> f64 {
        ck_stats::product(&self.non_missing_f64())
    }

    fn mean(&self) -> f64 {
        ck_stats::mean(&self.non_missing_f64())
    }

    fn geometric_mean(&self) -> f64 {
        ck_stats::geometric_mean(&self.non_missing_f64())
    }

    fn quadratic_mean(&self) -> f64 {
        ck_stats::quadratic_mean(&self.non_missing_f64())
    }

    fn median(&self) -> f64 {
        ck_stats::median(&self.non_missing_f64())
    }

    fn quartile1(&self) -> f64 {
        ck_stats::quartile1(&self.non_missing_f64())
    }

    fn quartile3(&self) -> f64 {
        ck_stats::quartile3(&self.non_missing_f64())
    }

    fn percentile(&self, p: f64) -> Result<f64, ColumnError> {
        Ok(ck_stats::percentile(&self.non_missing_f64(), p)?)
    }

    fn min(&self) -> f64 {
        ck_stats::min(&self.non_missing_f64())
    }

    fn max(&self) -> f64 {
        ck_stats::max(&self.non_missing_f64())
    }

    fn range(&self) -> f64 {
        ck_stats::range(&self.non_missing_f64())
    }

    fn variance(&self) -> f64 {
        ck_stats::variance(&self.non_missing_f64())
    }

    fn population_variance(&self) -> f64 {
        ck_stats::population_variance(&self.non_missing_f64())
    }

    fn standard_deviation(&self) -> f64 {
        ck_stats::standard_deviation(&self.non_missing_f64())
    }

    fn skewness(&self) -> f64 {
        ck_stats::skewness(&self.non_missing_f64())
    }

    fn kurtosis(&self) -> f64 {
        ck_stats::kurtosis(&self.non_missing_f64())
    }

    fn sum_of_logs(&self) -> f64 {
        ck_stats::sum_of_logs(&self.non_missing_f64())
    }

    fn sum_of_squares(&self) -> f64 {
        ck_stats::sum_of_squares(&self.non_missing_f64())
    }

    fn second_moment(&self) -> f64 {
        ck_stats::second_moment(&self.non_missing_f64())
    }

    fn count_if(&self, predicate: &dyn Fn(f64) -> bool) -> usize {
        self.non_missing_f64()
            .into_iter()
            .filter(|v| predicate(*v))
            .count()
    }

    fn sum_if(&self, predicate: &dyn Fn(f64) -> bool) -> f64 {
        self.non_missing_f64()
            .into_iter()
            .filter(|v| predicate(*v))
            .sum()
    }

    /// Double column of `f` applied to each cell; missing stays missing.
    fn map_f64(&self, name: &str, f: &dyn Fn(f64) -> f64) -> DoubleColumn {
        let values = (0..self.size()).map(|row| {
            let value = self.double_at(row);
            if value.is_nan() { value } else { f(value) }
        });
        DoubleColumn::from_values(name, values)
    }

    /// Row-to-row deltas; the first row and any row next to a missing cell
    /// are missing.
    fn difference(&self) -> DoubleColumn {
        let mut previous = f64::NAN;
        let values = (0..self.size()).map(|row| {
            let current = self.double_at(row);
            let delta = current - previous;
            previous = current;
            delta
        });
        DoubleColumn::from_values(&format!("{}[difference]", self.name()), values)
    }

    /// Running sum over non-missing cells; missing cells stay missing.
    fn cumulative_sum(&self) -> DoubleColumn {
        let mut total = 0.0;
        let values = (0..self.size()).map(|row| {
            let value = self.double_at(row);
            if value.is_nan() {
                value
            } else {
                total += value;
                total
            }
        });
        DoubleColumn::from_values(&format!("{}[cumSum]", self.name()), values)
    }

    /// Running product over non-missing cells; missing cells stay missing.
    fn cumulative_product(&self) -> DoubleColumn {
        let mut total = 1.0;
        let values = (0..self.size()).map(|row| {
            let value = self.double_at(row);
            if value.is_nan() {
                value
            } else {
                total *= value;
                total
            }
        });
        DoubleColumn::from_values(&format!("{}[cumProd]", self.name()), values)
    }

    /// `x[i] / x[i-1] - 1`; the first row and any row next to a missing cell
    /// are missing.
    fn percent_change(&self) -> DoubleColumn {
        let mut previous = f64::NAN;
        let values = (0..self.size()).map(|row| {
            let current = self.double_at(row);
            let change = current / previous - 1.0;
            previous = current;
            change
        });
        DoubleColumn::from_values(&format!("{}[pctChange]", self.name()), values)
    }

    /// Z-scores against the mean and sample standard deviation of the
    /// non-missing cells. Every cell is missing when the deviation is zero.
    fn normalize(&self) -> DoubleColumn {
        let present = self.non_missing_f64();
        let mean = ck_stats::mean(&present);
        let deviation = ck_stats::standard_deviation(&present);
        let scale = if deviation > 0.0 { deviation } else { f64::NAN };
        self.map_f64(&format!("{} normalized", self.name()), &|v| {
            (v - mean) / scale
        })
    }

    /// Each cell as a share of the column sum; all missing when the sum is zero.
    fn as_ratio(&self) -> DoubleColumn {
        let total = self.sum();
        let total = if total == 0.0 { f64::NAN } else { total };
        self.map_f64(&format!("{} percents", self.name()), &|v| v / total)
    }
}
