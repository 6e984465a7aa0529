use std::cmp::Ordering;
use std::ops::Range;

use ck_selection::Selection;
use ck_types::{ColumnType, ParseOptions, Scalar};

use crate::{
    BooleanColumn, CategoryColumn, Column, ColumnError, ColumnId, DateColumn, DateTimeColumn,
    DoubleColumn, FloatColumn, IntColumn, LongColumn, NumericColumn, ShortColumn, Summary,
    TimeColumn,
};

/// One column of any concrete type.
#[derive(Debug, Clone)]
pub enum AnyColumn {
    Boolean(BooleanColumn),
    Short(ShortColumn),
    Int(IntColumn),
    Long(LongColumn),
    Float(FloatColumn),
    Double(DoubleColumn),
    Category(CategoryColumn),
    Date(DateColumn),
    Time(TimeColumn),
    DateTime(DateTimeColumn),
}

macro_rules! dispatch {
    ($value:expr, $column:ident => $body:expr) => {
        match $value {
            AnyColumn::Boolean($column) => $body,
            AnyColumn::Short($column) => $body,
            AnyColumn::Int($column) => $body,
            AnyColumn::Long($column) => $body,
            AnyColumn::Float($column) => $body,
            AnyColumn::Double($column) => $body,
            AnyColumn::Category($column) => $body,
            AnyColumn::Date($column) => $body,
            AnyColumn::Time($column) => $body,
            AnyColumn::DateTime($column) => $body,
        }
    };
}

/// Like `dispatch!`, but rewraps a same-typed result in its variant.
macro_rules! rewrap {
    ($value:expr, $column:ident => $body:expr) => {
        match $value {
            AnyColumn::Boolean($column) => AnyColumn::Boolean($body),
            AnyColumn::Short($column) => AnyColumn::Short($body),
            AnyColumn::Int($column) => AnyColumn::Int($body),
            AnyColumn::Long($column) => AnyColumn::Long($body),
            AnyColumn::Float($column) => AnyColumn::Float($body),
            AnyColumn::Double($column) => AnyColumn::Double($body),
            AnyColumn::Category($column) => AnyColumn::Category($body),
            AnyColumn::Date($column) => AnyColumn::Date($body),
            AnyColumn::Time($column) => AnyColumn::Time($body),
            AnyColumn::DateTime($column) => AnyColumn::DateTime($body),
        }
    };
}

impl AnyColumn {
    /// An empty column of `column_type`.
    #[must_use]
    pub fn empty(column_type: ColumnType, name: &str) -> Self {
        match column_type {
            ColumnType::Boolean => Self::Boolean(BooleanColumn::new(name)),
            ColumnType::Short => Self::Short(ShortColumn::new(name)),
            ColumnType::Int => Self::Int(IntColumn::new(name)),
            ColumnType::Long => Self::Long(LongColumn::new(name)),
            ColumnType::Float => Self::Float(FloatColumn::new(name)),
            ColumnType::Double => Self::Double(DoubleColumn::new(name)),
            ColumnType::Category => Self::Category(CategoryColumn::new(name)),
            ColumnType::Date => Self::Date(DateColumn::new(name)),
            ColumnType::Time => Self::Time(TimeColumn::new(name)),
            ColumnType::DateTime => Self::DateTime(DateTimeColumn::new(name)),
        }
    }

    /// Cell at `row` as a scalar; missing cells and rows past the end are
    /// [`Scalar::Missing`].
    #[must_use]
    pub fn get(&self, row: usize) -> Scalar {
        dispatch!(self, c => c.get_scalar(row))
    }

    #[must_use]
    pub fn as_numeric(&self) -> Option<&dyn NumericColumn> {
        match self {
            Self::Short(column) => Some(column),
            Self::Int(column) => Some(column),
            Self::Long(column) => Some(column),
            Self::Float(column) => Some(column),
            Self::Double(column) => Some(column),
            _ => None,
        }
    }

    pub(crate) fn numeric(
        &self,
        operation: &'static str,
    ) -> Result<&dyn NumericColumn, ColumnError> {
        self.as_numeric().ok_or(ColumnError::Unsupported {
            operation,
            column_type: self.column_type(),
        })
    }

    /// Every cell as a double, sentinels verbatim.
    pub fn to_double_array(&self) -> Result<Vec<f64>, ColumnError> {
        Ok(self.numeric("to_double_array")?.to_double_array())
    }

    #[must_use]
    pub fn as_boolean(&self) -> Option<&BooleanColumn> {
        match self {
            Self::Boolean(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_short(&self) -> Option<&ShortColumn> {
        match self {
            Self::Short(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&IntColumn> {
        match self {
            Self::Int(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<&LongColumn> {
        match self {
            Self::Long(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<&FloatColumn> {
        match self {
            Self::Float(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<&DoubleColumn> {
        match self {
            Self::Double(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_category(&self) -> Option<&CategoryColumn> {
        match self {
            Self::Category(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&DateColumn> {
        match self {
            Self::Date(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<&TimeColumn> {
        match self {
            Self::Time(column) => Some(column),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date_time(&self) -> Option<&DateTimeColumn> {
        match self {
            Self::DateTime(column) => Some(column),
            _ => None,
        }
    }
}

impl Column for AnyColumn {
    fn name(&self) -> &str {
        dispatch!(self, c => c.name())
    }

    fn set_name(&mut self, name: &str) {
        dispatch!(self, c => c.set_name(name));
    }

    fn column_type(&self) -> ColumnType {
        dispatch!(self, c => c.column_type())
    }

    fn id(&self) -> ColumnId {
        dispatch!(self, c => c.id())
    }

    fn size(&self) -> usize {
        dispatch!(self, c => c.size())
    }

    fn count_missing(&self) -> usize {
        dispatch!(self, c => c.count_missing())
    }

    fn count_unique(&self) -> usize {
        dispatch!(self, c => c.count_unique())
    }

    fn get_string(&self, row: usize) -> String {
        dispatch!(self, c => c.get_string(row))
    }

    fn is_missing_at(&self, row: usize) -> bool {
        dispatch!(self, c => c.is_missing_at(row))
    }

    fn is_missing(&self) -> Selection {
        dispatch!(self, c => c.is_missing())
    }

    fn is_not_missing(&self) -> Selection {
        dispatch!(self, c => c.is_not_missing())
    }

    fn append_cell_with(&mut self, text: &str, options: &ParseOptions) -> Result<(), ColumnError> {
        dispatch!(self, c => c.append_cell_with(text, options))
    }

    fn append_missing(&mut self) {
        dispatch!(self, c => c.append_missing());
    }

    fn clear(&mut self) {
        dispatch!(self, c => c.clear());
    }

    fn sort_ascending(&mut self) {
        dispatch!(self, c => c.sort_ascending());
    }

    fn sort_descending(&mut self) {
        dispatch!(self, c => c.sort_descending());
    }

    fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        dispatch!(self, c => c.compare_rows(a, b))
    }

    fn summary(&self) -> Summary {
        dispatch!(self, c => c.summary())
    }

    fn copy(&self) -> Self {
        self.clone()
    }

    fn empty_copy(&self, row_size_hint: usize) -> Self {
        rewrap!(self, c => c.empty_copy(row_size_hint))
    }

    fn unique(&self) -> Self {
        rewrap!(self, c => c.unique())
    }

    fn take(&self, rows: &[usize]) -> Result<Self, ColumnError> {
        Ok(rewrap!(self, c => c.take(rows)?))
    }

    fn slice(&self, range: Range<usize>) -> Self {
        rewrap!(self, c => c.slice(range))
    }

    fn append_column(&mut self, other: &Self) -> Result<(), ColumnError> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.append_column(b),
            (Self::Short(a), Self::Short(b)) => a.append_column(b),
            (Self::Int(a), Self::Int(b)) => a.append_column(b),
            (Self::Long(a), Self::Long(b)) => a.append_column(b),
            (Self::Float(a), Self::Float(b)) => a.append_column(b),
            (Self::Double(a), Self::Double(b)) => a.append_column(b),
            (Self::Category(a), Self::Category(b)) => a.append_column(b),
            (Self::Date(a), Self::Date(b)) => a.append_column(b),
            (Self::Time(a), Self::Time(b)) => a.append_column(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.append_column(b),
            (this, other) => Err(ColumnError::TypeMismatch {
                expected: this.column_type(),
                found: other.column_type(),
            }),
        }
    }
}

macro_rules! from_column {
    ($($column:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$column> for AnyColumn {
                fn from(column: $column) -> Self {
                    Self::$variant(column)
                }
            }
        )*
    };
}

from_column! {
    BooleanColumn => Boolean,
    ShortColumn => Short,
    IntColumn => Int,
    LongColumn => Long,
    FloatColumn => Float,
    DoubleColumn => Double,
    CategoryColumn => Category,
    DateColumn => Date,
    TimeColumn => Time,
    DateTimeColumn => DateTime,
}

#[cfg(test)]
mod tests {
    use ck_selection::Selection;
    use ck_types::{ColumnType, Scalar};

    use super::AnyColumn;
    use crate::{CategoryColumn, Column, ColumnError, DoubleColumn, IntColumn, NumericColumn};

    #[test]
    fn forwards_the_column_contract() {
        let mut column = AnyColumn::empty(ColumnType::Int, "n");
        for cell in ["3", "", "1"] {
            column.append_cell(cell).expect("cell");
        }
        assert_eq!(column.column_type(), ColumnType::Int);
        assert_eq!(column.size(), 3);
        assert_eq!(column.count_missing(), 1);
        assert_eq!(column.get(0), Scalar::Int(3));
        assert_eq!(column.get(1), Scalar::Missing);
        assert_eq!(column.get(9), Scalar::Missing);

        column.sort_ascending();
        assert_eq!(column.get_string(0), "");
        let subset = column.subset(&Selection::from_indices([2])).expect("subset");
        assert_eq!(subset.get(0), Scalar::Int(3));
    }

    #[test]
    fn numeric_view_drives_statistics() {
        let column: AnyColumn =
            IntColumn::from_options("n", [Some(10), Some(20), None, Some(40)]).into();
        let numeric = column.as_numeric().expect("numeric");
        assert!((numeric.mean() - 70.0 / 3.0).abs() < 1e-12);
        assert!(AnyColumn::from(CategoryColumn::new("c")).as_numeric().is_none());
    }

    #[test]
    fn to_double_array_rejects_non_numeric() {
        let text = AnyColumn::from(CategoryColumn::from_values("c", ["a"]));
        assert_eq!(
            text.to_double_array(),
            Err(ColumnError::Unsupported {
                operation: "to_double_array",
                column_type: ColumnType::Category,
            })
        );
        let doubles = AnyColumn::from(DoubleColumn::from_values("d", [1.5]));
        assert_eq!(doubles.to_double_array(), Ok(vec![1.5]));
    }

    #[test]
    fn append_column_requires_matching_types() {
        let mut ints = AnyColumn::from(IntColumn::from_values("a", [1]));
        let more = AnyColumn::from(IntColumn::from_values("b", [2, 3]));
        ints.append_column(&more).expect("same type");
        assert_eq!(ints.size(), 3);
        let doubles = AnyColumn::from(DoubleColumn::from_values("d", [1.0]));
        assert_eq!(
            ints.append_column(&doubles),
            Err(ColumnError::TypeMismatch {
                expected: ColumnType::Int,
                found: ColumnType::Double,
            })
        );
    }

    #[test]
    fn unique_and_empty_copy_keep_variant() {
        let column = AnyColumn::from(CategoryColumn::from_values("c", ["x", "x", "y"]));
        assert_eq!(column.unique().size(), 2);
        let empty = column.empty_copy(4);
        assert_eq!(empty.column_type(), ColumnType::Category);
        assert!(empty.is_empty());
        assert!(column.as_category().is_some());
        assert!(column.as_int().is_none());
    }
}
