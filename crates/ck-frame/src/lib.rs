#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use ck_columnar::{AnyColumn, Column, ColumnError, NumericColumn};
use ck_selection::Selection;
use ck_types::{ColumnType, ParseOptions, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
    #[error("column '{0}' not found")]
    UnknownColumn(String),
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("column '{column}' is {column_type}, not numeric")]
    NotNumeric {
        column: String,
        column_type: ColumnType,
    },
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// Named numeric reductions, so callers can pick one by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Count,
    Sum,
    Product,
    Mean,
    GeometricMean,
    QuadraticMean,
    Median,
    Quartile1,
    Quartile3,
    Min,
    Max,
    Range,
    Variance,
    PopulationVariance,
    StandardDeviation,
    Skewness,
    Kurtosis,
    SumOfSquares,
    SumOfLogs,
}

impl Reduction {
    pub const ALL: [Self; 19] = [
        Self::Count,
        Self::Sum,
        Self::Product,
        Self::Mean,
        Self::GeometricMean,
        Self::QuadraticMean,
        Self::Median,
        Self::Quartile1,
        Self::Quartile3,
        Self::Min,
        Self::Max,
        Self::Range,
        Self::Variance,
        Self::PopulationVariance,
        Self::StandardDeviation,
        Self::Skewness,
        Self::Kurtosis,
        Self::SumOfSquares,
        Self::SumOfLogs,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Mean => "mean",
            Self::GeometricMean => "geometric_mean",
            Self::QuadraticMean => "quadratic_mean",
            Self::Median => "median",
            Self::Quartile1 => "quartile1",
            Self::Quartile3 => "quartile3",
            Self::Min => "min",
            Self::Max => "max",
            Self::Range => "range",
            Self::Variance => "variance",
            Self::PopulationVariance => "population_variance",
            Self::StandardDeviation => "standard_deviation",
            Self::Skewness => "skewness",
            Self::Kurtosis => "kurtosis",
            Self::SumOfSquares => "sum_of_squares",
            Self::SumOfLogs => "sum_of_logs",
        }
    }

    /// Applies the reduction to the non-missing cells of `column`.
    #[must_use]
    pub fn apply(self, column: &dyn NumericColumn) -> f64 {
        match self {
            Self::Count => column.non_missing_f64().len() as f64,
            Self::Sum => column.sum(),
            Self::Product => column.product(),
            Self::Mean => column.mean(),
            Self::GeometricMean => column.geometric_mean(),
            Self::QuadraticMean => column.quadratic_mean(),
            Self::Median => column.median(),
            Self::Quartile1 => column.quartile1(),
            Self::Quartile3 => column.quartile3(),
            Self::Min => column.min(),
            Self::Max => column.max(),
            Self::Range => column.range(),
            Self::Variance => column.variance(),
            Self::PopulationVariance => column.population_variance(),
            Self::StandardDeviation => column.standard_deviation(),
            Self::Skewness => column.skewness(),
            Self::Kurtosis => column.kurtosis(),
            Self::SumOfSquares => column.sum_of_squares(),
            Self::SumOfLogs => column.sum_of_logs(),
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, ordered list of equal-length columns.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<AnyColumn>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Builds a table from columns, checking names and lengths as
    /// [`Table::add_column`] does.
    pub fn from_columns<I>(name: impl Into<String>, columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator,
        I::Item: Into<AnyColumn>,
    {
        let mut table = Self::new(name);
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends a column. Its name must be new and, unless the table has no
    /// columns yet, its size must equal [`Table::row_count`].
    pub fn add_column(&mut self, column: impl Into<AnyColumn>) -> Result<&mut Self, FrameError> {
        let column = column.into();
        if self.position(column.name()).is_some() {
            return Err(FrameError::DuplicateColumn(column.name().to_owned()));
        }
        if !self.columns.is_empty() && column.size() != self.row_count() {
            return Err(FrameError::LengthMismatch {
                expected: self.row_count(),
                found: column.size(),
            });
        }
        self.columns.push(column);
        Ok(self)
    }

    pub fn remove_column(&mut self, name: &str) -> Result<AnyColumn, FrameError> {
        let position = self
            .position(name)
            .ok_or_else(|| FrameError::UnknownColumn(name.to_owned()))?;
        Ok(self.columns.remove(position))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    pub fn column(&self, name: &str) -> Result<&AnyColumn, FrameError> {
        self.position(name)
            .map(|position| &self.columns[position])
            .ok_or_else(|| FrameError::UnknownColumn(name.to_owned()))
    }

    #[must_use]
    pub fn column_at(&self, index: usize) -> Option<&AnyColumn> {
        self.columns.get(index)
    }

    pub fn numeric_column(&self, name: &str) -> Result<&dyn NumericColumn, FrameError> {
        let column = self.column(name)?;
        column.as_numeric().ok_or_else(|| FrameError::NotNumeric {
            column: name.to_owned(),
            column_type: column.column_type(),
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[AnyColumn] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Rows in every column; zero when the table has no columns.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::size)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Cells of row `row`, one per column in column order.
    pub fn row(&self, row: usize) -> Result<Vec<Scalar>, FrameError> {
        let size = self.row_count();
        if row >= size {
            return Err(ColumnError::RowOutOfBounds { row, size }.into());
        }
        Ok(self.columns.iter().map(|column| column.get(row)).collect())
    }

    // ── Row operations ──────────────────────────────────────────────────

    fn with_columns(&self, columns: Vec<AnyColumn>) -> Self {
        Self {
            name: self.name.clone(),
            columns,
        }
    }

    /// Deep copy; columns keep their names and ids.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.with_columns(self.columns.iter().map(Column::copy).collect())
    }

    /// Same name and column layout with no rows.
    #[must_use]
    pub fn empty_copy(&self) -> Self {
        let hint = self.row_count();
        self.with_columns(
            self.columns
                .iter()
                .map(|column| column.empty_copy(hint))
                .collect(),
        )
    }

    /// New table holding the selected rows of every column.
    pub fn subset(&self, selection: &Selection) -> Result<Self, FrameError> {
        debug!(table = %self.name, rows = selection.len(), "table subset");
        let rows = selection.to_vec();
        let columns = self
            .columns
            .iter()
            .map(|column| column.take(&rows))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.with_columns(columns))
    }

    /// Rows for which `predicate` selects, driven by the named column.
    pub fn filter<F>(&self, name: &str, predicate: F) -> Result<Self, FrameError>
    where
        F: FnOnce(&AnyColumn) -> Selection,
    {
        let selection = predicate(self.column(name)?);
        self.subset(&selection)
    }

    #[must_use]
    pub fn first(&self, n: usize) -> Self {
        self.with_columns(self.columns.iter().map(|column| column.first(n)).collect())
    }

    #[must_use]
    pub fn last(&self, n: usize) -> Self {
        self.with_columns(self.columns.iter().map(|column| column.last(n)).collect())
    }

    /// Rows reordered by the named column with a stable sort. Missing cells
    /// sort first when ascending and last when descending.
    pub fn sort_by(&self, name: &str, ascending: bool) -> Result<Self, FrameError> {
        let key = self.column(name)?;
        let mut order: Vec<usize> = (0..self.row_count()).collect();
        order.sort_by(|&a, &b| {
            if ascending {
                return key.compare_rows(a, b);
            }
            match (key.is_missing_at(a), key.is_missing_at(b)) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => key.compare_rows(b, a),
            }
        });
        debug!(table = %self.name, column = name, ascending, "sort");
        let columns = self
            .columns
            .iter()
            .map(|column| column.take(&order))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.with_columns(columns))
    }

    pub fn append_row_cells(&mut self, cells: &[&str]) -> Result<(), FrameError> {
        self.append_row_cells_with(cells, ParseOptions::standard())
    }

    /// Parses one cell per column and appends the row. Either every cell
    /// parses and the row is appended, or the table is unchanged.
    pub fn append_row_cells_with(
        &mut self,
        cells: &[&str],
        options: &ParseOptions,
    ) -> Result<(), FrameError> {
        if cells.len() != self.columns.len() {
            return Err(FrameError::LengthMismatch {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        let parsed = self
            .columns
            .iter()
            .zip(cells)
            .map(|(column, cell)| {
                let mut probe = column.empty_copy(1);
                probe.append_cell_with(cell, options).map(|()| probe)
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (column, probe) in self.columns.iter_mut().zip(&parsed) {
            column.append_column(probe)?;
        }
        Ok(())
    }

    // ── Summaries ───────────────────────────────────────────────────────

    /// The named column's summary as a two-column table.
    pub fn summary_of(&self, name: &str) -> Result<Self, FrameError> {
        let summary = self.column(name)?.summary();
        let mut labels = summary.labels;
        labels.set_name("Measure");
        let mut values = summary.values;
        values.set_name("Value");
        Self::from_columns(summary.title, [AnyColumn::from(labels), values])
    }

    pub fn reduce(&self, name: &str, reduction: Reduction) -> Result<f64, FrameError> {
        Ok(reduction.apply(self.numeric_column(name)?))
    }

    /// One row per numeric column: the column name and each reduction.
    pub fn describe(&self, reductions: &[Reduction]) -> Result<Self, FrameError> {
        let numeric: Vec<&dyn NumericColumn> = self
            .columns
            .iter()
            .filter_map(AnyColumn::as_numeric)
            .collect();
        let names = ck_columnar::CategoryColumn::from_values(
            "Column",
            numeric.iter().map(|column| column.name()),
        );
        let mut table = Self::from_columns(format!("{} summary", self.name), [names])?;
        for reduction in reductions {
            let values = numeric.iter().map(|column| reduction.apply(*column));
            table.add_column(ck_columnar::DoubleColumn::from_values(reduction.name(), values))?;
        }
        Ok(table)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.row_count();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|column| {
                (0..rows)
                    .map(|row| column.get_string(row).chars().count())
                    .chain(std::iter::once(column.name().chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        writeln!(f, "{}", self.name)?;
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:>width$}", column.name()))
            .collect();
        writeln!(f, "{}", header.join("  "))?;
        for row in 0..rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(column, width)| format!("{:>width$}", column.get_string(row)))
                .collect();
            writeln!(f, "{}", cells.join("  "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ck_columnar::{
        AnyColumn, CategoryColumn, Column, ColumnError, DoubleColumn, IntColumn,
    };
    use ck_selection::Selection;
    use ck_types::{ColumnType, Scalar};

    use super::{FrameError, Reduction, Table};

    fn people() -> Table {
        Table::from_columns(
            "people",
            [
                AnyColumn::from(CategoryColumn::from_values("name", ["ann", "bob", "cy", "di"])),
                AnyColumn::from(IntColumn::from_options(
                    "age",
                    [Some(31), None, Some(25), Some(40)],
                )),
                AnyColumn::from(DoubleColumn::from_values("score", [1.5, 2.5, 3.5, 4.5])),
            ],
        )
        .expect("people table")
    }

    #[test]
    fn add_column_enforces_names_and_lengths() {
        let mut table = people();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.column_names(), vec!["name", "age", "score"]);
        assert_eq!(
            table
                .add_column(IntColumn::from_values("age", [1, 2, 3, 4]))
                .expect_err("duplicate"),
            FrameError::DuplicateColumn("age".to_owned())
        );
        assert_eq!(
            table
                .add_column(IntColumn::from_values("short", [1]))
                .expect_err("too short"),
            FrameError::LengthMismatch {
                expected: 4,
                found: 1
            }
        );
        table
            .add_column(IntColumn::from_values("rank", [4, 3, 2, 1]))
            .expect("fits");
        assert_eq!(table.column_count(), 4);
        let removed = table.remove_column("rank").expect("present");
        assert_eq!(removed.name(), "rank");
        assert!(matches!(
            table.remove_column("rank"),
            Err(FrameError::UnknownColumn(_))
        ));
    }

    #[test]
    fn empty_table_has_no_rows() {
        let table = Table::new("empty");
        assert_eq!(table.row_count(), 0);
        assert!(table.is_empty());
        assert!(table.column_at(0).is_none());
    }

    #[test]
    fn subset_applies_selection_to_every_column() {
        let table = people();
        let adults = table
            .numeric_column("age")
            .expect("numeric")
            .non_missing_f64();
        assert_eq!(adults, vec![31.0, 25.0, 40.0]);

        let selection = Selection::from_indices([0, 3]);
        let subset = table.subset(&selection).expect("subset");
        assert_eq!(subset.row_count(), 2);
        assert_eq!(
            subset.row(1).expect("row"),
            vec![
                Scalar::Text("di".to_owned()),
                Scalar::Int(40),
                Scalar::Double(4.5)
            ]
        );
        assert_eq!(table.row_count(), 4);

        let out_of_range = Selection::from_indices([9]);
        assert!(matches!(
            table.subset(&out_of_range),
            Err(FrameError::Column(ColumnError::RowOutOfBounds { .. }))
        ));
    }

    #[test]
    fn filter_uses_column_predicates() {
        let table = people();
        let high = table
            .filter("score", |column| {
                column
                    .as_double()
                    .map(|scores| scores.is_greater_than(3.0))
                    .unwrap_or_default()
            })
            .expect("filter");
        assert_eq!(high.row_count(), 2);
        assert_eq!(high.column("name").expect("name").get_string(0), "cy");
    }

    #[test]
    fn first_and_last_take_edges() {
        let table = people();
        assert_eq!(
            table.first(2).row(1).expect("row")[0],
            Scalar::Text("bob".to_owned())
        );
        assert_eq!(table.last(1).row_count(), 1);
        assert_eq!(table.first(10).row_count(), 4);
        assert_eq!(
            table.row(4),
            Err(FrameError::Column(ColumnError::RowOutOfBounds { row: 4, size: 4 }))
        );
    }

    #[test]
    fn sort_by_orders_all_columns_and_places_missing() {
        let table = people();
        let ascending = table.sort_by("age", true).expect("sort");
        let names: Vec<String> = (0..4)
            .map(|row| ascending.column("name").expect("name").get_string(row))
            .collect();
        assert_eq!(names, vec!["bob", "cy", "ann", "di"]);

        let descending = table.sort_by("age", false).expect("sort");
        let names: Vec<String> = (0..4)
            .map(|row| descending.column("name").expect("name").get_string(row))
            .collect();
        assert_eq!(names, vec!["di", "ann", "cy", "bob"]);

        assert!(matches!(
            table.sort_by("missing", true),
            Err(FrameError::UnknownColumn(_))
        ));
    }

    #[test]
    fn append_row_cells_is_atomic() {
        let mut table = people();
        table.append_row_cells(&["eve", "NA", "5.5"]).expect("valid row");
        assert_eq!(table.row_count(), 5);
        assert_eq!(table.row(4).expect("row")[1], Scalar::Missing);

        let err = table
            .append_row_cells(&["fay", "22", "not a number"])
            .expect_err("bad score");
        assert!(matches!(err, FrameError::Column(ColumnError::Parse(_))));
        assert_eq!(table.row_count(), 5);
        assert_eq!(table.column("name").expect("name").size(), 5);

        assert_eq!(
            table.append_row_cells(&["only one"]),
            Err(FrameError::LengthMismatch {
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn copies_are_independent() {
        let table = people();
        let mut copy = table.copy();
        copy.append_row_cells(&["zed", "1", "0"]).expect("append");
        assert_eq!(table.row_count(), 4);
        assert_eq!(copy.row_count(), 5);
        assert_eq!(
            copy.column("age").expect("age").id(),
            table.column("age").expect("age").id()
        );

        let empty = table.empty_copy();
        assert_eq!(empty.column_names(), table.column_names());
        assert_eq!(empty.row_count(), 0);
    }

    #[test]
    fn reductions_dispatch_by_name() {
        let table = people();
        let mean = table.reduce("age", Reduction::Mean).expect("mean");
        assert!((mean - 32.0).abs() < 1e-12);
        assert_eq!(table.reduce("age", Reduction::Count).expect("count"), 3.0);
        assert_eq!(table.reduce("score", Reduction::Max).expect("max"), 4.5);
        assert_eq!(
            table.reduce("name", Reduction::Sum),
            Err(FrameError::NotNumeric {
                column: "name".to_owned(),
                column_type: ColumnType::Category
            })
        );
        let parsed: Reduction =
            serde_json::from_str("\"standard_deviation\"").expect("reduction name");
        assert_eq!(parsed, Reduction::StandardDeviation);
    }

    #[test]
    fn summary_of_builds_measure_value_table() {
        let table = people();
        let summary = table.summary_of("age").expect("summary");
        assert_eq!(summary.name(), "Column: age");
        assert_eq!(summary.column_names(), vec!["Measure", "Value"]);
        assert_eq!(summary.row(0).expect("row")[1], Scalar::Double(3.0));

        let described = table
            .describe(&[Reduction::Sum, Reduction::Max])
            .expect("describe");
        assert_eq!(described.column_names(), vec!["Column", "sum", "max"]);
        assert_eq!(described.row_count(), 2);
        assert_eq!(described.row(1).expect("row")[1], Scalar::Double(12.0));
    }

    #[test]
    fn display_renders_header_and_rows() {
        let table = people().first(1);
        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "people");
        assert!(lines[1].contains("name"));
        assert!(lines[2].contains("ann"));
        assert_eq!(lines.len(), 3);
    }
}
