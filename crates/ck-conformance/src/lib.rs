#![forbid(unsafe_code)]

//! Fixture-driven conformance harness.
//!
//! A fixture names a set of text-cell columns, one operation over them and
//! the expected outcome. Columns are loaded the way a reader would load
//! them, through `append_cell`, so fixtures exercise parsing and the
//! missing-value policy along with the operation itself.

use ck_columnar::{
    AnyColumn, ArithmeticOp, Column, ColumnError, NumericColumn, binary, binary_scalar,
};
use ck_frame::{FrameError, Reduction, Table};
use ck_selection::Selection;
use ck_types::{ColumnType, ParseOptions, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_FIXTURES: &str = include_str!("../fixtures/builtin.json");

/// Relative tolerance for floating expectations.
const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fixture is not valid json: {0}")]
    Fixture(#[from] serde_json::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error("{operation} needs a {expected} column, found {found}")]
    WrongColumnType {
        operation: &'static str,
        expected: &'static str,
        found: ColumnType,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTransform {
    UpperCase,
    LowerCase,
    Trim,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixturePredicate {
    IsMissing,
    IsNotMissing,
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    EqualsText { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FixtureOperation {
    Reduce {
        column: String,
        reduction: Reduction,
    },
    Percentile {
        column: String,
        p: f64,
    },
    CountUnique {
        column: String,
    },
    CountMissing {
        column: String,
    },
    Unique {
        column: String,
    },
    Select {
        column: String,
        predicate: FixturePredicate,
    },
    Arithmetic {
        left: String,
        operator: ArithmeticOp,
        right: String,
    },
    ArithmeticScalar {
        column: String,
        operator: ArithmeticOp,
        value: Scalar,
    },
    SortBy {
        column: String,
        ascending: bool,
    },
    Transform {
        column: String,
        transform: TextTransform,
    },
}

impl FixtureOperation {
    #[must_use]
    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::Reduce { .. } => "reduce",
            Self::Percentile { .. } => "percentile",
            Self::CountUnique { .. } => "count_unique",
            Self::CountMissing { .. } => "count_missing",
            Self::Unique { .. } => "unique",
            Self::Select { .. } => "select",
            Self::Arithmetic { .. } => "arithmetic",
            Self::ArithmeticScalar { .. } => "arithmetic_scalar",
            Self::SortBy { .. } => "sort_by",
            Self::Transform { .. } => "transform",
        }
    }
}

/// Outcome of an operation, as expected by a fixture or as observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// `None` stands for `NaN`, which json cannot carry.
    Number {
        value: Option<f64>,
    },
    Count {
        value: usize,
    },
    Cells {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        cells: Vec<String>,
    },
    Rows {
        rows: Vec<usize>,
    },
    Error {
        contains: String,
    },
}

impl Outcome {
    fn number(value: f64) -> Self {
        Self::Number {
            value: (!value.is_nan()).then_some(value),
        }
    }

    fn cells_of(column: &AnyColumn) -> Self {
        Self::Cells {
            name: Some(column.name().to_owned()),
            cells: (0..column.size()).map(|row| column.get_string(row)).collect(),
        }
    }

    /// Whether an observed outcome satisfies this expectation.
    #[must_use]
    pub fn accepts(&self, observed: &Self) -> bool {
        match (self, observed) {
            (Self::Number { value: expected }, Self::Number { value: actual }) => {
                match (expected, actual) {
                    (None, None) => true,
                    (Some(e), Some(a)) => close(*e, *a),
                    _ => false,
                }
            }
            (
                Self::Cells {
                    name: expected_name,
                    cells: expected,
                },
                Self::Cells {
                    name: actual_name,
                    cells: actual,
                },
            ) => {
                expected == actual
                    && expected_name
                        .as_ref()
                        .is_none_or(|name| Some(name) == actual_name.as_ref())
            }
            (Self::Error { contains }, Self::Error { contains: message }) => {
                message.contains(contains.as_str())
            }
            (expected, actual) => expected == actual,
        }
    }
}

fn close(expected: f64, actual: f64) -> bool {
    let scale = expected.abs().max(actual.abs()).max(1.0);
    (expected - actual).abs() <= TOLERANCE * scale
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformanceCase {
    pub id: String,
    pub columns: Vec<FixtureColumn>,
    pub operation: FixtureOperation,
    pub expected: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub id: String,
    pub operation: String,
    pub status: CaseStatus,
    pub observed: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == CaseStatus::Pass)
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> Vec<&CaseResult> {
        self.results
            .iter()
            .filter(|result| result.status == CaseStatus::Fail)
            .collect()
    }

    #[must_use]
    pub fn is_green(&self) -> bool {
        self.failed().is_empty()
    }
}

pub fn load_cases(json: &str) -> Result<Vec<ConformanceCase>, HarnessError> {
    Ok(serde_json::from_str(json)?)
}

/// The fixture set shipped with this crate.
pub fn builtin_cases() -> Result<Vec<ConformanceCase>, HarnessError> {
    load_cases(BUILTIN_FIXTURES)
}

/// Loads fixture columns into a table through `append_cell_with`.
pub fn build_table(
    columns: &[FixtureColumn],
    options: &ParseOptions,
) -> Result<Table, HarnessError> {
    let mut table = Table::new("fixture");
    for fixture in columns {
        let mut column = AnyColumn::empty(fixture.column_type, &fixture.name);
        for cell in &fixture.cells {
            column.append_cell_with(cell, options)?;
        }
        table.add_column(column)?;
    }
    Ok(table)
}

#[must_use]
pub fn run_case(case: &ConformanceCase, options: &ParseOptions) -> CaseResult {
    let observed = observe(case, options).unwrap_or_else(|err| Outcome::Error {
        contains: err.to_string(),
    });
    let status = if case.expected.accepts(&observed) {
        CaseStatus::Pass
    } else {
        CaseStatus::Fail
    };
    CaseResult {
        id: case.id.clone(),
        operation: case.operation.operation_name().to_owned(),
        status,
        observed,
    }
}

#[must_use]
pub fn run_suite(cases: &[ConformanceCase], options: &ParseOptions) -> SuiteReport {
    SuiteReport {
        results: cases.iter().map(|case| run_case(case, options)).collect(),
    }
}

fn observe(case: &ConformanceCase, options: &ParseOptions) -> Result<Outcome, HarnessError> {
    let table = build_table(&case.columns, options)?;
    let outcome = match &case.operation {
        FixtureOperation::Reduce { column, reduction } => {
            Outcome::number(table.reduce(column, *reduction)?)
        }
        FixtureOperation::Percentile { column, p } => {
            Outcome::number(table.numeric_column(column)?.percentile(*p)?)
        }
        FixtureOperation::CountUnique { column } => Outcome::Count {
            value: table.column(column)?.count_unique(),
        },
        FixtureOperation::CountMissing { column } => Outcome::Count {
            value: table.column(column)?.count_missing(),
        },
        FixtureOperation::Unique { column } => Outcome::cells_of(&table.column(column)?.unique()),
        FixtureOperation::Select { column, predicate } => Outcome::Rows {
            rows: select(table.column(column)?, predicate)?.to_vec(),
        },
        FixtureOperation::Arithmetic {
            left,
            operator,
            right,
        } => Outcome::cells_of(&binary(
            table.numeric_column(left)?,
            *operator,
            table.numeric_column(right)?,
        )?),
        FixtureOperation::ArithmeticScalar {
            column,
            operator,
            value,
        } => Outcome::cells_of(&binary_scalar(
            table.numeric_column(column)?,
            *operator,
            value,
        )?),
        FixtureOperation::SortBy { column, ascending } => {
            let sorted = table.sort_by(column, *ascending)?;
            Outcome::cells_of(sorted.column(column)?)
        }
        FixtureOperation::Transform { column, transform } => {
            let source = table.column(column)?;
            let text = source
                .as_category()
                .ok_or(HarnessError::WrongColumnType {
                    operation: "transform",
                    expected: "category",
                    found: source.column_type(),
                })?;
            let transformed = match transform {
                TextTransform::UpperCase => text.upper_case(),
                TextTransform::LowerCase => text.lower_case(),
                TextTransform::Trim => text.trim(),
            };
            Outcome::cells_of(&AnyColumn::from(transformed))
        }
    };
    Ok(outcome)
}

fn select(column: &AnyColumn, predicate: &FixturePredicate) -> Result<Selection, HarnessError> {
    let selection = match predicate {
        FixturePredicate::IsMissing => column.is_missing(),
        FixturePredicate::IsNotMissing => column.is_not_missing(),
        FixturePredicate::GreaterThan { value } => numeric_rows(column, |cell| cell > *value)?,
        FixturePredicate::LessThan { value } => numeric_rows(column, |cell| cell < *value)?,
        FixturePredicate::EqualsText { value } => match column.as_category() {
            Some(text) => text.is_equal_to(value),
            None => (0..column.size())
                .filter(|row| !column.is_missing_at(*row) && column.get_string(*row) == *value)
                .collect(),
        },
    };
    Ok(selection)
}

/// Rows whose non-missing numeric value satisfies `test`.
fn numeric_rows(
    column: &AnyColumn,
    test: impl Fn(f64) -> bool,
) -> Result<Selection, HarnessError> {
    let numbers = column.as_numeric().ok_or(HarnessError::WrongColumnType {
        operation: "select",
        expected: "numeric",
        found: column.column_type(),
    })?;
    Ok((0..numbers.size())
        .filter(|row| !numbers.is_missing_at(*row) && test(numbers.double_at(*row)))
        .collect())
}

#[cfg(test)]
mod tests {
    use ck_types::{ColumnType, ParseOptions};

    use super::{
        CaseStatus, ConformanceCase, FixtureColumn, FixtureOperation, Outcome, build_table,
        builtin_cases, run_case, run_suite,
    };

    fn ints(name: &str, cells: &[&str]) -> FixtureColumn {
        FixtureColumn {
            name: name.to_owned(),
            column_type: ColumnType::Int,
            cells: cells.iter().map(|cell| (*cell).to_owned()).collect(),
        }
    }

    #[test]
    fn builtin_suite_is_green() {
        let cases = builtin_cases().expect("builtin fixtures parse");
        assert!(!cases.is_empty());
        let report = run_suite(&cases, ParseOptions::standard());
        assert!(report.is_green(), "failed cases: {:?}", report.failed());
        assert_eq!(report.passed(), cases.len());
    }

    #[test]
    fn build_table_reports_unparsable_cells() {
        let columns = [ints("n", &["1", "two"])];
        let err = build_table(&columns, ParseOptions::standard()).expect_err("bad cell");
        assert!(err.to_string().contains("two"));
    }

    #[test]
    fn failing_expectation_is_reported() {
        let case = ConformanceCase {
            id: "wrong".to_owned(),
            columns: vec![ints("n", &["1", "2"])],
            operation: FixtureOperation::CountUnique {
                column: "n".to_owned(),
            },
            expected: Outcome::Count { value: 3 },
        };
        let result = run_case(&case, ParseOptions::standard());
        assert_eq!(result.status, CaseStatus::Fail);
        assert_eq!(result.observed, Outcome::Count { value: 2 });
        assert_eq!(result.operation, "count_unique");
    }

    #[test]
    fn nan_expectations_use_null() {
        let expected = Outcome::Number { value: None };
        assert!(expected.accepts(&Outcome::number(f64::NAN)));
        assert!(!expected.accepts(&Outcome::number(1.0)));
        assert!(Outcome::number(0.1 + 0.2).accepts(&Outcome::number(0.3)));
    }
}
