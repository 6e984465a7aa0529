//! Element-wise arithmetic between numeric columns, or a column and a
//! scalar.
//!
//! Integer results are computed with checked `i64` operations and narrowed
//! into the result type; floating results are computed in `f64`. Missing in
//! either operand yields missing.

use std::ops::{Add, Div, Mul, Rem, Sub};

use ck_types::{ColumnType, Scalar, TypeError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kind::NumericKind;
use crate::{
    AnyColumn, Column, ColumnError, DoubleColumn, FloatColumn, IntColumn, LongColumn,
    NumericColumn, ShortColumn, TypedColumn, check_lengths,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithmeticOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    /// `None` on overflow. Callers handle a zero divisor before this.
    fn checked_i64(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Self::Add => a.checked_add(b),
            Self::Sub => a.checked_sub(b),
            Self::Mul => a.checked_mul(b),
            Self::Div => a.checked_div(b),
            Self::Rem => a.checked_rem(b),
        }
    }

    fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Rem => a % b,
        }
    }
}

/// Right-hand side of an arithmetic expression.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Column(&'a dyn NumericColumn),
    Integer(i64),
    Floating(f64),
}

impl Operand<'_> {
    fn label(&self) -> String {
        match self {
            Self::Column(column) => column.name().to_owned(),
            Self::Integer(value) => value.to_string(),
            Self::Floating(value) => value.to_string(),
        }
    }

    fn long_at(&self, row: usize) -> Option<i64> {
        match self {
            Self::Column(column) => column.long_at(row),
            Self::Integer(value) => Some(*value),
            Self::Floating(_) => None,
        }
    }

    fn double_at(&self, row: usize) -> f64 {
        match self {
            Self::Column(column) => column.double_at(row),
            Self::Integer(value) => *value as f64,
            Self::Floating(value) => *value,
        }
    }

    /// Result type of `left <op> self`.
    fn result_type(&self, left: ColumnType, op: ArithmeticOp) -> Result<ColumnType, TypeError> {
        let divide = op == ArithmeticOp::Div;
        match self {
            Self::Column(column) => left.arithmetic_result(column.column_type(), divide),
            Self::Integer(_) if left.is_integer() && divide => Ok(ColumnType::Double),
            Self::Integer(_) if left.is_numeric() => Ok(left),
            Self::Floating(_) if left.is_floating() => Ok(left),
            Self::Floating(_) if left.is_numeric() => Ok(ColumnType::Double),
            _ => Err(TypeError::IncompatibleTypes {
                left,
                right: ColumnType::Double,
            }),
        }
    }
}

impl TryFrom<&Scalar> for Operand<'_> {
    type Error = TypeError;

    fn try_from(scalar: &Scalar) -> Result<Self, Self::Error> {
        match scalar.as_i64() {
            Some(value) => Ok(Self::Integer(value)),
            None => Ok(Self::Floating(scalar.to_f64()?)),
        }
    }
}

/// `left <op> right`, element-wise.
pub fn evaluate(
    left: &dyn NumericColumn,
    op: ArithmeticOp,
    right: Operand<'_>,
) -> Result<AnyColumn, ColumnError> {
    if let Operand::Column(column) = right {
        check_lengths(left.size(), column.size())?;
    }
    let column_type = right.result_type(left.column_type(), op)?;
    let name = format!("{} {} {}", left.name(), op.symbol(), right.label());
    debug!(%name, result_type = %column_type, rows = left.size(), "arithmetic");

    let column = match column_type {
        ColumnType::Short => {
            ShortColumn::from_i64_cells(&name, integer_cells(left, op, right, column_type)?)?
                .into()
        }
        ColumnType::Int => {
            IntColumn::from_i64_cells(&name, integer_cells(left, op, right, column_type)?)?
                .into()
        }
        ColumnType::Long => {
            LongColumn::from_i64_cells(&name, integer_cells(left, op, right, column_type)?)?
                .into()
        }
        ColumnType::Float => FloatColumn::from_f64_cells(&name, floating_cells(left, op, right)).into(),
        ColumnType::Double => {
            DoubleColumn::from_f64_cells(&name, floating_cells(left, op, right)).into()
        }
        other => {
            return Err(ColumnError::Unsupported {
                operation: "arithmetic",
                column_type: other,
            });
        }
    };
    Ok(column)
}

fn integer_cells(
    left: &dyn NumericColumn,
    op: ArithmeticOp,
    right: Operand<'_>,
    column_type: ColumnType,
) -> Result<Vec<Option<i64>>, ColumnError> {
    (0..left.size())
        .map(|row| {
            let (Some(a), Some(b)) = (left.long_at(row), right.long_at(row)) else {
                return Ok(None);
            };
            if op == ArithmeticOp::Rem && b == 0 {
                return Ok(None);
            }
            op.checked_i64(a, b)
                .map(Some)
                .ok_or(ColumnError::Overflow { row, column_type })
        })
        .collect()
}

fn floating_cells(left: &dyn NumericColumn, op: ArithmeticOp, right: Operand<'_>) -> Vec<f64> {
    (0..left.size())
        .map(|row| op.apply_f64(left.double_at(row), right.double_at(row)))
        .collect()
}

/// Column-with-column arithmetic.
pub fn binary(
    left: &dyn NumericColumn,
    op: ArithmeticOp,
    right: &dyn NumericColumn,
) -> Result<AnyColumn, ColumnError> {
    evaluate(left, op, Operand::Column(right))
}

/// Column-with-scalar arithmetic. Integral scalars keep an integral
/// column integral; a missing scalar is an error.
pub fn binary_scalar(
    left: &dyn NumericColumn,
    op: ArithmeticOp,
    right: &Scalar,
) -> Result<AnyColumn, ColumnError> {
    evaluate(left, op, Operand::try_from(right)?)
}

macro_rules! operator {
    ($trait:ident, $method:ident, $op:ident) => {
        impl $trait<&AnyColumn> for &AnyColumn {
            type Output = Result<AnyColumn, ColumnError>;

            fn $method(self, rhs: &AnyColumn) -> Self::Output {
                let right = rhs.numeric("arithmetic")?;
                binary(self.numeric("arithmetic")?, ArithmeticOp::$op, right)
            }
        }

        impl $trait<i64> for &AnyColumn {
            type Output = Result<AnyColumn, ColumnError>;

            fn $method(self, rhs: i64) -> Self::Output {
                evaluate(self.numeric("arithmetic")?, ArithmeticOp::$op, Operand::Integer(rhs))
            }
        }

        impl $trait<f64> for &AnyColumn {
            type Output = Result<AnyColumn, ColumnError>;

            fn $method(self, rhs: f64) -> Self::Output {
                evaluate(self.numeric("arithmetic")?, ArithmeticOp::$op, Operand::Floating(rhs))
            }
        }

        impl<K: NumericKind, R: NumericKind> $trait<&TypedColumn<R>> for &TypedColumn<K> {
            type Output = Result<AnyColumn, ColumnError>;

            fn $method(self, rhs: &TypedColumn<R>) -> Self::Output {
                binary(self, ArithmeticOp::$op, rhs)
            }
        }

        impl<K: NumericKind> $trait<i64> for &TypedColumn<K> {
            type Output = Result<AnyColumn, ColumnError>;

            fn $method(self, rhs: i64) -> Self::Output {
                evaluate(self, ArithmeticOp::$op, Operand::Integer(rhs))
            }
        }

        impl<K: NumericKind> $trait<f64> for &TypedColumn<K> {
            type Output = Result<AnyColumn, ColumnError>;

            fn $method(self, rhs: f64) -> Self::Output {
                evaluate(self, ArithmeticOp::$op, Operand::Floating(rhs))
            }
        }
    };
}

operator!(Add, add, Add);
operator!(Sub, sub, Sub);
operator!(Mul, mul, Mul);
operator!(Div, div, Div);
operator!(Rem, rem, Rem);
