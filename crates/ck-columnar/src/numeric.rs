//! Predicates and the statistics contract for the numeric kinds.

use ck_selection::Selection;

use crate::kind::{CellKind, FloatingKind, IntegerKind, NumericKind};
use crate::{Column, ColumnError, NumericColumn, TypedColumn};

impl<K: NumericKind> TypedColumn<K> {
    pub fn is_less_than(&self, value: K::Native) -> Selection {
        self.select_native(|v| v < value)
    }

    pub fn is_less_than_or_equal_to(&self, value: K::Native) -> Selection {
        self.select_native(|v| v <= value)
    }

    pub fn is_greater_than(&self, value: K::Native) -> Selection {
        self.select_native(|v| v > value)
    }

    pub fn is_greater_than_or_equal_to(&self, value: K::Native) -> Selection {
        self.select_native(|v| v >= value)
    }

    pub fn is_between_exclusive(&self, low: K::Native, high: K::Native) -> Selection {
        self.select_native(|v| v > low && v < high)
    }

    pub fn is_between_inclusive(&self, low: K::Native, high: K::Native) -> Selection {
        self.select_native(|v| v >= low && v <= high)
    }

    pub fn is_positive(&self) -> Selection {
        self.select_native(|v| v > K::ZERO)
    }

    pub fn is_negative(&self) -> Selection {
        self.select_native(|v| v < K::ZERO)
    }

    pub fn is_non_negative(&self) -> Selection {
        self.select_native(|v| v >= K::ZERO)
    }

    pub fn is_zero(&self) -> Selection {
        self.select_native(|v| v == K::ZERO)
    }

    pub fn is_equal_to_column(&self, other: &Self) -> Result<Selection, ColumnError> {
        self.select_pairwise(other, |a, b| a == b)
    }

    pub fn is_greater_than_column(&self, other: &Self) -> Result<Selection, ColumnError> {
        self.select_pairwise(other, |a, b| a > b)
    }

    pub fn is_less_than_column(&self, other: &Self) -> Result<Selection, ColumnError> {
        self.select_pairwise(other, |a, b| a < b)
    }

    /// Absolute values, named `abs(<name>)`.
    #[must_use]
    pub fn abs(&self) -> Self {
        let data = self.natives().iter().map(|v| K::absolute(*v)).collect();
        Self::from_natives(&format!("abs({})", self.name()), data)
    }

    /// Negated values, named `-<name>`.
    #[must_use]
    pub fn neg(&self) -> Self {
        let data = self.natives().iter().map(|v| K::negate(*v)).collect();
        Self::from_natives(&format!("-{}", self.name()), data)
    }
}

impl<K: IntegerKind> TypedColumn<K> {
    pub fn is_even(&self) -> Selection {
        self.select_native(|v| K::to_i64(v) % 2 == 0)
    }

    pub fn is_odd(&self) -> Selection {
        self.select_native(|v| K::to_i64(v) % 2 != 0)
    }

    /// Narrows optional integers into this kind.
    ///
    /// A value that does not fit, or that lands on the missing sentinel,
    /// fails with [`ColumnError::Overflow`] naming the offending row.
    pub fn from_i64_cells<I: IntoIterator<Item = Option<i64>>>(
        name: &str,
        cells: I,
    ) -> Result<Self, ColumnError> {
        let data = cells
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(K::MISSING),
                Some(value) => K::from_i64(value).ok_or(ColumnError::Overflow {
                    row,
                    column_type: K::COLUMN_TYPE,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_natives(name, data))
    }
}

impl<K: FloatingKind> TypedColumn<K> {
    /// Builds a floating column from doubles; `NaN` cells are missing.
    pub fn from_f64_cells<I: IntoIterator<Item = f64>>(name: &str, cells: I) -> Self {
        Self::from_natives(name, cells.into_iter().map(K::from_f64).collect())
    }
}

impl<K: NumericKind> NumericColumn for TypedColumn<K> {
    fn double_at(&self, row: usize) -> f64 {
        let native = self.natives()[row];
        if K::is_missing(native) {
            f64::NAN
        } else {
            K::to_f64(native)
        }
    }

    fn long_at(&self, row: usize) -> Option<i64> {
        K::as_i64(self.natives()[row])
    }

    fn to_double_array(&self) -> Vec<f64> {
        self.natives().iter().map(|v| K::to_f64(*v)).collect()
    }

    fn non_missing_f64(&self) -> Vec<f64> {
        self.non_missing().map(K::to_f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DoubleColumn, FloatColumn, IntColumn, LongColumn, ShortColumn};

    fn with_missing() -> IntColumn {
        IntColumn::from_options("n", [Some(10), Some(20), None, Some(40)])
    }

    #[test]
    fn mean_skips_missing_cells() {
        let column = with_missing();
        assert!((column.mean() - 70.0 / 3.0).abs() < 1e-12);
        assert_eq!(column.sum(), 70.0);
        assert_eq!(column.stats().count, 3);
    }

    #[test]
    fn to_double_array_keeps_sentinels_verbatim() {
        let values = with_missing().to_double_array();
        assert_eq!(values[2], f64::from(i32::MIN));
        let floats = DoubleColumn::from_values("d", [1.5, f64::NAN]).to_double_array();
        assert!(floats[1].is_nan());
    }

    #[test]
    fn comparison_predicates_skip_missing() {
        let column = with_missing();
        assert_eq!(column.is_less_than(25).to_vec(), vec![0, 1]);
        assert_eq!(column.is_greater_than_or_equal_to(20).to_vec(), vec![1, 3]);
        assert_eq!(column.is_between_exclusive(10, 40).to_vec(), vec![1]);
        assert_eq!(column.is_between_inclusive(10, 40).to_vec(), vec![0, 1, 3]);
        assert_eq!(column.is_non_negative().len(), 3);
    }

    #[test]
    fn sign_predicates() {
        let column = DoubleColumn::from_values("d", [-1.5, 0.0, 2.0, f64::NAN]);
        assert_eq!(column.is_negative().to_vec(), vec![0]);
        assert_eq!(column.is_zero().to_vec(), vec![1]);
        assert_eq!(column.is_positive().to_vec(), vec![2]);
    }

    #[test]
    fn signed_zeros_are_one_value() {
        let column = DoubleColumn::from_values("d", [-0.0, 0.0, 1.0]);
        assert_eq!(column.is_equal_to(0.0).to_vec(), vec![0, 1]);
        assert_eq!(column.is_not_equal_to(0.0).to_vec(), vec![2]);
        assert_eq!(column.is_zero().to_vec(), vec![0, 1]);
        assert_eq!(column.is_in([0.0]).to_vec(), vec![0, 1]);
        assert_eq!(column.count_unique(), 2);
        let negated = FloatColumn::from_values("f", [0.0_f32]).neg();
        assert_eq!(negated.is_equal_to(0.0).to_vec(), vec![0]);
        assert!(negated.is_not_equal_to(0.0).is_empty());
    }

    #[test]
    fn parity_predicates_select_integers() {
        let column = IntColumn::from_values("test", [1, 2, 3, 4]);
        let even = column.subset(&column.is_even()).expect("subset");
        assert_eq!(even.natives(), &[2, 4]);
        assert_eq!(column.is_odd().to_vec(), vec![0, 2]);
        let negative = ShortColumn::from_values("s", [-3, -2]);
        assert_eq!(negative.is_odd().to_vec(), vec![0]);
    }

    #[test]
    fn column_comparisons_require_equal_lengths() {
        let a = IntColumn::from_values("a", [1, 5, 3]);
        let b = IntColumn::from_options("b", [Some(1), Some(2), None]);
        assert_eq!(a.is_equal_to_column(&b).expect("same size").to_vec(), vec![0]);
        assert_eq!(a.is_greater_than_column(&b).expect("same size").to_vec(), vec![1]);
        assert!(a.is_less_than_column(&b).expect("same size").is_empty());
        let short = IntColumn::from_values("c", [1]);
        assert_eq!(
            a.is_equal_to_column(&short),
            Err(ColumnError::LengthMismatch { left: 3, right: 1 })
        );
    }

    #[test]
    fn narrowing_reports_overflowing_row() {
        let err = ShortColumn::from_i64_cells("s", [Some(1), None, Some(70_000)])
            .expect_err("does not fit");
        assert_eq!(
            err,
            ColumnError::Overflow {
                row: 2,
                column_type: ck_types::ColumnType::Short
            }
        );
        let ok = LongColumn::from_i64_cells("l", [Some(1), None]).expect("fits");
        assert_eq!(ok.count_missing(), 1);
    }

    #[test]
    fn abs_and_neg_preserve_missing() {
        let column = IntColumn::from_options("n", [Some(-3), None, Some(4)]);
        assert_eq!(column.abs().natives(), &[3, i32::MIN, 4]);
        assert_eq!(column.neg().natives(), &[3, i32::MIN, -4]);
        assert_eq!(column.neg().name(), "-n");
    }

    #[test]
    fn derived_double_columns() {
        let column = with_missing();
        let diff = column.difference();
        assert!(diff.is_missing_at(0));
        assert_eq!(diff.get(1), Some(10.0));
        assert!(diff.is_missing_at(2));
        assert!(diff.is_missing_at(3));

        let running = column.cumulative_sum();
        assert_eq!(running.get(3), Some(70.0));
        assert!(running.is_missing_at(2));

        let halves = column.map_f64("half", &|v| v / 2.0);
        assert_eq!(halves.get(0), Some(5.0));
    }

    #[test]
    fn running_product_and_percent_change() {
        let column = IntColumn::from_options("n", [Some(2), Some(4), None, Some(3), Some(6)]);
        let product = column.cumulative_product();
        assert_eq!(product.name(), "n[cumProd]");
        assert_eq!(product.get(1), Some(8.0));
        assert!(product.is_missing_at(2));
        assert_eq!(product.get(4), Some(144.0));

        let change = column.percent_change();
        assert_eq!(change.name(), "n[pctChange]");
        assert!(change.is_missing_at(0));
        assert_eq!(change.get(1), Some(1.0));
        assert!(change.is_missing_at(2));
        assert!(change.is_missing_at(3));
        assert_eq!(change.get(4), Some(1.0));
    }

    #[test]
    fn normalize_yields_z_scores() {
        let column = DoubleColumn::from_values("d", [2.0, 4.0, f64::NAN, 6.0]);
        let scores = column.normalize();
        assert_eq!(scores.name(), "d normalized");
        assert_eq!(scores.get(0), Some(-1.0));
        assert_eq!(scores.get(1), Some(0.0));
        assert!(scores.is_missing_at(2));
        assert_eq!(scores.get(3), Some(1.0));

        let flat = IntColumn::from_values("flat", [5, 5]).normalize();
        assert_eq!(flat.count_missing(), 2);
    }

    #[test]
    fn ratios_share_the_sum() {
        let column = IntColumn::from_options("n", [Some(1), None, Some(3)]);
        let ratios = column.as_ratio();
        assert_eq!(ratios.name(), "n percents");
        assert_eq!(ratios.get(0), Some(0.25));
        assert!(ratios.is_missing_at(1));
        assert_eq!(ratios.get(2), Some(0.75));
        let zero_sum = IntColumn::from_values("z", [1, -1]).as_ratio();
        assert_eq!(zero_sum.count_missing(), 2);
    }

    #[test]
    fn conditional_reductions() {
        let column = with_missing();
        assert_eq!(column.count_if(&|v| v > 15.0), 2);
        assert_eq!(column.sum_if(&|v| v > 15.0), 60.0);
    }

    #[test]
    fn percentile_rejects_out_of_range() {
        let column = FloatColumn::from_values("f", [1.0, 2.0, 3.0]);
        assert_eq!(column.percentile(50.0), Ok(2.0));
        assert!(matches!(
            column.percentile(150.0),
            Err(ColumnError::Stats(_))
        ));
    }
}
