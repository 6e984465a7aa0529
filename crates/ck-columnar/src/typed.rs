use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::ops::Range;

use ck_selection::Selection;
use ck_stats::Stats;
use ck_types::{ColumnType, ParseOptions, Scalar};
use tracing::{debug, warn};

use crate::kind::{
    BooleanKind, CellKind, DateKind, DateTimeKind, DoubleKind, FloatKind, IntKind, LongKind,
    ShortKind, TimeKind,
};
use crate::{
    AnyColumn, CategoryColumn, Column, ColumnError, ColumnId, Summary, check_lengths,
    check_rows, clamp_range,
};

pub type BooleanColumn = TypedColumn<BooleanKind>;
pub type ShortColumn = TypedColumn<ShortKind>;
pub type IntColumn = TypedColumn<IntKind>;
pub type LongColumn = TypedColumn<LongKind>;
pub type FloatColumn = TypedColumn<FloatKind>;
pub type DoubleColumn = TypedColumn<DoubleKind>;
pub type DateColumn = TypedColumn<DateKind>;
pub type TimeColumn = TypedColumn<TimeKind>;
pub type DateTimeColumn = TypedColumn<DateTimeKind>;

/// A column backed by a contiguous buffer of fixed-width native cells.
#[derive(Debug, Clone)]
pub struct TypedColumn<K: CellKind> {
    id: ColumnId,
    name: String,
    data: Vec<K::Native>,
    kind: PhantomData<K>,
}

impl<K: CellKind> TypedColumn<K> {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, ParseOptions::standard().default_capacity)
    }

    #[must_use]
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        Self::from_natives(name, Vec::with_capacity(capacity))
    }

    /// Wraps raw storage; cells equal to the sentinel are missing.
    #[must_use]
    pub fn from_natives(name: &str, data: Vec<K::Native>) -> Self {
        Self {
            id: ColumnId::fresh(),
            name: name.to_owned(),
            data,
            kind: PhantomData,
        }
    }

    /// Builds a column from values; a value that encodes to the missing
    /// sentinel (an integer `MIN`, a float `NaN`) becomes a missing cell.
    pub fn from_values<I: IntoIterator<Item = K::Value>>(name: &str, values: I) -> Self {
        Self::from_natives(name, values.into_iter().map(K::encode).collect())
    }

    pub fn from_options<I: IntoIterator<Item = Option<K::Value>>>(name: &str, values: I) -> Self {
        Self::from_natives(
            name,
            values
                .into_iter()
                .map(|value| value.map_or(K::MISSING, K::encode))
                .collect(),
        )
    }

    fn derived(&self, name: &str, data: Vec<K::Native>) -> Self {
        Self::from_natives(name, data)
    }

    #[must_use]
    pub fn natives(&self) -> &[K::Native] {
        &self.data
    }

    /// Value at `row`; `None` when missing or out of bounds.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<K::Value> {
        self.data.get(row).and_then(|native| K::decode(*native))
    }

    #[must_use]
    pub fn get_scalar(&self, row: usize) -> Scalar {
        self.data
            .get(row)
            .map_or(Scalar::Missing, |native| K::to_scalar(*native))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<K::Value>> + '_ {
        self.data.iter().map(|native| K::decode(*native))
    }

    /// Appends a value; values that collide with the missing sentinel are
    /// rejected.
    pub fn append(&mut self, value: K::Value) -> Result<(), ColumnError> {
        let native = self.encode_present(value)?;
        self.data.push(native);
        Ok(())
    }

    fn encode_present(&self, value: K::Value) -> Result<K::Native, ColumnError> {
        let native = K::encode(value);
        if K::is_missing(native) {
            warn!(column = %self.name, "rejected value equal to the missing sentinel");
            return Err(ColumnError::InvalidArgument(format!(
                "value for {} collides with the missing sentinel",
                K::COLUMN_TYPE
            )));
        }
        Ok(native)
    }

    pub(crate) fn push_native(&mut self, native: K::Native) {
        self.data.push(native);
    }

    /// Replaces the cell at `row`; `None` marks it missing. Like
    /// [`append`](Self::append), a value equal to the sentinel is rejected.
    pub fn set(&mut self, row: usize, value: Option<K::Value>) -> Result<(), ColumnError> {
        let size = self.data.len();
        let native = match value {
            Some(value) => self.encode_present(value)?,
            None => K::MISSING,
        };
        let cell = self
            .data
            .get_mut(row)
            .ok_or(ColumnError::RowOutOfBounds { row, size })?;
        *cell = native;
        Ok(())
    }

    /// Rows whose non-missing value satisfies `predicate`.
    pub fn select<F: Fn(K::Value) -> bool>(&self, predicate: F) -> Selection {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(row, native)| {
                K::decode(*native)
                    .filter(|value| predicate(value.clone()))
                    .map(|_| row)
            })
            .collect()
    }

    /// Rows whose non-missing native cell satisfies `predicate`.
    pub(crate) fn select_native<F: Fn(K::Native) -> bool>(&self, predicate: F) -> Selection {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, native)| !K::is_missing(**native) && predicate(**native))
            .map(|(row, _)| row)
            .collect()
    }

    /// Rows where both cells are present and satisfy `predicate`.
    pub(crate) fn select_pairwise<F: Fn(K::Native, K::Native) -> bool>(
        &self,
        other: &Self,
        predicate: F,
    ) -> Result<Selection, ColumnError> {
        check_lengths(self.size(), other.size())?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .enumerate()
            .filter(|(_, (a, b))| {
                !K::is_missing(**a) && !K::is_missing(**b) && predicate(**a, **b)
            })
            .map(|(row, _)| row)
            .collect())
    }

    /// New column holding the non-missing cells that satisfy `predicate`.
    pub fn select_if<F: Fn(K::Value) -> bool>(&self, predicate: F) -> Self {
        let data = self
            .select(predicate)
            .iter()
            .map(|row| self.data[row])
            .collect();
        self.derived(&self.name, data)
    }

    pub fn is_equal_to(&self, value: K::Value) -> Selection {
        let target = K::encode(value);
        self.select_native(|native| K::compare(native, target) == Ordering::Equal)
    }

    pub fn is_not_equal_to(&self, value: K::Value) -> Selection {
        let target = K::encode(value);
        self.select_native(|native| K::compare(native, target) != Ordering::Equal)
    }

    pub fn is_in<I: IntoIterator<Item = K::Value>>(&self, values: I) -> Selection {
        let keys: HashSet<u64> = values
            .into_iter()
            .map(|value| K::hash_key(K::encode(value)))
            .collect();
        self.select_native(|native| keys.contains(&K::hash_key(native)))
    }

    pub fn is_not_in<I: IntoIterator<Item = K::Value>>(&self, values: I) -> Selection {
        let keys: HashSet<u64> = values
            .into_iter()
            .map(|value| K::hash_key(K::encode(value)))
            .collect();
        self.select_native(|native| !keys.contains(&K::hash_key(native)))
    }

    pub(crate) fn non_missing(&self) -> impl Iterator<Item = K::Native> + '_ {
        self.data.iter().copied().filter(|native| !K::is_missing(*native))
    }

    fn sorted_non_missing(&self) -> Vec<K::Native> {
        let mut values: Vec<K::Native> = self.non_missing().collect();
        values.sort_by(|a, b| K::compare(*a, *b));
        values
    }

    /// The `n` largest non-missing values, largest first.
    #[must_use]
    pub fn top(&self, n: usize) -> Self {
        let mut values = self.sorted_non_missing();
        values.reverse();
        values.truncate(n);
        self.derived(&format!("Top {n}: {}", self.name), values)
    }

    /// The `n` smallest non-missing values, smallest first.
    #[must_use]
    pub fn bottom(&self, n: usize) -> Self {
        let mut values = self.sorted_non_missing();
        values.truncate(n);
        self.derived(&format!("Bottom {n}: {}", self.name), values)
    }

    fn numeric_summary(&self) -> Summary {
        let values: Vec<f64> = self.non_missing().filter_map(K::numeric_value).collect();
        let stats = Stats::compute(&values);
        let (labels, numbers): (Vec<&str>, Vec<f64>) =
            stats.summary_measures().into_iter().unzip();
        Summary::titled(
            &self.name,
            CategoryColumn::from_values("Measure", labels),
            AnyColumn::Double(DoubleColumn::from_values("Value", numbers)),
        )
    }

    /// Count per distinct value, plus a trailing count of missing cells.
    fn frequency_summary(&self) -> Summary {
        let mut labels = CategoryColumn::new("Value");
        let mut counts: Vec<i32> = Vec::new();
        let mut slots: HashMap<u64, usize> = HashMap::new();
        for native in self.sorted_non_missing() {
            let slot = *slots.entry(K::hash_key(native)).or_insert_with(|| {
                labels.append(&K::render(native));
                counts.push(0);
                counts.len() - 1
            });
            counts[slot] += 1;
        }
        labels.append("missing");
        counts.push(self.count_missing() as i32);
        Summary::titled(
            &self.name,
            labels,
            AnyColumn::Int(IntColumn::from_values("Count", counts)),
        )
    }

    fn temporal_summary(&self) -> Summary {
        let sorted = self.sorted_non_missing();
        let render =
            |native: Option<&K::Native>| native.map_or_else(String::new, |n| K::render(*n));
        let labels =
            CategoryColumn::from_values("Measure", ["Count", "Missing", "Earliest", "Latest"]);
        let values = CategoryColumn::from_values(
            "Value",
            [
                sorted.len().to_string(),
                self.count_missing().to_string(),
                render(sorted.first()),
                render(sorted.last()),
            ],
        );
        Summary::titled(&self.name, labels, AnyColumn::Category(values))
    }
}

impl<K: CellKind> Column for TypedColumn<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.name);
    }

    fn column_type(&self) -> ColumnType {
        K::COLUMN_TYPE
    }

    fn id(&self) -> ColumnId {
        self.id
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn count_missing(&self) -> usize {
        self.data.iter().filter(|native| K::is_missing(**native)).count()
    }

    fn count_unique(&self) -> usize {
        self.non_missing()
            .map(K::hash_key)
            .collect::<HashSet<_>>()
            .len()
    }

    fn get_string(&self, row: usize) -> String {
        let native = self.data[row];
        if K::is_missing(native) {
            String::new()
        } else {
            K::render(native)
        }
    }

    fn is_missing_at(&self, row: usize) -> bool {
        K::is_missing(self.data[row])
    }

    fn append_cell_with(&mut self, text: &str, options: &ParseOptions) -> Result<(), ColumnError> {
        let trimmed = text.trim();
        if options.is_missing_token(trimmed) {
            self.data.push(K::MISSING);
            return Ok(());
        }
        match K::parse(trimmed, options) {
            Ok(native) => {
                self.data.push(native);
                Ok(())
            }
            Err(err) => {
                warn!(column = %self.name, text, error = %err, "rejected cell");
                Err(err.into())
            }
        }
    }

    fn append_missing(&mut self) {
        self.data.push(K::MISSING);
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn sort_ascending(&mut self) {
        debug!(column = %self.name, rows = self.data.len(), "sort ascending");
        self.data.sort_by(|a, b| K::compare(*a, *b));
    }

    fn sort_descending(&mut self) {
        debug!(column = %self.name, rows = self.data.len(), "sort descending");
        self.data.sort_by(|a, b| K::compare(*b, *a));
    }

    fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        K::compare(self.data[a], self.data[b])
    }

    fn summary(&self) -> Summary {
        match K::COLUMN_TYPE {
            ColumnType::Boolean => self.frequency_summary(),
            column_type if column_type.is_temporal() => self.temporal_summary(),
            _ => self.numeric_summary(),
        }
    }

    fn copy(&self) -> Self {
        self.clone()
    }

    fn empty_copy(&self, row_size_hint: usize) -> Self {
        Self::with_capacity(&self.name, row_size_hint)
    }

    fn unique(&self) -> Self {
        let mut seen = HashSet::new();
        let data = self
            .non_missing()
            .filter(|native| seen.insert(K::hash_key(*native)))
            .collect();
        self.derived(&format!("{} Unique values", self.name), data)
    }

    fn take(&self, rows: &[usize]) -> Result<Self, ColumnError> {
        check_rows(rows, self.data.len())?;
        Ok(self.derived(&self.name, rows.iter().map(|row| self.data[*row]).collect()))
    }

    fn slice(&self, range: Range<usize>) -> Self {
        let range = clamp_range(range, self.data.len());
        self.derived(&self.name, self.data[range].to_vec())
    }

    fn append_column(&mut self, other: &Self) -> Result<(), ColumnError> {
        self.data.extend_from_slice(&other.data);
        Ok(())
    }
}
