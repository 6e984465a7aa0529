#![forbid(unsafe_code)]

//! Property-based checks over the column family.
//!
//! Generators produce columns with arbitrary missing patterns; properties
//! state the behaviour that must hold for every such column.

use proptest::prelude::*;

use ck_columnar::{AnyColumn, CategoryColumn, Column, DoubleColumn, IntColumn, NumericColumn};
use ck_frame::Table;
use ck_selection::Selection;

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

fn arb_int_cells(max_len: usize) -> impl Strategy<Value = Vec<Option<i32>>> {
    proptest::collection::vec(proptest::option::weighted(0.8, -1_000i32..1_000), 0..max_len)
}

fn arb_double_cells(max_len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
    proptest::collection::vec(proptest::option::weighted(0.8, -1e6f64..1e6), 0..max_len)
}

/// Text that keeps surrounding spaces and never equals a missing token.
fn arb_padded_text_cells(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(" {0,2}[a-d]{1,3} {0,2}", 0..max_len)
}

fn arb_text_cells(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-d]{1,3}",
            1 => Just(String::new()),
        ],
        0..max_len,
    )
}

/// A column together with a selection of some of its rows.
fn arb_int_column_with_selection(
    max_len: usize,
) -> impl Strategy<Value = (Vec<Option<i32>>, Vec<usize>)> {
    arb_int_cells(max_len).prop_flat_map(|cells| {
        let len = cells.len();
        let rows = proptest::sample::subsequence((0..len).collect::<Vec<_>>(), 0..=len);
        (Just(cells), rows)
    })
}

fn arb_selection(rows: usize) -> impl Strategy<Value = Selection> {
    proptest::collection::vec(0..rows, 0..rows * 2).prop_map(Selection::from_indices)
}

// ---------------------------------------------------------------------------
// Property: copies and subsets
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Mutating a copy never changes the source.
    #[test]
    fn prop_copy_is_independent(cells in arb_int_cells(40)) {
        let original = IntColumn::from_options("n", cells.clone());
        let mut copy = original.copy();
        prop_assert_eq!(copy.size(), original.size());
        prop_assert_eq!(copy.id(), original.id());

        copy.append_missing();
        copy.sort_descending();
        prop_assert_eq!(original.size(), cells.len());
        let values: Vec<Option<i32>> = original.iter().collect();
        prop_assert_eq!(values, cells);
    }

    /// A subset has one row per selected index, in selection order.
    #[test]
    fn prop_subset_matches_selection((cells, rows) in arb_int_column_with_selection(40)) {
        let column = IntColumn::from_options("n", cells);
        let selection = Selection::from_indices(rows.iter().copied());
        let subset = column.subset(&selection).expect("rows are in range");
        prop_assert_eq!(subset.size(), selection.len());
        for (position, row) in selection.iter().enumerate() {
            prop_assert_eq!(subset.get_string(position), column.get_string(row));
        }
    }

    /// Table subsets keep every column aligned.
    #[test]
    fn prop_table_subset_keeps_rows_aligned((cells, rows) in arb_int_column_with_selection(30)) {
        let ints = IntColumn::from_options("n", cells.clone());
        let labels = CategoryColumn::from_values(
            "label",
            (0..cells.len()).map(|row| format!("row{row}")),
        );
        let table = Table::from_columns("t", [AnyColumn::from(ints), AnyColumn::from(labels)])
            .expect("table");
        let selection = Selection::from_indices(rows);
        let subset = table.subset(&selection).expect("subset");
        prop_assert_eq!(subset.row_count(), selection.len());
        for (position, row) in selection.iter().enumerate() {
            prop_assert_eq!(subset.row(position).expect("row"), table.row(row).expect("row"));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: unique values and missing cells
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// `unique()` is distinct, missing-free and drawn from the source.
    #[test]
    fn prop_unique_is_distinct(cells in arb_int_cells(60)) {
        let column = IntColumn::from_options("n", cells.clone());
        let unique = column.unique();
        prop_assert_eq!(unique.count_unique(), unique.size());
        prop_assert_eq!(unique.size(), column.count_unique());
        prop_assert_eq!(unique.count_missing(), 0);
        for value in unique.iter().flatten() {
            prop_assert!(cells.contains(&Some(value)));
        }
    }

    #[test]
    fn prop_text_unique_is_distinct(cells in arb_text_cells(60)) {
        let column = CategoryColumn::from_values("c", &cells);
        let unique = column.unique();
        prop_assert_eq!(unique.count_unique(), unique.size());
        prop_assert_eq!(unique.size(), column.as_set().len());
        prop_assert_eq!(
            column.count_missing(),
            cells.iter().filter(|cell| cell.is_empty()).count()
        );
    }

    /// Statistics over a column equal those over its present cells alone.
    #[test]
    fn prop_statistics_exclude_missing(cells in arb_double_cells(60)) {
        let with_missing = DoubleColumn::from_options("x", cells.clone());
        let present = DoubleColumn::from_values("x", cells.iter().flatten().copied());
        prop_assert_eq!(with_missing.non_missing_f64(), present.non_missing_f64());

        let pairs = [
            (with_missing.sum(), present.sum()),
            (with_missing.mean(), present.mean()),
            (with_missing.variance(), present.variance()),
            (with_missing.median(), present.median()),
            (with_missing.min(), present.min()),
        ];
        for (a, b) in pairs {
            prop_assert!(a == b || (a.is_nan() && b.is_nan()), "{} != {}", a, b);
        }
    }

    /// Rendering a cell and parsing it back yields the same text.
    #[test]
    fn prop_cells_round_trip_through_text(cells in arb_double_cells(40)) {
        let column = DoubleColumn::from_options("x", cells);
        let mut reloaded = column.empty_copy(column.size());
        for row in 0..column.size() {
            reloaded.append_cell(&column.get_string(row)).expect("rendered text parses");
        }
        prop_assert_eq!(reloaded.size(), column.size());
        for row in 0..column.size() {
            prop_assert_eq!(reloaded.get_string(row), column.get_string(row));
        }
    }

    /// Category text reloads verbatim, surrounding whitespace included.
    #[test]
    fn prop_category_cells_round_trip_through_text(cells in arb_padded_text_cells(40)) {
        let column = CategoryColumn::from_values("c", &cells);
        let mut reloaded = column.empty_copy(column.size());
        for row in 0..column.size() {
            reloaded.append_cell(&column.get_string(row)).expect("text cell");
        }
        prop_assert_eq!(reloaded.count_missing(), 0);
        for (row, cell) in cells.iter().enumerate() {
            prop_assert_eq!(reloaded.get(row), Some(cell.as_str()));
        }
    }

    /// Ascending sort puts missing first and is otherwise non-decreasing.
    #[test]
    fn prop_sort_ascending_orders_cells(cells in arb_int_cells(60)) {
        let mut column = IntColumn::from_options("n", cells.clone());
        column.sort_ascending();
        let sorted: Vec<Option<i32>> = column.iter().collect();
        let missing = cells.iter().filter(|cell| cell.is_none()).count();
        prop_assert!(sorted[..missing].iter().all(Option::is_none));
        prop_assert!(sorted[missing..].windows(2).all(|pair| pair[0] <= pair[1]));
    }
}

// ---------------------------------------------------------------------------
// Property: selection algebra
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_selection_algebra(
        (a, b) in (1usize..200).prop_flat_map(|rows| (arb_selection(rows), arb_selection(rows)))
    ) {
        let both = a.intersection(&b);
        for row in &both {
            prop_assert!(a.contains(row) && b.contains(row));
        }

        let either = a.union(&b);
        for row in a.iter().chain(b.iter()) {
            prop_assert!(either.contains(row));
        }
        prop_assert_eq!(either.len(), a.len() + b.len() - both.len());

        let only_a = a.difference(&b);
        for row in &only_a {
            prop_assert!(!b.contains(row));
        }
        prop_assert_eq!(only_a.len() + both.len(), a.len());

        let mut in_place = a.clone();
        in_place.and(&b);
        prop_assert_eq!(&in_place, &both);
    }

    /// Ascending iteration and complement partition the row range.
    #[test]
    fn prop_complement_partitions_rows(
        (rows, selection) in (1usize..300).prop_flat_map(|rows| (Just(rows), arb_selection(rows)))
    ) {
        let rest = selection.complement(rows);
        prop_assert_eq!(selection.len() + rest.len(), rows);
        prop_assert!(selection.intersection(&rest).is_empty());
        let listed = selection.to_vec();
        prop_assert!(listed.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

// ---------------------------------------------------------------------------
// Property: arithmetic
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Adding an integer scalar shifts every present cell and keeps missing.
    #[test]
    fn prop_add_scalar_is_elementwise(cells in arb_int_cells(40), shift in -1_000i64..1_000) {
        let column = IntColumn::from_options("n", cells.clone());
        let shifted = (&column + shift).expect("no overflow in range");
        for (row, cell) in cells.iter().enumerate() {
            let expected = cell.map_or(String::new(), |v| (i64::from(v) + shift).to_string());
            prop_assert_eq!(shifted.get_string(row), expected);
        }
    }
}
