#![forbid(unsafe_code)]

//! End-to-end scenarios spanning parsing, columns, tables and statistics.

use chrono::{NaiveDate, NaiveTime};
use ck_columnar::{
    AnyColumn, CategoryColumn, Column, DateColumn, IntColumn, NumericColumn, TimeColumn,
};
use ck_conformance::{build_table, builtin_cases, run_suite};
use ck_frame::{Reduction, Table};
use ck_types::{ColumnType, ParseOptions, Scalar};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn builtin_fixtures_pass_with_standard_options() {
    init_tracing();
    let cases = builtin_cases().expect("fixtures");
    let report = run_suite(&cases, ParseOptions::standard());
    assert!(report.is_green(), "failed: {:?}", report.failed());
}

#[test]
fn even_rows_subset_then_arithmetic() {
    init_tracing();
    let test = IntColumn::from_values("test", [1, 2, 3, 4]);
    let even = test.subset(&test.is_even()).expect("subset");
    assert_eq!(even.iter().flatten().collect::<Vec<_>>(), vec![2, 4]);

    let plus = (&test + 3_i64).expect("add");
    assert_eq!(plus.name(), "test + 3");
    let halves = (&test / 2_i64).expect("divide");
    assert_eq!(halves.column_type(), ColumnType::Double);
    assert_eq!(halves.get(0), Scalar::Double(0.5));
}

#[test]
fn category_case_and_uniqueness() {
    let letters = CategoryColumn::from_values("letters", ["A", "b", "A"]);
    let upper = letters.upper_case();
    assert_eq!(upper.iter().collect::<Vec<_>>(), vec!["A", "B", "A"]);
    assert_eq!(letters.count_unique(), 2);
    assert_eq!(upper.count_unique(), 2);
}

#[test]
fn mean_ignores_missing_cell() {
    let values = IntColumn::from_options("v", [Some(10), Some(20), None, Some(40)]);
    assert!((values.mean() - 70.0 / 3.0).abs() < 1e-12);
}

#[test]
fn custom_parse_options_from_json() {
    let options: ParseOptions = serde_json::from_str(
        r#"{
            "missing_tokens": ["?", ""],
            "true_tokens": ["oui"],
            "false_tokens": ["non"],
            "date_formats": ["%d.%m.%Y"]
        }"#,
    )
    .expect("options");
    assert_eq!(options.default_capacity, 128);

    let mut table = Table::new("survey");
    table
        .add_column(AnyColumn::empty(ColumnType::Boolean, "agreed"))
        .expect("agreed");
    table
        .add_column(AnyColumn::empty(ColumnType::Date, "when"))
        .expect("when");
    table
        .append_row_cells_with(&["oui", "05.01.2024"], &options)
        .expect("row one");
    table
        .append_row_cells_with(&["?", "?"], &options)
        .expect("row two");
    assert!(
        table
            .append_row_cells_with(&["yes", "05.01.2024"], &options)
            .is_err()
    );

    assert_eq!(table.row_count(), 2);
    assert_eq!(
        table.row(0).expect("row"),
        vec![Scalar::Bool(true), Scalar::Date(date(2024, 1, 5))]
    );
    assert_eq!(table.row(1).expect("row"), vec![Scalar::Missing, Scalar::Missing]);
}

#[test]
fn calendar_scenario() {
    let mut days = DateColumn::new("day");
    for day in [date(2024, 2, 29), date(2024, 3, 2), date(2024, 12, 31)] {
        days.append_date(day);
    }
    days.append_missing();

    assert_eq!(days.is_weekend().to_vec(), vec![1]);
    assert_eq!(days.is_last_day_of_month().to_vec(), vec![0, 2]);
    assert_eq!(days.is_in_q1().to_vec(), vec![0, 1]);
    assert_eq!(days.day_of_week().get(0), Some("THURSDAY"));
    assert_eq!(days.month_name().get(2), Some("DECEMBER"));
    assert_eq!(days.day_of_week().get(3), None);

    let shifted = days.plus_days(1).expect("shift");
    assert_eq!(shifted.get(0), Some(date(2024, 3, 1)));
    assert_eq!(shifted.get(2), Some(date(2025, 1, 1)));
    assert!(shifted.is_missing_at(3));

    let noon = NaiveTime::from_hms_opt(12, 0, 0).expect("noon");
    let times = TimeColumn::from_options(
        "t",
        [Some(noon), Some(NaiveTime::MIN), Some(noon), None],
    );
    let stamps = days.at_time(&times).expect("combine");
    assert_eq!(stamps.time().is_noon().to_vec(), vec![0, 2]);
    assert_eq!(stamps.date().get(1), Some(date(2024, 3, 2)));
    assert!(stamps.is_missing_at(3));
}

#[test]
fn table_summary_and_reductions() {
    init_tracing();
    let table = build_table(
        &[
            ck_conformance::FixtureColumn {
                name: "city".to_owned(),
                column_type: ColumnType::Category,
                cells: vec!["Oslo".to_owned(), "Lima".to_owned(), "Oslo".to_owned()],
            },
            ck_conformance::FixtureColumn {
                name: "temp".to_owned(),
                column_type: ColumnType::Float,
                cells: vec!["4.5".to_owned(), "19".to_owned(), "NA".to_owned()],
            },
        ],
        ParseOptions::standard(),
    )
    .expect("table");

    let by_city = table.summary_of("city").expect("summary");
    assert_eq!(by_city.column_names(), vec!["Measure", "Value"]);
    assert_eq!(by_city.row_count(), 2);

    let range = table.reduce("temp", Reduction::Range).expect("range");
    assert!((range - 14.5).abs() < 1e-6);

    let sorted = table.sort_by("temp", false).expect("sort");
    assert_eq!(sorted.column("city").expect("city").get_string(0), "Lima");
    assert_eq!(sorted.column("temp").expect("temp").get_string(2), "");

    let oslo = table
        .filter("city", |column| {
            column
                .as_category()
                .map(|cities| cities.is_equal_to("Oslo"))
                .unwrap_or_default()
        })
        .expect("filter");
    assert_eq!(oslo.row_count(), 2);
    assert_eq!(oslo.numeric_column("temp").expect("temp").count_missing(), 1);
}
