//! Date, time and date-time predicates and field extraction.

use std::cmp::Ordering;

use chrono::{
    Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday,
};
use ck_selection::Selection;

use crate::kind::{CalendarKind, CellKind, ClockKind, TemporalKind};
use crate::{
    CategoryColumn, Column, ColumnError, DateColumn, DateTimeColumn, LongColumn, ShortColumn,
    TimeColumn, TypedColumn, check_lengths,
};

const MONTH_NAMES: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().is_none_or(|next| next.month() != date.month())
}

#[derive(Debug, Clone, Copy)]
enum CalendarUnit {
    Day,
    Week,
    Month,
    Year,
}

impl CalendarUnit {
    fn label(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    fn month_count(self, amount: i64) -> Option<Months> {
        let months = match self {
            Self::Month => amount,
            Self::Year => amount.checked_mul(12)?,
            Self::Day | Self::Week => return None,
        };
        u32::try_from(months.unsigned_abs()).ok().map(Months::new)
    }

    fn can_shift_by(self, amount: i64) -> bool {
        match self {
            Self::Day => Duration::try_days(amount).is_some(),
            Self::Week => Duration::try_weeks(amount).is_some(),
            Self::Month | Self::Year => self.month_count(amount).is_some(),
        }
    }

    fn shift(self, date: NaiveDate, amount: i64) -> Option<NaiveDate> {
        match self {
            Self::Day => date.checked_add_signed(Duration::try_days(amount)?),
            Self::Week => date.checked_add_signed(Duration::try_weeks(amount)?),
            Self::Month | Self::Year => {
                let months = self.month_count(amount)?;
                if amount < 0 {
                    date.checked_sub_months(months)
                } else {
                    date.checked_add_months(months)
                }
            }
        }
    }
}

fn negated(amount: i64) -> Result<i64, ColumnError> {
    amount
        .checked_neg()
        .ok_or_else(|| ColumnError::InvalidArgument(format!("cannot negate {amount}")))
}

/// Whole months from `start` to `end`, truncated toward zero. A month only
/// counts once the day of month is reached.
fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let packed = |date: NaiveDate| {
        (i64::from(date.year()) * 12 + i64::from(date.month0())) * 32 + i64::from(date.day())
    };
    (packed(end) - packed(start)) / 32
}

/// Whole years between two date-times; the time of day decides whether the
/// last partial day counts.
fn years_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let mut end_date = end.date();
    if end_date > start.date() && end.time() < start.time() {
        end_date = end_date.pred_opt().unwrap_or(end_date);
    } else if end_date < start.date() && end.time() > start.time() {
        end_date = end_date.succ_opt().unwrap_or(end_date);
    }
    months_between(start.date(), end_date) / 12
}

impl<K: TemporalKind> TypedColumn<K> {
    fn compare_to(&self, value: K::Value, accept: fn(Ordering) -> bool) -> Selection {
        let target = K::encode(value);
        self.select_native(|native| accept(K::compare(native, target)))
    }

    pub fn is_before(&self, value: K::Value) -> Selection {
        self.compare_to(value, Ordering::is_lt)
    }

    pub fn is_after(&self, value: K::Value) -> Selection {
        self.compare_to(value, Ordering::is_gt)
    }

    pub fn is_on_or_before(&self, value: K::Value) -> Selection {
        self.compare_to(value, Ordering::is_le)
    }

    pub fn is_on_or_after(&self, value: K::Value) -> Selection {
        self.compare_to(value, Ordering::is_ge)
    }

    /// Earliest non-missing value.
    #[must_use]
    pub fn min(&self) -> Option<K::Value> {
        self.non_missing()
            .min_by(|a, b| K::compare(*a, *b))
            .and_then(K::decode)
    }

    /// Latest non-missing value.
    #[must_use]
    pub fn max(&self) -> Option<K::Value> {
        self.non_missing()
            .max_by(|a, b| K::compare(*a, *b))
            .and_then(K::decode)
    }
}

macro_rules! weekday_predicates {
    ($($method:ident => $day:ident),* $(,)?) => {
        $(
            pub fn $method(&self) -> Selection {
                self.select_date(|date| date.weekday() == Weekday::$day)
            }
        )*
    };
}

macro_rules! month_predicates {
    ($($method:ident => $month:literal),* $(,)?) => {
        $(
            pub fn $method(&self) -> Selection {
                self.is_in_month($month)
            }
        )*
    };
}

impl<K: CalendarKind> TypedColumn<K> {
    fn select_date<F: Fn(NaiveDate) -> bool>(&self, predicate: F) -> Selection {
        self.select_native(|native| K::date_of(native).is_some_and(&predicate))
    }

    fn map_date<F: Fn(NaiveDate) -> i16>(&self, suffix: &str, f: F) -> ShortColumn {
        ShortColumn::from_options(
            &format!("{} {suffix}", self.name()),
            self.natives().iter().map(|native| K::date_of(*native).map(&f)),
        )
    }

    fn name_date<F: Fn(NaiveDate) -> &'static str>(&self, suffix: &str, f: F) -> CategoryColumn {
        CategoryColumn::from_values(
            &format!("{} {suffix}", self.name()),
            self.natives()
                .iter()
                .map(|native| K::date_of(*native).map_or("", &f)),
        )
    }

    weekday_predicates! {
        is_monday => Mon,
        is_tuesday => Tue,
        is_wednesday => Wed,
        is_thursday => Thu,
        is_friday => Fri,
        is_saturday => Sat,
        is_sunday => Sun,
    }

    month_predicates! {
        is_in_january => 1,
        is_in_february => 2,
        is_in_march => 3,
        is_in_april => 4,
        is_in_may => 5,
        is_in_june => 6,
        is_in_july => 7,
        is_in_august => 8,
        is_in_september => 9,
        is_in_october => 10,
        is_in_november => 11,
        is_in_december => 12,
    }

    pub fn is_weekday(&self) -> Selection {
        self.select_date(|date| date.weekday().number_from_monday() <= 5)
    }

    pub fn is_weekend(&self) -> Selection {
        self.select_date(|date| date.weekday().number_from_monday() > 5)
    }

    /// `month` is 1-based.
    pub fn is_in_month(&self, month: u32) -> Selection {
        self.select_date(|date| date.month() == month)
    }

    pub fn is_in_quarter(&self, quarter: u32) -> Selection {
        self.select_date(|date| date.month0() / 3 + 1 == quarter)
    }

    pub fn is_in_q1(&self) -> Selection {
        self.is_in_quarter(1)
    }

    pub fn is_in_q2(&self) -> Selection {
        self.is_in_quarter(2)
    }

    pub fn is_in_q3(&self) -> Selection {
        self.is_in_quarter(3)
    }

    pub fn is_in_q4(&self) -> Selection {
        self.is_in_quarter(4)
    }

    pub fn is_in_year(&self, year: i32) -> Selection {
        self.select_date(|date| date.year() == year)
    }

    pub fn is_first_day_of_month(&self) -> Selection {
        self.select_date(|date| date.day() == 1)
    }

    pub fn is_last_day_of_month(&self) -> Selection {
        self.select_date(is_last_day_of_month)
    }

    #[must_use]
    pub fn day_of_month(&self) -> ShortColumn {
        self.map_date("day of month", |date| date.day() as i16)
    }

    #[must_use]
    pub fn day_of_year(&self) -> ShortColumn {
        self.map_date("day of year", |date| date.ordinal() as i16)
    }

    #[must_use]
    pub fn month_value(&self) -> ShortColumn {
        self.map_date("month", |date| date.month() as i16)
    }

    /// Years outside the `i16` range saturate.
    #[must_use]
    pub fn year(&self) -> ShortColumn {
        self.map_date("year", |date| {
            date.year().clamp(i32::from(i16::MIN) + 1, i32::from(i16::MAX)) as i16
        })
    }

    #[must_use]
    pub fn day_of_week(&self) -> CategoryColumn {
        self.name_date("day of week", |date| weekday_name(date.weekday()))
    }

    #[must_use]
    pub fn month_name(&self) -> CategoryColumn {
        self.name_date("month name", |date| MONTH_NAMES[date.month0() as usize])
    }
}

impl<K: ClockKind> TypedColumn<K> {
    fn select_time<F: Fn(NaiveTime) -> bool>(&self, predicate: F) -> Selection {
        self.select_native(|native| K::time_of(native).is_some_and(&predicate))
    }

    pub fn is_midnight(&self) -> Selection {
        self.select_time(|time| time == NaiveTime::MIN)
    }

    pub fn is_noon(&self) -> Selection {
        self.select_time(|time| time == noon())
    }

    pub fn is_before_noon(&self) -> Selection {
        self.select_time(|time| time.hour() < 12)
    }

    /// Strictly after 12:00:00.000.
    pub fn is_after_noon(&self) -> Selection {
        self.select_time(|time| time > noon())
    }

    #[must_use]
    pub fn hour(&self) -> ShortColumn {
        ShortColumn::from_options(
            &format!("{} hour", self.name()),
            self.natives()
                .iter()
                .map(|native| K::time_of(*native).map(|time| time.hour() as i16)),
        )
    }

    #[must_use]
    pub fn minute_of_day(&self) -> ShortColumn {
        ShortColumn::from_options(
            &format!("{} minute of day", self.name()),
            self.natives().iter().map(|native| {
                K::time_of(*native).map(|time| (time.num_seconds_from_midnight() / 60) as i16)
            }),
        )
    }
}

impl DateColumn {
    pub fn append_date(&mut self, date: NaiveDate) {
        self.push_native(crate::DateKind::encode(date));
    }

    /// Shifts every date by `amount` units; a date leaving chrono's range
    /// fails with [`ColumnError::Overflow`].
    fn shifted(&self, amount: i64, unit: CalendarUnit) -> Result<DateColumn, ColumnError> {
        if !unit.can_shift_by(amount) {
            return Err(ColumnError::InvalidArgument(format!(
                "{amount} {}(s) is out of range",
                unit.label()
            )));
        }
        let cells = self
            .iter()
            .enumerate()
            .map(|(row, date)| match date {
                None => Ok(None),
                Some(date) => unit
                    .shift(date, amount)
                    .map(Some)
                    .ok_or(ColumnError::Overflow {
                        row,
                        column_type: ck_types::ColumnType::Date,
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let direction = if amount < 0 { "minus" } else { "plus" };
        Ok(DateColumn::from_options(
            &format!(
                "{}[{direction} {} {}(s)]",
                self.name(),
                amount.unsigned_abs(),
                unit.label()
            ),
            cells,
        ))
    }

    pub fn plus_days(&self, days: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(days, CalendarUnit::Day)
    }

    pub fn plus_weeks(&self, weeks: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(weeks, CalendarUnit::Week)
    }

    /// Clamps to the last day of the target month.
    pub fn plus_months(&self, months: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(months, CalendarUnit::Month)
    }

    pub fn plus_years(&self, years: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(years, CalendarUnit::Year)
    }

    pub fn minus_days(&self, days: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(negated(days)?, CalendarUnit::Day)
    }

    pub fn minus_weeks(&self, weeks: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(negated(weeks)?, CalendarUnit::Week)
    }

    pub fn minus_months(&self, months: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(negated(months)?, CalendarUnit::Month)
    }

    pub fn minus_years(&self, years: i64) -> Result<DateColumn, ColumnError> {
        self.shifted(negated(years)?, CalendarUnit::Year)
    }

    fn until<F: Fn(NaiveDate, NaiveDate) -> i64>(
        &self,
        end: &DateColumn,
        f: F,
    ) -> Result<LongColumn, ColumnError> {
        check_lengths(self.size(), end.size())?;
        let cells = self
            .iter()
            .zip(end.iter())
            .map(|(start, stop)| Some(f(start?, stop?)));
        Ok(LongColumn::from_options(
            &format!("{} - {}", self.name(), end.name()),
            cells,
        ))
    }

    /// Days from each date to the date in the same row of `end`.
    pub fn days_until(&self, end: &DateColumn) -> Result<LongColumn, ColumnError> {
        self.until(end, |start, stop| stop.signed_duration_since(start).num_days())
    }

    pub fn weeks_until(&self, end: &DateColumn) -> Result<LongColumn, ColumnError> {
        self.until(end, |start, stop| {
            stop.signed_duration_since(start).num_days() / 7
        })
    }

    pub fn months_until(&self, end: &DateColumn) -> Result<LongColumn, ColumnError> {
        self.until(end, months_between)
    }

    pub fn years_until(&self, end: &DateColumn) -> Result<LongColumn, ColumnError> {
        self.until(end, |start, stop| months_between(start, stop) / 12)
    }

    #[must_use]
    pub fn at_start_of_day(&self) -> DateTimeColumn {
        DateTimeColumn::from_options(
            &format!("{} start", self.name()),
            self.iter()
                .map(|date| date.map(|date| date.and_time(NaiveTime::MIN))),
        )
    }

    /// Combines each date with the time in the same row.
    pub fn at_time(&self, times: &TimeColumn) -> Result<DateTimeColumn, ColumnError> {
        check_lengths(self.size(), times.size())?;
        let cells = self
            .iter()
            .zip(times.iter())
            .map(|(date, time)| Some(date?.and_time(time?)));
        Ok(DateTimeColumn::from_options(
            &format!("{} {}", self.name(), times.name()),
            cells,
        ))
    }
}

impl TimeColumn {
    pub fn append_time(&mut self, time: NaiveTime) {
        self.push_native(crate::TimeKind::encode(time));
    }
}

impl DateTimeColumn {
    pub fn append_date_time(&mut self, value: NaiveDateTime) {
        self.push_native(crate::DateTimeKind::encode(value));
    }

    fn difference_by<F: Fn(NaiveDateTime, NaiveDateTime) -> i64>(
        &self,
        other: &DateTimeColumn,
        f: F,
    ) -> Result<LongColumn, ColumnError> {
        check_lengths(self.size(), other.size())?;
        let cells = self
            .iter()
            .zip(other.iter())
            .map(|(start, stop)| Some(f(start?, stop?)));
        Ok(LongColumn::from_options(
            &format!("{} - {}", self.name(), other.name()),
            cells,
        ))
    }

    pub fn difference_in_milliseconds(
        &self,
        other: &DateTimeColumn,
    ) -> Result<LongColumn, ColumnError> {
        self.difference_by(other, |a, b| b.signed_duration_since(a).num_milliseconds())
    }

    pub fn difference_in_seconds(&self, other: &DateTimeColumn) -> Result<LongColumn, ColumnError> {
        self.difference_by(other, |a, b| b.signed_duration_since(a).num_seconds())
    }

    pub fn difference_in_minutes(&self, other: &DateTimeColumn) -> Result<LongColumn, ColumnError> {
        self.difference_by(other, |a, b| b.signed_duration_since(a).num_minutes())
    }

    pub fn difference_in_hours(&self, other: &DateTimeColumn) -> Result<LongColumn, ColumnError> {
        self.difference_by(other, |a, b| b.signed_duration_since(a).num_hours())
    }

    pub fn difference_in_days(&self, other: &DateTimeColumn) -> Result<LongColumn, ColumnError> {
        self.difference_by(other, |a, b| b.signed_duration_since(a).num_days())
    }

    pub fn difference_in_years(&self, other: &DateTimeColumn) -> Result<LongColumn, ColumnError> {
        self.difference_by(other, years_between)
    }

    #[must_use]
    pub fn date(&self) -> DateColumn {
        DateColumn::from_options(
            &format!("{} date", self.name()),
            self.iter().map(|value| value.map(|dt| dt.date())),
        )
    }

    #[must_use]
    pub fn time(&self) -> TimeColumn {
        TimeColumn::from_options(
            &format!("{} time", self.name()),
            self.iter().map(|value| value.map(|dt| dt.time())),
        )
    }
}
