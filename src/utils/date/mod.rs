// Date utility functions
// Local-time helpers shared by the grid, the store and the sweeper

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Returns the first day of the week containing `date`.
pub fn week_start(date: NaiveDate, first_day: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() as i64
        - first_day.num_days_from_monday() as i64)
        % 7;
    date - Duration::days(offset)
}

/// The seven dates of the week beginning at `start`.
pub fn week_dates(start: NaiveDate) -> Vec<NaiveDate> {
    (0..7).map(|offset| start + Duration::days(offset)).collect()
}

/// Half-open `[start, end)` instant range covering a week starting at `start`.
pub fn week_range(start: NaiveDate) -> Option<(DateTime<Local>, DateTime<Local>)> {
    let from = local_datetime(start, 0)?;
    let to = local_datetime(start + Duration::days(7), 0)?;
    Some((from, to))
}

/// Minutes elapsed since local midnight of the instant's own calendar day.
pub fn minutes_of_day(dt: DateTime<Local>) -> i64 {
    minutes_since(dt.date_naive(), dt.naive_local())
}

/// Minutes between local midnight of `day` and `at` (may exceed a day or be negative).
pub fn minutes_since(day: NaiveDate, at: NaiveDateTime) -> i64 {
    (at - day.and_time(NaiveTime::MIN)).num_minutes()
}

/// Builds a local instant `minutes` after midnight of `day`.
///
/// Returns `None` when the wall-clock time does not exist or is ambiguous
/// in the local zone (DST transitions).
pub fn local_datetime(day: NaiveDate, minutes: i64) -> Option<DateTime<Local>> {
    let naive = day.and_time(NaiveTime::MIN) + Duration::minutes(minutes);
    naive.and_local_timezone(Local).single()
}
