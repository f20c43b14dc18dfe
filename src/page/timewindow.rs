//! Time windows for time-scoped page links.
//!
//! A [`Timewindow`] is resolved into concrete `[start_time, end_time]` bounds
//! right before every fetch, so "now"-relative windows stay current across
//! refreshes. All calendar math is done in UTC.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const SECOND: i64 = 1000;
pub const MINUTE: i64 = 60 * SECOND;
pub const HOUR: i64 = 60 * MINUTE;
pub const DAY: i64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryWindowType {
    #[default]
    LastInterval,
    Fixed,
    Interval,
    ForAllTime,
}

/// Named calendar-aligned intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuickTimeInterval {
    Yesterday,
    DayBeforeYesterday,
    ThisDayLastWeek,
    PreviousWeek,
    PreviousWeekIso,
    PreviousMonth,
    PreviousYear,
    CurrentHour,
    #[default]
    CurrentDay,
    CurrentDaySoFar,
    CurrentWeek,
    CurrentWeekIso,
    CurrentWeekSoFar,
    CurrentWeekIsoSoFar,
    CurrentMonth,
    CurrentMonthSoFar,
    CurrentYear,
    CurrentYearSoFar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedTimewindow {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryWindow {
    pub history_type: HistoryWindowType,
    pub timewindow_ms: i64,
    #[serde(default)]
    pub fixed_timewindow: FixedTimewindow,
    #[serde(default)]
    pub quick_interval: QuickTimeInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timewindow {
    pub history: HistoryWindow,
}

impl Default for Timewindow {
    fn default() -> Self {
        history_interval(DAY)
    }
}

impl Timewindow {
    pub fn fixed(start_time_ms: i64, end_time_ms: i64) -> Self {
        Self::with_type(HistoryWindowType::Fixed, |history| {
            history.fixed_timewindow = FixedTimewindow {
                start_time_ms,
                end_time_ms,
            };
        })
    }

    pub fn quick(interval: QuickTimeInterval) -> Self {
        Self::with_type(HistoryWindowType::Interval, |history| {
            history.quick_interval = interval;
        })
    }

    pub fn for_all_time() -> Self {
        Self::with_type(HistoryWindowType::ForAllTime, |_| {})
    }

    fn with_type(history_type: HistoryWindowType, apply: impl FnOnce(&mut HistoryWindow)) -> Self {
        let mut window = history_interval(DAY);
        window.history.history_type = history_type;
        apply(&mut window.history);
        window
    }
}

/// A "last `timewindow_ms` milliseconds" window.
pub fn history_interval(timewindow_ms: i64) -> Timewindow {
    Timewindow {
        history: HistoryWindow {
            history_type: HistoryWindowType::LastInterval,
            timewindow_ms,
            fixed_timewindow: FixedTimewindow::default(),
            quick_interval: QuickTimeInterval::default(),
        },
    }
}

/// Resolved bounds; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeInterval {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

impl TimeInterval {
    fn bounded(start: i64, end: i64) -> Self {
        Self {
            start_time: Some(start.min(end)),
            end_time: Some(start.max(end)),
        }
    }
}

/// Resolves the bounds a time page link should carry for `timewindow` at `now`.
pub fn time_page_link_interval(timewindow: &Timewindow, now: DateTime<Utc>) -> TimeInterval {
    let history = &timewindow.history;
    match history.history_type {
        HistoryWindowType::LastInterval => {
            let current = now.timestamp_millis();
            TimeInterval::bounded(current - history.timewindow_ms.max(0), current)
        }
        HistoryWindowType::Fixed => TimeInterval::bounded(
            history.fixed_timewindow.start_time_ms,
            history.fixed_timewindow.end_time_ms,
        ),
        HistoryWindowType::Interval => {
            let (start, end) = calculate_interval_start_end_time(history.quick_interval, now);
            TimeInterval::bounded(start, end)
        }
        HistoryWindowType::ForAllTime => TimeInterval::default(),
    }
}

/// Concrete `[start, end]` epoch-ms bounds of a quick interval.
///
/// Closed periods end on their last millisecond; "so far" periods end at `now`.
pub fn calculate_interval_start_end_time(
    interval: QuickTimeInterval,
    now: DateTime<Utc>,
) -> (i64, i64) {
    let now_ms = now.timestamp_millis();
    let today = now.date_naive();
    let period = |start: NaiveDate, next: NaiveDate| (day_start(start), day_start(next) - 1);

    match interval {
        QuickTimeInterval::Yesterday => {
            let yesterday = today - Days::new(1);
            period(yesterday, today)
        }
        QuickTimeInterval::DayBeforeYesterday => {
            let start = today - Days::new(2);
            period(start, start + Days::new(1))
        }
        QuickTimeInterval::ThisDayLastWeek => {
            let start = today - Days::new(7);
            period(start, start + Days::new(1))
        }
        QuickTimeInterval::PreviousWeek => {
            let current = week_start(today, false);
            period(current - Days::new(7), current)
        }
        QuickTimeInterval::PreviousWeekIso => {
            let current = week_start(today, true);
            period(current - Days::new(7), current)
        }
        QuickTimeInterval::PreviousMonth => {
            let current = month_start(today);
            period(month_start(current - Days::new(1)), current)
        }
        QuickTimeInterval::PreviousYear => {
            let current = year_start(today);
            period(year_start(current - Days::new(1)), current)
        }
        QuickTimeInterval::CurrentHour => {
            let start = now_ms - now_ms.rem_euclid(HOUR);
            (start, start + HOUR - 1)
        }
        QuickTimeInterval::CurrentDay => period(today, today + Days::new(1)),
        QuickTimeInterval::CurrentDaySoFar => (day_start(today), now_ms),
        QuickTimeInterval::CurrentWeek => {
            let start = week_start(today, false);
            period(start, start + Days::new(7))
        }
        QuickTimeInterval::CurrentWeekIso => {
            let start = week_start(today, true);
            period(start, start + Days::new(7))
        }
        QuickTimeInterval::CurrentWeekSoFar => (day_start(week_start(today, false)), now_ms),
        QuickTimeInterval::CurrentWeekIsoSoFar => (day_start(week_start(today, true)), now_ms),
        QuickTimeInterval::CurrentMonth => {
            let start = month_start(today);
            period(start, month_start(start + Days::new(31)))
        }
        QuickTimeInterval::CurrentMonthSoFar => (day_start(month_start(today)), now_ms),
        QuickTimeInterval::CurrentYear => {
            let start = year_start(today);
            period(start, year_start(start + Days::new(366)))
        }
        QuickTimeInterval::CurrentYearSoFar => (day_start(year_start(today)), now_ms),
    }
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

fn week_start(date: NaiveDate, iso: bool) -> NaiveDate {
    let offset = if iso {
        date.weekday().num_days_from_monday()
    } else {
        date.weekday().num_days_from_sunday()
    };
    date - Days::new(u64::from(offset))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn year_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.ordinal0()))
}
