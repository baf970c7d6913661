//! Accounting periods and consumption windows.
//!
//! Theoretical stock is always computed over the accounting period (the
//! calendar month containing the as-of date). The CMM window only selects which
//! completed day/week/month buckets feed the consumption average.

use core::num::NonZeroUsize;
use core::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use stockrec_core::{DomainError, DomainResult};

/// Number of completed windows averaged by default.
pub const DEFAULT_LOOKBACK: usize = 3;

/// Half-open date range `[start, end)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// CMM window granularity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// Start of the (possibly incomplete) window containing `date`.
    fn window_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Days::new(u64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Month => first_of_month(date),
        }
    }

    /// Shift a window start back by `n` windows.
    fn shift_back(&self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Granularity::Day => start.checked_sub_days(Days::new(u64::from(n))),
            Granularity::Week => start.checked_sub_days(Days::new(7 * u64::from(n))),
            Granularity::Month => start.checked_sub_months(Months::new(n)),
        }
    }
}

impl core::fmt::Display for Granularity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(DomainError::validation(format!(
                "unknown period granularity '{other}' (expected day, week or month)"
            ))),
        }
    }
}

/// Granularity + lookback used by the consumption estimator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodWindow {
    granularity: Granularity,
    lookback: usize,
}

impl PeriodWindow {
    pub fn new(granularity: Granularity, lookback: usize) -> DomainResult<Self> {
        NonZeroUsize::new(lookback)
            .map(|lookback| Self::with_lookback(granularity, lookback))
            .ok_or_else(|| DomainError::validation("lookback must be at least one window"))
    }

    pub fn with_lookback(granularity: Granularity, lookback: NonZeroUsize) -> Self {
        Self {
            granularity,
            lookback: lookback.get(),
        }
    }

    /// Parse a granularity string (`day`, `week`, `month`).
    pub fn parse(granularity: &str, lookback: usize) -> DomainResult<Self> {
        Self::new(granularity.parse()?, lookback)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// The `lookback` most recent completed windows before the window
    /// containing `as_of`, oldest first.
    pub fn completed_windows(&self, as_of: NaiveDate) -> Vec<DateRange> {
        let current = self.granularity.window_start(as_of);
        let mut windows = Vec::with_capacity(self.lookback);

        for back in (1..=self.lookback).rev() {
            let Ok(back) = u32::try_from(back) else {
                continue;
            };
            let start = self.granularity.shift_back(current, back);
            let end = self.granularity.shift_back(current, back - 1);
            if let (Some(start), Some(end)) = (start, end) {
                windows.push(DateRange::new(start, end));
            }
        }

        windows
    }
}

impl Default for PeriodWindow {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

/// Accounting period: the calendar month containing the as-of date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountingPeriod {
    range: DateRange,
}

impl AccountingPeriod {
    pub fn containing(as_of: NaiveDate) -> Self {
        let start = first_of_month(as_of);
        let end = start
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Self {
            range: DateRange::new(start, end),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.range.contains(date)
    }

    /// `YYYY-MM` label.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.range.start.year(), self.range.start.month())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn granularity_parses_case_insensitively() {
        assert_eq!("Month".parse::<Granularity>().unwrap(), Granularity::Month);
        assert_eq!(" week ".parse::<Granularity>().unwrap(), Granularity::Week);
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::Day);
    }

    #[test]
    fn unknown_granularity_is_a_validation_error() {
        let err = PeriodWindow::parse("quarter", 3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("quarter")));
    }

    #[test]
    fn zero_lookback_is_rejected() {
        assert!(PeriodWindow::new(Granularity::Day, 0).is_err());
    }

    #[test]
    fn month_windows_are_the_three_prior_calendar_months() {
        let window = PeriodWindow::new(Granularity::Month, 3).unwrap();
        let windows = window.completed_windows(d(2026, 3, 15));
        assert_eq!(
            windows,
            vec![
                DateRange::new(d(2025, 12, 1), d(2026, 1, 1)),
                DateRange::new(d(2026, 1, 1), d(2026, 2, 1)),
                DateRange::new(d(2026, 2, 1), d(2026, 3, 1)),
            ]
        );
    }

    #[test]
    fn week_windows_start_on_monday() {
        let window = PeriodWindow::new(Granularity::Week, 2).unwrap();
        // 2026-10-21 is a Wednesday; its week starts Monday 2026-10-19.
        let windows = window.completed_windows(d(2026, 10, 21));
        assert_eq!(
            windows,
            vec![
                DateRange::new(d(2026, 10, 5), d(2026, 10, 12)),
                DateRange::new(d(2026, 10, 12), d(2026, 10, 19)),
            ]
        );
    }

    #[test]
    fn day_windows_exclude_the_current_day() {
        let window = PeriodWindow::new(Granularity::Day, 3).unwrap();
        let windows = window.completed_windows(d(2026, 1, 2));
        assert_eq!(windows.first().unwrap().start, d(2025, 12, 30));
        assert_eq!(windows.last().unwrap().end, d(2026, 1, 2));
        assert!(!windows.iter().any(|w| w.contains(d(2026, 1, 2))));
    }

    #[test]
    fn accounting_period_is_the_calendar_month() {
        let period = AccountingPeriod::containing(d(2026, 2, 28));
        assert_eq!(period.start(), d(2026, 2, 1));
        assert_eq!(period.end(), d(2026, 3, 1));
        assert!(period.contains(d(2026, 2, 1)));
        assert!(!period.contains(d(2026, 3, 1)));
        assert_eq!(period.label(), "2026-02");
    }
}
