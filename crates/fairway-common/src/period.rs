//! Calendar periods and date ranges
//!
//! All analytics run over half-open `[start, end)` windows. Calendar periods
//! produce non-overlapping, contiguous buckets (days, ISO weeks starting
//! Monday, calendar months, calendar quarters, calendar years); a custom
//! period carries its own explicit boundaries.

use crate::{PlatformError, PlatformResult};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open UTC time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive window start
    pub start: DateTime<Utc>,
    /// Exclusive window end
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a validated range. Fails when `start > end`, before any query
    /// can execute against it.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> PlatformResult<Self> {
        let range = Self { start, end };
        if !range.is_valid() {
            return Err(PlatformError::InvalidDateRange { start, end });
        }
        Ok(range)
    }

    /// A range is valid iff `start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Whether `ts` falls inside the half-open window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Window length in whole days (at least zero).
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start, self.end)
    }
}

/// Aggregation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenuePeriod {
    /// Calendar day (UTC midnight to midnight)
    Daily,
    /// ISO week starting Monday
    Weekly,
    /// Calendar month
    Monthly,
    /// Calendar quarter (Jan/Apr/Jul/Oct)
    Quarterly,
    /// Calendar year
    Yearly,
    /// Explicit window supplied by the caller
    Custom(DateRange),
}

impl RevenuePeriod {
    /// The calendar-aligned bucket containing `ts`. A custom period is its
    /// own bucket regardless of `ts`.
    pub fn bucket_for(&self, ts: DateTime<Utc>) -> DateRange {
        let date = ts.date_naive();
        match self {
            Self::Daily => span(date, date + Duration::days(1)),
            Self::Weekly => {
                let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                span(monday, monday + Duration::days(7))
            }
            Self::Monthly => {
                let first = month_start(date);
                span(first, add_months(first, 1))
            }
            Self::Quarterly => {
                let first = quarter_start(date);
                span(first, add_months(first, 3))
            }
            Self::Yearly => {
                let first = year_start(date);
                span(first, add_months(first, 12))
            }
            Self::Custom(range) => *range,
        }
    }

    /// The bucket immediately preceding `bucket` on the same grid. For a
    /// custom period the window slides back by its own length.
    pub fn previous_bucket(&self, bucket: &DateRange) -> DateRange {
        match self {
            Self::Custom(_) => {
                let len = bucket.end - bucket.start;
                DateRange {
                    start: bucket.start - len,
                    end: bucket.start,
                }
            }
            _ => self.bucket_for(bucket.start - Duration::seconds(1)),
        }
    }

    /// Whether `range` sits exactly on this period's calendar grid.
    /// A partial month/quarter/year never passes.
    pub fn is_calendar_aligned(&self, range: &DateRange) -> bool {
        match self {
            Self::Custom(custom) => custom == range,
            _ => self.bucket_for(range.start) == *range,
        }
    }

    /// Length of a bucket expressed in months, 30-day month convention:
    /// daily 1/30, weekly 7/30, monthly 1, quarterly 3, yearly 12, custom
    /// days/30. This is the explicit MRR/ARR normalization factor.
    pub fn months_in_period(&self, bucket: &DateRange) -> Decimal {
        match self {
            Self::Daily => Decimal::ONE / dec!(30),
            Self::Weekly => dec!(7) / dec!(30),
            Self::Monthly => Decimal::ONE,
            Self::Quarterly => dec!(3),
            Self::Yearly => dec!(12),
            Self::Custom(_) => Decimal::from(bucket.duration_days().max(1)) / dec!(30),
        }
    }

    /// Normalize an in-period recurring amount to a monthly cadence.
    /// Multiplies before dividing so the 30-day convention stays exact for
    /// whole-day windows.
    pub fn normalize_to_monthly(&self, amount: Decimal, bucket: &DateRange) -> Decimal {
        match self {
            Self::Daily => amount * dec!(30),
            Self::Weekly => amount * dec!(30) / dec!(7),
            Self::Monthly => amount,
            Self::Quarterly => amount / dec!(3),
            Self::Yearly => amount / dec!(12),
            Self::Custom(_) => amount * dec!(30) / Decimal::from(bucket.duration_days().max(1)),
        }
    }
}

impl fmt::Display for RevenuePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Quarterly => write!(f, "quarterly"),
            Self::Yearly => write!(f, "yearly"),
            Self::Custom(range) => write!(f, "custom {range}"),
        }
    }
}

fn span(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange {
        start: at_midnight(start),
        end: at_midnight(end),
    }
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_range_validity() {
        assert!(DateRange::new(ts(2025, 1, 1), ts(2025, 2, 1)).is_ok());
        assert!(DateRange::new(ts(2025, 1, 1), ts(2025, 1, 1)).is_ok());

        let err = DateRange::new(ts(2025, 2, 1), ts(2025, 1, 1)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_monthly_bucket_alignment() {
        let bucket = RevenuePeriod::Monthly.bucket_for(ts(2025, 3, 15));
        assert_eq!(bucket.start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(bucket.end, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
        assert!(bucket.contains(ts(2025, 3, 31)));
        assert!(!bucket.contains(bucket.end));
    }

    #[test]
    fn test_quarterly_bucket_alignment() {
        let bucket = RevenuePeriod::Quarterly.bucket_for(ts(2025, 5, 10));
        assert_eq!(bucket.start, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(bucket.end, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_bucket_starts_monday() {
        // 2025-06-11 is a Wednesday
        let bucket = RevenuePeriod::Weekly.bucket_for(ts(2025, 6, 11));
        assert_eq!(bucket.start, Utc.with_ymd_and_hms(2025, 6, 9, 0, 0, 0).unwrap());
        assert_eq!((bucket.end - bucket.start).num_days(), 7);
    }

    #[test]
    fn test_buckets_are_contiguous() {
        for period in [
            RevenuePeriod::Daily,
            RevenuePeriod::Weekly,
            RevenuePeriod::Monthly,
            RevenuePeriod::Quarterly,
            RevenuePeriod::Yearly,
        ] {
            let bucket = period.bucket_for(ts(2025, 1, 20));
            let prev = period.previous_bucket(&bucket);
            assert_eq!(prev.end, bucket.start, "{period} grid has a gap");
            assert!(prev.start < prev.end);
        }
    }

    #[test]
    fn test_calendar_alignment_check() {
        let full_quarter = RevenuePeriod::Quarterly.bucket_for(ts(2025, 2, 1));
        assert!(RevenuePeriod::Quarterly.is_calendar_aligned(&full_quarter));

        let partial = DateRange::new(ts(2025, 1, 1), ts(2025, 2, 15)).unwrap();
        assert!(!RevenuePeriod::Quarterly.is_calendar_aligned(&partial));
    }

    #[test]
    fn test_monthly_normalization_factors() {
        let bucket = RevenuePeriod::Monthly.bucket_for(ts(2025, 3, 1));
        assert_eq!(RevenuePeriod::Monthly.months_in_period(&bucket), dec!(1));
        assert_eq!(
            RevenuePeriod::Monthly.normalize_to_monthly(dec!(1200), &bucket),
            dec!(1200)
        );

        let year = RevenuePeriod::Yearly.bucket_for(ts(2025, 3, 1));
        assert_eq!(
            RevenuePeriod::Yearly.normalize_to_monthly(dec!(1200), &year),
            dec!(100)
        );

        let day = RevenuePeriod::Daily.bucket_for(ts(2025, 3, 1));
        assert_eq!(
            RevenuePeriod::Daily.normalize_to_monthly(dec!(10), &day),
            dec!(300)
        );
    }

    #[test]
    fn test_custom_period_is_its_own_bucket() {
        let range = DateRange::new(ts(2025, 1, 5), ts(2025, 1, 19)).unwrap();
        let period = RevenuePeriod::Custom(range);

        assert_eq!(period.bucket_for(ts(2030, 7, 1)), range);
        assert_eq!(period.months_in_period(&range), dec!(14) / dec!(30));

        let prev = period.previous_bucket(&range);
        assert_eq!(prev.end, range.start);
        assert_eq!(prev.end - prev.start, range.end - range.start);
    }
}
