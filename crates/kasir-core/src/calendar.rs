//! # Business Calendar
//!
//! Maps instants to the store's local calendar.
//!
//! Stores run on a fixed UTC offset (WIB = UTC+7 by default). "Today" for
//! settlement cutoffs and report buckets is always the business-local day,
//! never the server's or UTC's.
//!
//! ```text
//!   UTC     2026-10-17T17:00Z ───────────────► 2026-10-18T16:59:59Z
//!   WIB     2026-10-18 00:00  ───────────────► 2026-10-18 23:59:59
//!           └──────────── one business day ───────────┘
//! ```

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::error::ValidationError;

/// Default store offset in minutes (UTC+7, Western Indonesia Time).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Calendar arithmetic in a store's fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    /// Creates a calendar for the given offset.
    pub const fn new(offset: FixedOffset) -> Self {
        BusinessCalendar { offset }
    }

    /// Creates a calendar from an offset in minutes east of UTC.
    ///
    /// Rejects offsets outside ±14 hours.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ValidationError> {
        if !(-14 * 60..=14 * 60).contains(&minutes) {
            return Err(ValidationError::OutOfRange {
                field: "utcOffsetMinutes".to_string(),
                min: -14 * 60,
                max: 14 * 60,
            });
        }

        FixedOffset::east_opt(minutes * 60)
            .map(BusinessCalendar::new)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "utcOffsetMinutes".to_string(),
                reason: format!("{} is not a valid offset", minutes),
            })
    }

    /// UTC calendar (offset zero).
    pub fn utc() -> Self {
        BusinessCalendar::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The business-local date containing `at`.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// First instant of the business-local `date`, as UTC.
    pub fn start_of_date(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let utc_midnight =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_midnight)
    }

    /// First instant of the business day containing `now`.
    pub fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start_of_date(self.local_date(now))
    }

    /// Last representable instant (microsecond precision) of the business-local `date`.
    pub fn end_of_date(&self, date: NaiveDate) -> DateTime<Utc> {
        let next = date.succ_opt().unwrap_or(date);
        self.start_of_date(next) - Duration::microseconds(1)
    }

    /// `YYYY-MM-DD` key in business time.
    pub fn day_key(&self, at: DateTime<Utc>) -> String {
        self.local_date(at).format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM` key in business time.
    pub fn month_key(&self, at: DateTime<Utc>) -> String {
        self.local_date(at).format("%Y-%m").to_string()
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        // The default is statically within range.
        BusinessCalendar::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
            .unwrap_or_else(|_| BusinessCalendar::utc())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_day_in_wib() {
        let cal = BusinessCalendar::default();
        // 2026-10-18 01:30 WIB
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 18, 30, 0).unwrap();

        assert_eq!(
            cal.start_of_day(now),
            Utc.with_ymd_and_hms(2026, 10, 17, 17, 0, 0).unwrap()
        );
        assert_eq!(cal.day_key(now), "2026-10-18");
        assert_eq!(cal.month_key(now), "2026-10");
    }

    #[test]
    fn test_start_of_day_utc() {
        let cal = BusinessCalendar::utc();
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        assert_eq!(
            cal.start_of_day(now),
            Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_negative_offset() {
        let cal = BusinessCalendar::from_offset_minutes(-5 * 60).unwrap();
        // 2026-10-18 02:00 UTC is still 2026-10-17 in UTC-5
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap();
        assert_eq!(cal.day_key(now), "2026-10-17");
        assert_eq!(
            cal.start_of_day(now),
            Utc.with_ymd_and_hms(2026, 10, 17, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_end_of_date() {
        let cal = BusinessCalendar::utc();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let end = cal.end_of_date(date);
        assert_eq!(cal.local_date(end), date);
        assert_eq!(
            end + Duration::microseconds(1),
            Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_offset_bounds() {
        assert!(BusinessCalendar::from_offset_minutes(14 * 60).is_ok());
        assert!(BusinessCalendar::from_offset_minutes(15 * 60).is_err());
        assert!(BusinessCalendar::from_offset_minutes(-15 * 60).is_err());
    }
}
