//! Exchange session calendar.
//!
//! Resolves which trading session the latest quotes belong to. Regular
//! hours only, Monday to Friday; exchange holidays are not modeled.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Where the exchange clock is relative to the regular session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    PreOpen,
    Open,
    AfterClose,
    Weekend,
}

/// Regular trading hours of one exchange.
#[derive(Debug, Clone, Copy)]
pub struct MarketSession {
    pub timezone: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for MarketSession {
    /// US equity options: 09:30-16:00 America/New_York.
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            open: NaiveTime::from_hms_opt(9, 30, 0).expect("09:30 is a valid time"),
            close: NaiveTime::from_hms_opt(16, 0, 0).expect("16:00 is a valid time"),
        }
    }
}

impl MarketSession {
    /// `now` on the exchange clock.
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }

    /// Calendar date of an instant on the exchange clock.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_time(now).date_naive()
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        let local = self.local_time(now);
        if is_weekend(local.date_naive()) {
            return SessionStatus::Weekend;
        }

        let time = local.time();
        if time < self.open {
            SessionStatus::PreOpen
        } else if time < self.close {
            SessionStatus::Open
        } else {
            SessionStatus::AfterClose
        }
    }

    /// Date of the most recent session that has started.
    ///
    /// Before the open or on a weekend this is the previous business day;
    /// otherwise it is today.
    pub fn latest_session_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = self.local_date(now);
        match self.status(now) {
            SessionStatus::PreOpen | SessionStatus::Weekend => previous_business_day(today),
            SessionStatus::Open | SessionStatus::AfterClose => today,
        }
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The last weekday strictly before `date`.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut day = date - Duration::days(1);
    while is_weekend(day) {
        day -= Duration::days(1);
    }
    day
}

/// Weekdays in `[start, end]`, both ends included. Zero when `end < start`.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut count = 0;
    let mut current = start;
    while current <= end {
        if !is_weekend(current) {
            count += 1;
        }
        current += Duration::days(1);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monday_before_open_uses_friday() {
        let session = MarketSession::default();
        // 2024-01-29 09:00 EST = 14:00 UTC
        let now = Utc.with_ymd_and_hms(2024, 1, 29, 14, 0, 0).unwrap();

        assert_eq!(session.status(now), SessionStatus::PreOpen);
        assert_eq!(session.latest_session_date(now), date(2024, 1, 26));
    }

    #[test]
    fn test_weekend_uses_friday() {
        let session = MarketSession::default();
        let saturday = Utc.with_ymd_and_hms(2024, 1, 27, 18, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2024, 1, 28, 18, 0, 0).unwrap();

        assert_eq!(session.status(saturday), SessionStatus::Weekend);
        assert_eq!(session.latest_session_date(saturday), date(2024, 1, 26));
        assert_eq!(session.latest_session_date(sunday), date(2024, 1, 26));
    }

    #[test]
    fn test_during_and_after_session_uses_today() {
        let session = MarketSession::default();
        // 2024-01-31 11:00 EST
        let open = Utc.with_ymd_and_hms(2024, 1, 31, 16, 0, 0).unwrap();
        // 2024-01-31 18:00 EST
        let closed = Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap();

        assert_eq!(session.status(open), SessionStatus::Open);
        assert_eq!(session.latest_session_date(open), date(2024, 1, 31));
        assert_eq!(session.status(closed), SessionStatus::AfterClose);
        assert_eq!(session.latest_session_date(closed), date(2024, 1, 31));
    }

    #[test]
    fn test_local_date_crosses_utc_midnight() {
        let session = MarketSession::default();
        // 2024-07-10 01:00 UTC is still July 9th in New York (EDT)
        let now = Utc.with_ymd_and_hms(2024, 7, 10, 1, 0, 0).unwrap();
        assert_eq!(session.local_date(now), date(2024, 7, 9));
        assert_eq!(session.latest_session_date(now), date(2024, 7, 9));
    }

    #[test]
    fn test_dst_open_boundary() {
        let session = MarketSession::default();
        // 13:45 UTC is 09:45 EDT in July but 08:45 EST in January
        let july = Utc.with_ymd_and_hms(2024, 7, 10, 13, 45, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2024, 1, 10, 13, 45, 0).unwrap();

        assert_eq!(session.status(july), SessionStatus::Open);
        assert_eq!(session.status(january), SessionStatus::PreOpen);
    }

    #[test]
    fn test_business_days_between() {
        // Fri 26th through Fri Feb 2nd
        assert_eq!(business_days_between(date(2024, 1, 26), date(2024, 2, 2)), 6);
        // Saturday to Sunday
        assert_eq!(business_days_between(date(2024, 1, 27), date(2024, 1, 28)), 0);
        assert_eq!(business_days_between(date(2024, 2, 2), date(2024, 1, 26)), 0);
    }
}
