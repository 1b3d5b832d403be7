//! Calendar weeks used for collection accounting.
//!
//! A week runs Monday 00:00 to the next Monday 00:00 in the business
//! timezone. Misses, bonuses and report figures are all keyed on the week's
//! Monday.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Dates accepted from requests; week arithmetic cannot overflow inside it
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Week {
    start: NaiveDate,
}

impl Week {
    /// The week a local calendar date falls in
    pub fn containing(date: NaiveDate) -> Self {
        let back = date.weekday().num_days_from_monday() as i64;
        Self {
            start: date - Duration::days(back),
        }
    }

    /// Like `containing`, for dates taken from a request
    pub fn try_containing(date: NaiveDate) -> ApiResult<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
            return Err(ApiError::ValidationError(format!(
                "date {} is outside the supported range ({}-{})",
                date, MIN_YEAR, MAX_YEAR
            )));
        }
        Ok(Self::containing(date))
    }

    /// Like `containing_instant`, for timestamps taken from a request
    pub fn try_containing_instant(at: DateTime<Utc>, tz: &FixedOffset) -> ApiResult<Self> {
        Self::try_containing(at.with_timezone(tz).date_naive())
    }

    /// The week an instant falls in, as seen from `tz`
    pub fn containing_instant(at: DateTime<Utc>, tz: &FixedOffset) -> Self {
        Self::containing(at.with_timezone(tz).date_naive())
    }

    /// Current week in `tz`
    pub fn current(tz: &FixedOffset) -> Self {
        Self::containing_instant(Utc::now(), tz)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Sunday closing the week
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(7),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
        }
    }

    /// Half-open UTC interval `[monday 00:00, next monday 00:00)` in `tz`
    pub fn bounds(&self, tz: &FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        (local_midnight_utc(self.start, tz), local_midnight_utc(self.next().start, tz))
    }

    pub fn contains(&self, at: DateTime<Utc>, tz: &FixedOffset) -> bool {
        let (from, to) = self.bounds(tz);
        at >= from && at < to
    }
}

fn local_midnight_utc(date: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - Duration::seconds(tz.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, Utc)
}
