//! Staleness policy for cached payloads
//!
//! Upstream publishes one dataset per day shortly after UTC midnight. A cached
//! record is only treated as stale from 02:00 UTC onwards, which leaves the
//! mirrors time to catch up before yesterday's data is replaced.

use chrono::{DateTime, NaiveDate, Timelike, Utc};

use crate::data::{extract_date, Record, RecordKey};

/// UTC hour from which a record dated before today is stale
pub const REFRESH_HOUR_UTC: u32 = 2;

/// Decides whether a refresh should be attempted
pub fn needs_refresh(force: bool, record: Option<&Record>, now: DateTime<Utc>) -> bool {
    if force {
        return true;
    }
    let Some(record) = record else {
        return true;
    };

    now.hour() >= REFRESH_HOUR_UTC && data_date(record) != Some(now.date_naive())
}

/// The day the cached data belongs to
///
/// Rate payloads carry their publication date. The catalogue has no date
/// field, so the day it was fetched stands in for it.
pub fn data_date(record: &Record) -> Option<NaiveDate> {
    match record.key {
        RecordKey::Rates(_) => extract_date(&record.payload),
        RecordKey::Catalogue => Some(record.fetched_at.date_naive()),
    }
}
