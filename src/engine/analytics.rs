// Dungeon Oracle — Daily Analytics
// Days are calendar days in one fixed IANA zone, keyed "YYYY-MM-DD".
// Counter increments are single upsert statements at the store, so
// concurrent requests never lose an update. The unique-user column is a
// cache of `unique_users()` and is only written by `refresh_unique_users`.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{Category, DailySnapshot, LeaderboardEntry, TimeRange};
use crate::engine::sessions::SessionStore;
use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::debug;
use std::sync::Arc;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Day key of `ts` in `tz`.
pub fn local_day_key(tz: &Tz, ts: i64) -> String {
    let utc: DateTime<Utc> = DateTime::from_timestamp(ts, 0).unwrap_or_default();
    utc.with_timezone(tz).format(DAY_KEY_FORMAT).to_string()
}

/// `date` at `hour`:00 local time in `tz`. When that wall-clock time does
/// not exist (a DST gap) the first existing hour after it is used; when it
/// exists twice, the earlier instant.
pub fn local_instant(tz: &Tz, date: NaiveDate, hour: u32) -> i64 {
    let base = date.and_time(NaiveTime::MIN) + Duration::hours(hour as i64);
    for shift in 0..=3 {
        match tz.from_local_datetime(&(base + Duration::hours(shift))) {
            LocalResult::Single(dt) => return dt.timestamp(),
            LocalResult::Ambiguous(earliest, _) => return earliest.timestamp(),
            LocalResult::None => continue,
        }
    }
    base.and_utc().timestamp()
}

fn start_of_day(tz: &Tz, date: NaiveDate) -> i64 {
    local_instant(tz, date, 0)
}

/// Half-open `[start, end)` of a local day. 23 or 25 hours on DST days.
pub fn local_day_bounds(tz: &Tz, day: &str) -> EngineResult<TimeRange> {
    let date = NaiveDate::parse_from_str(day, DAY_KEY_FORMAT)
        .map_err(|e| EngineError::Other(format!("invalid day key '{}': {}", day, e)))?;
    let next = date
        .succ_opt()
        .ok_or_else(|| EngineError::Other(format!("day key '{}' is out of range", day)))?;
    Ok(TimeRange::new(start_of_day(tz, date), start_of_day(tz, next)))
}

pub struct Analytics {
    store: Arc<SessionStore>,
    tz: Tz,
}

impl Analytics {
    pub fn new(store: Arc<SessionStore>, tz: Tz) -> Self {
        Analytics { store, tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn day_key(&self, ts: i64) -> String {
        local_day_key(&self.tz, ts)
    }

    pub fn day_bounds(&self, day: &str) -> EngineResult<TimeRange> {
        local_day_bounds(&self.tz, day)
    }

    pub fn increment(&self, day: &str, category: Category) -> EngineResult<()> {
        self.store.increment_counter(day, category)
    }

    pub fn record_votes(&self, day: &str, up: i64, down: i64) -> EngineResult<()> {
        self.store.add_votes(day, up, down)
    }

    /// Distinct users with at least one interaction in `range`.
    pub fn unique_users(&self, range: TimeRange) -> EngineResult<i64> {
        self.store.count_unique_users(range)
    }

    /// Recompute the day's unique users from the interaction log and cache it.
    pub fn refresh_unique_users(&self, day: &str) -> EngineResult<i64> {
        let n = self.unique_users(self.day_bounds(day)?)?;
        self.store.cache_unique_users(day, n)?;
        debug!("[report] {} unique users on {}", n, day);
        Ok(n)
    }

    pub fn leaderboard(&self, range: TimeRange, limit: usize) -> EngineResult<Vec<LeaderboardEntry>> {
        self.store.leaderboard(range, limit)
    }

    /// Zero-filled when the day has no activity.
    pub fn snapshot(&self, day: &str) -> EngineResult<DailySnapshot> {
        self.store.day_snapshot(day)
    }

    /// Total interactions counted so far on the local day containing `now`.
    pub fn todays_interactions(&self, now: i64) -> EngineResult<i64> {
        Ok(self.snapshot(&self.day_key(now))?.interactions)
    }
}
