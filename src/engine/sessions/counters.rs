use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Category, DailySnapshot};
use rusqlite::{params, Connection, OptionalExtension};

pub(super) fn add_votes_on(conn: &Connection, day: &str, up: i64, down: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO daily_counters (day, upvotes, downvotes) VALUES (?1, ?2, ?3)
         ON CONFLICT(day) DO UPDATE SET
           upvotes = upvotes + excluded.upvotes,
           downvotes = downvotes + excluded.downvotes",
        params![day, up, down],
    )?;
    Ok(())
}

impl SessionStore {
    // ── Daily counters ─────────────────────────────────────────────────

    /// One atomic upsert: total +1, plus the category's own column +1 when
    /// the category is counted (`other` only bumps the total).
    pub fn increment_counter(&self, day: &str, category: Category) -> EngineResult<()> {
        let (advice, quest, roll) = match category {
            Category::Advice => (1, 0, 0),
            Category::Quest => (0, 1, 0),
            Category::Roll => (0, 0, 1),
            Category::Other => (0, 0, 0),
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO daily_counters (day, interactions, advice_count, quest_count, roll_count)
             VALUES (?1, 1, ?2, ?3, ?4)
             ON CONFLICT(day) DO UPDATE SET
               interactions = interactions + 1,
               advice_count = advice_count + excluded.advice_count,
               quest_count = quest_count + excluded.quest_count,
               roll_count = roll_count + excluded.roll_count",
            params![day, advice, quest, roll],
        )?;
        Ok(())
    }

    pub fn add_votes(&self, day: &str, up: i64, down: i64) -> EngineResult<()> {
        let conn = self.conn.lock();
        add_votes_on(&conn, day, up, down)?;
        Ok(())
    }

    /// Overwrite the cached unique-user count. Only the analytics
    /// recomputation path calls this.
    pub fn cache_unique_users(&self, day: &str, n: i64) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO daily_counters (day, unique_users) VALUES (?1, ?2)
             ON CONFLICT(day) DO UPDATE SET unique_users = excluded.unique_users",
            params![day, n],
        )?;
        Ok(())
    }

    /// Counters for `day`; zero-filled when the day has no row.
    pub fn day_snapshot(&self, day: &str) -> EngineResult<DailySnapshot> {
        let conn = self.conn.lock();
        let snap = conn
            .query_row(
                "SELECT interactions, advice_count, quest_count, roll_count, unique_users, upvotes, downvotes
                 FROM daily_counters WHERE day = ?1",
                params![day],
                |row| {
                    Ok(DailySnapshot {
                        day: day.to_string(),
                        interactions: row.get(0)?,
                        advice_count: row.get(1)?,
                        quest_count: row.get(2)?,
                        roll_count: row.get(3)?,
                        unique_users: row.get(4)?,
                        upvotes: row.get(5)?,
                        downvotes: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(snap.unwrap_or_else(|| DailySnapshot { day: day.to_string(), ..Default::default() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_day_is_zero_filled() {
        let store = SessionStore::open_in_memory().unwrap();
        let snap = store.day_snapshot("2025-01-01").unwrap();
        assert_eq!(snap.day, "2025-01-01");
        assert_eq!(snap.interactions, 0);
        assert_eq!(snap.upvotes, 0);
    }

    #[test]
    fn categories_feed_their_columns() {
        let store = SessionStore::open_in_memory().unwrap();
        let day = "2025-03-04";
        store.increment_counter(day, Category::Advice).unwrap();
        store.increment_counter(day, Category::Quest).unwrap();
        store.increment_counter(day, Category::Roll).unwrap();
        store.increment_counter(day, Category::Other).unwrap();
        store.increment_counter(day, Category::Advice).unwrap();

        let snap = store.day_snapshot(day).unwrap();
        assert_eq!(snap.interactions, 5);
        assert_eq!(snap.advice_count, 2);
        assert_eq!(snap.quest_count, 1);
        assert_eq!(snap.roll_count, 1);
    }

    #[test]
    fn votes_are_additive_and_independent_of_interactions() {
        let store = SessionStore::open_in_memory().unwrap();
        let day = "2025-03-04";
        store.add_votes(day, 1, 0).unwrap();
        store.add_votes(day, 2, 3).unwrap();
        let snap = store.day_snapshot(day).unwrap();
        assert_eq!((snap.upvotes, snap.downvotes, snap.interactions), (3, 3, 0));
    }

    #[test]
    fn unique_user_cache_does_not_touch_counts() {
        let store = SessionStore::open_in_memory().unwrap();
        let day = "2025-03-04";
        store.increment_counter(day, Category::Roll).unwrap();
        store.cache_unique_users(day, 4).unwrap();
        store.cache_unique_users(day, 2).unwrap();
        let snap = store.day_snapshot(day).unwrap();
        assert_eq!(snap.unique_users, 2);
        assert_eq!(snap.interactions, 1);
    }
}
