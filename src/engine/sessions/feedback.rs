use super::counters::add_votes_on;
use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Rating, UserId};
use rusqlite::params;

impl SessionStore {
    // ── Feedback ───────────────────────────────────────────────────────

    /// Append a vote on an interaction and count it on `day`, atomically.
    /// Fails if the interaction does not exist.
    pub fn record_feedback(
        &self,
        interaction_id: i64,
        rater: UserId,
        ts: i64,
        rating: Rating,
        day: &str,
    ) -> EngineResult<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO feedback (interaction_id, user_id, ts, rating) VALUES (?1, ?2, ?3, ?4)",
            params![interaction_id, rater.0, ts, rating.as_str()],
        )?;
        let id = tx.last_insert_rowid();
        let (up, down) = match rating {
            Rating::Up => (1, 0),
            Rating::Down => (0, 1),
        };
        add_votes_on(&tx, day, up, down)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn count_feedback(&self, interaction_id: i64) -> EngineResult<(i64, i64)> {
        let conn = self.conn.lock();
        let counts = conn.query_row(
            "SELECT COALESCE(SUM(rating = 'up'), 0), COALESCE(SUM(rating = 'down'), 0)
             FROM feedback WHERE interaction_id = ?1",
            params![interaction_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(counts)
    }
}
