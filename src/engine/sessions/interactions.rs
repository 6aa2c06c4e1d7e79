use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Category, InteractionRecord, LeaderboardEntry, TimeRange, UserId};
use rusqlite::params;

impl SessionStore {
    // ── Interaction log (append-only) ──────────────────────────────────

    /// Append one interaction and return its row id. The user row must
    /// already exist (foreign key).
    pub fn add_interaction(
        &self,
        user_id: UserId,
        ts: i64,
        category: Category,
        prompt_tokens: u32,
        completion_tokens: u32,
        channel_id: Option<i64>,
    ) -> EngineResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO interactions (user_id, ts, category, prompt_tokens, completion_tokens, channel_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id.0, ts, category.as_str(), prompt_tokens, completion_tokens, channel_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Interactions of one user, newest first.
    pub fn list_interactions(&self, user_id: UserId, limit: usize) -> EngineResult<Vec<InteractionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, ts, category, prompt_tokens, completion_tokens, channel_id
             FROM interactions WHERE user_id = ?1
             ORDER BY ts DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id.0, limit as i64], |row| {
                let category: String = row.get(3)?;
                Ok(InteractionRecord {
                    id: row.get(0)?,
                    user_id: UserId(row.get(1)?),
                    ts: row.get(2)?,
                    category: Category::parse(&category),
                    prompt_tokens: row.get(4)?,
                    completion_tokens: row.get(5)?,
                    channel_id: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Distinct users with at least one interaction in `range`.
    pub fn count_unique_users(&self, range: TimeRange) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let n = conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM interactions WHERE ts >= ?1 AND ts < ?2",
            params![range.start, range.end],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(n)
    }

    /// Users ranked by interaction count in `range`; ties by user id ascending.
    pub fn leaderboard(&self, range: TimeRange, limit: usize) -> EngineResult<Vec<LeaderboardEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT i.user_id, u.display_name, COUNT(i.id) AS cnt
             FROM interactions i
             LEFT JOIN users u ON u.user_id = i.user_id
             WHERE i.ts >= ?1 AND i.ts < ?2
             GROUP BY i.user_id
             ORDER BY cnt DESC, i.user_id ASC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![range.start, range.end, limit as i64], |row| {
                Ok(LeaderboardEntry {
                    user_id: UserId(row.get(0)?),
                    display_name: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_users(ids: &[i64]) -> SessionStore {
        let store = SessionStore::open_in_memory().unwrap();
        for id in ids {
            store.upsert_user(UserId(*id), Some(&format!("u{}", id)), 0).unwrap();
        }
        store
    }

    #[test]
    fn interaction_requires_existing_user() {
        let store = SessionStore::open_in_memory().unwrap();
        let result = store.add_interaction(UserId(1), 10, Category::Advice, 1, 2, None);
        assert!(result.is_err());
    }

    #[test]
    fn ids_are_increasing() {
        let store = store_with_users(&[1]);
        let a = store.add_interaction(UserId(1), 10, Category::Advice, 1, 2, Some(99)).unwrap();
        let b = store.add_interaction(UserId(1), 11, Category::Roll, 0, 0, None).unwrap();
        assert!(b > a);

        let rows = store.list_interactions(UserId(1), 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, Category::Roll);
        assert_eq!(rows[1].channel_id, Some(99));
    }

    #[test]
    fn unique_users_respects_half_open_range() {
        let store = store_with_users(&[1, 2, 3]);
        store.add_interaction(UserId(1), 100, Category::Advice, 0, 0, None).unwrap();
        store.add_interaction(UserId(1), 150, Category::Advice, 0, 0, None).unwrap();
        store.add_interaction(UserId(2), 199, Category::Quest, 0, 0, None).unwrap();
        store.add_interaction(UserId(3), 200, Category::Quest, 0, 0, None).unwrap();

        assert_eq!(store.count_unique_users(TimeRange::new(100, 200)).unwrap(), 2);
        assert_eq!(store.count_unique_users(TimeRange::all()).unwrap(), 3);
    }

    #[test]
    fn leaderboard_orders_by_count_then_user_id() {
        let store = store_with_users(&[5, 3, 9]);
        for (uid, n) in [(5, 2), (3, 2), (9, 4)] {
            for i in 0..n {
                store.add_interaction(UserId(uid), 10 + i, Category::Roll, 0, 0, None).unwrap();
            }
        }
        let board = store.leaderboard(TimeRange::all(), 10).unwrap();
        let order: Vec<i64> = board.iter().map(|e| e.user_id.0).collect();
        assert_eq!(order, vec![9, 3, 5]);
        assert_eq!(board[0].count, 4);
        assert_eq!(board[1].display_name.as_deref(), Some("u3"));

        let top1 = store.leaderboard(TimeRange::all(), 1).unwrap();
        assert_eq!(top1.len(), 1);
    }
}
