use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Alignment, User, UserId, UserStats};
use rusqlite::{params, OptionalExtension};

impl SessionStore {
    // ── Users ──────────────────────────────────────────────────────────

    /// Insert on first sight, otherwise refresh name and last-seen.
    /// A missing display name never erases a known one.
    pub fn upsert_user(&self, user_id: UserId, display_name: Option<&str>, now: i64) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (user_id, display_name, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
               display_name = COALESCE(excluded.display_name, users.display_name),
               last_seen = excluded.last_seen",
            params![user_id.0, display_name, now],
        )?;
        Ok(())
    }

    pub fn set_alignment(&self, user_id: UserId, alignment: Alignment) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET alignment = ?2 WHERE user_id = ?1",
            params![user_id.0, alignment.as_str()],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: UserId) -> EngineResult<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT user_id, display_name, first_seen, last_seen, alignment
                 FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| {
                    let alignment: String = row.get(4)?;
                    Ok(User {
                        user_id: UserId(row.get(0)?),
                        display_name: row.get(1)?,
                        first_seen: row.get(2)?,
                        last_seen: row.get(3)?,
                        alignment: Alignment::parse(&alignment),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Lifetime interaction count and token spend for one user.
    pub fn user_stats(&self, user_id: UserId) -> EngineResult<UserStats> {
        let conn = self.conn.lock();
        let (interactions, tokens) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(prompt_tokens + completion_tokens), 0)
             FROM interactions WHERE user_id = ?1",
            params![user_id.0],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(UserStats { interactions, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_first_seen_and_known_name() {
        let store = SessionStore::open_in_memory().unwrap();
        let uid = UserId(7);
        store.upsert_user(uid, Some("grog"), 100).unwrap();
        store.upsert_user(uid, None, 250).unwrap();

        let user = store.get_user(uid).unwrap().unwrap();
        assert_eq!(user.first_seen, 100);
        assert_eq!(user.last_seen, 250);
        assert_eq!(user.display_name.as_deref(), Some("grog"));
        assert_eq!(user.alignment, Alignment::Neutral);
    }

    #[test]
    fn alignment_is_stored() {
        let store = SessionStore::open_in_memory().unwrap();
        store.upsert_user(UserId(1), Some("a"), 1).unwrap();
        store.set_alignment(UserId(1), Alignment::Chaotic).unwrap();
        assert_eq!(store.get_user(UserId(1)).unwrap().unwrap().alignment, Alignment::Chaotic);
    }

    #[test]
    fn stats_for_unknown_user_are_zero() {
        let store = SessionStore::open_in_memory().unwrap();
        let stats = store.user_stats(UserId(404)).unwrap();
        assert_eq!(stats, UserStats { interactions: 0, tokens: 0 });
    }
}
