// Typed per-user slots over the generic user_state (user_id, key, value) table.
// Callers never see raw values: each slot has its own accessor.

use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Exchange, UserId};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StateKey {
    ActiveQuest,
    Thread,
}

impl StateKey {
    fn as_str(&self) -> &'static str {
        match self {
            StateKey::ActiveQuest => "active_quest",
            StateKey::Thread => "thread",
        }
    }
}

pub(super) fn get_state_on(conn: &Connection, user_id: UserId, key: StateKey) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM user_state WHERE user_id = ?1 AND key = ?2",
        params![user_id.0, key.as_str()],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

pub(super) fn put_state_on(conn: &Connection, user_id: UserId, key: StateKey, value: &str, ts: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO user_state (user_id, key, value, ts) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, ts = excluded.ts",
        params![user_id.0, key.as_str(), value, ts],
    )?;
    Ok(())
}

pub(super) fn delete_state_on(conn: &Connection, user_id: UserId, key: StateKey) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM user_state WHERE user_id = ?1 AND key = ?2",
        params![user_id.0, key.as_str()],
    )?;
    Ok(())
}

/// Decode a stored thread. Anything that is not a JSON list of exchanges
/// reads as an empty thread.
pub(crate) fn decode_thread(user_id: UserId, raw: &str) -> Vec<Exchange> {
    match serde_json::from_str::<Vec<Exchange>>(raw) {
        Ok(exchanges) => exchanges,
        Err(e) => {
            warn!("[store] Discarding unreadable thread for user {}: {}", user_id, e);
            Vec::new()
        }
    }
}

fn keep_newest(thread: &mut Vec<Exchange>, max_len: usize) {
    if thread.len() > max_len {
        let excess = thread.len() - max_len;
        thread.drain(..excess);
    }
}

impl SessionStore {
    // ── Active quest slot ──────────────────────────────────────────────

    pub fn active_quest(&self, user_id: UserId) -> EngineResult<Option<String>> {
        let conn = self.conn.lock();
        Ok(get_state_on(&conn, user_id, StateKey::ActiveQuest)?)
    }

    pub fn set_active_quest(&self, user_id: UserId, text: &str, ts: i64) -> EngineResult<()> {
        let conn = self.conn.lock();
        put_state_on(&conn, user_id, StateKey::ActiveQuest, text, ts)?;
        Ok(())
    }

    pub fn clear_active_quest(&self, user_id: UserId) -> EngineResult<()> {
        let conn = self.conn.lock();
        delete_state_on(&conn, user_id, StateKey::ActiveQuest)?;
        Ok(())
    }

    // ── Thread slot ────────────────────────────────────────────────────

    /// The newest `max_len` exchanges. Longer stored windows (written under
    /// a larger limit, or by something else) are cut on read.
    pub fn thread(&self, user_id: UserId, max_len: usize) -> EngineResult<Vec<Exchange>> {
        let conn = self.conn.lock();
        let raw = get_state_on(&conn, user_id, StateKey::Thread)?;
        let mut thread = raw.map(|r| decode_thread(user_id, &r)).unwrap_or_default();
        keep_newest(&mut thread, max_len);
        Ok(thread)
    }

    /// Append one exchange and keep only the last `max_len`, as a single
    /// read-modify-write under the connection lock.
    pub fn append_exchange(&self, user_id: UserId, exchange: &Exchange, max_len: usize, ts: i64) -> EngineResult<Vec<Exchange>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut thread = get_state_on(&tx, user_id, StateKey::Thread)?
            .map(|r| decode_thread(user_id, &r))
            .unwrap_or_default();
        thread.push(exchange.clone());
        keep_newest(&mut thread, max_len);
        let json = serde_json::to_string(&thread)?;
        put_state_on(&tx, user_id, StateKey::Thread, &json, ts)?;
        tx.commit()?;
        Ok(thread)
    }

    pub fn clear_thread(&self, user_id: UserId) -> EngineResult<()> {
        let conn = self.conn.lock();
        delete_state_on(&conn, user_id, StateKey::Thread)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn put_raw_thread(&self, user_id: UserId, raw: &str) -> EngineResult<()> {
        let conn = self.conn.lock();
        put_state_on(&conn, user_id, StateKey::Thread, raw, 0)?;
        Ok(())
    }
}
