use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{MemorySnippet, MemoryTag, UserId};
use rusqlite::{params, Connection};

impl MemorySnippet {
    /// Map a row with columns (id, user_id, ts, text, importance, tag) → MemorySnippet.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let importance: i64 = row.get(4)?;
        let tag: String = row.get(5)?;
        Ok(MemorySnippet {
            id: row.get(0)?,
            user_id: UserId(row.get(1)?),
            ts: row.get(2)?,
            text: row.get(3)?,
            importance: importance.clamp(0, u8::MAX as i64) as u8,
            tag: MemoryTag::parse(&tag),
        })
    }
}

// Ranking shared by reads and pruning: importance desc, recency desc, then
// insertion order so equal timestamps stay deterministic.
const RANK_ORDER: &str = "ORDER BY importance DESC, ts DESC, id DESC";

pub(super) fn insert_memory_on(
    conn: &Connection,
    user_id: UserId,
    ts: i64,
    text: &str,
    importance: u8,
    tag: MemoryTag,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO memories (user_id, ts, text, importance, tag) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id.0, ts, text, importance as i64, tag.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(super) fn prune_memories_on(conn: &Connection, user_id: UserId, keep: usize) -> rusqlite::Result<usize> {
    let sql = format!(
        "DELETE FROM memories WHERE user_id = ?1 AND id NOT IN (
             SELECT id FROM memories WHERE user_id = ?1 {} LIMIT ?2
         )",
        RANK_ORDER
    );
    conn.execute(&sql, params![user_id.0, keep as i64])
}

pub(super) fn delete_memories_by_tag_on(conn: &Connection, user_id: UserId, tag: MemoryTag) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM memories WHERE user_id = ?1 AND tag = ?2",
        params![user_id.0, tag.as_str()],
    )
}

impl SessionStore {
    // ── Memory CRUD ────────────────────────────────────────────────────

    /// Insert a snippet, then prune the user's collection to `cap` in the
    /// same transaction. Returns the new row id.
    pub fn add_memory(
        &self,
        user_id: UserId,
        ts: i64,
        text: &str,
        importance: u8,
        tag: MemoryTag,
        cap: usize,
    ) -> EngineResult<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let id = insert_memory_on(&tx, user_id, ts, text, importance, tag)?;
        prune_memories_on(&tx, user_id, cap)?;
        tx.commit()?;
        Ok(id)
    }

    /// Highest-ranked snippets first.
    pub fn top_memories(&self, user_id: UserId, limit: usize) -> EngineResult<Vec<MemorySnippet>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT id, user_id, ts, text, importance, tag FROM memories
             WHERE user_id = ?1 {} LIMIT ?2",
            RANK_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let memories = stmt
            .query_map(params![user_id.0, limit as i64], MemorySnippet::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(memories)
    }

    pub fn count_memories(&self, user_id: UserId) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let n = conn.query_row(
            "SELECT COUNT(*) FROM memories WHERE user_id = ?1",
            params![user_id.0],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(n)
    }

    /// Remove snippets whose text starts with `prefix`, compared literally
    /// and case-sensitively (no LIKE wildcards).
    pub fn delete_memories_with_prefix(&self, user_id: UserId, prefix: &str) -> EngineResult<usize> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM memories
             WHERE user_id = ?1 AND substr(text, 1, length(?2)) = ?2",
            params![user_id.0, prefix],
        )?;
        Ok(n)
    }

    pub fn delete_memories_by_tag(&self, user_id: UserId, tag: MemoryTag) -> EngineResult<usize> {
        let conn = self.conn.lock();
        Ok(delete_memories_by_tag_on(&conn, user_id, tag)?)
    }

    /// Keep only the `keep` highest-ranked snippets. Returns how many were dropped.
    pub fn prune_memories(&self, user_id: UserId, keep: usize) -> EngineResult<usize> {
        let conn = self.conn.lock();
        Ok(prune_memories_on(&conn, user_id, keep)?)
    }
}
