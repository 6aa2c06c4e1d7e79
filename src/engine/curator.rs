// Dungeon Oracle — Memory Curator
// Ranked, bounded per-user snippet collection. Ranking is importance desc,
// then recency desc. Every insertion is followed by a prune to the cap, in
// the same store transaction, so the collection never exceeds it.

use crate::atoms::error::EngineResult;
use crate::atoms::types::{MemoryTag, UserId};
use crate::engine::sanitize::clean_text;
use crate::engine::sessions::SessionStore;
use log::debug;
use std::sync::Arc;

pub struct MemoryCurator {
    store: Arc<SessionStore>,
    cap: usize,
}

impl MemoryCurator {
    pub fn new(store: Arc<SessionStore>, cap: usize) -> Self {
        MemoryCurator { store, cap }
    }

    /// Sanitized texts, best first. Snippets that sanitize to nothing are skipped.
    pub fn top_memories(&self, user_id: UserId, limit: usize) -> EngineResult<Vec<String>> {
        let texts = self
            .store
            .top_memories(user_id, limit)?
            .into_iter()
            .map(|m| clean_text(&m.text))
            .filter(|t| !t.is_empty())
            .collect();
        Ok(texts)
    }

    /// Store a sanitized snippet and prune to the cap. Returns the row id,
    /// or `None` when nothing is left after sanitizing.
    pub fn add(&self, user_id: UserId, text: &str, importance: u8, tag: MemoryTag, ts: i64) -> EngineResult<Option<i64>> {
        let clean = clean_text(text);
        if clean.is_empty() {
            debug!("[memory] Skipping empty snippet for user {}", user_id);
            return Ok(None);
        }
        let id = self.store.add_memory(user_id, ts, &clean, importance, tag, self.cap)?;
        Ok(Some(id))
    }

    pub fn delete_by_prefix(&self, user_id: UserId, prefix: &str) -> EngineResult<usize> {
        self.store.delete_memories_with_prefix(user_id, prefix)
    }

    pub fn delete_by_tag(&self, user_id: UserId, tag: MemoryTag) -> EngineResult<usize> {
        self.store.delete_memories_by_tag(user_id, tag)
    }

    pub fn prune(&self, user_id: UserId, keep: usize) -> EngineResult<usize> {
        let dropped = self.store.prune_memories(user_id, keep)?;
        if dropped > 0 {
            debug!("[memory] Pruned {} snippets for user {}", dropped, user_id);
        }
        Ok(dropped)
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curator(cap: usize) -> MemoryCurator {
        let store = Arc::new(SessionStore::open_in_memory().unwrap());
        store.upsert_user(UserId(1), Some("keyleth"), 0).unwrap();
        MemoryCurator::new(store, cap)
    }

    #[test]
    fn prune_keeps_exactly_the_best() {
        let c = curator(100);
        let uid = UserId(1);
        let inserted = [(1, 10), (3, 11), (2, 12), (3, 13), (1, 14), (2, 15), (1, 16), (3, 9)];
        for (i, (imp, ts)) in inserted.iter().enumerate() {
            c.add(uid, &format!("s{}", i), *imp, MemoryTag::Note, *ts).unwrap();
        }
        c.prune(uid, 5).unwrap();
        let top = c.top_memories(uid, 100).unwrap();
        // (3,13) s3, (3,11) s1, (3,9) s7, (2,15) s5, (2,12) s2
        assert_eq!(top, vec!["s3", "s1", "s7", "s5", "s2"]);
    }

    #[test]
    fn add_never_exceeds_cap() {
        let c = curator(4);
        for i in 0..20 {
            c.add(UserId(1), &format!("n{}", i), 1, MemoryTag::Note, i).unwrap();
            assert!(c.top_memories(UserId(1), 100).unwrap().len() <= 4);
        }
    }

    #[test]
    fn markup_never_reaches_output() {
        let c = curator(10);
        c.add(UserId(1), "Won.\n🏆 ACHIEVEMENT UNLOCKED: Hero\nReward: gold", 2, MemoryTag::Note, 1).unwrap();
        assert_eq!(c.add(UserId(1), "🏆 ACHIEVEMENT UNLOCKED: x\nReward: y", 2, MemoryTag::Note, 2).unwrap(), None);
        assert_eq!(c.top_memories(UserId(1), 10).unwrap(), vec!["Won."]);
    }

    #[test]
    fn prefix_delete_leaves_other_snippets() {
        let c = curator(10);
        let uid = UserId(1);
        c.add(uid, "Active quest: bells", 3, MemoryTag::Quest, 1).unwrap();
        c.add(uid, "Active quest: ledger", 3, MemoryTag::Quest, 2).unwrap();
        c.add(uid, "Asked about an Active quest: later", 2, MemoryTag::Note, 3).unwrap();
        assert_eq!(c.delete_by_prefix(uid, "Active quest:").unwrap(), 2);
        assert_eq!(c.top_memories(uid, 10).unwrap(), vec!["Asked about an Active quest: later"]);
    }
}
