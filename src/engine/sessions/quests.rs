// Quest state transitions. Each one touches the active-quest slot, the quest
// breadcrumbs in memories and the thread slot, so each runs as one transaction.

use super::memories::{delete_memories_by_tag_on, insert_memory_on, prune_memories_on};
use super::user_state::{delete_state_on, put_state_on, StateKey};
use super::SessionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{MemoryTag, UserId};

/// What to write when a new quest becomes active.
#[derive(Debug, Clone)]
pub struct QuestInstall<'a> {
    pub hook: &'a str,
    pub memory_text: &'a str,
    pub importance: u8,
    pub memory_cap: usize,
    pub ts: i64,
}

impl SessionStore {
    /// NoActiveQuest | ActiveQuest(old) → ActiveQuest(hook).
    /// Retracts old breadcrumbs, stores the hook in the slot and as a quest
    /// memory, and resets the thread.
    pub fn install_quest(&self, user_id: UserId, install: &QuestInstall<'_>) -> EngineResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        delete_memories_by_tag_on(&tx, user_id, MemoryTag::Quest)?;
        put_state_on(&tx, user_id, StateKey::ActiveQuest, install.hook, install.ts)?;
        insert_memory_on(&tx, user_id, install.ts, install.memory_text, install.importance, MemoryTag::Quest)?;
        prune_memories_on(&tx, user_id, install.memory_cap)?;
        delete_state_on(&tx, user_id, StateKey::Thread)?;
        tx.commit()?;
        Ok(())
    }

    /// ActiveQuest(_) → NoActiveQuest. Also valid from NoActiveQuest.
    pub fn clear_quest(&self, user_id: UserId) -> EngineResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        delete_memories_by_tag_on(&tx, user_id, MemoryTag::Quest)?;
        delete_state_on(&tx, user_id, StateKey::ActiveQuest)?;
        delete_state_on(&tx, user_id, StateKey::Thread)?;
        tx.commit()?;
        Ok(())
    }
}
