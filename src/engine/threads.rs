// Dungeon Oracle — Thread Continuation
// Rolling window of the last N (request, response) exchanges per user, used
// to answer follow-ups without restating context. Best effort: an unreadable
// stored window is an empty window.

use crate::atoms::error::EngineResult;
use crate::atoms::types::{Exchange, UserId};
use crate::engine::sanitize::clean_text;
use crate::engine::sessions::SessionStore;
use std::fmt::Write as _;
use std::sync::Arc;

pub struct ThreadManager {
    store: Arc<SessionStore>,
    max_len: usize,
}

impl ThreadManager {
    pub fn new(store: Arc<SessionStore>, max_len: usize) -> Self {
        ThreadManager { store, max_len }
    }

    /// Add an exchange (sanitized) and trim to the newest `max_len`.
    pub fn append(&self, user_id: UserId, exchange: &Exchange, ts: i64) -> EngineResult<Vec<Exchange>> {
        let clean = Exchange::new(clean_text(&exchange.user), clean_text(&exchange.response));
        self.store.append_exchange(user_id, &clean, self.max_len, ts)
    }

    pub fn window(&self, user_id: UserId) -> EngineResult<Vec<Exchange>> {
        self.store.thread(user_id, self.max_len)
    }

    pub fn clear(&self, user_id: UserId) -> EngineResult<()> {
        self.store.clear_thread(user_id)
    }

    /// Prompt context for a follow-up request.
    pub fn build_continuation(&self, user_id: UserId, new_text: &str, active_quest: Option<&str>) -> EngineResult<String> {
        let thread = self.window(user_id)?;
        Ok(render_continuation(&thread, new_text, active_quest))
    }
}

pub fn render_continuation(thread: &[Exchange], new_text: &str, active_quest: Option<&str>) -> String {
    let mut out = String::new();
    if thread.is_empty() {
        out.push_str("No earlier exchanges in this thread.\n");
    } else {
        out.push_str("Earlier in this thread:\n");
        for (i, ex) in thread.iter().enumerate() {
            let _ = writeln!(out, "[{}] Adventurer: {}", i + 1, clean_text(&ex.user));
            let _ = writeln!(out, "[{}] Oracle: {}", i + 1, clean_text(&ex.response));
        }
    }

    let follow_up = clean_text(new_text);
    out.push('\n');
    if follow_up.is_empty() {
        out.push_str("The adventurer asks you to continue where you left off.");
    } else {
        let _ = write!(out, "Follow-up: \"{}\"", follow_up);
    }

    if let Some(quest) = active_quest.map(clean_text).filter(|q| !q.is_empty()) {
        let _ = write!(out, "\nReminder, their active quest: {}", quest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(n: usize) -> ThreadManager {
        ThreadManager::new(Arc::new(SessionStore::open_in_memory().unwrap()), n)
    }

    #[test]
    fn fourth_exchange_drops_the_first() {
        let m = manager(3);
        let uid = UserId(1);
        for i in 1..=4 {
            m.append(uid, &Exchange::new(format!("q{}", i), format!("a{}", i)), i).unwrap();
        }
        let w = m.window(uid).unwrap();
        assert_eq!(w, vec![Exchange::new("q2", "a2"), Exchange::new("q3", "a3"), Exchange::new("q4", "a4")]);
    }

    #[test]
    fn appended_text_is_sanitized() {
        let m = manager(3);
        m.append(UserId(1), &Exchange::new("hi", "Sure.\n🏆 ACHIEVEMENT UNLOCKED: Talker\nReward: none"), 1).unwrap();
        assert_eq!(m.window(UserId(1)).unwrap()[0].response, "Sure.");
    }

    #[test]
    fn continuation_includes_history_request_and_quest() {
        let m = manager(3);
        let uid = UserId(1);
        m.append(uid, &Exchange::new("How do I cross the bridge?", "Bribe the troll."), 1).unwrap();
        let ctx = m.build_continuation(uid, "With what?", Some("Find the bell")).unwrap();
        assert!(ctx.contains("[1] Adventurer: How do I cross the bridge?"));
        assert!(ctx.contains("[1] Oracle: Bribe the troll."));
        assert!(ctx.contains("Follow-up: \"With what?\""));
        assert!(ctx.ends_with("Reminder, their active quest: Find the bell"));
    }

    #[test]
    fn empty_thread_and_text_still_render() {
        let ctx = render_continuation(&[], "  ", None);
        assert!(ctx.contains("No earlier exchanges"));
        assert!(ctx.contains("continue where you left off"));
        assert!(!ctx.contains("Reminder"));
    }

    #[test]
    fn window_never_exceeds_max_len() {
        let store = Arc::new(SessionStore::open_in_memory().unwrap());
        let uid = UserId(1);
        let wide = ThreadManager::new(store.clone(), 6);
        for i in 1..=6 {
            wide.append(uid, &Exchange::new(format!("q{}", i), format!("a{}", i)), i).unwrap();
        }

        let m = ThreadManager::new(store, 3);
        let w = m.window(uid).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(w[0].user, "q4");
        let ctx = m.build_continuation(uid, "and then?", None).unwrap();
        assert!(ctx.contains("[3] Oracle: a6"));
        assert!(!ctx.contains("[4]"));
        assert!(!ctx.contains("q1"));
    }

    #[test]
    fn clear_empties_the_window() {
        let m = manager(3);
        m.append(UserId(1), &Exchange::new("q", "a"), 1).unwrap();
        m.clear(UserId(1)).unwrap();
        assert!(m.window(UserId(1)).unwrap().is_empty());
    }
}
