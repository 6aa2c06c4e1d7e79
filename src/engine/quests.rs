// Dungeon Oracle — Quest State Machine
//
// Per user:  NoActiveQuest ──issue──▶ ActiveQuest(hook) ──stop──▶ NoActiveQuest
//            (issue from ActiveQuest replaces the hook)
//
// Globally: a bounded FIFO of recently accepted hooks (case-insensitive,
// trimmed) so consecutive quests across all users do not repeat. A fresh hook
// that collides is regenerated up to HOOK_REGENERATE_ATTEMPTS more times;
// after that, or on any generation failure, a built-in fallback is used.
//
// The window lock is never held across a generation call or a store call.
// Writes of the window go through a separate lock and never go backwards.

use crate::atoms::constants::{HOOK_REGENERATE_ATTEMPTS, QUEST_MEMORY_PREFIX, RECENT_HOOKS_KEY};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{GenerationRequest, Generator};
use crate::atoms::types::UserId;
use crate::engine::providers::generate_bounded;
use crate::engine::sanitize::{clean_text, hook_key};
use crate::engine::sessions::{QuestInstall, SessionStore};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub const FALLBACK_HOOKS: &[&str] = &[
    "A suspicious merchant offers a map to a sunken archive guarded by silent bells.",
    "Each dawn, footprints circle every door, yet no watcher sees the walker.",
    "A cursed ledger predicts debts that come due in blood by the next full moon.",
    "The village well now answers questions, but only with lies about tomorrow.",
    "A retired golem petitions the guild for back pay and will not leave the hall.",
];

// ── Recent hook window ─────────────────────────────────────────────────

struct Window {
    /// normalized hook keys, oldest first
    keys: VecDeque<String>,
    /// bumped on every change, so stale snapshots can be told apart
    version: u64,
}

/// A copy of the window taken inside the same critical section as a change.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    pub keys: Vec<String>,
    pub version: u64,
}

pub struct RecentHooks {
    inner: Mutex<Window>,
    capacity: usize,
}

impl RecentHooks {
    pub fn new(capacity: usize) -> Self {
        RecentHooks {
            inner: Mutex::new(Window { keys: VecDeque::with_capacity(capacity + 1), version: 0 }),
            capacity,
        }
    }

    pub fn contains(&self, hook: &str) -> bool {
        let key = hook_key(hook);
        self.inner.lock().keys.iter().any(|k| *k == key)
    }

    /// Accept `hook` if it is not in the window. Check and push are one
    /// critical section, so two requests cannot both claim the same hook.
    pub fn claim(&self, hook: &str) -> bool {
        self.claim_snapshot(hook).is_some()
    }

    /// `claim`, returning the window as it stood right after the push.
    pub fn claim_snapshot(&self, hook: &str) -> Option<WindowSnapshot> {
        let key = hook_key(hook);
        let mut window = self.inner.lock();
        if window.keys.iter().any(|k| *k == key) {
            return None;
        }
        self.push_locked(&mut window, key);
        Some(Self::snapshot_locked(&window))
    }

    /// Pick a fallback not in the window if one exists, else any fallback.
    /// A fresh pick is recorded and comes back with a snapshot; a repeated
    /// one leaves the window untouched.
    pub fn claim_fallback(&self, fallbacks: &[String]) -> Option<(String, Option<WindowSnapshot>)> {
        let mut window = self.inner.lock();
        let fresh: Vec<&String> = fallbacks
            .iter()
            .filter(|f| {
                let key = hook_key(f);
                !window.keys.iter().any(|k| *k == key)
            })
            .collect();
        let mut rng = rand::thread_rng();
        match fresh.choose(&mut rng) {
            Some(f) => {
                let picked = (*f).clone();
                self.push_locked(&mut window, hook_key(&picked));
                Some((picked, Some(Self::snapshot_locked(&window))))
            }
            None => Some((fallbacks.choose(&mut rng)?.clone(), None)),
        }
    }

    /// Take back a claimed hook that was never installed. Returns the new
    /// window, or None when the hook was no longer in it.
    pub fn release(&self, hook: &str) -> Option<WindowSnapshot> {
        let key = hook_key(hook);
        let mut window = self.inner.lock();
        let pos = window.keys.iter().rposition(|k| *k == key)?;
        window.keys.remove(pos);
        window.version += 1;
        Some(Self::snapshot_locked(&window))
    }

    fn push_locked(&self, window: &mut Window, key: String) {
        window.keys.push_back(key);
        while window.keys.len() > self.capacity {
            window.keys.pop_front();
        }
        window.version += 1;
    }

    fn snapshot_locked(window: &Window) -> WindowSnapshot {
        WindowSnapshot { keys: window.keys.iter().cloned().collect(), version: window.version }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().keys.iter().cloned().collect()
    }

    /// Replace the window contents, keeping only the newest `capacity` keys.
    pub fn restore(&self, hooks: Vec<String>) {
        let mut window = self.inner.lock();
        window.keys.clear();
        for h in hooks {
            self.push_locked(&mut window, hook_key(&h));
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Hook production ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct HookOutcome {
    pub hook: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub from_fallback: bool,
    /// Whether this hook was pushed into the recent window by this call.
    pub claimed: bool,
}

pub struct QuestMachine {
    store: Arc<SessionStore>,
    hooks: RecentHooks,
    /// version of the last window written to the store
    persisted: Mutex<u64>,
    fallbacks: Vec<String>,
    memory_cap: usize,
    importance: u8,
}

impl QuestMachine {
    /// Restores the persisted hook window; an unreadable one starts empty.
    pub fn new(store: Arc<SessionStore>, window: usize, memory_cap: usize, importance: u8) -> Self {
        let hooks = RecentHooks::new(window);
        match store.get_config(RECENT_HOOKS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(saved) => hooks.restore(saved),
                Err(e) => warn!("[quest] Ignoring unreadable hook window: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("[quest] Could not load hook window: {}", e),
        }
        QuestMachine {
            store,
            hooks,
            persisted: Mutex::new(0),
            fallbacks: FALLBACK_HOOKS.iter().map(|s| s.to_string()).collect(),
            memory_cap,
            importance,
        }
    }

    pub fn recent_hooks(&self) -> &RecentHooks {
        &self.hooks
    }

    /// Always yields a hook. Generation errors end the attempts early;
    /// duplicates and empty texts use up one attempt each.
    pub async fn produce_hook(
        &self,
        generator: &dyn Generator,
        request: &GenerationRequest,
        timeout: Duration,
    ) -> HookOutcome {
        let mut prompt_tokens = 0u32;
        let mut completion_tokens = 0u32;

        for attempt in 0..=HOOK_REGENERATE_ATTEMPTS {
            let generation = match generate_bounded(generator, request, timeout).await {
                Ok(g) => g,
                Err(e) => {
                    warn!("[quest] Hook generation failed on attempt {}: {}", attempt + 1, e);
                    break;
                }
            };
            prompt_tokens = prompt_tokens.saturating_add(generation.prompt_tokens);
            completion_tokens = completion_tokens.saturating_add(generation.completion_tokens);

            let hook = clean_text(&generation.text);
            if hook.is_empty() {
                debug!("[quest] Attempt {} produced an empty hook", attempt + 1);
                continue;
            }
            if let Some(snapshot) = self.hooks.claim_snapshot(&hook) {
                self.persist_window(snapshot);
                return HookOutcome { hook, prompt_tokens, completion_tokens, from_fallback: false, claimed: true };
            }
            debug!("[quest] Attempt {} repeated a recent hook", attempt + 1);
        }

        info!("[quest] Using fallback hook");
        let (hook, claimed) = match self.hooks.claim_fallback(&self.fallbacks) {
            Some((hook, Some(snapshot))) => {
                self.persist_window(snapshot);
                (hook, true)
            }
            Some((hook, None)) => (hook, false),
            None => (FALLBACK_HOOKS[0].to_string(), false),
        };
        HookOutcome { hook, prompt_tokens, completion_tokens, from_fallback: true, claimed }
    }

    /// Undo the window side of `produce_hook` when the hook could not be
    /// installed.
    pub fn release(&self, outcome: &HookOutcome) {
        if !outcome.claimed {
            return;
        }
        if let Some(snapshot) = self.hooks.release(&outcome.hook) {
            debug!("[quest] Released uninstalled hook from the recent window");
            self.persist_window(snapshot);
        }
    }

    /// Write `snapshot` unless a newer window has already been written.
    fn persist_window(&self, snapshot: WindowSnapshot) {
        let mut persisted = self.persisted.lock();
        if snapshot.version <= *persisted {
            debug!("[quest] Skipping stale hook window v{}", snapshot.version);
            return;
        }
        let result = serde_json::to_string(&snapshot.keys)
            .map_err(EngineError::from)
            .and_then(|json| self.store.set_config(RECENT_HOOKS_KEY, &json));
        match result {
            Ok(()) => *persisted = snapshot.version,
            Err(e) => warn!("[quest] Could not persist hook window: {}", e),
        }
    }

    // ── Transitions ────────────────────────────────────────────────────

    /// Make `hook` the user's active quest. Returns the sanitized hook.
    pub fn activate(&self, user_id: UserId, hook: &str, ts: i64) -> EngineResult<String> {
        let hook = clean_text(hook);
        let memory_text = format!("{} {}", QUEST_MEMORY_PREFIX, hook);
        self.store.install_quest(
            user_id,
            &QuestInstall {
                hook: &hook,
                memory_text: &memory_text,
                importance: self.importance,
                memory_cap: self.memory_cap,
                ts,
            },
        )?;
        info!("[quest] User {} accepted a new quest", user_id);
        Ok(hook)
    }

    pub fn stop(&self, user_id: UserId) -> EngineResult<()> {
        self.store.clear_quest(user_id)?;
        info!("[quest] User {} cleared their quest", user_id);
        Ok(())
    }

    /// Sanitized active quest, if any.
    pub fn active(&self, user_id: UserId) -> EngineResult<Option<String>> {
        let quest = self
            .store
            .active_quest(user_id)?
            .map(|q| clean_text(&q))
            .filter(|q| !q.is_empty());
        Ok(quest)
    }
}
