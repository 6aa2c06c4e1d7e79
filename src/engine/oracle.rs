// Dungeon Oracle — Request Handling
//
// handle(request):
//   access check ──deny──▶ Rejected(access_denied)
//   rate limiter ──deny──▶ Rejected(rate_limited)
//   upsert user
//   dispatch on intent (advice / quest / roll / continue / stop / stats / leaderboard)
//
// Counted intents bump today's counters before generation, so the chaos
// value includes the request being served. Interaction rows are only
// written once there is something to record. No lock is held across a
// generation call; store operations each take the connection briefly.

use crate::atoms::constants::{
    DEFAULT_LEADERBOARD_SIZE, NOTE_MAX_CHARS, NOTE_MEMORY_IMPORTANCE, NOTE_MIN_QUESTION_CHARS,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Generation, GenerationRequest};
use crate::atoms::types::{
    Category, Exchange, Intent, LeaderboardEntry, MemoryTag, Outcome, Rating, Rejection, Request, Response,
    TimeRange, UserId, Vote,
};
use crate::engine::alignment::infer_alignment;
use crate::engine::chaos::{temperature_for, ChaosSettings};
use crate::engine::dice;
use crate::engine::prompts::{build_quest_prompts, build_system_prompt, build_user_prompt};
use crate::engine::providers::generate_bounded;
use crate::engine::report::{compose_report, DailyReport};
use crate::engine::sanitize::{collapse_whitespace, truncate_chars};
use crate::engine::state::EngineState;
use log::{debug, error, info, warn};

const DEFAULT_DISPLAY_NAME: &str = "adventurer";
const GENERATION_APOLOGY: &str = "🛑 The Oracle coughed on a dust mote and lost the thread. Ask again in a moment.";
const EMPTY_ADVICE_HINT: &str = "Ask me something (advice <your dilemma>), or start a quest first.";
const QUEST_CLEARED: &str = "🧹 Quest log cleared. Use quest to start fresh chaos.";
const EMPTY_LEADERBOARD: &str = "No heroes have darkened my doorway yet.";

/// Per-request values every counted intent needs.
struct Turn {
    day: String,
    chaos: f64,
    temperature: f64,
}

impl EngineState {
    /// Serve one normalized request. Admission failures are outcomes, not
    /// errors; a returned error means the store failed and the transport
    /// should show `EngineError::user_message()`.
    pub async fn handle(&self, request: &Request) -> EngineResult<Outcome> {
        let uid = request.user_id;
        if let Some(rejection) = self.admission(uid, request.timestamp) {
            return Ok(Outcome::Rejected(rejection));
        }

        let result = self.dispatch(request).await;
        if let Err(e) = &result {
            error!("[oracle] {:?} for user {} failed: {}", request.intent, uid, e);
        }
        result.map(Outcome::Reply)
    }

    /// Access policy first, so denied users never occupy a rate window.
    fn admission(&self, uid: UserId, now: i64) -> Option<Rejection> {
        if !self.access.is_allowed(uid) {
            debug!("[oracle] User {} denied by access policy", uid);
            return Some(Rejection::AccessDenied);
        }
        if !self.limiter.admit(uid, now) {
            debug!("[oracle] User {} rate limited", uid);
            return Some(Rejection::RateLimited);
        }
        None
    }

    async fn dispatch(&self, request: &Request) -> EngineResult<Response> {
        self.store.upsert_user(request.user_id, request.display_name.as_deref(), request.timestamp)?;
        match request.intent {
            Intent::Advice => self.advise(request).await,
            Intent::Quest => self.issue_quest(request).await,
            Intent::Roll => self.roll(request),
            Intent::Continue => self.continue_thread(request).await,
            Intent::Stop => self.stop_quest(request),
            Intent::Stats => self.stats(request),
            Intent::Leaderboard => self.leaderboard_reply(request),
        }
    }

    /// Count the request on today's counters, then read today's chaos.
    fn begin_turn(&self, now: i64, category: Category) -> EngineResult<Turn> {
        let day = self.analytics.day_key(now);
        self.analytics.increment(&day, category)?;
        let chaos = self.chaos.chaos(self.analytics.todays_interactions(now)?);
        let temperature = temperature_for(self.config.system_temperature, chaos);
        Ok(Turn { day, chaos, temperature })
    }

    fn current_chaos(&self, now: i64) -> EngineResult<f64> {
        Ok(self.chaos.chaos(self.analytics.todays_interactions(now)?))
    }

    async fn generate(&self, system_context: String, user_context: String, temperature: f64) -> Option<Generation> {
        let request = GenerationRequest { system_context, user_context, temperature };
        match generate_bounded(self.generator.as_ref(), &request, self.config.generation_timeout()).await {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("[oracle] Generation via {} failed: {}", self.generator.name(), e);
                None
            }
        }
    }

    fn apology(turn: &Turn) -> Response {
        Response {
            text: GENERATION_APOLOGY.to_string(),
            chaos_value: turn.chaos,
            temperature_used: None,
            interaction_row_id: None,
        }
    }

    // ── Advice ─────────────────────────────────────────────────────────

    async fn advise(&self, request: &Request) -> EngineResult<Response> {
        let uid = request.user_id;
        let now = request.timestamp;
        let turn = self.begin_turn(now, Category::Advice)?;

        let memories = self.curator.top_memories(uid, self.config.memory.prompt_limit)?;
        let quest = self.quests.active(uid)?;
        let asked = request.text.trim();
        let question = match &quest {
            Some(q) if asked.is_empty() => format!("Strategy to tackle my current quest: {}", q),
            Some(q) => format!("{}\n(Consider current quest context: {})", asked, q),
            None => asked.to_string(),
        };
        if question.is_empty() {
            return Ok(Response {
                text: EMPTY_ADVICE_HINT.to_string(),
                chaos_value: turn.chaos,
                temperature_used: None,
                interaction_row_id: None,
            });
        }

        let name = request.display_name.as_deref().unwrap_or(DEFAULT_DISPLAY_NAME);
        let system = build_system_prompt(&self.persona, &memories, turn.chaos);
        let user = build_user_prompt(name, &question, quest.as_deref());
        let Some(reply) = self.generate(system, user, turn.temperature).await else {
            warn!("[oracle] Advice for user {} fell back to an apology", uid);
            return Ok(Self::apology(&turn));
        };

        let row = self.store.add_interaction(
            uid,
            now,
            Category::Advice,
            reply.prompt_tokens,
            reply.completion_tokens,
            request.channel_id,
        )?;
        if question.chars().count() > NOTE_MIN_QUESTION_CHARS {
            let note = truncate_chars(&collapse_whitespace(&question), NOTE_MAX_CHARS);
            self.curator.add(uid, &note, NOTE_MEMORY_IMPORTANCE, MemoryTag::Note, now)?;
        }
        self.store.set_alignment(uid, infer_alignment(&question))?;
        self.threads.append(uid, &Exchange::new(question.as_str(), reply.text.as_str()), now)?;

        Ok(Response {
            text: format!("{}\n\nChaos {:.2} • Temp {:.2}", reply.text, turn.chaos, turn.temperature),
            chaos_value: turn.chaos,
            temperature_used: Some(turn.temperature),
            interaction_row_id: Some(row),
        })
    }

    // ── Quests ─────────────────────────────────────────────────────────

    async fn issue_quest(&self, request: &Request) -> EngineResult<Response> {
        let uid = request.user_id;
        let now = request.timestamp;
        let turn = self.begin_turn(now, Category::Quest)?;

        let (system_context, user_context) = build_quest_prompts(&self.persona, turn.chaos);
        let generation = GenerationRequest { system_context, user_context, temperature: turn.temperature };
        let outcome = self
            .quests
            .produce_hook(self.generator.as_ref(), &generation, self.config.generation_timeout())
            .await;
        let hook = match self.quests.activate(uid, &outcome.hook, now) {
            Ok(hook) => hook,
            Err(e) => {
                self.quests.release(&outcome);
                return Err(e);
            }
        };

        let row = self.store.add_interaction(
            uid,
            now,
            Category::Quest,
            outcome.prompt_tokens,
            outcome.completion_tokens,
            request.channel_id,
        )?;
        Ok(Response {
            text: format!("📜 Quest Hook\n{}\n\nUse advice to plot your approach. I'll remember this quest.", hook),
            chaos_value: turn.chaos,
            temperature_used: (!outcome.from_fallback).then_some(turn.temperature),
            interaction_row_id: Some(row),
        })
    }

    fn stop_quest(&self, request: &Request) -> EngineResult<Response> {
        self.quests.stop(request.user_id)?;
        Ok(Response {
            text: QUEST_CLEARED.to_string(),
            chaos_value: self.current_chaos(request.timestamp)?,
            temperature_used: None,
            interaction_row_id: None,
        })
    }

    // ── Dice ───────────────────────────────────────────────────────────

    fn roll(&self, request: &Request) -> EngineResult<Response> {
        let turn = self.begin_turn(request.timestamp, Category::Roll)?;
        let Some(spec) = dice::parse(&request.text) else {
            return Ok(Response {
                text: dice::USAGE_HINT.to_string(),
                chaos_value: turn.chaos,
                temperature_used: None,
                interaction_row_id: None,
            });
        };
        let outcome = dice::roll(spec);
        let row =
            self.store.add_interaction(request.user_id, request.timestamp, Category::Roll, 0, 0, request.channel_id)?;
        Ok(Response {
            text: outcome.render(),
            chaos_value: turn.chaos,
            temperature_used: None,
            interaction_row_id: Some(row),
        })
    }

    // ── Continuation ───────────────────────────────────────────────────

    async fn continue_thread(&self, request: &Request) -> EngineResult<Response> {
        let uid = request.user_id;
        let now = request.timestamp;
        let turn = self.begin_turn(now, Category::Other)?;

        let memories = self.curator.top_memories(uid, self.config.memory.prompt_limit)?;
        let quest = self.quests.active(uid)?;
        let system = build_system_prompt(&self.persona, &memories, turn.chaos);
        let user = self.threads.build_continuation(uid, &request.text, quest.as_deref())?;
        let Some(reply) = self.generate(system, user, turn.temperature).await else {
            warn!("[oracle] Continuation for user {} fell back to an apology", uid);
            return Ok(Self::apology(&turn));
        };

        let row = self.store.add_interaction(
            uid,
            now,
            Category::Other,
            reply.prompt_tokens,
            reply.completion_tokens,
            request.channel_id,
        )?;
        let asked = match request.text.trim() {
            "" => "(continue)",
            t => t,
        };
        self.threads.append(uid, &Exchange::new(asked, reply.text.as_str()), now)?;

        Ok(Response {
            text: format!("{}\n\nChaos {:.2} • Temp {:.2}", reply.text, turn.chaos, turn.temperature),
            chaos_value: turn.chaos,
            temperature_used: Some(turn.temperature),
            interaction_row_id: Some(row),
        })
    }

    // ── Read-only views ────────────────────────────────────────────────

    fn stats(&self, request: &Request) -> EngineResult<Response> {
        let stats = self.store.user_stats(request.user_id)?;
        let chaos = self.current_chaos(request.timestamp)?;
        Ok(Response {
            text: format!(
                "📊 Your stats: {} interactions, {} tokens used\n🔥 Today's chaos: {:.2}",
                stats.interactions, stats.tokens, chaos
            ),
            chaos_value: chaos,
            temperature_used: None,
            interaction_row_id: None,
        })
    }

    fn leaderboard_reply(&self, request: &Request) -> EngineResult<Response> {
        let rows = self.analytics.leaderboard(TimeRange::all(), DEFAULT_LEADERBOARD_SIZE)?;
        let text = if rows.is_empty() {
            EMPTY_LEADERBOARD.to_string()
        } else {
            format!("🏆 Leaderboard\n{}", render_leaders(&rows, " rites"))
        };
        Ok(Response {
            text,
            chaos_value: self.current_chaos(request.timestamp)?,
            temperature_used: None,
            interaction_row_id: None,
        })
    }

    // ── Feedback and admin ─────────────────────────────────────────────

    /// Record a vote on an interaction and count it for the local day of `now`.
    /// Votes pass the same admission as requests.
    pub fn rate(&self, interaction_id: i64, rater: UserId, rating: Rating, now: i64) -> EngineResult<Vote> {
        if let Some(rejection) = self.admission(rater, now) {
            return Ok(Vote::Rejected(rejection));
        }
        let day = self.analytics.day_key(now);
        let id = self.store.record_feedback(interaction_id, rater, now, rating, &day).map_err(|e| {
            error!("[oracle] Feedback by user {} on interaction {} failed: {}", rater, interaction_id, e);
            e
        })?;
        debug!("[oracle] User {} rated interaction {} {}", rater, interaction_id, rating.as_str());
        Ok(Vote::Counted(id))
    }

    fn require_admin(&self, user_id: UserId, operation: &str) -> EngineResult<()> {
        if self.access.is_admin(user_id) {
            return Ok(());
        }
        warn!("[oracle] User {} attempted admin operation {}", user_id, operation);
        Err(EngineError::Auth(format!("{} requires the admin user", operation)))
    }

    /// Retune the chaos meter until restart.
    pub fn set_chaos(&self, requester: UserId, settings: ChaosSettings) -> EngineResult<()> {
        self.require_admin(requester, "set_chaos")?;
        self.chaos.retune(settings)?;
        info!("[oracle] Chaos retuned by admin {}", requester);
        Ok(())
    }

    /// Compose today's report on demand. Does not mark the day as reported.
    pub fn report_now(&self, requester: UserId, now: i64) -> EngineResult<DailyReport> {
        self.require_admin(requester, "report_now")?;
        compose_report(&self.analytics, &self.analytics.day_key(now))
    }
}

/// Numbered leaderboard lines; unknown names show as "unknown".
pub fn render_leaders(rows: &[LeaderboardEntry], unit: &str) -> String {
    rows.iter()
        .enumerate()
        .map(|(i, e)| format!("{}. @{}: {}{}", i + 1, e.display_name.as_deref().unwrap_or("unknown"), e.count, unit))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::traits::{Generator, ProviderError};
    use crate::engine::config::EngineConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Queued replies; records every request it sees.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<String>>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl Scripted {
        fn with(replies: &[&str]) -> Arc<Self> {
            Arc::new(Scripted {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
            self.seen.lock().push(request.clone());
            match self.replies.lock().pop_front() {
                Some(text) => Ok(Generation { text, prompt_tokens: 12, completion_tokens: 8 }),
                None => Err(ProviderError::Transport("offline".into())),
            }
        }
    }

    const NOW: i64 = 1_709_269_200;

    fn engine(generator: Arc<Scripted>) -> EngineState {
        let mut config = EngineConfig::default();
        config.admin_user_id = Some(1);
        EngineState::in_memory(config, generator).unwrap()
    }

    fn req(uid: i64, intent: Intent, text: &str, ts: i64) -> Request {
        Request {
            user_id: UserId(uid),
            display_name: Some(format!("user{}", uid)),
            text: text.into(),
            channel_id: Some(-100),
            timestamp: ts,
            intent,
        }
    }

    fn reply(outcome: Outcome) -> Response {
        match outcome {
            Outcome::Reply(r) => r,
            Outcome::Rejected(r) => panic!("unexpected rejection {:?}", r),
        }
    }

    #[tokio::test]
    async fn advice_records_interaction_alignment_and_thread() {
        let g = Scripted::with(&["Make a plan, then burn it."]);
        let e = engine(g.clone());
        let r = reply(e.handle(&req(5, Intent::Advice, "What process should I follow?", NOW)).await.unwrap());
        assert!(r.text.starts_with("Make a plan, then burn it."));
        assert!((r.chaos_value - 0.515).abs() < 1e-9);
        assert!(r.interaction_row_id.is_some());
        assert_eq!(e.store.get_user(UserId(5)).unwrap().unwrap().alignment.as_str(), "LAW");
        assert_eq!(e.threads.window(UserId(5)).unwrap().len(), 1);
        assert_eq!(e.analytics.snapshot(&e.analytics.day_key(NOW)).unwrap().advice_count, 1);
    }

    #[tokio::test]
    async fn failed_advice_apologizes_without_a_row() {
        let e = engine(Scripted::with(&[]));
        let r = reply(e.handle(&req(5, Intent::Advice, "help", NOW)).await.unwrap());
        assert_eq!(r.text, GENERATION_APOLOGY);
        assert_eq!(r.interaction_row_id, None);
        assert_eq!(e.store.user_stats(UserId(5)).unwrap().interactions, 0);
        assert_eq!(e.analytics.todays_interactions(NOW).unwrap(), 1);
    }

    #[tokio::test]
    async fn long_question_becomes_a_note() {
        let e = engine(Scripted::with(&["Sure."]));
        let long = "word ".repeat(60);
        e.handle(&req(5, Intent::Advice, &long, NOW)).await.unwrap();
        let mems = e.store.top_memories(UserId(5), 10).unwrap();
        assert_eq!(mems.len(), 1);
        assert_eq!(mems[0].tag, MemoryTag::Note);
        assert_eq!(mems[0].importance, NOTE_MEMORY_IMPORTANCE);
        assert!(mems[0].text.chars().count() <= NOTE_MAX_CHARS);
    }

    #[tokio::test]
    async fn empty_advice_without_quest_is_a_hint() {
        let g = Scripted::with(&["unused"]);
        let e = engine(g.clone());
        let r = reply(e.handle(&req(5, Intent::Advice, "  ", NOW)).await.unwrap());
        assert_eq!(r.text, EMPTY_ADVICE_HINT);
        assert!(g.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn roll_counts_and_records_zero_tokens() {
        let e = engine(Scripted::with(&[]));
        let r = reply(e.handle(&req(5, Intent::Roll, "3d6", NOW)).await.unwrap());
        assert!(r.text.starts_with("🎲 Rolls: ["));
        assert!(r.interaction_row_id.is_some());
        let bad = reply(e.handle(&req(5, Intent::Roll, "lots", NOW + 1)).await.unwrap());
        assert_eq!(bad.text, dice::USAGE_HINT);
        assert_eq!(bad.interaction_row_id, None);
        let snap = e.analytics.snapshot(&e.analytics.day_key(NOW)).unwrap();
        assert_eq!(snap.roll_count, 2);
        assert_eq!(e.store.user_stats(UserId(5)).unwrap(), crate::atoms::types::UserStats { interactions: 1, tokens: 0 });
    }

    #[tokio::test]
    async fn continue_uses_thread_and_counts_as_other() {
        let g = Scripted::with(&["Bribe the troll.", "With cheese."]);
        let e = engine(g.clone());
        e.handle(&req(5, Intent::Advice, "How do I cross the bridge?", NOW)).await.unwrap();
        let r = reply(e.handle(&req(5, Intent::Continue, "With what?", NOW + 5)).await.unwrap());
        assert!(r.text.starts_with("With cheese."));
        let ctx = g.seen.lock()[1].user_context.clone();
        assert!(ctx.contains("Oracle: Bribe the troll."));
        assert!(ctx.contains("Follow-up: \"With what?\""));
        let snap = e.analytics.snapshot(&e.analytics.day_key(NOW)).unwrap();
        assert_eq!((snap.interactions, snap.advice_count), (2, 1));
        assert_eq!(e.threads.window(UserId(5)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stats_and_leaderboard_views() {
        let e = engine(Scripted::with(&["a", "b"]));
        e.handle(&req(5, Intent::Advice, "one", NOW)).await.unwrap();
        e.handle(&req(6, Intent::Advice, "two", NOW)).await.unwrap();
        e.handle(&req(5, Intent::Roll, "d20", NOW)).await.unwrap();

        let stats = reply(e.handle(&req(5, Intent::Stats, "", NOW)).await.unwrap());
        assert!(stats.text.contains("2 interactions, 20 tokens used"));

        let board = reply(e.handle(&req(7, Intent::Leaderboard, "", NOW)).await.unwrap());
        assert_eq!(board.text, "🏆 Leaderboard\n1. @user5: 2 rites\n2. @user6: 1 rites");
    }

    #[tokio::test]
    async fn empty_leaderboard_says_so() {
        let e = engine(Scripted::with(&[]));
        let board = reply(e.handle(&req(7, Intent::Leaderboard, "", NOW)).await.unwrap());
        assert_eq!(board.text, EMPTY_LEADERBOARD);
    }

    #[tokio::test]
    async fn rating_counts_votes_for_the_day() {
        let e = engine(Scripted::with(&["ok"]));
        let r = reply(e.handle(&req(5, Intent::Advice, "q", NOW)).await.unwrap());
        let row = r.interaction_row_id.unwrap();
        assert!(matches!(e.rate(row, UserId(6), Rating::Up, NOW + 10).unwrap(), Vote::Counted(_)));
        assert!(matches!(e.rate(row, UserId(7), Rating::Down, NOW + 20).unwrap(), Vote::Counted(_)));
        assert!(e.rate(row + 100, UserId(7), Rating::Down, NOW).is_err());
        let snap = e.analytics.snapshot(&e.analytics.day_key(NOW)).unwrap();
        assert_eq!((snap.upvotes, snap.downvotes), (1, 1));
    }

    #[tokio::test]
    async fn admin_operations_need_the_admin() {
        let e = engine(Scripted::with(&[]));
        let tuned = ChaosSettings { base: 0.9, slope: 0.0, ceiling: 1.0 };
        assert!(matches!(e.set_chaos(UserId(2), tuned), Err(EngineError::Auth(_))));
        assert!(matches!(e.report_now(UserId(2), NOW), Err(EngineError::Auth(_))));

        e.set_chaos(UserId(1), tuned).unwrap();
        let stats = reply(e.handle(&req(5, Intent::Stats, "", NOW)).await.unwrap());
        assert!((stats.chaos_value - 0.9).abs() < 1e-9);
        assert!(e.report_now(UserId(1), NOW).is_ok());
    }

    #[tokio::test]
    async fn allowlist_rejects_strangers_before_rate_limit() {
        let mut config = EngineConfig::default();
        config.access.policy = crate::engine::config::AccessPolicyKind::Allowlist;
        config.access.allowed_users = vec![5];
        let e = EngineState::in_memory(config, Scripted::with(&[])).unwrap();
        let out = e.handle(&req(9, Intent::Stats, "", NOW)).await.unwrap();
        assert_eq!(out, Outcome::Rejected(Rejection::AccessDenied));
        assert_eq!(e.limiter.tracked_users(), 0);
        assert!(matches!(e.handle(&req(5, Intent::Stats, "", NOW)).await.unwrap(), Outcome::Reply(_)));
    }

    #[tokio::test]
    async fn votes_pass_access_and_rate_limit() {
        let mut config = EngineConfig::default();
        config.access.policy = crate::engine::config::AccessPolicyKind::Allowlist;
        config.access.allowed_users = vec![5];
        config.rate_limit.max_requests = 2;
        let e = EngineState::in_memory(config, Scripted::with(&["ok"])).unwrap();
        let row = reply(e.handle(&req(5, Intent::Advice, "q", NOW)).await.unwrap()).interaction_row_id.unwrap();

        assert_eq!(e.handle(&req(9, Intent::Stats, "", NOW)).await.unwrap(), Outcome::Rejected(Rejection::AccessDenied));
        for i in 0..50 {
            assert_eq!(e.rate(row, UserId(9), Rating::Down, NOW + i).unwrap(), Vote::Rejected(Rejection::AccessDenied));
        }
        assert!(matches!(e.rate(row, UserId(5), Rating::Up, NOW + 1).unwrap(), Vote::Counted(_)));
        assert_eq!(e.rate(row, UserId(5), Rating::Up, NOW + 2).unwrap(), Vote::Rejected(Rejection::RateLimited));

        let snap = e.analytics.snapshot(&e.analytics.day_key(NOW)).unwrap();
        assert_eq!((snap.upvotes, snap.downvotes), (1, 0));
        assert_eq!(e.store.count_feedback(row).unwrap(), (1, 0));
    }

    #[tokio::test]
    async fn storage_failure_reaches_the_caller() {
        let e = engine(Scripted::with(&["fine advice"]));
        e.store.conn.lock().execute_batch("DROP TABLE interactions").unwrap();

        let err = e.handle(&req(5, Intent::Advice, "where is the exit?", NOW)).await.unwrap_err();
        assert!(matches!(err, EngineError::Database(_)));
        let shown = err.user_message();
        assert!(!shown.contains("interactions"));
        assert!(!shown.contains("no such table"));
        assert!(e.threads.window(UserId(5)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_quest_install_frees_the_hook() {
        let e = engine(Scripted::with(&["The lantern hums at midnight."]));
        e.store.conn.lock().execute_batch("DROP TABLE memories").unwrap();

        let err = e.handle(&req(5, Intent::Quest, "", NOW)).await.unwrap_err();
        assert!(matches!(err, EngineError::Database(_)));
        assert!(!e.quests.recent_hooks().contains("the lantern hums at midnight."));
        assert_eq!(e.quests.active(UserId(5)).unwrap(), None);
    }
}
