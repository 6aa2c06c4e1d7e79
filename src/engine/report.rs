// Dungeon Oracle — Daily Report
//
// compose_report(day): refresh the unique-user cache from the interaction
// log, then read the day's counters and top heroes.
//
// ReportScheduler: one tokio task that sleeps until the next
// `daily_report_hour`:00 local time, fires, and repeats. A boundary missed
// while the process was down is not caught up. `engine_config
// ["last_report_day"]` is written after a successful delivery, so a
// restart inside the same day never sends twice.

use crate::atoms::constants::{LAST_REPORT_DAY_KEY, REPORT_LEADERBOARD_SIZE};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{DailySnapshot, LeaderboardEntry};
use crate::engine::analytics::{local_instant, Analytics};
use crate::engine::oracle::render_leaders;
use crate::engine::state::EngineState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub snapshot: DailySnapshot,
    pub leaders: Vec<LeaderboardEntry>,
}

impl DailyReport {
    pub fn day(&self) -> &str {
        &self.snapshot.day
    }

    pub fn render(&self, bot_name: &str) -> String {
        let s = &self.snapshot;
        let leaders = if self.leaders.is_empty() { "none yet".to_string() } else { render_leaders(&self.leaders, "") };
        format!(
            "📮 {} Daily Report: {}\n\
             Interactions: {}\n\
             Users: {}\n\
             Advice: {} | Quests: {} | Rolls: {}\n\
             Votes: 👍 {} / 👎 {}\n\n\
             Top heroes:\n{}",
            bot_name,
            s.day,
            s.interactions,
            s.unique_users,
            s.advice_count,
            s.quest_count,
            s.roll_count,
            s.upvotes,
            s.downvotes,
            leaders
        )
    }
}

pub fn compose_report(analytics: &Analytics, day: &str) -> EngineResult<DailyReport> {
    analytics.refresh_unique_users(day)?;
    let snapshot = analytics.snapshot(day)?;
    let leaders = analytics.leaderboard(analytics.day_bounds(day)?, REPORT_LEADERBOARD_SIZE)?;
    Ok(DailyReport { snapshot, leaders })
}

/// First `hour`:00 local time strictly after `now`.
pub fn next_report_at(now: i64, tz: &Tz, hour: u32) -> i64 {
    let today = DateTime::<Utc>::from_timestamp(now, 0).unwrap_or_default().with_timezone(tz).date_naive();
    let mut date = today;
    for _ in 0..3 {
        let candidate = local_instant(tz, date, hour);
        if candidate > now {
            return candidate;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    now + 24 * 3600
}

/// Where finished reports go (admin chat, log, webhook...).
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &DailyReport, text: &str) -> EngineResult<()>;
}

/// Writes reports to the log.
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn deliver(&self, report: &DailyReport, text: &str) -> EngineResult<()> {
        info!("[report] Report for {}:\n{}", report.day(), text);
        Ok(())
    }
}

/// Compose and deliver the report for the local day of `at`, unless that
/// day was already reported. Returns whether a report went out.
pub async fn fire_if_due(state: &EngineState, sink: &dyn ReportSink, at: i64) -> EngineResult<bool> {
    let day = state.analytics.day_key(at);
    if state.store.get_config(LAST_REPORT_DAY_KEY)?.as_deref() == Some(day.as_str()) {
        info!("[report] {} already reported, skipping", day);
        return Ok(false);
    }
    let report = compose_report(&state.analytics, &day)?;
    let text = report.render(&state.config.bot_name);
    sink.deliver(&report, &text).await?;
    state.store.set_config(LAST_REPORT_DAY_KEY, &day)?;
    info!("[report] Delivered report for {}", day);
    Ok(true)
}

pub struct ReportScheduler {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReportScheduler {
    pub fn spawn(state: Arc<EngineState>, sink: Arc<dyn ReportSink>) -> Self {
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let tz = state.analytics.tz();
            let hour = state.config.daily_report_hour;
            loop {
                let now = Utc::now().timestamp();
                let target = next_report_at(now, &tz, hour);
                let wait = Duration::from_secs((target - now).max(0) as u64);
                info!("[report] Next daily report in {}s", wait.as_secs());

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = &mut stop_rx => {
                        info!("[report] Scheduler stopped");
                        return;
                    }
                }

                if let Err(e) = fire_if_due(&state, sink.as_ref(), target).await {
                    error!("[report] Daily report failed: {}", e);
                }
            }
        });
        ReportScheduler { stop, task }
    }

    /// Stop the timer and wait for the task to end. A report already
    /// being delivered finishes first.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            error!("[report] Scheduler task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::traits::{Generation, GenerationRequest, Generator, ProviderError};
    use crate::atoms::types::{Category, UserId};
    use crate::engine::config::EngineConfig;
    use chrono_tz::America::Los_Angeles;
    use parking_lot::Mutex;

    struct Offline;

    #[async_trait]
    impl Generator for Offline {
        fn name(&self) -> &str {
            "offline"
        }
        async fn generate(&self, _r: &GenerationRequest) -> Result<Generation, ProviderError> {
            Err(ProviderError::Transport("offline".into()))
        }
    }

    #[derive(Default)]
    struct Collecting(Mutex<Vec<String>>);

    #[async_trait]
    impl ReportSink for Collecting {
        async fn deliver(&self, _report: &DailyReport, text: &str) -> EngineResult<()> {
            self.0.lock().push(text.to_string());
            Ok(())
        }
    }

    // 2024-02-29 22:00 in Los Angeles.
    const LA_2200: i64 = 1_709_272_800;

    fn state() -> EngineState {
        EngineState::in_memory(EngineConfig::default(), Arc::new(Offline)).unwrap()
    }

    #[test]
    fn next_report_is_later_today_or_tomorrow() {
        assert_eq!(next_report_at(LA_2200, &Los_Angeles, 23), LA_2200 + 3600);
        assert_eq!(next_report_at(LA_2200 + 5400, &Los_Angeles, 23), LA_2200 + 3600 + 24 * 3600);
        // exactly on the boundary moves to the next day
        assert_eq!(next_report_at(LA_2200 + 3600, &Los_Angeles, 23), LA_2200 + 3600 + 24 * 3600);
    }

    #[test]
    fn compose_counts_the_day() {
        let s = state();
        let day = s.analytics.day_key(LA_2200);
        for uid in [1, 2] {
            s.store.upsert_user(UserId(uid), Some(format!("hero{}", uid).as_str()), LA_2200).unwrap();
            s.analytics.increment(&day, Category::Advice).unwrap();
            s.store.add_interaction(UserId(uid), LA_2200, Category::Advice, 1, 1, None).unwrap();
        }
        s.store.add_interaction(UserId(2), LA_2200 + 1, Category::Roll, 0, 0, None).unwrap();

        let report = compose_report(&s.analytics, &day).unwrap();
        assert_eq!(report.snapshot.unique_users, 2);
        assert_eq!(report.leaders[0].user_id, UserId(2));
        let text = report.render("Dungeon AI Bot");
        assert!(text.starts_with("📮 Dungeon AI Bot Daily Report: 2024-02-29"));
        assert!(text.contains("Users: 2"));
        assert!(text.ends_with("1. @hero2: 2\n2. @hero1: 1"));
    }

    #[tokio::test]
    async fn fires_once_per_day() {
        let s = state();
        let sink = Collecting::default();
        assert!(fire_if_due(&s, &sink, LA_2200).await.unwrap());
        assert!(!fire_if_due(&s, &sink, LA_2200 + 600).await.unwrap());
        assert!(fire_if_due(&s, &sink, LA_2200 + 24 * 3600).await.unwrap());
        assert_eq!(sink.0.lock().len(), 2);
    }

    #[tokio::test]
    async fn scheduler_stops_promptly() {
        let s = Arc::new(state());
        let scheduler = ReportScheduler::spawn(s, Arc::new(LogSink));
        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown()).await.unwrap();
    }
}
