// Dungeon Oracle — Engagement State Engine
// Per-user admission, chaos, curated memory, quests and continuation
// threads, plus the cross-user daily analytics and report, all backed by a
// single SQLite store.

pub mod access;
pub mod alignment;
pub mod analytics;
pub mod chaos;
pub mod config;
pub mod curator;
pub mod dice;
pub mod oracle;
pub mod prompts;
pub mod providers;
pub mod quests;
pub mod rate_limit;
pub mod report;
pub mod sanitize;
pub mod sessions;
pub mod state;
pub mod threads;
