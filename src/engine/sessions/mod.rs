// Dungeon Oracle — Durable Store
// Users, interactions, memories, feedback, daily counters and per-user
// session state in SQLite via rusqlite.
//
// Module layout:
//   schema       — idempotent migrations
//   users        — user upsert, alignment, per-user stats
//   interactions — append-only interaction log, unique users, leaderboard
//   memories     — tagged memory snippets, ranking, pruning
//   user_state   — typed per-user slots (active quest, thread)
//   quests       — transactional quest install / clear
//   counters     — daily counters upserts + snapshot
//   feedback     — vote records
//   config       — key/value engine config store
//
// Every method takes the connection lock for its whole body, so each call is
// atomic with respect to every other call. Multi-statement mutations run in
// one transaction.

use crate::atoms::error::EngineResult;
use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

mod config;
mod counters;
mod feedback;
mod interactions;
mod memories;
mod quests;
mod schema;
mod user_state;
mod users;

pub use quests::QuestInstall;

/// Thread-safe database wrapper.
pub struct SessionStore {
    /// The SQLite connection, protected by a Mutex.
    pub conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (or create) the database at `path` and initialize tables.
    pub fn open(path: &Path) -> EngineResult<Self> {
        info!("[store] Opening session store at {:?}", path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> EngineResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::run_migrations(&conn)?;
        Ok(SessionStore { conn: Mutex::new(conn) })
    }
}
