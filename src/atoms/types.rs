// ── Oracle Atoms: Data Types ───────────────────────────────────────────────
// Plain data that flows between the transport, the engine and the store.
// No I/O, no locking — everything here is Clone + serde.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Identity ───────────────────────────────────────────────────────────────

/// Opaque user identity as handed over by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[serde(rename = "LAW")]
    Lawful,
    #[serde(rename = "CHA")]
    Chaotic,
    #[serde(rename = "NEU")]
    Neutral,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Lawful => "LAW",
            Alignment::Chaotic => "CHA",
            Alignment::Neutral => "NEU",
        }
    }

    /// Unknown stored values read back as neutral.
    pub fn parse(s: &str) -> Self {
        match s {
            "LAW" => Alignment::Lawful,
            "CHA" => Alignment::Chaotic,
            _ => Alignment::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub first_seen: i64,
    pub last_seen: i64,
    pub alignment: Alignment,
}

// ── Interactions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Advice,
    Quest,
    Roll,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Advice => "advice",
            Category::Quest => "quest",
            Category::Roll => "roll",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "advice" => Category::Advice,
            "quest" => Category::Quest,
            "roll" => Category::Roll,
            _ => Category::Other,
        }
    }
}

/// Append-only usage record. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: i64,
    pub user_id: UserId,
    pub ts: i64,
    pub category: Category,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub channel_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Up => "up",
            Rating::Down => "down",
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────────────────

/// Explicit snippet kind; quest breadcrumbs are retracted by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTag {
    Quest,
    Note,
}

impl MemoryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTag::Quest => "quest",
            MemoryTag::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "quest" => MemoryTag::Quest,
            _ => MemoryTag::Note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnippet {
    pub id: i64,
    pub user_id: UserId,
    pub ts: i64,
    pub text: String,
    pub importance: u8,
    pub tag: MemoryTag,
}

// ── Continuation ───────────────────────────────────────────────────────────

/// One (request, response) pair of a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub response: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, response: impl Into<String>) -> Self {
        Exchange { user: user.into(), response: response.into() }
    }
}

// ── Analytics ──────────────────────────────────────────────────────────────

/// Counters for one local calendar day. Missing days read as all-zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub day: String,
    pub interactions: i64,
    pub advice_count: i64,
    pub quest_count: i64,
    pub roll_count: i64,
    /// Cache of the last recomputation; see `Analytics::refresh_unique_users`.
    pub unique_users: i64,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub count: i64,
}

/// Half-open unix-second range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        TimeRange { start, end }
    }

    pub fn all() -> Self {
        TimeRange { start: i64::MIN, end: i64::MAX }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub interactions: i64,
    pub tokens: i64,
}

// ── Transport boundary ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Advice,
    Quest,
    Roll,
    Continue,
    Stop,
    Stats,
    Leaderboard,
}

/// Normalized inbound request. The transport strips the command word;
/// `text` holds only the arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub text: String,
    pub channel_id: Option<i64>,
    pub timestamp: i64,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    pub chaos_value: f64,
    pub temperature_used: Option<f64>,
    /// Row to attach feedback buttons to, when one was recorded.
    pub interaction_row_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    AccessDenied,
    RateLimited,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::AccessDenied => "access_denied",
            Rejection::RateLimited => "rate_limited",
        }
    }

    /// In-character text for the transport to show.
    pub fn user_message(&self) -> &'static str {
        match self {
            Rejection::AccessDenied => "⛔ The Oracle does not know your face. Ask the Dungeon Keeper for an invitation.",
            Rejection::RateLimited => "⏳ Easy, adventurer. The Oracle needs a breather before your next question.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Reply(Response),
    Rejected(Rejection),
}

/// Result of a vote: the feedback row id, or why it was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Counted(i64),
    Rejected(Rejection),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_known_names() {
        for c in [Category::Advice, Category::Quest, Category::Roll, Category::Other] {
            assert_eq!(Category::parse(c.as_str()), c);
        }
        assert_eq!(Category::parse("banana"), Category::Other);
    }

    #[test]
    fn alignment_unknown_is_neutral() {
        assert_eq!(Alignment::parse("???"), Alignment::Neutral);
        assert_eq!(Alignment::parse("LAW"), Alignment::Lawful);
    }

    #[test]
    fn rejection_wire_names() {
        assert_eq!(Rejection::AccessDenied.as_str(), "access_denied");
        assert_eq!(
            serde_json::to_string(&Rejection::RateLimited).unwrap(),
            "\"rate_limited\""
        );
    }
}
