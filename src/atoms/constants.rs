// ── Oracle Atoms: Constants ────────────────────────────────────────────────
// All named constants for the crate live here.
// Config defaults are duplicated into `EngineConfig::default()` through the
// serde default functions in engine/config.rs, never as literals.

// ── Rate limiting ──────────────────────────────────────────────────────────
pub const DEFAULT_RATE_WINDOW_SECS: i64 = 60;
pub const DEFAULT_RATE_MAX_REQUESTS: usize = 6;
/// Bucket map size above which idle buckets are swept on admission.
pub(crate) const RATE_SWEEP_THRESHOLD: usize = 1024;

// ── Chaos meter ────────────────────────────────────────────────────────────
pub const CHAOS_FLOOR: f64 = 0.2;
pub const DEFAULT_CHAOS_BASE: f64 = 0.5;
pub const DEFAULT_CHAOS_SLOPE: f64 = 0.015;
pub const DEFAULT_CHAOS_CEILING: f64 = 1.3;
pub const DEFAULT_SYSTEM_TEMPERATURE: f64 = 0.7;
pub const TEMPERATURE_MIN: f64 = 0.2;
pub const TEMPERATURE_MAX: f64 = 1.5;
/// Chaos value at which the generation temperature equals the system temperature.
pub const CHAOS_NEUTRAL: f64 = 0.5;

// ── Memory curation ────────────────────────────────────────────────────────
pub const DEFAULT_MEMORY_CAP: usize = 50;
pub const DEFAULT_MEMORY_PROMPT_LIMIT: usize = 5;
pub const QUEST_MEMORY_IMPORTANCE: u8 = 3;
pub const NOTE_MEMORY_IMPORTANCE: u8 = 2;
/// Questions longer than this are kept as a note for later callbacks.
pub const NOTE_MIN_QUESTION_CHARS: usize = 80;
pub const NOTE_MAX_CHARS: usize = 180;
pub const QUEST_MEMORY_PREFIX: &str = "Active quest:";

// ── Quests ─────────────────────────────────────────────────────────────────
pub const DEFAULT_HOOK_WINDOW: usize = 20;
/// Regeneration attempts after the first duplicate hook.
pub const HOOK_REGENERATE_ATTEMPTS: usize = 2;

// ── Continuation threads ───────────────────────────────────────────────────
pub const DEFAULT_THREAD_LENGTH: usize = 3;

// ── Analytics / reports ────────────────────────────────────────────────────
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_DAILY_REPORT_HOUR: u32 = 23;
pub const REPORT_LEADERBOARD_SIZE: usize = 5;
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

// ── Generation ─────────────────────────────────────────────────────────────
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";

// ── engine_config keys ─────────────────────────────────────────────────────
// Stable identifiers: renaming either orphans the stored value.
pub(crate) const LAST_REPORT_DAY_KEY: &str = "last_report_day";
pub(crate) const RECENT_HOOKS_KEY: &str = "recent_hooks";

// ── Dice ───────────────────────────────────────────────────────────────────
pub const DICE_MAX_COUNT: u32 = 20;
pub const DICE_MIN_FACES: u32 = 2;
pub const DICE_MAX_FACES: u32 = 1000;
