// Dungeon Oracle — Engine Configuration
// Layering: built-in defaults < optional TOML file < environment variables.
// `EngineConfig::load` applies all three and validates the result; an
// invalid value is a startup error, never silently replaced.

use crate::atoms::constants::{
    DEFAULT_DAILY_REPORT_HOUR, DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_HOOK_WINDOW, DEFAULT_MEMORY_CAP,
    DEFAULT_MEMORY_PROMPT_LIMIT, DEFAULT_MODEL, DEFAULT_PROVIDER_BASE_URL, DEFAULT_RATE_MAX_REQUESTS,
    DEFAULT_RATE_WINDOW_SECS, DEFAULT_SYSTEM_TEMPERATURE, DEFAULT_THREAD_LENGTH, DEFAULT_TIMEZONE,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::chaos::ChaosSettings;
use chrono_tz::Tz;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BOT_NAME: &str = "Dungeon AI Bot";

// ── Sections ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicyKind {
    #[default]
    Open,
    Allowlist,
}

impl FromStr for AccessPolicyKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(AccessPolicyKind::Open),
            "allowlist" => Ok(AccessPolicyKind::Allowlist),
            other => Err(EngineError::Config(format!("unknown access policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub policy: AccessPolicyKind,
    pub allowed_users: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: i64,
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig { window_secs: DEFAULT_RATE_WINDOW_SECS, max_requests: DEFAULT_RATE_MAX_REQUESTS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Snippets kept per user after each insertion.
    pub cap: usize,
    /// Snippets replayed into an advice prompt.
    pub prompt_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig { cap: DEFAULT_MEMORY_CAP, prompt_limit: DEFAULT_MEMORY_PROMPT_LIMIT }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

// The key stays out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

// ── EngineConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    /// IANA zone that defines the reporting day.
    pub timezone: String,
    pub bot_name: String,
    pub admin_user_id: Option<i64>,
    pub access: AccessConfig,
    pub rate_limit: RateLimitConfig,
    pub chaos: ChaosSettings,
    pub system_temperature: f64,
    pub memory: MemoryConfig,
    pub thread_length: usize,
    pub hook_window: usize,
    /// Local hour (0-23) the daily report fires.
    pub daily_report_hour: u32,
    pub generation_timeout_secs: u64,
    pub provider: ProviderConfig,
    /// Optional persona JSON; the built-in persona is used when absent.
    pub persona_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            db_path: default_db_path(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            bot_name: DEFAULT_BOT_NAME.to_string(),
            admin_user_id: None,
            access: AccessConfig::default(),
            rate_limit: RateLimitConfig::default(),
            chaos: ChaosSettings::default(),
            system_temperature: DEFAULT_SYSTEM_TEMPERATURE,
            memory: MemoryConfig::default(),
            thread_length: DEFAULT_THREAD_LENGTH,
            hook_window: DEFAULT_HOOK_WINDOW,
            daily_report_hour: DEFAULT_DAILY_REPORT_HOUR,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            provider: ProviderConfig::default(),
            persona_path: None,
        }
    }
}

/// `<data_dir>/dungeon-oracle/oracle.db`, or the working directory when the
/// platform has no data dir.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dungeon-oracle")
        .join("oracle.db")
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> EngineResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| EngineError::Config(format!("{}='{}' is not a valid value", key, raw)))
}

impl EngineConfig {
    /// Defaults, then `path` if given and present, then the process env.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                info!("[config] Loaded {}", p.display());
                Self::from_toml(&raw)?
            }
            Some(p) => {
                debug!("[config] {} not found, using defaults", p.display());
                EngineConfig::default()
            }
            None => EngineConfig::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> EngineResult<Self> {
        Ok(toml::from_str::<EngineConfig>(raw)?)
    }

    /// Overlay values from `lookup` (the process env in production).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> EngineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TIMEZONE") {
            self.timezone = v.trim().to_string();
        }
        if let Some(v) = lookup("BOT_NAME") {
            self.bot_name = v;
        }
        if let Some(v) = lookup("ADMIN_USER_ID") {
            self.admin_user_id = Some(parse_env("ADMIN_USER_ID", &v)?);
        }
        if let Some(v) = lookup("ACCESS_POLICY") {
            self.access.policy = v.parse()?;
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = parse_env("RATE_LIMIT_WINDOW_SECS", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_env("RATE_LIMIT_MAX_REQUESTS", &v)?;
        }
        if let Some(v) = lookup("CHAOS_BASE") {
            self.chaos.base = parse_env("CHAOS_BASE", &v)?;
        }
        if let Some(v) = lookup("CHAOS_SLOPE") {
            self.chaos.slope = parse_env("CHAOS_SLOPE", &v)?;
        }
        if let Some(v) = lookup("CHAOS_MAX") {
            self.chaos.ceiling = parse_env("CHAOS_MAX", &v)?;
        }
        if let Some(v) = lookup("SYSTEM_TEMPERATURE") {
            self.system_temperature = parse_env("SYSTEM_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("MEMORY_CAP_PER_USER") {
            self.memory.cap = parse_env("MEMORY_CAP_PER_USER", &v)?;
        }
        if let Some(v) = lookup("MAX_HISTORY_PER_USER") {
            self.memory.prompt_limit = parse_env("MAX_HISTORY_PER_USER", &v)?;
        }
        if let Some(v) = lookup("THREAD_LENGTH") {
            self.thread_length = parse_env("THREAD_LENGTH", &v)?;
        }
        if let Some(v) = lookup("HOOK_WINDOW") {
            self.hook_window = parse_env("HOOK_WINDOW", &v)?;
        }
        if let Some(v) = lookup("DAILY_REPORT_HOUR") {
            self.daily_report_hour = parse_env("DAILY_REPORT_HOUR", &v)?;
        }
        if let Some(v) = lookup("GENERATION_TIMEOUT_SECS") {
            self.generation_timeout_secs = parse_env("GENERATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.provider.base_url = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL") {
            self.provider.model = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.provider.api_key = v;
        }
        if let Some(v) = lookup("PERSONA_PATH") {
            self.persona_path = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.tz()?;
        if self.daily_report_hour >= 24 {
            return Err(EngineError::Config(format!("daily_report_hour {} is not 0-23", self.daily_report_hour)));
        }
        if self.rate_limit.window_secs <= 0 || self.rate_limit.max_requests == 0 {
            return Err(EngineError::Config("rate limit window and max_requests must be positive".into()));
        }
        if self.thread_length == 0 || self.hook_window == 0 || self.memory.cap == 0 {
            return Err(EngineError::Config("thread_length, hook_window and memory.cap must be positive".into()));
        }
        if self.generation_timeout_secs == 0 {
            return Err(EngineError::Config("generation_timeout_secs must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.system_temperature) {
            return Err(EngineError::Config(format!(
                "system_temperature {} is outside 0.0-2.0",
                self.system_temperature
            )));
        }
        self.chaos.validate()
    }

    pub fn tz(&self) -> EngineResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| EngineError::Config(format!("unknown timezone '{}'", self.timezone)))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}
