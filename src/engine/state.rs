// engine/state.rs — Shared engine state.
// One `EngineState` per process, shared behind an `Arc` by the transport and
// the report scheduler. Every component is an owned, injectable instance;
// nothing lives in a global.

use crate::atoms::constants::QUEST_MEMORY_IMPORTANCE;
use crate::atoms::error::EngineResult;
use crate::atoms::traits::Generator;
use crate::engine::access::AccessPolicy;
use crate::engine::analytics::Analytics;
use crate::engine::chaos::ChaosMeter;
use crate::engine::config::EngineConfig;
use crate::engine::curator::MemoryCurator;
use crate::engine::prompts::Persona;
use crate::engine::providers::OpenAiGenerator;
use crate::engine::quests::QuestMachine;
use crate::engine::rate_limit::RateLimiter;
use crate::engine::sessions::SessionStore;
use crate::engine::threads::ThreadManager;
use log::{info, warn};
use std::sync::Arc;

pub struct EngineState {
    pub config: EngineConfig,
    pub store: Arc<SessionStore>,
    pub access: AccessPolicy,
    pub limiter: RateLimiter,
    /// Runtime-tunable by the admin; reset to `config.chaos` on restart.
    pub chaos: ChaosMeter,
    pub curator: MemoryCurator,
    pub quests: QuestMachine,
    pub threads: ThreadManager,
    pub analytics: Analytics,
    pub persona: Persona,
    pub generator: Arc<dyn Generator>,
}

impl EngineState {
    /// Wire every component around an already-open store.
    pub fn new(
        config: EngineConfig,
        store: Arc<SessionStore>,
        generator: Arc<dyn Generator>,
        persona: Persona,
    ) -> EngineResult<Self> {
        config.validate()?;
        let tz = config.tz()?;

        Ok(EngineState {
            access: AccessPolicy::new(&config.access, config.admin_user_id),
            limiter: RateLimiter::new(config.rate_limit.window_secs, config.rate_limit.max_requests),
            chaos: ChaosMeter::new(config.chaos)?,
            curator: MemoryCurator::new(store.clone(), config.memory.cap),
            quests: QuestMachine::new(store.clone(), config.hook_window, config.memory.cap, QUEST_MEMORY_IMPORTANCE),
            threads: ThreadManager::new(store.clone(), config.thread_length),
            analytics: Analytics::new(store.clone(), tz),
            store,
            persona,
            generator,
            config,
        })
    }

    /// Open the database at `config.db_path` and use the OpenAI-compatible
    /// generator and the configured persona.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        let store = Arc::new(SessionStore::open(&config.db_path)?);
        if config.provider.api_key.is_empty() {
            warn!("[oracle] No provider API key set; generation calls will fail and quests use fallbacks");
        }
        let generator: Arc<dyn Generator> =
            Arc::new(OpenAiGenerator::new(&config.provider, config.generation_timeout())?);
        let persona = Persona::load_or_default(config.persona_path.as_deref())?;
        info!(
            "[oracle] Engine ready: db={} tz={} model={}",
            config.db_path.display(),
            config.timezone,
            config.provider.model
        );
        Self::new(config, store, generator, persona)
    }

    /// In-memory store, for tests and dry runs.
    pub fn in_memory(config: EngineConfig, generator: Arc<dyn Generator>) -> EngineResult<Self> {
        let store = Arc::new(SessionStore::open_in_memory()?);
        Self::new(config, store, generator, Persona::default())
    }
}
