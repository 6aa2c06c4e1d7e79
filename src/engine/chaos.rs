// Dungeon Oracle — Chaos Meter
// Maps today's interaction count to a bounded intensity score and derives
// the generation temperature from it. The settings are tunable at runtime
// by an operator and are not persisted.

use crate::atoms::constants::{
    CHAOS_FLOOR, CHAOS_NEUTRAL, DEFAULT_CHAOS_BASE, DEFAULT_CHAOS_CEILING, DEFAULT_CHAOS_SLOPE,
    TEMPERATURE_MAX, TEMPERATURE_MIN,
};
use crate::atoms::error::{EngineError, EngineResult};
use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosSettings {
    pub base: f64,
    pub slope: f64,
    pub ceiling: f64,
}

impl Default for ChaosSettings {
    fn default() -> Self {
        ChaosSettings { base: DEFAULT_CHAOS_BASE, slope: DEFAULT_CHAOS_SLOPE, ceiling: DEFAULT_CHAOS_CEILING }
    }
}

impl ChaosSettings {
    /// Slope must be non-negative (monotonic meter) and the ceiling may not
    /// sit below the fixed floor.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.base.is_finite() && self.slope.is_finite() && self.ceiling.is_finite()) {
            return Err(EngineError::Config("chaos settings must be finite numbers".into()));
        }
        if self.slope < 0.0 {
            return Err(EngineError::Config(format!("chaos slope {} is negative", self.slope)));
        }
        if self.ceiling < CHAOS_FLOOR {
            return Err(EngineError::Config(format!(
                "chaos ceiling {} is below the floor {}",
                self.ceiling, CHAOS_FLOOR
            )));
        }
        Ok(())
    }

    /// `clamp(base + slope * count, floor, ceiling)`.
    pub fn score(&self, todays_interactions: i64) -> f64 {
        let raw = self.base + self.slope * todays_interactions.max(0) as f64;
        raw.clamp(CHAOS_FLOOR, self.ceiling)
    }
}

/// `clamp(system_temperature + (chaos - 0.5), 0.2, 1.5)`.
pub fn temperature_for(system_temperature: f64, chaos: f64) -> f64 {
    (system_temperature + (chaos - CHAOS_NEUTRAL)).clamp(TEMPERATURE_MIN, TEMPERATURE_MAX)
}

pub struct ChaosMeter {
    settings: RwLock<ChaosSettings>,
}

impl ChaosMeter {
    pub fn new(settings: ChaosSettings) -> EngineResult<Self> {
        settings.validate()?;
        Ok(ChaosMeter { settings: RwLock::new(settings) })
    }

    pub fn chaos(&self, todays_interactions: i64) -> f64 {
        self.settings.read().score(todays_interactions)
    }

    pub fn settings(&self) -> ChaosSettings {
        *self.settings.read()
    }

    /// Replace all three parameters at once. Invalid settings are rejected
    /// and the previous ones stay in force.
    pub fn retune(&self, settings: ChaosSettings) -> EngineResult<()> {
        settings.validate()?;
        *self.settings.write() = settings;
        info!(
            "[chaos] Retuned: base={} slope={} ceiling={}",
            settings.base, settings.slope, settings.ceiling
        );
        Ok(())
    }
}
