//! Demonstration ability: logs one line per tick until stopped.

use serde::Deserialize;
use tron1_core::Rate;

use crate::ability::{Ability, AbilityConfig, AbilityContext};
use crate::error::AbilityError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DummyConfig {
    /// Tick frequency in Hz.
    #[serde(default = "default_update_rate")]
    pub update_rate: f64,
}

fn default_update_rate() -> f64 {
    1.0
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            update_rate: default_update_rate(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DummyAbility {
    config: DummyConfig,
    ticks: u64,
}

impl DummyAbility {
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Ability for DummyAbility {
    fn initialize(
        &mut self,
        ctx: &AbilityContext,
        config: &AbilityConfig,
    ) -> Result<(), AbilityError> {
        let config: DummyConfig = config.parse(ctx.name())?;
        if !Rate::is_valid_frequency(config.update_rate) {
            return Err(AbilityError::InvalidConfig {
                name: ctx.name().to_string(),
                reason: format!(
                    "update_rate must be between {} and {} Hz, got {}",
                    Rate::MIN_FREQUENCY,
                    Rate::MAX_FREQUENCY,
                    config.update_rate
                ),
            });
        }
        tracing::info!(
            ability = ctx.name(),
            "Dummy ability initialized with update_rate: {}Hz",
            config.update_rate
        );
        self.config = config;
        Ok(())
    }

    fn on_start(&mut self, ctx: &AbilityContext) -> anyhow::Result<()> {
        tracing::info!(ability = ctx.name(), "Dummy ability started");
        Ok(())
    }

    fn on_main(&mut self, ctx: &AbilityContext) -> anyhow::Result<()> {
        let mut rate = Rate::new(self.config.update_rate);
        while ctx.is_running() {
            let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
            tracing::info!("{} - Dummy running (timestamp: {:.2})", ctx.name(), now);
            self.ticks += 1;
            rate.sleep();
        }
        Ok(())
    }

    fn on_stop(&mut self, ctx: &AbilityContext) {
        tracing::info!(ability = ctx.name(), ticks = self.ticks, "Dummy ability stopped");
    }
}
