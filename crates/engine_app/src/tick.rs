//! Fixed-rate tick loop.
//!
//! Each tick calls [`Ecs::update`] once; the coordinator measures elapsed time
//! itself from its clock, so the loop only paces wall time.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use engine_ecs::{Ecs, EcsError};

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Drives an [`Ecs`] at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    config: TickConfig,
    tick_duration: Duration,
    ecs: Ecs,
}

impl TickLoop {
    /// # Errors
    ///
    /// Fails if the tick rate does not give a representable tick duration
    /// (zero, negative, NaN, or so small the period overflows).
    pub fn new(config: TickConfig, ecs: Ecs) -> Result<Self> {
        let tick_duration = Duration::try_from_secs_f64(1.0 / config.tick_rate)
            .with_context(|| format!("invalid tick rate {}", config.tick_rate))?;
        Ok(Self {
            config,
            tick_duration,
            ecs,
        })
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.ecs.update_counter()
    }

    #[must_use]
    pub fn ecs(&self) -> &Ecs {
        &self.ecs
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Propagates the first hook failure reported by [`Ecs::update`].
    pub fn tick(&mut self) -> Result<(), EcsError> {
        self.ecs.update()?;
        debug!(
            tick_id = self.ecs.update_counter(),
            entities = self.ecs.entity_count(),
            dirty = self.ecs.dirty_count(),
            "tick done"
        );
        Ok(())
    }

    /// Run the loop for the configured number of ticks, or indefinitely.
    ///
    /// # Errors
    ///
    /// Stops at the first failed tick and returns its error.
    pub fn run(&mut self) -> Result<(), EcsError> {
        let tick_duration = self.tick_duration;
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.tick()?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
