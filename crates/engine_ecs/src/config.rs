//! Coordinator configuration.

use serde::Deserialize;

use crate::error::EcsError;

/// What the tick loop does when a system's frequency gate is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyGating {
    /// Skip that system only; later systems are gated independently.
    #[default]
    Independent,
    /// Stop the tick at the first system whose gate is closed. Later systems
    /// do not run that tick, whatever their own frequency.
    BreakOnSkip,
}

/// Configuration for an [`Ecs`](crate::Ecs).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Frequency-gate behaviour.
    pub gating: FrequencyGating,
}

impl EcsConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Config`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, EcsError> {
        Ok(serde_json::from_str(json)?)
    }
}
