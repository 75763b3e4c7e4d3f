//! Shared configuration types for the evaluator and its accelerator session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Scalar;

/// Adapter selection preference, mirrored onto `wgpu::PowerPreference` by the GPU crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerPreference {
    None,
    LowPower,
    #[default]
    HighPerformance,
}

/// Settings for the long-lived accelerator session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceleratorSettings {
    pub power_preference: PowerPreference,
    /// Allow a software adapter when no hardware adapter is available.
    pub force_fallback_adapter: bool,
    /// Upper bound on each wait for submission completion or buffer mapping.
    pub readback_timeout_ms: u64,
}

impl Default for AcceleratorSettings {
    fn default() -> Self {
        Self {
            power_preference: PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            readback_timeout_ms: 5_000,
        }
    }
}

impl AcceleratorSettings {
    pub fn readback_timeout(&self) -> Duration {
        Duration::from_millis(self.readback_timeout_ms.max(1))
    }
}

/// Top-level evaluator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    pub accelerator: AcceleratorSettings,
    /// Relative tolerance for accelerator/reference parity (absolute below magnitude 1).
    pub parity_tolerance: Scalar,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            accelerator: AcceleratorSettings::default(),
            parity_tolerance: 1e-5,
        }
    }
}
