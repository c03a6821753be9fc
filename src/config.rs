//! Tunable noise parameters for the obstacle filters
//!
//! Defaults are the stock tuning. Every field may be overridden
//! from JSON; missing fields fall back to the default.

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

// Steady obstacle
pub const STEADY_PROCESS_NOISE_VARIANCE: f64 = 0.01;
pub const STEADY_MEASUREMENT_VARIANCE: f64 = 0.04;

// Lane-following obstacle
pub const FOLLOW_ACC_VARIANCE: f64 = 18000.0;
pub const FOLLOW_MEASUREMENT_VARIANCE: f64 = 0.04;
pub const FOLLOW_INITIAL_VELOCITY_VARIANCE: f64 = 300.0;

/// Initial positional variance shared by both models [m²]
pub const INITIAL_POSITION_VARIANCE: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteadyParams {
    /// Diagonal of Q, applied to all three state components each tick
    pub process_noise_variance: f64,

    /// Diagonal of R [m²]
    pub measurement_variance: f64,

    /// P₀ position diagonal [m²]
    pub initial_position_variance: f64,
}

impl Default for SteadyParams {
    fn default() -> Self {
        Self {
            process_noise_variance: STEADY_PROCESS_NOISE_VARIANCE,
            measurement_variance: STEADY_MEASUREMENT_VARIANCE,
            initial_position_variance: INITIAL_POSITION_VARIANCE,
        }
    }
}

impl SteadyParams {
    pub fn validate(&self) -> Result<()> {
        check_variance("process_noise_variance", self.process_noise_variance)?;
        check_variance("measurement_variance", self.measurement_variance)?;
        check_variance("initial_position_variance", self.initial_position_variance)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowTrackParams {
    /// Scalar acceleration noise injected through G_k
    pub acc_variance: f64,

    /// Diagonal of R [m²]
    pub measurement_variance: f64,

    /// P₀ position diagonal [m²]
    pub initial_position_variance: f64,

    /// P₀ velocity entry
    pub initial_velocity_variance: f64,
}

impl Default for FollowTrackParams {
    fn default() -> Self {
        Self {
            acc_variance: FOLLOW_ACC_VARIANCE,
            measurement_variance: FOLLOW_MEASUREMENT_VARIANCE,
            initial_position_variance: INITIAL_POSITION_VARIANCE,
            initial_velocity_variance: FOLLOW_INITIAL_VELOCITY_VARIANCE,
        }
    }
}

impl FollowTrackParams {
    pub fn validate(&self) -> Result<()> {
        check_variance("acc_variance", self.acc_variance)?;
        check_variance("measurement_variance", self.measurement_variance)?;
        check_variance("initial_position_variance", self.initial_position_variance)?;
        check_variance("initial_velocity_variance", self.initial_velocity_variance)
    }
}

fn check_variance(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FilterError::InvalidParameters(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}
