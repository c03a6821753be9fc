//! Filter for an obstacle assumed to stand still
//!
//! A = I₃, G = I₃ and Q = σ²·I₃: every tick only inflates the covariance.
//! Velocity starts with zero variance since it plays no role for a
//! stationary target.

use super::kalman::{position_observation, KalmanCore};
use super::observer::CorrectionObserver;
use super::ObstacleFilter;
use crate::config::SteadyParams;
use crate::error::Result;
use crate::types::{
    MeasNoise, Measurement, NoiseInjection, ProcessNoise, StateMat, StateVec, STATE_DIM,
};

pub struct SteadyObstacleKf {
    core: KalmanCore,
    q: ProcessNoise<STATE_DIM>,
}

impl SteadyObstacleKf {
    /// Create a filter with the stock tuning
    pub fn new() -> Self {
        Self::build(SteadyParams::default())
    }

    pub fn with_params(params: SteadyParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::build(params))
    }

    fn build(params: SteadyParams) -> Self {
        let p0 = StateMat::from_diagonal(&StateVec::new(
            params.initial_position_variance,
            params.initial_position_variance,
            0.0,
        ));
        let r = MeasNoise::identity() * params.measurement_variance;

        Self {
            core: KalmanCore::new(StateVec::zeros(), p0, position_observation(), r),
            q: ProcessNoise::<STATE_DIM>::identity() * params.process_noise_variance,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn CorrectionObserver + Send>) {
        self.core.set_observer(observer);
    }

    pub fn predict(&mut self) -> (StateVec, StateMat) {
        self.core.predict(
            &StateMat::identity(),
            &NoiseInjection::<STATE_DIM>::identity(),
            &self.q,
        )
    }

    pub fn correct(&mut self, z: &Measurement) -> Result<(StateVec, StateMat)> {
        self.core.correct(z)
    }
}

impl Default for SteadyObstacleKf {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleFilter for SteadyObstacleKf {
    fn filter(&mut self, measurement: Option<Measurement>) -> Result<(StateVec, StateMat)> {
        let predicted = self.predict();
        match measurement {
            Some(z) => self.correct(&z),
            None => Ok(predicted),
        }
    }

    fn core(&self) -> &KalmanCore {
        &self.core
    }
}
