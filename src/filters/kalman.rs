//! Shared linear Kalman recursion for obstacle tracking
//!
//! State Vector (3D):
//! [0-1]: Position (X, Y) in the local planar frame (meters)
//! [2]:   Velocity parallel to the followed lane
//!
//! The core owns (x, P, H, R). Motion models own nothing but their
//! parameters: they compute A_k, G_k and Q each tick and pass them to
//! `predict`. Scalar process noise is a 1×1 `ProcessNoise<1>`.

use nalgebra::Matrix2;

use super::observer::{CorrectionEvent, CorrectionObserver, LogObserver};
use crate::error::Result;
use crate::types::{
    invert_2x2, Measurement, MeasNoise, NoiseInjection, ObsMat, ProcessNoise, StateMat, StateVec,
};

pub struct KalmanCore {
    /// State vector [3D]
    state: StateVec,

    /// Covariance matrix [3x3]
    covariance: StateMat,

    /// Observation model [2x3]
    h: ObsMat,

    /// Measurement noise [2x2]
    r: MeasNoise,

    observer: Box<dyn CorrectionObserver + Send>,

    /// Update counters
    predict_count: u64,
    correct_count: u64,
}

impl KalmanCore {
    pub fn new(x0: StateVec, p0: StateMat, h: ObsMat, r: MeasNoise) -> Self {
        Self {
            state: x0,
            covariance: p0,
            h,
            r,
            observer: Box::new(LogObserver),
            predict_count: 0,
            correct_count: 0,
        }
    }

    /// Re-initialize the estimate, e.g. when a track is re-acquired
    pub fn reset(&mut self, x: StateVec, p: StateMat) {
        self.state = x;
        self.covariance = p;
    }

    /// Replace the observer receiving correction diagnostics
    pub fn set_observer(&mut self, observer: Box<dyn CorrectionObserver + Send>) {
        self.observer = observer;
    }

    /// Time update
    ///
    /// x ← A·x
    /// P ← A·P·Aᵀ + G·Q·Gᵀ
    pub fn predict<const M: usize>(
        &mut self,
        a: &StateMat,
        g: &NoiseInjection<M>,
        q: &ProcessNoise<M>,
    ) -> (StateVec, StateMat) {
        self.state = a * self.state;
        self.covariance = a * self.covariance * a.transpose() + g * q * g.transpose();
        self.predict_count += 1;

        (self.state, self.covariance)
    }

    /// Measurement update with the Joseph-form covariance correction
    ///
    /// On `SingularMatrix` the state and covariance are left untouched.
    pub fn correct(&mut self, z: &Measurement) -> Result<(StateVec, StateMat)> {
        let h_t = self.h.transpose();

        // Innovation covariance: S = H * P * H^T + R
        let s: Matrix2<f64> = self.h * self.covariance * h_t + self.r;

        // Kalman gain: K = P * H^T * S^-1
        let s_inv = invert_2x2(&s).map_err(|e| {
            log::warn!("Innovation covariance not invertible: {}", e);
            e
        })?;
        let k = self.covariance * h_t * s_inv;

        // Residual evaluated against the predicted state
        let residual = z - self.h * self.state;
        self.state += k * residual;

        // P = (I - K*H) * P * (I - K*H)^T + K * R * K^T
        let i_kh = StateMat::identity() - k * self.h;
        self.covariance = i_kh * self.covariance * i_kh.transpose() + k * self.r * k.transpose();
        self.correct_count += 1;

        let event = CorrectionEvent {
            gain: k,
            residual,
            innovation_covariance: s,
            covariance: self.covariance,
        };
        self.observer.on_correction(&event);

        Ok((self.state, self.covariance))
    }

    pub fn state(&self) -> &StateVec {
        &self.state
    }

    pub fn covariance(&self) -> &StateMat {
        &self.covariance
    }

    pub fn observation_model(&self) -> &ObsMat {
        &self.h
    }

    pub fn measurement_noise(&self) -> &MeasNoise {
        &self.r
    }

    /// (predict_count, correct_count)
    pub fn counts(&self) -> (u64, u64) {
        (self.predict_count, self.correct_count)
    }
}

/// H for a filter observing position only
pub fn position_observation() -> ObsMat {
    ObsMat::new(
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0,
    )
}
