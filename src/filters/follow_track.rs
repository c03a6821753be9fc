//! Filter for an obstacle following a known lane
//!
//! Motion is linearized along the lane segment nearest to the current
//! position estimate. With d = (dx, dy) the unit segment direction:
//!
//! A_k = [[1, 0, dx·Δt/100], [0, 1, dy·Δt/100], [0, 0, 1]]
//! G_k = [dx·Δt/200, dy·Δt/200, Δt]ᵀ
//!
//! Velocity is held in lane units (cm per time unit), hence the /100 and
//! /200 conversions to meters. Q is the scalar acceleration variance, so
//! G·Q·Gᵀ is a rank-1 update.

use nalgebra::Vector2;
use std::sync::Arc;

use super::kalman::{position_observation, KalmanCore};
use super::observer::CorrectionObserver;
use super::ObstacleFilter;
use crate::config::FollowTrackParams;
use crate::error::{FilterError, Result};
use crate::lane::Lane;
use crate::types::{MeasNoise, Measurement, NoiseInjection, ProcessNoise, StateMat, StateVec};

/// State velocity units per meter
pub const VELOCITY_SCALE: f64 = 100.0;

/// Divisor for the positional part of the noise injection
pub const NOISE_SCALE: f64 = 200.0;

pub struct FollowTrackObstacleKf {
    core: KalmanCore,

    /// Time step
    delta_t: f64,

    lane: Arc<Lane>,

    q: ProcessNoise<1>,
}

impl FollowTrackObstacleKf {
    /// Create a filter with the stock tuning
    pub fn new(delta_t: f64, lane: Arc<Lane>) -> Result<Self> {
        Self::with_params(delta_t, lane, FollowTrackParams::default())
    }

    pub fn with_params(delta_t: f64, lane: Arc<Lane>, params: FollowTrackParams) -> Result<Self> {
        if !delta_t.is_finite() || delta_t <= 0.0 {
            return Err(FilterError::InvalidTimestep(delta_t));
        }
        params.validate()?;

        let p0 = StateMat::from_diagonal(&StateVec::new(
            params.initial_position_variance,
            params.initial_position_variance,
            params.initial_velocity_variance,
        ));
        let r = MeasNoise::identity() * params.measurement_variance;

        Ok(Self {
            core: KalmanCore::new(StateVec::zeros(), p0, position_observation(), r),
            delta_t,
            lane,
            q: ProcessNoise::<1>::new(params.acc_variance),
        })
    }

    pub fn set_observer(&mut self, observer: Box<dyn CorrectionObserver + Send>) {
        self.core.set_observer(observer);
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn lane(&self) -> &Arc<Lane> {
        &self.lane
    }

    /// Unit lane direction at the current position estimate
    pub fn get_nearest_direction(&self) -> Vector2<f64> {
        let x = self.core.state();
        self.lane.nearest_direction((x[0], x[1]))
    }

    /// A_k for lane direction `d`
    pub fn transition(&self, d: &Vector2<f64>) -> StateMat {
        let step = self.delta_t / VELOCITY_SCALE;
        StateMat::new(
            1.0, 0.0, d.x * step, //
            0.0, 1.0, d.y * step, //
            0.0, 0.0, 1.0,
        )
    }

    /// G_k for lane direction `d`
    pub fn noise_injection(&self, d: &Vector2<f64>) -> NoiseInjection<1> {
        NoiseInjection::<1>::new(
            d.x * self.delta_t / NOISE_SCALE,
            d.y * self.delta_t / NOISE_SCALE,
            self.delta_t,
        )
    }

    /// Linearize at the nearest lane segment, then run the time update
    pub fn predict(&mut self) -> (StateVec, StateMat) {
        let d = self.get_nearest_direction();
        log::trace!("Lane direction: ({:.4}, {:.4})", d.x, d.y);

        let a = self.transition(&d);
        let g = self.noise_injection(&d);
        self.core.predict(&a, &g, &self.q)
    }

    pub fn correct(&mut self, z: &Measurement) -> Result<(StateVec, StateMat)> {
        self.core.correct(z)
    }
}

impl ObstacleFilter for FollowTrackObstacleKf {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{min_eigenvalue, symmetry_error};
    use approx::assert_relative_eq;

    fn straight_lane() -> Arc<Lane> {
        Arc::new(Lane::new(vec![(0.0, 0.0), (10.0, 0.0)]).unwrap())
    }

    #[test]
    fn test_rejects_bad_timestep() {
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = FollowTrackObstacleKf::new(dt, straight_lane()).err();
            assert!(matches!(err, Some(FilterError::InvalidTimestep(_))));
        }
    }

    #[test]
    fn test_initial_state() {
        let kf = FollowTrackObstacleKf::new(1.0, straight_lane()).unwrap();
        assert_eq!(kf.state(), StateVec::zeros());
        assert_eq!(
            kf.covariance(),
            StateMat::from_diagonal(&StateVec::new(50.0, 50.0, 300.0))
        );
    }

    #[test]
    fn test_straight_lane_predict_from_rest() {
        let mut kf = FollowTrackObstacleKf::new(1.0, straight_lane()).unwrap();

        let d = kf.get_nearest_direction();
        assert_relative_eq!(d.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(d.y, 0.0, epsilon = 1e-12);

        let (x, p) = kf.predict();
        assert_eq!(x, StateVec::zeros());

        // A P0 A^T + 18000 g g^T with a = 0.01, g = (0.005, 0, 1)
        assert_relative_eq!(p[(0, 0)], 50.0 + 300.0 * 1e-4 + 18000.0 * 2.5e-5, epsilon = 1e-9);
        assert_relative_eq!(p[(0, 2)], 3.0 + 90.0, epsilon = 1e-9);
        assert_relative_eq!(p[(2, 0)], 3.0 + 90.0, epsilon = 1e-9);
        assert_relative_eq!(p[(1, 1)], 50.0, epsilon = 1e-12);
        assert_relative_eq!(p[(1, 2)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[(2, 2)], 300.0 + 18000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transition_and_noise_injection() {
        let kf = FollowTrackObstacleKf::new(0.5, straight_lane()).unwrap();
        let d = Vector2::new(0.6, 0.8);

        let a = kf.transition(&d);
        assert_relative_eq!(a[(0, 2)], 0.6 * 0.5 / 100.0, epsilon = 1e-15);
        assert_relative_eq!(a[(1, 2)], 0.8 * 0.5 / 100.0, epsilon = 1e-15);
        assert_eq!(a[(2, 2)], 1.0);
        assert_eq!(a[(2, 0)], 0.0);

        let g = kf.noise_injection(&d);
        assert_relative_eq!(g[0], 0.6 * 0.5 / 200.0, epsilon = 1e-15);
        assert_relative_eq!(g[1], 0.8 * 0.5 / 200.0, epsilon = 1e-15);
        assert_eq!(g[2], 0.5);
    }

    #[test]
    fn test_moving_state_advances_along_lane() {
        let lane = Arc::new(Lane::new(vec![(0.0, 0.0), (0.0, 10.0)]).unwrap());
        let mut kf = FollowTrackObstacleKf::new(1.0, lane).unwrap();
        kf.core.reset(StateVec::new(0.0, 0.0, 250.0), StateMat::identity());

        // 250 lane units per tick moves 2.5 m along +y
        let (x, _) = kf.predict();
        assert_relative_eq!(x[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.5, epsilon = 1e-12);
        assert_relative_eq!(x[2], 250.0, epsilon = 1e-12);
    }

    #[test]
    fn test_estimates_constant_speed() {
        // Obstacle drives along +x at 1 m per tick = 100 lane units
        let lane = Arc::new(Lane::new(vec![(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (200.0, 0.0)]).unwrap());
        let mut kf = FollowTrackObstacleKf::new(1.0, lane).unwrap();

        for k in 1..=150 {
            kf.filter(Some(Measurement::new(k as f64, 0.0))).unwrap();
        }

        let x = kf.state();
        assert_relative_eq!(x[0], 150.0, epsilon = 0.05);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(x[2], 100.0, epsilon = 1.0);
    }

    #[test]
    fn test_coast_grows_covariance() {
        let mut kf = FollowTrackObstacleKf::new(1.0, straight_lane()).unwrap();
        for k in 0..10 {
            kf.filter(Some(Measurement::new(k as f64 * 0.1, 0.0))).unwrap();
        }

        let p_before = kf.covariance();
        let x_before = kf.state();
        let (x, p) = kf.filter(None).unwrap();

        // Position moves by the velocity term only
        assert_relative_eq!(x[0], x_before[0] + x_before[2] / 100.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], x_before[2], epsilon = 1e-12);
        for i in 0..3 {
            assert!(p[(i, i)] >= p_before[(i, i)]);
        }
    }

    #[test]
    fn test_covariance_stays_symmetric_psd_on_turning_lane() {
        let lane = Arc::new(
            Lane::new(vec![(0.0, 0.0), (5.0, 0.0), (10.0, 2.0), (12.0, 7.0), (12.0, 15.0)]).unwrap(),
        );
        let mut kf = FollowTrackObstacleKf::new(0.1, lane).unwrap();

        for i in 0..400 {
            let s = i as f64 * 0.05;
            let z = if i % 5 == 4 {
                None
            } else if s < 5.0 {
                Some(Measurement::new(s, 0.0))
            } else {
                Some(Measurement::new(5.0 + (s - 5.0) * 0.9, (s - 5.0) * 0.4))
            };
            let (_, p) = kf.filter(z).unwrap();
            let scale = p.abs().max().max(1.0);
            assert!(symmetry_error(&p) / scale < 1e-9, "asymmetric at step {}", i);
            assert!(min_eigenvalue(&p) > -1e-6 * scale, "not PSD at step {}", i);
        }
    }

    #[test]
    fn test_lane_shared_across_threads() {
        let lane = straight_lane();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let lane = Arc::clone(&lane);
                std::thread::spawn(move || {
                    let mut kf = FollowTrackObstacleKf::new(1.0, lane).unwrap();
                    for k in 0..20 {
                        kf.filter(Some(Measurement::new(t as f64 + k as f64 * 0.1, 0.0)))
                            .unwrap();
                    }
                    kf.state()
                })
            })
            .collect();

        for handle in handles {
            let x = handle.join().unwrap();
            assert!(x[0].is_finite());
        }
        assert_eq!(Arc::strong_count(&lane), 1);
    }
}
