pub mod follow_track;
pub mod kalman;
pub mod observer;
pub mod steady;

pub use follow_track::FollowTrackObstacleKf;
pub use kalman::KalmanCore;
pub use observer::{CorrectionEvent, CorrectionObserver, LogObserver, RecordingObserver};
pub use steady::SteadyObstacleKf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Measurement, StateMat, StateVec};

/// Snapshot of a filter after a tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleState {
    /// Position in the local planar frame [m]
    pub position: (f64, f64),

    /// Velocity along the lane
    pub velocity: f64,

    /// Position variances (P[0,0], P[1,1])
    pub position_variance: (f64, f64),

    pub velocity_variance: f64,

    /// Covariance trace for uncertainty
    pub covariance_trace: f64,

    /// Update counters
    pub predict_count: u64,
    pub correct_count: u64,
}

/// One obstacle track's filter, driven once per tick by the tracking pipeline
///
/// Each track owns its filter. Instances are `Send` but must not be shared
/// between callers without external locking.
pub trait ObstacleFilter {
    /// Predict, then correct if a measurement is present
    ///
    /// `None` coasts: the state evolves through the motion model and process
    /// noise only.
    fn filter(&mut self, measurement: Option<Measurement>) -> Result<(StateVec, StateMat)>;

    fn core(&self) -> &KalmanCore;

    fn state(&self) -> StateVec {
        *self.core().state()
    }

    fn covariance(&self) -> StateMat {
        *self.core().covariance()
    }

    fn snapshot(&self) -> ObstacleState {
        let x = self.core().state();
        let p = self.core().covariance();
        let (predict_count, correct_count) = self.core().counts();

        ObstacleState {
            position: (x[0], x[1]),
            velocity: x[2],
            position_variance: (p[(0, 0)], p[(1, 1)]),
            velocity_variance: p[(2, 2)],
            covariance_trace: p.trace(),
            predict_count,
            correct_count,
        }
    }
}
