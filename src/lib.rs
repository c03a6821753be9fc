//! Linear Kalman filters for tracking obstacles from noisy 2D position fixes
//!
//! Two motion models share one predict/correct core:
//! - [`SteadyObstacleKf`]: the obstacle stands still, process noise only
//! - [`FollowTrackObstacleKf`]: the obstacle drives along a known [`Lane`],
//!   linearized at the nearest lane segment every tick
//!
//! State is `[p_x, p_y, v_parallel]`; both filters observe position only.

pub mod config;
pub mod error;
pub mod filters;
pub mod lane;
pub mod types;

pub use config::{FollowTrackParams, SteadyParams};
pub use error::{FilterError, Result};
pub use filters::{
    CorrectionEvent, CorrectionObserver, FollowTrackObstacleKf, ObstacleFilter, ObstacleState,
    SteadyObstacleKf,
};
pub use lane::Lane;
