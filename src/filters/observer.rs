//! Diagnostic hook for the correction step
//!
//! The Kalman core never prints. Each successful correction builds a
//! `CorrectionEvent` and hands it to whichever observer the filter holds.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{KalmanGain, Measurement, MeasNoise, StateMat};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEvent {
    /// Kalman gain K = P·Hᵀ·S⁻¹ (3×2)
    pub gain: KalmanGain,

    /// Residual y = z - H·x, evaluated before the state update
    pub residual: Measurement,

    /// Innovation covariance S = H·P·Hᵀ + R
    pub innovation_covariance: MeasNoise,

    /// Covariance after the Joseph-form update
    pub covariance: StateMat,
}

pub trait CorrectionObserver {
    fn on_correction(&mut self, event: &CorrectionEvent);
}

/// Default observer: forwards diagnostics to the `log` facade at debug level
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl CorrectionObserver for LogObserver {
    fn on_correction(&mut self, event: &CorrectionEvent) {
        log::debug!("Kalman gain: {:?}", event.gain.as_slice());
        log::debug!(
            "Residual: ({:.4}, {:.4})",
            event.residual[0],
            event.residual[1]
        );
        log::debug!(
            "State covariance diag: ({:.4}, {:.4}, {:.4})",
            event.covariance[(0, 0)],
            event.covariance[(1, 1)],
            event.covariance[(2, 2)]
        );
    }
}

/// Collects every event into a shared buffer
///
/// Clones share the same buffer, so one handle can be given to the filter and
/// the other kept by the caller.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<CorrectionEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded events, leaving the buffer empty
    pub fn drain(&self) -> Vec<CorrectionEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CorrectionObserver for RecordingObserver {
    fn on_correction(&mut self, event: &CorrectionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
