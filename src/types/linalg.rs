//! Linear algebra type system for obstacle filters
//!
//! Provides compile-time dimension checking and clean type aliases
//! for the steady and lane-following Kalman filters.

use nalgebra::{Matrix2, SMatrix, SVector};

use crate::error::{FilterError, Result};

// ===== Dimensions =====
pub const STATE_DIM: usize = 3; // (p_x, p_y, v_parallel)
pub const MEASURE_DIM: usize = 2; // (p_x, p_y)

/// Determinant magnitude below which a matrix is treated as singular
pub const SINGULAR_EPSILON: f64 = 1e-12;

// ===== State Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;

// ===== Measurement Types =====
pub type Measurement = SVector<f64, MEASURE_DIM>;
pub type MeasNoise = SMatrix<f64, MEASURE_DIM, MEASURE_DIM>;
pub type ObsMat = SMatrix<f64, MEASURE_DIM, STATE_DIM>; // 2×3
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM>; // 3×2

// ===== Process Noise Injection =====
/// Noise injection for an M-dimensional process noise source
pub type NoiseInjection<const M: usize> = SMatrix<f64, STATE_DIM, M>;
pub type ProcessNoise<const M: usize> = SMatrix<f64, M, M>;

/// Closed-form 2x2 inverse
///
/// Fails with `SingularMatrix` when |det| < `SINGULAR_EPSILON`. There is no
/// identity or pseudo-inverse fallback.
pub fn invert_2x2(m: &Matrix2<f64>) -> Result<Matrix2<f64>> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(FilterError::SingularMatrix { determinant: det });
    }

    Ok(Matrix2::new(
        m[(1, 1)] / det,
        -m[(0, 1)] / det,
        -m[(1, 0)] / det,
        m[(0, 0)] / det,
    ))
}

/// Largest absolute element of P - Pᵀ
pub fn symmetry_error(p: &StateMat) -> f64 {
    (p - p.transpose()).abs().max()
}

/// Smallest eigenvalue of the symmetric part of P
pub fn min_eigenvalue(p: &StateMat) -> f64 {
    let sym = (p + p.transpose()) * 0.5;
    sym.symmetric_eigenvalues().min()
}
