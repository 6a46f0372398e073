//! Factor-shock covariance and its Cholesky factor
//!
//! The four macro factors (D, S, F, R) receive correlated Gaussian shocks
//! each tick. The covariance is static, so its lower-triangular Cholesky
//! factor is computed once at first use and shared read-only by every
//! simulation in the process. If factorisation fails even after jitter
//! retries, the module refuses to run any step.

use std::sync::OnceLock;

use crate::error::SimulationError;

/// AR(1) coefficients for (D, S, F, R).
pub const FACTOR_AR: [f64; 4] = [0.85, 0.70, 0.80, 0.97];

/// Shock standard deviations for (D, S, F, R).
pub const FACTOR_SD: [f64; 4] = [0.25, 0.22, 0.28, 0.08];

/// Shock correlation matrix for (D, S, F, R).
pub const FACTOR_CORR: [[f64; 4]; 4] = [
    [1.00, 0.25, 0.40, 0.10],
    [0.25, 1.00, 0.15, 0.05],
    [0.40, 0.15, 1.00, 0.20],
    [0.10, 0.05, 0.20, 1.00],
];

const JITTER_RETRIES: u32 = 8;

static SHOCK_LOADINGS: OnceLock<Result<[[f64; 4]; 4], String>> = OnceLock::new();

/// Lower-triangular Cholesky factorisation of a symmetric 4x4 matrix.
///
/// Returns `None` when the matrix is not positive definite.
pub fn cholesky4(m: &[[f64; 4]; 4]) -> Option<[[f64; 4]; 4]> {
    let mut l = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..=i {
            let mut sum = m[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Factor with escalating diagonal jitter.
///
/// Attempt 0 uses the matrix as given; each retry adds
/// `1e-10 * 10^(attempt-1)` to the diagonal.
pub fn cholesky_with_jitter(m: &[[f64; 4]; 4], retries: u32) -> Option<[[f64; 4]; 4]> {
    for attempt in 0..=retries {
        let mut jittered = *m;
        if attempt > 0 {
            let jitter = 1e-10 * 10f64.powi(attempt as i32 - 1);
            for (i, row) in jittered.iter_mut().enumerate() {
                row[i] += jitter;
            }
        }
        if let Some(l) = cholesky4(&jittered) {
            return Some(l);
        }
    }
    None
}

fn factor_covariance() -> [[f64; 4]; 4] {
    let mut cov = [[0.0f64; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            cov[i][j] = FACTOR_CORR[i][j] * FACTOR_SD[i] * FACTOR_SD[j];
        }
    }
    cov
}

/// The shared lower-triangular shock loadings.
///
/// Errors if the static covariance could not be factored; the failure is
/// cached, so every subsequent step in the process refuses to run.
pub fn shock_loadings() -> Result<&'static [[f64; 4]; 4], SimulationError> {
    let cached = SHOCK_LOADINGS.get_or_init(|| {
        cholesky_with_jitter(&factor_covariance(), JITTER_RETRIES)
            .ok_or_else(|| "factor covariance is not positive definite".to_string())
    });
    match cached {
        Ok(l) => Ok(l),
        Err(msg) => Err(SimulationError::MarketModel(msg.clone())),
    }
}

/// Multiply the loadings by a vector of independent standard normals.
pub fn correlate(l: &[[f64; 4]; 4], z: &[f64; 4]) -> [f64; 4] {
    let mut out = [0.0f64; 4];
    for i in 0..4 {
        for k in 0..=i {
            out[i] += l[i][k] * z[k];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_covariance_factors_cleanly() {
        let l = cholesky4(&factor_covariance()).expect("covariance must be PD");
        // L * L^T must reproduce the covariance
        let cov = factor_covariance();
        for i in 0..4 {
            for j in 0..4 {
                let mut recon = 0.0;
                for k in 0..4 {
                    recon += l[i][k] * l[j][k];
                }
                assert!(
                    (recon - cov[i][j]).abs() < 1e-12,
                    "L L^T mismatch at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_singular_matrix_recovered_by_jitter() {
        // Rank-deficient: two identical rows/columns.
        let singular = [
            [1.0, 1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        assert!(cholesky4(&singular).is_none());
        assert!(cholesky_with_jitter(&singular, 8).is_some());
    }

    #[test]
    fn test_correlate_uses_lower_triangle_only() {
        let l = [
            [2.0, 0.0, 0.0, 0.0],
            [1.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let out = correlate(&l, &[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(out, [2.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_shared_loadings_initialise() {
        assert!(shock_loadings().is_ok());
    }
}
