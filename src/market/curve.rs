//! Nelson–Siegel gilt curve
//!
//! Three anchor yields (1y, 5y, 20y) pin the three factors exactly each
//! tick; lambda is held fixed. The 3x3 system is solved by Gaussian
//! elimination with partial pivoting. A singular system falls back to the
//! previously fitted factors; with none available the curve degrades to a
//! flat level at the mean of the finite anchor yields.

use crate::market::state::{CurveYields, NelsonSiegelFactors};

/// Fixed Nelson–Siegel decay parameter, in years.
pub const NS_LAMBDA: f64 = 2.0;

/// Anchor maturities used by the fitter, in years.
pub const ANCHOR_MATURITIES: [f64; 3] = [1.0, 5.0, 20.0];

/// The two Nelson–Siegel loadings at maturity `tau`.
///
/// Returns `(slope_loading, curvature_loading)`. The slope loading tends
/// to 1 and the curvature loading to 0 as `tau -> 0`.
fn loadings(tau: f64, lambda: f64) -> (f64, f64) {
    let x = tau / lambda;
    if x.abs() < 1e-12 {
        return (1.0, 0.0);
    }
    let e = (-x).exp();
    let g = (1.0 - e) / x;
    (g, g - e)
}

/// Evaluate the curve at maturity `tau` (years).
pub fn ns_yield(factors: &NelsonSiegelFactors, tau: f64) -> f64 {
    let (g, c) = loadings(tau, factors.lambda);
    factors.level + factors.slope * g + factors.curvature * c
}

/// Solve a 3x3 linear system by Gaussian elimination with partial
/// pivoting. Returns `None` when the system is singular.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        // Partial pivot: bring the largest remaining entry to the diagonal.
        let mut pivot = col;
        for row in (col + 1)..3 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            a.swap(col, pivot);
            b.swap(col, pivot);
        }
        for row in (col + 1)..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let mut sum = b[row];
        for k in (row + 1)..3 {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Fit (level, slope, curvature) exactly through three anchor yields.
pub fn fit_exact(
    maturities: &[f64; 3],
    yields: &[f64; 3],
    lambda: f64,
) -> Option<NelsonSiegelFactors> {
    let mut a = [[0.0f64; 3]; 3];
    for (row, &tau) in maturities.iter().enumerate() {
        let (g, c) = loadings(tau, lambda);
        a[row] = [1.0, g, c];
    }
    let [level, slope, curvature] = solve3(a, *yields)?;
    Some(NelsonSiegelFactors {
        level,
        slope,
        curvature,
        lambda,
    })
}

/// Fit with fallbacks: exact solve, else the previous factors, else a
/// flat curve at the mean of the finite anchor yields.
///
/// The boolean is true when a fallback was taken.
pub fn fit_or_fallback(
    maturities: &[f64; 3],
    yields: &[f64; 3],
    lambda: f64,
    previous: Option<&NelsonSiegelFactors>,
) -> (NelsonSiegelFactors, bool) {
    if let Some(fit) = fit_exact(maturities, yields, lambda) {
        return (fit, false);
    }
    if let Some(prev) = previous {
        return (prev.clone(), true);
    }
    let finite: Vec<f64> = yields.iter().copied().filter(|y| y.is_finite()).collect();
    let level = if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    (
        NelsonSiegelFactors {
            level,
            slope: 0.0,
            curvature: 0.0,
            lambda,
        },
        true,
    )
}

/// Evaluate the fitted curve at the standard tenors.
pub fn evaluate_tenors(factors: &NelsonSiegelFactors) -> CurveYields {
    CurveYields {
        y1: ns_yield(factors, 1.0),
        y2: ns_yield(factors, 2.0),
        y3: ns_yield(factors, 3.0),
        y5: ns_yield(factors, 5.0),
        y10: ns_yield(factors, 10.0),
        y20: ns_yield(factors, 20.0),
        y30: ns_yield(factors, 30.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fit_reproduces_anchors() {
        let yields = [0.041, 0.044, 0.048];
        let fit = fit_exact(&ANCHOR_MATURITIES, &yields, NS_LAMBDA).unwrap();
        for (tau, y) in ANCHOR_MATURITIES.iter().zip(yields.iter()) {
            assert!(
                (ns_yield(&fit, *tau) - y).abs() < 1e-10,
                "curve misses anchor at {}y",
                tau
            );
        }
    }

    #[test]
    fn test_coincident_maturities_fall_back_to_flat_mean() {
        let maturities = [5.0, 5.0, 5.0];
        let yields = [0.03, 0.04, 0.05];
        assert!(fit_exact(&maturities, &yields, NS_LAMBDA).is_none());
        let (fit, fell_back) = fit_or_fallback(&maturities, &yields, NS_LAMBDA, None);
        assert!(fell_back);
        assert!((fit.level - 0.04).abs() < 1e-12);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.curvature, 0.0);
    }

    #[test]
    fn test_singular_fit_prefers_previous_factors() {
        let prev = NelsonSiegelFactors {
            level: 0.05,
            slope: -0.01,
            curvature: 0.002,
            lambda: NS_LAMBDA,
        };
        let (fit, fell_back) =
            fit_or_fallback(&[3.0, 3.0, 3.0], &[0.01, 0.02, 0.03], NS_LAMBDA, Some(&prev));
        assert!(fell_back);
        assert_eq!(fit, prev);
    }

    #[test]
    fn test_short_end_limit_is_level_plus_slope() {
        let factors = NelsonSiegelFactors {
            level: 0.04,
            slope: -0.01,
            curvature: 0.005,
            lambda: NS_LAMBDA,
        };
        let y_short = ns_yield(&factors, 1e-15);
        assert!((y_short - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_long_end_tends_to_level() {
        let factors = NelsonSiegelFactors {
            level: 0.045,
            slope: -0.02,
            curvature: 0.01,
            lambda: NS_LAMBDA,
        };
        let y_long = ns_yield(&factors, 1_000.0);
        assert!((y_long - 0.045).abs() < 1e-3);
    }
}
