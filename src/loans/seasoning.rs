//! Seasoned-portfolio generation
//!
//! A realistic opening loan book is not a single fresh cohort: it is a
//! spread of vintages whose outstanding profile follows the amortisation
//! curve, with dispersion in coupon, PD and LGD. The generator builds one
//! age bucket per month of the default term, shapes the weights with the
//! amortisation factor plus lognormal noise, smooths, drops dust buckets,
//! and renormalises so the book hits the configured target exactly.
//!
//! The whole construction is driven by a per-call RNG, so a given seed
//! always yields the same cohort list.

use crate::config::LoanConfig;
use crate::error::SimulationError;
use crate::loans::engine::{original_principal_for, outstanding_factor, PD_CLAMP_MAX};
use crate::models::cohort::LoanCohort;
use crate::models::product::ProductType;
use crate::rng::Xorshift32;

/// Lognormal sigma applied to the raw bucket weights.
const WEIGHT_NOISE_SIGMA: f64 = 0.12;

/// Coupon bounds for seasoned cohorts.
const COUPON_MIN: f64 = 1e-4;
const COUPON_MAX: f64 = 0.25;

/// Build the seasoned cohort list for one loan product.
///
/// With seasoning disabled or a non-positive target, returns a single
/// fresh cohort. Otherwise the produced outstandings sum to
/// `target_outstanding` within `max(1e6, target * 1e-6)`; a wider miss is
/// a generator bug and fails loudly.
#[allow(clippy::too_many_arguments)]
pub fn generate_seasoned(
    product: ProductType,
    target_outstanding: f64,
    base_rate: f64,
    base_pd: f64,
    base_lgd: f64,
    loan_cfg: &LoanConfig,
    seed: u32,
) -> Result<Vec<LoanCohort>, SimulationError> {
    let term = loan_cfg.default_term_months;
    if !loan_cfg.initial_seasoning_enabled || target_outstanding <= 0.0 {
        return Ok(vec![fresh_cohort(
            product,
            target_outstanding.max(0.0),
            base_rate,
            base_pd,
            base_lgd,
            term,
        )]);
    }

    let mut rng = Xorshift32::new(seed);
    let buckets = term as usize;

    // Raw weights: the amortisation profile, roughened by lognormal noise.
    let mut weights: Vec<f64> = (0..buckets)
        .map(|k| {
            let shape = outstanding_factor(base_rate, term, k as u32);
            shape * (rng.normal_scaled(WEIGHT_NOISE_SIGMA)).exp()
        })
        .collect();

    smooth3(&mut weights);
    smooth3(&mut weights);
    normalise(&mut weights);

    // Drop dust buckets, then renormalise the survivors onto the target.
    let kept: Vec<(usize, f64)> = weights
        .iter()
        .enumerate()
        .filter(|(_, &w)| w * target_outstanding >= loan_cfg.initial_min_bucket_outstanding)
        .map(|(k, &w)| (k, w))
        .collect();
    if kept.is_empty() {
        return Ok(vec![fresh_cohort(
            product,
            target_outstanding,
            base_rate,
            base_pd,
            base_lgd,
            term,
        )]);
    }
    let kept_sum: f64 = kept.iter().map(|(_, w)| w).sum();

    let dispersion = loan_cfg.initial_coupon_dispersion_bps / 1e4;
    let [pd_lo, pd_hi] = loan_cfg.initial_pd_multiplier_range;
    let [lgd_lo, lgd_hi] = loan_cfg.initial_lgd_multiplier_range;

    let mut cohorts: Vec<LoanCohort> = Vec::with_capacity(kept.len());
    for (k, w) in &kept {
        let age = *k as u32;
        let outstanding = target_outstanding * w / kept_sum;
        let coupon = (base_rate + rng.normal_scaled(dispersion)).clamp(COUPON_MIN, COUPON_MAX);
        let pd_mult = pd_lo + (pd_hi - pd_lo) * rng.uniform();
        let lgd_mult = lgd_lo + (lgd_hi - lgd_lo) * rng.uniform();
        cohorts.push(LoanCohort {
            product_type: product,
            cohort_id: -(age as i64),
            original_principal: original_principal_for(outstanding, coupon, term, age),
            outstanding_principal: outstanding,
            annual_interest_rate: coupon,
            term_months: term,
            age_months: age,
            annual_pd: (base_pd * pd_mult).clamp(0.0, PD_CLAMP_MAX),
            lgd: (base_lgd * lgd_mult).clamp(0.0, 1.0),
        });
    }
    cohorts.sort_by_key(|c| c.cohort_id);

    let produced: f64 = cohorts.iter().map(|c| c.outstanding_principal).sum();
    let tolerance = (target_outstanding * 1e-6).max(1e6);
    if (produced - target_outstanding).abs() > tolerance {
        return Err(SimulationError::SeasoningMismatch {
            target: target_outstanding,
            produced,
        });
    }
    for cohort in &cohorts {
        cohort.validate(loan_cfg.max_term_months)?;
    }
    Ok(cohorts)
}

fn fresh_cohort(
    product: ProductType,
    principal: f64,
    rate: f64,
    pd: f64,
    lgd: f64,
    term: u32,
) -> LoanCohort {
    LoanCohort {
        product_type: product,
        cohort_id: 0,
        original_principal: principal,
        outstanding_principal: principal,
        annual_interest_rate: rate.max(0.0),
        term_months: term,
        age_months: 0,
        annual_pd: pd.clamp(0.0, PD_CLAMP_MAX),
        lgd: lgd.clamp(0.0, 1.0),
    }
}

/// In-place 3-point moving average; edges average what exists.
fn smooth3(weights: &mut [f64]) {
    if weights.len() < 3 {
        return;
    }
    let source = weights.to_vec();
    for i in 0..source.len() {
        let lo = i.saturating_sub(1);
        let hi = (i + 1).min(source.len() - 1);
        let window = &source[lo..=hi];
        weights[i] = window.iter().sum::<f64>() / window.len() as f64;
    }
}

fn normalise(weights: &mut [f64]) {
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan_cfg() -> LoanConfig {
        LoanConfig {
            default_term_months: 300,
            max_term_months: 420,
            initial_seasoning_enabled: true,
            initial_coupon_dispersion_bps: 40.0,
            initial_pd_multiplier_range: [0.7, 1.4],
            initial_lgd_multiplier_range: [0.8, 1.2],
            initial_min_bucket_outstanding: 1.0e6,
        }
    }

    #[test]
    fn test_sums_to_target_within_tolerance() {
        let target = 180.0e9;
        let cohorts = generate_seasoned(
            ProductType::Mortgages,
            target,
            0.045,
            0.008,
            0.15,
            &loan_cfg(),
            42,
        )
        .unwrap();
        let produced: f64 = cohorts.iter().map(|c| c.outstanding_principal).sum();
        assert!((produced - target).abs() <= (target * 1e-6).max(1e6));
        assert!(cohorts.len() > 10, "expected a spread of vintages");
    }

    #[test]
    fn test_same_seed_same_book() {
        let a = generate_seasoned(
            ProductType::Mortgages,
            50.0e9,
            0.045,
            0.008,
            0.15,
            &loan_cfg(),
            7,
        )
        .unwrap();
        let b = generate_seasoned(
            ProductType::Mortgages,
            50.0e9,
            0.045,
            0.008,
            0.15,
            &loan_cfg(),
            7,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_seasoned(
            ProductType::Mortgages,
            50.0e9,
            0.045,
            0.008,
            0.15,
            &loan_cfg(),
            1,
        )
        .unwrap();
        let b = generate_seasoned(
            ProductType::Mortgages,
            50.0e9,
            0.045,
            0.008,
            0.15,
            &loan_cfg(),
            2,
        )
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_disabled_seasoning_gives_single_fresh_cohort() {
        let mut cfg = loan_cfg();
        cfg.initial_seasoning_enabled = false;
        let cohorts = generate_seasoned(
            ProductType::Mortgages,
            10.0e9,
            0.045,
            0.008,
            0.15,
            &cfg,
            42,
        )
        .unwrap();
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].age_months, 0);
        assert_eq!(cohorts[0].outstanding_principal, 10.0e9);
    }

    #[test]
    fn test_zero_target_gives_empty_fresh_cohort() {
        let cohorts =
            generate_seasoned(ProductType::Mortgages, 0.0, 0.045, 0.008, 0.15, &loan_cfg(), 42)
                .unwrap();
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].outstanding_principal, 0.0);
    }

    #[test]
    fn test_cohorts_sorted_by_id_and_valid() {
        let cohorts = generate_seasoned(
            ProductType::CorporateLoans,
            80.0e9,
            0.055,
            0.02,
            0.45,
            &LoanConfig {
                default_term_months: 60,
                max_term_months: 120,
                ..loan_cfg()
            },
            3,
        )
        .unwrap();
        for pair in cohorts.windows(2) {
            assert!(pair[0].cohort_id < pair[1].cohort_id);
        }
        for cohort in &cohorts {
            assert_eq!(cohort.cohort_id, -(cohort.age_months as i64));
            assert!(cohort.outstanding_principal <= cohort.original_principal + 1e-6);
            assert!((0.0..1.0).contains(&cohort.annual_pd));
            assert!((0.0..=1.0).contains(&cohort.lgd));
        }
    }

    #[test]
    fn test_coupons_respect_bounds() {
        let cohorts = generate_seasoned(
            ProductType::Mortgages,
            100.0e9,
            0.001,
            0.008,
            0.15,
            &loan_cfg(),
            11,
        )
        .unwrap();
        for cohort in &cohorts {
            assert!((COUPON_MIN..=COUPON_MAX).contains(&cohort.annual_interest_rate));
        }
    }
}
