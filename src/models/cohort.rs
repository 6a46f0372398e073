//! Loan cohorts
//!
//! A cohort is a bucket of loans sharing product, rate, term, age, PD and
//! LGD, tracked as a single principal line. Originations in a step share
//! the step number as cohort id; seasoned cohorts use `-age_months`.
//!
//! Cohorts are created by origination or seeding, mutated only by the
//! loan-cohort engine, and removed once effectively repaid or matured.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::models::product::ProductType;

/// Outstanding principal below which a cohort is considered repaid.
pub const DEAD_COHORT_THRESHOLD: f64 = 1e-2;

/// Hard cap on loan terms (35 years in months).
pub const MAX_TERM_MONTHS: u32 = 420;

/// A bucket of loans amortised as one principal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanCohort {
    pub product_type: ProductType,
    /// Step number at origination; negative `-age_months` for seasoned cohorts.
    pub cohort_id: i64,
    pub original_principal: f64,
    pub outstanding_principal: f64,
    pub annual_interest_rate: f64,
    pub term_months: u32,
    pub age_months: u32,
    /// Annualised probability of default, in [0, 1).
    pub annual_pd: f64,
    /// Loss given default, in [0, 1].
    pub lgd: f64,
}

impl LoanCohort {
    /// True once the cohort should be removed from the book.
    pub fn is_dead(&self) -> bool {
        self.outstanding_principal <= DEAD_COHORT_THRESHOLD || self.age_months >= self.term_months
    }

    /// Validate every field against the data-model preconditions.
    ///
    /// `max_term_months` is the configured per-product cap; the effective
    /// cap is `min(max_term_months, 420)`.
    pub fn validate(&self, max_term_months: u32) -> Result<(), SimulationError> {
        let cap = max_term_months.min(MAX_TERM_MONTHS);
        let finite = self.original_principal.is_finite()
            && self.outstanding_principal.is_finite()
            && self.annual_interest_rate.is_finite()
            && self.annual_pd.is_finite()
            && self.lgd.is_finite();
        if !finite {
            return Err(self.invalid("non-finite field"));
        }
        if self.original_principal < 0.0 || self.outstanding_principal < 0.0 {
            return Err(self.invalid("negative principal"));
        }
        // Outstanding may exceed original only by rounding noise.
        let slack = 1e-6 * self.original_principal.max(1.0);
        if self.outstanding_principal > self.original_principal + slack {
            return Err(self.invalid("outstanding exceeds original principal"));
        }
        if self.annual_interest_rate < 0.0 {
            return Err(self.invalid("negative interest rate"));
        }
        if self.term_months == 0 || self.term_months > cap {
            return Err(self.invalid("term out of range"));
        }
        if self.age_months >= self.term_months {
            return Err(self.invalid("age not strictly below term"));
        }
        if !(0.0..1.0).contains(&self.annual_pd) {
            return Err(self.invalid("annual PD outside [0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.lgd) {
            return Err(self.invalid("LGD outside [0, 1]"));
        }
        Ok(())
    }

    fn invalid(&self, what: &str) -> SimulationError {
        SimulationError::InvalidCohort(format!(
            "{} cohort {}: {}",
            self.product_type.label(),
            self.cohort_id,
            what
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort() -> LoanCohort {
        LoanCohort {
            product_type: ProductType::Mortgages,
            cohort_id: 0,
            original_principal: 1_000_000.0,
            outstanding_principal: 900_000.0,
            annual_interest_rate: 0.045,
            term_months: 300,
            age_months: 24,
            annual_pd: 0.008,
            lgd: 0.15,
        }
    }

    #[test]
    fn test_valid_cohort_passes() {
        assert!(cohort().validate(MAX_TERM_MONTHS).is_ok());
    }

    #[test]
    fn test_age_must_be_strictly_below_term() {
        let mut c = cohort();
        c.age_months = c.term_months;
        assert!(c.validate(MAX_TERM_MONTHS).is_err());
    }

    #[test]
    fn test_pd_one_is_rejected() {
        let mut c = cohort();
        c.annual_pd = 1.0;
        assert!(c.validate(MAX_TERM_MONTHS).is_err());
    }

    #[test]
    fn test_term_capped_by_config_and_hard_limit() {
        let mut c = cohort();
        c.term_months = 360;
        assert!(c.validate(300).is_err());
        c.term_months = 421;
        assert!(c.validate(MAX_TERM_MONTHS).is_err());
    }

    #[test]
    fn test_outstanding_slack_tolerates_rounding() {
        let mut c = cohort();
        c.outstanding_principal = c.original_principal + 1e-9;
        assert!(c.validate(MAX_TERM_MONTHS).is_ok());
        c.outstanding_principal = c.original_principal * 1.01;
        assert!(c.validate(MAX_TERM_MONTHS).is_err());
    }

    #[test]
    fn test_dead_detection() {
        let mut c = cohort();
        c.outstanding_principal = 0.005;
        assert!(c.is_dead());
        let mut c = cohort();
        c.age_months = c.term_months;
        assert!(c.is_dead());
        assert!(!cohort().is_dead());
    }
}
