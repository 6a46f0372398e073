//! Invariant checker
//!
//! Structural truths that must hold after every step: the accounting
//! identity, non-negative balances, and finite (or +infinite) ratios.
//! Violations are returned as human-readable messages; the pipeline turns
//! any of them into an error event and fails the bank.

use crate::models::product::ProductType;
use crate::models::state::BankState;

/// Absolute tolerance on the balance-sheet identity, in currency units.
pub const IDENTITY_TOLERANCE: f64 = 1.0;

/// Tolerance on negative-balance detection.
pub const NEGATIVE_BALANCE_TOLERANCE: f64 = 1e-6;

/// Check every invariant, returning all violations (empty = OK).
pub fn check_invariants(state: &BankState) -> Vec<String> {
    let mut errors = Vec::new();

    // Assets = liabilities + equity.
    let assets = state.balance_sheet.total_assets();
    let liabilities = state.balance_sheet.total_liabilities();
    let equity = state.capital.total();
    let gap = assets - liabilities - equity;
    if gap.abs() > IDENTITY_TOLERANCE {
        errors.push(format!(
            "balance-sheet identity broken: assets {:.2} vs liabilities {:.2} + capital {:.2} (gap {:.4})",
            assets, liabilities, equity, gap
        ));
    }

    // No negative balances.
    for item in state.balance_sheet.items() {
        if item.balance < -NEGATIVE_BALANCE_TOLERANCE {
            errors.push(format!(
                "negative balance on {}: {:.4}",
                item.product_type.label(),
                item.balance
            ));
        }
    }

    // Cohort sums tie to balance-sheet lines.
    for product in ProductType::LOANS {
        let cohort_sum = state.cohort_outstanding(product);
        let balance = state.balance_sheet.get(product).map_or(0.0, |i| i.balance);
        let tolerance = (1e-6 * balance.abs()).max(1e-3);
        if (cohort_sum - balance).abs() > tolerance {
            errors.push(format!(
                "cohort sum for {} ({:.4}) does not match balance ({:.4})",
                product.label(),
                cohort_sum,
                balance
            ));
        }
    }

    // Ratios must be neither NaN nor negative infinity.
    for (name, value) in [
        ("cet1Ratio", state.risk.cet1_ratio),
        ("leverageRatio", state.risk.leverage_ratio),
        ("lcr", state.risk.lcr),
        ("nsfr", state.risk.nsfr),
    ] {
        if value.is_nan() || value == f64::NEG_INFINITY {
            errors.push(format!("{} is {}", name, value));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_bank_state;

    #[test]
    fn test_default_state_passes() {
        let state = default_bank_state(1);
        assert!(check_invariants(&state).is_empty());
    }

    #[test]
    fn test_identity_violation_detected() {
        let mut state = default_bank_state(1);
        state.capital.cet1 += 10.0;
        let errors = check_invariants(&state);
        assert!(errors.iter().any(|e| e.contains("identity")));
    }

    #[test]
    fn test_identity_tolerates_one_unit() {
        let mut state = default_bank_state(1);
        state.capital.cet1 += 0.5;
        assert!(check_invariants(&state).is_empty());
    }

    #[test]
    fn test_negative_balance_detected() {
        let mut state = default_bank_state(1);
        state
            .balance_sheet
            .get_mut(ProductType::Gilts)
            .unwrap()
            .balance = -1.0;
        let errors = check_invariants(&state);
        assert!(errors.iter().any(|e| e.contains("negative balance")));
    }

    #[test]
    fn test_cohort_mismatch_detected() {
        let mut state = default_bank_state(1);
        state
            .loan_cohorts
            .get_mut(&ProductType::Mortgages)
            .unwrap()[0]
            .outstanding_principal -= 1.0e6;
        let errors = check_invariants(&state);
        assert!(errors.iter().any(|e| e.contains("cohort sum")));
    }

    #[test]
    fn test_nan_ratio_detected_but_positive_infinity_allowed() {
        let mut state = default_bank_state(1);
        state.risk.lcr = f64::INFINITY;
        assert!(check_invariants(&state).is_empty());
        state.risk.lcr = f64::NAN;
        let errors = check_invariants(&state);
        assert_eq!(errors.len(), 1);
        state.risk.lcr = f64::NEG_INFINITY;
        let errors = check_invariants(&state);
        assert_eq!(errors.len(), 1);
    }
}
