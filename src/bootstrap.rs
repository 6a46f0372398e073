//! Opening-state construction
//!
//! Builds the starting bank from the configured opening book, seasoning
//! the loan cohorts so the portfolio looks lived-in rather than freshly
//! originated. Seeds are derived per product from the base portfolio
//! seed (mortgages +0, corporate loans +1) so each book gets its own
//! reproducible stream.

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::loans::engine::sync_balances;
use crate::loans::seasoning::generate_seasoned;
use crate::models::product::ProductType;
use crate::models::state::BankState;
use crate::risk::metrics::{compute_metrics, evaluate_compliance};

/// Build the opening state with a seasoned loan book.
///
/// `seed_override` takes precedence over
/// `config.global.initial_portfolio_seed`; with neither set the seed
/// defaults to zero (which the RNG remaps to its nonzero substitute).
pub fn initial_seasoned_portfolio(
    config: &SimulationConfig,
    seed_override: Option<u32>,
) -> Result<BankState, SimulationError> {
    config.validate()?;
    let base_seed = seed_override
        .or(config.global.initial_portfolio_seed)
        .unwrap_or(0);

    let mut state = crate::config::defaults::state_skeleton(config);

    for (offset, product) in ProductType::LOANS.iter().enumerate() {
        let product = *product;
        let params = config.product(product)?;
        let loan_cfg = config.loan(product)?;
        let (target, rate) = state
            .balance_sheet
            .get(product)
            .map_or((0.0, 0.0), |i| (i.balance, i.interest_rate));
        let cohorts = generate_seasoned(
            product,
            target,
            rate,
            params.base_default_rate,
            params.loss_given_default,
            loan_cfg,
            base_seed.wrapping_add(offset as u32),
        )?;
        state.loan_cohorts.insert(product, cohorts);
    }

    sync_balances(&mut state);
    state.risk = compute_metrics(&state, config, 1.0)?;
    state.compliance = evaluate_compliance(&state.risk, &config.risk_limits);

    // Self-describing opening statement: flat cash, nothing moved yet.
    let cash = state.balance_sheet.cash_balance();
    state.cash_flow_statement.cash_start = cash;
    state.cash_flow_statement.cash_end = cash;

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_state_balances_and_complies() {
        let config = SimulationConfig::default();
        let state = initial_seasoned_portfolio(&config, None).unwrap();
        assert!(crate::invariants::check_invariants(&state).is_empty());
        assert!(state.compliance.all_ok());
        assert!(!state.status.has_failed);
    }

    #[test]
    fn test_cohort_sums_match_configured_book() {
        let config = SimulationConfig::default();
        let state = initial_seasoned_portfolio(&config, None).unwrap();
        for product in ProductType::LOANS {
            let configured = config
                .initial_balance_sheet
                .iter()
                .find(|i| i.product_type == product)
                .map_or(0.0, |i| i.balance);
            let outstanding = state.cohort_outstanding(product);
            assert!(
                (outstanding - configured).abs() <= (configured * 1e-6).max(1e6),
                "{:?}: {} vs {}",
                product,
                outstanding,
                configured
            );
        }
    }

    #[test]
    fn test_seed_override_beats_config_seed() {
        let config = SimulationConfig::default();
        let a = initial_seasoned_portfolio(&config, Some(5)).unwrap();
        let b = initial_seasoned_portfolio(&config, Some(5)).unwrap();
        let c = initial_seasoned_portfolio(&config, Some(6)).unwrap();
        assert_eq!(a.loan_cohorts, b.loan_cohorts);
        assert_ne!(a.loan_cohorts, c.loan_cohorts);
    }

    #[test]
    fn test_mortgage_and_corporate_streams_are_independent() {
        let config = SimulationConfig::default();
        let state = initial_seasoned_portfolio(&config, Some(9)).unwrap();
        // Derived seeds differ, so the two books must not be clones of
        // each other in shape.
        let mortgages = &state.loan_cohorts[&ProductType::Mortgages];
        let corporates = &state.loan_cohorts[&ProductType::CorporateLoans];
        assert!(!mortgages.is_empty() && !corporates.is_empty());
        assert_ne!(mortgages.len(), corporates.len());
    }
}
