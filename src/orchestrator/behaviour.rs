//! Behavioural volume flows
//!
//! Customers respond to pricing each step: deposits chase the gap between
//! the bank's rate and the competition, loan demand responds to the gap
//! against the prevailing market benchmark. Products are visited in
//! balance-sheet order, which is part of the determinism contract.

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::loans::engine::{originate, prepay};
use crate::models::event::{Event, EventLog};
use crate::models::product::{DepositSegment, LoanBenchmark, ProductType};
use crate::models::state::BankState;

/// Grow or shrink customer deposits according to relative pricing.
///
/// Outflows are funded from cash; a shortfall means withdrawals could not
/// be met and fails the bank.
pub fn apply_deposit_behaviour(
    state: &mut BankState,
    config: &SimulationConfig,
    dt_months: f64,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    let products: Vec<ProductType> = state
        .balance_sheet
        .items()
        .iter()
        .map(|i| i.product_type)
        .filter(|p| p.is_customer_deposit())
        .collect();

    for product in products {
        let (balance, own_rate) = match state.balance_sheet.get(product) {
            Some(item) => (item.balance, item.interest_rate),
            None => continue,
        };
        let competitor = match product.deposit_segment() {
            Some(DepositSegment::Retail) => state.market.competitors.retail_deposit,
            Some(DepositSegment::Corporate) => state.market.competitor_corporate_deposit(),
            None => continue,
        };
        let elasticity = config.product(product)?.volume_elasticity_to_rate;
        let growth = (config.behaviour.deposit_baseline_growth_monthly
            + elasticity * (own_rate - competitor))
            .clamp(
                config.behaviour.min_deposit_growth_per_step,
                config.global.max_deposit_growth_per_step,
            );
        let growth_factor = (1.0 + growth * dt_months).max(0.0);
        let desired = balance * growth_factor;
        let delta = desired - balance;

        if delta >= 0.0 {
            if let Some(item) = state.balance_sheet.get_mut(product) {
                item.balance = desired;
            }
            if !state.balance_sheet.credit_cash(delta) {
                return Err(SimulationError::MissingCashLine);
            }
        } else {
            let requested = -delta;
            let paid = state.balance_sheet.debit_cash_up_to(requested);
            if let Some(item) = state.balance_sheet.get_mut(product) {
                item.balance = balance - paid;
            }
            if paid + 1e-6 < requested {
                state.status.has_failed = true;
                events.log(
                    Event::error(format!(
                        "Unable to fund {} outflows: short {:.0}m",
                        product.label(),
                        (requested - paid) / 1e6
                    ))
                    .with_id("behaviour:depositShortfall"),
                );
            }
        }
    }
    Ok(())
}

/// Grow or shrink the loan book according to pricing against benchmarks.
///
/// Growth is funded by origination (cash-capped); shrinkage flows back as
/// prepayment.
pub fn apply_loan_behaviour(
    state: &mut BankState,
    config: &SimulationConfig,
    dt_months: f64,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    let products: Vec<ProductType> = state
        .balance_sheet
        .items()
        .iter()
        .map(|i| i.product_type)
        .filter(|p| p.is_loan())
        .collect();

    for product in products {
        let (balance, own_rate) = match state.balance_sheet.get(product) {
            Some(item) => (item.balance, item.interest_rate),
            None => continue,
        };
        if balance <= 0.0 && state.cohort_outstanding(product) <= 0.0 {
            // Zero book: behavioural growth has no base to scale.
            continue;
        }
        let benchmark = match product.loan_benchmark() {
            Some(LoanBenchmark::Mortgage) => state.market.competitors.mortgage,
            Some(LoanBenchmark::Corporate) => {
                state.market.risk_free_long + state.market.spreads.corporate_loan
            }
            None => continue,
        };
        let params = config.product(product)?;
        let growth = (config.behaviour.loan_baseline_growth_monthly
            + params.volume_elasticity_to_rate * (own_rate - benchmark))
            .clamp(
                config.behaviour.min_loan_growth_per_step,
                config.global.max_loan_growth_per_step,
            );
        let growth_factor = (1.0 + growth * dt_months).max(0.0);
        let delta = balance * growth_factor - balance;

        if delta > 0.0 {
            let cohort_id = state.clock.step as i64;
            let funded = originate(
                state,
                config,
                product,
                cohort_id,
                delta,
                own_rate,
                None,
                params.base_default_rate,
                params.loss_given_default,
            )?;
            if funded + 1e-6 < delta {
                events.log(Event::warning(format!(
                    "{} demand exceeded available funding: {:.0}m of {:.0}m written",
                    product.label(),
                    funded / 1e6,
                    delta / 1e6
                )));
            }
        } else if delta < 0.0 {
            prepay(state, product, -delta);
        }
    }
    Ok(())
}
