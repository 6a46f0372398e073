//! Step pipeline
//!
//! One call advances the bank by one step. The pipeline is strictly
//! ordered and synchronous:
//!
//! ```text
//! 1.  Clone the input state; capture opening cash
//! 2.  Sync loan balances from cohorts
//! 3.  Apply shocks (fold into the shock context)
//! 4.  Apply player actions, in input order
//! 5.  Deposit behaviour
//! 6.  Loan behaviour
//! 7.  Step loan cohorts (amortisation, defaults, write-downs)
//! 8.  Accrue non-loan interest
//! 9.  Recognise non-loan losses
//! 10. Close capital (income statement -> CET1, operating cash)
//! 11. Compute risk metrics and compliance
//! 12. Advance the clock, build the cash-flow statement, verify tie-out
//! 13. Check invariants
//! 14. Advance the macro market (after the state is otherwise frozen, so
//!     this step's metrics reflect the pre-advance market)
//! ```
//!
//! Business failures (cash shortfalls, regulatory breaches, broken
//! invariants) become events and set the sticky `has_failed` flag; the
//! step still returns a valid state so the caller can render a
//! resolution view. Precondition violations abort with an error.

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::invariants::check_invariants;
use crate::loans::engine::{step_cohorts, sync_balances};
use crate::market::macro_model::advance_market;
use crate::models::event::{Event, EventLog};
use crate::models::state::BankState;
use crate::orchestrator::actions::{apply_actions, PlayerAction};
use crate::orchestrator::behaviour::{apply_deposit_behaviour, apply_loan_behaviour};
use crate::orchestrator::shocks::{apply_shocks, Shock, ShockContext};
use crate::orchestrator::statements::{
    accrue_interest, build_cash_flow_statement, close_capital, recognise_non_loan_losses,
};
use crate::risk::metrics::{compute_metrics, evaluate_compliance};

/// Result of one step: the next state and the ordered event stream.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub state: BankState,
    pub events: Vec<Event>,
}

/// Advance the bank one step.
///
/// Pure up to the RNG seed carried inside
/// `state.market.macro_model.rng_seed`: identical inputs produce
/// identical outputs, byte for byte.
pub fn step(
    state: &BankState,
    config: &SimulationConfig,
    actions: &[PlayerAction],
    shocks: &[Shock],
) -> Result<StepOutput, SimulationError> {
    config.validate()?;

    // 1. Clone; no aliasing with the input from here on.
    let mut next = state.clone();
    let mut events = EventLog::new();
    let dt_months = next.clock.step_length_months;
    let cash_start = next.balance_sheet.cash_balance();

    // 2. Cohorts are the source of truth for loan balances.
    sync_balances(&mut next);

    // 3. Shocks fold into a shared context so they compound.
    let mut ctx = ShockContext::default();
    apply_shocks(&mut next, config, shocks, &mut ctx, &mut events);

    // 4. Player actions, in input order.
    apply_actions(&mut next, config, actions, &mut events)?;

    // 5-6. Behavioural volume flows.
    apply_deposit_behaviour(&mut next, config, dt_months, &mut events)?;
    apply_loan_behaviour(&mut next, config, dt_months, &mut events)?;

    // 7. Cohort mechanics under the composed stress multipliers.
    let cohort_result = step_cohorts(
        &mut next,
        config,
        dt_months,
        ctx.pd_multiplier,
        ctx.lgd_multiplier,
        &ctx.extra_losses,
    )?;

    // 8. Accrue the non-loan book.
    let accrual = accrue_interest(&next, dt_months);

    // 9. Targeted non-loan losses come straight off the asset side.
    let mut non_cash_losses = cohort_result.recognized_losses.clone();
    let non_loan_losses =
        recognise_non_loan_losses(&mut next, &ctx.extra_losses, &mut non_cash_losses);
    let credit_losses = cohort_result.total_losses() + non_loan_losses;

    // 10. Close the books into capital.
    let operating_cash_delta = close_capital(
        &mut next,
        config,
        dt_months,
        accrual,
        cohort_result.loan_interest_income,
        credit_losses,
        &mut events,
    );

    // 11. Metrics under the stressed outflow assumption.
    next.risk = compute_metrics(&next, config, ctx.lcr_outflow_multiplier)?;
    next.compliance = evaluate_compliance(&next.risk, &config.risk_limits);
    if !next.compliance.all_ok() {
        next.status.has_failed = true;
        events.log(
            Event::error("Regulatory breach: your bank has failed!")
                .with_id("compliance:breach"),
        );
    }

    // 12. Advance the clock and assemble the cash-flow statement.
    next.clock.advance();
    build_cash_flow_statement(
        state,
        &mut next,
        config,
        cash_start,
        operating_cash_delta,
        &non_cash_losses,
        &mut events,
    );

    // 13. Structural invariants.
    for violation in check_invariants(&next) {
        next.status.has_failed = true;
        events.log(Event::error(violation).with_id("invariant:violation"));
    }

    // 14. Market moves last: this step saw the pre-advance market.
    advance_market(&mut next.market, dt_months, &mut events)?;

    // Stamp the step's simulated date onto undated events.
    let date_ms = next.clock.date_ms;
    let events: Vec<Event> = events
        .into_events()
        .into_iter()
        .map(|e| {
            if e.timestamp.is_none() {
                e.with_timestamp(date_ms)
            } else {
                e
            }
        })
        .collect();

    Ok(StepOutput { state: next, events })
}
