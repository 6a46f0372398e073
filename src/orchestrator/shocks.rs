//! Exogenous shocks
//!
//! Shocks are a closed, serde-tagged sum type applied in input order at
//! the top of each step. They fold into a mutable `ShockContext` so that
//! multiple shocks compound: multipliers multiply, targeted losses
//! accumulate. Unrecognised tags log a warning and are skipped, keeping
//! older cores forward compatible with newer scenario files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::models::event::{Event, EventLog};
use crate::models::product::ProductType;
use crate::models::state::BankState;

/// A scheduled exogenous shock.
///
/// The caller filters scheduled shocks by step number and passes the
/// survivors; the engine applies them in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Shock {
    /// Competitors bid up deposit pricing.
    DepositCompetition {
        retail_rate_increase: f64,
        #[serde(default)]
        corporate_rate_increase: f64,
    },
    /// Funding and credit spreads gap wider; repo terms tighten.
    MarketSpreadShock {
        bps: f64,
        #[serde(default)]
        corporate_loan_bps: f64,
        #[serde(default)]
        haircut_increase_pct: f64,
    },
    /// A name-specific deposit run with stressed LCR outflows.
    IdiosyncraticRun { multiplier: f64 },
    /// Economy-wide deterioration in default frequency and severity.
    MacroDownturn {
        pd_multiplier: f64,
        lgd_multiplier: f64,
    },
    /// A single large obligor defaults, hitting one product.
    CounterpartyDefault {
        product_type: ProductType,
        loss_amount: f64,
    },
    /// Forward-compatibility: tags this core does not know.
    #[serde(other)]
    Unrecognised,
}

/// A shock paired with the step it is due on.
///
/// Scenario files schedule shocks ahead of time; the caller selects the
/// subset due each step and passes the bare shocks to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledShock {
    pub step_number: u64,
    #[serde(flatten)]
    pub shock: Shock,
}

impl ScheduledShock {
    /// True when this shock should fire on the given step.
    pub fn is_due(&self, step: u64) -> bool {
        self.step_number == step
    }
}

/// Select the shocks due on `step`, preserving input order.
pub fn due_shocks(scheduled: &[ScheduledShock], step: u64) -> Vec<Shock> {
    scheduled
        .iter()
        .filter(|s| s.is_due(step))
        .map(|s| s.shock.clone())
        .collect()
}

/// Mutable accumulator threaded through the shock fold.
///
/// Multipliers start at 1 and compose multiplicatively; targeted losses
/// accumulate per product and are consumed later in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ShockContext {
    pub pd_multiplier: f64,
    pub lgd_multiplier: f64,
    pub lcr_outflow_multiplier: f64,
    pub extra_losses: BTreeMap<ProductType, f64>,
}

impl Default for ShockContext {
    fn default() -> Self {
        Self {
            pd_multiplier: 1.0,
            lgd_multiplier: 1.0,
            lcr_outflow_multiplier: 1.0,
            extra_losses: BTreeMap::new(),
        }
    }
}

/// Apply every shock in order, mutating the state and the context.
pub fn apply_shocks(
    state: &mut BankState,
    config: &SimulationConfig,
    shocks: &[Shock],
    ctx: &mut ShockContext,
    events: &mut EventLog,
) {
    for shock in shocks {
        apply_shock(state, config, shock, ctx, events);
    }
}

fn apply_shock(
    state: &mut BankState,
    config: &SimulationConfig,
    shock: &Shock,
    ctx: &mut ShockContext,
    events: &mut EventLog,
) {
    match shock {
        Shock::DepositCompetition {
            retail_rate_increase,
            corporate_rate_increase,
        } => {
            let retail_base = state.market.competitors.retail_deposit;
            state.market.competitors.retail_deposit = retail_base + retail_rate_increase;
            let corporate_base = state
                .market
                .competitors
                .corporate_deposit
                .unwrap_or(retail_base);
            state.market.competitors.corporate_deposit =
                Some(corporate_base + corporate_rate_increase);
            events.log(
                Event::info(format!(
                    "Deposit competition: competitor retail rate up {:.0}bps",
                    retail_rate_increase * 1e4
                ))
                .with_id("shock:depositCompetition"),
            );
        }
        Shock::MarketSpreadShock {
            bps,
            corporate_loan_bps,
            haircut_increase_pct,
        } => {
            let widening = bps / 1e4;
            state.market.spreads.wholesale += widening;
            state.market.spreads.senior_debt += widening;
            state.market.spreads.credit += widening;
            state.market.spreads.corporate_loan += corporate_loan_bps / 1e4;
            state.market.haircuts.gilt += haircut_increase_pct;
            events.log(
                Event::info(format!(
                    "Market spread shock: funding spreads +{:.0}bps, gilt haircut +{:.1}pp",
                    bps,
                    haircut_increase_pct * 100.0
                ))
                .with_id("shock:marketSpreadShock"),
            );
        }
        Shock::IdiosyncraticRun { multiplier } => {
            apply_run(state, config, *multiplier, ctx, events);
        }
        Shock::MacroDownturn {
            pd_multiplier,
            lgd_multiplier,
        } => {
            ctx.pd_multiplier *= pd_multiplier;
            ctx.lgd_multiplier *= lgd_multiplier;
            events.log(
                Event::info(format!(
                    "Macro downturn: PD x{:.2}, LGD x{:.2}",
                    pd_multiplier, lgd_multiplier
                ))
                .with_id("shock:macroDownturn"),
            );
        }
        Shock::CounterpartyDefault {
            product_type,
            loss_amount,
        } => {
            *ctx.extra_losses.entry(*product_type).or_insert(0.0) += loss_amount.max(0.0);
            events.log(
                Event::warning(format!(
                    "Counterparty default: {:.0}m loss against {}",
                    loss_amount / 1e6,
                    product_type.label()
                ))
                .with_id("shock:counterpartyDefault"),
            );
        }
        Shock::Unrecognised => {
            events.log(
                Event::warning("Ignoring unrecognised shock type")
                    .with_id("shock:unrecognised"),
            );
        }
    }
}

/// Deposit run: stress the LCR outflows and drain customer deposits.
///
/// The combined requested outflow is paid from cash; retail is satisfied
/// first and corporate absorbs the residual. Any shortfall is a hard
/// failure — the bank could not meet withdrawals.
fn apply_run(
    state: &mut BankState,
    config: &SimulationConfig,
    multiplier: f64,
    ctx: &mut ShockContext,
    events: &mut EventLog,
) {
    ctx.lcr_outflow_multiplier *= multiplier;

    let run_cfg = &config.shock_parameters.idiosyncratic_run;
    let run_off = (run_cfg.base_run_off_rate
        + (ctx.lcr_outflow_multiplier - 1.0).max(0.0) * run_cfg.incremental_rate)
        .min(run_cfg.max_run_off_rate);

    let retail_requested = state
        .balance_sheet
        .get(ProductType::RetailDeposits)
        .map_or(0.0, |i| i.balance * run_off);
    let corporate_requested = state
        .balance_sheet
        .get(ProductType::CorporateDeposits)
        .map_or(0.0, |i| i.balance * run_off);
    let requested = retail_requested + corporate_requested;
    if requested <= 0.0 {
        return;
    }

    let paid = state.balance_sheet.debit_cash_up_to(requested);
    let retail_paid = paid.min(retail_requested);
    let corporate_paid = paid - retail_paid;

    if let Some(item) = state.balance_sheet.get_mut(ProductType::RetailDeposits) {
        item.balance -= retail_paid;
    }
    if let Some(item) = state.balance_sheet.get_mut(ProductType::CorporateDeposits) {
        item.balance -= corporate_paid;
    }

    events.log(
        Event::warning(format!(
            "Deposit run: {:.1}% of customer deposits requested ({:.0}m), {:.0}m paid",
            run_off * 100.0,
            requested / 1e6,
            paid / 1e6
        ))
        .with_id("shock:idiosyncraticRun"),
    );

    if paid + 1e-6 < requested {
        state.status.has_failed = true;
        events.log(
            Event::error(format!(
                "Unable to meet deposit withdrawals: short {:.0}m",
                (requested - paid) / 1e6
            ))
            .with_id("shock:idiosyncraticRun:shortfall"),
        );
    }
}
