//! Loan-cohort engine
//!
//! Amortisation, origination, prepayment, default and write-down for the
//! cohort book. Every operation keeps the cohort sums and the balance
//! sheet in lockstep: after any mutation the loan lines are re-synced
//! from the cohorts.
//!
//! All cash effects flow through the CashReserves line; an operation that
//! needs cash and finds no cash line is a data-model precondition failure.

use std::collections::BTreeMap;

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::models::cohort::{LoanCohort, MAX_TERM_MONTHS};
use crate::models::product::ProductType;
use crate::models::state::BankState;

/// Effective annual PD is capped just below one so the monthly conversion
/// can never wipe a cohort in a single month.
pub const PD_CLAMP_MAX: f64 = 0.999_999;

/// Rates below this are treated as zero in the amortisation formulas.
const RATE_EPSILON: f64 = 1e-12;

/// Result of one cohort step: cash interest received and losses taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortStepResult {
    /// Interest received in cash from all loan cohorts this step.
    pub loan_interest_income: f64,
    /// Recognised credit losses by loan product.
    pub recognized_losses: BTreeMap<ProductType, f64>,
}

impl CohortStepResult {
    pub fn total_losses(&self) -> f64 {
        self.recognized_losses.values().sum()
    }
}

/// Standard fixed-payment amortisation instalment.
///
/// Falls back to straight-line repayment when the rate is effectively
/// zero, where the annuity formula degenerates.
pub fn monthly_payment(principal: f64, annual_rate: f64, remaining_months: u32) -> f64 {
    if remaining_months == 0 || principal <= 0.0 {
        return 0.0;
    }
    let r = annual_rate / 12.0;
    if r.abs() < RATE_EPSILON {
        return principal / remaining_months as f64;
    }
    principal * r / (1.0 - (1.0 + r).powi(-(remaining_months as i32)))
}

/// Fraction of original principal still outstanding after `k` of `n`
/// scheduled months, for a fixed-payment loan at `annual_rate`.
///
/// Clamped to [0, 1]; zero at or beyond maturity; linear when the rate is
/// effectively zero.
pub fn outstanding_factor(annual_rate: f64, n: u32, k: u32) -> f64 {
    if k >= n {
        return 0.0;
    }
    let r = annual_rate / 12.0;
    if r.abs() < RATE_EPSILON {
        return (n - k) as f64 / n as f64;
    }
    let growth_n = (1.0 + r).powi(n as i32);
    let growth_k = (1.0 + r).powi(k as i32);
    ((growth_n - growth_k) / (growth_n - 1.0)).clamp(0.0, 1.0)
}

/// Closed-form inverse of `outstanding_factor`: the original principal a
/// cohort must have had to show `outstanding` at the given age.
pub fn original_principal_for(outstanding: f64, annual_rate: f64, term: u32, age: u32) -> f64 {
    let factor = outstanding_factor(annual_rate, term, age);
    if factor <= 0.0 {
        outstanding
    } else {
        outstanding / factor
    }
}

/// Recompute each loan product's balance-sheet balance from its cohorts.
pub fn sync_balances(state: &mut BankState) {
    for product in ProductType::LOANS {
        let total = state.cohort_outstanding(product);
        if let Some(item) = state.balance_sheet.get_mut(product) {
            item.balance = total;
        }
    }
}

/// Originate new lending into a cohort, funded from cash.
///
/// Funds `min(requested, cash)` and returns the funded amount. A cohort
/// with the same id absorbs the origination through outstanding-weighted
/// averages; otherwise a fresh cohort is appended.
#[allow(clippy::too_many_arguments)]
pub fn originate(
    state: &mut BankState,
    config: &SimulationConfig,
    product: ProductType,
    cohort_id: i64,
    requested_principal: f64,
    rate: f64,
    term_months: Option<u32>,
    annual_pd: f64,
    lgd: f64,
) -> Result<f64, SimulationError> {
    if !product.is_loan() || requested_principal <= 0.0 {
        return Ok(0.0);
    }
    let loan_cfg = config.loan(product)?;
    let term = term_months
        .unwrap_or(loan_cfg.default_term_months)
        .min(loan_cfg.max_term_months)
        .min(MAX_TERM_MONTHS)
        .max(1);

    if state.balance_sheet.get(ProductType::CashReserves).is_none() {
        return Err(SimulationError::MissingCashLine);
    }
    let funded = state.balance_sheet.debit_cash_up_to(requested_principal);
    if funded <= 0.0 {
        return Ok(0.0);
    }

    let rate = rate.max(0.0);
    let annual_pd = annual_pd.clamp(0.0, PD_CLAMP_MAX);
    let lgd = lgd.clamp(0.0, 1.0);

    let cohorts = state.loan_cohorts.entry(product).or_default();
    match cohorts.iter_mut().find(|c| c.cohort_id == cohort_id) {
        Some(existing) => {
            let total = existing.outstanding_principal + funded;
            if total > 0.0 {
                let w_old = existing.outstanding_principal / total;
                let w_new = funded / total;
                existing.annual_interest_rate =
                    w_old * existing.annual_interest_rate + w_new * rate;
                existing.annual_pd = w_old * existing.annual_pd + w_new * annual_pd;
                existing.lgd = w_old * existing.lgd + w_new * lgd;
            }
            existing.outstanding_principal = total;
            existing.original_principal += funded;
            existing.term_months = existing.term_months.max(term);
            existing.age_months = 0;
        }
        None => cohorts.push(LoanCohort {
            product_type: product,
            cohort_id,
            original_principal: funded,
            outstanding_principal: funded,
            annual_interest_rate: rate,
            term_months: term,
            age_months: 0,
            annual_pd,
            lgd,
        }),
    }

    sync_balances(state);
    Ok(funded)
}

/// Repay loan principal early, pro-rata across cohorts, crediting cash.
///
/// Returns the amount actually repaid (capped at the total outstanding).
/// The final cohort absorbs the allocation residual so the repaid total
/// matches exactly. A no-op for non-loan products.
pub fn prepay(state: &mut BankState, product: ProductType, requested: f64) -> f64 {
    if !product.is_loan() || requested <= 0.0 {
        return 0.0;
    }
    let total = state.cohort_outstanding(product);
    if total <= 0.0 {
        return 0.0;
    }
    let paid = requested.min(total);

    if let Some(cohorts) = state.loan_cohorts.get_mut(&product) {
        let live: Vec<usize> = (0..cohorts.len())
            .filter(|&i| cohorts[i].outstanding_principal > 0.0)
            .collect();
        let mut allocated = 0.0;
        for (pos, &i) in live.iter().enumerate() {
            let share = if pos + 1 == live.len() {
                // Residual lands on the last cohort to avoid drift.
                (paid - allocated).max(0.0)
            } else {
                paid * cohorts[i].outstanding_principal / total
            };
            let share = share.min(cohorts[i].outstanding_principal);
            cohorts[i].outstanding_principal -= share;
            allocated += share;
        }
        cohorts.retain(|c| !c.is_dead());
    }

    let _ = state.balance_sheet.credit_cash(paid);
    sync_balances(state);
    paid
}

/// Advance every loan cohort by `dt_months` whole months.
///
/// Each month runs scheduled amortisation then stochastic-rate-free
/// default recognition (PD/LGD scaled by the step's shock multipliers).
/// After the monthly loop, `extra_losses` targeted at loan products are
/// written down pro-rata. Dead cohorts are removed and balances re-synced.
pub fn step_cohorts(
    state: &mut BankState,
    config: &SimulationConfig,
    dt_months: f64,
    pd_multiplier: f64,
    lgd_multiplier: f64,
    extra_losses: &BTreeMap<ProductType, f64>,
) -> Result<CohortStepResult, SimulationError> {
    if state.balance_sheet.get(ProductType::CashReserves).is_none() {
        return Err(SimulationError::MissingCashLine);
    }
    for product in ProductType::LOANS {
        let max_term = config.loan(product)?.max_term_months;
        if let Some(cohorts) = state.loan_cohorts.get(&product) {
            for cohort in cohorts {
                cohort.validate(max_term)?;
            }
        }
    }

    let months = dt_months.max(0.0) as u64;
    let mut result = CohortStepResult::default();

    for _ in 0..months {
        for product in ProductType::LOANS {
            let mut cash_in = 0.0;
            let mut losses = 0.0;
            if let Some(cohorts) = state.loan_cohorts.get_mut(&product) {
                for cohort in cohorts.iter_mut() {
                    if cohort.outstanding_principal <= 0.0
                        || cohort.age_months >= cohort.term_months
                    {
                        continue;
                    }
                    let r = cohort.annual_interest_rate / 12.0;
                    let remaining = cohort.term_months - cohort.age_months;
                    let pmt = monthly_payment(
                        cohort.outstanding_principal,
                        cohort.annual_interest_rate,
                        remaining,
                    );
                    let interest = cohort.outstanding_principal * r;
                    let principal = (pmt - interest)
                        .max(0.0)
                        .min(cohort.outstanding_principal);
                    cohort.outstanding_principal -= principal;
                    cash_in += interest + principal;
                    result.loan_interest_income += interest;

                    let pd_eff = (cohort.annual_pd * pd_multiplier).clamp(0.0, PD_CLAMP_MAX);
                    let monthly_pd = 1.0 - (1.0 - pd_eff).powf(1.0 / 12.0);
                    let defaulted = cohort.outstanding_principal * monthly_pd;
                    if defaulted > 0.0 {
                        let lgd_eff = (cohort.lgd * lgd_multiplier).clamp(0.0, 1.0);
                        let loss = defaulted * lgd_eff;
                        let recovery = defaulted - loss;
                        cohort.outstanding_principal -= defaulted;
                        cash_in += recovery;
                        losses += loss;
                    }

                    cohort.age_months += 1;
                }
            }
            if cash_in != 0.0 {
                let _ = state.balance_sheet.credit_cash(cash_in);
            }
            if losses != 0.0 {
                *result.recognized_losses.entry(product).or_insert(0.0) += losses;
            }
        }
    }

    // Targeted write-downs (e.g. counterparty defaults) after the
    // scheduled monthly mechanics.
    for product in ProductType::LOANS {
        let Some(&extra) = extra_losses.get(&product) else {
            continue;
        };
        if extra <= 0.0 {
            continue;
        }
        let total = state.cohort_outstanding(product);
        if total <= 0.0 {
            continue;
        }
        let write_down = extra.min(total);
        if let Some(cohorts) = state.loan_cohorts.get_mut(&product) {
            let live: Vec<usize> = (0..cohorts.len())
                .filter(|&i| cohorts[i].outstanding_principal > 0.0)
                .collect();
            let mut allocated = 0.0;
            for (pos, &i) in live.iter().enumerate() {
                let share = if pos + 1 == live.len() {
                    (write_down - allocated).max(0.0)
                } else {
                    write_down * cohorts[i].outstanding_principal / total
                };
                let share = share.min(cohorts[i].outstanding_principal);
                cohorts[i].outstanding_principal -= share;
                allocated += share;
            }
        }
        *result.recognized_losses.entry(product).or_insert(0.0) += write_down;
    }

    for cohorts in state.loan_cohorts.values_mut() {
        cohorts.retain(|c| !c.is_dead());
    }
    sync_balances(state);
    Ok(result)
}
