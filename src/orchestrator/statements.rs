//! Capital close and statement assembly
//!
//! The accounting tail of the step: accrue non-loan interest, recognise
//! non-loan losses, close the income statement into CET1, settle the
//! operating cash, then decompose the step's cash movement into
//! operating / investing / financing and verify the tie-out.

use std::collections::BTreeMap;

use crate::config::SimulationConfig;
use crate::models::event::{Event, EventLog};
use crate::models::product::{ProductType, Side};
use crate::models::state::BankState;
use crate::models::statements::{CashFlowStatement, IncomeStatement};

/// Liabilities whose balance movements are operating cash flows. Every
/// other liability (long-term wholesale funding) is financing.
const OPERATING_LIABILITIES: [ProductType; 4] = [
    ProductType::RetailDeposits,
    ProductType::CorporateDeposits,
    ProductType::WholesaleFundingSt,
    ProductType::RepurchaseAgreements,
];

/// Accrued non-loan interest for the step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InterestAccrual {
    pub non_loan_interest_income: f64,
    pub interest_expense: f64,
}

/// Simple accrual: balance x rate x year fraction, no intra-month
/// compounding. Loan interest is excluded here; the cohort engine already
/// collected it in cash.
pub fn accrue_interest(state: &BankState, dt_months: f64) -> InterestAccrual {
    let dt_years = dt_months / 12.0;
    let mut accrual = InterestAccrual::default();
    for item in state.balance_sheet.items() {
        let carry = item.balance * item.interest_rate * dt_years;
        match item.product_type.side() {
            Side::Asset if !item.product_type.is_loan() => {
                accrual.non_loan_interest_income += carry;
            }
            Side::Asset => {}
            Side::Liability => accrual.interest_expense += carry,
        }
    }
    accrual
}

/// Recognise targeted losses on non-loan assets: write the balance down
/// (capped at what is there) and record the loss per product.
pub fn recognise_non_loan_losses(
    state: &mut BankState,
    extra_losses: &BTreeMap<ProductType, f64>,
    non_cash_losses: &mut BTreeMap<ProductType, f64>,
) -> f64 {
    let mut total = 0.0;
    for (&product, &loss) in extra_losses {
        if product.is_loan() || loss <= 0.0 {
            continue;
        }
        if let Some(item) = state.balance_sheet.get_mut(product) {
            let recognised = loss.min(item.balance);
            item.balance -= recognised;
            *non_cash_losses.entry(product).or_insert(0.0) += recognised;
            total += recognised;
        }
    }
    total
}

/// Close the income statement into capital and settle operating cash.
///
/// Returns the operating cash delta for the cash-flow statement. Loan
/// interest was already credited in cash by the cohort engine, so only
/// the remainder of the operating delta moves cash here; if that
/// remainder cannot be funded the bank has failed.
pub fn close_capital(
    state: &mut BankState,
    config: &SimulationConfig,
    dt_months: f64,
    accrual: InterestAccrual,
    loan_interest_income: f64,
    credit_losses: f64,
    events: &mut EventLog,
) -> f64 {
    let dt_years = dt_months / 12.0;
    let loan_book: f64 = ProductType::LOANS
        .iter()
        .map(|&p| state.balance_sheet.get(p).map_or(0.0, |i| i.balance))
        .sum();
    let fee_income = config.behaviour.loan_fee_rate_monthly * dt_months * loan_book;
    let operating_expenses = config.global.operating_cost_ratio
        * state.balance_sheet.total_assets()
        * dt_years
        + config.global.fixed_operating_cost_per_month * dt_months;

    let interest_income = accrual.non_loan_interest_income + loan_interest_income;
    let net_interest_income = interest_income - accrual.interest_expense;
    let pre_tax_profit = net_interest_income + fee_income - credit_losses - operating_expenses;
    let tax = pre_tax_profit.max(0.0) * config.global.tax_rate;
    let net_income = pre_tax_profit - tax;

    state.income_statement = IncomeStatement {
        interest_income,
        interest_expense: accrual.interest_expense,
        net_interest_income,
        fee_income,
        credit_losses,
        operating_expenses,
        pre_tax_profit,
        tax,
        net_income,
    };
    state.capital.cet1 += net_income;

    let operating_cash_delta = interest_income - accrual.interest_expense + fee_income
        - operating_expenses
        - tax;

    // Loan interest already sits in cash; move only the remainder.
    let residual_cash = operating_cash_delta - loan_interest_income;
    if residual_cash >= 0.0 {
        let _ = state.balance_sheet.credit_cash(residual_cash);
    } else {
        let requested = -residual_cash;
        let paid = state.balance_sheet.debit_cash_up_to(requested);
        if paid + 1e-6 < requested {
            state.status.has_failed = true;
            events.log(
                Event::error(format!(
                    "Operating outflows exceeded cash by {:.0}m",
                    (requested - paid) / 1e6
                ))
                .with_id("capital:cashShortfall"),
            );
        }
    }

    operating_cash_delta
}

/// Build the cash-flow statement and verify the tie-out.
///
/// Balance movements are classified per product; asset movements are
/// taken net of non-cash write-downs so losses do not masquerade as cash.
#[allow(clippy::too_many_arguments)]
pub fn build_cash_flow_statement(
    input: &BankState,
    output: &mut BankState,
    config: &SimulationConfig,
    cash_start: f64,
    operating_cash_delta: f64,
    non_cash_losses: &BTreeMap<ProductType, f64>,
    events: &mut EventLog,
) {
    let cash_end = output.balance_sheet.cash_balance();
    let net_change = cash_end - cash_start;

    let mut operating_balance_flow = 0.0;
    let mut investing = 0.0;
    let mut financing = 0.0;

    // Lines are never removed, so the output book covers every product
    // present in either state, in insertion order.
    for item in output.balance_sheet.items() {
        let product = item.product_type;
        if product == ProductType::CashReserves {
            continue;
        }
        let previous = input.balance_sheet.get(product).map_or(0.0, |i| i.balance);
        let delta = item.balance - previous;
        match product.side() {
            Side::Asset => {
                // Reverse sign: growing an asset consumes cash. Add back
                // write-downs so they do not read as cash inflows.
                let losses = non_cash_losses.get(&product).copied().unwrap_or(0.0);
                let flow = -(delta + losses);
                if product == ProductType::Gilts {
                    investing += flow;
                } else {
                    operating_balance_flow += flow;
                }
            }
            Side::Liability => {
                if OPERATING_LIABILITIES.contains(&product) {
                    operating_balance_flow += delta;
                } else {
                    financing += delta;
                }
            }
        }
    }

    // Capital raised or returned outside of earnings is financing.
    let external_capital_flow = output.capital.total()
        - input.capital.total()
        - output.income_statement.net_income;
    financing += external_capital_flow;

    let mut operating = operating_cash_delta + operating_balance_flow;

    let mismatch = operating + investing + financing - net_change;
    if mismatch.abs() <= config.tolerances.cash_flow_rounding_tolerance {
        operating -= mismatch;
    } else if mismatch.abs() > config.tolerances.cash_flow_breach_threshold {
        output.status.has_failed = true;
        events.log(
            Event::error(format!(
                "Cash-flow statement does not tie out: residual {:.4}",
                mismatch
            ))
            .with_id("statements:cashFlowBreach"),
        );
    } else {
        events.log(
            Event::warning(format!(
                "Cash-flow residual {:.4} above rounding tolerance",
                mismatch
            ))
            .with_id("statements:cashFlowResidual"),
        );
    }

    output.cash_flow_statement = CashFlowStatement {
        cash_start,
        cash_end,
        net_change,
        operating,
        investing,
        financing,
    };
}
