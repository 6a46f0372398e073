//! Monthly income and cash-flow statements
//!
//! Both statements describe the step just taken. Derived fields
//! (net interest income, net income, net change) are stored explicitly so
//! a serialized state is self-describing; the step pipeline recomputes
//! them each step.

use serde::{Deserialize, Serialize};

/// Income statement for one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub interest_income: f64,
    pub interest_expense: f64,
    /// `interest_income - interest_expense`.
    pub net_interest_income: f64,
    pub fee_income: f64,
    pub credit_losses: f64,
    pub operating_expenses: f64,
    pub pre_tax_profit: f64,
    /// `max(0, pre_tax_profit) * tax_rate`; no loss carryforward.
    pub tax: f64,
    /// `pre_tax_profit - tax`.
    pub net_income: f64,
}

/// Cash-flow statement for one step.
///
/// `operating + investing + financing = net_change` within the configured
/// breach threshold; the pipeline absorbs sub-tolerance residuals into
/// operating cash flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowStatement {
    pub cash_start: f64,
    pub cash_end: f64,
    /// `cash_end - cash_start`.
    pub net_change: f64,
    pub operating: f64,
    pub investing: f64,
    pub financing: f64,
}

impl CashFlowStatement {
    /// Residual between the decomposition and the observed cash movement.
    pub fn mismatch(&self) -> f64 {
        self.operating + self.investing + self.financing - self.net_change
    }
}
