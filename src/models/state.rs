//! Bank state
//!
//! `BankState` is the root of the simulation's data tree. Every entity is
//! exclusively owned by the enclosing state: no `Rc`, no interior
//! mutability, no aliasing. Because of that, `Clone` is exactly the deep
//! structural clone the step pipeline needs — the clone shares no mutable
//! state with the original.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::clock::SimulationClock;
use crate::market::state::MarketState;
use crate::models::balance_sheet::BalanceSheet;
use crate::models::cohort::LoanCohort;
use crate::models::product::ProductType;
use crate::models::statements::{CashFlowStatement, IncomeStatement};

/// Stable version tag written into every state.
pub const STATE_VERSION: &str = "bank-sim-core/1";

/// Regulatory capital stack.
///
/// CET1 may go negative under severe losses; AT1 stays non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalState {
    pub cet1: f64,
    pub at1: f64,
}

impl CapitalState {
    pub fn total(&self) -> f64 {
        self.cet1 + self.at1
    }
}

/// Serde treatment for ratios that may legitimately be +infinity.
///
/// JSON has no infinity literal, so a non-finite ratio serializes as
/// `null` and `null` deserializes back to +infinity — the only non-finite
/// value the invariants permit.
pub mod maybe_infinite {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, ser: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            ser.serialize_f64(*value)
        } else {
            ser.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(de)?.unwrap_or(f64::INFINITY))
    }
}

/// Computed regulatory metrics for the step just taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub rwa: f64,
    pub leverage_exposure: f64,
    #[serde(with = "maybe_infinite")]
    pub cet1_ratio: f64,
    #[serde(with = "maybe_infinite")]
    pub leverage_ratio: f64,
    pub hqla: f64,
    #[serde(with = "maybe_infinite")]
    pub lcr: f64,
    /// Stress multiplier applied to customer-deposit outflows this step.
    pub lcr_outflow_multiplier: f64,
    pub asf: f64,
    pub rsf: f64,
    #[serde(with = "maybe_infinite")]
    pub nsfr: f64,
}

impl Default for RiskMetrics {
    fn default() -> Self {
        Self {
            rwa: 0.0,
            leverage_exposure: 0.0,
            cet1_ratio: f64::INFINITY,
            leverage_ratio: f64::INFINITY,
            hqla: 0.0,
            lcr: f64::INFINITY,
            lcr_outflow_multiplier: 1.0,
            asf: 0.0,
            rsf: 0.0,
            nsfr: f64::INFINITY,
        }
    }
}

/// Per-ratio compliance against the configured minima (true = compliant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub cet1: bool,
    pub leverage: bool,
    pub lcr: bool,
    pub nsfr: bool,
}

impl Default for Compliance {
    fn default() -> Self {
        Self {
            cet1: true,
            leverage: true,
            lcr: true,
            nsfr: true,
        }
    }
}

impl Compliance {
    pub fn all_ok(&self) -> bool {
        self.cet1 && self.leverage && self.lcr && self.nsfr
    }
}

/// Soft franchise measures. Currently informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviouralState {
    pub deposit_franchise_strength: f64,
    pub reputation: f64,
    pub rating_notch_offset: i32,
}

impl Default for BehaviouralState {
    fn default() -> Self {
        Self {
            deposit_franchise_strength: 1.0,
            reputation: 1.0,
            rating_notch_offset: 0,
        }
    }
}

/// Terminal status flags. `has_failed` is sticky: once set it stays set,
/// though the core keeps stepping if the caller asks it to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    pub is_in_resolution: bool,
    pub has_failed: bool,
}

/// Root of the simulation state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankState {
    pub balance_sheet: BalanceSheet,
    pub capital: CapitalState,
    pub income_statement: IncomeStatement,
    pub cash_flow_statement: CashFlowStatement,
    pub risk: RiskMetrics,
    pub compliance: Compliance,
    pub market: MarketState,
    pub behaviour: BehaviouralState,
    /// Cohorts per loan product; iteration follows the canonical product
    /// order because the key is ordered.
    pub loan_cohorts: BTreeMap<ProductType, Vec<LoanCohort>>,
    pub status: StatusFlags,
    pub clock: SimulationClock,
    pub version: String,
}

impl BankState {
    /// Sum of cohort outstandings for one loan product.
    pub fn cohort_outstanding(&self, product: ProductType) -> f64 {
        self.loan_cohorts
            .get(&product)
            .map_or(0.0, |cs| cs.iter().map(|c| c.outstanding_principal).sum())
    }

    /// Equity both capital classes together.
    pub fn total_capital(&self) -> f64 {
        self.capital.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_deep() {
        let mut a = crate::config::defaults::default_bank_state(1);
        let b = a.clone();
        a.capital.cet1 += 1.0e9;
        if let Some(item) = a.balance_sheet.get_mut(ProductType::Gilts) {
            item.balance = 0.0;
        }
        a.loan_cohorts.get_mut(&ProductType::Mortgages).unwrap().clear();
        // b is untouched by any mutation of a
        assert_ne!(a.capital.cet1, b.capital.cet1);
        assert!(b.balance_sheet.get(ProductType::Gilts).unwrap().balance > 0.0);
        assert!(!b.loan_cohorts[&ProductType::Mortgages].is_empty());
    }

    #[test]
    fn test_infinite_ratio_round_trips_through_json() {
        let mut metrics = RiskMetrics::default();
        metrics.lcr = f64::INFINITY;
        metrics.nsfr = 1.3;
        let json = serde_json::to_string(&metrics).unwrap();
        let back: RiskMetrics = serde_json::from_str(&json).unwrap();
        assert!(back.lcr.is_infinite() && back.lcr > 0.0);
        assert!((back.nsfr - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_compliance_all_ok() {
        let mut c = Compliance::default();
        assert!(c.all_ok());
        c.lcr = false;
        assert!(!c.all_ok());
    }
}
