//! Simulation configuration
//!
//! A single typed record merged from defaults and scenario overrides.
//! Purely data: no I/O, no environment lookups. The defaults describe a
//! complete mid-sized UK-style bank so a simulation can start from
//! `SimulationConfig::default()` alone.

pub mod defaults;
pub mod scenario;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::market::state::MarketState;
use crate::models::balance_sheet::{BalanceSheetItem, LiquidityTag};
use crate::models::product::ProductType;
use crate::models::state::{BehaviouralState, CapitalState};

pub use scenario::{apply_scenario, ScenarioOverrides};

/// Economy-wide knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Corporate tax rate applied to positive pre-tax profit, in [0, 1].
    pub tax_rate: f64,
    /// Annualised operating cost as a fraction of total assets.
    pub operating_cost_ratio: f64,
    pub max_deposit_growth_per_step: f64,
    pub max_loan_growth_per_step: f64,
    pub fixed_operating_cost_per_month: f64,
    /// Base seed for the seasoned-portfolio generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_portfolio_seed: Option<u32>,
}

/// Loan-specific parameters for a loan product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanConfig {
    pub default_term_months: u32,
    pub max_term_months: u32,
    #[serde(default = "default_true")]
    pub initial_seasoning_enabled: bool,
    #[serde(default = "default_coupon_dispersion")]
    pub initial_coupon_dispersion_bps: f64,
    #[serde(default = "default_pd_range")]
    pub initial_pd_multiplier_range: [f64; 2],
    #[serde(default = "default_lgd_range")]
    pub initial_lgd_multiplier_range: [f64; 2],
    #[serde(default = "default_min_bucket")]
    pub initial_min_bucket_outstanding: f64,
}

fn default_true() -> bool {
    true
}
fn default_coupon_dispersion() -> f64 {
    40.0
}
fn default_pd_range() -> [f64; 2] {
    [0.7, 1.4]
}
fn default_lgd_range() -> [f64; 2] {
    [0.8, 1.2]
}
fn default_min_bucket() -> f64 {
    1.0e6
}

/// Per-product risk and behavioural parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductParameters {
    pub risk_weight: f64,
    pub base_default_rate: f64,
    pub loss_given_default: f64,
    /// Sensitivity of volume growth to the own-rate vs competitor gap.
    /// Positive for deposits (paying more attracts), negative for loans
    /// (charging more repels).
    pub volume_elasticity_to_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanConfig>,
}

/// Regulatory minima; breaching any of them fails the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLimits {
    pub min_cet1_ratio: f64,
    pub min_leverage_ratio: f64,
    pub min_lcr: f64,
    pub min_nsfr: f64,
}

/// Behavioural-layer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviourConfig {
    pub deposit_baseline_growth_monthly: f64,
    pub loan_baseline_growth_monthly: f64,
    pub min_deposit_growth_per_step: f64,
    pub min_loan_growth_per_step: f64,
    pub loan_fee_rate_monthly: f64,
}

/// Deposit-run severity parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunShockConfig {
    pub base_run_off_rate: f64,
    pub incremental_rate: f64,
    pub max_run_off_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockParameters {
    pub idiosyncratic_run: RunShockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tolerances {
    /// Residual absorbed silently into operating cash flow.
    pub cash_flow_rounding_tolerance: f64,
    /// Residual beyond which the tie-out fails the bank.
    pub cash_flow_breach_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockConfig {
    pub step_length_months: f64,
    pub start_date_ms: i64,
}

/// The complete configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub global: GlobalConfig,
    pub product_parameters: BTreeMap<ProductType, ProductParameters>,
    pub liquidity_tags: BTreeMap<ProductType, LiquidityTag>,
    pub risk_limits: RiskLimits,
    pub behaviour: BehaviourConfig,
    pub shock_parameters: ShockParameters,
    pub tolerances: Tolerances,
    pub initial_balance_sheet: Vec<BalanceSheetItem>,
    pub initial_capital: CapitalState,
    pub initial_market: MarketState,
    pub initial_behaviour: BehaviouralState,
    pub clock: ClockConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        defaults::default_config()
    }
}

impl SimulationConfig {
    /// Parameters for a product; every product has an entry in a valid
    /// config, so absence is a configuration error.
    pub fn product(&self, product: ProductType) -> Result<&ProductParameters, SimulationError> {
        self.product_parameters.get(&product).ok_or_else(|| {
            SimulationError::InvalidConfig(format!("no product parameters for {:?}", product))
        })
    }

    /// Loan parameters for a loan product.
    pub fn loan(&self, product: ProductType) -> Result<&LoanConfig, SimulationError> {
        self.product(product)?
            .loan
            .as_ref()
            .ok_or(SimulationError::MissingLoanConfig(product))
    }

    /// Liquidity tag for a product, defaulting to untagged.
    pub fn liquidity_tag(&self, product: ProductType) -> LiquidityTag {
        self.liquidity_tags.get(&product).cloned().unwrap_or_default()
    }

    /// Cheap structural sanity checks on ranges the pipeline relies on.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(0.0..=1.0).contains(&self.global.tax_rate) {
            return Err(SimulationError::InvalidConfig(
                "taxRate must be within [0, 1]".to_string(),
            ));
        }
        if self.tolerances.cash_flow_rounding_tolerance < 0.0
            || self.tolerances.cash_flow_breach_threshold < 0.0
        {
            return Err(SimulationError::InvalidConfig(
                "cash-flow tolerances must be non-negative".to_string(),
            ));
        }
        for product in ProductType::LOANS {
            let loan = self.loan(product)?;
            if loan.default_term_months == 0 || loan.max_term_months == 0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "loan terms for {:?} must be positive",
                    product
                )));
            }
            let [lo, hi] = loan.initial_pd_multiplier_range;
            if lo > hi || lo < 0.0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "PD multiplier range for {:?} is inverted",
                    product
                )));
            }
            let [lo, hi] = loan.initial_lgd_multiplier_range;
            if lo > hi || lo < 0.0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "LGD multiplier range for {:?} is inverted",
                    product
                )));
            }
        }
        Ok(())
    }
}
