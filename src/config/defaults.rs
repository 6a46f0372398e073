//! Default configuration: a mid-sized UK-style bank
//!
//! Roughly £360bn of assets funded by sticky retail deposits, a corporate
//! book and a wholesale tail, with CET1 £18bn / AT1 £2bn. Opening ratios:
//! CET1 ≈ 12.6%, leverage ≈ 5.6%, LCR ≈ 2.0, NSFR ≈ 1.5 — comfortably
//! above the default limits so reference scenarios start compliant.

use std::collections::BTreeMap;

use crate::config::{
    BehaviourConfig, ClockConfig, GlobalConfig, LoanConfig, ProductParameters, RiskLimits,
    RunShockConfig, ShockParameters, SimulationConfig, Tolerances,
};
use crate::core::clock::SimulationClock;
use crate::market::curve::{evaluate_tenors, NS_LAMBDA};
use crate::market::state::{
    CompetitorRates, GdpRegime, GiltCurve, MacroModelState, MacroObservables, MarketSpreads,
    MarketState, NelsonSiegelFactors, RepoHaircuts,
};
use crate::models::balance_sheet::{BalanceSheet, BalanceSheetItem, HqlaLevel, LiquidityTag};
use crate::models::cohort::LoanCohort;
use crate::models::product::ProductType;
use crate::models::state::{
    BankState, BehaviouralState, CapitalState, Compliance, RiskMetrics, StatusFlags, STATE_VERSION,
};

/// 2025-01-01T00:00:00Z.
const DEFAULT_START_DATE_MS: i64 = 1_735_689_600_000;

fn bn(x: f64) -> f64 {
    x * 1.0e9
}

fn tag(
    hqla: HqlaLevel,
    outflow: Option<f64>,
    inflow: Option<f64>,
    asf: Option<f64>,
    rsf: Option<f64>,
) -> LiquidityTag {
    LiquidityTag {
        hqla_level: hqla,
        lcr_outflow_rate: outflow,
        lcr_inflow_rate: inflow,
        nsfr_asf_factor: asf,
        nsfr_rsf_factor: rsf,
    }
}

fn item(
    product: ProductType,
    balance: f64,
    rate: f64,
    bucket: &str,
    liquidity: LiquidityTag,
) -> BalanceSheetItem {
    BalanceSheetItem {
        product_type: product,
        balance,
        interest_rate: rate,
        maturity_bucket: bucket.to_string(),
        encumbered: 0.0,
        liquidity,
    }
}

fn default_liquidity_tags() -> BTreeMap<ProductType, LiquidityTag> {
    use ProductType::*;
    let l1 = HqlaLevel::Level1;
    let untiered = HqlaLevel::None;
    let mut tags = BTreeMap::new();
    tags.insert(CashReserves, tag(l1, None, None, None, Some(0.0)));
    tags.insert(Gilts, tag(l1, None, None, None, Some(0.05)));
    tags.insert(Mortgages, tag(untiered, None, Some(0.01), None, Some(0.65)));
    tags.insert(
        CorporateLoans,
        tag(untiered, None, Some(0.02), None, Some(0.85)),
    );
    tags.insert(
        ReverseRepo,
        tag(untiered, None, Some(1.0), None, Some(0.10)),
    );
    tags.insert(
        RetailDeposits,
        tag(untiered, Some(0.05), None, Some(0.95), None),
    );
    tags.insert(
        CorporateDeposits,
        tag(untiered, Some(0.25), None, Some(0.50), None),
    );
    tags.insert(
        WholesaleFundingSt,
        tag(untiered, Some(1.0), None, Some(0.0), None),
    );
    tags.insert(
        WholesaleFundingLt,
        tag(untiered, None, None, Some(1.0), None),
    );
    tags.insert(
        RepurchaseAgreements,
        tag(untiered, Some(1.0), None, Some(0.0), None),
    );
    tags
}

fn default_product_parameters() -> BTreeMap<ProductType, ProductParameters> {
    use ProductType::*;

    let plain = |risk_weight: f64, elasticity: f64| ProductParameters {
        risk_weight,
        base_default_rate: 0.0,
        loss_given_default: 0.0,
        volume_elasticity_to_rate: elasticity,
        loan: None,
    };

    let mut params = BTreeMap::new();
    params.insert(CashReserves, plain(0.0, 0.0));
    params.insert(Gilts, plain(0.0, 0.0));
    params.insert(
        Mortgages,
        ProductParameters {
            risk_weight: 0.35,
            base_default_rate: 0.008,
            loss_given_default: 0.15,
            volume_elasticity_to_rate: -6.0,
            loan: Some(LoanConfig {
                default_term_months: 300,
                max_term_months: 420,
                initial_seasoning_enabled: true,
                initial_coupon_dispersion_bps: 40.0,
                initial_pd_multiplier_range: [0.7, 1.4],
                initial_lgd_multiplier_range: [0.8, 1.2],
                initial_min_bucket_outstanding: 1.0e6,
            }),
        },
    );
    params.insert(
        CorporateLoans,
        ProductParameters {
            risk_weight: 1.0,
            base_default_rate: 0.02,
            loss_given_default: 0.45,
            volume_elasticity_to_rate: -4.0,
            loan: Some(LoanConfig {
                default_term_months: 60,
                max_term_months: 120,
                initial_seasoning_enabled: true,
                initial_coupon_dispersion_bps: 60.0,
                initial_pd_multiplier_range: [0.6, 1.6],
                initial_lgd_multiplier_range: [0.8, 1.2],
                initial_min_bucket_outstanding: 1.0e6,
            }),
        },
    );
    params.insert(ReverseRepo, plain(0.10, 0.0));
    params.insert(RetailDeposits, plain(0.0, 8.0));
    params.insert(CorporateDeposits, plain(0.0, 6.0));
    params.insert(WholesaleFundingSt, plain(0.0, 0.0));
    params.insert(WholesaleFundingLt, plain(0.0, 0.0));
    params.insert(RepurchaseAgreements, plain(0.0, 0.0));
    params
}

fn default_balance_sheet(tags: &BTreeMap<ProductType, LiquidityTag>) -> Vec<BalanceSheetItem> {
    use ProductType::*;
    let t = |p: ProductType| tags.get(&p).cloned().unwrap_or_default();
    vec![
        item(CashReserves, bn(40.0), 0.0425, "onDemand", t(CashReserves)),
        item(Gilts, bn(60.0), 0.042, "1y-30y", t(Gilts)),
        item(Mortgages, bn(180.0), 0.045, "25y", t(Mortgages)),
        item(CorporateLoans, bn(80.0), 0.055, "5y", t(CorporateLoans)),
        item(
            RetailDeposits,
            bn(220.0),
            0.015,
            "onDemand",
            t(RetailDeposits),
        ),
        item(
            CorporateDeposits,
            bn(90.0),
            0.02,
            "onDemand",
            t(CorporateDeposits),
        ),
        item(
            WholesaleFundingSt,
            bn(15.0),
            0.045,
            "3m",
            t(WholesaleFundingSt),
        ),
        item(
            WholesaleFundingLt,
            bn(15.0),
            0.05,
            "5y",
            t(WholesaleFundingLt),
        ),
    ]
}

/// Opening market snapshot with the macro RNG seeded as given.
pub fn default_market_state(rng_seed: u32) -> MarketState {
    let factors = NelsonSiegelFactors {
        level: 0.047,
        slope: -0.007,
        curvature: 0.002,
        lambda: NS_LAMBDA,
    };
    let yields = evaluate_tenors(&factors);
    let risk_free_short = yields.y1;
    let risk_free_long = yields.y30;
    MarketState {
        base_rate: 0.0425,
        risk_free_short,
        risk_free_long,
        spreads: MarketSpreads {
            mortgage: 0.017,
            corporate_loan: 0.025,
            wholesale: 0.006,
            senior_debt: 0.012,
            credit: 0.012,
        },
        haircuts: RepoHaircuts {
            gilt: 0.02,
            corporate_bond: 0.10,
        },
        competitors: CompetitorRates {
            retail_deposit: 0.0175,
            corporate_deposit: Some(0.0225),
            mortgage: 0.045,
        },
        observables: MacroObservables {
            gdp_growth_mom: 0.0015,
            unemployment_rate: 0.043,
            inflation_rate: 0.025,
        },
        gilt_curve: GiltCurve { factors, yields },
        macro_model: MacroModelState {
            factors: [0.0; 4],
            regime: GdpRegime::Normal,
            // sigmoid(-1.208) ~ 0.23 maps to 4.3% unemployment.
            latent_unemployment: -1.208,
            term_premium: 0.0185,
            rng_seed,
        },
    }
}

/// The complete default configuration.
pub fn default_config() -> SimulationConfig {
    let liquidity_tags = default_liquidity_tags();
    let initial_balance_sheet = default_balance_sheet(&liquidity_tags);
    SimulationConfig {
        global: GlobalConfig {
            tax_rate: 0.25,
            operating_cost_ratio: 0.009,
            max_deposit_growth_per_step: 0.10,
            max_loan_growth_per_step: 0.05,
            fixed_operating_cost_per_month: 1.0e7,
            initial_portfolio_seed: Some(12345),
        },
        product_parameters: default_product_parameters(),
        liquidity_tags,
        risk_limits: RiskLimits {
            min_cet1_ratio: 0.045,
            min_leverage_ratio: 0.03,
            min_lcr: 1.0,
            min_nsfr: 1.0,
        },
        behaviour: BehaviourConfig {
            deposit_baseline_growth_monthly: 0.002,
            loan_baseline_growth_monthly: 0.003,
            min_deposit_growth_per_step: -0.20,
            min_loan_growth_per_step: -0.10,
            loan_fee_rate_monthly: 0.0002,
        },
        shock_parameters: ShockParameters {
            idiosyncratic_run: RunShockConfig {
                base_run_off_rate: 0.03,
                incremental_rate: 0.05,
                max_run_off_rate: 0.35,
            },
        },
        tolerances: Tolerances {
            cash_flow_rounding_tolerance: 1.0e-2,
            cash_flow_breach_threshold: 1.0,
        },
        initial_balance_sheet,
        initial_capital: CapitalState {
            cet1: bn(18.0),
            at1: bn(2.0),
        },
        initial_market: default_market_state(987_654_321),
        initial_behaviour: BehaviouralState::default(),
        clock: ClockConfig {
            step_length_months: 1.0,
            start_date_ms: DEFAULT_START_DATE_MS,
        },
    }
}

/// A bank state straight from the config, with one fresh cohort per loan
/// product instead of a seasoned book. Used by unit tests and as the
/// skeleton the seasoned bootstrap fills in.
pub fn default_bank_state(macro_rng_seed: u32) -> BankState {
    let config = default_config();
    let mut state = state_skeleton(&config);
    state.market.macro_model.rng_seed = macro_rng_seed;
    for product in ProductType::LOANS {
        let balance = state
            .balance_sheet
            .get(product)
            .map_or(0.0, |i| i.balance);
        let rate = state
            .balance_sheet
            .get(product)
            .map_or(0.0, |i| i.interest_rate);
        let params = config.product(product).expect("default config is complete");
        let loan = params.loan.as_ref().expect("loan products carry loan config");
        state.loan_cohorts.insert(
            product,
            vec![LoanCohort {
                product_type: product,
                cohort_id: 0,
                original_principal: balance,
                outstanding_principal: balance,
                annual_interest_rate: rate,
                term_months: loan.default_term_months,
                age_months: 0,
                annual_pd: params.base_default_rate,
                lgd: params.loss_given_default,
            }],
        );
    }
    state
}

/// Build the opening state tree from a config, with empty cohort lists.
pub fn state_skeleton(config: &SimulationConfig) -> BankState {
    let mut loan_cohorts = BTreeMap::new();
    for product in ProductType::LOANS {
        loan_cohorts.insert(product, Vec::new());
    }
    BankState {
        balance_sheet: BalanceSheet::new(config.initial_balance_sheet.clone()),
        capital: config.initial_capital.clone(),
        income_statement: Default::default(),
        cash_flow_statement: Default::default(),
        risk: RiskMetrics::default(),
        compliance: Compliance::default(),
        market: config.initial_market.clone(),
        behaviour: config.initial_behaviour.clone(),
        loan_cohorts,
        status: StatusFlags::default(),
        clock: SimulationClock::new(config.clock.start_date_ms, config.clock.step_length_months),
        version: STATE_VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_book_balances() {
        let config = default_config();
        let book = BalanceSheet::new(config.initial_balance_sheet.clone());
        let assets = book.total_assets();
        let liabilities = book.total_liabilities();
        let equity = config.initial_capital.cet1 + config.initial_capital.at1;
        assert!(
            (assets - liabilities - equity).abs() < 1.0,
            "opening book must balance: {} vs {} + {}",
            assets,
            liabilities,
            equity
        );
    }

    #[test]
    fn test_default_market_curve_is_consistent() {
        let market = default_market_state(1);
        assert_eq!(market.risk_free_short, market.gilt_curve.yields.y1);
        assert_eq!(market.risk_free_long, market.gilt_curve.yields.y30);
        assert!(market.risk_free_long > market.risk_free_short);
    }

    #[test]
    fn test_default_bank_state_cohorts_match_balances() {
        let state = default_bank_state(1);
        for product in ProductType::LOANS {
            let balance = state.balance_sheet.get(product).unwrap().balance;
            assert!((state.cohort_outstanding(product) - balance).abs() < 1e-6);
        }
    }
}
