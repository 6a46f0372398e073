//! Regulatory risk metrics
//!
//! RWA, leverage exposure, HQLA, LCR (with the 75% inflow cap) and NSFR,
//! plus compliance evaluation against the configured minima. Ratios with
//! a zero denominator report +infinity, never NaN: an unlevered bank is
//! infinitely capitalised, not undefined.

use crate::config::{RiskLimits, SimulationConfig};
use crate::error::SimulationError;
use crate::models::product::Side;
use crate::models::state::{BankState, Compliance, RiskMetrics};

/// Fraction of stressed outflows that inflows may offset.
const LCR_INFLOW_CAP: f64 = 0.75;

/// Numerator over denominator, +infinity when the denominator is zero.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        f64::INFINITY
    }
}

/// Compute the full metric set for a state.
///
/// `lcr_outflow_multiplier` is the step's composed stress multiplier; it
/// scales outflow rates on customer deposits only.
pub fn compute_metrics(
    state: &BankState,
    config: &SimulationConfig,
    lcr_outflow_multiplier: f64,
) -> Result<RiskMetrics, SimulationError> {
    let mut rwa = 0.0;
    let mut leverage_exposure = 0.0;
    let mut hqla = 0.0;
    let mut outflows = 0.0;
    let mut inflows = 0.0;
    let mut asf = state.capital.cet1 + state.capital.at1;
    let mut rsf = 0.0;

    for item in state.balance_sheet.items() {
        let product = item.product_type;
        if product.side() == Side::Asset {
            rwa += item.balance * config.product(product)?.risk_weight;
            leverage_exposure += item.balance;
            hqla += item.unencumbered() * item.liquidity.hqla_level.factor();
        }
        if let Some(rate) = item.liquidity.lcr_outflow_rate {
            let stress = if product.is_customer_deposit() {
                lcr_outflow_multiplier
            } else {
                1.0
            };
            outflows += item.balance * rate * stress;
        }
        if let Some(rate) = item.liquidity.lcr_inflow_rate {
            inflows += item.balance * rate;
        }
        if let Some(factor) = item.liquidity.nsfr_asf_factor {
            asf += item.balance * factor;
        }
        if let Some(factor) = item.liquidity.nsfr_rsf_factor {
            rsf += item.balance * factor;
        }
    }

    let inflows_capped = inflows.min(LCR_INFLOW_CAP * outflows);
    let net_outflows = (outflows - inflows_capped).max(0.0);

    Ok(RiskMetrics {
        rwa,
        leverage_exposure,
        cet1_ratio: ratio(state.capital.cet1, rwa),
        leverage_ratio: ratio(state.capital.total(), leverage_exposure),
        hqla,
        lcr: ratio(hqla, net_outflows),
        lcr_outflow_multiplier,
        asf,
        rsf,
        nsfr: ratio(asf, rsf),
    })
}

/// Check each ratio against its minimum. True means compliant.
pub fn evaluate_compliance(metrics: &RiskMetrics, limits: &RiskLimits) -> Compliance {
    Compliance {
        cet1: metrics.cet1_ratio >= limits.min_cet1_ratio,
        leverage: metrics.leverage_ratio >= limits.min_leverage_ratio,
        lcr: metrics.lcr >= limits.min_lcr,
        nsfr: metrics.nsfr >= limits.min_nsfr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_bank_state;
    use crate::models::product::ProductType;

    #[test]
    fn test_default_bank_is_comfortably_compliant() {
        let state = default_bank_state(1);
        let config = SimulationConfig::default();
        let metrics = compute_metrics(&state, &config, 1.0).unwrap();
        // Opening book: CET1 ~12.6%, leverage ~5.6%, LCR ~2, NSFR ~1.5.
        assert!((metrics.cet1_ratio - 0.126).abs() < 0.01, "{}", metrics.cet1_ratio);
        assert!((metrics.leverage_ratio - 0.056).abs() < 0.005);
        assert!(metrics.lcr > 1.5 && metrics.lcr < 2.5, "{}", metrics.lcr);
        assert!(metrics.nsfr > 1.3 && metrics.nsfr < 1.8, "{}", metrics.nsfr);
        assert!(evaluate_compliance(&metrics, &config.risk_limits).all_ok());
    }

    #[test]
    fn test_encumbrance_reduces_hqla() {
        let mut state = default_bank_state(1);
        let config = SimulationConfig::default();
        let before = compute_metrics(&state, &config, 1.0).unwrap().hqla;
        state
            .balance_sheet
            .get_mut(ProductType::Gilts)
            .unwrap()
            .encumbered = 30.0e9;
        let after = compute_metrics(&state, &config, 1.0).unwrap().hqla;
        assert!((before - after - 30.0e9).abs() < 1e-3);
    }

    #[test]
    fn test_outflow_multiplier_hits_deposits_only() {
        let state = default_bank_state(1);
        let config = SimulationConfig::default();
        let base = compute_metrics(&state, &config, 1.0).unwrap();
        let stressed = compute_metrics(&state, &config, 2.0).unwrap();
        assert!(stressed.lcr < base.lcr);
        // Wholesale outflows are unscaled, so stressed outflows are less
        // than double the base.
        let base_net = base.hqla / base.lcr;
        let stressed_net = stressed.hqla / stressed.lcr;
        assert!(stressed_net < base_net * 2.0);
    }

    #[test]
    fn test_inflow_cap_binds() {
        let mut state = default_bank_state(1);
        let config = SimulationConfig::default();
        // A huge reverse-repo inflow cannot offset more than 75% of
        // outflows.
        let tag = config.liquidity_tag(ProductType::ReverseRepo);
        let item = state.balance_sheet.ensure(ProductType::ReverseRepo, tag);
        item.balance = 1_000.0e9;
        let metrics = compute_metrics(&state, &config, 1.0).unwrap();
        assert!(metrics.lcr.is_finite());
    }

    #[test]
    fn test_zero_denominators_give_positive_infinity() {
        let mut state = default_bank_state(1);
        let config = SimulationConfig::default();
        state.balance_sheet = crate::models::balance_sheet::BalanceSheet::new(vec![]);
        let metrics = compute_metrics(&state, &config, 1.0).unwrap();
        assert!(metrics.cet1_ratio.is_infinite() && metrics.cet1_ratio > 0.0);
        assert!(metrics.leverage_ratio.is_infinite() && metrics.leverage_ratio > 0.0);
        assert!(metrics.lcr.is_infinite() && metrics.lcr > 0.0);
        assert!(metrics.nsfr.is_infinite() && metrics.nsfr > 0.0);
    }

    #[test]
    fn test_negative_cet1_ratio_is_finite_negative_not_nan() {
        let mut state = default_bank_state(1);
        let config = SimulationConfig::default();
        state.capital.cet1 = -1.0e9;
        let metrics = compute_metrics(&state, &config, 1.0).unwrap();
        assert!(metrics.cet1_ratio < 0.0 && metrics.cet1_ratio.is_finite());
        assert!(!evaluate_compliance(&metrics, &config.risk_limits).cet1);
    }
}
