//! Market state
//!
//! Everything the bank observes but does not control: the policy rate, the
//! gilt curve, product spreads, repo haircuts, competitor pricing, macro
//! observables, and the macro model's own substate (factors, regime,
//! latent unemployment, term premium, resumable RNG seed).

use serde::{Deserialize, Serialize};

/// Product-level credit spreads over the risk-free curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSpreads {
    pub mortgage: f64,
    pub corporate_loan: f64,
    pub wholesale: f64,
    pub senior_debt: f64,
    /// The economy-wide credit spread the product spreads key off.
    pub credit: f64,
}

/// Overcollateralisation required in repo, by collateral class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoHaircuts {
    pub gilt: f64,
    pub corporate_bond: f64,
}

/// What the competition is paying and charging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRates {
    pub retail_deposit: f64,
    /// Lazily initialised from the retail base when first shocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_deposit: Option<f64>,
    pub mortgage: f64,
}

/// Macro observables the behavioural layer and UI read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroObservables {
    /// Month-on-month real GDP growth.
    pub gdp_growth_mom: f64,
    pub unemployment_rate: f64,
    /// Annualised CPI inflation.
    pub inflation_rate: f64,
}

/// Nelson–Siegel parameters of the fitted gilt curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NelsonSiegelFactors {
    pub level: f64,
    pub slope: f64,
    pub curvature: f64,
    /// Decay parameter, in years. Fixed by the fitter.
    pub lambda: f64,
}

/// Curve evaluated at the standard tenors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveYields {
    pub y1: f64,
    pub y2: f64,
    pub y3: f64,
    pub y5: f64,
    pub y10: f64,
    pub y20: f64,
    pub y30: f64,
}

/// The gilt curve: fitted factors plus explicit tenors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiltCurve {
    pub factors: NelsonSiegelFactors,
    pub yields: CurveYields,
}

/// GDP regime of the 2-state Markov chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GdpRegime {
    Normal,
    Recession,
}

/// The macro model's internal state, carried across steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroModelState {
    /// Correlated factors (D, S, F, R): demand, supply, financial, rate.
    pub factors: [f64; 4],
    pub regime: GdpRegime,
    /// Latent state behind the sigmoid unemployment mapping.
    pub latent_unemployment: f64,
    pub term_premium: f64,
    /// Terminal RNG state of the last tick; next step resumes from here.
    pub rng_seed: u32,
}

/// Full market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
    /// Policy rate set by the central bank's Taylor rule.
    pub base_rate: f64,
    /// Short risk-free rate; kept equal to the fitted 1y yield.
    pub risk_free_short: f64,
    /// Long risk-free rate; kept equal to the fitted 30y yield.
    pub risk_free_long: f64,
    pub spreads: MarketSpreads,
    pub haircuts: RepoHaircuts,
    pub competitors: CompetitorRates,
    pub observables: MacroObservables,
    pub gilt_curve: GiltCurve,
    pub macro_model: MacroModelState,
}

impl MarketState {
    /// Competitor corporate-deposit rate, defaulting to the retail base
    /// when it has never been initialised.
    pub fn competitor_corporate_deposit(&self) -> f64 {
        self.competitors
            .corporate_deposit
            .unwrap_or(self.competitors.retail_deposit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corporate_competitor_defaults_to_retail() {
        let mut market = crate::config::defaults::default_market_state(42);
        market.competitors.corporate_deposit = None;
        assert_eq!(
            market.competitor_corporate_deposit(),
            market.competitors.retail_deposit
        );
        market.competitors.corporate_deposit = Some(0.03);
        assert_eq!(market.competitor_corporate_deposit(), 0.03);
    }
}
