//! Macro-market model
//!
//! Advances the market one calendar month at a time. Each tick draws
//! correlated factor shocks, transitions the GDP regime, updates the
//! observables (GDP, inflation, unemployment), runs the central bank's
//! Taylor rule, refits the gilt curve through three anchor yields, and
//! passes the result through to product spreads, repo haircuts and
//! competitor pricing.
//!
//! Draw order within a tick is fixed and is part of the determinism
//! contract. The RNG's terminal state is written back into
//! `market.macro_model.rng_seed` so the next step resumes the stream.

use crate::error::SimulationError;
use crate::market::cholesky::{correlate, shock_loadings, FACTOR_AR};
use crate::market::curve::{evaluate_tenors, fit_or_fallback, ANCHOR_MATURITIES, NS_LAMBDA};
use crate::market::state::{GdpRegime, MarketState};
use crate::models::event::{Event, EventLog};
use crate::rng::Xorshift32;

// Regime Markov chain.
const P_ENTER_RECESSION: f64 = 0.03;
const P_STAY_RECESSION: f64 = 0.90;

// GDP process (monthly units).
const GDP_TREND: f64 = 0.0015;
const GDP_REGIME_MEAN: [f64; 2] = [0.0005, -0.0040]; // [normal, recession]
const GDP_REGIME_SD: [f64; 2] = [0.002, 0.004];
const GDP_ALPHA_D: f64 = 0.004;
const GDP_ALPHA_S: f64 = 0.002;
const GDP_ALPHA_F: f64 = 0.003;

// Inflation process (annualised level, monthly update).
const INFLATION_TARGET: f64 = 0.02;
const INFLATION_PERSISTENCE: f64 = 0.9;
const INFLATION_B_S: f64 = 0.004;
const INFLATION_B_D: f64 = 0.002;
const INFLATION_NOISE_SD: f64 = 0.0012;

// Unemployment latent process.
const UNEMP_REVERSION: f64 = 0.08;
const UNEMP_OKUN: f64 = 2.5 * 12.0;
const UNEMP_F_LOADING: f64 = 0.08;
const UNEMP_NOISE_SD: f64 = 0.02;

// Taylor rule.
const NATURAL_REAL_RATE: f64 = 0.005;
const TAYLOR_INFLATION_GAIN: f64 = 1.5;
const TAYLOR_D_LOADING: f64 = 0.003;
const POLICY_SMOOTHING: f64 = 0.9;
const POLICY_NOISE_SD: f64 = 0.0007;

// Term premium.
const TP_MEAN: f64 = 0.0185;
const TP_PERSISTENCE: f64 = 0.97;
const TP_F_LOADING: f64 = 0.0025;
const TP_INFLATION_GAP_LOADING: f64 = 0.08;
const TP_NOISE_SD: f64 = 0.0012;

// Curve anchors.
const ANCHOR_NOISE_SD: f64 = 0.0005;

// Credit spread.
const CS_REVERSION: f64 = 0.3;
const CS_NOISE_SD: f64 = 0.0008;

// Product spread / haircut pass-through.
const SPREAD_REVERSION: f64 = 0.7;
const SPREAD_NOISE_SD: f64 = 0.0003;
const HAIRCUT_REVERSION: f64 = 0.25;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.clamp(lo, hi)
}

/// Advance the market by `max(1, round(dt_months))` monthly ticks.
///
/// Fallbacks in the curve fit are reported as warning events. Fails only
/// if the process-wide Cholesky factor is unavailable.
pub fn advance_market(
    market: &mut MarketState,
    dt_months: f64,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    let loadings = shock_loadings()?;
    let months = (dt_months.round() as i64).max(1);
    let mut rng = Xorshift32::new(market.macro_model.rng_seed);

    for _ in 0..months {
        tick(market, loadings, &mut rng, events);
    }

    market.macro_model.rng_seed = rng.state();
    Ok(())
}

fn tick(
    market: &mut MarketState,
    loadings: &[[f64; 4]; 4],
    rng: &mut Xorshift32,
    events: &mut EventLog,
) {
    let m = &mut market.macro_model;

    // 1. Factor AR(1) with correlated shocks.
    let z = [rng.normal(), rng.normal(), rng.normal(), rng.normal()];
    let shocks = correlate(loadings, &z);
    for i in 0..4 {
        m.factors[i] = FACTOR_AR[i] * m.factors[i] + shocks[i];
    }
    let [d, s, f, _r] = m.factors;

    // Regime transition.
    let u = rng.uniform();
    m.regime = match m.regime {
        GdpRegime::Normal if u < P_ENTER_RECESSION => GdpRegime::Recession,
        GdpRegime::Normal => GdpRegime::Normal,
        GdpRegime::Recession if u < P_STAY_RECESSION => GdpRegime::Recession,
        GdpRegime::Recession => GdpRegime::Normal,
    };
    let regime_ix = match m.regime {
        GdpRegime::Normal => 0,
        GdpRegime::Recession => 1,
    };

    // 2. GDP growth.
    let gdp = GDP_TREND + GDP_REGIME_MEAN[regime_ix] + GDP_ALPHA_D * d - GDP_ALPHA_S * s
        - GDP_ALPHA_F * f
        + rng.normal_scaled(GDP_REGIME_SD[regime_ix]);

    // 3. Inflation.
    let pi = clamp(
        (1.0 - INFLATION_PERSISTENCE) * INFLATION_TARGET
            + INFLATION_PERSISTENCE * market.observables.inflation_rate
            + INFLATION_B_S * s
            + INFLATION_B_D * d
            + rng.normal_scaled(INFLATION_NOISE_SD),
        -0.02,
        0.15,
    );

    // 4. Unemployment via latent sigmoid state.
    let gdp_gap = gdp - GDP_TREND;
    let x = m.latent_unemployment + UNEMP_REVERSION * (0.0 - m.latent_unemployment)
        - UNEMP_OKUN * gdp_gap
        + UNEMP_F_LOADING * f
        + rng.normal_scaled(UNEMP_NOISE_SD);
    m.latent_unemployment = x;
    let unemployment = 0.02 + 0.10 * sigmoid(x);

    // 5. Policy rate, Taylor rule with smoothing.
    let taylor_target = NATURAL_REAL_RATE
        + pi
        + TAYLOR_INFLATION_GAIN * (pi - INFLATION_TARGET)
        + TAYLOR_D_LOADING * d;
    let policy = clamp(
        POLICY_SMOOTHING * market.base_rate
            + (1.0 - POLICY_SMOOTHING) * taylor_target
            + rng.normal_scaled(POLICY_NOISE_SD),
        0.0,
        0.12,
    );

    // 6. Term premium.
    let tp = clamp(
        TP_MEAN
            + TP_PERSISTENCE * (m.term_premium - TP_MEAN)
            + TP_F_LOADING * f
            + TP_INFLATION_GAP_LOADING * (pi - INFLATION_TARGET)
            + rng.normal_scaled(TP_NOISE_SD),
        0.0,
        0.06,
    );
    m.term_premium = tp;

    // 7. Curve: three anchors, exact Nelson-Siegel fit, evaluated tenors.
    let neutral = NATURAL_REAL_RATE + pi;
    let anchor_yields = [
        (policy + 0.10 * tp + rng.normal_scaled(ANCHOR_NOISE_SD)).max(0.0),
        (0.70 * policy + 0.30 * neutral + 0.50 * tp + rng.normal_scaled(ANCHOR_NOISE_SD)).max(0.0),
        (0.40 * policy + 0.60 * neutral + tp + rng.normal_scaled(ANCHOR_NOISE_SD)).max(0.0),
    ];
    let (factors, fell_back) = fit_or_fallback(
        &ANCHOR_MATURITIES,
        &anchor_yields,
        NS_LAMBDA,
        Some(&market.gilt_curve.factors),
    );
    if fell_back {
        events.log(
            Event::warning("Yield-curve fit was singular; reusing previous curve factors")
                .with_id("market:curveFallback"),
        );
    }
    market.gilt_curve.yields = evaluate_tenors(&factors);
    market.gilt_curve.factors = factors;
    market.risk_free_short = market.gilt_curve.yields.y1;
    market.risk_free_long = market.gilt_curve.yields.y30;

    // 8. Credit spread, mean-reverting with macro loadings.
    let in_recession = m.regime == GdpRegime::Recession;
    let cs_target =
        0.010 + 0.004 * f + 0.002 * s + if in_recession { 0.008 } else { 0.0 };
    market.spreads.credit = clamp(
        market.spreads.credit
            + CS_REVERSION * (cs_target - market.spreads.credit)
            + rng.normal_scaled(CS_NOISE_SD),
        0.0,
        0.05,
    );
    let cs = market.spreads.credit;

    // 9. Product spreads and repo haircuts pass through.
    let step_spread = |current: f64, target: f64, rng: &mut Xorshift32| {
        clamp(
            current + SPREAD_REVERSION * (target - current) + rng.normal_scaled(SPREAD_NOISE_SD),
            0.0,
            0.08,
        )
    };
    market.spreads.mortgage = step_spread(market.spreads.mortgage, 0.015 + 0.5 * cs, rng);
    market.spreads.corporate_loan =
        step_spread(market.spreads.corporate_loan, 0.020 + 0.8 * cs, rng);
    market.spreads.wholesale = step_spread(market.spreads.wholesale, 0.004 + 0.3 * cs, rng);
    market.spreads.senior_debt = step_spread(market.spreads.senior_debt, 0.008 + 0.5 * cs, rng);

    let step_haircut = |current: f64, target: f64, rng: &mut Xorshift32| {
        clamp(
            current + HAIRCUT_REVERSION * (target - current) + rng.normal_scaled(SPREAD_NOISE_SD),
            0.0,
            0.4,
        )
    };
    market.haircuts.gilt = step_haircut(market.haircuts.gilt, 0.02 + 0.5 * cs, rng);
    market.haircuts.corporate_bond =
        step_haircut(market.haircuts.corporate_bond, 0.08 + 1.5 * cs, rng);

    // 10. Competitor pricing.
    let deposit_anchor = (policy - 0.025).max(0.0);
    let retail = market.competitors.retail_deposit;
    market.competitors.retail_deposit =
        clamp(retail + 0.25 * (deposit_anchor - retail), 0.0, policy);
    if let Some(corp) = market.competitors.corporate_deposit {
        market.competitors.corporate_deposit = Some(clamp(
            corp + 0.5 * (deposit_anchor + 0.005 - corp),
            0.0,
            policy,
        ));
    }
    let mortgage_anchor = market.gilt_curve.yields.y5 + market.spreads.mortgage - 0.005;
    let comp_mortgage = market.competitors.mortgage;
    market.competitors.mortgage =
        clamp(comp_mortgage + 0.2 * (mortgage_anchor - comp_mortgage), 0.0, 0.20);

    // Observables last, all from this tick's values.
    market.base_rate = policy;
    market.observables.gdp_growth_mom = gdp;
    market.observables.inflation_rate = pi;
    market.observables.unemployment_rate = unemployment;
}
