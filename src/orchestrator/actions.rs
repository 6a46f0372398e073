//! Player actions
//!
//! Actions are a closed, serde-tagged sum type applied in input order
//! after shocks. Each variant is a balance-sheet operation: pricing,
//! capital raising, debt issuance, asset trades, repo. Unrecognised tags
//! log a warning and are skipped.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::loans::engine::{originate, prepay};
use crate::models::event::{Event, EventLog};
use crate::models::product::{ProductType, Side};
use crate::models::state::BankState;

/// Which side of a repo the bank takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepoDirection {
    /// Pledge collateral, receive cash (Repurchase Agreements liability).
    Borrow,
    /// Lend cash against collateral (Reverse Repo asset).
    Lend,
}

/// A player decision for this step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerAction {
    /// Reprice a product.
    AdjustRate { product_type: ProductType, rate: f64 },
    /// Raise CET1 for cash.
    IssueEquity { amount: f64 },
    /// Issue wholesale funding at a given (or market) rate.
    IssueDebt {
        product_type: ProductType,
        amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
    },
    /// Grow or shrink an asset: originations/prepayments for loans,
    /// purchases/sales for everything else.
    BuySellAsset { product_type: ProductType, delta: f64 },
    /// Enter a repo or reverse repo.
    EnterRepo {
        direction: RepoDirection,
        collateral_product: ProductType,
        amount: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        haircut: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
    },
    /// Forward-compatibility: tags this core does not know.
    #[serde(other)]
    Unrecognised,
}

/// Apply every action in input order.
pub fn apply_actions(
    state: &mut BankState,
    config: &SimulationConfig,
    actions: &[PlayerAction],
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    for action in actions {
        apply_action(state, config, action, events)?;
    }
    Ok(())
}

fn apply_action(
    state: &mut BankState,
    config: &SimulationConfig,
    action: &PlayerAction,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    match action {
        PlayerAction::AdjustRate { product_type, rate } => {
            match state.balance_sheet.get_mut(*product_type) {
                Some(item) => {
                    item.interest_rate = rate.max(0.0);
                    events.log(Event::info(format!(
                        "{} repriced to {:.2}%",
                        product_type.label(),
                        rate * 100.0
                    )));
                }
                None => events.log(Event::warning(format!(
                    "Cannot reprice {}: not on the book",
                    product_type.label()
                ))),
            }
        }
        PlayerAction::IssueEquity { amount } => {
            if *amount <= 0.0 {
                events.log(Event::warning("Equity issuance ignored: non-positive amount"));
                return Ok(());
            }
            state.capital.cet1 += amount;
            if !state.balance_sheet.credit_cash(*amount) {
                return Err(SimulationError::MissingCashLine);
            }
            events.log(Event::info(format!(
                "Issued {:.0}m of equity",
                amount / 1e6
            )));
        }
        PlayerAction::IssueDebt {
            product_type,
            amount,
            rate,
        } => {
            apply_issue_debt(state, config, *product_type, *amount, *rate, events)?;
        }
        PlayerAction::BuySellAsset {
            product_type,
            delta,
        } => {
            apply_buy_sell(state, config, *product_type, *delta, events)?;
        }
        PlayerAction::EnterRepo {
            direction,
            collateral_product,
            amount,
            haircut,
            rate,
        } => {
            apply_repo(
                state,
                config,
                *direction,
                *collateral_product,
                *amount,
                *haircut,
                *rate,
                events,
            )?;
        }
        PlayerAction::Unrecognised => {
            events.log(
                Event::warning("Ignoring unrecognised action type").with_id("action:unrecognised"),
            );
        }
    }
    Ok(())
}

fn apply_issue_debt(
    state: &mut BankState,
    config: &SimulationConfig,
    product: ProductType,
    amount: f64,
    rate: Option<f64>,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    let pricing = match product {
        ProductType::WholesaleFundingSt => {
            rate.unwrap_or(state.market.risk_free_short + state.market.spreads.wholesale)
        }
        ProductType::WholesaleFundingLt => {
            rate.unwrap_or(state.market.risk_free_long + state.market.spreads.senior_debt)
        }
        other => {
            events.log(Event::warning(format!(
                "Cannot issue debt as {}: not a wholesale funding product",
                other.label()
            )));
            return Ok(());
        }
    };
    if amount <= 0.0 {
        events.log(Event::warning("Debt issuance ignored: non-positive amount"));
        return Ok(());
    }
    let tag = config.liquidity_tag(product);
    state.balance_sheet.ensure(product, tag).blend_in(amount, pricing);
    if !state.balance_sheet.credit_cash(amount) {
        return Err(SimulationError::MissingCashLine);
    }
    events.log(Event::info(format!(
        "Issued {:.0}m of {} at {:.2}%",
        amount / 1e6,
        product.label(),
        pricing * 100.0
    )));
    Ok(())
}

fn apply_buy_sell(
    state: &mut BankState,
    config: &SimulationConfig,
    product: ProductType,
    delta: f64,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    if product.side() == Side::Liability {
        events.log(Event::warning(format!(
            "Cannot trade {}: not an asset",
            product.label()
        )));
        return Ok(());
    }
    if product.is_loan() {
        let params = config.product(product)?;
        if delta > 0.0 {
            let rate = state
                .balance_sheet
                .get(product)
                .map_or(0.0, |i| i.interest_rate);
            let cohort_id = state.clock.step as i64;
            let funded = originate(
                state,
                config,
                product,
                cohort_id,
                delta,
                rate,
                None,
                params.base_default_rate,
                params.loss_given_default,
            )?;
            if funded + 1e-6 < delta {
                events.log(Event::warning(format!(
                    "{} origination truncated by cash: {:.0}m of {:.0}m funded",
                    product.label(),
                    funded / 1e6,
                    delta / 1e6
                )));
            }
        } else if delta < 0.0 {
            prepay(state, product, -delta);
        }
        return Ok(());
    }

    // Non-loan asset: trade against cash.
    if delta > 0.0 {
        let paid = state.balance_sheet.debit_cash_up_to(delta);
        let tag = config.liquidity_tag(product);
        state.balance_sheet.ensure(product, tag).balance += paid;
        if paid + config.tolerances.cash_flow_rounding_tolerance < delta {
            events.log(Event::warning(format!(
                "{} purchase truncated by cash: {:.0}m of {:.0}m bought",
                product.label(),
                paid / 1e6,
                delta / 1e6
            )));
        }
    } else if delta < 0.0 {
        if let Some(item) = state.balance_sheet.get_mut(product) {
            let sold = (-delta).min(item.balance);
            item.balance -= sold;
            let _ = state.balance_sheet.credit_cash(sold);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_repo(
    state: &mut BankState,
    config: &SimulationConfig,
    direction: RepoDirection,
    collateral_product: ProductType,
    amount: f64,
    haircut: Option<f64>,
    rate: Option<f64>,
    events: &mut EventLog,
) -> Result<(), SimulationError> {
    if amount <= 0.0 {
        events.log(Event::warning("Repo ignored: non-positive amount"));
        return Ok(());
    }
    match direction {
        RepoDirection::Borrow => {
            let hc = haircut.unwrap_or(0.0).max(0.0);
            let required_cover = 1.0 + hc;
            let Some(collateral) = state.balance_sheet.get(collateral_product) else {
                events.log(Event::warning(format!(
                    "Cannot repo {}: not on the book",
                    collateral_product.label()
                )));
                return Ok(());
            };
            let available = collateral.unencumbered();
            let max_borrow = available / required_cover;
            let borrow = amount.min(max_borrow);
            if borrow <= 0.0 {
                events.log(Event::warning(format!(
                    "Repo borrow rejected: no unencumbered {}",
                    collateral_product.label()
                )));
                return Ok(());
            }
            let pricing = rate.unwrap_or(state.market.risk_free_short);
            let tag = config.liquidity_tag(ProductType::RepurchaseAgreements);
            state
                .balance_sheet
                .ensure(ProductType::RepurchaseAgreements, tag)
                .blend_in(borrow, pricing);
            if !state.balance_sheet.credit_cash(borrow) {
                return Err(SimulationError::MissingCashLine);
            }
            if let Some(collateral) = state.balance_sheet.get_mut(collateral_product) {
                collateral.encumbered =
                    (collateral.encumbered + borrow * required_cover).min(collateral.balance);
            }
            events.log(Event::info(format!(
                "Repo borrow: {:.0}m against {} at {:.2}% (haircut {:.1}%)",
                borrow / 1e6,
                collateral_product.label(),
                pricing * 100.0,
                hc * 100.0
            )));
        }
        RepoDirection::Lend => {
            let lend = state.balance_sheet.debit_cash_up_to(amount);
            if lend <= 0.0 {
                events.log(Event::warning("Reverse repo rejected: no cash to lend"));
                return Ok(());
            }
            let pricing = rate.unwrap_or(state.market.risk_free_short);
            let tag = config.liquidity_tag(ProductType::ReverseRepo);
            state
                .balance_sheet
                .ensure(ProductType::ReverseRepo, tag)
                .blend_in(lend, pricing);
            events.log(Event::info(format!(
                "Reverse repo: lent {:.0}m at {:.2}%",
                lend / 1e6,
                pricing * 100.0
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_bank_state;

    fn run(state: &mut BankState, actions: &[PlayerAction]) -> EventLog {
        let config = SimulationConfig::default();
        let mut events = EventLog::new();
        apply_actions(state, &config, actions, &mut events).unwrap();
        events
    }

    #[test]
    fn test_adjust_rate() {
        let mut state = default_bank_state(1);
        run(
            &mut state,
            &[PlayerAction::AdjustRate {
                product_type: ProductType::RetailDeposits,
                rate: 0.03,
            }],
        );
        assert_eq!(
            state
                .balance_sheet
                .get(ProductType::RetailDeposits)
                .unwrap()
                .interest_rate,
            0.03
        );
    }

    #[test]
    fn test_issue_equity_adds_cash_and_cet1() {
        let mut state = default_bank_state(1);
        let cash = state.balance_sheet.cash_balance();
        let cet1 = state.capital.cet1;
        run(&mut state, &[PlayerAction::IssueEquity { amount: 2.0e9 }]);
        assert_eq!(state.capital.cet1, cet1 + 2.0e9);
        assert_eq!(state.balance_sheet.cash_balance(), cash + 2.0e9);
    }

    #[test]
    fn test_issue_debt_blends_rate() {
        let mut state = default_bank_state(1);
        let before = state
            .balance_sheet
            .get(ProductType::WholesaleFundingSt)
            .unwrap()
            .clone();
        run(
            &mut state,
            &[PlayerAction::IssueDebt {
                product_type: ProductType::WholesaleFundingSt,
                amount: before.balance,
                rate: Some(before.interest_rate + 0.02),
            }],
        );
        let after = state
            .balance_sheet
            .get(ProductType::WholesaleFundingSt)
            .unwrap();
        assert_eq!(after.balance, before.balance * 2.0);
        assert!((after.interest_rate - (before.interest_rate + 0.01)).abs() < 1e-12);
    }

    #[test]
    fn test_issue_debt_default_pricing_uses_curve_plus_spread() {
        let mut state = default_bank_state(1);
        // Remove the LT line so the issue creates it fresh at market rate.
        let items: Vec<_> = state
            .balance_sheet
            .items()
            .iter()
            .filter(|i| i.product_type != ProductType::WholesaleFundingLt)
            .cloned()
            .collect();
        state.balance_sheet = crate::models::balance_sheet::BalanceSheet::new(items);
        run(
            &mut state,
            &[PlayerAction::IssueDebt {
                product_type: ProductType::WholesaleFundingLt,
                amount: 1.0e9,
                rate: None,
            }],
        );
        let line = state
            .balance_sheet
            .get(ProductType::WholesaleFundingLt)
            .unwrap();
        let expected = state.market.risk_free_long + state.market.spreads.senior_debt;
        assert!((line.interest_rate - expected).abs() < 1e-12);
    }

    #[test]
    fn test_buy_gilts_truncates_at_cash() {
        let mut state = default_bank_state(1);
        let cash = state.balance_sheet.cash_balance();
        let gilts = state.balance_sheet.get(ProductType::Gilts).unwrap().balance;
        let events = run(
            &mut state,
            &[PlayerAction::BuySellAsset {
                product_type: ProductType::Gilts,
                delta: cash * 2.0,
            }],
        );
        assert_eq!(state.balance_sheet.cash_balance(), 0.0);
        assert!(
            (state.balance_sheet.get(ProductType::Gilts).unwrap().balance - (gilts + cash)).abs()
                < 1e-3
        );
        assert_eq!(events.with_severity(crate::models::event::Severity::Warning).len(), 1);
    }

    #[test]
    fn test_sell_asset_caps_at_balance() {
        let mut state = default_bank_state(1);
        let cash = state.balance_sheet.cash_balance();
        let gilts = state.balance_sheet.get(ProductType::Gilts).unwrap().balance;
        run(
            &mut state,
            &[PlayerAction::BuySellAsset {
                product_type: ProductType::Gilts,
                delta: -(gilts * 2.0),
            }],
        );
        assert_eq!(state.balance_sheet.get(ProductType::Gilts).unwrap().balance, 0.0);
        assert!((state.balance_sheet.cash_balance() - (cash + gilts)).abs() < 1e-3);
    }

    #[test]
    fn test_loan_delta_originates_cohort_with_step_id() {
        let mut state = default_bank_state(1);
        state.clock.step = 17;
        run(
            &mut state,
            &[PlayerAction::BuySellAsset {
                product_type: ProductType::Mortgages,
                delta: 2.0e9,
            }],
        );
        let cohorts = &state.loan_cohorts[&ProductType::Mortgages];
        assert!(cohorts.iter().any(|c| c.cohort_id == 17));
    }

    #[test]
    fn test_repo_borrow_encumbers_and_funds() {
        let mut state = default_bank_state(1);
        let cash = state.balance_sheet.cash_balance();
        run(
            &mut state,
            &[PlayerAction::EnterRepo {
                direction: RepoDirection::Borrow,
                collateral_product: ProductType::Gilts,
                amount: 5.0e9,
                haircut: Some(0.02),
                rate: Some(0.03),
            }],
        );
        let repo = state
            .balance_sheet
            .get(ProductType::RepurchaseAgreements)
            .unwrap();
        assert!((repo.balance - 5.0e9).abs() < 1e-3);
        assert_eq!(repo.interest_rate, 0.03);
        let gilts = state.balance_sheet.get(ProductType::Gilts).unwrap();
        assert!((gilts.encumbered - 5.0e9 * 1.02).abs() < 1e-3);
        assert!((state.balance_sheet.cash_balance() - (cash + 5.0e9)).abs() < 1e-3);
    }

    #[test]
    fn test_repo_borrow_capped_by_unencumbered_collateral() {
        let mut state = default_bank_state(1);
        let gilts = state.balance_sheet.get(ProductType::Gilts).unwrap().balance;
        run(
            &mut state,
            &[PlayerAction::EnterRepo {
                direction: RepoDirection::Borrow,
                collateral_product: ProductType::Gilts,
                amount: gilts * 2.0,
                haircut: Some(0.25),
                rate: None,
            }],
        );
        let repo = state
            .balance_sheet
            .get(ProductType::RepurchaseAgreements)
            .unwrap();
        assert!((repo.balance - gilts / 1.25).abs() < 1e-3);
        let gilts_item = state.balance_sheet.get(ProductType::Gilts).unwrap();
        assert!((gilts_item.encumbered - gilts_item.balance).abs() < 1e-3);
    }

    #[test]
    fn test_reverse_repo_lends_available_cash() {
        let mut state = default_bank_state(1);
        let cash = state.balance_sheet.cash_balance();
        run(
            &mut state,
            &[PlayerAction::EnterRepo {
                direction: RepoDirection::Lend,
                collateral_product: ProductType::Gilts,
                amount: cash * 3.0,
                haircut: None,
                rate: Some(0.04),
            }],
        );
        let reverse = state.balance_sheet.get(ProductType::ReverseRepo).unwrap();
        assert!((reverse.balance - cash).abs() < 1e-3);
        assert_eq!(state.balance_sheet.cash_balance(), 0.0);
    }

    #[test]
    fn test_unknown_action_tag_warns() {
        let action: PlayerAction =
            serde_json::from_str(r#"{ "type": "launchRocket" }"#).unwrap();
        assert_eq!(action, PlayerAction::Unrecognised);
        let mut state = default_bank_state(1);
        let events = run(&mut state, &[action]);
        assert_eq!(
            events
                .with_severity(crate::models::event::Severity::Warning)
                .len(),
            1
        );
    }
}
