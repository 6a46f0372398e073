//! Balance-sheet line items
//!
//! The book is an insertion-ordered list of per-product lines. Order is
//! part of the determinism contract: behavioural passes iterate the list
//! in order, and cloning preserves it. Lines are created lazily for
//! products not in the opening book (repo legs) and never removed.

use serde::{Deserialize, Serialize};

use crate::models::product::{ProductType, Side};

/// HQLA tier for liquidity-coverage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HqlaLevel {
    Level1,
    Level2A,
    Level2B,
    None,
}

impl HqlaLevel {
    /// Post-haircut weight applied to unencumbered balance.
    pub fn factor(&self) -> f64 {
        match self {
            HqlaLevel::Level1 => 1.0,
            HqlaLevel::Level2A => 0.85,
            HqlaLevel::Level2B => 0.5,
            HqlaLevel::None => 0.0,
        }
    }
}

/// Regulatory liquidity treatment of a line item.
///
/// Optional rates are simply not counted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityTag {
    pub hqla_level: HqlaLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcr_outflow_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcr_inflow_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfr_asf_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfr_rsf_factor: Option<f64>,
}

impl Default for LiquidityTag {
    fn default() -> Self {
        Self {
            hqla_level: HqlaLevel::None,
            lcr_outflow_rate: None,
            lcr_inflow_rate: None,
            nsfr_asf_factor: None,
            nsfr_rsf_factor: None,
        }
    }
}

/// One product line on the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheetItem {
    pub product_type: ProductType,
    /// Outstanding balance, always >= 0.
    pub balance: f64,
    /// Annualised interest rate, >= 0. Not compounded within a month.
    pub interest_rate: f64,
    /// Descriptive maturity bucket. Tag only; nothing dispatches on it.
    pub maturity_bucket: String,
    /// Portion pledged as collateral, 0 <= encumbered <= balance.
    pub encumbered: f64,
    pub liquidity: LiquidityTag,
}

impl BalanceSheetItem {
    /// A fresh zero-balance line for a lazily created product.
    pub fn new_empty(product_type: ProductType, liquidity: LiquidityTag) -> Self {
        Self {
            product_type,
            balance: 0.0,
            interest_rate: 0.0,
            maturity_bucket: "onDemand".to_string(),
            encumbered: 0.0,
            liquidity,
        }
    }

    /// Balance not pledged as collateral.
    pub fn unencumbered(&self) -> f64 {
        (self.balance - self.encumbered).max(0.0)
    }

    /// Blend `amount` at `rate` into this line, outstanding-weighted.
    ///
    /// Used when issuing debt or stacking repo borrowings onto an existing
    /// line: the line's rate becomes the weighted average of old and new.
    pub fn blend_in(&mut self, amount: f64, rate: f64) {
        let total = self.balance + amount;
        if total > 0.0 {
            self.interest_rate = (self.balance * self.interest_rate + amount * rate) / total;
        }
        self.balance = total;
    }
}

/// The full book: insertion-ordered lines, one per product present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSheet {
    items: Vec<BalanceSheetItem>,
}

impl BalanceSheet {
    pub fn new(items: Vec<BalanceSheetItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[BalanceSheetItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [BalanceSheetItem] {
        &mut self.items
    }

    pub fn get(&self, product: ProductType) -> Option<&BalanceSheetItem> {
        self.items.iter().find(|i| i.product_type == product)
    }

    pub fn get_mut(&mut self, product: ProductType) -> Option<&mut BalanceSheetItem> {
        self.items.iter_mut().find(|i| i.product_type == product)
    }

    /// Fetch the line for `product`, appending a zero-balance line with the
    /// given liquidity tag if it does not exist yet. Lines are never
    /// removed, so lazily created repo legs stay on the book at zero.
    pub fn ensure(
        &mut self,
        product: ProductType,
        liquidity: LiquidityTag,
    ) -> &mut BalanceSheetItem {
        if let Some(pos) = self.items.iter().position(|i| i.product_type == product) {
            &mut self.items[pos]
        } else {
            self.items.push(BalanceSheetItem::new_empty(product, liquidity));
            self.items.last_mut().unwrap()
        }
    }

    /// Current cash balance, 0.0 if the cash line is missing.
    pub fn cash_balance(&self) -> f64 {
        self.get(ProductType::CashReserves).map_or(0.0, |i| i.balance)
    }

    /// Credit cash. Returns false if there is no cash line to credit.
    #[must_use]
    pub fn credit_cash(&mut self, amount: f64) -> bool {
        match self.get_mut(ProductType::CashReserves) {
            Some(cash) => {
                cash.balance += amount;
                true
            }
            None => false,
        }
    }

    /// Debit cash by up to `requested`, never taking the balance negative.
    ///
    /// Returns the amount actually paid; the caller is responsible for
    /// treating a shortfall as a failure condition.
    pub fn debit_cash_up_to(&mut self, requested: f64) -> f64 {
        match self.get_mut(ProductType::CashReserves) {
            Some(cash) => {
                let paid = requested.min(cash.balance).max(0.0);
                cash.balance -= paid;
                paid
            }
            None => 0.0,
        }
    }

    pub fn total_assets(&self) -> f64 {
        self.items
            .iter()
            .filter(|i| i.product_type.side() == Side::Asset)
            .map(|i| i.balance)
            .sum()
    }

    pub fn total_liabilities(&self) -> f64 {
        self.items
            .iter()
            .filter(|i| i.product_type.side() == Side::Liability)
            .map(|i| i.balance)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: ProductType, balance: f64) -> BalanceSheetItem {
        BalanceSheetItem {
            product_type: product,
            balance,
            interest_rate: 0.04,
            maturity_bucket: "onDemand".to_string(),
            encumbered: 0.0,
            liquidity: LiquidityTag::default(),
        }
    }

    #[test]
    fn test_ensure_appends_once_and_preserves_order() {
        let mut book = BalanceSheet::new(vec![
            item(ProductType::CashReserves, 100.0),
            item(ProductType::Gilts, 50.0),
        ]);
        book.ensure(ProductType::RepurchaseAgreements, LiquidityTag::default());
        book.ensure(ProductType::RepurchaseAgreements, LiquidityTag::default());
        let order: Vec<ProductType> = book.items().iter().map(|i| i.product_type).collect();
        assert_eq!(
            order,
            vec![
                ProductType::CashReserves,
                ProductType::Gilts,
                ProductType::RepurchaseAgreements
            ]
        );
    }

    #[test]
    fn test_debit_cash_caps_at_balance() {
        let mut book = BalanceSheet::new(vec![item(ProductType::CashReserves, 100.0)]);
        let paid = book.debit_cash_up_to(250.0);
        assert_eq!(paid, 100.0);
        assert_eq!(book.cash_balance(), 0.0);
    }

    #[test]
    fn test_blend_in_weighted_average() {
        let mut line = item(ProductType::WholesaleFundingSt, 100.0);
        line.interest_rate = 0.02;
        line.blend_in(100.0, 0.04);
        assert!((line.interest_rate - 0.03).abs() < 1e-12);
        assert_eq!(line.balance, 200.0);
    }

    #[test]
    fn test_blend_into_empty_line_takes_new_rate() {
        let mut line = BalanceSheetItem::new_empty(
            ProductType::RepurchaseAgreements,
            LiquidityTag::default(),
        );
        line.blend_in(500.0, 0.035);
        assert_eq!(line.interest_rate, 0.035);
        assert_eq!(line.balance, 500.0);
    }

    #[test]
    fn test_unencumbered_floors_at_zero() {
        let mut line = item(ProductType::Gilts, 100.0);
        line.encumbered = 120.0;
        assert_eq!(line.unencumbered(), 0.0);
    }

    #[test]
    fn test_totals_split_by_side() {
        let book = BalanceSheet::new(vec![
            item(ProductType::CashReserves, 40.0),
            item(ProductType::Mortgages, 60.0),
            item(ProductType::RetailDeposits, 80.0),
        ]);
        assert_eq!(book.total_assets(), 100.0);
        assert_eq!(book.total_liabilities(), 80.0);
    }
}
