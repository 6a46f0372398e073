//! Product taxonomy
//!
//! The simulator's book is a closed set of products. Each product carries
//! fixed metadata: which side of the balance sheet it sits on, a display
//! label, and the behaviour flags the pipeline dispatches on (loan product,
//! customer deposit, pricing benchmark).
//!
//! Declaration order is canonical: assets first, then liabilities. The
//! behavioural passes and cohort engine iterate products in this order, so
//! it is part of the determinism contract.

use serde::{Deserialize, Serialize};

/// Side of the balance sheet a product belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Asset,
    Liability,
}

/// Customer-deposit segment, for products flagged as customer deposits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepositSegment {
    Retail,
    Corporate,
}

/// Pricing benchmark for loan products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoanBenchmark {
    Mortgage,
    Corporate,
}

/// Closed enumeration of every product the bank can hold.
///
/// # Example
/// ```
/// use bank_simulator_core::models::product::{ProductType, Side};
///
/// assert_eq!(ProductType::Mortgages.side(), Side::Asset);
/// assert!(ProductType::Mortgages.is_loan());
/// assert!(ProductType::RetailDeposits.is_customer_deposit());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ProductType {
    // Assets
    CashReserves,
    Gilts,
    Mortgages,
    CorporateLoans,
    ReverseRepo,
    // Liabilities
    RetailDeposits,
    CorporateDeposits,
    #[serde(rename = "wholesaleFundingST")]
    WholesaleFundingSt,
    #[serde(rename = "wholesaleFundingLT")]
    WholesaleFundingLt,
    RepurchaseAgreements,
}

impl ProductType {
    /// All products in canonical order (assets, then liabilities).
    pub const ALL: [ProductType; 10] = [
        ProductType::CashReserves,
        ProductType::Gilts,
        ProductType::Mortgages,
        ProductType::CorporateLoans,
        ProductType::ReverseRepo,
        ProductType::RetailDeposits,
        ProductType::CorporateDeposits,
        ProductType::WholesaleFundingSt,
        ProductType::WholesaleFundingLt,
        ProductType::RepurchaseAgreements,
    ];

    /// The loan products, in canonical order.
    pub const LOANS: [ProductType; 2] = [ProductType::Mortgages, ProductType::CorporateLoans];

    /// Which side of the balance sheet this product sits on.
    pub fn side(&self) -> Side {
        match self {
            ProductType::CashReserves
            | ProductType::Gilts
            | ProductType::Mortgages
            | ProductType::CorporateLoans
            | ProductType::ReverseRepo => Side::Asset,
            ProductType::RetailDeposits
            | ProductType::CorporateDeposits
            | ProductType::WholesaleFundingSt
            | ProductType::WholesaleFundingLt
            | ProductType::RepurchaseAgreements => Side::Liability,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProductType::CashReserves => "Cash & Central Bank Reserves",
            ProductType::Gilts => "Gilts",
            ProductType::Mortgages => "Mortgages",
            ProductType::CorporateLoans => "Corporate Loans",
            ProductType::ReverseRepo => "Reverse Repo",
            ProductType::RetailDeposits => "Retail Deposits",
            ProductType::CorporateDeposits => "Corporate Deposits",
            ProductType::WholesaleFundingSt => "Wholesale Funding (Short-Term)",
            ProductType::WholesaleFundingLt => "Wholesale Funding (Long-Term)",
            ProductType::RepurchaseAgreements => "Repurchase Agreements",
        }
    }

    /// True for products amortised by the loan-cohort engine.
    pub fn is_loan(&self) -> bool {
        matches!(self, ProductType::Mortgages | ProductType::CorporateLoans)
    }

    /// True for customer deposits (the products subject to behavioural
    /// growth and the LCR stress multiplier).
    pub fn is_customer_deposit(&self) -> bool {
        matches!(
            self,
            ProductType::RetailDeposits | ProductType::CorporateDeposits
        )
    }

    /// Deposit segment, for customer-deposit products.
    pub fn deposit_segment(&self) -> Option<DepositSegment> {
        match self {
            ProductType::RetailDeposits => Some(DepositSegment::Retail),
            ProductType::CorporateDeposits => Some(DepositSegment::Corporate),
            _ => None,
        }
    }

    /// Pricing benchmark, for loan products.
    pub fn loan_benchmark(&self) -> Option<LoanBenchmark> {
        match self {
            ProductType::Mortgages => Some(LoanBenchmark::Mortgage),
            ProductType::CorporateLoans => Some(LoanBenchmark::Corporate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_covers_every_product_once() {
        assert_eq!(ProductType::ALL.len(), 10);
        let assets = ProductType::ALL
            .iter()
            .filter(|p| p.side() == Side::Asset)
            .count();
        assert_eq!(assets, 5);
    }

    #[test]
    fn test_loan_flags_consistent_with_benchmarks() {
        for p in ProductType::ALL {
            assert_eq!(p.is_loan(), p.loan_benchmark().is_some());
        }
    }

    #[test]
    fn test_deposit_segments() {
        assert_eq!(
            ProductType::RetailDeposits.deposit_segment(),
            Some(DepositSegment::Retail)
        );
        assert_eq!(
            ProductType::CorporateDeposits.deposit_segment(),
            Some(DepositSegment::Corporate)
        );
        assert_eq!(ProductType::Gilts.deposit_segment(), None);
    }

    #[test]
    fn test_serde_names_are_stable() {
        let json = serde_json::to_string(&ProductType::WholesaleFundingSt).unwrap();
        assert_eq!(json, "\"wholesaleFundingST\"");
        let json = serde_json::to_string(&ProductType::CashReserves).unwrap();
        assert_eq!(json, "\"cashReserves\"");
        let back: ProductType = serde_json::from_str("\"wholesaleFundingLT\"").unwrap();
        assert_eq!(back, ProductType::WholesaleFundingLt);
    }

    #[test]
    fn test_canonical_order_is_declaration_order() {
        let mut sorted = ProductType::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, ProductType::ALL.to_vec());
    }
}
