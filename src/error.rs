//! Fatal simulation errors
//!
//! Business-rule failures (cash shortfalls, regulatory breaches) are NOT
//! errors: they become events on the step output and flip
//! `status.has_failed`. `SimulationError` is reserved for programmer and
//! configuration error — violated preconditions abort the step.

use thiserror::Error;

use crate::models::product::ProductType;

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    /// The book has no CashReserves line, so nothing can be funded.
    #[error("no CashReserves line item on the balance sheet")]
    MissingCashLine,

    /// A loan product lacks its loan parameter block in the config.
    #[error("no loan configuration for {0:?}")]
    MissingLoanConfig(ProductType),

    /// A cohort failed validation.
    #[error("invalid cohort: {0}")]
    InvalidCohort(String),

    /// Seasoned-portfolio generation missed its target outstanding.
    #[error("seasoning mismatch: target {target}, produced {produced}")]
    SeasoningMismatch { target: f64, produced: f64 },

    /// The macro-market model cannot run (Cholesky initialisation failed).
    #[error("macro-market model error: {0}")]
    MarketModel(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization failed during hashing or scenario overlay.
    #[error("serialization error: {0}")]
    Serialization(String),
}
