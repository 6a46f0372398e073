//! Bank Balance-Sheet Simulator Core
//!
//! Deterministic discrete-time simulator of a retail/wholesale bank's
//! balance sheet, earnings, liquidity and capital. Each step ingests
//! player actions and exogenous shocks, runs a fixed pipeline over an
//! exclusively owned state tree, and returns the next state with an
//! ordered event stream.
//!
//! # Architecture
//!
//! - **core**: the simulation clock
//! - **models**: domain types (products, balance sheet, cohorts, state)
//! - **market**: market state and the exogenous macro-market model
//! - **loans**: cohort amortisation/default engine and seasoning
//! - **risk**: regulatory metrics (RWA, leverage, LCR, NSFR)
//! - **invariants**: structural checks run after every step
//! - **config**: typed configuration with defaults and scenario overlay
//! - **orchestrator**: the step pipeline and state fingerprinting
//! - **rng**: deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Assets = liabilities + equity after every step
//! 2. Loan balance-sheet lines equal their cohort sums
//! 3. All randomness is seeded; identical inputs give identical outputs
//! 4. Regulatory ratios are never NaN (+infinity allowed on zero
//!    denominators)
//!
//! # Example
//!
//! ```
//! use bank_simulator_core::{initial_seasoned_portfolio, step, SimulationConfig};
//!
//! let config = SimulationConfig::default();
//! let state = initial_seasoned_portfolio(&config, None).unwrap();
//! let output = step(&state, &config, &[], &[]).unwrap();
//! assert_eq!(output.state.clock.step, state.clock.step + 1);
//! ```

pub mod bootstrap;
pub mod config;
pub mod core;
pub mod error;
pub mod invariants;
pub mod loans;
pub mod market;
pub mod models;
pub mod orchestrator;
pub mod risk;
pub mod rng;

// Re-exports for convenience
pub use bootstrap::initial_seasoned_portfolio;
pub use config::{apply_scenario, ScenarioOverrides, SimulationConfig};
pub use error::SimulationError;
pub use models::{
    BankState, Event, EventLog, ProductType, RiskMetrics, Severity,
};
pub use orchestrator::{
    due_shocks, fingerprint, step, PlayerAction, RepoDirection, ScheduledShock, Shock, StepOutput,
};
pub use rng::Xorshift32;
