//! Loan-cohort engine and seasoned-portfolio generation

pub mod engine;
pub mod seasoning;

pub use engine::{
    monthly_payment, originate, original_principal_for, outstanding_factor, prepay,
    step_cohorts, sync_balances, CohortStepResult,
};
pub use seasoning::generate_seasoned;
