//! Regulatory risk-metric calculation

pub mod metrics;

pub use metrics::{compute_metrics, evaluate_compliance};
