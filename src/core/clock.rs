//! Simulation clock
//!
//! The simulation operates in discrete steps of a whole number of months.
//! Dates are epoch milliseconds advanced by a fixed 30-day month, which is
//! deliberately calendar-free: the clock is a label, not an input to any
//! accrual.

use serde::{Deserialize, Serialize};

/// Milliseconds in one simulated month (30 days).
const MS_PER_MONTH: f64 = 30.0 * 86_400.0 * 1000.0;

/// Discrete simulation clock carried inside the bank state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationClock {
    /// Steps taken since the simulation started.
    pub step: u64,
    /// Simulated date in epoch milliseconds.
    pub date_ms: i64,
    /// Months per step; the pipeline reads this as `dt_months`.
    pub step_length_months: f64,
}

impl SimulationClock {
    pub fn new(start_date_ms: i64, step_length_months: f64) -> Self {
        Self {
            step: 0,
            date_ms: start_date_ms,
            step_length_months,
        }
    }

    /// Advance one step: increment the counter, move the date forward.
    pub fn advance(&mut self) {
        self.step += 1;
        self.date_ms += (self.step_length_months * MS_PER_MONTH) as i64;
    }
}
