//! Step orchestration: shocks, actions, behaviour, accounting, metrics

pub mod actions;
pub mod behaviour;
pub mod engine;
pub mod fingerprint;
pub mod shocks;
pub mod statements;

pub use actions::{PlayerAction, RepoDirection};
pub use engine::{step, StepOutput};
pub use fingerprint::fingerprint;
pub use shocks::{due_shocks, ScheduledShock, Shock, ShockContext};
