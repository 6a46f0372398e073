//! Market state and the exogenous macro-market model

pub mod cholesky;
pub mod curve;
pub mod macro_model;
pub mod state;

pub use macro_model::advance_market;
pub use state::{
    CompetitorRates, CurveYields, GdpRegime, GiltCurve, MacroModelState, MacroObservables,
    MarketSpreads, MarketState, NelsonSiegelFactors, RepoHaircuts,
};
