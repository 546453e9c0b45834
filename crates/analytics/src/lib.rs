//! Market analytics engine.
//!
//! A registry of independent modules, each consuming the keys it recognizes
//! from an open update payload and publishing a typed context. Contexts merge
//! into one queryable snapshot; a module with insufficient data reports its
//! neutral defaults rather than failing.

pub mod context;
pub mod modules;
pub mod registry;
pub mod update;

pub use context::{
    AnalyticsSnapshot, BreadthContext, BuildupRegime, HedgeSuggestion, ImbalanceContext,
    LiquidityLabel, MarketRegime, ModuleContext, OiFlowContext, PortfolioContext, RegimeContext,
    VolRankContext,
};
pub use registry::{AnalyticsModule, AnalyticsRegistry};
pub use update::{keys, AnalyticsUpdate};
