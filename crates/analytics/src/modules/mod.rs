pub mod breadth;
pub mod imbalance;
pub mod oi_flow;
pub mod portfolio_greeks;
pub mod regime;
pub mod vol_rank;

pub use breadth::BreadthTracker;
pub use imbalance::ImbalanceTracker;
pub use oi_flow::OiFlowTracker;
pub use portfolio_greeks::PortfolioGreeksTracker;
pub use regime::RegimeClassifier;
pub use vol_rank::VolRankTracker;
