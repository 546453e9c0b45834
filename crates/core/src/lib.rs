pub mod config;
pub mod config_loader;
pub mod error;
pub mod market;
pub mod orders;
pub mod traits;

pub use config::{
    AnalyticsConfig, AppConfig, ExecutionConfig, FeedConfig, IndicatorConfig, PersistenceConfig,
    PositionConfig, PricingConfig, RiskConfig, SessionConfig, StrategyConfig,
};
pub use config_loader::ConfigLoader;
pub use error::EngineError;
pub use market::{
    Candle, CandleHistory, GreeksSnapshot, InstrumentMeta, OptionQuote, OptionRight, Tick, TickKind,
};
pub use orders::{
    BatchOrderRequest, FillReport, FillStatus, OrderKind, OrderLeg, OrderRequest, OrderSide,
    PartialFillPolicy, TimeInForce, TradeRecord,
};
pub use traits::{ConfidenceModel, MarketFeed, OrderRouter, ReferenceData};
