//! Position sizing and dynamic basket risk for the trading loop.
//!
//! [`PositionSizer`] turns a trade intent into a lot size;
//! [`DynamicRiskManager`] adjusts the basket stop and take-profit ladder to
//! the market context; [`BasketMonitor`] applies both to a live basket.

pub mod basket;
pub mod config;
pub mod dynamic;
pub mod excursion;
pub mod scoring;
pub mod sizing;

pub use basket::{aggregate_pnl, volatility_base_sl, BasketAction, BasketMonitor, CloseReason};
pub use config::{BasketConfig, ConfigError, ExcursionThresholds, RiskConfig, RiskWeights};
pub use dynamic::{DynamicRiskManager, SlBreakdown};
pub use excursion::ExcursionStats;
pub use sizing::PositionSizer;
