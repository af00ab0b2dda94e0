//! Trade journal engine: aggregate statistics, equity curve derivation and
//! position sizing over journaled trades, plus the SQLite storage they are
//! fed from.
//!
//! The computation layer ([`normalize`], [`stats`], [`risk`]) is pure:
//! callers materialize a trade list (usually via [`store`]) and every
//! function over it is deterministic and side-effect free.

pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod risk;
pub mod stats;
pub mod store;

pub use error::JournalError;
pub use models::{Direction, TradeRecord, TradeStatus};
pub use normalize::normalize_trade_record;
pub use risk::{PositionSizeInputs, PositionSizeResult, compute_position_size};
pub use stats::{
    AggregateStats, EquityCurveOptions, EquityPoint, TimeWindow, compute_aggregate_stats,
    compute_equity_curve,
};
