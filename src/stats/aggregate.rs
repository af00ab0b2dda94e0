//! Aggregate statistics over a journaled trade list.
//!
//! Everything here is a pure fold over closed trades: open and cancelled
//! trades are counted but never contribute to profitability figures. Every
//! ratio guards its denominator, so an empty journal produces the documented
//! zero defaults rather than NaN.

use serde::{Deserialize, Serialize};

use crate::models::{TradeRecord, TradeStatus};

/// Serialized stand-in for an infinite profit factor (all winners, no
/// losers). JSON has no infinity, so the rounded snapshot reports this
/// constant instead.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999_999.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_trades: i64,
    pub closed_trades: i64,
    pub open_trades: i64,
    pub cancelled_trades: i64,
    pub winning_trades: i64,
    pub losing_trades: i64,
    pub break_even_trades: i64,

    pub total_pnl: f64,
    pub win_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    /// `f64::INFINITY` when there are winners and no losers; the rounded
    /// snapshot replaces it with [`PROFIT_FACTOR_SENTINEL`].
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_r_multiple: f64,

    pub current_streak: i64,
    pub max_win_streak: i64,
    pub max_loss_streak: i64,

    /// Mean holding time in days over trades with both timestamps.
    pub avg_trade_duration: f64,
    pub expectancy: f64,
    #[serde(rename = "risk_reward_ratio")]
    pub avg_risk_reward_ratio: f64,
}

impl AggregateStats {
    pub fn empty() -> Self {
        AggregateStats {
            total_trades: 0,
            closed_trades: 0,
            open_trades: 0,
            cancelled_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            break_even_trades: 0,
            total_pnl: 0.0,
            win_rate: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            profit_factor: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            avg_r_multiple: 0.0,
            current_streak: 0,
            max_win_streak: 0,
            max_loss_streak: 0,
            avg_trade_duration: 0.0,
            expectancy: 0.0,
            avg_risk_reward_ratio: 0.0,
        }
    }

    /// Wire form: every float rounded to 2 decimal places, infinity replaced
    /// by the sentinel. Rounding happens here and nowhere else.
    pub fn rounded(&self) -> Self {
        let mut out = self.clone();
        out.total_pnl = round2(out.total_pnl);
        out.win_rate = round2(out.win_rate);
        out.gross_profit = round2(out.gross_profit);
        out.gross_loss = round2(out.gross_loss);
        out.profit_factor = if out.profit_factor.is_infinite() {
            PROFIT_FACTOR_SENTINEL
        } else {
            round2(out.profit_factor)
        };
        out.avg_win = round2(out.avg_win);
        out.avg_loss = round2(out.avg_loss);
        out.best_trade = round2(out.best_trade);
        out.worst_trade = round2(out.worst_trade);
        out.avg_r_multiple = round2(out.avg_r_multiple);
        out.avg_trade_duration = round2(out.avg_trade_duration);
        out.expectancy = round2(out.expectancy);
        out.avg_risk_reward_ratio = round2(out.avg_risk_reward_ratio);
        out
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price-derived R-multiple: reward distance over risk distance, signed by
/// whether the trade moved in its profitable direction. Trades missing a
/// stop loss or exit price have no R-multiple.
fn r_multiple(trade: &TradeRecord) -> Option<f64> {
    let exit = trade.exit_price?;
    let stop = trade.stop_loss?;
    let risk = (trade.entry_price - stop).abs();
    if risk <= 0.0 {
        return None;
    }
    Some(trade.direction.signed_move(trade.entry_price, exit) / risk)
}

/// Compute the full statistics snapshot over an unordered trade list.
/// Pure and deterministic: identical input always yields identical output.
pub fn compute_aggregate_stats(trades: &[TradeRecord]) -> AggregateStats {
    let mut stats = AggregateStats::empty();
    stats.total_trades = trades.len() as i64;
    stats.open_trades = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Open)
        .count() as i64;
    stats.cancelled_trades = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Cancelled)
        .count() as i64;

    let mut closed: Vec<&TradeRecord> = trades
        .iter()
        .filter(|t| t.is_closed() && t.realized_pnl.is_some())
        .collect();
    if closed.is_empty() {
        return stats;
    }
    // Streaks depend on close order; sorting is stable so ties keep input
    // order.
    closed.sort_by_key(|t| t.sort_timestamp());

    stats.closed_trades = closed.len() as i64;

    let mut best = f64::NEG_INFINITY;
    let mut worst = f64::INFINITY;
    let mut current_win_streak: i64 = 0;
    let mut current_loss_streak: i64 = 0;

    for trade in &closed {
        let pnl = trade.realized_pnl.unwrap_or(0.0);
        stats.total_pnl += pnl;
        best = best.max(pnl);
        worst = worst.min(pnl);

        if pnl > 0.0 {
            stats.winning_trades += 1;
            stats.gross_profit += pnl;
            current_win_streak += 1;
            current_loss_streak = 0;
        } else if pnl < 0.0 {
            stats.losing_trades += 1;
            stats.gross_loss += pnl.abs();
            current_loss_streak += 1;
            current_win_streak = 0;
        } else {
            stats.break_even_trades += 1;
            current_win_streak = 0;
            current_loss_streak = 0;
        }
        stats.max_win_streak = stats.max_win_streak.max(current_win_streak);
        stats.max_loss_streak = stats.max_loss_streak.max(current_loss_streak);
    }

    stats.best_trade = best;
    stats.worst_trade = worst;
    stats.current_streak = if current_win_streak > 0 {
        current_win_streak
    } else {
        -current_loss_streak
    };

    stats.win_rate = stats.winning_trades as f64 / stats.closed_trades as f64 * 100.0;

    stats.profit_factor = if stats.gross_loss > 0.0 {
        stats.gross_profit / stats.gross_loss
    } else if stats.gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    stats.avg_win = if stats.winning_trades > 0 {
        stats.gross_profit / stats.winning_trades as f64
    } else {
        0.0
    };
    stats.avg_loss = if stats.losing_trades > 0 {
        stats.gross_loss / stats.losing_trades as f64
    } else {
        0.0
    };

    let r_multiples: Vec<f64> = closed.iter().filter_map(|t| r_multiple(t)).collect();
    if !r_multiples.is_empty() {
        stats.avg_r_multiple = r_multiples.iter().sum::<f64>() / r_multiples.len() as f64;
    }

    let durations: Vec<f64> = closed
        .iter()
        .filter_map(|t| t.closed_at.map(|c| (c - t.opened_at) as f64 / SECONDS_PER_DAY))
        .collect();
    if !durations.is_empty() {
        stats.avg_trade_duration = durations.iter().sum::<f64>() / durations.len() as f64;
    }

    // Source convention: expectancy is 0 at a 0% or 100% win rate. Kept for
    // behavioral parity with the original dashboard.
    stats.expectancy = if stats.win_rate > 0.0 && stats.win_rate < 100.0 {
        (stats.win_rate / 100.0) * stats.avg_win - (1.0 - stats.win_rate / 100.0) * stats.avg_loss
    } else {
        0.0
    };

    let rr_ratios: Vec<f64> = closed
        .iter()
        .filter_map(|t| {
            let stop = t.stop_loss?;
            let take_profit = t.take_profit?;
            let risk = (t.entry_price - stop).abs();
            if risk <= 0.0 {
                return None;
            }
            Some((take_profit - t.entry_price).abs() / risk)
        })
        .collect();
    if !rr_ratios.is_empty() {
        stats.avg_risk_reward_ratio = rr_ratios.iter().sum::<f64>() / rr_ratios.len() as f64;
    }

    stats
}
