//! Equity curve derivation: fold closed trades into a running-balance
//! series, with time windowing, drawdown analysis and render-side
//! downsampling. The curve is derived on each request, never persisted.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::TradeRecord;

/// Drawdown fraction above which a region is flagged for visual shading.
const DRAWDOWN_REGION_THRESHOLD: f64 = 0.03;

/// Default render cap before the curve gets subsampled.
pub const DEFAULT_MAX_RENDER_POINTS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl TimeWindow {
    /// Window length in days; `None` means unbounded.
    pub fn days(&self) -> Option<i64> {
        match self {
            TimeWindow::OneMonth => Some(30),
            TimeWindow::ThreeMonths => Some(90),
            TimeWindow::SixMonths => Some(180),
            TimeWindow::OneYear => Some(365),
            TimeWindow::All => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub index: usize,
    /// Epoch seconds of the trade close (or open, for the seed point).
    pub timestamp: i64,
    pub balance: f64,
    /// P&L contributed by this point's trade; 0 for the seed point.
    pub trade_pnl: f64,
    pub is_win: bool,
}

#[derive(Debug, Clone)]
pub struct EquityCurveOptions {
    pub starting_balance: f64,
    pub window: TimeWindow,
    /// Reference "now" for windowing, epoch seconds. Defaults to the wall
    /// clock; fixed in tests.
    pub as_of: Option<i64>,
}

impl Default for EquityCurveOptions {
    fn default() -> Self {
        EquityCurveOptions {
            starting_balance: 10_000.0,
            window: TimeWindow::All,
            as_of: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSummary {
    pub max_drawdown_percent: f64,
    pub current_drawdown_percent: f64,
    pub peak_balance: f64,
    /// Inclusive index ranges where drawdown exceeds the shading threshold.
    pub regions: Vec<(usize, usize)>,
}

/// Build the running-balance series for the closed trades in `trades`.
///
/// The series always starts with one synthetic point at the carried balance
/// before the first included trade. Narrow windows keep absolute balance
/// continuity: trades closed before the window still move the starting
/// point, they just do not appear as points.
pub fn compute_equity_curve(trades: &[TradeRecord], opts: &EquityCurveOptions) -> Vec<EquityPoint> {
    let mut closed: Vec<&TradeRecord> = trades
        .iter()
        .filter(|t| t.is_closed() && t.realized_pnl.is_some())
        .collect();
    closed.sort_by_key(|t| t.sort_timestamp());

    let cutoff = opts.window.days().map(|days| {
        let now = opts.as_of.unwrap_or_else(|| Utc::now().timestamp());
        now - days * 86_400
    });

    // Carry the balance of every pre-window trade into the seed point.
    let mut seed_balance = opts.starting_balance;
    let mut included: Vec<&TradeRecord> = Vec::with_capacity(closed.len());
    for trade in closed {
        let in_window = cutoff.map_or(true, |c| trade.sort_timestamp() >= c);
        if in_window {
            included.push(trade);
        } else {
            seed_balance += trade.realized_pnl.unwrap_or(0.0);
        }
    }

    let seed_timestamp = included
        .first()
        .map(|t| t.sort_timestamp())
        .unwrap_or_else(|| opts.as_of.unwrap_or_else(|| Utc::now().timestamp()));

    let mut points = Vec::with_capacity(included.len() + 1);
    points.push(EquityPoint {
        index: 0,
        timestamp: seed_timestamp,
        balance: seed_balance,
        trade_pnl: 0.0,
        is_win: false,
    });

    let mut balance = seed_balance;
    for (i, trade) in included.iter().enumerate() {
        let pnl = trade.realized_pnl.unwrap_or(0.0);
        balance += pnl;
        points.push(EquityPoint {
            index: i + 1,
            timestamp: trade.sort_timestamp(),
            balance,
            trade_pnl: pnl,
            is_win: pnl > 0.0,
        });
    }

    points
}

/// Running-peak drawdown over an equity series, plus the contiguous regions
/// deep enough to shade. Percentages are 0 when the peak is not positive.
pub fn analyze_drawdown(points: &[EquityPoint]) -> DrawdownSummary {
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0f64;
    let mut current_drawdown = 0.0;
    let mut regions: Vec<(usize, usize)> = Vec::new();
    let mut region_start: Option<usize> = None;

    for point in points {
        if point.balance > peak {
            peak = point.balance;
        }
        let fraction = if peak > 0.0 {
            (peak - point.balance) / peak
        } else {
            0.0
        };
        max_drawdown = max_drawdown.max(fraction * 100.0);
        current_drawdown = fraction * 100.0;

        if fraction > DRAWDOWN_REGION_THRESHOLD {
            if region_start.is_none() {
                region_start = Some(point.index);
            }
        } else if let Some(start) = region_start.take() {
            regions.push((start, point.index.saturating_sub(1)));
        }
    }
    if let Some(start) = region_start {
        if let Some(last) = points.last() {
            regions.push((start, last.index));
        }
    }

    DrawdownSummary {
        max_drawdown_percent: max_drawdown,
        current_drawdown_percent: current_drawdown,
        peak_balance: if peak.is_finite() { peak } else { 0.0 },
        regions,
    }
}

/// Subsample a long series at a fixed stride for rendering, always keeping
/// the first and last point. Statistics are computed on the full series;
/// this only reduces curve resolution.
pub fn downsample(points: &[EquityPoint], max_points: usize) -> Vec<EquityPoint> {
    if max_points < 2 || points.len() <= max_points {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_points);
    let mut out: Vec<EquityPoint> = points.iter().step_by(stride).cloned().collect();
    if let Some(last) = points.last() {
        if out.last().map(|p| p.index) != Some(last.index) {
            out.push(last.clone());
        }
    }
    out
}
