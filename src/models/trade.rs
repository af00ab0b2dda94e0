use serde::{Deserialize, Serialize};

use crate::error::JournalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Signed price move in the profitable direction: positive when the
    /// trade moved toward profit, negative otherwise.
    pub fn signed_move(&self, entry_price: f64, exit_price: f64) -> f64 {
        match self {
            Direction::Long => exit_price - entry_price,
            Direction::Short => entry_price - exit_price,
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s.to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Some(Direction::Long),
            "SHORT" | "SELL" => Some(Direction::Short),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
    Cancelled,
}

impl TradeStatus {
    pub fn parse(s: &str) -> Option<TradeStatus> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Some(TradeStatus::Open),
            "closed" => Some(TradeStatus::Closed),
            "cancelled" | "canceled" => Some(TradeStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
            TradeStatus::Cancelled => "cancelled",
        }
    }
}

/// One journaled trade. Timestamps are epoch seconds, UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub pair: String,
    pub direction: Direction,

    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub position_size: f64,
    pub fees: f64,
    pub realized_pnl: Option<f64>,

    pub status: TradeStatus,
    pub opened_at: i64,
    pub closed_at: Option<i64>,

    pub notes: Option<String>,
}

impl TradeRecord {
    /// Chronological sort key: close time for closed trades, open time
    /// otherwise.
    pub fn sort_timestamp(&self) -> i64 {
        self.closed_at.unwrap_or(self.opened_at)
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Enforces the record invariants: closed_at and realized_pnl are set
    /// exactly when the trade is closed, prices and size are positive,
    /// fees are non-negative.
    pub fn validate(&self) -> Result<(), JournalError> {
        if self.pair.trim().is_empty() {
            return Err(JournalError::validation("pair", "must not be empty"));
        }
        if self.entry_price <= 0.0 {
            return Err(JournalError::validation(
                "entry_price",
                format!("must be positive, got {}", self.entry_price),
            ));
        }
        if self.position_size <= 0.0 {
            return Err(JournalError::validation(
                "position_size",
                format!("must be positive, got {}", self.position_size),
            ));
        }
        if self.fees < 0.0 {
            return Err(JournalError::validation(
                "fees",
                format!("must be non-negative, got {}", self.fees),
            ));
        }
        for (name, value) in [
            ("exit_price", self.exit_price),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
        ] {
            if let Some(v) = value {
                if v <= 0.0 {
                    return Err(JournalError::validation(
                        name,
                        format!("must be positive, got {}", v),
                    ));
                }
            }
        }

        let closed = self.status == TradeStatus::Closed;
        if closed != self.closed_at.is_some() {
            return Err(JournalError::validation(
                "closed_at",
                "must be set exactly when status is 'closed'",
            ));
        }
        if closed != self.realized_pnl.is_some() {
            return Err(JournalError::validation(
                "realized_pnl",
                "must be set exactly when status is 'closed'",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTradeInput {
    pub pair: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub position_size: f64,
    pub fees: Option<f64>,
    pub opened_at: Option<i64>,
    pub notes: Option<String>,
}

/// Closing is the single mutation a trade goes through: exit price, close
/// time, realized P&L and status change together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseTradeInput {
    pub exit_price: f64,
    pub closed_at: Option<i64>,
    pub fees: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    pub status: Option<TradeStatus>,
    pub pair: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_trade() -> TradeRecord {
        TradeRecord {
            id: "TRADE-1".to_string(),
            pair: "BTC/USDT".to_string(),
            direction: Direction::Long,
            entry_price: 50000.0,
            exit_price: Some(52000.0),
            stop_loss: Some(48000.0),
            take_profit: Some(54000.0),
            position_size: 0.1,
            fees: 2.5,
            realized_pnl: Some(197.5),
            status: TradeStatus::Closed,
            opened_at: 1_704_067_200,
            closed_at: Some(1_704_153_600),
            notes: None,
        }
    }

    #[test]
    fn test_signed_move_per_direction() {
        assert_eq!(Direction::Long.signed_move(100.0, 110.0), 10.0);
        assert_eq!(Direction::Long.signed_move(100.0, 90.0), -10.0);
        assert_eq!(Direction::Short.signed_move(100.0, 90.0), 10.0);
        assert_eq!(Direction::Short.signed_move(100.0, 110.0), -10.0);
    }

    #[test]
    fn test_validate_accepts_closed_trade() {
        assert!(closed_trade().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_closed_without_pnl() {
        let mut trade = closed_trade();
        trade.realized_pnl = None;
        let err = trade.validate().unwrap_err();
        assert!(err.to_string().contains("realized_pnl"));
    }

    #[test]
    fn test_validate_rejects_open_with_close_date() {
        let mut trade = closed_trade();
        trade.status = TradeStatus::Open;
        trade.realized_pnl = None;
        // closed_at still set
        assert!(trade.validate().is_err());
    }

    #[test]
    fn test_direction_parse_aliases() {
        assert_eq!(Direction::parse("long"), Some(Direction::Long));
        assert_eq!(Direction::parse("Sell"), Some(Direction::Short));
        assert_eq!(Direction::parse("net"), None);
    }
}
