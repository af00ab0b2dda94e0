use serde::{Deserialize, Serialize};

use crate::error::JournalError;

/// Per-owner risk parameters, stored as a singleton row. Consumed by the
/// position-sizing calculator for default filling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettings {
    pub id: i32,
    pub account_size: f64,
    pub risk_per_trade: f64,
    pub max_daily_loss: f64,
    pub max_positions: i32,
    pub default_leverage: f64,
    pub currency: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl RiskSettings {
    pub fn defaults(now: i64) -> Self {
        RiskSettings {
            id: 1,
            account_size: 10_000.0,
            risk_per_trade: 1.0,
            max_daily_loss: 3.0,
            max_positions: 5,
            default_leverage: 1.0,
            currency: "USD".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRiskSettingsInput {
    pub account_size: Option<f64>,
    pub risk_per_trade: Option<f64>,
    pub max_daily_loss: Option<f64>,
    pub max_positions: Option<i32>,
    pub default_leverage: Option<f64>,
    pub currency: Option<String>,
}

impl UpdateRiskSettingsInput {
    /// Range checks mirror the dashboard limits.
    pub fn validate(&self) -> Result<(), JournalError> {
        if let Some(size) = self.account_size {
            if size <= 0.0 {
                return Err(JournalError::validation(
                    "account_size",
                    "must be greater than 0",
                ));
            }
        }
        if let Some(risk) = self.risk_per_trade {
            if !(0.1..=10.0).contains(&risk) {
                return Err(JournalError::validation(
                    "risk_per_trade",
                    "must be between 0.1% and 10%",
                ));
            }
        }
        if let Some(loss) = self.max_daily_loss {
            if !(1.0..=20.0).contains(&loss) {
                return Err(JournalError::validation(
                    "max_daily_loss",
                    "must be between 1% and 20%",
                ));
            }
        }
        if let Some(positions) = self.max_positions {
            if !(1..=20).contains(&positions) {
                return Err(JournalError::validation(
                    "max_positions",
                    "must be between 1 and 20",
                ));
            }
        }
        if let Some(leverage) = self.default_leverage {
            if !(1.0..=100.0).contains(&leverage) {
                return Err(JournalError::validation(
                    "default_leverage",
                    "must be between 1 and 100",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_ranges() {
        let mut input = UpdateRiskSettingsInput::default();
        assert!(input.validate().is_ok());

        input.risk_per_trade = Some(11.0);
        assert!(input.validate().is_err());

        input.risk_per_trade = Some(2.0);
        input.max_positions = Some(0);
        assert!(input.validate().is_err());
    }
}
