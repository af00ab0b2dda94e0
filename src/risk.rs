//! Position sizing calculator.
//!
//! Sizes are reported in notional value (quote currency): the position whose
//! loss equals the risk amount when price moves the full stop distance is
//! `risk_amount * entry_price / stop_distance`. The base-asset quantity is
//! derived from it for display. One convention, applied everywhere.

use serde::{Deserialize, Serialize};

use crate::error::JournalError;
use crate::models::{Direction, RiskSettings};
use crate::stats::aggregate::round2;

/// Exchange maintenance margin assumed for the liquidation estimate.
const MAINTENANCE_MARGIN: f64 = 0.005;

const MAX_LEVERAGE: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizeInputs {
    pub account_size: f64,
    pub risk_percent: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub direction: Direction,
    pub leverage: f64,
    /// Desired reward multiple (R:R). When absent, derived from
    /// `take_profit` if that is supplied.
    pub reward_multiple: Option<f64>,
    pub take_profit: Option<f64>,
}

impl PositionSizeInputs {
    pub fn new(account_size: f64, risk_percent: f64, entry_price: f64, stop_loss: f64) -> Self {
        PositionSizeInputs {
            account_size,
            risk_percent,
            entry_price,
            stop_loss,
            direction: Direction::Long,
            leverage: 1.0,
            reward_multiple: None,
            take_profit: None,
        }
    }

    /// Fill account size, risk percent and leverage from stored settings.
    /// Settings are a convenience, never a requirement.
    pub fn with_defaults(entry_price: f64, stop_loss: f64, settings: &RiskSettings) -> Self {
        PositionSizeInputs {
            account_size: settings.account_size,
            risk_percent: settings.risk_per_trade,
            entry_price,
            stop_loss,
            direction: Direction::Long,
            leverage: settings.default_leverage,
            reward_multiple: None,
            take_profit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizeResult {
    pub risk_amount: f64,
    pub stop_distance: f64,
    pub stop_distance_percent: f64,
    /// Notional position value in quote currency.
    pub position_size: f64,
    /// Base-asset quantity backing the notional value.
    pub base_quantity: f64,
    pub margin_required: f64,
    pub projected_profit: Option<f64>,
    pub reward_multiple: Option<f64>,
    pub liquidation_price: Option<f64>,
    pub warnings: Vec<String>,
}

impl PositionSizeResult {
    /// Wire form with 2-dp rounding on currency fields; the base quantity
    /// keeps 6 dp so small-cap sizes survive.
    pub fn rounded(&self) -> Self {
        PositionSizeResult {
            risk_amount: round2(self.risk_amount),
            stop_distance: round2(self.stop_distance),
            stop_distance_percent: round2(self.stop_distance_percent),
            position_size: round2(self.position_size),
            base_quantity: (self.base_quantity * 1_000_000.0).round() / 1_000_000.0,
            margin_required: round2(self.margin_required),
            projected_profit: self.projected_profit.map(round2),
            reward_multiple: self.reward_multiple.map(round2),
            liquidation_price: self.liquidation_price.map(round2),
            warnings: self.warnings.clone(),
        }
    }
}

/// Liquidation estimate for a leveraged position.
fn liquidation_price(entry_price: f64, leverage: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Long => entry_price * (1.0 - 1.0 / leverage + MAINTENANCE_MARGIN),
        Direction::Short => entry_price * (1.0 + 1.0 / leverage - MAINTENANCE_MARGIN),
    }
}

fn validate(inputs: &PositionSizeInputs) -> Result<(), JournalError> {
    if inputs.account_size <= 0.0 {
        return Err(JournalError::InvalidInput(
            "account size must be greater than 0".to_string(),
        ));
    }
    if inputs.risk_percent <= 0.0 || inputs.risk_percent > 100.0 {
        return Err(JournalError::InvalidInput(
            "risk percent must be between 0.01 and 100".to_string(),
        ));
    }
    if inputs.entry_price <= 0.0 {
        return Err(JournalError::InvalidInput(
            "entry price must be greater than 0".to_string(),
        ));
    }
    if inputs.stop_loss <= 0.0 {
        return Err(JournalError::InvalidInput(
            "stop loss must be greater than 0".to_string(),
        ));
    }
    if inputs.stop_loss == inputs.entry_price {
        return Err(JournalError::InvalidInput(
            "stop loss must differ from entry price (zero risk distance)".to_string(),
        ));
    }
    if inputs.leverage <= 0.0 || inputs.leverage > MAX_LEVERAGE {
        return Err(JournalError::InvalidInput(format!(
            "leverage must be between 1 and {}",
            MAX_LEVERAGE
        )));
    }
    match inputs.direction {
        Direction::Long if inputs.stop_loss >= inputs.entry_price => {
            return Err(JournalError::InvalidInput(
                "for LONG positions, stop loss must be below entry price".to_string(),
            ));
        }
        Direction::Short if inputs.stop_loss <= inputs.entry_price => {
            return Err(JournalError::InvalidInput(
                "for SHORT positions, stop loss must be above entry price".to_string(),
            ));
        }
        _ => {}
    }
    if let Some(rm) = inputs.reward_multiple {
        if rm <= 0.0 {
            return Err(JournalError::InvalidInput(
                "reward multiple must be greater than 0".to_string(),
            ));
        }
    }
    Ok(())
}

/// Pure, deterministic sizing: identical inputs always produce identical
/// outputs. Precondition violations fail the whole call.
pub fn compute_position_size(
    inputs: &PositionSizeInputs,
) -> Result<PositionSizeResult, JournalError> {
    validate(inputs)?;

    let risk_amount = inputs.account_size * inputs.risk_percent / 100.0;
    let stop_distance = (inputs.entry_price - inputs.stop_loss).abs();
    let stop_distance_percent = stop_distance / inputs.entry_price * 100.0;

    let position_size = risk_amount * inputs.entry_price / stop_distance;
    let base_quantity = position_size / inputs.entry_price;
    let margin_required = position_size / inputs.leverage;

    let reward_multiple = inputs.reward_multiple.or_else(|| {
        inputs
            .take_profit
            .map(|tp| (tp - inputs.entry_price).abs() / stop_distance)
    });
    let projected_profit = reward_multiple.map(|rm| risk_amount * rm);

    let liquidation = if inputs.leverage > 1.0 {
        Some(liquidation_price(
            inputs.entry_price,
            inputs.leverage,
            inputs.direction,
        ))
    } else {
        None
    };

    let mut warnings = Vec::new();
    if inputs.risk_percent > 5.0 {
        warnings.push(format!(
            "Risk per trade ({}%) exceeds recommended 2-3%",
            inputs.risk_percent
        ));
    }
    if stop_distance_percent > 10.0 {
        warnings.push(format!(
            "Stop loss distance ({:.2}%) is quite large",
            stop_distance_percent
        ));
    }
    if inputs.leverage > 1.0 {
        warnings.push(format!(
            "Using {}x leverage increases both potential profits and losses",
            inputs.leverage
        ));
        if let Some(liq) = liquidation {
            let liq_distance = (inputs.entry_price - liq).abs() / inputs.entry_price * 100.0;
            if liq_distance < 5.0 {
                warnings.push(format!(
                    "Liquidation price is only {:.2}% away",
                    liq_distance
                ));
            }
        }
    }
    if position_size > inputs.account_size * inputs.leverage.max(1.0) * 0.5 {
        warnings.push("Position exceeds 50% of buying power - consider reducing size".to_string());
    }

    Ok(PositionSizeResult {
        risk_amount,
        stop_distance,
        stop_distance_percent,
        position_size,
        base_quantity,
        margin_required,
        projected_profit,
        reward_multiple,
        liquidation_price: liquidation,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worked_example_leveraged() {
        let mut inputs = PositionSizeInputs::new(10_000.0, 10.0, 70_000.0, 67_000.0);
        inputs.leverage = 20.0;
        let result = compute_position_size(&inputs).unwrap().rounded();
        assert_eq!(result.risk_amount, 1_000.0);
        assert_eq!(result.stop_distance, 3_000.0);
        assert_eq!(result.position_size, 23_333.33);
        assert_eq!(result.margin_required, 1_166.67);
    }

    #[test]
    fn test_margin_inverse_property() {
        let mut inputs = PositionSizeInputs::new(25_000.0, 2.0, 3_500.0, 3_400.0);
        inputs.leverage = 7.0;
        let result = compute_position_size(&inputs).unwrap();
        assert!((result.margin_required * inputs.leverage - result.position_size).abs() < 1e-6);
    }

    #[test]
    fn test_projected_profit_from_reward_multiple() {
        let mut inputs = PositionSizeInputs::new(10_000.0, 1.0, 100.0, 95.0);
        inputs.reward_multiple = Some(3.0);
        let result = compute_position_size(&inputs).unwrap();
        assert_eq!(result.projected_profit, Some(300.0));
    }

    #[test]
    fn test_reward_multiple_derived_from_take_profit() {
        let mut inputs = PositionSizeInputs::new(10_000.0, 1.0, 100.0, 95.0);
        inputs.take_profit = Some(110.0);
        let result = compute_position_size(&inputs).unwrap();
        assert_eq!(result.reward_multiple, Some(2.0));
        assert_eq!(result.projected_profit, Some(200.0));
    }

    #[test]
    fn test_zero_risk_distance_rejected() {
        let inputs = PositionSizeInputs::new(10_000.0, 1.0, 100.0, 100.0);
        assert!(matches!(
            compute_position_size(&inputs),
            Err(JournalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_positive_fields_rejected() {
        for inputs in [
            PositionSizeInputs::new(0.0, 1.0, 100.0, 95.0),
            PositionSizeInputs::new(10_000.0, 0.0, 100.0, 95.0),
            PositionSizeInputs::new(10_000.0, 101.0, 100.0, 95.0),
            PositionSizeInputs::new(10_000.0, 1.0, 0.0, 95.0),
            PositionSizeInputs::new(10_000.0, 1.0, 100.0, 0.0),
        ] {
            assert!(compute_position_size(&inputs).is_err());
        }
    }

    #[test]
    fn test_direction_consistency_checked() {
        let mut long = PositionSizeInputs::new(10_000.0, 1.0, 100.0, 105.0);
        assert!(compute_position_size(&long).is_err());
        long.direction = Direction::Short;
        assert!(compute_position_size(&long).is_ok());
    }

    #[test]
    fn test_liquidation_only_when_leveraged() {
        let spot = PositionSizeInputs::new(10_000.0, 1.0, 100.0, 95.0);
        assert_eq!(compute_position_size(&spot).unwrap().liquidation_price, None);

        let mut leveraged = spot.clone();
        leveraged.leverage = 10.0;
        let result = compute_position_size(&leveraged).unwrap();
        // 100 * (1 - 0.1 + 0.005)
        assert!((result.liquidation_price.unwrap() - 90.5).abs() < 1e-9);
    }

    #[test]
    fn test_high_risk_warning() {
        let inputs = PositionSizeInputs::new(10_000.0, 10.0, 100.0, 95.0);
        let result = compute_position_size(&inputs).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("exceeds recommended")));
    }

    #[test]
    fn test_determinism() {
        let mut inputs = PositionSizeInputs::new(10_000.0, 2.5, 61_250.0, 59_875.0);
        inputs.leverage = 5.0;
        inputs.take_profit = Some(64_000.0);
        let first = compute_position_size(&inputs).unwrap();
        let second = compute_position_size(&inputs).unwrap();
        assert_eq!(first, second);
    }
}
