//! Trade record normalizer.
//!
//! Upstream rows arrive in loosely-typed shapes: snake_case or camelCase
//! field names, numbers encoded as strings, timestamps as epoch seconds,
//! epoch milliseconds or RFC 3339. This module coerces all of them into one
//! canonical [`TradeRecord`] at the system boundary, so computation code
//! never sees an alias.

use chrono::DateTime;
use serde_json::Value;
use uuid::Uuid;

use crate::error::JournalError;
use crate::models::{Direction, TradeRecord, TradeStatus};

/// Alias resolution priority, canonical name first. This table is the only
/// place aliases are known; everything past this boundary uses canonical
/// names.
const ID_ALIASES: &[&str] = &["id", "trade_id", "tradeId"];
const PAIR_ALIASES: &[&str] = &["pair", "symbol", "instrument"];
const DIRECTION_ALIASES: &[&str] = &["direction", "side", "position_type", "positionType"];
const ENTRY_PRICE_ALIASES: &[&str] = &["entry_price", "entryPrice", "entry"];
const EXIT_PRICE_ALIASES: &[&str] = &["exit_price", "exitPrice", "exit"];
const STOP_LOSS_ALIASES: &[&str] = &["stop_loss", "stopLoss"];
const TAKE_PROFIT_ALIASES: &[&str] = &["take_profit", "takeProfit"];
const POSITION_SIZE_ALIASES: &[&str] = &["position_size", "positionSize", "size", "quantity"];
const FEES_ALIASES: &[&str] = &["fees", "fee"];
const PNL_ALIASES: &[&str] = &["realized_pnl", "realizedPnL", "pnl", "total_pnl"];
const STATUS_ALIASES: &[&str] = &["status"];
const OPENED_AT_ALIASES: &[&str] = &["opened_at", "entry_date", "entryTime", "entry_time"];
const CLOSED_AT_ALIASES: &[&str] = &["closed_at", "exit_date", "exitTime", "exit_time"];
const NOTES_ALIASES: &[&str] = &["notes", "note"];

/// Epoch values above this are treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

fn lookup<'a>(
    raw: &'a Value,
    aliases: &'static [&'static str],
) -> Option<(&'static str, &'a Value)> {
    for alias in aliases {
        if let Some(v) = raw.get(alias) {
            if !v.is_null() {
                // Report under the canonical name regardless of which alias
                // matched.
                return Some((aliases[0], v));
            }
        }
    }
    None
}

/// Base-10 float parsing shared by every numeric field, whether it arrived
/// as a JSON number or a string.
fn parse_number(field: &str, value: &Value) -> Result<f64, JournalError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| JournalError::validation(field, format!("not a finite number: {}", n))),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            JournalError::validation(field, format!("not a numeric string: '{}'", s))
        }),
        other => Err(JournalError::validation(
            field,
            format!("expected number, got {}", other),
        )),
    }
}

fn parse_timestamp(field: &str, value: &Value) -> Result<i64, JournalError> {
    match value {
        Value::Number(n) => {
            let ts = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).ok_or_else(|| {
                JournalError::validation(field, format!("not a valid timestamp: {}", n))
            })?;
            if ts > EPOCH_MILLIS_THRESHOLD {
                Ok(ts / 1000)
            } else {
                Ok(ts)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(ts) = trimmed.parse::<i64>() {
                return Ok(if ts > EPOCH_MILLIS_THRESHOLD { ts / 1000 } else { ts });
            }
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.timestamp())
                .map_err(|_| {
                    JournalError::validation(field, format!("not a recognized timestamp: '{}'", s))
                })
        }
        other => Err(JournalError::validation(
            field,
            format!("expected timestamp, got {}", other),
        )),
    }
}

fn required_number(raw: &Value, aliases: &'static [&'static str]) -> Result<f64, JournalError> {
    let (field, value) =
        lookup(raw, aliases).ok_or_else(|| JournalError::validation(aliases[0], "missing"))?;
    parse_number(field, value)
}

fn optional_number(raw: &Value, aliases: &'static [&'static str]) -> Result<Option<f64>, JournalError> {
    match lookup(raw, aliases) {
        Some((field, value)) => parse_number(field, value).map(Some),
        None => Ok(None),
    }
}

fn optional_string(raw: &Value, aliases: &'static [&'static str]) -> Option<String> {
    lookup(raw, aliases).and_then(|(_, v)| v.as_str().map(|s| s.to_string()))
}

/// Coerce a raw row into a canonical [`TradeRecord`], or fail with a
/// validation error naming the first field that could not be parsed.
pub fn normalize_trade_record(raw: &Value) -> Result<TradeRecord, JournalError> {
    if !raw.is_object() {
        return Err(JournalError::validation("record", "expected a JSON object"));
    }

    let id = optional_string(raw, ID_ALIASES).unwrap_or_else(|| Uuid::new_v4().to_string());

    let pair = optional_string(raw, PAIR_ALIASES)
        .map(|p| p.to_uppercase())
        .ok_or_else(|| JournalError::validation("pair", "missing"))?;

    let direction_raw = optional_string(raw, DIRECTION_ALIASES)
        .ok_or_else(|| JournalError::validation("direction", "missing"))?;
    let direction = Direction::parse(&direction_raw).ok_or_else(|| {
        JournalError::validation("direction", format!("must be LONG or SHORT, got '{}'", direction_raw))
    })?;

    let entry_price = required_number(raw, ENTRY_PRICE_ALIASES)?;
    let exit_price = optional_number(raw, EXIT_PRICE_ALIASES)?;
    let stop_loss = optional_number(raw, STOP_LOSS_ALIASES)?;
    let take_profit = optional_number(raw, TAKE_PROFIT_ALIASES)?;
    let position_size = required_number(raw, POSITION_SIZE_ALIASES)?;
    let fees = optional_number(raw, FEES_ALIASES)?.unwrap_or(0.0);
    let mut realized_pnl = optional_number(raw, PNL_ALIASES)?;

    let status = match optional_string(raw, STATUS_ALIASES) {
        Some(s) => TradeStatus::parse(&s).ok_or_else(|| {
            JournalError::validation("status", format!("unknown status '{}'", s))
        })?,
        // No status field: infer from the presence of an exit price.
        None => {
            if exit_price.is_some() {
                TradeStatus::Closed
            } else {
                TradeStatus::Open
            }
        }
    };

    let opened_at = {
        let (field, value) = lookup(raw, OPENED_AT_ALIASES)
            .ok_or_else(|| JournalError::validation("opened_at", "missing"))?;
        parse_timestamp(field, value)?
    };
    let closed_at = match lookup(raw, CLOSED_AT_ALIASES) {
        Some((field, value)) => Some(parse_timestamp(field, value)?),
        None => None,
    };

    // Closed rows from older exports may lack a stored P&L; derive it from
    // prices net of fees, the same way trades are journaled at close.
    if realized_pnl.is_none() && status == TradeStatus::Closed {
        if let Some(exit) = exit_price {
            realized_pnl = Some(direction.signed_move(entry_price, exit) * position_size - fees);
        }
    }

    let record = TradeRecord {
        id,
        pair,
        direction,
        entry_price,
        exit_price,
        stop_loss,
        take_profit,
        position_size,
        fees,
        realized_pnl,
        status,
        opened_at,
        closed_at,
        notes: optional_string(raw, NOTES_ALIASES),
    };

    record.validate()?;
    Ok(record)
}

/// Normalize a batch, skipping rows that fail validation. Returns the
/// normalized records plus one message per skipped row. Batch statistics
/// use skip-and-log; single-record callers should use
/// [`normalize_trade_record`] directly and fail fast.
pub fn normalize_batch(rows: &[Value]) -> (Vec<TradeRecord>, Vec<String>) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match normalize_trade_record(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("Skipping row {}: {}", i, e);
                skipped.push(format!("row {}: {}", i, e));
            }
        }
    }
    (records, skipped)
}
