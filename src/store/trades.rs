//! Trade storage collaborator: list, fetch, create, close and delete
//! journal rows. Everything is parameterized SQL over the shared
//! connection; computation code never touches the database.

use chrono::Utc;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::JournalError;
use crate::models::{
    CloseTradeInput, CreateTradeInput, Direction, TradeFilters, TradeRecord, TradeStatus,
};

const SELECT_COLUMNS: &str = "id, pair, direction, entry_price, exit_price, stop_loss, \
     take_profit, position_size, fees, realized_pnl, status, opened_at, closed_at, notes";

fn map_row(row: &Row) -> rusqlite::Result<TradeRecord> {
    let direction: String = row.get(2)?;
    let status: String = row.get(10)?;
    Ok(TradeRecord {
        id: row.get(0)?,
        pair: row.get(1)?,
        direction: Direction::parse(&direction).unwrap_or(Direction::Long),
        entry_price: row.get(3)?,
        exit_price: row.get(4)?,
        stop_loss: row.get(5)?,
        take_profit: row.get(6)?,
        position_size: row.get(7)?,
        fees: row.get(8)?,
        realized_pnl: row.get(9)?,
        status: TradeStatus::parse(&status).unwrap_or(TradeStatus::Open),
        opened_at: row.get(11)?,
        closed_at: row.get(12)?,
        notes: row.get(13)?,
    })
}

/// List trades newest-first, optionally filtered and paged.
pub fn list_trades(
    db: &Database,
    filters: Option<&TradeFilters>,
) -> Result<Vec<TradeRecord>, JournalError> {
    let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;

    let mut query = format!("SELECT {} FROM trades WHERE 1=1", SELECT_COLUMNS);
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(f) = filters {
        if let Some(status) = f.status {
            query.push_str(" AND status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }
        if let Some(pair) = &f.pair {
            query.push_str(" AND pair LIKE ?");
            params.push(Box::new(format!("%{}%", pair)));
        }
        if let Some(start) = f.start_date {
            query.push_str(" AND opened_at >= ?");
            params.push(Box::new(start));
        }
        if let Some(end) = f.end_date {
            query.push_str(" AND opened_at <= ?");
            params.push(Box::new(end));
        }
    }

    query.push_str(" ORDER BY opened_at DESC");

    if let Some(f) = filters {
        if let (Some(page), Some(limit)) = (f.page, f.limit) {
            let offset = (page.max(1) - 1) * limit;
            query.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(limit));
            params.push(Box::new(offset));
        }
    }

    log::debug!("list_trades query: {}", query);

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(param_refs.as_slice(), map_row)?;
    let trades: Result<Vec<TradeRecord>, _> = rows.collect();
    Ok(trades?)
}

/// Closed trades in close order, the shape the statistics and equity-curve
/// builders consume.
pub fn list_closed_chronological(db: &Database) -> Result<Vec<TradeRecord>, JournalError> {
    let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades
         WHERE status = 'closed' AND realized_pnl IS NOT NULL AND closed_at IS NOT NULL
         ORDER BY closed_at ASC",
        SELECT_COLUMNS
    ))?;
    let rows = stmt.query_map([], map_row)?;
    let trades: Result<Vec<TradeRecord>, _> = rows.collect();
    Ok(trades?)
}

pub fn get_trade(db: &Database, id: &str) -> Result<TradeRecord, JournalError> {
    let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ?", SELECT_COLUMNS),
        [&id],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => JournalError::NotFound(format!("trade {}", id)),
        other => other.into(),
    })
}

pub fn create_trade(db: &Database, input: &CreateTradeInput) -> Result<TradeRecord, JournalError> {
    if input.entry_price <= 0.0 {
        return Err(JournalError::validation("entry_price", "must be positive"));
    }
    if input.position_size <= 0.0 {
        return Err(JournalError::validation("position_size", "must be positive"));
    }

    let id = format!("TRADE-{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4());
    let now = Utc::now().timestamp();
    let opened_at = input.opened_at.unwrap_or(now);

    {
        let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO trades (
                id, pair, direction, entry_price, stop_loss, take_profit,
                position_size, fees, status, opened_at, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'open', ?, ?, ?, ?)",
            rusqlite::params![
                id,
                input.pair.to_uppercase(),
                input.direction.as_str(),
                input.entry_price,
                input.stop_loss,
                input.take_profit,
                input.position_size,
                input.fees.unwrap_or(0.0),
                opened_at,
                input.notes,
                now,
                now
            ],
        )?;
    }

    get_trade(db, &id)
}

/// The single mutation of a trade's lifecycle: set exit price, close time,
/// realized P&L and status together.
pub fn close_trade(
    db: &Database,
    id: &str,
    input: &CloseTradeInput,
) -> Result<TradeRecord, JournalError> {
    if input.exit_price <= 0.0 {
        return Err(JournalError::validation("exit_price", "must be positive"));
    }

    let trade = get_trade(db, id)?;
    if trade.status != TradeStatus::Open {
        return Err(JournalError::InvalidInput(format!(
            "trade {} is not open",
            id
        )));
    }

    let fees = input.fees.unwrap_or(trade.fees);
    let realized_pnl =
        trade.direction.signed_move(trade.entry_price, input.exit_price) * trade.position_size
            - fees;
    let closed_at = input.closed_at.unwrap_or_else(|| Utc::now().timestamp());

    {
        let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;
        conn.execute(
            "UPDATE trades SET exit_price = ?, closed_at = ?, realized_pnl = ?, fees = ?,
                 status = 'closed', updated_at = ? WHERE id = ?",
            rusqlite::params![
                input.exit_price,
                closed_at,
                realized_pnl,
                fees,
                Utc::now().timestamp(),
                id
            ],
        )?;
    }

    get_trade(db, id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTradeInput {
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub notes: Option<String>,
}

/// Partial update of the editable plan fields.
pub fn update_trade(
    db: &Database,
    id: &str,
    input: &UpdateTradeInput,
) -> Result<TradeRecord, JournalError> {
    {
        let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;

        let mut updates = vec!["updated_at = ?"];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(Utc::now().timestamp())];

        if let Some(stop_loss) = input.stop_loss {
            updates.push("stop_loss = ?");
            values.push(Box::new(stop_loss));
        }
        if let Some(take_profit) = input.take_profit {
            updates.push("take_profit = ?");
            values.push(Box::new(take_profit));
        }
        if let Some(notes) = &input.notes {
            updates.push("notes = ?");
            values.push(Box::new(notes.clone()));
        }

        let query = format!("UPDATE trades SET {} WHERE id = ?", updates.join(", "));
        values.push(Box::new(id.to_string()));

        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&query, params.as_slice())?;
        if changed == 0 {
            return Err(JournalError::NotFound(format!("trade {}", id)));
        }
    }

    get_trade(db, id)
}

/// Hard delete, no tombstone. Explicit user action only.
pub fn delete_trade(db: &Database, id: &str) -> Result<(), JournalError> {
    let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;
    let deleted = conn.execute("DELETE FROM trades WHERE id = ?", [&id])?;
    if deleted == 0 {
        return Err(JournalError::NotFound(format!("trade {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::in_memory().unwrap()
    }

    fn create_input() -> CreateTradeInput {
        CreateTradeInput {
            pair: "btc/usdt".to_string(),
            direction: Direction::Long,
            entry_price: 50_000.0,
            stop_loss: Some(48_000.0),
            take_profit: Some(54_000.0),
            position_size: 0.1,
            fees: Some(2.5),
            opened_at: Some(1_704_067_200),
            notes: None,
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = db();
        let trade = create_trade(&db, &create_input()).unwrap();
        assert_eq!(trade.pair, "BTC/USDT");
        assert_eq!(trade.status, TradeStatus::Open);
        assert!(trade.realized_pnl.is_none());

        let fetched = get_trade(&db, &trade.id).unwrap();
        assert_eq!(fetched.entry_price, 50_000.0);
    }

    #[test]
    fn test_close_sets_everything_at_once() {
        let db = db();
        let trade = create_trade(&db, &create_input()).unwrap();
        let closed = close_trade(
            &db,
            &trade.id,
            &CloseTradeInput {
                exit_price: 52_000.0,
                closed_at: Some(1_704_153_600),
                fees: None,
            },
        )
        .unwrap();
        assert_eq!(closed.status, TradeStatus::Closed);
        assert_eq!(closed.closed_at, Some(1_704_153_600));
        // (52000 - 50000) * 0.1 - 2.5
        assert_eq!(closed.realized_pnl, Some(197.5));
        assert!(closed.validate().is_ok());

        // Closing twice is rejected.
        assert!(close_trade(
            &db,
            &trade.id,
            &CloseTradeInput {
                exit_price: 53_000.0,
                closed_at: None,
                fees: None
            }
        )
        .is_err());
    }

    #[test]
    fn test_filters_and_paging() {
        let db = db();
        for i in 0..5 {
            let mut input = create_input();
            input.opened_at = Some(1_704_067_200 + i * 1_000);
            if i == 0 {
                input.pair = "ETH/USDT".to_string();
            }
            create_trade(&db, &input).unwrap();
        }

        let filters = TradeFilters {
            pair: Some("BTC".to_string()),
            ..Default::default()
        };
        assert_eq!(list_trades(&db, Some(&filters)).unwrap().len(), 4);

        let paged = TradeFilters {
            page: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let page = list_trades(&db, Some(&paged)).unwrap();
        assert_eq!(page.len(), 2);
        // Newest first.
        assert!(page[0].opened_at >= page[1].opened_at);
    }

    #[test]
    fn test_closed_chronological_ordering() {
        let db = db();
        let mut closes = Vec::new();
        for i in 0..3 {
            let trade = create_trade(&db, &create_input()).unwrap();
            let closed = close_trade(
                &db,
                &trade.id,
                &CloseTradeInput {
                    exit_price: 51_000.0,
                    closed_at: Some(1_704_200_000 - i * 10_000),
                    fees: None,
                },
            )
            .unwrap();
            closes.push(closed.closed_at.unwrap());
        }
        let listed = list_closed_chronological(&db).unwrap();
        let order: Vec<i64> = listed.iter().filter_map(|t| t.closed_at).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_delete_is_hard() {
        let db = db();
        let trade = create_trade(&db, &create_input()).unwrap();
        delete_trade(&db, &trade.id).unwrap();
        assert!(matches!(
            get_trade(&db, &trade.id),
            Err(JournalError::NotFound(_))
        ));
        assert!(delete_trade(&db, &trade.id).is_err());
    }

    #[test]
    fn test_update_plan_fields() {
        let db = db();
        let trade = create_trade(&db, &create_input()).unwrap();
        let updated = update_trade(
            &db,
            &trade.id,
            &UpdateTradeInput {
                stop_loss: Some(47_500.0),
                take_profit: None,
                notes: Some("tightened stop".to_string()),
            },
        )
        .unwrap();
        assert_eq!(updated.stop_loss, Some(47_500.0));
        assert_eq!(updated.take_profit, Some(54_000.0));
        assert_eq!(updated.notes.as_deref(), Some("tightened stop"));
    }
}
