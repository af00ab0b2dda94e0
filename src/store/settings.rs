//! Risk-settings collaborator: one singleton row, created on first read.

use chrono::Utc;

use crate::db::Database;
use crate::error::JournalError;
use crate::models::{RiskSettings, UpdateRiskSettingsInput};

fn read_settings(conn: &rusqlite::Connection) -> rusqlite::Result<RiskSettings> {
    conn.query_row(
        "SELECT id, account_size, risk_per_trade, max_daily_loss, max_positions,
                default_leverage, currency, created_at, updated_at
         FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(RiskSettings {
                id: row.get(0)?,
                account_size: row.get(1)?,
                risk_per_trade: row.get(2)?,
                max_daily_loss: row.get(3)?,
                max_positions: row.get(4)?,
                default_leverage: row.get(5)?,
                currency: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        },
    )
}

/// Fetch the settings row, inserting defaults the first time.
pub fn get_settings(db: &Database) -> Result<RiskSettings, JournalError> {
    let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;

    match read_settings(&conn) {
        Ok(settings) => Ok(settings),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let defaults = RiskSettings::defaults(Utc::now().timestamp());
            conn.execute(
                "INSERT INTO settings (id, account_size, risk_per_trade, max_daily_loss,
                     max_positions, default_leverage, currency, created_at, updated_at)
                 VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    defaults.account_size,
                    defaults.risk_per_trade,
                    defaults.max_daily_loss,
                    defaults.max_positions,
                    defaults.default_leverage,
                    defaults.currency,
                    defaults.created_at,
                    defaults.updated_at
                ],
            )?;
            Ok(defaults)
        }
        Err(e) => Err(e.into()),
    }
}

/// Partial update; unspecified fields keep their stored value.
pub fn update_settings(
    db: &Database,
    input: &UpdateRiskSettingsInput,
) -> Result<RiskSettings, JournalError> {
    input.validate()?;

    // Make sure the row exists before updating it.
    get_settings(db)?;

    {
        let conn = db.conn.lock().map_err(|e| JournalError::Database(e.to_string()))?;

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(val) = input.account_size {
            updates.push("account_size = ?");
            values.push(Box::new(val));
        }
        if let Some(val) = input.risk_per_trade {
            updates.push("risk_per_trade = ?");
            values.push(Box::new(val));
        }
        if let Some(val) = input.max_daily_loss {
            updates.push("max_daily_loss = ?");
            values.push(Box::new(val));
        }
        if let Some(val) = input.max_positions {
            updates.push("max_positions = ?");
            values.push(Box::new(val));
        }
        if let Some(val) = input.default_leverage {
            updates.push("default_leverage = ?");
            values.push(Box::new(val));
        }
        if let Some(val) = &input.currency {
            updates.push("currency = ?");
            values.push(Box::new(val.clone()));
        }

        updates.push("updated_at = strftime('%s', 'now')");

        let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&query, params.as_slice())?;
    }

    get_settings(db)
}
