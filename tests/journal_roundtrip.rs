//! End-to-end flow over an on-disk database: journal trades through the
//! store, close them, then derive statistics and the equity curve exactly
//! the way a dashboard request would.

use journal_engine::db::Database;
use journal_engine::models::{CloseTradeInput, CreateTradeInput, Direction};
use journal_engine::normalize::normalize_trade_record;
use journal_engine::stats::{EquityCurveOptions, analyze_drawdown};
use journal_engine::store;
use journal_engine::{compute_aggregate_stats, compute_equity_curve};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_db(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("journal.db");
    Database::new(path.to_str().unwrap()).unwrap()
}

fn journal_closed_trade(db: &Database, entry: f64, exit: f64, closed_at: i64) {
    let trade = store::create_trade(
        db,
        &CreateTradeInput {
            pair: "BTC/USDT".to_string(),
            direction: Direction::Long,
            entry_price: entry,
            stop_loss: Some(entry * 0.96),
            take_profit: None,
            position_size: 1.0,
            fees: Some(0.0),
            opened_at: Some(closed_at - 3_600),
            notes: None,
        },
    )
    .unwrap();
    store::close_trade(
        db,
        &trade.id,
        &CloseTradeInput {
            exit_price: exit,
            closed_at: Some(closed_at),
            fees: None,
        },
    )
    .unwrap();
}

#[test]
fn stats_and_equity_over_stored_trades() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);

    // +100, -50, +200 in close order.
    journal_closed_trade(&db, 50_000.0, 50_100.0, 1_704_100_000);
    journal_closed_trade(&db, 50_000.0, 49_950.0, 1_704_200_000);
    journal_closed_trade(&db, 50_000.0, 50_200.0, 1_704_300_000);

    let trades = store::list_closed_chronological(&db).unwrap();
    assert_eq!(trades.len(), 3);

    let stats = compute_aggregate_stats(&trades).rounded();
    assert_eq!(stats.total_pnl, 250.0);
    assert_eq!(stats.win_rate, 66.67);
    assert_eq!(stats.profit_factor, 6.0);
    assert_eq!(stats.current_streak, 1);

    let curve = compute_equity_curve(&trades, &EquityCurveOptions::default());
    assert_eq!(curve.len(), 4);
    assert_eq!(curve.last().unwrap().balance, 10_250.0);

    let drawdown = analyze_drawdown(&curve);
    assert!(drawdown.max_drawdown_percent > 0.0);
}

#[test]
fn database_reopen_preserves_journal() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open_db(&dir);
        journal_closed_trade(&db, 40_000.0, 41_000.0, 1_704_100_000);
    }
    // Reopen: migrations are a no-op and data survives.
    let db = open_db(&dir);
    let trades = store::list_trades(&db, None).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].realized_pnl, Some(1_000.0));
}

#[test]
fn stored_rows_round_trip_through_the_normalizer() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);
    journal_closed_trade(&db, 50_000.0, 52_000.0, 1_704_100_000);

    let trades = store::list_trades(&db, None).unwrap();
    let raw = serde_json::to_value(&trades[0]).unwrap();
    let normalized = normalize_trade_record(&raw).unwrap();
    assert_eq!(normalized.id, trades[0].id);
    assert_eq!(normalized.realized_pnl, trades[0].realized_pnl);
    assert_eq!(normalized.closed_at, trades[0].closed_at);
}

#[test]
fn settings_feed_position_sizing_defaults() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);

    let settings = store::get_settings(&db).unwrap();
    let inputs =
        journal_engine::PositionSizeInputs::with_defaults(70_000.0, 67_000.0, &settings);
    let result = journal_engine::compute_position_size(&inputs).unwrap().rounded();
    // 10,000 account at 1% risk over a 3,000 stop distance, notional sizing.
    assert_eq!(result.risk_amount, 100.0);
    assert_eq!(result.position_size, 2_333.33);
}
