// In crates/database/src/lib.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{OrderStatus, Position, TokenCandidate, TokenId, TradeRecord};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub mod error;
pub mod memory;
pub mod sink;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use memory::MemorySink;
pub use sink::PersistenceSink;

/// A wrapper around the `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct Db(SqlitePool);

/// Opens the SQLite database at `url`, creating it if needed, and runs migrations.
///
/// # Arguments
///
/// * `url`: A SQLite connection URL such as `sqlite://dex_bot.db`.
///
/// # Returns
///
/// A `Result` containing the `Db` wrapper on success, or an `Error` on failure.
pub async fn connect(url: &str) -> Result<Db> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Db::migrated(pool).await
}

impl Db {
    /// A private in-memory database. A single connection keeps every query
    /// on the same memory store.
    pub async fn in_memory() -> Result<Db> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Db::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Db> {
        // Run database migrations. This ensures the database schema is up-to-date.
        sqlx::migrate!("../../migrations").run(&pool).await?;
        Ok(Db(pool))
    }

    /// Loads every persisted open position, used to restore the ledger on startup.
    pub async fn load_positions(&self) -> Result<Vec<Position>> {
        let rows = sqlx::query(
            r#"
            SELECT token_id, symbol, quantity, avg_entry_price, current_price, entry_time,
                   unrealized_pnl, realized_pnl, stop_loss_price, take_profit_price
            FROM positions
            ORDER BY entry_time
            "#,
        )
        .fetch_all(&self.0)
        .await
        .map_err(Error::OperationFailed)?;

        rows.iter().map(position_from_row).collect()
    }

    /// Returns every status recorded for `order_id`, oldest first.
    pub async fn order_history(&self, order_id: &str) -> Result<Vec<OrderStatus>> {
        let rows = sqlx::query("SELECT status FROM order_status WHERE order_id = ? ORDER BY id")
            .bind(order_id)
            .fetch_all(&self.0)
            .await
            .map_err(Error::OperationFailed)?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("status").map_err(Error::OperationFailed)?;
                Ok(OrderStatus::from_venue(&raw))
            })
            .collect()
    }

    /// Counts the rows of the trade log.
    pub async fn trade_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM trades")
            .fetch_one(&self.0)
            .await
            .map_err(Error::OperationFailed)?;
        row.try_get("n").map_err(Error::OperationFailed)
    }
}

#[async_trait]
impl PersistenceSink for Db {
    async fn save_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        sqlx::query("INSERT INTO order_status (order_id, status, recorded_at) VALUES (?, ?, ?)")
            .bind(order_id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&self.0)
            .await
            .map_err(Error::OperationFailed)?;
        Ok(())
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO positions (token_id, symbol, quantity, avg_entry_price, current_price, entry_time,
                                   unrealized_pnl, realized_pnl, stop_loss_price, take_profit_price, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (token_id) DO UPDATE SET
                symbol = excluded.symbol,
                quantity = excluded.quantity,
                avg_entry_price = excluded.avg_entry_price,
                current_price = excluded.current_price,
                unrealized_pnl = excluded.unrealized_pnl,
                realized_pnl = excluded.realized_pnl,
                stop_loss_price = excluded.stop_loss_price,
                take_profit_price = excluded.take_profit_price,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(position.token_id.as_str())
        .bind(&position.symbol)
        .bind(position.quantity.to_string())
        .bind(position.avg_entry_price.to_string())
        .bind(position.current_price.to_string())
        .bind(position.entry_time)
        .bind(position.unrealized_pnl.to_string())
        .bind(position.realized_pnl.to_string())
        .bind(position.stop_loss_price.map(|p| p.to_string()))
        .bind(position.take_profit_price.map(|p| p.to_string()))
        .bind(Utc::now())
        .execute(&self.0)
        .await
        .map_err(Error::OperationFailed)?;
        Ok(())
    }

    async fn delete_position(&self, token_id: &TokenId) -> Result<()> {
        sqlx::query("DELETE FROM positions WHERE token_id = ?")
            .bind(token_id.as_str())
            .execute(&self.0)
            .await
            .map_err(Error::OperationFailed)?;
        Ok(())
    }

    async fn save_trade(&self, trade: &TradeRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO trades (token_id, side, quantity, price, realized_pnl, executed_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(trade.token_id.as_str())
        .bind(trade.side.as_str())
        .bind(trade.quantity.to_string())
        .bind(trade.price.to_string())
        .bind(trade.realized_pnl.map(|p| p.to_string()))
        .bind(trade.timestamp)
        .execute(&self.0)
        .await
        .map_err(Error::OperationFailed)?;
        Ok(())
    }

    async fn save_token_snapshot(&self, candidate: &TokenCandidate) -> Result<()> {
        let data = serde_json::to_string(candidate)?;
        sqlx::query("INSERT OR REPLACE INTO tokens (address, symbol, data, recorded_at) VALUES (?, ?, ?, ?)")
            .bind(candidate.address.as_str())
            .bind(&candidate.symbol)
            .bind(data)
            .bind(Utc::now())
            .execute(&self.0)
            .await
            .map_err(Error::OperationFailed)?;
        Ok(())
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let raw: String = row.try_get(column).map_err(Error::OperationFailed)?;
    Decimal::from_str(&raw).map_err(|e| Error::CorruptRow(format!("{column}: {e}")))
}

fn optional_decimal_column(row: &SqliteRow, column: &str) -> Result<Option<Decimal>> {
    let raw: Option<String> = row.try_get(column).map_err(Error::OperationFailed)?;
    raw.map(|r| Decimal::from_str(&r).map_err(|e| Error::CorruptRow(format!("{column}: {e}"))))
        .transpose()
}

fn position_from_row(row: &SqliteRow) -> Result<Position> {
    let token_id: String = row.try_get("token_id").map_err(Error::OperationFailed)?;
    let entry_time: DateTime<Utc> = row.try_get("entry_time").map_err(Error::OperationFailed)?;

    Ok(Position {
        token_id: TokenId::new(token_id),
        symbol: row.try_get("symbol").map_err(Error::OperationFailed)?,
        quantity: decimal_column(row, "quantity")?,
        avg_entry_price: decimal_column(row, "avg_entry_price")?,
        current_price: decimal_column(row, "current_price")?,
        entry_time,
        unrealized_pnl: decimal_column(row, "unrealized_pnl")?,
        realized_pnl: decimal_column(row, "realized_pnl")?,
        stop_loss_price: optional_decimal_column(row, "stop_loss_price")?,
        take_profit_price: optional_decimal_column(row, "take_profit_price")?,
    })
}
