//! Database handle and schema.
//!
//! One transactional SQLite store is the shared substrate of the whole
//! control plane. Composite operations (auction cycle, spawn, attention
//! settlement) open one transaction via `Db::begin` and pass the connection
//! down into the row functions in `store::*`, so multi-row updates commit or
//! abort together.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::error::Result;
use crate::model::ResourceKind;

#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to `url`, creating the database file when missing.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Create all tables if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS agents (
  id TEXT PRIMARY KEY,
  balance DOUBLE PRECISION NOT NULL,
  status TEXT NOT NULL,
  execution_count BIGINT NOT NULL,
  total_earned DOUBLE PRECISION NOT NULL,
  total_spent DOUBLE PRECISION NOT NULL,
  lineage TEXT NOT NULL,
  workspace_id TEXT,
  created_at_ms BIGINT NOT NULL,
  last_execution_ms BIGINT
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS workspaces (
  id TEXT PRIMARY KEY,
  agent_id TEXT NOT NULL,
  filesystem_path TEXT NOT NULL UNIQUE,
  created_at_ms BIGINT NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS transactions (
  id TEXT PRIMARY KEY,
  from_entity TEXT NOT NULL,
  to_entity TEXT NOT NULL,
  amount DOUBLE PRECISION NOT NULL,
  memo TEXT NOT NULL,
  timestamp_ms BIGINT NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS resource_bundles (
  id TEXT PRIMARY KEY,
  cpu_percent DOUBLE PRECISION NOT NULL,
  memory_percent DOUBLE PRECISION NOT NULL,
  tokens_percent DOUBLE PRECISION NOT NULL,
  attention_percent DOUBLE PRECISION NOT NULL,
  duration_seconds DOUBLE PRECISION NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS bids (
  id TEXT PRIMARY KEY,
  agent_id TEXT NOT NULL,
  bundle_id TEXT NOT NULL,
  amount DOUBLE PRECISION NOT NULL,
  status TEXT NOT NULL,
  execution_id TEXT,
  timestamp_ms BIGINT NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS executions (
  id TEXT PRIMARY KEY,
  agent_id TEXT NOT NULL,
  bundle_id TEXT NOT NULL,
  start_ms BIGINT NOT NULL,
  end_ms BIGINT,
  status TEXT NOT NULL,
  exit_code INTEGER,
  termination_reason TEXT
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS prompts (
  id TEXT PRIMARY KEY,
  agent_id TEXT NOT NULL,
  execution_id TEXT NOT NULL,
  content TEXT NOT NULL,
  bid_amount DOUBLE PRECISION NOT NULL,
  status TEXT NOT NULL,
  timestamp_ms BIGINT NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS responses (
  id TEXT PRIMARY KEY,
  prompt_id TEXT NOT NULL,
  interesting DOUBLE PRECISION NOT NULL,
  useful DOUBLE PRECISION NOT NULL,
  understandable DOUBLE PRECISION NOT NULL,
  reason TEXT,
  credits_awarded DOUBLE PRECISION NOT NULL,
  timestamp_ms BIGINT NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS market_states (
  resource TEXT PRIMARY KEY,
  available_supply DOUBLE PRECISION NOT NULL,
  current_utilization DOUBLE PRECISION NOT NULL,
  current_price DOUBLE PRECISION NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS messages (
  id TEXT PRIMARY KEY,
  from_agent TEXT NOT NULL,
  to_agent TEXT NOT NULL,
  content TEXT NOT NULL,
  timestamp_ms BIGINT NOT NULL
);
"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_bids_status ON bids(status);"#)
            .execute(&self.pool)
            .await?;

        sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_prompts_status ON prompts(status);"#)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_entity);"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions(to_entity);"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert market rows that are not present yet; existing rows keep their
    /// discovered prices and utilization.
    pub async fn seed_market(&self, rows: &[(ResourceKind, f64, f64)]) -> Result<()> {
        for (kind, supply, price) in rows {
            sqlx::query(
                r#"
INSERT INTO market_states (resource, available_supply, current_utilization, current_price)
VALUES (?, ?, 0.0, ?)
ON CONFLICT(resource) DO NOTHING;
"#,
            )
            .bind(kind.to_string())
            .bind(supply)
            .bind(price)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}
