#![allow(dead_code)]

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use economy::db::Db;
use economy::model::{Agent, AgentStatus};
use economy::store::agents;

/// Fresh single-connection in-memory database with the schema applied.
pub async fn test_db() -> anyhow::Result<Db> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    let db = Db::from_pool(pool);
    db.migrate().await?;
    Ok(db)
}

pub fn sample_agent(id: &str, balance: f64) -> Agent {
    Agent {
        id: id.to_string(),
        balance,
        status: AgentStatus::Alive,
        execution_count: 0,
        total_earned: 0.0,
        total_spent: 0.0,
        lineage: Vec::new(),
        workspace_id: None,
        created_at_ms: 1_000,
        last_execution_ms: None,
    }
}

pub async fn add_agent(db: &Db, id: &str, balance: f64) -> anyhow::Result<Agent> {
    let agent = sample_agent(id, balance);
    let mut conn = db.pool().acquire().await?;
    agents::insert_agent(&mut conn, &agent).await?;
    Ok(agent)
}
