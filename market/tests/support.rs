#![allow(dead_code)]

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

use common::bus::EventSink;
use common::events::SystemEvent;
use economy::db::Db;
use economy::model::{
    Agent, AgentStatus, Bid, BidStatus, Execution, ExecutionStatus, ResourceBundle, ResourceKind,
    new_id,
};
use economy::store::{agents, market};

/// Fresh single-connection in-memory database with the given market rows.
pub async fn test_db(rows: &[(ResourceKind, f64, f64)]) -> anyhow::Result<Db> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    let db = Db::from_pool(pool);
    db.migrate().await?;
    db.seed_market(rows).await?;
    Ok(db)
}

pub async fn add_agent(db: &Db, id: &str, balance: f64) -> anyhow::Result<Agent> {
    let agent = Agent {
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
    };
    let mut conn = db.pool().acquire().await?;
    agents::insert_agent(&mut conn, &agent).await?;
    Ok(agent)
}

pub fn bundle(cpu: f64, memory: f64, tokens: f64, attention: f64, duration: f64) -> ResourceBundle {
    ResourceBundle {
        id: new_id(),
        cpu_percent: cpu,
        memory_percent: memory,
        tokens_percent: tokens,
        attention_percent: attention,
        duration_seconds: duration,
    }
}

pub async fn add_bundle(db: &Db, b: &ResourceBundle) -> anyhow::Result<()> {
    let mut conn = db.pool().acquire().await?;
    market::insert_bundle(&mut conn, b).await?;
    Ok(())
}

/// Insert a pending bid with an explicit timestamp (tie-break control).
pub async fn add_pending_bid(
    db: &Db,
    agent_id: &str,
    bundle_id: &str,
    amount: f64,
    timestamp_ms: i64,
) -> anyhow::Result<Bid> {
    let bid = Bid {
        id: new_id(),
        agent_id: agent_id.to_string(),
        bundle_id: bundle_id.to_string(),
        amount,
        status: BidStatus::Pending,
        execution_id: None,
        timestamp_ms,
    };
    let mut conn = db.pool().acquire().await?;
    market::insert_bid(&mut conn, &bid).await?;
    Ok(bid)
}

/// Insert a pending execution row directly (attention tests need one).
pub async fn add_execution(db: &Db, agent_id: &str, bundle_id: &str) -> anyhow::Result<Execution> {
    let execution = Execution {
        id: new_id(),
        agent_id: agent_id.to_string(),
        bundle_id: bundle_id.to_string(),
        start_ms: 1_000,
        end_ms: None,
        status: ExecutionStatus::Pending,
        exit_code: None,
        termination_reason: None,
    };
    let mut conn = db.pool().acquire().await?;
    market::insert_execution(&mut conn, &execution).await?;
    Ok(execution)
}

/// Event sink that keeps everything it sees.
#[derive(Default)]
pub struct CollectSink {
    pub events: Mutex<Vec<SystemEvent>>,
}

#[async_trait]
impl EventSink for CollectSink {
    async fn publish(&self, event: SystemEvent) {
        self.events.lock().await.push(event);
    }
}
