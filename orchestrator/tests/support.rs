#![allow(dead_code)]

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

use common::bus::EventSink;
use common::events::SystemEvent;
use economy::db::Db;
use economy::model::{Agent, AgentStatus, ResourceBundle, Workspace, new_id};
use economy::store::{agents, market as market_rows};
use executor::types::{EnvDescriptor, Sandbox, SandboxOutput};
use market::resources::MARKET_RESOURCES;

pub async fn test_db() -> anyhow::Result<Db> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    let db = Db::from_pool(pool);
    db.migrate().await?;
    db.seed_market(&MARKET_RESOURCES).await?;
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

pub async fn add_workspace(db: &Db, agent_id: &str, path: &Path) -> anyhow::Result<()> {
    let workspace = Workspace {
        id: new_id(),
        agent_id: agent_id.to_string(),
        filesystem_path: path.to_string_lossy().into_owned(),
        created_at_ms: 1_000,
    };
    let mut conn = db.pool().acquire().await?;
    agents::insert_workspace(&mut conn, &workspace).await?;
    Ok(())
}

pub async fn add_bundle(
    db: &Db,
    cpu: f64,
    attention: f64,
    duration: f64,
) -> anyhow::Result<ResourceBundle> {
    let bundle = ResourceBundle {
        id: new_id(),
        cpu_percent: cpu,
        memory_percent: 0.0,
        tokens_percent: 0.0,
        attention_percent: attention,
        duration_seconds: duration,
    };
    let mut conn = db.pool().acquire().await?;
    market_rows::insert_bundle(&mut conn, &bundle).await?;
    Ok(bundle)
}

/// Sandbox double that always exits with the same code and counts runs.
pub struct MockSandbox {
    pub exit_code: i32,
    pub logs: String,
    pub calls: Mutex<Vec<String>>,
}

impl MockSandbox {
    pub fn exits(exit_code: i32) -> Self {
        Self {
            exit_code,
            logs: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn run(
        &self,
        agent_id: &str,
        _workspace_path: &Path,
        _bundle: &ResourceBundle,
        _env: &EnvDescriptor,
    ) -> anyhow::Result<SandboxOutput> {
        self.calls.lock().await.push(agent_id.to_string());
        Ok(SandboxOutput {
            exit_code: self.exit_code,
            logs: self.logs.clone(),
        })
    }
}

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
