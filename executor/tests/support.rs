#![allow(dead_code)]

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

use common::bus::EventSink;
use common::events::SystemEvent;
use economy::db::Db;
use economy::model::{
    Agent, AgentStatus, Bid, BidStatus, Execution, ExecutionStatus, ResourceBundle, Workspace,
    new_id,
};
use economy::store::{agents, market};
use executor::types::{EnvDescriptor, Sandbox, SandboxOutput};

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

pub async fn add_workspace(db: &Db, agent_id: &str, path: &Path) -> anyhow::Result<Workspace> {
    let workspace = Workspace {
        id: new_id(),
        agent_id: agent_id.to_string(),
        filesystem_path: path.to_string_lossy().into_owned(),
        created_at_ms: 1_000,
    };
    let mut conn = db.pool().acquire().await?;
    agents::insert_workspace(&mut conn, &workspace).await?;
    Ok(workspace)
}

/// Bundle + pending execution + winning bid, wired together.
pub async fn add_winning_bid(
    db: &Db,
    agent_id: &str,
    attention: f64,
    duration: f64,
) -> anyhow::Result<(Bid, Execution, ResourceBundle)> {
    let bundle = ResourceBundle {
        id: new_id(),
        cpu_percent: 0.1,
        memory_percent: 0.1,
        tokens_percent: 0.0,
        attention_percent: attention,
        duration_seconds: duration,
    };
    let execution = Execution {
        id: new_id(),
        agent_id: agent_id.to_string(),
        bundle_id: bundle.id.clone(),
        start_ms: 1_000,
        end_ms: None,
        status: ExecutionStatus::Pending,
        exit_code: None,
        termination_reason: None,
    };
    let bid = Bid {
        id: new_id(),
        agent_id: agent_id.to_string(),
        bundle_id: bundle.id.clone(),
        amount: 10.0,
        status: BidStatus::Winning,
        execution_id: Some(execution.id.clone()),
        timestamp_ms: 1_000,
    };

    let mut conn = db.pool().acquire().await?;
    market::insert_bundle(&mut conn, &bundle).await?;
    market::insert_execution(&mut conn, &execution).await?;
    market::insert_bid(&mut conn, &bid).await?;
    Ok((bid, execution, bundle))
}

/// Sandbox double: records invocations and replays a canned outcome.
pub struct MockSandbox {
    pub result: StdMutex<Option<anyhow::Result<SandboxOutput>>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSandbox {
    pub fn exits(exit_code: i32, logs: &str) -> Self {
        Self {
            result: StdMutex::new(Some(Ok(SandboxOutput {
                exit_code,
                logs: logs.to_string(),
            }))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fails(message: &str) -> Self {
        Self {
            result: StdMutex::new(Some(Err(anyhow::anyhow!("{message}")))),
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
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(SandboxOutput { exit_code: 0, logs: String::new() }))
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
