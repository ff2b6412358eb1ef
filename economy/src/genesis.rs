//! Agent creation: the genesis root and parent-funded children.
//!
//! Spawning is all-or-nothing: the parent debit, both transaction rows, the
//! child row, and the child workspace either all land or none do. Filesystem
//! work happens inside the open transaction so a failed directory write
//! rolls the rows back; the worst case is an orphan directory if the final
//! commit itself fails, which a re-spawn does not reuse.

use std::path::Path;

use common::bus::{EventSink, publish_all};
use common::events::SystemEvent;
use common::time::now_ms;

use crate::db::Db;
use crate::error::{EconomyError, Result};
use crate::ledger::{self, SYSTEM};
use crate::model::{Agent, AgentStatus, Transaction, Workspace, new_id};
use crate::store::agents;

pub const GENESIS_ID: &str = "genesis";
pub const GENESIS_INITIAL_CREDITS: f64 = 1000.0;
pub const SPAWN_COST: f64 = 10.0;

/// Create the root agent, or return it if it already exists.
pub async fn create_root(db: &Db, workspace_root: &Path) -> Result<Agent> {
    let mut tx = db.begin().await?;

    if let Some(existing) = agents::find_agent(&mut *tx, GENESIS_ID).await? {
        return Ok(existing);
    }

    let path = workspace_root.join(GENESIS_ID);
    tokio::fs::create_dir_all(&path).await?;

    let agent = create_agent_with_workspace(
        &mut *tx,
        GENESIS_ID.to_string(),
        GENESIS_INITIAL_CREDITS,
        Vec::new(),
        &path,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(agent_id = GENESIS_ID, credits = GENESIS_INITIAL_CREDITS, "genesis created");
    Ok(agent)
}

/// Spawn a child agent funded by `parent_id`.
///
/// Debits the parent by `SPAWN_COST + initial_credits`, burns the fee to
/// `SYSTEM`, creates the child workspace seeded with `payload` files, and
/// records the initial-credits transfer. The child's lineage is the parent
/// followed by the parent's own lineage.
pub async fn spawn_child(
    db: &Db,
    sink: &dyn EventSink,
    workspace_root: &Path,
    parent_id: &str,
    initial_credits: f64,
    payload: &[(String, String)],
) -> Result<Agent> {
    if initial_credits < 0.0 {
        return Err(EconomyError::InvalidAmount);
    }

    // Payload filenames must be bare basenames. Empty names are skipped.
    let mut seed_files: Vec<(&str, &str)> = Vec::new();
    for (name, content) in payload {
        if name.is_empty() {
            continue;
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(EconomyError::InvalidState(format!(
                "payload filename must be a bare file name: {name}"
            )));
        }
        seed_files.push((name.as_str(), content.as_str()));
    }

    let mut outbox: Vec<SystemEvent> = Vec::new();
    let mut tx = db.begin().await?;

    let mut parent = agents::get_agent(&mut *tx, parent_id).await?;
    if parent.status == AgentStatus::Dead {
        return Err(EconomyError::InvalidState(format!(
            "agent {parent_id} is dead and cannot spawn"
        )));
    }

    let total_cost = SPAWN_COST + initial_credits;
    if parent.balance < total_cost {
        return Err(EconomyError::InsufficientFunds {
            required: total_cost,
            available: parent.balance,
        });
    }

    // Fee burn, double-entry.
    ledger::transfer(&mut *tx, parent_id, SYSTEM, SPAWN_COST, "spawn fee", &mut outbox).await?;

    let child_id = new_id();
    let path = workspace_root.join(format!("agent-{child_id}"));
    tokio::fs::create_dir_all(&path).await?;
    for (name, content) in &seed_files {
        tokio::fs::write(path.join(name), content).await?;
    }

    let mut lineage = Vec::with_capacity(parent.lineage.len() + 1);
    lineage.push(parent.id.clone());
    lineage.extend(parent.lineage.iter().cloned());

    let mut child =
        create_agent_with_workspace(&mut *tx, child_id, 0.0, lineage, &path).await?;

    if initial_credits > 0.0 {
        // The grant is not routed through the child's earned counter: spawn
        // funding is inheritance, not income.
        parent = agents::get_agent(&mut *tx, parent_id).await?;
        parent.balance -= initial_credits;
        parent.total_spent += initial_credits;
        agents::update_agent(&mut *tx, &parent).await?;

        child.balance = initial_credits;
        agents::update_agent(&mut *tx, &child).await?;

        agents::insert_transaction(
            &mut *tx,
            &Transaction {
                id: new_id(),
                from_entity: parent_id.to_string(),
                to_entity: child.id.clone(),
                amount: initial_credits,
                memo: "initial credits".to_string(),
                timestamp_ms: now_ms(),
            },
        )
        .await?;
    }

    tx.commit().await?;
    publish_all(sink, outbox).await;

    tracing::info!(
        parent_id = %parent_id,
        child_id = %child.id,
        initial_credits,
        "child agent spawned"
    );
    Ok(child)
}

async fn create_agent_with_workspace(
    conn: &mut sqlx::SqliteConnection,
    agent_id: String,
    balance: f64,
    lineage: Vec<String>,
    path: &Path,
) -> Result<Agent> {
    let ts = now_ms();

    let workspace = Workspace {
        id: new_id(),
        agent_id: agent_id.clone(),
        filesystem_path: path.to_string_lossy().into_owned(),
        created_at_ms: ts,
    };
    agents::insert_workspace(conn, &workspace).await?;

    let agent = Agent {
        id: agent_id,
        balance,
        status: AgentStatus::Alive,
        execution_count: 0,
        total_earned: 0.0,
        total_spent: 0.0,
        lineage,
        workspace_id: Some(workspace.id.clone()),
        created_at_ms: ts,
        last_execution_ms: None,
    };
    agents::insert_agent(conn, &agent).await?;

    Ok(agent)
}
