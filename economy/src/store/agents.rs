use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::error::{EconomyError, Result};
use crate::model::{Agent, AgentStatus, Transaction, Workspace};

fn row_to_agent(r: &SqliteRow) -> Result<Agent> {
    let status = AgentStatus::from_str(&r.get::<String, _>("status"))?;
    let lineage: Vec<String> = serde_json::from_str(&r.get::<String, _>("lineage"))?;

    Ok(Agent {
        id: r.get("id"),
        balance: r.get("balance"),
        status,
        execution_count: r.get("execution_count"),
        total_earned: r.get("total_earned"),
        total_spent: r.get("total_spent"),
        lineage,
        workspace_id: r.get("workspace_id"),
        created_at_ms: r.get("created_at_ms"),
        last_execution_ms: r.get("last_execution_ms"),
    })
}

pub async fn insert_agent(conn: &mut SqliteConnection, agent: &Agent) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO agents (id, balance, status, execution_count, total_earned, total_spent,
                    lineage, workspace_id, created_at_ms, last_execution_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&agent.id)
    .bind(agent.balance)
    .bind(agent.status.to_string())
    .bind(agent.execution_count)
    .bind(agent.total_earned)
    .bind(agent.total_spent)
    .bind(serde_json::to_string(&agent.lineage)?)
    .bind(&agent.workspace_id)
    .bind(agent.created_at_ms)
    .bind(agent.last_execution_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_agent(conn: &mut SqliteConnection, id: &str) -> Result<Option<Agent>> {
    let row = sqlx::query("SELECT * FROM agents WHERE id = ?;")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => Ok(Some(row_to_agent(&r)?)),
        None => Ok(None),
    }
}

pub async fn get_agent(conn: &mut SqliteConnection, id: &str) -> Result<Agent> {
    find_agent(conn, id)
        .await?
        .ok_or_else(|| EconomyError::not_found("agent", id))
}

/// Write back every mutable agent column.
pub async fn update_agent(conn: &mut SqliteConnection, agent: &Agent) -> Result<()> {
    let res = sqlx::query(
        r#"
UPDATE agents
SET balance = ?, status = ?, execution_count = ?, total_earned = ?,
    total_spent = ?, last_execution_ms = ?
WHERE id = ?;
"#,
    )
    .bind(agent.balance)
    .bind(agent.status.to_string())
    .bind(agent.execution_count)
    .bind(agent.total_earned)
    .bind(agent.total_spent)
    .bind(agent.last_execution_ms)
    .bind(&agent.id)
    .execute(&mut *conn)
    .await?;

    if res.rows_affected() != 1 {
        return Err(EconomyError::not_found("agent", agent.id.clone()));
    }
    Ok(())
}

pub async fn list_agents(conn: &mut SqliteConnection) -> Result<Vec<Agent>> {
    let rows = sqlx::query("SELECT * FROM agents ORDER BY created_at_ms ASC;")
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(row_to_agent).collect()
}

/// Mark every broke-but-alive agent dead; returns the ids swept.
/// Running this twice is the same as running it once.
pub async fn sweep_dead(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT id FROM agents WHERE status = 'alive' AND balance <= 0;")
        .fetch_all(&mut *conn)
        .await?;

    let ids: Vec<String> = rows.iter().map(|r| r.get("id")).collect();

    if !ids.is_empty() {
        sqlx::query("UPDATE agents SET status = 'dead' WHERE status = 'alive' AND balance <= 0;")
            .execute(&mut *conn)
            .await?;
    }

    Ok(ids)
}

fn row_to_workspace(r: &SqliteRow) -> Workspace {
    Workspace {
        id: r.get("id"),
        agent_id: r.get("agent_id"),
        filesystem_path: r.get("filesystem_path"),
        created_at_ms: r.get("created_at_ms"),
    }
}

pub async fn insert_workspace(conn: &mut SqliteConnection, ws: &Workspace) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO workspaces (id, agent_id, filesystem_path, created_at_ms)
VALUES (?, ?, ?, ?);
"#,
    )
    .bind(&ws.id)
    .bind(&ws.agent_id)
    .bind(&ws.filesystem_path)
    .bind(ws.created_at_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn workspace_for_agent(
    conn: &mut SqliteConnection,
    agent_id: &str,
) -> Result<Option<Workspace>> {
    let row = sqlx::query("SELECT * FROM workspaces WHERE agent_id = ?;")
        .bind(agent_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| row_to_workspace(&r)))
}

fn row_to_transaction(r: &SqliteRow) -> Transaction {
    Transaction {
        id: r.get("id"),
        from_entity: r.get("from_entity"),
        to_entity: r.get("to_entity"),
        amount: r.get("amount"),
        memo: r.get("memo"),
        timestamp_ms: r.get("timestamp_ms"),
    }
}

pub async fn insert_transaction(conn: &mut SqliteConnection, tx: &Transaction) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO transactions (id, from_entity, to_entity, amount, memo, timestamp_ms)
VALUES (?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&tx.id)
    .bind(&tx.from_entity)
    .bind(&tx.to_entity)
    .bind(tx.amount)
    .bind(tx.memo.clone())
    .bind(tx.timestamp_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Every transaction touching `entity`, newest first.
pub async fn transactions_for(
    conn: &mut SqliteConnection,
    entity: &str,
) -> Result<Vec<Transaction>> {
    let rows = sqlx::query(
        r#"
SELECT * FROM transactions
WHERE from_entity = ? OR to_entity = ?
ORDER BY timestamp_ms DESC, id DESC;
"#,
    )
    .bind(entity)
    .bind(entity)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(row_to_transaction).collect())
}
