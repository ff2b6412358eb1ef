use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::error::{EconomyError, Result};
use crate::model::{
    Bid, BidStatus, Execution, ExecutionStatus, MarketState, ResourceBundle, ResourceKind,
};

fn row_to_bundle(r: &SqliteRow) -> ResourceBundle {
    ResourceBundle {
        id: r.get("id"),
        cpu_percent: r.get("cpu_percent"),
        memory_percent: r.get("memory_percent"),
        tokens_percent: r.get("tokens_percent"),
        attention_percent: r.get("attention_percent"),
        duration_seconds: r.get("duration_seconds"),
    }
}

pub async fn insert_bundle(conn: &mut SqliteConnection, bundle: &ResourceBundle) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO resource_bundles (id, cpu_percent, memory_percent, tokens_percent,
                              attention_percent, duration_seconds)
VALUES (?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&bundle.id)
    .bind(bundle.cpu_percent)
    .bind(bundle.memory_percent)
    .bind(bundle.tokens_percent)
    .bind(bundle.attention_percent)
    .bind(bundle.duration_seconds)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_bundle(conn: &mut SqliteConnection, id: &str) -> Result<ResourceBundle> {
    let row = sqlx::query("SELECT * FROM resource_bundles WHERE id = ?;")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| row_to_bundle(&r))
        .ok_or_else(|| EconomyError::not_found("resource bundle", id))
}

fn row_to_bid(r: &SqliteRow) -> Result<Bid> {
    Ok(Bid {
        id: r.get("id"),
        agent_id: r.get("agent_id"),
        bundle_id: r.get("bundle_id"),
        amount: r.get("amount"),
        status: BidStatus::from_str(&r.get::<String, _>("status"))?,
        execution_id: r.get("execution_id"),
        timestamp_ms: r.get("timestamp_ms"),
    })
}

pub async fn insert_bid(conn: &mut SqliteConnection, bid: &Bid) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO bids (id, agent_id, bundle_id, amount, status, execution_id, timestamp_ms)
VALUES (?, ?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&bid.id)
    .bind(&bid.agent_id)
    .bind(&bid.bundle_id)
    .bind(bid.amount)
    .bind(bid.status.to_string())
    .bind(&bid.execution_id)
    .bind(bid.timestamp_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_bid(conn: &mut SqliteConnection, id: &str) -> Result<Bid> {
    let row = sqlx::query("SELECT * FROM bids WHERE id = ?;")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => row_to_bid(&r),
        None => Err(EconomyError::not_found("bid", id)),
    }
}

/// Pending bids in clearing order: highest amount first, earliest timestamp
/// breaking ties.
pub async fn pending_bids(conn: &mut SqliteConnection) -> Result<Vec<Bid>> {
    let rows = sqlx::query(
        r#"
SELECT * FROM bids
WHERE status = 'pending'
ORDER BY amount DESC, timestamp_ms ASC, id ASC;
"#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_bid).collect()
}

pub async fn winning_bids(conn: &mut SqliteConnection) -> Result<Vec<Bid>> {
    let rows = sqlx::query(
        r#"
SELECT * FROM bids
WHERE status = 'winning'
ORDER BY timestamp_ms ASC, id ASC;
"#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_bid).collect()
}

pub async fn bids_for_agent(conn: &mut SqliteConnection, agent_id: &str) -> Result<Vec<Bid>> {
    let rows = sqlx::query(
        r#"
SELECT * FROM bids
WHERE agent_id = ?
ORDER BY timestamp_ms DESC, id DESC;
"#,
    )
    .bind(agent_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_bid).collect()
}

pub async fn set_bid_status(
    conn: &mut SqliteConnection,
    bid_id: &str,
    status: BidStatus,
) -> Result<()> {
    let res = sqlx::query("UPDATE bids SET status = ? WHERE id = ?;")
        .bind(status.to_string())
        .bind(bid_id)
        .execute(&mut *conn)
        .await?;

    if res.rows_affected() != 1 {
        return Err(EconomyError::not_found("bid", bid_id));
    }
    Ok(())
}

/// Couple a bid to its newly created execution and mark it winning.
pub async fn set_bid_winner(
    conn: &mut SqliteConnection,
    bid_id: &str,
    execution_id: &str,
) -> Result<()> {
    let res = sqlx::query("UPDATE bids SET status = 'winning', execution_id = ? WHERE id = ?;")
        .bind(execution_id)
        .bind(bid_id)
        .execute(&mut *conn)
        .await?;

    if res.rows_affected() != 1 {
        return Err(EconomyError::not_found("bid", bid_id));
    }
    Ok(())
}

pub async fn has_completed_bid(conn: &mut SqliteConnection) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM bids WHERE status = 'completed' LIMIT 1;")
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

fn row_to_execution(r: &SqliteRow) -> Result<Execution> {
    Ok(Execution {
        id: r.get("id"),
        agent_id: r.get("agent_id"),
        bundle_id: r.get("bundle_id"),
        start_ms: r.get("start_ms"),
        end_ms: r.get("end_ms"),
        status: ExecutionStatus::from_str(&r.get::<String, _>("status"))?,
        exit_code: r.get("exit_code"),
        termination_reason: r.get("termination_reason"),
    })
}

pub async fn insert_execution(conn: &mut SqliteConnection, execution: &Execution) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO executions (id, agent_id, bundle_id, start_ms, end_ms, status,
                        exit_code, termination_reason)
VALUES (?, ?, ?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&execution.id)
    .bind(&execution.agent_id)
    .bind(&execution.bundle_id)
    .bind(execution.start_ms)
    .bind(execution.end_ms)
    .bind(execution.status.to_string())
    .bind(execution.exit_code)
    .bind(&execution.termination_reason)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_execution(conn: &mut SqliteConnection, id: &str) -> Result<Execution> {
    let row = sqlx::query("SELECT * FROM executions WHERE id = ?;")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => row_to_execution(&r),
        None => Err(EconomyError::not_found("execution", id)),
    }
}

pub async fn finalize_execution(
    conn: &mut SqliteConnection,
    id: &str,
    status: ExecutionStatus,
    exit_code: i32,
    termination_reason: &str,
    end_ms: i64,
) -> Result<()> {
    let res = sqlx::query(
        r#"
UPDATE executions
SET status = ?, exit_code = ?, termination_reason = ?, end_ms = ?
WHERE id = ?;
"#,
    )
    .bind(status.to_string())
    .bind(exit_code)
    .bind(termination_reason)
    .bind(end_ms)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if res.rows_affected() != 1 {
        return Err(EconomyError::not_found("execution", id));
    }
    Ok(())
}

fn row_to_market_state(r: &SqliteRow) -> Result<MarketState> {
    Ok(MarketState {
        resource: ResourceKind::from_str(&r.get::<String, _>("resource"))?,
        available_supply: r.get("available_supply"),
        current_utilization: r.get("current_utilization"),
        current_price: r.get("current_price"),
    })
}

pub async fn market_states(conn: &mut SqliteConnection) -> Result<Vec<MarketState>> {
    let rows = sqlx::query("SELECT * FROM market_states ORDER BY resource ASC;")
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(row_to_market_state).collect()
}

pub async fn get_market_state(
    conn: &mut SqliteConnection,
    kind: ResourceKind,
) -> Result<MarketState> {
    let row = sqlx::query("SELECT * FROM market_states WHERE resource = ?;")
        .bind(kind.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => row_to_market_state(&r),
        None => Err(EconomyError::not_found("market state", kind.to_string())),
    }
}

pub async fn update_market_state(conn: &mut SqliteConnection, state: &MarketState) -> Result<()> {
    let res = sqlx::query(
        r#"
UPDATE market_states
SET available_supply = ?, current_utilization = ?, current_price = ?
WHERE resource = ?;
"#,
    )
    .bind(state.available_supply)
    .bind(state.current_utilization)
    .bind(state.current_price)
    .bind(state.resource.to_string())
    .execute(&mut *conn)
    .await?;

    if res.rows_affected() != 1 {
        return Err(EconomyError::not_found(
            "market state",
            state.resource.to_string(),
        ));
    }
    Ok(())
}
