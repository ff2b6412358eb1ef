use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::error::{EconomyError, Result};
use crate::model::{Message, Prompt, PromptStatus, Response};

fn row_to_prompt(r: &SqliteRow) -> Result<Prompt> {
    Ok(Prompt {
        id: r.get("id"),
        agent_id: r.get("agent_id"),
        execution_id: r.get("execution_id"),
        content: serde_json::from_str(&r.get::<String, _>("content"))?,
        bid_amount: r.get("bid_amount"),
        status: PromptStatus::from_str(&r.get::<String, _>("status"))?,
        timestamp_ms: r.get("timestamp_ms"),
    })
}

pub async fn insert_prompt(conn: &mut SqliteConnection, prompt: &Prompt) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO prompts (id, agent_id, execution_id, content, bid_amount, status, timestamp_ms)
VALUES (?, ?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&prompt.id)
    .bind(&prompt.agent_id)
    .bind(&prompt.execution_id)
    .bind(serde_json::to_string(&prompt.content)?)
    .bind(prompt.bid_amount)
    .bind(prompt.status.to_string())
    .bind(prompt.timestamp_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get_prompt(conn: &mut SqliteConnection, id: &str) -> Result<Prompt> {
    let row = sqlx::query("SELECT * FROM prompts WHERE id = ?;")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => row_to_prompt(&r),
        None => Err(EconomyError::not_found("prompt", id)),
    }
}

/// Pending prompts in attention order: highest bid first, earliest timestamp
/// breaking ties.
pub async fn pending_prompts(conn: &mut SqliteConnection) -> Result<Vec<Prompt>> {
    let rows = sqlx::query(
        r#"
SELECT * FROM prompts
WHERE status = 'pending'
ORDER BY bid_amount DESC, timestamp_ms ASC, id ASC;
"#,
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_prompt).collect()
}

pub async fn set_prompt_status(
    conn: &mut SqliteConnection,
    prompt_id: &str,
    status: PromptStatus,
) -> Result<()> {
    let res = sqlx::query("UPDATE prompts SET status = ? WHERE id = ?;")
        .bind(status.to_string())
        .bind(prompt_id)
        .execute(&mut *conn)
        .await?;

    if res.rows_affected() != 1 {
        return Err(EconomyError::not_found("prompt", prompt_id));
    }
    Ok(())
}

fn row_to_response(r: &SqliteRow) -> Response {
    Response {
        id: r.get("id"),
        prompt_id: r.get("prompt_id"),
        interesting: r.get("interesting"),
        useful: r.get("useful"),
        understandable: r.get("understandable"),
        reason: r.get("reason"),
        credits_awarded: r.get("credits_awarded"),
        timestamp_ms: r.get("timestamp_ms"),
    }
}

pub async fn insert_response(conn: &mut SqliteConnection, response: &Response) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO responses (id, prompt_id, interesting, useful, understandable,
                       reason, credits_awarded, timestamp_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(&response.id)
    .bind(&response.prompt_id)
    .bind(response.interesting)
    .bind(response.useful)
    .bind(response.understandable)
    .bind(&response.reason)
    .bind(response.credits_awarded)
    .bind(response.timestamp_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn response_for_prompt(
    conn: &mut SqliteConnection,
    prompt_id: &str,
) -> Result<Option<Response>> {
    let row = sqlx::query("SELECT * FROM responses WHERE prompt_id = ?;")
        .bind(prompt_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| row_to_response(&r)))
}

fn row_to_message(r: &SqliteRow) -> Message {
    Message {
        id: r.get("id"),
        from_agent: r.get("from_agent"),
        to_agent: r.get("to_agent"),
        content: r.get("content"),
        timestamp_ms: r.get("timestamp_ms"),
    }
}

pub async fn insert_message(conn: &mut SqliteConnection, message: &Message) -> Result<()> {
    sqlx::query(
        r#"
INSERT INTO messages (id, from_agent, to_agent, content, timestamp_ms)
VALUES (?, ?, ?, ?, ?);
"#,
    )
    .bind(&message.id)
    .bind(&message.from_agent)
    .bind(&message.to_agent)
    .bind(&message.content)
    .bind(message.timestamp_ms)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn messages_for(conn: &mut SqliteConnection, agent_id: &str) -> Result<Vec<Message>> {
    let rows = sqlx::query(
        r#"
SELECT * FROM messages
WHERE to_agent = ?
ORDER BY timestamp_ms DESC, id DESC;
"#,
    )
    .bind(agent_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(row_to_message).collect())
}
