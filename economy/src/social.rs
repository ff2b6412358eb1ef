//! Agent-to-agent mail. No credit movement; both endpoints must exist.

use sqlx::SqliteConnection;

use common::time::now_ms;

use crate::error::Result;
use crate::model::{Message, new_id};
use crate::store::{agents, attention};

pub async fn send_message(
    conn: &mut SqliteConnection,
    from_id: &str,
    to_id: &str,
    content: &str,
) -> Result<Message> {
    agents::get_agent(conn, from_id).await?;
    agents::get_agent(conn, to_id).await?;

    let message = Message {
        id: new_id(),
        from_agent: from_id.to_string(),
        to_agent: to_id.to_string(),
        content: content.to_string(),
        timestamp_ms: now_ms(),
    };
    attention::insert_message(conn, &message).await?;

    Ok(message)
}

/// Messages addressed to `agent_id`, newest first.
pub async fn inbox(conn: &mut SqliteConnection, agent_id: &str) -> Result<Vec<Message>> {
    attention::messages_for(conn, agent_id).await
}
