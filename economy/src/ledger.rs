//! Credit movement primitives.
//!
//! The ledger never commits on its own: `transfer` participates in the
//! caller's transaction so that composite operations (spawn, auction
//! clearing, attention settlement) stay atomic. Burn events go into the
//! caller's outbox and must only be published after that transaction
//! commits.

use sqlx::SqliteConnection;

use common::events::{CreditsBurned, SystemEvent};
use common::time::now_ms;

use crate::error::{EconomyError, Result};
use crate::model::{AgentStatus, Transaction, new_id};
use crate::store::agents;

/// Reserved transaction endpoints. Sinks hold no row and no balance; the
/// conservation accounting treats them as the outside world.
pub const SYSTEM: &str = "SYSTEM";
pub const HUMAN: &str = "HUMAN";
pub const ATTENTION_ESCROW: &str = "ATTENTION_ESCROW";

pub fn is_sink(entity: &str) -> bool {
    matches!(entity, SYSTEM | HUMAN | ATTENTION_ESCROW)
}

/// Move `amount` credits from `from` to `to` and append one transaction row.
///
/// Either endpoint may be a reserved sink; the sink side has no row to
/// update and no counters. An agent endpoint must exist, a debited agent
/// must be alive and funded. Fails without side effect on any violation.
pub async fn transfer(
    conn: &mut SqliteConnection,
    from: &str,
    to: &str,
    amount: f64,
    memo: &str,
    outbox: &mut Vec<SystemEvent>,
) -> Result<()> {
    if amount <= 0.0 {
        return Err(EconomyError::InvalidAmount);
    }

    if !is_sink(from) {
        let mut from_agent = agents::get_agent(conn, from).await?;

        if from_agent.status == AgentStatus::Dead {
            return Err(EconomyError::InvalidState(format!(
                "agent {from} is dead and cannot be debited"
            )));
        }
        if from_agent.balance < amount {
            return Err(EconomyError::InsufficientFunds {
                required: amount,
                available: from_agent.balance,
            });
        }

        from_agent.balance -= amount;
        from_agent.total_spent += amount;
        agents::update_agent(conn, &from_agent).await?;
    }

    if !is_sink(to) {
        let mut to_agent = agents::get_agent(conn, to).await?;
        to_agent.balance += amount;
        to_agent.total_earned += amount;
        agents::update_agent(conn, &to_agent).await?;
    }

    let ts = now_ms();
    agents::insert_transaction(
        conn,
        &Transaction {
            id: new_id(),
            from_entity: from.to_string(),
            to_entity: to.to_string(),
            amount,
            memo: memo.to_string(),
            timestamp_ms: ts,
        },
    )
    .await?;

    if to == SYSTEM && !is_sink(from) {
        outbox.push(
            CreditsBurned {
                agent_id: from.to_string(),
                amount,
                reason: memo.to_string(),
                timestamp: ts,
            }
            .into(),
        );
    }

    Ok(())
}

/// Read-only balance snapshot.
pub async fn balance(conn: &mut SqliteConnection, agent_id: &str) -> Result<f64> {
    Ok(agents::get_agent(conn, agent_id).await?.balance)
}

/// Transaction history touching `entity`, newest first.
pub async fn history(
    conn: &mut SqliteConnection,
    entity: &str,
) -> Result<Vec<crate::model::Transaction>> {
    agents::transactions_for(conn, entity).await
}
