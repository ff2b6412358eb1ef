//! The attention market.
//!
//! Agents that paid for attention in their current execution may escrow a
//! bid for a human-review slot. Prompts queue by bid, a human scores them,
//! and settlement mints the reward from `HUMAN` while the escrowed bid is
//! finalized into `SYSTEM`. The bid is spent regardless of the score; there
//! is no cancellation or refund path.

use serde_json::Value;
use sqlx::SqliteConnection;

use common::events::SystemEvent;
use common::time::now_ms;

use economy::error::{EconomyError, Result};
use economy::ledger::{self, ATTENTION_ESCROW, HUMAN, SYSTEM};
use economy::model::{Prompt, PromptStatus, Response, new_id};
use economy::store::{agents, attention, market};

/// Credits minted per score point, one rate per scoring dimension.
#[derive(Debug, Clone, Copy)]
pub struct ConversionRates {
    pub interesting: f64,
    pub useful: f64,
    pub understandable: f64,
}

pub const ATTENTION_CONVERSION_RATES: ConversionRates = ConversionRates {
    interesting: 50.0,
    useful: 50.0,
    understandable: 50.0,
};

/// A human's verdict on one prompt.
#[derive(Debug, Clone)]
pub struct Scores {
    pub interesting: f64,
    pub useful: f64,
    pub understandable: f64,
    pub reason: Option<String>,
}

impl Scores {
    pub fn neutral() -> Self {
        Scores {
            interesting: 5.0,
            useful: 5.0,
            understandable: 5.0,
            reason: None,
        }
    }
}

pub fn credits_for(scores: &Scores) -> f64 {
    scores.interesting * ATTENTION_CONVERSION_RATES.interesting
        + scores.useful * ATTENTION_CONVERSION_RATES.useful
        + scores.understandable * ATTENTION_CONVERSION_RATES.understandable
}

fn check_score(score: f64) -> Result<()> {
    if !(0.0..=10.0).contains(&score) {
        return Err(EconomyError::InvalidScore { score });
    }
    Ok(())
}

/// Escrow a bid and queue a prompt for human review.
///
/// Requires the execution's bundle to carry an attention share and the
/// agent to cover `bid_amount`, which is immediately moved into
/// `ATTENTION_ESCROW`. Participates in the caller's transaction.
pub async fn submit_prompt(
    conn: &mut SqliteConnection,
    agent_id: &str,
    execution_id: &str,
    content: Value,
    bid_amount: f64,
) -> Result<Prompt> {
    if bid_amount < 0.0 {
        return Err(EconomyError::InvalidAmount);
    }

    let execution = market::get_execution(conn, execution_id).await?;
    let bundle = market::get_bundle(conn, &execution.bundle_id).await?;
    if bundle.attention_percent <= 0.0 {
        return Err(EconomyError::InvalidState(format!(
            "execution {execution_id} has no attention allocation"
        )));
    }

    let agent = agents::get_agent(conn, agent_id).await?;
    if agent.balance < bid_amount {
        return Err(EconomyError::InsufficientFunds {
            required: bid_amount,
            available: agent.balance,
        });
    }

    if bid_amount > 0.0 {
        // Escrow moves to a sink, so no burn event can come out of this.
        let mut outbox: Vec<SystemEvent> = Vec::new();
        ledger::transfer(
            conn,
            agent_id,
            ATTENTION_ESCROW,
            bid_amount,
            "Bid for attention slot",
            &mut outbox,
        )
        .await?;
    }

    let prompt = Prompt {
        id: new_id(),
        agent_id: agent_id.to_string(),
        execution_id: execution_id.to_string(),
        content,
        bid_amount,
        status: PromptStatus::Pending,
        timestamp_ms: now_ms(),
    };
    attention::insert_prompt(conn, &prompt).await?;

    Ok(prompt)
}

/// Pending prompts in review order: highest bid first, earliest first on
/// ties.
pub async fn pending_prompts(conn: &mut SqliteConnection) -> Result<Vec<Prompt>> {
    attention::pending_prompts(conn).await
}

/// Settle one prompt with the human's scores.
///
/// Walks the prompt through Pending → Active → Responded, creates the
/// response, mints `credits_for(scores)` from `HUMAN` to the agent, and
/// finalizes the escrowed bid into `SYSTEM`. Participates in the caller's
/// transaction; with fixed scores the outcome is the same regardless of any
/// unrelated prior cycles.
pub async fn reward_prompt(
    conn: &mut SqliteConnection,
    prompt_id: &str,
    scores: &Scores,
) -> Result<Response> {
    check_score(scores.interesting)?;
    check_score(scores.useful)?;
    check_score(scores.understandable)?;

    let prompt = attention::get_prompt(conn, prompt_id).await?;
    if prompt.status == PromptStatus::Responded {
        return Err(EconomyError::InvalidState(format!(
            "prompt {prompt_id} already responded"
        )));
    }

    // Visible as in-settlement while the rows below land.
    attention::set_prompt_status(conn, prompt_id, PromptStatus::Active).await?;

    let credits_awarded = credits_for(scores);

    let response = Response {
        id: new_id(),
        prompt_id: prompt_id.to_string(),
        interesting: scores.interesting,
        useful: scores.useful,
        understandable: scores.understandable,
        reason: scores.reason.clone(),
        credits_awarded,
        timestamp_ms: now_ms(),
    };
    attention::insert_response(conn, &response).await?;

    let mut outbox: Vec<SystemEvent> = Vec::new();

    if credits_awarded > 0.0 {
        ledger::transfer(
            conn,
            HUMAN,
            &prompt.agent_id,
            credits_awarded,
            &format!("Reward for prompt {prompt_id}"),
            &mut outbox,
        )
        .await?;
    }

    if prompt.bid_amount > 0.0 {
        ledger::transfer(
            conn,
            ATTENTION_ESCROW,
            SYSTEM,
            prompt.bid_amount,
            &format!("Finalized bid payment for prompt {prompt_id}"),
            &mut outbox,
        )
        .await?;
    }

    attention::set_prompt_status(conn, prompt_id, PromptStatus::Responded).await?;

    Ok(response)
}
