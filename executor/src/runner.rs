//! Materializes winning allocations into sandboxed runs.
//!
//! For each winning bid: write the env descriptor into the agent's
//! workspace, invoke the sandbox, then finalize bid + execution in one
//! short transaction. A failed run is a valid terminal state; a bid whose
//! context cannot even be assembled (workspace gone, execution link
//! missing) is left winning and surfaces as a per-bid error for the driver
//! to log and retry next cycle.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;

use common::bus::EventSink;
use common::events::{ExecutionStarted, ExecutionTerminated, ReasoningTrace};
use common::time::now_ms;

use economy::db::Db;
use economy::error::{EconomyError, Result};
use economy::model::{Bid, BidStatus, ExecutionStatus};
use economy::store::{agents, market};

use crate::types::{ENV_FILE, EnvDescriptor, REASONING_FILE, Sandbox, SandboxOutput};

/// How much of the logs is kept on the execution row.
const REASON_MAX_CHARS: usize = 500;

pub struct Executor {
    db: Db,
    sandbox: Arc<dyn Sandbox>,
    sink: Arc<dyn EventSink>,
    /// Executions dispatched concurrently within one cycle. 1 = sequential.
    fan_out: usize,
}

impl Executor {
    pub fn new(db: Db, sandbox: Arc<dyn Sandbox>, sink: Arc<dyn EventSink>, fan_out: usize) -> Self {
        Self {
            db,
            sandbox,
            sink,
            fan_out: fan_out.max(1),
        }
    }

    /// Run every bid currently marked winning, including winners surviving
    /// from earlier cycles. Returns how many ran to a terminal state.
    pub async fn run_winners(&self) -> Result<usize> {
        let winners = {
            let mut conn = self.db.pool().acquire().await?;
            market::winning_bids(&mut conn).await?
        };

        if winners.is_empty() {
            return Ok(0);
        }

        let finished: Vec<bool> = futures::stream::iter(
            winners.into_iter().map(|bid| self.run_one_logged(bid)),
        )
        .buffer_unordered(self.fan_out)
        .collect()
        .await;

        Ok(finished.into_iter().filter(|ok| *ok).count())
    }

    async fn run_one_logged(&self, bid: Bid) -> bool {
        let bid_id = bid.id.clone();
        match self.run_one(&bid).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(bid_id = %bid_id, error = %e, "execution skipped; bid stays winning");
                false
            }
        }
    }

    async fn run_one(&self, bid: &Bid) -> Result<()> {
        let execution_id = bid.execution_id.clone().ok_or_else(|| {
            EconomyError::InvalidState(format!("winning bid {} has no execution", bid.id))
        })?;

        // Assemble the run context with short reads.
        let (agent, workspace, bundle) = {
            let mut conn = self.db.pool().acquire().await?;
            let agent = agents::get_agent(&mut conn, &bid.agent_id).await?;
            let workspace = agents::workspace_for_agent(&mut conn, &bid.agent_id)
                .await?
                .ok_or_else(|| EconomyError::not_found("workspace", bid.agent_id.clone()))?;
            let bundle = market::get_bundle(&mut conn, &bid.bundle_id).await?;
            (agent, workspace, bundle)
        };

        let workspace_path = PathBuf::from(&workspace.filesystem_path);

        let env = EnvDescriptor {
            agent_id: agent.id.clone(),
            credits: agent.balance,
            execution_id: execution_id.clone(),
            attention_share: bundle.attention_percent,
        };
        tokio::fs::write(
            workspace_path.join(ENV_FILE),
            serde_json::to_vec_pretty(&env)?,
        )
        .await?;

        self.sink
            .publish(
                ExecutionStarted {
                    execution_id: execution_id.clone(),
                    agent_id: agent.id.clone(),
                    resource_bundle_id: bundle.id.clone(),
                    timestamp: now_ms(),
                }
                .into(),
            )
            .await;

        let output = match self
            .sandbox
            .run(&agent.id, &workspace_path, &bundle, &env)
            .await
        {
            Ok(output) => output,
            // Never fatal: a sandbox error is a failed run with its message
            // as the logs.
            Err(e) => SandboxOutput {
                exit_code: 1,
                logs: e.to_string(),
            },
        };

        let status = if output.exit_code == 0 {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        let reason: String = output.logs.chars().take(REASON_MAX_CHARS).collect();
        let end_ms = now_ms();

        let mut tx = self.db.begin().await?;
        market::set_bid_status(&mut *tx, &bid.id, BidStatus::Completed).await?;
        market::finalize_execution(
            &mut *tx,
            &execution_id,
            status,
            output.exit_code,
            &reason,
            end_ms,
        )
        .await?;

        let mut agent_row = agents::get_agent(&mut *tx, &bid.agent_id).await?;
        agent_row.execution_count += 1;
        agent_row.last_execution_ms = Some(end_ms);
        agents::update_agent(&mut *tx, &agent_row).await?;
        tx.commit().await?;

        tracing::info!(
            execution_id = %execution_id,
            agent_id = %bid.agent_id,
            exit_code = output.exit_code,
            status = %status,
            "execution finished"
        );

        let terminated_reason = if output.logs.is_empty() {
            "success".to_string()
        } else {
            output.logs.chars().take(100).collect()
        };
        self.sink
            .publish(
                ExecutionTerminated {
                    execution_id: execution_id.clone(),
                    agent_id: agent.id.clone(),
                    exit_code: output.exit_code,
                    reason: terminated_reason,
                    timestamp: end_ms,
                }
                .into(),
            )
            .await;

        // An agent may leave a reasoning trace behind; surface it if so.
        if let Ok(content) = tokio::fs::read_to_string(workspace_path.join(REASONING_FILE)).await {
            self.sink
                .publish(
                    ReasoningTrace {
                        agent_id: agent.id.clone(),
                        content,
                        timestamp: now_ms(),
                    }
                    .into(),
                )
                .await;
        }

        Ok(())
    }
}
