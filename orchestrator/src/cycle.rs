//! One pass of the economy.
//!
//! Stage order is load-bearing: allocation fully commits before the first
//! sandbox starts, every execution finishes before the attention drain, the
//! drain finishes before the death sweep. Each stage derives its input from
//! persisted status fields, so a crash between stages leaves a consistent
//! state the next cycle resumes from.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use common::bus::EventSink;
use common::logger::warn_if_slow;

use economy::db::Db;
use economy::error::Result;
use economy::store::agents;
use executor::runner::Executor;
use executor::types::Sandbox;
use market::attention;
use market::auction;

use crate::operator::Operator;

pub struct CycleDriver {
    db: Db,
    executor: Executor,
    operator: Arc<dyn Operator>,
    sink: Arc<dyn EventSink>,
}

impl CycleDriver {
    pub fn new(
        db: Db,
        sandbox: Arc<dyn Sandbox>,
        operator: Arc<dyn Operator>,
        sink: Arc<dyn EventSink>,
        exec_fan_out: usize,
    ) -> Self {
        let executor = Executor::new(db.clone(), sandbox, sink.clone(), exec_fan_out);
        Self {
            db,
            executor,
            operator,
            sink,
        }
    }

    /// Allocate → execute → attention drain → death sweep.
    ///
    /// An allocation error aborts the whole cycle (pending bids are
    /// untouched and retried next tick). Execute and drain swallow per-item
    /// failures; only storage-level trouble propagates.
    #[instrument(skip(self), target = "cycle")]
    pub async fn run_cycle(&self) -> Result<()> {
        warn_if_slow(
            "allocate",
            Duration::from_secs(1),
            auction::run_cycle(&self.db, self.sink.as_ref()),
        )
        .await?;

        let executed = self.executor.run_winners().await?;
        tracing::debug!(executed, "execution stage finished");

        let rewarded = self.drain_attention().await?;
        tracing::debug!(rewarded, "attention drain finished");

        self.sweep_dead().await?;

        Ok(())
    }

    /// Run cycles forever, spaced by `interval`.
    pub async fn run_loop(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                tracing::error!(error = %e, "cycle failed; retrying next tick");
            }
        }
    }

    /// Settle every pending prompt in ranked order, one transaction each.
    /// The operator call blocks in between; that wait is the only place a
    /// cycle depends on a human.
    async fn drain_attention(&self) -> Result<usize> {
        let prompts = {
            let mut conn = self.db.pool().acquire().await?;
            attention::pending_prompts(&mut conn).await?
        };

        let mut rewarded = 0usize;
        for prompt in prompts {
            let scores = self.operator.present(&prompt).await;

            let mut tx = self.db.begin().await?;
            match attention::reward_prompt(&mut *tx, &prompt.id, &scores).await {
                Ok(response) => {
                    tx.commit().await?;
                    rewarded += 1;
                    tracing::info!(
                        prompt_id = %prompt.id,
                        agent_id = %prompt.agent_id,
                        credits = response.credits_awarded,
                        "prompt rewarded"
                    );
                }
                Err(e) => {
                    // Dropping the transaction rolls the settlement back.
                    tracing::warn!(prompt_id = %prompt.id, error = %e, "prompt settlement failed");
                }
            }
        }

        Ok(rewarded)
    }

    async fn sweep_dead(&self) -> Result<Vec<String>> {
        let mut tx = self.db.begin().await?;
        let swept = agents::sweep_dead(&mut *tx).await?;
        tx.commit().await?;

        for agent_id in &swept {
            tracing::info!(agent_id = %agent_id, "agent out of credits; marked dead");
        }
        Ok(swept)
    }
}
