//! First-run bootstrap.
//!
//! A fresh economy has no completed bid, so no agent ever executed and no
//! prompt can exist. Fabricate one winning bid + pending execution for the
//! genesis agent with a full-attention bundle; the next cycle picks it up
//! and the economy starts turning.

use common::bus::{EventSink, publish_all};
use common::events::SystemEvent;
use common::time::now_ms;

use economy::db::Db;
use economy::error::Result;
use economy::genesis::GENESIS_ID;
use economy::ledger::{self, SYSTEM};
use economy::model::{Bid, BidStatus, Execution, ExecutionStatus, new_id};
use economy::store::agents;
use economy::store::market as market_store;
use market::resources::{BundleRequest, default_supply};

const BOOTSTRAP_BID: f64 = 10.0;

/// Returns the bootstrap execution id, or `None` when the economy already
/// has history.
pub async fn bootstrap_genesis(db: &Db, sink: &dyn EventSink) -> Result<Option<String>> {
    let mut outbox: Vec<SystemEvent> = Vec::new();
    let mut tx = db.begin().await?;

    if market_store::has_completed_bid(&mut *tx).await? {
        return Ok(None);
    }

    // Ensure genesis exists before fabricating work for it.
    agents::get_agent(&mut *tx, GENESIS_ID).await?;

    // Minimal resources, full attention, so the first run may prompt.
    let bundle = BundleRequest {
        cpu_seconds: Some(5.0),
        memory_mb: Some(128.0),
        tokens: Some(1000.0),
        attention_share: Some(1.0),
        ..BundleRequest::default()
    }
    .normalize(&default_supply())?;
    market_store::insert_bundle(&mut *tx, &bundle).await?;

    let execution = Execution {
        id: new_id(),
        agent_id: GENESIS_ID.to_string(),
        bundle_id: bundle.id.clone(),
        start_ms: now_ms(),
        end_ms: None,
        status: ExecutionStatus::Pending,
        exit_code: None,
        termination_reason: None,
    };
    market_store::insert_execution(&mut *tx, &execution).await?;

    let bid = Bid {
        id: new_id(),
        agent_id: GENESIS_ID.to_string(),
        bundle_id: bundle.id,
        amount: BOOTSTRAP_BID,
        status: BidStatus::Winning,
        execution_id: Some(execution.id.clone()),
        timestamp_ms: now_ms(),
    };
    market_store::insert_bid(&mut *tx, &bid).await?;

    ledger::transfer(&mut *tx, GENESIS_ID, SYSTEM, BOOTSTRAP_BID, "bid", &mut outbox).await?;

    tx.commit().await?;
    publish_all(sink, outbox).await;

    tracing::info!(execution_id = %execution.id, "bootstrapped genesis execution");
    Ok(Some(execution.id))
}
