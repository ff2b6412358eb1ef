//! The allocation auction.
//!
//! Responsibilities:
//! - Accept pending bids from the surface (`place_bid`).
//! - Clear all pending bids against capacity in one transaction
//!   (`run_cycle`): winners get an execution and are debited, losers are
//!   outbid, market rows get fresh utilization and discovered prices.
//!
//! Failure anywhere mid-cycle aborts the whole transaction: no partial
//! winners, no partial utilization update; the bids stay pending for the
//! next cycle.

use common::bus::{EventSink, publish_all};
use common::events::{BidProcessed, PriceDiscovered, SystemEvent};
use common::time::now_ms;

use economy::db::Db;
use economy::error::{EconomyError, Result};
use economy::ledger::{self, SYSTEM};
use economy::model::{
    AgentStatus, Bid, BidStatus, Execution, ExecutionStatus, ResourceKind, new_id,
};
use economy::store::{agents, market};
use sqlx::SqliteConnection;

use crate::resources::{ResourceVector, clamp_price, fits};

/// Insert a pending bid after validating the bidder and the bundle.
/// Participates in the caller's transaction.
pub async fn place_bid(
    conn: &mut SqliteConnection,
    agent_id: &str,
    bundle_id: &str,
    amount: f64,
) -> Result<Bid> {
    if amount <= 0.0 {
        return Err(EconomyError::InvalidAmount);
    }

    let agent = agents::get_agent(conn, agent_id).await?;
    if agent.balance < amount {
        return Err(EconomyError::InsufficientFunds {
            required: amount,
            available: agent.balance,
        });
    }

    market::get_bundle(conn, bundle_id).await?;

    let bid = Bid {
        id: new_id(),
        agent_id: agent_id.to_string(),
        bundle_id: bundle_id.to_string(),
        amount,
        status: BidStatus::Pending,
        execution_id: None,
        timestamp_ms: now_ms(),
    };
    market::insert_bid(conn, &bid).await?;

    Ok(bid)
}

/// Bids placed by `agent_id`, newest first.
pub async fn bid_history(conn: &mut SqliteConnection, agent_id: &str) -> Result<Vec<Bid>> {
    market::bids_for_agent(conn, agent_id).await
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClearingSummary {
    pub winners: usize,
    pub outbid: usize,
}

/// Clear every pending bid against capacity and publish discovered prices.
///
/// Bids are taken highest amount first, earliest timestamp breaking ties.
/// A bid is admitted only if its whole bundle fits on top of what earlier
/// winners consumed and its agent is alive with a live balance covering the
/// amount (earlier admissions in the same cycle may have drained it).
/// Winners are debited to `SYSTEM` and coupled to a fresh pending
/// execution. Prices move only for resources that saw winning demand:
/// `Σ winning credits / Σ capacity-seconds`, clamped to
/// `[MIN_PRICE, MAX_PRICE]`.
pub async fn run_cycle(db: &Db, sink: &dyn EventSink) -> Result<ClearingSummary> {
    let mut outbox: Vec<SystemEvent> = Vec::new();
    let mut tx = db.begin().await?;

    let states = market::market_states(&mut *tx).await?;
    let bids = market::pending_bids(&mut *tx).await?;

    let mut supply = ResourceVector::default();
    for state in &states {
        supply.set(state.resource, state.available_supply);
    }

    let mut consumed = ResourceVector::default();
    let mut credits = ResourceVector::default();
    let mut capacity_seconds = ResourceVector::default();
    let mut summary = ClearingSummary::default();

    for bid in &bids {
        let bundle = market::get_bundle(&mut *tx, &bid.bundle_id).await?;
        let request = ResourceVector::from_bundle(&bundle);

        // Re-read the bidder every time: an earlier win this cycle may have
        // debited it, and it may have died since submission.
        let agent = agents::find_agent(&mut *tx, &bid.agent_id).await?;
        let funded = matches!(
            &agent,
            Some(a) if a.status == AgentStatus::Alive && a.balance >= bid.amount
        );

        let status = if funded && fits(&request, &consumed, &supply) {
            let execution = Execution {
                id: new_id(),
                agent_id: bid.agent_id.clone(),
                bundle_id: bid.bundle_id.clone(),
                start_ms: now_ms(),
                end_ms: None,
                status: ExecutionStatus::Pending,
                exit_code: None,
                termination_reason: None,
            };
            market::insert_execution(&mut *tx, &execution).await?;
            market::set_bid_winner(&mut *tx, &bid.id, &execution.id).await?;

            ledger::transfer(&mut *tx, &bid.agent_id, SYSTEM, bid.amount, "bid", &mut outbox)
                .await?;

            for kind in ResourceKind::ALL {
                let req = request.get(kind);
                if req > 0.0 {
                    consumed.add(kind, req);
                    credits.add(kind, bid.amount);
                    capacity_seconds.add(kind, req * bundle.duration_seconds);
                }
            }

            summary.winners += 1;
            BidStatus::Winning
        } else {
            market::set_bid_status(&mut *tx, &bid.id, BidStatus::Outbid).await?;
            summary.outbid += 1;
            BidStatus::Outbid
        };

        outbox.push(
            BidProcessed {
                bid_id: bid.id.clone(),
                agent_id: bid.agent_id.clone(),
                amount: bid.amount,
                status: status.to_string(),
                resource_bundle_id: bid.bundle_id.clone(),
                timestamp: now_ms(),
            }
            .into(),
        );
    }

    for state in &states {
        let mut next = state.clone();
        next.current_utilization = consumed.get(state.resource);

        // Resources with no winning demand keep their price exactly as-is.
        let denominator = capacity_seconds.get(state.resource);
        if denominator > 0.0 {
            next.current_price = clamp_price(credits.get(state.resource) / denominator);
            outbox.push(
                PriceDiscovered {
                    resource_type: state.resource.to_string(),
                    new_price: next.current_price,
                    utilization: next.current_utilization,
                    timestamp: now_ms(),
                }
                .into(),
            );
        }

        market::update_market_state(&mut *tx, &next).await?;
    }

    tx.commit().await?;
    publish_all(sink, outbox).await;

    tracing::info!(
        processed = bids.len(),
        winners = summary.winners,
        outbid = summary.outbid,
        "allocation cycle cleared"
    );
    Ok(summary)
}
