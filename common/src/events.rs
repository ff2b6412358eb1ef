//! Domain events emitted by the control plane.
//!
//! Topic names and payload shapes are a compatibility surface: external
//! consumers match on them. Events are emitted *after* the transaction that
//! produced them commits; a crash between commit and publish loses the event
//! and that is accepted (no outbox in the core).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BidProcessed {
    pub bid_id: String,
    pub agent_id: String,
    pub amount: f64,
    pub status: String,
    pub resource_bundle_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceDiscovered {
    pub resource_type: String,
    pub new_price: f64,
    pub utilization: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStarted {
    pub execution_id: String,
    pub agent_id: String,
    pub resource_bundle_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionTerminated {
    pub execution_id: String,
    pub agent_id: String,
    pub exit_code: i32,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditsBurned {
    pub agent_id: String,
    pub amount: f64,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningTrace {
    pub agent_id: String,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SystemEvent {
    BidProcessed(BidProcessed),
    PriceDiscovered(PriceDiscovered),
    ExecutionStarted(ExecutionStarted),
    ExecutionTerminated(ExecutionTerminated),
    CreditsBurned(CreditsBurned),
    ReasoningTrace(ReasoningTrace),
}

impl SystemEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            SystemEvent::BidProcessed(_) => "system.market.bid_processed",
            SystemEvent::PriceDiscovered(_) => "system.market.price_discovered",
            SystemEvent::ExecutionStarted(_) => "system.execution.started",
            SystemEvent::ExecutionTerminated(_) => "system.execution.terminated",
            SystemEvent::CreditsBurned(_) => "system.economy.credits_burned",
            SystemEvent::ReasoningTrace(_) => "system.agent.reasoning",
        }
    }
}

impl From<BidProcessed> for SystemEvent {
    fn from(e: BidProcessed) -> Self {
        SystemEvent::BidProcessed(e)
    }
}

impl From<PriceDiscovered> for SystemEvent {
    fn from(e: PriceDiscovered) -> Self {
        SystemEvent::PriceDiscovered(e)
    }
}

impl From<ExecutionStarted> for SystemEvent {
    fn from(e: ExecutionStarted) -> Self {
        SystemEvent::ExecutionStarted(e)
    }
}

impl From<ExecutionTerminated> for SystemEvent {
    fn from(e: ExecutionTerminated) -> Self {
        SystemEvent::ExecutionTerminated(e)
    }
}

impl From<CreditsBurned> for SystemEvent {
    fn from(e: CreditsBurned) -> Self {
        SystemEvent::CreditsBurned(e)
    }
}

impl From<ReasoningTrace> for SystemEvent {
    fn from(e: ReasoningTrace) -> Self {
        SystemEvent::ReasoningTrace(e)
    }
}
