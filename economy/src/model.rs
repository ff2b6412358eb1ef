//! Persistent entities of the agent economy.
//!
//! All identifiers are opaque strings; generated ones are uuid-v4, but some
//! (the genesis agent) are human-chosen. Credits and prices are `f64`,
//! timestamps are epoch milliseconds.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::EconomyError;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The four finite resources agents bid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Cpu,
    Memory,
    Tokens,
    Attention,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Cpu,
        ResourceKind::Memory,
        ResourceKind::Tokens,
        ResourceKind::Attention,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
            ResourceKind::Tokens => "tokens",
            ResourceKind::Attention => "attention",
        };
        f.write_str(s)
    }
}

impl FromStr for ResourceKind {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(ResourceKind::Cpu),
            "memory" => Ok(ResourceKind::Memory),
            "tokens" => Ok(ResourceKind::Tokens),
            "attention" => Ok(ResourceKind::Attention),
            other => Err(EconomyError::InvalidState(format!(
                "unknown resource kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Alive,
    Dead,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentStatus::Alive => "alive",
            AgentStatus::Dead => "dead",
        })
    }
}

impl FromStr for AgentStatus {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alive" => Ok(AgentStatus::Alive),
            "dead" => Ok(AgentStatus::Dead),
            other => Err(EconomyError::InvalidState(format!(
                "unknown agent status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidStatus {
    Pending,
    Winning,
    Outbid,
    Cancelled,
    Completed,
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BidStatus::Pending => "pending",
            BidStatus::Winning => "winning",
            BidStatus::Outbid => "outbid",
            BidStatus::Cancelled => "cancelled",
            BidStatus::Completed => "completed",
        })
    }
}

impl FromStr for BidStatus {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BidStatus::Pending),
            "winning" => Ok(BidStatus::Winning),
            "outbid" => Ok(BidStatus::Outbid),
            "cancelled" => Ok(BidStatus::Cancelled),
            "completed" => Ok(BidStatus::Completed),
            other => Err(EconomyError::InvalidState(format!(
                "unknown bid status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        })
    }
}

impl FromStr for ExecutionStatus {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(EconomyError::InvalidState(format!(
                "unknown execution status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStatus {
    Pending,
    Active,
    Responded,
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PromptStatus::Pending => "pending",
            PromptStatus::Active => "active",
            PromptStatus::Responded => "responded",
        })
    }
}

impl FromStr for PromptStatus {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PromptStatus::Pending),
            "active" => Ok(PromptStatus::Active),
            "responded" => Ok(PromptStatus::Responded),
            other => Err(EconomyError::InvalidState(format!(
                "unknown prompt status: {other}"
            ))),
        }
    }
}

/// A principal that holds credits, owns a workspace, may bid and spawn.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub balance: f64,
    pub status: AgentStatus,
    pub execution_count: i64,
    pub total_earned: f64,
    pub total_spent: f64,
    /// Ancestor ids, parent first. Never contains `id` itself.
    pub lineage: Vec<String>,
    pub workspace_id: Option<String>,
    pub created_at_ms: i64,
    pub last_execution_ms: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: String,
    pub agent_id: String,
    pub filesystem_path: String,
    pub created_at_ms: i64,
}

/// One double-entry ledger row. Append-only; `amount` is strictly positive.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub from_entity: String,
    pub to_entity: String,
    pub amount: f64,
    pub memo: String,
    pub timestamp_ms: i64,
}

/// A contracted slice of capacity: a fraction of each resource's supply,
/// held for `duration_seconds`. Immutable once created.
#[derive(Debug, Clone)]
pub struct ResourceBundle {
    pub id: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub tokens_percent: f64,
    pub attention_percent: f64,
    pub duration_seconds: f64,
}

impl ResourceBundle {
    pub fn fraction(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Cpu => self.cpu_percent,
            ResourceKind::Memory => self.memory_percent,
            ResourceKind::Tokens => self.tokens_percent,
            ResourceKind::Attention => self.attention_percent,
        }
    }

    /// `fraction × duration`: the denominator of price discovery.
    pub fn capacity_seconds(&self, kind: ResourceKind) -> f64 {
        self.fraction(kind) * self.duration_seconds
    }
}

#[derive(Debug, Clone)]
pub struct Bid {
    pub id: String,
    pub agent_id: String,
    pub bundle_id: String,
    pub amount: f64,
    pub status: BidStatus,
    pub execution_id: Option<String>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub id: String,
    pub agent_id: String,
    pub bundle_id: String,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
    pub termination_reason: Option<String>,
}

/// What an agent wants to show a human, plus what it paid for the slot.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub id: String,
    pub agent_id: String,
    pub execution_id: String,
    /// Opaque structured content; the core does not constrain its schema.
    pub content: Value,
    pub bid_amount: f64,
    pub status: PromptStatus,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub prompt_id: String,
    pub interesting: f64,
    pub useful: f64,
    pub understandable: f64,
    pub reason: Option<String>,
    pub credits_awarded: f64,
    pub timestamp_ms: i64,
}

/// One row per resource kind; mutated only by the auctioneer.
#[derive(Debug, Clone)]
pub struct MarketState {
    pub resource: ResourceKind,
    pub available_supply: f64,
    pub current_utilization: f64,
    pub current_price: f64,
}

/// Agent-to-agent mail. Append-only, no credit movement.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub content: String,
    pub timestamp_ms: i64,
}
