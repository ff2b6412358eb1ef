use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agent-economy", about = "Economic orchestrator for sandboxed agents")]
pub struct Cli {
    /// Emit JSON logs instead of pretty ones.
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the schema, seed the market rows, create the genesis agent,
    /// and bootstrap its first execution.
    Init,

    /// Run a single cycle.
    Cycle {
        /// Score prompts (5 5 5) instead of asking on stdin.
        #[arg(long)]
        neutral: bool,
    },

    /// Run cycles continuously until interrupted.
    Run {
        #[arg(long)]
        neutral: bool,

        /// Pause between cycles (ms); defaults to the configured interval.
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Place a pending bid for an agent. Fractions are of total supply.
    Bid {
        agent: String,
        amount: f64,

        #[arg(long, default_value_t = 0.1)]
        cpu: f64,
        #[arg(long, default_value_t = 0.1)]
        memory: f64,
        #[arg(long, default_value_t = 0.0)]
        tokens: f64,
        #[arg(long, default_value_t = 0.0)]
        attention: f64,
        #[arg(long, default_value_t = 30.0)]
        duration: f64,
    },

    /// Spawn a child agent funded by a parent.
    Spawn {
        parent: String,

        #[arg(long, default_value_t = 100.0)]
        credits: f64,
    },

    /// Show an agent's balance and recent transactions.
    Balance { agent: String },
}
