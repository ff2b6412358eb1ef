//! The human scoring surface, injected as a capability so tests and
//! headless deployments can substitute deterministic scorers.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use economy::model::Prompt;
use market::attention::Scores;

#[async_trait]
pub trait Operator: Send + Sync {
    /// Show `prompt` to the operator and collect three scores in [0,10].
    /// Implementations must always come back with valid scores; the cycle
    /// blocks on this call.
    async fn present(&self, prompt: &Prompt) -> Scores;
}

/// Interactive operator reading one line of three whitespace-separated
/// numbers from stdin, re-prompting on bad input. EOF (non-interactive
/// environment) falls back to neutral (5 5 5) so the cycle never deadlocks.
pub struct StdinOperator;

#[async_trait]
impl Operator for StdinOperator {
    async fn present(&self, prompt: &Prompt) -> Scores {
        println!("\n=== PROMPT FROM AGENT {} ===", prompt.agent_id);
        match &prompt.content {
            Value::Object(map) => {
                for (key, value) in map {
                    println!("  {key}: {value}");
                }
            }
            other => println!("  {other}"),
        }
        println!("{}", "=".repeat(50));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            println!("Enter scores (interesting useful understandable) 0-10, separated by spaces:");
            match lines.next_line().await {
                Ok(Some(line)) => match parse_scores(&line) {
                    Some(scores) => return scores,
                    None => println!("Invalid input. Please enter three numbers between 0 and 10."),
                },
                Ok(None) | Err(_) => {
                    println!("Non-interactive environment detected, using default scores (5 5 5).");
                    return Scores::neutral();
                }
            }
        }
    }
}

/// Headless operator: every prompt gets the neutral (5 5 5) verdict.
pub struct NeutralOperator;

#[async_trait]
impl Operator for NeutralOperator {
    async fn present(&self, _prompt: &Prompt) -> Scores {
        Scores::neutral()
    }
}

fn parse_scores(line: &str) -> Option<Scores> {
    let parts: Vec<f64> = line
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [interesting, useful, understandable]
            if parts.iter().all(|s| (0.0..=10.0).contains(s)) =>
        {
            Some(Scores {
                interesting: *interesting,
                useful: *useful,
                understandable: *understandable,
                reason: None,
            })
        }
        _ => None,
    }
}
