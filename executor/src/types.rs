//! The sandbox seam and the runtime contract surface.

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use economy::model::ResourceBundle;

/// Name of the descriptor file the executor materializes in the workspace.
/// This file is the only contract surface the agent sees at runtime, so the
/// field names of `EnvDescriptor` are stable.
pub const ENV_FILE: &str = "env.json";

/// File an agent may leave behind to have its reasoning surfaced as an
/// event. Absence is not an error.
pub const REASONING_FILE: &str = "reasoning.txt";

#[derive(Debug, Clone, Serialize)]
pub struct EnvDescriptor {
    pub agent_id: String,
    pub credits: f64,
    pub execution_id: String,
    pub attention_share: f64,
}

/// What came back from a sandboxed run.
#[derive(Debug, Clone)]
pub struct SandboxOutput {
    pub exit_code: i32,
    pub logs: String,
}

/// External collaborator that runs an agent's workspace under the bundle's
/// resource limits.
///
/// Contract: the run must not exceed the bundle's cpu/memory shares or its
/// `duration_seconds` wall clock, must confine writes to the workspace, and
/// on timeout must come back with a non-zero exit code and truncated logs.
/// Any `Err` from an implementation is converted by the executor to
/// `(1, stringified_error)`; a sandbox failure is never fatal to a cycle.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(
        &self,
        agent_id: &str,
        workspace_path: &Path,
        bundle: &ResourceBundle,
        env: &EnvDescriptor,
    ) -> anyhow::Result<SandboxOutput>;
}
