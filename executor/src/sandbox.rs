//! Reference sandbox: a local subprocess bounded by the bundle's wall clock.
//!
//! Production deployments swap in a container-backed implementation of the
//! same trait; this one exists so the control plane runs end to end on a
//! bare machine. Isolation is limited to what a working directory gives.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::types::{EnvDescriptor, Sandbox, SandboxOutput};
use economy::model::ResourceBundle;

/// Exit code reported when the wall-clock budget expires.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

pub struct ProcessSandbox {
    program: String,
    args: Vec<String>,
}

impl ProcessSandbox {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for ProcessSandbox {
    /// Runs `sh run.sh` inside the workspace.
    fn default() -> Self {
        Self::new("sh", vec!["run.sh".to_string()])
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn run(
        &self,
        agent_id: &str,
        workspace_path: &Path,
        bundle: &ResourceBundle,
        env: &EnvDescriptor,
    ) -> anyhow::Result<SandboxOutput> {
        let budget = Duration::from_secs_f64(bundle.duration_seconds.max(0.0));

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(workspace_path)
            .env("AGENT_ID", agent_id)
            .env("EXECUTION_ID", &env.execution_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn()?;

        match tokio::time::timeout(budget, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
                if !output.stderr.is_empty() {
                    logs.push_str(&String::from_utf8_lossy(&output.stderr));
                }
                Ok(SandboxOutput {
                    // A killed process has no code; report failure.
                    exit_code: output.status.code().unwrap_or(1),
                    logs,
                })
            }
            // Dropping the wait future kills the child (kill_on_drop); its
            // output is gone with it.
            Err(_) => Ok(SandboxOutput {
                exit_code: TIMEOUT_EXIT_CODE,
                logs: format!(
                    "wall-clock budget of {:.1}s exceeded; process killed",
                    bundle.duration_seconds
                ),
            }),
        }
    }
}
