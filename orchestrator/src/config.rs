use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Database connection string.
    pub database_url: String,

    /// Directory under which every agent workspace is created.
    pub workspace_root: PathBuf,

    /// Pause between cycles in continuous mode (ms).
    ///
    /// The cycle itself is unbounded (it waits on sandboxes and on the
    /// human operator); this only spaces out consecutive cycles.
    pub cycle_interval_ms: u64,

    /// Executions dispatched concurrently within one cycle.
    ///
    /// 1 keeps the reference sequential behavior. Raising it interleaves
    /// sandbox runs; each execution's own started/terminated pair stays
    /// ordered but pairs from different executions may interleave.
    pub exec_fan_out: usize,

    /// Command the process sandbox runs inside each workspace.
    pub sandbox_program: String,
    pub sandbox_args: Vec<String>,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://economy.db".to_string());

        let workspace_root = std::env::var("WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("workspaces"));

        Self {
            database_url,
            workspace_root,
            cycle_interval_ms: 5_000,
            exec_fan_out: 1,
            sandbox_program: "sh".to_string(),
            sandbox_args: vec!["run.sh".to_string()],
        }
    }
}
