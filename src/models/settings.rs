//! Pipeline Settings
//!
//! Validated configuration model persisted as JSON by the config service.

use serde::{Deserialize, Serialize};

/// Tunable settings for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Number of concurrent execution workers in the pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Sub-task totals above this produce a non-fatal planner warning
    #[serde(default = "default_warn_threshold")]
    pub subtask_warn_threshold: usize,
    /// Whether the prompt optimizer may use search context
    #[serde(default)]
    pub search_enabled: bool,
    /// Override for the staging directory used during asset hand-off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<String>,
}

fn default_max_workers() -> usize {
    4
}

fn default_warn_threshold() -> usize {
    100
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            subtask_warn_threshold: default_warn_threshold(),
            search_enabled: false,
            staging_dir: None,
        }
    }
}

impl PipelineSettings {
    /// Validate settings before they are persisted or applied.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".to_string());
        }
        if self.subtask_warn_threshold == 0 {
            return Err("subtask_warn_threshold must be at least 1".to_string());
        }
        Ok(())
    }
}
