//! Sub-task Models
//!
//! The atomic execution unit: one (variant, style, model, batch-index)
//! generation request.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::task::{ExpandedPrompt, ParseStatusError};

/// Execution status of a sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubTaskStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl SubTaskStatus {
    /// Whether no further automatic transitions occur. A terminal sub-task is
    /// only mutated by the explicit retry action, which resets it to pending.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubTaskStatus::Success | SubTaskStatus::Failed | SubTaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubTaskStatus::Pending => "pending",
            SubTaskStatus::Processing => "processing",
            SubTaskStatus::Success => "success",
            SubTaskStatus::Failed => "failed",
            SubTaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubTaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubTaskStatus::Pending),
            "processing" => Ok(SubTaskStatus::Processing),
            "success" => Ok(SubTaskStatus::Success),
            "failed" => Ok(SubTaskStatus::Failed),
            "cancelled" => Ok(SubTaskStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// One enumerated tuple from the fission planner. Each spec becomes exactly
/// one sub-task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskSpec {
    pub task_id: String,
    pub prompt: ExpandedPrompt,
    pub style_id: String,
    pub model_id: String,
    /// 0-based, unique within its (variant, style, model) group
    pub batch_index: u32,
}

/// The atomic execution unit.
///
/// Shape is immutable after creation; only status and diagnostic fields
/// mutate, until a user-triggered retry resets the record to pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub task_id: String,
    pub status: SubTaskStatus,
    pub style_id: String,
    pub model_id: String,
    /// Reference to the expanded prompt variant this sub-task renders
    pub prompt_id: String,
    /// Final prompt after style merge
    pub final_prompt: String,
    pub negative_prompt: String,
    pub batch_index: u32,
    pub aspect_ratio: String,
    pub seed: Option<i64>,
    /// Automatic retry attempts consumed so far (0..=MAX_RETRY_ATTEMPTS)
    pub retry_count: u32,
    pub error_log: Option<String>,
    pub error_category: Option<String>,
    /// Outbound request snapshot persisted before the provider call
    pub request_snapshot: Option<String>,
    /// Raw provider response snapshot, enriched with the asset reference
    pub response_snapshot: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    /// Advisory lock owner; expiry reclaim is the scheduler's concern
    pub locked_by: Option<String>,
    pub lock_expires_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl SubTask {
    /// Build a pending sub-task from a planner spec and its merged prompts.
    pub fn from_spec(
        spec: &SubTaskSpec,
        final_prompt: impl Into<String>,
        negative_prompt: impl Into<String>,
        aspect_ratio: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: spec.task_id.clone(),
            status: SubTaskStatus::Pending,
            style_id: spec.style_id.clone(),
            model_id: spec.model_id.clone(),
            prompt_id: spec.prompt.id.clone(),
            final_prompt: final_prompt.into(),
            negative_prompt: negative_prompt.into(),
            batch_index: spec.batch_index,
            aspect_ratio: aspect_ratio.into(),
            seed: None,
            retry_count: 0,
            error_log: None,
            error_category: None,
            request_snapshot: None,
            response_snapshot: None,
            started_at: None,
            completed_at: None,
            locked_by: None,
            lock_expires_at: None,
            created_at: None,
            updated_at: None,
        }
    }
}
