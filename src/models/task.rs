//! Task Models
//!
//! The parent unit of creative work: one subject expanded into prompt
//! variants and fissioned across styles, models, and batch indexes.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Error returned when a status string stored in the database does not map
/// to a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(pub String);

/// Lifecycle status of a task.
///
/// Once sub-tasks exist, `Processing` and the terminal statuses are derived
/// exclusively by the progress aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Draft,
    Queued,
    Expanding,
    Processing,
    Completed,
    PartialFailed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether no further automatic transitions occur.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::PartialFailed
                | TaskStatus::Failed
                | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Queued => "queued",
            TaskStatus::Expanding => "expanding",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::PartialFailed => "partial_failed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TaskStatus::Draft),
            "queued" => Ok(TaskStatus::Queued),
            "expanding" => Ok(TaskStatus::Expanding),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "partial_failed" => Ok(TaskStatus::PartialFailed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// One expanded prompt variant produced for a task's subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedPrompt {
    /// Unique variant identifier
    pub id: String,
    /// Human-readable variant name (e.g. "Realistic")
    pub name: String,
    /// The original subject text this variant was derived from
    pub original: String,
    /// The expanded prompt text sent to generators
    pub expanded: String,
    /// Sanitized slug of the subject, used in asset filenames
    pub subject_slug: String,
}

/// The parent unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: String,
    /// The user-submitted subject text
    pub subject: String,
    /// Selected style template ids
    pub style_ids: Vec<String>,
    /// Target model ids (one generator instance each)
    pub model_ids: Vec<String>,
    /// Images per (variant, style, model) combination
    pub count_per_prompt: u32,
    /// Whether to add the implicit "base" style when not already selected
    pub include_base_style: bool,
    /// Number of prompt variants to request from the expander
    pub variant_count: u32,
    /// Aspect ratio applied to every sub-task (e.g. "1:1")
    pub aspect_ratio: String,
    /// Expanded prompt variants, populated during the expanding phase
    pub prompts: Vec<ExpandedPrompt>,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Derived progress percentage (0-100)
    pub progress: u8,
    /// Human-readable failure message when status is failed
    pub error_message: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Request payload for creating a new task in `draft`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub subject: String,
    #[serde(default)]
    pub style_ids: Vec<String>,
    pub model_ids: Vec<String>,
    pub count_per_prompt: u32,
    #[serde(default)]
    pub include_base_style: bool,
    #[serde(default = "default_variant_count")]
    pub variant_count: u32,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

fn default_variant_count() -> u32 {
    4
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

impl CreateTaskRequest {
    /// Validate the request before a task record is created from it.
    pub fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if self.count_per_prompt == 0 {
            return Err("count_per_prompt must be positive".to_string());
        }
        if self.variant_count == 0 {
            return Err("variant_count must be positive".to_string());
        }
        Ok(())
    }
}

impl Task {
    /// Build a new draft task from a validated creation request.
    pub fn from_request(request: CreateTaskRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject: request.subject,
            style_ids: request.style_ids,
            model_ids: request.model_ids,
            count_per_prompt: request.count_per_prompt,
            include_base_style: request.include_base_style,
            variant_count: request.variant_count,
            aspect_ratio: request.aspect_ratio,
            prompts: Vec::new(),
            status: TaskStatus::Draft,
            progress: 0,
            error_message: None,
            created_at: None,
            updated_at: None,
        }
    }
}
