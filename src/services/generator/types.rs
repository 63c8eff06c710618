//! Generator Types
//!
//! Core types for image-generation provider interactions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request sent to a generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Final prompt (post style-merge)
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    /// Aspect ratio hint (e.g. "1:1", "16:9")
    pub aspect_ratio: String,
    /// Seed to reproduce a prior generation; None lets the adapter choose
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Provider-specific options passed through opaquely
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// One produced image: a URL to download or an inline base64 payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratedImage {
    /// HTTP(S) URL the image can be fetched from
    Url { url: String },
    /// Base64-encoded image bytes returned inline
    Inline {
        data: String,
        content_type: String,
    },
}

/// Response from a generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Produced images; the worker persists the first one
    pub images: Vec<GeneratedImage>,
    /// The seed actually used, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Opaque provider metadata kept for diagnostics
    #[serde(default)]
    pub provider_metadata: serde_json::Value,
}

/// Failure taxonomy shared by every error surface a sub-task can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    RateLimited,
    ContentFiltered,
    InvalidInput,
    ProviderError,
    NetworkError,
    Timeout,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::RateLimited => "RATE_LIMITED",
            ErrorCategory::ContentFiltered => "CONTENT_FILTERED",
            ErrorCategory::InvalidInput => "INVALID_INPUT",
            ErrorCategory::ProviderError => "PROVIDER_ERROR",
            ErrorCategory::NetworkError => "NETWORK_ERROR",
            ErrorCategory::Timeout => "TIMEOUT",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }

    /// Whether the execution worker may retry this category automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimited | ErrorCategory::NetworkError | ErrorCategory::Timeout
        )
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error types for generation operations.
///
/// Covers provider calls, image acquisition, and the empty-result case so
/// downstream observers see one consistent error surface per sub-task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationError {
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Request rejected by the provider's content filter
    ContentFiltered { message: String },
    /// Invalid request (bad parameters, unknown model)
    InvalidInput { message: String },
    /// Server-side error from the provider
    Provider {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    Network { message: String },
    /// The call or download exceeded its time bound
    Timeout { message: String },
    /// Provider reported success but returned no image
    EmptyResult { message: String },
    /// Other error
    Unknown { message: String },
}

impl GenerationError {
    /// The taxonomy category recorded on the sub-task.
    pub fn category(&self) -> ErrorCategory {
        match self {
            GenerationError::RateLimited { .. } => ErrorCategory::RateLimited,
            GenerationError::ContentFiltered { .. } => ErrorCategory::ContentFiltered,
            GenerationError::InvalidInput { .. } => ErrorCategory::InvalidInput,
            GenerationError::Provider { .. } => ErrorCategory::ProviderError,
            GenerationError::Network { .. } => ErrorCategory::NetworkError,
            GenerationError::Timeout { .. } => ErrorCategory::Timeout,
            // A well-formed 200 with zero images is a provider contract
            // breach, not a transient fault.
            GenerationError::EmptyResult { .. } => ErrorCategory::ProviderError,
            GenerationError::Unknown { .. } => ErrorCategory::Unknown,
        }
    }

    /// Whether the execution worker may retry this error automatically.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            GenerationError::ContentFiltered { message } => {
                write!(f, "Content filtered: {}", message)
            }
            GenerationError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            GenerationError::Provider { message, status } => {
                if let Some(s) = status {
                    write!(f, "Provider error ({}): {}", s, message)
                } else {
                    write!(f, "Provider error: {}", message)
                }
            }
            GenerationError::Network { message } => {
                write!(f, "Network error: {}", message)
            }
            GenerationError::Timeout { message } => {
                write!(f, "Timeout: {}", message)
            }
            GenerationError::EmptyResult { message } => {
                write!(f, "Empty result: {}", message)
            }
            GenerationError::Unknown { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Configuration for a concrete generator adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model identifier this adapter serves
    pub model: String,
    /// API key (not needed for local providers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Provider call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Provider-specific options merged into every request
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

fn default_timeout_secs() -> u64 {
    120
}

impl GeneratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            options: HashMap::new(),
        }
    }
}
