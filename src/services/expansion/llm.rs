//! LLM-backed Prompt Optimizer
//!
//! Expands a subject into prompt variants via an OpenAI-compatible
//! chat-completions endpoint. Correctness of the model's output is the
//! provider's concern; any failure here triggers the deterministic fallback
//! at the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ExpansionResult, PromptOptimizer};
use crate::services::assets::naming::slugify_subject;
use crate::services::generator::{parse_http_error, types::GenerationError};

/// Default chat-completions endpoint
const CHAT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for the LLM optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.8,
            timeout_secs: 60,
        }
    }
}

/// Prompt optimizer backed by a chat-completions LLM.
pub struct LlmPromptOptimizer {
    config: OptimizerConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VariantPayload {
    name: String,
    prompt: String,
}

impl LlmPromptOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(CHAT_API_URL)
    }

    fn build_instruction(subject: &str, variant_count: u32, search_enabled: bool) -> String {
        let search_note = if search_enabled {
            "Draw on well-known visual references for the subject where helpful. "
        } else {
            ""
        };
        format!(
            "You expand an image-generation subject into distinct prompt variants. \
             {}Produce exactly {} variants for the subject below. \
             Respond with a JSON array only, each element {{\"name\": ..., \"prompt\": ...}}, \
             where name is a short label and prompt is a complete generation prompt.\n\n\
             Subject: {}",
            search_note, variant_count, subject
        )
    }

    /// Strip an optional markdown code fence from the model's reply.
    fn extract_json(content: &str) -> &str {
        let trimmed = content.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.trim_start_matches(['\r', '\n'])
            .trim_end_matches('`')
            .trim()
    }

    fn parse_variants(
        subject: &str,
        content: &str,
    ) -> Result<Vec<VariantPayload>, GenerationError> {
        let payload: Vec<VariantPayload> = serde_json::from_str(Self::extract_json(content))
            .map_err(|e| GenerationError::Unknown {
                message: format!("failed to parse variant payload for '{}': {}", subject, e),
            })?;
        if payload.is_empty() {
            return Err(GenerationError::EmptyResult {
                message: "optimizer returned no variants".to_string(),
            });
        }
        Ok(payload)
    }
}

#[async_trait]
impl PromptOptimizer for LlmPromptOptimizer {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn expand(
        &self,
        subject: &str,
        variant_count: u32,
        search_enabled: bool,
    ) -> Result<ExpansionResult, GenerationError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            GenerationError::Provider {
                message: "API key not configured for prompt optimizer".to_string(),
                status: None,
            }
        })?;

        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [{
                "role": "user",
                "content": Self::build_instruction(subject, variant_count, search_enabled),
            }],
        });

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        message: e.to_string(),
                    }
                } else {
                    GenerationError::Network {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Network {
                message: e.to_string(),
            })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body_text).map_err(|e| GenerationError::Unknown {
                message: format!("failed to parse optimizer response: {}", e),
            })?;
        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| GenerationError::EmptyResult {
                message: "optimizer response had no content".to_string(),
            })?;

        let subject_slug = slugify_subject(subject);
        let variants = Self::parse_variants(subject, content)?
            .into_iter()
            .map(|v| crate::models::task::ExpandedPrompt {
                id: uuid::Uuid::new_v4().to_string(),
                name: v.name,
                original: subject.to_string(),
                expanded: v.prompt,
                subject_slug: subject_slug.clone(),
            })
            .collect();

        Ok(ExpansionResult {
            variants,
            subject_slug,
            search_context: None,
        })
    }
}
