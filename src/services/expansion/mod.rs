//! Prompt Expansion Capability
//!
//! Defines the optimizer interface that turns a subject into prompt
//! variants, plus the deterministic fallback used when no LLM is reachable.

pub mod llm;

use async_trait::async_trait;

pub use llm::{LlmPromptOptimizer, OptimizerConfig};

use crate::models::task::ExpandedPrompt;
use crate::services::assets::naming::slugify_subject;
use crate::services::generator::types::GenerationError;

/// The outcome of one expansion call.
#[derive(Debug, Clone)]
pub struct ExpansionResult {
    pub variants: Vec<ExpandedPrompt>,
    pub subject_slug: String,
    /// Search context the optimizer consulted, when any
    pub search_context: Option<String>,
}

/// Trait for prompt expansion providers.
#[async_trait]
pub trait PromptOptimizer: Send + Sync {
    /// Returns the optimizer name for identification.
    fn name(&self) -> &'static str;

    /// Produce `variant_count` prompt variants for a subject.
    async fn expand(
        &self,
        subject: &str,
        variant_count: u32,
        search_enabled: bool,
    ) -> Result<ExpansionResult, GenerationError>;
}

/// Named placeholder flavors used when the LLM capability is unavailable.
const FALLBACK_FLAVORS: &[(&str, &str)] = &[
    ("Realistic", "photorealistic, highly detailed, natural lighting"),
    ("Abstract", "abstract interpretation, bold shapes, expressive color"),
    ("Minimalist", "minimalist composition, clean lines, negative space"),
    ("Vibrant", "vibrant colors, high saturation, dynamic energy"),
    ("Cinematic", "cinematic lighting, dramatic atmosphere, film still"),
    ("Dreamlike", "dreamlike mood, soft focus, surreal details"),
    ("Vintage", "vintage aesthetic, muted tones, aged texture"),
    ("Sketch", "pencil sketch, loose linework, monochrome shading"),
];

/// Deterministic fallback expander.
///
/// Builds named variants directly from the subject; same inputs always
/// yield the same variants apart from their generated ids.
pub struct FallbackExpander;

impl FallbackExpander {
    /// Build the fallback variants without going through the trait.
    pub fn variants(subject: &str, variant_count: u32) -> Vec<ExpandedPrompt> {
        let subject_slug = slugify_subject(subject);
        (0..variant_count as usize)
            .map(|i| {
                let (name, flavor) = FALLBACK_FLAVORS[i % FALLBACK_FLAVORS.len()];
                ExpandedPrompt {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    original: subject.to_string(),
                    expanded: format!("{}, {}", subject, flavor),
                    subject_slug: subject_slug.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl PromptOptimizer for FallbackExpander {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn expand(
        &self,
        subject: &str,
        variant_count: u32,
        _search_enabled: bool,
    ) -> Result<ExpansionResult, GenerationError> {
        Ok(ExpansionResult {
            variants: Self::variants(subject, variant_count),
            subject_slug: slugify_subject(subject),
            search_context: None,
        })
    }
}
