//! Asset Models
//!
//! Persisted image records with the generation parameters that produced them.

use serde::{Deserialize, Serialize};

/// Generation parameters recorded alongside a persisted asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub task_id: String,
    pub subtask_id: String,
    pub subject_slug: String,
    pub style_id: String,
    pub model_id: String,
    pub batch_index: u32,
    /// The full prompt actually sent to the provider
    pub final_prompt: String,
    pub negative_prompt: String,
    pub aspect_ratio: String,
    /// The seed actually used, when the provider reported one
    pub seed: Option<i64>,
}

/// A durably persisted image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub task_id: String,
    pub subtask_id: String,
    /// Content-addressed filename (see `services::assets::naming`)
    pub filename: String,
    pub content_type: String,
    pub byte_len: u64,
    /// Raw image bytes
    #[serde(skip)]
    pub data: Vec<u8>,
    pub metadata: GenerationMetadata,
    pub created_at: Option<String>,
}
