//! Generation Provider Capability
//!
//! Defines the common interface for image-generation providers, the shared
//! HTTP error normalizer, and the per-model registry.

pub mod http;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use http::HttpImageGenerator;
pub use types::{
    ErrorCategory, GeneratedImage, GenerationError, GenerationRequest, GenerationResult,
    GeneratorConfig,
};

/// Trait that all generation providers must implement.
///
/// One instance serves one model id; the registry maps model ids to
/// instances for the execution worker.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the model id this instance serves.
    fn model(&self) -> &str;

    /// Run one generation request to completion.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError>;
}

/// Helper function to create an error for a missing API key
pub fn missing_api_key_error(provider: &str) -> GenerationError {
    GenerationError::Provider {
        message: format!("API key not configured for {}", provider),
        status: None,
    }
}

/// Normalize an HTTP error status from a provider into the taxonomy.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> GenerationError {
    // Content-filter rejections arrive as 400s with a policy marker in the
    // body; detect them before the generic 400 mapping.
    let lowered = body.to_lowercase();
    if lowered.contains("content_policy") || lowered.contains("safety") {
        return GenerationError::ContentFiltered {
            message: format!("{}: {}", provider, body),
        };
    }

    match status {
        401 | 403 => GenerationError::Provider {
            message: format!("{}: access denied", provider),
            status: Some(status),
        },
        404 => GenerationError::InvalidInput {
            message: format!("{}: model not found: {}", provider, body),
        },
        408 => GenerationError::Timeout {
            message: format!("{}: {}", provider, body),
        },
        429 => GenerationError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => GenerationError::InvalidInput {
            message: body.to_string(),
        },
        500..=599 => GenerationError::Provider {
            message: body.to_string(),
            status: Some(status),
        },
        _ => GenerationError::Unknown {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Registry mapping model ids to generator instances.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator under its model id. The latest registration wins.
    pub fn register(&mut self, generator: Arc<dyn Generator>) {
        self.generators
            .insert(generator.model().to_string(), generator);
    }

    /// Look up the generator serving a model id.
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(model_id).cloned()
    }

    /// Registered model ids.
    pub fn model_ids(&self) -> Vec<String> {
        self.generators.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
