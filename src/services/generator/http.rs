//! HTTP Image Generator
//!
//! Generator adapter for OpenAI-images-compatible endpoints
//! (`POST /images/generations`), supporting url and b64_json result formats.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use super::types::{
    GeneratedImage, GenerationError, GenerationRequest, GenerationResult, GeneratorConfig,
};
use super::{missing_api_key_error, parse_http_error, Generator};

/// Default endpoint for the images API
const IMAGES_API_URL: &str = "https://api.openai.com/v1/images/generations";

/// Generator speaking the OpenAI-compatible images protocol.
pub struct HttpImageGenerator {
    config: GeneratorConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
    #[serde(default)]
    seed: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

impl HttpImageGenerator {
    /// Create a new generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(IMAGES_API_URL)
    }

    /// Map an aspect ratio hint to the protocol's pixel size strings.
    fn size_for_aspect_ratio(aspect_ratio: &str) -> &'static str {
        match aspect_ratio {
            "16:9" | "3:2" => "1792x1024",
            "9:16" | "2:3" => "1024x1792",
            _ => "1024x1024",
        }
    }

    fn build_request_body(&self, request: &GenerationRequest, seed: i64) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "prompt": request.prompt,
            "n": 1,
            "size": Self::size_for_aspect_ratio(&request.aspect_ratio),
            "seed": seed,
        });

        if !request.negative_prompt.is_empty() {
            body["negative_prompt"] = serde_json::json!(request.negative_prompt);
        }

        // Adapter-level options first, then per-request overrides.
        for (key, value) in self.config.options.iter().chain(request.options.iter()) {
            body[key] = value.clone();
        }

        body
    }

    fn parse_response(&self, response: ImagesResponse, seed: i64) -> GenerationResult {
        let images = response
            .data
            .into_iter()
            .filter_map(|datum| match (datum.url, datum.b64_json) {
                (Some(url), _) => Some(GeneratedImage::Url { url }),
                (None, Some(data)) => Some(GeneratedImage::Inline {
                    data,
                    content_type: "image/png".to_string(),
                }),
                (None, None) => None,
            })
            .collect();

        GenerationResult {
            images,
            seed: Some(response.seed.unwrap_or(seed)),
            provider_metadata: serde_json::json!({
                "provider": self.name(),
                "model": self.config.model,
            }),
        }
    }
}

#[async_trait]
impl Generator for HttpImageGenerator {
    fn name(&self) -> &'static str {
        "http-images"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error(self.name()))?;

        let seed = request
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..i64::from(u32::MAX)));
        let body = self.build_request_body(request, seed);

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

        let parsed: ImagesResponse =
            serde_json::from_str(&body_text).map_err(|e| GenerationError::Unknown {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(parsed, seed))
    }
}
