//! Image Acquisition
//!
//! Turns a provider's image reference (HTTP(S) URL or inline/data-URI
//! base64) into raw bytes plus a content type.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::services::generator::types::{GeneratedImage, GenerationError};

/// Bound on a single image download.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// An acquired image ready for persistence.
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub buffer: Vec<u8>,
    pub content_type: String,
    /// Human-readable description of where the bytes came from
    pub source: String,
}

/// Fetches image bytes from provider references.
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl Default for ImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Acquire the bytes behind one generated image reference.
    pub async fn fetch(&self, image: &GeneratedImage) -> Result<AcquiredImage, GenerationError> {
        match image {
            GeneratedImage::Url { url } if url.starts_with("data:") => decode_data_uri(url),
            GeneratedImage::Url { url } => self.fetch_http(url).await,
            GeneratedImage::Inline { data, content_type } => {
                decode_inline(data, content_type, "inline base64 payload")
            }
        }
    }

    async fn fetch_http(&self, raw_url: &str) -> Result<AcquiredImage, GenerationError> {
        let parsed = url::Url::parse(raw_url).map_err(|e| GenerationError::Provider {
            message: format!("invalid image url '{}': {}", raw_url, e),
            status: None,
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(GenerationError::Provider {
                message: format!("unsupported image url scheme: {}", parsed.scheme()),
                status: None,
            });
        }

        let response = self
            .client
            .get(parsed)
            .header("Accept", "image/*")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        message: format!("image download timed out: {}", e),
                    }
                } else {
                    GenerationError::Network {
                        message: format!("image download failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Network {
                message: format!("image download failed: HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let body: bytes::Bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Network {
                message: format!("image download failed while reading body: {}", e),
            })?;
        let buffer = body.to_vec();

        if buffer.is_empty() {
            return Err(GenerationError::Network {
                message: format!("image download returned an empty body: {}", raw_url),
            });
        }

        let content_type = normalize_content_type(content_type, &buffer);

        Ok(AcquiredImage {
            buffer,
            content_type,
            source: raw_url.to_string(),
        })
    }
}

/// Decode a `data:<mediatype>;base64,<payload>` URI.
fn decode_data_uri(uri: &str) -> Result<AcquiredImage, GenerationError> {
    let rest = uri.strip_prefix("data:").unwrap_or(uri);
    let (header, payload) = rest.split_once(',').ok_or_else(|| GenerationError::Provider {
        message: "malformed data URI: missing payload separator".to_string(),
        status: None,
    })?;
    if !header.ends_with(";base64") {
        return Err(GenerationError::Provider {
            message: "malformed data URI: only base64 payloads are supported".to_string(),
            status: None,
        });
    }
    let content_type = header.trim_end_matches(";base64");
    let content_type = if content_type.is_empty() {
        "image/png"
    } else {
        content_type
    };
    decode_inline(payload, content_type, "data URI")
}

fn decode_inline(
    data: &str,
    content_type: &str,
    source: &str,
) -> Result<AcquiredImage, GenerationError> {
    let buffer = BASE64
        .decode(data.trim())
        .map_err(|e| GenerationError::Provider {
            message: format!("invalid base64 image payload: {}", e),
            status: None,
        })?;
    if buffer.is_empty() {
        return Err(GenerationError::Provider {
            message: "decoded image payload is empty".to_string(),
            status: None,
        });
    }
    let content_type = normalize_content_type(content_type.to_string(), &buffer);
    Ok(AcquiredImage {
        buffer,
        content_type,
        source: source.to_string(),
    })
}

/// Apply the content-type tolerance rules: octet-stream is coerced to PNG,
/// other non-image types are kept but warned about.
fn normalize_content_type(content_type: String, buffer: &[u8]) -> String {
    if content_type == "application/octet-stream" {
        debug!("coercing application/octet-stream image payload to image/png");
        return "image/png".to_string();
    }
    if !content_type.starts_with("image/") {
        let sniffed = image::guess_format(buffer)
            .map(|f| format!("{:?}", f))
            .unwrap_or_else(|_| "unrecognized".to_string());
        warn!(
            content_type = %content_type,
            sniffed = %sniffed,
            "unexpected content type for image payload, keeping as-is"
        );
    }
    content_type
}
