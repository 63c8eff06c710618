//! Shared test fixtures: a scripted mock generator and pipeline builders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use atelier::models::settings::PipelineSettings;
use atelier::models::style::StyleTemplate;
use atelier::models::task::Task;
use atelier::services::generator::types::{
    GeneratedImage, GenerationError, GenerationRequest, GenerationResult,
};
use atelier::services::generator::{Generator, GeneratorRegistry};
use atelier::services::scheduler::PoolConfig;
use atelier::storage::database::Database;
use atelier::Pipeline;

/// A 1x1 transparent PNG, base64 encoded.
pub const PIXEL_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Scripted generator: pops one outcome per call, then defaults to success.
pub struct MockGenerator {
    model: String,
    script: Mutex<VecDeque<Result<GenerationResult, GenerationError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockGenerator {
    pub fn succeeding(model: &str) -> Self {
        Self::scripted(model, Vec::new())
    }

    pub fn scripted(
        model: &str,
        outcomes: Vec<Result<GenerationResult, GenerationError>>,
    ) -> Self {
        Self {
            model: model.to_string(),
            script: Mutex::new(outcomes.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the call counter, usable after the generator moves into
    /// the registry.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn success_result() -> GenerationResult {
        GenerationResult {
            images: vec![GeneratedImage::Inline {
                data: PIXEL_B64.to_string(),
                content_type: "image/png".to_string(),
            }],
            seed: Some(42),
            provider_metadata: serde_json::json!({"provider": "mock"}),
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(Self::success_result()))
    }
}

/// The ghibli style template used throughout the tests.
pub fn ghibli_template() -> StyleTemplate {
    StyleTemplate {
        id: "ghibli".to_string(),
        name: "Ghibli".to_string(),
        positive: "{prompt}, studio ghibli style, hand painted".to_string(),
        negative: "photorealistic, 3d render".to_string(),
    }
}

/// Fresh in-memory database seeded with the ghibli template.
pub fn seeded_db() -> Arc<Database> {
    let db = Arc::new(Database::new_in_memory().unwrap());
    db.upsert_style_template(&ghibli_template()).unwrap();
    db
}

/// Start a pipeline over an in-memory database with a short retry backoff.
/// Returns the staging tempdir alongside so it outlives the test.
pub fn start_pipeline(
    db: Arc<Database>,
    generators: Vec<Arc<dyn Generator>>,
) -> (Pipeline, tempfile::TempDir) {
    let mut registry = GeneratorRegistry::new();
    for generator in generators {
        registry.register(generator);
    }
    let staging = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::start_with(
        db,
        registry,
        Arc::new(atelier::services::expansion::FallbackExpander),
        PipelineSettings::default(),
        staging.path().to_path_buf(),
        Some(PoolConfig {
            concurrency: 2,
            retry_backoff: Duration::from_millis(10),
        }),
    )
    .unwrap();
    (pipeline, staging)
}

/// Poll the task until the predicate holds or the timeout elapses.
pub async fn wait_for_task<F>(db: &Database, task_id: &str, timeout: Duration, pred: F) -> Task
where
    F: Fn(&Task) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let task = db.get_task(task_id).unwrap().unwrap();
        if pred(&task) {
            return task;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for task {} (status: {}, progress: {})",
                task_id, task.status, task.progress
            );
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
