//! Sub-task Execution Worker
//!
//! Drives one sub-task through its state machine:
//! `pending -> processing -> {success | failed | cancelled}` with a
//! `failed|pending -> pending` retry edge. Every terminal decision is an
//! explicit `ExecutionOutcome` variant; the scheduling layer pattern-matches
//! on it instead of relying on errors for control flow.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::models::asset::{Asset, GenerationMetadata};
use crate::models::subtask::SubTask;
use crate::models::task::{Task, TaskStatus};
use crate::services::aggregator::recompute_progress;
use crate::services::assets::naming::slugify_subject;
use crate::services::assets::{AssetStore, ImageFetcher};
use crate::services::generator::types::{GenerationError, GenerationRequest, GenerationResult};
use crate::services::generator::GeneratorRegistry;
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

/// Maximum automatic retries for a retryable failure.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Advisory lock TTL; expiry reclaim is the scheduler's responsibility.
pub const LOCK_TTL_SECS: i64 = 600;

/// The explicit result of one worker dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Asset persisted, sub-task terminal success
    Success,
    /// Retryable failure signaled back to the scheduler for re-enqueue
    RetryScheduled { retry_count: u32 },
    /// Terminal failure; a human-initiated retry is required from here
    Failed,
    /// Parent task was cancelled; the generator was never invoked
    Cancelled,
    /// The claim was lost (already taken, or no longer pending)
    Skipped,
}

/// Executes sub-tasks against the generator capability.
pub struct ExecutionWorker {
    db: Arc<Database>,
    generators: Arc<GeneratorRegistry>,
    fetcher: ImageFetcher,
    assets: Arc<AssetStore>,
    worker_id: String,
}

impl ExecutionWorker {
    pub fn new(
        db: Arc<Database>,
        generators: Arc<GeneratorRegistry>,
        assets: Arc<AssetStore>,
    ) -> Self {
        Self {
            db,
            generators,
            fetcher: ImageFetcher::new(),
            assets,
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
        }
    }

    /// The lock-owner id this worker claims with.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Execute one sub-task dispatch to an explicit outcome.
    pub async fn execute(&self, subtask_id: &str) -> AppResult<ExecutionOutcome> {
        let subtask = self
            .db
            .get_subtask(subtask_id)?
            .ok_or_else(|| AppError::not_found(format!("sub-task {}", subtask_id)))?;
        let task = self
            .db
            .get_task(&subtask.task_id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", subtask.task_id)))?;

        // Cooperative cancellation: checked once per dispatch, before any
        // provider work.
        if task.status == TaskStatus::Cancelled {
            self.db.mark_subtask_cancelled(&subtask.id)?;
            recompute_progress(&self.db, &task.id)?;
            info!(
                subtask_id = %subtask.id,
                task_id = %task.id,
                "parent task cancelled, short-circuiting sub-task"
            );
            return Ok(ExecutionOutcome::Cancelled);
        }

        if !self
            .db
            .try_acquire_subtask(&subtask.id, &self.worker_id, LOCK_TTL_SECS)?
        {
            debug!(subtask_id = %subtask.id, "lost sub-task claim, skipping");
            return Ok(ExecutionOutcome::Skipped);
        }

        let request = GenerationRequest {
            prompt: subtask.final_prompt.clone(),
            negative_prompt: subtask.negative_prompt.clone(),
            aspect_ratio: subtask.aspect_ratio.clone(),
            seed: subtask.seed,
            options: Default::default(),
        };
        self.db
            .set_subtask_request_snapshot(&subtask.id, &serde_json::to_string(&request)?)?;

        match self.run_generation(&task, &subtask, &request).await {
            Ok((result, asset)) => {
                let snapshot = serde_json::json!({
                    "provider_metadata": result.provider_metadata,
                    "seed": result.seed,
                    "asset_id": asset.id,
                    "filename": asset.filename,
                });
                self.db
                    .mark_subtask_success(&subtask.id, &snapshot.to_string(), result.seed)?;
                recompute_progress(&self.db, &task.id)?;
                info!(
                    subtask_id = %subtask.id,
                    asset_id = %asset.id,
                    "sub-task succeeded"
                );
                Ok(ExecutionOutcome::Success)
            }
            Err(err) => self.handle_failure(&subtask, err),
        }
    }

    /// Run the provider call and asset persistence for a claimed sub-task.
    ///
    /// Every failure mode — provider error, empty result, download failure,
    /// persistence failure — funnels into `GenerationError` so the sub-task
    /// records one consistent error surface.
    async fn run_generation(
        &self,
        task: &Task,
        subtask: &SubTask,
        request: &GenerationRequest,
    ) -> Result<(GenerationResult, Asset), GenerationError> {
        let generator = self.generators.get(&subtask.model_id).ok_or_else(|| {
            GenerationError::InvalidInput {
                message: format!("no generator registered for model {}", subtask.model_id),
            }
        })?;

        let result = generator.generate(request).await?;

        // Raw provider snapshot goes down before acquisition so a download
        // failure still leaves the response observable.
        let raw = serde_json::to_string(&result).unwrap_or_default();
        self.db
            .set_subtask_response_snapshot(&subtask.id, &raw)
            .map_err(|e| GenerationError::Unknown {
                message: format!("failed to persist response snapshot: {}", e),
            })?;

        let image = result
            .images
            .first()
            .ok_or_else(|| GenerationError::EmptyResult {
                message: "provider returned no images".to_string(),
            })?;

        let acquired = self.fetcher.fetch(image).await?;

        let subject_slug = task
            .prompts
            .iter()
            .find(|p| p.id == subtask.prompt_id)
            .map(|p| p.subject_slug.clone())
            .unwrap_or_else(|| slugify_subject(&task.subject));

        let metadata = GenerationMetadata {
            task_id: task.id.clone(),
            subtask_id: subtask.id.clone(),
            subject_slug,
            style_id: subtask.style_id.clone(),
            model_id: subtask.model_id.clone(),
            batch_index: subtask.batch_index,
            final_prompt: subtask.final_prompt.clone(),
            negative_prompt: subtask.negative_prompt.clone(),
            aspect_ratio: subtask.aspect_ratio.clone(),
            seed: result.seed,
        };

        let asset = self
            .assets
            .save(&acquired, metadata)
            .map_err(|e| GenerationError::Unknown {
                message: format!("asset persistence failed: {}", e),
            })?;

        Ok((result, asset))
    }

    /// Classify a failure and either signal a retry or finalize the
    /// sub-task. Non-retryable categories never consume a retry.
    fn handle_failure(
        &self,
        subtask: &SubTask,
        err: GenerationError,
    ) -> AppResult<ExecutionOutcome> {
        let category = err.category();
        let message = err.to_string();

        if err.is_retryable() && subtask.retry_count < MAX_RETRY_ATTEMPTS {
            let retry_count = subtask.retry_count + 1;
            self.db
                .schedule_subtask_retry(&subtask.id, retry_count, &message, category.as_str())?;
            recompute_progress(&self.db, &subtask.task_id)?;
            warn!(
                subtask_id = %subtask.id,
                category = %category,
                retry_count,
                "retryable failure, signaling retry"
            );
            return Ok(ExecutionOutcome::RetryScheduled { retry_count });
        }

        self.db
            .mark_subtask_failed(&subtask.id, &message, category.as_str())?;
        recompute_progress(&self.db, &subtask.task_id)?;
        error!(
            subtask_id = %subtask.id,
            category = %category,
            error = %message,
            "sub-task failed"
        );
        Ok(ExecutionOutcome::Failed)
    }
}
