//! Prompt Expansion Orchestrator
//!
//! Top-level driver invoked once per task: expand the subject into prompt
//! variants (LLM capability or deterministic fallback), run the fission
//! planner, create one pending sub-task per spec, and schedule one worker
//! run each. Also exposes the control surface consumed by the UI layer:
//! cancel, retry one sub-task, retry all failed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::models::settings::PipelineSettings;
use crate::models::style::{StyleTemplate, BASE_STYLE_ID};
use crate::models::subtask::{SubTask, SubTaskStatus};
use crate::models::task::{CreateTaskRequest, Task, TaskStatus};
use crate::services::aggregator::recompute_progress;
use crate::services::assets::naming::slugify_subject;
use crate::services::expansion::{ExpansionResult, FallbackExpander, PromptOptimizer};
use crate::services::fission::{effective_style_ids, plan_subtasks};
use crate::services::scheduler::JobScheduler;
use crate::services::style_merge::merge_style;
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

/// Drives task submission and the task-level control operations.
pub struct TaskOrchestrator {
    db: Arc<Database>,
    optimizer: Arc<dyn PromptOptimizer>,
    scheduler: Arc<dyn JobScheduler>,
    settings: PipelineSettings,
}

impl TaskOrchestrator {
    pub fn new(
        db: Arc<Database>,
        optimizer: Arc<dyn PromptOptimizer>,
        scheduler: Arc<dyn JobScheduler>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            optimizer,
            scheduler,
            settings,
        }
    }

    /// Create a new task in `draft`.
    pub fn create_task(&self, request: CreateTaskRequest) -> AppResult<Task> {
        request.validate().map_err(AppError::validation)?;
        let task = Task::from_request(request);
        self.db.insert_task(&task)?;
        Ok(task)
    }

    /// Submit a task: `queued -> expanding -> processing`.
    ///
    /// Any unrecoverable error marks the task `failed` and stops; sub-tasks
    /// already created are left as-is — they are valid independent units and
    /// may still execute or be retried.
    pub async fn submit(&self, task_id: &str) -> AppResult<Task> {
        let task = self
            .db
            .get_task(task_id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))?;

        self.db
            .update_task_status(task_id, TaskStatus::Queued, None)?;

        match self.run_submission(task).await {
            Ok(task) => Ok(task),
            Err(e) => {
                error!(task_id, error = %e, "task submission failed");
                self.db
                    .update_task_status(task_id, TaskStatus::Failed, Some(&e.to_string()))?;
                Err(e)
            }
        }
    }

    async fn run_submission(&self, mut task: Task) -> AppResult<Task> {
        self.db
            .update_task_status(&task.id, TaskStatus::Expanding, None)?;

        let expansion = self.expand_with_fallback(&task).await;
        self.db.set_task_prompts(&task.id, &expansion.variants)?;
        task.prompts = expansion.variants;

        let templates = self.resolve_style_templates(&task)?;

        let plan = plan_subtasks(&task, self.settings.subtask_warn_threshold);
        if let Some(warning) = &plan.warning {
            warn!(task_id = %task.id, "{}", warning);
        }

        let mut subtask_ids = Vec::with_capacity(plan.total);
        for spec in &plan.specs {
            let template = templates.get(&spec.style_id).ok_or_else(|| {
                AppError::not_found(format!("style template {}", spec.style_id))
            })?;
            let merged = merge_style(&spec.prompt.expanded, template);
            let subtask = SubTask::from_spec(
                spec,
                merged.final_prompt,
                merged.negative_prompt,
                task.aspect_ratio.clone(),
            );
            self.db.insert_subtask(&subtask)?;
            subtask_ids.push(subtask.id);
        }

        for id in &subtask_ids {
            self.scheduler.enqueue(id);
        }

        self.db
            .update_task_status(&task.id, TaskStatus::Processing, None)?;
        info!(
            task_id = %task.id,
            subtasks = subtask_ids.len(),
            "task fissioned and scheduled"
        );

        self.db
            .get_task(&task.id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", task.id)))
    }

    /// Obtain prompt variants, degrading to the deterministic fallback when
    /// the optimizer is unavailable or misbehaves.
    async fn expand_with_fallback(&self, task: &Task) -> ExpansionResult {
        match self
            .optimizer
            .expand(&task.subject, task.variant_count, self.settings.search_enabled)
            .await
        {
            Ok(result) if !result.variants.is_empty() => result,
            Ok(_) => {
                warn!(task_id = %task.id, "optimizer returned no variants, using fallback");
                self.fallback_expansion(task)
            }
            Err(e) => {
                warn!(
                    task_id = %task.id,
                    error = %e,
                    "prompt optimizer failed, using deterministic fallback"
                );
                self.fallback_expansion(task)
            }
        }
    }

    fn fallback_expansion(&self, task: &Task) -> ExpansionResult {
        ExpansionResult {
            variants: FallbackExpander::variants(&task.subject, task.variant_count),
            subject_slug: slugify_subject(&task.subject),
            search_context: None,
        }
    }

    /// Resolve the effective style template set: selected templates must
    /// exist and validate; the implicit base style synthesizes a pass-through
    /// template when none is stored under `base`.
    fn resolve_style_templates(
        &self,
        task: &Task,
    ) -> AppResult<HashMap<String, StyleTemplate>> {
        let ids = effective_style_ids(&task.style_ids, task.include_base_style);
        let mut templates = HashMap::with_capacity(ids.len());
        for id in ids {
            let template = match self.db.get_style_template(&id)? {
                Some(template) => template,
                None if id == BASE_STYLE_ID => StyleTemplate::base(),
                None => {
                    return Err(AppError::not_found(format!("style template {}", id)));
                }
            };
            template.validate().map_err(AppError::validation)?;
            templates.insert(id, template);
        }
        Ok(templates)
    }

    // =======================================================================
    // Control surface
    // =======================================================================

    /// Cancel a task. In-flight sub-tasks observe this at their next
    /// dispatch check and short-circuit to cancelled.
    pub fn cancel(&self, task_id: &str) -> AppResult<Task> {
        let task = self
            .db
            .get_task(task_id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))?;
        if task.status == TaskStatus::Cancelled {
            return Ok(task);
        }
        self.db
            .update_task_status(task_id, TaskStatus::Cancelled, None)?;
        info!(task_id, "task cancelled");
        self.db
            .get_task(task_id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))
    }

    /// Reset one failed sub-task to pending (retry budget cleared) and
    /// re-enqueue it.
    pub fn retry_sub_task(&self, subtask_id: &str) -> AppResult<SubTask> {
        let subtask = self
            .db
            .get_subtask(subtask_id)?
            .ok_or_else(|| AppError::not_found(format!("sub-task {}", subtask_id)))?;

        if !self.db.reset_subtask_for_retry(subtask_id)? {
            return Err(AppError::validation(format!(
                "sub-task {} is not retryable (status: {})",
                subtask_id, subtask.status
            )));
        }
        recompute_progress(&self.db, &subtask.task_id)?;
        self.scheduler.enqueue(subtask_id);
        info!(subtask_id, "sub-task reset for retry");

        self.db
            .get_subtask(subtask_id)?
            .ok_or_else(|| AppError::not_found(format!("sub-task {}", subtask_id)))
    }

    /// Apply `retry_sub_task` to every failed sub-task under a task.
    /// Returns the number of sub-tasks re-enqueued.
    pub fn retry_all_failed(&self, task_id: &str) -> AppResult<usize> {
        let failed = self
            .db
            .list_subtasks_by_status(task_id, SubTaskStatus::Failed)?;
        let mut count = 0;
        for subtask in &failed {
            if self.db.reset_subtask_for_retry(&subtask.id)? {
                self.scheduler.enqueue(&subtask.id);
                count += 1;
            }
        }
        if count > 0 {
            recompute_progress(&self.db, task_id)?;
            info!(task_id, count, "failed sub-tasks reset for retry");
        }
        Ok(count)
    }
}
