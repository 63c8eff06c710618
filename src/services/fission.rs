//! Fission Planner
//!
//! Expands a task configuration into its Cartesian-product set of sub-task
//! specifications: prompt variants × effective styles × models × batch index.

use crate::models::style::BASE_STYLE_ID;
use crate::models::subtask::SubTaskSpec;
use crate::models::task::Task;

/// The result of planning one task's fission.
#[derive(Debug, Clone)]
pub struct FissionPlan {
    /// Specs in deterministic enumeration order
    pub specs: Vec<SubTaskSpec>,
    /// Total sub-task count (`specs.len()`)
    pub total: usize,
    /// Non-fatal warning when the total exceeds the configured threshold
    pub warning: Option<String>,
}

/// Resolve the effective style ids for a task.
///
/// The implicit base style is prepended when `include_base_style` is set and
/// `"base"` is not already selected (no double counting).
pub fn effective_style_ids(selected: &[String], include_base_style: bool) -> Vec<String> {
    let mut styles = Vec::with_capacity(selected.len() + 1);
    if include_base_style && !selected.iter().any(|s| s == BASE_STYLE_ID) {
        styles.push(BASE_STYLE_ID.to_string());
    }
    styles.extend(selected.iter().cloned());
    styles
}

/// Enumerate every (variant, style, model, batch-index) tuple for a task.
///
/// Order is fixed: variants, then effective styles (implicit base first),
/// then models, then batch index 0..B. Zero variants, styles, or models
/// yields an empty plan, not an error. Totals above `warn_threshold` produce
/// a warning string; the planner never refuses to plan — the caller decides
/// whether to proceed.
pub fn plan_subtasks(task: &Task, warn_threshold: usize) -> FissionPlan {
    let styles = effective_style_ids(&task.style_ids, task.include_base_style);
    let batch_size = task.count_per_prompt as usize;

    let total = task.prompts.len() * styles.len() * task.model_ids.len() * batch_size;

    let mut specs = Vec::with_capacity(total);
    for prompt in &task.prompts {
        for style_id in &styles {
            for model_id in &task.model_ids {
                for batch_index in 0..task.count_per_prompt {
                    specs.push(SubTaskSpec {
                        task_id: task.id.clone(),
                        prompt: prompt.clone(),
                        style_id: style_id.clone(),
                        model_id: model_id.clone(),
                        batch_index,
                    });
                }
            }
        }
    }

    let warning = (total > warn_threshold).then(|| {
        format!(
            "task {} fissions into {} sub-tasks (threshold {})",
            task.id, total, warn_threshold
        )
    });

    FissionPlan {
        specs,
        total,
        warning,
    }
}
