//! Atelier - Creative Task Fission and Image Generation Pipeline
//!
//! Decomposes one creative task (subject + prompt variants + style templates
//! + target models + per-combination image count) into many independent
//! generation sub-tasks, executes them against image-generation providers,
//! and rolls progress, retries, and failure classification back up to the
//! parent task. It includes:
//! - The fission planner and style merge engine
//! - The per-sub-task execution state machine with retry policy
//! - Asset naming, acquisition, and persistence
//! - Progress aggregation deriving parent status from sub-task outcomes
//! - Storage layer (SQLite document store, JSON config)

pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::settings::PipelineSettings;
pub use models::style::StyleTemplate;
pub use models::subtask::{SubTask, SubTaskStatus};
pub use models::task::{CreateTaskRequest, Task, TaskStatus};
pub use pipeline::Pipeline;
pub use services::generator::{Generator, GeneratorRegistry};
pub use services::orchestrator::TaskOrchestrator;
pub use services::worker::{ExecutionOutcome, MAX_RETRY_ATTEMPTS};
pub use utils::error::{AppError, AppResult};
