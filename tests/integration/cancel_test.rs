//! Cancellation Integration Tests
//!
//! Cancellation is cooperative: checked once at dispatch, before any
//! provider work. These tests drive the execution worker directly with a
//! recording scheduler so the dispatch order is deterministic.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use atelier::models::settings::PipelineSettings;
use atelier::models::subtask::SubTaskStatus;
use atelier::models::task::{CreateTaskRequest, TaskStatus};
use atelier::services::assets::AssetStore;
use atelier::services::expansion::FallbackExpander;
use atelier::services::generator::{Generator, GeneratorRegistry};
use atelier::services::orchestrator::TaskOrchestrator;
use atelier::services::scheduler::JobScheduler;
use atelier::services::worker::{ExecutionOutcome, ExecutionWorker};
use atelier::storage::database::Database;

use super::common::{seeded_db, MockGenerator};

/// Scheduler that records enqueued ids without executing anything.
#[derive(Default)]
struct RecordingScheduler {
    enqueued: Mutex<Vec<String>>,
}

impl RecordingScheduler {
    fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.enqueued.lock().unwrap())
    }
}

impl JobScheduler for RecordingScheduler {
    fn enqueue(&self, subtask_id: &str) {
        self.enqueued.lock().unwrap().push(subtask_id.to_string());
    }
}

struct Harness {
    db: Arc<Database>,
    orchestrator: TaskOrchestrator,
    scheduler: Arc<RecordingScheduler>,
    worker: ExecutionWorker,
    _staging: tempfile::TempDir,
}

fn harness(generator: Arc<dyn Generator>) -> Harness {
    let db = seeded_db();
    let scheduler = Arc::new(RecordingScheduler::default());
    let orchestrator = TaskOrchestrator::new(
        Arc::clone(&db),
        Arc::new(FallbackExpander),
        Arc::clone(&scheduler) as Arc<dyn JobScheduler>,
        PipelineSettings::default(),
    );

    let mut registry = GeneratorRegistry::new();
    registry.register(generator);
    let staging = tempfile::tempdir().unwrap();
    let assets =
        Arc::new(AssetStore::new(Arc::clone(&db), staging.path().to_path_buf()).unwrap());
    let worker = ExecutionWorker::new(Arc::clone(&db), Arc::new(registry), assets);

    Harness {
        db,
        orchestrator,
        scheduler,
        worker,
        _staging: staging,
    }
}

fn cat_request() -> CreateTaskRequest {
    CreateTaskRequest {
        subject: "a cat".to_string(),
        style_ids: vec!["ghibli".to_string()],
        model_ids: vec!["pix-v1".to_string()],
        count_per_prompt: 1,
        include_base_style: false,
        variant_count: 2,
        aspect_ratio: "1:1".to_string(),
    }
}

#[tokio::test]
async fn test_cancelled_parent_short_circuits_dispatch() {
    let generator = Arc::new(MockGenerator::succeeding("pix-v1"));
    let calls = generator.call_counter();
    let h = harness(generator);

    let task = h.orchestrator.create_task(cat_request()).unwrap();
    h.orchestrator.submit(&task.id).await.unwrap();
    let queued = h.scheduler.drain();
    assert_eq!(queued.len(), 2);

    h.orchestrator.cancel(&task.id).unwrap();

    for subtask_id in &queued {
        let outcome = h.worker.execute(subtask_id).await.unwrap();
        assert_eq!(outcome, ExecutionOutcome::Cancelled);
    }

    // The generator was never invoked.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let subtasks = h.db.list_subtasks_for_task(&task.id).unwrap();
    assert!(subtasks
        .iter()
        .all(|s| s.status == SubTaskStatus::Cancelled));
    for subtask in &subtasks {
        assert!(subtask.completed_at.is_some());
    }

    let task = h.db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let h = harness(Arc::new(MockGenerator::succeeding("pix-v1")));
    let task = h.orchestrator.create_task(cat_request()).unwrap();
    h.orchestrator.submit(&task.id).await.unwrap();

    let first = h.orchestrator.cancel(&task.id).unwrap();
    let second = h.orchestrator.cancel(&task.id).unwrap();
    assert_eq!(first.status, TaskStatus::Cancelled);
    assert_eq!(second.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn test_cancelled_subtasks_do_not_resolve_progress() {
    let generator = Arc::new(MockGenerator::succeeding("pix-v1"));
    let h = harness(generator);

    let task = h.orchestrator.create_task(cat_request()).unwrap();
    h.orchestrator.submit(&task.id).await.unwrap();
    let queued = h.scheduler.drain();

    // First sub-task completes normally.
    let outcome = h.worker.execute(&queued[0]).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Success);

    // Parent is cancelled before the second dispatch.
    h.orchestrator.cancel(&task.id).unwrap();
    let outcome = h.worker.execute(&queued[1]).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Cancelled);

    // The cancelled parent's derived pair is frozen: the aggregator never
    // overwrites a cancelled task, and the cancelled child stays unresolved.
    let task = h.db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);
    assert_eq!(task.progress, 50);
}

#[tokio::test]
async fn test_lost_claim_is_skipped() {
    let h = harness(Arc::new(MockGenerator::succeeding("pix-v1")));
    let task = h.orchestrator.create_task(cat_request()).unwrap();
    h.orchestrator.submit(&task.id).await.unwrap();
    let queued = h.scheduler.drain();

    assert!(h.worker.worker_id().starts_with("worker-"));

    // First dispatch succeeds; a duplicate dispatch of the same id finds the
    // sub-task no longer pending and skips.
    let outcome = h.worker.execute(&queued[0]).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Success);
    let outcome = h.worker.execute(&queued[0]).await.unwrap();
    assert_eq!(outcome, ExecutionOutcome::Skipped);
}
