//! Full Pipeline Integration Tests
//!
//! Submit -> expand -> fission -> execute -> aggregate over the in-memory
//! document store with the mock generator.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use atelier::models::subtask::SubTaskStatus;
use atelier::models::task::{CreateTaskRequest, TaskStatus};
use atelier::services::assets::naming::parse_filename;

use super::common::{seeded_db, start_pipeline, wait_for_task, MockGenerator};

fn cat_request() -> CreateTaskRequest {
    CreateTaskRequest {
        subject: "a cat".to_string(),
        style_ids: vec!["ghibli".to_string()],
        model_ids: vec!["pix-v1".to_string()],
        count_per_prompt: 1,
        include_base_style: true,
        variant_count: 2,
        aspect_ratio: "1:1".to_string(),
    }
}

#[tokio::test]
async fn test_happy_path_completes_task() {
    let db = seeded_db();
    let generator = Arc::new(MockGenerator::succeeding("pix-v1"));
    let calls = generator.call_counter();
    let (pipeline, _staging) = start_pipeline(Arc::clone(&db), vec![generator]);

    let task = pipeline.orchestrator().create_task(cat_request()).unwrap();
    assert_eq!(task.status, TaskStatus::Draft);

    let submitted = pipeline.orchestrator().submit(&task.id).await.unwrap();
    assert_eq!(submitted.status, TaskStatus::Processing);
    assert_eq!(submitted.prompts.len(), 2);

    // 2 variants x (base + ghibli) x 1 model x batch 1 = 4 sub-tasks.
    let subtasks = db.list_subtasks_for_task(&task.id).unwrap();
    assert_eq!(subtasks.len(), 4);

    let done = wait_for_task(&db, &task.id, Duration::from_secs(5), |t| {
        t.status.is_terminal()
    })
    .await;
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.progress, 100);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let subtasks = db.list_subtasks_for_task(&task.id).unwrap();
    assert!(subtasks
        .iter()
        .all(|s| s.status == SubTaskStatus::Success));
    for subtask in &subtasks {
        assert!(subtask.started_at.is_some());
        assert!(subtask.completed_at.is_some());
        assert!(subtask.request_snapshot.is_some());
        let snapshot = subtask.response_snapshot.as_deref().unwrap();
        assert!(snapshot.contains("asset_id"));
    }

    pipeline.shutdown();
}

#[tokio::test]
async fn test_style_merge_applied_per_subtask() {
    let db = seeded_db();
    let (pipeline, _staging) =
        start_pipeline(Arc::clone(&db), vec![Arc::new(MockGenerator::succeeding("pix-v1"))]);

    let task = pipeline.orchestrator().create_task(cat_request()).unwrap();
    pipeline.orchestrator().submit(&task.id).await.unwrap();

    let subtasks = db.list_subtasks_for_task(&task.id).unwrap();
    let ghibli: Vec<_> = subtasks.iter().filter(|s| s.style_id == "ghibli").collect();
    let base: Vec<_> = subtasks.iter().filter(|s| s.style_id == "base").collect();
    assert_eq!(ghibli.len(), 2);
    assert_eq!(base.len(), 2);

    for subtask in &ghibli {
        assert!(subtask.final_prompt.ends_with(", studio ghibli style, hand painted"));
        assert!(subtask.final_prompt.starts_with("a cat, "));
        assert_eq!(subtask.negative_prompt, "photorealistic, 3d render");
    }
    for subtask in &base {
        // The implicit base style passes the expanded prompt through.
        assert!(subtask.final_prompt.starts_with("a cat, "));
        assert!(!subtask.final_prompt.contains("ghibli"));
        assert_eq!(subtask.negative_prompt, "");
    }

    pipeline.shutdown();
}

#[tokio::test]
async fn test_assets_persisted_with_parseable_filenames() {
    let db = seeded_db();
    let (pipeline, _staging) =
        start_pipeline(Arc::clone(&db), vec![Arc::new(MockGenerator::succeeding("pix-v1"))]);

    let task = pipeline.orchestrator().create_task(cat_request()).unwrap();
    pipeline.orchestrator().submit(&task.id).await.unwrap();
    wait_for_task(&db, &task.id, Duration::from_secs(5), |t| {
        t.status == TaskStatus::Completed
    })
    .await;

    let assets = db.list_assets_for_task(&task.id).unwrap();
    assert_eq!(assets.len(), 4);
    for asset in &assets {
        let parts = parse_filename(&asset.filename)
            .unwrap_or_else(|| panic!("unparseable filename: {}", asset.filename));
        assert_eq!(parts.subject_slug, "a-cat");
        assert_eq!(parts.model_id, "pix-v1");
        assert_eq!(parts.batch_index, 0);
        assert_eq!(asset.content_type, "image/png");
        assert_eq!(asset.metadata.task_id, task.id);
        assert_eq!(asset.metadata.seed, Some(42));

        // The blob itself is durably in the collection.
        let full = db.get_asset(&asset.id).unwrap().unwrap();
        assert!(!full.data.is_empty());
    }

    pipeline.shutdown();
}

#[tokio::test]
async fn test_unknown_model_fails_subtasks_without_generator_calls() {
    let db = seeded_db();
    let (pipeline, _staging) =
        start_pipeline(Arc::clone(&db), vec![Arc::new(MockGenerator::succeeding("pix-v1"))]);

    let mut request = cat_request();
    request.model_ids = vec!["missing-model".to_string()];
    let task = pipeline.orchestrator().create_task(request).unwrap();
    pipeline.orchestrator().submit(&task.id).await.unwrap();

    let done = wait_for_task(&db, &task.id, Duration::from_secs(5), |t| {
        t.status.is_terminal()
    })
    .await;
    // No generator for the model: every sub-task fails as invalid input.
    assert_eq!(done.status, TaskStatus::Failed);

    let subtasks = db.list_subtasks_for_task(&task.id).unwrap();
    assert!(subtasks.iter().all(|s| s.status == SubTaskStatus::Failed));
    assert!(subtasks
        .iter()
        .all(|s| s.error_category.as_deref() == Some("INVALID_INPUT")));

    pipeline.shutdown();
}

#[tokio::test]
async fn test_missing_style_template_fails_submission() {
    let db = seeded_db();
    let (pipeline, _staging) =
        start_pipeline(Arc::clone(&db), vec![Arc::new(MockGenerator::succeeding("pix-v1"))]);

    let mut request = cat_request();
    request.style_ids = vec!["nonexistent".to_string()];
    let task = pipeline.orchestrator().create_task(request).unwrap();

    assert!(pipeline.orchestrator().submit(&task.id).await.is_err());
    let task = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.is_some());

    pipeline.shutdown();
}
