//! Progress Aggregation Integration Tests
//!
//! Drives the aggregator over real document-store state, exercising the
//! read-aggregate-write cycle and the status derivation order.

use std::sync::Arc;

use atelier::models::subtask::{SubTask, SubTaskSpec};
use atelier::models::task::{CreateTaskRequest, ExpandedPrompt, Task, TaskStatus};
use atelier::services::aggregator::recompute_progress;
use atelier::storage::database::Database;

fn setup_task_with_subtasks(db: &Database, count: usize) -> (Task, Vec<SubTask>) {
    let task = Task::from_request(CreateTaskRequest {
        subject: "a cat".to_string(),
        style_ids: vec!["ghibli".to_string()],
        model_ids: vec!["pix-v1".to_string()],
        count_per_prompt: count as u32,
        include_base_style: false,
        variant_count: 1,
        aspect_ratio: "1:1".to_string(),
    });
    db.insert_task(&task).unwrap();
    db.update_task_status(&task.id, TaskStatus::Processing, None)
        .unwrap();

    let prompt = ExpandedPrompt {
        id: "v1".to_string(),
        name: "Realistic".to_string(),
        original: "a cat".to_string(),
        expanded: "a cat, photorealistic".to_string(),
        subject_slug: "a-cat".to_string(),
    };
    let subtasks: Vec<SubTask> = (0..count)
        .map(|i| {
            let spec = SubTaskSpec {
                task_id: task.id.clone(),
                prompt: prompt.clone(),
                style_id: "ghibli".to_string(),
                model_id: "pix-v1".to_string(),
                batch_index: i as u32,
            };
            let subtask = SubTask::from_spec(&spec, "a cat, ghibli", "", "1:1");
            db.insert_subtask(&subtask).unwrap();
            subtask
        })
        .collect();

    (task, subtasks)
}

#[test]
fn test_three_subtask_progression() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let (task, subtasks) = setup_task_with_subtasks(&db, 3);

    // One resolved out of three.
    db.mark_subtask_success(&subtasks[0].id, "{}", Some(1))
        .unwrap();
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.progress, 33);
    assert_eq!(snapshot.status, TaskStatus::Processing);

    // Two resolved: a failure also advances progress.
    db.mark_subtask_failed(&subtasks[1].id, "boom", "PROVIDER_ERROR")
        .unwrap();
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.progress, 67);
    assert_eq!(snapshot.status, TaskStatus::Processing);

    // All resolved with one failure: partial_failed at 100%.
    db.mark_subtask_success(&subtasks[2].id, "{}", Some(2))
        .unwrap();
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.status, TaskStatus::PartialFailed);

    let task = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::PartialFailed);
    assert_eq!(task.progress, 100);
}

#[test]
fn test_all_success_completes() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let (task, subtasks) = setup_task_with_subtasks(&db, 3);

    for subtask in &subtasks {
        db.mark_subtask_success(&subtask.id, "{}", None).unwrap();
    }
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.status, TaskStatus::Completed);
}

#[test]
fn test_all_failed() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let (task, subtasks) = setup_task_with_subtasks(&db, 2);

    for subtask in &subtasks {
        db.mark_subtask_failed(&subtask.id, "boom", "PROVIDER_ERROR")
            .unwrap();
    }
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.status, TaskStatus::Failed);
}

#[test]
fn test_cancelled_subtask_holds_task_in_processing() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let (task, subtasks) = setup_task_with_subtasks(&db, 3);

    db.mark_subtask_success(&subtasks[0].id, "{}", None).unwrap();
    db.mark_subtask_success(&subtasks[1].id, "{}", None).unwrap();
    db.mark_subtask_cancelled(&subtasks[2].id).unwrap();

    // Cancelled children never count as resolved: the task sits below 100%.
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.completed, 2);
    assert_eq!(snapshot.progress, 67);
    assert_eq!(snapshot.status, TaskStatus::Processing);
}

#[test]
fn test_recompute_is_idempotent() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let (task, subtasks) = setup_task_with_subtasks(&db, 2);

    db.mark_subtask_success(&subtasks[0].id, "{}", None).unwrap();
    let first = recompute_progress(&db, &task.id).unwrap();
    let second = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_manual_retry_walks_progress_back() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let (task, subtasks) = setup_task_with_subtasks(&db, 2);

    db.mark_subtask_success(&subtasks[0].id, "{}", None).unwrap();
    db.mark_subtask_failed(&subtasks[1].id, "boom", "PROVIDER_ERROR")
        .unwrap();
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.status, TaskStatus::PartialFailed);

    // Resetting the failed sub-task reopens the task.
    assert!(db.reset_subtask_for_retry(&subtasks[1].id).unwrap());
    let snapshot = recompute_progress(&db, &task.id).unwrap();
    assert_eq!(snapshot.progress, 50);
    assert_eq!(snapshot.status, TaskStatus::Processing);
}
