//! Demo: drive the persistence façade through one instance's life against
//! the in-memory store.

use std::sync::Arc;

use spindle_core::domain::{LAST_TASK_NAME, TaskPatch, TaskRecord, TaskStatus};
use spindle_core::impls::InMemoryTaskStore;
use spindle_core::persistence::TaskPersistence;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    // (A) One store, one façade per worker process.
    let store = Arc::new(InMemoryTaskStore::new());
    let persistence = TaskPersistence::open(store)
        .await
        .expect("task table init failed");

    // (B) Instance 100 fans out into three map tasks plus the last-task marker.
    let instance_id = 100;
    let tasks = vec![
        TaskRecord::new(instance_id, "t1", "map"),
        TaskRecord::new(instance_id, "t2", "map"),
        TaskRecord::new(instance_id, "t3", "map"),
        TaskRecord::new(instance_id, "t-last", LAST_TASK_NAME),
    ];
    println!("batch_save: {}", persistence.batch_save(tasks).await);

    // (C) Dispatch t1/t2 to worker w1, t3 to w2.
    for (task_id, address) in [("t1", "w1"), ("t2", "w1"), ("t3", "w2")] {
        let patch = TaskPatch::new()
            .status(TaskStatus::WorkerProcessing)
            .address(address);
        persistence.update_by_key(instance_id, task_id, patch).await;
    }

    // (D) t1 finishes; then w1 disappears with t2 still in flight.
    persistence
        .batch_update_status(
            instance_id,
            &["t1".to_string()],
            TaskStatus::WorkerProcessSuccess,
            "ok",
        )
        .await;
    println!(
        "requeue_lost_tasks(w1): {}",
        persistence.requeue_lost_tasks(&["w1".to_string()]).await
    );

    // (E) What the task-tracking engine would now see.
    let statistics = persistence.get_status_statistics(instance_id).await;
    println!("status statistics: {statistics:?}");

    if let Some(last) = persistence.get_last_task(instance_id).await {
        println!("last task: {} ({:?})", last.task_id, last.status);
    }

    let results = persistence.get_task_id_to_result_map(instance_id).await;
    println!("task results: {results:?}");

    for task in persistence.get_all_tasks(instance_id).await {
        println!(
            "  {} name={} status={:?} address={} failed_cnt={}",
            task.task_id, task.task_name, task.status, task.address, task.failed_cnt
        );
    }

    // (F) The instance is retired; its rows go with it.
    println!(
        "delete_all_for_instance: {}",
        persistence.delete_all_for_instance(instance_id).await
    );
    println!("rows left: {}", persistence.list_all().await.len());
}
