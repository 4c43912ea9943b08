//! TaskPersistence - the retry-safe persistence façade for one worker node.
//!
//! Every operation builds a [`TaskQuery`], runs the store call through the
//! [`RetryExecutor`], and converts a final failure into a degraded default
//! (`false`, empty collection, `None`) after logging it - an error object
//! never reaches the task-tracking engine. A persistence hiccup must not
//! crash tracking logic, so callers have to treat every negative or empty
//! answer as "try again or treat as failed", never as a confirmed absence.
//!
//! # 設計原則
//! - façade はステートレス。タスク状態はすべてストレージ側（正本）にある
//! - 読み書きを問わず全操作が同じリトライ予算を通る。したがってここから
//!   発行する操作は再適用安全なもの（キー指定の insert と述語 update）に限る
//! - 複数ステートメントのトランザクションは組まない（設計上の境界）

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::error;

use crate::domain::{
    LAST_TASK_NAME, StoreError, TaskPatch, TaskRecord, TaskStatus, UNASSIGNED_ADDRESS,
};
use crate::ports::{Row, TaskStore};
use crate::query::{Column, GroupBy, Predicate, TaskQuery};
use crate::retry::RetryExecutor;

/// The persistence façade. Construct one per worker process via [`open`]
/// and hand it by reference to consumers.
///
/// [`open`]: TaskPersistence::open
pub struct TaskPersistence {
    store: Arc<dyn TaskStore>,
    retry: RetryExecutor,
}

impl TaskPersistence {
    /// Open the façade over `store`, initializing the backing table.
    ///
    /// This is the only fallible surface of the type: a worker that cannot
    /// create its task table cannot run at all, so the error propagates.
    pub async fn open(store: Arc<dyn TaskStore>) -> Result<Self, StoreError> {
        Self::open_with(store, RetryExecutor::default()).await
    }

    /// [`open`](Self::open) with an explicit retry budget.
    pub async fn open_with(
        store: Arc<dyn TaskStore>,
        retry: RetryExecutor,
    ) -> Result<Self, StoreError> {
        store.init_table().await?;
        Ok(Self { store, retry })
    }

    /// Insert one task row. Returns `false` on (retried-out) failure.
    pub async fn save(&self, task: TaskRecord) -> bool {
        let saved = self
            .retry
            .run(|| {
                let task = task.clone();
                async move { self.store.save(task).await }
            })
            .await;
        match saved {
            Ok(ok) => ok,
            Err(err) => {
                error!(
                    instance_id = task.instance_id,
                    task_id = %task.task_id,
                    error = %err,
                    "save task failed"
                );
                false
            }
        }
    }

    /// Insert many task rows. An empty input succeeds without touching
    /// storage.
    pub async fn batch_save(&self, tasks: Vec<TaskRecord>) -> bool {
        if tasks.is_empty() {
            return true;
        }
        let saved = self
            .retry
            .run(|| {
                let tasks = tasks.clone();
                async move { self.store.batch_save(tasks).await }
            })
            .await;
        match saved {
            Ok(ok) => ok,
            Err(err) => {
                error!(count = tasks.len(), error = %err, "batch save tasks failed");
                false
            }
        }
    }

    /// Update one task row by its logical primary key, stamping
    /// `last_modified_time`. The usual vehicle for single-task status
    /// transitions.
    pub async fn update_by_key(
        &self,
        instance_id: i64,
        task_id: &str,
        mut patch: TaskPatch,
    ) -> bool {
        patch.last_modified_time = Some(Utc::now().timestamp_millis());
        let query = TaskQuery::for_key(instance_id, task_id);

        let updated = self
            .retry
            .run(|| {
                let (query, patch) = (query.clone(), patch.clone());
                async move { self.store.update(query, patch).await }
            })
            .await;
        match updated {
            Ok(ok) => ok,
            Err(err) => {
                error!(instance_id, task_id, error = %err, "update task by key failed");
                false
            }
        }
    }

    /// Return every task still in flight on one of `addresses` to the
    /// dispatch pool: address back to unassigned, status back to
    /// `WaitingDispatch`. Terminal tasks are left untouched - they already
    /// carry a final outcome the lost worker managed to report.
    ///
    /// This is the orphan-recovery path, invoked when worker processes are
    /// declared unreachable.
    pub async fn requeue_lost_tasks(&self, addresses: &[String]) -> bool {
        if addresses.is_empty() {
            return true;
        }

        let mut patch = TaskPatch::new()
            .status(TaskStatus::WaitingDispatch)
            .address(UNASSIGNED_ADDRESS);
        patch.last_modified_time = Some(Utc::now().timestamp_millis());
        let query = TaskQuery::all()
            .predicate(Predicate::AddressIn(addresses.to_vec()))
            .predicate(Predicate::StatusNotIn(TaskStatus::TERMINAL.to_vec()));

        let updated = self
            .retry
            .run(|| {
                let (query, patch) = (query.clone(), patch.clone());
                async move { self.store.update(query, patch).await }
            })
            .await;
        match updated {
            Ok(ok) => ok,
            Err(err) => {
                error!(?addresses, error = %err, "requeue lost tasks failed");
                false
            }
        }
    }

    /// Set `status` and `result` on the given sibling tasks of one instance
    /// in a single statement.
    pub async fn batch_update_status(
        &self,
        instance_id: i64,
        task_ids: &[String],
        status: TaskStatus,
        result: &str,
    ) -> bool {
        if task_ids.is_empty() {
            return true;
        }

        let query =
            TaskQuery::for_instance(instance_id).predicate(Predicate::TaskIdIn(task_ids.to_vec()));
        let mut patch = TaskPatch::new().status(status).result(result);
        patch.last_modified_time = Some(Utc::now().timestamp_millis());

        let updated = self
            .retry
            .run(|| {
                let (query, patch) = (query.clone(), patch.clone());
                async move { self.store.update(query, patch).await }
            })
            .await;
        match updated {
            Ok(ok) => ok,
            Err(err) => {
                error!(
                    instance_id,
                    ?task_ids,
                    status = status.code(),
                    error = %err,
                    "batch update task status failed"
                );
                false
            }
        }
    }

    /// The synthetic "last task" marker of a map-reduce / broadcast
    /// instance. `None` is a normal outcome: the marker simply has not been
    /// created yet.
    pub async fn get_last_task(&self, instance_id: i64) -> Option<TaskRecord> {
        let query = TaskQuery::for_instance(instance_id).task_name(LAST_TASK_NAME);

        let queried = self
            .retry
            .run(|| {
                let query = query.clone();
                async move { self.store.query(query).await }
            })
            .await;
        match queried {
            Ok(mut tasks) => {
                if tasks.is_empty() {
                    None
                } else {
                    Some(tasks.swap_remove(0))
                }
            }
            Err(err) => {
                error!(instance_id, error = %err, "get last task failed");
                None
            }
        }
    }

    /// Every task of one instance.
    pub async fn get_all_tasks(&self, instance_id: i64) -> Vec<TaskRecord> {
        let query = TaskQuery::for_instance(instance_id);
        let queried = self
            .retry
            .run(|| {
                let query = query.clone();
                async move { self.store.query(query).await }
            })
            .await;
        match queried {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(instance_id, error = %err, "get all tasks failed");
                Vec::new()
            }
        }
    }

    /// Tasks of one instance in a given status. `limit == 0` means
    /// unbounded.
    pub async fn get_tasks_by_status(
        &self,
        instance_id: i64,
        status: TaskStatus,
        limit: usize,
    ) -> Vec<TaskRecord> {
        let mut query = TaskQuery::for_instance(instance_id).status(status);
        if limit > 0 {
            query = query.limit(limit);
        }

        let queried = self
            .retry
            .run(|| {
                let query = query.clone();
                async move { self.store.query(query).await }
            })
            .await;
        match queried {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(instance_id, status = status.code(), error = %err, "get tasks by status failed");
                Vec::new()
            }
        }
    }

    /// Per-status row counts for one instance, via a grouped read.
    ///
    /// Statuses with no rows are omitted, never mapped to zero. A row whose
    /// status code cannot be parsed fails the whole aggregation (and thus
    /// degrades to an empty map at this boundary) rather than being dropped
    /// silently.
    pub async fn get_status_statistics(&self, instance_id: i64) -> HashMap<TaskStatus, u64> {
        let query = TaskQuery::for_instance(instance_id)
            .columns(vec![Column::Status])
            .group_by(GroupBy::Status);

        let aggregated = self
            .retry
            .run(|| {
                let query = query.clone();
                async move {
                    let rows = self.store.query_projected(query).await?;
                    let mut statistics = HashMap::new();
                    for row in rows {
                        let status = TaskStatus::from_code(require_i64(&row, "status")?)?;
                        let num = require_i64(&row, "num")?;
                        statistics.insert(status, num as u64);
                    }
                    Ok(statistics)
                }
            })
            .await;

        match aggregated {
            Ok(statistics) => statistics,
            Err(err) => {
                error!(instance_id, error = %err, "get status statistics failed");
                HashMap::new()
            }
        }
    }

    /// `task_id -> result` for every task of one instance; the reduce /
    /// post-process input.
    pub async fn get_task_id_to_result_map(&self, instance_id: i64) -> HashMap<String, String> {
        let queried = self
            .retry
            .run(|| async move { self.store.query_task_id_to_result(instance_id).await })
            .await;
        match queried {
            Ok(map) => map,
            Err(err) => {
                error!(instance_id, error = %err, "get task result map failed");
                HashMap::new()
            }
        }
    }

    /// Status of one task, fetching only the status column (disk I/O on the
    /// task table is the worker's bottleneck, so narrow reads matter).
    ///
    /// The key is expected to exist: zero rows is a broken key invariant and
    /// follows the same log-and-degrade path as storage failure. A `None`
    /// therefore cannot distinguish "absent" from "lookup failed" - accepted
    /// trade-off of the swallow policy.
    pub async fn get_status(&self, instance_id: i64, task_id: &str) -> Option<TaskStatus> {
        let query = TaskQuery::for_key(instance_id, task_id).columns(vec![Column::Status]);

        let status = self
            .retry
            .run(|| {
                let query = query.clone();
                async move {
                    let rows = self.store.query_projected(query).await?;
                    let row = first_row(rows, instance_id, task_id)?;
                    TaskStatus::from_code(require_i64(&row, "status")?)
                }
            })
            .await;

        match status {
            Ok(status) => Some(status),
            Err(err) => {
                error!(instance_id, task_id, error = %err, "get task status failed");
                None
            }
        }
    }

    /// Failure count of one task, fetching only the `failed_cnt` column.
    /// Same key expectation and `None`-ambiguity as [`get_status`](Self::get_status).
    pub async fn get_failed_count(&self, instance_id: i64, task_id: &str) -> Option<u32> {
        let query = TaskQuery::for_key(instance_id, task_id).columns(vec![Column::FailedCnt]);

        let failed_cnt = self
            .retry
            .run(|| {
                let query = query.clone();
                async move {
                    let rows = self.store.query_projected(query).await?;
                    let row = first_row(rows, instance_id, task_id)?;
                    let count = require_i64(&row, "failed_cnt")?;
                    // A count outside u32 range is a malformed row, not a
                    // value to wrap.
                    u32::try_from(count).map_err(|_| StoreError::MissingColumn("failed_cnt"))
                }
            })
            .await;

        match failed_cnt {
            Ok(count) => Some(count),
            Err(err) => {
                error!(instance_id, task_id, error = %err, "get task failed count failed");
                None
            }
        }
    }

    /// Delete every task row of one instance. Used when the parent instance
    /// itself is retired.
    pub async fn delete_all_for_instance(&self, instance_id: i64) -> bool {
        let query = TaskQuery::for_instance(instance_id);
        let deleted = self
            .retry
            .run(|| {
                let query = query.clone();
                async move { self.store.delete(query).await }
            })
            .await;
        match deleted {
            Ok(ok) => ok,
            Err(err) => {
                error!(instance_id, error = %err, "delete instance tasks failed");
                false
            }
        }
    }

    /// Every task row in the table. Diagnostic use only: this is an
    /// unbounded scan, no production path should depend on it.
    pub async fn list_all(&self) -> Vec<TaskRecord> {
        let queried = self
            .retry
            .run(|| async move { self.store.query(TaskQuery::all()).await })
            .await;
        match queried {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(error = %err, "list all tasks failed");
                Vec::new()
            }
        }
    }
}

/// The single row a key-based read must produce; zero rows breaks the key
/// invariant.
fn first_row(rows: Vec<Row>, instance_id: i64, task_id: &str) -> Result<Row, StoreError> {
    rows.into_iter().next().ok_or_else(|| StoreError::RowNotFound {
        instance_id,
        task_id: task_id.to_string(),
    })
}

fn require_i64(row: &Row, column: &'static str) -> Result<i64, StoreError> {
    row.get(column)
        .and_then(|value| value.as_i64())
        .ok_or(StoreError::MissingColumn(column))
}
