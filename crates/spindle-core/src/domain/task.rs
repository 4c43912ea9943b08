//! TaskRecord - one row per sub-task, plus the patch type used for updates.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::constants::UNASSIGNED_ADDRESS;
use super::status::TaskStatus;

/// One row of the worker-local task table.
///
/// `(instance_id, task_id)` is the logical primary key; both are immutable
/// after creation. Everything else is mutated in place over the task's life,
/// the row itself is never re-inserted. Rows are destroyed only by the bulk
/// delete that retires the whole instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Job-instance this task belongs to.
    pub instance_id: i64,
    /// Unique within `instance_id`.
    pub task_id: String,
    /// Logical label; [`LAST_TASK_NAME`](super::constants::LAST_TASK_NAME) is reserved.
    pub task_name: String,
    pub status: TaskStatus,
    /// Worker node currently owning the task, or the unassigned sentinel.
    pub address: String,
    /// Serialized task output, written on completion.
    pub result: String,
    /// Failure counter, incremented by the task-tracking engine.
    pub failed_cnt: u32,
    /// Epoch milliseconds, stamped by the façade on every update.
    pub last_modified_time: i64,
}

impl TaskRecord {
    /// A freshly created task: waiting for dispatch, owned by nobody.
    pub fn new(instance_id: i64, task_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            instance_id,
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::WaitingDispatch,
            address: UNASSIGNED_ADDRESS.to_string(),
            result: String::new(),
            failed_cnt: 0,
            last_modified_time: Utc::now().timestamp_millis(),
        }
    }
}

/// Partial update applied to every task row matched by a query.
///
/// `None` fields are left untouched. The key columns (`instance_id`,
/// `task_id`, `task_name`) are deliberately absent: they are immutable.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub address: Option<String>,
    pub result: Option<String>,
    pub failed_cnt: Option<u32>,
    pub last_modified_time: Option<i64>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn failed_cnt(mut self, failed_cnt: u32) -> Self {
        self.failed_cnt = Some(failed_cnt);
        self
    }

    /// Apply the set fields to `task`, leaving the rest alone.
    pub fn apply_to(&self, task: &mut TaskRecord) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(address) = &self.address {
            task.address = address.clone();
        }
        if let Some(result) = &self.result {
            task.result = result.clone();
        }
        if let Some(failed_cnt) = self.failed_cnt {
            task.failed_cnt = failed_cnt;
        }
        if let Some(ts) = self.last_modified_time {
            task.last_modified_time = ts;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_waiting_and_unassigned() {
        let task = TaskRecord::new(100, "t1", "map");
        assert_eq!(task.status, TaskStatus::WaitingDispatch);
        assert_eq!(task.address, UNASSIGNED_ADDRESS);
        assert_eq!(task.failed_cnt, 0);
        assert!(task.result.is_empty());
        assert!(task.last_modified_time > 0);
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut task = TaskRecord::new(100, "t1", "map");
        let before = task.clone();

        TaskPatch::new()
            .status(TaskStatus::WorkerProcessing)
            .address("w1")
            .apply_to(&mut task);

        assert_eq!(task.status, TaskStatus::WorkerProcessing);
        assert_eq!(task.address, "w1");
        assert_eq!(task.result, before.result);
        assert_eq!(task.failed_cnt, before.failed_cnt);
        assert_eq!(task.last_modified_time, before.last_modified_time);
    }
}
