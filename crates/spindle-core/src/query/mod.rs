//! Query descriptors the façade hands to a [`TaskStore`](crate::ports::TaskStore).
//!
//! # 設計原則
//! - 等価フィルタと追加述語（Predicate）は常に AND で結合する
//! - 文字列で条件を組み立てない。述語は構造化された enum で表現する
//! - 翻訳（TaskQuery → ネイティブなリクエスト）は store 実装側の責務。
//!   [`TaskQuery::matches`] が行レベルの意味を一意に定める

use crate::domain::{TaskRecord, TaskStatus};

/// A column of the task table, used for projections and grouping.
///
/// [`Column::name`] values double as the keys of projected rows, so they are
/// part of the store contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    InstanceId,
    TaskId,
    TaskName,
    Status,
    Address,
    Result,
    FailedCnt,
    LastModifiedTime,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::InstanceId,
        Column::TaskId,
        Column::TaskName,
        Column::Status,
        Column::Address,
        Column::Result,
        Column::FailedCnt,
        Column::LastModifiedTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::InstanceId => "instance_id",
            Column::TaskId => "task_id",
            Column::TaskName => "task_name",
            Column::Status => "status",
            Column::Address => "address",
            Column::Result => "result",
            Column::FailedCnt => "failed_cnt",
            Column::LastModifiedTime => "last_modified_time",
        }
    }
}

/// Structured predicates beyond plain equality.
///
/// Exactly the shapes the façade needs; there is no free-form condition
/// string, so nothing user-controlled is ever spliced into a query.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `address IN (...)` - lost-worker recovery.
    AddressIn(Vec<String>),
    /// `task_id IN (...)` - batch status updates within one instance.
    TaskIdIn(Vec<String>),
    /// `status NOT IN (...)` - excludes terminal tasks from requeueing.
    StatusNotIn(Vec<TaskStatus>),
}

impl Predicate {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        match self {
            Predicate::AddressIn(addresses) => addresses.iter().any(|a| *a == task.address),
            Predicate::TaskIdIn(task_ids) => task_ids.iter().any(|t| *t == task.task_id),
            Predicate::StatusNotIn(statuses) => !statuses.contains(&task.status),
        }
    }
}

/// Grouping applied to a projected read.
///
/// Grouping changes the read from "rows" to "aggregated rows": each result
/// row carries the group key plus a `num` count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Status,
}

/// Filter/projection descriptor for task-table reads, updates and deletes.
///
/// Transient, never persisted. All set equality filters and all predicates
/// must hold for a row to match (logical AND, never one overriding another).
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub instance_id: Option<i64>,
    pub task_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub task_name: Option<String>,
    pub predicates: Vec<Predicate>,
    /// Projection; `None` selects every column.
    pub columns: Option<Vec<Column>>,
    /// Result-row bound; `None` means unbounded.
    pub limit: Option<usize>,
    pub group_by: Option<GroupBy>,
}

impl TaskQuery {
    /// Matches every row in the table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every task of one instance.
    pub fn for_instance(instance_id: i64) -> Self {
        Self {
            instance_id: Some(instance_id),
            ..Self::default()
        }
    }

    /// Logical-primary-key lookup: at most one row can match.
    pub fn for_key(instance_id: i64, task_id: impl Into<String>) -> Self {
        Self {
            instance_id: Some(instance_id),
            task_id: Some(task_id.into()),
            ..Self::default()
        }
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = Some(task_name.into());
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }

    /// Row-level translation: the conjunction of every set equality filter
    /// and every predicate. Store implementations must agree with this.
    pub fn matches(&self, task: &TaskRecord) -> bool {
        if let Some(instance_id) = self.instance_id
            && task.instance_id != instance_id
        {
            return false;
        }
        if let Some(task_id) = &self.task_id
            && task.task_id != *task_id
        {
            return false;
        }
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(task_name) = &self.task_name
            && task.task_name != *task_name
        {
            return false;
        }
        self.predicates.iter().all(|p| p.matches(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskRecord;

    fn running_on(instance_id: i64, task_id: &str, address: &str) -> TaskRecord {
        let mut task = TaskRecord::new(instance_id, task_id, "map");
        task.status = TaskStatus::WorkerProcessing;
        task.address = address.to_string();
        task
    }

    #[test]
    fn equality_filters_are_anded() {
        let query = TaskQuery::for_instance(100).status(TaskStatus::WorkerProcessing);

        assert!(query.matches(&running_on(100, "t1", "w1")));
        // Wrong instance.
        assert!(!query.matches(&running_on(101, "t1", "w1")));
        // Wrong status.
        assert!(!query.matches(&TaskRecord::new(100, "t1", "map")));
    }

    #[test]
    fn predicates_are_anded_with_equality_filters() {
        let query = TaskQuery::for_instance(100)
            .predicate(Predicate::AddressIn(vec!["w1".into()]))
            .predicate(Predicate::StatusNotIn(TaskStatus::TERMINAL.to_vec()));

        assert!(query.matches(&running_on(100, "t1", "w1")));
        assert!(!query.matches(&running_on(100, "t1", "w2")));

        let mut done = running_on(100, "t2", "w1");
        done.status = TaskStatus::WorkerProcessSuccess;
        assert!(!query.matches(&done));
    }

    #[test]
    fn key_query_matches_exactly_one_key() {
        let query = TaskQuery::for_key(100, "t1");
        assert!(query.matches(&running_on(100, "t1", "w1")));
        assert!(!query.matches(&running_on(100, "t2", "w1")));
        assert!(!query.matches(&running_on(101, "t1", "w1")));
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let query = TaskQuery::all().predicate(Predicate::TaskIdIn(vec![]));
        assert!(!query.matches(&running_on(100, "t1", "w1")));
    }
}
