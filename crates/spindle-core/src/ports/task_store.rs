//! TaskStore port - the durable task table behind the persistence façade.
//!
//! # 設計原則
//! - 正本（source of truth）はストレージ側。façade はメモリ上にタスク状態を持たない
//! - 1 メソッド = 1 ステートメント。複数ステートメントのトランザクションは組まない。
//!   同時更新の正しさはストレージのステートメント単位の原子性に委ねる
//! - [`TaskQuery`] の翻訳はここの実装側の責務（行レベルの意味は
//!   [`TaskQuery::matches`] が定める）

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{StoreError, TaskPatch, TaskRecord};
use crate::query::TaskQuery;

/// Projected result row: column name -> value.
///
/// Carries only the columns the query asked for; consumers must not assume
/// anything else is present. Grouped reads yield rows of the group key plus
/// a `num` count.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The task table collaborator ("task DAO").
///
/// Every method is a single statement against the table. Implementations
/// must make `save` re-applicable (the key is caller-assigned, so a retried
/// insert lands on the same row) because the façade retries blindly.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create (or reset) the backing table. Called once from
    /// [`TaskPersistence::open`](crate::persistence::TaskPersistence::open).
    async fn init_table(&self) -> Result<(), StoreError>;

    /// Insert one task row.
    async fn save(&self, task: TaskRecord) -> Result<bool, StoreError>;

    /// Insert many task rows in one statement.
    async fn batch_save(&self, tasks: Vec<TaskRecord>) -> Result<bool, StoreError>;

    /// Full-record read of every row matching `query`, bounded by its limit.
    async fn query(&self, query: TaskQuery) -> Result<Vec<TaskRecord>, StoreError>;

    /// Projected / grouped read; result rows expose only requested columns.
    async fn query_projected(&self, query: TaskQuery) -> Result<Vec<Row>, StoreError>;

    /// Apply `patch` to every row matching `query`.
    async fn update(&self, query: TaskQuery, patch: TaskPatch) -> Result<bool, StoreError>;

    /// Delete every row matching `query`.
    async fn delete(&self, query: TaskQuery) -> Result<bool, StoreError>;

    /// Specialized read for the reduce / post-process stage:
    /// `task_id -> result` for every task of one instance.
    async fn query_task_id_to_result(
        &self,
        instance_id: i64,
    ) -> Result<HashMap<String, String>, StoreError>;
}
