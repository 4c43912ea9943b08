//! InMemoryTaskStore - 開発・テスト用のタスクテーブル
//!
//! # 実装詳細
//! - BTreeMap<(instance_id, task_id), TaskRecord> で行を管理（スキャン順が決定的）
//! - tokio::sync::Mutex で排他制御。1 メソッド = 1 ロック区間なので、
//!   ステートメント単位の原子性がそのまま得られる
//! - save は論理主キーに対する upsert。リトライされた insert が同じ行に
//!   着地するため、façade の盲目的なリトライと両立する

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::domain::{StoreError, TaskPatch, TaskRecord};
use crate::ports::{Row, TaskStore};
use crate::query::{Column, GroupBy, TaskQuery};

type Key = (i64, String);

/// In-memory task table.
pub struct InMemoryTaskStore {
    rows: Arc<Mutex<BTreeMap<Key, TaskRecord>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key_of(task: &TaskRecord) -> Key {
    (task.instance_id, task.task_id.clone())
}

/// Project one column of a row into its wire value.
fn column_value(task: &TaskRecord, column: Column) -> Value {
    match column {
        Column::InstanceId => json!(task.instance_id),
        Column::TaskId => json!(task.task_id),
        Column::TaskName => json!(task.task_name),
        Column::Status => json!(task.status.code()),
        Column::Address => json!(task.address),
        Column::Result => json!(task.result),
        Column::FailedCnt => json!(task.failed_cnt),
        Column::LastModifiedTime => json!(task.last_modified_time),
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn init_table(&self) -> Result<(), StoreError> {
        // Drop-and-recreate semantics: a worker starts from an empty table.
        self.rows.lock().await.clear();
        Ok(())
    }

    async fn save(&self, task: TaskRecord) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        rows.insert(key_of(&task), task);
        Ok(true)
    }

    async fn batch_save(&self, tasks: Vec<TaskRecord>) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        for task in tasks {
            rows.insert(key_of(&task), task);
        }
        Ok(true)
    }

    async fn query(&self, query: TaskQuery) -> Result<Vec<TaskRecord>, StoreError> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<TaskRecord> = rows
            .values()
            .filter(|task| query.matches(task))
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn query_projected(&self, query: TaskQuery) -> Result<Vec<Row>, StoreError> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<&TaskRecord> =
            rows.values().filter(|task| query.matches(task)).collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        if let Some(GroupBy::Status) = query.group_by {
            // Aggregated read: one row per distinct status code.
            let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
            for task in matched {
                *counts.entry(task.status.code()).or_insert(0) += 1;
            }
            return Ok(counts
                .into_iter()
                .map(|(code, num)| {
                    let mut row = Row::new();
                    row.insert(Column::Status.name().to_string(), json!(code));
                    row.insert("num".to_string(), json!(num));
                    row
                })
                .collect());
        }

        let columns = query.columns.as_deref().unwrap_or(&Column::ALL);
        Ok(matched
            .into_iter()
            .map(|task| {
                let mut row = Row::new();
                for &column in columns {
                    row.insert(column.name().to_string(), column_value(task, column));
                }
                row
            })
            .collect())
    }

    async fn update(&self, query: TaskQuery, patch: TaskPatch) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        for task in rows.values_mut().filter(|task| query.matches(task)) {
            patch.apply_to(task);
        }
        Ok(true)
    }

    async fn delete(&self, query: TaskQuery) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        rows.retain(|_, task| !query.matches(task));
        Ok(true)
    }

    async fn query_task_id_to_result(
        &self,
        instance_id: i64,
    ) -> Result<HashMap<String, String>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|task| task.instance_id == instance_id)
            .map(|task| (task.task_id.clone(), task.result.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::query::Predicate;

    async fn seeded() -> InMemoryTaskStore {
        let store = InMemoryTaskStore::new();
        store.init_table().await.unwrap();

        let mut t1 = TaskRecord::new(100, "t1", "map");
        t1.status = TaskStatus::WorkerProcessing;
        t1.address = "w1".to_string();

        let mut t2 = TaskRecord::new(100, "t2", "map");
        t2.status = TaskStatus::WorkerProcessSuccess;
        t2.result = "done".to_string();

        let t3 = TaskRecord::new(101, "t1", "map");

        store.batch_save(vec![t1, t2, t3]).await.unwrap();
        store
    }

    #[tokio::test]
    async fn save_is_an_upsert_on_the_logical_key() {
        let store = InMemoryTaskStore::new();
        let mut task = TaskRecord::new(100, "t1", "map");
        store.save(task.clone()).await.unwrap();

        task.status = TaskStatus::WorkerReceived;
        store.save(task).await.unwrap();

        let all = store.query(TaskQuery::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, TaskStatus::WorkerReceived);
    }

    #[tokio::test]
    async fn query_filters_and_limits() {
        let store = seeded().await;

        let instance = store.query(TaskQuery::for_instance(100)).await.unwrap();
        assert_eq!(instance.len(), 2);

        let limited = store
            .query(TaskQuery::for_instance(100).limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let by_status = store
            .query(TaskQuery::for_instance(100).status(TaskStatus::WorkerProcessing))
            .await
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].task_id, "t1");
    }

    #[tokio::test]
    async fn projected_rows_carry_only_requested_columns() {
        let store = seeded().await;

        let rows = store
            .query_projected(TaskQuery::for_key(100, "t1").columns(vec![Column::Status]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["status"], json!(TaskStatus::WorkerProcessing.code()));
    }

    #[tokio::test]
    async fn projection_defaults_to_every_column() {
        let store = seeded().await;

        let rows = store
            .query_projected(TaskQuery::for_key(100, "t2"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), Column::ALL.len());
        for column in Column::ALL {
            assert!(rows[0].contains_key(column.name()));
        }
        assert_eq!(rows[0]["result"], json!("done"));
        assert_eq!(rows[0]["status"], json!(TaskStatus::WorkerProcessSuccess.code()));
    }

    #[tokio::test]
    async fn grouped_read_counts_per_status() {
        let store = seeded().await;

        let rows = store
            .query_projected(
                TaskQuery::for_instance(100)
                    .columns(vec![Column::Status])
                    .group_by(GroupBy::Status),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row["num"], json!(1));
        }
    }

    #[tokio::test]
    async fn predicate_update_rewrites_matching_rows_only() {
        let store = seeded().await;

        let query = TaskQuery::all()
            .predicate(Predicate::AddressIn(vec!["w1".into()]))
            .predicate(Predicate::StatusNotIn(TaskStatus::TERMINAL.to_vec()));
        let patch = TaskPatch::new()
            .status(TaskStatus::WaitingDispatch)
            .address("N/A");
        store.update(query, patch).await.unwrap();

        let t1 = store
            .query(TaskQuery::for_key(100, "t1"))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(t1.status, TaskStatus::WaitingDispatch);
        assert_eq!(t1.address, "N/A");

        let t2 = store
            .query(TaskQuery::for_key(100, "t2"))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(t2.status, TaskStatus::WorkerProcessSuccess);
    }

    #[tokio::test]
    async fn delete_is_scoped_by_the_query() {
        let store = seeded().await;
        store.delete(TaskQuery::for_instance(100)).await.unwrap();

        assert!(store.query(TaskQuery::for_instance(100)).await.unwrap().is_empty());
        assert_eq!(store.query(TaskQuery::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn task_id_to_result_covers_one_instance() {
        let store = seeded().await;
        let map = store.query_task_id_to_result(100).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map["t1"], "");
        assert_eq!(map["t2"], "done");
    }
}
