//! spindle-core
//!
//! Task-state persistence for a Spindle worker node. One job instance is
//! split into many sub-tasks; every sub-task's lifecycle lives as a row in a
//! worker-local task table, and this crate is the retry-safe façade the
//! task-tracking engine talks to.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskRecord, TaskStatus, TaskPatch, StoreError, 定数）
//! - **ports**: 抽象化レイヤー（TaskStore trait）
//! - **query**: TaskStore に渡すクエリ記述子（TaskQuery, Predicate, Column）
//! - **retry**: ストレージ操作のリトライ実行（RetryExecutor）
//! - **persistence**: TaskPersistence ファサード（呼び出し側の唯一の入口）
//! - **impls**: 実装（InMemoryTaskStore など開発用）

pub mod domain;
pub mod impls;
pub mod persistence;
pub mod ports;
pub mod query;
pub mod retry;

pub use self::domain::{StoreError, TaskPatch, TaskRecord, TaskStatus};
pub use self::persistence::TaskPersistence;
pub use self::ports::TaskStore;
pub use self::retry::RetryExecutor;
