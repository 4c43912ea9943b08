//! Ports - 抽象化レイヤー
//!
//! 外部システム（タスクテーブルを持つストレージエンジン）への
//! インターフェースを定義し、実装の詳細を隠蔽します。

pub mod task_store;

pub use self::task_store::{Row, TaskStore};
