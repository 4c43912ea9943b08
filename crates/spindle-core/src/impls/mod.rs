//! 実装（開発・テスト用）

pub mod inmem_store;

pub use self::inmem_store::InMemoryTaskStore;
