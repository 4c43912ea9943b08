//! TaskStatus - タスクの状態
//!
//! # 状態遷移
//! - waiting_dispatch: 派発待ち（新規作成・requeue 後）
//! - dispatched_unchecked: 派発済み、worker の受領未確認
//! - worker_received: worker が受領
//! - worker_processing: worker が実行中
//! - worker_process_failed / worker_process_success: 終端（以後遷移なし）

use serde::{Deserialize, Serialize};

use super::errors::StoreError;

/// Lifecycle status of one sub-task.
///
/// The integer codes are a storage contract, not an incidental detail: they
/// are written into task rows and embedded in generated query predicates
/// ("status not in (5, 6)"), so they must never be renumbered. The two
/// highest codes are the terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// In the dispatch pool, owned by nobody.
    WaitingDispatch = 1,
    /// Dispatched to a worker, receipt not yet acknowledged.
    DispatchedUnchecked = 2,
    /// Worker acknowledged receipt.
    WorkerReceived = 3,
    /// Worker is executing the task.
    WorkerProcessing = 4,
    /// Terminal: worker reported failure.
    WorkerProcessFailed = 5,
    /// Terminal: worker reported success.
    WorkerProcessSuccess = 6,
}

impl TaskStatus {
    /// The terminal statuses, excluded by the lost-task requeue predicate.
    pub const TERMINAL: [TaskStatus; 2] = [
        TaskStatus::WorkerProcessFailed,
        TaskStatus::WorkerProcessSuccess,
    ];

    /// Stable storage code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Parse a stored status code. Unknown codes are an error, never silently
    /// mapped: a row we cannot classify must fail the read that saw it.
    pub fn from_code(code: i64) -> Result<TaskStatus, StoreError> {
        match code {
            1 => Ok(TaskStatus::WaitingDispatch),
            2 => Ok(TaskStatus::DispatchedUnchecked),
            3 => Ok(TaskStatus::WorkerReceived),
            4 => Ok(TaskStatus::WorkerProcessing),
            5 => Ok(TaskStatus::WorkerProcessFailed),
            6 => Ok(TaskStatus::WorkerProcessSuccess),
            other => Err(StoreError::UnknownStatusCode(other)),
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}
