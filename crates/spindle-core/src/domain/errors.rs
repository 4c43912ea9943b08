use thiserror::Error;

/// Errors produced by the storage layer and its row parsing.
///
/// None of these ever reach the task-tracking engine: the façade retries and
/// then degrades to a default (see [`crate::persistence`]). They exist so the
/// retry loop and the log line at the boundary have something precise to say.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient storage failure (connectivity, contention, timeout).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A key-based read expected exactly one row but found none.
    /// `(instance_id, task_id)` is the logical primary key, so this means the
    /// key invariant is broken, not that the task is merely absent.
    #[error("no row for instance_id={instance_id} task_id={task_id}")]
    RowNotFound { instance_id: i64, task_id: String },

    /// A stored row carried a status code outside the stable numbering.
    #[error("unknown task status code {0}")]
    UnknownStatusCode(i64),

    /// A projected row did not expose an expected column.
    #[error("missing or malformed column `{0}` in projected row")]
    MissingColumn(&'static str),

    #[error("{0}")]
    Other(String),
}
