//! Reserved sentinel values shared with the task-tracking engine.

/// Address value meaning "no worker currently owns this task".
///
/// Written back by [`requeue_lost_tasks`](crate::persistence::TaskPersistence::requeue_lost_tasks)
/// when a task returns to the dispatch pool.
pub const UNASSIGNED_ADDRESS: &str = "N/A";

/// Reserved task name of the synthetic "last task" marker.
///
/// Map-reduce / broadcast instances create exactly one task with this name;
/// its presence signals that the fan-out phase completed and the instance can
/// move to the reduce stage. Regular task names must never collide with it.
pub const LAST_TASK_NAME: &str = "SPINDLE_LAST_TASK";
