//! Domain model (task records, statuses, patches, errors).

pub mod constants;
pub mod errors;
pub mod status;
pub mod task;

pub use self::constants::{LAST_TASK_NAME, UNASSIGNED_ADDRESS};
pub use self::errors::StoreError;
pub use self::status::TaskStatus;
pub use self::task::{TaskPatch, TaskRecord};
