//! courier-services — credential and record storage, the task queue, and the
//! tasks it runs.

pub mod credential_store;
pub mod process_task;
pub mod record_store;
pub mod sqlite;
pub mod task_queue;
pub mod task_store;
pub mod task_types;
pub mod worker;

pub use credential_store::{CredentialError, CredentialStore};
pub use process_task::{ProcessDataTask, PROCESS_DATA};
pub use record_store::{RecordStore, StoreError};
pub use task_queue::{QueueError, Task, TaskContext, TaskQueue, TaskReceiver, TaskRegistry};
pub use task_store::{TaskEntry, TaskStore};
pub use task_types::{CommitGate, TaskFailure, TaskSubmit, TimeLimits};
