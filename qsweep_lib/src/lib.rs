pub mod error;
pub mod expand;
pub mod identity;
pub mod log_target;
pub mod logging;
pub mod pack;
pub mod queue;
pub mod util;
pub mod worker;

pub use error::{PackError, QueueError, TemplateError};
pub use expand::{expand, JobTemplate};
pub use identity::WorkerIdentity;
pub use pack::{pack, DispatchBatch};
pub use qsweep_data::{CommandRecord, CommandState, ExpandedJob, QueueSummary};
pub use queue::{CommandQueue, QueueStore};
pub use worker::{Outcome, Worker, LOGS_UNAVAILABLE_EXIT_CODE};
