//! The reconciliation engine: identity resolution, grouping, metrics,
//! ordering, live selection and view assembly.
//!
//! Everything in here is synchronous and deterministic — the same
//! snapshot and clock reading always produce the same [`QueueView`].
//! The update pump owns all I/O and drives this module.

pub mod grouper;
pub mod identity;
pub mod live;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod ordering;
pub mod view;

pub use model::{Job, JobKey, JobStatus, Metrics, OsDetails, ReadyEntry, ReadyStats};
pub use view::{assemble, build_jobs, BuiltJobs, QueueView};
