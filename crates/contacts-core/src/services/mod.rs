//! Host-facing service seams: re-indexing, progress reporting and the
//! single-writer job owner.

mod index;
mod jobs;
mod progress;

pub use index::{IndexScheduler, NoopIndexer, QueuedIndexer};
pub use jobs::{JobHandle, JobPriority, ResourceOwner};
pub use progress::{percent, LogProgress, ProgressSink};
