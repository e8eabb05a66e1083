//! Jobs module - Job records and the in-memory registry

pub mod record;
pub mod registry;

pub use record::{JobRecord, JobStatus, PollPhase};
pub use registry::JobRegistry;
