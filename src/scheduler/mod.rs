//! Scheduler module - Status polling, retry policy, and record expiry

pub mod expiry;
pub mod poller;
pub mod retry;

pub use expiry::ExpirySweeper;
pub use poller::PollScheduler;
pub use retry::{NextPoll, RetryPolicy};
