//! Backend module - Remote generation client contract and implementations

pub mod fusion_brain;
pub mod traits;

pub use fusion_brain::FusionBrainClient;
pub use traits::{GenerationClient, PollStatus, SubmitRequest};
