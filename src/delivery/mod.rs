//! Delivery module - Webhook callbacks for finished jobs

pub mod dispatcher;

pub use dispatcher::{CallbackDispatcher, CallbackPayload};
