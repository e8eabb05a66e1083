//! Image Generation Relay
//!
//! Accepts image generation requests, submits them to a remote pipeline
//! service, polls the service until each job finishes, and delivers the
//! result to a caller-supplied webhook.

pub mod api;
pub mod backend;
pub mod config;
pub mod delivery;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod scheduler;

pub use error::{AppError, Result};

use std::sync::Arc;

use backend::GenerationClient;
use delivery::CallbackDispatcher;
use jobs::JobRegistry;
use scheduler::{ExpirySweeper, PollScheduler};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub client: Arc<dyn GenerationClient>,
    pub registry: Arc<JobRegistry>,
    pub scheduler: Arc<PollScheduler>,
}

impl AppState {
    /// Wire the registry, dispatcher, sweeper and scheduler around a generation client
    pub fn new(settings: config::Settings, client: Arc<dyn GenerationClient>) -> Result<Self> {
        let registry = Arc::new(JobRegistry::new());
        let dispatcher = Arc::new(CallbackDispatcher::from_settings(
            &settings,
            registry.clone(),
        )?);
        let sweeper = Arc::new(ExpirySweeper::new(
            registry.clone(),
            settings.completed_ttl(),
        ));
        let scheduler = Arc::new(PollScheduler::from_settings(
            &settings,
            client.clone(),
            registry.clone(),
            dispatcher,
            sweeper,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            client,
            registry,
            scheduler,
        })
    }
}
