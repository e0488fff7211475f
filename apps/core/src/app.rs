//! Composition root. Services are constructed here and injected into the
//! components that need them — nothing else in the crate reaches for a
//! global.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::editor::EditSession;
use crate::services::api_client::ApiClient;
use crate::services::http::{HttpResumeService, HttpTailoringService, HttpUploadService};
use crate::services::{ResumeService, TailoringService, UploadService};
use crate::submit::SubmissionOrchestrator;
use crate::tailoring::{JobPoller, PollConfig};

/// Initializes structured logging. Call once from the embedding binary.
pub fn init_tracing(default_directive: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// The wired-up client core: submission flow plus edit session, sharing one
/// poller.
pub struct TailorApp {
    pub submission: SubmissionOrchestrator,
    pub editor: Arc<EditSession>,
    pub poller: Arc<JobPoller>,
}

impl TailorApp {
    /// Production wiring: HTTP services against the configured backend.
    pub fn from_config(config: &Config) -> Self {
        let api = ApiClient::new(&config.api_base_url, config.api_auth_token.clone());
        let uploads: Arc<dyn UploadService> = Arc::new(HttpUploadService::new(api.clone()));
        let tailoring: Arc<dyn TailoringService> = Arc::new(HttpTailoringService::new(api.clone()));
        let resumes: Arc<dyn ResumeService> = Arc::new(HttpResumeService::new(api));

        Self::new(
            uploads,
            tailoring,
            resumes,
            PollConfig {
                interval: Duration::from_secs(config.poll_interval_secs),
                max_attempts: config.poll_max_attempts,
            },
        )
    }

    /// Explicit wiring, used by tests to swap in fakes.
    pub fn new(
        uploads: Arc<dyn UploadService>,
        tailoring: Arc<dyn TailoringService>,
        resumes: Arc<dyn ResumeService>,
        poll_config: PollConfig,
    ) -> Self {
        let poller = Arc::new(JobPoller::new(tailoring, poll_config));
        Self {
            submission: SubmissionOrchestrator::new(uploads, poller.clone()),
            editor: Arc::new(EditSession::new(resumes)),
            poller,
        }
    }
}
