//! Backend service contracts.
//!
//! ARCHITECTURAL RULE: the coordinators never talk to the network directly.
//! They depend on these traits, and the composition root decides whether the
//! implementation is `http` (production) or `mock` (tests, demos). No
//! module-level singletons — instances are constructed and injected.

pub mod api_client;
pub mod http;
pub mod mock;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::models::resume::{EditRequest, ResumeVersion};
use crate::models::tailoring::{TailoringOutcome, TailoringRequest, TailoringStatus};
use crate::models::upload::{PresignedUpload, UploadProgress, UploadReceipt};

/// Progress callback invoked for every measurable chunk of an upload.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Cooperative cancellation flag honored by the transfer layer.
/// Cheap to clone; `abort()` is idempotent.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Re-arms the signal for a fresh attempt after a cancellation.
    pub fn reset(&self) {
        self.aborted.store(false, Ordering::SeqCst);
    }
}

/// Two-phase file upload: obtain a target, transfer bytes, confirm.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn initiate(&self, file_name: &str, mime_type: &str) -> Result<PresignedUpload>;

    /// Transfers the bytes to `upload_url`, reporting monotone progress and
    /// aborting mid-stream when `abort` fires.
    async fn transfer(
        &self,
        upload_url: &str,
        bytes: Bytes,
        on_progress: ProgressFn,
        abort: AbortSignal,
    ) -> Result<()>;

    async fn confirm(
        &self,
        resume_id: &str,
        file_key: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadReceipt>;

    /// Best-effort at call sites: failures are logged, never surfaced.
    async fn delete(&self, resume_id: &str) -> Result<()>;
}

/// Remote tailoring job operations.
#[async_trait]
pub trait TailoringService: Send + Sync {
    async fn start(&self, request: &TailoringRequest) -> Result<TailoringOutcome>;

    async fn status(&self, tailoring_id: &str) -> Result<TailoringStatus>;

    async fn result(&self, tailoring_id: &str) -> Result<TailoringOutcome>;

    /// Best-effort at call sites: failures are logged, never surfaced.
    async fn cancel(&self, tailoring_id: &str) -> Result<()>;
}

/// Versioned resume document operations plus AI-assisted text enhancement.
#[async_trait]
pub trait ResumeService: Send + Sync {
    async fn content(&self, resume_id: &str) -> Result<ResumeVersion>;

    async fn history(&self, resume_id: &str) -> Result<Vec<ResumeVersion>>;

    async fn save_edit(&self, resume_id: &str, edit: &EditRequest) -> Result<ResumeVersion>;

    async fn revert(&self, resume_id: &str, version_id: &str) -> Result<ResumeVersion>;

    async fn enhance(&self, text: &str, prompt: &str) -> Result<String>;
}
