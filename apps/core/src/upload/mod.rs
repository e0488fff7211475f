//! Upload Coordinator — one file's select/upload/cancel/retry lifecycle.
//!
//! Selection is validated synchronously and held locally; the network only
//! gets involved when `upload()` runs the initiate → transfer → confirm
//! sequence. An abort resets to the empty state, a transfer failure keeps
//! the file so retry works.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::errors::UploadError;
use crate::models::upload::{SelectedFile, UploadProgress};
use crate::services::{AbortSignal, ProgressFn, UploadService};

pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

const ACCEPTED_TYPES: [&str; 2] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Observable state of one upload slot.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub file: Option<SelectedFile>,
    pub error: Option<String>,
    pub is_uploading: bool,
    pub progress: u8,
    pub resume_id: Option<String>,
}

#[derive(Clone)]
pub struct UploadCoordinator {
    service: Arc<dyn UploadService>,
    state: Arc<Mutex<UploadState>>,
    abort: AbortSignal,
    on_progress: Arc<Mutex<Option<ProgressFn>>>,
}

impl UploadCoordinator {
    pub fn new(service: Arc<dyn UploadService>) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(UploadState::default())),
            abort: AbortSignal::new(),
            on_progress: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.lock().unwrap().clone()
    }

    /// Registers an observer invoked on every progress report, in addition
    /// to the state updates.
    pub fn set_on_progress(&self, observer: ProgressFn) {
        *self.on_progress.lock().unwrap() = Some(observer);
    }

    /// Validates and stores the file locally. No network call happens here —
    /// the caller decides when to `upload()`.
    pub fn select(&self, file: SelectedFile) -> Result<(), UploadError> {
        if let Some(message) = validate(&file) {
            let mut state = self.state.lock().unwrap();
            *state = UploadState {
                error: Some(message.clone()),
                ..UploadState::default()
            };
            return Err(UploadError::Validation(message));
        }

        let mut state = self.state.lock().unwrap();
        *state = UploadState {
            file: Some(file),
            ..UploadState::default()
        };
        Ok(())
    }

    /// Runs the two-phase upload for the selected file and returns the
    /// assigned remote identifier.
    pub async fn upload(&self) -> Result<String, UploadError> {
        let file = {
            let mut state = self.state.lock().unwrap();
            match state.file.clone() {
                Some(file) => {
                    state.is_uploading = true;
                    state.error = None;
                    state.progress = 0;
                    file
                }
                None => {
                    state.error = Some(UploadError::NoFileSelected.to_string());
                    return Err(UploadError::NoFileSelected);
                }
            }
        };

        self.abort.reset();

        match self.run_upload(&file).await {
            Ok(resume_id) => {
                info!("Upload complete: {} -> {resume_id}", file.name);
                let mut state = self.state.lock().unwrap();
                state.is_uploading = false;
                state.progress = 100;
                state.resume_id = Some(resume_id.clone());
                Ok(resume_id)
            }
            Err(_) if self.abort.is_aborted() => {
                // User abort is a reset, not a retained failure.
                let mut state = self.state.lock().unwrap();
                *state = UploadState {
                    error: Some(UploadError::Aborted.to_string()),
                    ..UploadState::default()
                };
                Err(UploadError::Aborted)
            }
            Err(e) => {
                let message = e.to_string();
                let mut state = self.state.lock().unwrap();
                state.is_uploading = false;
                state.progress = 0;
                state.error = Some(message.clone());
                // File retained so the user can retry.
                Err(UploadError::Transfer(message))
            }
        }
    }

    async fn run_upload(&self, file: &SelectedFile) -> anyhow::Result<String> {
        let presigned = self.service.initiate(&file.name, &file.mime_type).await?;
        if presigned.upload_url.is_empty() {
            anyhow::bail!("Failed to get upload URL from server");
        }

        let state = self.state.clone();
        let observer = self.on_progress.clone();
        let on_progress: ProgressFn = Arc::new(move |progress: UploadProgress| {
            {
                let mut state = state.lock().unwrap();
                // Monotone: a late-arriving lower report never rolls back.
                if progress.percentage > state.progress {
                    state.progress = progress.percentage;
                }
            }
            let observer = observer.lock().unwrap().clone();
            if let Some(observer) = observer {
                observer(progress);
            }
        });

        self.service
            .transfer(
                &presigned.upload_url,
                file.bytes.clone(),
                on_progress,
                self.abort.clone(),
            )
            .await?;

        let receipt = self
            .service
            .confirm(&presigned.resume_id, &presigned.file_key, &file.name, file.size())
            .await?;
        Ok(receipt.resume_id)
    }

    /// Aborts the active transfer, if any. Idempotent.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Best-effort remote deletion, then an unconditional reset to empty.
    pub async fn clear(&self) {
        let resume_id = self.state.lock().unwrap().resume_id.clone();
        if let Some(resume_id) = resume_id {
            if let Err(e) = self.service.delete(&resume_id).await {
                // Deletion is not on the critical path of any user flow.
                warn!("Failed to delete resume {resume_id}: {e}");
            }
        }
        *self.state.lock().unwrap() = UploadState::default();
    }

    /// Re-runs the upload with the retained file; `Ok(None)` when there is
    /// no file to retry with.
    pub async fn retry(&self) -> Result<Option<String>, UploadError> {
        if self.state.lock().unwrap().file.is_none() {
            return Ok(None);
        }
        self.upload().await.map(Some)
    }
}

fn validate(file: &SelectedFile) -> Option<String> {
    if !ACCEPTED_TYPES.contains(&file.mime_type.as_str()) {
        return Some("Please upload a PDF or DOCX file".to_string());
    }
    if file.size() > MAX_FILE_SIZE {
        return Some("File size must be less than 5MB".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::MockUploadService;
    use bytes::Bytes;

    fn pdf(size: usize) -> SelectedFile {
        SelectedFile::new("resume.pdf", "application/pdf", vec![0u8; size])
    }

    fn coordinator() -> (Arc<MockUploadService>, UploadCoordinator) {
        let service = Arc::new(MockUploadService::new());
        let coordinator = UploadCoordinator::new(service.clone());
        (service, coordinator)
    }

    #[tokio::test]
    async fn rejects_unsupported_mime_type_without_network_call() {
        let (service, coordinator) = coordinator();
        let file = SelectedFile::new("notes.txt", "text/plain", Bytes::from_static(b"hi"));

        let err = coordinator.select(file).unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));

        let state = coordinator.state();
        assert_eq!(state.error.as_deref(), Some("Please upload a PDF or DOCX file"));
        assert!(state.file.is_none());
        assert_eq!(service.initiate_call_count(), 0);
    }

    #[tokio::test]
    async fn rejects_oversized_file_and_clears_prior_selection() {
        let (service, coordinator) = coordinator();
        coordinator.select(pdf(1024)).unwrap();

        let err = coordinator.select(pdf(10 * 1024 * 1024)).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 5MB");

        let state = coordinator.state();
        assert!(state.file.is_none());
        assert_eq!(state.error.as_deref(), Some("File size must be less than 5MB"));
        assert_eq!(service.initiate_call_count(), 0);
    }

    #[tokio::test]
    async fn upload_without_selection_fails_fast() {
        let (_, coordinator) = coordinator();
        let err = coordinator.upload().await.unwrap_err();
        assert!(matches!(err, UploadError::NoFileSelected));
        assert_eq!(coordinator.state().error.as_deref(), Some("No file selected"));
    }

    #[tokio::test]
    async fn successful_upload_assigns_remote_id_and_full_progress() {
        let (_, coordinator) = coordinator();
        coordinator.select(pdf(1024 * 1024)).unwrap();

        let resume_id = coordinator.upload().await.unwrap();

        let state = coordinator.state();
        assert_eq!(state.resume_id.as_deref(), Some(resume_id.as_str()));
        assert_eq!(state.progress, 100);
        assert!(!state.is_uploading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn cancellation_resets_rather_than_retaining_a_failure() {
        let (_, coordinator) = coordinator();
        coordinator.select(pdf(1024 * 1024)).unwrap();

        // Trip the abort from inside the first progress report.
        let canceller = coordinator.clone();
        coordinator.set_on_progress(Arc::new(move |_| canceller.cancel()));

        let err = coordinator.upload().await.unwrap_err();
        assert!(matches!(err, UploadError::Aborted));

        let state = coordinator.state();
        assert!(state.file.is_none());
        assert_eq!(state.error.as_deref(), Some("Upload cancelled"));
        assert_eq!(state.progress, 0);
        assert!(!state.is_uploading);
    }

    #[tokio::test]
    async fn transfer_failure_retains_file_and_permits_retry() {
        let (service, coordinator) = coordinator();
        coordinator.select(pdf(2048)).unwrap();

        service.fail_transfers(true);
        let err = coordinator.upload().await.unwrap_err();
        assert!(matches!(err, UploadError::Transfer(_)));

        let state = coordinator.state();
        assert!(state.file.is_some());
        assert_eq!(state.error.as_deref(), Some("Network error during transfer"));

        service.fail_transfers(false);
        let retried = coordinator.retry().await.unwrap();
        assert!(retried.is_some());
        assert_eq!(coordinator.state().resume_id, retried);
    }

    #[tokio::test]
    async fn retry_without_file_is_a_no_op() {
        let (_, coordinator) = coordinator();
        assert!(coordinator.retry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_requests_remote_deletion_and_resets() {
        let (service, coordinator) = coordinator();
        coordinator.select(pdf(2048)).unwrap();
        let resume_id = coordinator.upload().await.unwrap();

        coordinator.clear().await;

        assert_eq!(service.deleted_ids(), vec![resume_id]);
        let state = coordinator.state();
        assert!(state.file.is_none());
        assert!(state.resume_id.is_none());
        assert_eq!(state.progress, 0);
    }
}
