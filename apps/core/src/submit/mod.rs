//! Submission Orchestrator — from "files + text" to a started tailoring job.
//!
//! Sequence: validate the form, upload the resume, upload the optional work
//! history, then hand both ids plus the job description to the poller. The
//! first failing step aborts the rest and surfaces its error; uploads that
//! already completed are left in place (cleanup is the user's explicit
//! `clear()`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::errors::SubmitError;
use crate::models::tailoring::TailoringRequest;
use crate::services::UploadService;
use crate::tailoring::JobPoller;
use crate::upload::UploadCoordinator;

/// Minimum job-description length after trimming.
pub const MIN_JOB_DESCRIPTION_LEN: usize = 50;

pub struct SubmissionOrchestrator {
    resume: UploadCoordinator,
    work_history: UploadCoordinator,
    poller: Arc<JobPoller>,
    submitting: AtomicBool,
    error: Mutex<Option<String>>,
}

impl SubmissionOrchestrator {
    pub fn new(upload_service: Arc<dyn UploadService>, poller: Arc<JobPoller>) -> Self {
        Self {
            resume: UploadCoordinator::new(upload_service.clone()),
            work_history: UploadCoordinator::new(upload_service),
            poller,
            submitting: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    /// The required resume slot.
    pub fn resume_upload(&self) -> &UploadCoordinator {
        &self.resume
    }

    /// The optional work-history slot.
    pub fn work_history_upload(&self) -> &UploadCoordinator {
        &self.work_history
    }

    pub fn poller(&self) -> &Arc<JobPoller> {
        &self.poller
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    fn validate(&self, job_description: &str) -> Result<(), SubmitError> {
        if self.resume.state().file.is_none() {
            return Err(SubmitError::Validation("Resume is required".to_string()));
        }
        let trimmed = job_description.trim();
        if trimmed.is_empty() {
            return Err(SubmitError::Validation(
                "Job description is required".to_string(),
            ));
        }
        if trimmed.len() < MIN_JOB_DESCRIPTION_LEN {
            return Err(SubmitError::Validation(
                "Job description must be at least 50 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Runs the full submission sequence. Files already uploaded are not
    /// re-uploaded; their assigned ids are reused.
    pub async fn submit(&self, job_description: &str) -> Result<(), SubmitError> {
        let result = self.run_submit(job_description).await;
        *self.error.lock().unwrap() = result.as_ref().err().map(|e| e.to_string());
        result
    }

    async fn run_submit(&self, job_description: &str) -> Result<(), SubmitError> {
        self.validate(job_description)?;

        if self.submitting.swap(true, Ordering::SeqCst) {
            return Err(SubmitError::Validation(
                "A submission is already in progress".to_string(),
            ));
        }
        let _guard = SubmitGuard(&self.submitting);

        let resume_id = match self.resume.state().resume_id {
            Some(id) => id,
            None => self.resume.upload().await?,
        };

        let work_history_id = if self.work_history.state().file.is_some() {
            match self.work_history.state().resume_id {
                Some(id) => Some(id),
                None => Some(self.work_history.upload().await?),
            }
        } else {
            None
        };

        info!("Submitting tailoring request for resume {resume_id}");
        self.poller
            .start(TailoringRequest {
                resume_id,
                work_history_id,
                job_description: job_description.trim().to_string(),
            })
            .await?;
        Ok(())
    }

    /// Before job start this aborts whichever uploads are in flight; after,
    /// it delegates to the poller.
    pub async fn cancel(&self) {
        self.resume.cancel();
        self.work_history.cancel();
        self.poller.cancel().await;
    }
}

struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
