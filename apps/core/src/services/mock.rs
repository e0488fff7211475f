//! In-memory service fakes mirroring the backend contract.
//!
//! These back the integration tests and demo wiring: a seeded resume,
//! a version-history window of the 5 most recent versions (oldest evicted
//! first), canned enhancement rewrites, and scriptable job status sequences.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::UploadError;
use crate::models::resume::{EditRequest, ResumeSection, ResumeVersion, SectionKind};
use crate::models::tailoring::{
    TailoringOutcome, TailoringRequest, TailoringState, TailoringStatus, VersionSummary,
};
use crate::models::upload::{PresignedUpload, UploadProgress, UploadReceipt};
use crate::services::{AbortSignal, ProgressFn, ResumeService, TailoringService, UploadService};

/// Version-history window kept per document, oldest evicted first.
const HISTORY_WINDOW: usize = 5;

const TRANSFER_CHUNK: usize = 64 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Uploads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockUploadService {
    latency: Duration,
    fail_transfer: AtomicBool,
    initiate_calls: AtomicU32,
    deleted: Mutex<Vec<String>>,
}

impl MockUploadService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-chunk delay, useful for exercising cancellation windows.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the next transfers fail with a network-style error.
    pub fn fail_transfers(&self, fail: bool) {
        self.fail_transfer.store(fail, Ordering::SeqCst);
    }

    pub fn initiate_call_count(&self) -> u32 {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadService for MockUploadService {
    async fn initiate(&self, _file_name: &str, _mime_type: &str) -> Result<PresignedUpload> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        let resume_id = format!("resume-{}", Uuid::new_v4());
        Ok(PresignedUpload {
            upload_url: format!("mock://uploads/{resume_id}"),
            file_key: format!("uploads/{resume_id}.bin"),
            resume_id,
        })
    }

    async fn transfer(
        &self,
        _upload_url: &str,
        bytes: Bytes,
        on_progress: ProgressFn,
        abort: AbortSignal,
    ) -> Result<()> {
        let total = bytes.len() as u64;
        if bytes.is_empty() {
            on_progress(UploadProgress::at(0, 0));
            return Ok(());
        }

        let mut offset = 0usize;
        while offset < bytes.len() {
            if abort.is_aborted() {
                return Err(UploadError::Aborted.into());
            }
            if self.fail_transfer.load(Ordering::SeqCst) {
                anyhow::bail!("Network error during transfer");
            }
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            tokio::task::yield_now().await;

            let end = (offset + TRANSFER_CHUNK).min(bytes.len());
            on_progress(UploadProgress::at(end as u64, total));
            offset = end;
        }
        Ok(())
    }

    async fn confirm(
        &self,
        resume_id: &str,
        _file_key: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadReceipt> {
        Ok(UploadReceipt {
            resume_id: resume_id.to_string(),
            file_name: file_name.to_string(),
            file_size,
            uploaded_at: Utc::now(),
        })
    }

    async fn delete(&self, resume_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(resume_id.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tailoring jobs
// ────────────────────────────────────────────────────────────────────────────

/// Scriptable tailoring backend. `status()` consumes the script front to
/// back and repeats the final entry once the script is exhausted.
#[derive(Default)]
pub struct MockTailoringService {
    script: Mutex<VecDeque<TailoringStatus>>,
    started: Mutex<Vec<TailoringRequest>>,
    cancelled: Mutex<Vec<String>>,
    status_calls: AtomicU32,
    result_calls: AtomicU32,
    fail_start: AtomicBool,
}

impl MockTailoringService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(statuses: Vec<TailoringStatus>) -> Self {
        Self {
            script: Mutex::new(statuses.into()),
            ..Self::default()
        }
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn status_call_count(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn result_call_count(&self) -> u32 {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub fn started_requests(&self) -> Vec<TailoringRequest> {
        self.started.lock().unwrap().clone()
    }

    pub fn cancelled_ids(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl TailoringService for MockTailoringService {
    async fn start(&self, request: &TailoringRequest) -> Result<TailoringOutcome> {
        if self.fail_start.load(Ordering::SeqCst) {
            anyhow::bail!("Failed to start tailoring");
        }
        self.started.lock().unwrap().push(request.clone());
        Ok(TailoringOutcome {
            tailoring_id: format!("tailoring-{}", Uuid::new_v4()),
            status: TailoringState::Processing,
            original_resume_id: request.resume_id.clone(),
            tailored_resume_id: None,
            tailored_versions: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        })
    }

    async fn status(&self, _tailoring_id: &str) -> Result<TailoringStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        match script.len() {
            0 => Ok(TailoringStatus::processing(50, "Tailoring in progress")),
            1 => Ok(script.front().cloned().unwrap()),
            _ => Ok(script.pop_front().unwrap()),
        }
    }

    async fn result(&self, tailoring_id: &str) -> Result<TailoringOutcome> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        let original = self
            .started
            .lock()
            .unwrap()
            .last()
            .map(|r| r.resume_id.clone())
            .unwrap_or_default();
        Ok(TailoringOutcome {
            tailoring_id: tailoring_id.to_string(),
            status: TailoringState::Completed,
            original_resume_id: original.clone(),
            tailored_resume_id: Some(format!("tailored-{original}")),
            tailored_versions: vec![VersionSummary {
                version_id: format!("version-{}", Uuid::new_v4()),
                version_number: 1,
                created_at: Utc::now(),
                changes: 7,
            }],
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error: None,
        })
    }

    async fn cancel(&self, tailoring_id: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(tailoring_id.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resume documents
// ────────────────────────────────────────────────────────────────────────────

pub const SEEDED_RESUME_ID: &str = "test-resume-id";

fn seeded_version() -> ResumeVersion {
    ResumeVersion {
        id: "resume-v1".to_string(),
        version: 1,
        created_at: Utc::now(),
        is_active: true,
        edit_count: 0,
        sections: vec![
            ResumeSection {
                id: "header-1".to_string(),
                kind: SectionKind::Header,
                content: "John Doe\nSoftware Engineer\njohn.doe@email.com | (555) 123-4567"
                    .to_string(),
                is_editable: false,
            },
            ResumeSection {
                id: "summary-1".to_string(),
                kind: SectionKind::Summary,
                content: "Experienced software engineer with 5+ years developing scalable web \
                          applications. Proficient in React, Node.js, and cloud technologies."
                    .to_string(),
                is_editable: true,
            },
            ResumeSection {
                id: "exp-1".to_string(),
                kind: SectionKind::Experience,
                content: "• Led development of microservices architecture serving 1M+ users\n\
                          • Implemented CI/CD pipeline reducing deployment time by 60%\n\
                          • Mentored junior developers and conducted code reviews"
                    .to_string(),
                is_editable: true,
            },
            ResumeSection {
                id: "skills-1".to_string(),
                kind: SectionKind::Skills,
                content: "JavaScript, TypeScript, React, Node.js, AWS, Docker, PostgreSQL, Redis"
                    .to_string(),
                is_editable: true,
            },
        ],
    }
}

pub struct MockResumeService {
    versions: Mutex<HashMap<String, Vec<ResumeVersion>>>,
    current: Mutex<HashMap<String, ResumeVersion>>,
    saved_edits: Mutex<Vec<EditRequest>>,
    events: Mutex<Vec<&'static str>>,
    latency: Duration,
}

impl Default for MockResumeService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResumeService {
    pub fn new() -> Self {
        let seed = seeded_version();
        let mut versions = HashMap::new();
        versions.insert(SEEDED_RESUME_ID.to_string(), vec![seed.clone()]);
        let mut current = HashMap::new();
        current.insert(SEEDED_RESUME_ID.to_string(), seed);
        Self {
            versions: Mutex::new(versions),
            current: Mutex::new(current),
            saved_edits: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Per-call delay on `enhance` and `save_edit`, useful for exercising
    /// the single-mutation-in-flight guard.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    pub fn saved_edits(&self) -> Vec<EditRequest> {
        self.saved_edits.lock().unwrap().clone()
    }

    /// Call order log ("enhance" / "save_edit"), for ordering assertions.
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResumeService for MockResumeService {
    async fn content(&self, resume_id: &str) -> Result<ResumeVersion> {
        self.current
            .lock()
            .unwrap()
            .get(resume_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Resume {resume_id} not found"))
    }

    async fn history(&self, resume_id: &str) -> Result<Vec<ResumeVersion>> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .get(resume_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_edit(&self, resume_id: &str, edit: &EditRequest) -> Result<ResumeVersion> {
        self.simulate_latency().await;
        self.events.lock().unwrap().push("save_edit");
        self.saved_edits.lock().unwrap().push(edit.clone());

        let mut current = self.current.lock().unwrap();
        let previous = current
            .get(resume_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Resume {resume_id} not found"))?;

        let next = ResumeVersion {
            id: format!("resume-v{}", previous.version + 1),
            version: previous.version + 1,
            created_at: Utc::now(),
            is_active: true,
            edit_count: previous.edit_count + 1,
            sections: previous
                .sections
                .iter()
                .map(|section| {
                    if section.id == edit.section_id {
                        ResumeSection {
                            content: edit.new_text.clone(),
                            ..section.clone()
                        }
                    } else {
                        section.clone()
                    }
                })
                .collect(),
        };

        let mut versions = self.versions.lock().unwrap();
        let history = versions.entry(resume_id.to_string()).or_default();
        history.push(next.clone());
        if history.len() > HISTORY_WINDOW {
            history.remove(0);
        }
        current.insert(resume_id.to_string(), next.clone());

        Ok(next)
    }

    async fn revert(&self, resume_id: &str, version_id: &str) -> Result<ResumeVersion> {
        let versions = self.versions.lock().unwrap();
        let version = versions
            .get(resume_id)
            .and_then(|history| history.iter().find(|v| v.id == version_id))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Version not found"))?;
        drop(versions);

        self.current
            .lock()
            .unwrap()
            .insert(resume_id.to_string(), version.clone());
        Ok(version)
    }

    async fn enhance(&self, text: &str, prompt: &str) -> Result<String> {
        self.simulate_latency().await;
        self.events.lock().unwrap().push("enhance");
        Ok(match prompt.to_lowercase().as_str() {
            "more impactful" => text
                .replace("Led", "Spearheaded")
                .replace("Implemented", "Architected"),
            "quantify" => text
                .replace("users", "2M+ users")
                .replace("reducing", "reducing by 75%"),
            "action verbs" => text
                .replace("Proficient", "Expert")
                .replace("Experienced", "Accomplished"),
            _ => text.replace('.', ", driving significant business impact."),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn edit(section_id: &str, new_text: &str) -> EditRequest {
        EditRequest {
            section_id: section_id.to_string(),
            original_text: String::new(),
            new_text: new_text.to_string(),
            prompt: None,
        }
    }

    #[tokio::test]
    async fn save_edit_bumps_version_and_edit_count() {
        let service = MockResumeService::new();
        let v2 = service
            .save_edit(SEEDED_RESUME_ID, &edit("summary-1", "Rewritten"))
            .await
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.edit_count, 1);
        assert_eq!(v2.section("summary-1").unwrap().content, "Rewritten");
    }

    #[tokio::test]
    async fn history_keeps_only_the_most_recent_window() {
        let service = MockResumeService::new();
        for i in 0..6 {
            service
                .save_edit(SEEDED_RESUME_ID, &edit("summary-1", &format!("text {i}")))
                .await
                .unwrap();
        }
        let history = service.history(SEEDED_RESUME_ID).await.unwrap();
        assert_eq!(history.len(), HISTORY_WINDOW);
        // v1 and v2 evicted, most recent retained.
        assert_eq!(history.first().unwrap().version, 3);
        assert_eq!(history.last().unwrap().version, 7);
    }

    #[tokio::test]
    async fn transfer_reports_monotone_progress_with_single_terminal_tick() {
        let service = MockUploadService::new();
        let reports: Arc<Mutex<Vec<UploadProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let on_progress: ProgressFn = Arc::new(move |p| sink.lock().unwrap().push(p));

        service
            .transfer(
                "mock://uploads/x",
                Bytes::from(vec![0u8; 300 * 1024]),
                on_progress,
                AbortSignal::new(),
            )
            .await
            .unwrap();

        let reports = reports.lock().unwrap();
        assert!(reports.windows(2).all(|w| w[0].percentage <= w[1].percentage));
        assert_eq!(reports.iter().filter(|p| p.percentage == 100).count(), 1);
        assert_eq!(reports.last().unwrap().percentage, 100);
    }
}
