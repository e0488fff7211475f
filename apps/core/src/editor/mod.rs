//! Edit Session — the currently displayed resume version, its history, and
//! the edit pipeline.
//!
//! One mutating call (`submit_edit`, `undo`, `select_version`) may be in
//! flight at a time; a second concurrent call is rejected with
//! [`EditError::Busy`] rather than queued. The guard lives here at the
//! service layer — UI disabling alone cannot stop a programmatic caller
//! from racing two saves against the same version.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::EditError;
use crate::models::resume::{EditHistoryItem, EditRequest, ResumeVersion};
use crate::services::ResumeService;

/// Observable state of the session.
#[derive(Debug, Clone, Default)]
pub struct EditorSnapshot {
    pub resume_id: Option<String>,
    pub current: Option<ResumeVersion>,
    pub versions: Vec<ResumeVersion>,
    pub history: Vec<EditHistoryItem>,
    pub selected_section_id: Option<String>,
    pub prompt: String,
    pub is_loading: bool,
    pub is_processing: bool,
    pub error: Option<String>,
}

impl EditorSnapshot {
    pub fn edit_count(&self) -> u32 {
        self.current.as_ref().map(|v| v.edit_count).unwrap_or(0)
    }
}

pub struct EditSession {
    service: Arc<dyn ResumeService>,
    state: Mutex<EditorSnapshot>,
    in_flight: AtomicBool,
}

impl EditSession {
    pub fn new(service: Arc<dyn ResumeService>) -> Self {
        Self {
            service,
            state: Mutex::new(EditorSnapshot::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        self.state.lock().unwrap().clone()
    }

    /// Fetches the document and its version history.
    pub async fn load(&self, resume_id: &str) -> Result<(), EditError> {
        {
            let mut state = self.state.lock().unwrap();
            state.resume_id = Some(resume_id.to_string());
            state.is_loading = true;
            state.error = None;
        }

        let loaded = self.service.content(resume_id).await;
        let mut state = self.state.lock().unwrap();
        state.is_loading = false;
        match loaded {
            Ok(version) => {
                state.current = Some(version);
                state.error = None;
            }
            Err(e) => {
                state.error = Some("Failed to load resume content".to_string());
                return Err(EditError::Load(e.to_string()));
            }
        }
        drop(state);

        self.refresh_history(resume_id).await;
        Ok(())
    }

    /// Sets the active section and discards any unsubmitted prompt text —
    /// edits are scoped per selection.
    pub fn select_section(&self, section_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.selected_section_id = Some(section_id.to_string());
        state.prompt.clear();
    }

    pub fn set_prompt(&self, prompt: &str) {
        self.state.lock().unwrap().prompt = prompt.to_string();
    }

    /// Applies an edit to the selected section.
    ///
    /// With a prompt, the text is enhanced first and the *enhanced* string is
    /// what gets saved. The save carries the section content captured before
    /// this edit, so undo can restore it. On success the selection clears and
    /// the version history is re-fetched.
    pub async fn submit_edit(
        &self,
        new_text: &str,
        prompt: Option<&str>,
    ) -> Result<ResumeVersion, EditError> {
        let _guard = self.begin()?;

        let (resume_id, section_id, original_text) = {
            let state = self.state.lock().unwrap();
            let resume_id = state.resume_id.clone().ok_or(EditError::NoDocument)?;
            let current = state.current.as_ref().ok_or(EditError::NoDocument)?;
            let section_id = state
                .selected_section_id
                .clone()
                .ok_or(EditError::NoSelection)?;
            let section = current
                .section(&section_id)
                .ok_or(EditError::SectionNotFound)?;
            if !section.is_editable {
                return Err(EditError::SectionNotEditable);
            }
            (resume_id, section_id, section.content.clone())
        };

        // Enhancement must fully resolve before the save begins: the saved
        // content depends on it.
        let final_text = match prompt {
            Some(p) if !p.trim().is_empty() => {
                self.service.enhance(new_text, p).await.map_err(|e| {
                    self.store_error("Failed to enhance text");
                    EditError::Enhance(e.to_string())
                })?
            }
            _ => new_text.to_string(),
        };

        let edit = EditRequest {
            section_id: section_id.clone(),
            original_text: original_text.clone(),
            new_text: final_text.clone(),
            prompt: prompt.map(str::to_string),
        };

        let updated = self.service.save_edit(&resume_id, &edit).await.map_err(|e| {
            self.store_error("Failed to save edit");
            EditError::Save(e.to_string())
        })?;

        info!("Saved edit to section {section_id}: now at version {}", updated.version);
        {
            let mut state = self.state.lock().unwrap();
            state.current = Some(updated.clone());
            state.history.push(EditHistoryItem {
                id: format!("edit-{}", Uuid::new_v4()),
                section_id,
                old_text: original_text,
                new_text: final_text,
                timestamp: Utc::now(),
            });
            // A completed edit deselects.
            state.selected_section_id = None;
            state.prompt.clear();
            state.error = None;
        }

        self.refresh_history(&resume_id).await;
        Ok(updated)
    }

    /// Makes an earlier version current again. Reverting is additive: the
    /// local edit-history stack is untouched and later versions remain.
    pub async fn select_version(&self, version_id: &str) -> Result<ResumeVersion, EditError> {
        let _guard = self.begin()?;

        let resume_id = {
            let mut state = self.state.lock().unwrap();
            let resume_id = state.resume_id.clone().ok_or(EditError::NoDocument)?;
            state.is_loading = true;
            resume_id
        };

        let reverted = self.service.revert(&resume_id, version_id).await;
        let version = {
            let mut state = self.state.lock().unwrap();
            state.is_loading = false;
            match reverted {
                Ok(version) => {
                    state.current = Some(version.clone());
                    state.error = None;
                    version
                }
                Err(e) => {
                    state.error = Some("Failed to load version".to_string());
                    return Err(EditError::Load(e.to_string()));
                }
            }
        };

        self.refresh_history(&resume_id).await;
        Ok(version)
    }

    /// Reverses the most recent edit by saving it back with old/new swapped.
    /// The version counter keeps increasing — undo produces a new forward
    /// version rather than deleting the prior one.
    pub async fn undo(&self) -> Result<ResumeVersion, EditError> {
        let _guard = self.begin()?;

        let (resume_id, last) = {
            let state = self.state.lock().unwrap();
            let resume_id = state.resume_id.clone().ok_or(EditError::NoDocument)?;
            let last = state.history.last().cloned().ok_or(EditError::NothingToUndo)?;
            (resume_id, last)
        };

        let edit = EditRequest {
            section_id: last.section_id.clone(),
            original_text: last.new_text.clone(),
            new_text: last.old_text.clone(),
            prompt: None,
        };

        let updated = self.service.save_edit(&resume_id, &edit).await.map_err(|e| {
            self.store_error("Failed to undo edit");
            EditError::Save(e.to_string())
        })?;

        info!("Undid edit to section {}: now at version {}", last.section_id, updated.version);
        {
            let mut state = self.state.lock().unwrap();
            state.current = Some(updated.clone());
            state.history.pop();
            state.error = None;
        }

        self.refresh_history(&resume_id).await;
        Ok(updated)
    }

    /// Re-fetches both the current content and the version list.
    pub async fn refresh(&self) -> Result<(), EditError> {
        let resume_id = self
            .state
            .lock()
            .unwrap()
            .resume_id
            .clone()
            .ok_or(EditError::NoDocument)?;
        self.load(&resume_id).await
    }

    /// Version history is a re-fetch, not an incremental patch. Failures are
    /// logged only — the edit itself already succeeded.
    async fn refresh_history(&self, resume_id: &str) {
        match self.service.history(resume_id).await {
            Ok(versions) => self.state.lock().unwrap().versions = versions,
            Err(e) => warn!("Failed to refresh version history for {resume_id}: {e}"),
        }
    }

    fn store_error(&self, message: &str) {
        self.state.lock().unwrap().error = Some(message.to_string());
    }

    fn begin(&self) -> Result<ProcessingGuard<'_>, EditError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EditError::Busy);
        }
        self.state.lock().unwrap().is_processing = true;
        Ok(ProcessingGuard { session: self })
    }
}

struct ProcessingGuard<'a> {
    session: &'a EditSession,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.session.state.lock().unwrap().is_processing = false;
        self.session.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::{MockResumeService, SEEDED_RESUME_ID};
    use std::time::Duration;

    async fn loaded_session() -> (Arc<MockResumeService>, EditSession) {
        let service = Arc::new(MockResumeService::new());
        let session = EditSession::new(service.clone());
        session.load(SEEDED_RESUME_ID).await.unwrap();
        (service, session)
    }

    #[tokio::test]
    async fn load_fetches_content_and_history() {
        let (_, session) = loaded_session().await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.current.as_ref().unwrap().version, 1);
        assert_eq!(snapshot.versions.len(), 1);
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn selecting_a_section_clears_the_pending_prompt() {
        let (_, session) = loaded_session().await;
        session.select_section("summary-1");
        session.set_prompt("make it shine");
        session.select_section("exp-1");
        assert_eq!(session.snapshot().prompt, "");
        assert_eq!(
            session.snapshot().selected_section_id.as_deref(),
            Some("exp-1")
        );
    }

    #[tokio::test]
    async fn submit_without_selection_is_rejected() {
        let (_, session) = loaded_session().await;
        let err = session.submit_edit("New text", None).await.unwrap_err();
        assert!(matches!(err, EditError::NoSelection));
    }

    #[tokio::test]
    async fn header_sections_are_not_editable() {
        let (_, session) = loaded_session().await;
        session.select_section("header-1");
        let err = session.submit_edit("Jane Doe", None).await.unwrap_err();
        assert!(matches!(err, EditError::SectionNotEditable));
    }

    #[tokio::test]
    async fn successful_edit_bumps_version_and_clears_selection() {
        let (_, session) = loaded_session().await;
        session.select_section("summary-1");

        let updated = session.submit_edit("A sharper summary.", None).await.unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.edit_count, 1);
        let snapshot = session.snapshot();
        assert!(snapshot.selected_section_id.is_none());
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.versions.len(), 2);
        assert!(!snapshot.is_processing);
    }

    #[tokio::test]
    async fn enhancement_resolves_before_save_and_its_output_is_saved() {
        let (service, session) = loaded_session().await;
        session.select_section("exp-1");

        session
            .submit_edit("Scaled the platform, serving users worldwide", Some("quantify"))
            .await
            .unwrap();

        assert_eq!(service.events(), vec!["enhance", "save_edit"]);
        let saved = service.saved_edits();
        assert_eq!(
            saved[0].new_text,
            "Scaled the platform, serving 2M+ users worldwide"
        );
        let snapshot = session.snapshot();
        assert_eq!(
            snapshot.current.unwrap().section("exp-1").unwrap().content,
            "Scaled the platform, serving 2M+ users worldwide"
        );
    }

    #[tokio::test]
    async fn undo_swaps_old_and_new_and_restores_history_length() {
        let (service, session) = loaded_session().await;
        let original = session
            .snapshot()
            .current
            .unwrap()
            .section("summary-1")
            .unwrap()
            .content
            .clone();

        session.select_section("summary-1");
        session.submit_edit("Completely new summary.", None).await.unwrap();
        assert_eq!(session.snapshot().history.len(), 1);

        let undone = session.undo().await.unwrap();

        let saved = service.saved_edits();
        let undo_save = saved.last().unwrap();
        assert_eq!(undo_save.original_text, "Completely new summary.");
        assert_eq!(undo_save.new_text, original);
        assert_eq!(undone.version, 3); // undo is a new forward version
        assert_eq!(session.snapshot().history.len(), 0);
    }

    #[tokio::test]
    async fn undo_with_empty_history_is_rejected() {
        let (_, session) = loaded_session().await;
        let err = session.undo().await.unwrap_err();
        assert!(matches!(err, EditError::NothingToUndo));
    }

    #[tokio::test]
    async fn revert_keeps_history_and_later_versions() {
        let (_, session) = loaded_session().await;
        session.select_section("summary-1");
        session.submit_edit("Second version.", None).await.unwrap();
        session.select_section("summary-1");
        session.submit_edit("Third version.", None).await.unwrap();

        let reverted = session.select_version("resume-v2").await.unwrap();

        assert_eq!(reverted.version, 2);
        let snapshot = session.snapshot();
        // Additive policy: the edit stack survives and v3 is still listed.
        assert_eq!(snapshot.history.len(), 2);
        assert!(snapshot.versions.iter().any(|v| v.version == 3));
        assert_eq!(snapshot.current.unwrap().version, 2);
    }

    #[tokio::test]
    async fn second_concurrent_edit_is_rejected() {
        let service = Arc::new(MockResumeService::new().with_latency(Duration::from_millis(20)));
        let session = Arc::new(EditSession::new(service.clone()));
        session.load(SEEDED_RESUME_ID).await.unwrap();
        session.select_section("summary-1");

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit_edit("First edit.", None).await })
        };
        tokio::task::yield_now().await;

        // The spawned edit holds the in-flight guard across its await points.
        let err = session.undo().await.unwrap_err();
        assert!(matches!(err, EditError::Busy));

        first.await.unwrap().unwrap();
        assert!(!session.snapshot().is_processing);

        // Guard released: mutations are accepted again.
        session.undo().await.unwrap();
    }
}
