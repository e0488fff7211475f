//! Production implementations of the backend service traits over [`ApiClient`].

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use crate::errors::UploadError;
use crate::models::resume::{EditRequest, ResumeVersion};
use crate::models::tailoring::{TailoringOutcome, TailoringRequest, TailoringStatus};
use crate::models::upload::{PresignedUpload, UploadProgress, UploadReceipt};
use crate::services::api_client::{from_enveloped_or_plain, ApiClient};
use crate::services::{AbortSignal, ProgressFn, ResumeService, TailoringService, UploadService};

/// Transfer chunk size. Each produced chunk triggers one progress report.
const CHUNK_SIZE: usize = 64 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Uploads
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpUploadService {
    api: ApiClient,
}

impl HttpUploadService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UploadService for HttpUploadService {
    async fn initiate(&self, file_name: &str, mime_type: &str) -> Result<PresignedUpload> {
        let presigned: PresignedUpload = self
            .api
            .post_enveloped(
                "/api/upload/presigned-url",
                &json!({ "fileName": file_name, "fileType": mime_type }),
            )
            .await?;
        Ok(presigned)
    }

    async fn transfer(
        &self,
        upload_url: &str,
        bytes: Bytes,
        on_progress: ProgressFn,
        abort: AbortSignal,
    ) -> Result<()> {
        let total = bytes.len() as u64;

        if bytes.is_empty() {
            // Nothing to stream; still report the single terminal tick.
            on_progress(UploadProgress::at(0, 0));
        }

        let stream = futures::stream::unfold(0usize, move |offset| {
            let bytes = bytes.clone();
            let abort = abort.clone();
            let on_progress = on_progress.clone();
            async move {
                if offset >= bytes.len() {
                    return None;
                }
                if abort.is_aborted() {
                    let err = std::io::Error::new(
                        std::io::ErrorKind::Interrupted,
                        UploadError::Aborted.to_string(),
                    );
                    return Some((Err(err), bytes.len()));
                }
                let end = (offset + CHUNK_SIZE).min(bytes.len());
                let chunk = bytes.slice(offset..end);
                on_progress(UploadProgress::at(end as u64, total));
                Some((Ok::<Bytes, std::io::Error>(chunk), end))
            }
        });

        let response = self
            .api
            .http()
            .put(upload_url)
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Upload transfer failed with status {}", response.status());
        }
        Ok(())
    }

    async fn confirm(
        &self,
        resume_id: &str,
        file_key: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadReceipt> {
        let receipt: UploadReceipt = self
            .api
            .post_enveloped(
                "/api/upload/confirm",
                &json!({
                    "resumeId": resume_id,
                    "fileKey": file_key,
                    "fileName": file_name,
                    "fileSize": file_size,
                }),
            )
            .await?;
        Ok(receipt)
    }

    async fn delete(&self, resume_id: &str) -> Result<()> {
        self.api.delete(&format!("/api/resume/{resume_id}")).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tailoring jobs
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpTailoringService {
    api: ApiClient,
}

impl HttpTailoringService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TailoringService for HttpTailoringService {
    async fn start(&self, request: &TailoringRequest) -> Result<TailoringOutcome> {
        // The start endpoint sometimes answers bare, sometimes enveloped.
        let value = self.api.post_value("/api/tailoring/start", request).await?;
        Ok(from_enveloped_or_plain(value)?)
    }

    async fn status(&self, tailoring_id: &str) -> Result<TailoringStatus> {
        let status: TailoringStatus = self
            .api
            .get_enveloped(&format!("/api/tailoring/{tailoring_id}/status"))
            .await?;
        Ok(status)
    }

    async fn result(&self, tailoring_id: &str) -> Result<TailoringOutcome> {
        let outcome: TailoringOutcome = self
            .api
            .get_enveloped(&format!("/api/tailoring/{tailoring_id}"))
            .await?;
        Ok(outcome)
    }

    async fn cancel(&self, tailoring_id: &str) -> Result<()> {
        self.api
            .post_value(&format!("/api/tailoring/{tailoring_id}/cancel"), &json!({}))
            .await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resume documents
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpResumeService {
    api: ApiClient,
}

impl HttpResumeService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceResponse {
    enhanced_text: String,
}

#[async_trait]
impl ResumeService for HttpResumeService {
    async fn content(&self, resume_id: &str) -> Result<ResumeVersion> {
        let version: ResumeVersion = self
            .api
            .get_enveloped(&format!("/api/resume/{resume_id}/content"))
            .await?;
        Ok(version)
    }

    async fn history(&self, resume_id: &str) -> Result<Vec<ResumeVersion>> {
        let versions: Vec<ResumeVersion> = self
            .api
            .get_enveloped(&format!("/api/resume/{resume_id}/versions"))
            .await?;
        Ok(versions)
    }

    async fn save_edit(&self, resume_id: &str, edit: &EditRequest) -> Result<ResumeVersion> {
        let version: ResumeVersion = self
            .api
            .post_enveloped(&format!("/api/resume/{resume_id}/edit"), edit)
            .await?;
        Ok(version)
    }

    async fn revert(&self, resume_id: &str, version_id: &str) -> Result<ResumeVersion> {
        let version: ResumeVersion = self
            .api
            .post_enveloped(
                &format!("/api/resume/{resume_id}/revert"),
                &json!({ "versionId": version_id }),
            )
            .await?;
        Ok(version)
    }

    async fn enhance(&self, text: &str, prompt: &str) -> Result<String> {
        let response: EnhanceResponse = self
            .api
            .post_enveloped("/api/enhance", &json!({ "text": text, "prompt": prompt }))
            .await?;
        Ok(response.enhanced_text)
    }
}
