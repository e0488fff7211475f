use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file the user picked, held locally until `upload()` is called.
/// Selection is decoupled from network action so a multi-file form can be
/// validated before any transfer starts.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Transfer progress for one upload. Reported per measurable chunk;
/// percentages are non-decreasing and the final report is exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    pub percentage: u8,
}

impl UploadProgress {
    pub fn at(loaded: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((loaded * 100) / total).min(100) as u8
        };
        Self {
            loaded,
            total,
            percentage,
        }
    }
}

/// Server-issued upload target: where to PUT the bytes, plus the document
/// identifier assigned ahead of the transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub file_key: String,
    pub resume_id: String,
}

/// Confirmation record returned once the backend has acknowledged the bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub resume_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
}
