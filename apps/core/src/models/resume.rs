use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic type of a resume section. Header sections are not editable
/// by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Header,
    Experience,
    Education,
    Skills,
    Summary,
}

/// An addressable, independently editable unit of the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSection {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub content: String,
    pub is_editable: bool,
}

/// An immutable snapshot of all sections at a point in edit history.
/// The document is always viewed through its current version; version
/// numbers increase by exactly 1 per saved edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeVersion {
    pub id: String,
    pub version: u32,
    pub sections: Vec<ResumeSection>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub edit_count: u32,
}

impl ResumeVersion {
    pub fn section(&self, section_id: &str) -> Option<&ResumeSection> {
        self.sections.iter().find(|s| s.id == section_id)
    }
}

/// A single text-replacement edit, consumed by one save operation.
/// `original_text` is the section content captured *before* the edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub section_id: String,
    pub original_text: String,
    pub new_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Appended on every successful save; the last item is the unit of undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryItem {
    pub id: String,
    pub section_id: String,
    pub old_text: String,
    pub new_text: String,
    pub timestamp: DateTime<Utc>,
}
