use thiserror::Error;

/// Upload lifecycle errors.
///
/// `Aborted` is deliberately distinct from `Transfer`: an abort resets the
/// coordinator to its empty state, while a transfer failure retains the
/// selected file so the user can retry.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("No file selected")]
    NoFileSelected,

    #[error("Upload cancelled")]
    Aborted,

    #[error("{0}")]
    Transfer(String),
}

/// Tailoring job lifecycle errors. All of them terminate the poller into
/// its failed phase; they differ only in where the failure originated.
#[derive(Debug, Error)]
pub enum TailoringError {
    #[error("{0}")]
    Start(String),

    #[error("{0}")]
    Poll(String),

    #[error("{0}")]
    Failed(String),

    #[error("Tailoring timed out")]
    TimedOut,
}

/// Edit session errors. A failed edit never discards the current version —
/// the attempted edit is simply not applied.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("No resume loaded")]
    NoDocument,

    #[error("No section selected")]
    NoSelection,

    #[error("Section not found")]
    SectionNotFound,

    #[error("Section is not editable")]
    SectionNotEditable,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Another edit is already in progress")]
    Busy,

    #[error("Failed to load resume content: {0}")]
    Load(String),

    #[error("Failed to enhance text: {0}")]
    Enhance(String),

    #[error("Failed to save edit: {0}")]
    Save(String),
}

/// Submission flow errors: form validation plus whichever step failed first.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Tailoring(#[from] TailoringError),
}
