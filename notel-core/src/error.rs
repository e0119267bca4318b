//! Error types for the Notel core
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for whatever UI layer sits on top.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Blob store error: {0}")]
    BlobStore(String),

    #[error("Invalid drawing data: {0}")]
    Drawing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True for the "entity referenced by id no longer exists" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::TopicNotFound(_)
                | AppError::NoteNotFound(_)
                | AppError::PageNotFound(_)
                | AppError::AttachmentNotFound(_)
                | AppError::RecordingNotFound(_)
        )
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
