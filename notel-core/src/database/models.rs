//! Database models
//!
//! Rust structs representing the Topic → Note → Page → Attachment graph
//! and the note-scoped recordings. All models use serde so a UI layer can
//! consume them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named group of notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A handwritten note made of ordered pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: String,
    /// `None` for unfiled notes
    pub topic_id: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create note request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub topic_id: Option<String>,
}

/// Update note request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub id: String,
    pub title: Option<String>,
    /// `Some(None)` files the note as unfiled
    pub topic_id: Option<Option<String>>,
}

/// One page of a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: String,
    pub note_id: String,
    /// Dense, zero-based position within the note
    pub page_index: i64,
    /// Serialized stroke drawing; empty means blank
    #[serde(skip)]
    pub drawing_data: Vec<u8>,
    /// Rasterised PDF page backing this page, if imported
    pub pdf_blob_hash: Option<String>,
    pub pdf_page_number: Option<i64>,
}

impl Page {
    pub fn is_blank(&self) -> bool {
        self.drawing_data.is_empty() && self.pdf_blob_hash.is_none()
    }
}

/// Image placed on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: String,
    pub page_id: String,
    /// SHA-256 address of the image payload
    pub blob_hash: String,
    pub size: i64,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn frame(&self) -> Frame {
        Frame {
            x: self.position_x,
            y: self.position_y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            x: self.position_x,
            y: self.position_y,
        }
    }
}

/// Top-left corner in page-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position and size in page-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Insert payload for an attachment row with a caller-chosen id
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub id: String,
    pub page_id: String,
    pub blob_hash: String,
    pub size: i64,
    pub frame: Frame,
    pub created_at: DateTime<Utc>,
}

/// Audio recorded while a note was open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recording {
    pub id: String,
    pub note_id: String,
    /// SHA-256 address of the audio payload
    pub blob_hash: String,
    pub size: i64,
    /// Seconds
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a recording row with a caller-chosen id
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub id: String,
    pub note_id: String,
    pub blob_hash: String,
    pub size: i64,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

/// Marker at an offset into a recording, optionally pointing at an attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecordingAnnotation {
    pub id: String,
    pub recording_id: String,
    /// Seconds from the start of the recording
    pub timestamp: f64,
    pub attachment_id: Option<String>,
}
