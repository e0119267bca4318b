//! Undoable edit records
//!
//! An [`Action`] describes one reversible edit on the active page. Every
//! variant owns the data needed to rebuild whatever it removed, so the log
//! never depends on rows that may be gone from the store.

use crate::database::{Frame, Position, RecordingAnnotation};
use chrono::{DateTime, Utc};

/// Direction in which an action is replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Re-apply the edit (redo)
    Forward,
    /// Reverse the edit (undo)
    Inverse,
}

/// Owned copy of an attachment, enough to recreate it exactly
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentSnapshot {
    pub id: String,
    pub image_data: Vec<u8>,
    pub frame: Frame,
    pub created_at: DateTime<Utc>,
    /// Recording markers that pointed at the attachment
    pub annotation_links: Vec<String>,
}

/// Owned copy of a recording, enough to recreate it exactly
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSnapshot {
    pub id: String,
    pub audio_data: Vec<u8>,
    /// Seconds
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub annotations: Vec<RecordingAnnotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A stroke sequence ended on the drawing surface. The strokes
    /// themselves live in the surface's own undo stack.
    DrawingCommit,
    AttachmentAdded(AttachmentSnapshot),
    AttachmentDeleted(AttachmentSnapshot),
    AttachmentMoved {
        id: String,
        from: Position,
        to: Position,
    },
    RecordingAdded(RecordingSnapshot),
    RecordingDeleted(RecordingSnapshot),
}

impl Action {
    /// Stable name for logs; payload bytes are never logged
    pub fn kind(&self) -> &'static str {
        match self {
            Action::DrawingCommit => "drawing_commit",
            Action::AttachmentAdded(_) => "attachment_added",
            Action::AttachmentDeleted(_) => "attachment_deleted",
            Action::AttachmentMoved { .. } => "attachment_moved",
            Action::RecordingAdded(_) => "recording_added",
            Action::RecordingDeleted(_) => "recording_deleted",
        }
    }

    /// Id of the entity the action touches, if any
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Action::DrawingCommit => None,
            Action::AttachmentAdded(s) | Action::AttachmentDeleted(s) => Some(&s.id),
            Action::AttachmentMoved { id, .. } => Some(id),
            Action::RecordingAdded(s) | Action::RecordingDeleted(s) => Some(&s.id),
        }
    }
}
