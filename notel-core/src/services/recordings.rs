//! Recordings service
//!
//! Audio captured while a note is open. Recordings are note-scoped and
//! carry timestamped annotation markers that can point at attachments.

use crate::database::{NewRecording, Recording, RecordingAnnotation, Repository};
use crate::editor::action::RecordingSnapshot;
use crate::error::{AppError, Result};
use crate::storage::BlobStore;
use chrono::Utc;
use uuid::Uuid;

/// Service for managing recordings
#[derive(Clone)]
pub struct RecordingsService {
    repo: Repository,
    blob_store: BlobStore,
}

impl RecordingsService {
    pub fn new(repo: Repository, blob_store: BlobStore) -> Self {
        Self { repo, blob_store }
    }

    /// Persist a finished recording for a note
    pub async fn save(&self, note_id: &str, audio: &[u8], duration: f64) -> Result<Recording> {
        let snapshot = RecordingSnapshot {
            id: Uuid::new_v4().to_string(),
            audio_data: audio.to_vec(),
            duration,
            created_at: Utc::now(),
            annotations: Vec::new(),
        };

        tracing::info!(
            "Saving recording for note: {} ({:.1}s, {} bytes)",
            note_id,
            duration,
            audio.len()
        );

        self.insert_snapshot(note_id, &snapshot)
            .await?
            .ok_or_else(|| AppError::Generic(format!("Recording id collision: {}", snapshot.id)))
    }

    /// Rebuild a recording from a snapshot under `note_id`.
    ///
    /// Returns `None` when a recording with that id already exists.
    pub async fn insert_snapshot(
        &self,
        note_id: &str,
        snapshot: &RecordingSnapshot,
    ) -> Result<Option<Recording>> {
        if snapshot.audio_data.is_empty() {
            return Err(AppError::InvalidInput("Recording audio is empty".to_string()));
        }
        if !(snapshot.duration >= 0.0 && snapshot.duration.is_finite()) {
            return Err(AppError::InvalidInput(format!(
                "Invalid recording duration: {}",
                snapshot.duration
            )));
        }

        let hash = self.blob_store.put(&snapshot.audio_data).await?;

        let new = NewRecording {
            id: snapshot.id.clone(),
            note_id: note_id.to_string(),
            blob_hash: hash,
            size: snapshot.audio_data.len() as i64,
            duration: snapshot.duration,
            created_at: snapshot.created_at,
        };

        self.repo
            .insert_recording_with_annotations(&new, &snapshot.annotations)
            .await
    }

    pub async fn snapshot(&self, id: &str) -> Result<Option<RecordingSnapshot>> {
        let Some(recording) = self.repo.get_recording(id).await? else {
            return Ok(None);
        };

        Ok(Some(RecordingSnapshot {
            audio_data: self.load_audio(&recording).await?,
            annotations: self.repo.list_annotations(&recording.id).await?,
            id: recording.id,
            duration: recording.duration,
            created_at: recording.created_at,
        }))
    }

    /// Delete a recording, returning its snapshot; `None` if it was absent
    pub async fn delete(&self, id: &str) -> Result<Option<RecordingSnapshot>> {
        let Some(snapshot) = self.snapshot(id).await? else {
            return Ok(None);
        };

        if !self.repo.delete_recording(id).await? {
            return Ok(None);
        }

        tracing::info!("Recording deleted: {}", id);
        Ok(Some(snapshot))
    }

    pub async fn get(&self, id: &str) -> Result<Recording> {
        self.repo
            .get_recording(id)
            .await?
            .ok_or_else(|| AppError::RecordingNotFound(id.to_string()))
    }

    /// Recordings of a note, oldest first
    pub async fn list(&self, note_id: &str) -> Result<Vec<Recording>> {
        self.repo.list_recordings(note_id).await
    }

    pub async fn load_audio(&self, recording: &Recording) -> Result<Vec<u8>> {
        self.blob_store.get(&recording.blob_hash).await
    }

    /// Drop a marker at `timestamp` seconds, optionally tied to an attachment
    pub async fn annotate(
        &self,
        recording_id: &str,
        timestamp: f64,
        attachment_id: Option<&str>,
    ) -> Result<RecordingAnnotation> {
        let recording = self.get(recording_id).await?;

        if !(0.0..=recording.duration).contains(&timestamp) {
            return Err(AppError::InvalidInput(format!(
                "Annotation at {}s is outside the {}s recording",
                timestamp, recording.duration
            )));
        }

        if let Some(attachment_id) = attachment_id {
            if self.repo.get_attachment(attachment_id).await?.is_none() {
                return Err(AppError::AttachmentNotFound(attachment_id.to_string()));
            }
        }

        self.repo.create_annotation(recording_id, timestamp, attachment_id).await
    }

    pub async fn annotations(&self, recording_id: &str) -> Result<Vec<RecordingAnnotation>> {
        self.repo.list_annotations(recording_id).await
    }

    pub async fn remove_annotation(&self, id: &str) -> Result<bool> {
        self.repo.delete_annotation(id).await
    }
}
