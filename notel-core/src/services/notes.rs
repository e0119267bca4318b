//! Notes service
//!
//! High-level business logic for topics and notes.
//! Handles title normalisation, the fallback topic and search.

use crate::config::{DEFAULT_NOTE_TITLE, DEFAULT_TOPIC_TITLE, MAX_TITLE_LENGTH, UNTITLED_NOTE_TITLE};
use crate::database::{CreateNoteRequest, Note, Repository, Topic, UpdateNoteRequest};
use crate::error::{AppError, Result};

/// Service for managing topics and notes
#[derive(Clone)]
pub struct NotesService {
    repo: Repository,
}

impl NotesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    // ===== Topics =====

    /// Create a topic; blank titles are rejected
    pub async fn create_topic(&self, title: &str) -> Result<Topic> {
        let title = normalize_title(title)
            .ok_or_else(|| AppError::InvalidInput("Topic title must not be empty".to_string()))?;

        tracing::info!("Creating topic: {}", title);
        self.repo.create_topic(&title).await
    }

    pub async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.repo.list_topics().await
    }

    pub async fn rename_topic(&self, id: &str, title: &str) -> Result<Topic> {
        let title = normalize_title(title)
            .ok_or_else(|| AppError::InvalidInput("Topic title must not be empty".to_string()))?;

        self.repo.rename_topic(id, &title).await
    }

    /// Delete a topic; its notes stay, unfiled
    pub async fn delete_topic(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting topic: {}", id);
        self.repo.delete_topic(id).await
    }

    /// Fetch the fallback topic, creating it on first use
    pub async fn default_topic(&self) -> Result<Topic> {
        if let Some(topic) = self.repo.find_topic_by_title(DEFAULT_TOPIC_TITLE).await? {
            return Ok(topic);
        }

        tracing::info!("Creating default topic '{}'", DEFAULT_TOPIC_TITLE);
        self.repo.create_topic(DEFAULT_TOPIC_TITLE).await
    }

    // ===== Notes =====

    /// Create a note with one blank page
    pub async fn create_note(&self, title: &str, topic_id: Option<String>) -> Result<Note> {
        let title = normalize_title(title).unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string());

        if let Some(topic_id) = &topic_id {
            self.repo.get_topic(topic_id).await?;
        }

        tracing::info!("Creating new note: {}", title);

        let note = self
            .repo
            .create_note(CreateNoteRequest { title, topic_id })
            .await?;

        tracing::info!("Note created successfully: {}", note.id);
        Ok(note)
    }

    /// Create a note under the fallback topic
    pub async fn create_note_in_default_topic(&self, title: &str) -> Result<Note> {
        let topic = self.default_topic().await?;
        self.create_note(title, Some(topic.id)).await
    }

    pub async fn get_note(&self, id: &str) -> Result<Note> {
        self.repo.get_note(id).await
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        self.repo.list_notes().await
    }

    pub async fn list_notes_in_topic(&self, topic_id: &str) -> Result<Vec<Note>> {
        self.repo.list_notes_in_topic(Some(topic_id)).await
    }

    pub async fn list_unfiled_notes(&self) -> Result<Vec<Note>> {
        self.repo.list_notes_in_topic(None).await
    }

    /// Rename a note; whitespace-only titles become "Untitled Note"
    pub async fn rename_note(&self, id: &str, title: &str) -> Result<Note> {
        let title = normalize_title(title).unwrap_or_else(|| UNTITLED_NOTE_TITLE.to_string());

        tracing::debug!("Renaming note {} to {}", id, title);

        self.repo
            .update_note(UpdateNoteRequest {
                id: id.to_string(),
                title: Some(title),
                topic_id: None,
            })
            .await
    }

    /// File a note under a topic, or unfile it with `None`
    pub async fn move_note_to_topic(&self, id: &str, topic_id: Option<String>) -> Result<Note> {
        if let Some(topic_id) = &topic_id {
            self.repo.get_topic(topic_id).await?;
        }

        self.repo
            .update_note(UpdateNoteRequest {
                id: id.to_string(),
                title: None,
                topic_id: Some(topic_id),
            })
            .await
    }

    /// Delete a note with everything it owns
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting note: {}", id);

        self.repo.delete_note(id).await?;

        tracing::info!("Note deleted successfully: {}", id);
        Ok(())
    }

    /// Case-insensitive title search.
    ///
    /// A note matches on its own title or on the title of its topic.
    pub async fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let query = query.trim().to_lowercase();
        let all_notes = self.list_notes().await?;

        if query.is_empty() {
            return Ok(all_notes);
        }

        let matching_topics: Vec<String> = self
            .list_topics()
            .await?
            .into_iter()
            .filter(|topic| topic.title.to_lowercase().contains(&query))
            .map(|topic| topic.id)
            .collect();

        let filtered = all_notes
            .into_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query)
                    || note
                        .topic_id
                        .as_ref()
                        .is_some_and(|topic_id| matching_topics.contains(topic_id))
            })
            .collect();

        Ok(filtered)
    }
}

/// Trim and bound a title; `None` when nothing is left
fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TITLE_LENGTH).collect())
}
