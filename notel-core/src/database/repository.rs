//! Repository layer for database operations
//!
//! CRUD and query primitives for every entity. Single-statement writes are
//! atomic on their own; operations touching several rows run inside one
//! transaction, and a transaction dropped on an error path rolls back.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Topics =====

    pub async fn create_topic(&self, title: &str) -> Result<Topic> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let topic = sqlx::query_as::<_, Topic>(
            r#"
            INSERT INTO topics (id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created topic: {}", id);
        Ok(topic)
    }

    pub async fn get_topic(&self, id: &str) -> Result<Topic> {
        sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::TopicNotFound(id.to_string()))
    }

    pub async fn find_topic_by_title(&self, title: &str) -> Result<Option<Topic>> {
        let topic = sqlx::query_as::<_, Topic>(
            "SELECT * FROM topics WHERE title = ? ORDER BY created_at ASC LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(topic)
    }

    /// All topics, alphabetically
    pub async fn list_topics(&self) -> Result<Vec<Topic>> {
        let topics = sqlx::query_as::<_, Topic>(
            "SELECT * FROM topics ORDER BY title COLLATE NOCASE ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(topics)
    }

    pub async fn rename_topic(&self, id: &str, title: &str) -> Result<Topic> {
        sqlx::query_as::<_, Topic>(
            "UPDATE topics SET title = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(title)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::TopicNotFound(id.to_string()))
    }

    /// Delete a topic; its notes become unfiled
    pub async fn delete_topic(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TopicNotFound(id.to_string()));
        }

        tracing::debug!("Deleted topic: {}", id);
        Ok(())
    }

    // ===== Notes =====

    /// Create a note together with its first, blank page
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, topic_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.topic_id)
        .bind(&req.title)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO pages (id, note_id, page_index, drawing_data) VALUES (?, ?, 0, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(Vec::<u8>::new())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Created note: {}", id);
        Ok(note)
    }

    pub async fn get_note(&self, id: &str) -> Result<Note> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))
    }

    /// All notes, most recently updated first
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>("SELECT * FROM notes ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(notes)
    }

    /// Notes filed under `topic_id`, or unfiled notes when `None`
    pub async fn list_notes_in_topic(&self, topic_id: Option<&str>) -> Result<Vec<Note>> {
        let notes = match topic_id {
            Some(topic_id) => {
                sqlx::query_as::<_, Note>(
                    "SELECT * FROM notes WHERE topic_id = ? ORDER BY updated_at DESC",
                )
                .bind(topic_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Note>(
                    "SELECT * FROM notes WHERE topic_id IS NULL ORDER BY updated_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(notes)
    }

    pub async fn update_note(&self, req: UpdateNoteRequest) -> Result<Note> {
        let current = self.get_note(&req.id).await?;

        let title = req.title.unwrap_or(current.title);
        let topic_id = req.topic_id.unwrap_or(current.topic_id);

        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes SET title = ?, topic_id = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&topic_id)
        .bind(Utc::now())
        .bind(&req.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NoteNotFound(req.id.clone()))?;

        tracing::debug!("Updated note: {}", note.id);
        Ok(note)
    }

    /// Bump `updated_at` after a page-level edit
    pub async fn touch_note(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE notes SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a note; pages, attachments and recordings cascade
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id.to_string()));
        }

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }

    // ===== Pages =====

    pub async fn create_page(&self, note_id: &str, page_index: i64) -> Result<Page> {
        let id = Uuid::new_v4().to_string();

        let page = sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (id, note_id, page_index, drawing_data)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(note_id)
        .bind(page_index)
        .bind(Vec::<u8>::new())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created page {} at index {} for note {}", id, page_index, note_id);
        Ok(page)
    }

    pub async fn get_page(&self, id: &str) -> Result<Page> {
        sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::PageNotFound(id.to_string()))
    }

    /// Pages of a note in index order
    pub async fn list_pages(&self, note_id: &str) -> Result<Vec<Page>> {
        let pages = sqlx::query_as::<_, Page>(
            "SELECT * FROM pages WHERE note_id = ? ORDER BY page_index ASC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pages)
    }

    pub async fn max_page_index(&self, note_id: &str) -> Result<Option<i64>> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(page_index) FROM pages WHERE note_id = ?")
                .bind(note_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(max)
    }

    pub async fn update_drawing(&self, page_id: &str, drawing_data: &[u8]) -> Result<()> {
        let rows = sqlx::query("UPDATE pages SET drawing_data = ? WHERE id = ?")
            .bind(drawing_data)
            .bind(page_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::PageNotFound(page_id.to_string()));
        }

        tracing::debug!("Saved drawing for page {} ({} bytes)", page_id, drawing_data.len());
        Ok(())
    }

    /// Delete a page and close the gap it leaves in its note.
    ///
    /// Returns the note's remaining pages, re-indexed 0..N-1 in their
    /// previous relative order.
    pub async fn delete_page_and_reindex(&self, page_id: &str) -> Result<Vec<Page>> {
        let mut tx = self.pool.begin().await?;

        let note_id: String = sqlx::query_scalar("SELECT note_id FROM pages WHERE id = ?")
            .bind(page_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::PageNotFound(page_id.to_string()))?;

        sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        let remaining = sqlx::query_as::<_, Page>(
            "SELECT * FROM pages WHERE note_id = ? ORDER BY page_index ASC",
        )
        .bind(&note_id)
        .fetch_all(&mut *tx)
        .await?;

        // Ascending renumbering only ever moves a page into a freed slot
        let mut reindexed = Vec::with_capacity(remaining.len());
        for (position, mut page) in remaining.into_iter().enumerate() {
            let position = position as i64;
            if page.page_index != position {
                sqlx::query("UPDATE pages SET page_index = ? WHERE id = ?")
                    .bind(position)
                    .bind(&page.id)
                    .execute(&mut *tx)
                    .await?;
                page.page_index = position;
            }
            reindexed.push(page);
        }

        tx.commit().await?;

        tracing::debug!(
            "Deleted page {} from note {}, {} page(s) remain",
            page_id,
            note_id,
            reindexed.len()
        );
        Ok(reindexed)
    }

    /// Append one page per rasterised PDF page after the note's last page
    pub async fn append_pdf_pages(&self, note_id: &str, blob_hashes: &[String]) -> Result<Vec<Page>> {
        let mut tx = self.pool.begin().await?;

        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(page_index) FROM pages WHERE note_id = ?")
                .bind(note_id)
                .fetch_one(&mut *tx)
                .await?;
        let first_index = max.map_or(0, |m| m + 1);

        let mut pages = Vec::with_capacity(blob_hashes.len());
        for (offset, hash) in blob_hashes.iter().enumerate() {
            let page = sqlx::query_as::<_, Page>(
                r#"
                INSERT INTO pages (id, note_id, page_index, drawing_data, pdf_blob_hash, pdf_page_number)
                VALUES (?, ?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(note_id)
            .bind(first_index + offset as i64)
            .bind(Vec::<u8>::new())
            .bind(hash)
            .bind(offset as i64)
            .fetch_one(&mut *tx)
            .await?;
            pages.push(page);
        }

        tx.commit().await?;

        tracing::debug!("Appended {} PDF page(s) to note {}", pages.len(), note_id);
        Ok(pages)
    }

    // ===== Attachments =====

    /// Insert an attachment row under its own id.
    ///
    /// Returns `None` when a row with that id already exists.
    pub async fn insert_attachment(&self, new: &NewAttachment) -> Result<Option<Attachment>> {
        self.insert_attachment_with_links(new, &[]).await
    }

    /// Insert an attachment and point the given annotations back at it, in
    /// one transaction. Annotations that are gone or already point
    /// elsewhere are left alone.
    ///
    /// Returns `None`, linking nothing, when a row with that id already exists.
    pub async fn insert_attachment_with_links(
        &self,
        new: &NewAttachment,
        annotation_ids: &[String],
    ) -> Result<Option<Attachment>> {
        let mut tx = self.pool.begin().await?;

        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments
                (id, page_id, blob_hash, size, position_x, position_y, width, height, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&new.id)
        .bind(&new.page_id)
        .bind(&new.blob_hash)
        .bind(new.size)
        .bind(new.frame.x)
        .bind(new.frame.y)
        .bind(new.frame.width)
        .bind(new.frame.height)
        .bind(new.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(attachment) = attachment else {
            return Ok(None);
        };

        let mut linked = 0;
        for annotation_id in annotation_ids {
            linked += sqlx::query(
                "UPDATE recording_annotations SET attachment_id = ? WHERE id = ? AND attachment_id IS NULL",
            )
            .bind(&new.id)
            .bind(annotation_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        tracing::debug!(
            "Inserted attachment {} on page {} ({} annotation link(s))",
            new.id,
            new.page_id,
            linked
        );
        Ok(Some(attachment))
    }

    pub async fn get_attachment(&self, id: &str) -> Result<Option<Attachment>> {
        let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(attachment)
    }

    pub async fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE page_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }

    /// Returns false when no such attachment exists
    pub async fn update_attachment_position(&self, id: &str, position: Position) -> Result<bool> {
        let rows = sqlx::query("UPDATE attachments SET position_x = ?, position_y = ? WHERE id = ?")
            .bind(position.x)
            .bind(position.y)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    /// Returns false when no such attachment exists
    pub async fn update_attachment_size(&self, id: &str, width: f64, height: f64) -> Result<bool> {
        let rows = sqlx::query("UPDATE attachments SET width = ?, height = ? WHERE id = ?")
            .bind(width)
            .bind(height)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    /// Returns false when no such attachment exists
    pub async fn delete_attachment(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows > 0 {
            tracing::debug!("Deleted attachment: {}", id);
        }
        Ok(rows > 0)
    }

    /// Delete every attachment on a page in one transaction, returning them
    pub async fn delete_attachments_for_page(&self, page_id: &str) -> Result<Vec<Attachment>> {
        let mut tx = self.pool.begin().await?;

        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE page_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(page_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM attachments WHERE page_id = ?")
            .bind(page_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted {} attachment(s) from page {}", attachments.len(), page_id);
        Ok(attachments)
    }

    // ===== Recordings =====

    /// Insert a recording row under its own id.
    ///
    /// Returns `None` when a row with that id already exists.
    pub async fn insert_recording(&self, new: &NewRecording) -> Result<Option<Recording>> {
        self.insert_recording_with_annotations(new, &[]).await
    }

    /// Insert a recording together with its annotation markers, in one
    /// transaction. A marker whose attachment no longer exists comes back
    /// unlinked.
    ///
    /// Returns `None`, inserting nothing, when a row with that id already exists.
    pub async fn insert_recording_with_annotations(
        &self,
        new: &NewRecording,
        annotations: &[RecordingAnnotation],
    ) -> Result<Option<Recording>> {
        let mut tx = self.pool.begin().await?;

        let recording = sqlx::query_as::<_, Recording>(
            r#"
            INSERT INTO recordings (id, note_id, blob_hash, size, duration, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&new.id)
        .bind(&new.note_id)
        .bind(&new.blob_hash)
        .bind(new.size)
        .bind(new.duration)
        .bind(new.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(recording) = recording else {
            return Ok(None);
        };

        for annotation in annotations {
            sqlx::query(
                r#"
                INSERT INTO recording_annotations (id, recording_id, timestamp, attachment_id)
                VALUES (?, ?, ?, (SELECT id FROM attachments WHERE id = ?))
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(&annotation.id)
            .bind(&new.id)
            .bind(annotation.timestamp)
            .bind(&annotation.attachment_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "Inserted recording {} for note {} with {} annotation(s)",
            new.id,
            new.note_id,
            annotations.len()
        );
        Ok(Some(recording))
    }

    pub async fn get_recording(&self, id: &str) -> Result<Option<Recording>> {
        let recording = sqlx::query_as::<_, Recording>("SELECT * FROM recordings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(recording)
    }

    /// Recordings of a note, oldest first
    pub async fn list_recordings(&self, note_id: &str) -> Result<Vec<Recording>> {
        let recordings = sqlx::query_as::<_, Recording>(
            "SELECT * FROM recordings WHERE note_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(recordings)
    }

    /// Returns false when no such recording exists
    pub async fn delete_recording(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM recordings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows > 0 {
            tracing::debug!("Deleted recording: {}", id);
        }
        Ok(rows > 0)
    }

    // ===== Recording annotations =====

    pub async fn create_annotation(
        &self,
        recording_id: &str,
        timestamp: f64,
        attachment_id: Option<&str>,
    ) -> Result<RecordingAnnotation> {
        let id = Uuid::new_v4().to_string();

        let annotation = sqlx::query_as::<_, RecordingAnnotation>(
            r#"
            INSERT INTO recording_annotations (id, recording_id, timestamp, attachment_id)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(recording_id)
        .bind(timestamp)
        .bind(attachment_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created annotation {} on recording {}", id, recording_id);
        Ok(annotation)
    }

    /// Markers of a recording in playback order
    pub async fn list_annotations(&self, recording_id: &str) -> Result<Vec<RecordingAnnotation>> {
        let annotations = sqlx::query_as::<_, RecordingAnnotation>(
            "SELECT * FROM recording_annotations WHERE recording_id = ? ORDER BY timestamp ASC",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(annotations)
    }

    /// Ids of the annotations pointing at an attachment
    pub async fn annotation_ids_for_attachment(&self, attachment_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM recording_annotations WHERE attachment_id = ? ORDER BY timestamp ASC",
        )
        .bind(attachment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn delete_annotation(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM recording_annotations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    // ===== Maintenance =====

    /// Every blob address still referenced by a row
    pub async fn referenced_blob_hashes(&self) -> Result<HashSet<String>> {
        let hashes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT blob_hash FROM attachments
            UNION
            SELECT blob_hash FROM recordings
            UNION
            SELECT pdf_blob_hash FROM pages WHERE pdf_blob_hash IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(hashes.into_iter().collect())
    }
}
