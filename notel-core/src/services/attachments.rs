//! Attachments service
//!
//! Handles image attachments placed on pages.
//! Integrates Repository and BlobStore: rows hold geometry and the blob
//! address, the image bytes live in the blob store.

use crate::config::{
    CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_ATTACHMENT_HEIGHT, DEFAULT_ATTACHMENT_WIDTH,
    MIN_ATTACHMENT_EDGE,
};
use crate::database::{Attachment, Frame, NewAttachment, Position, Repository};
use crate::editor::action::AttachmentSnapshot;
use crate::error::{AppError, Result};
use crate::storage::BlobStore;
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

/// Service for managing attachments
#[derive(Clone)]
pub struct AttachmentsService {
    repo: Repository,
    blob_store: BlobStore,
}

impl AttachmentsService {
    pub fn new(repo: Repository, blob_store: BlobStore) -> Self {
        Self { repo, blob_store }
    }

    /// Place an image at the default size, centred on the canvas
    pub async fn add_image(&self, page_id: &str, data: &[u8]) -> Result<Attachment> {
        self.add_image_at(page_id, data, default_frame()).await
    }

    pub async fn add_image_at(&self, page_id: &str, data: &[u8], frame: Frame) -> Result<Attachment> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("Attachment image is empty".to_string()));
        }

        tracing::info!(
            "Creating attachment for page: {} (size: {} bytes)",
            page_id,
            data.len()
        );

        let hash = self.blob_store.put(data).await?;

        let new = NewAttachment {
            id: Uuid::new_v4().to_string(),
            page_id: page_id.to_string(),
            blob_hash: hash,
            size: data.len() as i64,
            frame,
            created_at: Utc::now(),
        };

        let attachment = self
            .repo
            .insert_attachment(&new)
            .await?
            .ok_or_else(|| AppError::Generic(format!("Attachment id collision: {}", new.id)))?;

        tracing::info!("Attachment created: {}", attachment.id);
        Ok(attachment)
    }

    /// Rebuild an attachment from a snapshot on `page_id`.
    ///
    /// Returns `None` when an attachment with that id already exists.
    pub async fn insert_snapshot(
        &self,
        page_id: &str,
        snapshot: &AttachmentSnapshot,
    ) -> Result<Option<Attachment>> {
        let hash = self.blob_store.put(&snapshot.image_data).await?;

        let new = NewAttachment {
            id: snapshot.id.clone(),
            page_id: page_id.to_string(),
            blob_hash: hash,
            size: snapshot.image_data.len() as i64,
            frame: snapshot.frame,
            created_at: snapshot.created_at,
        };

        self.repo
            .insert_attachment_with_links(&new, &snapshot.annotation_links)
            .await
    }

    /// Everything needed to rebuild the attachment later
    pub async fn snapshot(&self, id: &str) -> Result<Option<AttachmentSnapshot>> {
        match self.repo.get_attachment(id).await? {
            Some(attachment) => Ok(Some(self.snapshot_of(&attachment).await?)),
            None => Ok(None),
        }
    }

    /// Delete an attachment, returning its snapshot; `None` if it was absent
    pub async fn delete(&self, id: &str) -> Result<Option<AttachmentSnapshot>> {
        let Some(snapshot) = self.snapshot(id).await? else {
            return Ok(None);
        };

        if !self.repo.delete_attachment(id).await? {
            return Ok(None);
        }

        tracing::info!("Attachment deleted: {}", id);
        Ok(Some(snapshot))
    }

    /// Delete every attachment on a page in one transaction.
    ///
    /// Snapshots are taken before anything is removed, so a failed blob
    /// read aborts the whole operation with the page untouched.
    pub async fn delete_all_for_page(&self, page_id: &str) -> Result<Vec<AttachmentSnapshot>> {
        let attachments = self.repo.list_attachments(page_id).await?;
        if attachments.is_empty() {
            tracing::debug!("No attachments to delete on page {}", page_id);
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::with_capacity(attachments.len());
        for attachment in &attachments {
            snapshots.push(self.snapshot_of(attachment).await?);
        }

        let deleted: HashSet<String> = self
            .repo
            .delete_attachments_for_page(page_id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        snapshots.retain(|s| deleted.contains(&s.id));

        tracing::info!("Deleted {} attachment(s) from page {}", snapshots.len(), page_id);
        Ok(snapshots)
    }

    /// Returns false when the attachment no longer exists
    pub async fn move_to(&self, id: &str, position: Position) -> Result<bool> {
        self.repo.update_attachment_position(id, position).await
    }

    pub async fn resize(&self, id: &str, width: f64, height: f64) -> Result<bool> {
        if !(width >= MIN_ATTACHMENT_EDGE && height >= MIN_ATTACHMENT_EDGE) {
            return Err(AppError::InvalidInput(format!(
                "Attachment must be at least {} x {}",
                MIN_ATTACHMENT_EDGE, MIN_ATTACHMENT_EDGE
            )));
        }
        self.repo.update_attachment_size(id, width, height).await
    }

    pub async fn get(&self, id: &str) -> Result<Attachment> {
        self.repo
            .get_attachment(id)
            .await?
            .ok_or_else(|| AppError::AttachmentNotFound(id.to_string()))
    }

    pub async fn list(&self, page_id: &str) -> Result<Vec<Attachment>> {
        self.repo.list_attachments(page_id).await
    }

    pub async fn load_image(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        self.blob_store.get(&attachment.blob_hash).await
    }

    async fn snapshot_of(&self, attachment: &Attachment) -> Result<AttachmentSnapshot> {
        Ok(AttachmentSnapshot {
            id: attachment.id.clone(),
            image_data: self.load_image(attachment).await?,
            frame: attachment.frame(),
            created_at: attachment.created_at,
            annotation_links: self.repo.annotation_ids_for_attachment(&attachment.id).await?,
        })
    }
}

/// Default size, centred on the canvas
pub fn default_frame() -> Frame {
    Frame {
        x: CANVAS_WIDTH / 2.0 - DEFAULT_ATTACHMENT_WIDTH / 2.0,
        y: CANVAS_HEIGHT / 2.0 - DEFAULT_ATTACHMENT_HEIGHT / 2.0,
        width: DEFAULT_ATTACHMENT_WIDTH,
        height: DEFAULT_ATTACHMENT_HEIGHT,
    }
}
