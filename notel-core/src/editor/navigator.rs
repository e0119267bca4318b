//! Page navigation within a note
//!
//! Owns the active page of an editing visit and the switching protocol:
//! save the outgoing drawing, swap the active page, reset the page's
//! undo history and load the incoming drawing into the surface.

use super::action_log::ActionLog;
use super::interpreter::ActivePage;
use super::surface::StrokeSurface;
use crate::database::{Page, Repository};
use crate::error::{AppError, Result};
use crate::storage::BlobStore;

pub struct PageNavigator {
    repo: Repository,
    blob_store: BlobStore,
    note_id: String,
    active: Page,
}

impl PageNavigator {
    /// Start a visit to `note_id` on `initial_page`, else its first page.
    ///
    /// A note without pages gets a blank page 0.
    pub async fn open<S: StrokeSurface + ?Sized>(
        repo: Repository,
        blob_store: BlobStore,
        note_id: &str,
        initial_page: Option<&str>,
        surface: &mut S,
    ) -> Result<Self> {
        repo.get_note(note_id).await?;

        let mut pages = repo.list_pages(note_id).await?;
        let requested = initial_page.and_then(|id| pages.iter().position(|p| p.id == id));

        let active = match requested {
            Some(position) => pages.swap_remove(position),
            None if !pages.is_empty() => pages.swap_remove(0),
            None => {
                tracing::info!("Note {} has no pages, creating page 0", note_id);
                repo.create_page(note_id, 0).await?
            }
        };

        tracing::info!("Opened note {} on page {}", note_id, active.page_index);

        let navigator = Self {
            repo,
            blob_store,
            note_id: note_id.to_string(),
            active,
        };
        navigator.load_into(surface);
        Ok(navigator)
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn active_page(&self) -> &Page {
        &self.active
    }

    pub fn target(&self) -> ActivePage {
        ActivePage {
            page_id: self.active.id.clone(),
            note_id: self.note_id.clone(),
        }
    }

    /// The note's pages in index order
    pub async fn pages(&self) -> Result<Vec<Page>> {
        self.repo.list_pages(&self.note_id).await
    }

    /// Persist the surface's drawing for the active page
    pub async fn save_drawing<S: StrokeSurface + ?Sized>(&mut self, surface: &S) -> Result<()> {
        let drawing = surface.snapshot()?;
        if drawing == self.active.drawing_data {
            return Ok(());
        }

        self.repo.update_drawing(&self.active.id, &drawing).await?;
        self.repo.touch_note(&self.note_id).await?;
        self.active.drawing_data = drawing;
        Ok(())
    }

    /// Switch to `page_id`, saving the current drawing first
    pub async fn go_to<S: StrokeSurface + ?Sized>(
        &mut self,
        page_id: &str,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<()> {
        self.save_drawing(surface).await?;
        self.switch_to(page_id, surface, log).await
    }

    /// Move to the following page; false when already on the last one
    pub async fn next_page<S: StrokeSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<bool> {
        let pages = self.pages().await?;
        let next = pages
            .iter()
            .find(|p| p.page_index > self.active.page_index)
            .map(|p| p.id.clone());

        match next {
            Some(id) => {
                self.go_to(&id, surface, log).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move to the preceding page; false when already on the first one
    pub async fn previous_page<S: StrokeSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<bool> {
        let pages = self.pages().await?;
        let previous = pages
            .iter()
            .rev()
            .find(|p| p.page_index < self.active.page_index)
            .map(|p| p.id.clone());

        match previous {
            Some(id) => {
                self.go_to(&id, surface, log).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Append a blank page after the last one and switch to it
    pub async fn add_page<S: StrokeSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<Page> {
        self.save_drawing(surface).await?;
        self.append_and_switch(surface, log).await
    }

    /// Delete a page and close the index gap it leaves.
    ///
    /// Deleting the active page moves to the next higher page, else the
    /// next lower one, else a fresh blank page. Deleting another page keeps
    /// the active page and its history; only its index is refreshed.
    pub async fn delete_page<S: StrokeSurface + ?Sized>(
        &mut self,
        page_id: &str,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<Vec<Page>> {
        let pages = self.pages().await?;
        let deleted = pages
            .iter()
            .find(|p| p.id == page_id)
            .ok_or_else(|| AppError::PageNotFound(page_id.to_string()))?;

        let was_active = deleted.id == self.active.id;
        let successor = pages
            .iter()
            .find(|p| p.page_index > deleted.page_index)
            .or_else(|| pages.iter().rev().find(|p| p.page_index < deleted.page_index))
            .map(|p| p.id.clone());

        let remaining = self.repo.delete_page_and_reindex(page_id).await?;
        self.repo.touch_note(&self.note_id).await?;
        tracing::info!("Deleted page {} from note {}", page_id, self.note_id);

        if !was_active {
            if let Some(active) = remaining.iter().find(|p| p.id == self.active.id) {
                self.active.page_index = active.page_index;
            }
            return Ok(remaining);
        }

        // The outgoing page is gone, so there is no drawing to save
        match successor {
            Some(id) => {
                self.switch_to(&id, surface, log).await?;
                Ok(remaining)
            }
            None => {
                let page = self.append_and_switch(surface, log).await?;
                Ok(vec![page])
            }
        }
    }

    pub async fn is_first_page(&self) -> Result<bool> {
        let pages = self.pages().await?;
        let min = pages.iter().map(|p| p.page_index).min();
        Ok(min.map_or(true, |min| self.active.page_index <= min))
    }

    pub async fn is_last_page(&self) -> Result<bool> {
        let pages = self.pages().await?;
        let max = pages.iter().map(|p| p.page_index).max();
        Ok(max.map_or(true, |max| self.active.page_index >= max))
    }

    /// Append one page per rasterised PDF page image.
    ///
    /// The active page is left as it is.
    pub async fn import_pdf_pages(&self, images: &[Vec<u8>]) -> Result<Vec<Page>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let mut hashes = Vec::with_capacity(images.len());
        for image in images {
            if image.is_empty() {
                return Err(AppError::InvalidInput("PDF page image is empty".to_string()));
            }
            hashes.push(self.blob_store.put(image).await?);
        }

        let pages = self.repo.append_pdf_pages(&self.note_id, &hashes).await?;
        self.repo.touch_note(&self.note_id).await?;

        tracing::info!("Imported {} PDF page(s) into note {}", pages.len(), self.note_id);
        Ok(pages)
    }

    /// Background image of a PDF-backed page
    pub async fn load_pdf_image(&self, page: &Page) -> Result<Option<Vec<u8>>> {
        match &page.pdf_blob_hash {
            Some(hash) => Ok(Some(self.blob_store.get(hash).await?)),
            None => Ok(None),
        }
    }

    async fn append_and_switch<S: StrokeSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<Page> {
        let index = self
            .repo
            .max_page_index(&self.note_id)
            .await?
            .map_or(0, |max| max + 1);

        let page = self.repo.create_page(&self.note_id, index).await?;
        tracing::info!("Added page {} to note {}", index, self.note_id);

        self.switch_to(&page.id, surface, log).await?;
        Ok(page)
    }

    /// Swap the active page without saving the outgoing drawing
    async fn switch_to<S: StrokeSurface + ?Sized>(
        &mut self,
        page_id: &str,
        surface: &mut S,
        log: &mut ActionLog,
    ) -> Result<()> {
        let page = self.repo.get_page(page_id).await?;
        if page.note_id != self.note_id {
            return Err(AppError::InvalidInput(format!(
                "Page {} does not belong to note {}",
                page_id, self.note_id
            )));
        }

        tracing::debug!(
            "Switching from page {} to page {}",
            self.active.page_index,
            page.page_index
        );

        self.active = page;
        log.reset();
        self.load_into(surface);
        Ok(())
    }

    /// Undecodable drawings are logged and shown blank
    fn load_into<S: StrokeSurface + ?Sized>(&self, surface: &mut S) {
        if let Err(e) = surface.load(&self.active.drawing_data) {
            tracing::warn!("Drawing for page {} could not be loaded: {}", self.active.id, e);
        }
    }
}
