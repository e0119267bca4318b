//! Editing session
//!
//! One visit to a note: the active page, its undo history, the drawing
//! surface and the tool settings. User edits go to the store first and are
//! recorded only once they have succeeded. Undo and redo apply the action
//! first and move the history cursor only when the store accepted it,
//! including the drawing save that follows a stroke step.

use super::action::{Action, AttachmentSnapshot, Direction, RecordingSnapshot};
use super::action_log::ActionLog;
use super::interpreter::{ActionInterpreter, ActivePage, Outcome};
use super::navigator::PageNavigator;
use super::surface::StrokeSurface;
use super::tools::ToolSettings;
use crate::database::{Attachment, Page, Position, Recording, Repository};
use crate::error::{AppError, Result};
use crate::services::{AttachmentsService, RecordingsService};
use crate::storage::BlobStore;

pub struct EditingSession<S: StrokeSurface> {
    navigator: PageNavigator,
    log: ActionLog,
    interpreter: ActionInterpreter,
    attachments: AttachmentsService,
    recordings: RecordingsService,
    surface: S,
    tools: ToolSettings,
}

impl<S: StrokeSurface> EditingSession<S> {
    pub async fn open(
        repo: Repository,
        blob_store: BlobStore,
        note_id: &str,
        initial_page: Option<&str>,
        mut surface: S,
        history_size: usize,
    ) -> Result<Self> {
        let navigator =
            PageNavigator::open(repo.clone(), blob_store.clone(), note_id, initial_page, &mut surface)
                .await?;

        let attachments = AttachmentsService::new(repo.clone(), blob_store.clone());
        let recordings = RecordingsService::new(repo, blob_store);

        Ok(Self {
            navigator,
            log: ActionLog::new(history_size),
            interpreter: ActionInterpreter::new(attachments.clone(), recordings.clone()),
            attachments,
            recordings,
            surface,
            tools: ToolSettings::default(),
        })
    }

    pub fn active_page(&self) -> &Page {
        self.navigator.active_page()
    }

    pub fn note_id(&self) -> &str {
        self.navigator.note_id()
    }

    pub fn history(&self) -> &ActionLog {
        &self.log
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Draw through this; call [`commit_strokes`](Self::commit_strokes)
    /// when a stroke sequence ends
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolSettings {
        &mut self.tools
    }

    // ===== Edits =====

    /// A stroke sequence ended on the surface
    pub async fn commit_strokes(&mut self) -> Result<()> {
        self.navigator.save_drawing(&self.surface).await?;
        self.log.record(Action::DrawingCommit);
        Ok(())
    }

    /// Place an image on the active page at the default frame
    pub async fn add_attachment(&mut self, image: &[u8]) -> Result<Attachment> {
        let attachment = self
            .attachments
            .add_image(&self.navigator.active_page().id, image)
            .await?;

        self.log.record(Action::AttachmentAdded(AttachmentSnapshot {
            id: attachment.id.clone(),
            image_data: image.to_vec(),
            frame: attachment.frame(),
            created_at: attachment.created_at,
            annotation_links: Vec::new(),
        }));
        Ok(attachment)
    }

    pub async fn delete_attachment(&mut self, id: &str) -> Result<()> {
        self.attachment_on_page(id).await?;

        let snapshot = self
            .attachments
            .delete(id)
            .await?
            .ok_or_else(|| AppError::AttachmentNotFound(id.to_string()))?;

        self.log.record(Action::AttachmentDeleted(snapshot));
        Ok(())
    }

    /// Clear the active page; each attachment becomes its own undo step
    pub async fn delete_all_attachments(&mut self) -> Result<usize> {
        let snapshots = self
            .attachments
            .delete_all_for_page(&self.navigator.active_page().id)
            .await?;

        let count = snapshots.len();
        for snapshot in snapshots {
            self.log.record(Action::AttachmentDeleted(snapshot));
        }
        Ok(count)
    }

    /// Drag an attachment to `to`; dropping it where it was records nothing
    pub async fn move_attachment(&mut self, id: &str, to: Position) -> Result<()> {
        let attachment = self.attachment_on_page(id).await?;
        let from = attachment.position();
        if from == to {
            return Ok(());
        }

        if !self.attachments.move_to(id, to).await? {
            return Err(AppError::AttachmentNotFound(id.to_string()));
        }

        self.log.record(Action::AttachmentMoved {
            id: id.to_string(),
            from,
            to,
        });
        Ok(())
    }

    /// A finished recording came back from the audio subsystem
    pub async fn save_recording(&mut self, audio: &[u8], duration: f64) -> Result<Recording> {
        let recording = self
            .recordings
            .save(self.navigator.note_id(), audio, duration)
            .await?;

        self.log.record(Action::RecordingAdded(RecordingSnapshot {
            id: recording.id.clone(),
            audio_data: audio.to_vec(),
            duration: recording.duration,
            created_at: recording.created_at,
            annotations: Vec::new(),
        }));
        Ok(recording)
    }

    pub async fn delete_recording(&mut self, id: &str) -> Result<()> {
        let recording = self.recordings.get(id).await?;
        if recording.note_id != self.navigator.note_id() {
            return Err(AppError::InvalidInput(format!(
                "Recording {} does not belong to note {}",
                id,
                self.navigator.note_id()
            )));
        }

        let snapshot = self
            .recordings
            .delete(id)
            .await?
            .ok_or_else(|| AppError::RecordingNotFound(id.to_string()))?;

        self.log.record(Action::RecordingDeleted(snapshot));
        Ok(())
    }

    // ===== Undo / Redo =====

    /// Reverse the last applied action.
    ///
    /// `Ok(None)` when there is nothing to undo. On error the history and
    /// the surface are left exactly as they were.
    pub async fn undo(&mut self) -> Result<Option<Outcome>> {
        let Some(mut action) = self.log.peek_undo().cloned() else {
            tracing::debug!("Nothing to undo");
            return Ok(None);
        };

        let outcome = self.replay(&mut action, Direction::Inverse).await?;
        self.persist_stroke_change(outcome).await?;

        self.log.undo();
        self.log.refresh_redo(action);
        Ok(Some(outcome))
    }

    /// Re-apply the next undone action.
    ///
    /// `Ok(None)` when there is nothing to redo. On error the history and
    /// the surface are left exactly as they were.
    pub async fn redo(&mut self) -> Result<Option<Outcome>> {
        let Some(mut action) = self.log.peek_redo().cloned() else {
            tracing::debug!("Nothing to redo");
            return Ok(None);
        };

        let outcome = self.replay(&mut action, Direction::Forward).await?;
        self.persist_stroke_change(outcome).await?;

        self.log.redo();
        self.log.refresh_undo(action);
        Ok(Some(outcome))
    }

    // ===== Navigation =====

    pub async fn go_to_page(&mut self, page_id: &str) -> Result<()> {
        self.navigator.go_to(page_id, &mut self.surface, &mut self.log).await
    }

    pub async fn next_page(&mut self) -> Result<bool> {
        self.navigator.next_page(&mut self.surface, &mut self.log).await
    }

    pub async fn previous_page(&mut self) -> Result<bool> {
        self.navigator.previous_page(&mut self.surface, &mut self.log).await
    }

    pub async fn add_page(&mut self) -> Result<Page> {
        self.navigator.add_page(&mut self.surface, &mut self.log).await
    }

    pub async fn delete_page(&mut self, page_id: &str) -> Result<Vec<Page>> {
        self.navigator
            .delete_page(page_id, &mut self.surface, &mut self.log)
            .await
    }

    pub async fn pages(&self) -> Result<Vec<Page>> {
        self.navigator.pages().await
    }

    pub async fn is_first_page(&self) -> Result<bool> {
        self.navigator.is_first_page().await
    }

    pub async fn is_last_page(&self) -> Result<bool> {
        self.navigator.is_last_page().await
    }

    pub async fn import_pdf_pages(&self, images: &[Vec<u8>]) -> Result<Vec<Page>> {
        self.navigator.import_pdf_pages(images).await
    }

    pub async fn load_pdf_image(&self, page: &Page) -> Result<Option<Vec<u8>>> {
        self.navigator.load_pdf_image(page).await
    }

    /// Save the drawing and drop the history
    pub async fn close(mut self) -> Result<()> {
        self.navigator.save_drawing(&self.surface).await?;
        self.log.reset();
        tracing::info!("Closed editing session for note {}", self.navigator.note_id());
        Ok(())
    }

    async fn replay(&mut self, action: &mut Action, direction: Direction) -> Result<Outcome> {
        let target: ActivePage = self.navigator.target();
        self.interpreter
            .apply(action, direction, &target, &mut self.surface)
            .await
    }

    /// Save the drawing after a stroke step; if the save fails the step is
    /// taken back so the surface still matches the store
    async fn persist_stroke_change(&mut self, outcome: Outcome) -> Result<()> {
        let revert: fn(&mut S) -> bool = match outcome {
            Outcome::StrokeUndone => S::redo_stroke,
            Outcome::StrokeRedone => S::undo_stroke,
            Outcome::Applied | Outcome::AlreadySatisfied | Outcome::StrokeUnavailable => {
                return Ok(())
            }
        };

        if let Err(e) = self.navigator.save_drawing(&self.surface).await {
            tracing::error!("Failed to save drawing, reverting stroke step: {}", e);
            revert(&mut self.surface);
            return Err(e);
        }
        Ok(())
    }

    async fn attachment_on_page(&self, id: &str) -> Result<Attachment> {
        let attachment = self.attachments.get(id).await?;
        if attachment.page_id != self.navigator.active_page().id {
            return Err(AppError::InvalidInput(format!(
                "Attachment {} is not on the active page",
                id
            )));
        }
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_ACTION_HISTORY_SIZE;
    use crate::database::{create_memory_pool, CreateNoteRequest};
    use crate::editor::surface::{InMemorySurface, Stroke};
    use crate::editor::tools::Tool;
    use tempfile::TempDir;

    async fn open_session() -> (EditingSession<InMemorySurface>, Repository, TempDir) {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let temp = TempDir::new().unwrap();
        let blob_store = BlobStore::new(temp.path().join("blobs"));
        blob_store.initialize().await.unwrap();

        let note = repo
            .create_note(CreateNoteRequest {
                title: "Session".to_string(),
                topic_id: None,
            })
            .await
            .unwrap();

        let session = EditingSession::open(
            repo.clone(),
            blob_store,
            &note.id,
            None,
            InMemorySurface::new(),
            MAX_ACTION_HISTORY_SIZE,
        )
        .await
        .unwrap();

        (session, repo, temp)
    }

    fn draw(session: &mut EditingSession<InMemorySurface>, x: f64) {
        let pen = match session.tools().current() {
            Tool::Ink(ink) => ink,
            _ => panic!("expected an ink tool"),
        };
        session
            .surface_mut()
            .add_stroke(Stroke::with_tool(pen, vec![(x, x)]));
    }

    #[tokio::test]
    async fn test_undo_on_empty_history_is_noop() {
        let (mut session, _repo, _temp) = open_session().await;

        assert_eq!(session.undo().await.unwrap(), None);
        assert_eq!(session.redo().await.unwrap(), None);
        assert_eq!(session.history().cursor(), None);
    }

    #[tokio::test]
    async fn test_attachment_edits_undo_and_redo() {
        let (mut session, repo, _temp) = open_session().await;
        let page_id = session.active_page().id.clone();

        let attachment = session.add_attachment(b"jpeg").await.unwrap();
        session
            .move_attachment(&attachment.id, Position::new(3.0, 4.0))
            .await
            .unwrap();
        session.delete_attachment(&attachment.id).await.unwrap();
        assert_eq!(session.history().len(), 3);
        assert!(repo.list_attachments(&page_id).await.unwrap().is_empty());

        assert_eq!(session.undo().await.unwrap(), Some(Outcome::Applied));
        let restored = repo.get_attachment(&attachment.id).await.unwrap().unwrap();
        assert_eq!(restored.position(), Position::new(3.0, 4.0));

        session.undo().await.unwrap();
        session.undo().await.unwrap();
        assert!(repo.list_attachments(&page_id).await.unwrap().is_empty());
        assert!(!session.can_undo());

        session.redo().await.unwrap();
        let recreated = repo.get_attachment(&attachment.id).await.unwrap().unwrap();
        assert_eq!(recreated, attachment);
    }

    #[tokio::test]
    async fn test_move_to_same_spot_records_nothing() {
        let (mut session, _repo, _temp) = open_session().await;

        let attachment = session.add_attachment(b"jpeg").await.unwrap();
        session
            .move_attachment(&attachment.id, attachment.position())
            .await
            .unwrap();
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_attachments_records_each() {
        let (mut session, _repo, _temp) = open_session().await;

        session.add_attachment(b"one").await.unwrap();
        session.add_attachment(b"two").await.unwrap();

        assert_eq!(session.delete_all_attachments().await.unwrap(), 2);
        assert_eq!(session.history().len(), 4);

        session.undo().await.unwrap();
        session.undo().await.unwrap();
        let page_id = session.active_page().id.clone();
        assert_eq!(session.attachments.list(&page_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_recording_undo_redo() {
        let (mut session, repo, _temp) = open_session().await;
        let note_id = session.note_id().to_string();

        let recording = session.save_recording(b"audio", 8.0).await.unwrap();
        session.delete_recording(&recording.id).await.unwrap();
        assert!(repo.list_recordings(&note_id).await.unwrap().is_empty());

        session.undo().await.unwrap();
        assert_eq!(repo.list_recordings(&note_id).await.unwrap(), vec![recording.clone()]);

        session.undo().await.unwrap();
        assert!(repo.list_recordings(&note_id).await.unwrap().is_empty());

        session.redo().await.unwrap();
        assert_eq!(repo.list_recordings(&note_id).await.unwrap(), vec![recording]);
    }

    #[tokio::test]
    async fn test_strokes_undo_through_page_history() {
        let (mut session, repo, _temp) = open_session().await;
        let page_id = session.active_page().id.clone();

        draw(&mut session, 1.0);
        session.commit_strokes().await.unwrap();
        draw(&mut session, 2.0);
        session.commit_strokes().await.unwrap();

        assert_eq!(session.undo().await.unwrap(), Some(Outcome::StrokeUndone));
        assert_eq!(session.surface().strokes().len(), 1);
        let saved = repo.get_page(&page_id).await.unwrap();
        assert_eq!(saved.drawing_data, session.surface().snapshot().unwrap());

        assert_eq!(session.redo().await.unwrap(), Some(Outcome::StrokeRedone));
        assert_eq!(session.surface().strokes().len(), 2);
    }

    #[tokio::test]
    async fn test_page_switch_discards_history() {
        let (mut session, _repo, _temp) = open_session().await;

        session.add_attachment(b"png").await.unwrap();
        let second = session.add_page().await.unwrap();
        assert_eq!(session.active_page().id, second.id);
        assert!(!session.can_undo());

        assert!(session.previous_page().await.unwrap());
        assert!(!session.can_undo());
        assert!(session.is_first_page().await.unwrap());
    }

    #[tokio::test]
    async fn test_foreign_attachment_is_rejected() {
        let (mut session, _repo, _temp) = open_session().await;

        let attachment = session.add_attachment(b"png").await.unwrap();
        session.add_page().await.unwrap();

        let result = session.delete_attachment(&attachment.id).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(matches!(
            session.delete_attachment("missing").await,
            Err(AppError::AttachmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_undo_keeps_cursor() {
        let (mut session, repo, _temp) = open_session().await;

        session.add_attachment(b"png").await.unwrap();
        assert_eq!(session.history().cursor(), Some(0));

        repo.pool().close().await;

        assert!(session.undo().await.is_err());
        assert_eq!(session.history().cursor(), Some(0));
        assert!(session.can_undo());
        assert!(!session.can_redo());
    }

    #[tokio::test]
    async fn test_failed_stroke_save_keeps_cursor_and_surface() {
        let (mut session, repo, _temp) = open_session().await;

        draw(&mut session, 1.0);
        session.commit_strokes().await.unwrap();
        assert_eq!(session.history().cursor(), Some(0));

        repo.pool().close().await;

        assert!(session.undo().await.is_err());
        assert_eq!(session.history().cursor(), Some(0));
        assert_eq!(session.surface().strokes().len(), 1);
        assert!(!session.can_redo());
    }

    #[tokio::test]
    async fn test_recording_markers_survive_undo_and_redo() {
        let (mut session, repo, _temp) = open_session().await;

        let attachment = session.add_attachment(b"slide").await.unwrap();
        let recording = session.save_recording(b"audio", 20.0).await.unwrap();
        session
            .recordings
            .annotate(&recording.id, 6.0, Some(&attachment.id))
            .await
            .unwrap();
        let markers = repo.list_annotations(&recording.id).await.unwrap();

        // Markers added after the recording was saved come back on redo
        session.undo().await.unwrap();
        assert!(repo.list_annotations(&recording.id).await.unwrap().is_empty());
        session.redo().await.unwrap();
        assert_eq!(repo.list_annotations(&recording.id).await.unwrap(), markers);

        session.delete_recording(&recording.id).await.unwrap();
        session.undo().await.unwrap();
        assert_eq!(repo.list_annotations(&recording.id).await.unwrap(), markers);
    }

    #[tokio::test]
    async fn test_attachment_undo_relinks_markers() {
        let (mut session, repo, _temp) = open_session().await;

        let attachment = session.add_attachment(b"diagram").await.unwrap();
        let recording = session.recordings.save(session.note_id(), b"audio", 10.0).await.unwrap();
        let marker = session
            .recordings
            .annotate(&recording.id, 3.0, Some(&attachment.id))
            .await
            .unwrap();

        session.delete_attachment(&attachment.id).await.unwrap();
        let detached = repo.list_annotations(&recording.id).await.unwrap();
        assert_eq!(detached[0].attachment_id, None);

        session.undo().await.unwrap();
        assert_eq!(repo.list_annotations(&recording.id).await.unwrap(), vec![marker.clone()]);

        // Undoing the placement and redoing it also keeps the link
        session.undo().await.unwrap();
        session.redo().await.unwrap();
        assert_eq!(repo.list_annotations(&recording.id).await.unwrap(), vec![marker]);
    }

    #[tokio::test]
    async fn test_failed_edit_is_not_recorded() {
        let (mut session, _repo, _temp) = open_session().await;

        assert!(session.add_attachment(b"").await.is_err());
        assert!(session.save_recording(b"audio", f64::NAN).await.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_close_saves_drawing() {
        let (mut session, repo, _temp) = open_session().await;
        let page_id = session.active_page().id.clone();

        draw(&mut session, 5.0);
        session.close().await.unwrap();

        assert!(!repo.get_page(&page_id).await.unwrap().is_blank());
    }
}
