//! Action interpreter
//!
//! Turns an [`Action`] and a [`Direction`] into store mutations. Entities
//! are always looked up and rebuilt by id; nothing here holds on to rows.
//!
//! A missing target is not an error: the store already reflects the
//! requested state, so the call reports [`Outcome::AlreadySatisfied`].
//! Persistence failures are logged and returned untouched; each mutation is
//! a single statement or transaction, so nothing is left half-built.

use super::action::{Action, AttachmentSnapshot, Direction, RecordingSnapshot};
use super::surface::StrokeSurface;
use crate::error::Result;
use crate::services::{AttachmentsService, RecordingsService};

/// The page (and its note) an action replays against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePage {
    pub page_id: String,
    pub note_id: String,
}

/// What applying an action did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The store was mutated
    Applied,
    /// The store already matched; nothing to do
    AlreadySatisfied,
    /// The surface undid one stroke
    StrokeUndone,
    /// The surface redid one stroke
    StrokeRedone,
    /// The surface had no stroke to undo or redo
    StrokeUnavailable,
}

#[derive(Clone)]
pub struct ActionInterpreter {
    attachments: AttachmentsService,
    recordings: RecordingsService,
}

impl ActionInterpreter {
    pub fn new(attachments: AttachmentsService, recordings: RecordingsService) -> Self {
        Self {
            attachments,
            recordings,
        }
    }

    /// Replay `action` in `direction` against `target`.
    ///
    /// When the replay removes an entity, `action`'s snapshot is refreshed
    /// from the row just deleted, so recreating it later is exact even if
    /// the entity changed after the action was recorded.
    pub async fn apply<S: StrokeSurface + ?Sized>(
        &self,
        action: &mut Action,
        direction: Direction,
        target: &ActivePage,
        surface: &mut S,
    ) -> Result<Outcome> {
        let kind = action.kind();
        tracing::debug!(action = kind, ?direction, page = %target.page_id, "Applying action");

        let result = match (action, direction) {
            (Action::DrawingCommit, direction) => Ok(Self::drive_surface(surface, direction)),

            (Action::AttachmentAdded(snapshot), Direction::Forward)
            | (Action::AttachmentDeleted(snapshot), Direction::Inverse) => {
                self.recreate_attachment(snapshot, target).await
            }
            (Action::AttachmentAdded(snapshot), Direction::Inverse)
            | (Action::AttachmentDeleted(snapshot), Direction::Forward) => {
                self.remove_attachment(snapshot).await
            }

            (Action::AttachmentMoved { id, from, to }, direction) => {
                let position = match direction {
                    Direction::Forward => *to,
                    Direction::Inverse => *from,
                };
                self.attachments.move_to(id, position).await.map(|moved| {
                    if moved {
                        Outcome::Applied
                    } else {
                        tracing::warn!("Attachment {} not found, move skipped", id);
                        Outcome::AlreadySatisfied
                    }
                })
            }

            (Action::RecordingAdded(snapshot), Direction::Forward)
            | (Action::RecordingDeleted(snapshot), Direction::Inverse) => {
                self.recreate_recording(snapshot, target).await
            }
            (Action::RecordingAdded(snapshot), Direction::Inverse)
            | (Action::RecordingDeleted(snapshot), Direction::Forward) => {
                self.remove_recording(snapshot).await
            }
        };

        if let Err(e) = &result {
            tracing::error!(
                action = kind,
                ?direction,
                "Failed to apply action, store unchanged: {}",
                e
            );
        }
        result
    }

    fn drive_surface<S: StrokeSurface + ?Sized>(surface: &mut S, direction: Direction) -> Outcome {
        let (moved, outcome) = match direction {
            Direction::Inverse => (surface.undo_stroke(), Outcome::StrokeUndone),
            Direction::Forward => (surface.redo_stroke(), Outcome::StrokeRedone),
        };

        if moved {
            outcome
        } else {
            tracing::warn!(?direction, "Stroke history out of step with page history");
            Outcome::StrokeUnavailable
        }
    }

    async fn recreate_attachment(
        &self,
        snapshot: &AttachmentSnapshot,
        target: &ActivePage,
    ) -> Result<Outcome> {
        match self.attachments.insert_snapshot(&target.page_id, snapshot).await? {
            Some(_) => Ok(Outcome::Applied),
            None => {
                tracing::warn!("Attachment {} already exists, not recreated", snapshot.id);
                Ok(Outcome::AlreadySatisfied)
            }
        }
    }

    async fn remove_attachment(&self, snapshot: &mut AttachmentSnapshot) -> Result<Outcome> {
        match self.attachments.delete(&snapshot.id).await? {
            Some(removed) => {
                *snapshot = removed;
                Ok(Outcome::Applied)
            }
            None => {
                tracing::warn!("Attachment {} not found, delete skipped", snapshot.id);
                Ok(Outcome::AlreadySatisfied)
            }
        }
    }

    async fn recreate_recording(
        &self,
        snapshot: &RecordingSnapshot,
        target: &ActivePage,
    ) -> Result<Outcome> {
        match self.recordings.insert_snapshot(&target.note_id, snapshot).await? {
            Some(_) => Ok(Outcome::Applied),
            None => {
                tracing::warn!("Recording {} already exists, not recreated", snapshot.id);
                Ok(Outcome::AlreadySatisfied)
            }
        }
    }

    async fn remove_recording(&self, snapshot: &mut RecordingSnapshot) -> Result<Outcome> {
        match self.recordings.delete(&snapshot.id).await? {
            Some(removed) => {
                *snapshot = removed;
                Ok(Outcome::Applied)
            }
            None => {
                tracing::warn!("Recording {} not found, delete skipped", snapshot.id);
                Ok(Outcome::AlreadySatisfied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        create_memory_pool, Attachment, CreateNoteRequest, Position, Recording, Repository,
    };
    use crate::editor::action_log::ActionLog;
    use crate::editor::surface::{InMemorySurface, Stroke};
    use crate::editor::tools::InkTool;
    use crate::storage::BlobStore;
    use tempfile::TempDir;

    struct Fixture {
        interpreter: ActionInterpreter,
        attachments: AttachmentsService,
        recordings: RecordingsService,
        target: ActivePage,
        _temp: TempDir,
    }

    async fn setup() -> Fixture {
        let repo = Repository::new(create_memory_pool().await.unwrap());
        let temp = TempDir::new().unwrap();
        let blob_store = BlobStore::new(temp.path().join("blobs"));
        blob_store.initialize().await.unwrap();

        let note = repo
            .create_note(CreateNoteRequest {
                title: "Lab".to_string(),
                topic_id: None,
            })
            .await
            .unwrap();
        let page = repo.list_pages(&note.id).await.unwrap().remove(0);

        let attachments = AttachmentsService::new(repo.clone(), blob_store.clone());
        let recordings = RecordingsService::new(repo, blob_store);

        Fixture {
            interpreter: ActionInterpreter::new(attachments.clone(), recordings.clone()),
            attachments,
            recordings,
            target: ActivePage {
                page_id: page.id,
                note_id: note.id,
            },
            _temp: temp,
        }
    }

    impl Fixture {
        async fn state(&self) -> (Vec<Attachment>, Vec<Recording>) {
            (
                self.attachments.list(&self.target.page_id).await.unwrap(),
                self.recordings.list(&self.target.note_id).await.unwrap(),
            )
        }

        async fn apply(&self, action: &mut Action, direction: Direction) -> Outcome {
            let mut surface = InMemorySurface::new();
            self.interpreter
                .apply(action, direction, &self.target, &mut surface)
                .await
                .unwrap()
        }

        /// Undo then redo must land on the state from before the undo
        async fn assert_round_trip(&self, mut action: Action) {
            let before = self.state().await;
            assert_eq!(self.apply(&mut action, Direction::Inverse).await, Outcome::Applied);
            assert_ne!(self.state().await, before);
            assert_eq!(self.apply(&mut action, Direction::Forward).await, Outcome::Applied);
            assert_eq!(self.state().await, before);
        }
    }

    #[tokio::test]
    async fn test_attachment_added_round_trip() {
        let fx = setup().await;
        let attachment = fx.attachments.add_image(&fx.target.page_id, b"png").await.unwrap();
        let snapshot = fx.attachments.snapshot(&attachment.id).await.unwrap().unwrap();

        fx.assert_round_trip(Action::AttachmentAdded(snapshot)).await;
    }

    #[tokio::test]
    async fn test_attachment_deleted_round_trip() {
        let fx = setup().await;
        let attachment = fx.attachments.add_image(&fx.target.page_id, b"png").await.unwrap();
        let snapshot = fx.attachments.delete(&attachment.id).await.unwrap().unwrap();

        fx.assert_round_trip(Action::AttachmentDeleted(snapshot)).await;
    }

    #[tokio::test]
    async fn test_attachment_moved_round_trip() {
        let fx = setup().await;
        let attachment = fx.attachments.add_image(&fx.target.page_id, b"png").await.unwrap();
        let to = Position::new(10.0, 20.0);
        fx.attachments.move_to(&attachment.id, to).await.unwrap();

        fx.assert_round_trip(Action::AttachmentMoved {
            id: attachment.id.clone(),
            from: attachment.position(),
            to,
        })
        .await;
    }

    #[tokio::test]
    async fn test_recording_round_trips() {
        let fx = setup().await;
        let recording = fx.recordings.save(&fx.target.note_id, b"aac", 12.5).await.unwrap();
        let snapshot = fx.recordings.snapshot(&recording.id).await.unwrap().unwrap();

        fx.assert_round_trip(Action::RecordingAdded(snapshot)).await;

        let snapshot = fx.recordings.delete(&recording.id).await.unwrap().unwrap();
        fx.assert_round_trip(Action::RecordingDeleted(snapshot)).await;
    }

    #[tokio::test]
    async fn test_missing_targets_are_already_satisfied() {
        let fx = setup().await;
        let attachment = fx.attachments.add_image(&fx.target.page_id, b"png").await.unwrap();
        let snapshot = fx.attachments.delete(&attachment.id).await.unwrap().unwrap();

        let mut added = Action::AttachmentAdded(snapshot.clone());
        assert_eq!(fx.apply(&mut added, Direction::Inverse).await, Outcome::AlreadySatisfied);

        let mut moved = Action::AttachmentMoved {
            id: snapshot.id.clone(),
            from: Position::new(0.0, 0.0),
            to: Position::new(1.0, 1.0),
        };
        assert_eq!(fx.apply(&mut moved, Direction::Forward).await, Outcome::AlreadySatisfied);

        // Recreating twice leaves a single row
        let mut deleted = Action::AttachmentDeleted(snapshot);
        assert_eq!(fx.apply(&mut deleted, Direction::Inverse).await, Outcome::Applied);
        assert_eq!(fx.apply(&mut deleted, Direction::Inverse).await, Outcome::AlreadySatisfied);
        assert_eq!(fx.state().await.0.len(), 1);
    }

    #[tokio::test]
    async fn test_drawing_commit_drives_surface() {
        let fx = setup().await;
        let mut surface = InMemorySurface::new();
        surface.add_stroke(Stroke::with_tool(InkTool::default_pen(), vec![(0.0, 0.0)]));

        let mut action = Action::DrawingCommit;
        let undo = fx
            .interpreter
            .apply(&mut action, Direction::Inverse, &fx.target, &mut surface)
            .await
            .unwrap();
        assert_eq!(undo, Outcome::StrokeUndone);
        assert!(surface.is_blank());

        let desync = fx
            .interpreter
            .apply(&mut action, Direction::Inverse, &fx.target, &mut surface)
            .await
            .unwrap();
        assert_eq!(desync, Outcome::StrokeUnavailable);

        let redo = fx
            .interpreter
            .apply(&mut action, Direction::Forward, &fx.target, &mut surface)
            .await
            .unwrap();
        assert_eq!(redo, Outcome::StrokeRedone);
        assert_eq!(surface.strokes().len(), 1);
    }

    #[tokio::test]
    async fn test_add_move_delete_scenario() {
        let fx = setup().await;
        let mut log = ActionLog::default();

        // A: add X
        let x = fx.attachments.add_image(&fx.target.page_id, b"X").await.unwrap();
        let added = fx.attachments.snapshot(&x.id).await.unwrap().unwrap();
        log.record(Action::AttachmentAdded(added));

        // B: move X
        let to = Position::new(40.0, 50.0);
        fx.attachments.move_to(&x.id, to).await.unwrap();
        log.record(Action::AttachmentMoved {
            id: x.id.clone(),
            from: x.position(),
            to,
        });

        // C: delete X
        let deleted = fx.attachments.delete(&x.id).await.unwrap().unwrap();
        log.record(Action::AttachmentDeleted(deleted));
        assert_eq!(log.cursor(), Some(2));

        let mut c = log.undo().unwrap();
        assert!(matches!(c, Action::AttachmentDeleted(_)));
        assert_eq!(log.cursor(), Some(1));
        fx.apply(&mut c, Direction::Inverse).await;
        let restored = fx.attachments.get(&x.id).await.unwrap();
        assert_eq!(restored.position(), to);
        assert_eq!((restored.width, restored.height), (x.width, x.height));

        let mut b = log.undo().unwrap();
        assert!(matches!(b, Action::AttachmentMoved { .. }));
        assert_eq!(log.cursor(), Some(0));
        fx.apply(&mut b, Direction::Inverse).await;
        assert_eq!(fx.attachments.get(&x.id).await.unwrap().position(), x.position());

        let mut b = log.redo().unwrap();
        assert_eq!(log.cursor(), Some(1));
        fx.apply(&mut b, Direction::Forward).await;
        assert_eq!(fx.attachments.get(&x.id).await.unwrap().position(), to);
    }
}
