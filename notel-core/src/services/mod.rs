//! Services module
//!
//! Business logic services that coordinate between the editor and the repository.

pub mod attachments;
pub mod notes;
pub mod recordings;

pub use attachments::AttachmentsService;
pub use notes::NotesService;
pub use recordings::RecordingsService;
