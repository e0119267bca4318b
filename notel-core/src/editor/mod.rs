//! Page editor core
//!
//! - Action records and the bounded per-page undo history
//! - The interpreter replaying actions against the store
//! - Page navigation and the editing session tying them together

pub mod action;
pub mod action_log;
pub mod interpreter;
pub mod navigator;
pub mod session;
pub mod surface;
pub mod tools;

pub use action::{Action, AttachmentSnapshot, Direction, RecordingSnapshot};
pub use action_log::ActionLog;
pub use interpreter::{ActionInterpreter, ActivePage, Outcome};
pub use navigator::PageNavigator;
pub use session::EditingSession;
pub use surface::{InMemorySurface, Stroke, StrokeSurface};
pub use tools::{InkKind, InkTool, Tool, ToolSettings};
