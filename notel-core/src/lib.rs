//! Notel library
//!
//! Page editing core of the Notel note-taking app: topics, notes, pages,
//! attachments and recordings, with per-page undo/redo.

pub mod app;
pub mod config;
pub mod database;
pub mod editor;
pub mod error;
pub mod services;
pub mod storage;
