//! Application configuration constants
//!
//! Central location for history bounds, default geometry, tool presets
//! and the runtime configuration read from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ===== Undo/Redo =====

/// Number of actions kept in a page's undo history before the oldest is dropped
pub const MAX_ACTION_HISTORY_SIZE: usize = 30;

// ===== Canvas & Attachment Geometry =====

/// Logical width of the page canvas attachments are centred on
pub const CANVAS_WIDTH: f64 = 300.0;
/// Logical height of the page canvas attachments are centred on
pub const CANVAS_HEIGHT: f64 = 601.0;

/// Width given to a freshly placed image attachment
pub const DEFAULT_ATTACHMENT_WIDTH: f64 = 150.0;
/// Height given to a freshly placed image attachment
pub const DEFAULT_ATTACHMENT_HEIGHT: f64 = 150.0;

/// Smallest edge an attachment may be resized to
pub const MIN_ATTACHMENT_EDGE: f64 = 10.0;

// ===== Entity Defaults =====

/// Title of the fallback topic new notes are filed under
pub const DEFAULT_TOPIC_TITLE: &str = "General";

/// Title given to a note created without one
pub const DEFAULT_NOTE_TITLE: &str = "New Note";

/// Title a note falls back to when renamed to whitespace
pub const UNTITLED_NOTE_TITLE: &str = "Untitled Note";

/// Maximum length for topic and note titles, in characters
pub const MAX_TITLE_LENGTH: usize = 200;

// ===== Tool Presets =====

/// Default pen: opaque black, width 5
pub const DEFAULT_PEN_COLOR: [u8; 4] = [0, 0, 0, 255];
pub const DEFAULT_PEN_WIDTH: f64 = 5.0;

/// Highlighter: yellow at half opacity, width 15
pub const HIGHLIGHTER_COLOR: [u8; 4] = [255, 255, 0, 128];
pub const HIGHLIGHTER_WIDTH: f64 = 15.0;

/// Brush (pencil ink): blue, width 10
pub const BRUSH_COLOR: [u8; 4] = [0, 0, 255, 255];
pub const BRUSH_WIDTH: f64 = 10.0;

// ===== Runtime Configuration =====

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "NOTEL_DATA_DIR";

/// Environment variable overriding the undo history size
pub const HISTORY_SIZE_ENV: &str = "NOTEL_HISTORY_SIZE";

/// Runtime configuration for a Notel instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Root directory holding the database and blob store
    pub data_dir: PathBuf,
    /// Bound for each page's undo history
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_history_size() -> usize {
    MAX_ACTION_HISTORY_SIZE
}

impl AppConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            history_size: default_history_size(),
        }
    }

    /// Read configuration from `NOTEL_DATA_DIR` / `NOTEL_HISTORY_SIZE`.
    ///
    /// Unset or unparsable values fall back to defaults; the data dir
    /// defaults to `./notel-data`.
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("notel-data"));

        let history_size = match std::env::var(HISTORY_SIZE_ENV) {
            Ok(raw) => parse_history_size(&raw).unwrap_or_else(|| {
                tracing::warn!("Ignoring invalid {}: {:?}", HISTORY_SIZE_ENV, raw);
                default_history_size()
            }),
            Err(_) => default_history_size(),
        };

        Self {
            data_dir,
            history_size,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("notel.db")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

/// Parse a positive history size; zero and garbage are rejected.
fn parse_history_size(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_attachment_is_centred() {
        let x = CANVAS_WIDTH / 2.0 - DEFAULT_ATTACHMENT_WIDTH / 2.0;
        let y = CANVAS_HEIGHT / 2.0 - DEFAULT_ATTACHMENT_HEIGHT / 2.0;
        assert_eq!(x, 75.0);
        assert_eq!(y, 225.5);
    }

    #[test]
    fn test_parse_history_size() {
        assert_eq!(parse_history_size("12"), Some(12));
        assert_eq!(parse_history_size(" 40 "), Some(40));
        assert_eq!(parse_history_size("0"), None);
        assert_eq!(parse_history_size("many"), None);
    }

    #[test]
    fn test_paths_live_under_data_dir() {
        let config = AppConfig::new(PathBuf::from("/tmp/notel"));
        assert_eq!(config.history_size, MAX_ACTION_HISTORY_SIZE);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/notel/notel.db"));
        assert_eq!(config.blobs_dir(), PathBuf::from("/tmp/notel/blobs"));
    }
}
