//! Drawing tool selection
//!
//! Owned by an editing session and passed explicitly; nothing here is
//! global. The pen remembers its last colour and width so switching to the
//! highlighter or eraser and back restores it.

use crate::config::{
    BRUSH_COLOR, BRUSH_WIDTH, DEFAULT_PEN_COLOR, DEFAULT_PEN_WIDTH, HIGHLIGHTER_COLOR,
    HIGHLIGHTER_WIDTH,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InkKind {
    Pen,
    Highlighter,
    Brush,
}

/// An inking tool: kind, RGBA colour and stroke width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkTool {
    pub kind: InkKind,
    pub color: [u8; 4],
    pub width: f64,
}

impl InkTool {
    pub fn default_pen() -> Self {
        Self {
            kind: InkKind::Pen,
            color: DEFAULT_PEN_COLOR,
            width: DEFAULT_PEN_WIDTH,
        }
    }

    pub fn highlighter() -> Self {
        Self {
            kind: InkKind::Highlighter,
            color: HIGHLIGHTER_COLOR,
            width: HIGHLIGHTER_WIDTH,
        }
    }

    pub fn brush() -> Self {
        Self {
            kind: InkKind::Brush,
            color: BRUSH_COLOR,
            width: BRUSH_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tool {
    Ink(InkTool),
    Eraser,
    Lasso,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    current: Tool,
    last_pen: InkTool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        let pen = InkTool::default_pen();
        Self {
            current: Tool::Ink(pen),
            last_pen: pen,
        }
    }
}

impl ToolSettings {
    pub fn current(&self) -> Tool {
        self.current
    }

    pub fn last_pen(&self) -> InkTool {
        self.last_pen
    }

    /// Switch back to the pen with its last colour and width
    pub fn select_pen(&mut self) -> Tool {
        self.current = Tool::Ink(self.last_pen);
        self.current
    }

    pub fn select_highlighter(&mut self) -> Tool {
        self.current = Tool::Ink(InkTool::highlighter());
        self.current
    }

    pub fn select_brush(&mut self) -> Tool {
        self.current = Tool::Ink(InkTool::brush());
        self.current
    }

    pub fn select_eraser(&mut self) -> Tool {
        self.current = Tool::Eraser;
        self.current
    }

    pub fn select_lasso(&mut self) -> Tool {
        self.current = Tool::Lasso;
        self.current
    }

    /// Take a tool picked from the palette.
    ///
    /// Only pens are remembered; highlighter and brush presets are fixed.
    pub fn apply_palette(&mut self, ink: InkTool) {
        if ink.kind == InkKind::Pen {
            tracing::debug!("Pen updated: color {:?}, width {}", ink.color, ink.width);
            self.last_pen = ink;
        }
        self.current = Tool::Ink(ink);
    }
}
