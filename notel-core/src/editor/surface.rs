//! Stroke-editing surface boundary
//!
//! The page's ink lives in a drawing surface with its own fine-grained
//! stroke undo stack. The editor only needs to snapshot it, load it and
//! drive that stack one step at a time.

use super::tools::{InkKind, InkTool};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

pub trait StrokeSurface {
    /// Serialized drawing; empty means blank.
    ///
    /// Fails rather than returning data that [`load`](Self::load) would reject.
    fn snapshot(&self) -> Result<Vec<u8>>;

    /// Replace the drawing and clear the stroke stack.
    ///
    /// On undecodable data the surface is left blank and an error returned.
    fn load(&mut self, drawing: &[u8]) -> Result<()>;

    /// Undo one stroke; false when the surface had nothing to undo
    fn undo_stroke(&mut self) -> bool;

    /// Redo one stroke; false when the surface had nothing to redo
    fn redo_stroke(&mut self) -> bool;
}

/// One continuous freehand gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub ink: InkKind,
    pub color: [u8; 4],
    pub width: f64,
    pub points: Vec<(f64, f64)>,
}

impl Stroke {
    pub fn with_tool(tool: InkTool, points: Vec<(f64, f64)>) -> Self {
        Self {
            ink: tool.kind,
            color: tool.color,
            width: tool.width,
            points,
        }
    }

    fn is_finite(&self) -> bool {
        self.width.is_finite() && self.points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Drawing {
    strokes: Vec<Stroke>,
}

/// Headless surface keeping strokes in memory, serialized as JSON.
///
/// Strokes that arrived through [`load`](StrokeSurface::load) are not
/// undoable; only strokes drawn since then are.
#[derive(Debug, Clone, Default)]
pub struct InMemorySurface {
    strokes: Vec<Stroke>,
    /// Strokes below this index came from the last load
    loaded: usize,
    undone: Vec<Stroke>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a stroke; a new stroke invalidates the surface's redo stack
    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.undone.clear();
        self.strokes.push(stroke);
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_blank(&self) -> bool {
        self.strokes.is_empty()
    }
}

impl StrokeSurface for InMemorySurface {
    fn snapshot(&self) -> Result<Vec<u8>> {
        if self.strokes.is_empty() {
            return Ok(Vec::new());
        }

        // JSON writes non-finite numbers as null, which would not load back
        if let Some(stroke) = self.strokes.iter().find(|s| !s.is_finite()) {
            return Err(AppError::Drawing(format!(
                "stroke with {} point(s) has non-finite geometry",
                stroke.points.len()
            )));
        }

        let drawing = Drawing {
            strokes: self.strokes.clone(),
        };
        serde_json::to_vec(&drawing).map_err(|e| AppError::Drawing(e.to_string()))
    }

    fn load(&mut self, drawing: &[u8]) -> Result<()> {
        self.strokes.clear();
        self.undone.clear();
        self.loaded = 0;

        if drawing.is_empty() {
            return Ok(());
        }

        let decoded: Drawing =
            serde_json::from_slice(drawing).map_err(|e| AppError::Drawing(e.to_string()))?;
        self.loaded = decoded.strokes.len();
        self.strokes = decoded.strokes;
        Ok(())
    }

    fn undo_stroke(&mut self) -> bool {
        if self.strokes.len() <= self.loaded {
            return false;
        }
        match self.strokes.pop() {
            Some(stroke) => {
                self.undone.push(stroke);
                true
            }
            None => false,
        }
    }

    fn redo_stroke(&mut self) -> bool {
        match self.undone.pop() {
            Some(stroke) => {
                self.strokes.push(stroke);
                true
            }
            None => false,
        }
    }
}
