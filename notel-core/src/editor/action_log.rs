//! Per-page undo/redo history
//!
//! A bounded sequence of [`Action`]s with a cursor on the last applied one.
//! Recording after an undo discards the redo branch; exceeding the bound
//! drops the oldest entry while keeping the cursor on the same action.
//!
//! The log is scoped to one page visit and is never persisted.

use super::action::Action;
use crate::config::MAX_ACTION_HISTORY_SIZE;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ActionLog {
    history: VecDeque<Action>,
    /// Number of applied actions; the cursor sits at `applied - 1`
    applied: usize,
    max_size: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(MAX_ACTION_HISTORY_SIZE)
    }
}

impl ActionLog {
    /// A log keeping at most `max_size` actions (at least one)
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            history: VecDeque::with_capacity(max_size + 1),
            applied: 0,
            max_size,
        }
    }

    /// Append an action that has just been applied to the store.
    pub fn record(&mut self, action: Action) {
        if self.applied < self.history.len() {
            let discarded = self.history.len() - self.applied;
            self.history.truncate(self.applied);
            tracing::debug!("Discarded {} redo action(s)", discarded);
        }

        tracing::debug!(
            action = action.kind(),
            position = self.applied,
            "Recorded action"
        );
        self.history.push_back(action);
        self.applied += 1;

        if self.history.len() > self.max_size {
            self.history.pop_front();
            self.applied -= 1;
            tracing::debug!("History full, dropped oldest action");
        }
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.history.len()
    }

    /// The action [`undo`](Self::undo) would return, without moving the cursor
    pub fn peek_undo(&self) -> Option<&Action> {
        self.applied.checked_sub(1).and_then(|i| self.history.get(i))
    }

    /// The action [`redo`](Self::redo) would return, without moving the cursor
    pub fn peek_redo(&self) -> Option<&Action> {
        self.history.get(self.applied)
    }

    /// Step back over the last applied action and return it for inversion.
    ///
    /// `None` (and no change) when there is nothing to undo.
    pub fn undo(&mut self) -> Option<Action> {
        let action = self.peek_undo()?.clone();
        self.applied -= 1;
        tracing::debug!(action = action.kind(), cursor = ?self.cursor(), "Undo");
        Some(action)
    }

    /// Step forward onto the next action and return it for re-application.
    ///
    /// `None` (and no change) when there is nothing to redo.
    pub fn redo(&mut self) -> Option<Action> {
        let action = self.peek_redo()?.clone();
        self.applied += 1;
        tracing::debug!(action = action.kind(), cursor = ?self.cursor(), "Redo");
        Some(action)
    }

    /// Replace the action `undo` would return next, keeping the cursor.
    /// Used to store the snapshot taken when a redo removed an entity.
    pub fn refresh_undo(&mut self, action: Action) {
        if let Some(slot) = self
            .applied
            .checked_sub(1)
            .and_then(|i| self.history.get_mut(i))
        {
            *slot = action;
        }
    }

    /// Replace the action `redo` would return next, keeping the cursor
    pub fn refresh_redo(&mut self, action: Action) {
        if let Some(slot) = self.history.get_mut(self.applied) {
            *slot = action;
        }
    }

    /// Forget everything, e.g. when leaving the page
    pub fn reset(&mut self) {
        if !self.history.is_empty() {
            tracing::debug!("Cleared {} action(s) from history", self.history.len());
        }
        self.history.clear();
        self.applied = 0;
    }

    /// Index of the last applied action; `None` when nothing is applied
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Actions oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.history.iter()
    }
}
