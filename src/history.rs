//! Two-stack undo/redo over whole shape-list snapshots.
//!
//! Each checkpoint stores a full copy of the sheet's shape list. Coarse,
//! but shape counts are small and it keeps restore trivial. History is
//! bounded; the oldest snapshot is dropped first.

use crate::shapes::Shape;

/// Default number of snapshots kept per sheet.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Manages undo/redo snapshots for one sheet.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo_stack: Vec<Vec<Shape>>,
    redo_stack: Vec<Vec<Shape>>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state that is about to be mutated. Any redo states
    /// become unreachable and are discarded.
    pub fn checkpoint(&mut self, current: &[Shape]) {
        self.undo_stack.push(current.to_vec());
        self.redo_stack.clear();
        while self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the previous state, pushing `current` onto the redo stack.
    pub fn undo(&mut self, current: &[Shape]) -> Option<Vec<Shape>> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current.to_vec());
        Some(previous)
    }

    /// Mirror of `undo`.
    pub fn redo(&mut self, current: &[Shape]) -> Option<Vec<Shape>> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current.to_vec());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
