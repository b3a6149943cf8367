//! One sheet of the whiteboard: an ordered shape list plus its own
//! undo history and canvas size.
//!
//! Every mutating operation checkpoints the history first, so a single
//! undo steps back exactly one user action.

use tracing::debug;

use crate::geometry::Point;
use crate::history::{History, DEFAULT_HISTORY_DEPTH};
use crate::shapes::Shape;

/// Default canvas size for new sheets, in pixels.
pub const DEFAULT_CANVAS_SIZE: (u32, u32) = (1000, 1000);

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    shapes: Vec<Shape>,
    history: History,
    pub canvas_size: (u32, u32),
}

impl Sheet {
    pub fn new(name: impl Into<String>, canvas_size: (u32, u32)) -> Self {
        Self::with_history_depth(name, canvas_size, DEFAULT_HISTORY_DEPTH)
    }

    /// A sheet whose undo history keeps at most `history_depth` snapshots,
    /// honouring the `history_depth` preference.
    pub fn with_history_depth(
        name: impl Into<String>,
        canvas_size: (u32, u32),
        history_depth: usize,
    ) -> Self {
        Self {
            name: name.into(),
            shapes: Vec::new(),
            history: History::new(history_depth),
            canvas_size,
        }
    }

    /// Rebuild a sheet from persisted data. History starts empty; undo
    /// does not reach across a save/load boundary.
    pub fn from_parts(name: String, canvas_size: (u32, u32), shapes: Vec<Shape>) -> Self {
        Self {
            name,
            shapes,
            history: History::new(DEFAULT_HISTORY_DEPTH),
            canvas_size,
        }
    }

    /// Shapes in z-order: index 0 is the bottom.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Finalize a shape onto the top of the z-order.
    pub fn add_shape(&mut self, shape: Shape) {
        self.history.checkpoint(&self.shapes);
        debug!(tool = shape.tool().name(), "add shape");
        self.shapes.push(shape);
    }

    pub fn delete_shape(&mut self, index: usize) -> Option<Shape> {
        if index >= self.shapes.len() {
            return None;
        }
        self.history.checkpoint(&self.shapes);
        Some(self.shapes.remove(index))
    }

    /// Replace a shape in place, e.g. after a move or resize drag.
    pub fn replace_shape(&mut self, index: usize, shape: Shape) -> bool {
        if index >= self.shapes.len() {
            return false;
        }
        self.history.checkpoint(&self.shapes);
        self.shapes[index] = shape;
        true
    }

    /// Remove everything, or everything except placed images.
    pub fn clear(&mut self, keep_images: bool) {
        self.history.checkpoint(&self.shapes);
        if keep_images {
            self.shapes.retain(|s| matches!(s, Shape::Image { .. }));
        } else {
            self.shapes.clear();
        }
    }

    /// Topmost shape under `p`, as (index, shape).
    pub fn shape_at(&self, p: Point) -> Option<(usize, &Shape)> {
        self.shapes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, s)| s.hit_test(p))
    }

    // Z-order moves. All checkpoint so they are individually undoable.

    pub fn raise_shape(&mut self, index: usize) -> bool {
        if index + 1 >= self.shapes.len() {
            return false;
        }
        self.history.checkpoint(&self.shapes);
        self.shapes.swap(index, index + 1);
        true
    }

    pub fn lower_shape(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.shapes.len() {
            return false;
        }
        self.history.checkpoint(&self.shapes);
        self.shapes.swap(index, index - 1);
        true
    }

    pub fn shape_to_front(&mut self, index: usize) -> bool {
        if index >= self.shapes.len() {
            return false;
        }
        self.history.checkpoint(&self.shapes);
        let shape = self.shapes.remove(index);
        self.shapes.push(shape);
        true
    }

    pub fn shape_to_back(&mut self, index: usize) -> bool {
        if index >= self.shapes.len() {
            return false;
        }
        self.history.checkpoint(&self.shapes);
        let shape = self.shapes.remove(index);
        self.shapes.insert(0, shape);
        true
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.shapes) {
            Some(previous) => {
                self.shapes = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.shapes) {
            Some(next) => {
                self.shapes = next;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new("Sheet 1", DEFAULT_CANVAS_SIZE)
    }
}
