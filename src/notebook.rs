//! The notebook: all sheets of a document plus the active-tab state and
//! a bounded stack of recently closed sheets for reopening.

use tracing::debug;

use crate::history::DEFAULT_HISTORY_DEPTH;
use crate::sheet::{Sheet, DEFAULT_CANVAS_SIZE};

/// How many closed sheets are kept around for reopening.
pub const MAX_CLOSED_SHEETS: usize = 10;

#[derive(Debug)]
pub struct Notebook {
    sheets: Vec<Sheet>,
    active: usize,
    /// Recently closed sheets, most recent last.
    closed: Vec<Sheet>,
    /// Set when this document was loaded from a save written by a newer
    /// application version; carried through subsequent saves.
    pub downgraded: bool,
    /// Canvas size applied to newly added sheets.
    pub default_canvas_size: (u32, u32),
    /// Undo depth applied to newly added sheets, from the
    /// `history_depth` preference.
    pub history_depth: usize,
}

impl Notebook {
    pub fn new() -> Self {
        Self::with_defaults(DEFAULT_CANVAS_SIZE, DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_defaults(canvas_size: (u32, u32), history_depth: usize) -> Self {
        Self {
            sheets: vec![Sheet::with_history_depth("Sheet 1", canvas_size, history_depth)],
            active: 0,
            closed: Vec::new(),
            downgraded: false,
            default_canvas_size: canvas_size,
            history_depth,
        }
    }

    /// Rebuild from persisted sheets. Falls back to a single empty sheet
    /// if the save contained none. The active sheet's canvas size becomes
    /// the default for sheets added later.
    pub fn from_sheets(mut sheets: Vec<Sheet>, active: usize) -> Self {
        if sheets.is_empty() {
            sheets.push(Sheet::default());
        }
        let active = active.min(sheets.len() - 1);
        let default_canvas_size = sheets[active].canvas_size;
        Self {
            sheets,
            active,
            closed: Vec::new(),
            downgraded: false,
            default_canvas_size,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheets[self.active]
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.sheets.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Append a new auto-named sheet and make it active.
    pub fn add_sheet(&mut self) -> &mut Sheet {
        let name = format!("Sheet {}", self.sheets.len() + 1);
        debug!(%name, "add sheet");
        self.sheets
            .push(Sheet::with_history_depth(name, self.default_canvas_size, self.history_depth));
        self.active = self.sheets.len() - 1;
        &mut self.sheets[self.active]
    }

    pub fn rename_sheet(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.sheets.get_mut(index) {
            Some(sheet) => {
                sheet.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Close a sheet, remembering it for `reopen_last_closed`. The
    /// notebook never becomes empty: closing the last sheet swaps in a
    /// fresh one.
    pub fn close_sheet(&mut self, index: usize) -> bool {
        if index >= self.sheets.len() {
            return false;
        }
        let removed = self.sheets.remove(index);
        debug!(name = %removed.name, "close sheet");
        self.closed.push(removed);
        while self.closed.len() > MAX_CLOSED_SHEETS {
            self.closed.remove(0);
        }
        if self.sheets.is_empty() {
            self.sheets.push(Sheet::with_history_depth(
                "Sheet 1",
                self.default_canvas_size,
                self.history_depth,
            ));
        }
        if self.active >= self.sheets.len() {
            self.active = self.sheets.len() - 1;
        }
        true
    }

    /// Re-append the most recently closed sheet and select it.
    pub fn reopen_last_closed(&mut self) -> bool {
        match self.closed.pop() {
            Some(sheet) => {
                self.sheets.push(sheet);
                self.active = self.sheets.len() - 1;
                true
            }
            None => false,
        }
    }

    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}
