//! Whyteboard document core.
//!
//! The data model behind a multi-sheet whiteboard application: shapes
//! with hit-testing geometry, per-sheet undo/redo, the sheet notebook,
//! the `.wtbd` save archive and the PDF/PS conversion cache. No widget
//! toolkit lives here; a GUI front end drives these types through its
//! own event loop.

pub mod config;
pub mod convert;
pub mod geometry;
pub mod history;
pub mod notebook;
pub mod shapes;
pub mod sheet;
pub mod wtbd;

pub use geometry::{Point, Rect};
pub use notebook::Notebook;
pub use shapes::{Colour, Shape, Style, Tool};
pub use sheet::Sheet;
pub use wtbd::{Document, ImageStore, Version};
