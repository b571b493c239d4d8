//! Views and rendering.
//!
//! [`cell`] is the framebuffer vocabulary (cells, grids, rects and the
//! popup placement helper), [`view`] is the buffer observer with the scroll
//! model and the editing primitives, [`autocompl`] the completion session
//! attached to a view.

pub mod autocompl;
pub mod cell;
pub mod view;

pub use autocompl::{AcProposal, AcProvider, AutocomplSession, AC_MAX_FILTERED, AC_UI_MAX_LINES};
pub use cell::{find_place_for_rect, Attrs, Cell, CellGrid, Color, Rect};
pub use view::{
    Broadcast, Dirty, View, ViewTag, HL_BG, HL_FG, HORIZONTAL_THRESHOLD, VERTICAL_THRESHOLD,
};
