//! Overlay modes: transient input handlers that get first chance at every
//! key while active.
//!
//! The editor holds at most one overlay. Handlers receive the overlay *by
//! value* and return the overlay state for the next keystroke: `Some(self)`
//! to stay, `Some(other)` to hand over, `None` to end modal input. A handler
//! that ends or replaces itself must run its own `exit` cleanup first — the
//! outgoing overlay's cleanup runs on every transition, including apply.

pub mod autocomplete_cycle;
pub mod extended;
pub mod isearch;
pub mod key_press;
pub mod line_edit;
pub mod macro_repeat;
pub mod region_indent;
pub mod view_op;

use crate::editor::Editor;
use core_events::KeyEvent;

pub use autocomplete_cycle::AutocompleteCycleMode;
pub use extended::ExtendedMode;
pub use isearch::IsearchMode;
pub use key_press::KeyPressMode;
pub use line_edit::{LineEditMode, LineEditOutcome, LineEditParams};
pub use macro_repeat::MacroRepeatMode;
pub use region_indent::RegionIndentMode;
pub use view_op::ViewOpMode;

pub enum Overlay {
    Extended(ExtendedMode),
    LineEdit(LineEditMode),
    Isearch(IsearchMode),
    AutocompleteCycle(AutocompleteCycleMode),
    ViewOp(ViewOpMode),
    MacroRepeat(MacroRepeatMode),
    KeyPress(KeyPressMode),
    RegionIndent(RegionIndentMode),
    Redo(RedoMode),
}

impl Overlay {
    /// First-chance key handling; returns the overlay for the next key.
    pub fn on_key(self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        match self {
            Overlay::Extended(m) => m.on_key(ed, ev),
            Overlay::LineEdit(m) => m.on_key(ed, ev),
            Overlay::Isearch(m) => m.on_key(ed, ev),
            Overlay::AutocompleteCycle(m) => m.on_key(ed, ev),
            Overlay::ViewOp(m) => m.on_key(ed, ev),
            Overlay::MacroRepeat(m) => m.on_key(ed, ev),
            Overlay::KeyPress(m) => m.on_key(ed, ev),
            Overlay::RegionIndent(m) => m.on_key(ed, ev),
            Overlay::Redo(m) => m.on_key(ed, ev),
        }
    }

    /// Cleanup on dismissal or replacement.
    pub fn exit(self, ed: &mut Editor) {
        match self {
            Overlay::LineEdit(m) => m.exit(ed),
            Overlay::Isearch(m) => m.exit(ed),
            Overlay::RegionIndent(m) => m.exit(ed),
            _ => {}
        }
    }

    /// Paint the overlay's own area onto the editor's composed grid.
    pub fn draw(&mut self, ed: &mut Editor) {
        match self {
            Overlay::LineEdit(m) => m.draw(ed),
            Overlay::Isearch(m) => m.draw(ed),
            Overlay::ViewOp(m) => m.draw(ed),
            _ => {}
        }
    }

    pub fn on_resize(&mut self, ed: &mut Editor, w: usize, h: usize) {
        match self {
            Overlay::LineEdit(m) => m.on_resize(ed, w, h),
            Overlay::Isearch(m) => m.on_resize(ed, w, h),
            _ => {}
        }
    }

    /// Whether the overlay owns the hardware cursor.
    pub fn needs_cursor(&self) -> bool {
        matches!(
            self,
            Overlay::LineEdit(_) | Overlay::Isearch(_) | Overlay::ViewOp(_)
        )
    }

    pub fn cursor_position(&self, ed: &Editor) -> Option<(usize, usize)> {
        match self {
            Overlay::LineEdit(m) => Some(m.cursor_position(ed)),
            Overlay::Isearch(m) => Some(m.cursor_position(ed)),
            // the view-op overlay hides the cursor
            Overlay::ViewOp(_) => None,
            _ => None,
        }
    }
}

/// After a redo, a bare `C-/` redoes again; any other key falls through to
/// normal handling.
pub struct RedoMode;

impl RedoMode {
    pub fn on_key(self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if crate::command::is_undo_chord(ev) {
            crate::editops::exec(ed.active_view_mut(), crate::command::Command::Redo);
            return Some(Overlay::Redo(self));
        }
        ed.on_key(ev)
    }
}
