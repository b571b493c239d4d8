//! Commands, composed edit operations, overlay modes and the editor
//! coordinator.
//!
//! Data flow: external key events enter [`editor::Editor::handle_event`];
//! the active overlay (if any) gets first chance, otherwise the key
//! translates into a [`command::Command`] executed against the active view.
//! Edits raise actions on the buffer; the editor replays each applied
//! action onto every other view of the same buffer before the next event.

pub mod command;
pub mod editops;
pub mod editor;
pub mod overlays;
pub mod providers;

pub use command::{translate_view_key, Command};
pub use editor::Editor;
pub use overlays::Overlay;
pub use providers::{BufferNameAc, FilesystemAc, LocalAc};
