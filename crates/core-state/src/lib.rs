//! Buffer model: line storage, cursors, the action engine and its history.
//!
//! All changes to buffer contents are initiated by an [`action::Action`];
//! there is no other mutation path. Lines live in an arena of stable handles
//! ([`text::LineId`]) so that an action can keep the very line nodes it
//! spliced in or out — reverting a delete relinks the *same* nodes, which is
//! what makes undo byte- and pointer-identical.
//!
//! The crate also owns the shared editor context (status writer, kill
//! buffer, buffer list) handed to every view, replacing what would otherwise
//! be module-level globals.

pub mod action;
pub mod buffer;
pub mod command_class;
pub mod context;
pub mod cursor;
pub mod history;
pub mod text;

pub use action::{Action, ActionKind};
pub use buffer::Buffer;
pub use command_class::{CommandClass, LastCommand};
pub use context::{EditorContext, SharedContext};
pub use cursor::{bytes_between, CursorLocation, ViewLocation};
pub use history::{ActionGroup, History};
pub use text::{BufferText, LineId};

use std::cell::RefCell;
use std::rc::Rc;

/// Buffers are observed by any number of views; single-threaded shared
/// ownership.
pub type SharedBuffer = Rc<RefCell<Buffer>>;
