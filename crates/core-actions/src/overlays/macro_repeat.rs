//! After a macro replay, a bare `e` replays it again; any other key falls
//! through to normal handling.

use super::Overlay;
use crate::editor::Editor;
use core_events::KeyEvent;

pub struct MacroRepeatMode;

impl MacroRepeatMode {
    pub fn new(ed: &mut Editor) -> MacroRepeatMode {
        ed.replay_macro();
        ed.set_status("(Type e to repeat macro)");
        MacroRepeatMode
    }

    pub fn on_key(self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if ev.plain_char() == Some('e') {
            ed.replay_macro();
            ed.set_status("(Type e to repeat macro)");
            return Some(Overlay::MacroRepeat(self));
        }
        ed.on_key(ev)
    }
}
