//! `M-/` incremental expansion: each press substitutes the next local
//! proposal, undoing the previous substitution first. Exhausting the list
//! reports "No further expansions found"; any other key ends the mode.

use super::Overlay;
use crate::editor::Editor;
use crate::providers::LocalAc;
use core_events::KeyEvent;
use core_render::{AcProposal, AcProvider, Dirty};
use core_state::{CursorLocation, LastCommand};

pub struct AutocompleteCycleMode {
    origin: CursorLocation,
    proposals: Vec<AcProposal>,
    prefix_len: usize,
    current: Option<usize>,
}

impl AutocompleteCycleMode {
    pub fn new(ed: &mut Editor) -> AutocompleteCycleMode {
        let (proposals, prefix_len) = LocalAc.propose(ed.active_view());
        let mut m = AutocompleteCycleMode {
            origin: ed.active_view().loc.cursor,
            proposals,
            prefix_len,
            current: None,
        };
        m.substitute_next(ed);
        m
    }

    fn substitute_next(&mut self, ed: &mut Editor) {
        let view = ed.active_view_mut();
        if self.current.is_some() {
            // undo the previous substitution
            view.undo();
            ed.set_status(""); // hide the undo message
        }

        let next = self.current.map_or(0, |c| c + 1);
        if next >= self.proposals.len() {
            self.current = None;
            ed.set_status("No further expansions found");
            return;
        }
        self.current = Some(next);

        let view = ed.active_view_mut();
        let mut c = view.loc.cursor;
        view.finalize_action_group();
        if self.prefix_len != 0 {
            let wlen = {
                let b = view.buf().borrow();
                c.move_one_word_backward(&b.text);
                self.origin.boffset - c.boffset
            };
            view.action_delete(c, wlen);
        }
        let newword = self.proposals[next].content.clone();
        let n = newword.len();
        view.action_insert(c, newword);
        view.last_command = LastCommand::none();
        view.dirty = Dirty::everything();
        c.boffset += n;
        view.move_cursor_to(c);
        view.finalize_action_group();
    }

    pub fn on_key(mut self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if ev.is_alt('/') {
            self.substitute_next(ed);
            return Some(Overlay::AutocompleteCycle(self));
        }
        ed.on_key(ev)
    }
}
