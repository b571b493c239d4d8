//! Repeated region indentation: after the initial `C-x >`/`C-x <` the line
//! region stays highlighted and bare `>`/`<` keep indenting.

use super::Overlay;
use crate::command::Command;
use crate::editops::{exec, line_region};
use crate::editor::Editor;
use core_events::KeyEvent;
use core_render::{Color, Dirty, ViewTag};

pub struct RegionIndentMode;

const HINT: &str = "(Type > or < to indent/deindent respectively)";

impl RegionIndentMode {
    pub fn new(ed: &mut Editor, dir: i32) -> RegionIndentMode {
        {
            let v = ed.active_view_mut();
            let (beg, end) = line_region(v);
            v.set_tags(vec![ViewTag {
                beg_line: beg.line_num,
                beg_offset: beg.boffset,
                end_line: end.line_num,
                end_offset: end.boffset,
                fg: Color::Default,
                bg: Color::Blue,
            }]);
            if dir > 0 {
                exec(v, Command::IndentRegion);
            } else if dir < 0 {
                exec(v, Command::DeindentRegion);
            }
            v.dirty = Dirty::everything();
        }
        ed.set_status(HINT);
        RegionIndentMode
    }

    pub fn exit(self, ed: &mut Editor) {
        let v = ed.active_view_mut();
        v.clear_tags();
        v.dirty = Dirty::everything();
    }

    pub fn on_key(self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        match ev.plain_char() {
            Some('>') => {
                exec(ed.active_view_mut(), Command::IndentRegion);
                ed.set_status(HINT);
                Some(Overlay::RegionIndent(self))
            }
            Some('<') => {
                exec(ed.active_view_mut(), Command::DeindentRegion);
                ed.set_status(HINT);
                Some(Overlay::RegionIndent(self))
            }
            _ => {
                self.exit(ed);
                ed.on_key(ev)
            }
        }
    }
}
