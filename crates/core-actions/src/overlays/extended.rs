//! The `C-x` prefix map.

use super::{Overlay, RedoMode};
use crate::command::{is_undo_chord, Command};
use crate::editops::exec;
use crate::editor::Editor;
use core_events::{KeyCode, KeyEvent};

pub struct ExtendedMode;

impl ExtendedMode {
    pub fn new(ed: &mut Editor) -> ExtendedMode {
        ed.set_status("C-x");
        ExtendedMode
    }

    pub fn on_key(self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if is_undo_chord(ev) {
            exec(ed.active_view_mut(), Command::Redo);
            return Some(Overlay::Redo(RedoMode));
        }
        if ev.is_ctrl('c') {
            return ed.quit_maybe();
        }
        if ev.is_ctrl('x') {
            exec(ed.active_view_mut(), Command::SwapCursorAndMark);
            return None;
        }
        if ev.is_ctrl('w') {
            return Some(ed.save_as_prompt(false));
        }
        if ev.is_ctrl('s') {
            return ed.save_active_buffer(false);
        }
        if ev.is_ctrl('a') {
            exec(ed.active_view_mut(), Command::AutocomplInit);
            return None;
        }
        if ev.is_ctrl('f') {
            return Some(ed.open_file_prompt());
        }
        if ev.is_ctrl('r') {
            return Some(ed.search_replace_prompt());
        }
        if ev.is_ctrl('u') {
            exec(ed.active_view_mut(), Command::RegionToUpper);
            return None;
        }
        if ev.is_ctrl('l') {
            exec(ed.active_view_mut(), Command::RegionToLower);
            return None;
        }

        if ev.mods.is_empty() {
            if let KeyCode::Char(c) = ev.code {
                match c {
                    'w' => return Some(Overlay::ViewOp(super::ViewOpMode::new(ed))),
                    '0' => {
                        ed.kill_active_view();
                        return None;
                    }
                    '1' => {
                        ed.kill_all_views_but_active();
                        return None;
                    }
                    '2' => {
                        ed.split_vertically();
                        return None;
                    }
                    '3' => {
                        ed.split_horizontally();
                        return None;
                    }
                    'o' => {
                        ed.next_window();
                        return None;
                    }
                    'b' => return Some(ed.switch_buffer_prompt()),
                    's' => return ed.save_active_buffer(true),
                    'k' => {
                        ed.kill_active_buffer();
                        return None;
                    }
                    '(' => {
                        ed.start_recording();
                        return None;
                    }
                    ')' => {
                        ed.stop_recording();
                        return None;
                    }
                    'e' => return Some(Overlay::MacroRepeat(super::MacroRepeatMode::new(ed))),
                    '>' => {
                        return Some(Overlay::RegionIndent(super::RegionIndentMode::new(ed, 1)))
                    }
                    '<' => {
                        return Some(Overlay::RegionIndent(super::RegionIndentMode::new(ed, -1)))
                    }
                    '=' => {
                        ed.char_info();
                        return None;
                    }
                    '|' => return Some(ed.filter_region_prompt()),
                    _ => {}
                }
            }
        }

        ed.set_status(format!("C-x {} is undefined", ev));
        None
    }
}
