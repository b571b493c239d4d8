//! Incremental search, layered on the line-edit prompt.
//!
//! Search state: the last searched word, the last match location, the
//! direction, and two transient flags — *failing* (the last search missed)
//! and *wrapped* (the next search restarts from the far end). Pressing the
//! direction key again after a failure wraps. The last searched word
//! survives in the editor across sessions; an empty prompt re-searches it.

use super::line_edit::{LineEditMode, LineEditOutcome, LineEditParams};
use super::Overlay;
use crate::editor::Editor;
use core_events::KeyEvent;
use core_render::{Color, ViewTag};
use core_state::{CursorLocation, LastCommand};
use core_state::command_class::CommandClass;
use std::rc::Rc;

pub struct IsearchMode {
    le: LineEditMode,
    last_word: Vec<u8>,
    last_loc: CursorLocation,
    backward: bool,
    failing: bool,
    wrapped: bool,
}

fn prompt_text(backward: bool, failing: bool, wrapped: bool) -> &'static str {
    match (backward, failing, wrapped) {
        (false, true, _) => "Failing I-search:",
        (true, true, _) => "Failing I-search backward:",
        (false, false, true) => "Wrapped I-search:",
        (true, false, true) => "Wrapped I-search backward:",
        (false, false, false) => "I-search:",
        (true, false, false) => "I-search backward:",
    }
}

fn cancel_search_ui(ed: &mut Editor) {
    let v = ed.active_view_mut();
    v.clear_highlight_bytes();
    v.clear_tags();
    v.dirty = core_render::Dirty::everything();
}

impl IsearchMode {
    pub fn new(ed: &mut Editor, backward: bool) -> IsearchMode {
        let last_loc = ed.active_view().loc.cursor;
        let le = LineEditMode::new(
            ed,
            LineEditParams {
                prompt: prompt_text(backward, false, false).to_string(),
                on_apply: Some(Box::new(|ed, _| {
                    cancel_search_ui(ed);
                    None
                })),
                on_cancel: Some(Box::new(cancel_search_ui)),
                ac_provider: Some(Rc::new(crate::providers::LocalAc)),
                ..Default::default()
            },
        );
        IsearchMode {
            le,
            last_word: Vec::new(),
            last_loc,
            backward,
            failing: false,
            wrapped: false,
        }
    }

    fn refresh_prompt(&mut self, failing: bool, wrapped: bool) {
        self.le
            .set_prompt(prompt_text(self.backward, failing, wrapped));
    }

    fn wrap_location(&self, ed: &Editor) -> CursorLocation {
        let b = ed.active_view().buf().borrow();
        if self.backward {
            CursorLocation::buffer_end(&b.text)
        } else {
            CursorLocation::buffer_start(&b.text)
        }
    }

    /// When invoked with an empty prompt, recall the previous search word
    /// into the prompt buffer.
    fn restore_previous_isearch_maybe(&mut self, ed: &mut Editor) {
        let lw = ed.isearch_last_word.clone();
        if lw.is_empty() {
            return;
        }
        let v = &mut self.le.lineview;
        let mut c = v.loc.cursor;
        let n = lw.len();
        v.action_insert(c, lw);
        c.boffset += n;
        v.move_cursor_to(c);
        v.dirty = core_render::Dirty::everything();
        v.finalize_action_group();
    }

    fn search(&mut self, ed: &mut Editor, next: bool) {
        {
            let v = ed.active_view_mut();
            v.finalize_action_group();
            v.last_command = LastCommand {
                class: CommandClass::Movement,
                kill: false,
            };
        }

        let word = self.last_word.clone();
        let found = {
            let b = ed.active_view().buf().borrow();
            let text = &b.text;
            if self.backward {
                if !next {
                    // stay on a still-valid match, otherwise look backward
                    match self.last_loc.search_forward(text, &word) {
                        Some(c) if c == self.last_loc => Some(c),
                        _ => self.last_loc.search_backward(text, &word),
                    }
                } else {
                    self.last_loc.search_backward(text, &word)
                }
            } else {
                if next && !self.wrapped {
                    self.last_loc.boffset += word.len();
                }
                self.last_loc.search_forward(text, &word)
            }
        };

        match found {
            None => {
                ed.active_view_mut().clear_tags();
                self.refresh_prompt(true, false);
                self.failing = true;
                self.wrapped = false;
            }
            Some(cursor) => {
                self.last_loc = cursor;
                let v = ed.active_view_mut();
                v.set_tags(vec![ViewTag {
                    beg_line: cursor.line_num,
                    beg_offset: cursor.boffset,
                    end_line: cursor.line_num,
                    end_offset: cursor.boffset + word.len(),
                    fg: Color::Cyan,
                    bg: Color::Magenta,
                }]);
                let mut cursor = cursor;
                if !self.backward {
                    cursor.boffset += word.len();
                }
                v.move_cursor_to(cursor);
                self.refresh_prompt(false, self.wrapped);
                self.wrapped = false;
                self.failing = false;
            }
        }

        let v = ed.active_view_mut();
        v.center_view_on_cursor();
        v.dirty = core_render::Dirty::everything();
        v.set_highlight_bytes(word);
    }

    fn advance_search(&mut self, ed: &mut Editor) {
        if self.failing {
            self.last_loc = self.wrap_location(ed);
            self.failing = false;
            self.wrapped = true;
        }
        if self.last_word.is_empty() {
            self.restore_previous_isearch_maybe(ed);
        }
        self.search(ed, true);
    }

    pub fn on_key(mut self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if ev.is_ctrl('r') {
            if !self.backward {
                self.backward = true;
            }
            self.advance_search(ed);
        } else if ev.is_ctrl('s') {
            if self.backward {
                self.backward = false;
            }
            self.advance_search(ed);
        } else {
            match self.le.handle_key(ed, ev) {
                LineEditOutcome::Done(next) => return next,
                LineEditOutcome::Pending => {}
            }
        }

        let new_word = {
            let b = self.le.linebuf.borrow();
            b.text.line(b.text.first()).to_vec()
        };
        if new_word != self.last_word {
            self.last_word = new_word.clone();
            ed.isearch_last_word = new_word;
            self.search(ed, false);
        }
        Some(Overlay::Isearch(self))
    }

    pub fn exit(self, ed: &mut Editor) {
        self.le.exit(ed);
    }

    pub fn draw(&mut self, ed: &mut Editor) {
        self.le.draw(ed);
    }

    pub fn on_resize(&mut self, ed: &mut Editor, w: usize, h: usize) {
        self.le.on_resize(ed, w, h);
    }

    pub fn cursor_position(&self, ed: &Editor) -> (usize, usize) {
        self.le.cursor_position(ed)
    }
}
