//! The prompt bar: a one-line sub-view over a private buffer, with optional
//! autocompletion and apply/cancel callbacks.

use super::Overlay;
use crate::command::translate_view_key;
use crate::editops::exec;
use crate::editor::Editor;
use core_events::{KeyCode, KeyEvent};
use core_render::{AcProvider, Attrs, Color, Rect, View};
use core_state::{Buffer, SharedBuffer};
use std::cell::RefCell;
use std::rc::Rc;

type ApplyFn = Box<dyn FnOnce(&mut Editor, Vec<u8>) -> Option<Overlay>>;
type CancelFn = Box<dyn FnOnce(&mut Editor)>;
type KeyFilterFn = Box<dyn FnMut(&mut Editor, &KeyEvent) -> bool>;
type PostKeyFn = Box<dyn FnMut(&mut Editor, &SharedBuffer)>;

#[derive(Default)]
pub struct LineEditParams {
    pub prompt: String,
    pub initial_content: String,
    pub on_apply: Option<ApplyFn>,
    pub on_cancel: Option<CancelFn>,
    /// Gets the key before anything else; returning true consumes it.
    pub key_filter: Option<KeyFilterFn>,
    /// Runs after every handled key with the prompt buffer.
    pub post_key_hook: Option<PostKeyFn>,
    pub ac_provider: Option<Rc<dyn AcProvider>>,
    pub init_autocompl: bool,
}

pub enum LineEditOutcome {
    /// The prompt stays up.
    Pending,
    /// Applied (or dismissed); carries the follow-up overlay, if any.
    Done(Option<Overlay>),
}

pub struct LineEditMode {
    pub linebuf: SharedBuffer,
    pub lineview: View,
    prompt: String,
    prompt_w: usize,
    on_apply: Option<ApplyFn>,
    on_cancel: Option<CancelFn>,
    key_filter: Option<KeyFilterFn>,
    post_key_hook: Option<PostKeyFn>,
}

impl LineEditMode {
    pub fn new(ed: &Editor, params: LineEditParams) -> LineEditMode {
        let linebuf: SharedBuffer = Rc::new(RefCell::new(Buffer::from_bytes(
            params.initial_content.as_bytes(),
        )));
        let mut lineview = View::new(ed.ctx.clone(), linebuf.clone());
        lineview.oneline = true;
        lineview.ac_provider = params.ac_provider;
        let prompt_w = params.prompt.chars().count();
        let w = ed.uibuf.width().saturating_sub(prompt_w + 1).max(1);
        lineview.resize(w, 1);
        let mut m = LineEditMode {
            linebuf,
            lineview,
            prompt: params.prompt,
            prompt_w,
            on_apply: params.on_apply,
            on_cancel: params.on_cancel,
            key_filter: params.key_filter,
            post_key_hook: params.post_key_hook,
        };
        exec(&mut m.lineview, crate::command::Command::MoveCursorEndOfLine);
        if params.init_autocompl {
            exec(&mut m.lineview, crate::command::Command::AutocomplInit);
        }
        m
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.prompt_w = self.prompt.chars().count();
    }

    pub fn contents(&self) -> Vec<u8> {
        self.linebuf.borrow().contents()
    }

    fn view_key(&mut self, ev: &KeyEvent) {
        let ac_active = self.lineview.ac.is_some();
        if let Some(cmd) = translate_view_key(ev, ac_active) {
            exec(&mut self.lineview, cmd);
        }
    }

    /// Shared key handling for the plain prompt and the overlays stacked on
    /// top of it (isearch).
    pub fn handle_key(&mut self, ed: &mut Editor, ev: &KeyEvent) -> LineEditOutcome {
        if let Some(filter) = self.key_filter.as_mut() {
            if filter(ed, ev) {
                return LineEditOutcome::Pending;
            }
        }
        let enter = matches!(ev.code, KeyCode::Enter) && ev.mods.is_empty() || ev.is_ctrl('j');
        if enter {
            if self.lineview.ac.is_some() {
                // Enter commits the completion instead of applying
                self.view_key(ev);
                return LineEditOutcome::Pending;
            }
            let contents = self.contents();
            let apply = self.on_apply.take();
            let next = apply.and_then(|f| f(ed, contents));
            self.run_cancel(ed);
            return LineEditOutcome::Done(next);
        }
        match ev.code {
            KeyCode::Tab if ev.mods.is_empty() => {
                exec(&mut self.lineview, crate::command::Command::AutocomplInit);
            }
            KeyCode::Up if ev.mods.is_empty() => {
                exec(&mut self.lineview, crate::command::Command::AutocomplMoveCursorUp);
            }
            KeyCode::Down if ev.mods.is_empty() => {
                exec(&mut self.lineview, crate::command::Command::AutocomplMoveCursorDown);
            }
            _ => self.view_key(ev),
        }
        if let Some(hook) = self.post_key_hook.as_mut() {
            hook(ed, &self.linebuf);
        }
        LineEditOutcome::Pending
    }

    pub fn on_key(mut self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        match self.handle_key(ed, ev) {
            LineEditOutcome::Pending => Some(Overlay::LineEdit(self)),
            LineEditOutcome::Done(next) => next,
        }
    }

    fn run_cancel(&mut self, ed: &mut Editor) {
        if let Some(cancel) = self.on_cancel.take() {
            cancel(ed);
        }
    }

    pub fn exit(mut self, ed: &mut Editor) {
        self.run_cancel(ed);
    }

    pub fn on_resize(&mut self, _ed: &mut Editor, w: usize, h: usize) {
        let lw = w.saturating_sub(self.prompt_w + 1);
        if lw < 1 || h < 1 {
            return;
        }
        self.lineview.resize(lw, 1);
    }

    pub fn draw(&mut self, ed: &mut Editor) {
        let h = ed.uibuf.height();
        let w = ed.uibuf.width();
        if h == 0 {
            return;
        }
        let y = h as isize - 1;

        // prompt label
        let prompt_r = Rect::new(0, y, self.prompt_w + 1, 1);
        ed.uibuf.fill(prompt_r, core_render::Cell::blank());
        ed.uibuf.draw_label(
            prompt_r,
            Color::Cyan,
            Color::Default,
            Attrs::empty(),
            self.prompt.as_bytes(),
        );

        // the one-line view
        self.lineview.draw();
        let line_r = Rect::new(
            self.prompt_w as isize + 1,
            y,
            w.saturating_sub(self.prompt_w + 1),
            1,
        );
        ed.uibuf.blit(line_r, &self.lineview.uibuf);

        // completion popup anchored at the session origin
        if self.lineview.ac.is_some() {
            let origin = self.lineview.ac.as_ref().unwrap().origin();
            let (cx, cy) = self.lineview.cursor_position_for(origin);
            if let Some(ac) = self.lineview.ac.as_mut() {
                ac.draw_onto(&mut ed.uibuf, line_r.x + cx, line_r.y + cy);
            }
        }
    }

    pub fn cursor_position(&self, ed: &Editor) -> (usize, usize) {
        let (lx, ly) = self.lineview.cursor_position();
        let x = self.prompt_w + 1 + lx;
        let y = ed.uibuf.height().saturating_sub(1) + ly;
        (x, y)
    }
}
