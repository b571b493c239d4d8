//! The top-level coordinator: buffer set, window tree, status line, overlay
//! slot, macro recorder, and event handling.
//!
//! Every external event is processed to completion — including action-group
//! finalization and cross-view adjustment — before the next one begins; the
//! binary draws once per drained burst.

use crate::command::translate_view_key;
use crate::editops::{self, exec, line_region};
use crate::overlays::{
    AutocompleteCycleMode, ExtendedMode, IsearchMode, KeyPressMode, LineEditMode, LineEditParams,
    Overlay,
};
use crate::providers::{BufferNameAc, FilesystemAc, LocalAc};
use core_config::Config;
use core_events::{Event, KeyEvent};
use core_model::{NodeId, ViewTree};
use core_render::{Attrs, Cell, CellGrid, Color, Rect, View};
use core_state::{ActionKind, Buffer, EditorContext, LastCommand, SharedBuffer, SharedContext};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

/// Comment leaders recognized by fill-region, longest first.
const FILL_PREFIXES: &[&[u8]] = &[
    b";;;;", // Lisp
    b";;;",  // Lisp
    b"REM",  // cmd.exe, COMMAND.COM, Basic
    b"//",   // C, C++, Go, Java, JavaScript, ...
    b";;",   // Lisp
    b"--",   // Haskell, Lua, Ada, SQL, ...
    b"::",   // cmd.exe, COMMAND.COM, Basic
    b"#",    // Perl, Python, Ruby, shells, ...
    b";",    // Lisp
    b":",    // cmd.exe, COMMAND.COM, Basic
];

pub struct Editor {
    pub ctx: SharedContext,
    pub tree: ViewTree,
    /// Always a leaf node.
    pub active: NodeId,
    pub uibuf: CellGrid,
    pub overlay: Option<Overlay>,
    pub quit: bool,
    pub recording: bool,
    pub keymacros: Vec<KeyEvent>,
    pub isearch_last_word: Vec<u8>,
    pub s_and_r_last_word: Vec<u8>,
    pub s_and_r_last_repl: Vec<u8>,
    pub config: Config,
    /// Set by `C-z`; the binary owns the terminal and performs the stop.
    pub suspend_requested: bool,
}

fn abs_path(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p),
        Err(_) => p.to_path_buf(),
    }
}

/// Match `pat` against `name` with `*` and `?` wildcards.
fn wildcard_match(pat: &str, name: &str) -> bool {
    let p: Vec<char> = pat.chars().collect();
    let n: Vec<char> = name.chars().collect();
    fn rec(p: &[char], n: &[char]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some('*'), _) => rec(&p[1..], n) || (!n.is_empty() && rec(p, &n[1..])),
            (Some('?'), Some(_)) => rec(&p[1..], &n[1..]),
            (Some(a), Some(b)) if a == b => rec(&p[1..], &n[1..]),
            _ => false,
        }
    }
    rec(&p, &n)
}

impl Editor {
    pub fn new(config: Config, files: &[PathBuf]) -> Editor {
        let ctx = EditorContext::new();
        // placeholder tree, replaced below once the buffer list exists
        let placeholder: SharedBuffer = Rc::new(std::cell::RefCell::new(Buffer::new_empty()));
        let (tree, root) = ViewTree::new(View::new(ctx.clone(), placeholder));
        let mut ed = Editor {
            ctx,
            tree,
            active: root,
            uibuf: CellGrid::new(1, 1),
            overlay: None,
            quit: false,
            recording: false,
            keymacros: Vec::new(),
            isearch_last_word: Vec::new(),
            s_and_r_last_word: Vec::new(),
            s_and_r_last_repl: Vec::new(),
            config,
            suspend_requested: false,
        };

        for f in files {
            ed.new_buffer_from_file(f);
        }
        if ed.ctx.borrow().buffers.is_empty() {
            ed.ctx
                .borrow_mut()
                .register_buffer(Buffer::new_empty(), "unnamed");
        }

        let first = ed.ctx.borrow().buffers[0].clone();
        let mut view = View::new(ed.ctx.clone(), first);
        view.ac_provider = Some(Rc::new(LocalAc));
        let (tree, root) = ViewTree::new(view);
        ed.tree = tree;
        ed.active = root;
        info!(target: "runtime", buffers = ed.ctx.borrow().buffers.len(), "editor ready");
        ed
    }

    // ------------------------------------------------------------------
    // buffers
    // ------------------------------------------------------------------

    /// Open (or find) a buffer for `filename`. A missing file becomes a new
    /// empty buffer with that name and no path yet.
    pub fn new_buffer_from_file(&mut self, filename: &Path) -> Option<SharedBuffer> {
        let fullpath = abs_path(filename);
        if let Some(b) = self.ctx.borrow().find_buffer_by_full_path(&fullpath) {
            return Some(b);
        }

        let display = filename.to_string_lossy();
        let buf = if fullpath.exists() {
            match Buffer::from_file(&fullpath) {
                Ok(b) => b,
                Err(e) => {
                    self.set_status(e.to_string());
                    return None;
                }
            }
        } else {
            self.set_status("(New file)");
            Buffer::new_empty()
        };
        Some(self.ctx.borrow_mut().register_buffer(buf, &display))
    }

    /// Open every file matching `pattern` (wildcards in the final path
    /// component); the active view attaches to the last one. A plain
    /// non-matching path opens as a new file.
    pub fn open_buffers_from_pattern(&mut self, pattern: &str) {
        let mut last: Option<SharedBuffer> = None;
        if pattern.contains('*') || pattern.contains('?') {
            let (dir, base) = match pattern.rfind(std::path::MAIN_SEPARATOR) {
                Some(i) => (&pattern[..=i], &pattern[i + 1..]),
                None => ("", pattern),
            };
            let read_at = if dir.is_empty() { "." } else { dir };
            if let Ok(rd) = std::fs::read_dir(read_at) {
                let mut names: Vec<String> = rd
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|n| wildcard_match(base, n))
                    .collect();
                names.sort();
                for name in names {
                    let path = format!("{dir}{name}");
                    if let Some(b) = self.new_buffer_from_file(Path::new(&path)) {
                        last = Some(b);
                    }
                }
            }
        }
        if last.is_none() {
            last = self.new_buffer_from_file(Path::new(pattern));
        }
        let buf = last.unwrap_or_else(|| {
            self.ctx
                .borrow_mut()
                .register_buffer(Buffer::new_empty(), "unnamed")
        });
        self.active_view_mut().attach(buf);
    }

    /// Kill a buffer: every attached view is re-pointed at a replacement
    /// (a fresh empty buffer when none remains), then the buffer leaves the
    /// list.
    pub fn kill_buffer(&mut self, buf: SharedBuffer) {
        let replacement = {
            let ctx = self.ctx.borrow();
            ctx.buffers
                .iter()
                .find(|b| !Rc::ptr_eq(b, &buf))
                .cloned()
        };
        let replacement = replacement.unwrap_or_else(|| {
            self.ctx
                .borrow_mut()
                .register_buffer(Buffer::new_empty(), "unnamed")
        });
        for leaf in self.tree.leaves() {
            if Rc::ptr_eq(self.tree.view(leaf).buf(), &buf) {
                self.tree.view_mut(leaf).attach(replacement.clone());
            }
        }
        self.ctx.borrow_mut().remove_buffer(&buf);
        debug!(target: "runtime", "buffer killed");
    }

    pub fn kill_active_buffer(&mut self) {
        let buf = self.active_view().buf().clone();
        self.kill_buffer(buf);
    }

    // ------------------------------------------------------------------
    // views and windows
    // ------------------------------------------------------------------

    pub fn active_view(&self) -> &View {
        self.tree.view(self.active)
    }

    pub fn active_view_mut(&mut self) -> &mut View {
        self.tree.view_mut(self.active)
    }

    pub fn set_status(&self, msg: impl Into<String>) {
        self.ctx.borrow_mut().set_status(msg);
    }

    fn new_sibling_view(&self) -> View {
        let buf = self.active_view().buf().clone();
        let mut v = View::new(self.ctx.clone(), buf);
        v.ac_provider = Some(Rc::new(LocalAc));
        v
    }

    pub fn split_horizontally(&mut self) {
        if self.tree.rect(self.active).width == 0 {
            return;
        }
        let nv = self.new_sibling_view();
        let (left, _right) = self.tree.split_horizontally(self.active, nv);
        self.active = left;
        self.resize_views();
    }

    pub fn split_vertically(&mut self) {
        if self.tree.rect(self.active).height == 0 {
            return;
        }
        let nv = self.new_sibling_view();
        let (top, _bottom) = self.tree.split_vertically(self.active, nv);
        self.active = top;
        self.resize_views();
    }

    pub fn kill_active_view(&mut self) {
        let Some((new_active, mut dead)) = self.tree.kill_leaf(self.active) else {
            return;
        };
        dead.deactivate();
        dead.save_location();
        drop(dead);
        self.active = new_active;
        self.active_view_mut().activate();
        self.resize_views();
    }

    pub fn kill_all_views_but_active(&mut self) {
        for mut v in self.tree.keep_only(self.active) {
            v.deactivate();
            v.save_location();
        }
        self.resize_views();
    }

    pub fn activate_leaf(&mut self, leaf: NodeId) {
        if leaf == self.active {
            return;
        }
        self.active_view_mut().deactivate();
        self.active_view().save_location();
        self.active = leaf;
        self.active_view_mut().activate();
    }

    /// `C-x o`: the sibling leaf, when there is one.
    pub fn next_window(&mut self) {
        if let Some(sib) = self.tree.sibling(self.active) {
            if self.tree.is_leaf(sib) {
                self.activate_leaf(sib);
            }
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.uibuf.resize(w, h);
        self.resize_views();
    }

    fn resize_views(&mut self) {
        let w = self.uibuf.width();
        let h = self.uibuf.height();
        // reserve the bottom row for the status line
        let rect = Rect::new(0, 0, w, h.saturating_sub(1));
        let root = self.tree.root();
        self.tree.resize(root, rect);
    }

    // ------------------------------------------------------------------
    // drawing
    // ------------------------------------------------------------------

    /// Compose the frame and return the hardware cursor position, if shown.
    pub fn draw(&mut self) -> Option<(u16, u16)> {
        let overlay_needs_cursor = self
            .overlay
            .as_ref()
            .map(|o| o.needs_cursor())
            .unwrap_or(false);

        for leaf in self.tree.leaves() {
            self.tree.view_mut(leaf).draw();
        }
        let root = self.tree.root();
        self.composite_recursively(root);
        self.draw_status();

        if let Some(mut ov) = self.overlay.take() {
            ov.draw(self);
            debug_assert!(self.overlay.is_none());
            self.overlay = Some(ov);
        }

        if !overlay_needs_cursor {
            self.draw_autocompl();
        }

        let pos = if overlay_needs_cursor {
            self.overlay
                .as_ref()
                .and_then(|o| o.cursor_position(self))
        } else {
            Some(self.cursor_position())
        };
        pos.map(|(x, y)| (x as u16, y as u16))
    }

    fn composite_recursively(&mut self, id: NodeId) {
        use core_model::NodeKind;
        match self.tree.node(id).kind {
            NodeKind::Leaf(_) => {
                let rect = self.tree.rect(id);
                // blit through a temporary borrow split: view grid lives in
                // the tree, target grid in the editor
                let view_ptr: *const CellGrid = &self.tree.view(id).uibuf;
                // SAFETY: `uibuf` and the tree are distinct fields; the
                // shared borrow of the view grid cannot alias the editor
                // grid.
                let src = unsafe { &*view_ptr };
                self.uibuf.blit(rect, src);
            }
            NodeKind::HSplit { left, right } => {
                self.composite_recursively(left);
                self.composite_recursively(right);
                let r = self.tree.rect(right);
                let splitter = Rect::new(r.x - 1, r.y, 1, r.height.saturating_sub(1));
                self.uibuf.fill(
                    splitter,
                    Cell::with_attrs('|', Color::Default, Color::Default, Attrs::REVERSE),
                );
            }
            NodeKind::VSplit { top, bottom } => {
                self.composite_recursively(top);
                self.composite_recursively(bottom);
            }
            NodeKind::Free => unreachable!("free node in live tree"),
        }
    }

    fn draw_status(&mut self) {
        let h = self.uibuf.height();
        if h == 0 {
            return;
        }
        let r = Rect::new(0, h as isize - 1, self.uibuf.width(), 1);
        self.uibuf.fill(r, Cell::blank());
        let status = self.ctx.borrow().status().to_string();
        self.uibuf
            .draw_label(r, Color::Default, Color::Default, Attrs::empty(), status.as_bytes());
    }

    fn draw_autocompl(&mut self) {
        let rect = self.tree.rect(self.active);
        let view = self.tree.view_mut(self.active);
        let Some(origin) = view.ac.as_ref().map(|a| a.origin()) else {
            return;
        };
        let (cx, cy) = view.cursor_position_for(origin);
        if let Some(ac) = view.ac.as_mut() {
            if ac.actual_len() > 0 {
                ac.draw_onto(&mut self.uibuf, rect.x + cx, rect.y + cy);
            }
        }
    }

    pub fn cursor_position(&self) -> (usize, usize) {
        let (x, y) = self.active_view().cursor_position();
        let r = self.tree.rect(self.active);
        (r.x as usize + x, r.y as usize + y)
    }

    // ------------------------------------------------------------------
    // events
    // ------------------------------------------------------------------

    /// Process one event to completion. Returns false when the editor wants
    /// to exit.
    pub fn handle_event(&mut self, ev: &Event) -> bool {
        match *ev {
            Event::Key(key) => {
                if self.recording {
                    self.keymacros.push(key);
                }
                // the status line resets on every key press
                self.set_status("");
                self.on_sys_key(&key);
                let next = match self.overlay.take() {
                    Some(ov) => ov.on_key(self, &key),
                    None => self.on_key(&key),
                };
                if let Some(ov) = next {
                    debug_assert!(self.overlay.is_none(), "one overlay at a time");
                    self.overlay = Some(ov);
                }
                self.flush_broadcasts();
                if self.quit {
                    return false;
                }
            }
            Event::Resize(w, h) => {
                self.resize(w as usize, h as usize);
                if let Some(mut ov) = self.overlay.take() {
                    ov.on_resize(self, w as usize, h as usize);
                    self.overlay = Some(ov);
                }
            }
        }

        // dump the current view location into the buffer after each event;
        // it's cheap and keeps the saved location fresh
        self.active_view().save_location();
        true
    }

    fn on_sys_key(&mut self, ev: &KeyEvent) {
        if ev.is_ctrl('g') {
            self.active_view_mut().ac = None;
            if let Some(ov) = self.overlay.take() {
                ov.exit(self);
            }
            self.set_status("Quit");
        } else if ev.is_ctrl('z') {
            self.suspend_requested = true;
        }
    }

    /// Global key handling when no overlay is active (also the fall-through
    /// target for overlays that forward keys). May install an overlay via
    /// its return value.
    pub fn on_key(&mut self, ev: &KeyEvent) -> Option<Overlay> {
        if ev.is_ctrl('x') {
            return Some(Overlay::Extended(ExtendedMode::new(self)));
        }
        if ev.is_ctrl('s') {
            return Some(Overlay::Isearch(IsearchMode::new(self, false)));
        }
        if ev.is_ctrl('r') {
            return Some(Overlay::Isearch(IsearchMode::new(self, true)));
        }
        if ev.is_alt('g') {
            return Some(self.goto_line_prompt());
        }
        if ev.is_alt('/') {
            return Some(Overlay::AutocompleteCycle(AutocompleteCycleMode::new(self)));
        }
        if ev.is_alt('q') {
            return Some(self.fill_region_prompt());
        }

        let ac_active = self.active_view().ac.is_some();
        if let Some(cmd) = translate_view_key(ev, ac_active) {
            exec(self.active_view_mut(), cmd);
        }
        None
    }

    /// Replay applied actions onto the other views of the same buffer,
    /// preserving per-action order.
    pub fn flush_broadcasts(&mut self) {
        let leaves = self.tree.leaves();
        for &id in &leaves {
            let bcs = self.tree.view_mut(id).take_broadcasts();
            if bcs.is_empty() {
                continue;
            }
            let buf = self.tree.view(id).buf().clone();
            for bc in bcs {
                for &other in &leaves {
                    if other == id {
                        continue;
                    }
                    if !Rc::ptr_eq(self.tree.view(other).buf(), &buf) {
                        continue;
                    }
                    let view = self.tree.view_mut(other);
                    match bc.kind {
                        ActionKind::Insert => view.on_insert(&bc.action),
                        ActionKind::Delete => view.on_delete(&bc.action),
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // macros
    // ------------------------------------------------------------------

    pub fn start_recording(&mut self) {
        self.recording = true;
        self.keymacros.clear();
        self.set_status("Defining keyboard macro...");
    }

    pub fn stop_recording(&mut self) {
        if !self.recording {
            self.set_status("Not defining keyboard macro");
            return;
        }
        self.recording = false;
        // trim the trailing "C-x )" pair that stopped the recording
        let n = self.keymacros.len().saturating_sub(2);
        self.keymacros.truncate(n);
        if self.keymacros.is_empty() {
            self.set_status("Ignore empty macro");
        } else {
            self.set_status("Keyboard macro defined");
        }
    }

    pub fn replay_macro(&mut self) {
        let macros = self.keymacros.clone();
        for key in macros {
            self.handle_event(&Event::Key(key));
        }
    }

    // ------------------------------------------------------------------
    // saving and quitting
    // ------------------------------------------------------------------

    /// Save the active buffer; prompts for a path when it has none. `raw`
    /// skips the presave cleanup (the config can disable it globally too).
    pub fn save_active_buffer(&mut self, raw: bool) -> Option<Overlay> {
        let raw = raw || !self.config.save.cleanup;
        let buf = self.active_view().buf().clone();
        let has_path = buf.borrow().path.is_some();
        if has_path {
            if buf.borrow().synced_with_disk() {
                self.set_status("(No changes need to be saved)");
                return None;
            }
            self.active_view_mut().presave_cleanup(raw);
            let res = buf.borrow_mut().save();
            match res {
                Ok(()) => {
                    let path = buf.borrow().path.clone().unwrap();
                    self.set_status(format!("Wrote {}", path.display()));
                }
                Err(e) => self.set_status(e.to_string()),
            }
            return None;
        }
        Some(self.save_as_prompt(raw))
    }

    pub fn quit_maybe(&mut self) -> Option<Overlay> {
        if !self.ctx.borrow().has_unsaved_buffers() {
            self.quit = true;
            return None;
        }
        let actions: Vec<(char, Box<dyn FnOnce(&mut Editor)>)> = vec![
            ('y', Box::new(|ed: &mut Editor| ed.quit = true)),
            ('n', Box::new(|_: &mut Editor| {})),
        ];
        Some(Overlay::KeyPress(KeyPressMode::new(
            self,
            actions,
            'n',
            "Modified buffers exist; leave anyway? (y/n)",
        )))
    }

    /// `C-x =`: describe the rune under the cursor.
    pub fn char_info(&mut self) {
        let v = self.active_view();
        let c = v.loc.cursor;
        let b = v.buf().borrow();
        let msg = if c.eol(&b.text) {
            if c.last_line(&b.text) {
                "End of buffer".to_string()
            } else {
                format!(
                    "Char: LF (U+000A) line {}, col {}",
                    c.line_num, v.loc.cursor_voffset
                )
            }
        } else {
            let (r, _) = c.rune_under(&b.text);
            format!(
                "Char: {} (U+{:04X}) line {}, col {}, offset {}",
                r, r as u32, c.line_num, v.loc.cursor_voffset, c.boffset
            )
        };
        drop(b);
        self.set_status(msg);
    }

    // ------------------------------------------------------------------
    // prompt constructors
    // ------------------------------------------------------------------

    pub fn goto_line_prompt(&mut self) -> Overlay {
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt: "Goto line:".into(),
                on_apply: Some(Box::new(|ed, contents| {
                    match String::from_utf8_lossy(&contents).trim().parse::<usize>() {
                        Ok(n) => exec(
                            ed.active_view_mut(),
                            crate::command::Command::MoveCursorToLine(n.max(1)),
                        ),
                        Err(e) => ed.set_status(e.to_string()),
                    }
                    None
                })),
                ..Default::default()
            },
        ))
    }

    pub fn open_file_prompt(&mut self) -> Overlay {
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt: "Find file:".into(),
                ac_provider: Some(Rc::new(FilesystemAc)),
                on_apply: Some(Box::new(|ed, contents| {
                    let pattern = String::from_utf8_lossy(&contents).into_owned();
                    if pattern.is_empty() {
                        ed.set_status("(Nothing to open)");
                        return None;
                    }
                    ed.open_buffers_from_pattern(&pattern);
                    None
                })),
                ..Default::default()
            },
        ))
    }

    pub fn switch_buffer_prompt(&mut self) -> Overlay {
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt: "Buffer:".into(),
                ac_provider: Some(Rc::new(BufferNameAc)),
                init_autocompl: true,
                on_apply: Some(Box::new(|ed, contents| {
                    let name = String::from_utf8_lossy(&contents).into_owned();
                    let found = {
                        let ctx = ed.ctx.borrow();
                        ctx.buffers
                            .iter()
                            .find(|b| b.borrow().name == name)
                            .cloned()
                    };
                    match found {
                        Some(b) => ed.active_view_mut().attach(b),
                        None => ed.set_status("(Buffer with this name doesn't exist)"),
                    }
                    None
                })),
                ..Default::default()
            },
        ))
    }

    pub fn save_as_prompt(&mut self, raw: bool) -> Overlay {
        let initial = self.active_view().buf().borrow().name.clone();
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt: "File to save in:".into(),
                initial_content: initial,
                ac_provider: Some(Rc::new(FilesystemAc)),
                on_apply: Some(Box::new(move |ed, contents| {
                    let name = String::from_utf8_lossy(&contents).into_owned();
                    if name.is_empty() {
                        ed.set_status("(Nothing to save to)");
                        return None;
                    }
                    ed.active_view_mut().presave_cleanup(raw);
                    let buf = ed.active_view().buf().clone();
                    let fullpath = abs_path(Path::new(&name));
                    let res = buf.borrow_mut().save_as(&fullpath);
                    match res {
                        Ok(()) => {
                            let unique = {
                                let mut b = buf.borrow_mut();
                                b.path = Some(fullpath.clone());
                                // release the name before re-uniquing it
                                b.name = String::new();
                                drop(b);
                                ed.ctx.borrow().unique_buffer_name(&name)
                            };
                            buf.borrow_mut().name = unique;
                            ed.active_view_mut().dirty |= core_render::Dirty::STATUS;
                            ed.set_status(format!("Wrote {}", fullpath.display()));
                        }
                        Err(e) => ed.set_status(e.to_string()),
                    }
                    None
                })),
                ..Default::default()
            },
        ))
    }

    pub fn search_replace_prompt(&mut self) -> Overlay {
        let prompt = if self.s_and_r_last_word.is_empty() {
            "Replace string:".to_string()
        } else {
            format!(
                "Replace string [{}]:",
                String::from_utf8_lossy(&self.s_and_r_last_word)
            )
        };
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt,
                on_apply: Some(Box::new(|ed, contents| {
                    let word = if contents.is_empty() {
                        ed.s_and_r_last_word.clone()
                    } else {
                        contents
                    };
                    if word.is_empty() {
                        ed.set_status("Nothing to replace");
                        return None;
                    }
                    Some(ed.search_replace_with_prompt(word))
                })),
                ..Default::default()
            },
        ))
    }

    fn search_replace_with_prompt(&mut self, word: Vec<u8>) -> Overlay {
        let prompt = if self.s_and_r_last_repl.is_empty() {
            format!("Replace string {} with:", String::from_utf8_lossy(&word))
        } else {
            format!(
                "Replace string {} with [{}]:",
                String::from_utf8_lossy(&word),
                String::from_utf8_lossy(&self.s_and_r_last_repl)
            )
        };
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt,
                on_apply: Some(Box::new(move |ed, contents| {
                    let repl = if contents.is_empty() {
                        ed.s_and_r_last_repl.clone()
                    } else {
                        contents
                    };
                    {
                        let v = ed.active_view_mut();
                        v.finalize_action_group();
                        v.last_command = LastCommand::none();
                    }
                    editops::search_and_replace(ed.active_view_mut(), &word, &repl);
                    ed.active_view_mut().finalize_action_group();
                    ed.s_and_r_last_word = word;
                    ed.s_and_r_last_repl = repl;
                    None
                })),
                ..Default::default()
            },
        ))
    }

    pub fn filter_region_prompt(&mut self) -> Overlay {
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt: "Filter region through:".into(),
                ac_provider: Some(Rc::new(FilesystemAc)),
                on_apply: Some(Box::new(|ed, contents| {
                    let cmd = String::from_utf8_lossy(&contents).into_owned();
                    let v = ed.active_view_mut();
                    v.finalize_action_group();
                    editops::region_to(v, move |data| shell_filter(&cmd, data));
                    v.finalize_action_group();
                    None
                })),
                ..Default::default()
            },
        ))
    }

    pub fn fill_region_prompt(&mut self) -> Overlay {
        let detected: Vec<u8> = {
            let v = self.active_view();
            let (beg, _) = line_region(v);
            let b = v.buf().borrow();
            let data = b.text.line(beg.line);
            let data = &data[core_text::index_first_non_space(data)..];
            FILL_PREFIXES
                .iter()
                .filter(|p| data.starts_with(**p))
                .last()
                .map(|p| p.to_vec())
                .unwrap_or_default()
        };
        let width_default = self.config.fill.width;
        Overlay::LineEdit(LineEditMode::new(
            self,
            LineEditParams {
                prompt: "Prefix:".into(),
                initial_content: String::from_utf8_lossy(&detected).into_owned(),
                on_apply: Some(Box::new(move |ed, prefix| {
                    Some(Overlay::LineEdit(LineEditMode::new(
                        ed,
                        LineEditParams {
                            prompt: "Fill width:".into(),
                            initial_content: width_default.to_string(),
                            on_apply: Some(Box::new(move |ed, contents| {
                                let maxv = String::from_utf8_lossy(&contents)
                                    .trim()
                                    .parse::<usize>()
                                    .unwrap_or(width_default);
                                let v = ed.active_view_mut();
                                v.finalize_action_group();
                                v.last_command = LastCommand::none();
                                editops::fill_region(v, maxv, &prefix);
                                v.finalize_action_group();
                                None
                            })),
                            ..Default::default()
                        },
                    )))
                })),
                ..Default::default()
            },
        ))
    }
}

/// Pipe `data` through `/bin/sh -c cmd`; on any failure the region passes
/// through unchanged.
fn shell_filter(cmd: &str, data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();
    let Ok(mut child) = child else {
        return data.to_vec();
    };
    if let Some(stdin) = child.stdin.take() {
        let mut stdin = stdin;
        if stdin.write_all(data).is_err() {
            return data.to_vec();
        }
    }
    match child.wait_with_output() {
        Ok(out) if out.status.success() => out.stdout,
        _ => data.to_vec(),
    }
}
