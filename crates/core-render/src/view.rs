//! A view: a windowed observer of a buffer.
//!
//! The view owns presentation state only — scroll anchors, cached cursor
//! offsets, dirty flags, tags, its rendered cell grid — while the buffer owns
//! the text and the history. The two editing primitives here
//! ([`View::action_insert`] and [`View::action_delete`]) are the only path
//! by which views change buffer contents; every composed edit operation is
//! built from them.
//!
//! Cross-view propagation: a view does not know its siblings. Each applied
//! or reverted action is pushed onto the view's broadcast queue; the editor
//! drains the queue after the command and replays [`View::on_insert`] /
//! [`View::on_delete`] on every other view attached to the same buffer.
//! Per-action ordering is preserved, which is all the adjustment arithmetic
//! needs.

use crate::autocompl::{AcProvider, AutocomplSession};
use crate::cell::{Attrs, Cell, CellGrid, Color, Rect};
use core_state::{
    Action, ActionKind, CursorLocation, LastCommand, LineId, SharedBuffer, SharedContext,
    ViewLocation,
};
use core_text::{decode_rune, TAB_STOP};
use std::rc::Rc;
use tracing::trace;

/// Vertical scroll threshold in lines (capped for short windows).
pub const VERTICAL_THRESHOLD: usize = 5;
/// Horizontal scroll threshold in cells (capped for narrow windows).
pub const HORIZONTAL_THRESHOLD: usize = 10;

/// Match-highlight colors.
pub const HL_FG: Color = Color::Cyan;
pub const HL_BG: Color = Color::Blue;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Dirty: u8 {
        const CONTENTS = 0b01;
        const STATUS   = 0b10;
    }
}

impl Dirty {
    pub fn everything() -> Self {
        Self::all()
    }
}

/// A colored range of (line, byte offset) positions overlaid on rendering.
/// Line numbers are 1-based; the end offset is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTag {
    pub beg_line: usize,
    pub beg_offset: usize,
    pub end_line: usize,
    pub end_offset: usize,
    pub fg: Color,
    pub bg: Color,
}

impl ViewTag {
    pub fn includes(&self, line: usize, offset: usize) -> bool {
        if line < self.beg_line || line > self.end_line {
            return false;
        }
        if line == self.beg_line && offset < self.beg_offset {
            return false;
        }
        if line == self.end_line && offset >= self.end_offset {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct ByteRange {
    begin: usize,
    end: usize,
}

impl ByteRange {
    fn includes(&self, offset: usize) -> bool {
        self.begin <= offset && self.end > offset
    }
}

/// An applied (or reverted) action the editor must replay on the buffer's
/// other views. `kind` is the effective direction: a reverted insert
/// broadcasts as a delete.
pub struct Broadcast {
    pub action: Action,
    pub kind: ActionKind,
}

pub struct View {
    pub loc: ViewLocation,
    ctx: SharedContext,
    buf: SharedBuffer,
    pub uibuf: CellGrid,
    pub dirty: Dirty,
    /// One-line mode for prompt views: no status line, newlines stripped
    /// from inserts.
    pub oneline: bool,
    pub ac: Option<AutocomplSession>,
    pub ac_provider: Option<Rc<dyn AcProvider>>,
    pub last_command: LastCommand,
    highlight_bytes: Vec<u8>,
    highlight_ranges: Vec<ByteRange>,
    tags: Vec<ViewTag>,
    broadcasts: Vec<Broadcast>,
}

impl View {
    pub fn new(ctx: SharedContext, buf: SharedBuffer) -> View {
        let loc = buf.borrow().loc;
        View {
            loc,
            ctx,
            buf,
            uibuf: CellGrid::new(1, 1),
            dirty: Dirty::everything(),
            oneline: false,
            ac: None,
            ac_provider: None,
            last_command: LastCommand::none(),
            highlight_bytes: Vec::new(),
            highlight_ranges: Vec::new(),
            tags: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    pub fn buf(&self) -> &SharedBuffer {
        &self.buf
    }

    pub fn ctx(&self) -> &SharedContext {
        &self.ctx
    }

    pub fn set_status(&self, msg: impl Into<String>) {
        self.ctx.borrow_mut().set_status(msg);
    }

    pub fn activate(&mut self) {
        self.last_command = LastCommand::none();
    }

    pub fn deactivate(&mut self) {
        // on deactivation discard autocompletion
        self.ac = None;
    }

    /// Switch this view to another buffer, saving the current location into
    /// the old buffer and restoring the saved one from the new.
    pub fn attach(&mut self, b: SharedBuffer) {
        if Rc::ptr_eq(&self.buf, &b) {
            return;
        }
        self.ac = None;
        self.buf.borrow_mut().loc = self.loc;
        self.loc = b.borrow().loc;
        self.buf = b;
        self.dirty = Dirty::everything();
    }

    /// Persist the view location into the buffer (done after every handled
    /// event for the active view, and on detach).
    pub fn save_location(&self) {
        self.buf.borrow_mut().loc = self.loc;
    }

    pub fn take_broadcasts(&mut self) -> Vec<Broadcast> {
        std::mem::take(&mut self.broadcasts)
    }

    // ------------------------------------------------------------------
    // geometry
    // ------------------------------------------------------------------

    pub fn width(&self) -> usize {
        self.uibuf.width()
    }

    /// Text rows: the bottom row is the status line unless oneline.
    pub fn height(&self) -> usize {
        if self.oneline {
            self.uibuf.height()
        } else {
            self.uibuf.height().saturating_sub(1)
        }
    }

    pub fn vertical_threshold(&self) -> usize {
        let max = self.height().saturating_sub(1) / 2;
        VERTICAL_THRESHOLD.min(max)
    }

    pub fn horizontal_threshold(&self) -> usize {
        let max = self.width().saturating_sub(1) / 2;
        HORIZONTAL_THRESHOLD.min(max)
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.uibuf.resize(w, h);
        self.adjust_line_voffset();
        self.adjust_top_line();
        self.dirty = Dirty::everything();
    }

    // ------------------------------------------------------------------
    // tags and highlight
    // ------------------------------------------------------------------

    pub fn set_tags(&mut self, tags: Vec<ViewTag>) {
        self.tags = tags;
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    pub fn set_highlight_bytes(&mut self, bytes: Vec<u8>) {
        self.highlight_bytes = bytes;
    }

    pub fn clear_highlight_bytes(&mut self) {
        self.highlight_bytes.clear();
    }

    fn tag_at(&self, line: usize, offset: usize) -> Option<&ViewTag> {
        self.tags.iter().find(|t| t.includes(line, offset))
    }

    fn find_highlight_ranges_for_line(&mut self, data: &[u8]) {
        self.highlight_ranges.clear();
        let needle = &self.highlight_bytes;
        let mut offset = 0;
        let mut rest = data;
        while let Some(i) = core_state::cursor::find_sub(rest, needle) {
            self.highlight_ranges.push(ByteRange {
                begin: offset + i,
                end: offset + i + needle.len(),
            });
            rest = &rest[i + needle.len()..];
            offset += i + needle.len();
        }
    }

    fn in_one_of_highlight_ranges(&self, offset: usize) -> bool {
        self.highlight_ranges.iter().any(|r| r.includes(offset))
    }

    fn make_cell(&self, line: usize, offset: usize, ch: char) -> Cell {
        if let Some(tag) = self.tag_at(line, offset) {
            return Cell::new(ch, tag.fg, tag.bg);
        }
        let mut cell = Cell::new(ch, Color::Default, Color::Default);
        if self.in_one_of_highlight_ranges(offset) {
            cell.fg = HL_FG;
            cell.bg = HL_BG;
        }
        cell
    }

    // ------------------------------------------------------------------
    // drawing
    // ------------------------------------------------------------------

    fn draw_line(&mut self, line: LineId, line_num: usize, y: usize, line_voffset: usize) {
        let data = {
            let b = self.buf.borrow();
            b.text.line(line).to_vec()
        };
        if !self.highlight_bytes.is_empty() {
            self.find_highlight_ranges_for_line(&data);
        }
        let w = self.uibuf.width() as isize;
        let vo = line_voffset as isize;
        let mut x: isize = 0;
        let mut tabstop: isize = 0;
        let mut bx: usize = 0;
        let mut rest = &data[..];
        loop {
            if rest.is_empty() {
                break;
            }
            if x == tabstop {
                tabstop += TAB_STOP as isize;
            }
            if x - vo >= w {
                // line continues past the right edge
                self.uibuf.set(
                    w as usize - 1,
                    y,
                    Cell::new('→', Color::Default, Color::Default),
                );
                break;
            }

            let (r, rlen) = decode_rune(rest);
            if r == '\t' {
                // fill with spaces to the next tab stop
                while x < tabstop {
                    let rx = x - vo;
                    if rx >= w {
                        break;
                    }
                    if rx >= 0 {
                        let cell = self.make_cell(line_num, bx, ' ');
                        self.uibuf.set(rx as usize, y, cell);
                    }
                    x += 1;
                }
            } else if (r as u32) < 32 {
                // invisible chars like ^R or ^@, two red cells
                let rx = x - vo;
                if rx >= 0 {
                    self.uibuf
                        .set(rx as usize, y, Cell::new('^', Color::Red, Color::Default));
                }
                x += 1;
                let rx = x - vo;
                if rx < w && rx >= 0 {
                    self.uibuf.set(
                        rx as usize,
                        y,
                        Cell::new(core_text::caret_char(r as u8), Color::Red, Color::Default),
                    );
                }
                x += 1;
            } else {
                let rx = x - vo;
                if rx >= 0 {
                    let cell = self.make_cell(line_num, bx, r);
                    self.uibuf.set(rx as usize, y, cell);
                }
                x += 1;
            }
            rest = &rest[rlen.max(1)..];
            bx += rlen.max(1);
        }

        if line_voffset != 0 {
            self.uibuf
                .set(0, y, Cell::new('←', Color::Default, Color::Default));
        }
    }

    fn draw_contents(&mut self) {
        if self.highlight_bytes.is_empty() {
            self.highlight_ranges.clear();
        }
        self.uibuf.fill(self.uibuf.rect(), Cell::blank());
        if self.uibuf.width() == 0 || self.uibuf.height() == 0 {
            return;
        }

        let mut line = Some(self.loc.top_line);
        let cursor_line = self.loc.cursor.line;
        for y in 0..self.height() {
            let Some(id) = line else { break };
            let line_voffset = if id == cursor_line {
                self.loc.line_voffset
            } else {
                0
            };
            self.draw_line(id, self.loc.top_line_num + y, y, line_voffset);
            line = self.buf.borrow().text.next(id);
        }
    }

    fn draw_status(&mut self) {
        if self.oneline {
            return;
        }
        let y = self.height();
        let w = self.uibuf.width();
        let rev = Attrs::REVERSE;
        self.uibuf.fill(
            Rect::new(0, y as isize, w, 1),
            Cell::with_attrs('─', Color::Default, Color::Default, rev),
        );

        // on-disk sync marker
        if !self.buf.borrow().synced_with_disk() {
            let star = Cell::with_attrs('*', Color::Default, Color::Default, rev);
            self.uibuf.set(1, y, star);
            self.uibuf.set(2, y, star);
        }

        let name = format!("  {}  ", self.buf.borrow().name);
        self.uibuf.draw_label(
            Rect::new(5, y as isize, w.saturating_sub(5), 1),
            Color::Default,
            Color::Default,
            rev | Attrs::BOLD,
            name.as_bytes(),
        );
        let pos = format!("({}, {})  ", self.loc.cursor.line_num, self.loc.cursor_voffset);
        self.uibuf.draw_label(
            Rect::new(5 + name.chars().count() as isize, y as isize, w, 1),
            Color::Default,
            Color::Default,
            rev,
            pos.as_bytes(),
        );
    }

    /// Draw whatever the dirty bitmask demands into the view's grid,
    /// clearing only the satisfied flags.
    pub fn draw(&mut self) {
        if self.dirty.contains(Dirty::CONTENTS) {
            self.dirty.remove(Dirty::CONTENTS);
            self.draw_contents();
        }
        if self.dirty.contains(Dirty::STATUS) {
            self.dirty.remove(Dirty::STATUS);
            self.draw_status();
        }
    }

    // ------------------------------------------------------------------
    // scroll model
    // ------------------------------------------------------------------

    /// Move the top line `n` steps (negative is up), clamped at the buffer
    /// edges.
    pub fn move_top_line_n_times(&mut self, mut n: isize) {
        if n == 0 {
            return;
        }
        let b = self.buf.borrow();
        let text = &b.text;
        let mut top = self.loc.top_line;
        while n < 0 {
            let Some(prev) = text.prev(top) else { break };
            top = prev;
            self.loc.top_line_num -= 1;
            n += 1;
        }
        while n > 0 {
            let Some(next) = text.next(top) else { break };
            top = next;
            self.loc.top_line_num += 1;
            n -= 1;
        }
        self.loc.top_line = top;
    }

    /// Move the cursor line `n` steps without touching offsets; callers
    /// retarget the column afterwards.
    pub fn move_cursor_line_n_times(&mut self, mut n: isize) {
        if n == 0 {
            return;
        }
        let b = self.buf.borrow();
        let text = &b.text;
        let mut cursor = self.loc.cursor.line;
        while n < 0 {
            let Some(prev) = text.prev(cursor) else { break };
            cursor = prev;
            self.loc.cursor.line_num -= 1;
            n += 1;
        }
        while n > 0 {
            let Some(next) = text.next(cursor) else { break };
            cursor = next;
            self.loc.cursor.line_num += 1;
            n -= 1;
        }
        self.loc.cursor.line = cursor;
    }

    /// After the top line changed, pull the cursor back inside the
    /// threshold band, retargeting the remembered column.
    pub fn adjust_cursor_line(&mut self) {
        let vt = self.vertical_threshold() as isize;
        let h = self.height() as isize;
        let co = self.loc.cursor.line_num as isize - self.loc.top_line_num as isize;
        let (has_next, has_prev) = {
            let b = self.buf.borrow();
            (
                b.text.next(self.loc.cursor.line).is_some(),
                b.text.prev(self.loc.cursor.line).is_some(),
            )
        };
        let before = self.loc.cursor.line;

        if has_next && co < vt {
            self.move_cursor_line_n_times(vt - co);
        }
        if has_prev && co >= h - vt {
            self.move_cursor_line_n_times((h - vt) - co - 1);
        }

        if before != self.loc.cursor.line {
            let (bo, co, vo) = {
                let b = self.buf.borrow();
                core_text::find_closest_offsets(
                    b.text.line(self.loc.cursor.line),
                    self.loc.last_cursor_voffset,
                )
            };
            self.loc.cursor.boffset = bo;
            self.loc.cursor_coffset = co;
            self.loc.cursor_voffset = vo;
            self.loc.line_voffset = 0;
            self.adjust_line_voffset();
            self.dirty = Dirty::everything();
        }
    }

    /// After the cursor line changed, restore the vertical threshold by
    /// moving the top line.
    pub fn adjust_top_line(&mut self) {
        let vt = self.vertical_threshold() as isize;
        let h = self.height() as isize;
        let co = self.loc.cursor.line_num as isize - self.loc.top_line_num as isize;
        let (top_has_next, top_has_prev) = {
            let b = self.buf.borrow();
            (
                b.text.next(self.loc.top_line).is_some(),
                b.text.prev(self.loc.top_line).is_some(),
            )
        };

        if top_has_next && co >= h - vt {
            self.move_top_line_n_times(co - (h - vt) + 1);
            self.dirty = Dirty::everything();
        }
        if top_has_prev && co < vt {
            self.move_top_line_n_times(co - vt);
            self.dirty = Dirty::everything();
        }
    }

    /// Keep the cursor's visual column within the horizontal window,
    /// scrolling the cursor line when needed.
    pub fn adjust_line_voffset(&mut self) {
        let ht = self.horizontal_threshold() as isize;
        let w = self.uibuf.width() as isize;
        let mut vo = self.loc.line_voffset as isize;
        let cvo = self.loc.cursor_voffset as isize;
        let threshold = if vo == 0 { w - 1 } else { w - ht };

        if cvo - vo >= threshold {
            vo = cvo + (ht - w + 1);
        }
        if vo != 0 && cvo - vo < ht {
            vo = (cvo - ht).max(0);
        }

        if self.loc.line_voffset != vo as usize {
            self.loc.line_voffset = vo as usize;
            self.dirty = Dirty::everything();
        }
    }

    /// Cursor position in view cell coordinates.
    pub fn cursor_position(&self) -> (usize, usize) {
        let y = self.loc.cursor.line_num - self.loc.top_line_num;
        let x = self.loc.cursor_voffset.saturating_sub(self.loc.line_voffset);
        (x, y)
    }

    /// Cell coordinates of an arbitrary location (used to anchor the
    /// autocompletion popup at the session origin).
    pub fn cursor_position_for(&self, cursor: CursorLocation) -> (isize, isize) {
        let y = cursor.line_num as isize - self.loc.top_line_num as isize;
        let x = {
            let b = self.buf.borrow();
            cursor.voffset(&b.text) as isize - self.loc.line_voffset as isize
        };
        (x, y)
    }

    // ------------------------------------------------------------------
    // cursor movement
    // ------------------------------------------------------------------

    /// Move the cursor to `c`, refreshing cached offsets, horizontal scroll
    /// and the top line, and keeping the autocompletion session (if any) in
    /// step.
    pub fn move_cursor_to(&mut self, c: CursorLocation) {
        self.move_cursor_to_inner(c, false);
    }

    /// Move the cursor onto `line`, choosing the byte offset closest to the
    /// remembered visual column (vertical motion preserving the column).
    pub fn move_cursor_to_closest(&mut self, line: LineId, line_num: usize) {
        self.move_cursor_to_inner(
            CursorLocation {
                line,
                line_num,
                boffset: 0,
            },
            true,
        );
    }

    fn move_cursor_to_inner(&mut self, c: CursorLocation, closest: bool) {
        self.dirty |= Dirty::STATUS;
        {
            let b = self.buf.borrow();
            let data = b.text.line(c.line);
            if closest {
                let (bo, co, vo) = core_text::find_closest_offsets(data, self.loc.last_cursor_voffset);
                self.loc.cursor.boffset = bo;
                self.loc.cursor_coffset = co;
                self.loc.cursor_voffset = vo;
            } else {
                let (vo, co) = core_text::voffset_coffset(data, c.boffset);
                self.loc.cursor.boffset = c.boffset;
                self.loc.cursor_coffset = co;
                self.loc.cursor_voffset = vo;
            }
        }
        if !closest {
            self.loc.last_cursor_voffset = self.loc.cursor_voffset;
        }
        if c.line != self.loc.cursor.line {
            if self.loc.line_voffset != 0 {
                self.dirty = Dirty::everything();
            }
            self.loc.line_voffset = 0;
        }
        self.loc.cursor.line = c.line;
        self.loc.cursor.line_num = c.line_num;
        self.adjust_line_voffset();
        self.adjust_top_line();

        if let Some(ac) = self.ac.as_mut() {
            // the session follows every cursor move and dies when it leaves
            // its origin
            let ok = {
                let b = self.buf.borrow();
                ac.update(self.loc.cursor, &b.text)
            };
            if !ok {
                self.ac = None;
            }
        }
    }

    pub fn move_cursor_forward(&mut self) {
        let c = self.loc.cursor;
        let at_end = {
            let b = self.buf.borrow();
            c.last_line(&b.text) && c.eol(&b.text)
        };
        if at_end {
            self.set_status("End of buffer");
            return;
        }
        let mut c = c;
        {
            let b = self.buf.borrow();
            c.move_one_rune_forward(&b.text);
        }
        self.move_cursor_to(c);
    }

    pub fn move_cursor_backward(&mut self) {
        let c = self.loc.cursor;
        let at_start = {
            let b = self.buf.borrow();
            c.first_line(&b.text) && c.bol()
        };
        if at_start {
            self.set_status("Beginning of buffer");
            return;
        }
        let mut c = c;
        {
            let b = self.buf.borrow();
            c.move_one_rune_backward(&b.text);
        }
        self.move_cursor_to(c);
    }

    pub fn move_cursor_next_line(&mut self) {
        let next = {
            let b = self.buf.borrow();
            b.text.next(self.loc.cursor.line)
        };
        match next {
            Some(line) => self.move_cursor_to_closest(line, self.loc.cursor.line_num + 1),
            None => self.set_status("End of buffer"),
        }
    }

    pub fn move_cursor_prev_line(&mut self) {
        let prev = {
            let b = self.buf.borrow();
            b.text.prev(self.loc.cursor.line)
        };
        match prev {
            Some(line) => self.move_cursor_to_closest(line, self.loc.cursor.line_num - 1),
            None => self.set_status("Beginning of buffer"),
        }
    }

    pub fn move_cursor_beginning_of_line(&mut self) {
        let mut c = self.loc.cursor;
        c.move_beginning_of_line();
        self.move_cursor_to(c);
    }

    pub fn move_cursor_end_of_line(&mut self) {
        let mut c = self.loc.cursor;
        {
            let b = self.buf.borrow();
            c.move_end_of_line(&b.text);
        }
        self.move_cursor_to(c);
    }

    pub fn move_cursor_beginning_of_file(&mut self) {
        let c = {
            let b = self.buf.borrow();
            CursorLocation::buffer_start(&b.text)
        };
        self.move_cursor_to(c);
    }

    pub fn move_cursor_end_of_file(&mut self) {
        let c = {
            let b = self.buf.borrow();
            CursorLocation::buffer_end(&b.text)
        };
        self.move_cursor_to(c);
    }

    pub fn move_cursor_word_forward(&mut self) {
        let mut c = self.loc.cursor;
        let ok = {
            let b = self.buf.borrow();
            c.move_one_word_forward(&b.text)
        };
        self.move_cursor_to(c);
        if !ok {
            self.set_status("End of buffer");
        }
    }

    pub fn move_cursor_word_backward(&mut self) {
        let mut c = self.loc.cursor;
        let ok = {
            let b = self.buf.borrow();
            c.move_one_word_backward(&b.text)
        };
        self.move_cursor_to(c);
        if !ok {
            self.set_status("Beginning of buffer");
        }
    }

    /// Scroll the view `n` lines; the cursor is dragged along when it falls
    /// outside the threshold band.
    pub fn move_view_n_lines(&mut self, n: isize) {
        let prevtop = self.loc.top_line_num;
        self.move_top_line_n_times(n);
        if prevtop != self.loc.top_line_num {
            self.adjust_cursor_line();
            self.dirty = Dirty::everything();
        }
    }

    pub fn can_move_top_line_n_times(&self, mut n: isize) -> bool {
        if n == 0 {
            return true;
        }
        let b = self.buf.borrow();
        let text = &b.text;
        let mut top = self.loc.top_line;
        while n < 0 {
            let Some(prev) = text.prev(top) else { break };
            top = prev;
            n += 1;
        }
        while n > 0 {
            let Some(next) = text.next(top) else { break };
            top = next;
            n -= 1;
        }
        n == 0
    }

    pub fn maybe_move_view_n_lines(&mut self, n: isize) {
        if self.can_move_top_line_n_times(n) {
            self.move_view_n_lines(n);
        }
    }

    pub fn center_view_on_cursor(&mut self) {
        self.loc.top_line = self.loc.cursor.line;
        self.loc.top_line_num = self.loc.cursor.line_num;
        self.move_top_line_n_times(-(self.height() as isize) / 2);
        self.dirty = Dirty::everything();
    }

    pub fn move_cursor_to_line(&mut self, n: usize) {
        self.move_cursor_beginning_of_file();
        self.move_cursor_line_n_times(n as isize - 1);
        // retarget the column on the new line
        let c = CursorLocation {
            boffset: 0,
            ..self.loc.cursor
        };
        self.move_cursor_to(c);
        self.center_view_on_cursor();
    }

    // ------------------------------------------------------------------
    // mark
    // ------------------------------------------------------------------

    pub fn set_mark(&mut self) {
        self.buf.borrow_mut().mark = Some(self.loc.cursor);
        self.set_status("Mark set");
    }

    pub fn swap_cursor_and_mark(&mut self) {
        let mark = self.buf.borrow().mark;
        if let Some(m) = mark {
            self.buf.borrow_mut().mark = Some(self.loc.cursor);
            self.move_cursor_to(m);
        }
    }

    // ------------------------------------------------------------------
    // action engine entry points
    // ------------------------------------------------------------------

    pub fn maybe_next_action_group(&mut self) {
        self.buf
            .borrow_mut()
            .history
            .maybe_next_action_group(self.loc.cursor);
    }

    pub fn finalize_action_group(&mut self) {
        self.buf
            .borrow_mut()
            .history
            .finalize_action_group(self.loc.cursor);
    }

    /// The insert primitive: everything that adds bytes goes through here.
    pub fn action_insert(&mut self, cursor: CursorLocation, mut data: Vec<u8>) {
        if self.oneline {
            data.retain(|&b| b != b'\n');
        }
        self.maybe_next_action_group();
        let action = {
            let mut b = self.buf.borrow_mut();
            let a = Action::insert(&mut b.text, cursor, data);
            b.run_action(&a, false);
            b.history.append(a.clone());
            a
        };
        trace!(target: "state.history", line = cursor.line_num, offset = cursor.boffset,
               bytes = action.data.len(), "insert applied");
        self.after_own_action(action, ActionKind::Insert);
    }

    /// The delete primitive: everything that removes bytes goes through
    /// here.
    pub fn action_delete(&mut self, cursor: CursorLocation, nbytes: usize) {
        self.maybe_next_action_group();
        let action = {
            let mut b = self.buf.borrow_mut();
            let a = Action::delete(&b.text, cursor, nbytes);
            b.run_action(&a, false);
            b.history.append(a.clone());
            a
        };
        trace!(target: "state.history", line = cursor.line_num, offset = cursor.boffset,
               bytes = action.data.len(), "delete applied");
        self.after_own_action(action, ActionKind::Delete);
    }

    fn after_own_action(&mut self, action: Action, kind: ActionKind) {
        match kind {
            ActionKind::Insert => self.on_insert_adjust_top_line(&action),
            ActionKind::Delete => self.on_delete_adjust_top_line(&action),
        }
        self.dirty = Dirty::everything();
        self.broadcasts.push(Broadcast { action, kind });
    }

    // ------------------------------------------------------------------
    // undo / redo
    // ------------------------------------------------------------------

    pub fn undo(&mut self) {
        if self.buf.borrow().history.at_sentinel() {
            self.set_status("No further undo information");
            return;
        }
        // undo causes finalization, always
        self.finalize_action_group();

        let (actions, before) = {
            let b = self.buf.borrow();
            let g = b.history.current();
            (
                g.actions.clone(),
                g.before.expect("non-sentinel group has a before cursor"),
            )
        };
        for a in actions.iter().rev() {
            self.buf.borrow_mut().run_action(a, true);
            let kind = match a.kind {
                ActionKind::Insert => ActionKind::Delete,
                ActionKind::Delete => ActionKind::Insert,
            };
            match kind {
                ActionKind::Insert => self.on_insert_adjust_top_line(a),
                ActionKind::Delete => self.on_delete_adjust_top_line(a),
            }
            self.dirty = Dirty::everything();
            self.broadcasts.push(Broadcast {
                action: a.clone(),
                kind,
            });
        }
        self.move_cursor_to(before);
        self.loc.last_cursor_voffset = self.loc.cursor_voffset;
        self.buf.borrow_mut().history.retreat();
        self.set_status("Undo!");
    }

    pub fn redo(&mut self) {
        if !self.buf.borrow().history.can_redo() {
            self.set_status("No further redo information");
            return;
        }
        let (actions, after) = {
            let mut b = self.buf.borrow_mut();
            let g = b.history.advance();
            (
                g.actions.clone(),
                g.after.expect("finalized group has an after cursor"),
            )
        };
        for a in &actions {
            self.buf.borrow_mut().run_action(a, false);
            match a.kind {
                ActionKind::Insert => self.on_insert_adjust_top_line(a),
                ActionKind::Delete => self.on_delete_adjust_top_line(a),
            }
            self.dirty = Dirty::everything();
            self.broadcasts.push(Broadcast {
                action: a.clone(),
                kind: a.kind,
            });
        }
        self.move_cursor_to(after);
        self.loc.last_cursor_voffset = self.loc.cursor_voffset;
        self.set_status("Redo!");
    }

    // ------------------------------------------------------------------
    // reactions to edits (own top line, and edits made through other views)
    // ------------------------------------------------------------------

    pub fn on_insert_adjust_top_line(&mut self, a: &Action) {
        if a.cursor.line_num < self.loc.top_line_num && !a.lines.is_empty() {
            // inserted one or more lines above the view
            self.loc.top_line_num += a.lines.len();
            self.dirty |= Dirty::STATUS;
        }
    }

    pub fn on_delete_adjust_top_line(&mut self, a: &Action) {
        if a.cursor.line_num < self.loc.top_line_num {
            if a.lines.is_empty() {
                return;
            }
            let topnum = self.loc.top_line_num;
            let (first, last) = a.deleted_lines();
            if first <= topnum && topnum <= last {
                // the top line itself was deleted
                let next = {
                    let b = self.buf.borrow();
                    b.text.next(a.cursor.line)
                };
                match next {
                    Some(n) => {
                        self.loc.top_line = n;
                        self.loc.top_line_num = a.cursor.line_num + 1;
                    }
                    None => {
                        self.loc.top_line = a.cursor.line;
                        self.loc.top_line_num = a.cursor.line_num;
                    }
                }
                self.dirty = Dirty::everything();
            } else {
                self.loc.top_line_num -= a.lines.len();
                self.dirty |= Dirty::STATUS;
            }
        }
    }

    /// React to an insert performed through another view of this buffer.
    pub fn on_insert(&mut self, a: &Action) {
        self.on_insert_adjust_top_line(a);
        if self.loc.top_line_num + self.height() <= a.cursor.line_num {
            // inserted something below the view
            return;
        }
        if a.cursor.line_num < self.loc.top_line_num {
            if !a.lines.is_empty() {
                self.loc.cursor.line_num += a.lines.len();
                self.dirty |= Dirty::STATUS;
            }
            return;
        }
        let mut c = self.loc.cursor;
        c.on_insert_adjust(a);
        self.move_cursor_to(c);
        self.loc.last_cursor_voffset = self.loc.cursor_voffset;
        self.dirty = Dirty::everything();
    }

    /// React to a delete performed through another view of this buffer.
    pub fn on_delete(&mut self, a: &Action) {
        self.on_delete_adjust_top_line(a);
        if self.loc.top_line_num + self.height() <= a.cursor.line_num {
            // deleted something below the view
            return;
        }
        if a.cursor.line_num < self.loc.top_line_num {
            if a.lines.is_empty() {
                return;
            }
            let (_, last) = a.deleted_lines();
            if last < self.loc.top_line_num {
                self.loc.cursor.line_num -= a.lines.len();
                self.dirty |= Dirty::STATUS;
                return;
            }
        }
        let mut c = self.loc.cursor;
        c.on_delete_adjust(a);
        self.move_cursor_to(c);
        self.loc.last_cursor_voffset = self.loc.cursor_voffset;
        self.dirty = Dirty::everything();
    }

    // ------------------------------------------------------------------
    // kill buffer plumbing
    // ------------------------------------------------------------------

    fn reset_kill_buffer_maybe(&self) {
        if !self.last_command.kill {
            // a non-kill command broke the run; the next kill starts fresh
            self.ctx.borrow_mut().kill_buffer.clear();
        }
    }

    pub fn append_to_kill_buffer(&mut self, cursor: CursorLocation, nbytes: usize) {
        self.reset_kill_buffer_maybe();
        let data = {
            let b = self.buf.borrow();
            cursor.extract_bytes(&b.text, nbytes)
        };
        self.ctx.borrow_mut().kill_buffer.extend_from_slice(&data);
    }

    pub fn prepend_to_kill_buffer(&mut self, cursor: CursorLocation, nbytes: usize) {
        self.reset_kill_buffer_maybe();
        let mut data = {
            let b = self.buf.borrow();
            cursor.extract_bytes(&b.text, nbytes)
        };
        let mut ctx = self.ctx.borrow_mut();
        data.extend_from_slice(&ctx.kill_buffer);
        ctx.kill_buffer = data;
    }

    // ------------------------------------------------------------------
    // presave cleanup
    // ------------------------------------------------------------------

    fn cleanup_trailing_whitespaces(&mut self) {
        let mut cursor = {
            let b = self.buf.borrow();
            CursorLocation::buffer_start(&b.text)
        };
        loop {
            let (len, last_non_space) = {
                let b = self.buf.borrow();
                let data = b.text.line(cursor.line);
                (data.len(), core_text::index_last_non_space(data))
            };
            match last_non_space {
                None if len > 0 => {
                    // the whole line is whitespace
                    self.action_delete(cursor, len);
                }
                Some(i) if i != len - 1 => {
                    // some whitespace at the end
                    let mut c = cursor;
                    c.boffset = i + 1;
                    self.action_delete(c, len - c.boffset);
                }
                _ => {}
            }
            let next = {
                let b = self.buf.borrow();
                b.text.next(cursor.line)
            };
            match next {
                Some(n) => {
                    cursor.line = n;
                    cursor.line_num += 1;
                    cursor.boffset = 0;
                }
                None => break,
            }
        }

        // the cursor may now point past the end of its line
        let mut cursor = self.loc.cursor;
        let line_len = {
            let b = self.buf.borrow();
            b.text.line(cursor.line).len()
        };
        if cursor.boffset > line_len {
            cursor.boffset = line_len;
            self.move_cursor_to(cursor);
        }
    }

    fn cleanup_trailing_newlines(&mut self) {
        loop {
            let (line, line_num, empty, prev_empty) = {
                let b = self.buf.borrow();
                let last = b.text.last();
                let empty = b.text.line(last).is_empty();
                match b.text.prev(last) {
                    Some(p) => (p, b.text.lines_n() - 1, empty, b.text.line(p).is_empty()),
                    None => return, // single line, nothing to trim
                }
            };
            if !empty || !prev_empty {
                // leave exactly one trailing empty line
                return;
            }
            if self.loc.cursor.line_num == line_num + 1 {
                self.move_cursor_prev_line();
            }
            let cursor = CursorLocation {
                line,
                line_num,
                boffset: 0,
            };
            self.action_delete(cursor, 1);
        }
    }

    fn ensure_trailing_eol(&mut self) {
        let cursor = {
            let b = self.buf.borrow();
            CursorLocation::buffer_end(&b.text)
        };
        if cursor.boffset > 0 {
            self.action_insert(cursor, vec![b'\n']);
        }
    }

    /// Normalize the buffer before writing it out; `raw` skips every
    /// transformation.
    pub fn presave_cleanup(&mut self, raw: bool) {
        self.finalize_action_group();
        self.last_command = LastCommand::none();
        if !raw {
            self.cleanup_trailing_whitespaces();
            self.cleanup_trailing_newlines();
            self.ensure_trailing_eol();
            self.finalize_action_group();
        }
    }

    // ------------------------------------------------------------------
    // autocompletion
    // ------------------------------------------------------------------

    /// Start an autocompletion session with the view's provider. If the
    /// proposals collapse to a single candidate after inserting the common
    /// prefix, it is committed immediately and no session remains.
    pub fn init_autocompl(&mut self) {
        let Some(provider) = self.ac_provider.clone() else {
            return;
        };
        let (proposals, chars_back) = provider.propose(self);
        if proposals.is_empty() {
            return;
        }

        if chars_back > 0 {
            let origin = self.loc.cursor;
            for _ in 0..chars_back {
                self.move_cursor_backward();
            }
            let d = {
                let b = self.buf.borrow();
                self.loc.cursor.distance(&b.text, origin)
            };
            debug_assert!(d >= 0);
            self.action_delete(self.loc.cursor, d as usize);
            self.finalize_action_group();
        }

        let mut ac = AutocomplSession::new(proposals, self.loc.cursor);
        let common = ac.common_prefix();
        if !common.is_empty() {
            let mut c = self.loc.cursor;
            self.action_insert(c, common.clone());
            c.boffset += common.len();
            self.move_cursor_to(c);
            self.finalize_action_group();
            let b = self.buf.borrow();
            ac.update(self.loc.cursor, &b.text);
        }
        let single = ac.actual_len() == 1;
        self.ac = Some(ac);
        if single {
            self.ac_finalize();
        }
    }

    /// Commit the selected proposal and end the session.
    pub fn ac_finalize(&mut self) {
        let Some(ac) = self.ac.take() else { return };
        let (mut current, data) = {
            let b = self.buf.borrow();
            ac.finalize_data(&b.text)
        };
        if !data.is_empty() {
            self.action_insert(current, data.clone());
        }
        current.boffset += data.len();
        self.move_cursor_to(current);
    }

    pub fn ac_move_cursor_up(&mut self) {
        if let Some(ac) = self.ac.as_mut() {
            ac.move_cursor_up();
        }
    }

    pub fn ac_move_cursor_down(&mut self) {
        if let Some(ac) = self.ac.as_mut() {
            ac.move_cursor_down();
        }
    }
}
