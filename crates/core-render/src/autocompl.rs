//! Autocompletion session state and its popup rendering.
//!
//! A session is transient state attached to one view: the full proposal
//! list from a provider, a filter derived from the bytes the user typed
//! since the session origin, a selection index and a scroll offset. The
//! popup is drawn onto the editor's composed grid using a best-of-four
//! quadrant placement around the origin cell.

use crate::cell::{find_place_for_rect, Attrs, Cell, CellGrid, Color, Rect};
use crate::view::View;
use core_state::{bytes_between, BufferText, CursorLocation};
use core_text::decode_rune;

/// Hard cap on the filtered proposal list.
pub const AC_MAX_FILTERED: usize = 200;
/// Maximum popup height in lines.
pub const AC_UI_MAX_LINES: usize = 14;

#[derive(Debug, Clone)]
pub struct AcProposal {
    pub display: Vec<u8>,
    pub content: Vec<u8>,
}

impl AcProposal {
    pub fn same(word: impl Into<Vec<u8>>) -> Self {
        let w = word.into();
        Self {
            display: w.clone(),
            content: w,
        }
    }
}

/// An autocompletion provider: proposals plus the number of characters
/// before the cursor that a committed proposal replaces.
pub trait AcProvider {
    fn propose(&self, view: &View) -> (Vec<AcProposal>, usize);
}

pub struct AutocomplSession {
    origin: CursorLocation,
    current: CursorLocation,
    proposals: Vec<AcProposal>,
    /// Indices into `proposals` matching the live filter.
    filtered: Vec<usize>,
    cursor: usize,
    view_off: usize,
}

fn rune_count(data: &[u8]) -> usize {
    let mut n = 0;
    let mut rest = data;
    while !rest.is_empty() {
        let (_, rlen) = decode_rune(rest);
        rest = &rest[rlen.max(1)..];
        n += 1;
    }
    n
}

impl AutocomplSession {
    pub fn new(proposals: Vec<AcProposal>, origin: CursorLocation) -> Self {
        debug_assert!(!proposals.is_empty());
        Self {
            origin,
            current: origin,
            proposals,
            filtered: Vec::new(),
            cursor: 0,
            view_off: 0,
        }
    }

    pub fn origin(&self) -> CursorLocation {
        self.origin
    }

    /// Longest common prefix of all proposal contents.
    pub fn common_prefix(&self) -> Vec<u8> {
        let mut common: &[u8] = &self.proposals[0].content;
        for p in &self.proposals {
            let mut n = common.len().min(p.content.len());
            for i in 0..n {
                if common[i] != p.content[i] {
                    n = i;
                    break;
                }
            }
            common = &common[..n];
        }
        common.to_vec()
    }

    fn filtering(&self) -> bool {
        self.origin.boffset != self.current.boffset
    }

    pub fn actual_len(&self) -> usize {
        if self.filtering() {
            self.filtered.len()
        } else {
            self.proposals.len()
        }
    }

    fn actual(&self, i: usize) -> &AcProposal {
        if self.filtering() {
            &self.proposals[self.filtered[i]]
        } else {
            &self.proposals[i]
        }
    }

    /// Follow a cursor move. Returns false when the session must be
    /// discarded: the cursor left the origin line, moved before the origin,
    /// or the filter matches nothing.
    pub fn update(&mut self, current: CursorLocation, text: &BufferText) -> bool {
        if self.origin.line_num != current.line_num {
            return false;
        }
        if self.origin.boffset > current.boffset {
            return false;
        }
        if self.current.boffset == current.boffset {
            // spurious update
            return true;
        }
        self.current = current;
        if self.current.boffset == self.origin.boffset {
            // back at the origin: the full list applies again
            return true;
        }

        self.filtered.clear();
        let filter = bytes_between(text, self.origin, self.current);
        for (i, p) in self.proposals.iter().enumerate() {
            if self.filtered.len() >= AC_MAX_FILTERED {
                break;
            }
            if p.content.starts_with(filter) {
                self.filtered.push(i);
            }
        }
        !self.filtered.is_empty()
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor + 1 < self.actual_len() {
            self.cursor += 1;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn validate_cursor(&mut self) {
        if self.cursor >= self.actual_len() {
            self.cursor = 0;
            self.view_off = 0;
        }
    }

    fn desired_height(&self) -> usize {
        AC_UI_MAX_LINES.min(self.actual_len() - self.view_off)
    }

    fn desired_width(&self, height: usize) -> usize {
        let mut minw = 0;
        for i in 0..height {
            let n = self.view_off + i;
            minw = minw.max(rune_count(&self.actual(n).display));
        }
        minw + 2
    }

    fn adjust_view(&mut self, height: usize) {
        if self.cursor < self.view_off {
            self.view_off = self.cursor;
        }
        if self.cursor >= self.view_off + height {
            self.view_off = self.cursor - height + 1;
        }
    }

    /// Scrollbar cell for the popup's right edge, `None` when everything
    /// fits.
    fn slider_pos_and_rune(&self, height: usize) -> Option<(usize, char)> {
        let len = self.actual_len();
        if len == height {
            return None;
        }
        let max = len - height;
        if self.view_off == max {
            return Some((height - 1, '▄'));
        }
        let progress =
            ((self.view_off as f32 / max as f32) * (height as f32 * 2.0)) as usize;
        let r = if progress & 1 != 0 { '▄' } else { '▀' };
        Some((progress / 2, r))
    }

    /// Paint the popup onto `grid`, preferring the cell below-right of
    /// `(x, y)` and mirroring into other quadrants when clipped.
    pub fn draw_onto(&mut self, grid: &mut CellGrid, x: isize, y: isize) {
        self.validate_cursor();
        if self.actual_len() == 0 {
            return;
        }

        let h = self.desired_height();
        let dst = find_place_for_rect(grid.rect(), Rect::new(x, y + 1, 1, h));
        if dst.height == 0 {
            return;
        }
        self.adjust_view(dst.height);
        let w = self.desired_width(dst.height);
        let dst = find_place_for_rect(grid.rect(), Rect::new(x, y + 1, w, h));
        if dst.width == 0 || dst.height == 0 {
            return;
        }

        let slider = self.slider_pos_and_rune(dst.height);
        let mut row = dst;
        row.width -= 1;
        row.height = 1;
        for i in 0..dst.height {
            let n = self.view_off + i;
            let (fg, bg) = if n == self.cursor {
                (Color::White, Color::Blue)
            } else {
                (Color::Black, Color::White)
            };
            grid.fill(row, Cell::new(' ', fg, bg));
            grid.draw_label(row, fg, bg, Attrs::empty(), &self.actual(n).display);

            let sr = match slider {
                Some((si, r)) if si == i => r,
                _ => ' ',
            };
            grid.set(
                (row.x + row.width as isize) as usize,
                row.y as usize,
                Cell::new(sr, Color::White, Color::Blue),
            );
            row.y += 1;
        }
    }

    /// The bytes a commit inserts at the current cursor (the selected
    /// content past the already-typed filter), paired with the insertion
    /// point.
    pub fn finalize_data(&self, text: &BufferText) -> (CursorLocation, Vec<u8>) {
        let d = self.origin.distance(text, self.current);
        assert!(d >= 0, "autocompletion cursor moved before its origin");
        let idx = if self.cursor >= self.actual_len() {
            0
        } else {
            self.cursor
        };
        let data = self.actual(idx).content[d as usize..].to_vec();
        (self.current, data)
    }
}
