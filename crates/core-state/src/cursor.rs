//! Cursor locations and the arithmetic that keeps them valid across edits.
//!
//! A `CursorLocation` is (line handle, 1-based line number, byte offset).
//! All motion is defined over the owning buffer's [`BufferText`], passed
//! explicitly — locations themselves are plain `Copy` data, so call sites
//! freely copy, probe and discard them.

use crate::action::Action;
use crate::text::{BufferText, LineId};
use core_text::{decode_last_rune, decode_rune, is_word, INVALID_RUNE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorLocation {
    pub line: LineId,
    /// 1-based.
    pub line_num: usize,
    pub boffset: usize,
}

impl CursorLocation {
    pub fn new(line: LineId, line_num: usize, boffset: usize) -> Self {
        Self {
            line,
            line_num,
            boffset,
        }
    }

    /// Start of the buffer.
    pub fn buffer_start(text: &BufferText) -> Self {
        Self::new(text.first(), 1, 0)
    }

    /// End of the buffer (after the last byte of the last line).
    pub fn buffer_end(text: &BufferText) -> Self {
        Self::new(text.last(), text.lines_n(), text.line(text.last()).len())
    }

    pub fn rune_under(&self, text: &BufferText) -> (char, usize) {
        decode_rune(&text.line(self.line)[self.boffset..])
    }

    pub fn rune_before(&self, text: &BufferText) -> (char, usize) {
        decode_last_rune(&text.line(self.line)[..self.boffset])
    }

    pub fn first_line(&self, text: &BufferText) -> bool {
        text.prev(self.line).is_none()
    }

    pub fn last_line(&self, text: &BufferText) -> bool {
        text.next(self.line).is_none()
    }

    /// End of line.
    pub fn eol(&self, text: &BufferText) -> bool {
        self.boffset == text.line(self.line).len()
    }

    /// Beginning of line.
    pub fn bol(&self) -> bool {
        self.boffset == 0
    }

    /// Signed distance to `other` in bytes, counting each inter-line step as
    /// one byte.
    pub fn distance(&self, text: &BufferText, other: CursorLocation) -> isize {
        let (mut a, b, sign) = if (other.line_num, other.boffset) < (self.line_num, self.boffset) {
            (other, *self, -1isize)
        } else {
            (*self, other, 1isize)
        };
        let mut n = 0isize;
        while a.line != b.line {
            n += (text.line(a.line).len() - a.boffset) as isize + 1;
            a.line = text.next(a.line).expect("distance across unlinked lines");
            a.boffset = 0;
        }
        n += b.boffset as isize - a.boffset as isize;
        n * sign
    }

    pub fn voffset(&self, text: &BufferText) -> usize {
        core_text::voffset(text.line(self.line), self.boffset)
    }

    pub fn coffset(&self, text: &BufferText) -> usize {
        self.voffset_coffset(text).1
    }

    pub fn voffset_coffset(&self, text: &BufferText) -> (usize, usize) {
        core_text::voffset_coffset(text.line(self.line), self.boffset)
    }

    /// Extract `n` forward bytes, inserting `\n` across line boundaries.
    pub fn extract_bytes(&self, text: &BufferText, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n);
        let mut offset = self.boffset;
        let mut line = self.line;
        let mut n = n;
        while n > 0 {
            let data = text.line(line);
            if offset < data.len() {
                let nb = (data.len() - offset).min(n);
                out.extend_from_slice(&data[offset..offset + nb]);
                n -= nb;
                offset += nb;
            } else if offset == data.len() {
                out.push(b'\n');
                offset = 0;
                n -= 1;
                if n == 0 {
                    break;
                }
                line = text
                    .next(line)
                    .unwrap_or_else(|| unreachable!("extract_bytes past end of buffer"));
            } else {
                unreachable!("cursor offset beyond line length");
            }
        }
        out
    }

    pub fn move_one_rune_forward(&mut self, text: &BufferText) {
        if self.last_line(text) && self.eol(text) {
            return;
        }
        if self.eol(text) {
            self.line = text.next(self.line).unwrap();
            self.line_num += 1;
            self.boffset = 0;
        } else {
            let (_, rlen) = self.rune_under(text);
            self.boffset += rlen;
        }
    }

    pub fn move_one_rune_backward(&mut self, text: &BufferText) {
        if self.first_line(text) && self.bol() {
            return;
        }
        if self.bol() {
            self.line = text.prev(self.line).unwrap();
            self.line_num -= 1;
            self.boffset = text.line(self.line).len();
        } else {
            let (_, rlen) = self.rune_before(text);
            self.boffset -= rlen;
        }
    }

    pub fn move_beginning_of_line(&mut self) {
        self.boffset = 0;
    }

    pub fn move_end_of_line(&mut self, text: &BufferText) {
        self.boffset = text.line(self.line).len();
    }

    /// The word-rune run immediately before the cursor, if any.
    pub fn word_under_cursor(&self, text: &BufferText) -> Option<Vec<u8>> {
        let end = *self;
        let mut beg = *self;
        let (mut r, mut rlen) = beg.rune_before(text);
        if r == INVALID_RUNE && rlen == 0 {
            return None;
        }
        while is_word(r) && !beg.bol() {
            beg.boffset -= rlen;
            let (nr, nlen) = beg.rune_before(text);
            r = nr;
            rlen = nlen;
        }
        if beg.boffset == end.boffset {
            return None;
        }
        Some(text.line(self.line)[beg.boffset..end.boffset].to_vec())
    }

    /// Skip non-word runes, then consume word runes. Returns false when the
    /// end of the buffer stopped the move.
    pub fn move_one_word_forward(&mut self, text: &BufferText) -> bool {
        loop {
            if self.eol(text) {
                if self.last_line(text) {
                    return false;
                }
                self.line = text.next(self.line).unwrap();
                self.line_num += 1;
                self.boffset = 0;
                continue;
            }
            let (mut r, mut rlen) = self.rune_under(text);
            while !is_word(r) && !self.eol(text) {
                self.boffset += rlen;
                let (nr, nlen) = self.rune_under(text);
                r = nr;
                rlen = nlen;
            }
            if self.eol(text) {
                continue;
            }
            break;
        }
        let (mut r, mut rlen) = self.rune_under(text);
        while is_word(r) && !self.eol(text) {
            self.boffset += rlen;
            let (nr, nlen) = self.rune_under(text);
            r = nr;
            rlen = nlen;
        }
        true
    }

    /// Mirror of [`Self::move_one_word_forward`]. Returns false at the
    /// beginning of the buffer.
    pub fn move_one_word_backward(&mut self, text: &BufferText) -> bool {
        loop {
            if self.bol() {
                if self.first_line(text) {
                    return false;
                }
                self.line = text.prev(self.line).unwrap();
                self.line_num -= 1;
                self.boffset = text.line(self.line).len();
                continue;
            }
            let (mut r, mut rlen) = self.rune_before(text);
            while !is_word(r) && !self.bol() {
                self.boffset -= rlen;
                let (nr, nlen) = self.rune_before(text);
                r = nr;
                rlen = nlen;
            }
            if self.bol() {
                continue;
            }
            break;
        }
        let (mut r, mut rlen) = self.rune_before(text);
        while is_word(r) && !self.bol() {
            self.boffset -= rlen;
            let (nr, nlen) = self.rune_before(text);
            r = nr;
            rlen = nlen;
        }
        true
    }

    /// Replay an insert action's effect on this location.
    pub fn on_insert_adjust(&mut self, a: &Action) {
        if a.cursor.line_num > self.line_num {
            return;
        }
        if a.cursor.line_num < self.line_num {
            // inserted something above the cursor
            self.line_num += a.lines.len();
            return;
        }
        // insertion on the cursor line
        if a.cursor.boffset < self.boffset {
            if a.lines.is_empty() {
                self.boffset += a.data.len();
            } else {
                self.line = a.last_line();
                self.line_num += a.lines.len();
                self.boffset = a.last_line_affection_len() + self.boffset - a.cursor.boffset;
            }
        }
    }

    /// Replay a delete action's effect on this location.
    pub fn on_delete_adjust(&mut self, a: &Action) {
        if a.cursor.line_num > self.line_num {
            return;
        }
        if a.cursor.line_num < self.line_num {
            // deletion above the cursor line
            if a.lines.is_empty() {
                return;
            }
            let (first, last) = a.deleted_lines();
            if first <= self.line_num && self.line_num <= last {
                // the cursor line itself was deleted
                let n = if last == self.line_num {
                    self.boffset.saturating_sub(a.last_line_affection_len())
                } else {
                    0
                };
                *self = a.cursor;
                self.boffset += n;
            } else {
                self.line_num -= a.lines.len();
                return;
            }
        }
        // deletion on the cursor line
        if a.cursor.boffset >= self.boffset {
            return;
        }
        let n = self
            .boffset
            .saturating_sub(a.cursor.boffset + a.first_line_affection_len());
        self.boffset = a.cursor.boffset + n;
    }

    /// Line-by-line substring search from this location towards the end.
    pub fn search_forward(&self, text: &BufferText, word: &[u8]) -> Option<CursorLocation> {
        let mut c = *self;
        loop {
            if let Some(i) = find_sub(&text.line(c.line)[c.boffset..], word) {
                c.boffset += i;
                return Some(c);
            }
            match text.next(c.line) {
                Some(next) => {
                    c.line = next;
                    c.line_num += 1;
                    c.boffset = 0;
                }
                None => return None,
            }
        }
    }

    /// Line-by-line substring search from this location towards the start.
    pub fn search_backward(&self, text: &BufferText, word: &[u8]) -> Option<CursorLocation> {
        let mut c = *self;
        loop {
            if let Some(i) = rfind_sub(&text.line(c.line)[..c.boffset], word) {
                c.boffset = i;
                return Some(c);
            }
            match text.prev(c.line) {
                Some(prev) => {
                    c.line = prev;
                    c.line_num -= 1;
                    c.boffset = text.line(c.line).len();
                }
                None => return None,
            }
        }
    }

    /// Order a pair of locations (start, end).
    pub fn ordered(a: CursorLocation, b: CursorLocation) -> (CursorLocation, CursorLocation) {
        if (a.line_num, a.boffset) <= (b.line_num, b.boffset) {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Bytes between two same-line locations; caller guarantees
/// `a.boffset <= b.boffset` and `a.line == b.line`.
pub fn bytes_between<'t>(text: &'t BufferText, a: CursorLocation, b: CursorLocation) -> &'t [u8] {
    debug_assert_eq!(a.line, b.line);
    &text.line(a.line)[a.boffset..b.boffset]
}

/// First occurrence of `needle` in `haystack` (empty needle matches at 0).
pub fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Last occurrence of `needle` in `haystack`.
pub fn rfind_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// A view's place in a buffer, saved by the buffer across detach/attach so
/// reopening restores the position. The offsets cache what the cursor's
/// byte offset costs in characters and visual cells; `line_voffset` is the
/// horizontal scroll of the cursor line, and `last_cursor_voffset` is the
/// column vertical motion tries to preserve.
#[derive(Debug, Clone, Copy)]
pub struct ViewLocation {
    pub cursor: CursorLocation,
    pub top_line: LineId,
    pub top_line_num: usize,
    pub cursor_coffset: usize,
    pub cursor_voffset: usize,
    pub line_voffset: usize,
    pub last_cursor_voffset: usize,
}

impl ViewLocation {
    pub fn at_start(text: &BufferText) -> Self {
        Self {
            cursor: CursorLocation::buffer_start(text),
            top_line: text.first(),
            top_line_num: 1,
            cursor_coffset: 0,
            cursor_voffset: 0,
            line_voffset: 0,
            last_cursor_voffset: 0,
        }
    }
}
