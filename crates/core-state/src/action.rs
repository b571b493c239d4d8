//! A single entity of undo/redo history. All changes to the contents of a
//! buffer must be initiated by an action.
//!
//! An action owns a pre-captured list of satellite line handles, one per
//! newline in its payload. Applying an insert splices exactly those nodes
//! into the line list; reverting it unlinks them again. Because the handles
//! are stable, undo/redo reuses identical nodes and the structure round-trips
//! byte for byte.

use crate::cursor::CursorLocation;
use crate::text::{BufferText, LineId};
use core_text::line_chunks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Insert,
    Delete,
}

impl ActionKind {
    fn opposite(self) -> ActionKind {
        match self {
            ActionKind::Insert => ActionKind::Delete,
            ActionKind::Delete => ActionKind::Insert,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub data: Vec<u8>,
    pub cursor: CursorLocation,
    /// Satellite nodes, one per `\n` in `data`. For an insert these are the
    /// pre-allocated empty nodes to splice in; for a delete, the successor
    /// lines that application removes.
    pub lines: Vec<LineId>,
}

impl Action {
    /// Build an insert action at `cursor`, allocating its satellite nodes.
    pub fn insert(text: &mut BufferText, cursor: CursorLocation, data: Vec<u8>) -> Action {
        let nlines = data.iter().filter(|&&b| b == b'\n').count();
        let lines = (0..nlines).map(|_| text.alloc_line()).collect();
        Action {
            kind: ActionKind::Insert,
            data,
            cursor,
            lines,
        }
    }

    /// Build a delete action spanning `nbytes` forward from `cursor`. The
    /// satellite list captures the successor lines the deletion will remove.
    pub fn delete(text: &BufferText, cursor: CursorLocation, nbytes: usize) -> Action {
        let data = cursor.extract_bytes(text, nbytes);
        let nlines = data.iter().filter(|&&b| b == b'\n').count();
        let mut lines = Vec::with_capacity(nlines);
        let mut line = cursor.line;
        for _ in 0..nlines {
            line = text.next(line).expect("delete spans past last line");
            lines.push(line);
        }
        Action {
            kind: ActionKind::Delete,
            data,
            cursor,
            lines,
        }
    }

    pub fn apply(&self, text: &mut BufferText) {
        self.run(text, self.kind);
    }

    pub fn revert(&self, text: &mut BufferText) {
        self.run(text, self.kind.opposite());
    }

    fn run(&self, text: &mut BufferText, what: ActionKind) {
        match what {
            ActionKind::Insert => self.do_insert(text),
            ActionKind::Delete => self.do_delete(text),
        }
    }

    fn do_insert(&self, text: &mut BufferText) {
        let mut nline = 0;
        let mut offset = self.cursor.boffset;
        let mut line = self.cursor.line;
        let mut tail: Option<Vec<u8>> = None;
        for chunk in line_chunks(&self.data) {
            if chunk[0] == b'\n' {
                if offset < text.line(line).len() {
                    // inserting in the middle of the line: carry the chunk
                    // past the cursor over to the end of the walk
                    tail = Some(text.line_mut(line).split_off(offset));
                }
                let satellite = self.lines[nline];
                text.link_after(satellite, line);
                line = satellite;
                nline += 1;
                offset = 0;
            } else {
                text.add_bytes(chunk.len());
                let data = text.line_mut(line);
                data.splice(offset..offset, chunk.iter().copied());
                offset += chunk.len();
            }
        }
        if let Some(tail) = tail {
            text.line_mut(line).extend_from_slice(&tail);
        }
    }

    fn do_delete(&self, text: &mut BufferText) {
        let mut nline = 0;
        let offset = self.cursor.boffset;
        let line = self.cursor.line;
        for chunk in line_chunks(&self.data) {
            if chunk[0] == b'\n' {
                // append the contents of the deleted line to the current one
                let moved = std::mem::take(text.line_mut(self.lines[nline]));
                text.line_mut(line).extend_from_slice(&moved);
                text.unlink(self.lines[nline]);
                nline += 1;
            } else {
                text.sub_bytes(chunk.len());
                text.line_mut(line).drain(offset..offset + chunk.len());
            }
        }
    }

    /// Last satellite node; only meaningful when `lines` is non-empty.
    pub fn last_line(&self) -> LineId {
        *self.lines.last().expect("action without satellite lines")
    }

    /// Length of the payload past its final newline (the whole payload when
    /// there is none).
    pub fn last_line_affection_len(&self) -> usize {
        match self.data.iter().rposition(|&b| b == b'\n') {
            Some(i) => self.data.len() - i - 1,
            None => self.data.len(),
        }
    }

    /// Length of the payload up to its first newline.
    pub fn first_line_affection_len(&self) -> usize {
        match self.data.iter().position(|&b| b == b'\n') {
            Some(i) => i,
            None => self.data.len(),
        }
    }

    /// 1-based range of deleted line numbers (first, last).
    pub fn deleted_lines(&self) -> (usize, usize) {
        let first = self.cursor.line_num + 1;
        (first, first + self.lines.len() - 1)
    }

    /// Try to merge `b` into `self`. Only same-kind, same-line actions with
    /// abutting offsets merge; insertion merges as "ba", deletion as "ab".
    /// TODO compressing delete_rune actions is broken — only the plain
    /// same-offset/abutting cases are handled, deliberately.
    pub fn try_merge(&mut self, b: &Action) -> bool {
        if self.kind != b.kind {
            return false;
        }
        if self.cursor.line_num != b.cursor.line_num {
            return false;
        }

        if self.cursor.boffset == b.cursor.boffset {
            let (mut first, second) = match self.kind {
                // on insertion merge as 'ba', on deletion as 'ab'
                ActionKind::Insert => (b.clone(), &*self),
                ActionKind::Delete => (self.clone(), b),
            };
            first.data.extend_from_slice(&second.data);
            first.lines.extend_from_slice(&second.lines);
            *self = first;
            return true;
        }

        // different offsets: restore the byte sequence if they abut
        let (mut first, second) = if b.cursor.boffset < self.cursor.boffset {
            (b.clone(), &*self)
        } else {
            (self.clone(), b)
        };
        if first.cursor.boffset + first.data.len() == second.cursor.boffset {
            first.data.extend_from_slice(&second.data);
            first.lines.extend_from_slice(&second.lines);
            *self = first;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor_at(t: &BufferText, line_num: usize, boffset: usize) -> CursorLocation {
        let mut id = t.first();
        for _ in 1..line_num {
            id = t.next(id).unwrap();
        }
        CursorLocation::new(id, line_num, boffset)
    }

    fn lines_of(t: &BufferText) -> Vec<Vec<u8>> {
        t.iter_ids().map(|id| t.line(id).to_vec()).collect()
    }

    #[test]
    fn insert_plain_bytes() {
        let mut t = BufferText::from_bytes(b"held");
        let c = cursor_at(&t, 1, 2);
        let a = Action::insert(&mut t, c, b"llo wor".to_vec());
        a.apply(&mut t);
        assert_eq!(lines_of(&t), vec![b"hello world".to_vec()]);
        assert_eq!(t.bytes_n(), 11);
        a.revert(&mut t);
        assert_eq!(lines_of(&t), vec![b"held".to_vec()]);
        t.check_invariants();
    }

    #[test]
    fn insert_newline_mid_line_carries_tail() {
        let mut t = BufferText::from_bytes(b"hello world");
        let c = cursor_at(&t, 1, 5);
        let a = Action::insert(&mut t, c, b"\n".to_vec());
        a.apply(&mut t);
        assert_eq!(lines_of(&t), vec![b"hello".to_vec(), b" world".to_vec()]);
        assert_eq!(t.lines_n(), 2);
        assert_eq!(t.bytes_n(), 11);
        a.revert(&mut t);
        assert_eq!(lines_of(&t), vec![b"hello world".to_vec()]);
        t.check_invariants();
    }

    #[test]
    fn insert_multiline_payload() {
        let mut t = BufferText::from_bytes(b"AB");
        let c = cursor_at(&t, 1, 1);
        let a = Action::insert(&mut t, c, b"1\n2\n3".to_vec());
        a.apply(&mut t);
        assert_eq!(
            lines_of(&t),
            vec![b"A1".to_vec(), b"2".to_vec(), b"3B".to_vec()]
        );
        a.revert(&mut t);
        assert_eq!(lines_of(&t), vec![b"AB".to_vec()]);
        t.check_invariants();
    }

    #[test]
    fn delete_joins_lines() {
        let mut t = BufferText::from_bytes(b"ab\ncd");
        let c = cursor_at(&t, 1, 2);
        let a = Action::delete(&t, c, 1);
        assert_eq!(a.data, b"\n");
        assert_eq!(a.lines.len(), 1);
        a.apply(&mut t);
        assert_eq!(lines_of(&t), vec![b"abcd".to_vec()]);
        a.revert(&mut t);
        assert_eq!(lines_of(&t), vec![b"ab".to_vec(), b"cd".to_vec()]);
        t.check_invariants();
    }

    #[test]
    fn delete_across_lines_reuses_nodes_on_revert() {
        let mut t = BufferText::from_bytes(b"one\ntwo\nthree");
        let ids: Vec<_> = t.iter_ids().collect();
        let c = cursor_at(&t, 1, 1);
        let a = Action::delete(&t, c, 7); // "ne\ntwo\n"
        assert_eq!(a.data, b"ne\ntwo\n");
        a.apply(&mut t);
        assert_eq!(lines_of(&t), vec![b"othree".to_vec()]);
        a.revert(&mut t);
        assert_eq!(
            lines_of(&t),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
        // the satellite nodes come back as the very same handles
        assert_eq!(t.iter_ids().collect::<Vec<_>>(), ids);
        t.check_invariants();
    }

    #[test]
    fn merge_insert_appends_forward() {
        let mut t = BufferText::from_bytes(b"");
        let c0 = cursor_at(&t, 1, 0);
        let mut a = Action::insert(&mut t, c0, b"b".to_vec());
        a.apply(&mut t);
        let c1 = cursor_at(&t, 1, 1);
        let b = Action::insert(&mut t, c1, b"a".to_vec());
        b.apply(&mut t);
        assert!(a.try_merge(&b));
        assert_eq!(a.data, b"ba");
        assert_eq!(a.cursor.boffset, 0);
    }

    #[test]
    fn merge_insert_same_offset_prepends() {
        // typing 'a' then moving back and typing 'b' at the same offset:
        // merged payload must read "ba" (the later insert lands first).
        let mut t = BufferText::from_bytes(b"");
        let c0 = cursor_at(&t, 1, 0);
        let mut a = Action::insert(&mut t, c0, b"a".to_vec());
        a.apply(&mut t);
        let b = Action::insert(&mut t, c0, b"b".to_vec());
        b.apply(&mut t);
        assert!(a.try_merge(&b));
        assert_eq!(a.data, b"ba");
    }

    #[test]
    fn merge_delete_same_offset_appends() {
        // delete-forward twice at the same offset accumulates "ab"
        let mut t = BufferText::from_bytes(b"ab");
        let c = cursor_at(&t, 1, 0);
        let mut a = Action::delete(&t, c, 1);
        a.apply(&mut t);
        let b = Action::delete(&t, c, 1);
        b.apply(&mut t);
        assert!(a.try_merge(&b));
        assert_eq!(a.data, b"ab");
        assert_eq!(t.line(t.first()), b"");
    }

    #[test]
    fn merge_refuses_other_lines_and_gaps() {
        let mut t = BufferText::from_bytes(b"abc\ndef");
        let c1 = cursor_at(&t, 1, 0);
        let c2 = cursor_at(&t, 2, 0);
        let mut a = Action::insert(&mut t, c1, b"x".to_vec());
        let b = Action::insert(&mut t, c2, b"y".to_vec());
        assert!(!a.try_merge(&b));

        let gap = Action {
            kind: ActionKind::Insert,
            data: b"y".to_vec(),
            cursor: cursor_at(&t, 1, 2),
            lines: Vec::new(),
        };
        assert!(!a.try_merge(&gap));

        let del = Action::delete(&t, c1, 1);
        assert!(!a.try_merge(&del), "kinds differ");
    }

    #[test]
    fn affection_lengths() {
        let mut t = BufferText::from_bytes(b"");
        let c = cursor_at(&t, 1, 0);
        let a = Action::insert(&mut t, c, b"ab\ncde\nf".to_vec());
        assert_eq!(a.first_line_affection_len(), 2);
        assert_eq!(a.last_line_affection_len(), 1);
        let plain = Action::insert(&mut t, c, b"xyz".to_vec());
        assert_eq!(plain.first_line_affection_len(), 3);
        assert_eq!(plain.last_line_affection_len(), 3);
    }
}
