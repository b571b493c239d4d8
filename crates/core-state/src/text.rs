//! Line arena and the doubly linked line list.
//!
//! `BufferText` owns every line node of one buffer. Nodes are addressed by
//! stable [`LineId`] handles; `prev`/`next` are handles too, so the "linked
//! list" is just `first`/`last` plus per-slot neighbors. Unlinking a node
//! leaves its slot allocated — actions keep handles to unlinked satellite
//! nodes and relink them on redo. Slots on the free list are only those
//! explicitly recycled.
//!
//! Invariants (hold between public calls):
//! * at least one line is linked; `first.prev == None`, `last.next == None`;
//! * `lines_n` equals the number of linked nodes;
//! * `bytes_n` equals the sum of linked nodes' data lengths (the implicit
//!   newline separators are not counted).

/// Stable handle of a line node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(u32);

impl LineId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct LineSlot {
    data: Vec<u8>,
    prev: Option<LineId>,
    next: Option<LineId>,
}

#[derive(Debug)]
pub struct BufferText {
    slots: Vec<LineSlot>,
    free: Vec<LineId>,
    first: LineId,
    last: LineId,
    lines_n: usize,
    bytes_n: usize,
}

impl BufferText {
    /// A text of exactly one empty line.
    pub fn new() -> Self {
        let mut t = Self {
            slots: Vec::new(),
            free: Vec::new(),
            first: LineId(0),
            last: LineId(0),
            lines_n: 0,
            bytes_n: 0,
        };
        let l = t.alloc();
        t.first = l;
        t.last = l;
        t.lines_n = 1;
        t
    }

    /// Build from raw file bytes. `\n` separates lines; content after the
    /// last `\n` (or the whole input without one) becomes the final line, so
    /// `"a\n"` loads as `["a", ""]` and saves back byte-identical.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut t = Self::new();
        let mut start = 0;
        let mut cur = t.first;
        for (i, &b) in data.iter().enumerate() {
            if b == b'\n' {
                let line = &data[start..i];
                t.slots[cur.index()].data = line.to_vec();
                t.bytes_n += line.len();
                let next = t.alloc();
                t.link_after(next, cur);
                cur = next;
                start = i + 1;
            }
        }
        let tail = &data[start..];
        t.slots[cur.index()].data = tail.to_vec();
        t.bytes_n += tail.len();
        t
    }

    fn alloc(&mut self) -> LineId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = LineSlot::default();
            return id;
        }
        let id = LineId(self.slots.len() as u32);
        self.slots.push(LineSlot::default());
        id
    }

    /// Allocate a fresh, unlinked, empty line node (a satellite for a future
    /// insert action).
    pub fn alloc_line(&mut self) -> LineId {
        self.alloc()
    }

    pub fn first(&self) -> LineId {
        self.first
    }

    pub fn last(&self) -> LineId {
        self.last
    }

    pub fn lines_n(&self) -> usize {
        self.lines_n
    }

    pub fn bytes_n(&self) -> usize {
        self.bytes_n
    }

    pub fn line(&self, id: LineId) -> &[u8] {
        &self.slots[id.index()].data
    }

    pub fn line_mut(&mut self, id: LineId) -> &mut Vec<u8> {
        &mut self.slots[id.index()].data
    }

    pub fn next(&self, id: LineId) -> Option<LineId> {
        self.slots[id.index()].next
    }

    pub fn prev(&self, id: LineId) -> Option<LineId> {
        self.slots[id.index()].prev
    }

    /// Splice `line` into the list right after `prev`.
    pub fn link_after(&mut self, line: LineId, prev: LineId) {
        let after = self.slots[prev.index()].next;
        self.slots[prev.index()].next = Some(line);
        self.slots[line.index()].prev = Some(prev);
        self.slots[line.index()].next = after;
        match after {
            Some(a) => self.slots[a.index()].prev = Some(line),
            None => self.last = line,
        }
        self.lines_n += 1;
    }

    /// Unlink `line` from the list. Its data is cleared (a later relink via
    /// the same action repopulates it); the slot itself stays allocated so
    /// the handle remains valid.
    pub fn unlink(&mut self, line: LineId) {
        let LineSlot { prev, next, .. } = self.slots[line.index()];
        match prev {
            Some(p) => self.slots[p.index()].next = next,
            None => self.first = next.expect("unlinking the only line"),
        }
        match next {
            Some(n) => self.slots[n.index()].prev = prev,
            None => self.last = prev.expect("unlinking the only line"),
        }
        let slot = &mut self.slots[line.index()];
        slot.prev = None;
        slot.next = None;
        slot.data.clear();
        self.lines_n -= 1;
    }

    pub fn add_bytes(&mut self, n: usize) {
        self.bytes_n += n;
    }

    pub fn sub_bytes(&mut self, n: usize) {
        debug_assert!(self.bytes_n >= n);
        self.bytes_n -= n;
    }

    /// 1-based line number of `id` (a linear walk; used by assertions and
    /// tests, not by editing paths).
    pub fn line_num(&self, id: LineId) -> usize {
        let mut n = 1;
        let mut cur = self.first;
        while cur != id {
            cur = self.next(cur).expect("line id not linked in this text");
            n += 1;
        }
        n
    }

    /// Iterate linked line ids front to back.
    pub fn iter_ids(&self) -> LineIds<'_> {
        LineIds {
            text: self,
            cur: Some(self.first),
        }
    }

    /// Full contents with `\n` between lines (no trailing newline beyond
    /// what an empty last line implies).
    pub fn contents(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes_n + self.lines_n);
        let mut cur = Some(self.first);
        while let Some(id) = cur {
            out.extend_from_slice(self.line(id));
            cur = self.next(id);
            if cur.is_some() {
                out.push(b'\n');
            }
        }
        out
    }

    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) {
        let mut n = 0;
        let mut bytes = 0;
        let mut cur = Some(self.first);
        let mut prev: Option<LineId> = None;
        while let Some(id) = cur {
            assert_eq!(self.prev(id), prev);
            n += 1;
            bytes += self.line(id).len();
            prev = Some(id);
            cur = self.next(id);
        }
        assert_eq!(prev, Some(self.last));
        assert_eq!(n, self.lines_n, "lines_n out of sync");
        assert_eq!(bytes, self.bytes_n, "bytes_n out of sync");
    }
}

impl Default for BufferText {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LineIds<'a> {
    text: &'a BufferText,
    cur: Option<LineId>,
}

impl<'a> Iterator for LineIds<'a> {
    type Item = LineId;

    fn next(&mut self) -> Option<LineId> {
        let id = self.cur?;
        self.cur = self.text.next(id);
        Some(id)
    }
}
