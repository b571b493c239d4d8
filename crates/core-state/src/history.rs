//! Undo history: action groups on an append-only vector with a cursor index.
//!
//! Conceptually a doubly linked chain of groups with a permanent sentinel
//! anchoring the past; concretely `groups: Vec<ActionGroup>` with
//! `groups[0]` as the sentinel and `current` as the pointer. "`next`" is
//! `current + 1` when in bounds; advancing onto a stale tip truncates the
//! redo branch. The on-disk marker is an index too, so "clean vs dirty"
//! stays a pointer-equality check.
//!
//! Invariants:
//! * `groups` is never empty; the sentinel at index 0 has no actions;
//! * the open (not yet finalized) tip is the group with no successor; its
//!   `after` cursor is `None` and must not be read;
//! * every finalized group between sentinel and tip has actions.

use crate::action::Action;
use crate::cursor::CursorLocation;
use tracing::trace;

#[derive(Debug, Default, Clone)]
pub struct ActionGroup {
    pub actions: Vec<Action>,
    /// Cursor state when the group was opened.
    pub before: Option<CursorLocation>,
    /// Cursor state when the group was finalized; `None` while open.
    pub after: Option<CursorLocation>,
}

impl ActionGroup {
    /// Append an action, merging with the group's last action when the merge
    /// rule allows.
    pub fn append(&mut self, a: Action) {
        if let Some(last) = self.actions.last_mut() {
            if last.try_merge(&a) {
                return;
            }
        }
        self.actions.push(a);
    }

    pub fn last_action(&self) -> Option<&Action> {
        self.actions.last()
    }
}

#[derive(Debug)]
pub struct History {
    groups: Vec<ActionGroup>,
    current: usize,
    on_disk: usize,
}

impl History {
    pub fn new() -> Self {
        // The sentinel sits at index 0 with an open first group after it, so
        // `current` always points at a sentinel-or-non-empty group.
        Self {
            groups: vec![ActionGroup::default(), ActionGroup::default()],
            current: 0,
            on_disk: 0,
        }
    }

    pub fn at_sentinel(&self) -> bool {
        self.current == 0
    }

    fn has_next(&self) -> bool {
        self.current + 1 < self.groups.len()
    }

    pub fn current(&self) -> &ActionGroup {
        &self.groups[self.current]
    }

    pub fn current_mut(&mut self) -> &mut ActionGroup {
        &mut self.groups[self.current]
    }

    /// Called at the start of every edit: if a finalized tip lies ahead,
    /// step onto it and reset it as the new open group, discarding any redo
    /// branch beyond it.
    pub fn maybe_next_action_group(&mut self, cursor: CursorLocation) {
        if !self.has_next() {
            return;
        }
        self.current += 1;
        self.groups.truncate(self.current + 1);
        let g = &mut self.groups[self.current];
        g.actions.clear();
        g.before = Some(cursor);
        g.after = None;
        trace!(target: "state.history", current = self.current, "action group opened");
    }

    /// Close the open tip: allocate the next (empty) group and record the
    /// `after` cursor. No-op when the tip is already closed.
    pub fn finalize_action_group(&mut self, cursor: CursorLocation) {
        if self.has_next() {
            return;
        }
        self.groups[self.current].after = Some(cursor);
        self.groups.push(ActionGroup::default());
        trace!(target: "state.history", current = self.current, "action group finalized");
    }

    /// Append an action to the current group (merge-on-append).
    pub fn append(&mut self, a: Action) {
        self.groups[self.current].append(a);
    }

    /// Step back one group. Caller reverts the group's actions first; the
    /// call itself only moves the pointer.
    pub fn retreat(&mut self) {
        debug_assert!(self.current > 0, "retreating past the sentinel");
        self.current -= 1;
    }

    /// Whether redo has anywhere to go: a finalized, non-empty next group.
    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.groups.len() && !self.groups[self.current + 1].actions.is_empty()
    }

    /// Step forward one group and return it for re-application.
    pub fn advance(&mut self) -> &ActionGroup {
        debug_assert!(self.can_redo());
        self.current += 1;
        &self.groups[self.current]
    }

    /// Record the current group as the on-disk state.
    pub fn mark_saved(&mut self) {
        self.on_disk = self.current;
    }

    /// Pointer-equality check against the on-disk marker.
    pub fn synced(&self) -> bool {
        self.on_disk == self.current
    }

    pub fn depth(&self) -> usize {
        self.current
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionKind};
    use crate::text::BufferText;

    fn dummy_insert(t: &mut BufferText, data: &[u8]) -> Action {
        let c = CursorLocation::buffer_start(t);
        Action {
            kind: ActionKind::Insert,
            data: data.to_vec(),
            cursor: c,
            lines: Vec::new(),
        }
    }

    #[test]
    fn starts_at_sentinel_and_synced() {
        let h = History::new();
        assert!(h.at_sentinel());
        assert!(h.synced());
        assert_eq!(h.depth(), 0);
        assert!(h.current().actions.is_empty());
        assert!(!h.can_redo());
    }

    #[test]
    fn edit_then_finalize_then_undo_pointer_walk() {
        let mut t = BufferText::new();
        let mut h = History::new();
        let c = CursorLocation::buffer_start(&t);

        h.maybe_next_action_group(c);
        assert!(!h.at_sentinel());
        let a = dummy_insert(&mut t, b"x");
        h.append(a);
        assert!(!h.synced(), "edits move away from on_disk");

        h.finalize_action_group(c);
        assert_eq!(h.current().actions.len(), 1);
        assert!(h.current().after.is_some(), "finalize closed the group");
        assert!(!h.can_redo(), "the fresh successor group is empty");

        h.retreat();
        assert!(h.at_sentinel());
        assert!(h.can_redo());
        let g = h.advance();
        assert_eq!(g.actions.len(), 1);
    }

    #[test]
    fn maybe_next_truncates_redo_branch() {
        let mut t = BufferText::new();
        let mut h = History::new();
        let c = CursorLocation::buffer_start(&t);

        h.maybe_next_action_group(c);
        h.append(dummy_insert(&mut t, b"a"));
        h.finalize_action_group(c);
        h.retreat(); // undo to sentinel; redo available

        assert!(h.can_redo());
        h.maybe_next_action_group(c); // new edit steals the tip
        assert!(!h.can_redo(), "redo branch discarded");
        assert!(h.current().actions.is_empty());
        assert_eq!(h.current().before, Some(c));
    }

    #[test]
    fn redo_refuses_open_or_empty_tip() {
        let mut h = History::new();
        let t = BufferText::new();
        let c = CursorLocation::buffer_start(&t);
        assert!(!h.can_redo(), "open tip has no actions");
        h.finalize_action_group(c);
        assert!(!h.can_redo(), "finalized-but-empty next group");
    }

    #[test]
    fn saved_marker_is_index_equality() {
        let mut t = BufferText::new();
        let mut h = History::new();
        let c = CursorLocation::buffer_start(&t);
        h.maybe_next_action_group(c);
        h.append(dummy_insert(&mut t, b"a"));
        // save in the middle of an open group: synced flips on immediately
        h.mark_saved();
        assert!(h.synced());
        h.finalize_action_group(c);
        h.maybe_next_action_group(c);
        h.append(dummy_insert(&mut t, b"b"));
        assert!(!h.synced());
        h.retreat();
        assert!(h.synced(), "undo back to the saved group");
    }
}
