//! The window tree: a binary tree of horizontal/vertical splits whose
//! leaves carry views.
//!
//! Nodes live in an arena addressed by [`NodeId`] handles with parent
//! links, so "overwrite the parent with the sibling subtree" — the kill
//! operation — is a slot move plus parent rethreading, with no external
//! node identity invalidated.
//!
//! Exactly one of the three shapes is valid per node: a leaf (carrying a
//! view), a horizontal split (left/right), or a vertical split
//! (top/bottom). A horizontal split reserves one column for the splitter
//! glyph; a vertical split does not — the top view's status bar doubles as
//! the separator.

use core_render::{Rect, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

pub enum NodeKind {
    Leaf(View),
    /// left | right
    HSplit { left: NodeId, right: NodeId },
    /// top / bottom
    VSplit { top: NodeId, bottom: NodeId },
    /// Recycled slot.
    Free,
}

pub struct Node {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    /// Normalized split ratio in [0, 1]; meaningless for leaves.
    pub split: f32,
    /// Last rectangle handed to `resize`.
    pub rect: Rect,
}

pub struct ViewTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl ViewTree {
    pub fn new(view: View) -> (ViewTree, NodeId) {
        let mut t = ViewTree {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
        };
        let root = t.alloc(Node {
            parent: None,
            kind: NodeKind::Leaf(view),
            split: 0.0,
            rect: Rect::default(),
        });
        t.root = root;
        (t, root)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.index()].kind = NodeKind::Free;
        self.free.push(id);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].kind, NodeKind::Leaf(_))
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.nodes[id.index()].rect
    }

    pub fn view(&self, id: NodeId) -> &View {
        match &self.nodes[id.index()].kind {
            NodeKind::Leaf(v) => v,
            _ => panic!("node is not a leaf"),
        }
    }

    pub fn view_mut(&mut self, id: NodeId) -> &mut View {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Leaf(v) => v,
            _ => panic!("node is not a leaf"),
        }
    }

    /// Replace the leaf at `id` with a vertical split: the existing view in
    /// the top child, `bottom_view` in the bottom one. Returns (top,
    /// bottom); the caller usually makes the top child active.
    pub fn split_vertically(&mut self, id: NodeId, bottom_view: View) -> (NodeId, NodeId) {
        let old = match std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Free) {
            NodeKind::Leaf(v) => v,
            _ => panic!("splitting a non-leaf node"),
        };
        let top = self.alloc(Node {
            parent: Some(id),
            kind: NodeKind::Leaf(old),
            split: 0.0,
            rect: Rect::default(),
        });
        let bottom = self.alloc(Node {
            parent: Some(id),
            kind: NodeKind::Leaf(bottom_view),
            split: 0.0,
            rect: Rect::default(),
        });
        let n = &mut self.nodes[id.index()];
        n.kind = NodeKind::VSplit { top, bottom };
        n.split = 0.5;
        (top, bottom)
    }

    /// Replace the leaf at `id` with a horizontal split: the existing view
    /// in the left child, `right_view` in the right one. Returns (left,
    /// right).
    pub fn split_horizontally(&mut self, id: NodeId, right_view: View) -> (NodeId, NodeId) {
        let old = match std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Free) {
            NodeKind::Leaf(v) => v,
            _ => panic!("splitting a non-leaf node"),
        };
        let left = self.alloc(Node {
            parent: Some(id),
            kind: NodeKind::Leaf(old),
            split: 0.0,
            rect: Rect::default(),
        });
        let right = self.alloc(Node {
            parent: Some(id),
            kind: NodeKind::Leaf(right_view),
            split: 0.0,
            rect: Rect::default(),
        });
        let n = &mut self.nodes[id.index()];
        n.kind = NodeKind::HSplit { left, right };
        n.split = 0.5;
        (left, right)
    }

    /// Distribute `rect` over the subtree at `id`. A horizontal split
    /// reserves one column for the splitter glyph.
    pub fn resize(&mut self, id: NodeId, rect: Rect) {
        self.nodes[id.index()].rect = rect;
        let split = self.nodes[id.index()].split;
        match self.nodes[id.index()].kind {
            NodeKind::Leaf(_) => {
                self.view_mut(id).resize(rect.width, rect.height);
            }
            NodeKind::HSplit { left, right } => {
                let mut w = rect.width;
                if w > 0 {
                    w -= 1;
                }
                let lw = (w as f32 * split) as usize;
                let rw = w - lw;
                self.resize(left, Rect::new(rect.x, rect.y, lw, rect.height));
                self.resize(
                    right,
                    Rect::new(rect.x + lw as isize + 1, rect.y, rw, rect.height),
                );
            }
            NodeKind::VSplit { top, bottom } => {
                let th = (rect.height as f32 * split) as usize;
                let bh = rect.height - th;
                self.resize(top, Rect::new(rect.x, rect.y, rect.width, th));
                self.resize(
                    bottom,
                    Rect::new(rect.x, rect.y + th as isize, rect.width, bh),
                );
            }
            NodeKind::Free => {}
        }
    }

    /// The ratio of one cell at this split node.
    fn one_step(&self, id: NodeId) -> f32 {
        let n = &self.nodes[id.index()];
        match n.kind {
            NodeKind::VSplit { .. } => {
                if n.rect.height == 0 {
                    0.0
                } else {
                    1.0 / n.rect.height as f32
                }
            }
            NodeKind::HSplit { .. } => {
                if n.rect.width <= 1 {
                    0.0
                } else {
                    1.0 / (n.rect.width - 1) as f32
                }
            }
            _ => 0.0,
        }
    }

    /// Snap the split ratio to an integer cell boundary.
    fn normalize_split(&mut self, id: NodeId) {
        let n = &self.nodes[id.index()];
        let off = match n.kind {
            NodeKind::VSplit { .. } => (n.rect.height as f32 * n.split) as usize,
            _ => ((n.rect.width.saturating_sub(1)) as f32 * n.split) as usize,
        };
        let one = self.one_step(id);
        self.nodes[id.index()].split = off as f32 * one;
    }

    /// Grow or shrink the first child by `n` cells, one-cell granularity
    /// regardless of the float ratio underneath.
    pub fn step_resize(&mut self, id: NodeId, n: isize) {
        let rect = self.nodes[id.index()].rect;
        if rect.width <= 1 || rect.height == 0 {
            // avoid division by zero, the result is really bad
            return;
        }
        let one = self.one_step(id);
        self.normalize_split(id);
        let split = (self.nodes[id.index()].split + one * n as f32 + one * 0.5).clamp(0.0, 1.0);
        self.nodes[id.index()].split = split;
        self.resize(id, rect);
    }

    /// Nearest ancestor that is a vertical split.
    pub fn nearest_vsplit(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.nodes[id.index()].parent;
        while let Some(p) = cur {
            if matches!(self.nodes[p.index()].kind, NodeKind::VSplit { .. }) {
                return Some(p);
            }
            cur = self.nodes[p.index()].parent;
        }
        None
    }

    /// Nearest ancestor that is a horizontal split.
    pub fn nearest_hsplit(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.nodes[id.index()].parent;
        while let Some(p) = cur {
            if matches!(self.nodes[p.index()].kind, NodeKind::HSplit { .. }) {
                return Some(p);
            }
            cur = self.nodes[p.index()].parent;
        }
        None
    }

    /// The other child of this node's parent.
    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let p = self.nodes[id.index()].parent?;
        match self.nodes[p.index()].kind {
            NodeKind::HSplit { left, right } => {
                Some(if id == left { right } else { left })
            }
            NodeKind::VSplit { top, bottom } => {
                Some(if id == top { bottom } else { top })
            }
            _ => unreachable!("parent of a node is always a split"),
        }
    }

    /// Descend left/top until a leaf.
    pub fn first_leaf_node(&self, id: NodeId) -> NodeId {
        match self.nodes[id.index()].kind {
            NodeKind::Leaf(_) => id,
            NodeKind::HSplit { left, .. } => self.first_leaf_node(left),
            NodeKind::VSplit { top, .. } => self.first_leaf_node(top),
            NodeKind::Free => unreachable!("free node reached in traversal"),
        }
    }

    /// Pre-order leaves of the whole tree.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(self.root, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.nodes[id.index()].kind {
            NodeKind::Leaf(_) => out.push(id),
            NodeKind::HSplit { left, right } => {
                self.collect_leaves(left, out);
                self.collect_leaves(right, out);
            }
            NodeKind::VSplit { top, bottom } => {
                self.collect_leaves(top, out);
                self.collect_leaves(bottom, out);
            }
            NodeKind::Free => {}
        }
    }

    /// Kill the leaf at `id`: its parent is overwritten in place by the
    /// sibling subtree and the new active leaf is the first leaf of that
    /// subtree. Returns `None` (and does nothing) for the last remaining
    /// leaf. The killed view is returned so the caller can save its
    /// location.
    pub fn kill_leaf(&mut self, id: NodeId) -> Option<(NodeId, View)> {
        let p = self.nodes[id.index()].parent?;
        let sib = self.sibling(id).expect("split node has two children");

        let view = match std::mem::replace(&mut self.nodes[id.index()].kind, NodeKind::Free) {
            NodeKind::Leaf(v) => v,
            _ => panic!("killing a non-leaf node"),
        };

        // move the sibling's node into the parent slot and rethread
        let sib_node = std::mem::replace(&mut self.nodes[sib.index()].kind, NodeKind::Free);
        let sib_split = self.nodes[sib.index()].split;
        self.nodes[p.index()].kind = sib_node;
        self.nodes[p.index()].split = sib_split;
        match self.nodes[p.index()].kind {
            NodeKind::HSplit { left, right } => {
                self.nodes[left.index()].parent = Some(p);
                self.nodes[right.index()].parent = Some(p);
            }
            NodeKind::VSplit { top, bottom } => {
                self.nodes[top.index()].parent = Some(p);
                self.nodes[bottom.index()].parent = Some(p);
            }
            _ => {}
        }
        self.release(id);
        self.release(sib);

        Some((self.first_leaf_node(p), view))
    }

    /// Keep only the leaf at `id`; every other view is dropped and its node
    /// recycled. The kept leaf becomes the root.
    pub fn keep_only(&mut self, id: NodeId) -> Vec<View> {
        debug_assert!(self.is_leaf(id));
        let mut dropped = Vec::new();
        let ids: Vec<NodeId> = (0..self.nodes.len() as u32).map(NodeId).collect();
        for n in ids {
            if n == id {
                continue;
            }
            match std::mem::replace(&mut self.nodes[n.index()].kind, NodeKind::Free) {
                NodeKind::Leaf(v) => {
                    dropped.push(v);
                    self.free.push(n);
                }
                NodeKind::Free => {}
                _ => self.free.push(n),
            }
        }
        self.nodes[id.index()].parent = None;
        self.root = id;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{Buffer, EditorContext, SharedBuffer};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_view() -> (View, SharedBuffer) {
        let ctx = EditorContext::new();
        let buf: SharedBuffer = Rc::new(RefCell::new(Buffer::from_bytes(b"hello\nworld")));
        (View::new(ctx, buf.clone()), buf)
    }

    fn tree_with_hsplit() -> (ViewTree, NodeId, NodeId, NodeId) {
        let (v, buf) = make_view();
        let (mut t, root) = ViewTree::new(v);
        t.resize(root, Rect::new(0, 0, 80, 24));
        let second = View::new(t.view(root).ctx().clone(), buf);
        let (left, right) = t.split_horizontally(root, second);
        t.resize(root, Rect::new(0, 0, 80, 24));
        (t, root, left, right)
    }

    #[test]
    fn hsplit_reserves_splitter_column() {
        let (t, root, left, right) = tree_with_hsplit();
        let lw = t.rect(left).width;
        let rw = t.rect(right).width;
        assert_eq!(lw + 1 + rw, 80);
        assert!(lw.abs_diff(rw) <= 1);
        assert_eq!(t.rect(right).x, lw as isize + 1);
        assert_eq!(t.rect(root).width, 80);
    }

    #[test]
    fn vsplit_uses_full_height() {
        let (v, buf) = make_view();
        let (mut t, root) = ViewTree::new(v);
        let second = View::new(t.view(root).ctx().clone(), buf);
        let (top, bottom) = t.split_vertically(root, second);
        t.resize(root, Rect::new(0, 0, 80, 24));
        assert_eq!(t.rect(top).height + t.rect(bottom).height, 24);
        assert_eq!(t.rect(bottom).y, t.rect(top).height as isize);
    }

    #[test]
    fn step_resize_moves_one_cell() {
        let (mut t, root, left, right) = tree_with_hsplit();
        let lw = t.rect(left).width;
        t.step_resize(root, 1);
        assert_eq!(t.rect(left).width, lw + 1);
        assert_eq!(t.rect(left).width + 1 + t.rect(right).width, 80);
        t.step_resize(root, -3);
        assert_eq!(t.rect(left).width, lw - 2);
    }

    #[test]
    fn step_resize_clamps() {
        let (mut t, root, left, _right) = tree_with_hsplit();
        t.step_resize(root, -1000);
        assert_eq!(t.rect(left).width, 0);
        t.step_resize(root, 1000);
        assert_eq!(t.rect(left).width, 79);
    }

    #[test]
    fn nearest_split_walks_ancestors() {
        let (mut t, root, left, _right) = tree_with_hsplit();
        let (v, _) = {
            let buf = t.view(left).buf().clone();
            (View::new(t.view(left).ctx().clone(), buf.clone()), buf)
        };
        let (ltop, _lbottom) = t.split_vertically(left, v);
        t.resize(root, Rect::new(0, 0, 80, 24));
        assert_eq!(t.nearest_vsplit(ltop), Some(left));
        assert_eq!(t.nearest_hsplit(ltop), Some(root));
        assert_eq!(t.nearest_vsplit(root), None);
    }

    #[test]
    fn kill_leaf_promotes_sibling() {
        let (mut t, root, left, right) = tree_with_hsplit();
        let (active, _dead) = t.kill_leaf(right).unwrap();
        assert_eq!(active, t.first_leaf_node(root));
        assert!(t.is_leaf(root), "parent overwritten by the leaf sibling");
        assert_eq!(t.leaves(), vec![root]);
        // left/right slots were recycled
        assert!(t.kill_leaf(root).is_none(), "last leaf cannot be killed");
        let _ = left;
    }

    #[test]
    fn kill_leaf_rethreads_grandchildren() {
        // root hsplit, right side vsplit; killing the LEFT leaf moves the
        // vsplit into root and its children must point at root.
        let (mut t, root, left, right) = tree_with_hsplit();
        let second = View::new(t.view(left).ctx().clone(), t.view(left).buf().clone());
        let (rt, rb) = t.split_vertically(right, second);
        t.resize(root, Rect::new(0, 0, 80, 24));

        let (active, _dead) = t.kill_leaf(left).unwrap();
        assert!(matches!(t.node(root).kind, NodeKind::VSplit { .. }));
        assert_eq!(t.node(rt).parent, Some(root));
        assert_eq!(t.node(rb).parent, Some(root));
        assert_eq!(active, rt);
        t.resize(root, Rect::new(0, 0, 80, 24));
        assert_eq!(t.rect(rt).width, 80, "promoted split fills the frame");
    }

    #[test]
    fn keep_only_collapses_tree() {
        let (mut t, root, left, _right) = tree_with_hsplit();
        let keep = t.first_leaf_node(left);
        let dropped = t.keep_only(keep);
        assert_eq!(dropped.len(), 1);
        assert_eq!(t.root(), keep);
        assert_eq!(t.leaves(), vec![keep]);
        assert_eq!(t.node(keep).parent, None);
        let _ = root;
    }

    #[test]
    fn leaves_are_preorder() {
        let (mut t, root, left, right) = tree_with_hsplit();
        let second = View::new(t.view(left).ctx().clone(), t.view(left).buf().clone());
        let (lt, lb) = t.split_vertically(left, second);
        t.resize(root, Rect::new(0, 0, 80, 24));
        assert_eq!(t.leaves(), vec![lt, lb, right]);
    }
}
