//! The visual window manager: labels every leaf with a short name, shows
//! split hints on the active view, and resizes/splits/kills on single keys.

use super::Overlay;
use crate::editor::Editor;
use core_events::{KeyCode, KeyEvent};
use core_model::NodeId;
use core_render::{Attrs, Cell, Color, Rect};

const VIEW_NAMES: &str = "1234567890abcdefgijlmnpqrstuwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub struct ViewOpMode;

impl ViewOpMode {
    pub fn new(ed: &mut Editor) -> ViewOpMode {
        ed.set_status("view operations mode");
        ViewOpMode
    }

    fn select_name(&self, ed: &Editor, ch: char) -> Option<NodeId> {
        let leaves = ed.tree.leaves();
        for (leaf, name) in leaves.into_iter().zip(VIEW_NAMES.chars()) {
            if name == ch {
                return Some(leaf);
            }
        }
        None
    }

    pub fn draw(&mut self, ed: &mut Editor) {
        // mode banner on the bottom line
        let h = ed.uibuf.height();
        let r = Rect::new(0, h as isize - 1, ed.uibuf.width(), 1);
        ed.uibuf.fill(r, Cell::blank());
        ed.uibuf.draw_label(
            r,
            Color::Yellow,
            Color::Default,
            Attrs::empty(),
            b"view operations mode",
        );

        // name every leaf view in its top-left corner
        let leaves = ed.tree.leaves();
        for (leaf, name) in leaves.iter().zip(VIEW_NAMES.chars()) {
            let bg = if *leaf == ed.active {
                Color::Red
            } else {
                Color::Blue
            };
            let mut r = ed.tree.rect(*leaf);
            r.width = r.width.min(3);
            r.height = r.height.min(1);
            ed.uibuf.fill(r, Cell::new(' ', Color::Default, bg));
            ed.uibuf.set(
                (r.x + 1) as usize,
                r.y as usize,
                Cell::with_attrs(name, Color::White, bg, Attrs::BOLD),
            );
        }

        // splitter hints on the active view
        let r = ed.tree.rect(ed.active);
        let mut hr = r;
        hr.x += (r.width as isize - 1) / 2;
        hr.width = 1;
        hr.height = hr.height.min(3);
        ed.uibuf.fill(hr, Cell::new('│', Color::White, Color::Red));
        ed.uibuf.set(
            hr.x as usize,
            (hr.y + 1) as usize,
            Cell::with_attrs('h', Color::White, Color::Red, Attrs::BOLD),
        );

        let mut vr = r;
        vr.y += (r.height as isize - 1) / 2;
        vr.height = 1;
        vr.width = vr.width.min(5);
        ed.uibuf.fill(vr, Cell::new('─', Color::White, Color::Red));
        ed.uibuf.set(
            (vr.x + 2) as usize,
            vr.y as usize,
            Cell::with_attrs('v', Color::White, Color::Red, Attrs::BOLD),
        );
    }

    pub fn on_key(self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if let Some(ch) = ev.plain_char() {
            if let Some(leaf) = self.select_name(ed, ch) {
                ed.activate_leaf(leaf);
                return Some(Overlay::ViewOp(self));
            }
            match ch {
                'h' => {
                    ed.split_horizontally();
                    return Some(Overlay::ViewOp(self));
                }
                'v' => {
                    ed.split_vertically();
                    return Some(Overlay::ViewOp(self));
                }
                'k' => {
                    ed.kill_active_view();
                    return Some(Overlay::ViewOp(self));
                }
                _ => {}
            }
        }

        let resize = |ed: &mut Editor, vertical: bool, n: isize| {
            let node = if vertical {
                ed.tree.nearest_vsplit(ed.active)
            } else {
                ed.tree.nearest_hsplit(ed.active)
            };
            if let Some(node) = node {
                ed.tree.step_resize(node, n);
            }
        };

        if ev.is_ctrl('n') || ev.code == KeyCode::Down && ev.mods.is_empty() {
            resize(ed, true, 1);
            return Some(Overlay::ViewOp(self));
        }
        if ev.is_ctrl('p') || ev.code == KeyCode::Up && ev.mods.is_empty() {
            resize(ed, true, -1);
            return Some(Overlay::ViewOp(self));
        }
        if ev.is_ctrl('f') || ev.code == KeyCode::Right && ev.mods.is_empty() {
            resize(ed, false, 1);
            return Some(Overlay::ViewOp(self));
        }
        if ev.is_ctrl('b') || ev.code == KeyCode::Left && ev.mods.is_empty() {
            resize(ed, false, -1);
            return Some(Overlay::ViewOp(self));
        }

        // any other key leaves the mode
        None
    }
}
