//! Shared editor context.
//!
//! The kill buffer, the open-buffer list and the status line are mutated by
//! views and overlays alike. Instead of module-level globals they live in one
//! `EditorContext` behind `Rc<RefCell<_>>`, handed to every view at
//! construction. Mutation is single-threaded; borrows are scoped to single
//! operations.

use crate::buffer::Buffer;
use crate::SharedBuffer;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

pub type SharedContext = Rc<RefCell<EditorContext>>;

#[derive(Default)]
pub struct EditorContext {
    status: String,
    /// Editor-wide clipboard for kill/copy/yank.
    pub kill_buffer: Vec<u8>,
    pub buffers: Vec<SharedBuffer>,
}

impl EditorContext {
    pub fn new() -> SharedContext {
        Rc::new(RefCell::new(EditorContext::default()))
    }

    pub fn set_status(&mut self, s: impl Into<String>) {
        self.status = s.into();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn find_buffer_by_full_path(&self, path: &Path) -> Option<SharedBuffer> {
        self.buffers
            .iter()
            .find(|b| b.borrow().path.as_deref() == Some(path))
            .cloned()
    }

    fn buffer_name_exists(&self, name: &str) -> bool {
        self.buffers.iter().any(|b| b.borrow().name == name)
    }

    /// Derive a display name unique among open buffers: `name`, then
    /// `name <2>`, `name <3>`, …
    pub fn unique_buffer_name(&self, name: &str) -> String {
        if !self.buffer_name_exists(name) {
            return name.to_string();
        }
        for i in 2..9999 {
            let candidate = format!("{name} <{i}>");
            if !self.buffer_name_exists(&candidate) {
                return candidate;
            }
        }
        panic!("too many buffers opened with the same name");
    }

    /// Register a buffer under a unique display name and return the handle.
    pub fn register_buffer(&mut self, mut buffer: Buffer, want_name: &str) -> SharedBuffer {
        buffer.name = self.unique_buffer_name(want_name);
        let shared = Rc::new(RefCell::new(buffer));
        self.buffers.push(shared.clone());
        shared
    }

    pub fn remove_buffer(&mut self, buf: &SharedBuffer) {
        self.buffers.retain(|b| !Rc::ptr_eq(b, buf));
    }

    pub fn has_unsaved_buffers(&self) -> bool {
        self.buffers.iter().any(|b| !b.borrow().synced_with_disk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_uniqued() {
        let ctx = EditorContext::new();
        let mut c = ctx.borrow_mut();
        c.register_buffer(Buffer::new_empty(), "unnamed");
        c.register_buffer(Buffer::new_empty(), "unnamed");
        let third = c.register_buffer(Buffer::new_empty(), "unnamed");
        assert_eq!(third.borrow().name, "unnamed <3>");
    }

    #[test]
    fn lookup_by_path() {
        let ctx = EditorContext::new();
        let mut c = ctx.borrow_mut();
        let mut b = Buffer::new_empty();
        b.path = Some("/tmp/x".into());
        let shared = c.register_buffer(b, "x");
        let found = c.find_buffer_by_full_path(Path::new("/tmp/x")).unwrap();
        assert!(Rc::ptr_eq(&shared, &found));
        assert!(c.find_buffer_by_full_path(Path::new("/tmp/y")).is_none());
    }

    #[test]
    fn unsaved_detection() {
        let ctx = EditorContext::new();
        let mut c = ctx.borrow_mut();
        let b = c.register_buffer(Buffer::new_empty(), "a");
        assert!(!c.has_unsaved_buffers());
        let cur = crate::CursorLocation::buffer_start(&b.borrow().text);
        b.borrow_mut().history.maybe_next_action_group(cur);
        assert!(c.has_unsaved_buffers());
    }
}
