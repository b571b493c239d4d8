//! The buffer: line text, undo history, mark, saved view location, word
//! cache, and its identity on disk.

use crate::action::{Action, ActionKind};
use crate::cursor::{CursorLocation, ViewLocation};
use crate::history::History;
use crate::text::BufferText;
use anyhow::{Context as _, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct Buffer {
    pub text: BufferText,
    pub history: History,
    /// The other endpoint of the region, when set.
    pub mark: Option<CursorLocation>,
    /// View location preserved across detach/attach so reopening restores
    /// the position.
    pub loc: ViewLocation,
    /// Absolute path; `None` means no on-disk representation yet.
    pub path: Option<PathBuf>,
    /// Display name, unique among open buffers (uniqueness is maintained by
    /// the editor context when buffers are registered or renamed).
    pub name: String,
    words_cache: BTreeSet<Vec<u8>>,
    words_cache_valid: bool,
}

impl Buffer {
    pub fn new_empty() -> Buffer {
        let text = BufferText::new();
        let loc = ViewLocation::at_start(&text);
        Buffer {
            text,
            history: History::new(),
            mark: None,
            loc,
            path: None,
            name: String::new(),
            words_cache: BTreeSet::new(),
            words_cache_valid: false,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Buffer {
        let mut b = Buffer::new_empty();
        b.text = BufferText::from_bytes(data);
        b.loc = ViewLocation::at_start(&b.text);
        b
    }

    /// Load from disk. The caller decides what a missing file means (the
    /// editor treats it as a new empty buffer).
    pub fn from_file(path: &Path) -> Result<Buffer> {
        let data =
            fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        debug!(target: "io", file = %path.display(), size_bytes = data.len(), "buffer loaded");
        let mut b = Buffer::from_bytes(&data);
        b.path = Some(path.to_path_buf());
        Ok(b)
    }

    pub fn is_mark_set(&self) -> bool {
        self.mark.is_some()
    }

    /// Apply `a` in the given direction: mutate the text, keep the mark
    /// valid, and invalidate the word cache. View-side reactions (top-line
    /// and cursor adjustment, dirty flags) happen in the view layer.
    pub fn run_action(&mut self, a: &Action, revert: bool) {
        if revert {
            a.revert(&mut self.text);
        } else {
            a.apply(&mut self.text);
        }
        let effective = if revert {
            match a.kind {
                ActionKind::Insert => ActionKind::Delete,
                ActionKind::Delete => ActionKind::Insert,
            }
        } else {
            a.kind
        };
        if let Some(mark) = self.mark.as_mut() {
            match effective {
                ActionKind::Insert => mark.on_insert_adjust(a),
                ActionKind::Delete => mark.on_delete_adjust(a),
            }
        }
        // any change to the buffer invalidates the words cache
        self.words_cache_valid = false;
    }

    pub fn synced_with_disk(&self) -> bool {
        self.history.synced()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.text.contents()
    }

    pub fn save(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .expect("save without a path goes through save_as");
        self.save_as(&path)
    }

    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        fs::write(path, self.contents())
            .with_context(|| format!("writing {}", path.display()))?;
        self.history.mark_saved();
        debug!(target: "io", file = %path.display(), bytes = self.text.bytes_n(), "buffer saved");
        Ok(())
    }

    /// The sorted word set of this buffer, rebuilt lazily after edits.
    pub fn words_cache(&mut self) -> &BTreeSet<Vec<u8>> {
        if !self.words_cache_valid {
            self.words_cache.clear();
            let ids: Vec<_> = self.text.iter_ids().collect();
            for id in ids {
                for w in core_text::words(self.text.line(id)) {
                    self.words_cache.insert(w.to_vec());
                }
            }
            self.words_cache_valid = true;
        }
        &self.words_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_has_one_line() {
        let b = Buffer::new_empty();
        assert_eq!(b.text.lines_n(), 1);
        assert!(b.synced_with_disk());
        assert!(!b.is_mark_set());
    }

    #[test]
    fn mark_follows_inserts() {
        let mut b = Buffer::from_bytes(b"hello");
        let mut mark = CursorLocation::buffer_start(&b.text);
        mark.boffset = 4;
        b.mark = Some(mark);
        let c = CursorLocation::buffer_start(&b.text);
        let a = Action::insert(&mut b.text, c, b"xx".to_vec());
        b.run_action(&a, false);
        assert_eq!(b.mark.unwrap().boffset, 6);
        b.run_action(&a, true);
        assert_eq!(b.mark.unwrap().boffset, 4);
    }

    #[test]
    fn words_cache_sorted_and_invalidated() {
        let mut b = Buffer::from_bytes(b"beta alpha\nbeta gamma");
        let words: Vec<Vec<u8>> = b.words_cache().iter().cloned().collect();
        assert_eq!(words, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);

        let c = CursorLocation::buffer_end(&b.text);
        let a = Action::insert(&mut b.text, c, b" delta".to_vec());
        b.run_action(&a, false);
        assert!(b.words_cache().contains(&b"delta".to_vec()));
    }

    #[test]
    fn save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("f.txt");
        let mut b = Buffer::from_bytes(b"one\ntwo\n");
        b.path = Some(p.clone());
        b.history.maybe_next_action_group(CursorLocation::buffer_start(&b.text));
        assert!(!b.synced_with_disk());
        b.save().unwrap();
        assert!(b.synced_with_disk());
        assert_eq!(fs::read(&p).unwrap(), b"one\ntwo\n");

        let re = Buffer::from_file(&p).unwrap();
        assert_eq!(re.contents(), b"one\ntwo\n");
        assert_eq!(re.text.lines_n(), 3);
    }
}
