//! Autocompletion providers: local buffer words, buffer names, filesystem
//! paths.
//!
//! A provider returns `(proposals, chars_back)` where `chars_back` counts
//! the characters before the cursor that a committed proposal replaces.

use core_render::{AcProposal, AcProvider, View};
use core_state::SharedBuffer;
use std::collections::BTreeSet;
use std::path::MAIN_SEPARATOR;
use std::rc::Rc;

fn to_lower_bytes(data: &[u8]) -> Vec<u8> {
    data.to_ascii_lowercase()
}

fn rune_count(data: &[u8]) -> usize {
    let mut n = 0;
    let mut rest = data;
    while !rest.is_empty() {
        let (_, rlen) = core_text::decode_rune(rest);
        rest = &rest[rlen.max(1)..];
        n += 1;
    }
    n
}

/// Words of the current buffer (nearest first) plus the sorted word caches
/// of every other buffer. Case-sensitive matches first; a case-insensitive
/// pass only when the first finds nothing.
pub struct LocalAc;

impl LocalAc {
    fn collect(
        view: &View,
        prefix: &[u8],
        others: &[SharedBuffer],
        ignorecase: bool,
    ) -> Vec<AcProposal> {
        let lprefix = if ignorecase {
            to_lower_bytes(prefix)
        } else {
            prefix.to_vec()
        };
        let mut dups: BTreeSet<Vec<u8>> = BTreeSet::new();
        if !prefix.is_empty() {
            dups.insert(prefix.to_vec());
        }
        let mut proposals: Vec<AcProposal> = Vec::new();

        {
            let b = view.buf().borrow();
            let text = &b.text;
            let c = view.loc.cursor;
            let mut add = |word: &[u8]| {
                let lword = if ignorecase {
                    to_lower_bytes(word)
                } else {
                    word.to_vec()
                };
                if !lword.starts_with(&lprefix) {
                    return;
                }
                if dups.insert(word.to_vec()) {
                    proposals.push(AcProposal::same(word));
                }
            };

            // walk away from the cursor: backward half first, then forward
            for w in core_text::words_backward(&text.line(c.line)[..c.boffset]) {
                add(w);
            }
            let mut line = text.prev(c.line);
            while let Some(id) = line {
                for w in core_text::words_backward(text.line(id)) {
                    add(w);
                }
                line = text.prev(id);
            }
            for w in core_text::words(&text.line(c.line)[c.boffset..]) {
                add(w);
            }
            let mut line = text.next(c.line);
            while let Some(id) = line {
                for w in core_text::words(text.line(id)) {
                    add(w);
                }
                line = text.next(id);
            }
        }

        // other buffers contribute through their sorted word caches
        let mut foreign: BTreeSet<Vec<u8>> = BTreeSet::new();
        for ob in others {
            let mut ob = ob.borrow_mut();
            for word in ob.words_cache() {
                let lword = if ignorecase {
                    to_lower_bytes(word)
                } else {
                    word.clone()
                };
                if !lword.starts_with(&lprefix) {
                    continue;
                }
                if dups.insert(word.clone()) {
                    foreign.insert(word.clone());
                }
            }
        }
        for word in foreign {
            proposals.push(AcProposal::same(word));
        }
        proposals
    }
}

impl AcProvider for LocalAc {
    fn propose(&self, view: &View) -> (Vec<AcProposal>, usize) {
        let prefix = {
            let b = view.buf().borrow();
            view.loc.cursor.word_under_cursor(&b.text).unwrap_or_default()
        };
        let others: Vec<SharedBuffer> = {
            let ctx = view.ctx().borrow();
            ctx.buffers
                .iter()
                .filter(|b| !Rc::ptr_eq(b, view.buf()))
                .cloned()
                .collect()
        };

        let mut proposals = Self::collect(view, &prefix, &others, false);
        if proposals.is_empty() {
            proposals = Self::collect(view, &prefix, &others, true);
        }
        let chars_back = rune_count(&prefix);
        (proposals, chars_back)
    }
}

/// Buffer display names matching the typed prefix; unsynced buffers show a
/// `(**)` marker in the popup but complete to the bare name.
pub struct BufferNameAc;

impl AcProvider for BufferNameAc {
    fn propose(&self, view: &View) -> (Vec<AcProposal>, usize) {
        let (prefix, coffset) = {
            let b = view.buf().borrow();
            let contents = b.contents();
            (
                contents[..view.loc.cursor.boffset].to_vec(),
                view.loc.cursor_coffset,
            )
        };
        let mut proposals = Vec::new();
        let ctx = view.ctx().borrow();
        for buf in &ctx.buffers {
            let buf = buf.borrow();
            if !buf.name.as_bytes().starts_with(&prefix) {
                continue;
            }
            let mut display = buf.name.clone().into_bytes();
            let content = display.clone();
            if !buf.synced_with_disk() {
                display.extend_from_slice(b" (**)");
            }
            proposals.push(AcProposal { display, content });
        }
        (proposals, coffset)
    }
}

fn substitute_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{}{}", home, rest);
        }
    }
    path.to_string()
}

fn is_file_hidden(name: &str) -> bool {
    name == "." || name == ".." || name.starts_with('.')
}

/// Directory listing completion: directories first, alphabetical within
/// each group, dot files hidden, case-insensitive fallback.
pub struct FilesystemAc;

impl AcProvider for FilesystemAc {
    fn propose(&self, view: &View) -> (Vec<AcProposal>, usize) {
        let (input, coffset) = {
            let b = view.buf().borrow();
            let contents = b.contents();
            (
                String::from_utf8_lossy(&contents[..view.loc.cursor.boffset]).into_owned(),
                view.loc.cursor_coffset,
            )
        };
        let path = substitute_home(&input);
        let (dir, base) = match path.rfind(MAIN_SEPARATOR) {
            Some(i) => (path[..=i].to_string(), path[i + 1..].to_string()),
            None => (String::new(), path.clone()),
        };
        let read_at = if dir.is_empty() { "." } else { dir.as_str() };
        let Ok(rd) = std::fs::read_dir(read_at) else {
            return (Vec::new(), 0);
        };

        let mut entries: Vec<(String, bool)> = rd
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                let is_dir = e.file_type().ok()?.is_dir();
                Some((name, is_dir))
            })
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let match_files = |ignorecase: bool| -> Vec<AcProposal> {
            let want = if ignorecase {
                base.to_lowercase()
            } else {
                base.clone()
            };
            let mut out = Vec::new();
            for (name, is_dir) in &entries {
                if is_file_hidden(name) {
                    continue;
                }
                let probe = if ignorecase {
                    name.to_lowercase()
                } else {
                    name.clone()
                };
                if probe.starts_with(&want) {
                    let suffix = if *is_dir {
                        MAIN_SEPARATOR.to_string()
                    } else {
                        String::new()
                    };
                    out.push(AcProposal::same(format!("{dir}{name}{suffix}").into_bytes()));
                }
            }
            out
        };

        let mut proposals = match_files(false);
        if proposals.is_empty() {
            proposals = match_files(true);
        }
        (proposals, coffset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_render::View;
    use core_state::{Buffer, CursorLocation, EditorContext};
    use std::cell::RefCell;

    fn view_over(content: &[u8], cursor_boffset: usize) -> View {
        let ctx = EditorContext::new();
        let buf = ctx
            .borrow_mut()
            .register_buffer(Buffer::from_bytes(content), "main");
        let mut v = View::new(ctx, buf.clone());
        v.resize(80, 24);
        let mut c = CursorLocation::buffer_start(&buf.borrow().text);
        c.boffset = cursor_boffset;
        v.move_cursor_to(c);
        v
    }

    #[test]
    fn local_ac_prefers_near_words_and_reports_prefix_len() {
        // cursor sits after "fo": words are matched against that prefix
        let v = view_over(b"fo\nfoam forge\nfox", 2);
        let (props, back) = LocalAc.propose(&v);
        assert_eq!(back, 2);
        let words: Vec<&[u8]> = props.iter().map(|p| p.content.as_slice()).collect();
        assert_eq!(
            words,
            vec![b"foam".as_slice(), b"forge".as_slice(), b"fox".as_slice()]
        );
        assert!(!words.contains(&b"fo".as_slice()), "the prefix itself is not proposed");
    }

    #[test]
    fn local_ac_collects_other_buffers_sorted() {
        let ctx = EditorContext::new();
        let buf = ctx
            .borrow_mut()
            .register_buffer(Buffer::from_bytes(b"pre"), "main");
        ctx.borrow_mut()
            .register_buffer(Buffer::from_bytes(b"prezzo prefab"), "other");
        let mut v = View::new(ctx, buf.clone());
        v.resize(80, 24);
        let mut c = CursorLocation::buffer_start(&buf.borrow().text);
        c.boffset = 3;
        v.move_cursor_to(c);

        let (props, back) = LocalAc.propose(&v);
        assert_eq!(back, 3);
        let words: Vec<&[u8]> = props.iter().map(|p| p.content.as_slice()).collect();
        // foreign words arrive in sorted cache order
        assert_eq!(words, vec![b"prefab".as_slice(), b"prezzo".as_slice()]);
    }

    #[test]
    fn local_ac_falls_back_to_ignorecase() {
        let v = view_over(b"FO\nfoam", 2);
        let (props, _) = LocalAc.propose(&v);
        let words: Vec<&[u8]> = props.iter().map(|p| p.content.as_slice()).collect();
        assert_eq!(words, vec![b"foam".as_slice()]);
    }

    #[test]
    fn buffer_name_ac_marks_unsynced() {
        let ctx = EditorContext::new();
        let prompt = Rc::new(RefCell::new(Buffer::from_bytes(b"ma")));
        ctx.borrow_mut()
            .register_buffer(Buffer::from_bytes(b"x"), "main");
        let dirty = ctx
            .borrow_mut()
            .register_buffer(Buffer::from_bytes(b"y"), "marks");
        {
            let mut d = dirty.borrow_mut();
            let c = CursorLocation::buffer_start(&d.text);
            d.history.maybe_next_action_group(c);
        }
        let mut v = View::new(ctx, prompt.clone());
        v.oneline = true;
        v.resize(40, 1);
        let mut c = CursorLocation::buffer_start(&prompt.borrow().text);
        c.boffset = 2;
        v.move_cursor_to(c);

        let (props, back) = BufferNameAc.propose(&v);
        assert_eq!(back, 2);
        assert_eq!(props.len(), 2);
        let marks = props.iter().find(|p| p.content == b"marks").unwrap();
        assert_eq!(marks.display, b"marks (**)");
        let main = props.iter().find(|p| p.content == b"main").unwrap();
        assert_eq!(main.display, b"main");
    }

    #[test]
    fn filesystem_ac_lists_dirs_first_and_hides_dotfiles() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("aaa.txt"), b"x").unwrap();
        std::fs::write(tmp.path().join(".hidden"), b"x").unwrap();

        let input = format!("{}/", tmp.path().display());
        let ctx = EditorContext::new();
        let prompt = Rc::new(RefCell::new(Buffer::from_bytes(input.as_bytes())));
        let mut v = View::new(ctx, prompt.clone());
        v.oneline = true;
        v.resize(120, 1);
        let mut c = CursorLocation::buffer_start(&prompt.borrow().text);
        c.boffset = input.len();
        v.move_cursor_to(c);

        let (props, _) = FilesystemAc.propose(&v);
        let names: Vec<String> = props
            .iter()
            .map(|p| String::from_utf8_lossy(&p.content).into_owned())
            .collect();
        assert_eq!(names.len(), 2, "dot file hidden: {names:?}");
        assert!(names[0].ends_with("sub/"), "directories first: {names:?}");
        assert!(names[1].ends_with("aaa.txt"));
    }
}
