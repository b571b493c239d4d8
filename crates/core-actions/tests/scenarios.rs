//! End-to-end scenarios: the editor driven through raw key events, exactly
//! as the event loop would deliver them.

use core_actions::Editor;
use core_config::Config;
use core_events::{Event, KeyCode, KeyEvent};

fn editor_with(content: &[u8]) -> (Editor, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.txt");
    std::fs::write(&path, content).unwrap();
    let mut ed = Editor::new(Config::default(), &[path]);
    ed.resize(80, 24);
    (ed, dir)
}

fn key(ed: &mut Editor, k: KeyEvent) -> bool {
    ed.handle_event(&Event::Key(k))
}

fn type_str(ed: &mut Editor, s: &str) {
    for c in s.chars() {
        key(ed, KeyEvent::ch(c));
    }
}

fn contents(ed: &Editor) -> Vec<u8> {
    ed.active_view().buf().borrow().contents()
}

fn cursor(ed: &Editor) -> (usize, usize) {
    let c = ed.active_view().loc.cursor;
    (c.line_num, c.boffset)
}

#[test]
fn word_merge_single_undo_step() {
    let (mut ed, _dir) = editor_with(b"foo");
    key(&mut ed, KeyEvent::ctrl('e'));
    type_str(&mut ed, "bar");
    assert_eq!(contents(&ed), b"foobar");

    // one open group holding one merged insert action
    {
        let buf = ed.active_view().buf().borrow();
        let g = buf.history.current();
        assert_eq!(g.actions.len(), 1);
        assert_eq!(g.actions[0].data, b"bar");
    }

    key(&mut ed, KeyEvent::ctrl('/'));
    assert_eq!(contents(&ed), b"foo");
    assert_eq!(cursor(&ed), (1, 3));

    // C-x C-/ redoes
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ctrl('/'));
    assert_eq!(contents(&ed), b"foobar");
    assert_eq!(cursor(&ed), (1, 6));
}

#[test]
fn return_splits_without_auto_indent() {
    let (mut ed, _dir) = editor_with(b"hello world");
    for _ in 0..5 {
        key(&mut ed, KeyEvent::ctrl('f'));
    }
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    assert_eq!(contents(&ed), b"hello\n world");
    assert_eq!(cursor(&ed), (2, 0));
}

#[test]
fn ctrl_j_auto_indents() {
    let (mut ed, _dir) = editor_with(b"\t\tcode");
    key(&mut ed, KeyEvent::ctrl('e'));
    key(&mut ed, KeyEvent::ctrl('j'));
    assert_eq!(contents(&ed), b"\t\tcode\n\t\t");
    assert_eq!(cursor(&ed), (2, 2));
}

#[test]
fn isearch_finds_fails_and_wraps() {
    let (mut ed, _dir) = editor_with(b"abc\ndef\nabc");
    key(&mut ed, KeyEvent::ctrl('n')); // to line 2
    assert_eq!(cursor(&ed), (2, 0));

    key(&mut ed, KeyEvent::ctrl('s'));
    type_str(&mut ed, "abc");
    // match on line 3; forward search leaves the cursor past the match
    assert_eq!(cursor(&ed), (3, 3));
    {
        let v = ed.active_view();
        assert_eq!(v.loc.cursor.line_num, 3);
    }

    // same direction again: no further match → failing
    key(&mut ed, KeyEvent::ctrl('s'));
    assert_eq!(cursor(&ed), (3, 3), "failing search does not move");

    // once more: wraps to the top match
    key(&mut ed, KeyEvent::ctrl('s'));
    assert_eq!(cursor(&ed), (1, 3));

    // C-g cancels and restores the view decorations
    key(&mut ed, KeyEvent::ctrl('g'));
    assert!(ed.overlay.is_none());
}

#[test]
fn isearch_remembers_last_word() {
    let (mut ed, _dir) = editor_with(b"one two\ntwo");
    key(&mut ed, KeyEvent::ctrl('s'));
    type_str(&mut ed, "two");
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    assert_eq!(ed.isearch_last_word, b"two");

    // an empty follow-up search recalls the remembered word
    key(&mut ed, KeyEvent::ctrl('a'));
    key(&mut ed, KeyEvent::ctrl('s'));
    key(&mut ed, KeyEvent::ctrl('s'));
    assert_eq!(cursor(&ed).0, 1);
    key(&mut ed, KeyEvent::ctrl('g'));
}

#[test]
fn kill_ring_accumulates_and_yanks() {
    let (mut ed, _dir) = editor_with(b"foo bar baz");
    for _ in 0..3 {
        key(&mut ed, KeyEvent::alt('d'));
    }
    assert_eq!(contents(&ed), b"");
    assert_eq!(ed.ctx.borrow().kill_buffer, b"foo bar baz");

    key(&mut ed, KeyEvent::ctrl('a')); // any movement command
    key(&mut ed, KeyEvent::ctrl('y'));
    assert_eq!(contents(&ed), b"foo bar baz");
}

#[test]
fn kill_line_joins_and_accumulates() {
    let (mut ed, _dir) = editor_with(b"foo\nbar");
    key(&mut ed, KeyEvent::ctrl('k')); // kills "foo"
    key(&mut ed, KeyEvent::ctrl('k')); // kills the newline
    assert_eq!(contents(&ed), b"bar");
    assert_eq!(ed.ctx.borrow().kill_buffer, b"foo\n");
}

#[test]
fn region_kill_copy_yank() {
    let (mut ed, _dir) = editor_with(b"alpha beta");
    // mark at start, cursor after "alpha"
    key(&mut ed, KeyEvent::new(KeyCode::Char(' '), core_events::KeyModifiers::CTRL));
    for _ in 0..5 {
        key(&mut ed, KeyEvent::ctrl('f'));
    }
    key(&mut ed, KeyEvent::ctrl('w'));
    assert_eq!(contents(&ed), b" beta");
    assert_eq!(ed.ctx.borrow().kill_buffer, b"alpha");

    key(&mut ed, KeyEvent::ctrl('e'));
    key(&mut ed, KeyEvent::ctrl('y'));
    assert_eq!(contents(&ed), b" betaalpha");
}

#[test]
fn window_split_switch_and_step_resize() {
    let (mut ed, _dir) = editor_with(b"text");
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('3'));
    assert_eq!(ed.tree.leaves().len(), 2);

    let leaves = ed.tree.leaves();
    let (left, right) = (leaves[0], leaves[1]);
    assert_eq!(ed.active, left);
    let lw = ed.tree.rect(left).width;
    let rw = ed.tree.rect(right).width;
    assert_eq!(lw + 1 + rw, 80);
    assert!(lw.abs_diff(rw) <= 1);

    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('o'));
    assert_eq!(ed.active, right, "C-x o moves to the sibling leaf");

    // view-op mode: arrow-right grows the left side by one cell
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('w'));
    key(&mut ed, KeyEvent::plain(KeyCode::Right));
    assert_eq!(ed.tree.rect(left).width, lw + 1);
    assert_eq!(ed.tree.rect(right).width, rw - 1);
    key(&mut ed, KeyEvent::ctrl('g'));

    // kill the active view; the sibling takes the full width
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('0'));
    assert_eq!(ed.tree.leaves().len(), 1);
    assert_eq!(ed.tree.rect(ed.active).width, 80);
}

#[test]
fn edits_in_one_split_adjust_the_other() {
    let (mut ed, _dir) = editor_with(b"one\ntwo\nthree");
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('2')); // vertical split, same buffer
    let leaves = ed.tree.leaves();
    let other = leaves[1];

    // park the other view's cursor on line 3
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('o'));
    key(&mut ed, KeyEvent::ctrl('n'));
    key(&mut ed, KeyEvent::ctrl('n'));
    assert_eq!(cursor(&ed), (3, 0));
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('o')); // back to the first view

    // insert a line at the top through the first view
    key(&mut ed, KeyEvent::alt('<'));
    type_str(&mut ed, "zero");
    key(&mut ed, KeyEvent::ctrl('j'));
    assert_eq!(contents(&ed), b"zero\none\ntwo\nthree");
    assert_eq!(
        ed.tree.view(other).loc.cursor.line_num,
        4,
        "sibling view cursor pushed down"
    );
}

#[test]
fn quit_is_confirmed_when_buffers_are_dirty() {
    let (mut ed, _dir) = editor_with(b"x");
    type_str(&mut ed, "y");
    key(&mut ed, KeyEvent::ctrl('x'));
    let alive = key(&mut ed, KeyEvent::ctrl('c'));
    assert!(alive, "dirty buffer requires confirmation");
    assert!(ed.overlay.is_some());
    let alive = key(&mut ed, KeyEvent::ch('n'));
    assert!(alive);
    assert!(!ed.quit);

    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ctrl('c'));
    let alive = key(&mut ed, KeyEvent::ch('y'));
    assert!(!alive, "confirmed quit stops the loop");
}

#[test]
fn clean_quit_needs_no_confirmation() {
    let (mut ed, _dir) = editor_with(b"x");
    key(&mut ed, KeyEvent::ctrl('x'));
    let alive = key(&mut ed, KeyEvent::ctrl('c'));
    assert!(!alive);
}

#[test]
fn save_runs_presave_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.txt");
    std::fs::write(&path, b"keep").unwrap();
    let mut ed = Editor::new(Config::default(), &[path.clone()]);
    ed.resize(80, 24);

    key(&mut ed, KeyEvent::ctrl('e'));
    type_str(&mut ed, "  ");
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ctrl('s'));
    assert_eq!(std::fs::read(&path).unwrap(), b"keep\n");
    assert!(ed.active_view().buf().borrow().synced_with_disk());
}

#[test]
fn macro_record_and_replay() {
    let (mut ed, _dir) = editor_with(b"");
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('('));
    assert!(ed.recording);
    type_str(&mut ed, "ab");
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch(')'));
    assert!(!ed.recording);
    assert_eq!(ed.keymacros.len(), 2, "the stopping C-x ) pair is trimmed");
    assert_eq!(contents(&ed), b"ab");

    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('e'));
    assert_eq!(contents(&ed), b"abab");

    // in macro-repeat mode a bare `e` replays again
    key(&mut ed, KeyEvent::ch('e'));
    assert_eq!(contents(&ed), b"ababab");

    // any other key ends the mode and is handled normally
    key(&mut ed, KeyEvent::ch('x'));
    assert_eq!(contents(&ed), b"abababx");
}

#[test]
fn goto_line_prompt_centers_cursor() {
    let content: Vec<u8> = (1..=50)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes();
    let (mut ed, _dir) = editor_with(&content);
    key(&mut ed, KeyEvent::alt('g'));
    type_str(&mut ed, "30");
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    assert_eq!(cursor(&ed).0, 30);
    assert!(ed.overlay.is_none());
}

#[test]
fn switch_buffer_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("aaa.txt");
    let b = dir.path().join("bbb.txt");
    std::fs::write(&a, b"A").unwrap();
    std::fs::write(&b, b"B").unwrap();
    let mut ed = Editor::new(Config::default(), &[a, b.clone()]);
    ed.resize(80, 24);
    assert_eq!(contents(&ed), b"A");

    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('b'));
    // the prompt completes buffer names; type the full display name
    let name = b.to_string_lossy().into_owned();
    // clear whatever completion inserted, then type the target name
    for _ in 0..200 {
        key(&mut ed, KeyEvent::plain(KeyCode::Backspace));
    }
    type_str(&mut ed, &name);
    // a live completion session absorbs the first Enter as a commit
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    if ed.overlay.is_some() {
        key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    }
    assert_eq!(contents(&ed), b"B");
}

#[test]
fn region_indent_mode_repeats() {
    let (mut ed, _dir) = editor_with(b"a\nb");
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ch('>'));
    assert_eq!(contents(&ed), b"\ta\nb");
    key(&mut ed, KeyEvent::ch('>'));
    assert_eq!(contents(&ed), b"\t\ta\nb");
    key(&mut ed, KeyEvent::ch('<'));
    assert_eq!(contents(&ed), b"\ta\nb");
    // a non-indent key leaves the mode and acts normally
    key(&mut ed, KeyEvent::ctrl('e'));
    assert!(ed.overlay.is_none());
}

#[test]
fn word_case_commands() {
    let (mut ed, _dir) = editor_with(b"word next");
    key(&mut ed, KeyEvent::alt('u'));
    assert_eq!(contents(&ed), b"WORD next");
    key(&mut ed, KeyEvent::alt('b'));
    key(&mut ed, KeyEvent::alt('l'));
    assert_eq!(contents(&ed), b"word next");
    key(&mut ed, KeyEvent::alt('b'));
    key(&mut ed, KeyEvent::alt('c'));
    assert_eq!(contents(&ed), b"Word next");
}

#[test]
fn search_and_replace_over_region() {
    let (mut ed, _dir) = editor_with(b"aa bb aa\ncc aa");
    // region = whole buffer: mark at start, cursor at end
    key(&mut ed, KeyEvent::new(KeyCode::Char(' '), core_events::KeyModifiers::CTRL));
    key(&mut ed, KeyEvent::alt('>'));
    key(&mut ed, KeyEvent::ctrl('x'));
    key(&mut ed, KeyEvent::ctrl('r'));
    type_str(&mut ed, "aa");
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    type_str(&mut ed, "XYZ");
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));
    assert_eq!(contents(&ed), b"XYZ bb XYZ\ncc XYZ");
    assert_eq!(ed.s_and_r_last_word, b"aa");
    assert_eq!(ed.s_and_r_last_repl, b"XYZ");
}

#[test]
fn alt_slash_cycles_expansions() {
    let (mut ed, _dir) = editor_with(b"alpha beta\nal");
    key(&mut ed, KeyEvent::alt('>')); // cursor to end, after "al"
    key(&mut ed, KeyEvent::alt('/'));
    assert_eq!(contents(&ed), b"alpha beta\nalpha");
    // exhausted → restores and reports
    key(&mut ed, KeyEvent::alt('/'));
    assert_eq!(contents(&ed), b"alpha beta\nal");
    assert_eq!(ed.ctx.borrow().status(), "No further expansions found");
}

#[test]
fn undo_round_trip_restores_bytes_and_cursor() {
    let (mut ed, _dir) = editor_with(b"seed line\nsecond");
    let before = contents(&ed);
    let cursor_before = cursor(&ed);

    let script = [
        KeyEvent::ch('x'),
        KeyEvent::ch('y'),
        KeyEvent::ctrl('j'),
        KeyEvent::ch('z'),
        KeyEvent::ctrl('a'),
        KeyEvent::ctrl('k'),
        KeyEvent::alt('<'),
        KeyEvent::alt('d'),
    ];
    for k in script {
        key(&mut ed, k);
    }
    assert_ne!(contents(&ed), before);

    for _ in 0..script.len() {
        key(&mut ed, KeyEvent::ctrl('/'));
    }
    assert_eq!(contents(&ed), before);
    assert_eq!(cursor(&ed), cursor_before);
}

#[test]
fn fill_region_reflows_comments() {
    let (mut ed, _dir) = editor_with(b"// one two three four five six seven eight nine");
    key(&mut ed, KeyEvent::alt('q'));
    key(&mut ed, KeyEvent::plain(KeyCode::Enter)); // accept detected "//"
    // replace the default width with 20
    for _ in 0..4 {
        key(&mut ed, KeyEvent::plain(KeyCode::Backspace));
    }
    type_str(&mut ed, "20");
    key(&mut ed, KeyEvent::plain(KeyCode::Enter));

    let got = contents(&ed);
    let text = String::from_utf8(got).unwrap();
    assert!(text.lines().count() > 1, "line was wrapped: {text:?}");
    for line in text.lines() {
        assert!(line.starts_with("// "), "prefix re-applied: {line:?}");
        assert!(
            core_text::vlen(line.as_bytes(), 0) <= 20 || !line[3..].contains(' '),
            "line fits or is unbreakable: {line:?}"
        );
    }
}
