//! View-level behavior: the scroll threshold invariant, cross-view edit
//! propagation, presave cleanup, kill-buffer accumulation.

use core_render::view::{View, VERTICAL_THRESHOLD};
use core_state::{Buffer, CursorLocation, EditorContext, LastCommand, SharedBuffer};
use core_state::command_class::CommandClass;
use std::cell::RefCell;
use std::rc::Rc;

fn shared(buf: Buffer) -> SharedBuffer {
    Rc::new(RefCell::new(buf))
}

fn numbered_lines(n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 1..=n {
        out.extend_from_slice(format!("line {i}").as_bytes());
        if i != n {
            out.push(b'\n');
        }
    }
    out
}

fn make_view(content: &[u8], w: usize, h: usize) -> View {
    let ctx = EditorContext::new();
    let buf = shared(Buffer::from_bytes(content));
    ctx.borrow_mut().buffers.push(buf.clone());
    let mut v = View::new(ctx, buf);
    v.resize(w, h);
    v
}

fn scroll_invariant_holds(v: &View) -> bool {
    let vt = v.vertical_threshold();
    let h = v.height();
    let cursor = v.loc.cursor.line_num;
    let top = v.loc.top_line_num;
    let lines_n = v.buf().borrow().text.lines_n();
    let co = cursor as isize - top as isize;
    let in_band = co >= vt as isize && co < (h - vt) as isize;
    let near_edge = cursor <= vt || cursor + vt > lines_n;
    in_band || near_edge
}

#[test]
fn vertical_scrolling_respects_threshold() {
    let mut v = make_view(&numbered_lines(100), 80, 24);
    assert_eq!(v.height(), 23);
    assert_eq!(v.vertical_threshold(), VERTICAL_THRESHOLD);

    for _ in 0..60 {
        v.move_cursor_next_line();
        assert!(scroll_invariant_holds(&v), "down: cursor {} top {}", v.loc.cursor.line_num, v.loc.top_line_num);
    }
    for _ in 0..40 {
        v.move_cursor_prev_line();
        assert!(scroll_invariant_holds(&v), "up: cursor {} top {}", v.loc.cursor.line_num, v.loc.top_line_num);
    }
}

#[test]
fn narrow_window_caps_threshold() {
    let mut v = make_view(&numbered_lines(50), 20, 5);
    // height 4 → vt capped at (4-1)/2 = 1
    assert_eq!(v.vertical_threshold(), 1);
    for _ in 0..20 {
        v.move_cursor_next_line();
        assert!(scroll_invariant_holds(&v));
    }
}

#[test]
fn horizontal_scroll_keeps_cursor_visible() {
    let long: Vec<u8> = std::iter::repeat(b'x').take(200).collect();
    let mut v = make_view(&long, 40, 10);
    for _ in 0..150 {
        v.move_cursor_forward();
        let col = v.loc.cursor_voffset as isize - v.loc.line_voffset as isize;
        assert!(col >= 0 && col < v.width() as isize, "cursor column {col} outside window");
    }
    assert!(v.loc.line_voffset > 0, "long line must have scrolled");
    // moving back to column zero unscrolls
    v.move_cursor_beginning_of_line();
    assert_eq!(v.loc.line_voffset, 0);
}

#[test]
fn page_scroll_drags_cursor() {
    let mut v = make_view(&numbered_lines(100), 80, 24);
    v.maybe_move_view_n_lines(v.height() as isize / 2);
    assert!(scroll_invariant_holds(&v));
    assert!(v.loc.top_line_num > 1);
}

#[test]
fn edits_propagate_to_sibling_views() {
    let ctx = EditorContext::new();
    let buf = shared(Buffer::from_bytes(&numbered_lines(10)));
    let mut a = View::new(ctx.clone(), buf.clone());
    a.resize(80, 24);
    let mut b = View::new(ctx, buf.clone());
    b.resize(80, 24);

    // park b's cursor on line 5
    for _ in 0..4 {
        b.move_cursor_next_line();
    }
    assert_eq!(b.loc.cursor.line_num, 5);

    // a inserts two lines at the top
    let start = CursorLocation::buffer_start(&buf.borrow().text);
    a.action_insert(start, b"p\nq\n".to_vec());
    for bc in a.take_broadcasts() {
        match bc.kind {
            core_state::ActionKind::Insert => b.on_insert(&bc.action),
            core_state::ActionKind::Delete => b.on_delete(&bc.action),
        }
    }
    assert_eq!(b.loc.cursor.line_num, 7, "sibling cursor shifted down");

    // undo through a restores b as well
    a.undo();
    for bc in a.take_broadcasts() {
        match bc.kind {
            core_state::ActionKind::Insert => b.on_insert(&bc.action),
            core_state::ActionKind::Delete => b.on_delete(&bc.action),
        }
    }
    assert_eq!(b.loc.cursor.line_num, 5);
}

#[test]
fn presave_cleanup_normalizes() {
    let mut v = make_view(b"code  \n\tindent\t\n\n\n", 80, 24);
    v.presave_cleanup(false);
    let contents = v.buf().borrow().contents();
    assert_eq!(contents, b"code\n\tindent\n");
}

#[test]
fn presave_cleanup_raw_keeps_bytes() {
    let raw = b"code  \n\n\n".to_vec();
    let mut v = make_view(&raw, 80, 24);
    v.presave_cleanup(true);
    assert_eq!(v.buf().borrow().contents(), raw);
}

#[test]
fn presave_cleanup_is_undoable() {
    let mut v = make_view(b"trail  ", 80, 24);
    v.presave_cleanup(false);
    assert_eq!(v.buf().borrow().contents(), b"trail\n");
    v.undo();
    assert_eq!(v.buf().borrow().contents(), b"trail  ");
}

#[test]
fn kill_buffer_accumulates_only_across_kills() {
    let mut v = make_view(b"foo bar", 80, 24);
    let start = CursorLocation::buffer_start(&v.buf().borrow().text);

    v.last_command = LastCommand { class: CommandClass::Deletion, kill: false };
    v.append_to_kill_buffer(start, 3);
    assert_eq!(v.ctx().borrow().kill_buffer, b"foo");

    // consecutive kill appends
    v.last_command = LastCommand { class: CommandClass::Deletion, kill: true };
    let mut c = start;
    c.boffset = 3;
    v.append_to_kill_buffer(c, 4);
    assert_eq!(v.ctx().borrow().kill_buffer, b"foo bar");

    // a non-kill command in between resets the accumulation
    v.last_command = LastCommand { class: CommandClass::Movement, kill: false };
    v.append_to_kill_buffer(start, 3);
    assert_eq!(v.ctx().borrow().kill_buffer, b"foo");

    // prepending grows at the front
    v.last_command = LastCommand { class: CommandClass::Deletion, kill: true };
    v.prepend_to_kill_buffer(c, 4);
    assert_eq!(v.ctx().borrow().kill_buffer, b" barfoo");
}

#[test]
fn status_line_marks_unsynced_buffers() {
    let mut v = make_view(b"hello", 80, 24);
    let start = CursorLocation::buffer_start(&v.buf().borrow().text);
    v.action_insert(start, b"x".to_vec());
    v.draw();
    let y = v.height();
    assert_eq!(v.uibuf.get(1, y).ch, '*');
    assert_eq!(v.uibuf.get(2, y).ch, '*');
}

#[test]
fn draw_expands_tabs_and_controls() {
    let mut v = make_view(b"\tA\x01B", 80, 24);
    v.draw();
    // tab expands to 8 blank cells, then 'A', then ^A in red, then 'B'
    assert_eq!(v.uibuf.get(8, 0).ch, 'A');
    assert_eq!(v.uibuf.get(9, 0).ch, '^');
    assert_eq!(v.uibuf.get(10, 0).ch, 'A');
    assert_eq!(v.uibuf.get(9, 0).fg, core_render::Color::Red);
    assert_eq!(v.uibuf.get(11, 0).ch, 'B');
}

#[test]
fn long_line_shows_continuation_arrows() {
    let long: Vec<u8> = std::iter::repeat(b'x').take(100).collect();
    let mut v = make_view(&long, 40, 10);
    v.draw();
    assert_eq!(v.uibuf.get(39, 0).ch, '→');

    for _ in 0..60 {
        v.move_cursor_forward();
    }
    v.draw();
    assert_eq!(v.uibuf.get(0, 0).ch, '←');
}
