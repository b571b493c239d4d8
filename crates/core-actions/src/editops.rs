//! Composed edit operations.
//!
//! Everything here bottoms out in the two view primitives `action_insert`
//! and `action_delete`; nothing touches line data directly. Operations are
//! total: boundary conditions set a status message instead of failing.

use crate::command::Command;
use core_render::View;
use core_state::{CursorLocation, LastCommand};
use core_text::{
    decode_rune, index_first_non_space, is_word, nonspace_words, rune_advance_len, vlen,
};

/// Execute one view command, placing an action-group boundary when the
/// command class changes (or on any `Misc` command).
pub fn exec(view: &mut View, cmd: Command) {
    let class = cmd.class();
    if view.last_command.finalizes_before(class) {
        view.finalize_action_group();
    }

    use Command::*;
    match cmd {
        MoveCursorForward => view.move_cursor_forward(),
        MoveCursorBackward => view.move_cursor_backward(),
        MoveCursorWordForward => view.move_cursor_word_forward(),
        MoveCursorWordBackward => view.move_cursor_word_backward(),
        MoveCursorNextLine => view.move_cursor_next_line(),
        MoveCursorPrevLine => view.move_cursor_prev_line(),
        MoveCursorBeginningOfLine => view.move_cursor_beginning_of_line(),
        MoveCursorEndOfLine => view.move_cursor_end_of_line(),
        MoveCursorBeginningOfFile => view.move_cursor_beginning_of_file(),
        MoveCursorEndOfFile => view.move_cursor_end_of_file(),
        MoveCursorToLine(n) => view.move_cursor_to_line(n),
        MoveViewHalfForward => view.maybe_move_view_n_lines(view.height() as isize / 2),
        MoveViewHalfBackward => view.move_view_n_lines(-(view.height() as isize) / 2),
        SetMark => view.set_mark(),
        SwapCursorAndMark => view.swap_cursor_and_mark(),

        InsertRune(r) => insert_rune(view, r),
        Yank => yank(view),

        DeleteRuneBackward => delete_rune_backward(view),
        DeleteRune => delete_rune(view),
        KillLine => kill_line(view),
        KillWord => kill_word(view),
        KillWordBackward => kill_word_backward(view),
        KillRegion => kill_region(view),

        Undo => view.undo(),
        Redo => view.redo(),

        IndentRegion => indent_region(view),
        DeindentRegion => deindent_region(view),
        CopyRegion => copy_region(view),
        RegionToUpper => region_to(view, bytes_to_upper),
        RegionToLower => region_to(view, bytes_to_lower),
        WordToUpper => word_to(view, bytes_to_upper),
        WordToTitle => word_to(view, bytes_to_title),
        WordToLower => word_to(view, bytes_to_lower),
        AutocomplInit => view.init_autocompl(),
        AutocomplMoveCursorUp => view.ac_move_cursor_up(),
        AutocomplMoveCursorDown => view.ac_move_cursor_down(),
        AutocomplFinalize => view.ac_finalize(),
    }

    view.last_command = LastCommand {
        class,
        kill: cmd.is_kill(),
    };
}

/// Insert a rune at the cursor. `\n` auto-indents the new line with the
/// previous line's leading whitespace; `\r` inserts a bare newline (the
/// return key's path).
pub fn insert_rune(view: &mut View, r: char) {
    let mut c = view.loc.cursor;
    if r == '\n' || r == '\r' {
        if view.oneline {
            // prompt views have nowhere for a newline to go
            return;
        }
        view.action_insert(c, vec![b'\n']);
        let prev = c.line;
        {
            let b = view.buf().borrow();
            c.line = b.text.next(prev).expect("newline insert created a next line");
        }
        c.line_num += 1;
        c.boffset = 0;

        if r == '\n' {
            let autoindent = {
                let b = view.buf().borrow();
                let data = b.text.line(prev);
                let i = index_first_non_space(data);
                if i > 0 {
                    Some(data[..i].to_vec())
                } else {
                    None
                }
            };
            if let Some(indent) = autoindent {
                let n = indent.len();
                view.action_insert(c, indent);
                c.boffset += n;
            }
        }
    } else {
        let mut data = [0u8; 4];
        let encoded = r.encode_utf8(&mut data).as_bytes().to_vec();
        let n = encoded.len();
        view.action_insert(c, encoded);
        c.boffset += n;
    }
    view.move_cursor_to(c);
}

/// If at the beginning of the line, join with the previous line; otherwise
/// erase one rune backward.
pub fn delete_rune_backward(view: &mut View) {
    let mut c = view.loc.cursor;
    if c.bol() {
        let prev = {
            let b = view.buf().borrow();
            b.text.prev(c.line)
        };
        let Some(prev) = prev else {
            view.set_status("Beginning of buffer");
            return;
        };
        c.line = prev;
        c.line_num -= 1;
        c.boffset = {
            let b = view.buf().borrow();
            b.text.line(prev).len()
        };
        view.action_delete(c, 1);
        view.move_cursor_to(c);
        return;
    }

    let rlen = {
        let b = view.buf().borrow();
        c.rune_before(&b.text).1
    };
    c.boffset -= rlen;
    view.action_delete(c, rlen);
    view.move_cursor_to(c);
}

/// If at the end of the line, join with the next line; otherwise delete the
/// rune under the cursor.
pub fn delete_rune(view: &mut View) {
    let c = view.loc.cursor;
    let (eol, last, rlen) = {
        let b = view.buf().borrow();
        (c.eol(&b.text), c.last_line(&b.text), c.rune_under(&b.text).1)
    };
    if eol {
        if last {
            view.set_status("End of buffer");
            return;
        }
        view.action_delete(c, 1);
        return;
    }
    view.action_delete(c, rlen);
}

/// Kill from the cursor to the end of the line; at the end of the line,
/// kill the newline (joining with the next line).
pub fn kill_line(view: &mut View) {
    let c = view.loc.cursor;
    let (eol, rest) = {
        let b = view.buf().borrow();
        (c.eol(&b.text), b.text.line(c.line).len() - c.boffset)
    };
    if !eol {
        view.append_to_kill_buffer(c, rest);
        view.action_delete(c, rest);
        return;
    }
    view.append_to_kill_buffer(c, 1);
    delete_rune(view);
}

pub fn kill_word(view: &mut View) {
    let c1 = view.loc.cursor;
    let mut c2 = c1;
    let d = {
        let b = view.buf().borrow();
        c2.move_one_word_forward(&b.text);
        c1.distance(&b.text, c2)
    };
    if d > 0 {
        view.append_to_kill_buffer(c1, d as usize);
        view.action_delete(c1, d as usize);
    }
}

pub fn kill_word_backward(view: &mut View) {
    let c2 = view.loc.cursor;
    let mut c1 = c2;
    let d = {
        let b = view.buf().borrow();
        c1.move_one_word_backward(&b.text);
        c1.distance(&b.text, c2)
    };
    if d > 0 {
        view.prepend_to_kill_buffer(c1, d as usize);
        view.action_delete(c1, d as usize);
        view.move_cursor_to(c1);
    }
}

fn mark_or_complain(view: &mut View) -> Option<CursorLocation> {
    let mark = view.buf().borrow().mark;
    if mark.is_none() {
        view.set_status("The mark is not set now, so there is no region");
    }
    mark
}

pub fn kill_region(view: &mut View) {
    let Some(mark) = mark_or_complain(view) else {
        return;
    };
    let c1 = view.loc.cursor;
    let c2 = mark;
    let d = {
        let b = view.buf().borrow();
        c1.distance(&b.text, c2)
    };
    match d {
        0 => {}
        d if d < 0 => {
            let d = (-d) as usize;
            view.append_to_kill_buffer(c2, d);
            view.action_delete(c2, d);
            view.move_cursor_to(c2);
        }
        d => {
            view.append_to_kill_buffer(c1, d as usize);
            view.action_delete(c1, d as usize);
        }
    }
}

pub fn copy_region(view: &mut View) {
    let Some(mark) = mark_or_complain(view) else {
        return;
    };
    let c1 = view.loc.cursor;
    let c2 = mark;
    let d = {
        let b = view.buf().borrow();
        c1.distance(&b.text, c2)
    };
    match d {
        0 => {}
        d if d < 0 => view.append_to_kill_buffer(c2, (-d) as usize),
        d => view.append_to_kill_buffer(c1, d as usize),
    }
}

/// Insert the kill buffer at the cursor and advance past it.
pub fn yank(view: &mut View) {
    let data = view.ctx().borrow().kill_buffer.clone();
    if data.is_empty() {
        return;
    }
    let mut cursor = view.loc.cursor;
    view.action_insert(cursor, data.clone());
    {
        let b = view.buf().borrow();
        let mut rest = &data[..];
        while !rest.is_empty() {
            let (_, rlen) = decode_rune(rest);
            rest = &rest[rlen.max(1)..];
            cursor.move_one_rune_forward(&b.text);
        }
    }
    view.move_cursor_to(cursor);
}

/// The region normalized to whole lines: (start of first line, end of last
/// line). Without a mark both ends sit on the cursor line.
pub fn line_region(view: &View) -> (CursorLocation, CursorLocation) {
    let b = view.buf().borrow();
    let mut beg = view.loc.cursor;
    let mut end = b.mark.unwrap_or(beg);
    if beg.line_num > end.line_num {
        std::mem::swap(&mut beg, &mut end);
    }
    beg.boffset = 0;
    end.boffset = b.text.line(end.line).len();
    (beg, end)
}

fn indent_line(view: &mut View, mut line: CursorLocation) {
    line.boffset = 0;
    view.action_insert(line, vec![b'\t']);
    if view.loc.cursor.line == line.line {
        let mut cursor = view.loc.cursor;
        cursor.boffset += 1;
        view.move_cursor_to(cursor);
    }
}

fn deindent_line(view: &mut View, mut line: CursorLocation) {
    line.boffset = 0;
    let leads_with_tab = {
        let b = view.buf().borrow();
        line.rune_under(&b.text).0 == '\t'
    };
    if leads_with_tab {
        view.action_delete(line, 1);
    }
    if view.loc.cursor.line == line.line && view.loc.cursor.boffset > 0 {
        let mut cursor = view.loc.cursor;
        cursor.boffset -= 1;
        view.move_cursor_to(cursor);
    }
}

pub fn indent_region(view: &mut View) {
    let (mut beg, end) = line_region(view);
    while beg.line != end.line {
        indent_line(view, beg);
        let b = view.buf().borrow();
        beg.line = b.text.next(beg.line).expect("region end lies ahead");
        drop(b);
        beg.line_num += 1;
    }
    indent_line(view, end);
}

pub fn deindent_region(view: &mut View) {
    let (mut beg, end) = line_region(view);
    while beg.line != end.line {
        deindent_line(view, beg);
        let b = view.buf().borrow();
        beg.line = b.text.next(beg.line).expect("region end lies ahead");
        drop(b);
        beg.line_num += 1;
    }
    deindent_line(view, end);
}

/// Delete `[from, to)` and insert `filter` of the removed bytes. The filter
/// must return fresh data.
pub fn filter_text(view: &mut View, from: CursorLocation, to: CursorLocation, filter: impl Fn(&[u8]) -> Vec<u8>) {
    let (c1, c2) = CursorLocation::ordered(from, to);
    let d = {
        let b = view.buf().borrow();
        c1.distance(&b.text, c2)
    };
    view.action_delete(c1, d as usize);
    let data = {
        let b = view.buf().borrow();
        let last = b
            .history
            .current()
            .last_action()
            .expect("filter_text follows its own delete");
        filter(&last.data)
    };
    view.action_insert(c1, data);
}

pub fn region_to(view: &mut View, filter: impl Fn(&[u8]) -> Vec<u8>) {
    let Some(mark) = mark_or_complain(view) else {
        return;
    };
    filter_text(view, view.loc.cursor, mark, filter);
}

pub fn word_to(view: &mut View, filter: impl Fn(&[u8]) -> Vec<u8>) {
    let c1 = view.loc.cursor;
    let mut c2 = c1;
    {
        let b = view.buf().borrow();
        c2.move_one_word_forward(&b.text);
    }
    filter_text(view, c1, c2, filter);
    let mut c1 = c1;
    {
        let b = view.buf().borrow();
        c1.move_one_word_forward(&b.text);
    }
    view.move_cursor_to(c1);
}

fn map_runes(data: &[u8], f: impl Fn(char, &mut Vec<u8>)) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;
    while !rest.is_empty() {
        let (r, rlen) = decode_rune(rest);
        if r == core_text::INVALID_RUNE && !rest.starts_with("\u{FFFD}".as_bytes()) {
            // pass invalid bytes through untouched
            out.push(rest[0]);
        } else {
            f(r, &mut out);
        }
        rest = &rest[rlen.max(1)..];
    }
    out
}

pub fn bytes_to_upper(data: &[u8]) -> Vec<u8> {
    map_runes(data, |r, out| {
        for u in r.to_uppercase() {
            let mut b = [0u8; 4];
            out.extend_from_slice(u.encode_utf8(&mut b).as_bytes());
        }
    })
}

pub fn bytes_to_lower(data: &[u8]) -> Vec<u8> {
    map_runes(data, |r, out| {
        for u in r.to_lowercase() {
            let mut b = [0u8; 4];
            out.extend_from_slice(u.encode_utf8(&mut b).as_bytes());
        }
    })
}

/// Lowercase, then capitalize the first rune of every word.
pub fn bytes_to_title(data: &[u8]) -> Vec<u8> {
    let lowered = bytes_to_lower(data);
    let mut out = Vec::with_capacity(lowered.len());
    let mut at_word_start = true;
    let mut rest = &lowered[..];
    while !rest.is_empty() {
        let (r, rlen) = decode_rune(rest);
        if is_word(r) {
            if at_word_start {
                for u in r.to_uppercase() {
                    let mut b = [0u8; 4];
                    out.extend_from_slice(u.encode_utf8(&mut b).as_bytes());
                }
            } else {
                out.extend_from_slice(&rest[..rlen.max(1)]);
            }
            at_word_start = false;
        } else {
            out.extend_from_slice(&rest[..rlen.max(1)]);
            at_word_start = true;
        }
        rest = &rest[rlen.max(1)..];
    }
    out
}

/// Re-flow the line region to at most `maxv` visual columns per line,
/// stripping and re-adding `prefix` (a comment leader) and the common
/// indent.
pub fn fill_region(view: &mut View, maxv: usize, prefix: &[u8]) {
    let (beg, end) = line_region(view);
    let data = {
        let b = view.buf().borrow();
        let d = beg.distance(&b.text, end);
        beg.extract_bytes(&b.text, d as usize)
    };
    let indent = data[..index_first_non_space(&data)].to_vec();
    let indent_vlen = vlen(&indent, 0);
    let prefix_vlen = vlen(prefix, indent_vlen);

    // collapse the region to a stream of words
    let mut words: Vec<u8> = Vec::new();
    let mut offset = 0;
    loop {
        offset += index_first_non_space(&data[offset..]);
        if data[offset..].starts_with(prefix) {
            offset += prefix.len();
        }
        offset += index_first_non_space(&data[offset..]);
        match data[offset..].iter().position(|&b| b == b'\n') {
            None => {
                for w in nonspace_words(&data[offset..]) {
                    words.extend_from_slice(w);
                    words.push(b' ');
                }
                break;
            }
            Some(i) => {
                for w in nonspace_words(&data[offset..offset + i]) {
                    words.extend_from_slice(w);
                    words.push(b' ');
                }
                offset += i + 1;
            }
        }
    }
    if words.last() == Some(&b' ') {
        words.pop();
    }

    // re-emit, breaking at the last space before maxv
    let mut out: Vec<u8> = Vec::new();
    let mut offset = 0;
    loop {
        let line = &words[offset..];
        out.extend_from_slice(&indent);
        if !prefix.is_empty() {
            out.extend_from_slice(prefix);
            out.push(b' ');
        }

        let mut v = indent_vlen + prefix_vlen + 1;
        let mut lastspace: Option<usize> = None;
        let mut i = 0;
        while i < line.len() {
            let (r, rlen) = decode_rune(&line[i..]);
            if r == ' ' && (lastspace.is_none() || v < maxv) {
                lastspace = Some(i);
            }
            v += rune_advance_len(r, v);
            i += rlen.max(1);
            if lastspace.is_some() && v >= maxv {
                break;
            }
        }
        if i >= line.len() {
            out.extend_from_slice(line);
            break;
        }
        let ls = lastspace.expect("a break point exists past maxv");
        out.extend_from_slice(&line[..ls]);
        out.push(b'\n');
        offset += ls + 1;
    }

    view.action_delete(beg, data.len());
    view.action_insert(beg, out);
    view.move_cursor_to(beg);
}

/// Replace every occurrence of `word` with `repl` inside the region set by
/// cursor and mark, left to right, keeping the far endpoint and the view
/// cursor in step as lengths differ.
pub fn search_and_replace(view: &mut View, word: &[u8], repl: &[u8]) {
    let Some(mark) = mark_or_complain(view) else {
        return;
    };
    let (c1, mut c2) = CursorLocation::ordered(view.loc.cursor, mark);
    let mut cur = c1;
    loop {
        let found = {
            let b = view.buf().borrow();
            let line = b.text.line(cur.line);
            let end = if cur.line == c2.line {
                c2.boffset
            } else {
                line.len()
            };
            core_state::cursor::find_sub(&line[cur.boffset..end], word)
        };
        if let Some(i) = found {
            cur.boffset += i;
            view.action_delete(cur, word.len());
            view.action_insert(cur, repl.to_vec());

            if cur.line == c2.line {
                c2.boffset = c2.boffset + repl.len() - word.len();
            }
            if cur.line == view.loc.cursor.line && cur.boffset < view.loc.cursor.boffset {
                let mut c = view.loc.cursor;
                c.boffset = (c.boffset + repl.len()).saturating_sub(word.len());
                view.move_cursor_to(c);
            }
            cur.boffset += repl.len();
            continue;
        }

        if cur.line == c2.line {
            break;
        }
        {
            let b = view.buf().borrow();
            cur.line = b.text.next(cur.line).expect("region end lies ahead");
        }
        cur.line_num += 1;
        cur.boffset = 0;
    }

    view.set_status(format!(
        "Replaced {} with {}",
        String::from_utf8_lossy(word),
        String::from_utf8_lossy(repl)
    ));
}
