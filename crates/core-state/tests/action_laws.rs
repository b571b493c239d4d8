//! Property tests over the action engine: arbitrary edit scripts must revert
//! to the initial state byte for byte, and the structural counters must stay
//! in sync throughout.

use core_state::{Action, Buffer, CursorLocation};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert { pos: usize, data: String },
    Delete { pos: usize, len: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), "[a-z\n ]{0,12}").prop_map(|(pos, data)| Op::Insert { pos, data }),
        (any::<usize>(), 0usize..12).prop_map(|(pos, len)| Op::Delete { pos, len }),
    ]
}

/// Resolve a byte position (counting inter-line steps as one byte) to a
/// cursor location, clamped to the buffer end.
fn cursor_at_abs(buf: &Buffer, pos: usize) -> CursorLocation {
    let mut c = CursorLocation::buffer_start(&buf.text);
    let mut left = pos;
    loop {
        let line_len = buf.text.line(c.line).len();
        if left <= line_len - c.boffset {
            c.boffset += left;
            return c;
        }
        left -= line_len - c.boffset + 1;
        match buf.text.next(c.line) {
            Some(next) => {
                c.line = next;
                c.line_num += 1;
                c.boffset = 0;
            }
            None => {
                c.boffset = line_len;
                return c;
            }
        }
    }
}

fn total_len(buf: &Buffer) -> usize {
    buf.text.bytes_n() + buf.text.lines_n() - 1
}

proptest! {
    #[test]
    fn scripts_revert_byte_identical(
        init in "[a-z\n]{0,30}",
        ops in proptest::collection::vec(op_strategy(), 0..16),
    ) {
        let mut buf = Buffer::from_bytes(init.as_bytes());
        let initial = buf.contents();
        let mut applied: Vec<Action> = Vec::new();

        for op in ops {
            match op {
                Op::Insert { pos, data } => {
                    let c = cursor_at_abs(&buf, pos % (total_len(&buf) + 1));
                    let a = Action::insert(&mut buf.text, c, data.into_bytes());
                    buf.run_action(&a, false);
                    applied.push(a);
                }
                Op::Delete { pos, len } => {
                    let c = cursor_at_abs(&buf, pos % (total_len(&buf) + 1));
                    let end = CursorLocation::buffer_end(&buf.text);
                    let max = c.distance(&buf.text, end) as usize;
                    let len = len.min(max);
                    if len == 0 {
                        continue;
                    }
                    let a = Action::delete(&buf.text, c, len);
                    buf.run_action(&a, false);
                    applied.push(a);
                }
            }
            buf.text.check_invariants();
        }

        for a in applied.iter().rev() {
            buf.run_action(a, true);
            buf.text.check_invariants();
        }
        prop_assert_eq!(buf.contents(), initial);
    }

    #[test]
    fn revert_then_apply_is_identity(
        init in "[a-z\n]{0,20}",
        pos in any::<usize>(),
        data in "[a-z\n]{1,8}",
    ) {
        let mut buf = Buffer::from_bytes(init.as_bytes());
        let c = cursor_at_abs(&buf, pos % (total_len(&buf) + 1));
        let a = Action::insert(&mut buf.text, c, data.into_bytes());
        buf.run_action(&a, false);
        let after = buf.contents();
        buf.run_action(&a, true);
        buf.run_action(&a, false);
        prop_assert_eq!(buf.contents(), after);
        buf.text.check_invariants();
    }
}
