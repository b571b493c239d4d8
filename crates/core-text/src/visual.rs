//! Tab-aware visual offset arithmetic over a single line's bytes.
//!
//! Three transforms are exposed (bytes → cells, bytes → cells + chars, and
//! cells → the closest byte/char pair). They are pure and depend only on the
//! line's contents, so views can share them for cursor retargeting and line
//! drawing.

use crate::utf8::decode_rune;
use crate::TAB_STOP;

/// Visual advance of rune `r` when drawn at visual column `pos`.
pub fn rune_advance_len(r: char, pos: usize) -> usize {
    if r == '\t' {
        return TAB_STOP - pos % TAB_STOP;
    }
    if (r as u32) < 32 {
        // control bytes render as ^X
        return 2;
    }
    1
}

/// Visual length of `data` when drawing starts at column `pos`.
pub fn vlen(data: &[u8], pos: usize) -> usize {
    let origin = pos;
    let mut pos = pos;
    let mut data = data;
    while !data.is_empty() {
        let (r, rlen) = decode_rune(data);
        data = &data[rlen..];
        pos += rune_advance_len(r, pos);
    }
    pos - origin
}

/// Visual column of byte offset `boffset` within `data`.
pub fn voffset(data: &[u8], boffset: usize) -> usize {
    let mut vo = 0;
    let mut rest = &data[..boffset];
    while !rest.is_empty() {
        let (r, rlen) = decode_rune(rest);
        rest = &rest[rlen..];
        vo += rune_advance_len(r, vo);
    }
    vo
}

/// Visual column and character count of byte offset `boffset` within `data`.
pub fn voffset_coffset(data: &[u8], boffset: usize) -> (usize, usize) {
    let (mut vo, mut co) = (0, 0);
    let mut rest = &data[..boffset];
    while !rest.is_empty() {
        let (r, rlen) = decode_rune(rest);
        rest = &rest[rlen..];
        co += 1;
        vo += rune_advance_len(r, vo);
    }
    (vo, co)
}

/// Greatest `(boffset, coffset, voffset)` of `data` with `voffset ≤ target`.
/// Used to land on the closest column when the cursor moves between lines.
pub fn find_closest_offsets(data: &[u8], target: usize) -> (usize, usize, usize) {
    let (mut bo, mut co, mut vo) = (0, 0, 0);
    let mut rest = data;
    while !rest.is_empty() {
        let (r, rlen) = decode_rune(rest);
        rest = &rest[rlen..];
        let vodif = rune_advance_len(r, vo);
        if vo + vodif > target {
            break;
        }
        bo += rlen;
        co += 1;
        vo += vodif;
    }
    (bo, co, vo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tab_advances_to_stop() {
        assert_eq!(rune_advance_len('\t', 0), 8);
        assert_eq!(rune_advance_len('\t', 3), 5);
        assert_eq!(rune_advance_len('\t', 7), 1);
        assert_eq!(rune_advance_len('\t', 8), 8);
    }

    #[test]
    fn control_is_two_cells() {
        assert_eq!(rune_advance_len('\u{1}', 0), 2);
        assert_eq!(rune_advance_len('\r', 5), 2);
    }

    #[test]
    fn voffset_tabbed_line() {
        let line = b"\tab\tc";
        assert_eq!(voffset(line, 0), 0);
        assert_eq!(voffset(line, 1), 8); // after the tab
        assert_eq!(voffset(line, 3), 10); // after "ab"
        assert_eq!(voffset(line, 4), 16); // second tab closes the stop
        assert_eq!(voffset(line, 5), 17);
    }

    #[test]
    fn voffset_coffset_multibyte() {
        let line = "aé\tb".as_bytes();
        assert_eq!(voffset_coffset(line, 3), (2, 2)); // 'a' + 'é'
        assert_eq!(voffset_coffset(line, 4), (8, 3)); // tab to stop
    }

    #[test]
    fn closest_offsets_mid_tab() {
        let line = b"\tx";
        // every column inside the tab resolves back to its start
        for v in 0..8 {
            assert_eq!(find_closest_offsets(line, v), (0, 0, 0));
        }
        assert_eq!(find_closest_offsets(line, 8), (1, 1, 8));
        assert_eq!(find_closest_offsets(line, 100), (2, 2, 9));
    }

    proptest! {
        // §8.7: find_closest_offsets(voffset(L, b)) = (b, c, voffset(L, b))
        // for every rune boundary b of L.
        #[test]
        fn closest_offsets_inverts_voffset(s in "[ -~\\tλé]{0,40}") {
            let data = s.as_bytes();
            let mut bo = 0;
            while bo <= data.len() {
                let (vo, co) = voffset_coffset(data, bo);
                prop_assert_eq!(find_closest_offsets(data, vo), (bo, co, vo));
                if bo == data.len() {
                    break;
                }
                let (_, rlen) = crate::utf8::decode_rune(&data[bo..]);
                bo += rlen.max(1);
            }
        }
    }
}
