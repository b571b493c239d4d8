//! View commands and their key translation.
//!
//! Keystrokes that reach a view translate into [`Command`]s; the command's
//! class drives action-group finalization (a class change, or any `Misc`
//! command, closes the current undo group).

use core_events::{KeyCode, KeyEvent};
use core_state::CommandClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // movement (finalize the undo action group)
    MoveCursorForward,
    MoveCursorBackward,
    MoveCursorWordForward,
    MoveCursorWordBackward,
    MoveCursorNextLine,
    MoveCursorPrevLine,
    MoveCursorBeginningOfLine,
    MoveCursorEndOfLine,
    MoveCursorBeginningOfFile,
    MoveCursorEndOfFile,
    MoveCursorToLine(usize),
    MoveViewHalfForward,
    MoveViewHalfBackward,
    SetMark,
    SwapCursorAndMark,

    // insertion
    InsertRune(char),
    Yank,

    // deletion
    DeleteRuneBackward,
    DeleteRune,
    KillLine,
    KillWord,
    KillWordBackward,
    KillRegion,

    // history
    Undo,
    Redo,

    // misc
    IndentRegion,
    DeindentRegion,
    CopyRegion,
    RegionToUpper,
    RegionToLower,
    WordToUpper,
    WordToTitle,
    WordToLower,
    AutocomplInit,
    AutocomplMoveCursorUp,
    AutocomplMoveCursorDown,
    AutocomplFinalize,
}

impl Command {
    pub fn class(self) -> CommandClass {
        use Command::*;
        match self {
            MoveCursorForward | MoveCursorBackward | MoveCursorWordForward
            | MoveCursorWordBackward | MoveCursorNextLine | MoveCursorPrevLine
            | MoveCursorBeginningOfLine | MoveCursorEndOfLine | MoveCursorBeginningOfFile
            | MoveCursorEndOfFile | MoveCursorToLine(_) | MoveViewHalfForward
            | MoveViewHalfBackward | SetMark | SwapCursorAndMark => CommandClass::Movement,
            InsertRune(_) | Yank => CommandClass::Insertion,
            DeleteRuneBackward | DeleteRune | KillLine | KillWord | KillWordBackward
            | KillRegion => CommandClass::Deletion,
            Undo | Redo => CommandClass::History,
            _ => CommandClass::Misc,
        }
    }

    /// Kill commands accumulate into the kill buffer while they run
    /// back-to-back.
    pub fn is_kill(self) -> bool {
        matches!(
            self,
            Command::KillLine | Command::KillWord | Command::KillWordBackward | Command::KillRegion
        )
    }
}

/// The undo chord: `C-/` reaches terminals as ^_ (0x1F), which input layers
/// variously report as `/`, `_` or `7` with CTRL.
pub fn is_undo_chord(ev: &KeyEvent) -> bool {
    ev.is_ctrl('/') || ev.is_ctrl('_') || ev.is_ctrl('7')
}

/// Translate a key aimed at a view into a command. `ac_active` reroutes
/// vertical motion and Enter into the completion popup, exactly while a
/// session is live.
pub fn translate_view_key(ev: &KeyEvent, ac_active: bool) -> Option<Command> {
    use Command::*;

    if ev.mods.is_empty() {
        match ev.code {
            KeyCode::Right => return Some(MoveCursorForward),
            KeyCode::Left => return Some(MoveCursorBackward),
            KeyCode::Down => {
                return Some(if ac_active {
                    AutocomplMoveCursorDown
                } else {
                    MoveCursorNextLine
                })
            }
            KeyCode::Up => {
                return Some(if ac_active {
                    AutocomplMoveCursorUp
                } else {
                    MoveCursorPrevLine
                })
            }
            KeyCode::End => return Some(MoveCursorEndOfLine),
            KeyCode::Home => return Some(MoveCursorBeginningOfLine),
            KeyCode::PageDown => return Some(MoveViewHalfForward),
            KeyCode::PageUp => return Some(MoveViewHalfBackward),
            KeyCode::Delete => return Some(DeleteRune),
            KeyCode::Backspace => return Some(DeleteRuneBackward),
            KeyCode::Tab => return Some(InsertRune('\t')),
            // '\r' inserts a bare newline without auto-indent
            KeyCode::Enter => {
                return Some(if ac_active {
                    AutocomplFinalize
                } else {
                    InsertRune('\r')
                })
            }
            KeyCode::Char(c) => return Some(InsertRune(c)),
            _ => return None,
        }
    }

    if is_undo_chord(ev) {
        return Some(Undo);
    }

    if ev.mods == core_events::KeyModifiers::CTRL {
        if let KeyCode::Char(c) = ev.code {
            return match c.to_ascii_lowercase() {
                'f' => Some(MoveCursorForward),
                'b' => Some(MoveCursorBackward),
                'n' => Some(if ac_active {
                    AutocomplMoveCursorDown
                } else {
                    MoveCursorNextLine
                }),
                'p' => Some(if ac_active {
                    AutocomplMoveCursorUp
                } else {
                    MoveCursorPrevLine
                }),
                'e' => Some(MoveCursorEndOfLine),
                'a' => Some(MoveCursorBeginningOfLine),
                'v' => Some(MoveViewHalfForward),
                'd' => Some(DeleteRune),
                'k' => Some(KillLine),
                'w' => Some(KillRegion),
                'y' => Some(Yank),
                // '\n' goes through the auto-indent path
                'j' => Some(if ac_active {
                    AutocomplFinalize
                } else {
                    InsertRune('\n')
                }),
                'h' => Some(DeleteRuneBackward),
                ' ' => Some(SetMark),
                _ => None,
            };
        }
        if ev.code == KeyCode::Enter {
            // Ctrl-Enter is indistinguishable from Ctrl-J in some terminals
            return Some(InsertRune('\n'));
        }
        if ev.code == KeyCode::Backspace {
            return Some(DeleteRuneBackward);
        }
        return None;
    }

    if ev.mods == core_events::KeyModifiers::ALT {
        if ev.code == KeyCode::Backspace {
            return Some(KillWordBackward);
        }
        if let KeyCode::Char(c) = ev.code {
            return match c {
                'v' => Some(MoveViewHalfBackward),
                '<' => Some(MoveCursorBeginningOfFile),
                '>' => Some(MoveCursorEndOfFile),
                'f' => Some(MoveCursorWordForward),
                'b' => Some(MoveCursorWordBackward),
                'd' => Some(KillWord),
                'w' => Some(CopyRegion),
                'u' => Some(WordToUpper),
                'l' => Some(WordToLower),
                'c' => Some(WordToTitle),
                _ => None,
            };
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::KeyEvent;

    #[test]
    fn classes_partition_commands() {
        assert_eq!(Command::MoveCursorForward.class(), CommandClass::Movement);
        assert_eq!(Command::InsertRune('x').class(), CommandClass::Insertion);
        assert_eq!(Command::KillLine.class(), CommandClass::Deletion);
        assert_eq!(Command::Undo.class(), CommandClass::History);
        assert_eq!(Command::IndentRegion.class(), CommandClass::Misc);
    }

    #[test]
    fn kill_commands_flagged() {
        assert!(Command::KillWord.is_kill());
        assert!(Command::KillRegion.is_kill());
        assert!(!Command::DeleteRune.is_kill());
        assert!(!Command::Yank.is_kill());
    }

    #[test]
    fn emacs_bindings() {
        assert_eq!(
            translate_view_key(&KeyEvent::ctrl('f'), false),
            Some(Command::MoveCursorForward)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::alt('f'), false),
            Some(Command::MoveCursorWordForward)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::alt('<'), false),
            Some(Command::MoveCursorBeginningOfFile)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::ch('q'), false),
            Some(Command::InsertRune('q'))
        );
        assert_eq!(
            translate_view_key(&KeyEvent::ctrl('/'), false),
            Some(Command::Undo)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::new(core_events::KeyCode::Char(' '), core_events::KeyModifiers::CTRL), false),
            Some(Command::SetMark)
        );
    }

    #[test]
    fn ac_session_reroutes_vertical_motion() {
        assert_eq!(
            translate_view_key(&KeyEvent::ctrl('n'), true),
            Some(Command::AutocomplMoveCursorDown)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::ctrl('n'), false),
            Some(Command::MoveCursorNextLine)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::plain(core_events::KeyCode::Enter), true),
            Some(Command::AutocomplFinalize)
        );
        assert_eq!(
            translate_view_key(&KeyEvent::plain(core_events::KeyCode::Enter), false),
            Some(Command::InsertRune('\r'))
        );
    }
}
