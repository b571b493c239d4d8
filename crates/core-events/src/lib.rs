//! Core event types and channel policy for grit.
//!
//! The runtime has exactly one concurrency boundary: a blocking input thread
//! publishing into a bounded single-producer single-consumer channel drained
//! by the event loop. The capacity below is deliberately small — the consumer
//! drains opportunistically and draws once per burst, so a deep queue only
//! adds latency.

use std::fmt;

/// Bounded event channel capacity between the input thread and the loop.
pub const EVENT_CHANNEL_CAP: usize = 20;

/// Top-level event consumed by the editor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// Terminal resize (columns, rows).
    Resize(u16, u16),
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
    }
}

/// Named terminal keys. Printable input arrives as `Char`; control chords
/// arrive as `Char` plus the CTRL modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    F(u8),
}

/// A single key press: code plus modifier bitflags. This is also the unit
/// stored by the keyboard macro recorder, so it must stay `Copy` and cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: KeyModifiers::empty(),
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: KeyModifiers::CTRL,
        }
    }

    pub fn alt(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: KeyModifiers::ALT,
        }
    }

    pub fn ch(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    /// True for the control chord `Ctrl-<c>` (case-insensitive, no Alt).
    pub fn is_ctrl(&self, c: char) -> bool {
        self.mods == KeyModifiers::CTRL
            && matches!(self.code, KeyCode::Char(k) if k.eq_ignore_ascii_case(&c))
    }

    /// True for `Alt-<c>` (no Ctrl).
    pub fn is_alt(&self, c: char) -> bool {
        self.mods == KeyModifiers::ALT && self.code == KeyCode::Char(c)
    }

    /// The printable rune of an unmodified key press, if any.
    pub fn plain_char(&self) -> Option<char> {
        if self.mods.is_empty() {
            if let KeyCode::Char(c) = self.code {
                return Some(c);
            }
        }
        None
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(KeyModifiers::CTRL) {
            write!(f, "C-")?;
        }
        if self.mods.contains(KeyModifiers::ALT) {
            write!(f, "M-")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "SPC"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Enter => write!(f, "RET"),
            KeyCode::Tab => write!(f, "TAB"),
            KeyCode::Backspace => write!(f, "DEL"),
            KeyCode::Delete => write!(f, "<delete>"),
            KeyCode::Home => write!(f, "<home>"),
            KeyCode::End => write!(f, "<end>"),
            KeyCode::PageUp => write!(f, "<prior>"),
            KeyCode::PageDown => write!(f, "<next>"),
            KeyCode::Up => write!(f, "<up>"),
            KeyCode::Down => write!(f, "<down>"),
            KeyCode::Left => write!(f, "<left>"),
            KeyCode::Right => write!(f, "<right>"),
            KeyCode::F(n) => write!(f, "<f{n}>"),
        }
    }
}

pub type EventResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chord_predicates() {
        let k = KeyEvent::ctrl('x');
        assert!(k.is_ctrl('x'));
        assert!(k.is_ctrl('X'));
        assert!(!k.is_alt('x'));
        assert!(k.plain_char().is_none());

        let a = KeyEvent::alt('f');
        assert!(a.is_alt('f'));
        assert!(!a.is_ctrl('f'));

        let p = KeyEvent::ch('q');
        assert_eq!(p.plain_char(), Some('q'));
    }

    #[test]
    fn display_emacs_style() {
        assert_eq!(KeyEvent::ctrl('x').to_string(), "C-x");
        assert_eq!(KeyEvent::alt('<').to_string(), "M-<");
        assert_eq!(KeyEvent::plain(KeyCode::Enter).to_string(), "RET");
        assert_eq!(
            KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CTRL).to_string(),
            "C-SPC"
        );
    }
}
