//! Blocking input producer.
//!
//! A dedicated OS thread blocks on `crossterm::event::read()` and publishes
//! normalized [`Event`]s into the bounded runtime channel via
//! `blocking_send`. The thread touches no editor state; it owns only the
//! terminal input handle. It exits when the consumer side of the channel is
//! dropped or when the terminal driver reports an error (fatal by contract).

use core_events::{Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::event::{
    Event as CEvent, KeyCode as CKey, KeyEventKind, KeyModifiers as CMods,
};
use tokio::sync::mpsc::Sender;
use tracing::{debug, error};

fn map_mods(m: CMods) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if m.contains(CMods::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if m.contains(CMods::ALT) {
        out |= KeyModifiers::ALT;
    }
    out
}

fn map_key(code: CKey, mods: CMods) -> Option<KeyEvent> {
    let mods = map_mods(mods);
    let code = match code {
        CKey::Char(c) => KeyCode::Char(c),
        CKey::Enter => KeyCode::Enter,
        CKey::Tab => KeyCode::Tab,
        CKey::Backspace => KeyCode::Backspace,
        CKey::Delete => KeyCode::Delete,
        CKey::Home => KeyCode::Home,
        CKey::End => KeyCode::End,
        CKey::PageUp => KeyCode::PageUp,
        CKey::PageDown => KeyCode::PageDown,
        CKey::Up => KeyCode::Up,
        CKey::Down => KeyCode::Down,
        CKey::Left => KeyCode::Left,
        CKey::Right => KeyCode::Right,
        CKey::F(n) => KeyCode::F(n),
        CKey::Esc => return None, // unbound; overlays use C-g
        _ => return None,
    };
    Some(KeyEvent::new(code, mods))
}

/// Translate one crossterm event. Release/repeat key kinds and unknown keys
/// are dropped.
pub fn translate(ev: CEvent) -> Option<Event> {
    match ev {
        CEvent::Key(k) if k.kind == KeyEventKind::Press => {
            map_key(k.code, k.modifiers).map(Event::Key)
        }
        CEvent::Resize(w, h) => Some(Event::Resize(w, h)),
        _ => None,
    }
}

/// Spawn the producer thread. The returned handle is detachable; the thread
/// stops on channel closure or a driver error.
pub fn spawn_input_thread(tx: Sender<Event>) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("grit-input".into())
        .spawn(move || loop {
            match crossterm::event::read() {
                Ok(ev) => {
                    let Some(ev) = translate(ev) else { continue };
                    if tx.blocking_send(ev).is_err() {
                        debug!(target: "runtime.events", "event channel closed, input thread exiting");
                        return;
                    }
                }
                Err(e) => {
                    // Terminal-driver errors are fatal: drop the sender so the
                    // consumer observes a closed channel and unwinds.
                    error!(target: "runtime.events", ?e, "terminal input error");
                    return;
                }
            }
        })
        .expect("spawning input thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent as CKeyEvent, KeyEventKind, KeyEventState};

    fn press(code: CKey, mods: CMods) -> CEvent {
        CEvent::Key(CKeyEvent {
            code,
            modifiers: mods,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn translates_ctrl_chord() {
        let ev = translate(press(CKey::Char('x'), CMods::CONTROL)).unwrap();
        assert_eq!(ev, Event::Key(KeyEvent::ctrl('x')));
    }

    #[test]
    fn translates_alt_char() {
        let ev = translate(press(CKey::Char('f'), CMods::ALT)).unwrap();
        assert_eq!(ev, Event::Key(KeyEvent::alt('f')));
    }

    #[test]
    fn drops_release_events() {
        let ev = CEvent::Key(CKeyEvent {
            code: CKey::Char('a'),
            modifiers: CMods::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert!(translate(ev).is_none());
    }

    #[test]
    fn translates_resize() {
        assert_eq!(translate(CEvent::Resize(80, 24)), Some(Event::Resize(80, 24)));
    }
}
