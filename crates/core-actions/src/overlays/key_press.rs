//! Single-key confirmation: a prompt plus a table of rune → action.
//! Enter triggers the default rune; unknown keys re-show the prompt.

use super::Overlay;
use crate::editor::Editor;
use core_events::{KeyCode, KeyEvent};

type KeyAction = Box<dyn FnOnce(&mut Editor)>;

pub struct KeyPressMode {
    actions: Vec<(char, KeyAction)>,
    default: char,
    prompt: String,
}

impl KeyPressMode {
    pub fn new(
        ed: &mut Editor,
        actions: Vec<(char, KeyAction)>,
        default: char,
        prompt: impl Into<String>,
    ) -> KeyPressMode {
        let prompt = prompt.into();
        ed.set_status(prompt.clone());
        KeyPressMode {
            actions,
            default,
            prompt,
        }
    }

    pub fn on_key(mut self, ed: &mut Editor, ev: &KeyEvent) -> Option<Overlay> {
        if !ev.mods.is_empty() && !ev.is_ctrl('j') {
            return Some(Overlay::KeyPress(self));
        }
        let ch = match ev.code {
            KeyCode::Enter => self.default,
            _ if ev.is_ctrl('j') => self.default,
            KeyCode::Char(c) => c,
            _ => {
                ed.set_status(self.prompt.clone());
                return Some(Overlay::KeyPress(self));
            }
        };
        if let Some(i) = self.actions.iter().position(|(c, _)| *c == ch) {
            let (_, action) = self.actions.remove(i);
            action(ed);
            return None;
        }
        ed.set_status(self.prompt.clone());
        Some(Overlay::KeyPress(self))
    }
}
