//! Command classification driving action-group boundaries.
//!
//! Commands are partitioned into classes; when the class of the current
//! command differs from the previous one (or the class is `Misc`), the open
//! action group is finalized. This groups runs of typing or deletion under a
//! single undo step while separating them from navigation.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandClass {
    #[default]
    None,
    Movement,
    Insertion,
    Deletion,
    History,
    Misc,
}

/// What a view remembers about the command it last executed: its class (for
/// group finalization) and whether it was a kill command (consecutive kills
/// accumulate into the kill buffer).
#[derive(Debug, Clone, Copy, Default)]
pub struct LastCommand {
    pub class: CommandClass,
    pub kill: bool,
}

impl LastCommand {
    pub fn none() -> Self {
        Self::default()
    }

    /// True when a group boundary must be placed before a command of
    /// `class`.
    pub fn finalizes_before(&self, class: CommandClass) -> bool {
        self.class != class || self.class == CommandClass::Misc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_change_finalizes() {
        let last = LastCommand {
            class: CommandClass::Insertion,
            kill: false,
        };
        assert!(!last.finalizes_before(CommandClass::Insertion));
        assert!(last.finalizes_before(CommandClass::Deletion));
        assert!(last.finalizes_before(CommandClass::Movement));
    }

    #[test]
    fn misc_always_finalizes() {
        let last = LastCommand {
            class: CommandClass::Misc,
            kill: false,
        };
        assert!(last.finalizes_before(CommandClass::Misc));
    }
}
