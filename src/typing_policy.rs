use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Largest number of characters allowed past the end of a target word
pub const MAX_OVERTYPE_PER_WORD: usize = 10;

/// A keystroke the engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Char(char),
    Delete,
}

impl Keystroke {
    /// Map a terminal key event to a keystroke.
    ///
    /// Shift is allowed since it produces ordinary printable characters;
    /// Ctrl/Alt/Super chords and non-printable keys other than backspace
    /// yield `None`.
    pub fn from_key_event(key: KeyEvent) -> Option<Self> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let chorded = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        match key.code {
            KeyCode::Backspace if !chorded => Some(Keystroke::Delete),
            KeyCode::Char(c) if !chorded && is_printable(c) => Some(Keystroke::Char(c)),
            _ => None,
        }
    }
}

pub fn is_printable(c: char) -> bool {
    !c.is_control()
}

/// Whether appending `c` would push the current word past the overtype limit
pub fn exceeds_overtype(current_word_len: usize, target_word_len: usize, c: char) -> bool {
    c != ' ' && current_word_len >= target_word_len + MAX_OVERTYPE_PER_WORD
}

/// Whether the whole input already runs the overtype limit past the end of the target
pub fn exceeds_target(typed_len: usize, target_len: usize) -> bool {
    typed_len >= target_len + MAX_OVERTYPE_PER_WORD
}
