//! Pointer and keyboard input types.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A printable character, compared case-insensitively.
    Character(char),
    Delete,
    Backspace,
    Escape,
    Enter,
    /// Anything else, by name.
    Named(String),
}

impl Key {
    /// Parse a DOM-style key name ("Delete", "Escape", "a", "1").
    pub fn from_name(name: &str) -> Self {
        match name {
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Escape" | "Esc" => Key::Escape,
            "Enter" | "Return" => Key::Enter,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c),
                    _ => Key::Named(name.to_string()),
                }
            }
        }
    }

    /// The character, lowercased.
    pub fn char(&self) -> Option<char> {
        match self {
            Key::Character(c) => Some(c.to_ascii_lowercase()),
            _ => None,
        }
    }
}

/// A pointer event position in both coordinate spaces.
///
/// `container` is relative to the element hosting the page; `logical` is
/// the document position computed from it with a single view copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub container: Point,
    pub logical: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("Delete"), Key::Delete);
        assert_eq!(Key::from_name("Esc"), Key::Escape);
        assert_eq!(Key::from_name("V").char(), Some('v'));
        assert_eq!(Key::from_name("3"), Key::Character('3'));
        assert_eq!(Key::from_name("F5"), Key::Named("F5".to_string()));
    }

    #[test]
    fn test_command_modifier() {
        assert!(Modifiers::CTRL.command());
        let meta = Modifiers {
            meta: true,
            ..Modifiers::default()
        };
        assert!(meta.command());
        assert!(!Modifiers::NONE.command());
    }
}
