//! Keyboard shortcut registry and documentation.

use crate::elements::BubbleType;
use crate::input::{Key, Modifiers};
use crate::tools::ToolKind;

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    SelectTool(ToolKind),
    DeleteSelection,
    /// Cancel gesture, disarm placement, or clear selection.
    Escape,
    RestyleBubbles(BubbleType),
    Duplicate,
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ResetView,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, ctrl: bool, shift: bool, description: &'static str) -> Self {
        Self {
            key,
            ctrl,
            shift,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+D").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("V", false, false, "Select tool"),
            Shortcut::new("P", false, false, "Panel tool"),
            Shortcut::new("B", false, false, "Dialogue bubble tool"),
            Shortcut::new("T", false, false, "Text tool"),
            Shortcut::new("H", false, false, "Pan tool"),
            Shortcut::new("Z", false, false, "Zoom tool"),
            Shortcut::new("Delete", false, false, "Delete selection"),
            Shortcut::new("Backspace", false, false, "Delete selection"),
            Shortcut::new("Escape", false, false, "Cancel gesture or clear selection"),
            Shortcut::new("1-5", false, false, "Restyle selected bubbles (speech, thought, shout, whisper, narration)"),
            Shortcut::new("D", true, false, "Duplicate selection"),
            Shortcut::new("Z", true, false, "Undo"),
            Shortcut::new("Z", true, true, "Redo"),
            Shortcut::new("Y", true, false, "Redo"),
            Shortcut::new("+", false, false, "Zoom in"),
            Shortcut::new("-", false, false, "Zoom out"),
            Shortcut::new("0", false, false, "Reset view"),
        ]
    }

    /// Resolve a key press to an action.
    pub fn resolve(key: &Key, modifiers: Modifiers) -> Option<ShortcutAction> {
        match key {
            Key::Delete | Key::Backspace => return Some(ShortcutAction::DeleteSelection),
            Key::Escape => return Some(ShortcutAction::Escape),
            _ => {}
        }
        let c = key.char()?;

        if modifiers.command() {
            return match (c, modifiers.shift) {
                ('z', false) => Some(ShortcutAction::Undo),
                ('z', true) | ('y', false) => Some(ShortcutAction::Redo),
                ('d', false) => Some(ShortcutAction::Duplicate),
                ('0', false) => Some(ShortcutAction::ResetView),
                _ => None,
            };
        }
        if modifiers.alt {
            return None;
        }

        match c {
            'v' => Some(ShortcutAction::SelectTool(ToolKind::Select)),
            'p' => Some(ShortcutAction::SelectTool(ToolKind::Panel)),
            'b' => Some(ShortcutAction::SelectTool(ToolKind::Dialogue)),
            't' => Some(ShortcutAction::SelectTool(ToolKind::Text)),
            'h' => Some(ShortcutAction::SelectTool(ToolKind::Pan)),
            'z' => Some(ShortcutAction::SelectTool(ToolKind::Zoom)),
            '+' | '=' => Some(ShortcutAction::ZoomIn),
            '-' => Some(ShortcutAction::ZoomOut),
            '0' => Some(ShortcutAction::ResetView),
            '1'..='5' => {
                let digit = c.to_digit(10).and_then(|d| u8::try_from(d).ok())?;
                BubbleType::from_digit(digit).map(ShortcutAction::RestyleBubbles)
            }
            _ => None,
        }
    }

    /// Log all shortcuts.
    pub fn log_all() {
        for shortcut in Self::all() {
            log::info!("  {:20} {}", shortcut.format(), shortcut.description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(Shortcut::new("Z", true, true, "Redo").format(), "Ctrl+Shift+Z");
        assert_eq!(Shortcut::new("V", false, false, "Select").format(), "V");
    }

    #[test]
    fn test_resolve() {
        let plain = Modifiers::NONE;
        assert_eq!(
            ShortcutRegistry::resolve(&Key::Character('P'), plain),
            Some(ShortcutAction::SelectTool(ToolKind::Panel))
        );
        assert_eq!(ShortcutRegistry::resolve(&Key::Backspace, plain), Some(ShortcutAction::DeleteSelection));
        assert_eq!(
            ShortcutRegistry::resolve(&Key::Character('3'), plain),
            Some(ShortcutAction::RestyleBubbles(BubbleType::Shout))
        );
        assert_eq!(ShortcutRegistry::resolve(&Key::Character('6'), plain), None);
        assert_eq!(ShortcutRegistry::resolve(&Key::Character('z'), Modifiers::CTRL), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutRegistry::resolve(&Key::Character('Z'), Modifiers::CTRL_SHIFT), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::resolve(&Key::Character('y'), Modifiers::CTRL), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::resolve(&Key::Character('d'), Modifiers::CTRL), Some(ShortcutAction::Duplicate));
        assert_eq!(ShortcutRegistry::resolve(&Key::Character('z'), plain), Some(ShortcutAction::SelectTool(ToolKind::Zoom)));
    }

    #[test]
    fn test_every_action_is_documented() {
        assert!(ShortcutRegistry::all().len() >= 17);
    }
}
