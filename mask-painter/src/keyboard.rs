//! Key bindings of the batch editor as a plain lookup table, independent of any UI toolkit.

use crate::stroke::Tool;

/// Keys the editor reacts to. Everything else maps to [`Key::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Space,
    B,
    C,
    E,
    R,
    Z,
    OpenBracket,
    CloseBracket,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Ctrl, or Cmd on macOS.
    pub command: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Focus sits in a text field; the editor must not steal the key.
    pub in_text_input: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
            in_text_input: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextImage,
    PreviousImage,
    SubmitAll,
    SelectTool(Tool),
    ClearMask,
    ApplyMaskToAll,
    ShrinkBrush,
    GrowBrush,
    Undo,
    Redo,
}

/// A matched binding. The key event should not reach the default handler (page scrolling etc.)
/// when `prevent_default` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub command: Command,
    pub prevent_default: bool,
}

pub fn dispatch(press: KeyPress) -> Option<Binding> {
    if press.in_text_input {
        return None;
    }
    let Modifiers { command: cmd, shift } = press.modifiers;
    let command = match (press.key, cmd) {
        (Key::Z, true) if shift => Command::Redo,
        (Key::Z, true) => Command::Undo,
        (_, true) => return None,
        (Key::ArrowRight, false) => Command::NextImage,
        (Key::ArrowLeft, false) => Command::PreviousImage,
        (Key::Space, false) => Command::SubmitAll,
        (Key::B, false) => Command::SelectTool(Tool::Brush),
        (Key::E, false) => Command::SelectTool(Tool::Eraser),
        (Key::R, false) => Command::ClearMask,
        (Key::C, false) => Command::ApplyMaskToAll,
        (Key::OpenBracket, false) => Command::ShrinkBrush,
        (Key::CloseBracket, false) => Command::GrowBrush,
        (Key::Z | Key::Other, false) => return None,
    };
    Some(Binding {
        command,
        prevent_default: true,
    })
}

/// Shortcut legend, in display order.
pub const LEGEND: &[(&str, &str)] = &[
    ("\u{2190}", "Previous"),
    ("\u{2192}", "Next"),
    ("Space", "Process"),
    ("B", "Brush"),
    ("E", "Eraser"),
    ("R", "Reset"),
    ("C", "Apply to all"),
    ("[ ]", "Brush size"),
    ("Ctrl+Z", "Undo"),
];
