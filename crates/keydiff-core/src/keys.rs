//! Key catalog: logical key names and their X11 keycodes.
//!
//! Keycodes follow the X11 convention (Linux evdev code + 8) on a US
//! QWERTY layout, which is what XKB-backed testers resolve when handed an
//! explicit `--keycode`. Shifted symbols share the keycode of their base
//! key. Catalog order is part of the matrix enumeration order and must not
//! be reshuffled.

use serde::Serialize;

/// A single logical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyDescriptor {
    /// Display identifier passed as `--key`
    pub name: String,
    /// Hardware keycode passed as `--keycode` where a target needs one
    pub scan_code: u32,
}

impl KeyDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, scan_code: u32) -> Self {
        Self {
            name: name.into(),
            scan_code,
        }
    }
}

const STANDARD_KEYS: &[(&str, u32)] = &[
    // Letters
    ("a", 38),
    ("b", 56),
    ("c", 54),
    ("d", 40),
    ("e", 26),
    ("f", 41),
    ("g", 42),
    ("h", 43),
    ("i", 31),
    ("j", 44),
    ("k", 45),
    ("l", 46),
    ("m", 58),
    ("n", 57),
    ("o", 32),
    ("p", 33),
    ("q", 24),
    ("r", 27),
    ("s", 39),
    ("t", 28),
    ("u", 30),
    ("v", 55),
    ("w", 25),
    ("x", 53),
    ("y", 29),
    ("z", 52),
    // Number row
    ("1", 10),
    ("2", 11),
    ("3", 12),
    ("4", 13),
    ("5", 14),
    ("6", 15),
    ("7", 16),
    ("8", 17),
    ("9", 18),
    ("0", 19),
    // Punctuation, each unshifted keysym followed by its shifted symbol
    ("`", 49),
    ("~", 49),
    ("minus", 20),
    ("_", 20),
    ("equal", 21),
    ("+", 21),
    ("bracketleft", 34),
    ("{", 34),
    ("bracketright", 35),
    ("}", 35),
    ("backslash", 51),
    ("|", 51),
    ("semicolon", 47),
    (":", 47),
    ("apostrophe", 48),
    ("\"", 48),
    ("comma", 59),
    ("<", 59),
    ("period", 60),
    (">", 60),
    ("slash", 61),
    ("?", 61),
    // Function keys
    ("F1", 67),
    ("F2", 68),
    ("F3", 69),
    ("F4", 70),
    ("F5", 71),
    ("F6", 72),
    ("F7", 73),
    ("F8", 74),
    ("F9", 75),
    ("F10", 76),
    ("F11", 95),
    ("F12", 96),
    // Control keys
    ("Escape", 9),
    ("Tab", 23),
    ("Return", 36),
    ("BackSpace", 22),
    ("space", 65),
    // Navigation
    ("Insert", 118),
    ("Delete", 119),
    ("Home", 110),
    ("End", 115),
    ("Page_Up", 112),
    ("Page_Down", 117),
    // Arrows
    ("Up", 111),
    ("Down", 116),
    ("Left", 113),
    ("Right", 114),
    // Keypad
    ("KP_0", 90),
    ("KP_1", 87),
    ("KP_2", 88),
    ("KP_3", 89),
    ("KP_4", 83),
    ("KP_5", 84),
    ("KP_6", 85),
    ("KP_7", 79),
    ("KP_8", 80),
    ("KP_9", 81),
    ("KP_Home", 79),
    ("KP_End", 87),
];

/// Ordered, immutable key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCatalog {
    keys: Vec<KeyDescriptor>,
}

impl KeyCatalog {
    /// The full US QWERTY catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            keys: STANDARD_KEYS
                .iter()
                .map(|&(name, code)| KeyDescriptor::new(name, code))
                .collect(),
        }
    }

    /// A catalog over an explicit key list, in the given order.
    #[must_use]
    pub fn from_keys(keys: Vec<KeyDescriptor>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyDescriptor> {
        self.keys.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&KeyDescriptor> {
        self.keys.get(index)
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&KeyDescriptor> {
        self.keys.iter().find(|key| key.name == name)
    }
}

impl Default for KeyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a KeyCatalog {
    type Item = &'a KeyDescriptor;
    type IntoIter = std::slice::Iter<'a, KeyDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
