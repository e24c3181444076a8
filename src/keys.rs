//! Stable key names.
//!
//! Keys are identified two ways:
//! - a **key index**: position in [`KEY_MAP`], stable across releases and backends,
//!   meant for configuration files (`"A"`, `"RIGHTCTRL"`, `"KEYPADENTER"`);
//! - a **key code**: the set-1 scancode with bit 7 set for `E0`-prefixed keys. This
//!   is what keyboard snapshots are indexed by. Raw scancodes fold into it via
//!   [`key_code_from_scancode`]; polling backends reach it through [`KeyDef::vk`].

/// One named key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyDef {
    pub name: &'static str,
    /// Snapshot index (scancode, `| 0x80` for extended keys).
    pub code: u8,
    /// Virtual-key code used by polling backends, when one exists.
    pub vk: Option<u8>,
}

const fn k(name: &'static str, code: u8, vk: u8) -> KeyDef {
    KeyDef {
        name,
        code,
        vk: Some(vk),
    }
}

const fn k_novk(name: &'static str, code: u8) -> KeyDef {
    KeyDef {
        name,
        code,
        vk: None,
    }
}

/// All named keys. Order defines the key index and must not change.
pub static KEY_MAP: &[KeyDef] = &[
    // General keys
    k("BACKSPACE", 0x0E, 0x08),
    k("TAB", 0x0F, 0x09),
    k("RETURN", 0x1C, 0x0D),
    k("PAUSE", 0xC5, 0x13),
    k("ESCAPE", 0x01, 0x1B),
    k("SPACE", 0x39, 0x20),
    k("QUOTE", 0x28, 0xDE),
    k("COMMA", 0x33, 0xBC),
    k("MINUS", 0x0C, 0xBD),
    k("PERIOD", 0x34, 0xBE),
    k("SLASH", 0x35, 0xBF),
    k("0", 0x0B, 0x30),
    k("1", 0x02, 0x31),
    k("2", 0x03, 0x32),
    k("3", 0x04, 0x33),
    k("4", 0x05, 0x34),
    k("5", 0x06, 0x35),
    k("6", 0x07, 0x36),
    k("7", 0x08, 0x37),
    k("8", 0x09, 0x38),
    k("9", 0x0A, 0x39),
    k("SEMICOLON", 0x27, 0xBA),
    k("EQUALS", 0x0D, 0xBB),
    k("LEFTBRACKET", 0x1A, 0xDB),
    k("BACKSLASH", 0x2B, 0xDC),
    k("RIGHTBRACKET", 0x1B, 0xDD),
    k("BACKQUOTE", 0x29, 0xC0),
    k("A", 0x1E, b'A'),
    k("B", 0x30, b'B'),
    k("C", 0x2E, b'C'),
    k("D", 0x20, b'D'),
    k("E", 0x12, b'E'),
    k("F", 0x21, b'F'),
    k("G", 0x22, b'G'),
    k("H", 0x23, b'H'),
    k("I", 0x17, b'I'),
    k("J", 0x24, b'J'),
    k("K", 0x25, b'K'),
    k("L", 0x26, b'L'),
    k("M", 0x32, b'M'),
    k("N", 0x31, b'N'),
    k("O", 0x18, b'O'),
    k("P", 0x19, b'P'),
    k("Q", 0x10, b'Q'),
    k("R", 0x13, b'R'),
    k("S", 0x1F, b'S'),
    k("T", 0x14, b'T'),
    k("U", 0x16, b'U'),
    k("V", 0x2F, b'V'),
    k("W", 0x11, b'W'),
    k("X", 0x2D, b'X'),
    k("Y", 0x15, b'Y'),
    k("Z", 0x2C, b'Z'),
    k("DEL", 0xD3, 0x2E),
    // Keypad
    k("KEYPAD0", 0x52, 0x60),
    k("KEYPAD1", 0x4F, 0x61),
    k("KEYPAD2", 0x50, 0x62),
    k("KEYPAD3", 0x51, 0x63),
    k("KEYPAD4", 0x4B, 0x64),
    k("KEYPAD5", 0x4C, 0x65),
    k("KEYPAD6", 0x4D, 0x66),
    k("KEYPAD7", 0x47, 0x67),
    k("KEYPAD8", 0x48, 0x68),
    k("KEYPAD9", 0x49, 0x69),
    k("KEYPADPERIOD", 0x53, 0x6E),
    k("KEYPADDIVIDE", 0xB5, 0x6F),
    k("KEYPADMULTIPLY", 0x37, 0x6A),
    k("KEYPADMINUS", 0x4A, 0x6D),
    k("KEYPADPLUS", 0x4E, 0x6B),
    // Shares VK_RETURN with RETURN, so polling backends cannot see it.
    k_novk("KEYPADENTER", 0x9C),
    k("KEYPADEQUALS", 0x8D, 0x92),
    // Arrows + Home/End pad
    k("UP", 0xC8, 0x26),
    k("DOWN", 0xD0, 0x28),
    k("RIGHT", 0xCD, 0x27),
    k("LEFT", 0xCB, 0x25),
    k("INSERT", 0xD2, 0x2D),
    k("HOME", 0xC7, 0x24),
    k("END", 0xCF, 0x23),
    k("PGUP", 0xC9, 0x21),
    k("PGDN", 0xD1, 0x22),
    // Function keys
    k("F1", 0x3B, 0x70),
    k("F2", 0x3C, 0x71),
    k("F3", 0x3D, 0x72),
    k("F4", 0x3E, 0x73),
    k("F5", 0x3F, 0x74),
    k("F6", 0x40, 0x75),
    k("F7", 0x41, 0x76),
    k("F8", 0x42, 0x77),
    k("F9", 0x43, 0x78),
    k("F10", 0x44, 0x79),
    k("F11", 0x57, 0x7A),
    k("F12", 0x58, 0x7B),
    k("F13", 0x64, 0x7C),
    k("F14", 0x65, 0x7D),
    k("F15", 0x66, 0x7E),
    // Modifier keys
    k("NUMLOCK", 0x45, 0x90),
    k("CAPSLOCK", 0x3A, 0x14),
    k("SCROLLLOCK", 0x46, 0x91),
    k("RIGHTSHIFT", 0x36, 0xA1),
    k("LEFTSHIFT", 0x2A, 0xA0),
    k("RIGHTCTRL", 0x9D, 0xA3),
    k("LEFTCTRL", 0x1D, 0xA2),
    k("RIGHTALT", 0xB8, 0xA5),
    k("LEFTALT", 0x38, 0xA4),
    k("RIGHTWINDOWS", 0xDC, 0x5C),
    k("LEFTWINDOWS", 0xDB, 0x5B),
    // Other
    k("PRINT", 0xB7, 0x2C),
    k("MENU", 0xDD, 0x5D),
    k_novk("POWER", 0xDE),
];

/// Key code produced for `E1 1D` (Pause/Break).
const PAUSE_CODE: u8 = 0xC5;

/// Case-insensitive lookup of a key name → key index.
pub fn key_index(name: &str) -> Option<usize> {
    KEY_MAP.iter().position(|k| k.name.eq_ignore_ascii_case(name))
}

/// Key index → name.
pub fn key_name(index: usize) -> Option<&'static str> {
    KEY_MAP.get(index).map(|k| k.name)
}

/// Key index → snapshot key code.
#[inline]
pub fn key_code(index: usize) -> Option<u8> {
    KEY_MAP.get(index).map(|k| k.code)
}

/// Fold a hardware scancode and its prefix flags into a key code.
///
/// Returns `None` for codes that cannot be represented (scancodes above `0x7F`).
pub fn key_code_from_scancode(scancode: u16, e0: bool, e1: bool) -> Option<u8> {
    if e1 && scancode == 0x1D {
        return Some(PAUSE_CODE);
    }
    if scancode > 0x7F {
        return None;
    }
    let code = scancode as u8;
    Some(if e0 { code | 0x80 } else { code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_and_codes_are_unique() {
        let names: HashSet<_> = KEY_MAP.iter().map(|k| k.name).collect();
        let codes: HashSet<_> = KEY_MAP.iter().map(|k| k.code).collect();
        assert_eq!(names.len(), KEY_MAP.len());
        assert_eq!(codes.len(), KEY_MAP.len());
    }

    #[test]
    fn lookup_round_trip_ignores_case() {
        let i = key_index("rightctrl").unwrap();
        assert_eq!(key_name(i), Some("RIGHTCTRL"));
        assert_eq!(key_code(i), Some(0x9D));
        assert_eq!(key_index("NOPE"), None);
        assert_eq!(key_name(KEY_MAP.len()), None);
    }

    #[test]
    fn extended_scancodes_set_high_bit() {
        assert_eq!(key_code_from_scancode(0x1D, false, false), Some(0x1D));
        assert_eq!(key_code_from_scancode(0x1D, true, false), Some(0x9D));
        assert_eq!(key_code_from_scancode(0x1C, true, false), key_code(key_index("KEYPADENTER").unwrap()));
        assert_eq!(key_code_from_scancode(0x1D, false, true), Some(PAUSE_CODE));
        assert_eq!(key_code_from_scancode(0x1FF, false, false), None);
    }
}
