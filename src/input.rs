//! Canvas Input Decoding
//!
//! Turns raw client bytes into typed events. Handles:
//! - Mouse reports in the decimal xterm encoding (`ESC [ Cb ; Cx ; Cy M`)
//! - Arrow keys (`ESC [ A` .. `ESC [ D`)
//! - Single-byte characters
//!
//! The decoders are pure functions of one byte sequence and report a
//! malformed sequence by returning `None`. Characters are decoded one byte
//! at a time; multi-byte UTF-8 input is not assembled.

use serde::{Deserialize, Serialize};

const ESC: u8 = 0x1b;

/// Raw button and position bytes after `ESC [ M` in an X10 mouse report
const X10_MOUSE_BYTES: usize = 3;

/// Mouse report kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseKind {
    Click,
    Move,
    Scroll,
}

/// Modifier keys held during a mouse report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub meta: bool,
    pub ctrl: bool,
}

/// A decoded mouse report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseEvent {
    #[serde(rename = "type")]
    pub kind: MouseKind,
    /// 0/1/2 = left/middle/right, 3 = release. For scroll reports 0 is wheel up.
    pub button: u8,
    /// Column within the viewport, 0-based and unvalidated
    pub x: i32,
    /// Row within the viewport, 0-based and unvalidated
    pub y: i32,
    #[serde(flatten)]
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// Button bits value reported when buttons are released
    pub const RELEASE: u8 = 3;

    pub fn is_release(&self) -> bool {
        self.button == Self::RELEASE
    }
}

/// Arrow key directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A decoded key press. Key events carry no modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyEvent {
    Character { key: char },
    Arrow { key: Direction },
}

/// Any decoded input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputEvent {
    Mouse(MouseEvent),
    Key(KeyEvent),
}

impl InputEvent {
    /// Single-line JSON form, as written to the input log
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Decode one mouse report: `ESC [ Cb ; Cx ; Cy M`
pub fn parse_xterm_mouse_input(buf: &[u8]) -> Option<MouseEvent> {
    if buf.len() < 3 || buf[0] != ESC || buf[1] != b'[' || buf[buf.len() - 1] != b'M' {
        return None;
    }

    let params = std::str::from_utf8(&buf[2..buf.len() - 1]).ok()?;
    let fields: Vec<&str> = params.split(';').collect();
    if fields.len() < 3 {
        return None;
    }

    let cb = fields[0].parse::<u32>().ok()?.checked_sub(32)?;
    let x = fields[1].parse::<i32>().ok()?.saturating_sub(1);
    let y = fields[2].parse::<i32>().ok()?.saturating_sub(1);

    let kind = if cb & 0x40 != 0 {
        MouseKind::Scroll
    } else if cb & 0x20 != 0 {
        MouseKind::Move
    } else {
        MouseKind::Click
    };

    Some(MouseEvent {
        kind,
        button: (cb & 0x03) as u8,
        x,
        y,
        modifiers: Modifiers {
            shift: cb & 0x04 != 0,
            meta: cb & 0x08 != 0,
            ctrl: cb & 0x10 != 0,
        },
    })
}

/// Decode one key: an arrow escape triple, or else the first byte as a character
pub fn parse_key_input(buf: &[u8]) -> Option<KeyEvent> {
    let first = *buf.first()?;

    if let [ESC, b'[', final_byte] = buf {
        let key = match final_byte {
            b'A' => Some(Direction::Up),
            b'B' => Some(Direction::Down),
            b'C' => Some(Direction::Right),
            b'D' => Some(Direction::Left),
            _ => None,
        };
        if let Some(key) = key {
            return Some(KeyEvent::Arrow { key });
        }
    }

    Some(KeyEvent::Character { key: first as char })
}

/// Decode one input unit, trying the mouse decoder before the key decoder
pub fn decode_input(unit: &[u8]) -> Option<InputEvent> {
    if let Some(mouse) = parse_xterm_mouse_input(unit) {
        return Some(InputEvent::Mouse(mouse));
    }
    parse_key_input(unit).map(InputEvent::Key)
}

/// Split a read into input units: each `ESC [` sequence up to and including
/// its final byte, and every other byte on its own. An X10 mouse report
/// (`ESC [ M` plus three raw bytes) stays one unit; it is not decoded.
pub fn split_sequences(buf: &[u8]) -> Sequences<'_> {
    Sequences { rest: buf }
}

/// Iterator returned by [`split_sequences`]
pub struct Sequences<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Sequences<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }

        let len = if self.rest.len() >= 2 && self.rest[0] == ESC && self.rest[1] == b'[' {
            // CSI final bytes are 0x40..=0x7e
            let len = self.rest[2..]
                .iter()
                .position(|b| (0x40..=0x7e).contains(b))
                .map(|pos| pos + 3)
                .unwrap_or(self.rest.len());
            if len == 3 && self.rest[2] == b'M' {
                // X10 mouse report: three raw bytes follow the M
                (len + X10_MOUSE_BYTES).min(self.rest.len())
            } else {
                len
            }
        } else {
            1
        };

        let (unit, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(unit)
    }
}

/// Decode every event in a read
pub fn decode_all(buf: &[u8]) -> Vec<InputEvent> {
    split_sequences(buf).filter_map(decode_input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click() {
        let event = parse_xterm_mouse_input(b"\x1b[32;5;10M").unwrap();
        assert_eq!(
            event,
            MouseEvent {
                kind: MouseKind::Click,
                button: 0,
                x: 4,
                y: 9,
                modifiers: Modifiers::default(),
            }
        );
    }

    #[test]
    fn test_click_serialized_shape() {
        let event = parse_xterm_mouse_input(b"\x1b[32;5;10M").unwrap();
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            serde_json::json!({
                "type": "click",
                "button": 0,
                "x": 4,
                "y": 9,
                "shift": false,
                "meta": false,
                "ctrl": false,
            })
        );
    }

    #[test]
    fn test_input_event_json() {
        let key = InputEvent::Key(KeyEvent::Character { key: 'q' });
        assert_eq!(key.to_json(), r#"{"type":"character","key":"q"}"#);

        let arrow = InputEvent::Key(KeyEvent::Arrow { key: Direction::Left });
        assert_eq!(arrow.to_json(), r#"{"type":"arrow","key":"left"}"#);

        let click = decode_input(b"\x1b[36;2;3M").unwrap();
        let parsed: InputEvent = serde_json::from_str(&click.to_json()).unwrap();
        assert_eq!(parsed, click);
    }

    #[test]
    fn test_parse_modifiers_and_kinds() {
        // 32 + shift(4) + ctrl(16) + right button(2)
        let event = parse_xterm_mouse_input(b"\x1b[54;1;1M").unwrap();
        assert_eq!(event.kind, MouseKind::Click);
        assert_eq!(event.button, 2);
        assert!(event.modifiers.shift);
        assert!(!event.modifiers.meta);
        assert!(event.modifiers.ctrl);

        // Motion with no button held
        let event = parse_xterm_mouse_input(b"\x1b[67;12;3M").unwrap();
        assert_eq!(event.kind, MouseKind::Move);
        assert!(event.is_release());
        assert_eq!((event.x, event.y), (11, 2));

        // Wheel down
        let event = parse_xterm_mouse_input(b"\x1b[97;1;1M").unwrap();
        assert_eq!(event.kind, MouseKind::Scroll);
        assert_eq!(event.button, 1);
    }

    #[test]
    fn test_scroll_wins_over_move() {
        // 32 + 64 + 32
        let event = parse_xterm_mouse_input(b"\x1b[128;1;1M").unwrap();
        assert_eq!(event.kind, MouseKind::Scroll);
    }

    #[test]
    fn test_mouse_wrong_terminator() {
        assert_eq!(parse_xterm_mouse_input(&[27, 91, 60, 48, 59, 49, 59, 49, 109]), None);
        assert_eq!(parse_xterm_mouse_input(b"\x1b[32;5;10m"), None);
        assert_eq!(parse_xterm_mouse_input(b"\x1b[A"), None);
    }

    #[test]
    fn test_mouse_malformed() {
        assert_eq!(parse_xterm_mouse_input(b"\x1b[M"), None);
        assert_eq!(parse_xterm_mouse_input(b"\x1b[32;5M"), None);
        assert_eq!(parse_xterm_mouse_input(b"\x1b[<0;5;10M"), None);
        assert_eq!(parse_xterm_mouse_input(b"\x1b[12;5;10M"), None);
        assert_eq!(parse_xterm_mouse_input(b"32;5;10M"), None);
    }

    #[test]
    fn test_mouse_coordinates_unclamped() {
        let event = parse_xterm_mouse_input(b"\x1b[32;0;0M").unwrap();
        assert_eq!((event.x, event.y), (-1, -1));
    }

    #[test]
    fn test_parse_arrow_keys() {
        assert_eq!(parse_key_input(&[27, 91, 65]), Some(KeyEvent::Arrow { key: Direction::Up }));
        assert_eq!(parse_key_input(b"\x1b[B"), Some(KeyEvent::Arrow { key: Direction::Down }));
        assert_eq!(parse_key_input(b"\x1b[C"), Some(KeyEvent::Arrow { key: Direction::Right }));
        assert_eq!(parse_key_input(b"\x1b[D"), Some(KeyEvent::Arrow { key: Direction::Left }));
    }

    #[test]
    fn test_parse_character() {
        assert_eq!(parse_key_input(&[113]), Some(KeyEvent::Character { key: 'q' }));
        // Only the first byte counts
        assert_eq!(parse_key_input("é".as_bytes()), Some(KeyEvent::Character { key: '\u{c3}' }));
        assert_eq!(parse_key_input(b""), None);
    }

    #[test]
    fn test_split_sequences() {
        let units: Vec<&[u8]> = split_sequences(b"ab\x1b[A\x1b[35;2;3Mq").collect();
        assert_eq!(
            units,
            vec![&b"a"[..], &b"b"[..], &b"\x1b[A"[..], &b"\x1b[35;2;3M"[..], &b"q"[..]]
        );
    }

    #[test]
    fn test_split_unterminated() {
        let units: Vec<&[u8]> = split_sequences(b"\x1b[12;3").collect();
        assert_eq!(units, vec![&b"\x1b[12;3"[..]]);
    }

    #[test]
    fn test_decode_all() {
        let events = decode_all(b"\x1b[67;1;1M\x1b[67;2;1Mw");
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], InputEvent::Mouse(MouseEvent { kind: MouseKind::Move, x: 0, .. })));
        assert!(matches!(events[1], InputEvent::Mouse(MouseEvent { kind: MouseKind::Move, x: 1, .. })));
        assert_eq!(events[2], InputEvent::Key(KeyEvent::Character { key: 'w' }));
    }

    #[test]
    fn test_x10_mouse_report_is_one_unit() {
        // Column 80 encodes as 'q', row 0 as '!'
        let units: Vec<&[u8]> = split_sequences(b"\x1b[MCq!w").collect();
        assert_eq!(units, vec![&b"\x1b[MCq!"[..], &b"w"[..]]);

        let events = decode_all(b"\x1b[MCq!\x1b[MCd!");
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| *e == InputEvent::Key(KeyEvent::Character { key: '\x1b' })));
    }

    #[test]
    fn test_x10_mouse_report_cut_short() {
        let units: Vec<&[u8]> = split_sequences(b"\x1b[M ").collect();
        assert_eq!(units, vec![&b"\x1b[M "[..]]);
    }
}
