//! Screen updates
//!
//! Compares a new frame with the one the client is currently showing and
//! emits only the rows that changed. A missing previous frame or a change
//! of dimensions forces a full redraw.

use bytes::{BufMut, BytesMut};

use super::frame::Frame;
use super::{move_to_row, CURSOR_HOME, HIDE_CURSOR};

/// Help text written over the first row after every render
pub const STATUS_LINE: &str =
    " Telnet Canvas | click: draw  shift+click: erase  arrows/wasd: pan  wheel: zoom  q: quit ";

/// Produce the bytes that take the client from `previous` to `frame`
pub fn render_screen(previous: Option<&Frame>, frame: &Frame) -> BytesMut {
    let mut output = BytesMut::with_capacity(frame.len() + STATUS_LINE.len() + 16);

    match previous {
        Some(prev) if prev.same_dimensions(frame) => {
            for (row, (old, new)) in prev.lines().zip(frame.lines()).enumerate() {
                if old != new {
                    output.put_slice(move_to_row(row).as_bytes());
                    output.put_slice(new.as_bytes());
                }
            }
        }
        _ => {
            output.put_slice(CURSOR_HOME.as_bytes());
            output.put_slice(frame.as_str().as_bytes());
            output.put_slice(HIDE_CURSOR.as_bytes());
        }
    }

    // Status line always goes back on top
    output.put_slice(CURSOR_HOME.as_bytes());
    let status_len = STATUS_LINE.len().min(frame.width);
    output.put_slice(&STATUS_LINE.as_bytes()[..status_len]);

    output
}
