//! Telnet option negotiation
//!
//! Sends the fixed connect handshake and decodes IAC command sequences
//! out of the client byte stream. Application bytes found between
//! commands are handed back so they can go to the input decoders.
//!
//! A command cut off at the end of one read (most often a window-size
//! subnegotiation) is held back and completed by the next read.

use bytes::{BufMut, BytesMut};
use log::warn;

use crate::renderer::ENABLE_MOUSE;

// Telnet protocol constants
pub const IAC: u8 = 255;   // Interpret As Command
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;    // Subnegotiation Begin
pub const SE: u8 = 240;    // Subnegotiation End

/// Telnet option numbers used by the canvas
pub mod option {
    pub const ECHO: u8 = 1;
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    pub const NAWS: u8 = 31;
    pub const LINEMODE: u8 = 34;
}

/// Upper bound on bytes held back while waiting for a subnegotiation to end
const MAX_PENDING: usize = 1024;

/// Bytes sent to every client before anything is read: character-at-a-time
/// mode without local echo, window size reports, then mouse tracking.
pub fn handshake() -> Vec<u8> {
    let mut out = vec![
        IAC, WILL, option::ECHO,              // Server echoes (client must not)
        IAC, DONT, option::LINEMODE,          // No line buffering
        IAC, DO, option::NAWS,                // Report window size
        IAC, WILL, option::SUPPRESS_GO_AHEAD,
        IAC, DO, option::SUPPRESS_GO_AHEAD,
    ];
    out.extend_from_slice(ENABLE_MOUSE.as_bytes());
    out
}

/// A decoded telnet command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetCommand {
    Do(u8),
    Dont(u8),
    Will(u8),
    Wont(u8),
    /// `IAC SB <option> <data> IAC SE`, with `IAC IAC` in the data unescaped
    Subnegotiation { option: u8, data: Vec<u8> },
    /// `IAC SE` seen outside a subnegotiation
    SubnegotiationEnd,
    /// Any other two-byte command (NOP, GA, ...)
    Other(u8),
}

/// Result of feeding bytes to the decoder
#[derive(Debug, Default)]
pub struct Decoded {
    /// Commands in arrival order
    pub commands: Vec<TelnetCommand>,
    /// Application bytes with every command removed
    pub data: BytesMut,
}

enum Scan {
    Command(TelnetCommand, usize),
    EscapedIac,
    Incomplete,
}

/// Stateful telnet decoder, one per connection
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    pending: BytesMut,
}

impl TelnetDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while part of a command is waiting for more bytes
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decode a chunk of client bytes
    pub fn feed(&mut self, bytes: &[u8]) -> Decoded {
        self.pending.extend_from_slice(bytes);
        let buf = self.pending.split();

        let mut decoded = Decoded {
            commands: Vec::new(),
            data: BytesMut::with_capacity(buf.len()),
        };

        let mut i = 0;
        while i < buf.len() {
            if buf[i] != IAC {
                decoded.data.put_u8(buf[i]);
                i += 1;
                continue;
            }

            match scan_command(&buf[i..]) {
                Scan::Command(cmd, len) => {
                    decoded.commands.push(cmd);
                    i += len;
                }
                Scan::EscapedIac => {
                    decoded.data.put_u8(IAC);
                    i += 2;
                }
                Scan::Incomplete => {
                    let rest = &buf[i..];
                    if rest.len() > MAX_PENDING {
                        warn!("Discarding {} bytes of unterminated telnet subnegotiation", rest.len());
                    } else {
                        self.pending.extend_from_slice(rest);
                    }
                    break;
                }
            }
        }

        decoded
    }
}

/// Scan one command starting at an IAC byte
fn scan_command(seq: &[u8]) -> Scan {
    let Some(&cmd) = seq.get(1) else {
        return Scan::Incomplete;
    };

    match cmd {
        DO | DONT | WILL | WONT => match seq.get(2) {
            Some(&opt) => {
                let command = match cmd {
                    DO => TelnetCommand::Do(opt),
                    DONT => TelnetCommand::Dont(opt),
                    WILL => TelnetCommand::Will(opt),
                    _ => TelnetCommand::Wont(opt),
                };
                Scan::Command(command, 3)
            }
            None => Scan::Incomplete,
        },
        SB => {
            let Some(&opt) = seq.get(2) else {
                return Scan::Incomplete;
            };
            let mut data = Vec::new();
            let mut j = 3;
            while j < seq.len() {
                if seq[j] == IAC {
                    match seq.get(j + 1) {
                        Some(&SE) => {
                            return Scan::Command(TelnetCommand::Subnegotiation { option: opt, data }, j + 2);
                        }
                        Some(&b) => {
                            // IAC IAC is a literal 255; anything else keeps only the second byte
                            data.push(b);
                            j += 2;
                        }
                        None => return Scan::Incomplete,
                    }
                } else {
                    data.push(seq[j]);
                    j += 1;
                }
            }
            Scan::Incomplete
        }
        SE => Scan::Command(TelnetCommand::SubnegotiationEnd, 2),
        IAC => Scan::EscapedIac,
        other => Scan::Command(TelnetCommand::Other(other), 2),
    }
}

/// Decode only the negotiation commands contained in a single buffer
pub fn parse_telnet_negotiation(buf: &[u8]) -> Vec<TelnetCommand> {
    TelnetDecoder::new().feed(buf).commands
}

/// Window size from a NAWS payload: (width, height), big-endian
pub fn parse_naws(data: &[u8]) -> Option<(u16, u16)> {
    if data.len() < 4 {
        return None;
    }
    let width = u16::from_be_bytes([data[0], data[1]]);
    let height = u16::from_be_bytes([data[2], data[3]]);
    Some((width, height))
}
