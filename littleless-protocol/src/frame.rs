//! Frame vocabulary for the Little Less wire format.
//!
//! Frame format (printable ASCII, one frame per line):
//! ```text
//! <type><cmd3>:<len2hex>:<payload>:<checksum2hex>\r\n
//! ```
//! - TYPE (1 char): `>` request, `<` response, `!` error, `#` update
//! - CMD (3 chars): command name, resolved through a command table
//! - LEN (2 hex digits): decoded payload length (0-255)
//! - PAYLOAD: hex byte pairs and `"`-quoted ASCII runs, freely interleaved;
//!   inside quotes `\` escapes the next character
//! - CHECKSUM (2 hex digits)
//! - a bare `\r` or `\n` terminates the frame

use crate::command::CommandId;

/// Separator between frame fields
pub const FIELD_SEPARATOR: u8 = b':';

/// Toggles between hex and ASCII payload encoding
pub const QUOTE: u8 = b'"';

/// Escapes the next character inside an ASCII run
pub const ESCAPE: u8 = b'\\';

/// Frame terminator sent after every frame
pub const LINE_END: [u8; 2] = *b"\r\n";

/// Maximum decoded payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// Kind of message carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MsgType {
    Request,
    Response,
    Error,
    Update,
}

// Wire characters
const TYPE_REQUEST: u8 = b'>';
const TYPE_RESPONSE: u8 = b'<';
const TYPE_ERROR: u8 = b'!';
const TYPE_UPDATE: u8 = b'#';

impl MsgType {
    /// Parse a message type from its wire character
    pub fn from_wire(c: u8) -> Option<Self> {
        match c {
            TYPE_REQUEST => Some(MsgType::Request),
            TYPE_RESPONSE => Some(MsgType::Response),
            TYPE_ERROR => Some(MsgType::Error),
            TYPE_UPDATE => Some(MsgType::Update),
            _ => None,
        }
    }

    /// Convert to wire character
    pub fn to_wire(self) -> u8 {
        match self {
            MsgType::Request => TYPE_REQUEST,
            MsgType::Response => TYPE_RESPONSE,
            MsgType::Error => TYPE_ERROR,
            MsgType::Update => TYPE_UPDATE,
        }
    }
}

/// Everything known about a frame once its length has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    pub msg_type: MsgType,
    pub cmd: CommandId,
    /// Declared payload length
    pub len: u8,
}

/// How an accepted frame ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// Checksum read and verified, line terminator seen
    Complete,
    /// Unexpected character after the frame was accepted
    Malformed,
    /// Line terminator arrived before the frame was complete
    Truncated,
    /// Checksum field did not verify
    ChecksumMismatch,
}

impl FrameOutcome {
    /// Returns true only for a fully received frame
    pub fn is_ok(&self) -> bool {
        matches!(self, FrameOutcome::Complete)
    }
}

/// A finish notification delivered to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Finished {
    pub header: FrameHeader,
    pub outcome: FrameOutcome,
}
