//! Incremental frame reader
//!
//! Consumes one received byte per call and drives the handler callbacks.
//!
//! ```text
//! Type → Command(3) → ':' → Length(2 hex) → ':' → Body → ':' → Checksum(2 hex) → Done
//!                                                  │
//!                            Binary ⇄ Ascii ⇄ AsciiEscape   (toggled by '"')
//! ```
//!
//! Any unexpected character moves to `Error`, where input is ignored until
//! the next line terminator. A `\r` or `\n` always ends the current attempt.
//! Handlers only hear about frames they accepted: a failure before the
//! length was accepted is dropped silently.

use heapless::Vec;

use crate::checksum::{Checksum, Unchecked};
use crate::command::{CommandId, CommandName};
use crate::frame::{
    Finished, FrameHeader, FrameOutcome, MsgType, ESCAPE, FIELD_SEPARATOR, QUOTE,
};
use crate::handler::{Dispatch, MAX_CHUNK_SIZE};
use crate::hex::{HexDigit, HexPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ReadState {
    /// Waiting for a message type character
    Type,
    /// Collecting the three command characters
    Command,
    /// ':' after the command
    LengthSeparator,
    /// Two hex digits of declared length
    Length,
    /// ':' after the length; the frame is accepted from here on
    BodySeparator,
    /// Hex byte pairs
    Binary,
    /// Quoted ASCII run
    Ascii,
    /// Character after '\' inside a quoted run
    AsciiEscape,
    /// ':' after the payload
    ChecksumSeparator,
    /// Two hex digits of checksum
    Checksum,
    /// Complete, waiting for the line terminator
    Done,
    /// Discarding input until the line terminator
    Error,
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameReader<C = Unchecked> {
    state: ReadState,
    msg_type: Option<MsgType>,
    name: [u8; 3],
    name_len: usize,
    cmd: Option<CommandId>,
    hex: HexPair,
    /// Set once a handler accepted the frame
    accepted: Option<FrameHeader>,
    chunk: Vec<u8, MAX_CHUNK_SIZE>,
    chunk_size: usize,
    /// Payload bytes already delivered in earlier chunks
    offset: usize,
    checksum: C,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Create a reader that leaves the checksum unchecked
    pub fn new() -> Self {
        Self::with_checksum(Unchecked)
    }
}

impl<C: Checksum> FrameReader<C> {
    /// Create a reader verifying frames with `checksum`
    pub fn with_checksum(checksum: C) -> Self {
        Self {
            state: ReadState::Type,
            msg_type: None,
            name: [0; 3],
            name_len: 0,
            cmd: None,
            hex: HexPair::new(),
            accepted: None,
            chunk: Vec::new(),
            chunk_size: 1,
            offset: 0,
            checksum,
        }
    }

    /// Returns true between frames
    pub fn is_idle(&self) -> bool {
        self.state == ReadState::Type
    }

    /// Header of the frame currently being received, once accepted
    pub fn current(&self) -> Option<&FrameHeader> {
        self.accepted.as_ref()
    }

    /// Feed a single received byte
    ///
    /// Returns the outcome whenever a handler's finish callback fired.
    pub fn feed<D: Dispatch + ?Sized>(&mut self, byte: u8, dispatch: &mut D) -> Option<Finished> {
        if byte == b'\r' || byte == b'\n' {
            let finished = if self.state == ReadState::Done {
                self.finish(FrameOutcome::Complete, dispatch)
            } else {
                // No-op unless the frame had been accepted
                self.finish(FrameOutcome::Truncated, dispatch)
            };
            self.clear();
            return finished;
        }

        match self.state {
            ReadState::Type => match MsgType::from_wire(byte) {
                Some(msg_type) => {
                    self.msg_type = Some(msg_type);
                    self.name_len = 0;
                    self.state = ReadState::Command;
                    None
                }
                None => self.fail(FrameOutcome::Malformed, dispatch),
            },
            ReadState::Command => {
                self.name[self.name_len] = byte;
                self.name_len += 1;
                if self.name_len < self.name.len() {
                    return None;
                }
                match dispatch.resolve(&CommandName::new(self.name)) {
                    Some(cmd) => {
                        self.cmd = Some(cmd);
                        self.state = ReadState::LengthSeparator;
                        None
                    }
                    None => {
                        debug!("unknown command {=[u8]:a}", &self.name[..]);
                        self.fail(FrameOutcome::Malformed, dispatch)
                    }
                }
            }
            ReadState::LengthSeparator => {
                self.expect_separator(byte, ReadState::Length, dispatch)
            }
            ReadState::Length => match self.hex.push(byte) {
                HexDigit::Pending => None,
                HexDigit::Complete(len) => self.open(len, dispatch),
                HexDigit::Invalid => self.fail(FrameOutcome::Malformed, dispatch),
            },
            ReadState::BodySeparator => {
                let next = if self.remaining() == 0 {
                    ReadState::ChecksumSeparator
                } else {
                    ReadState::Binary
                };
                self.expect_separator(byte, next, dispatch)
            }
            ReadState::Binary => {
                if byte == QUOTE {
                    self.hex.reset();
                    self.state = ReadState::Ascii;
                    return None;
                }
                match self.hex.push(byte) {
                    HexDigit::Pending => None,
                    HexDigit::Complete(value) => {
                        if self.push_payload(value, dispatch) {
                            self.hex.reset();
                            self.state = ReadState::ChecksumSeparator;
                        }
                        None
                    }
                    HexDigit::Invalid => self.fail(FrameOutcome::Malformed, dispatch),
                }
            }
            ReadState::Ascii => {
                if byte == QUOTE {
                    self.state = if self.remaining() == 0 {
                        ReadState::ChecksumSeparator
                    } else {
                        ReadState::Binary
                    };
                    None
                } else if self.remaining() == 0 {
                    // More payload than declared
                    self.fail(FrameOutcome::Malformed, dispatch)
                } else if byte == ESCAPE {
                    self.state = ReadState::AsciiEscape;
                    None
                } else {
                    self.push_payload(byte, dispatch);
                    None
                }
            }
            ReadState::AsciiEscape => {
                // The quoted run still has to be closed, even after the last byte
                self.push_payload(byte, dispatch);
                self.state = ReadState::Ascii;
                None
            }
            ReadState::ChecksumSeparator => {
                self.expect_separator(byte, ReadState::Checksum, dispatch)
            }
            ReadState::Checksum => match self.hex.push(byte) {
                HexDigit::Pending => None,
                HexDigit::Complete(value) => {
                    if self.checksum.verify(value) {
                        self.state = ReadState::Done;
                        None
                    } else {
                        debug!("checksum mismatch: got {=u8:X}", value);
                        self.fail(FrameOutcome::ChecksumMismatch, dispatch)
                    }
                }
                HexDigit::Invalid => self.fail(FrameOutcome::Malformed, dispatch),
            },
            ReadState::Done => self.fail(FrameOutcome::Malformed, dispatch),
            ReadState::Error => None,
        }
    }

    /// Feed several bytes, returning the last finish outcome seen
    pub fn feed_bytes<D: Dispatch + ?Sized>(
        &mut self,
        bytes: &[u8],
        dispatch: &mut D,
    ) -> Option<Finished> {
        let mut last = None;
        for &byte in bytes {
            if let Some(finished) = self.feed(byte, dispatch) {
                last = Some(finished);
            }
        }
        last
    }

    /// Payload bytes still expected
    fn remaining(&self) -> usize {
        match self.accepted {
            Some(header) => header.len as usize - self.offset - self.chunk.len(),
            None => 0,
        }
    }

    fn expect_separator<D: Dispatch + ?Sized>(
        &mut self,
        byte: u8,
        next: ReadState,
        dispatch: &mut D,
    ) -> Option<Finished> {
        if byte == FIELD_SEPARATOR {
            self.hex.reset();
            self.state = next;
            None
        } else {
            self.fail(FrameOutcome::Malformed, dispatch)
        }
    }

    /// Declared length read: ask the handler whether it takes the frame
    fn open<D: Dispatch + ?Sized>(&mut self, len: u8, dispatch: &mut D) -> Option<Finished> {
        let (Some(msg_type), Some(cmd)) = (self.msg_type, self.cmd) else {
            return self.fail(FrameOutcome::Malformed, dispatch);
        };
        let header = FrameHeader { msg_type, cmd, len };

        let chunk_size = dispatch
            .handler(cmd)
            .and_then(|handler| handler.accept(&header));

        match chunk_size {
            Some(size) => {
                trace!("accepted {} chunk={}", header, size.get());
                self.accepted = Some(header);
                self.chunk_size = size.get();
                self.offset = 0;
                self.chunk.clear();
                self.checksum.reset();
                self.state = ReadState::BodySeparator;
                None
            }
            None => {
                debug!("frame rejected: {}", header);
                self.fail(FrameOutcome::Malformed, dispatch)
            }
        }
    }

    /// Stage one decoded payload byte
    ///
    /// Returns true once the declared length has been reached.
    fn push_payload<D: Dispatch + ?Sized>(&mut self, byte: u8, dispatch: &mut D) -> bool {
        // Cannot overflow: chunk_size <= MAX_CHUNK_SIZE and full chunks are flushed
        let _ = self.chunk.push(byte);
        self.checksum.update(byte);

        if self.chunk.len() >= self.chunk_size {
            self.flush(dispatch);
        }
        if self.remaining() == 0 {
            self.flush(dispatch);
            true
        } else {
            false
        }
    }

    /// Hand the staged bytes to the handler
    fn flush<D: Dispatch + ?Sized>(&mut self, dispatch: &mut D) {
        if self.chunk.is_empty() {
            return;
        }
        if let Some(header) = self.accepted {
            if let Some(handler) = dispatch.handler(header.cmd) {
                handler.on_chunk(&header, self.offset, &self.chunk);
            }
        }
        self.offset += self.chunk.len();
        self.chunk.clear();
    }

    fn fail<D: Dispatch + ?Sized>(
        &mut self,
        outcome: FrameOutcome,
        dispatch: &mut D,
    ) -> Option<Finished> {
        trace!("frame error in {}", self.state);
        self.state = ReadState::Error;
        self.chunk.clear();
        self.finish(outcome, dispatch)
    }

    /// Deliver the finish callback if the frame had been accepted
    fn finish<D: Dispatch + ?Sized>(
        &mut self,
        outcome: FrameOutcome,
        dispatch: &mut D,
    ) -> Option<Finished> {
        let header = self.accepted.take()?;
        if let Some(handler) = dispatch.handler(header.cmd) {
            handler.on_finish(&header, outcome);
        }
        debug!("frame finished: {} {}", header, outcome);
        Some(Finished { header, outcome })
    }

    /// Back to scanning for a message type
    fn clear(&mut self) {
        self.state = ReadState::Type;
        self.msg_type = None;
        self.name_len = 0;
        self.cmd = None;
        self.hex.reset();
        self.accepted = None;
        self.chunk.clear();
        self.offset = 0;
    }
}
