//! Incremental frame writer
//!
//! A frame is built with [`FrameWriter::start_frame`], any number of
//! `send_*` calls and [`FrameWriter::end_frame`]. The writer only remembers
//! which payload encoding is open; bytes go straight to the sink.
//!
//! At most one frame is in flight. Starting another while one is open is
//! rejected with [`EncodeError::Busy`]; callers poll [`FrameWriter::can_send`].

use littleless_hal::ByteSink;

use crate::checksum::{Checksum, Unchecked};
use crate::command::{CommandId, CommandTable};
use crate::frame::{MsgType, ESCAPE, FIELD_SEPARATOR, LINE_END, MAX_PAYLOAD_SIZE, QUOTE};
use crate::hex::byte_to_hex;

/// Errors from frame encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError<E> {
    /// A frame is already being written
    Busy,
    /// The command id has no wire name; an aborted frame was emitted
    UnknownCommand,
    /// Payload written outside a frame
    NotStarted,
    /// Payload does not fit the one-byte length field
    PayloadTooLarge,
    /// The sink failed
    Sink(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum WriteState {
    /// No frame open
    Idle,
    /// Payload open, hex encoding
    Binary,
    /// Payload open, inside a quoted ASCII run
    Ascii,
}

/// Stateful frame encoder
#[derive(Debug, Clone)]
pub struct FrameWriter<C = Unchecked> {
    state: WriteState,
    declared: u8,
    sent: usize,
    checksum: C,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    /// Create a writer that sends the `FF` checksum placeholder
    pub fn new() -> Self {
        Self::with_checksum(Unchecked)
    }
}

impl<C: Checksum> FrameWriter<C> {
    /// Create a writer computing checksums with `checksum`
    pub fn with_checksum(checksum: C) -> Self {
        Self {
            state: WriteState::Idle,
            declared: 0,
            sent: 0,
            checksum,
        }
    }

    /// Returns true if a new frame can be started
    pub fn can_send(&self) -> bool {
        self.state == WriteState::Idle
    }

    /// Write the frame header: type, command name and declared length
    pub fn start_frame<S, T>(
        &mut self,
        sink: &mut S,
        table: &T,
        msg_type: MsgType,
        cmd: CommandId,
        len: u8,
    ) -> Result<(), EncodeError<S::Error>>
    where
        S: ByteSink + ?Sized,
        T: CommandTable + ?Sized,
    {
        if !self.can_send() {
            warn!("start_frame while busy, cmd {}", cmd);
            return Err(EncodeError::Busy);
        }

        emit(sink, &[msg_type.to_wire()])?;

        let Some(name) = table.describe(cmd) else {
            warn!("no wire name for cmd {}, aborting frame", cmd);
            self.abort_frame(sink)?;
            return Err(EncodeError::UnknownCommand);
        };

        let [n0, n1, n2] = *name.as_bytes();
        let [l0, l1] = byte_to_hex(len);
        emit(
            sink,
            &[n0, n1, n2, FIELD_SEPARATOR, l0, l1, FIELD_SEPARATOR],
        )?;

        self.state = WriteState::Binary;
        self.declared = len;
        self.sent = 0;
        self.checksum.reset();
        Ok(())
    }

    /// Send one payload byte as two hex digits
    pub fn send_byte<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        byte: u8,
    ) -> Result<(), EncodeError<S::Error>> {
        self.enter_binary(sink)?;
        emit(sink, &byte_to_hex(byte))?;
        self.count(byte);
        Ok(())
    }

    /// Send one payload byte, as literal ASCII when printable
    pub fn send_char<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        c: u8,
    ) -> Result<(), EncodeError<S::Error>> {
        if !(b' '..=0x7F).contains(&c) {
            return self.send_byte(sink, c);
        }

        self.enter_ascii(sink)?;
        if c == ESCAPE || c == QUOTE {
            emit(sink, &[ESCAPE, c])?;
        } else {
            emit(sink, &[c])?;
        }
        self.count(c);
        Ok(())
    }

    /// Send bytes, all hex encoded
    pub fn send_data<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        data: &[u8],
    ) -> Result<(), EncodeError<S::Error>> {
        for &byte in data {
            self.send_byte(sink, byte)?;
        }
        Ok(())
    }

    /// Send bytes, printable runs quoted, and close the run afterwards
    pub fn send_str<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
        s: &[u8],
    ) -> Result<(), EncodeError<S::Error>> {
        for &c in s {
            self.send_char(sink, c)?;
        }
        self.enter_binary(sink)
    }

    /// Close the payload, write the checksum and the line terminator
    ///
    /// The terminator is written in every case, even without an open frame,
    /// and the writer is idle afterwards.
    pub fn end_frame<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), EncodeError<S::Error>> {
        let trailer = if self.state == WriteState::Idle {
            Ok(())
        } else {
            if self.sent != self.declared as usize {
                warn!(
                    "frame ended with {} payload bytes, {} declared",
                    self.sent,
                    self.declared
                );
            }
            self.write_trailer(sink)
        };
        let end = self.abort_frame(sink);
        trailer.and(end)
    }

    /// Terminate the current line immediately and return to idle
    ///
    /// The peer sees an incomplete frame and drops it.
    pub fn abort_frame<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), EncodeError<S::Error>> {
        self.state = WriteState::Idle;
        emit(sink, &LINE_END)
    }

    /// Write a complete frame
    ///
    /// Printable payload bytes travel as quoted ASCII, the rest as hex.
    pub fn send_frame<S, T>(
        &mut self,
        sink: &mut S,
        table: &T,
        msg_type: MsgType,
        cmd: CommandId,
        payload: &[u8],
    ) -> Result<(), EncodeError<S::Error>>
    where
        S: ByteSink + ?Sized,
        T: CommandTable + ?Sized,
    {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(EncodeError::PayloadTooLarge);
        }
        self.start_frame(sink, table, msg_type, cmd, payload.len() as u8)?;
        if let Err(e) = self.send_str(sink, payload) {
            let _ = self.abort_frame(sink);
            return Err(e);
        }
        self.end_frame(sink)
    }

    fn write_trailer<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), EncodeError<S::Error>> {
        self.enter_binary(sink)?;
        let [c0, c1] = byte_to_hex(self.checksum.finish());
        emit(sink, &[FIELD_SEPARATOR, c0, c1])
    }

    fn enter_binary<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), EncodeError<S::Error>> {
        match self.state {
            WriteState::Binary => Ok(()),
            WriteState::Ascii => {
                self.state = WriteState::Binary;
                emit(sink, &[QUOTE])
            }
            WriteState::Idle => Err(EncodeError::NotStarted),
        }
    }

    fn enter_ascii<S: ByteSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), EncodeError<S::Error>> {
        match self.state {
            WriteState::Ascii => Ok(()),
            WriteState::Binary => {
                self.state = WriteState::Ascii;
                emit(sink, &[QUOTE])
            }
            WriteState::Idle => Err(EncodeError::NotStarted),
        }
    }

    fn count(&mut self, byte: u8) {
        self.sent += 1;
        self.checksum.update(byte);
    }
}

fn emit<S: ByteSink + ?Sized>(sink: &mut S, bytes: &[u8]) -> Result<(), EncodeError<S::Error>> {
    sink.write_all(bytes).map_err(EncodeError::Sink)
}
