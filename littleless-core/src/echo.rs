//! `ech` command
//!
//! A request is buffered and sent back unchanged as a response. Useful for
//! checking a link by hand from a terminal.

use heapless::Vec;
use littleless_hal::ByteSink;
use littleless_protocol::{
    Checksum, ChunkSize, CommandTable, EncodeError, FrameHeader, FrameOutcome, FrameWriter,
    MessageHandler, MsgType, MAX_PAYLOAD_SIZE,
};

use crate::commands::ECHO;

/// Handler for the `ech` command
#[derive(Debug, Default)]
pub struct EchoHandler {
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    pending: bool,
}

impl EchoHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a reply is waiting to be sent
    pub fn has_pending_send(&self) -> bool {
        self.pending
    }

    /// Send the pending reply if the writer is free
    pub fn poll_send<C, S, T>(
        &mut self,
        writer: &mut FrameWriter<C>,
        sink: &mut S,
        table: &T,
    ) -> Result<bool, EncodeError<S::Error>>
    where
        C: Checksum,
        S: ByteSink + ?Sized,
        T: CommandTable + ?Sized,
    {
        if !self.pending || !writer.can_send() {
            return Ok(false);
        }
        self.pending = false;
        writer.send_frame(sink, table, MsgType::Response, ECHO, &self.payload)?;
        Ok(true)
    }
}

impl MessageHandler for EchoHandler {
    fn accept(&mut self, _header: &FrameHeader) -> Option<ChunkSize> {
        if self.pending {
            debug!("echo reply overwritten before it was sent");
            self.pending = false;
        }
        self.payload.clear();
        Some(ChunkSize::MAX)
    }

    fn on_chunk(&mut self, _header: &FrameHeader, _offset: usize, chunk: &[u8]) {
        // declared length never exceeds MAX_PAYLOAD_SIZE
        let _ = self.payload.extend_from_slice(chunk);
    }

    fn on_finish(&mut self, header: &FrameHeader, outcome: FrameOutcome) {
        if outcome.is_ok() && header.msg_type == MsgType::Request {
            self.pending = true;
        } else {
            self.payload.clear();
        }
    }
}
