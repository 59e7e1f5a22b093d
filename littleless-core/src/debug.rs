//! `dbg` command
//!
//! Debug text from the peer is forwarded to the local log. Nothing is sent
//! back.

use littleless_protocol::{ChunkSize, FrameHeader, FrameOutcome, MessageHandler};

/// Handler for the `dbg` command
#[derive(Debug, Default)]
pub struct DebugHandler {
    frames: u32,
    bytes: u32,
}

impl DebugHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete `dbg` frames received
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Payload bytes received, including those of broken frames
    pub fn bytes(&self) -> u32 {
        self.bytes
    }
}

impl MessageHandler for DebugHandler {
    fn accept(&mut self, _header: &FrameHeader) -> Option<ChunkSize> {
        Some(ChunkSize::MAX)
    }

    fn on_chunk(&mut self, _header: &FrameHeader, offset: usize, chunk: &[u8]) {
        info!("peer dbg +{}: {=[u8]:a}", offset, chunk);
        self.bytes = self.bytes.wrapping_add(chunk.len() as u32);
    }

    fn on_finish(&mut self, _header: &FrameHeader, outcome: FrameOutcome) {
        if outcome.is_ok() {
            self.frames = self.frames.wrapping_add(1);
        } else {
            debug!("peer dbg frame dropped: {}", outcome);
        }
    }
}
