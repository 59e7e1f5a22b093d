//! Frame checksum slot
//!
//! Every frame carries a two-hex-digit checksum field. The reference
//! behaviour leaves it unchecked: senders write `FF` and receivers accept any
//! value. [`Xor8`] is available for links where both peers opt in.

/// Checksum algorithm run over the decoded payload bytes
pub trait Checksum {
    /// Start a new frame
    fn reset(&mut self);

    /// Feed one payload byte
    fn update(&mut self, byte: u8);

    /// Value to transmit for the bytes fed so far
    fn finish(&self) -> u8;

    /// Check a received checksum against the bytes fed so far
    fn verify(&self, received: u8) -> bool {
        self.finish() == received
    }
}

/// No verification: always sends `FF`, accepts anything
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl Unchecked {
    /// Placeholder value written on send
    pub const PLACEHOLDER: u8 = 0xFF;
}

impl Checksum for Unchecked {
    fn reset(&mut self) {}

    fn update(&mut self, _byte: u8) {}

    fn finish(&self) -> u8 {
        Self::PLACEHOLDER
    }

    fn verify(&self, _received: u8) -> bool {
        true
    }
}

/// XOR of all payload bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct Xor8 {
    acc: u8,
}

impl Checksum for Xor8 {
    fn reset(&mut self) {
        self.acc = 0;
    }

    fn update(&mut self, byte: u8) {
        self.acc ^= byte;
    }

    fn finish(&self) -> u8 {
        self.acc
    }
}
