//! Hex digit primitives
//!
//! Lengths, binary payload bytes and checksums travel as pairs of ASCII hex
//! digits. Both cases are accepted on input; output is always uppercase.

/// Convert the low nibble of `nibble` to its uppercase ASCII hex digit
pub const fn nibble_to_hex(nibble: u8) -> u8 {
    let n = nibble & 0x0F;
    if n < 10 {
        b'0' + n
    } else {
        b'A' + n - 10
    }
}

/// Convert an ASCII hex digit to its value
pub const fn hex_to_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Encode a byte as two uppercase hex digits, high nibble first
pub const fn byte_to_hex(byte: u8) -> [u8; 2] {
    [nibble_to_hex(byte >> 4), nibble_to_hex(byte)]
}

/// Result of pushing one character into a [`HexPair`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HexDigit {
    /// First digit stored, waiting for the second
    Pending,
    /// Both digits seen
    Complete(u8),
    /// Not a hex digit
    Invalid,
}

/// Two-digit accumulator shared by every hex field of a frame
///
/// A completed pair is discarded on the next push, so a stale pair from a
/// previous field can never leak into the next one.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HexPair {
    high: u8,
    count: u8,
}

impl HexPair {
    pub(crate) const fn new() -> Self {
        Self { high: 0, count: 0 }
    }

    /// Drop any half-read pair
    pub(crate) fn reset(&mut self) {
        self.count = 0;
    }

    pub(crate) fn push(&mut self, c: u8) -> HexDigit {
        let Some(nibble) = hex_to_nibble(c) else {
            return HexDigit::Invalid;
        };

        if self.count >= 2 {
            self.count = 0;
        }

        if self.count == 0 {
            self.high = nibble;
            self.count = 1;
            HexDigit::Pending
        } else {
            self.count = 2;
            HexDigit::Complete((self.high << 4) | nibble)
        }
    }
}
