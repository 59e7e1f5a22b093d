//! Serial byte transport abstractions
//!
//! The protocol is driven one byte at a time by a caller-paced loop, so the
//! receive side never blocks: it either has a byte ready or it does not.

use heapless::{Deque, Vec};

/// Byte receiver
pub trait ByteSource {
    /// Error type for receive operations
    type Error;

    /// Take the next pending byte
    ///
    /// Returns `Ok(None)` when nothing has arrived yet. Must not block.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}

/// Byte transmitter
pub trait ByteSink {
    /// Error type for transmit operations
    type Error;

    /// Write all of `data` to the transport
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    type Error = T::Error;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        T::read_byte(self)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    type Error = T::Error;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write_all(self, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }
}

/// An in-memory sink ran out of capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull;

/// Received bytes queued by an interrupt handler or a test
impl<const N: usize> ByteSource for Deque<u8, N> {
    type Error = core::convert::Infallible;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.pop_front())
    }
}

/// Capture buffer for outgoing bytes
///
/// A write that does not fit is rejected as a whole.
impl<const N: usize> ByteSink for Vec<u8, N> {
    type Error = BufferFull;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(data).map_err(|_| BufferFull)
    }
}
