//! Adapter for `embedded-io` serial ports
//!
//! Buffered UART drivers (embassy-rp, embassy-stm32, ...) implement the
//! `embedded-io` traits. [`IoPort`] turns any of them into a
//! [`ByteSource`]/[`ByteSink`] pair.

use embedded_io::{Read, ReadReady, Write};

use crate::uart::{ByteSink, ByteSource};

/// Wraps an `embedded-io` port
///
/// Reads are only attempted when [`ReadReady`] reports data, so polling the
/// source never blocks.
pub struct IoPort<T> {
    inner: T,
}

impl<T> IoPort<T> {
    /// Wrap a port
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Access the wrapped port
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap the port
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + ReadReady> ByteSource for IoPort<T> {
    type Error = T::Error;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.inner.read_ready()? {
            return Ok(None);
        }

        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

impl<T: Write> ByteSink for IoPort<T> {
    type Error = T::Error;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_io::ErrorType;
    use heapless::Vec;

    /// Port that holds a fixed receive script and records writes
    struct ScriptedPort {
        rx: &'static [u8],
        pos: usize,
        tx: Vec<u8, 32>,
    }

    impl ErrorType for ScriptedPort {
        type Error = Infallible;
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.rx.len() - self.pos);
            buf[..n].copy_from_slice(&self.rx[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl ReadReady for ScriptedPort {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(self.pos < self.rx.len())
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.tx.capacity() - self.tx.len());
            let _ = self.tx.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_reads_one_byte_at_a_time() {
        let mut port = IoPort::new(ScriptedPort {
            rx: b"<x",
            pos: 0,
            tx: Vec::new(),
        });

        assert_eq!(port.read_byte(), Ok(Some(b'<')));
        assert_eq!(port.read_byte(), Ok(Some(b'x')));
        assert_eq!(port.read_byte(), Ok(None));
    }

    #[test]
    fn test_writes_pass_through() {
        let mut port = IoPort::new(ScriptedPort {
            rx: b"",
            pos: 0,
            tx: Vec::new(),
        });

        port.write_all(b":FF\r\n").unwrap();
        ByteSink::flush(&mut port).unwrap();

        assert_eq!(&port.into_inner().tx[..], b":FF\r\n");
    }
}
