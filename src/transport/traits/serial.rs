//! Minimal abstraction for a serial device split into a reader and a writer.
//! Lets the link layer plug into a UART driver, a host tty, or an in-memory
//! pipe in tests.
use futures_util::Future;

/// Receive half of a serial device.
pub trait SerialRead {
    type Error: core::fmt::Debug;
    /// Wait for incoming bytes and copy them into `buf`.
    ///
    /// Returns the number of bytes written into `buf`; zero is allowed and
    /// simply means nothing arrived.
    fn read<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;
}

/// Transmit half of a serial device. Writes block until every byte is
/// accepted by the driver.
pub trait SerialWrite {
    type Error: core::fmt::Debug;
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Factory opening a serial device by path.
pub trait SerialOpen {
    type Reader: SerialRead;
    type Writer: SerialWrite;
    type Error: core::fmt::Debug;
    fn open(&mut self, path: &str) -> Result<(Self::Reader, Self::Writer), Self::Error>;
}
