//! Transport layer for I/O abstraction

use crate::error::{Error, Result};

pub mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport trait for device communication
///
/// Reads block for at most the transport's configured timeout. A read that
/// times out without data returns `Ok(0)` rather than an error.
pub trait Transport {
    /// Read data into buffer, returns number of bytes read (0 on timeout)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Release the underlying channel
    ///
    /// Calling this more than once must have no further effect.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write the whole buffer, retrying partial writes
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let written = self.write(data)?;
            if written == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "transport accepted no bytes",
                )));
            }
            data = &data[written..];
        }
        Ok(())
    }
}
