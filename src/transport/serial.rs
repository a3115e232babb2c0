//! Serial transport implementation

use super::Transport;
use crate::error::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Serial transport for UART communication
pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0", "COM6")
    /// * `baud_rate` - Baud rate (e.g., 115200)
    /// * `timeout` - Upper bound for each blocking read
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|source| Error::Connection {
                port: path.to_string(),
                source,
            })?;

        log::info!(
            "Opened serial port: {} at {} baud (timeout {:?})",
            path,
            baud_rate,
            timeout
        );

        Ok(SerialTransport {
            path: path.to_string(),
            port: Some(port),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "serial port already closed",
            ))
        })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port()?.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.port()?.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.port()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            log::info!("Closed serial port: {}", self.path);
        }
        Ok(())
    }
}
