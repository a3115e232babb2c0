//! Mock transport for testing
//!
//! Reads are served from a script of events. Each [`MockEvent::Timeout`]
//! makes one read return `Ok(0)`, the same way a serial read timeout does.
//! An exhausted script behaves like a device that stays silent.

use super::Transport;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// One scripted read outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Bytes delivered by the next read(s)
    Data(Vec<u8>),
    /// One read that times out with no data
    Timeout,
    /// The link goes away; this and every later read fails
    Disconnect,
}

/// Mock transport for unit testing
///
/// Clones share state, so a test can keep a handle to inspect what the
/// client wrote after handing the transport over.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    script: VecDeque<MockEvent>,
    write_buffer: Vec<u8>,
    close_count: usize,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                script: VecDeque::new(),
                write_buffer: Vec::new(),
                close_count: 0,
                closed: false,
            })),
        }
    }

    /// Create a mock that will answer with the given lines, each terminated by `\n`
    pub fn with_lines(lines: &[&str]) -> Self {
        let mock = Self::new();
        for line in lines {
            mock.inject_line(line);
        }
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inject raw bytes to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().script.push_back(MockEvent::Data(data.to_vec()));
    }

    /// Inject one line; a `\n` terminator is appended
    pub fn inject_line(&self, line: &str) {
        let mut data = line.as_bytes().to_vec();
        data.push(b'\n');
        self.lock().script.push_back(MockEvent::Data(data));
    }

    /// Inject one timed-out read
    pub fn inject_timeout(&self) {
        self.lock().script.push_back(MockEvent::Timeout);
    }

    /// Inject a link failure
    pub fn inject_disconnect(&self) {
        self.lock().script.push_back(MockEvent::Disconnect);
    }

    /// Get all written data as text
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.lock().write_buffer).into_owned()
    }

    /// Number of close calls that actually released the channel
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    /// Whether the channel has been released
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of scripted events not yet consumed
    pub fn pending_events(&self) -> usize {
        self.lock().script.len()
    }
}

fn not_connected() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "mock transport closed",
    ))
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(not_connected());
        }

        match inner.script.pop_front() {
            Some(MockEvent::Data(mut data)) => {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    inner.script.push_front(MockEvent::Data(rest));
                }
                Ok(n)
            }
            Some(MockEvent::Timeout) | None => Ok(0),
            Some(MockEvent::Disconnect) => {
                inner.script.push_front(MockEvent::Disconnect);
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "mock device disconnected",
                )))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(not_connected());
        }
        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.closed {
            inner.closed = true;
            inner.close_count += 1;
        }
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
