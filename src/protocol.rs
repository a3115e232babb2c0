//! Line-oriented wire protocol for the power monitor firmware
//!
//! ```text
//! host   -> device   START,<rate_hz>,<duration_s>\n
//! device -> host     OK\n
//! device -> host     <v>,<i>,<p>\n                      (single sensor)
//! device -> host     <v1>,<i1>,<p1>,<v2>,<i2>,<p2>\n    (dual sensor)
//! device -> host     DONE\n
//! ```
//!
//! Everything is plain ASCII. Bytes outside the ASCII range are dropped when
//! a line is decoded, and surrounding whitespace (including `\r`) is trimmed.

use crate::error::{Error, Result};
use crate::sample::SampleRecord;
use std::fmt;

/// Acknowledgment token sent by the device after a valid command
pub const ACK_TOKEN: &str = "OK";

/// Sentinel that ends the sample stream
pub const DONE_TOKEN: &str = "DONE";

/// Field separator within a record line
pub const FIELD_SEPARATOR: char = ',';

/// Longest line accepted before the framer resynchronizes
pub const MAX_LINE_LEN: usize = 256;

/// Immutable sampling parameters sent with the start command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    rate_hz: u32,
    duration_s: u32,
}

impl SessionParams {
    /// Create parameters, rejecting zero rate or duration
    pub fn new(rate_hz: u32, duration_s: u32) -> Result<Self> {
        if rate_hz == 0 {
            return Err(Error::InvalidParameter(
                "sampling rate must be positive".to_string(),
            ));
        }
        if duration_s == 0 {
            return Err(Error::InvalidParameter(
                "duration must be positive".to_string(),
            ));
        }
        Ok(Self {
            rate_hz,
            duration_s,
        })
    }

    /// Sampling rate in Hz
    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Total duration in seconds
    pub fn duration_s(&self) -> u32 {
        self.duration_s
    }

    /// Number of records the device should produce if none are lost
    pub fn expected_samples(&self) -> u64 {
        u64::from(self.rate_hz) * u64::from(self.duration_s)
    }
}

/// Host to device commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin sampling
    Start(SessionParams),
}

impl Command {
    /// Encode as a newline-terminated ASCII line
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Start(params) => {
                write!(f, "START,{},{}", params.rate_hz, params.duration_s)
            }
        }
    }
}

/// Decode one raw line: drop non-ASCII bytes, then trim whitespace
pub fn decode_line(raw: &[u8]) -> String {
    let text: String = raw
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    text.trim().to_string()
}

/// What a decoded device line means during sampling
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Nothing on the line
    Empty,
    /// End-of-stream sentinel
    Done,
    /// A valid record
    Record(SampleRecord),
    /// Wrong number of fields
    ArityMismatch {
        /// Fields the layout requires
        expected: usize,
        /// Fields found on the line
        found: usize,
    },
    /// Right number of fields but at least one does not parse as a number
    Malformed {
        /// First offending token
        token: String,
    },
}

/// Classify a decoded, trimmed line against the expected record arity
pub fn classify_line(line: &str, arity: usize) -> LineKind {
    if line.is_empty() {
        return LineKind::Empty;
    }
    if line == DONE_TOKEN {
        return LineKind::Done;
    }

    let tokens: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if tokens.len() != arity {
        return LineKind::ArityMismatch {
            expected: arity,
            found: tokens.len(),
        };
    }

    let mut values = Vec::with_capacity(arity);
    for token in tokens {
        match token.trim().parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => {
                return LineKind::Malformed {
                    token: token.to_string(),
                }
            }
        }
    }

    LineKind::Record(SampleRecord::new(values))
}

/// Splits a byte stream into `\n`-terminated lines
///
/// Partial lines stay buffered across reads. A run of more than `max_len`
/// bytes without a terminator is dropped up to the next `\n`.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_len: usize,
    discarding: bool,
}

impl LineFramer {
    /// Create a framer with the given line length limit
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len),
            max_len,
            discarding: false,
        }
    }

    /// Append freshly read bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered without a terminator yet
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                    line.pop();

                    if self.discarding {
                        // tail of an oversized line
                        self.discarding = false;
                        continue;
                    }
                    if line.len() > self.max_len {
                        log::warn!(
                            "Dropping oversized line ({} bytes > {})",
                            line.len(),
                            self.max_len
                        );
                        continue;
                    }
                    return Some(line);
                }
                None => {
                    if self.buf.len() > self.max_len {
                        if !self.discarding {
                            log::warn!(
                                "No line terminator within {} bytes, resynchronizing",
                                self.max_len
                            );
                        }
                        self.buf.clear();
                        self.discarding = true;
                    }
                    return None;
                }
            }
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(MAX_LINE_LEN)
    }
}
