//! Error types for powerlog

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// powerlog error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port could not be opened
    #[error("Cannot open serial port {port}: {source}")]
    Connection {
        /// Port identifier that failed
        port: String,
        /// Underlying serial error
        #[source]
        source: serialport::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device answered the start command with something other than `OK`
    #[error("Device did not acknowledge command (response: {response:?})")]
    AckRejected {
        /// Decoded, trimmed response line (empty on timeout)
        response: String,
    },

    /// Too many consecutive reads timed out while sampling
    #[error("Stream stalled after {idle_reads} consecutive idle reads")]
    Stalled {
        /// Number of consecutive timed-out reads
        idle_reads: u32,
    },

    /// Operation not allowed in the current session state
    #[error("Invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the operation requires
        expected: &'static str,
        /// State the session was in
        actual: &'static str,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Plot rendering failed
    #[error("Plot error: {0}")]
    Plot(String),
}
