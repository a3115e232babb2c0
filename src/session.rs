//! Sample stream client
//!
//! Owns one transport for the lifetime of a sampling session and drives the
//! device through its protocol:
//!
//! ```text
//! Idle --start()--> AwaitingAck --"OK"--> Sampling --"DONE"--> Done
//!                        |                    |
//!                        +--other--> AckFailed +--link error / stall--> Aborted
//! ```
//!
//! Records are pulled lazily through [`Samples`], one blocking line read at
//! a time. Lines that are empty, have the wrong number of fields, or carry a
//! non-numeric field are skipped without ending the stream.

use crate::config::SerialConfig;
use crate::error::{Error, Result};
use crate::protocol::{
    classify_line, decode_line, Command, LineFramer, LineKind, SessionParams, ACK_TOKEN,
};
use crate::sample::{SampleRecord, SensorLayout};
use crate::series::{Acquisition, SeriesBuilder};
use crate::transport::{SerialTransport, Transport};
use std::iter::FusedIterator;
use std::thread;
use std::time::Duration;

/// Bytes requested from the transport per read
const READ_CHUNK: usize = 64;

/// Protocol state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no command sent
    Idle,
    /// Start command sent, waiting for `OK`
    AwaitingAck,
    /// Acknowledged, records are streaming
    Sampling,
    /// `DONE` observed
    Done,
    /// Device rejected or ignored the start command
    AckFailed,
    /// Stream ended by a link failure or stall
    Aborted,
}

impl SessionState {
    /// State name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::AwaitingAck => "AwaitingAck",
            SessionState::Sampling => "Sampling",
            SessionState::Done => "Done",
            SessionState::AckFailed => "AckFailed",
            SessionState::Aborted => "Aborted",
        }
    }

    /// No further protocol transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::AckFailed | SessionState::Aborted
        )
    }
}

/// Per-session line counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Complete lines read while sampling (including the sentinel)
    pub lines: u64,
    /// Records yielded
    pub records: u64,
    /// Blank lines skipped
    pub empty_lines: u64,
    /// Reads that timed out with no complete line
    pub idle_reads: u64,
    /// Lines with the wrong number of fields
    pub arity_mismatches: u64,
    /// Lines with a non-numeric field
    pub malformed: u64,
}

impl StreamStats {
    /// Lines that carried data but produced no record
    pub fn discarded(&self) -> u64 {
        self.arity_mismatches + self.malformed
    }
}

enum LineRead {
    Line(String),
    Idle,
}

/// Client for the line-oriented sampling protocol
pub struct SampleStreamClient<T: Transport> {
    transport: T,
    framer: LineFramer,
    state: SessionState,
    params: Option<SessionParams>,
    stats: StreamStats,
    max_idle_reads: Option<u32>,
    stream_taken: bool,
    closed: bool,
}

impl SampleStreamClient<SerialTransport> {
    /// Open a serial port without waiting for the device to settle
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let transport = SerialTransport::open(port, baud_rate, timeout)?;
        Ok(Self::new(transport))
    }

    /// Open the configured port and wait out the device's reset-on-connect
    pub fn connect(config: &SerialConfig) -> Result<Self> {
        let client = Self::open(&config.port, config.baud_rate, config.timeout())?;
        Ok(client.settled(config.settle()))
    }
}

impl<T: Transport> SampleStreamClient<T> {
    /// Wrap an already-open transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            framer: LineFramer::default(),
            state: SessionState::Idle,
            params: None,
            stats: StreamStats::default(),
            max_idle_reads: None,
            stream_taken: false,
            closed: false,
        }
    }

    /// Block for `delay` before any command is sent
    ///
    /// Boards that reset when the port opens drop bytes sent during boot.
    pub fn settled(self, delay: Duration) -> Self {
        if !delay.is_zero() {
            log::info!("Waiting {:?} for device reset", delay);
            thread::sleep(delay);
        }
        self
    }

    /// Abort the stream after this many consecutive timed-out reads
    ///
    /// `None` or `Some(0)` waits forever.
    pub fn with_stall_limit(mut self, max_idle_reads: Option<u32>) -> Self {
        self.max_idle_reads = max_idle_reads.filter(|&n| n > 0);
        self
    }

    /// Current protocol state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Parameters sent with the start command, once sent
    pub fn params(&self) -> Option<SessionParams> {
        self.params
    }

    /// Line counters for the current session
    pub fn stream_stats(&self) -> StreamStats {
        self.stats
    }

    /// Whether the transport has been released
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn require_state(&self, expected: SessionState) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState {
                expected: expected.name(),
                actual: "Closed",
            });
        }
        if self.state != expected {
            return Err(Error::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }

    /// Send `START,<rate>,<duration>` and wait for the device's `OK`
    ///
    /// Any other reply, including nothing before the read timeout, moves the
    /// session to [`SessionState::AckFailed`], closes the connection and
    /// returns [`Error::AckRejected`].
    pub fn start(&mut self, params: SessionParams) -> Result<()> {
        self.require_state(SessionState::Idle)?;

        let command = Command::Start(params);
        log::info!("Sending: {}", command);
        self.transport.write_all(command.to_line().as_bytes())?;
        self.transport.flush()?;
        self.params = Some(params);
        self.state = SessionState::AwaitingAck;

        let response = match self.read_line() {
            Ok(LineRead::Line(line)) => line,
            Ok(LineRead::Idle) => String::new(),
            Err(e) => {
                self.fail_ack();
                return Err(e);
            }
        };
        log::info!("Device response: {:?}", response);

        if response == ACK_TOKEN {
            self.state = SessionState::Sampling;
            Ok(())
        } else {
            log::error!("Device did not acknowledge command");
            self.fail_ack();
            Err(Error::AckRejected { response })
        }
    }

    fn fail_ack(&mut self) {
        self.state = SessionState::AckFailed;
        if let Err(e) = self.close() {
            log::warn!("Failed to close connection after ack failure: {}", e);
        }
    }

    /// Take the record stream for this session
    ///
    /// Only available once per session, after a successful [`start`](Self::start).
    pub fn samples(&mut self, arity: usize) -> Result<Samples<'_, T>> {
        self.require_state(SessionState::Sampling)?;
        if self.stream_taken {
            return Err(Error::InvalidState {
                expected: "Sampling with an untaken stream",
                actual: "Sampling with the stream already taken",
            });
        }
        self.stream_taken = true;
        log::info!("Receiving samples ({} fields per record)", arity);

        Ok(Samples {
            client: self,
            arity,
            idle_run: 0,
            finished: false,
        })
    }

    /// Drain the stream into a sealed series
    ///
    /// `on_record` sees each record with its zero-based index as it arrives.
    /// A link failure or stall seals whatever arrived before it and leaves
    /// the session [`Aborted`](SessionState::Aborted).
    pub fn acquire<F>(&mut self, layout: SensorLayout, mut on_record: F) -> Result<Acquisition>
    where
        F: FnMut(usize, &SampleRecord),
    {
        let rate_hz = self.params.map(|p| p.rate_hz()).unwrap_or(1);
        let capacity = self
            .params
            .map(|p| p.expected_samples().min(1 << 20) as usize)
            .unwrap_or(0);
        let mut builder = SeriesBuilder::with_capacity(rate_hz, layout, capacity);

        for item in self.samples(layout.arity())? {
            match item {
                Ok(record) => {
                    on_record(builder.len(), &record);
                    builder.push(record);
                }
                Err(e) => {
                    log::warn!(
                        "Stream aborted after {} records, keeping partial data: {}",
                        builder.len(),
                        e
                    );
                    break;
                }
            }
        }

        Ok(builder.seal())
    }

    /// Release the connection
    ///
    /// Safe to call in any state and more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.transport.close()
    }

    fn read_line(&mut self) -> Result<LineRead> {
        loop {
            if let Some(raw) = self.framer.next_line() {
                return Ok(LineRead::Line(decode_line(&raw)));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.transport.read(&mut chunk)?;
            if n == 0 {
                return Ok(LineRead::Idle);
            }
            self.framer.push(&chunk[..n]);
        }
    }
}

impl<T: Transport> Drop for SampleStreamClient<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close connection: {}", e);
        }
    }
}

/// Lazy, single-pass sequence of records
///
/// Ends after the `DONE` sentinel. A link failure or stall yields one error
/// and then ends the sequence.
pub struct Samples<'a, T: Transport> {
    client: &'a mut SampleStreamClient<T>,
    arity: usize,
    idle_run: u32,
    finished: bool,
}

impl<T: Transport> Samples<'_, T> {
    fn abort(&mut self, error: Error) -> Option<Result<SampleRecord>> {
        self.finished = true;
        self.client.state = SessionState::Aborted;
        Some(Err(error))
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> StreamStats {
        self.client.stats
    }
}

impl<T: Transport> Iterator for Samples<'_, T> {
    type Item = Result<SampleRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.client.read_line() {
                Ok(LineRead::Line(line)) => {
                    self.idle_run = 0;
                    self.client.stats.lines += 1;
                    line
                }
                Ok(LineRead::Idle) => {
                    self.idle_run = self.idle_run.saturating_add(1);
                    self.client.stats.idle_reads += 1;
                    log::trace!("Read timed out ({} in a row)", self.idle_run);

                    if let Some(limit) = self.client.max_idle_reads {
                        if self.idle_run >= limit {
                            log::error!("No data for {} consecutive reads", self.idle_run);
                            return self.abort(Error::Stalled {
                                idle_reads: self.idle_run,
                            });
                        }
                    }
                    continue;
                }
                Err(e) => {
                    log::error!("Read failed: {}", e);
                    return self.abort(e);
                }
            };

            log::debug!("Raw line: {:?}", line);

            match classify_line(&line, self.arity) {
                LineKind::Empty => {
                    self.client.stats.empty_lines += 1;
                }
                LineKind::Done => {
                    self.finished = true;
                    self.client.state = SessionState::Done;
                    let stats = self.client.stats;
                    log::info!(
                        "Sampling complete: {} records, {} discarded lines",
                        stats.records,
                        stats.discarded()
                    );
                    return None;
                }
                LineKind::Record(record) => {
                    self.client.stats.records += 1;
                    return Some(Ok(record));
                }
                LineKind::ArityMismatch { expected, found } => {
                    self.client.stats.arity_mismatches += 1;
                    log::warn!("Expected {} values, got {}: {:?}", expected, found, line);
                }
                LineKind::Malformed { token } => {
                    self.client.stats.malformed += 1;
                    log::debug!("Error parsing line {:?}: bad value {:?}", line, token);
                }
            }
        }
    }
}

impl<T: Transport> FusedIterator for Samples<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn started(lines: &[&str]) -> (SampleStreamClient<MockTransport>, MockTransport) {
        let mock = MockTransport::with_lines(&["OK"]);
        for line in lines {
            mock.inject_line(line);
        }
        let mut client = SampleStreamClient::new(mock.clone());
        client.start(SessionParams::new(10, 1).unwrap()).unwrap();
        (client, mock)
    }

    #[test]
    fn test_start_sends_command_and_accepts_ok() {
        let mock = MockTransport::with_lines(&["OK"]);
        let mut client = SampleStreamClient::new(mock.clone());

        client.start(SessionParams::new(100, 5).unwrap()).unwrap();

        assert_eq!(mock.written_string(), "START,100,5\n");
        assert_eq!(client.state(), SessionState::Sampling);
        assert!(!client.is_closed());
    }

    #[test]
    fn test_ack_with_crlf_is_accepted() {
        let mock = MockTransport::new();
        mock.inject_read(b"OK\r\n");
        let mut client = SampleStreamClient::new(mock);

        assert!(client.start(SessionParams::new(1, 1).unwrap()).is_ok());
    }

    #[test]
    fn test_ack_timeout_fails() {
        let mock = MockTransport::new();
        mock.inject_timeout();
        let mut client = SampleStreamClient::new(mock.clone());

        let err = client.start(SessionParams::new(1, 1).unwrap()).unwrap_err();
        match err {
            Error::AckRejected { response } => assert!(response.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(client.state(), SessionState::AckFailed);
        assert!(mock.is_closed());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (mut client, _mock) = started(&[]);
        assert!(matches!(
            client.start(SessionParams::new(1, 1).unwrap()),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_samples_before_start_is_rejected() {
        let mut client = SampleStreamClient::new(MockTransport::new());
        assert!(client.samples(3).is_err());
    }

    #[test]
    fn test_stream_counts_skipped_lines() {
        let (mut client, _mock) =
            started(&["1,2,3", "", "1,2", "x,2,3", "4,5,6", "DONE"]);

        let records: Vec<_> = client
            .samples(3)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        let stats = client.stream_stats();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.empty_lines, 1);
        assert_eq!(stats.arity_mismatches, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.lines, 6);
        assert_eq!(client.state(), SessionState::Done);
    }

    #[test]
    fn test_stream_is_not_restartable() {
        let (mut client, _mock) = started(&["DONE"]);
        assert_eq!(client.samples(3).unwrap().count(), 0);
        assert!(client.samples(3).is_err());
    }

    #[test]
    fn test_idle_reads_do_not_end_stream() {
        let (mut client, mock) = started(&[]);
        mock.inject_timeout();
        mock.inject_timeout();
        mock.inject_line("1,1,1");
        mock.inject_line("DONE");

        let records: Vec<_> = client.samples(3).unwrap().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(client.stream_stats().idle_reads, 2);
    }

    #[test]
    fn test_stall_limit_aborts() {
        let mock = MockTransport::with_lines(&["OK", "1,1,1"]);
        let mut client = SampleStreamClient::new(mock).with_stall_limit(Some(3));
        client.start(SessionParams::new(1, 1).unwrap()).unwrap();

        let items: Vec<_> = client.samples(3).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Stalled { idle_reads: 3 })));
        assert_eq!(client.state(), SessionState::Aborted);
    }

    #[test]
    fn test_settled_waits_before_start() {
        let mock = MockTransport::with_lines(&["OK"]);
        let started_at = std::time::Instant::now();
        let mut client = SampleStreamClient::new(mock.clone()).settled(Duration::from_millis(30));

        assert!(started_at.elapsed() >= Duration::from_millis(30));
        assert!(mock.written_string().is_empty());
        client.start(SessionParams::new(1, 1).unwrap()).unwrap();
        assert_eq!(client.state(), SessionState::Sampling);
    }

    #[test]
    fn test_zero_settle_does_not_touch_transport() {
        let mock = MockTransport::with_lines(&["OK"]);
        let client = SampleStreamClient::new(mock.clone()).settled(Duration::ZERO);

        assert_eq!(client.state(), SessionState::Idle);
        assert_eq!(mock.pending_events(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mock = MockTransport::new();
        let mut client = SampleStreamClient::new(mock.clone());

        client.close().unwrap();
        client.close().unwrap();
        drop(client);

        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_drop_closes_transport() {
        let mock = MockTransport::new();
        drop(SampleStreamClient::new(mock.clone()));
        assert!(mock.is_closed());
    }
}
