//! End-to-end protocol scenarios against a scripted device.
//!
//! Each test scripts the device side of the serial link with `MockTransport`
//! and drives a full session through `SampleStreamClient`.

use powerlog::transport::MockTransport;
use powerlog::{
    Acquisition, Error, SampleRecord, SampleStreamClient, SensorLayout, SessionParams,
    SessionState,
};

fn params(rate_hz: u32, duration_s: u32) -> SessionParams {
    SessionParams::new(rate_hz, duration_s).unwrap()
}

fn collect(client: &mut SampleStreamClient<MockTransport>, arity: usize) -> Vec<SampleRecord> {
    client
        .samples(arity)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_single_sensor_stream_skips_noise() {
    let mock = MockTransport::with_lines(&[
        "OK",
        "1.200,0.050,0.060",
        "",
        "1.201,0.051,0.061",
        "bad,line",
        "DONE",
    ]);
    let mut client = SampleStreamClient::new(mock.clone());

    client.start(params(100, 5)).unwrap();
    let records = collect(&mut client, 3);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].values(), &[1.200, 0.050, 0.060]);
    assert_eq!(records[1].values(), &[1.201, 0.051, 0.061]);
    assert_eq!(client.state(), SessionState::Done);
    assert_eq!(mock.written_string(), "START,100,5\n");
}

#[test]
fn test_dual_sensor_short_line_is_discarded() {
    let mock = MockTransport::with_lines(&[
        "OK",
        "1.0,0.1,0.1,2.0",
        "1.0,0.1,0.1,2.0,0.2,0.4",
        "DONE",
    ]);
    let mut client = SampleStreamClient::new(mock);

    client.start(params(10, 1)).unwrap();
    let records = collect(&mut client, 6);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sensor(1).unwrap().power, 0.4);
    assert_eq!(client.stream_stats().arity_mismatches, 1);
}

#[test]
fn test_ack_failure_closes_and_blocks_sampling() {
    let mock = MockTransport::with_lines(&["ERR", "1,2,3", "DONE"]);
    let mut client = SampleStreamClient::new(mock.clone());

    let err = client.start(params(100, 5)).unwrap_err();

    match err {
        Error::AckRejected { response } => assert_eq!(response, "ERR"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(client.state(), SessionState::AckFailed);
    assert!(client.is_closed());
    assert!(mock.is_closed());
    assert!(client.samples(3).is_err());
    assert_eq!(mock.written_string(), "START,100,5\n");
    // nothing after the ack line was consumed
    assert_eq!(mock.pending_events(), 2);
}

#[test]
fn test_ack_must_be_exact() {
    for reply in ["OK!", "ok", "OK,100", "DONE"] {
        let mock = MockTransport::with_lines(&[reply]);
        let mut client = SampleStreamClient::new(mock);
        assert!(
            client.start(params(1, 1)).is_err(),
            "reply {:?} accepted",
            reply
        );
    }

    let mock = MockTransport::with_lines(&["  OK  "]);
    let mut client = SampleStreamClient::new(mock);
    assert!(client.start(params(1, 1)).is_ok());
}

#[test]
fn test_only_done_terminates() {
    let mock = MockTransport::with_lines(&["OK", "done", "DONE.", "1,1,1", " DONE "]);
    mock.inject_line("2,2,2");
    let mut client = SampleStreamClient::new(mock.clone());

    client.start(params(1, 1)).unwrap();
    let records = collect(&mut client, 3);

    // " DONE " trims to the sentinel, so "2,2,2" is never read
    assert_eq!(records.len(), 1);
    assert_eq!(mock.pending_events(), 1);
}

#[test]
fn test_record_split_across_reads_and_noise_bytes() {
    let mock = MockTransport::with_lines(&["OK"]);
    mock.inject_read(b"1.5,0.");
    mock.inject_timeout();
    mock.inject_read(b"2,0.3\n\xff\xfe3.0,0.1,0.3\r\n");
    mock.inject_line("DONE");
    let mut client = SampleStreamClient::new(mock);

    client.start(params(2, 1)).unwrap();
    let records = collect(&mut client, 3);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].values(), &[1.5, 0.2, 0.3]);
    assert_eq!(records[1].values(), &[3.0, 0.1, 0.3]);
}

#[test]
fn test_acquire_done_without_samples_is_empty() {
    let mock = MockTransport::with_lines(&["OK", "", "garbage", "DONE"]);
    let mut client = SampleStreamClient::new(mock);

    client.start(params(50, 2)).unwrap();
    let acquisition = client.acquire(SensorLayout::Single, |_, _| {}).unwrap();

    assert!(matches!(acquisition, Acquisition::Empty));
    assert!(client.close().is_ok());
}

#[test]
fn test_acquire_builds_timed_series_and_echo_counter_starts_at_zero() {
    let mock = MockTransport::with_lines(&["OK", "1,0.1,0.1", "x", "2,0.2,0.4", "3,0.3,0.9", "DONE"]);
    let mut client = SampleStreamClient::new(mock);
    client.start(params(4, 1)).unwrap();

    let mut seen = Vec::new();
    let acquisition = client
        .acquire(SensorLayout::Single, |index, record| {
            seen.push((index, record.values()[0]))
        })
        .unwrap();

    assert_eq!(seen, vec![(0, 1.0), (1, 2.0), (2, 3.0)]);
    let series = acquisition.into_series().unwrap();
    assert_eq!(series.rate_hz(), 4);
    assert_eq!(series.time_axis(), vec![0.0, 0.25, 0.5]);
}

#[test]
fn test_acquire_keeps_partial_data_on_disconnect() {
    let mock = MockTransport::with_lines(&["OK", "1,1,1", "2,2,2"]);
    mock.inject_disconnect();
    let mut client = SampleStreamClient::new(mock);
    client.start(params(10, 1)).unwrap();

    let series = client
        .acquire(SensorLayout::Single, |_, _| {})
        .unwrap()
        .into_series()
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(client.state(), SessionState::Aborted);
}

#[test]
fn test_acquire_keeps_records_received_before_stall() {
    let mock = MockTransport::with_lines(&["OK", "1,1,1", "2,2,2"]);
    let mut client = SampleStreamClient::new(mock).with_stall_limit(Some(2));
    client.start(params(10, 1)).unwrap();

    let series = client
        .acquire(SensorLayout::Single, |_, _| {})
        .unwrap()
        .into_series()
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.records()[1].values(), &[2.0, 2.0, 2.0]);
    assert_eq!(client.state(), SessionState::Aborted);
    assert_eq!(client.stream_stats().idle_reads, 2);
}

#[test]
fn test_stall_before_any_record_is_empty() {
    let mock = MockTransport::with_lines(&["OK"]);
    let mut client = SampleStreamClient::new(mock).with_stall_limit(Some(4));
    client.start(params(10, 1)).unwrap();

    let acquisition = client.acquire(SensorLayout::Single, |_, _| {}).unwrap();

    assert!(acquisition.is_empty());
    assert_eq!(client.state(), SessionState::Aborted);
}

#[test]
fn test_stall_is_yielded_by_the_stream() {
    let mock = MockTransport::with_lines(&["OK", "1,1,1"]);
    let mut client = SampleStreamClient::new(mock).with_stall_limit(Some(4));
    client.start(params(10, 1)).unwrap();

    let items: Vec<_> = client.samples(3).unwrap().collect();

    assert_eq!(items.len(), 2);
    assert!(matches!(items[1], Err(Error::Stalled { idle_reads: 4 })));
}

#[test]
fn test_non_finite_values_are_records() {
    let mock = MockTransport::with_lines(&[
        "OK",
        "nan,0.1,0.1",
        "1e999,0.1,0.1",
        "inf,0,0",
        "1.0,0.1,0.1",
        "DONE",
    ]);
    let mut client = SampleStreamClient::new(mock);

    client.start(params(10, 1)).unwrap();
    let records = collect(&mut client, 3);

    assert_eq!(records.len(), 4);
    assert!(records[0].values()[0].is_nan());
    assert_eq!(records[1].values()[0], f64::INFINITY);
    assert_eq!(client.stream_stats().malformed, 0);
}

#[test]
fn test_close_twice_after_success() {
    let mock = MockTransport::with_lines(&["OK", "DONE"]);
    let mut client = SampleStreamClient::new(mock.clone());
    client.start(params(1, 1)).unwrap();
    assert_eq!(client.samples(3).unwrap().count(), 0);

    client.close().unwrap();
    client.close().unwrap();

    assert_eq!(mock.close_count(), 1);
}
