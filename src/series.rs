//! Sealed sample sequences and their time axis

use crate::sample::{Quantity, SampleRecord, SensorLayout};

/// Append-only record buffer used while a stream is live
#[derive(Debug)]
pub struct SeriesBuilder {
    rate_hz: u32,
    layout: SensorLayout,
    records: Vec<SampleRecord>,
}

impl SeriesBuilder {
    /// Empty builder for records taken at `rate_hz`
    pub fn new(rate_hz: u32, layout: SensorLayout) -> Self {
        Self {
            rate_hz,
            layout,
            records: Vec::new(),
        }
    }

    /// Reserve room for the number of records the session should produce
    pub fn with_capacity(rate_hz: u32, layout: SensorLayout, capacity: usize) -> Self {
        Self {
            rate_hz,
            layout,
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record; its slot index is the current length
    pub fn push(&mut self, record: SampleRecord) {
        debug_assert_eq!(record.arity(), self.layout.arity());
        self.records.push(record);
    }

    /// Records pushed so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Seal the sequence. No records means [`Acquisition::Empty`].
    pub fn seal(self) -> Acquisition {
        if self.records.is_empty() {
            Acquisition::Empty
        } else {
            Acquisition::Samples(SampleSeries {
                rate_hz: self.rate_hz,
                layout: self.layout,
                records: self.records,
            })
        }
    }
}

/// Result of a completed stream
#[derive(Debug)]
pub enum Acquisition {
    /// At least one record arrived
    Samples(SampleSeries),
    /// The stream ended before any valid record arrived
    Empty,
}

impl Acquisition {
    /// True when no record arrived
    pub fn is_empty(&self) -> bool {
        matches!(self, Acquisition::Empty)
    }

    /// The series, if any record arrived
    pub fn into_series(self) -> Option<SampleSeries> {
        match self {
            Acquisition::Samples(series) => Some(series),
            Acquisition::Empty => None,
        }
    }
}

/// Immutable, non-empty sequence of records at a fixed sampling rate
///
/// Record `i` was taken at `i / rate_hz` seconds.
#[derive(Debug, Clone)]
pub struct SampleSeries {
    rate_hz: u32,
    layout: SensorLayout,
    records: Vec<SampleRecord>,
}

impl SampleSeries {
    /// Sampling rate the device was started with
    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    pub fn layout(&self) -> SensorLayout {
        self.layout
    }

    /// Records in arrival order
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with collections
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Elapsed time of record `index` in seconds
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 / f64::from(self.rate_hz)
    }

    /// Time axis for every record
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.records.len()).map(|i| self.time_at(i)).collect()
    }

    /// Timestamp of the last record
    pub fn duration_s(&self) -> f64 {
        self.time_at(self.records.len().saturating_sub(1))
    }

    /// All readings of one channel, in arrival order
    pub fn channel(&self, index: usize) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|record| record.get(index))
            .collect()
    }

    /// All readings of `quantity` for the zero-based `sensor`
    pub fn quantity(&self, sensor: usize, quantity: Quantity) -> Vec<f64> {
        self.channel(self.layout.channel_index(sensor, quantity))
    }
}
