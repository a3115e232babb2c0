//! Report sinks for sealed sample series
//!
//! Sinks only ever see a non-empty [`SampleSeries`]; an empty acquisition is
//! reported by the caller and never reaches them.

mod console;
mod csv;
mod plot;

pub use console::{ConsoleSummarySink, EchoTable, SummaryTable};
pub use csv::{csv_header, write_csv, CsvSink};
pub use plot::SvgPlotSink;

use crate::error::Result;
use crate::series::SampleSeries;

/// Destination for a finished acquisition
pub trait ReportSink {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Render or persist the series
    fn write(&mut self, series: &SampleSeries) -> Result<()>;
}

/// Run every sink, stopping at the first failure
pub fn write_all(sinks: &mut [Box<dyn ReportSink>], series: &SampleSeries) -> Result<()> {
    for sink in sinks.iter_mut() {
        log::debug!("Writing {} report", sink.name());
        sink.write(series)?;
    }
    Ok(())
}
