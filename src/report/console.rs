//! Console tables: live per-record echo and the end-of-run summary

use super::ReportSink;
use crate::error::Result;
use crate::sample::{Quantity, SampleRecord, SensorLayout};
use crate::series::SampleSeries;
use crate::stats::{SensorStats, Summary};
use std::fmt;
use std::io::Write;

const RULE_WIDTH: usize = 60;
const SENSOR_COLUMN_WIDTH: usize = 30;

/// Row formatter for printing records while they stream in
#[derive(Debug, Clone, Copy)]
pub struct EchoTable {
    layout: SensorLayout,
}

impl EchoTable {
    pub fn new(layout: SensorLayout) -> Self {
        Self { layout }
    }

    /// Column header framed by rules
    pub fn header(&self) -> String {
        let mut columns = format!("{:<8}", "Sample");
        for sensor in 0..self.layout.sensor_count() {
            for quantity in Quantity::ALL {
                let label = match self.layout {
                    SensorLayout::Single => quantity.to_string(),
                    SensorLayout::Dual => {
                        format!("{}{} ({})", &quantity.name()[..1], sensor + 1, quantity.unit())
                    }
                };
                columns.push_str(&format!(" {:<15}", label));
            }
        }
        let rule = "=".repeat(RULE_WIDTH.max(columns.trim_end().len()));
        format!("{}\n{}\n{}", rule, columns.trim_end(), rule)
    }

    /// One row; `index` is zero-based, the printed counter starts at 1
    pub fn row(&self, index: usize, record: &SampleRecord) -> String {
        let mut row = format!("{:<8}", index + 1);
        for value in record.values() {
            row.push_str(&format!(" {:<15.6}", value));
        }
        row.trim_end().to_string()
    }
}

/// End-of-run summary in the same shape as the firmware team's reports
pub struct SummaryTable<'a> {
    summary: &'a Summary,
}

impl<'a> SummaryTable<'a> {
    pub fn new(summary: &'a Summary) -> Self {
        Self { summary }
    }
}

fn stat_cell(stats: &SensorStats, quantity: Quantity) -> String {
    let channel = stats.get(quantity);
    format!(
        "{:<8} {:.3}{unit} ± {:.3}{unit}",
        format!("{}:", quantity.name()),
        channel.mean,
        channel.std_dev,
        unit = quantity.unit()
    )
}

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "{}", rule)?;
        writeln!(f, "Data Collection Summary")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total samples received: {}", summary.samples)?;
        writeln!(f, "Sampling rate: {} Hz", summary.rate_hz)?;
        writeln!(f, "Duration: {:.2} seconds", summary.duration_s)?;
        writeln!(f)?;

        if summary.sensors.len() > 1 {
            let titles: Vec<String> = (0..summary.sensors.len())
                .map(|sensor| {
                    format!(
                        "{:^width$}",
                        format!("{} Statistics", summary.layout.sensor_label(sensor)),
                        width = SENSOR_COLUMN_WIDTH
                    )
                })
                .collect();
            writeln!(f, "{}", titles.join(" | "))?;
            let dashes: Vec<String> = summary
                .sensors
                .iter()
                .map(|_| "-".repeat(SENSOR_COLUMN_WIDTH))
                .collect();
            writeln!(f, "{}", dashes.join("|"))?;
        }

        for quantity in Quantity::ALL {
            let cells: Vec<String> = summary
                .sensors
                .iter()
                .map(|stats| {
                    format!(
                        "{:<width$}",
                        stat_cell(stats, quantity),
                        width = SENSOR_COLUMN_WIDTH
                    )
                })
                .collect();
            writeln!(f, "{}", cells.join(" | ").trim_end())?;
        }

        write!(f, "{}", rule)
    }
}

/// Prints the summary table to stdout
pub struct ConsoleSummarySink;

impl ReportSink for ConsoleSummarySink {
    fn name(&self) -> &'static str {
        "console summary"
    }

    fn write(&mut self, series: &SampleSeries) -> Result<()> {
        let summary = Summary::from_series(series);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\n{}\n", SummaryTable::new(&summary))?;
        Ok(())
    }
}
