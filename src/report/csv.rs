//! CSV export
//!
//! Columns are `Time (s)` followed by voltage in volts, current in milliamps
//! and power in milliwatts for each sensor. The device reports amps and watts,
//! so current and power are scaled on the way out.

use super::ReportSink;
use crate::error::Result;
use crate::sample::{Quantity, SensorLayout};
use crate::series::SampleSeries;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn column_unit(quantity: Quantity) -> (&'static str, f64) {
    match quantity {
        Quantity::Voltage => ("V", 1.0),
        Quantity::Current => ("mA", 1000.0),
        Quantity::Power => ("mW", 1000.0),
    }
}

/// Header line (without terminator) for `layout`
pub fn csv_header(layout: SensorLayout) -> String {
    let mut columns = vec!["Time (s)".to_string()];
    for sensor in 0..layout.sensor_count() {
        for quantity in Quantity::ALL {
            let (unit, _) = column_unit(quantity);
            let prefix = match layout {
                SensorLayout::Single => String::new(),
                SensorLayout::Dual => format!("{} ", layout.sensor_label(sensor)),
            };
            columns.push(format!("{}{} ({})", prefix, quantity.name(), unit));
        }
    }
    columns.join(",")
}

/// Write header and one row per record
pub fn write_csv<W: Write>(writer: &mut W, series: &SampleSeries) -> Result<()> {
    let layout = series.layout();
    writeln!(writer, "{}", csv_header(layout))?;

    for (index, record) in series.records().iter().enumerate() {
        write!(writer, "{:.6}", series.time_at(index))?;
        for sensor in 0..layout.sensor_count() {
            if let Some(reading) = record.sensor(sensor) {
                for quantity in Quantity::ALL {
                    let (_, scale) = column_unit(quantity);
                    write!(writer, ",{:.6}", reading.get(quantity) * scale)?;
                }
            }
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the series to a CSV file
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write(&mut self, series: &SampleSeries) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        write_csv(&mut writer, series)?;
        log::info!(
            "Saved {} samples to {}",
            series.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleRecord;
    use crate::series::SeriesBuilder;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_single_header() {
        assert_eq!(
            csv_header(SensorLayout::Single),
            "Time (s),Voltage (V),Current (mA),Power (mW)"
        );
    }

    #[test]
    fn test_dual_header() {
        let header = csv_header(SensorLayout::Dual);
        assert!(header.starts_with("Time (s),Sensor 1 Voltage (V),Sensor 1 Current (mA)"));
        assert!(header.ends_with("Sensor 2 Power (mW)"));
        assert_eq!(header.split(',').count(), 7);
    }

    #[test]
    fn test_rows_scale_current_and_power() {
        let mut builder = SeriesBuilder::new(2, SensorLayout::Single);
        builder.push(SampleRecord::new(vec![1.2, 0.05, 0.06]));
        builder.push(SampleRecord::new(vec![1.25, 0.5, 0.625]));
        let series = builder.seal().into_series().unwrap();

        let mut out = Vec::new();
        write_csv(&mut out, &series).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0.000000,1.200000,50.000000,60.000000");
        assert_eq!(lines[2], "0.500000,1.250000,500.000000,625.000000");
    }

    #[test]
    fn test_sink_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ina228_data.csv");

        let mut builder = SeriesBuilder::new(1, SensorLayout::Dual);
        builder.push(SampleRecord::new(vec![1.0, 0.1, 0.1, 2.0, 0.2, 0.4]));
        let series = builder.seal().into_series().unwrap();

        let mut sink = CsvSink::new(&path);
        sink.write(&series).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("0.000000,1.000000,100.000000,100.000000,2.000000,200.000000,400.000000"));
    }
}
