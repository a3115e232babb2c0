//! Per-channel summary statistics

use crate::sample::{Quantity, SensorLayout};
use crate::series::SampleSeries;

/// Summary of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl ChannelStats {
    /// Compute statistics; `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            count,
        })
    }
}

/// Voltage, current and power statistics of one sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorStats {
    pub voltage: ChannelStats,
    pub current: ChannelStats,
    pub power: ChannelStats,
}

impl SensorStats {
    pub fn get(&self, quantity: Quantity) -> &ChannelStats {
        match quantity {
            Quantity::Voltage => &self.voltage,
            Quantity::Current => &self.current,
            Quantity::Power => &self.power,
        }
    }
}

/// Statistics for a whole acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub layout: SensorLayout,
    pub samples: usize,
    pub rate_hz: u32,
    /// Timestamp of the last record
    pub duration_s: f64,
    pub sensors: Vec<SensorStats>,
}

impl Summary {
    pub fn from_series(series: &SampleSeries) -> Self {
        let layout = series.layout();
        let sensors = (0..layout.sensor_count())
            .filter_map(|sensor| {
                let stats =
                    |quantity| ChannelStats::from_values(&series.quantity(sensor, quantity));
                Some(SensorStats {
                    voltage: stats(Quantity::Voltage)?,
                    current: stats(Quantity::Current)?,
                    power: stats(Quantity::Power)?,
                })
            })
            .collect();

        Self {
            layout,
            samples: series.len(),
            rate_hz: series.rate_hz(),
            duration_s: series.duration_s(),
            sensors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleRecord;
    use crate::series::SeriesBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_channel_stats_population_std() {
        let stats = ChannelStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.std_dev, 2.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.count, 8);
    }

    #[test]
    fn test_channel_stats_empty() {
        assert!(ChannelStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_summary_dual_layout() {
        let mut builder = SeriesBuilder::new(2, SensorLayout::Dual);
        builder.push(SampleRecord::new(vec![1.0, 0.1, 0.1, 3.0, 0.3, 0.9]));
        builder.push(SampleRecord::new(vec![3.0, 0.3, 0.9, 5.0, 0.5, 2.5]));
        let series = builder.seal().into_series().unwrap();

        let summary = Summary::from_series(&series);
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.sensors.len(), 2);
        assert_relative_eq!(summary.duration_s, 0.5);
        assert_relative_eq!(summary.sensors[0].voltage.mean, 2.0);
        assert_relative_eq!(summary.sensors[0].voltage.std_dev, 1.0);
        assert_relative_eq!(
            summary.sensors[1].get(Quantity::Current).mean,
            0.4,
            epsilon = 1e-12
        );
    }
}
