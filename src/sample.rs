//! Sample records and sensor channel layout

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Measured quantity of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Voltage,
    Current,
    Power,
}

impl Quantity {
    /// Channel order within one sensor's triple
    pub const ALL: [Quantity; 3] = [Quantity::Voltage, Quantity::Current, Quantity::Power];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::Voltage => "Voltage",
            Quantity::Current => "Current",
            Quantity::Power => "Power",
        }
    }

    /// Unit as reported by the device
    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Voltage => "V",
            Quantity::Current => "A",
            Quantity::Power => "W",
        }
    }

    /// Offset of this quantity inside a sensor's triple
    pub fn offset(&self) -> usize {
        match self {
            Quantity::Voltage => 0,
            Quantity::Current => 1,
            Quantity::Power => 2,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.unit())
    }
}

/// How many INA228 sensors feed each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SensorLayout {
    /// `v,i,p`
    #[default]
    Single,
    /// `v1,i1,p1,v2,i2,p2`
    Dual,
}

impl SensorLayout {
    /// Number of sensors
    pub fn sensor_count(&self) -> usize {
        match self {
            SensorLayout::Single => 1,
            SensorLayout::Dual => 2,
        }
    }

    /// Number of comma-separated fields per record
    pub fn arity(&self) -> usize {
        self.sensor_count() * Quantity::ALL.len()
    }

    /// Record index of `quantity` for the zero-based `sensor`
    pub fn channel_index(&self, sensor: usize, quantity: Quantity) -> usize {
        sensor * Quantity::ALL.len() + quantity.offset()
    }

    /// Label used for a sensor in reports; empty for the single layout
    pub fn sensor_label(&self, sensor: usize) -> String {
        match self {
            SensorLayout::Single => String::new(),
            SensorLayout::Dual => format!("Sensor {}", sensor + 1),
        }
    }
}

impl fmt::Display for SensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorLayout::Single => write!(f, "single"),
            SensorLayout::Dual => write!(f, "dual"),
        }
    }
}

/// One parsed multi-channel sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    values: Vec<f64>,
}

impl SampleRecord {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Channel readings in wire order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of channels
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Reading of one channel, if present
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Voltage/current/power triple for the zero-based `sensor`
    pub fn sensor(&self, sensor: usize) -> Option<SensorReading> {
        let base = sensor * Quantity::ALL.len();
        match self.values.get(base..base + Quantity::ALL.len()) {
            Some(&[voltage, current, power]) => Some(SensorReading {
                voltage,
                current,
                power,
            }),
            _ => None,
        }
    }
}

/// Readings of a single sensor within a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Bus voltage (V)
    pub voltage: f64,
    /// Current (A)
    pub current: f64,
    /// Power (W)
    pub power: f64,
}

impl SensorReading {
    pub fn get(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Voltage => self.voltage,
            Quantity::Current => self.current,
            Quantity::Power => self.power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_arity() {
        assert_eq!(SensorLayout::Single.arity(), 3);
        assert_eq!(SensorLayout::Dual.arity(), 6);
        assert_eq!(SensorLayout::Dual.channel_index(1, Quantity::Current), 4);
    }

    #[test]
    fn test_record_sensor_split() {
        let record = SampleRecord::new(vec![1.0, 0.1, 0.2, 2.0, 0.3, 0.4]);

        let second = record.sensor(1).unwrap();
        assert_eq!(second.voltage, 2.0);
        assert_eq!(second.get(Quantity::Power), 0.4);
        assert!(record.sensor(2).is_none());
    }

    #[test]
    fn test_layout_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            layout: SensorLayout,
        }
        let parsed: Wrapper = toml::from_str("layout = \"dual\"").unwrap();
        assert_eq!(parsed.layout, SensorLayout::Dual);
    }
}
