//! powerlog - host-side logger for INA228 power monitors
//!
//! Commands a microcontroller-attached INA228 (one or two sensors) to sample
//! voltage, current and power, streams the newline-delimited ASCII records
//! over a serial link, and hands the sealed series to report sinks (console
//! summary, CSV, SVG charts).
//!
//! ```no_run
//! use powerlog::{SampleStreamClient, SensorLayout, SessionParams};
//! use std::time::Duration;
//!
//! let mut client = SampleStreamClient::open("/dev/ttyACM0", 115_200, Duration::from_secs(2))?;
//! std::thread::sleep(Duration::from_secs(2)); // board resets on open
//! client.start(SessionParams::new(100, 5)?)?;
//! let acquisition = client.acquire(SensorLayout::Single, |_, _| {})?;
//! client.close()?;
//! # Ok::<(), powerlog::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod report;
pub mod sample;
pub mod series;
pub mod session;
pub mod stats;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::SessionParams;
pub use sample::{Quantity, SampleRecord, SensorLayout};
pub use series::{Acquisition, SampleSeries};
pub use session::{SampleStreamClient, Samples, SessionState, StreamStats};
