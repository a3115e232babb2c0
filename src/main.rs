//! powerlog - acquire INA228 samples over serial and report them
//!
//! Usage:
//!
//! ```bash
//! powerlog --port /dev/ttyACM0 --rate 100 --duration 5 --csv ina228_data.csv --plots plots/
//! powerlog --config powerlog.toml --layout dual --echo
//! ```
//!
//! Rate and duration missing from both the flags and the config file are
//! prompted for on stdin.

use clap::Parser;
use powerlog::report::{self, ConsoleSummarySink, CsvSink, EchoTable, ReportSink, SvgPlotSink};
use powerlog::{
    Acquisition, Config, Result, SampleStreamClient, SensorLayout, SessionParams, SessionState,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "powerlog")]
#[command(version, about = "Log INA228 voltage, current and power over a serial link")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (e.g. /dev/ttyACM0, COM6)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Sampling rate in Hz
    #[arg(short, long)]
    rate: Option<u32>,

    /// Sampling duration in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Sensor layout of each record
    #[arg(short, long, value_enum)]
    layout: Option<SensorLayout>,

    /// Write samples to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write SVG charts into this directory
    #[arg(long)]
    plots: Option<PathBuf>,

    /// Print every record as it arrives
    #[arg(long)]
    echo: bool,

    /// Wait for Enter after the device acknowledges, before reading samples
    #[arg(long)]
    confirm: bool,

    /// Give up after this many consecutive read timeouts (0 = wait forever)
    #[arg(long)]
    max_idle_reads: Option<u32>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if args.rate.is_some() {
        config.session.rate_hz = args.rate;
    }
    if args.duration.is_some() {
        config.session.duration_s = args.duration;
    }
    if let Some(layout) = args.layout {
        config.session.layout = layout;
    }
    if args.max_idle_reads.is_some() {
        config.session.max_idle_reads = args.max_idle_reads;
    }
    if args.csv.is_some() {
        config.output.csv = args.csv.clone();
    }
    if args.plots.is_some() {
        config.output.plot_dir = args.plots.clone();
    }
    config.output.echo |= args.echo;

    config.validate()?;
    Ok(config)
}

/// Ask until the operator enters a positive integer
fn prompt_positive(label: &str) -> Result<u32> {
    let stdin = io::stdin();
    loop {
        print!("{}: ", label);
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Err(powerlog::Error::InvalidParameter(format!(
                "no value given for {}",
                label
            )));
        }
        match input.trim().parse::<u32>() {
            Ok(value) if value > 0 => return Ok(value),
            _ => println!("Please enter a positive whole number."),
        }
    }
}

fn session_params(config: &Config) -> Result<SessionParams> {
    if let Some(params) = config.session.params() {
        return params;
    }
    let rate = match config.session.rate_hz {
        Some(rate) => rate,
        None => prompt_positive("Enter sampling rate (Hz)")?,
    };
    let duration = match config.session.duration_s {
        Some(duration) => duration,
        None => prompt_positive("Enter total time (seconds)")?,
    };
    SessionParams::new(rate, duration)
}

fn wait_for_operator() -> Result<()> {
    print!("Press Enter to start sampling...");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(())
}

fn report_sinks(config: &Config) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(ConsoleSummarySink)];
    if let Some(path) = &config.output.csv {
        sinks.push(Box::new(CsvSink::new(path)));
    }
    if let Some(dir) = &config.output.plot_dir {
        sinks.push(Box::new(SvgPlotSink::new(dir)));
    }
    sinks
}

/// How a run ended, once reports are written
enum Outcome {
    /// `DONE` received and every report written
    Complete,
    /// Stream cut short by a link failure or stall; partial data was reported
    Incomplete,
    /// No samples to report
    NoData,
}

fn run(config: &Config, confirm: bool) -> Result<Outcome> {
    let params = session_params(config)?;
    let layout = config.session.layout;

    log::info!(
        "Port {} at {} baud, {} Hz for {} s, {} sensor layout",
        config.serial.port,
        config.serial.baud_rate,
        params.rate_hz(),
        params.duration_s(),
        layout
    );

    let mut client = SampleStreamClient::connect(&config.serial)?
        .with_stall_limit(config.session.max_idle_reads);
    client.start(params)?;

    if confirm {
        wait_for_operator()?;
    }

    let echo = config.output.echo.then(|| EchoTable::new(layout));
    if let Some(table) = &echo {
        println!("{}", table.header());
    }

    let acquisition = client.acquire(layout, |index, record| {
        if let Some(table) = &echo {
            println!("{}", table.row(index, record));
        }
    })?;
    let stats = client.stream_stats();
    let aborted = client.state() == SessionState::Aborted;
    client.close()?;

    log::info!(
        "Stream finished: {} lines, {} records, {} empty, {} wrong field count, {} unparsable, {} timeouts",
        stats.lines,
        stats.records,
        stats.empty_lines,
        stats.arity_mismatches,
        stats.malformed,
        stats.idle_reads
    );

    match acquisition {
        Acquisition::Empty => {
            println!("No data received.");
            Ok(Outcome::NoData)
        }
        Acquisition::Samples(series) => {
            let expected = params.expected_samples();
            if (series.len() as u64) < expected {
                log::warn!("Received {} of {} expected samples", series.len(), expected);
            }
            report::write_all(&mut report_sinks(config), &series)?;
            println!("Received {} samples.", series.len());
            if aborted {
                log::warn!("Stream ended without DONE; reports contain partial data");
                Ok(Outcome::Incomplete)
            } else {
                Ok(Outcome::Complete)
            }
        }
    }
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match run(&config, args.confirm) {
        Ok(Outcome::Complete) => {}
        Ok(Outcome::Incomplete | Outcome::NoData) => std::process::exit(1),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
