//! SVG time-series charts
//!
//! Writes `voltage.svg`, `current.svg` and `power.svg` (one line per sensor)
//! plus `overview.svg` with the three quantities stacked.

use super::ReportSink;
use crate::error::{Error, Result};
use crate::sample::{Quantity, SensorLayout};
use crate::series::SampleSeries;
use std::fs;
use std::path::{Path, PathBuf};
use svg::node::element::{Circle, Group, Line, Polyline, Rectangle, Text};
use svg::Document;

/// Colorblind-friendly palette (Okabe-Ito), one entry per sensor.
mod colors {
    pub const VOLTAGE: [&str; 2] = ["#0072B2", "#D55E00"];
    pub const CURRENT: [&str; 2] = ["#009E73", "#E69F00"];
    pub const POWER: [&str; 2] = ["#CC79A7", "#8C564B"];
    pub const GRID: &str = "#BBBBBB";
    pub const AXIS: &str = "#333333";
}

const CHART_WIDTH: f64 = 960.0;
const CHART_HEIGHT: f64 = 480.0;
const PANEL_HEIGHT: f64 = 280.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;
const TICKS: usize = 5;

fn palette(quantity: Quantity) -> [&'static str; 2] {
    match quantity {
        Quantity::Voltage => colors::VOLTAGE,
        Quantity::Current => colors::CURRENT,
        Quantity::Power => colors::POWER,
    }
}

struct Trace {
    label: String,
    color: &'static str,
    points: Vec<(f64, f64)>,
}

/// Axis range padded so flat lines stay visible
fn value_range(traces: &[Trace]) -> (f64, f64) {
    let (lo, hi) = traces
        .iter()
        .flat_map(|trace| trace.points.iter().map(|&(_, y)| y))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });

    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad, hi + pad)
}

fn traces_for(series: &SampleSeries, quantity: Quantity) -> Vec<Trace> {
    let layout = series.layout();
    let times = series.time_axis();
    (0..layout.sensor_count())
        .map(|sensor| {
            let values = series.quantity(sensor, quantity);
            let label = match layout {
                SensorLayout::Single => quantity.to_string(),
                SensorLayout::Dual => format!("{} {}", layout.sensor_label(sensor), quantity.name()),
            };
            // nan/inf readings are kept in the series but cannot be drawn
            let points = times
                .iter()
                .copied()
                .zip(values)
                .filter(|(_, v)| v.is_finite())
                .collect();
            Trace {
                label,
                color: palette(quantity)[sensor % 2],
                points,
            }
        })
        .collect()
}

/// One framed chart with gridlines, tick labels, traces and legend
fn panel(
    origin_y: f64,
    height: f64,
    title: &str,
    y_label: &str,
    x_max: f64,
    traces: &[Trace],
) -> Group {
    let left = MARGIN_LEFT;
    let right = CHART_WIDTH - MARGIN_RIGHT;
    let top = origin_y + MARGIN_TOP;
    let bottom = origin_y + height - MARGIN_BOTTOM;
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };
    let (y_min, y_max) = value_range(traces);

    let sx = |t: f64| left + (t / x_max) * (right - left);
    let sy = |v: f64| bottom - (v - y_min) / (y_max - y_min) * (bottom - top);

    let mut group = Group::new().add(
        Rectangle::new()
            .set("x", left)
            .set("y", top)
            .set("width", right - left)
            .set("height", bottom - top)
            .set("fill", "none")
            .set("stroke", colors::AXIS),
    );

    for tick in 0..=TICKS {
        let fraction = tick as f64 / TICKS as f64;

        let y = bottom - fraction * (bottom - top);
        let value = y_min + fraction * (y_max - y_min);
        group = group
            .add(
                Line::new()
                    .set("x1", left)
                    .set("y1", y)
                    .set("x2", right)
                    .set("y2", y)
                    .set("stroke", colors::GRID)
                    .set("stroke-opacity", 0.3),
            )
            .add(
                Text::new(format!("{:.3}", value))
                    .set("x", left - 6.0)
                    .set("y", y + 4.0)
                    .set("text-anchor", "end")
                    .set("font-size", 11)
                    .set("font-family", "sans-serif"),
            );

        let x = left + fraction * (right - left);
        group = group
            .add(
                Line::new()
                    .set("x1", x)
                    .set("y1", top)
                    .set("x2", x)
                    .set("y2", bottom)
                    .set("stroke", colors::GRID)
                    .set("stroke-opacity", 0.3),
            )
            .add(
                Text::new(format!("{:.2}", fraction * x_max))
                    .set("x", x)
                    .set("y", bottom + 16.0)
                    .set("text-anchor", "middle")
                    .set("font-size", 11)
                    .set("font-family", "sans-serif"),
            );
    }

    group = group
        .add(
            Text::new(title)
                .set("x", (left + right) / 2.0)
                .set("y", origin_y + MARGIN_TOP - 14.0)
                .set("text-anchor", "middle")
                .set("font-size", 15)
                .set("font-weight", "bold")
                .set("font-family", "sans-serif"),
        )
        .add(
            Text::new("Time (s)")
                .set("x", (left + right) / 2.0)
                .set("y", bottom + 36.0)
                .set("text-anchor", "middle")
                .set("font-size", 12)
                .set("font-family", "sans-serif"),
        )
        .add(
            Text::new(y_label)
                .set("x", 18.0)
                .set("y", (top + bottom) / 2.0)
                .set("text-anchor", "middle")
                .set("font-size", 12)
                .set("font-family", "sans-serif")
                .set(
                    "transform",
                    format!("rotate(-90 18 {})", (top + bottom) / 2.0),
                ),
        );

    for (i, trace) in traces.iter().enumerate() {
        if let [(t, v)] = trace.points[..] {
            group = group.add(
                Circle::new()
                    .set("cx", sx(t))
                    .set("cy", sy(v))
                    .set("r", 3)
                    .set("fill", trace.color),
            );
        } else {
            let points: Vec<String> = trace
                .points
                .iter()
                .map(|&(t, v)| format!("{:.2},{:.2}", sx(t), sy(v)))
                .collect();
            group = group.add(
                Polyline::new()
                    .set("points", points.join(" "))
                    .set("fill", "none")
                    .set("stroke", trace.color)
                    .set("stroke-width", 2)
                    .set("stroke-linejoin", "round"),
            );
        }

        // legend, top-right inside the frame
        let legend_y = top + 16.0 + i as f64 * 16.0;
        let legend_x = right - 160.0;
        group = group
            .add(
                Line::new()
                    .set("x1", legend_x)
                    .set("y1", legend_y - 4.0)
                    .set("x2", legend_x + 20.0)
                    .set("y2", legend_y - 4.0)
                    .set("stroke", trace.color)
                    .set("stroke-width", 2),
            )
            .add(
                Text::new(trace.label.as_str())
                    .set("x", legend_x + 26.0)
                    .set("y", legend_y)
                    .set("font-size", 11)
                    .set("font-family", "sans-serif"),
            );
    }

    group
}

fn chart_title(layout: SensorLayout, quantity: Quantity) -> String {
    match layout {
        SensorLayout::Single => format!("{} vs Time", quantity.name()),
        SensorLayout::Dual => format!("{} Comparison", quantity.name()),
    }
}

/// Single-quantity chart document
fn quantity_chart(series: &SampleSeries, quantity: Quantity) -> Document {
    let traces = traces_for(series, quantity);
    Document::new()
        .set("width", CHART_WIDTH)
        .set("height", CHART_HEIGHT)
        .set("viewBox", (0.0, 0.0, CHART_WIDTH, CHART_HEIGHT))
        .add(
            Rectangle::new()
                .set("width", CHART_WIDTH)
                .set("height", CHART_HEIGHT)
                .set("fill", "white"),
        )
        .add(panel(
            0.0,
            CHART_HEIGHT,
            &chart_title(series.layout(), quantity),
            &quantity.to_string(),
            series.duration_s(),
            &traces,
        ))
}

/// Voltage, current and power stacked in one document
fn overview_chart(series: &SampleSeries) -> Document {
    let height = PANEL_HEIGHT * Quantity::ALL.len() as f64;
    let title = match series.layout() {
        SensorLayout::Single => "Voltage, Current, and Power vs Time",
        SensorLayout::Dual => "Dual Sensor Monitoring",
    };

    let mut doc = Document::new()
        .set("width", CHART_WIDTH)
        .set("height", height)
        .set("viewBox", (0.0, 0.0, CHART_WIDTH, height))
        .add(
            Rectangle::new()
                .set("width", CHART_WIDTH)
                .set("height", height)
                .set("fill", "white"),
        );

    for (row, quantity) in Quantity::ALL.into_iter().enumerate() {
        let traces = traces_for(series, quantity);
        let panel_title = if row == 0 { title } else { "" };
        doc = doc.add(panel(
            row as f64 * PANEL_HEIGHT,
            PANEL_HEIGHT,
            panel_title,
            &quantity.to_string(),
            series.duration_s(),
            &traces,
        ));
    }
    doc
}

/// Writes SVG charts into a directory
pub struct SvgPlotSink {
    dir: PathBuf,
}

impl SvgPlotSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Files this sink produces, in write order
    pub fn output_paths(&self) -> Vec<PathBuf> {
        ["voltage.svg", "current.svg", "power.svg", "overview.svg"]
            .iter()
            .map(|name| self.dir.join(name))
            .collect()
    }
}

impl ReportSink for SvgPlotSink {
    fn name(&self) -> &'static str {
        "svg plots"
    }

    fn write(&mut self, series: &SampleSeries) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Plot(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let paths = self.output_paths();
        let documents = Quantity::ALL
            .into_iter()
            .map(|quantity| quantity_chart(series, quantity))
            .chain(std::iter::once(overview_chart(series)));

        for (path, document) in paths.iter().zip(documents) {
            svg::save(path, &document)?;
            log::info!("Saved plot {}", path.display());
        }
        Ok(())
    }
}
