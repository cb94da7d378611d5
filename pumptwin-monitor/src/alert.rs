// Pump Twin Monitor - Alerting
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Alert rules, the alert log and alert sinks.
//!
//! Per row and channel:
//!
//! - `DROPOUT`: the reading is missing; no other rule runs for that channel.
//! - `THRESH`: `std > 0` and `|z - mean| > sigma_k * std`.
//! - `RESID`: `|z - estimate| > max(residual_k * std, residual_floor)`.
//!
//! Log lines look like `12:pressure:THRESH breach z=310.204 thr=78.911`, one
//! line per row, entries joined by `" | "`.

use crate::baseline::ThresholdRecord;
use crate::sensor::Reading;
use log::warn;
use pumptwin::{Channel, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Alert rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// Missing reading.
    Dropout,
    /// Reading outside the frozen band.
    Thresh,
    /// Reading far from the filtered estimate.
    Resid,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Dropout => "DROPOUT",
            AlertKind::Thresh => "THRESH",
            AlertKind::Resid => "RESID",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub step: usize,
    pub channel: Channel,
    pub kind: AlertKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AlertRecord {
    pub fn dropout(step: usize, channel: Channel) -> Self {
        Self {
            step,
            channel,
            kind: AlertKind::Dropout,
            detail: None,
        }
    }

    pub fn threshold(step: usize, channel: Channel, z: f64, threshold: f64) -> Self {
        Self {
            step,
            channel,
            kind: AlertKind::Thresh,
            detail: Some(format!("breach z={:.3} thr={:.3}", z, threshold)),
        }
    }

    pub fn residual(step: usize, channel: Channel, residual: f64) -> Self {
        Self {
            step,
            channel,
            kind: AlertKind::Resid,
            detail: Some(format!("breach z-est={:.3}", residual)),
        }
    }
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.step, self.channel, self.kind)?;
        if let Some(detail) = &self.detail {
            write!(f, " {}", detail)?;
        }
        Ok(())
    }
}

/// Rule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertRules {
    pub sigma_k: f64,
    pub residual_k: f64,
    pub residual_floor: f64,
}

impl AlertRules {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            sigma_k: config.sigma_k,
            residual_k: config.residual_k,
            residual_floor: config.residual_floor,
        }
    }

    /// Alerts for one channel reading against its baseline.
    pub fn check(
        &self,
        step: usize,
        channel: Channel,
        reading: Reading,
        record: &ThresholdRecord,
    ) -> Vec<AlertRecord> {
        let (z, estimate) = match reading {
            Reading::Dropout => return vec![AlertRecord::dropout(step, channel)],
            Reading::Filtered { z, estimate } => (z, estimate),
        };

        let mut alerts = Vec::new();
        if record.std > 0.0 && (z - record.mean).abs() > self.sigma_k * record.std {
            alerts.push(AlertRecord::threshold(step, channel, z, record.threshold));
        }
        let residual = z - estimate;
        if residual.abs() > (self.residual_k * record.std).max(self.residual_floor) {
            alerts.push(AlertRecord::residual(step, channel, residual));
        }
        alerts
    }
}

impl Default for AlertRules {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

/// Ordered, append-only alert history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertLog {
    records: Vec<AlertRecord>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: AlertRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = AlertRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    /// Running total.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn for_step(&self, step: usize) -> impl Iterator<Item = &AlertRecord> {
        self.records.iter().filter(move |r| r.step == step)
    }

    /// One line per row with alerts.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;
        while start < self.records.len() {
            let step = self.records[start].step;
            let end = self.records[start..]
                .iter()
                .position(|r| r.step != step)
                .map_or(self.records.len(), |n| start + n);
            lines.push(join_row(&self.records[start..end]));
            start = end;
        }
        lines
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for line in self.lines() {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()
    }

    /// Write the text log to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }
}

fn join_row(alerts: &[AlertRecord]) -> String {
    alerts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Receives each row's alerts as they are raised.
pub trait AlertSink: Send {
    fn emit(&mut self, step: usize, alerts: &[AlertRecord]) -> io::Result<()>;
}

/// Writes the text log format to any writer.
pub struct TextSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl TextSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> AlertSink for TextSink<W> {
    fn emit(&mut self, _step: usize, alerts: &[AlertRecord]) -> io::Result<()> {
        writeln!(self.writer, "{}", join_row(alerts))?;
        self.writer.flush()
    }
}

/// Records alerts and forwards them to the sink.
#[derive(Default)]
pub struct AlertEngine {
    log: AlertLog,
    sink: Option<Box<dyn AlertSink>>,
    sink_failures: usize,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn log(&self) -> &AlertLog {
        &self.log
    }

    pub fn sink_failures(&self) -> usize {
        self.sink_failures
    }

    /// Record one row's alerts, in channel order.
    pub fn record_row(&mut self, step: usize, alerts: Vec<AlertRecord>) {
        if alerts.is_empty() {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.emit(step, &alerts) {
                self.sink_failures += 1;
                warn!("Alert sink failed at step {}: {}", step, e);
            }
        }
        self.log.extend(alerts);
    }

    pub fn into_log(self) -> AlertLog {
        self.log
    }
}

impl fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertEngine")
            .field("alerts", &self.log.total())
            .field("has_sink", &self.sink.is_some())
            .field("sink_failures", &self.sink_failures)
            .finish()
    }
}
