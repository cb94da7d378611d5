// Pump Twin Sim - Dataset structures
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dataset structures and I/O operations.
//!
//! CSV columns, in order:
//!
//! ```text
//! t,timestamp,V,load_torque,valve,omega,temperature,flow,pressure,vibration,label_spike,label_drift,label_dropout
//! ```
//!
//! A dropout row has all five measurement fields empty. A row with only some
//! of them empty is rejected on load.

use chrono::NaiveDateTime;
use pumptwin::{Channel, ControlInput, DatasetRow, Labels, Measurement, TIMESTAMP_FORMAT};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Dataset error types.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid timestamp at line {line}: {value}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("Invalid label at line {line}: {column}={value}")]
    InvalidLabel {
        line: usize,
        column: &'static str,
        value: u8,
    },

    #[error("Partial dropout at line {line}: {missing} of 5 channels missing")]
    PartialDropout { line: usize, missing: usize },
}

/// One CSV line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsvRecord {
    t: usize,
    timestamp: String,
    #[serde(rename = "V")]
    voltage: f64,
    load_torque: f64,
    valve: f64,
    omega: Option<f64>,
    temperature: Option<f64>,
    flow: Option<f64>,
    pressure: Option<f64>,
    vibration: Option<f64>,
    label_spike: u8,
    label_drift: u8,
    label_dropout: u8,
}

impl From<&DatasetRow> for CsvRecord {
    fn from(row: &DatasetRow) -> Self {
        Self {
            t: row.step,
            timestamp: row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            voltage: row.input.voltage,
            load_torque: row.input.load_torque,
            valve: row.input.valve,
            omega: row.reading(Channel::Omega),
            temperature: row.reading(Channel::Temperature),
            flow: row.reading(Channel::Flow),
            pressure: row.reading(Channel::Pressure),
            vibration: row.reading(Channel::Vibration),
            label_spike: u8::from(row.labels.spike),
            label_drift: u8::from(row.labels.drift),
            label_dropout: u8::from(row.labels.dropout),
        }
    }
}

impl CsvRecord {
    fn into_row(self, line: usize) -> Result<DatasetRow, DatasetError> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| DatasetError::InvalidTimestamp {
                line,
                value: self.timestamp.clone(),
            })?;

        let fields = [
            self.omega,
            self.temperature,
            self.flow,
            self.pressure,
            self.vibration,
        ];
        let missing = fields.iter().filter(|v| v.is_none()).count();
        let measurement = match missing {
            0 => Some(Measurement::from_values(fields.map(|v| v.unwrap_or_default()))),
            5 => None,
            _ => return Err(DatasetError::PartialDropout { line, missing }),
        };

        let labels = Labels {
            spike: parse_label(line, "label_spike", self.label_spike)?,
            drift: parse_label(line, "label_drift", self.label_drift)?,
            dropout: parse_label(line, "label_dropout", self.label_dropout)?,
        };

        Ok(DatasetRow {
            step: self.t,
            timestamp,
            input: ControlInput::new(self.voltage, self.load_torque, self.valve),
            measurement,
            labels,
        })
    }
}

fn parse_label(line: usize, column: &'static str, value: u8) -> Result<bool, DatasetError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DatasetError::InvalidLabel {
            line,
            column,
            value,
        }),
    }
}

/// Generated time series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Rows in step order.
    pub rows: Vec<DatasetRow>,
}

/// Number of rows carrying each label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub spike: usize,
    pub drift: usize,
    pub dropout: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: DatasetRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn label_counts(&self) -> LabelCounts {
        self.rows.iter().fold(LabelCounts::default(), |mut acc, r| {
            acc.spike += usize::from(r.labels.spike);
            acc.drift += usize::from(r.labels.drift);
            acc.dropout += usize::from(r.labels.dropout);
            acc
        })
    }

    /// Write CSV to any writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(CsvRecord::from(row))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read CSV from any reader.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<CsvRecord>().enumerate() {
            // Line 1 is the header
            rows.push(record?.into_row(i + 2)?);
        }
        Ok(Self::from_rows(rows))
    }

    /// Export to CSV file.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))
    }

    /// Import from CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::read_csv(BufReader::new(file))
    }
}
