// Pump Twin Monitor - Warmup baselines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-channel baselines frozen after the warmup window.

use log::{debug, warn};
use pumptwin::{Channel, DatasetRow, Measurement, MonitorConfig};
use serde::{Deserialize, Serialize};

/// Running mean and sample variance of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl FieldStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean, 0 with no samples.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation (n - 1), 0 with fewer than two samples.
    pub fn std(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
    }
}

/// How much data a threshold was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineQuality {
    /// Two or more samples.
    Full,
    /// One sample, std is 0.
    SingleSample,
    /// No samples, mean and std are 0.
    AllMissing,
}

impl BaselineQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineQuality::Full => "full",
            BaselineQuality::SingleSample => "single-sample",
            BaselineQuality::AllMissing => "all-missing",
        }
    }
}

/// Frozen baseline of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    pub mean: f64,
    pub std: f64,
    /// `mean + k * std`.
    pub threshold: f64,
    /// Non-missing warmup samples.
    pub samples: usize,
    pub quality: BaselineQuality,
}

impl ThresholdRecord {
    pub fn from_stats(stats: &FieldStats, sigma_k: f64) -> Self {
        let quality = match stats.count() {
            0 => BaselineQuality::AllMissing,
            1 => BaselineQuality::SingleSample,
            _ => BaselineQuality::Full,
        };
        let (mean, std) = (stats.mean(), stats.std());
        Self {
            mean,
            std,
            threshold: mean + sigma_k * std,
            samples: stats.count(),
            quality,
        }
    }
}

/// Frozen per-channel baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    records: [ThresholdRecord; 5],
    /// Warmup rows the baseline was built from.
    rows: usize,
}

impl Baseline {
    /// Build from the leading warmup rows of a complete stream.
    pub fn from_rows(rows: &[DatasetRow], config: &MonitorConfig) -> Self {
        let mut baseliner = Baseliner::new(config);
        for row in rows.iter().take(config.warmup_steps) {
            baseliner.observe(row.measurement.as_ref());
        }
        baseliner.freeze()
    }

    pub fn get(&self, channel: Channel) -> &ThresholdRecord {
        &self.records[channel.index()]
    }

    pub fn records(&self) -> &[ThresholdRecord; 5] {
        &self.records
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Channels whose baseline is not `Full`.
    pub fn degraded(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.get(*c).quality != BaselineQuality::Full)
            .collect()
    }
}

/// Accumulates warmup rows until frozen.
#[derive(Debug, Clone)]
pub struct Baseliner {
    warmup_steps: usize,
    sigma_k: f64,
    rows: usize,
    stats: [FieldStats; 5],
}

impl Baseliner {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            warmup_steps: config.warmup_steps,
            sigma_k: config.sigma_k,
            rows: 0,
            stats: [FieldStats::new(); 5],
        }
    }

    /// Add one warmup row. Missing samples are skipped.
    pub fn observe(&mut self, measurement: Option<&Measurement>) {
        self.rows += 1;
        if let Some(m) = measurement {
            for (stats, value) in self.stats.iter_mut().zip(m.values()) {
                stats.add_sample(value);
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// True once the warmup window is complete.
    pub fn is_full(&self) -> bool {
        self.rows >= self.warmup_steps
    }

    /// Freeze over the rows seen so far.
    pub fn freeze(self) -> Baseline {
        if !self.is_full() {
            warn!(
                "Stream ended after {} of {} warmup rows, freezing baseline early",
                self.rows, self.warmup_steps
            );
        }

        let records = Channel::ALL.map(|c| {
            let record = ThresholdRecord::from_stats(&self.stats[c.index()], self.sigma_k);
            match record.quality {
                BaselineQuality::Full => debug!(
                    "Baseline {}: mean={:.3} std={:.3} thr={:.3}",
                    c, record.mean, record.std, record.threshold
                ),
                quality => warn!(
                    "Baseline {} is {} ({} samples), threshold rule disabled",
                    c,
                    quality.as_str(),
                    record.samples
                ),
            }
            record
        });

        Baseline {
            records,
            rows: self.rows,
        }
    }
}
