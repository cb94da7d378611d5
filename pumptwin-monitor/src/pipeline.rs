// Pump Twin Monitor - Monitoring pipeline
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Streaming and batch monitoring.
//!
//! No threshold-dependent alert is raised before the baseline is frozen:
//! the streaming [`Monitor`] buffers the warmup rows, freezes, then replays
//! them through the filters before taking new rows.

use crate::alert::{AlertEngine, AlertLog, AlertRecord, AlertRules, AlertSink};
use crate::baseline::{Baseline, Baseliner, ThresholdRecord};
use crate::error::{MonitorError, Result};
use crate::sensor::{SensorBank, SensorMonitor};
use log::{debug, info};
use pumptwin::{Channel, DatasetRow, FilterError, KalmanParams, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::thread;

/// How `run_monitor` schedules the channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Execution {
    /// All channels on the calling thread.
    #[default]
    Sequential,
    /// One scoped worker per channel, each fed in step order.
    PerChannelWorkers,
}

/// Outcome of a monitoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub baseline: Baseline,
    pub alerts: AlertLog,
    pub sink_failures: usize,
    /// Filter estimates after the last row, in channel order.
    pub final_estimates: [Option<f64>; 5],
    pub rows: usize,
}

/// Streaming monitor. Rows must arrive in increasing step order.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    rules: AlertRules,
    bank: SensorBank,
    engine: AlertEngine,
    baseliner: Option<Baseliner>,
    baseline: Option<Baseline>,
    warmup: Vec<DatasetRow>,
    last_step: Option<usize>,
    rows: usize,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let rules = AlertRules::from_config(&config);
        Ok(Self {
            bank: SensorBank::new(config.kalman)?,
            engine: AlertEngine::new(),
            baseliner: Some(Baseliner::new(&config)),
            baseline: None,
            warmup: Vec::with_capacity(config.warmup_steps),
            last_step: None,
            rows: 0,
            rules,
            config,
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.engine = self.engine.with_sink(sink);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Frozen baseline, `None` during warmup.
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn alerts(&self) -> &AlertLog {
        self.engine.log()
    }

    /// Feed the next row.
    pub fn push(&mut self, row: DatasetRow) -> Result<()> {
        if let Some(previous) = self.last_step {
            if row.step <= previous {
                return Err(MonitorError::OutOfOrder {
                    previous,
                    step: row.step,
                });
            }
        }
        self.last_step = Some(row.step);
        self.rows += 1;

        if self.baseline.is_some() {
            return self.evaluate(&row);
        }

        let full = match self.baseliner.as_mut() {
            Some(baseliner) => {
                baseliner.observe(row.measurement.as_ref());
                baseliner.is_full()
            }
            None => false,
        };
        self.warmup.push(row);
        if full {
            self.freeze()?;
        }
        Ok(())
    }

    /// Flush a short stream and produce the report.
    pub fn finish(mut self) -> Result<MonitorReport> {
        if self.baseline.is_none() {
            self.freeze()?;
        }
        let final_estimates = self.bank.estimates();
        let sink_failures = self.engine.sink_failures();
        let alerts = self.engine.into_log();
        info!(
            "Monitored {} rows: {} alerts, {} sink failures",
            self.rows,
            alerts.total(),
            sink_failures
        );

        Ok(MonitorReport {
            baseline: self.baseline.unwrap_or_else(|| Baseliner::new(&self.config).freeze()),
            alerts,
            sink_failures,
            final_estimates,
            rows: self.rows,
        })
    }

    fn freeze(&mut self) -> Result<()> {
        let Some(baseliner) = self.baseliner.take() else {
            return Ok(());
        };
        let baseline = baseliner.freeze();
        debug!("Baseline frozen after {} rows", baseline.rows());
        self.baseline = Some(baseline);

        for row in std::mem::take(&mut self.warmup) {
            self.evaluate(&row)?;
        }
        Ok(())
    }

    fn evaluate(&mut self, row: &DatasetRow) -> Result<()> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Ok(());
        };
        let mut alerts = Vec::new();
        for channel in Channel::ALL {
            alerts.extend(check_reading(
                self.bank.get_mut(channel),
                &self.rules,
                row.step,
                row.reading(channel),
                baseline.get(channel),
            )?);
        }
        self.engine.record_row(row.step, alerts);
        Ok(())
    }
}

fn check_reading(
    monitor: &mut SensorMonitor,
    rules: &AlertRules,
    step: usize,
    z: Option<f64>,
    record: &ThresholdRecord,
) -> std::result::Result<Vec<AlertRecord>, FilterError> {
    let reading = monitor.observe(z)?;
    Ok(rules.check(step, monitor.channel(), reading, record))
}

/// Monitor a complete stream.
pub fn run_monitor(
    rows: &[DatasetRow],
    config: &MonitorConfig,
    execution: Execution,
) -> Result<MonitorReport> {
    match execution {
        Execution::Sequential => {
            let mut monitor = Monitor::new(config.clone())?;
            for row in rows {
                monitor.push(row.clone())?;
            }
            monitor.finish()
        }
        Execution::PerChannelWorkers => run_per_channel(rows, config),
    }
}

/// Per-channel output of a worker.
struct ChannelOutcome {
    /// Alerts for each row, in row order.
    alerts: Vec<Vec<AlertRecord>>,
    final_estimate: Option<f64>,
}

fn run_per_channel(rows: &[DatasetRow], config: &MonitorConfig) -> Result<MonitorReport> {
    config.validate()?;
    check_order(rows)?;

    let rules = AlertRules::from_config(config);
    let baseline = Baseline::from_rows(rows, config);

    let outcomes = thread::scope(|scope| {
        let mut senders = Vec::with_capacity(Channel::ALL.len());
        let mut workers = Vec::with_capacity(Channel::ALL.len());

        for channel in Channel::ALL {
            let (tx, rx) = mpsc::channel::<(usize, Option<f64>)>();
            let record = *baseline.get(channel);
            let params = config.kalman;
            let worker =
                scope.spawn(move || channel_worker(channel, params, rules, record, rx));
            senders.push(tx);
            workers.push((channel, worker));
        }

        for row in rows {
            for (channel, tx) in Channel::ALL.iter().zip(&senders) {
                // A closed queue means the worker failed; its result reports why
                if tx.send((row.step, row.reading(*channel))).is_err() {
                    break;
                }
            }
        }
        drop(senders);

        workers
            .into_iter()
            .map(|(channel, worker)| match worker.join() {
                Ok(outcome) => outcome.map_err(MonitorError::from),
                Err(_) => Err(MonitorError::WorkerPanicked { channel }),
            })
            .collect::<Result<Vec<ChannelOutcome>>>()
    })?;

    let mut engine = AlertEngine::new();
    for (i, row) in rows.iter().enumerate() {
        let alerts = outcomes
            .iter()
            .flat_map(|o| o.alerts[i].iter().cloned())
            .collect();
        engine.record_row(row.step, alerts);
    }

    let mut final_estimates = [None; 5];
    for (slot, outcome) in final_estimates.iter_mut().zip(&outcomes) {
        *slot = outcome.final_estimate;
    }

    let alerts = engine.into_log();
    info!(
        "Monitored {} rows on {} channel workers: {} alerts",
        rows.len(),
        outcomes.len(),
        alerts.total()
    );

    Ok(MonitorReport {
        baseline,
        alerts,
        sink_failures: 0,
        final_estimates,
        rows: rows.len(),
    })
}

fn channel_worker(
    channel: Channel,
    params: KalmanParams,
    rules: AlertRules,
    record: ThresholdRecord,
    queue: mpsc::Receiver<(usize, Option<f64>)>,
) -> std::result::Result<ChannelOutcome, FilterError> {
    let mut monitor = SensorMonitor::new(channel, params)?;
    let mut alerts = Vec::new();
    for (step, z) in queue {
        alerts.push(check_reading(&mut monitor, &rules, step, z, &record)?);
    }
    Ok(ChannelOutcome {
        alerts,
        final_estimate: monitor.estimate(),
    })
}

fn check_order(rows: &[DatasetRow]) -> Result<()> {
    for pair in rows.windows(2) {
        if pair[1].step <= pair[0].step {
            return Err(MonitorError::OutOfOrder {
                previous: pair[0].step,
                step: pair[1].step,
            });
        }
    }
    Ok(())
}
