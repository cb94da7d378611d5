// Pump Twin Sim - Simulation context
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-run mutable state.
//!
//! One `SimContext` owns the seeded random stream, the sticky drift record and
//! the shared calibration drift of a single generation run. Every stage gets
//! it passed in, so independent runs never share state.

use pumptwin::Channel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Sticky drift record of one run.
///
/// Once `active` is set it stays set, and the offsets only accumulate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftState {
    active: bool,
    offsets: [f64; 5],
}

impl DriftState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Accumulated offset of a channel.
    pub fn offset(&self, channel: Channel) -> f64 {
        self.offsets[channel.index()]
    }

    /// Add `increment` to a channel offset and return the new offset.
    pub fn accumulate(&mut self, channel: Channel, increment: f64) -> f64 {
        let offset = &mut self.offsets[channel.index()];
        *offset += increment;
        *offset
    }
}

/// Seeded generator handle plus the persistent state of one run.
#[derive(Debug, Clone)]
pub struct SimContext {
    rng: StdRng,
    drift: DriftState,
    shared_drift: f64,
}

impl SimContext {
    /// Fresh context for a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            drift: DriftState::new(),
            shared_drift: 0.0,
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn drift(&self) -> &DriftState {
        &self.drift
    }

    /// Random stream and drift record borrowed together.
    pub fn parts_mut(&mut self) -> (&mut StdRng, &mut DriftState) {
        (&mut self.rng, &mut self.drift)
    }

    /// Current value of the shared calibration drift walk.
    pub fn shared_drift(&self) -> f64 {
        self.shared_drift
    }

    /// Add an increment to the shared drift walk and return the new value.
    pub fn advance_shared_drift(&mut self, increment: f64) -> f64 {
        self.shared_drift += increment;
        self.shared_drift
    }
}
