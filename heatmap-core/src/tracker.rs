//! Per-file aircraft state: the identity table and the emission gate.
//!
//! Both structures live for exactly one file. The identity table carries
//! call sign and squawk from identity records to later position records;
//! the down-sampler keeps each aircraft's track to at most one position
//! per minute. Neither resets at frame boundaries.

use std::collections::HashMap;

use crate::decode::IdentityUpdate;

/// Minimum spacing between emitted positions of one aircraft, seconds.
pub const DOWNSAMPLE_INTERVAL: f64 = 60.0;

// ---------------------------------------------------------------------------
// Aircraft identity table
// ---------------------------------------------------------------------------

/// Maps aircraft identifier to the last `(flight, squawk)` seen in an
/// identity record. A later identity fully replaces the earlier tuple.
#[derive(Debug, Default)]
pub struct AircraftTable {
    entries: HashMap<String, (Option<String>, Option<String>)>,
}

impl AircraftTable {
    pub fn new() -> Self {
        AircraftTable {
            entries: HashMap::new(),
        }
    }

    /// Record an identity update, replacing any prior tuple for the hex.
    pub fn apply(&mut self, update: IdentityUpdate) {
        self.entries
            .insert(update.hex, (update.flight, Some(update.squawk)));
    }

    /// Current `(flight, squawk)` for an aircraft; `(None, None)` if no
    /// identity record has been seen in this file.
    pub fn lookup(&self, hex: &str) -> (Option<String>, Option<String>) {
        self.entries.get(hex).cloned().unwrap_or((None, None))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Down-sampler
// ---------------------------------------------------------------------------

/// Per-aircraft emission gate: admit a position iff the aircraft has not
/// emitted yet, or at least the configured interval has passed since its
/// last admitted position.
#[derive(Debug)]
pub struct Downsampler {
    min_interval: f64,
    last_emitted: HashMap<String, f64>,
}

impl Downsampler {
    pub fn new(min_interval: f64) -> Self {
        Downsampler {
            min_interval,
            last_emitted: HashMap::new(),
        }
    }

    /// Gate a candidate position. Updates the aircraft's last-emitted
    /// time only when the position is admitted.
    pub fn admit(&mut self, hex: &str, t: f64) -> bool {
        match self.last_emitted.get(hex) {
            Some(&last) if t - last < self.min_interval => false,
            _ => {
                self.last_emitted.insert(hex.to_string(), t);
                true
            }
        }
    }

    /// Number of aircraft that have emitted at least one position.
    pub fn aircraft_count(&self) -> usize {
        self.last_emitted.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
