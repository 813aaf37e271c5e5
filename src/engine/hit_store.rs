//! The event's hit pool.
//!
//! Raw hits are calibrated and validated once per event; the resulting
//! `WireHit` pool is immutable for the event's lifetime. The taken flags
//! live alongside the pool: they are the only mutable per-hit state and are
//! owned by the single thread processing the event.

use log::warn;

use crate::error::{Result, TrackFindingError};
use crate::topology::WireTopology;
use crate::{DriftCalibration, RawHit, WireHit};

/// Calibrated hits of one event plus their taken flags.
#[derive(Debug, Default)]
pub struct HitStore {
    hits: Vec<WireHit>,
    taken: Vec<bool>,
}

impl HitStore {
    /// Calibrate and validate an event's raw hits.
    ///
    /// Hits referencing unknown wires are fatal (corrupt input). Hits with
    /// drift times before the event t0 are kept with a zero drift radius
    /// and logged.
    pub fn from_raw(
        event_id: &str,
        raw_hits: &[RawHit],
        topology: &WireTopology,
        calibration: &DriftCalibration,
    ) -> Result<Self> {
        // Deterministic pool order regardless of readout order.
        let mut sorted: Vec<&RawHit> = raw_hits.iter().collect();
        sorted.sort_by(|a, b| {
            a.wire
                .cmp(&b.wire)
                .then(a.drift_time.total_cmp(&b.drift_time))
        });

        let mut hits = Vec::with_capacity(sorted.len());
        for (index, raw) in sorted.into_iter().enumerate() {
            if !topology.contains(&raw.wire) {
                return Err(TrackFindingError::UnknownWire {
                    event_id: event_id.to_string(),
                    hit_index: index,
                    wire: raw.wire.to_string(),
                });
            }
            if raw.drift_time < calibration.t0 {
                warn!(
                    "event '{}': hit on wire {} has drift time {} before t0 {}, clamping",
                    event_id, raw.wire, raw.drift_time, calibration.t0
                );
            }
            hits.push(WireHit {
                index,
                wire: raw.wire,
                ref_pos: topology.wire_ref_position(&raw.wire),
                drift_radius: calibration.drift_radius(raw.drift_time),
                drift_sigma: calibration.resolution,
                continuous_layer: topology.continuous_layer(&raw.wire),
                axial: topology.is_axial(&raw.wire),
                stereo_slope: topology.stereo_slope(&raw.wire),
            });
        }

        let taken = vec![false; hits.len()];
        Ok(Self { hits, taken })
    }

    /// The hit pool.
    pub fn hits(&self) -> &[WireHit] {
        &self.hits
    }

    /// Number of hits in the pool.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Borrow the pool and the taken flags together.
    pub fn split_mut(&mut self) -> (&[WireHit], &mut [bool]) {
        (&self.hits, &mut self.taken)
    }

    /// The taken flags.
    pub fn taken(&self) -> &[bool] {
        &self.taken
    }

    /// Number of hits not yet claimed by a track.
    pub fn free_count(&self) -> usize {
        self.taken.iter().filter(|&&flag| !flag).count()
    }
}
