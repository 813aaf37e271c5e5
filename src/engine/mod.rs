//! # Track Finding Engine
//!
//! Orchestrates the per-event pipeline with focused subcomponents:
//!
//! - `HitStore` - hit calibration and the taken flags
//! - `HitIndex` - R-tree over hit positions for candidate windows
//!
//! The pipeline per event:
//! 1. calibrate hits into the pool
//! 2. cluster hits into superclusters
//! 3. generate facets per cluster and link them into segments
//! 4. combine axial and stereo segments into pairs
//! 5. assemble tracks from pair chains (cellular automaton)
//! 6. extend every track with the combinatorial Kalman filter
//! 7. merge broken fragments
//!
//! Within one event everything is single-threaded; the optional `parallel`
//! feature parallelizes over events only.

pub mod hit_index;
pub mod hit_store;

pub use hit_index::{HitIndex, IndexedHit};
pub use hit_store::HitStore;

use log::{debug, info, warn};
use serde::Serialize;

use crate::ckf::{CkfExtender, HelixState, WireMeasurementStepper};
use crate::clustering::find_superclusters;
use crate::error::{Result, TrackFindingError};
use crate::facets::generate_facets;
use crate::filters::{FacetLinkFilter, PairLinkFilter, SegmentLinkFilter};
use crate::pairs::build_segment_pairs;
use crate::segments::{build_segments, Segment2D};
use crate::tracks::{assemble_tracks, merge_tracks, Track, Trajectory3D};
use crate::{DriftCalibration, EventData, FinderConfig, RawHit, WireTopology};

/// Minimum number of hits for an event to be processed at all.
const MIN_EVENT_HITS: usize = 3;

/// Seed variances of the CKF state: (impact, phi0, curvature, z0,
/// tan_lambda).
const SEED_VARIANCES: [f64; 5] = [0.04, 1e-4, 1e-6, 4.0, 0.04];

/// Per-event counters for monitoring.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EngineStats {
    pub hit_count: usize,
    pub cluster_count: usize,
    pub facet_count: usize,
    pub segment_count: usize,
    pub pair_count: usize,
    pub track_count: usize,
    pub ckf_added_hits: usize,
}

/// The track finding engine.
///
/// Owns the validated topology, calibration and configuration; processing
/// an event is a pure function of those plus the raw hits, so batches of
/// events can run in parallel.
#[derive(Debug)]
pub struct TrackFindingEngine {
    topology: WireTopology,
    calibration: DriftCalibration,
    config: FinderConfig,
    last_stats: EngineStats,
}

impl TrackFindingEngine {
    /// Create an engine. The calibration is validated here; the topology
    /// was validated at its construction.
    pub fn new(
        topology: WireTopology,
        calibration: DriftCalibration,
        config: FinderConfig,
    ) -> Result<Self> {
        calibration.validate()?;
        Ok(Self {
            topology,
            calibration,
            config,
            last_stats: EngineStats::default(),
        })
    }

    /// The wire topology.
    pub fn topology(&self) -> &WireTopology {
        &self.topology
    }

    /// Current configuration.
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: FinderConfig) {
        self.config = config;
    }

    /// Counters of the most recently processed event.
    pub fn stats(&self) -> &EngineStats {
        &self.last_stats
    }

    /// Process one event and return its track candidates.
    pub fn process_event(&mut self, event_id: &str, raw_hits: &[RawHit]) -> Result<Vec<Track>> {
        let (tracks, stats) = self.run_event(event_id, raw_hits)?;
        self.last_stats = stats;
        Ok(tracks)
    }

    /// Process a batch of events sequentially.
    pub fn process_events(&mut self, events: &[EventData]) -> Vec<Result<Vec<Track>>> {
        events
            .iter()
            .map(|event| self.process_event(&event.event_id, &event.hits))
            .collect()
    }

    /// Process a batch of events in parallel, one event per task.
    ///
    /// Event results keep the input order. The per-event stats counters are
    /// not accumulated in this mode.
    #[cfg(feature = "parallel")]
    pub fn process_events_parallel(&self, events: &[EventData]) -> Vec<Result<Vec<Track>>> {
        use rayon::prelude::*;
        events
            .par_iter()
            .map(|event| {
                self.run_event(&event.event_id, &event.hits)
                    .map(|(tracks, _)| tracks)
            })
            .collect()
    }

    /// Serialize tracks to JSON, logging instead of failing on error.
    pub fn tracks_to_json(&self, tracks: &[Track]) -> String {
        serde_json::to_string(tracks).unwrap_or_else(|e| {
            warn!("Failed to serialize tracks: {}", e);
            "[]".to_string()
        })
    }

    /// The full pipeline for one event.
    fn run_event(&self, event_id: &str, raw_hits: &[RawHit]) -> Result<(Vec<Track>, EngineStats)> {
        if raw_hits.len() < MIN_EVENT_HITS {
            return Err(TrackFindingError::InsufficientHits {
                event_id: event_id.to_string(),
                hit_count: raw_hits.len(),
                minimum_required: MIN_EVENT_HITS,
            });
        }

        let mut store = HitStore::from_raw(event_id, raw_hits, &self.topology, &self.calibration)?;
        let mut stats = EngineStats {
            hit_count: store.len(),
            ..EngineStats::default()
        };

        // Stage 1: clustering.
        let clusters = find_superclusters(store.hits(), &self.topology, &self.config.cluster);
        stats.cluster_count = clusters.len();

        // Stages 2 and 3: facets and segments, per cluster.
        let facet_filter = FacetLinkFilter::new(self.config.segment.angle_cut);
        let mut segments: Vec<Segment2D> = Vec::new();
        for cluster in &clusters {
            let facets = generate_facets(
                store.hits(),
                &cluster.hits,
                &self.topology,
                &self.config.facet,
            );
            stats.facet_count += facets.len();
            segments.extend(build_segments(
                store.hits(),
                &facets,
                &facet_filter,
                &self.config.segment,
                self.calibration.resolution,
            ));
        }
        stats.segment_count = segments.len();

        // Stage 4: axial/stereo pairing.
        let segment_filter = SegmentLinkFilter::default();
        let pairs = build_segment_pairs(
            store.hits(),
            &segments,
            &self.topology,
            &segment_filter,
            &self.config.pair,
        );
        stats.pair_count = pairs.len();

        // Stage 5: track assembly.
        let pair_filter = PairLinkFilter::new(
            self.config.pair.curvature_cut,
            self.config.pair.tan_lambda_cut,
        );
        let (hits, taken) = store.split_mut();
        let mut tracks = assemble_tracks(hits, &segments, &pairs, &self.topology, &pair_filter, taken);

        // Stage 6: CKF extension, best seeds first.
        tracks.sort_by(|a, b| b.len().cmp(&a.len()).then(a.chi2.total_cmp(&b.chi2)));
        let mut index = HitIndex::new();
        index.rebuild_from_hits(hits);
        let extender = CkfExtender::new(self.config.ckf.clone());
        let stepper = WireMeasurementStepper::default();

        for track in &mut tracks {
            let Some(outer_layer) = track
                .hits
                .iter()
                .map(|reco| hits[reco.hit].continuous_layer)
                .max()
            else {
                continue;
            };
            let seed = HelixState::new(track.end.circle, track.end.sz, SEED_VARIANCES);
            if let Some(extension) = extender.extend(
                seed,
                outer_layer + 1,
                hits,
                &index,
                taken,
                &self.topology,
                &stepper,
            ) {
                let added_hits = extension.hits.len();
                stats.ckf_added_hits += added_hits;
                track.hits.extend(extension.hits);
                track
                    .hits
                    .sort_by(|a, b| a.arc_length.total_cmp(&b.arc_length));
                track.chi2 += extension.chi2;
                track.ndf += added_hits;
                track.end = Trajectory3D {
                    circle: extension.state.circle(),
                    sz: extension.state.sz(),
                };
            }
        }

        // Stage 7: merging.
        let tracks = merge_tracks(tracks, store.hits(), &self.topology, &self.config.merge);
        stats.track_count = tracks.len();

        info!(
            "event '{}': {} hits -> {} clusters -> {} segments -> {} pairs -> {} tracks",
            event_id,
            stats.hit_count,
            stats.cluster_count,
            stats.segment_count,
            stats.pair_count,
            stats.track_count
        );
        debug!(
            "event '{}': {} facets, {} ckf-attached hits, {} free hits left",
            event_id,
            stats.facet_count,
            stats.ckf_added_hits,
            store.free_count()
        );

        Ok((tracks, stats))
    }
}
