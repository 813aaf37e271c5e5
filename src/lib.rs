//! # Wiretrack
//!
//! Drift-chamber track finding library for particle physics reconstruction.
//!
//! This library provides:
//! - Hit clustering over the wire neighborhood (union-find superclusters)
//! - Local pattern recognition via right/left-tagged hit triples (facets)
//! - Cellular-automaton path selection over weighted relation graphs
//! - Axial/stereo segment pairing with Riemann circle and SZ line fits
//! - Combinatorial Kalman filter (CKF) track extension across layers
//! - Track merging and a modular per-event engine
//!
//! ## Features
//!
//! - **`parallel`** - Enable batch event processing with rayon
//! - **`synthetic`** - Enable the synthetic event generator (tests, benches)
//! - **`cli`** - Build the `wiretrack-cli` debug binary
//!
//! ## Quick Start
//!
//! ```rust
//! use wiretrack::{
//!     DriftCalibration, FinderConfig, RawHit, TrackFindingEngine, WireId, WireTopology,
//! };
//!
//! let topology = WireTopology::standard();
//! let calibration = DriftCalibration::default();
//! let mut engine =
//!     TrackFindingEngine::new(topology, calibration, FinderConfig::default()).unwrap();
//!
//! let hits = vec![
//!     RawHit { wire: WireId::new(0, 0, 10), drift_time: 40.0 },
//!     RawHit { wire: WireId::new(0, 1, 10), drift_time: 25.0 },
//!     RawHit { wire: WireId::new(0, 2, 11), drift_time: 60.0 },
//! ];
//!
//! let tracks = engine.process_event("event-1", &hits).unwrap();
//! println!("found {} track candidate(s)", tracks.len());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackFindingError};

// Geometric primitives (vectors, circles, tangents, SZ lines)
pub mod geometry;
pub use geometry::{CircleTrajectory, SzLine, Vector2D};

// Wire layout of the chamber
pub mod topology;
pub use topology::{LayerSpec, StereoKind, SuperlayerSpec, WireId, WireTopology};

// Union-Find data structure for clustering
pub mod union_find;
pub use union_find::UnionFind;

// Cellular automaton over weighted relation graphs
pub mod automaton;
pub use automaton::{CellularAutomaton, WeightedRelation};

// Relation filters (cut-based and learned)
pub mod filters;
pub use filters::{RelationFilter, Weight};

// Hit clustering
pub mod clustering;
pub use clustering::{find_superclusters, Supercluster};

// Facet construction
pub mod facets;
pub use facets::{generate_facets, Facet};

// Least-squares fits
pub mod fitting;
pub use fitting::{CircleFit, RiemannFitter, SzFit, SzFitter};

// Segment construction from facet paths
pub mod segments;
pub use segments::{build_segments, Segment2D};

// Axial/stereo segment pairing
pub mod pairs;
pub use pairs::{build_segment_pairs, SegmentPair};

// Track assembly and merging
pub mod tracks;
pub use tracks::{merge_tracks, Track};

// Combinatorial Kalman filter extension
pub mod ckf;
pub use ckf::{CkfExtender, HelixState, KalmanStepper, WireMeasurementStepper};

// Modular per-event engine
pub mod engine;
pub use engine::{EngineStats, HitIndex, HitStore, TrackFindingEngine};

// Synthetic event generation for stress testing and benchmarking
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A raw digitized hit as read from the event input: a wire and a drift time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// The wire that registered the hit.
    pub wire: WireId,
    /// Measured drift time in ns.
    pub drift_time: f64,
}

/// A complete event: an identifier plus its raw hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub event_id: String,
    pub hits: Vec<RawHit>,
}

/// A calibrated wire hit, owned by the event's hit pool.
///
/// Carries the drift circle (reference position plus drift radius) and the
/// topology lookups the finder stages need, so the hot loops never go back
/// to the topology.
#[derive(Debug, Clone)]
pub struct WireHit {
    /// Index of this hit in the event's hit pool.
    pub index: usize,
    /// The wire that registered the hit.
    pub wire: WireId,
    /// Wire reference position at z = 0.
    pub ref_pos: Vector2D,
    /// Drift radius in cm (always non-negative).
    pub drift_radius: f64,
    /// Drift-distance resolution in cm.
    pub drift_sigma: f64,
    /// Continuous layer index across all superlayers.
    pub continuous_layer: usize,
    /// Whether the wire is axial.
    pub axial: bool,
    /// Tangential displacement per cm of z (zero for axial wires).
    pub stereo_slope: f64,
}

/// Right/left passage hypothesis of a trajectory relative to a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RlHypothesis {
    /// The wire lies to the right of the direction of flight.
    Right,
    /// The wire lies to the left of the direction of flight.
    Left,
    /// Not yet determined.
    Unknown,
}

impl RlHypothesis {
    /// Sign of the hypothesis: +1 for left, -1 for right, 0 for unknown.
    ///
    /// This is the sign of the drift radius in the tangent construction and
    /// in drift-circle fits: a positive signed radius places the wire to the
    /// left of the flight direction.
    pub fn sign(&self) -> f64 {
        match self {
            RlHypothesis::Left => 1.0,
            RlHypothesis::Right => -1.0,
            RlHypothesis::Unknown => 0.0,
        }
    }

    /// The opposite hypothesis. Unknown stays unknown.
    pub fn reversed(&self) -> RlHypothesis {
        match self {
            RlHypothesis::Left => RlHypothesis::Right,
            RlHypothesis::Right => RlHypothesis::Left,
            RlHypothesis::Unknown => RlHypothesis::Unknown,
        }
    }
}

/// A wire hit decorated with a right/left passage hypothesis.
///
/// Created during facet construction, discarded at the end of the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RlWireHit {
    /// Index into the event's hit pool.
    pub hit: usize,
    pub rl: RlHypothesis,
}

/// A two-dimensional reconstructed hit: a wire hit with a resolved
/// right/left hypothesis and a transverse position on the drift circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoHit2D {
    /// Index into the event's hit pool.
    pub hit: usize,
    pub rl: RlHypothesis,
    /// Reconstructed transverse position.
    pub pos: Vector2D,
}

/// A three-dimensional reconstructed hit on a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoHit3D {
    /// Index into the event's hit pool.
    pub hit: usize,
    pub rl: RlHypothesis,
    /// Reconstructed transverse position.
    pub pos: Vector2D,
    /// Reconstructed z position.
    pub z: f64,
    /// Arc length along the track trajectory, measured from the perigee.
    pub arc_length: f64,
}

// ============================================================================
// Calibration
// ============================================================================

/// Linear drift-time to drift-radius conversion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriftCalibration {
    /// Drift velocity in cm/ns.
    /// Default: 0.004 (40 um/ns)
    pub drift_velocity: f64,

    /// Event time offset in ns, subtracted from every drift time.
    /// Default: 0.0
    pub t0: f64,

    /// Single-hit drift-distance resolution in cm.
    /// Default: 0.015
    pub resolution: f64,
}

impl Default for DriftCalibration {
    fn default() -> Self {
        Self {
            drift_velocity: 0.004,
            t0: 0.0,
            resolution: 0.015,
        }
    }
}

impl DriftCalibration {
    /// Validate the calibration. Non-positive drift velocity or resolution
    /// is a fatal configuration error.
    pub fn validate(&self) -> Result<()> {
        if self.drift_velocity <= 0.0 {
            return Err(TrackFindingError::InvalidCalibration {
                reason: format!("non-positive drift velocity {}", self.drift_velocity),
            });
        }
        if self.resolution <= 0.0 {
            return Err(TrackFindingError::InvalidCalibration {
                reason: format!("non-positive resolution {}", self.resolution),
            });
        }
        Ok(())
    }

    /// Convert a drift time to a drift radius in cm.
    ///
    /// Negative corrected times yield a zero radius (on-wire passage).
    pub fn drift_radius(&self, drift_time: f64) -> f64 {
        ((drift_time - self.t0) * self.drift_velocity).max(0.0)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for hit clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Minimum number of hits for a supercluster to be kept.
    /// Default: 3 (smaller clusters cannot form a facet)
    pub min_cluster_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 3,
        }
    }
}

/// Configuration for facet construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetConfig {
    /// Azimuthal half-window around a hit when collecting facet partners,
    /// in units of the local cell pitch.
    /// Default: 2.5
    pub phi_window_cells: f64,

    /// Maximum angle between the two tangents of a facet in radians.
    /// Default: 0.4
    pub angle_cut: f64,

    /// Maximum distance between the two middle touch points in cm.
    /// Default: 0.25
    pub middle_distance_cut: f64,
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            phi_window_cells: 2.5,
            angle_cut: 0.4,
            middle_distance_cut: 0.25,
        }
    }
}

/// Configuration for segment construction from facet chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Maximum angle between consecutive facet directions in radians.
    /// Default: 0.3
    pub angle_cut: f64,

    /// Minimum number of hits in an emitted segment.
    /// Default: 3
    pub min_segment_hits: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            angle_cut: 0.3,
            min_segment_hits: 3,
        }
    }
}

/// Configuration for axial/stereo segment pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConfig {
    /// Maximum reduced chi2 of the SZ fit of a pair.
    /// Default: 30.0
    pub max_sz_chi2_ndf: f64,

    /// Maximum absolute longitudinal slope of a pair.
    /// Default: 1.8
    pub max_tan_lambda: f64,

    /// Maximum curvature difference between chained pairs in 1/cm.
    /// Default: 0.006
    pub curvature_cut: f64,

    /// Maximum tan(lambda) difference between chained pairs.
    /// Default: 0.35
    pub tan_lambda_cut: f64,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            max_sz_chi2_ndf: 30.0,
            max_tan_lambda: 1.8,
            curvature_cut: 0.006,
            tan_lambda_cut: 0.35,
        }
    }
}

/// Configuration for the combinatorial Kalman filter extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CkfConfig {
    /// Maximum chi2 increment for accepting a hit.
    /// Default: 25.0
    pub max_chi2_increment: f64,

    /// Number of best branches kept per extension step.
    /// Default: 8
    pub branch_limit: usize,

    /// Maximum number of consecutive layers without an accepted hit.
    /// Default: 2
    pub max_holes: usize,

    /// Half-width of the transverse candidate window around the
    /// extrapolated crossing point, in cm.
    /// Default: 3.0
    pub candidate_window: f64,

    /// Maximum number of extension steps (layers) per seed.
    /// Default: 64
    pub max_depth: usize,
}

impl Default for CkfConfig {
    fn default() -> Self {
        Self {
            max_chi2_increment: 25.0,
            branch_limit: 8,
            max_holes: 2,
            candidate_window: 3.0,
            max_depth: 64,
        }
    }
}

/// Configuration for the track merging postprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Minimum combined-fit probability for two tracks to be merged.
    /// Default: 0.6
    pub min_probability: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_probability: 0.6,
        }
    }
}

/// Top-level configuration of the track finder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinderConfig {
    pub cluster: ClusterConfig,
    pub facet: FacetConfig,
    pub segment: SegmentConfig,
    pub pair: PairConfig,
    pub ckf: CkfConfig,
    pub merge: MergeConfig,
}
