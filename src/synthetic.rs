//! Synthetic event generator for stress testing and benchmarking.
//!
//! Generates events with a known set of helix tracks, realistic drift
//! distances with Gaussian smearing, configurable hit efficiency and noise,
//! providing ground truth for validation of the finder stages.
//!
//! Feature-gated behind `synthetic` - not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use wiretrack::synthetic::SyntheticScenario;
//! use wiretrack::{DriftCalibration, WireTopology};
//!
//! let topology = WireTopology::standard();
//! let calibration = DriftCalibration::default();
//!
//! let scenario = SyntheticScenario {
//!     track_count: 3,
//!     noise_hits: 20,
//!     seed: 42,
//!     ..SyntheticScenario::default()
//! };
//!
//! let generated = scenario.generate(&topology, &calibration);
//! assert_eq!(generated.truth.len(), 3);
//! assert!(!generated.event.hits.is_empty());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{CircleTrajectory, SzLine};
use crate::topology::{WireId, WireTopology};
use crate::{DriftCalibration, EventData, RawHit};

/// Configuration of a synthetic event.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// Number of tracks per event.
    pub track_count: usize,
    /// Range of the curvature magnitude in 1/cm; the sign is random.
    pub curvature_range: (f64, f64),
    /// Range of the tan(lambda) magnitude; the sign is random.
    pub tan_lambda_range: (f64, f64),
    /// Gaussian sigma of the impact parameter in cm.
    pub impact_sigma: f64,
    /// Gaussian sigma of the production z in cm.
    pub z0_sigma: f64,
    /// Number of uniformly distributed noise hits.
    pub noise_hits: usize,
    /// Probability that a crossed cell actually fires.
    pub hit_efficiency: f64,
    /// Gaussian smearing of the drift distance in cm.
    pub drift_smearing: f64,
    /// RNG seed; the same seed reproduces the same event.
    pub seed: u64,
}

impl Default for SyntheticScenario {
    fn default() -> Self {
        Self {
            track_count: 5,
            curvature_range: (0.002, 0.008),
            tan_lambda_range: (0.0, 0.8),
            impact_sigma: 0.1,
            z0_sigma: 1.0,
            noise_hits: 30,
            hit_efficiency: 0.97,
            drift_smearing: 0.015,
            seed: 4711,
        }
    }
}

/// Ground truth of one generated track.
#[derive(Debug, Clone)]
pub struct TruthTrack {
    pub circle: CircleTrajectory,
    pub sz: SzLine,
    /// Wires the track deposited a hit on, innermost first.
    pub hit_wires: Vec<WireId>,
}

/// A generated event with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticEvent {
    pub event: EventData,
    pub truth: Vec<TruthTrack>,
}

impl SyntheticScenario {
    /// Generate one event.
    pub fn generate(
        &self,
        topology: &WireTopology,
        calibration: &DriftCalibration,
    ) -> SyntheticEvent {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut hits: Vec<RawHit> = Vec::new();
        let mut truth: Vec<TruthTrack> = Vec::new();

        for _ in 0..self.track_count {
            truth.push(self.generate_track(topology, calibration, &mut rng, &mut hits));
        }

        for _ in 0..self.noise_hits {
            hits.push(self.generate_noise_hit(topology, calibration, &mut rng));
        }

        SyntheticEvent {
            event: EventData {
                event_id: format!("synthetic-{}", self.seed),
                hits,
            },
            truth,
        }
    }

    /// Generate a batch of events with consecutive seeds.
    pub fn generate_batch(
        &self,
        count: usize,
        topology: &WireTopology,
        calibration: &DriftCalibration,
    ) -> Vec<SyntheticEvent> {
        (0..count)
            .map(|offset| {
                let scenario = SyntheticScenario {
                    seed: self.seed.wrapping_add(offset as u64),
                    ..self.clone()
                };
                scenario.generate(topology, calibration)
            })
            .collect()
    }

    /// Sample one helix and deposit its hits.
    fn generate_track(
        &self,
        topology: &WireTopology,
        calibration: &DriftCalibration,
        rng: &mut StdRng,
        hits: &mut Vec<RawHit>,
    ) -> TruthTrack {
        let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        let curvature = sign * rng.gen_range(self.curvature_range.0..=self.curvature_range.1);
        let phi0 = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
        let impact = gaussian(rng) * self.impact_sigma;
        let circle = CircleTrajectory::new(curvature, phi0, impact);

        let slope_sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        let tan_lambda =
            slope_sign * rng.gen_range(self.tan_lambda_range.0..=self.tan_lambda_range.1);
        let sz = SzLine::new(gaussian(rng) * self.z0_sigma, tan_lambda);

        let mut hit_wires = Vec::new();
        for layer in 0..topology.continuous_layer_count() {
            let Some(radius) = topology.layer_radius(layer) else {
                break;
            };
            let Some(s) = circle.arc_length_at_cylinder(radius) else {
                // The track curls up inside this layer.
                break;
            };
            let z = sz.z_at(s);
            if z.abs() > topology.half_length() {
                break;
            }

            let crossing = circle.position_at(s);
            let Some((superlayer, in_layer)) = topology.split_continuous_layer(layer) else {
                break;
            };

            // For stereo layers the fired wire is the one whose displaced
            // position at this z is nearest.
            let slope = topology
                .superlayer(superlayer as u8)
                .map_or(0.0, |sl| sl.stereo_slope);
            let wire_phi = crossing.phi() - slope * z / radius;
            let Some(wire) = topology.nearest_wire(superlayer as u8, in_layer as u8, wire_phi)
            else {
                continue;
            };

            let wire_pos = topology.wire_position_at_z(&wire, z);
            let mut drift = circle.signed_distance_to(&wire_pos).abs();
            drift = (drift + gaussian(rng) * self.drift_smearing).max(0.0);

            // Crossings landing outside the cell do not fire it.
            if drift > 0.8 {
                continue;
            }
            if rng.gen::<f64>() >= self.hit_efficiency {
                continue;
            }

            hits.push(RawHit {
                wire,
                drift_time: drift / calibration.drift_velocity + calibration.t0,
            });
            hit_wires.push(wire);
        }

        TruthTrack {
            circle,
            sz,
            hit_wires,
        }
    }

    /// A uniformly random hit anywhere in the chamber.
    fn generate_noise_hit(
        &self,
        topology: &WireTopology,
        calibration: &DriftCalibration,
        rng: &mut StdRng,
    ) -> RawHit {
        let superlayer = rng.gen_range(0..topology.superlayer_count()) as u8;
        let spec = topology
            .superlayer(superlayer)
            .expect("superlayer index in range");
        let layer = rng.gen_range(0..spec.layers.len()) as u8;
        let wire_count = spec.layers[layer as usize].wire_count;
        let wire = WireId::new(superlayer, layer, rng.gen_range(0..wire_count));

        let max_drift = 0.5;
        let drift = rng.gen_range(0.0..max_drift);
        RawHit {
            wire,
            drift_time: drift / calibration.drift_velocity + calibration.t0,
        }
    }
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
