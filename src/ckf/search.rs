//! Best-first bounded-breadth path search of the CKF.
//!
//! Starting from a seed state, the search walks outward layer by layer.
//! Every live path branches over the free candidate hits near its
//! extrapolated crossing point (accepted by the per-state filter: chi2
//! increment, charge consistency, hole budget) and additionally over the
//! hole branch that skips the layer. After each layer only the best
//! `branch_limit` paths survive.
//!
//! Among completed paths, more hits win; at equal hit count the path with
//! the shorter covered arc length wins (the densest path), then the lower
//! chi2.

use log::debug;

use crate::ckf::kalman::KalmanStepper;
use crate::ckf::state::HelixState;
use crate::engine::HitIndex;
use crate::geometry::CURVATURE_EPS;
use crate::topology::WireTopology;
use crate::{CkfConfig, RecoHit3D, RlHypothesis, WireHit};

/// One accepted hit of a path.
#[derive(Debug, Clone, Copy)]
struct AddedHit {
    hit: usize,
    arc_length: f64,
}

/// A live or finished search path.
#[derive(Debug, Clone)]
struct PathState {
    state: HelixState,
    added: Vec<AddedHit>,
    chi2: f64,
    holes: usize,
}

impl PathState {
    /// Arc length covered by the accepted hits.
    fn arc_span(&self) -> f64 {
        match (self.added.first(), self.added.last()) {
            (Some(first), Some(last)) => last.arc_length - first.arc_length,
            _ => 0.0,
        }
    }
}

/// The result of a successful extension.
#[derive(Debug, Clone)]
pub struct CkfExtension {
    /// The newly attached hits, ordered by arc length.
    pub hits: Vec<RecoHit3D>,
    /// The final filtered state.
    pub state: HelixState,
    /// Total chi2 accumulated by the accepted updates.
    pub chi2: f64,
}

/// Combinatorial Kalman filter extension of seed tracks.
#[derive(Debug, Clone)]
pub struct CkfExtender {
    pub config: CkfConfig,
}

impl CkfExtender {
    pub fn new(config: CkfConfig) -> Self {
        Self { config }
    }

    /// Extend a seed state outward from `start_layer`, consuming free hits.
    ///
    /// The winning path's hits are marked taken; competing paths of the
    /// same search never claim them. Returns `None` when no path attaches
    /// a single hit.
    pub fn extend<S: KalmanStepper>(
        &self,
        seed: HelixState,
        start_layer: usize,
        hits: &[WireHit],
        index: &HitIndex,
        taken: &mut [bool],
        topology: &WireTopology,
        stepper: &S,
    ) -> Option<CkfExtension> {
        let seed_charge = seed.curvature().signum();
        let mut frontier = vec![PathState {
            state: seed,
            added: Vec::new(),
            chi2: 0.0,
            holes: 0,
        }];
        let mut finished: Vec<PathState> = Vec::new();

        let layer_count = topology.continuous_layer_count();
        let last_layer = layer_count.min(start_layer + self.config.max_depth);

        for layer in start_layer..last_layer {
            if frontier.is_empty() {
                break;
            }
            let radius = match topology.layer_radius(layer) {
                Some(radius) => radius,
                None => break,
            };

            let mut next: Vec<PathState> = Vec::new();
            for path in frontier.drain(..) {
                let circle = path.state.circle();
                let Some(crossing) = circle.arc_length_at_cylinder(radius) else {
                    // The trajectory curls up before this layer.
                    finished.push(path);
                    continue;
                };
                let predicted = circle.position_at(crossing);

                for candidate in index.within_distance(predicted, self.config.candidate_window) {
                    if hits[candidate].continuous_layer != layer || taken[candidate] {
                        continue;
                    }
                    let mut state = path.state;
                    let Some(chi2_increment) =
                        stepper.step(&mut state, &hits[candidate], topology)
                    else {
                        continue;
                    };
                    if chi2_increment > self.config.max_chi2_increment {
                        continue;
                    }
                    // Charge consistency: the update must not flip the
                    // curvature sign of a clearly curved seed.
                    if seed_charge != 0.0
                        && seed.curvature().abs() > CURVATURE_EPS
                        && state.curvature().signum() != seed_charge
                    {
                        continue;
                    }

                    let arc_length = state.circle().arc_length_to(&hits[candidate].ref_pos);
                    let mut added = path.added.clone();
                    added.push(AddedHit {
                        hit: candidate,
                        arc_length,
                    });
                    next.push(PathState {
                        state,
                        added,
                        chi2: path.chi2 + chi2_increment,
                        holes: 0,
                    });
                }

                // The hole branch skips this layer entirely.
                if path.holes + 1 <= self.config.max_holes {
                    next.push(PathState {
                        holes: path.holes + 1,
                        ..path
                    });
                } else {
                    finished.push(path);
                }
            }

            // Keep only the best branches: more hits first, then lower chi2.
            next.sort_by(|a, b| {
                b.added
                    .len()
                    .cmp(&a.added.len())
                    .then(a.chi2.total_cmp(&b.chi2))
            });
            next.truncate(self.config.branch_limit);
            frontier = next;
        }
        finished.extend(frontier);

        // Final pair selection: hit count, then the densest path, then chi2.
        let winner = finished
            .into_iter()
            .filter(|path| !path.added.is_empty())
            .min_by(|a, b| {
                b.added
                    .len()
                    .cmp(&a.added.len())
                    .then(a.arc_span().total_cmp(&b.arc_span()))
                    .then(a.chi2.total_cmp(&b.chi2))
            })?;

        debug!(
            "ckf attached {} hit(s) with chi2 {:.2}",
            winner.added.len(),
            winner.chi2
        );
        Some(self.finalize(winner, hits, taken, topology))
    }

    /// Lift the winning path's hits to 3D with the final state and claim
    /// them.
    fn finalize(
        &self,
        winner: PathState,
        hits: &[WireHit],
        taken: &mut [bool],
        topology: &WireTopology,
    ) -> CkfExtension {
        let circle = winner.state.circle();
        let sz = winner.state.sz();

        let mut reco_hits: Vec<RecoHit3D> = winner
            .added
            .iter()
            .map(|added| {
                let hit = &hits[added.hit];
                let s = circle.arc_length_to(&hit.ref_pos);
                let z = sz
                    .z_at(s)
                    .clamp(-topology.half_length(), topology.half_length());
                let wire_pos = if hit.stereo_slope == 0.0 {
                    hit.ref_pos
                } else {
                    let tangent = hit.ref_pos.normalized().orthogonal();
                    hit.ref_pos + tangent * (hit.stereo_slope * z)
                };
                let rl = if circle.signed_distance_to(&wire_pos) > 0.0 {
                    RlHypothesis::Left
                } else {
                    RlHypothesis::Right
                };
                RecoHit3D {
                    hit: added.hit,
                    rl,
                    pos: circle.position_at(s),
                    z,
                    arc_length: s,
                }
            })
            .collect();
        reco_hits.sort_by(|a, b| a.arc_length.total_cmp(&b.arc_length));

        for reco in &reco_hits {
            assert!(!taken[reco.hit], "hit {} claimed by two paths", reco.hit);
            taken[reco.hit] = true;
        }

        CkfExtension {
            hits: reco_hits,
            state: winner.state,
            chi2: winner.chi2,
        }
    }
}
