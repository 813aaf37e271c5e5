//! Facet construction: right/left-tagged hit triples.
//!
//! A facet is an ordered triple of wire hits on three consecutive layers of
//! one supercluster, together with a right/left passage hypothesis for each
//! hit. The two common tangents of the drift circles (start-middle and
//! middle-end) must exist and agree for the triple to survive; the surviving
//! facets are the cells of the first automaton stage.
//!
//! All eight right/left combinations of a geometric triple are tried; every
//! feasible one becomes its own facet. Competing hypotheses dissolve in the
//! automaton, which only extends the best chain.

use crate::geometry::{common_tangent, normalize_angle, Vector2D};
use crate::topology::WireTopology;
use crate::{FacetConfig, RlHypothesis, RlWireHit, WireHit};

/// An ordered hit triple with resolved right/left hypotheses.
///
/// Owns no hits, only indices into the event's hit pool, plus the tangent
/// geometry computed during construction.
#[derive(Debug, Clone)]
pub struct Facet {
    /// Start, middle and end hit, ordered from the inner layer out.
    pub hits: [RlWireHit; 3],
    /// Touch point on the start drift circle.
    pub start_pos: Vector2D,
    /// Averaged middle touch point of the two tangents.
    pub middle_pos: Vector2D,
    /// Touch point on the end drift circle.
    pub end_pos: Vector2D,
    /// Direction angle of the start-middle tangent.
    pub start_phi: f64,
    /// Direction angle of the middle-end tangent.
    pub end_phi: f64,
    /// Continuous layer index of the start hit; the stage key for the
    /// automaton ordering.
    pub start_layer: usize,
}

impl Facet {
    /// Bending angle between the two tangents.
    pub fn deviation(&self) -> f64 {
        normalize_angle(self.end_phi - self.start_phi)
    }

    /// Rough curvature estimate from the tangent bend over the covered arc.
    pub fn curvature_estimate(&self) -> f64 {
        let arc = self.start_pos.distance_to(&self.middle_pos)
            + self.middle_pos.distance_to(&self.end_pos);
        if arc > 0.0 {
            self.deviation() / arc
        } else {
            0.0
        }
    }

    /// Whether `other` continues this facet: it must start on the shared
    /// middle/end hits with identical right/left tags.
    pub fn is_continued_by(&self, other: &Facet) -> bool {
        self.hits[1] == other.hits[0] && self.hits[2] == other.hits[1]
    }
}

const RL_CHOICES: [RlHypothesis; 2] = [RlHypothesis::Right, RlHypothesis::Left];

/// Generate all feasible facets of one supercluster.
///
/// Hits are grouped by continuous layer; for every run of three consecutive
/// layers, hit triples within the azimuthal window are tested in all eight
/// right/left combinations. The output is deterministic: triples are visited
/// in sorted hit order, hypotheses in a fixed order.
pub fn generate_facets(
    hits: &[WireHit],
    cluster_hits: &[usize],
    topology: &WireTopology,
    config: &FacetConfig,
) -> Vec<Facet> {
    // Bucket the cluster's hits by continuous layer, sorted by wire.
    let mut layers: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut sorted: Vec<usize> = cluster_hits.to_vec();
    sorted.sort_by_key(|&index| (hits[index].continuous_layer, hits[index].wire));
    for &index in &sorted {
        let layer = hits[index].continuous_layer;
        match layers.last_mut() {
            Some((last, bucket)) if *last == layer => bucket.push(index),
            _ => layers.push((layer, vec![index])),
        }
    }

    let mut facets = Vec::new();
    for window in layers.windows(3) {
        let [(l0, inner), (l1, middle), (l2, outer)] = window else {
            continue;
        };
        if l1 - l0 != 1 || l2 - l1 != 1 {
            continue;
        }
        for &m in middle {
            let phi_m = hits[m].ref_pos.phi();
            let phi_window = azimuthal_window(hits, m, topology, config);
            for &s in inner {
                if normalize_angle(hits[s].ref_pos.phi() - phi_m).abs() > phi_window {
                    continue;
                }
                for &e in outer {
                    if normalize_angle(hits[e].ref_pos.phi() - phi_m).abs() > phi_window {
                        continue;
                    }
                    try_rl_combinations(hits, s, m, e, config, &mut facets);
                }
            }
        }
    }
    facets
}

/// Azimuthal half-window around a hit, in radians.
fn azimuthal_window(
    hits: &[WireHit],
    hit_index: usize,
    topology: &WireTopology,
    config: &FacetConfig,
) -> f64 {
    let wire = &hits[hit_index].wire;
    let wire_count = topology
        .layer(wire)
        .map_or(160, |layer| layer.wire_count)
        .max(1);
    config.phi_window_cells * std::f64::consts::TAU / wire_count as f64
}

/// Try all eight right/left combinations of a geometric triple.
fn try_rl_combinations(
    hits: &[WireHit],
    start: usize,
    middle: usize,
    end: usize,
    config: &FacetConfig,
    facets: &mut Vec<Facet>,
) {
    for rl_start in RL_CHOICES {
        for rl_middle in RL_CHOICES {
            for rl_end in RL_CHOICES {
                if let Some(facet) =
                    build_facet(hits, start, middle, end, rl_start, rl_middle, rl_end, config)
                {
                    facets.push(facet);
                }
            }
        }
    }
}

/// Construct a single facet from a triple and a right/left assignment, or
/// reject it when the tangent geometry does not close.
#[allow(clippy::too_many_arguments)]
fn build_facet(
    hits: &[WireHit],
    start: usize,
    middle: usize,
    end: usize,
    rl_start: RlHypothesis,
    rl_middle: RlHypothesis,
    rl_end: RlHypothesis,
    config: &FacetConfig,
) -> Option<Facet> {
    let hit_s = &hits[start];
    let hit_m = &hits[middle];
    let hit_e = &hits[end];

    let first = common_tangent(
        hit_s.ref_pos,
        rl_start.sign() * hit_s.drift_radius,
        hit_m.ref_pos,
        rl_middle.sign() * hit_m.drift_radius,
    )?;
    let second = common_tangent(
        hit_m.ref_pos,
        rl_middle.sign() * hit_m.drift_radius,
        hit_e.ref_pos,
        rl_end.sign() * hit_e.drift_radius,
    )?;

    let bend = normalize_angle(second.phi() - first.phi());
    if bend.abs() > config.angle_cut {
        return None;
    }
    if first.touch2.distance_to(&second.touch1) > config.middle_distance_cut {
        return None;
    }

    Some(Facet {
        hits: [
            RlWireHit {
                hit: start,
                rl: rl_start,
            },
            RlWireHit {
                hit: middle,
                rl: rl_middle,
            },
            RlWireHit {
                hit: end,
                rl: rl_end,
            },
        ],
        start_pos: first.touch1,
        middle_pos: (first.touch2 + second.touch1) * 0.5,
        end_pos: second.touch2,
        start_phi: first.phi(),
        end_phi: second.phi(),
        start_layer: hit_s.continuous_layer,
    })
}
