//! Axial/stereo segment pairing.
//!
//! A segment pair combines a segment with a partner in the next superlayer,
//! one of them axial and one stereo. The axial member supplies the circle;
//! the stereo member's hits are shifted along their skewed wires until they
//! touch that circle, which turns them into (arc length, z) observations
//! for the SZ line fit. Pairs whose fit is inconsistent are dropped; the
//! survivors are the cells of the track-assembly automaton.

use log::debug;

use crate::filters::RelationFilter;
use crate::fitting::{SzFit, SzFitter};
use crate::geometry::CircleTrajectory;
use crate::segments::Segment2D;
use crate::topology::WireTopology;
use crate::{PairConfig, WireHit};

/// A combination of two segments in adjacent superlayers (one axial, one
/// stereo) carrying a common fit result.
#[derive(Debug, Clone)]
pub struct SegmentPair {
    /// Index of the inner segment.
    pub from_segment: usize,
    /// Index of the outer segment.
    pub to_segment: usize,
    /// Circle trajectory of the axial member.
    pub circle: CircleTrajectory,
    /// SZ fit over the stereo member's hits.
    pub sz: SzFit,
    /// Total number of hits covered by both segments.
    pub hit_count: usize,
    /// Superlayer of the inner segment; the stage key for the automaton
    /// ordering.
    pub from_superlayer: u8,
}

impl SegmentPair {
    /// Transverse curvature of the pair trajectory.
    pub fn curvature(&self) -> f64 {
        self.circle.curvature
    }

    /// Longitudinal slope of the pair trajectory.
    pub fn tan_lambda(&self) -> f64 {
        self.sz.line.tan_lambda
    }
}

/// The two z candidates of a stereo hit on a given circle, one per
/// right/left hypothesis.
#[derive(Debug, Clone, Copy)]
pub struct StereoCandidate {
    /// Arc length of the touch point along the circle.
    pub s: f64,
    /// Reconstructed z.
    pub z: f64,
    /// Sign of the right/left hypothesis that produced this candidate.
    pub rl_sign: f64,
}

/// Shift a stereo hit along its wire until its drift circle touches the
/// trajectory. Returns up to two candidates (right and left hypothesis)
/// inside the active wire length.
pub fn reconstruct_stereo(
    hit: &WireHit,
    circle: &CircleTrajectory,
    topology: &WireTopology,
) -> Vec<StereoCandidate> {
    let slope = hit.stereo_slope;
    if slope == 0.0 {
        return Vec::new();
    }
    let half_length = topology.half_length();
    let tangent = hit.ref_pos.normalized().orthogonal();

    // The signed distance to the circle is close to linear in z over the
    // wire length; two evaluations fix the line.
    let position_at = |z: f64| hit.ref_pos + tangent * (slope * z);
    let d0 = circle.signed_distance_to(&position_at(0.0));
    let d1 = circle.signed_distance_to(&position_at(half_length));
    let gradient = (d1 - d0) / half_length;
    if gradient.abs() < 1e-12 {
        return Vec::new();
    }

    let mut candidates = Vec::with_capacity(2);
    for rl_sign in [1.0, -1.0] {
        let z = (rl_sign * hit.drift_radius - d0) / gradient;
        if z.abs() <= half_length * 1.05 {
            let s = circle.arc_length_to(&position_at(z));
            candidates.push(StereoCandidate { s, z, rl_sign });
        }
    }
    candidates
}

/// Build all accepted segment pairs.
///
/// Candidate partners are restricted to the next superlayer through a
/// sorted-range window (binary search over the superlayer keys), then
/// pre-filtered by the relation filter before the expensive SZ fit runs.
pub fn build_segment_pairs<F>(
    hits: &[WireHit],
    segments: &[Segment2D],
    topology: &WireTopology,
    filter: &F,
    config: &PairConfig,
) -> Vec<SegmentPair>
where
    F: RelationFilter<Segment2D>,
{
    // Sorted view over the segments by superlayer for the window lookup.
    let mut order: Vec<usize> = (0..segments.len()).collect();
    order.sort_by_key(|&index| (segments[index].superlayer, segments[index].start_layer));
    let keys: Vec<u8> = order.iter().map(|&index| segments[index].superlayer).collect();

    let mut pairs = Vec::new();
    for &from_index in &order {
        let from = &segments[from_index];
        let next = from.superlayer + 1;
        let begin = keys.partition_point(|&superlayer| superlayer < next);
        let end = keys.partition_point(|&superlayer| superlayer <= next);

        for &to_index in &order[begin..end] {
            let to = &segments[to_index];
            // Exactly one member must be stereo.
            if from.axial == to.axial {
                continue;
            }
            if filter.weight(from, to).is_nan() {
                continue;
            }
            if let Some(pair) =
                fit_pair(hits, segments, from_index, to_index, topology, config)
            {
                pairs.push(pair);
            }
        }
    }

    debug!("segment pairing: {} segments, {} pairs", segments.len(), pairs.len());
    pairs
}

/// Fit a single candidate pair, or reject it.
fn fit_pair(
    hits: &[WireHit],
    segments: &[Segment2D],
    from_index: usize,
    to_index: usize,
    topology: &WireTopology,
    config: &PairConfig,
) -> Option<SegmentPair> {
    let from = &segments[from_index];
    let to = &segments[to_index];
    let (axial, stereo) = if from.axial { (from, to) } else { (to, from) };

    let circle = axial.fit.as_ref()?.trajectory;

    // First pass: per hit, prefer the candidate closer to the chamber
    // midplane.
    let candidate_sets: Vec<Vec<StereoCandidate>> = stereo
        .hits
        .iter()
        .map(|reco| reconstruct_stereo(&hits[reco.hit], &circle, topology))
        .collect();

    let first_pass: Vec<(f64, f64)> = candidate_sets
        .iter()
        .filter_map(|candidates| {
            candidates
                .iter()
                .min_by(|a, b| a.z.abs().total_cmp(&b.z.abs()))
                .map(|candidate| (candidate.s, candidate.z))
        })
        .collect();

    let sigma_z = stereo_sigma_z(hits, stereo);
    let fitter = SzFitter;
    let rough = fitter.fit(&first_pass, sigma_z)?;

    // Second pass: re-pick each hit's candidate against the rough line.
    let refined: Vec<(f64, f64)> = candidate_sets
        .iter()
        .filter_map(|candidates| {
            candidates
                .iter()
                .min_by(|a, b| {
                    (a.z - rough.line.z_at(a.s))
                        .abs()
                        .total_cmp(&(b.z - rough.line.z_at(b.s)).abs())
                })
                .map(|candidate| (candidate.s, candidate.z))
        })
        .collect();

    let sz = fitter.fit(&refined, sigma_z)?;

    if sz.line.tan_lambda.abs() > config.max_tan_lambda {
        return None;
    }
    if sz.ndf > 0 && sz.chi2 / sz.ndf as f64 > config.max_sz_chi2_ndf {
        return None;
    }

    Some(SegmentPair {
        from_segment: from_index,
        to_segment: to_index,
        circle,
        sz,
        hit_count: from.len() + to.len(),
        from_superlayer: from.superlayer,
    })
}

/// Effective z resolution of a stereo segment: the drift resolution scaled
/// up by the wire skew.
fn stereo_sigma_z(hits: &[WireHit], stereo: &Segment2D) -> f64 {
    let slope = stereo
        .hits
        .first()
        .map_or(0.006, |reco| hits[reco.hit].stereo_slope.abs().max(1e-6));
    let sigma = stereo
        .hits
        .first()
        .map_or(0.015, |reco| hits[reco.hit].drift_sigma);
    sigma / slope
}
