//! Track assembly and merging.
//!
//! Segment pairs form the cells of the final automaton stage: pairs sharing
//! their middle segment chain into tracks when their fitted trajectories
//! agree. Every extracted chain is flattened into an ordered sequence of
//! 3D reconstructed hits with a start and end trajectory.
//!
//! Hit exclusivity is enforced here: the automaton emits its paths best
//! first, and each track claims the hits that are still free. A chain left
//! with too few free hits is dropped.
//!
//! A merging postprocess joins broken track fragments: per track the best
//! merge partner is the one maximizing the combined circle-fit probability,
//! and merging repeats until no pair clears the probability cut.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::automaton::CellularAutomaton;
use crate::filters::RelationFilter;
use crate::fitting::{chi2_probability, RiemannFitter, SzFit, SzFitter};
use crate::geometry::{CircleTrajectory, SzLine, Vector2D};
use crate::pairs::{reconstruct_stereo, SegmentPair, StereoCandidate};
use crate::segments::Segment2D;
use crate::topology::WireTopology;
use crate::{MergeConfig, RecoHit2D, RecoHit3D, RlHypothesis, WireHit};

/// Minimum number of free hits a freshly assembled track must claim.
const MIN_TRACK_HITS: usize = 5;

/// A 3D trajectory: transverse circle plus longitudinal SZ line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trajectory3D {
    pub circle: CircleTrajectory,
    pub sz: SzLine,
}

/// A track candidate: ordered 3D hits plus trajectories at both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Hits ordered by arc length along the trajectory.
    pub hits: Vec<RecoHit3D>,
    /// Trajectory fitted at the inner end.
    pub start: Trajectory3D,
    /// Trajectory fitted at the outer end.
    pub end: Trajectory3D,
    /// Total chi2 of the transverse and longitudinal fits.
    pub chi2: f64,
    /// Combined degrees of freedom.
    pub ndf: usize,
}

impl Track {
    /// Number of hits on the track.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether the track has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Fit probability of the track.
    pub fn probability(&self) -> f64 {
        chi2_probability(self.chi2, self.ndf)
    }

    /// Arc length covered between the first and last hit.
    pub fn arc_span(&self) -> f64 {
        match (self.hits.first(), self.hits.last()) {
            (Some(first), Some(last)) => last.arc_length - first.arc_length,
            _ => 0.0,
        }
    }
}

/// Run the automaton over the segment pairs and assemble the extracted
/// chains into tracks, claiming free hits first-come best-first.
pub fn assemble_tracks<F>(
    hits: &[WireHit],
    segments: &[Segment2D],
    pairs: &[SegmentPair],
    topology: &WireTopology,
    filter: &F,
    taken: &mut [bool],
) -> Vec<Track>
where
    F: RelationFilter<SegmentPair>,
{
    if pairs.is_empty() {
        return Vec::new();
    }

    // Topological cell order: inner superlayer first.
    let mut order: Vec<usize> = (0..pairs.len()).collect();
    order.sort_by_key(|&index| (pairs[index].from_superlayer, pairs[index].from_segment));
    let keys: Vec<u8> = order.iter().map(|&index| pairs[index].from_superlayer).collect();

    let mut automaton =
        CellularAutomaton::new(order.iter().map(|&index| pairs[index].hit_count as f64).collect());
    for (cell_from, &pair_from) in order.iter().enumerate() {
        let from = &pairs[pair_from];
        let next = from.from_superlayer + 1;
        let begin = keys.partition_point(|&superlayer| superlayer < next);
        let end = keys.partition_point(|&superlayer| superlayer <= next);
        for cell_to in begin..end {
            let to = &pairs[order[cell_to]];
            automaton.add_relation(cell_from, cell_to, filter.weight(from, to));
        }
    }

    let paths = automaton.find_paths(0.0);
    debug!(
        "track automaton: {} pairs, {} relations, {} chains",
        pairs.len(),
        automaton.relation_count(),
        paths.len()
    );

    let mut tracks = Vec::new();
    for path in paths {
        let chain: Vec<&SegmentPair> = path.iter().map(|&cell| &pairs[order[cell]]).collect();
        if let Some(track) = track_from_chain(hits, segments, &chain, topology, taken) {
            tracks.push(track);
        }
    }
    tracks
}

/// Flatten a chain of segment pairs into a track, claiming free hits.
fn track_from_chain(
    hits: &[WireHit],
    segments: &[Segment2D],
    chain: &[&SegmentPair],
    topology: &WireTopology,
    taken: &mut [bool],
) -> Option<Track> {
    let first = chain.first()?;

    // Segment sequence of the chain: consecutive pairs share their middle
    // segment, so each pair past the first contributes only its outer one.
    let mut segment_indices = vec![first.from_segment, first.to_segment];
    for pair in &chain[1..] {
        segment_indices.push(pair.to_segment);
    }

    // Free 2D hits of the chain.
    let reco_hits: Vec<RecoHit2D> = segment_indices
        .iter()
        .flat_map(|&index| segments[index].hits.iter().copied())
        .filter(|reco| !taken[reco.hit])
        .collect();
    if reco_hits.len() < MIN_TRACK_HITS {
        return None;
    }

    // Rough longitudinal line for stereo candidate selection: the ndf-
    // weighted average of the chain's pair fits.
    let mut weight_sum = 0.0;
    let mut z0 = 0.0;
    let mut tan_lambda = 0.0;
    for pair in chain {
        let weight = (pair.sz.ndf.max(1)) as f64;
        z0 += pair.sz.line.z0 * weight;
        tan_lambda += pair.sz.line.tan_lambda * weight;
        weight_sum += weight;
    }
    let rough = SzLine::new(z0 / weight_sum, tan_lambda / weight_sum);

    let track = build_track(hits, &reco_hits, Some(rough), topology)?;

    // Claim the hits. Earlier (better) chains won the contested ones above.
    for reco in &track.hits {
        assert!(!taken[reco.hit], "hit {} claimed by two tracks", reco.hit);
        taken[reco.hit] = true;
    }
    Some(track)
}

/// Fit trajectories through a set of 2D hits and lift them to 3D.
///
/// The transverse circle is refit over all positions; stereo hits are then
/// shifted along their wires onto the circle, choosing per hit the
/// candidate closest to the longitudinal line (seeded by `rough` when
/// given, otherwise by a first pass over midplane-nearest candidates).
pub fn build_track(
    hits: &[WireHit],
    reco_hits: &[RecoHit2D],
    rough: Option<SzLine>,
    topology: &WireTopology,
) -> Option<Track> {
    let fitter = RiemannFitter;
    let sigma = reco_hits
        .first()
        .map_or(0.015, |reco| hits[reco.hit].drift_sigma);
    let circle_fit = fitter.fit(reco_hits, sigma)?;
    let circle = circle_fit.trajectory;

    // Longitudinal observations from the stereo hits.
    let mut sz_candidates: Vec<(usize, Vec<StereoCandidate>)> = Vec::new();
    for (position, reco) in reco_hits.iter().enumerate() {
        let hit = &hits[reco.hit];
        if hit.stereo_slope != 0.0 {
            let candidates = reconstruct_stereo(hit, &circle, topology);
            if !candidates.is_empty() {
                sz_candidates.push((position, candidates));
            }
        }
    }

    let sz_fitter = SzFitter;
    let sigma_z = stereo_sigma_z(hits, reco_hits, sigma);
    let line = rough.or_else(|| {
        // First pass: prefer the candidate closer to the chamber midplane.
        let first_pass: Vec<(f64, f64)> = sz_candidates
            .iter()
            .filter_map(|(_, candidates)| {
                candidates
                    .iter()
                    .min_by(|a, b| a.z.abs().total_cmp(&b.z.abs()))
                    .map(|candidate| (candidate.s, candidate.z))
            })
            .collect();
        sz_fitter.fit(&first_pass, sigma_z).map(|fit| fit.line)
    });
    // All-axial hit sets carry no z information: a flat line at z = 0.
    let line = line.unwrap_or_else(|| SzLine::new(0.0, 0.0));

    // Second pass: per stereo hit the candidate closest to the line.
    let mut chosen: HashMap<usize, StereoCandidate> = HashMap::new();
    let mut observations: Vec<(f64, f64)> = Vec::new();
    for (position, candidates) in &sz_candidates {
        let best = candidates.iter().min_by(|a, b| {
            (a.z - line.z_at(a.s))
                .abs()
                .total_cmp(&(b.z - line.z_at(b.s)).abs())
        })?;
        chosen.insert(*position, *best);
        observations.push((best.s, best.z));
    }

    let sz_fit = sz_fitter.fit(&observations, sigma_z).unwrap_or(SzFit {
        line: SzLine::new(0.0, 0.0),
        chi2: 0.0,
        ndf: 0,
    });

    // Lift every hit to 3D.
    let mut hits3d: Vec<RecoHit3D> = Vec::with_capacity(reco_hits.len());
    for (position, reco) in reco_hits.iter().enumerate() {
        let reco3d = if let Some(candidate) = chosen.get(&position) {
            RecoHit3D {
                hit: reco.hit,
                rl: if candidate.rl_sign > 0.0 {
                    RlHypothesis::Left
                } else {
                    RlHypothesis::Right
                },
                pos: circle.position_at(candidate.s),
                z: candidate.z,
                arc_length: candidate.s,
            }
        } else {
            // Axial hit (or stereo hit without a usable candidate).
            let s = circle.arc_length_to(&reco.pos);
            RecoHit3D {
                hit: reco.hit,
                rl: reco.rl,
                pos: reco.pos,
                z: sz_fit.line.z_at(s),
                arc_length: s,
            }
        };
        hits3d.push(reco3d);
    }

    hits3d.sort_by(|a, b| a.arc_length.total_cmp(&b.arc_length));
    hits3d.dedup_by_key(|reco| reco.hit);

    let (start, end) = end_trajectories(&hits3d, circle, sz_fit.line, sigma);

    Some(Track {
        hits: hits3d,
        start,
        end,
        chi2: circle_fit.chi2 + sz_fit.chi2,
        ndf: circle_fit.ndf + sz_fit.ndf,
    })
}

/// Effective z resolution of the stereo observations: the drift resolution
/// scaled up by the wire skew.
fn stereo_sigma_z(hits: &[WireHit], reco_hits: &[RecoHit2D], sigma: f64) -> f64 {
    let slope = reco_hits
        .iter()
        .map(|reco| hits[reco.hit].stereo_slope.abs())
        .find(|slope| *slope > 0.0)
        .unwrap_or(0.006);
    sigma / slope
}

/// Fit local trajectories over the inner and outer halves of the track.
///
/// Falls back to the full-track trajectory when a half has too few hits
/// for its own fit.
fn end_trajectories(
    hits3d: &[RecoHit3D],
    circle: CircleTrajectory,
    sz: SzLine,
    sigma: f64,
) -> (Trajectory3D, Trajectory3D) {
    let full = Trajectory3D { circle, sz };
    if hits3d.len() < 8 {
        return (full, full);
    }

    let fitter = RiemannFitter;
    let half = hits3d.len() / 2;
    let local = |slice: &[RecoHit3D]| -> Trajectory3D {
        let points: Vec<Vector2D> = slice.iter().map(|reco| reco.pos).collect();
        match fitter.fit_positions(&points, sigma) {
            Some(fit) => Trajectory3D {
                circle: fit.trajectory,
                sz,
            },
            None => full,
        }
    };

    (local(&hits3d[..half]), local(&hits3d[half..]))
}

/// Merge broken track fragments.
///
/// For each track the best merge partner is the candidate maximizing the
/// combined transverse fit probability; a merge happens when that
/// probability clears the configured minimum. The scan repeats until no
/// merge occurs.
pub fn merge_tracks(
    mut tracks: Vec<Track>,
    hits: &[WireHit],
    topology: &WireTopology,
    config: &MergeConfig,
) -> Vec<Track> {
    let fitter = RiemannFitter;
    let sigma = 0.015;

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                let positions: Vec<Vector2D> = tracks[i]
                    .hits
                    .iter()
                    .chain(tracks[j].hits.iter())
                    .map(|reco| reco.pos)
                    .collect();
                let Some(fit) = fitter.fit_positions(&positions, sigma) else {
                    continue;
                };
                let probability = fit.probability();
                if probability >= config.min_probability
                    && best.map_or(true, |(_, _, p)| probability > p)
                {
                    best = Some((i, j, probability));
                }
            }
        }

        let Some((i, j, probability)) = best else {
            break;
        };
        debug!("merging tracks {i} and {j} with probability {probability:.3}");

        let absorbed = tracks.swap_remove(j);
        let receiver = &tracks[i];

        // Rebuild the merged track from the union of the 2D views.
        let reco_hits: Vec<RecoHit2D> = receiver
            .hits
            .iter()
            .chain(absorbed.hits.iter())
            .map(|reco| RecoHit2D {
                hit: reco.hit,
                rl: reco.rl,
                pos: reco.pos,
            })
            .collect();

        match build_track(hits, &reco_hits, None, topology) {
            Some(merged) => tracks[i] = merged,
            None => {
                // Could not refit the union; keep the fragments separate.
                tracks.push(absorbed);
                break;
            }
        }
    }
    tracks
}
