//! Segment construction: linking facets into 2D segments.
//!
//! Facets of one supercluster form the cells of an automaton graph. Two
//! facets are related when the second starts on the first's middle/end hits
//! with identical right/left tags; the relation filter weighs the link by
//! the continuation quality. The best automaton paths become segments.
//!
//! Candidate continuations are found through a sorted-range window: facets
//! are sorted by start layer and the continuations of a facet live in the
//! next layer's contiguous range, located by binary search. No all-pairs
//! testing happens.

use log::debug;

use crate::automaton::CellularAutomaton;
use crate::facets::Facet;
use crate::filters::RelationFilter;
use crate::fitting::{CircleFit, RiemannFitter};
use crate::{RecoHit2D, SegmentConfig, Vector2D, WireHit};

/// A 2D segment: an ordered run of reconstructed hits in one superlayer
/// sharing a consistent right/left assignment.
#[derive(Debug, Clone)]
pub struct Segment2D {
    /// Hits ordered from the inner layer out.
    pub hits: Vec<RecoHit2D>,
    /// Superlayer the segment lives in.
    pub superlayer: u8,
    /// Whether the superlayer is axial.
    pub axial: bool,
    /// Direction angle at the inner end.
    pub start_phi: f64,
    /// Direction angle at the outer end.
    pub end_phi: f64,
    /// Continuous layer index of the innermost hit.
    pub start_layer: usize,
    /// Circle fit through the reconstructed positions.
    pub fit: Option<CircleFit>,
}

impl Segment2D {
    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether the segment has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Position of the innermost hit.
    pub fn start_pos(&self) -> Vector2D {
        self.hits[0].pos
    }

    /// Position of the outermost hit.
    pub fn end_pos(&self) -> Vector2D {
        self.hits[self.hits.len() - 1].pos
    }
}

/// Build segments from the facets of one supercluster.
///
/// Runs the cellular automaton over the facet graph and converts every
/// extracted path into a segment. Facets must all belong to one
/// supercluster (hence one superlayer).
pub fn build_segments<F>(
    hits: &[WireHit],
    facets: &[Facet],
    filter: &F,
    config: &SegmentConfig,
    sigma: f64,
) -> Vec<Segment2D>
where
    F: RelationFilter<Facet>,
{
    if facets.is_empty() {
        return Vec::new();
    }

    // Sort facet indices by start layer; ties keep generation order. The
    // sorted order is the automaton's topological cell order.
    let mut order: Vec<usize> = (0..facets.len()).collect();
    order.sort_by_key(|&index| facets[index].start_layer);
    let layer_keys: Vec<usize> = order.iter().map(|&index| facets[index].start_layer).collect();

    let mut automaton = CellularAutomaton::new(vec![3.0; facets.len()]);
    for (cell_from, &facet_from) in order.iter().enumerate() {
        let from = &facets[facet_from];

        // Continuations start exactly one layer up: binary-search the
        // contiguous range of that layer in the sorted order.
        let next_layer = from.start_layer + 1;
        let begin = layer_keys.partition_point(|&layer| layer < next_layer);
        let end = layer_keys.partition_point(|&layer| layer <= next_layer);

        for cell_to in begin..end {
            let to = &facets[order[cell_to]];
            if !from.is_continued_by(to) {
                continue;
            }
            automaton.add_relation(cell_from, cell_to, filter.weight(from, to));
        }
    }

    let paths = automaton.find_paths(3.0);
    debug!(
        "segment automaton: {} facets, {} relations, {} paths",
        facets.len(),
        automaton.relation_count(),
        paths.len()
    );

    let fitter = RiemannFitter;
    paths
        .into_iter()
        .filter_map(|path| {
            let chain: Vec<&Facet> = path.iter().map(|&cell| &facets[order[cell]]).collect();
            segment_from_chain(hits, &chain, config, &fitter, sigma)
        })
        .collect()
}

/// Concatenate a facet chain into a segment.
///
/// The first facet contributes its three hits; every following facet adds
/// its end hit. Shared hits keep the position of the facet that introduced
/// them.
fn segment_from_chain(
    hits: &[WireHit],
    chain: &[&Facet],
    config: &SegmentConfig,
    fitter: &RiemannFitter,
    sigma: f64,
) -> Option<Segment2D> {
    let first = chain.first()?;

    let mut reco_hits = vec![
        RecoHit2D {
            hit: first.hits[0].hit,
            rl: first.hits[0].rl,
            pos: first.start_pos,
        },
        RecoHit2D {
            hit: first.hits[1].hit,
            rl: first.hits[1].rl,
            pos: first.middle_pos,
        },
        RecoHit2D {
            hit: first.hits[2].hit,
            rl: first.hits[2].rl,
            pos: first.end_pos,
        },
    ];
    for facet in &chain[1..] {
        reco_hits.push(RecoHit2D {
            hit: facet.hits[2].hit,
            rl: facet.hits[2].rl,
            pos: facet.end_pos,
        });
    }

    if reco_hits.len() < config.min_segment_hits {
        return None;
    }

    let anchor = &hits[first.hits[0].hit];
    let fit = fitter.fit(&reco_hits, sigma);

    Some(Segment2D {
        superlayer: anchor.wire.superlayer,
        axial: anchor.axial,
        start_phi: first.start_phi,
        end_phi: chain[chain.len() - 1].end_phi,
        start_layer: first.start_layer,
        fit,
        hits: reco_hits,
    })
}
