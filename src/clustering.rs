//! Hit clustering: the first combinatorial reduction stage.
//!
//! Hits whose wires are neighbors (same superlayer, same or adjacent layer,
//! within one and a half cell pitches in azimuth) are merged into
//! superclusters with a union-find. Facet construction runs per cluster,
//! which bounds the combinatorics of the later stages.

use log::debug;

use crate::topology::WireTopology;
use crate::union_find::UnionFind;
use crate::{ClusterConfig, WireHit};

/// A supercluster: the hits of one connected wire neighborhood region.
#[derive(Debug, Clone)]
pub struct Supercluster {
    /// Superlayer the cluster lives in.
    pub superlayer: u8,
    /// Hit indices into the event's hit pool, sorted ascending.
    pub hits: Vec<usize>,
}

impl Supercluster {
    /// Number of hits in the cluster.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether the cluster has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Group the event's hits into superclusters.
///
/// Candidate neighbor pairs are found through a sorted window over
/// (superlayer, layer) rather than all-pairs testing: for each hit only the
/// hits of the same and the next layer are inspected, and each unordered
/// pair is tested once.
pub fn find_superclusters(
    hits: &[WireHit],
    topology: &WireTopology,
    config: &ClusterConfig,
) -> Vec<Supercluster> {
    let mut union_find: UnionFind<usize> = UnionFind::with_capacity(hits.len());
    for hit in hits {
        union_find.make_set(hit.index);
    }

    // Sorted view by (continuous layer, wire) for the layer-window lookup.
    let mut order: Vec<usize> = (0..hits.len()).collect();
    order.sort_by_key(|&index| (hits[index].continuous_layer, hits[index].wire));
    let layer_keys: Vec<usize> = order.iter().map(|&index| hits[index].continuous_layer).collect();

    for (position, &index) in order.iter().enumerate() {
        let layer = hits[index].continuous_layer;

        // Same-layer partners later in the order (each pair tested once).
        let same_end = layer_keys.partition_point(|&key| key <= layer);
        for &other in &order[position + 1..same_end] {
            if topology.are_neighbors(&hits[index].wire, &hits[other].wire) {
                union_find.union(&index, &other);
            }
        }

        // Next-layer partners.
        let next_begin = same_end;
        let next_end = layer_keys.partition_point(|&key| key <= layer + 1);
        for &other in &order[next_begin..next_end] {
            if topology.are_neighbors(&hits[index].wire, &hits[other].wire) {
                union_find.union(&index, &other);
            }
        }
    }

    let mut clusters: Vec<Supercluster> = union_find
        .groups()
        .into_values()
        .filter(|members| members.len() >= config.min_cluster_size)
        .map(|members| Supercluster {
            superlayer: hits[members[0]].wire.superlayer,
            hits: members,
        })
        .collect();

    // Deterministic output order regardless of hash iteration.
    clusters.sort_by_key(|cluster| (cluster.superlayer, cluster.hits[0]));

    debug!(
        "clustering: {} hits into {} superclusters",
        hits.len(),
        clusters.len()
    );
    clusters
}
