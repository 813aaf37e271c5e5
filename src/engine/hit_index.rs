//! Spatial indexing of the hit pool.
//!
//! Uses an R-tree over the wire reference positions to answer the CKF's
//! candidate-window queries. Maintains a dirty flag so the tree is built
//! once per event, on first use.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geometry::Vector2D;
use crate::WireHit;

use super::hit_store::HitStore;

/// A hit reference position with its pool index, for R-tree queries.
#[derive(Debug, Clone, Copy)]
pub struct IndexedHit {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

impl RTreeObject for IndexedHit {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedHit {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over the hit pool with dirty tracking.
#[derive(Debug, Default)]
pub struct HitIndex {
    tree: RTree<IndexedHit>,
    dirty: bool,
}

impl HitIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            dirty: false,
        }
    }

    /// Mark the index as needing a rebuild.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebuild the tree from the hit pool.
    pub fn rebuild(&mut self, store: &HitStore) {
        self.rebuild_from_hits(store.hits());
    }

    /// Rebuild the tree from a bare hit slice.
    pub fn rebuild_from_hits(&mut self, hits: &[WireHit]) {
        let indexed: Vec<IndexedHit> = hits
            .iter()
            .map(|hit| IndexedHit {
                index: hit.index,
                x: hit.ref_pos.x,
                y: hit.ref_pos.y,
            })
            .collect();
        self.tree = RTree::bulk_load(indexed);
        self.dirty = false;
    }

    /// Ensure the index is up to date.
    pub fn ensure_built(&mut self, store: &HitStore) {
        if self.dirty || self.tree.size() == 0 {
            self.rebuild(store);
        }
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.dirty = false;
    }

    /// Iterate the pool indices of all hits within `radius` of a point.
    pub fn within_distance(
        &self,
        position: Vector2D,
        radius: f64,
    ) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .locate_within_distance([position.x, position.y], radius * radius)
            .map(|indexed| indexed.index)
    }

    /// Number of indexed hits.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
