//! Union-Find (disjoint set) data structure for clustering.
//!
//! Used to merge wire hits into superclusters: every accepted neighbor
//! relation unions the two hits, and `groups()` reads the clusters back out
//! in a deterministic order.

use std::collections::HashMap;
use std::hash::Hash;

/// Union-Find with path compression and union by rank.
///
/// Group extraction is deterministic: each group is keyed by its smallest
/// member and members are returned sorted, independent of insertion or hash
/// order.
#[derive(Debug, Default)]
pub struct UnionFind<T: Clone + Eq + Hash + Ord> {
    parent: HashMap<T, T>,
    rank: HashMap<T, u32>,
}

impl<T: Clone + Eq + Hash + Ord> UnionFind<T> {
    /// Create an empty structure.
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
        }
    }

    /// Create an empty structure with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: HashMap::with_capacity(capacity),
            rank: HashMap::with_capacity(capacity),
        }
    }

    /// Number of elements added so far.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether the structure is empty.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Add an element as its own singleton set. No-op if already present.
    pub fn make_set(&mut self, element: T) {
        if !self.parent.contains_key(&element) {
            self.parent.insert(element.clone(), element.clone());
            self.rank.insert(element, 0);
        }
    }

    /// Find the representative of an element's set, compressing paths.
    ///
    /// Elements never added are treated as singletons and added on the fly.
    pub fn find(&mut self, element: &T) -> T {
        if !self.parent.contains_key(element) {
            self.make_set(element.clone());
            return element.clone();
        }

        // Walk to the root.
        let mut root = element.clone();
        while self.parent[&root] != root {
            root = self.parent[&root].clone();
        }

        // Compress the path.
        let mut current = element.clone();
        while self.parent[&current] != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }

        root
    }

    /// Whether two elements belong to the same set.
    pub fn connected(&mut self, a: &T, b: &T) -> bool {
        self.find(a) == self.find(b)
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: &T, b: &T) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }

        let rank_a = self.rank[&root_a];
        let rank_b = self.rank[&root_b];
        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a.clone());
            self.rank.insert(root_a, rank_a + 1);
        }
    }

    /// Extract all groups, keyed by the smallest member of each group with
    /// members sorted ascending.
    pub fn groups(&mut self) -> HashMap<T, Vec<T>> {
        let elements: Vec<T> = self.parent.keys().cloned().collect();

        let mut by_root: HashMap<T, Vec<T>> = HashMap::new();
        for element in elements {
            let root = self.find(&element);
            by_root.entry(root).or_default().push(element);
        }

        by_root
            .into_values()
            .map(|mut members| {
                members.sort();
                (members[0].clone(), members)
            })
            .collect()
    }
}
