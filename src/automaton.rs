//! Cellular automaton path selection over weighted relation graphs.
//!
//! Several finder stages share the same combinatorial problem: given a
//! directed acyclic graph of candidate objects (facets, segment pairs) with
//! a base weight per node and a neighbor weight per edge, find the disjoint
//! chains of highest accumulated weight. The automaton solves it in two
//! sweeps:
//!
//! 1. **Relaxation** (backward, highest stage first): every cell's
//!    accumulated weight becomes its base weight plus the best continuation
//!    over its outgoing relations.
//! 2. **Extraction** (forward, greedy): starting from the not-yet-taken cell
//!    with the highest accumulated weight, follow the best not-taken
//!    neighbor chain, marking every visited cell as taken, and emit the
//!    chain as a path. Relations into taken cells are skipped.
//!
//! Cells are addressed by index. Relations must point from a lower index to
//! a higher index; callers sort their objects by stage (layer, superlayer)
//! before wiring the graph, which makes the index order a topological order.
//! Violations are programming errors and abort via assertion, matching the
//! bookkeeping contract of the taken flag.
//!
//! Rejected edges are cheap: a relation added with a NaN weight is treated
//! as "no edge" and never stored.

/// Mutable automaton bookkeeping attached to each cell.
#[derive(Debug, Clone, Copy)]
struct AutomatonCell {
    /// Base weight of the cell (typically the number of covered hits).
    weight: f64,
    /// Best accumulated weight reachable from this cell (set by `relax`).
    accumulated: f64,
    /// Whether the cell has been consumed by an extracted path.
    taken: bool,
}

/// A weighted directed relation between two cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedRelation {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Cellular automaton over an indexed cell graph.
///
/// # Example
/// ```
/// use wiretrack::CellularAutomaton;
///
/// // A three-cell chain 0 -> 1 -> 2 and a lone cell 3.
/// let mut ca = CellularAutomaton::new(vec![1.0, 1.0, 1.0, 1.0]);
/// ca.add_relation(0, 1, 0.5);
/// ca.add_relation(1, 2, 0.5);
///
/// let paths = ca.find_paths(0.0);
/// assert_eq!(paths[0], vec![0, 1, 2]);
/// assert_eq!(paths[1], vec![3]);
/// ```
#[derive(Debug)]
pub struct CellularAutomaton {
    cells: Vec<AutomatonCell>,
    relations: Vec<WeightedRelation>,
    /// CSR-style index: for cell i, outgoing relations live in
    /// `relations[outgoing_start[i]..outgoing_start[i + 1]]`.
    outgoing_start: Vec<usize>,
    indexed: bool,
}

impl CellularAutomaton {
    /// Create an automaton over cells with the given base weights.
    pub fn new(base_weights: Vec<f64>) -> Self {
        let cells = base_weights
            .into_iter()
            .map(|weight| AutomatonCell {
                weight,
                accumulated: weight,
                taken: false,
            })
            .collect();
        Self {
            cells,
            relations: Vec::new(),
            outgoing_start: Vec::new(),
            indexed: false,
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the automaton has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of accepted relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Add a relation between two cells.
    ///
    /// A NaN weight means the relation filter vetoed the edge; it is
    /// silently dropped. Relations must run from a lower to a higher cell
    /// index (topological order by construction).
    pub fn add_relation(&mut self, from: usize, to: usize, weight: f64) {
        if weight.is_nan() {
            return;
        }
        assert!(
            from < to,
            "relation {from} -> {to} violates the topological cell order"
        );
        assert!(to < self.cells.len(), "relation target {to} out of range");
        self.relations.push(WeightedRelation { from, to, weight });
        self.indexed = false;
    }

    /// Accumulated weight of a cell (meaningful after `relax`).
    pub fn accumulated(&self, index: usize) -> f64 {
        self.cells[index].accumulated
    }

    /// Whether a cell has been consumed by an extracted path.
    pub fn is_taken(&self, index: usize) -> bool {
        self.cells[index].taken
    }

    /// Clear taken flags and reset accumulated weights to the base weights.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.accumulated = cell.weight;
            cell.taken = false;
        }
    }

    /// Group relations by source cell, preserving insertion order within
    /// each source. Insertion order is the documented tie-break order.
    fn ensure_indexed(&mut self) {
        if self.indexed {
            return;
        }
        self.relations.sort_by_key(|relation| relation.from);

        self.outgoing_start = vec![0; self.cells.len() + 1];
        for relation in &self.relations {
            self.outgoing_start[relation.from + 1] += 1;
        }
        for i in 0..self.cells.len() {
            self.outgoing_start[i + 1] += self.outgoing_start[i];
        }
        self.indexed = true;
    }

    /// Backward relaxation sweep.
    ///
    /// Processes cells from the highest index (outermost stage) down and
    /// sets each cell's accumulated weight to
    /// `base + max(relation.weight + target.accumulated)` over its outgoing
    /// relations. Cells without outgoing relations keep their base weight:
    /// an isolated cell is a valid path of length one.
    pub fn relax(&mut self) {
        self.ensure_indexed();

        for index in (0..self.cells.len()).rev() {
            let mut best = f64::NEG_INFINITY;
            for relation in
                &self.relations[self.outgoing_start[index]..self.outgoing_start[index + 1]]
            {
                let continuation = relation.weight + self.cells[relation.to].accumulated;
                if continuation > best {
                    best = continuation;
                }
            }
            let cell = &mut self.cells[index];
            cell.accumulated = if best.is_finite() {
                cell.weight + best
            } else {
                cell.weight
            };
        }
    }

    /// Greedy forward extraction of disjoint best paths.
    ///
    /// Start cells are visited in order of decreasing accumulated weight
    /// (ties broken towards the lower index). From each not-yet-taken start
    /// the walk repeatedly follows the outgoing relation with the best
    /// not-taken continuation; on equal continuations the relation added
    /// first wins. Every visited cell is marked taken, so each cell ends up
    /// in at most one path.
    ///
    /// Only paths starting at cells with accumulated weight of at least
    /// `minimal_accumulated` are emitted.
    pub fn extract_paths(&mut self, minimal_accumulated: f64) -> Vec<Vec<usize>> {
        self.ensure_indexed();

        let mut order: Vec<usize> = (0..self.cells.len()).collect();
        order.sort_by(|&a, &b| {
            self.cells[b]
                .accumulated
                .partial_cmp(&self.cells[a].accumulated)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut paths = Vec::new();
        for start in order {
            if self.cells[start].taken {
                continue;
            }
            if self.cells[start].accumulated < minimal_accumulated {
                break;
            }
            paths.push(self.follow_path(start));
        }
        paths
    }

    /// Relax and extract in one call.
    pub fn find_paths(&mut self, minimal_accumulated: f64) -> Vec<Vec<usize>> {
        self.relax();
        self.extract_paths(minimal_accumulated)
    }

    /// Walk the best-continuation chain from `start`, marking cells taken.
    fn follow_path(&mut self, start: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = start;

        loop {
            let cell = &mut self.cells[current];
            assert!(!cell.taken, "cell {current} consumed by two paths");
            cell.taken = true;
            path.push(current);

            // Best not-taken continuation; first relation wins on ties.
            let mut next: Option<usize> = None;
            let mut best = f64::NEG_INFINITY;
            for relation in
                &self.relations[self.outgoing_start[current]..self.outgoing_start[current + 1]]
            {
                if self.cells[relation.to].taken {
                    continue;
                }
                let continuation = relation.weight + self.cells[relation.to].accumulated;
                if continuation > best {
                    best = continuation;
                    next = Some(relation.to);
                }
            }

            match next {
                Some(to) => current = to,
                None => break,
            }
        }
        path
    }
}
