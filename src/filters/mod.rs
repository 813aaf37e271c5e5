//! Relation filters: the edge-acceptance layer of the automaton graphs.
//!
//! A relation filter decides whether two candidate objects may be linked
//! and, if so, what weight the edge carries. The call contract is shared by
//! every variant:
//!
//! - input: an ordered pair `(from, to)` of candidate objects
//! - output: a finite weight to accept, NaN to reject
//!
//! Filters are pure functions over immutable inputs plus their own tunable
//! parameters. Rejection costs nothing: the automaton drops NaN-weighted
//! edges at insertion, no error values are allocated.
//!
//! Two families implement the contract:
//! - hand-written cut-based filters ([`cuts`])
//! - learned filters evaluating gradient-boosted decision trees ([`mva`])

pub mod cuts;
pub mod mva;

pub use cuts::{FacetLinkFilter, PairLinkFilter, SegmentLinkFilter};
pub use mva::{FeatureExtractor, GbdtModel, MvaFilter};

/// Weight of an accepted relation. NaN encodes rejection.
pub type Weight = f64;

/// The rejection value: filters return this to veto an edge.
pub const REJECT: Weight = f64::NAN;

/// Decides whether two candidate objects may be linked, and with what
/// weight.
pub trait RelationFilter<T: ?Sized> {
    /// Weigh the directed relation `from -> to`. NaN rejects the edge.
    fn weight(&self, from: &T, to: &T) -> Weight;
}

/// Accept every relation with a constant weight. Useful in tests and as a
/// baseline when tuning real filters.
#[derive(Debug, Clone, Copy)]
pub struct ConstantFilter(pub Weight);

impl<T: ?Sized> RelationFilter<T> for ConstantFilter {
    fn weight(&self, _from: &T, _to: &T) -> Weight {
        self.0
    }
}

/// Chain two filters: the second is only consulted when the first accepts,
/// and the weights add up.
#[derive(Debug, Clone)]
pub struct AndFilter<A, B> {
    pub first: A,
    pub second: B,
}

impl<T: ?Sized, A: RelationFilter<T>, B: RelationFilter<T>> RelationFilter<T> for AndFilter<A, B> {
    fn weight(&self, from: &T, to: &T) -> Weight {
        let first = self.first.weight(from, to);
        if first.is_nan() {
            return REJECT;
        }
        first + self.second.weight(from, to)
    }
}
