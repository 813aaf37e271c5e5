//! Learned relation filters: gradient-boosted decision trees.
//!
//! A trained model is a forest of shallow decision trees over a fixed
//! feature vector; the boosted sum is squashed into an acceptance
//! probability. Models are plain data loaded from JSON and validated once;
//! evaluation is allocation-free and shares the filter call contract with
//! the cut-based filters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackFindingError};
use crate::facets::Facet;
use crate::filters::{RelationFilter, Weight, REJECT};
use crate::geometry::normalize_angle;

/// One node of a decision tree, stored in a flat array with the root at
/// index 0. Children always have a higher index than their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Evaluate the tree on a feature vector.
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// A gradient-boosted decision-tree model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Length of the expected feature vector.
    pub feature_count: usize,
    /// Constant offset added to the boosted sum.
    pub bias: f64,
    pub trees: Vec<DecisionTree>,
}

impl GbdtModel {
    /// Load and validate a model from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: GbdtModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Validate tree structure: feature indices in range, child indices in
    /// range and strictly increasing (which rules out cycles).
    pub fn validate(&self) -> Result<()> {
        for (tree_index, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(TrackFindingError::ModelLoad {
                    reason: format!("tree {tree_index} has no nodes"),
                });
            }
            for (node_index, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= self.feature_count {
                        return Err(TrackFindingError::ModelLoad {
                            reason: format!(
                                "tree {tree_index} node {node_index}: feature {feature} out of range"
                            ),
                        });
                    }
                    if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                        return Err(TrackFindingError::ModelLoad {
                            reason: format!(
                                "tree {tree_index} node {node_index}: child index out of range"
                            ),
                        });
                    }
                    if *left <= node_index || *right <= node_index {
                        return Err(TrackFindingError::ModelLoad {
                            reason: format!(
                                "tree {tree_index} node {node_index}: children must follow their parent"
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Raw boosted score for a feature vector.
    pub fn score(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.feature_count);
        self.bias
            + self
                .trees
                .iter()
                .map(|tree| tree.evaluate(features))
                .sum::<f64>()
    }

    /// Acceptance probability: the boosted score through a sigmoid.
    pub fn probability(&self, features: &[f64]) -> f64 {
        1.0 / (1.0 + (-self.score(features)).exp())
    }
}

/// Maps a candidate pair onto the fixed feature vector of a model.
pub trait FeatureExtractor<T: ?Sized> {
    /// Length of the produced feature vector.
    fn feature_count(&self) -> usize;

    /// Fill `out` with the features of the pair. `out` arrives cleared.
    fn extract(&self, from: &T, to: &T, out: &mut Vec<f64>);
}

/// A learned relation filter: features through a boosted forest.
///
/// The acceptance probability is the edge weight (optionally scaled to be
/// commensurable with hit-count weights); probabilities below the cut
/// reject the edge.
#[derive(Debug, Clone)]
pub struct MvaFilter<E> {
    pub model: GbdtModel,
    pub extractor: E,
    /// Minimum acceptance probability.
    pub min_probability: f64,
    /// Multiplier applied to accepted probabilities.
    pub weight_scale: f64,
}

impl<E> MvaFilter<E> {
    /// Build a filter, checking that the extractor and the model agree on
    /// the feature vector length.
    pub fn new<T: ?Sized>(model: GbdtModel, extractor: E, min_probability: f64) -> Result<Self>
    where
        E: FeatureExtractor<T>,
    {
        if extractor.feature_count() != model.feature_count {
            return Err(TrackFindingError::ModelLoad {
                reason: format!(
                    "extractor produces {} features but the model expects {}",
                    extractor.feature_count(),
                    model.feature_count
                ),
            });
        }
        Ok(Self {
            model,
            extractor,
            min_probability,
            weight_scale: 1.0,
        })
    }
}

impl<T, E: FeatureExtractor<T>> RelationFilter<T> for MvaFilter<E> {
    fn weight(&self, from: &T, to: &T) -> Weight {
        let mut features = Vec::with_capacity(self.extractor.feature_count());
        self.extractor.extract(from, to, &mut features);
        let probability = self.model.probability(&features);
        if probability < self.min_probability {
            return REJECT;
        }
        probability * self.weight_scale
    }
}

/// Feature extractor for facet links: the bend of the new tangent, the
/// local curvature change and the positional gap at the shared hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetLinkFeatures;

impl FeatureExtractor<Facet> for FacetLinkFeatures {
    fn feature_count(&self) -> usize {
        3
    }

    fn extract(&self, from: &Facet, to: &Facet, out: &mut Vec<f64>) {
        out.push(normalize_angle(to.end_phi - from.end_phi).abs());
        out.push((to.curvature_estimate() - from.curvature_estimate()).abs());
        out.push(from.end_pos.distance_to(&to.middle_pos));
    }
}
