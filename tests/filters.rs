//! Tests for filters module

use wiretrack::facets::Facet;
use wiretrack::filters::mva::{DecisionTree, FacetLinkFeatures, TreeNode};
use wiretrack::filters::{
    ConstantFilter, FacetLinkFilter, GbdtModel, MvaFilter, PairLinkFilter, RelationFilter,
};
use wiretrack::{RlHypothesis, RlWireHit, TrackFindingError, Vector2D};

/// A facet along +x covering the hits (a, b, c) with the given exit angle.
fn make_facet(a: usize, b: usize, c: usize, end_phi: f64) -> Facet {
    let rl = |hit| RlWireHit {
        hit,
        rl: RlHypothesis::Left,
    };
    Facet {
        hits: [rl(a), rl(b), rl(c)],
        start_pos: Vector2D::new(a as f64, 0.0),
        middle_pos: Vector2D::new(b as f64, 0.0),
        end_pos: Vector2D::new(c as f64, 0.0),
        start_phi: 0.0,
        end_phi,
        start_layer: a,
    }
}

#[test]
fn test_constant_filter() {
    let filter = ConstantFilter(2.5);
    let facet = make_facet(0, 1, 2, 0.0);
    assert_eq!(filter.weight(&facet, &facet), 2.5);
}

#[test]
fn test_facet_link_requires_shared_hits() {
    let filter = FacetLinkFilter::new(0.3);
    let from = make_facet(0, 1, 2, 0.0);
    let unrelated = make_facet(5, 6, 7, 0.0);
    assert!(filter.weight(&from, &unrelated).is_nan());
}

#[test]
fn test_facet_link_weighs_bend() {
    let filter = FacetLinkFilter::new(0.3);
    let from = make_facet(0, 1, 2, 0.0);

    let straight = make_facet(1, 2, 3, 0.0);
    assert_eq!(filter.weight(&from, &straight), 1.0);

    let bent = make_facet(1, 2, 3, 0.15);
    let weight = filter.weight(&from, &bent);
    assert!(weight > 0.0 && weight < 1.0);

    let too_bent = make_facet(1, 2, 3, 0.5);
    assert!(filter.weight(&from, &too_bent).is_nan());
}

#[test]
fn test_facet_link_rejects_rl_mismatch() {
    let filter = FacetLinkFilter::new(0.3);
    let from = make_facet(0, 1, 2, 0.0);
    let mut flipped = make_facet(1, 2, 3, 0.0);
    flipped.hits[0].rl = RlHypothesis::Right;
    assert!(filter.weight(&from, &flipped).is_nan());
}

#[test]
fn test_pair_link_cuts() {
    // PairLinkFilter only inspects indices and fit parameters, so a small
    // synthetic pair suffices.
    use wiretrack::fitting::SzFit;
    use wiretrack::geometry::{CircleTrajectory, SzLine};
    use wiretrack::pairs::SegmentPair;

    let pair = |from_segment, to_segment, curvature, tan_lambda| SegmentPair {
        from_segment,
        to_segment,
        circle: CircleTrajectory::new(curvature, 0.0, 0.0),
        sz: SzFit {
            line: SzLine::new(0.0, tan_lambda),
            chi2: 1.0,
            ndf: 3,
        },
        hit_count: 10,
        from_superlayer: 0,
    };

    let filter = PairLinkFilter::new(0.005, 0.3);
    let from = pair(0, 1, 0.003, 0.5);

    let good = pair(1, 2, 0.003, 0.5);
    let weight = filter.weight(&from, &good);
    assert!(weight > 9.0, "clean continuation scores near its hit count");

    // Not sharing the middle segment.
    assert!(filter.weight(&from, &pair(3, 4, 0.003, 0.5)).is_nan());
    // Curvature off.
    assert!(filter.weight(&from, &pair(1, 2, 0.010, 0.5)).is_nan());
    // Slope off.
    assert!(filter.weight(&from, &pair(1, 2, 0.003, 0.9)).is_nan());
}

fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> DecisionTree {
    DecisionTree {
        nodes: vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: low },
            TreeNode::Leaf { value: high },
        ],
    }
}

#[test]
fn test_gbdt_evaluation() {
    let model = GbdtModel {
        feature_count: 2,
        bias: 0.0,
        trees: vec![stump(0, 0.5, 1.0, -1.0), stump(1, 0.0, 0.5, -0.5)],
    };
    model.validate().unwrap();

    // Both features low: 1.0 + 0.5 through the sigmoid.
    let p = model.probability(&[0.1, -1.0]);
    assert!((p - 1.0 / (1.0 + (-1.5f64).exp())).abs() < 1e-12);

    // Both features high: -1.5 through the sigmoid.
    assert!(model.probability(&[0.9, 1.0]) < 0.5);
}

#[test]
fn test_gbdt_validation_rejects_bad_models() {
    // Feature index out of range.
    let model = GbdtModel {
        feature_count: 1,
        bias: 0.0,
        trees: vec![stump(3, 0.5, 1.0, -1.0)],
    };
    assert!(matches!(
        model.validate(),
        Err(TrackFindingError::ModelLoad { .. })
    ));

    // A child pointing back at its parent.
    let cyclic = GbdtModel {
        feature_count: 1,
        bias: 0.0,
        trees: vec![DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { value: 1.0 },
            ],
        }],
    };
    assert!(matches!(
        cyclic.validate(),
        Err(TrackFindingError::ModelLoad { .. })
    ));
}

#[test]
fn test_gbdt_json_roundtrip() {
    let model = GbdtModel {
        feature_count: 2,
        bias: 0.1,
        trees: vec![stump(0, 0.5, 1.0, -1.0)],
    };
    let json = serde_json::to_string(&model).unwrap();
    let restored = GbdtModel::from_json(&json).unwrap();
    assert_eq!(restored.feature_count, 2);
    assert_eq!(restored.score(&[0.0, 0.0]), model.score(&[0.0, 0.0]));
}

#[test]
fn test_mva_filter_shares_the_call_contract() {
    // A stump on the bend angle: straight continuations score high.
    let model = GbdtModel {
        feature_count: 3,
        bias: 0.0,
        trees: vec![stump(0, 0.1, 2.0, -2.0)],
    };
    let filter = MvaFilter::new(model, FacetLinkFeatures, 0.5).unwrap();

    let from = make_facet(0, 1, 2, 0.0);
    let straight = make_facet(1, 2, 3, 0.0);
    let bent = make_facet(1, 2, 3, 0.4);

    let weight = filter.weight(&from, &straight);
    assert!(weight > 0.5 && weight <= 1.0);
    assert!(filter.weight(&from, &bent).is_nan());
}

#[test]
fn test_mva_filter_rejects_feature_count_mismatch() {
    let model = GbdtModel {
        feature_count: 7,
        bias: 0.0,
        trees: vec![],
    };
    assert!(MvaFilter::new(model, FacetLinkFeatures, 0.5).is_err());
}
