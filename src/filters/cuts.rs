//! Hand-written cut-based relation filters.
//!
//! Each filter checks a small chain of geometric criteria and converts the
//! surviving margin into the edge weight. Thresholds are plain configuration
//! values; nothing here holds state.

use crate::facets::Facet;
use crate::filters::{RelationFilter, Weight, REJECT};
use crate::geometry::normalize_angle;
use crate::pairs::SegmentPair;
use crate::segments::Segment2D;

/// Cut-based filter for facet-to-facet links.
///
/// Two facets sharing their middle/end hits continue each other when the
/// new tangent does not bend away too much. The weight is the quality-scaled
/// count of new hits (one per facet link).
#[derive(Debug, Clone, Copy)]
pub struct FacetLinkFilter {
    /// Maximum bending angle between the shared tangent chain in radians.
    pub angle_cut: f64,
}

impl FacetLinkFilter {
    pub fn new(angle_cut: f64) -> Self {
        Self { angle_cut }
    }
}

impl RelationFilter<Facet> for FacetLinkFilter {
    fn weight(&self, from: &Facet, to: &Facet) -> Weight {
        if !from.is_continued_by(to) {
            return REJECT;
        }
        // The shared middle tangent is identical by construction; the bend
        // of the newly added tangent is the discriminating quantity.
        let deviation = normalize_angle(to.end_phi - from.end_phi).abs();
        if deviation > self.angle_cut {
            return REJECT;
        }
        1.0 - deviation / self.angle_cut
    }
}

/// Cut-based filter for segment-to-segment links across superlayers.
///
/// Used as the cheap pre-cut of the pairing stage: the outer segment must
/// begin roughly where the inner one points.
#[derive(Debug, Clone, Copy)]
pub struct SegmentLinkFilter {
    /// Maximum angle between the inner segment's exit direction and the
    /// direction towards the outer segment's entry, in radians.
    /// Default: 0.6
    pub angle_cut: f64,
    /// Maximum transverse gap between the segments in cm.
    /// Default: 20.0
    pub max_gap: f64,
}

impl Default for SegmentLinkFilter {
    fn default() -> Self {
        Self {
            angle_cut: 0.6,
            max_gap: 20.0,
        }
    }
}

impl RelationFilter<Segment2D> for SegmentLinkFilter {
    fn weight(&self, from: &Segment2D, to: &Segment2D) -> Weight {
        if to.superlayer != from.superlayer + 1 {
            return REJECT;
        }

        let gap = to.start_pos() - from.end_pos();
        let gap_length = gap.norm();
        if gap_length > self.max_gap {
            return REJECT;
        }

        let deviation = if gap_length > 1e-6 {
            normalize_angle(gap.phi() - from.end_phi).abs()
        } else {
            0.0
        };
        if deviation > self.angle_cut {
            return REJECT;
        }

        to.len() as f64 * (1.0 - deviation / self.angle_cut)
    }
}

/// Cut-based filter for chaining segment pairs into tracks.
///
/// Two pairs chain when they share their middle segment and their fitted
/// trajectories agree in curvature and longitudinal slope.
#[derive(Debug, Clone, Copy)]
pub struct PairLinkFilter {
    /// Maximum curvature difference in 1/cm.
    pub curvature_cut: f64,
    /// Maximum tan(lambda) difference.
    pub tan_lambda_cut: f64,
}

impl PairLinkFilter {
    pub fn new(curvature_cut: f64, tan_lambda_cut: f64) -> Self {
        Self {
            curvature_cut,
            tan_lambda_cut,
        }
    }
}

impl RelationFilter<SegmentPair> for PairLinkFilter {
    fn weight(&self, from: &SegmentPair, to: &SegmentPair) -> Weight {
        if from.to_segment != to.from_segment {
            return REJECT;
        }

        let curvature_diff = (from.curvature() - to.curvature()).abs();
        if curvature_diff > self.curvature_cut {
            return REJECT;
        }

        let slope_diff = (from.tan_lambda() - to.tan_lambda()).abs();
        if slope_diff > self.tan_lambda_cut {
            return REJECT;
        }

        let quality = 1.0
            - 0.5 * (curvature_diff / self.curvature_cut + slope_diff / self.tan_lambda_cut);
        to.hit_count as f64 * quality
    }
}
