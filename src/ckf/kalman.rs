//! The Kalman step: propagate a helix state to a candidate hit and update
//! it with the drift measurement.
//!
//! The measurement model is the unsigned drift residual: the perpendicular
//! distance between the hit's wire and the transverse circle, minus the
//! drift radius. Stereo wires are evaluated at the z the current state
//! predicts at the crossing. The measurement Jacobian is obtained by
//! numerical differentiation, which keeps the stepper independent of the
//! parameterization details.

use crate::ckf::state::{HelixState, DIM};
use crate::topology::WireTopology;
use crate::WireHit;

/// Supplies the gain computation of one CKF extension step.
///
/// This is the seam between the search and the measurement model: the
/// search owns the combinatorics, the stepper owns the numerics.
pub trait KalmanStepper {
    /// Update `state` with the measurement of `hit`.
    ///
    /// Returns the chi2 increment of the update, or `None` when the hit is
    /// not reachable from the current state (no crossing, unreachable
    /// layer).
    fn step(&self, state: &mut HelixState, hit: &WireHit, topology: &WireTopology) -> Option<f64>;
}

/// Drift-distance measurement stepper with a numerically differentiated
/// Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct WireMeasurementStepper {
    /// Per-parameter offsets for the finite differences.
    deltas: [f64; DIM],
}

impl Default for WireMeasurementStepper {
    fn default() -> Self {
        Self {
            // (impact, phi0, curvature, z0, tan_lambda)
            deltas: [1e-5, 1e-6, 1e-9, 1e-5, 1e-6],
        }
    }
}

impl WireMeasurementStepper {
    /// Drift residual of a hit under the given parameters.
    ///
    /// Returns `None` when the trajectory never crosses the hit's layer.
    fn residual(&self, params: &[f64; DIM], hit: &WireHit, topology: &WireTopology) -> Option<f64> {
        let state = HelixState {
            params: *params,
            cov: [[0.0; DIM]; DIM],
        };
        let circle = state.circle();
        let sz = state.sz();

        let wire_pos = if hit.stereo_slope == 0.0 {
            hit.ref_pos
        } else {
            // Evaluate the skewed wire at the predicted z of the crossing.
            let s = circle.arc_length_to(&hit.ref_pos);
            let z = sz.z_at(s).clamp(-topology.half_length(), topology.half_length());
            let tangent = hit.ref_pos.normalized().orthogonal();
            hit.ref_pos + tangent * (hit.stereo_slope * z)
        };

        // The layer must be reachable at all, otherwise the candidate is
        // geometrically excluded.
        circle.arc_length_at_cylinder(hit.ref_pos.norm())?;

        let distance = circle.signed_distance_to(&wire_pos).abs();
        Some(distance - hit.drift_radius)
    }
}

impl KalmanStepper for WireMeasurementStepper {
    fn step(&self, state: &mut HelixState, hit: &WireHit, topology: &WireTopology) -> Option<f64> {
        let residual = self.residual(&state.params, hit, topology)?;

        // Numerical Jacobian of the residual.
        let mut jacobian = [0.0; DIM];
        for k in 0..DIM {
            let mut shifted = state.params;
            shifted[k] += self.deltas[k];
            let shifted_residual = self.residual(&shifted, hit, topology)?;
            jacobian[k] = (shifted_residual - residual) / self.deltas[k];
        }

        let variance = hit.drift_sigma * hit.drift_sigma;
        let chi2 = state.scalar_update(&jacobian, residual, variance);
        if chi2.is_finite() {
            Some(chi2)
        } else {
            None
        }
    }
}
