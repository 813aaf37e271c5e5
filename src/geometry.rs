//! Geometric primitives for drift-chamber pattern recognition.
//!
//! This module provides the curve math the finder stages share:
//! - 2D vectors in the transverse plane
//! - circle trajectories in perigee parameterization
//! - common tangent lines between drift circles (the facet construction core)
//! - SZ lines (z versus arc length) for the longitudinal fit

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Curvatures below this magnitude are treated as straight lines.
pub const CURVATURE_EPS: f64 = 1e-9;

/// A 2D vector in the transverse (x, y) plane. Units are centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    /// Create a new vector.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at the given azimuth angle.
    pub fn from_phi(phi: f64) -> Self {
        Self::new(phi.cos(), phi.sin())
    }

    /// Dot product.
    pub fn dot(&self, other: &Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    ///
    /// Positive when `other` lies to the left of `self`.
    pub fn cross(&self, other: &Vector2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared norm (avoids the square root in comparisons).
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Azimuth angle in (-pi, pi].
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalized(&self) -> Vector2D {
        let n = self.norm();
        if n > 0.0 {
            Vector2D::new(self.x / n, self.y / n)
        } else {
            Vector2D::default()
        }
    }

    /// The left-hand normal (90 degrees counterclockwise).
    pub fn orthogonal(&self) -> Vector2D {
        Vector2D::new(-self.y, self.x)
    }

    /// Rotate counterclockwise by the given angle.
    pub fn rotated(&self, angle: f64) -> Vector2D {
        let (s, c) = angle.sin_cos();
        Vector2D::new(c * self.x - s * self.y, s * self.x + c * self.y)
    }

    /// Distance to another point.
    pub fn distance_to(&self, other: &Vector2D) -> f64 {
        (*other - *self).norm()
    }
}

impl Add for Vector2D {
    type Output = Vector2D;
    fn add(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;
    fn sub(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;
    fn mul(self, rhs: f64) -> Vector2D {
        Vector2D::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;
    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}

/// Normalize an angle difference into (-pi, pi].
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

// ============================================================================
// Tangent lines between drift circles
// ============================================================================

/// A directed tangent line between two drift circles.
///
/// `touch1` and `touch2` are the points where the line touches the first and
/// second circle; the direction runs from `touch1` to `touch2`.
#[derive(Debug, Clone, Copy)]
pub struct TangentLine {
    pub touch1: Vector2D,
    pub touch2: Vector2D,
}

impl TangentLine {
    /// Unit direction of the tangent.
    pub fn direction(&self) -> Vector2D {
        (self.touch2 - self.touch1).normalized()
    }

    /// Azimuth angle of the tangent direction.
    pub fn phi(&self) -> f64 {
        self.direction().phi()
    }
}

/// Construct the common tangent between two drift circles with signed radii.
///
/// The sign convention encodes the right/left passage hypothesis: a positive
/// radius places the wire to the left of the direction of travel, a negative
/// radius to the right. The returned tangent runs forward from circle 1
/// towards circle 2.
///
/// Returns `None` when the circles overlap too much for the requested
/// tangent to exist, or when the centers coincide.
pub fn common_tangent(
    center1: Vector2D,
    signed_radius1: f64,
    center2: Vector2D,
    signed_radius2: f64,
) -> Option<TangentLine> {
    let delta = center2 - center1;
    let length = delta.norm();
    if length <= 0.0 {
        return None;
    }

    // Decompose the line normal along and across the center-to-center axis.
    let along = (signed_radius2 - signed_radius1) / length;
    if along.abs() > 1.0 {
        return None;
    }
    let across = (1.0 - along * along).sqrt();

    let u = delta * (1.0 / length);
    let v = u.orthogonal();
    let normal = u * along + v * across;

    let touch1 = center1 - normal * signed_radius1;
    let touch2 = center2 - normal * signed_radius2;
    Some(TangentLine { touch1, touch2 })
}

// ============================================================================
// Circle trajectories (perigee parameterization)
// ============================================================================

/// A circular trajectory in the transverse plane, in perigee parameterization.
///
/// - `curvature`: signed inverse radius; positive curls counterclockwise.
///   Magnitudes below [`CURVATURE_EPS`] are treated as straight lines.
/// - `phi0`: direction of flight at the point of closest approach to the
///   local origin.
/// - `impact`: signed distance of the point of closest approach from the
///   origin. The perigee point is `impact * left_normal(phi0)`, so a positive
///   impact places the trajectory to the left of the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleTrajectory {
    pub curvature: f64,
    pub phi0: f64,
    pub impact: f64,
}

impl CircleTrajectory {
    /// Create a trajectory from its perigee parameters.
    pub fn new(curvature: f64, phi0: f64, impact: f64) -> Self {
        Self {
            curvature,
            phi0,
            impact,
        }
    }

    /// Whether the trajectory is effectively straight.
    pub fn is_line(&self) -> bool {
        self.curvature.abs() < CURVATURE_EPS
    }

    /// Radius of the circle; infinite for straight lines.
    pub fn radius(&self) -> f64 {
        if self.is_line() {
            f64::INFINITY
        } else {
            1.0 / self.curvature.abs()
        }
    }

    /// The perigee point (closest approach to the origin).
    pub fn perigee(&self) -> Vector2D {
        Vector2D::from_phi(self.phi0).orthogonal() * self.impact
    }

    /// Center of the circle. Meaningless for straight lines.
    pub fn center(&self) -> Vector2D {
        Vector2D::from_phi(self.phi0).orthogonal() * (self.impact + 1.0 / self.curvature)
    }

    /// Position at the given arc length from the perigee.
    pub fn position_at(&self, s: f64) -> Vector2D {
        let dir0 = Vector2D::from_phi(self.phi0);
        if self.is_line() {
            return self.perigee() + dir0 * s;
        }
        let w = self.curvature;
        let phi = self.phi0 + w * s;
        let p0 = self.perigee();
        Vector2D::new(
            p0.x + (phi.sin() - self.phi0.sin()) / w,
            p0.y - (phi.cos() - self.phi0.cos()) / w,
        )
    }

    /// Direction of flight at the given arc length from the perigee.
    pub fn direction_at(&self, s: f64) -> Vector2D {
        Vector2D::from_phi(self.phi0 + self.curvature * s)
    }

    /// Signed perpendicular distance from a point to the trajectory.
    ///
    /// Positive when the point lies to the left of the direction of travel.
    pub fn signed_distance_to(&self, point: &Vector2D) -> f64 {
        if self.is_line() {
            let dir = Vector2D::from_phi(self.phi0);
            return dir.cross(&(*point - self.perigee()));
        }
        let to_point = *point - self.center();
        (1.0 - self.curvature.abs() * to_point.norm()) / self.curvature
    }

    /// Arc length from the perigee to the closest approach of a point.
    pub fn arc_length_to(&self, point: &Vector2D) -> f64 {
        if self.is_line() {
            let dir = Vector2D::from_phi(self.phi0);
            return dir.dot(&(*point - self.perigee()));
        }
        let center = self.center();
        let from = self.perigee() - center;
        let to = *point - center;
        let mut sweep = normalize_angle(to.phi() - from.phi());
        // Orientation: counterclockwise circles sweep positive angles forward.
        if self.curvature < 0.0 {
            sweep = -sweep;
        }
        sweep / self.curvature.abs()
    }

    /// Arc length from the perigee to the first forward crossing of the
    /// cylinder of the given radius around the origin.
    ///
    /// Returns `None` when the trajectory never reaches that radius.
    pub fn arc_length_at_cylinder(&self, cylinder_radius: f64) -> Option<f64> {
        if self.is_line() {
            // Line: solve |perigee + s*dir| = r with perigee orthogonal to dir.
            let d0 = self.impact.abs();
            if cylinder_radius < d0 {
                return None;
            }
            return Some((cylinder_radius * cylinder_radius - d0 * d0).sqrt());
        }

        let center = self.center();
        let center_dist = center.norm();
        let radius = self.radius();

        // The circle reaches cylinder radii in [| |c| - R |, |c| + R].
        if cylinder_radius < (center_dist - radius).abs()
            || cylinder_radius > center_dist + radius
        {
            return None;
        }
        if center_dist <= 0.0 {
            return None;
        }

        // Angle at the circle center between the direction towards the origin
        // and the directions towards the two intersection points.
        let cos_open = (center_dist * center_dist + radius * radius
            - cylinder_radius * cylinder_radius)
            / (2.0 * center_dist * radius);
        let open = cos_open.clamp(-1.0, 1.0).acos();

        let to_origin = (-center).normalized();
        let from = self.perigee() - center;

        let mut best: Option<f64> = None;
        for angle in [open, -open] {
            let to_crossing = to_origin.rotated(angle) * radius;
            let mut sweep = normalize_angle(to_crossing.phi() - from.phi());
            if self.curvature < 0.0 {
                sweep = -sweep;
            }
            if sweep < 0.0 {
                sweep += 2.0 * std::f64::consts::PI;
            }
            let s = sweep / self.curvature.abs();
            best = Some(match best {
                Some(b) if b <= s => b,
                _ => s,
            });
        }
        best
    }

    /// Build a trajectory through a point with a given flight direction and
    /// curvature. Used to seed trajectories from facet tangents.
    pub fn from_point_direction(point: Vector2D, direction: Vector2D, curvature: f64) -> Self {
        let dir = direction.normalized();
        if curvature.abs() < CURVATURE_EPS {
            // Straight line through `point` along `dir`.
            return Self::new(0.0, dir.phi(), dir.cross(&point));
        }

        let center = point + dir.orthogonal() * (1.0 / curvature);
        let center_dist = center.norm();
        let radius = 1.0 / curvature.abs();

        if center_dist < CURVATURE_EPS {
            // Circle centered on the origin: the given point serves as perigee.
            return Self::new(curvature, dir.phi(), -1.0 / curvature);
        }

        // The perigee lies on the origin-center axis; the flight direction
        // there is orthogonal to it, with the sense fixed by the curvature.
        let impact = curvature.signum() * (center_dist - radius);
        let phi0 = if curvature > 0.0 {
            center.phi() - std::f64::consts::FRAC_PI_2
        } else {
            center.phi() + std::f64::consts::FRAC_PI_2
        };
        Self::new(curvature, normalize_angle(phi0), impact)
    }
}

// ============================================================================
// SZ lines
// ============================================================================

/// A straight line in the (arc length, z) plane: `z = z0 + tan_lambda * s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SzLine {
    /// z position at zero arc length.
    pub z0: f64,
    /// Longitudinal slope dz/ds.
    pub tan_lambda: f64,
}

impl SzLine {
    pub fn new(z0: f64, tan_lambda: f64) -> Self {
        Self { z0, tan_lambda }
    }

    /// z position at the given arc length.
    pub fn z_at(&self, s: f64) -> f64 {
        self.z0 + self.tan_lambda * s
    }
}
