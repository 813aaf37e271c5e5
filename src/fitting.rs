//! Least-squares fitting utilities.
//!
//! Two fits drive the filters and the final track parameterization:
//! - a circle fit over reconstructed transverse positions, formulated on the
//!   Riemann mapping (points lifted to the paraboloid, algebraic least
//!   squares, closed-form 3x3 solve)
//! - a straight-line fit of z versus arc length (SZ fit)
//!
//! Both return a chi2 and the degrees of freedom; fit probabilities feed
//! the track merging decision. Degenerate inputs (collinear points, too few
//! points) degrade to a line fit or a rejection, never a panic.

use crate::geometry::{CircleTrajectory, SzLine, Vector2D, CURVATURE_EPS};
use crate::RecoHit2D;

/// Result of a circle fit.
#[derive(Debug, Clone, Copy)]
pub struct CircleFit {
    pub trajectory: CircleTrajectory,
    pub chi2: f64,
    pub ndf: usize,
}

impl CircleFit {
    /// Fit probability (chi2 survival function).
    pub fn probability(&self) -> f64 {
        chi2_probability(self.chi2, self.ndf)
    }
}

/// Result of an SZ line fit.
#[derive(Debug, Clone, Copy)]
pub struct SzFit {
    pub line: SzLine,
    pub chi2: f64,
    pub ndf: usize,
}

impl SzFit {
    /// Fit probability (chi2 survival function).
    pub fn probability(&self) -> f64 {
        chi2_probability(self.chi2, self.ndf)
    }
}

/// Circle fitter on the Riemann mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiemannFitter;

impl RiemannFitter {
    /// Fit a circle trajectory through reconstructed hit positions.
    ///
    /// Positions are weighted uniformly with the given resolution. Returns
    /// `None` for fewer than three points. Collinear points produce a
    /// straight-line trajectory (zero curvature).
    ///
    /// The trajectory is oriented along the hit order: the flight direction
    /// at the first hit points towards the later hits.
    pub fn fit(&self, hits: &[RecoHit2D], sigma: f64) -> Option<CircleFit> {
        let points: Vec<Vector2D> = hits.iter().map(|hit| hit.pos).collect();
        self.fit_positions(&points, sigma)
    }

    /// Fit a circle trajectory through bare positions.
    pub fn fit_positions(&self, points: &[Vector2D], sigma: f64) -> Option<CircleFit> {
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f64;

        // Center the data to keep the normal equations well conditioned.
        let mut mean = Vector2D::default();
        for p in points {
            mean = mean + *p;
        }
        mean = mean * (1.0 / n);

        // Moments of the centered coordinates and the lifted coordinate
        // q = u^2 + v^2 (the Riemann paraboloid height).
        let (mut suu, mut suv, mut svv) = (0.0, 0.0, 0.0);
        let (mut suq, mut svq, mut sqq) = (0.0, 0.0, 0.0);
        let mut sq = 0.0;
        for p in points {
            let u = p.x - mean.x;
            let v = p.y - mean.y;
            let q = u * u + v * v;
            suu += u * u;
            suv += u * v;
            svv += v * v;
            suq += u * q;
            svq += v * q;
            sqq += q * q;
            sq += q;
        }

        // Solve the normal equations for the circle u^2 + v^2 = 2a u + 2b v + t.
        //   [suu suv]   [a]   [suq / 2]
        //   [suv svv] * [b] = [svq / 2]
        // with t = (sq - 2a*su - 2b*sv)/n; su = sv = 0 after centering.
        let det = suu * svv - suv * suv;
        let spread = (suu + svv).max(1e-12);

        let trajectory = if det.abs() < 1e-9 * spread * spread {
            // Collinear within tolerance: fit a line instead.
            line_trajectory(points, mean, suu, suv, svv)
        } else {
            let a = (suq * svv - svq * suv) / (2.0 * det);
            let b = (svq * suu - suq * suv) / (2.0 * det);
            let t = sq / n;
            let radius_sq = a * a + b * b + t;
            if radius_sq <= 0.0 {
                return None;
            }
            let radius = radius_sq.sqrt();
            let center = Vector2D::new(a + mean.x, b + mean.y);

            if radius * CURVATURE_EPS > 1.0 {
                line_trajectory(points, mean, suu, suv, svv)
            } else {
                circle_trajectory(points, center, radius)
            }
        };

        // Chi2 from perpendicular residuals.
        let weight = 1.0 / (sigma * sigma);
        let chi2: f64 = points
            .iter()
            .map(|p| {
                let d = trajectory.signed_distance_to(p);
                d * d * weight
            })
            .sum();

        Some(CircleFit {
            trajectory,
            chi2,
            ndf: points.len() - 3,
        })
    }
}

/// Orient a circle through the fitted center along the hit order.
fn circle_trajectory(points: &[Vector2D], center: Vector2D, radius: f64) -> CircleTrajectory {
    // Accumulated cross products of consecutive radial vectors give the
    // sweep orientation: positive means counterclockwise travel.
    let mut orientation = 0.0;
    for pair in points.windows(2) {
        let from = pair[0] - center;
        let to = pair[1] - center;
        orientation += from.cross(&to);
    }
    let curvature = if orientation >= 0.0 {
        1.0 / radius
    } else {
        -1.0 / radius
    };

    let first = points[0];
    let radial = (first - center).normalized();
    // Tangent direction at the first point, following the orientation.
    let direction = if curvature > 0.0 {
        radial.orthogonal()
    } else {
        -radial.orthogonal()
    };
    CircleTrajectory::from_point_direction(first, direction, curvature)
}

/// Principal-axis line through the centered points, oriented along the hit
/// order.
fn line_trajectory(
    points: &[Vector2D],
    mean: Vector2D,
    suu: f64,
    suv: f64,
    svv: f64,
) -> CircleTrajectory {
    // Leading eigenvector of the 2x2 scatter matrix.
    let trace = suu + svv;
    let det = suu * svv - suv * suv;
    let lambda = trace / 2.0 + (trace * trace / 4.0 - det).max(0.0).sqrt();
    let mut direction = if suv.abs() > 1e-12 {
        Vector2D::new(lambda - svv, suv).normalized()
    } else if suu >= svv {
        Vector2D::new(1.0, 0.0)
    } else {
        Vector2D::new(0.0, 1.0)
    };

    // Orient from the first towards the last point.
    let span = *points.last().expect("points checked non-empty") - points[0];
    if direction.dot(&span) < 0.0 {
        direction = -direction;
    }
    CircleTrajectory::from_point_direction(mean, direction, 0.0)
}

/// Least-squares fitter of z versus arc length.
#[derive(Debug, Clone, Copy, Default)]
pub struct SzFitter;

impl SzFitter {
    /// Fit `z = z0 + tan_lambda * s` through (arc length, z) observations
    /// with a common z resolution.
    ///
    /// Returns `None` for fewer than two observations or a degenerate arc
    /// length spread.
    pub fn fit(&self, observations: &[(f64, f64)], sigma_z: f64) -> Option<SzFit> {
        if observations.len() < 2 {
            return None;
        }
        let n = observations.len() as f64;

        let mut ss = 0.0;
        let mut sz = 0.0;
        for &(s, z) in observations {
            ss += s;
            sz += z;
        }
        let mean_s = ss / n;
        let mean_z = sz / n;

        let mut var_s = 0.0;
        let mut cov_sz = 0.0;
        for &(s, z) in observations {
            var_s += (s - mean_s) * (s - mean_s);
            cov_sz += (s - mean_s) * (z - mean_z);
        }
        if var_s < 1e-12 {
            return None;
        }

        let tan_lambda = cov_sz / var_s;
        let z0 = mean_z - tan_lambda * mean_s;
        let line = SzLine::new(z0, tan_lambda);

        let weight = 1.0 / (sigma_z * sigma_z);
        let chi2: f64 = observations
            .iter()
            .map(|&(s, z)| {
                let r = z - line.z_at(s);
                r * r * weight
            })
            .sum();

        Some(SzFit {
            line,
            chi2,
            ndf: observations.len().saturating_sub(2),
        })
    }
}

// ============================================================================
// Chi2 probability
// ============================================================================

/// Survival function of the chi2 distribution: the probability of observing
/// a chi2 at least this large with the given degrees of freedom.
///
/// Computed as the regularized upper incomplete gamma function
/// `Q(ndf / 2, chi2 / 2)` via the series/continued-fraction split.
pub fn chi2_probability(chi2: f64, ndf: usize) -> f64 {
    if ndf == 0 {
        return if chi2 > 0.0 { 0.0 } else { 1.0 };
    }
    if chi2 <= 0.0 {
        return 1.0;
    }
    let a = ndf as f64 / 2.0;
    let x = chi2 / 2.0;
    if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    }
}

/// Lower regularized incomplete gamma P(a, x) by its power series.
fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut term = 1.0 / a;
    let mut sum = term;
    let mut denominator = a;
    for _ in 0..200 {
        denominator += 1.0;
        term *= x / denominator;
        sum += term;
        if term.abs() < sum.abs() * 1e-14 {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

/// Upper regularized incomplete gamma Q(a, x) by the Lentz continued
/// fraction.
fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    const TINY: f64 = 1e-300;
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..200 {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < 1e-14 {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Lanczos approximation of ln(Gamma(x)) for positive arguments.
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000000000190015;
    for coefficient in COEFFICIENTS {
        y += 1.0;
        series += coefficient / y;
    }
    -tmp + (2.5066282746310005 * series / x).ln()
}
