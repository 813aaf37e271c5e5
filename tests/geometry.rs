//! Tests for geometry module

use std::f64::consts::{FRAC_PI_2, PI};

use wiretrack::geometry::{common_tangent, normalize_angle, CircleTrajectory, SzLine, Vector2D};

fn assert_close(a: f64, b: f64, tolerance: f64) {
    assert!(
        (a - b).abs() < tolerance,
        "expected {a} to be within {tolerance} of {b}"
    );
}

#[test]
fn test_vector_basics() {
    let v = Vector2D::new(3.0, 4.0);
    assert_close(v.norm(), 5.0, 1e-12);
    assert_close(v.normalized().norm(), 1.0, 1e-12);

    let left = v.orthogonal();
    assert_close(v.dot(&left), 0.0, 1e-12);
    // The orthogonal is the 90 degree counterclockwise rotation.
    assert!(v.cross(&left) > 0.0);
}

#[test]
fn test_normalize_angle() {
    assert_close(normalize_angle(3.0 * PI), PI, 1e-12);
    assert_close(normalize_angle(-3.0 * PI), PI, 1e-12);
    assert_close(normalize_angle(0.3), 0.3, 1e-12);
}

#[test]
fn test_tangent_between_points() {
    // Zero radii: the tangent is simply the connecting line.
    let tangent = common_tangent(
        Vector2D::new(0.0, 0.0),
        0.0,
        Vector2D::new(10.0, 0.0),
        0.0,
    )
    .unwrap();
    assert_close(tangent.touch1.x, 0.0, 1e-12);
    assert_close(tangent.touch2.x, 10.0, 1e-12);
    assert_close(tangent.phi(), 0.0, 1e-12);
}

#[test]
fn test_tangent_touches_circles() {
    let c1 = Vector2D::new(0.0, 0.0);
    let c2 = Vector2D::new(10.0, 0.0);
    let r = 1.0;

    // Both circles to the left of the direction of travel.
    let tangent = common_tangent(c1, r, c2, r).unwrap();
    assert_close(tangent.touch1.distance_to(&c1), r, 1e-12);
    assert_close(tangent.touch2.distance_to(&c2), r, 1e-12);
    // Equal radii on the same side give a tangent parallel to the axis,
    // below the centers (centers on the left).
    assert_close(tangent.touch1.y, -1.0, 1e-12);
    assert_close(tangent.touch2.y, -1.0, 1e-12);

    // Opposite sides give the crossing tangent.
    let crossing = common_tangent(c1, r, c2, -r).unwrap();
    assert_close(crossing.touch1.distance_to(&c1), r, 1e-12);
    assert_close(crossing.touch2.distance_to(&c2), r, 1e-12);
    assert!(crossing.touch1.y < 0.0);
    assert!(crossing.touch2.y > 0.0);
}

#[test]
fn test_tangent_rejects_contained_circles() {
    // The crossing tangent cannot exist when the circles overlap enough.
    let result = common_tangent(
        Vector2D::new(0.0, 0.0),
        2.0,
        Vector2D::new(1.0, 0.0),
        -2.0,
    );
    assert!(result.is_none());

    // Coinciding centers have no tangent at all.
    assert!(common_tangent(Vector2D::new(1.0, 1.0), 0.5, Vector2D::new(1.0, 1.0), 0.2).is_none());
}

#[test]
fn test_line_trajectory_positions() {
    // A straight line through the origin along +x.
    let line = CircleTrajectory::new(0.0, 0.0, 0.0);
    let p = line.position_at(5.0);
    assert_close(p.x, 5.0, 1e-12);
    assert_close(p.y, 0.0, 1e-12);

    // Signed distance: positive to the left of the flight direction.
    assert_close(line.signed_distance_to(&Vector2D::new(3.0, 2.0)), 2.0, 1e-12);
    assert_close(line.signed_distance_to(&Vector2D::new(3.0, -2.0)), -2.0, 1e-12);
    assert_close(line.arc_length_to(&Vector2D::new(7.0, 1.0)), 7.0, 1e-12);
}

#[test]
fn test_circle_trajectory_positions() {
    // Counterclockwise unit-radius-10 circle starting at the origin
    // heading +x; center at (0, 10).
    let circle = CircleTrajectory::new(0.1, 0.0, 0.0);
    assert_close(circle.radius(), 10.0, 1e-12);
    let center = circle.center();
    assert_close(center.x, 0.0, 1e-12);
    assert_close(center.y, 10.0, 1e-12);

    // A quarter turn.
    let quarter = circle.position_at(10.0 * FRAC_PI_2);
    assert_close(quarter.x, 10.0, 1e-9);
    assert_close(quarter.y, 10.0, 1e-9);

    // Points on the circle have zero signed distance.
    assert_close(circle.signed_distance_to(&quarter), 0.0, 1e-9);
    // The center is to the left at distance R.
    assert_close(circle.signed_distance_to(&center), 10.0, 1e-12);
}

#[test]
fn test_arc_length_to_inverts_position_at() {
    let circle = CircleTrajectory::new(-0.05, 1.2, 0.3);
    for s in [0.5, 3.0, 12.0] {
        let p = circle.position_at(s);
        assert_close(circle.arc_length_to(&p), s, 1e-9);
    }
}

#[test]
fn test_arc_length_at_cylinder() {
    let circle = CircleTrajectory::new(0.02, 0.7, 0.0);
    let s = circle.arc_length_at_cylinder(30.0).unwrap();
    assert!(s > 0.0);
    let crossing = circle.position_at(s);
    assert_close(crossing.norm(), 30.0, 1e-9);

    // The circle through the perigee tops out at a cylinder radius of 2R.
    assert!(circle.arc_length_at_cylinder(150.0).is_none());
}

#[test]
fn test_line_arc_length_at_cylinder() {
    let line = CircleTrajectory::new(0.0, FRAC_PI_2, 2.0);
    let s = line.arc_length_at_cylinder(5.0).unwrap();
    let crossing = line.position_at(s);
    assert_close(crossing.norm(), 5.0, 1e-12);

    // A cylinder smaller than the impact parameter is never reached.
    assert!(line.arc_length_at_cylinder(1.0).is_none());
}

#[test]
fn test_from_point_direction_roundtrip() {
    let point = Vector2D::new(12.0, -3.0);
    let direction = Vector2D::from_phi(0.8);

    for curvature in [0.05, -0.05, 0.0] {
        let trajectory = CircleTrajectory::from_point_direction(point, direction, curvature);
        assert_close(trajectory.curvature, curvature, 1e-12);

        // The constructed trajectory passes through the point with the
        // requested flight direction.
        let s = trajectory.arc_length_to(&point);
        let on_trajectory = trajectory.position_at(s);
        assert_close(on_trajectory.distance_to(&point), 0.0, 1e-9);
        assert!(trajectory.direction_at(s).dot(&direction) > 0.999);
    }
}

#[test]
fn test_sz_line() {
    let line = SzLine::new(2.0, 0.5);
    assert_close(line.z_at(0.0), 2.0, 1e-12);
    assert_close(line.z_at(10.0), 7.0, 1e-12);
}
