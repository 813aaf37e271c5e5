//! Tests for tracks module

use wiretrack::tracks::build_track;
use wiretrack::topology::{LayerSpec, StereoKind, SuperlayerSpec, WireId, WireTopology};
use wiretrack::{merge_tracks, MergeConfig, RecoHit2D, RlHypothesis, Vector2D, WireHit};

fn flat_topology() -> WireTopology {
    WireTopology::new(
        vec![SuperlayerSpec {
            kind: StereoKind::Axial,
            stereo_slope: 0.0,
            layers: vec![LayerSpec {
                radius: 20.0,
                wire_count: 100,
                phi_offset: 0.0,
            }],
        }],
        100.0,
    )
    .unwrap()
}

/// An axial hit pool at the given positions (zero drift).
fn pool_at(positions: &[Vector2D]) -> Vec<WireHit> {
    positions
        .iter()
        .enumerate()
        .map(|(index, &pos)| WireHit {
            index,
            wire: WireId::new(0, 0, index as u16),
            ref_pos: pos,
            drift_radius: 0.0,
            drift_sigma: 0.015,
            continuous_layer: 0,
            axial: true,
            stereo_slope: 0.0,
        })
        .collect()
}

fn reco_view(pool: &[WireHit], range: std::ops::Range<usize>) -> Vec<RecoHit2D> {
    pool[range]
        .iter()
        .map(|hit| RecoHit2D {
            hit: hit.index,
            rl: RlHypothesis::Left,
            pos: hit.ref_pos,
        })
        .collect()
}

/// Points along an arc of the circle centered at `center`.
fn arc_positions(center: Vector2D, radius: f64, start: f64, step: f64, count: usize) -> Vec<Vector2D> {
    (0..count)
        .map(|i| center + Vector2D::from_phi(start + step * i as f64) * radius)
        .collect()
}

#[test]
fn test_build_track_orders_hits_by_arc_length() {
    let topology = flat_topology();
    let positions = arc_positions(Vector2D::new(0.0, 60.0), 60.0, -1.4, 0.05, 12);
    let pool = pool_at(&positions);
    let mut reco = reco_view(&pool, 0..12);
    // Scramble the input order; the track must come out sorted.
    reco.swap(0, 7);
    reco.swap(3, 11);

    let track = build_track(&pool, &reco, None, &topology).unwrap();
    assert_eq!(track.len(), 12);
    let arcs: Vec<f64> = track.hits.iter().map(|reco| reco.arc_length).collect();
    assert!(arcs.windows(2).all(|pair| pair[0] < pair[1]));

    // All-axial input carries no z information.
    assert!(track.hits.iter().all(|reco| reco.z == 0.0));
    assert!(track.probability() > 0.99);
}

#[test]
fn test_fragments_of_one_circle_are_merged() {
    let topology = flat_topology();
    // Sixteen points on one circle, split into two disjoint fragments.
    let positions = arc_positions(Vector2D::new(0.0, 60.0), 60.0, -1.5, 0.04, 16);
    let pool = pool_at(&positions);

    let inner = build_track(&pool, &reco_view(&pool, 0..8), None, &topology).unwrap();
    let outer = build_track(&pool, &reco_view(&pool, 8..16), None, &topology).unwrap();

    let merged = merge_tracks(
        vec![inner, outer],
        &pool,
        &topology,
        &MergeConfig::default(),
    );
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].len(), 16);
    assert!(merged[0].probability() > 0.9);
}

#[test]
fn test_distinct_circles_are_not_merged() {
    let topology = flat_topology();
    let circle_a = arc_positions(Vector2D::new(0.0, 60.0), 60.0, -1.5, 0.05, 8);
    let circle_b = arc_positions(Vector2D::new(10.0, -40.0), 45.0, 1.2, 0.05, 8);
    let all: Vec<Vector2D> = circle_a.iter().chain(circle_b.iter()).copied().collect();
    let pool = pool_at(&all);

    let track_a = build_track(&pool, &reco_view(&pool, 0..8), None, &topology).unwrap();
    let track_b = build_track(&pool, &reco_view(&pool, 8..16), None, &topology).unwrap();

    let merged = merge_tracks(
        vec![track_a, track_b],
        &pool,
        &topology,
        &MergeConfig::default(),
    );
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_end_trajectories_cover_both_ends() {
    let topology = flat_topology();
    let positions = arc_positions(Vector2D::new(0.0, 80.0), 80.0, -1.3, 0.03, 20);
    let pool = pool_at(&positions);
    let track = build_track(&pool, &reco_view(&pool, 0..20), None, &topology).unwrap();

    // Both local trajectories describe the same circle here, so their
    // curvatures agree; the halves are fitted independently though.
    assert!((track.start.circle.curvature - track.end.circle.curvature).abs() < 1e-3);

    let first = track.hits.first().unwrap();
    let last = track.hits.last().unwrap();
    assert!(track.start.circle.signed_distance_to(&first.pos).abs() < 1e-6);
    assert!(track.end.circle.signed_distance_to(&last.pos).abs() < 1e-6);
}
