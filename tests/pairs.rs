//! Tests for pairs module

use wiretrack::geometry::CircleTrajectory;
use wiretrack::pairs::reconstruct_stereo;
use wiretrack::topology::{WireId, WireTopology};
use wiretrack::WireHit;

#[test]
fn test_stereo_reconstruction_recovers_z() {
    let topology = WireTopology::standard();

    // A stereo wire in superlayer 1 and a radial straight trajectory
    // through its reference position: the transverse miss grows linearly
    // with z, so a drift radius of slope * z0 puts the crossing at +-z0.
    let wire = WireId::new(1, 0, 40);
    let slope = topology.stereo_slope(&wire);
    assert!(slope != 0.0);

    let phi = topology.wire_ref_position(&wire).phi();
    let trajectory = CircleTrajectory::new(0.0, phi, 0.0);

    let expected_z = 20.0;
    let hit = WireHit {
        index: 0,
        wire,
        ref_pos: topology.wire_ref_position(&wire),
        drift_radius: slope.abs() * expected_z,
        drift_sigma: 0.015,
        continuous_layer: topology.continuous_layer(&wire),
        axial: false,
        stereo_slope: slope,
    };

    let candidates = reconstruct_stereo(&hit, &trajectory, &topology);
    assert_eq!(candidates.len(), 2);

    let mut zs: Vec<f64> = candidates.iter().map(|c| c.z).collect();
    zs.sort_by(|a, b| a.total_cmp(b));
    assert!((zs[0] + expected_z).abs() < 0.5);
    assert!((zs[1] - expected_z).abs() < 0.5);

    // The two candidates carry opposite passage hypotheses.
    assert!(candidates[0].rl_sign * candidates[1].rl_sign < 0.0);
}

#[test]
fn test_axial_hits_have_no_stereo_candidates() {
    let topology = WireTopology::standard();
    let wire = WireId::new(0, 0, 0);
    let hit = WireHit {
        index: 0,
        wire,
        ref_pos: topology.wire_ref_position(&wire),
        drift_radius: 0.1,
        drift_sigma: 0.015,
        continuous_layer: 0,
        axial: true,
        stereo_slope: 0.0,
    };
    let trajectory = CircleTrajectory::new(0.0, 0.0, 0.0);
    assert!(reconstruct_stereo(&hit, &trajectory, &topology).is_empty());
}

#[test]
fn test_out_of_chamber_crossings_are_dropped() {
    let topology = WireTopology::standard();
    let wire = WireId::new(1, 0, 40);
    let slope = topology.stereo_slope(&wire);
    let phi = topology.wire_ref_position(&wire).phi();
    let trajectory = CircleTrajectory::new(0.0, phi, 0.0);

    // A drift radius requiring |z| far beyond the wire length.
    let hit = WireHit {
        index: 0,
        wire,
        ref_pos: topology.wire_ref_position(&wire),
        drift_radius: slope.abs() * 5.0 * topology.half_length(),
        drift_sigma: 0.015,
        continuous_layer: topology.continuous_layer(&wire),
        axial: false,
        stereo_slope: slope,
    };
    assert!(reconstruct_stereo(&hit, &trajectory, &topology).is_empty());
}
