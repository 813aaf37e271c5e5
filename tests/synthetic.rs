//! Tests for synthetic module

use wiretrack::synthetic::SyntheticScenario;
use wiretrack::{DriftCalibration, WireTopology};

#[test]
fn test_generation_is_reproducible() {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let scenario = SyntheticScenario {
        seed: 1234,
        ..SyntheticScenario::default()
    };

    let first = scenario.generate(&topology, &calibration);
    let second = scenario.generate(&topology, &calibration);

    assert_eq!(first.event.hits, second.event.hits);
    assert_eq!(first.truth.len(), second.truth.len());
}

#[test]
fn test_different_seeds_differ() {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let a = SyntheticScenario {
        seed: 1,
        ..SyntheticScenario::default()
    }
    .generate(&topology, &calibration);
    let b = SyntheticScenario {
        seed: 2,
        ..SyntheticScenario::default()
    }
    .generate(&topology, &calibration);

    assert_ne!(a.event.hits, b.event.hits);
}

#[test]
fn test_track_and_noise_counts() {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let scenario = SyntheticScenario {
        track_count: 4,
        noise_hits: 25,
        hit_efficiency: 1.0,
        seed: 77,
        ..SyntheticScenario::default()
    };

    let generated = scenario.generate(&topology, &calibration);
    assert_eq!(generated.truth.len(), 4);

    let truth_hits: usize = generated.truth.iter().map(|t| t.hit_wires.len()).sum();
    assert_eq!(generated.event.hits.len(), truth_hits + 25);
}

#[test]
fn test_generated_hits_reference_valid_wires() {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let generated = SyntheticScenario::default().generate(&topology, &calibration);

    for hit in &generated.event.hits {
        assert!(topology.contains(&hit.wire), "wire {} out of layout", hit.wire);
        assert!(hit.drift_time >= calibration.t0);
    }
}

#[test]
fn test_truth_hits_lie_near_their_trajectory() {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let scenario = SyntheticScenario {
        track_count: 2,
        noise_hits: 0,
        drift_smearing: 0.0,
        hit_efficiency: 1.0,
        seed: 5,
        ..SyntheticScenario::default()
    };
    let generated = scenario.generate(&topology, &calibration);

    for truth in &generated.truth {
        for wire in &truth.hit_wires {
            // Without smearing, the drift circle around the wire at the
            // crossing z touches the trajectory, so the transverse distance
            // from the reference position stays within a cell.
            let distance = truth
                .circle
                .signed_distance_to(&topology.wire_ref_position(wire))
                .abs();
            assert!(distance < 2.0, "hit wire {wire} far off its trajectory");
        }
    }
}

#[test]
fn test_batch_uses_consecutive_seeds() {
    let topology = WireTopology::standard();
    let calibration = DriftCalibration::default();
    let batch = SyntheticScenario::default().generate_batch(3, &topology, &calibration);

    assert_eq!(batch.len(), 3);
    assert_ne!(batch[0].event.hits, batch[1].event.hits);
    assert_ne!(batch[1].event.hits, batch[2].event.hits);
    assert_eq!(batch[0].event.event_id, "synthetic-4711");
    assert_eq!(batch[1].event.event_id, "synthetic-4712");
}
