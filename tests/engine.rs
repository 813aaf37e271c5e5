//! Tests for the full engine pipeline

use std::collections::HashSet;

use wiretrack::synthetic::SyntheticScenario;
use wiretrack::{
    DriftCalibration, EventData, FinderConfig, RawHit, TrackFindingEngine, TrackFindingError,
    WireId, WireTopology,
};

fn engine() -> TrackFindingEngine {
    TrackFindingEngine::new(
        WireTopology::standard(),
        DriftCalibration::default(),
        FinderConfig::default(),
    )
    .unwrap()
}

/// A clean scenario: a few well-separated tracks, full efficiency, no
/// noise, mild smearing.
fn clean_scenario(seed: u64) -> SyntheticScenario {
    SyntheticScenario {
        track_count: 3,
        noise_hits: 0,
        hit_efficiency: 1.0,
        drift_smearing: 0.005,
        impact_sigma: 0.05,
        tan_lambda_range: (0.0, 0.4),
        seed,
        ..SyntheticScenario::default()
    }
}

#[test]
fn test_engine_rejects_invalid_calibration() {
    let bad = DriftCalibration {
        drift_velocity: -1.0,
        ..DriftCalibration::default()
    };
    let result = TrackFindingEngine::new(WireTopology::standard(), bad, FinderConfig::default());
    assert!(matches!(
        result,
        Err(TrackFindingError::InvalidCalibration { .. })
    ));
}

#[test]
fn test_too_few_hits_is_an_error() {
    let mut engine = engine();
    let hits = vec![RawHit {
        wire: WireId::new(0, 0, 0),
        drift_time: 10.0,
    }];
    assert!(matches!(
        engine.process_event("tiny", &hits),
        Err(TrackFindingError::InsufficientHits { .. })
    ));
}

#[test]
fn test_unknown_wire_is_an_error() {
    let mut engine = engine();
    let hits = vec![
        RawHit {
            wire: WireId::new(0, 0, 0),
            drift_time: 10.0,
        },
        RawHit {
            wire: WireId::new(0, 1, 0),
            drift_time: 10.0,
        },
        RawHit {
            wire: WireId::new(42, 0, 0),
            drift_time: 10.0,
        },
    ];
    assert!(matches!(
        engine.process_event("corrupt", &hits),
        Err(TrackFindingError::UnknownWire { .. })
    ));
}

#[test]
fn test_finds_tracks_in_clean_event() {
    let mut engine = engine();
    let generated = clean_scenario(7).generate(
        engine.topology(),
        &DriftCalibration::default(),
    );

    let tracks = engine
        .process_event(&generated.event.event_id, &generated.event.hits)
        .unwrap();

    assert!(
        !tracks.is_empty(),
        "a clean multi-track event must yield candidates"
    );
    for track in &tracks {
        assert!(track.len() >= 5);
    }

    let stats = engine.stats();
    assert_eq!(stats.hit_count, generated.event.hits.len());
    assert!(stats.cluster_count > 0);
    assert!(stats.segment_count > 0);
    assert_eq!(stats.track_count, tracks.len());
}

#[test]
fn test_hits_are_mutually_exclusive_across_tracks() {
    let mut engine = engine();
    let scenario = SyntheticScenario {
        track_count: 5,
        noise_hits: 40,
        seed: 99,
        ..SyntheticScenario::default()
    };
    let generated = scenario.generate(engine.topology(), &DriftCalibration::default());

    let tracks = engine
        .process_event(&generated.event.event_id, &generated.event.hits)
        .unwrap();

    // Every hit index belongs to at most one emitted track.
    let mut seen = HashSet::new();
    for track in &tracks {
        for reco in &track.hits {
            assert!(
                seen.insert(reco.hit),
                "hit {} assigned to two tracks",
                reco.hit
            );
        }
    }
}

#[test]
fn test_found_curvature_matches_truth() {
    let mut engine = engine();
    let scenario = SyntheticScenario {
        track_count: 1,
        noise_hits: 0,
        hit_efficiency: 1.0,
        drift_smearing: 0.002,
        impact_sigma: 0.01,
        tan_lambda_range: (0.0, 0.2),
        seed: 3,
        ..SyntheticScenario::default()
    };
    let generated = scenario.generate(engine.topology(), &DriftCalibration::default());
    let truth = &generated.truth[0];
    assert!(truth.hit_wires.len() >= 10, "the truth track crosses the chamber");

    let tracks = engine
        .process_event(&generated.event.event_id, &generated.event.hits)
        .unwrap();
    assert!(!tracks.is_empty());

    // The longest candidate reconstructs the generated curvature.
    let best = tracks.iter().max_by_key(|track| track.len()).unwrap();
    let found = best.start.circle.curvature.abs();
    let expected = truth.circle.curvature.abs();
    assert!(
        (found - expected).abs() < 0.5 * expected + 0.001,
        "curvature {found} too far from truth {expected}"
    );
}

#[test]
fn test_batch_processing() {
    let mut engine = engine();
    let events: Vec<EventData> = clean_scenario(11)
        .generate_batch(3, engine.topology(), &DriftCalibration::default())
        .into_iter()
        .map(|generated| generated.event)
        .collect();

    let results = engine.process_events(&events);
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|result| result.is_ok()));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    let mut engine = engine();
    let events: Vec<EventData> = clean_scenario(23)
        .generate_batch(4, engine.topology(), &DriftCalibration::default())
        .into_iter()
        .map(|generated| generated.event)
        .collect();

    let sequential = engine.process_events(&events);
    let parallel = engine.process_events_parallel(&events);

    assert_eq!(sequential.len(), parallel.len());
    for (s, p) in sequential.iter().zip(parallel.iter()) {
        let s = s.as_ref().unwrap();
        let p = p.as_ref().unwrap();
        assert_eq!(s.len(), p.len());
        for (track_s, track_p) in s.iter().zip(p.iter()) {
            assert_eq!(track_s.len(), track_p.len());
            assert_eq!(track_s.chi2, track_p.chi2);
        }
    }
}

#[test]
fn test_tracks_serialize_to_json() {
    let mut engine = engine();
    let generated = clean_scenario(5).generate(engine.topology(), &DriftCalibration::default());
    let tracks = engine
        .process_event(&generated.event.event_id, &generated.event.hits)
        .unwrap();

    let json = engine.tracks_to_json(&tracks);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), tracks.len());
}

#[test]
fn test_event_data_json_roundtrip() {
    let event = EventData {
        event_id: "evt-1".to_string(),
        hits: vec![
            RawHit {
                wire: WireId::new(0, 0, 10),
                drift_time: 42.5,
            },
            RawHit {
                wire: WireId::new(3, 2, 100),
                drift_time: 17.0,
            },
        ],
    };
    let json = serde_json::to_string(&event).unwrap();
    let restored: EventData = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.event_id, event.event_id);
    assert_eq!(restored.hits, event.hits);
}
