//! Heartbeat and alert behaviour of emergency nodes.

use tdmasat_core::{EmergencyFlags, Packet, Position, TdmaConfig, ValidatedConfig};
use tdmasat_sim::{DeterministicRng, FixedRandom, Node, SimulationDriver, StepEvent};

#[test]
fn test_heartbeat_only_transmissions() {
    let mut driver =
        SimulationDriver::with_rng(TdmaConfig::emergency_demo(), FixedRandom::never_alert())
            .unwrap()
            .with_standard_invariants();

    driver.advance_to(3_599).unwrap();

    let node_zero: Vec<u64> = driver
        .satellite()
        .receptions()
        .iter()
        .filter(|r| r.node_id == 0)
        .map(|r| r.sent_at)
        .collect();
    let expected: Vec<u64> = (0..12).map(|i| i * 300).collect();
    assert_eq!(node_zero, expected);
    assert_eq!(driver.node(0).unwrap().transmission_count(), 12);
}

#[test]
fn test_union_rate_over_long_run() {
    let config = ValidatedConfig::new(TdmaConfig::emergency_demo()).unwrap();
    let node = Node::emergency(0, Position::default(), config.clone());
    let mut rng = DeterministicRng::from_seed(20_240_601);

    let seconds = 300_000u64;
    let eligible = (0..seconds)
        .filter(|&t| node.is_eligible_to_transmit(t, &mut rng))
        .count() as f64;

    let expected = config.emergency.effective_rate() * seconds as f64;
    let alert_only = config.emergency.alert_probability * seconds as f64;

    assert!((config.emergency.effective_rate() - (1.0 / 300.0 + 0.02 - 0.02 / 300.0)).abs() < 1e-12);
    assert!(
        (eligible - expected).abs() < expected * 0.05,
        "eligible={eligible} expected={expected}"
    );
    // Heartbeats add to the alert rate rather than replacing it
    assert!(eligible > alert_only * 1.08);
}

#[test]
fn test_burst_reports_within_bounds() {
    let mut config = TdmaConfig::emergency_demo();
    config.simulation.seed = Some(77);
    let mut driver = SimulationDriver::new(config).unwrap().with_standard_invariants();

    let report = driver.run_for(7_200).unwrap();
    assert!(report.success);
    assert!(report.metrics.event_count(StepEvent::BurstRelayed) >= 48);

    for reception in driver.satellite().receptions() {
        let Packet::Emergency(burst) = &reception.packet else {
            assert!(reception.node_id >= 2);
            continue;
        };

        assert!(reception.node_id < 2);
        assert!((400..=750).contains(&burst.packet_size));
        assert!((1..=12).contains(&burst.readings.len()));
        assert_eq!(burst.timestamps.len(), burst.readings.len());
        assert_eq!(burst.timestamps.last(), Some(&reception.sent_at));
        for pair in burst.timestamps.windows(2) {
            assert!(pair[1] - pair[0] <= 60);
        }
        let expected_trend = burst.readings.len().saturating_sub(1).max(1);
        assert_eq!(burst.trend.len(), expected_trend);
        assert_eq!(burst.telemetry.emergency_flag, EmergencyFlags::ALERT);
    }
}

#[test]
fn test_scheduled_nodes_unaffected_by_emergency_neighbours() {
    let mut config = TdmaConfig::emergency_demo();
    config.simulation.seed = Some(5);
    let mut driver = SimulationDriver::new(config).unwrap();

    driver.advance_to(7_199).unwrap();

    for node_id in 2..5 {
        let node = driver.node(node_id).unwrap();
        assert_eq!(node.transmission_count(), 2);
        assert_eq!(node.total_bytes_sent(), 750);
        assert_eq!(node.buffer_len(), 6);
    }
}
