//! Tests for the simulation driver.

use std::sync::Arc;

use tdmasat_core::{ConfigError, Packet, PowerState, TdmaConfig};

use crate::{
    FixedRandom, Invariant, InvariantViolation, MAX_INVARIANT_VIOLATIONS, NetworkView,
    PolicyKind, SimulationDriver, SimulationError, StepEvent,
};

fn seeded(mut config: TdmaConfig, seed: u64) -> SimulationDriver {
    config.simulation.seed = Some(seed);
    SimulationDriver::new(config).unwrap().with_standard_invariants()
}

struct AlwaysViolated;

impl Invariant for AlwaysViolated {
    fn check(&self, view: &NetworkView<'_>) -> Result<(), InvariantViolation> {
        Err(self.violation(view, "always fails".to_string()))
    }

    fn name(&self) -> &str {
        "AlwaysViolated"
    }
}

#[test]
fn test_simulation_reproducibility() {
    let mut sim1 = seeded(TdmaConfig::emergency_demo(), 12345);
    let report1 = sim1.run_for(3_600).unwrap();

    let mut sim2 = seeded(TdmaConfig::emergency_demo(), 12345);
    let report2 = sim2.run_for(3_600).unwrap();

    assert_eq!(report1.seed, Some(12345));
    assert_eq!(report1.statistics, report2.statistics);
    assert_eq!(
        sim1.satellite().receptions(),
        sim2.satellite().receptions()
    );
    assert_eq!(report1.metrics.events_by_type, report2.metrics.events_by_type);
}

#[test]
fn test_os_seed_is_reported() {
    let config = TdmaConfig::default();
    assert!(config.simulation.seed.is_none());

    let driver = SimulationDriver::new(config).unwrap();
    assert!(driver.seed().is_some());
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = TdmaConfig::for_testing();
    config.schedule.num_nodes = 361;

    let result = SimulationDriver::new(config);
    assert!(matches!(
        result,
        Err(SimulationError::InvalidConfig(ConfigError::SlotOverflow { .. }))
    ));
}

#[test]
fn test_first_step_processes_second_zero() {
    let mut driver = SimulationDriver::with_rng(TdmaConfig::default(), FixedRandom::never_alert())
        .unwrap();

    let outcome = driver.step().unwrap();
    assert_eq!(outcome.time, 0);
    // Node 0 collects at t=0 and sends it in the first second of its slot
    assert_eq!(outcome.transmissions, 1);
    assert_eq!(outcome.bytes_relayed, 375);
    assert_eq!(driver.current_time(), 0);
    assert_eq!(driver.seed(), None);

    let outcome = driver.step().unwrap();
    assert_eq!(outcome.time, 1);
    assert_eq!(outcome.transmissions, 0);
}

#[test]
fn test_heartbeat_only_schedule() {
    let mut driver =
        SimulationDriver::with_rng(TdmaConfig::emergency_demo(), FixedRandom::never_alert())
            .unwrap()
            .with_standard_invariants();

    let report = driver.run_for(1_800).unwrap();

    let sent_at = |node_id: u32| -> Vec<u64> {
        driver
            .satellite()
            .receptions()
            .iter()
            .filter(|r| r.node_id == node_id)
            .map(|r| r.sent_at)
            .collect()
    };
    assert_eq!(sent_at(0), vec![0, 300, 600, 900, 1_200, 1_500]);
    assert_eq!(sent_at(1), vec![0, 300, 600, 900, 1_200, 1_500]);
    assert_eq!(sent_at(2), vec![20]);
    assert_eq!(sent_at(3), vec![30]);
    assert_eq!(sent_at(4), vec![40]);
    assert!(report.success);
    assert_eq!(report.metrics.event_count(StepEvent::BurstRelayed), 12);
}

#[test]
fn test_emergency_bytes_are_drawn_sizes() {
    let mut driver = seeded(TdmaConfig::emergency_demo(), 99);
    driver.run_for(7_200).unwrap();

    for node in driver.nodes() {
        let receptions: Vec<_> = driver
            .satellite()
            .receptions()
            .iter()
            .filter(|r| r.node_id == node.node_id())
            .collect();
        let sizes: Vec<u64> = receptions
            .iter()
            .map(|r| r.packet.size_or(driver.config().radio.raw_packet_size_bytes))
            .collect();

        match node.policy_kind() {
            PolicyKind::Emergency => {
                assert!(sizes.iter().all(|size| (400..=750).contains(size)));
                assert!(
                    receptions
                        .iter()
                        .all(|r| matches!(r.packet, Packet::Emergency(_)))
                );
            }
            PolicyKind::Scheduled => {
                assert!(sizes.iter().all(|&size| size == 375));
            }
        }
        assert_eq!(node.total_bytes_sent(), sizes.iter().sum::<u64>());
        assert_eq!(node.transmission_count(), receptions.len() as u64);
    }
}

#[test]
fn test_buffers_drain_at_most_one_per_step() {
    let mut driver = seeded(TdmaConfig::emergency_demo(), 3);
    let mut previous: Vec<usize> = driver.nodes().iter().map(|n| n.buffer_len()).collect();

    for _ in 0..7_200 {
        driver.step().unwrap();
        let current: Vec<usize> = driver.nodes().iter().map(|n| n.buffer_len()).collect();
        for (before, after) in previous.iter().zip(&current) {
            assert!(*after + 1 >= *before, "buffer dropped from {before} to {after}");
        }
        previous = current;
    }
}

#[test]
fn test_statistics_idempotent() {
    let mut driver = seeded(TdmaConfig::default(), 8);
    driver.advance_to(1_000).unwrap();

    let first = driver.statistics();
    let second = driver.statistics();
    assert_eq!(first, second);
    assert_eq!(first.total_bytes_sent, first.total_bytes_received);
}

#[test]
fn test_advance_to_rejects_regression() {
    let mut driver = seeded(TdmaConfig::default(), 1);

    driver.advance_to(10).unwrap();
    assert_eq!(driver.current_time(), 10);

    let result = driver.advance_to(5);
    assert!(matches!(
        result,
        Err(SimulationError::TimeRegression {
            requested: 5,
            next: 11
        })
    ));
    assert!(driver.advance_to(10).is_err());
    assert_eq!(driver.current_time(), 10);

    driver.advance_to(11).unwrap();
    assert_eq!(driver.current_time(), 11);
}

#[test]
fn test_too_many_invariant_violations() {
    let mut driver = seeded(TdmaConfig::default(), 5);
    driver.add_invariant(Arc::new(AlwaysViolated));

    let result = driver.run_for(100);

    assert!(matches!(
        result,
        Err(SimulationError::TooManyInvariantViolations { count })
            if count == MAX_INVARIANT_VIOLATIONS
    ));
    assert_eq!(driver.current_time(), 9);
    assert!(!driver.report().success);
    assert_eq!(driver.metrics().invariant_violations[0].invariant, "AlwaysViolated");
}

#[test]
fn test_run_uses_configured_duration() {
    let mut config = TdmaConfig::for_testing();
    config.simulation.duration_secs = 120;
    let mut driver = SimulationDriver::new(config).unwrap();

    let report = driver.run().unwrap();
    assert_eq!(report.seconds_simulated, 120);
    assert_eq!(report.metrics.steps_processed, 120);
    assert!(report.summary().contains("Simulation Report (seed: 42)"));
}

#[test]
fn test_snapshot_reflects_last_step() {
    let mut driver = seeded(TdmaConfig::default(), 2);
    driver.advance_to(25).unwrap();

    let snapshot = driver.snapshot();
    assert_eq!(snapshot.time, 25);
    assert_eq!(snapshot.clock_label(), "00:00:25");
    assert_eq!(snapshot.nodes.len(), 5);

    let transmitting: Vec<u32> = snapshot.transmitting().map(|n| n.node_id).collect();
    assert_eq!(transmitting, vec![2]);
    assert_eq!(snapshot.nodes[2].power_state, PowerState::Tx);
    assert_eq!(snapshot.nodes[2].seconds_until_window, 0);
    assert_eq!(snapshot.nodes[3].seconds_until_window, 5);
    assert_eq!(snapshot.satellite.packets_received, 3);
    assert_eq!(snapshot.ground_station, driver.config().topology.ground_station_position);
}
