//! End-to-end runs of the scheduled network.

use tdmasat_core::{Packet, TdmaConfig};
use tdmasat_sim::SimulationDriver;

fn scheduled_driver(seed: u64) -> SimulationDriver {
    let mut config = TdmaConfig::default();
    config.simulation.seed = Some(seed);
    SimulationDriver::new(config)
        .unwrap()
        .with_standard_invariants()
}

#[test]
fn test_one_cycle_of_five_nodes() {
    let mut driver = scheduled_driver(2024);

    driver.advance_to(3_599).unwrap();
    let stats = driver.statistics();

    // Samples at 0, 900, 1800 and 2700; the t=0 sample went out in the slot
    assert_eq!(stats.total_transmissions, 5);
    assert_eq!(stats.buffer_sizes, vec![3; 5]);
    assert_eq!(stats.total_bytes_sent, 5 * 375);
    assert_eq!(stats.total_bytes_received, stats.total_bytes_sent);

    let receptions = driver.satellite().receptions();
    let sent_at: Vec<u64> = receptions.iter().map(|r| r.sent_at).collect();
    assert_eq!(sent_at, vec![0, 10, 20, 30, 40]);
    for reception in receptions {
        assert_eq!(reception.arrives_at, reception.sent_at as f64 + 0.25);
        match &reception.packet {
            Packet::Sample(sample) => assert_eq!(sample.timestamp, 0),
            Packet::Emergency(_) => panic!("scheduled network produced a burst report"),
        }
    }
}

#[test]
fn test_two_cycles_accumulate_backlog() {
    let mut driver = scheduled_driver(7);

    driver.advance_to(7_199).unwrap();
    let stats = driver.statistics();

    assert_eq!(stats.total_transmissions, 10);
    assert_eq!(stats.buffer_sizes, vec![6; 5]);

    // Second cycle sends the 900 s samples, oldest first
    let second_cycle: Vec<(u32, u64)> = driver
        .satellite()
        .receptions()
        .iter()
        .filter(|r| r.sent_at >= 3_600)
        .map(|r| match &r.packet {
            Packet::Sample(sample) => (r.node_id, sample.timestamp),
            Packet::Emergency(_) => (r.node_id, u64::MAX),
        })
        .collect();
    assert_eq!(
        second_cycle,
        vec![(0, 900), (1, 900), (2, 900), (3, 900), (4, 900)]
    );
}

#[test]
fn test_arrival_order_matches_send_order() {
    let mut driver = scheduled_driver(11);
    driver.advance_to(10_799).unwrap();

    let by_arrival: Vec<u64> = driver
        .satellite()
        .receptions_by_arrival()
        .iter()
        .map(|r| r.sent_at)
        .collect();
    let by_send: Vec<u64> = driver
        .satellite()
        .receptions()
        .iter()
        .map(|r| r.sent_at)
        .collect();

    assert_eq!(by_arrival, by_send);
    assert_eq!(by_send.len(), 15);
}

#[test]
fn test_report_serializes() {
    let mut driver = scheduled_driver(3);
    let report = driver.run_for(3_600).unwrap();

    assert!(report.success);
    assert_eq!(report.seconds_simulated, 3_600);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["seed"], 3);
    assert_eq!(json["statistics"]["total_transmissions"], 5);
    assert_eq!(json["metrics"]["events_by_type"]["SampleRelayed"], 5);
    assert_eq!(json["metrics"]["events_by_type"]["Collected"], 20);

    let snapshot = serde_json::to_value(driver.snapshot()).unwrap();
    assert_eq!(snapshot["time"], 3_599);
    assert_eq!(snapshot["nodes"][0]["policy"], "scheduled");
    assert_eq!(snapshot["nodes"][0]["power_state"], "standby");
}
