//! Slot exclusivity of the TDMA schedule.

use proptest::prelude::*;
use tdmasat_core::{Position, PowerState, TdmaConfig, ValidatedConfig};
use tdmasat_sim::{FixedRandom, Node, SimulationDriver};

/// Valid schedules: every slot fits inside the cycle.
fn schedule_config() -> impl Strategy<Value = TdmaConfig> {
    (1u64..=60, 1usize..=20, 0u64..=600).prop_map(|(slot, nodes, spare)| {
        let mut config = TdmaConfig::default();
        config.schedule.slot_duration_secs = slot;
        config.schedule.num_nodes = nodes;
        config.schedule.cycle_duration_secs = slot * nodes as u64 + spare;
        config
    })
}

proptest! {
    #[test]
    fn prop_at_most_one_node_eligible(config in schedule_config(), offset in 0u64..100_000) {
        let config = ValidatedConfig::new(config).unwrap();
        let nodes: Vec<Node> = (0..config.schedule.num_nodes as u32)
            .map(|id| Node::scheduled(id, Position::default(), config.clone()))
            .collect();
        let mut rng = FixedRandom::never_alert();

        let cycle = config.schedule.cycle_duration_secs;
        let busy = config.schedule.slot_duration_secs * config.schedule.num_nodes as u64;
        for t in offset..offset + cycle {
            let eligible = nodes
                .iter()
                .filter(|node| node.is_eligible_to_transmit(t, &mut rng))
                .count();
            let expected = usize::from(t % cycle < busy);
            prop_assert_eq!(eligible, expected, "t={}", t);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_driver_never_collides(config in schedule_config(), seed in any::<u64>()) {
        let mut config = config;
        config.simulation.seed = Some(seed);
        let cycle = config.schedule.cycle_duration_secs;
        let mut driver = SimulationDriver::new(config).unwrap().with_standard_invariants();

        for _ in 0..cycle.min(3_600) {
            driver.step().unwrap();
            let transmitting = driver
                .nodes()
                .iter()
                .filter(|node| node.power_state() == PowerState::Tx)
                .count();
            prop_assert!(transmitting <= 1);
        }
        prop_assert!(driver.report().success);
    }
}

#[test]
fn test_slot_two_owns_seconds_twenty_to_thirty() {
    let mut driver =
        SimulationDriver::with_rng(TdmaConfig::default(), FixedRandom::never_alert()).unwrap();

    let mut tx_seconds = Vec::new();
    for _ in 0..7_200 {
        let outcome = driver.step().unwrap();
        if driver.node(2).unwrap().power_state() == PowerState::Tx {
            tx_seconds.push(outcome.time);
        }
    }

    let expected: Vec<u64> = (20..30).chain(3_620..3_630).collect();
    assert_eq!(tx_seconds, expected);
}

#[test]
fn test_slot_number_matches_node_id() {
    let config = ValidatedConfig::new(TdmaConfig::default()).unwrap();
    for id in 0..5 {
        let node = Node::scheduled(id, Position::default(), config.clone());
        assert_eq!(node.slot_number(), id);
        assert_eq!(node.slot_window(), u64::from(id) * 10..u64::from(id) * 10 + 10);
    }
}
