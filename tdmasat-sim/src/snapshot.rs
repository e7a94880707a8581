//! Read-only per-step view of the network for renderers.

use serde::Serialize;
use tdmasat_core::{EmergencyFlags, Position, PowerState};

use crate::node::{Node, PolicyKind};
use crate::satellite::Satellite;

/// Observable state of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub node_id: u32,
    pub position: Position,
    pub policy: PolicyKind,
    pub power_state: PowerState,
    /// Eligibility as decided for the snapshot's second
    pub eligible: bool,
    pub transmission_count: u64,
    pub buffered: usize,
    /// Present for emergency nodes only
    pub emergency_flag: Option<EmergencyFlags>,
    /// Countdown to the next slot (scheduled) or heartbeat (emergency)
    pub seconds_until_window: u64,
    pub distance_to_satellite: f64,
}

impl NodeSnapshot {
    pub fn capture(node: &Node, time: u64, satellite_position: &Position) -> Self {
        let eligible = node.decided_eligibility(time).unwrap_or_else(|| {
            node.policy_kind() == PolicyKind::Scheduled && node.in_slot(time)
        });

        Self {
            node_id: node.node_id(),
            position: node.position(),
            policy: node.policy_kind(),
            power_state: node.power_state(),
            eligible,
            transmission_count: node.transmission_count(),
            buffered: node.buffer_len(),
            emergency_flag: node.emergency_flag(),
            seconds_until_window: node.seconds_until_window(time),
            distance_to_satellite: node.position().distance_to(satellite_position),
        }
    }
}

/// Observable state of the satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteSnapshot {
    pub position: Position,
    pub total_bytes_received: u64,
    pub packets_received: usize,
}

/// Everything a renderer needs to draw one simulated second.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSnapshot {
    pub time: u64,
    pub nodes: Vec<NodeSnapshot>,
    pub satellite: SatelliteSnapshot,
    pub ground_station: Position,
}

impl NetworkSnapshot {
    pub fn capture(time: u64, nodes: &[Node], satellite: &Satellite, ground_station: Position) -> Self {
        let satellite_position = satellite.position();
        Self {
            time,
            nodes: nodes
                .iter()
                .map(|node| NodeSnapshot::capture(node, time, &satellite_position))
                .collect(),
            satellite: SatelliteSnapshot {
                position: satellite_position,
                total_bytes_received: satellite.total_bytes_received(),
                packets_received: satellite.receptions().len(),
            },
            ground_station,
        }
    }

    /// Nodes whose transmitter is on.
    pub fn transmitting(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.nodes
            .iter()
            .filter(|node| node.power_state == PowerState::Tx)
    }

    /// Clock label `HH:MM:SS` for the snapshot's second.
    pub fn clock_label(&self) -> String {
        let hours = self.time / 3_600;
        let minutes = (self.time % 3_600) / 60;
        let seconds = self.time % 60;
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRandom;
    use tdmasat_core::{TdmaConfig, ValidatedConfig};

    #[test]
    fn test_capture_reports_node_state() {
        let config = ValidatedConfig::new(TdmaConfig::emergency_demo()).unwrap();
        let mut rng = FixedRandom::never_alert();
        let mut nodes = vec![
            Node::emergency(0, Position::new(5.0, 0.0), config.clone()),
            Node::scheduled(1, Position::new(0.0, 5.0), config.clone()),
        ];
        for node in &mut nodes {
            node.update_power_state(12, &mut rng);
        }
        let satellite = Satellite::new(&config);

        let snapshot = NetworkSnapshot::capture(12, &nodes, &satellite, Position::new(0.0, -7.0));

        let emergency = &snapshot.nodes[0];
        assert_eq!(emergency.policy, PolicyKind::Emergency);
        assert!(!emergency.eligible);
        assert_eq!(emergency.emergency_flag, Some(EmergencyFlags::CLEAR));
        assert_eq!(emergency.seconds_until_window, 288);
        assert_eq!(emergency.distance_to_satellite, 5.0);

        let scheduled = &snapshot.nodes[1];
        assert!(scheduled.eligible);
        assert_eq!(scheduled.power_state, PowerState::Tx);
        assert_eq!(scheduled.emergency_flag, None);
        assert_eq!(snapshot.transmitting().count(), 1);
        assert_eq!(snapshot.satellite.packets_received, 0);
    }

    #[test]
    fn test_clock_label() {
        let config = ValidatedConfig::new(TdmaConfig::default()).unwrap();
        let snapshot =
            NetworkSnapshot::capture(3_725, &[], &Satellite::new(&config), Position::default());
        assert_eq!(snapshot.clock_label(), "01:02:05");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let config = ValidatedConfig::new(TdmaConfig::emergency_demo()).unwrap();
        let nodes = vec![Node::emergency(0, Position::new(5.0, 0.0), config.clone())];
        let satellite = Satellite::new(&config);

        let snapshot = NetworkSnapshot::capture(0, &nodes, &satellite, Position::new(0.0, -7.0));
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["nodes"][0]["policy"], "emergency");
        assert_eq!(json["nodes"][0]["power_state"], "standby");
        assert_eq!(json["nodes"][0]["emergency_flag"], 0);
        assert_eq!(json["ground_station"]["y"], -7.0);
    }
}
