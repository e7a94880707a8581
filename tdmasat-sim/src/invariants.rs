//! Invariant checking framework for simulation validation.

use std::fmt;

use serde::Serialize;
use tdmasat_core::PowerState;

use crate::node::{Node, PolicyKind};
use crate::satellite::Satellite;

/// Violation of a simulation invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Simulated second the violation was detected at
    pub time: u64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at t={}s: {}",
            self.invariant, self.time, self.description
        )
    }
}

/// State an invariant is checked against, taken after a step completes.
#[derive(Debug, Clone, Copy)]
pub struct NetworkView<'a> {
    pub time: u64,
    pub nodes: &'a [Node],
    pub satellite: &'a Satellite,
    /// Packets relayed during the step just processed
    pub transmissions_this_step: usize,
}

/// Trait for checking simulation invariants.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for current state.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, view: &NetworkView<'_>) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    fn violation(&self, view: &NetworkView<'_>, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            time: view.time,
        }
    }
}

/// At most one scheduled node has its transmitter on at any second.
pub struct CollisionFreeInvariant;

impl Invariant for CollisionFreeInvariant {
    fn check(&self, view: &NetworkView<'_>) -> Result<(), InvariantViolation> {
        let transmitting: Vec<u32> = view
            .nodes
            .iter()
            .filter(|node| {
                node.policy_kind() == PolicyKind::Scheduled && node.power_state() == PowerState::Tx
            })
            .map(Node::node_id)
            .collect();

        if transmitting.len() > 1 {
            return Err(self.violation(
                view,
                format!("scheduled nodes {transmitting:?} share the channel"),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "CollisionFree"
    }
}

/// Every byte a node sends is accounted by the satellite in the same step.
pub struct ByteConservationInvariant;

impl Invariant for ByteConservationInvariant {
    fn check(&self, view: &NetworkView<'_>) -> Result<(), InvariantViolation> {
        let sent: u64 = view.nodes.iter().map(Node::total_bytes_sent).sum();
        let received = view.satellite.total_bytes_received();

        if sent != received {
            return Err(self.violation(
                view,
                format!("nodes sent {sent} bytes but satellite received {received}"),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ByteConservation"
    }
}

/// No node sends more than one packet per simulated second.
pub struct TransmissionRateInvariant;

impl Invariant for TransmissionRateInvariant {
    fn check(&self, view: &NetworkView<'_>) -> Result<(), InvariantViolation> {
        if view.transmissions_this_step > view.nodes.len() {
            return Err(self.violation(
                view,
                format!(
                    "{} packets relayed by {} nodes in one second",
                    view.transmissions_this_step,
                    view.nodes.len()
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "TransmissionRate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRandom;
    use tdmasat_core::{Position, TdmaConfig, ValidatedConfig};

    fn view<'a>(time: u64, nodes: &'a [Node], satellite: &'a Satellite) -> NetworkView<'a> {
        NetworkView {
            time,
            nodes,
            satellite,
            transmissions_this_step: 0,
        }
    }

    #[test]
    fn test_collision_detected() {
        let config = ValidatedConfig::new(TdmaConfig::default()).unwrap();
        let mut rng = FixedRandom::never_alert();
        let mut nodes = vec![
            Node::scheduled(0, Position::default(), config.clone()),
            Node::scheduled(1, Position::default(), config.clone()),
        ];
        let satellite = Satellite::new(&config);

        nodes[0].update_power_state(5, &mut rng);
        assert!(CollisionFreeInvariant.check(&view(5, &nodes, &satellite)).is_ok());

        // Stale Tx state left on node 0 while node 1 enters its slot
        nodes[1].update_power_state(15, &mut rng);
        let violation = CollisionFreeInvariant
            .check(&view(15, &nodes, &satellite))
            .unwrap_err();
        assert_eq!(violation.invariant, "CollisionFree");
        assert_eq!(violation.time, 15);
        assert!(violation.to_string().contains("[0, 1]"));
    }

    #[test]
    fn test_emergency_nodes_ignored_by_collision_check() {
        let config = ValidatedConfig::new(TdmaConfig::emergency_demo()).unwrap();
        let mut rng = FixedRandom::always_alert();
        let mut nodes = vec![
            Node::emergency(0, Position::default(), config.clone()),
            Node::emergency(1, Position::default(), config.clone()),
            Node::scheduled(2, Position::default(), config.clone()),
        ];
        for node in &mut nodes {
            node.update_power_state(25, &mut rng);
        }
        let satellite = Satellite::new(&config);

        assert!(CollisionFreeInvariant.check(&view(25, &nodes, &satellite)).is_ok());
    }

    #[test]
    fn test_byte_conservation() {
        let config = ValidatedConfig::new(TdmaConfig::default()).unwrap();
        let mut rng = FixedRandom::never_alert();
        let mut nodes = vec![Node::scheduled(0, Position::default(), config.clone())];
        let mut satellite = Satellite::new(&config);

        nodes[0].collect(0, &mut rng);
        let packet = nodes[0].transmit(0, &mut rng).unwrap();
        assert!(
            ByteConservationInvariant
                .check(&view(0, &nodes, &satellite))
                .is_err()
        );

        satellite.receive(packet, 0, 0);
        assert!(
            ByteConservationInvariant
                .check(&view(0, &nodes, &satellite))
                .is_ok()
        );
    }

    #[test]
    fn test_transmission_rate() {
        let config = ValidatedConfig::new(TdmaConfig::default()).unwrap();
        let satellite = Satellite::new(&config);
        let mut checked = view(0, &[], &satellite);

        assert!(TransmissionRateInvariant.check(&checked).is_ok());
        checked.transmissions_this_step = 1;
        assert!(TransmissionRateInvariant.check(&checked).is_err());
    }
}
