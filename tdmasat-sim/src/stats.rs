//! Aggregate statistics, always recomputed from node and satellite state.

use serde::Serialize;
use tdmasat_core::TdmaConfig;

use crate::node::Node;
use crate::satellite::Satellite;

/// Network-wide aggregates at one point of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStatistics {
    /// Packets sent by all nodes
    pub total_transmissions: u64,
    /// Bytes sent by all nodes
    pub total_bytes_sent: u64,
    /// Bytes accounted by the satellite
    pub total_bytes_received: u64,
    /// Buffer occupancy per node, in node id order
    pub buffer_sizes: Vec<usize>,
    /// Configured transmitter duty cycle of one node
    pub channel_utilization_percent: f64,
    /// Configured daily energy budget of one node
    pub energy_per_node_wh_per_day: f64,
}

impl NetworkStatistics {
    /// Computes the aggregates. Pure: calling it twice gives equal results.
    pub fn collect(nodes: &[Node], satellite: &Satellite, config: &TdmaConfig) -> Self {
        Self {
            total_transmissions: nodes.iter().map(Node::transmission_count).sum(),
            total_bytes_sent: nodes.iter().map(Node::total_bytes_sent).sum(),
            total_bytes_received: satellite.total_bytes_received(),
            buffer_sizes: nodes.iter().map(Node::buffer_len).collect(),
            channel_utilization_percent: config.channel_utilization_percent(),
            energy_per_node_wh_per_day: config.total_energy_per_day_wh(),
        }
    }

    /// Samples waiting across the network.
    pub fn total_buffered(&self) -> usize {
        self.buffer_sizes.iter().sum()
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Total transmissions: {}\n", self.total_transmissions));
        summary.push_str(&format!("Total bytes sent: {}\n", self.total_bytes_sent));
        summary.push_str(&format!("Total bytes received: {}\n", self.total_bytes_received));
        summary.push_str(&format!("Buffer sizes: {:?}\n", self.buffer_sizes));
        summary.push_str(&format!(
            "Channel utilization: {:.4}%\n",
            self.channel_utilization_percent
        ));
        summary.push_str(&format!(
            "Energy per node: {:.4} Wh/day\n",
            self.energy_per_node_wh_per_day
        ));
        summary
    }
}

/// Every figure derived from a configuration, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfiguredFigures {
    pub protocol_overhead_bytes: u64,
    pub tx_energy_per_transmission_j: f64,
    pub tx_energy_per_day_wh: f64,
    pub standby_energy_per_day_wh: f64,
    pub gps_energy_per_day_wh: f64,
    pub total_energy_per_day_wh: f64,
    pub total_network_energy_per_day_wh: f64,
    pub data_per_day_bytes: f64,
    pub total_network_data_per_day_bytes: f64,
    pub raw_network_data_per_day_bytes: f64,
    pub active_time_per_day_secs: f64,
    pub channel_utilization_percent: f64,
    pub emergency_transmission_rate: f64,
}

impl ConfiguredFigures {
    pub fn from_config(config: &TdmaConfig) -> Self {
        Self {
            protocol_overhead_bytes: config.protocol_overhead_bytes(),
            tx_energy_per_transmission_j: config.tx_energy_per_transmission_j(),
            tx_energy_per_day_wh: config.tx_energy_per_day_wh(),
            standby_energy_per_day_wh: config.standby_energy_per_day_wh(),
            gps_energy_per_day_wh: config.gps_energy_per_day_wh(),
            total_energy_per_day_wh: config.total_energy_per_day_wh(),
            total_network_energy_per_day_wh: config.total_network_energy_per_day_wh(),
            data_per_day_bytes: config.data_per_day_bytes(),
            total_network_data_per_day_bytes: config.total_network_data_per_day_bytes(),
            raw_network_data_per_day_bytes: config.raw_network_data_per_day_bytes(),
            active_time_per_day_secs: config.active_time_per_day_secs(),
            channel_utilization_percent: config.channel_utilization_percent(),
            emergency_transmission_rate: config.emergency.effective_rate(),
        }
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let rows = [
            ("Protocol overhead (bytes)", self.protocol_overhead_bytes as f64),
            ("TX energy per transmission (J)", self.tx_energy_per_transmission_j),
            ("TX energy per day (Wh)", self.tx_energy_per_day_wh),
            ("Standby energy per day (Wh)", self.standby_energy_per_day_wh),
            ("GPS energy per day (Wh)", self.gps_energy_per_day_wh),
            ("Total energy per node per day (Wh)", self.total_energy_per_day_wh),
            ("Network energy per day (Wh)", self.total_network_energy_per_day_wh),
            ("Usable data per node per day (bytes)", self.data_per_day_bytes),
            ("Usable network data per day (bytes)", self.total_network_data_per_day_bytes),
            ("Raw network data per day (bytes)", self.raw_network_data_per_day_bytes),
            ("Active TX time per day (s)", self.active_time_per_day_secs),
            ("Channel utilization (%)", self.channel_utilization_percent),
            ("Emergency TX rate (per s)", self.emergency_transmission_rate),
        ];

        rows.iter()
            .map(|(label, value)| format!("{label:<40} {value:>12.4}\n"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;
    use tdmasat_core::{Position, ValidatedConfig};

    #[test]
    fn test_statistics_sum_node_counters() {
        let config = ValidatedConfig::new(TdmaConfig::default()).unwrap();
        let mut rng = DeterministicRng::from_seed(1);
        let mut nodes: Vec<Node> = (0..3)
            .map(|id| Node::scheduled(id, Position::default(), config.clone()))
            .collect();
        let mut satellite = Satellite::new(&config);

        for node in &mut nodes {
            node.collect(0, &mut rng);
            node.collect(900, &mut rng);
        }
        let packet = nodes[1].transmit(12, &mut rng).unwrap();
        satellite.receive(packet, 1, 12);

        let stats = NetworkStatistics::collect(&nodes, &satellite, &config);
        assert_eq!(stats.total_transmissions, 1);
        assert_eq!(stats.total_bytes_sent, 375);
        assert_eq!(stats.total_bytes_received, 375);
        assert_eq!(stats.buffer_sizes, vec![2, 1, 2]);
        assert_eq!(stats.total_buffered(), 5);
        assert_eq!(stats, NetworkStatistics::collect(&nodes, &satellite, &config));
        assert!(stats.summary().contains("Buffer sizes: [2, 1, 2]"));
    }

    #[test]
    fn test_configured_figures_match_config() {
        let config = TdmaConfig::default();
        let figures = ConfiguredFigures::from_config(&config);

        assert_eq!(figures.protocol_overhead_bytes, 125);
        assert_eq!(figures.total_energy_per_day_wh, config.total_energy_per_day_wh());
        assert_eq!(
            figures.channel_utilization_percent,
            config.channel_utilization_percent()
        );
        assert!(figures.summary().contains("Channel utilization (%)"));
    }
}
