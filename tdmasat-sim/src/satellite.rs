//! Relay satellite: receives packets, applies propagation delay, counts bytes.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tdmasat_core::{Packet, Position, ValidatedConfig};
use tracing::debug;

/// One packet as logged by the satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reception {
    pub packet: Packet,
    /// Sending node
    pub node_id: u32,
    /// Simulated second the node transmitted
    pub sent_at: u64,
    /// `sent_at` plus the propagation delay
    pub arrives_at: f64,
}

/// Relay satellite.
#[derive(Debug, Clone)]
pub struct Satellite {
    position: Position,
    propagation_delay_secs: f64,
    raw_packet_size_bytes: u64,
    receptions: Vec<Reception>,
    total_bytes_received: u64,
}

impl Satellite {
    /// Creates a satellite at the configured position.
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            position: config.topology.satellite_position,
            propagation_delay_secs: config.radio.propagation_delay_secs,
            raw_packet_size_bytes: config.radio.raw_packet_size_bytes,
            receptions: Vec::new(),
            total_bytes_received: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn total_bytes_received(&self) -> u64 {
        self.total_bytes_received
    }

    /// Reception log in call (send) order.
    pub fn receptions(&self) -> &[Reception] {
        &self.receptions
    }

    /// Copy of the reception log ordered by arrival time.
    ///
    /// The sort is stable, so equal arrival times keep send order.
    pub fn receptions_by_arrival(&self) -> Vec<Reception> {
        let mut sorted = self.receptions.clone();
        sorted.sort_by(|a, b| a.arrives_at.total_cmp(&b.arrives_at));
        sorted
    }

    /// Logs a packet and accounts its bytes. Returns the bytes accounted.
    ///
    /// Emergency reports count their own drawn size; plain samples count
    /// the raw slot packet size.
    pub fn receive(&mut self, packet: Packet, node_id: u32, send_time: u64) -> u64 {
        let size = packet.size_or(self.raw_packet_size_bytes);
        let arrives_at = send_time as f64 + self.propagation_delay_secs;

        debug!(node_id, send_time, arrives_at, bytes = size, "Satellite received packet");

        self.receptions.push(Reception {
            packet,
            node_id,
            sent_at: send_time,
            arrives_at,
        });
        self.total_bytes_received += size;
        size
    }
}

/// Satellite shared between concurrent producers.
///
/// `receive` is the single synchronisation point: every producer goes
/// through the same mutex.
#[derive(Debug, Clone)]
pub struct SharedSatellite {
    inner: Arc<Mutex<Satellite>>,
}

impl SharedSatellite {
    pub fn new(satellite: Satellite) -> Self {
        Self {
            inner: Arc::new(Mutex::new(satellite)),
        }
    }

    /// Locks, logs and accounts one packet.
    pub fn receive(&self, packet: Packet, node_id: u32, send_time: u64) -> u64 {
        self.inner.lock().receive(packet, node_id, send_time)
    }

    pub fn total_bytes_received(&self) -> u64 {
        self.inner.lock().total_bytes_received()
    }

    /// Runs `f` with the satellite locked.
    pub fn with<T>(&self, f: impl FnOnce(&Satellite) -> T) -> T {
        f(&self.inner.lock())
    }
}
