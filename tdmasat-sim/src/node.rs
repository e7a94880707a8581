//! Ground node state machine and its transmission policies.
//!
//! A node owns its measurement buffer, power state and counters. Whether it
//! may transmit at a given second, and what it sends, depends on its policy:
//!
//! - **Scheduled**: transmits the oldest buffered sample inside its exclusive
//!   TDMA slot (`slot_number = node_id`).
//! - **Emergency**: transmits a synthesized burst report on a fixed heartbeat
//!   or whenever an independent per-second alert draw fires.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tdmasat_core::config::GPS_FIX_PERIOD_SECS;
use tdmasat_core::sample::first_differences;
use tdmasat_core::{
    DataSample, DeviceTelemetry, EmergencyFlags, EmergencyReport, Packet, Position, PowerState,
    SampleQueue, ValidatedConfig, ValueHistory,
};
use tracing::{debug, trace};

use crate::rng::RandomSource;

/// Spacing of the back-dated timestamps in a burst report.
const REPORT_SPACING_SECS: u64 = 60;

/// Policy tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Scheduled,
    Emergency,
}

impl PolicyKind {
    /// Returns string representation for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Scheduled => "scheduled",
            PolicyKind::Emergency => "emergency",
        }
    }
}

/// State carried only by emergency nodes.
#[derive(Debug, Clone)]
pub struct EmergencyState {
    telemetry: DeviceTelemetry,
    history: ValueHistory,
}

impl EmergencyState {
    fn new(history_capacity: usize) -> Self {
        Self {
            telemetry: DeviceTelemetry::default(),
            history: ValueHistory::with_capacity(history_capacity),
        }
    }

    pub fn telemetry(&self) -> &DeviceTelemetry {
        &self.telemetry
    }

    pub fn history(&self) -> &ValueHistory {
        &self.history
    }
}

/// Transmission and collection policy, selected at construction.
#[derive(Debug, Clone)]
pub enum NodePolicy {
    Scheduled,
    Emergency(EmergencyState),
}

impl NodePolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            NodePolicy::Scheduled => PolicyKind::Scheduled,
            NodePolicy::Emergency(_) => PolicyKind::Emergency,
        }
    }
}

/// A ground sensor node.
#[derive(Debug, Clone)]
pub struct Node {
    node_id: u32,
    position: Position,
    data_buffer: SampleQueue,
    power_state: PowerState,
    transmission_count: u64,
    total_bytes_sent: u64,
    policy: NodePolicy,
    /// Eligibility decided for a given second, reused by `transmit`
    decided: Option<(u64, bool)>,
    config: ValidatedConfig,
}

impl Node {
    /// Creates a node with the given policy tag.
    ///
    /// Slot and collection arithmetic divides by the configured periods, so
    /// only a validated configuration is accepted.
    pub fn new(node_id: u32, position: Position, kind: PolicyKind, config: ValidatedConfig) -> Self {
        let policy = match kind {
            PolicyKind::Scheduled => NodePolicy::Scheduled,
            PolicyKind::Emergency => {
                NodePolicy::Emergency(EmergencyState::new(config.emergency.history_capacity))
            }
        };

        Self {
            node_id,
            position,
            data_buffer: SampleQueue::new(),
            power_state: PowerState::Standby,
            transmission_count: 0,
            total_bytes_sent: 0,
            policy,
            decided: None,
            config,
        }
    }

    /// Creates a node on the TDMA schedule.
    pub fn scheduled(node_id: u32, position: Position, config: ValidatedConfig) -> Self {
        Self::new(node_id, position, PolicyKind::Scheduled, config)
    }

    /// Creates a node on the emergency policy.
    pub fn emergency(node_id: u32, position: Position, config: ValidatedConfig) -> Self {
        Self::new(node_id, position, PolicyKind::Emergency, config)
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    /// TDMA slot index; identical to the node id.
    pub fn slot_number(&self) -> u32 {
        self.node_id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn power_state(&self) -> PowerState {
        self.power_state
    }

    pub fn transmission_count(&self) -> u64 {
        self.transmission_count
    }

    pub fn total_bytes_sent(&self) -> u64 {
        self.total_bytes_sent
    }

    pub fn policy(&self) -> &NodePolicy {
        &self.policy
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn data_buffer(&self) -> &SampleQueue {
        &self.data_buffer
    }

    pub fn buffer_len(&self) -> usize {
        self.data_buffer.len()
    }

    /// Emergency status bits, for emergency nodes only.
    pub fn emergency_flag(&self) -> Option<EmergencyFlags> {
        match &self.policy {
            NodePolicy::Scheduled => None,
            NodePolicy::Emergency(state) => Some(state.telemetry.emergency_flag),
        }
    }

    /// Seconds of the TDMA cycle reserved for this node.
    pub fn slot_window(&self) -> Range<u64> {
        let duration = self.config.schedule.slot_duration_secs;
        let start = u64::from(self.node_id) * duration;
        start..start + duration
    }

    /// Whether `current_time` falls inside this node's TDMA slot.
    pub fn in_slot(&self, current_time: u64) -> bool {
        let cycle_time = current_time % self.config.schedule.cycle_duration_secs;
        self.slot_window().contains(&cycle_time)
    }

    /// Whether this node's collection trigger fires at `current_time`.
    pub fn collection_due(&self, current_time: u64) -> bool {
        let interval = match self.policy {
            NodePolicy::Scheduled => self.config.schedule.sensing_interval_secs(),
            NodePolicy::Emergency(_) => self.config.emergency.collection_interval_secs,
        };
        current_time % interval == 0
    }

    /// Seconds until the next guaranteed transmit opportunity.
    ///
    /// Scheduled nodes count down to their slot, emergency nodes to their
    /// heartbeat. Zero while the opportunity is open.
    pub fn seconds_until_window(&self, current_time: u64) -> u64 {
        match self.policy {
            NodePolicy::Scheduled => {
                if self.in_slot(current_time) {
                    return 0;
                }
                let cycle = self.config.schedule.cycle_duration_secs;
                let cycle_time = current_time % cycle;
                (self.slot_window().start + cycle - cycle_time) % cycle
            }
            NodePolicy::Emergency(_) => {
                let heartbeat = self.config.emergency.heartbeat_interval_secs;
                (heartbeat - current_time % heartbeat) % heartbeat
            }
        }
    }

    /// Takes a measurement and queues it.
    pub fn collect<R: RandomSource + ?Sized>(&mut self, timestamp: u64, rng: &mut R) {
        let sensor = &self.config.sensor;
        let value = rng.normal(sensor.noise_mean, sensor.noise_std_dev);

        let telemetry = match &mut self.policy {
            NodePolicy::Scheduled => None,
            NodePolicy::Emergency(state) => {
                state.history.push(value);
                Some(state.telemetry)
            }
        };

        self.data_buffer.push(DataSample {
            timestamp,
            value,
            accuracy: sensor.accuracy,
            telemetry,
        });

        trace!(
            node_id = self.node_id,
            timestamp,
            value,
            buffered = self.data_buffer.len(),
            "Collected sample"
        );
    }

    /// Decides whether this node may transmit at `current_time`.
    ///
    /// Pure for scheduled nodes. Emergency nodes make exactly one uniform
    /// draw per call: eligible when the heartbeat fires OR the draw falls
    /// below the alert probability.
    pub fn is_eligible_to_transmit<R: RandomSource + ?Sized>(
        &self,
        current_time: u64,
        rng: &mut R,
    ) -> bool {
        match self.policy {
            NodePolicy::Scheduled => self.in_slot(current_time),
            NodePolicy::Emergency(_) => {
                let emergency = &self.config.emergency;
                let heartbeat = current_time % emergency.heartbeat_interval_secs == 0;
                let alert = rng.next_unit() < emergency.alert_probability;
                heartbeat || alert
            }
        }
    }

    /// Eligibility decided for `current_time`, if it has been decided.
    pub fn decided_eligibility(&self, current_time: u64) -> Option<bool> {
        match self.decided {
            Some((time, eligible)) if time == current_time => Some(eligible),
            _ => None,
        }
    }

    /// Eligibility for `current_time`, deciding and remembering it once.
    fn eligibility_at<R: RandomSource + ?Sized>(&mut self, current_time: u64, rng: &mut R) -> bool {
        if let Some(eligible) = self.decided_eligibility(current_time) {
            return eligible;
        }
        let eligible = self.is_eligible_to_transmit(current_time, rng);
        self.decided = Some((current_time, eligible));
        eligible
    }

    /// Sets the power state for `current_time` and returns the eligibility.
    ///
    /// Precedence: `Tx` when eligible, else `Gps` inside the hourly fix
    /// window, else `Standby`.
    pub fn update_power_state<R: RandomSource + ?Sized>(
        &mut self,
        current_time: u64,
        rng: &mut R,
    ) -> bool {
        let eligible = self.eligibility_at(current_time, rng);

        self.power_state = if eligible {
            PowerState::Tx
        } else if current_time % GPS_FIX_PERIOD_SECS < self.config.sensor.gps_fix_duration_secs {
            PowerState::Gps
        } else {
            PowerState::Standby
        };

        eligible
    }

    /// Produces at most one packet for `current_time`.
    ///
    /// Returns `None` when the node is not eligible or has nothing to send.
    pub fn transmit<R: RandomSource + ?Sized>(
        &mut self,
        current_time: u64,
        rng: &mut R,
    ) -> Option<Packet> {
        if !self.eligibility_at(current_time, rng) {
            return None;
        }

        let (packet, size) = match &self.policy {
            NodePolicy::Scheduled => {
                let sample = self.data_buffer.pop()?;
                (
                    Packet::Sample(sample),
                    self.config.radio.raw_packet_size_bytes,
                )
            }
            NodePolicy::Emergency(state) => {
                let report = self.burst_report(state, current_time, rng)?;
                let size = report.packet_size;
                (Packet::Emergency(report), size)
            }
        };

        self.transmission_count += 1;
        self.total_bytes_sent += size;

        debug!(
            node_id = self.node_id,
            time = current_time,
            kind = packet.kind(),
            bytes = size,
            "Transmitted packet"
        );

        Some(packet)
    }

    fn burst_report<R: RandomSource + ?Sized>(
        &self,
        state: &EmergencyState,
        current_time: u64,
        rng: &mut R,
    ) -> Option<EmergencyReport> {
        if state.history.is_empty() {
            return None;
        }

        let emergency = &self.config.emergency;
        let window = rng.range_inclusive(emergency.min_window as u64, emergency.max_window as u64);
        let readings = state.history.latest(window as usize);
        let count = readings.len() as u64;

        let timestamps = (0..count)
            .map(|i| current_time.saturating_sub(REPORT_SPACING_SECS * (count - 1 - i)))
            .collect();
        let trend = first_differences(&readings);
        let packet_size = rng.range_inclusive(emergency.min_packet_bytes, emergency.max_packet_bytes);

        Some(EmergencyReport {
            timestamps,
            readings,
            trend,
            telemetry: DeviceTelemetry {
                emergency_flag: emergency.alert_flag,
                ..state.telemetry
            },
            packet_size,
        })
    }
}
