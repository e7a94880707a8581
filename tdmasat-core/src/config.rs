//! Centralized configuration for tdmasat.
//!
//! All tunable parameters of a simulation run are defined here to avoid
//! hard-coded values scattered throughout the engine. A `TdmaConfig` is built
//! once, validated, and then only ever read.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::TdmaError;
use crate::sample::{EmergencyFlags, Position};

/// Seconds in one simulated day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Period of the GPS fix window. Nodes acquire a fix at the top of every hour.
pub const GPS_FIX_PERIOD_SECS: u64 = 3_600;

/// Configuration validation failures.
///
/// Every variant is fatal at setup: a simulation never starts with a
/// configuration that breaks one of these rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "TDMA slots overflow the cycle: {num_nodes} nodes x {slot_duration_secs}s > {cycle_duration_secs}s"
    )]
    SlotOverflow {
        slot_duration_secs: u64,
        num_nodes: usize,
        cycle_duration_secs: u64,
    },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("usable payload {usable} bytes exceeds raw packet size {raw} bytes")]
    PayloadExceedsPacket { usable: u64, raw: u64 },

    #[error("propagation delay must be finite and non-negative, got {value}")]
    InvalidDelay { value: f64 },

    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("sensor noise standard deviation must be finite and non-negative, got {value}")]
    InvalidNoise { value: f64 },

    #[error("emergency window [{min}, {max}] is invalid")]
    InvalidWindow { min: usize, max: usize },

    #[error("emergency packet size range [{min}, {max}] is invalid")]
    InvalidPacketRange { min: u64, max: u64 },

    #[error("emergency node {node_id} does not exist in a network of {num_nodes} nodes")]
    UnknownEmergencyNode { node_id: u32, num_nodes: usize },
}

/// Central configuration for a simulation run.
///
/// Groups related settings into logical sections. Derived figures (energy,
/// throughput, channel utilization) are methods so they can never drift from
/// the parameters they are computed from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TdmaConfig {
    pub schedule: ScheduleConfig,
    pub radio: RadioConfig,
    pub sensor: SensorConfig,
    pub power: PowerConfig,
    pub emergency: EmergencyConfig,
    pub topology: TopologyConfig,
    pub simulation: SimulationConfig,
}

/// TDMA schedule and sensing cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes between two scheduled-node measurements
    pub sensing_interval_minutes: u64,
    /// Length of one TDMA slot
    pub slot_duration_secs: u64,
    /// Length of a full TDMA cycle
    pub cycle_duration_secs: u64,
    /// Number of ground nodes, also the number of slots in use
    pub num_nodes: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sensing_interval_minutes: 15,
            slot_duration_secs: 10,
            cycle_duration_secs: 3_600, // 1 hour
            num_nodes: 5,
        }
    }
}

impl ScheduleConfig {
    /// Sensing interval in seconds.
    pub fn sensing_interval_secs(&self) -> u64 {
        self.sensing_interval_minutes * 60
    }
}

/// Uplink radio and satellite link parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Uplink baud rate in bits per second
    pub baud_rate: u32,
    /// Bytes on air per slot (baud x slot / 8)
    pub raw_packet_size_bytes: u64,
    /// Bytes left for sensor data after protocol overhead
    pub usable_payload_bytes: u64,
    /// One-way delay to the relay satellite
    pub propagation_delay_secs: f64,
    /// Uplink band, informational only
    pub frequency_band_mhz: (f64, f64),
    /// Readings a full payload can carry
    pub data_points_per_packet: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            baud_rate: 300,
            raw_packet_size_bytes: 375, // 300 bit/s x 10 s / 8
            usable_payload_bytes: 250,
            propagation_delay_secs: 0.25, // GEO hop
            frequency_band_mhz: (401.0, 402.0),
            data_points_per_packet: 10,
        }
    }
}

/// Sensor front-end parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Measurement accuracy attached to every sample
    pub accuracy: f64,
    /// Mean of the measurement noise distribution
    pub noise_mean: f64,
    /// Standard deviation of the measurement noise distribution
    pub noise_std_dev: f64,
    /// Length of the hourly GPS fix window
    pub gps_fix_duration_secs: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            accuracy: 0.95,
            noise_mean: 0.0,
            noise_std_dev: 1.0,
            gps_fix_duration_secs: 60,
        }
    }
}

/// Electrical draw of a node in one power state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerDraw {
    /// Supply voltage (V DC)
    pub voltage: f64,
    /// Current (A)
    pub current: f64,
}

impl PowerDraw {
    /// Power in watts.
    pub fn watts(&self) -> f64 {
        self.voltage * self.current
    }
}

/// Voltage/current tables per power state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub tx: PowerDraw,
    pub standby: PowerDraw,
    pub gps: PowerDraw,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            tx: PowerDraw {
                voltage: 12.0,
                current: 1.8,
            },
            standby: PowerDraw {
                voltage: 12.0,
                current: 0.0028, // 2.8 mA
            },
            gps: PowerDraw {
                voltage: 12.0,
                current: 0.025, // 25 mA
            },
        }
    }
}

/// Emergency transmission policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Period of the guaranteed heartbeat transmission
    pub heartbeat_interval_secs: u64,
    /// Per-second probability of a spontaneous alert
    pub alert_probability: f64,
    /// Period between emergency-node measurements
    pub collection_interval_secs: u64,
    /// Rolling history kept for burst reports
    pub history_capacity: usize,
    /// Smallest burst window, in readings
    pub min_window: usize,
    /// Largest burst window, in readings
    pub max_window: usize,
    /// Smallest burst report size
    pub min_packet_bytes: u64,
    /// Largest burst report size
    pub max_packet_bytes: u64,
    /// Status bits stamped on every burst report
    pub alert_flag: EmergencyFlags,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 300, // 5 minutes
            alert_probability: 0.02,
            collection_interval_secs: 300,
            history_capacity: 12,
            min_window: 5,
            max_window: 12,
            min_packet_bytes: 400,
            max_packet_bytes: 750,
            alert_flag: EmergencyFlags::ALERT,
        }
    }
}

impl EmergencyConfig {
    /// Expected transmissions per second of one emergency node.
    ///
    /// The heartbeat and the alert draw are independent events, so the rate
    /// is their union: `1/T + p - p/T`.
    pub fn effective_rate(&self) -> f64 {
        let heartbeat = 1.0 / self.heartbeat_interval_secs as f64;
        heartbeat + self.alert_probability - self.alert_probability * heartbeat
    }
}

/// Physical layout of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Radius of the ring the ground nodes are placed on
    pub ring_radius: f64,
    /// Position of the relay satellite (ring center)
    pub satellite_position: Position,
    /// Position of the ground station the satellite relays to
    pub ground_station_position: Position,
    /// Node ids running the emergency policy
    pub emergency_nodes: Vec<u32>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            ring_radius: 5.0,
            satellite_position: Position::new(0.0, 0.0),
            ground_station_position: Position::new(0.0, -7.0),
            emergency_nodes: Vec::new(),
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for reproducible runs; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Simulated seconds processed by a full run
    pub duration_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            duration_secs: 2 * 3_600,
        }
    }
}

impl TdmaConfig {
    /// Creates the emergency-mode demonstration: nodes 0 and 1 run the
    /// emergency policy for a 30 minute run.
    pub fn emergency_demo() -> Self {
        Self {
            topology: TopologyConfig {
                emergency_nodes: vec![0, 1],
                ..Default::default()
            },
            simulation: SimulationConfig {
                seed: None,
                duration_secs: 1_800,
            },
            ..Default::default()
        }
    }

    /// Creates a configuration for deterministic testing.
    pub fn for_testing() -> Self {
        Self {
            simulation: SimulationConfig {
                seed: Some(42),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and leave the default in place.
    ///
    /// # Errors
    /// - `ConfigError` - Overridden values fail validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(nodes) = env_parse::<usize>("TDMASAT_NUM_NODES") {
            config.schedule.num_nodes = nodes;
        }
        if let Some(slot) = env_parse::<u64>("TDMASAT_SLOT_DURATION") {
            config.schedule.slot_duration_secs = slot;
        }
        if let Some(cycle) = env_parse::<u64>("TDMASAT_CYCLE_DURATION") {
            config.schedule.cycle_duration_secs = cycle;
        }
        if let Some(minutes) = env_parse::<u64>("TDMASAT_SENSING_INTERVAL") {
            config.schedule.sensing_interval_minutes = minutes;
        }
        if let Some(delay) = env_parse::<f64>("TDMASAT_PROPAGATION_DELAY") {
            config.radio.propagation_delay_secs = delay;
        }
        if let Some(seed) = env_parse::<u64>("TDMASAT_SEED") {
            config.simulation.seed = Some(seed);
        }
        if let Some(duration) = env_parse::<u64>("TDMASAT_DURATION") {
            config.simulation.duration_secs = duration;
        }
        if let Ok(list) = std::env::var("TDMASAT_EMERGENCY_NODES") {
            config.topology.emergency_nodes = list
                .split(',')
                .filter_map(|id| id.trim().parse().ok())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; absent fields keep their defaults.
    ///
    /// # Errors
    /// - `TdmaError::Parse` - Document is not valid configuration JSON
    /// - `TdmaError::Config` - Parsed values fail validation
    pub fn from_json_str(json: &str) -> Result<Self, TdmaError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    /// - `TdmaError::Io` - File cannot be read
    /// - `TdmaError::Parse` - File is not valid configuration JSON
    /// - `TdmaError::Config` - Parsed values fail validation
    pub fn from_json_file(path: &Path) -> Result<Self, TdmaError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks every cross-field rule the engine relies on.
    ///
    /// # Errors
    /// - `ConfigError` - First rule that does not hold
    pub fn validate(&self) -> Result<(), ConfigError> {
        let schedule = &self.schedule;
        non_zero("slot_duration_secs", schedule.slot_duration_secs)?;
        non_zero("cycle_duration_secs", schedule.cycle_duration_secs)?;
        non_zero("sensing_interval_minutes", schedule.sensing_interval_minutes)?;
        non_zero("num_nodes", schedule.num_nodes as u64)?;

        let slots_needed = schedule
            .slot_duration_secs
            .saturating_mul(schedule.num_nodes as u64);
        if slots_needed > schedule.cycle_duration_secs {
            return Err(ConfigError::SlotOverflow {
                slot_duration_secs: schedule.slot_duration_secs,
                num_nodes: schedule.num_nodes,
                cycle_duration_secs: schedule.cycle_duration_secs,
            });
        }

        if self.radio.usable_payload_bytes > self.radio.raw_packet_size_bytes {
            return Err(ConfigError::PayloadExceedsPacket {
                usable: self.radio.usable_payload_bytes,
                raw: self.radio.raw_packet_size_bytes,
            });
        }

        let delay = self.radio.propagation_delay_secs;
        if !delay.is_finite() || delay < 0.0 {
            return Err(ConfigError::InvalidDelay { value: delay });
        }

        unit_range("sensor.accuracy", self.sensor.accuracy)?;
        let noise = self.sensor.noise_std_dev;
        if !noise.is_finite() || noise < 0.0 || !self.sensor.noise_mean.is_finite() {
            return Err(ConfigError::InvalidNoise { value: noise });
        }

        let emergency = &self.emergency;
        non_zero("heartbeat_interval_secs", emergency.heartbeat_interval_secs)?;
        non_zero("collection_interval_secs", emergency.collection_interval_secs)?;
        non_zero("history_capacity", emergency.history_capacity as u64)?;
        unit_range("emergency.alert_probability", emergency.alert_probability)?;

        if emergency.min_window == 0 || emergency.min_window > emergency.max_window {
            return Err(ConfigError::InvalidWindow {
                min: emergency.min_window,
                max: emergency.max_window,
            });
        }
        if emergency.min_packet_bytes > emergency.max_packet_bytes {
            return Err(ConfigError::InvalidPacketRange {
                min: emergency.min_packet_bytes,
                max: emergency.max_packet_bytes,
            });
        }

        if let Some(&node_id) = self
            .topology
            .emergency_nodes
            .iter()
            .find(|&&id| id as usize >= schedule.num_nodes)
        {
            return Err(ConfigError::UnknownEmergencyNode {
                node_id,
                num_nodes: schedule.num_nodes,
            });
        }

        Ok(())
    }

    /// Returns whether `node_id` runs the emergency policy.
    pub fn is_emergency_node(&self, node_id: u32) -> bool {
        self.topology.emergency_nodes.contains(&node_id)
    }

    /// Bytes per packet spent on protocol framing.
    pub fn protocol_overhead_bytes(&self) -> u64 {
        self.radio.raw_packet_size_bytes - self.radio.usable_payload_bytes
    }

    /// Full TDMA cycles in one day, i.e. transmissions per node per day.
    pub fn cycles_per_day(&self) -> f64 {
        SECONDS_PER_DAY as f64 / self.schedule.cycle_duration_secs as f64
    }

    /// Energy of one slot-long transmission in joules.
    pub fn tx_energy_per_transmission_j(&self) -> f64 {
        self.power.tx.watts() * self.schedule.slot_duration_secs as f64
    }

    /// Energy of one slot-long transmission in watt-hours.
    pub fn tx_energy_per_transmission_wh(&self) -> f64 {
        self.tx_energy_per_transmission_j() / 3_600.0
    }

    /// Daily transmit energy of one node in watt-hours.
    pub fn tx_energy_per_day_wh(&self) -> f64 {
        self.tx_energy_per_transmission_wh() * self.cycles_per_day()
    }

    /// Daily standby energy of one node in watt-hours.
    pub fn standby_energy_per_day_wh(&self) -> f64 {
        self.power.standby.watts() * 24.0
    }

    /// Daily GPS energy of one node in watt-hours (one fix per hour).
    pub fn gps_energy_per_day_wh(&self) -> f64 {
        self.power.gps.watts() * self.sensor.gps_fix_duration_secs as f64 * 24.0 / 3_600.0
    }

    /// Total daily energy of one node in watt-hours.
    pub fn total_energy_per_day_wh(&self) -> f64 {
        self.tx_energy_per_day_wh() + self.standby_energy_per_day_wh() + self.gps_energy_per_day_wh()
    }

    /// Total daily energy of the whole network in watt-hours.
    pub fn total_network_energy_per_day_wh(&self) -> f64 {
        self.total_energy_per_day_wh() * self.schedule.num_nodes as f64
    }

    /// Usable bytes one node delivers per day.
    pub fn data_per_day_bytes(&self) -> f64 {
        self.radio.usable_payload_bytes as f64 * self.cycles_per_day()
    }

    /// Usable bytes the network delivers per day.
    pub fn total_network_data_per_day_bytes(&self) -> f64 {
        self.data_per_day_bytes() * self.schedule.num_nodes as f64
    }

    /// Raw bytes on air for the network per day.
    pub fn raw_network_data_per_day_bytes(&self) -> f64 {
        self.radio.raw_packet_size_bytes as f64
            * self.cycles_per_day()
            * self.schedule.num_nodes as f64
    }

    /// Seconds per day one node keeps its transmitter on.
    pub fn active_time_per_day_secs(&self) -> f64 {
        self.schedule.slot_duration_secs as f64 * self.cycles_per_day()
    }

    /// Percentage of the day one node's transmitter is active.
    pub fn channel_utilization_percent(&self) -> f64 {
        self.active_time_per_day_secs() / SECONDS_PER_DAY as f64 * 100.0
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

/// A `TdmaConfig` that passed [`TdmaConfig::validate`].
///
/// Nodes and the satellite divide by schedule periods, so they only accept
/// this wrapper. Clones share one allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig(Arc<TdmaConfig>);

impl ValidatedConfig {
    /// Validates `config` and freezes it.
    ///
    /// # Errors
    /// - `ConfigError` - First rule that does not hold
    pub fn new(config: TdmaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self(Arc::new(config)))
    }
}

impl TryFrom<TdmaConfig> for ValidatedConfig {
    type Error = ConfigError;

    fn try_from(config: TdmaConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl Deref for ValidatedConfig {
    type Target = TdmaConfig;

    fn deref(&self) -> &TdmaConfig {
        &self.0
    }
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroValue { field });
    }
    Ok(())
}

fn unit_range(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfUnitRange { field, value });
    }
    Ok(())
}
