//! Sensor readings and the packets built from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 2D coordinate in the simulation plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Activity of a node's radio and GPS for energy accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    #[default]
    Standby,
    Gps,
    Tx,
}

impl PowerState {
    /// Returns string representation for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::Standby => "standby",
            PowerState::Gps => "gps",
            PowerState::Tx => "tx",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emergency status bit-field carried by emergency nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmergencyFlags(pub u8);

impl EmergencyFlags {
    /// No condition raised.
    pub const CLEAR: Self = Self(0b0000_0000);
    /// Stamped on every synthesized burst report.
    pub const ALERT: Self = Self(0b1000_0010);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_clear(&self) -> bool {
        self.0 == 0
    }

    /// Returns whether every bit of `other` is set.
    pub fn contains(&self, other: EmergencyFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for EmergencyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010b}", self.0)
    }
}

/// Device health reported by emergency nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceTelemetry {
    pub battery_voltage: f64,
    pub solar_voltage: f64,
    pub gps_fix: Position,
    pub diagnostics: u8,
    pub emergency_flag: EmergencyFlags,
}

impl Default for DeviceTelemetry {
    fn default() -> Self {
        Self {
            battery_voltage: 12.0,
            solar_voltage: 14.0,
            gps_fix: Position::default(),
            diagnostics: 0b0000_0000,
            emergency_flag: EmergencyFlags::CLEAR,
        }
    }
}

/// A single sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSample {
    /// Simulated second the reading was taken
    pub timestamp: u64,
    pub value: f64,
    pub accuracy: f64,
    /// Present on samples taken by emergency nodes
    pub telemetry: Option<DeviceTelemetry>,
}

/// Burst report synthesized by an emergency node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyReport {
    /// One entry per reading, a minute apart, oldest first
    pub timestamps: Vec<u64>,
    pub readings: Vec<f64>,
    /// First differences of `readings`
    pub trend: Vec<f64>,
    pub telemetry: DeviceTelemetry,
    /// On-air size, drawn independently of the sensing payload
    pub packet_size: u64,
}

/// Transmittable unit handed from a node to the satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Packet {
    Sample(DataSample),
    Emergency(EmergencyReport),
}

impl Packet {
    /// Size carried by the packet itself, if any.
    pub fn explicit_size(&self) -> Option<u64> {
        match self {
            Packet::Sample(_) => None,
            Packet::Emergency(report) => Some(report.packet_size),
        }
    }

    /// Size on air, falling back to the raw slot packet size.
    pub fn size_or(&self, raw_packet_size_bytes: u64) -> u64 {
        self.explicit_size().unwrap_or(raw_packet_size_bytes)
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Packet::Emergency(_))
    }

    /// Returns string representation of the packet kind for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Sample(_) => "Sample",
            Packet::Emergency(_) => "Emergency",
        }
    }
}

/// First differences of `readings`; a single zero when there are fewer than two.
pub fn first_differences(readings: &[f64]) -> Vec<f64> {
    if readings.len() < 2 {
        return vec![0.0];
    }
    readings.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: u64) -> DataSample {
        DataSample {
            timestamp,
            value: 0.5,
            accuracy: 0.95,
            telemetry: None,
        }
    }

    #[test]
    fn test_packet_size_fallback() {
        let packet = Packet::Sample(sample(0));
        assert_eq!(packet.explicit_size(), None);
        assert_eq!(packet.size_or(375), 375);

        let report = Packet::Emergency(EmergencyReport {
            timestamps: vec![0],
            readings: vec![1.0],
            trend: vec![0.0],
            telemetry: DeviceTelemetry::default(),
            packet_size: 512,
        });
        assert_eq!(report.explicit_size(), Some(512));
        assert_eq!(report.size_or(375), 512);
        assert!(report.is_emergency());
        assert_eq!(report.kind(), "Emergency");
    }

    #[test]
    fn test_first_differences() {
        assert_eq!(first_differences(&[]), vec![0.0]);
        assert_eq!(first_differences(&[3.0]), vec![0.0]);
        assert_eq!(first_differences(&[1.0, 4.0, 2.0]), vec![3.0, -2.0]);
    }

    #[test]
    fn test_emergency_flags() {
        let alert = EmergencyFlags::ALERT;
        assert_eq!(alert.bits(), 0b1000_0010);
        assert!(alert.contains(EmergencyFlags(0b0000_0010)));
        assert!(!alert.contains(EmergencyFlags(0b0000_0001)));
        assert!(EmergencyFlags::CLEAR.is_clear());
        assert_eq!(alert.to_string(), "0b10000010");
    }

    #[test]
    fn test_packet_serializes_with_kind_tag() {
        let json = serde_json::to_value(Packet::Sample(sample(900))).unwrap();
        assert_eq!(json["kind"], "sample");
        assert_eq!(json["timestamp"], 900);
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
