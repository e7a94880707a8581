//! tdmasat Core - Configuration and data model for a satellite-relayed TDMA sensor network
//!
//! This crate provides the building blocks shared by the simulation engine and
//! its front ends: validated configuration with derived energy and throughput
//! figures, sensor samples and packets, node-side queues, and tracing setup.

pub mod buffer;
pub mod config;
pub mod sample;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use buffer::{SampleQueue, ValueHistory};
pub use config::{ConfigError, TdmaConfig, ValidatedConfig};
pub use sample::{
    DataSample, DeviceTelemetry, EmergencyFlags, EmergencyReport, Packet, Position, PowerState,
};

/// Errors that can bubble up while loading or preparing a simulation.
#[derive(Debug, thiserror::Error)]
pub enum TdmaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TdmaError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TdmaError::Config(e) => format!("Invalid network configuration: {e}"),
            TdmaError::Parse(e) => format!("Configuration file is not valid JSON: {e}"),
            TdmaError::Io(_) => "Configuration file could not be read".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(self, TdmaError::Config(_) | TdmaError::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, TdmaError>;
