//! tdmasat Simulation - Time-stepped TDMA and emergency-policy network engine.

#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! A ring of ground sensor nodes measures on a schedule and relays packets
//! through one satellite. Each simulated second the driver walks the nodes in
//! ascending id: power state, collection, transmission, relay. Runs are
//! reproducible from a single seed.
//!
//! # Policies
//!
//! - **Scheduled**: each node owns an exclusive slot of the TDMA cycle and
//!   sends its oldest buffered sample there.
//! - **Emergency**: a node reports a burst of recent readings on a fixed
//!   heartbeat, or whenever a per-second alert draw fires.
//!
//! # Example
//!
//! ```rust,no_run
//! use tdmasat_core::TdmaConfig;
//! use tdmasat_sim::SimulationDriver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = SimulationDriver::new(TdmaConfig::for_testing())?.with_standard_invariants();
//! let report = driver.run_for(3_600)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod driver;
pub mod invariants;
pub mod node;
pub mod report;
pub mod rng;
pub mod satellite;
pub mod snapshot;
pub mod stats;

pub use clock::SimClock;
pub use driver::{
    MAX_INVARIANT_VIOLATIONS, SimulationDriver, SimulationError, StepOutcome, ring_layout,
};
pub use invariants::{
    ByteConservationInvariant, CollisionFreeInvariant, Invariant, InvariantViolation,
    NetworkView, TransmissionRateInvariant,
};
pub use node::{Node, NodePolicy, PolicyKind};
pub use report::{SimulationMetrics, SimulationReport, StepEvent};
pub use rng::{DeterministicRng, FixedRandom, RandomSource, RangePick};
pub use satellite::{Reception, Satellite, SharedSatellite};
pub use snapshot::{NetworkSnapshot, NodeSnapshot, SatelliteSnapshot};
pub use stats::{ConfiguredFigures, NetworkStatistics};

#[cfg(test)]
mod tests;
