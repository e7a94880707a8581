//! Time-stepped simulation driver.

use std::f64::consts::TAU;
use std::sync::Arc;

use tdmasat_core::{ConfigError, Position, TdmaConfig, ValidatedConfig};
use thiserror::Error;
use tracing::{info, trace, warn};

use crate::clock::SimClock;
use crate::invariants::{
    ByteConservationInvariant, CollisionFreeInvariant, Invariant, NetworkView,
    TransmissionRateInvariant,
};
use crate::node::{Node, PolicyKind};
use crate::report::{SimulationMetrics, SimulationReport, StepEvent};
use crate::rng::{DeterministicRng, RandomSource};
use crate::satellite::Satellite;
use crate::snapshot::NetworkSnapshot;
use crate::stats::NetworkStatistics;

/// Maximum number of invariant violations before stopping simulation.
pub const MAX_INVARIANT_VIOLATIONS: usize = 10;

/// Errors that can occur during simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration rejected before the first step
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// No seed was configured and the OS could not supply one
    #[error("Random source unavailable: {reason}")]
    RandomSourceUnavailable {
        /// Underlying failure
        reason: String,
    },

    /// Requested time was already processed
    #[error("Cannot advance to t={requested}s, next unprocessed second is {next}")]
    TimeRegression {
        /// Requested target second
        requested: u64,
        /// Next second the clock would process
        next: u64,
    },

    /// Too many invariant violations occurred
    #[error("Too many invariant violations: {count}")]
    TooManyInvariantViolations {
        /// Number of violations that occurred
        count: usize,
    },
}

/// What happened during one simulated second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Second that was processed
    pub time: u64,
    /// Packets relayed to the satellite
    pub transmissions: usize,
    /// Bytes the satellite accounted
    pub bytes_relayed: u64,
}

/// Places `count` nodes evenly on a circle, node `i` at angle `2πi/count`.
pub fn ring_layout(count: usize, radius: f64, center: Position) -> Vec<Position> {
    (0..count)
        .map(|i| {
            let angle = TAU * i as f64 / count as f64;
            Position::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Steps a network of nodes and one relay satellite one second at a time.
pub struct SimulationDriver<R: RandomSource = DeterministicRng> {
    config: ValidatedConfig,
    /// Ascending node id
    nodes: Vec<Node>,
    satellite: Satellite,
    clock: SimClock,
    rng: R,
    metrics: SimulationMetrics,
    invariants: Vec<Arc<dyn Invariant>>,
}

impl SimulationDriver<DeterministicRng> {
    /// Creates a driver seeded from the configured seed, or from the OS
    /// when none is configured.
    ///
    /// # Errors
    /// - `SimulationError::InvalidConfig` - Configuration fails validation
    /// - `SimulationError::RandomSourceUnavailable` - No seed and no OS entropy
    pub fn new(config: TdmaConfig) -> Result<Self, SimulationError> {
        let rng = match config.simulation.seed {
            Some(seed) => DeterministicRng::from_seed(seed),
            None => DeterministicRng::from_os()?,
        };
        Self::with_rng(config, rng)
    }
}

impl<R: RandomSource> SimulationDriver<R> {
    /// Creates a driver drawing every random value from `rng`.
    ///
    /// # Errors
    /// - `SimulationError::InvalidConfig` - Configuration fails validation
    pub fn with_rng(config: TdmaConfig, rng: R) -> Result<Self, SimulationError> {
        let config = ValidatedConfig::new(config)?;

        let positions = ring_layout(
            config.schedule.num_nodes,
            config.topology.ring_radius,
            config.topology.satellite_position,
        );
        let nodes: Vec<Node> = positions
            .into_iter()
            .zip(0u32..)
            .map(|(position, node_id)| {
                let kind = if config.is_emergency_node(node_id) {
                    PolicyKind::Emergency
                } else {
                    PolicyKind::Scheduled
                };
                Node::new(node_id, position, kind, config.clone())
            })
            .collect();

        info!(
            nodes = nodes.len(),
            emergency_nodes = ?config.topology.emergency_nodes,
            seed = ?rng.seed(),
            "Simulation driver initialized"
        );

        Ok(Self {
            satellite: Satellite::new(&config),
            config,
            nodes,
            clock: SimClock::new(),
            rng,
            metrics: SimulationMetrics::new(),
            invariants: Vec::new(),
        })
    }

    /// Registers the collision, byte conservation and rate invariants.
    pub fn with_standard_invariants(mut self) -> Self {
        self.add_invariant(Arc::new(CollisionFreeInvariant));
        self.add_invariant(Arc::new(ByteConservationInvariant));
        self.add_invariant(Arc::new(TransmissionRateInvariant));
        self
    }

    /// Adds an invariant to check after every step.
    pub fn add_invariant(&mut self, invariant: Arc<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    pub fn config(&self) -> &TdmaConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node_id: u32) -> Option<&Node> {
        self.nodes.get(node_id as usize)
    }

    pub fn satellite(&self) -> &Satellite {
        &self.satellite
    }

    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Last processed second, or zero before the first step.
    pub fn current_time(&self) -> u64 {
        self.clock.now()
    }

    /// Seed that reproduces this run, if the random source has one.
    pub fn seed(&self) -> Option<u64> {
        self.rng.seed()
    }

    /// Processes the next second. The first call processes t=0.
    ///
    /// # Errors
    /// - `SimulationError::TooManyInvariantViolations` - Violation limit reached
    pub fn step(&mut self) -> Result<StepOutcome, SimulationError> {
        let time = self.clock.tick();
        let mut transmissions = 0;
        let mut bytes_relayed = 0;

        for node in &mut self.nodes {
            node.update_power_state(time, &mut self.rng);

            if node.collection_due(time) {
                node.collect(time, &mut self.rng);
                self.metrics.record_event(StepEvent::Collected);
            }

            if let Some(packet) = node.transmit(time, &mut self.rng) {
                let event = if packet.is_emergency() {
                    StepEvent::BurstRelayed
                } else {
                    StepEvent::SampleRelayed
                };
                bytes_relayed += self.satellite.receive(packet, node.node_id(), time);
                transmissions += 1;
                self.metrics.record_event(event);
            }
        }

        let largest_buffer = self.nodes.iter().map(Node::buffer_len).max().unwrap_or(0);
        self.metrics.record_step(largest_buffer);

        trace!(time, transmissions, bytes_relayed, "Step processed");

        self.check_invariants(time, transmissions)?;

        Ok(StepOutcome {
            time,
            transmissions,
            bytes_relayed,
        })
    }

    /// Steps every second up to and including `target`.
    ///
    /// # Errors
    /// - `SimulationError::TimeRegression` - `target` was already processed
    /// - `SimulationError::TooManyInvariantViolations` - Violation limit reached
    pub fn advance_to(&mut self, target: u64) -> Result<(), SimulationError> {
        let ticks = self.clock.ticks_until(target)?;
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Runs `seconds` more steps and reports.
    ///
    /// # Errors
    /// - `SimulationError::TooManyInvariantViolations` - Violation limit reached
    pub fn run_for(&mut self, seconds: u64) -> Result<SimulationReport, SimulationError> {
        for _ in 0..seconds {
            self.step()?;
        }

        let report = self.report();
        info!(
            seconds = report.seconds_simulated,
            transmissions = report.statistics.total_transmissions,
            bytes_received = report.statistics.total_bytes_received,
            success = report.success,
            "Simulation run complete"
        );
        Ok(report)
    }

    /// Runs for the configured duration.
    ///
    /// # Errors
    /// - `SimulationError::TooManyInvariantViolations` - Violation limit reached
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        self.run_for(self.config.simulation.duration_secs)
    }

    /// Aggregates derived from current node and satellite state.
    pub fn statistics(&self) -> NetworkStatistics {
        NetworkStatistics::collect(&self.nodes, &self.satellite, &self.config)
    }

    /// View of the last processed second.
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot::capture(
            self.clock.now(),
            &self.nodes,
            &self.satellite,
            self.config.topology.ground_station_position,
        )
    }

    /// Report of everything processed so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            seed: self.rng.seed(),
            seconds_simulated: self.clock.elapsed_secs(),
            statistics: self.statistics(),
            metrics: self.metrics.clone(),
            success: self.metrics.invariant_violations.is_empty(),
        }
    }

    fn check_invariants(
        &mut self,
        time: u64,
        transmissions: usize,
    ) -> Result<(), SimulationError> {
        let view = NetworkView {
            time,
            nodes: &self.nodes,
            satellite: &self.satellite,
            transmissions_this_step: transmissions,
        };

        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(&view) {
                warn!(%violation, "Invariant violated");
                self.metrics.record_invariant_violation(violation);

                if self.metrics.invariant_violations.len() >= MAX_INVARIANT_VIOLATIONS {
                    return Err(SimulationError::TooManyInvariantViolations {
                        count: self.metrics.invariant_violations.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
