//! Run metrics and the end-of-run report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::invariants::InvariantViolation;
use crate::stats::NetworkStatistics;

/// Things that happen to a node during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// Node took a measurement
    Collected,
    /// Satellite relayed a buffered sample
    SampleRelayed,
    /// Satellite relayed an emergency burst report
    BurstRelayed,
}

impl StepEvent {
    /// Returns string representation of event type for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepEvent::Collected => "Collected",
            StepEvent::SampleRelayed => "SampleRelayed",
            StepEvent::BurstRelayed => "BurstRelayed",
        }
    }
}

/// Metrics collected while stepping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Seconds processed
    pub steps_processed: u64,
    /// Events by type
    pub events_by_type: BTreeMap<String, u64>,
    /// Largest single-node buffer seen after any step
    pub peak_buffer_occupancy: usize,
    /// Invariant violations detected
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationMetrics {
    /// Creates new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    pub fn record_event(&mut self, event: StepEvent) {
        *self
            .events_by_type
            .entry(event.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Count of one event type.
    pub fn event_count(&self, event: StepEvent) -> u64 {
        self.events_by_type
            .get(event.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Records a completed step.
    pub fn record_step(&mut self, largest_buffer: usize) {
        self.steps_processed += 1;
        self.peak_buffer_occupancy = self.peak_buffer_occupancy.max(largest_buffer);
    }

    /// Records an invariant violation.
    pub fn record_invariant_violation(&mut self, violation: InvariantViolation) {
        self.invariant_violations.push(violation);
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed used for reproduction, if the source had one
    pub seed: Option<u64>,
    /// Seconds processed
    pub seconds_simulated: u64,
    pub statistics: NetworkStatistics,
    pub metrics: SimulationMetrics,
    /// Whether no invariant was violated
    pub success: bool,
}

impl SimulationReport {
    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        match self.seed {
            Some(seed) => summary.push_str(&format!("Simulation Report (seed: {seed})\n")),
            None => summary.push_str("Simulation Report (injected random source)\n"),
        }
        summary.push_str(&format!("Simulated seconds: {}\n", self.seconds_simulated));
        summary.push_str(&format!("Success: {}\n", self.success));
        summary.push_str(&format!(
            "Peak buffer occupancy: {}\n",
            self.metrics.peak_buffer_occupancy
        ));

        summary.push_str("\nEvent breakdown:\n");
        for (event_type, count) in &self.metrics.events_by_type {
            summary.push_str(&format!("  {event_type}: {count}\n"));
        }

        if !self.metrics.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.metrics.invariant_violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary.push_str("\nNetwork statistics:\n");
        summary.push_str(&self.statistics.summary());
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_event_recording() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_event(StepEvent::Collected);
        metrics.record_event(StepEvent::Collected);
        metrics.record_event(StepEvent::BurstRelayed);

        assert_eq!(metrics.event_count(StepEvent::Collected), 2);
        assert_eq!(metrics.event_count(StepEvent::BurstRelayed), 1);
        assert_eq!(metrics.event_count(StepEvent::SampleRelayed), 0);
    }

    #[test]
    fn test_peak_buffer_tracking() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_step(3);
        metrics.record_step(7);
        metrics.record_step(2);

        assert_eq!(metrics.steps_processed, 3);
        assert_eq!(metrics.peak_buffer_occupancy, 7);
    }
}
