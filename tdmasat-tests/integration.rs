//! Integration tests for tdmasat
//!
//! These tests drive the simulation engine through its public API and check
//! network-wide properties: slot exclusivity, byte accounting, the emergency
//! transmission schedule and configuration loading.

#[path = "style.rs"]
mod style;

#[path = "integration/end_to_end.rs"]
mod end_to_end;
#[path = "integration/tdma_schedule.rs"]
mod tdma_schedule;
#[path = "integration/emergency_policy.rs"]
mod emergency_policy;
#[path = "integration/config_loading.rs"]
mod config_loading;
