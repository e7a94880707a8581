//! Configuration files feeding the driver.

use std::io::Write;

use tdmasat_core::{ConfigError, TdmaConfig, TdmaError};
use tdmasat_sim::{PolicyKind, SimulationDriver};

fn write_config(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_config_drives_simulation() {
    let file = write_config(
        r#"{
            "schedule": { "num_nodes": 3, "slot_duration_secs": 20 },
            "topology": { "emergency_nodes": [2] },
            "simulation": { "seed": 9, "duration_secs": 600 }
        }"#,
    );

    let config = TdmaConfig::from_json_file(file.path()).unwrap();
    let mut driver = SimulationDriver::new(config).unwrap().with_standard_invariants();
    let report = driver.run().unwrap();

    assert_eq!(report.seconds_simulated, 600);
    assert_eq!(report.seed, Some(9));
    assert_eq!(driver.nodes().len(), 3);
    assert_eq!(driver.node(2).unwrap().policy_kind(), PolicyKind::Emergency);
    assert_eq!(driver.node(1).unwrap().slot_window(), 20..40);
    // Scheduled nodes 0 and 1 each sent their t=0 sample
    assert_eq!(driver.node(0).unwrap().transmission_count(), 1);
    assert_eq!(driver.node(1).unwrap().transmission_count(), 1);
}

#[test]
fn test_unknown_emergency_node_rejected() {
    let file = write_config(r#"{ "topology": { "emergency_nodes": [9] } }"#);

    let result = TdmaConfig::from_json_file(file.path());
    assert!(matches!(
        result,
        Err(TdmaError::Config(ConfigError::UnknownEmergencyNode {
            node_id: 9,
            num_nodes: 5
        }))
    ));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("{ not json");

    let error = TdmaConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(error, TdmaError::Parse(_)));
    assert!(error.is_user_error());
}
