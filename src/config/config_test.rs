use serial_test::serial;
use temp_env::with_vars;

use super::*;
use crate::net::ConnectPoint;
use crate::net::DeviceId;
use crate::net::LinkKey;
use crate::net::PortNumber;

fn cleanup_all_topo_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("TOPO__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = NodeConfig::default();

    assert_eq!(config.cluster.node_id, "node-1");
    assert_eq!(config.dispatch.watchdog_interval_ms, 250);
    assert_eq!(config.dispatch.max_process_ms, 5000);
    assert_eq!(config.dispatch.queue_capacity, 0);
    assert_eq!(config.topology.event_history_size, 100);
    assert!(config.ecmap.tombstones_enabled);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_topo_env_vars();
    with_vars(vec![("TOPO__DISPATCH__MAX_PROCESS_MS", Some("0"))], || {
        let config = NodeConfig::new().unwrap();

        assert_eq!(config.dispatch.max_process_ms, 0);
        assert!(config.dispatch.max_process_time().is_none());
    });
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_topo_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("override.toml");

    std::fs::write(
        &config_path,
        r#"
        [dispatch]
        watchdog_interval_ms = 100

        [topology]
        max_paths = 4
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = NodeConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .expect("override should load");

        assert_eq!(config.dispatch.watchdog_interval_ms, 100);
        assert_eq!(config.topology.max_paths, 4);
        // Untouched sections keep their defaults
        assert_eq!(config.dispatch.max_process_ms, 5000);
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_topo_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("node.toml");
    std::fs::write(
        &config_path,
        r#"
        [cluster]
        node_id = "node-a"
        members = [
            { id = "node-a", ip = "10.0.0.1", port = 9876 },
            { id = "node-b", ip = "10.0.0.2", port = 9876 },
        ]
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("TOPO__CLUSTER__NODE_ID", Some("node-b")),
        ],
        || {
            let config = NodeConfig::new().unwrap().validate().unwrap();

            assert_eq!(config.cluster.node_id, "node-b");
            assert_eq!(config.cluster.members.len(), 2);
        },
    );
}

#[test]
fn validation_should_reject_unknown_local_node() {
    let mut config = NodeConfig::default();
    config.cluster.node_id = "node-9".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_duplicate_members() {
    let mut config = NodeConfig::default();
    let dup = config.cluster.members[0].clone();
    config.cluster.members.push(dup);

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_zero_watchdog_interval() {
    let mut config = NodeConfig::default();
    config.dispatch.watchdog_interval_ms = 0;

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_zero_periods() {
    let mut config = NodeConfig::default();
    config.ecmap.anti_entropy_period_ms = 0;
    assert!(config.validate().is_err());

    let mut config = NodeConfig::default();
    config.topology.event_history_size = 0;
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn static_network_should_load_from_file() {
    cleanup_all_topo_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("network.toml");

    std::fs::write(
        &config_path,
        r#"
        [topology.static_network]
        devices = ["of:1", "of:2"]
        links = [
            { src = { device_id = "of:1", port = 2 }, dst = { device_id = "of:2", port = 1 } },
        ]
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let config = NodeConfig::new()
            .expect("success")
            .with_override_config(config_path.to_str().unwrap())
            .expect("override should load")
            .validate()
            .expect("valid");

        let network = &config.topology.static_network;
        assert_eq!(network.devices, vec![DeviceId::new("of:1"), DeviceId::new("of:2")]);
        assert_eq!(network.links.len(), 1);
        assert_eq!(network.links[0].dst.port(), PortNumber::new(1));
    });
}

#[test]
fn validation_should_reject_static_link_to_unknown_device() {
    let mut config = NodeConfig::default();
    config.topology.static_network = StaticNetwork {
        devices: vec![DeviceId::new("of:1")],
        links: vec![LinkKey {
            src: ConnectPoint::new(DeviceId::new("of:1"), PortNumber::new(1)),
            dst: ConnectPoint::new(DeviceId::new("of:9"), PortNumber::new(1)),
        }],
    };

    assert!(config.validate().is_err());
}
