// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{Config, NodeConfig};
use super::utils::{expand_env_vars, expand_tilde};
use crate::error::FleetError;
use crate::executor::ReachabilityMode;
use crate::node::Credential;
use crate::output::{Command, CommandKind};
use crate::ssh::StrictHostKeyChecking;

const SAMPLE: &str = r#"
defaults:
  user: root
  port: 22
  password: secret
  strict_host_key_checking: "no"
  connect_timeout: 10

nodes:
  - s1.example.com
  - admin@s3.example.com:2200
  - name: s2
    host: 10.0.0.2
    port: 2222
    user: admin
    ssh_key: /keys/s2

groups:
  servers: [s1.example.com, s2]

structured_commands: [gluster, ctdb]

execution:
  reachability: fleet
  max_attempts: 3
  retry_backoff_ms: 250
  max_parallel: 4
"#;

#[test]
fn test_expand_env_vars() {
    std::env::set_var("FLEET_TEST_VAR", "test_value");
    std::env::set_var("FLEET_TEST_USER", "testuser");

    assert_eq!(
        expand_env_vars("Hello ${FLEET_TEST_VAR}!"),
        "Hello test_value!"
    );
    assert_eq!(expand_env_vars("$FLEET_TEST_USER@host"), "testuser@host");
    assert_eq!(
        expand_env_vars("${FLEET_TEST_USER}:$FLEET_TEST_VAR"),
        "testuser:test_value"
    );

    // Unset variables stay as written
    assert_eq!(
        expand_env_vars("${FLEET_TEST_MISSING}"),
        "${FLEET_TEST_MISSING}"
    );
    assert_eq!(expand_env_vars("$FLEET_TEST_MISSING"), "$FLEET_TEST_MISSING");

    assert_eq!(expand_env_vars("pa$$word$"), "pa$$word$");
    assert_eq!(expand_env_vars("${not a var}"), "${not a var}");
    assert_eq!(expand_env_vars("no variables here"), "no variables here");
}

#[test]
fn test_expand_tilde() {
    let expanded = expand_tilde(Path::new("~/.ssh/id_ed25519"));
    if let Some(dirs) = directories::BaseDirs::new() {
        assert_eq!(expanded, dirs.home_dir().join(".ssh/id_ed25519"));
    }

    assert_eq!(
        expand_tilde(Path::new("/etc/fleet.yaml")),
        PathBuf::from("/etc/fleet.yaml")
    );
    assert_eq!(
        expand_tilde(Path::new("~other/file")),
        PathBuf::from("~other/file")
    );
}

#[test]
fn test_config_parsing() {
    let config = Config::from_yaml(SAMPLE).unwrap();

    assert_eq!(config.defaults.user.as_deref(), Some("root"));
    assert_eq!(
        config.defaults.strict_host_key_checking,
        Some(StrictHostKeyChecking::No)
    );
    assert_eq!(config.nodes.len(), 3);
    assert!(matches!(&config.nodes[0], NodeConfig::Simple(s) if s == "s1.example.com"));
    assert_eq!(config.nodes[2].name(), "s2");
    assert_eq!(config.groups["servers"], vec!["s1.example.com", "s2"]);
    assert_eq!(config.execution.reachability, ReachabilityMode::Fleet);
    assert_eq!(config.execution.max_parallel, Some(4));
}

#[test]
fn test_empty_config_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert!(config.nodes.is_empty());
    assert_eq!(config.execution.max_attempts, 2);
    assert_eq!(config.reachability_mode(), ReachabilityMode::PerNode);
    assert_eq!(config.max_parallel(), None);
    assert_eq!(config.retry_policy().max_attempts(), 2);
    assert_eq!(config.retry_policy().backoff(), None);

    let classifier = config.classifier();
    assert_eq!(
        classifier.command_kind(&Command::new("gluster volume info")),
        CommandKind::StructuredControl
    );
}

#[test]
fn test_node_descriptors() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    let nodes = config.node_descriptors().unwrap();

    assert_eq!(nodes[0].name, "s1.example.com");
    assert_eq!(nodes[0].host, "s1.example.com");
    assert_eq!(nodes[0].port, 22);
    assert_eq!(nodes[0].username, "root");
    assert_eq!(nodes[0].credential, Credential::password("secret"));

    assert_eq!(nodes[1].name, "admin@s3.example.com:2200");
    assert_eq!(nodes[1].host, "s3.example.com");
    assert_eq!(nodes[1].port, 2200);
    assert_eq!(nodes[1].username, "admin");

    assert_eq!(nodes[2].name, "s2");
    assert_eq!(nodes[2].host, "10.0.0.2");
    assert_eq!(nodes[2].port, 2222);
    assert_eq!(nodes[2].credential, Credential::key_file("/keys/s2", None));
}

#[test]
fn test_node_password_from_env() {
    std::env::set_var("FLEET_TEST_S9_PASSWORD", "from-env");
    let yaml = r#"
nodes:
  - name: s9
    host: 10.0.0.9
    user: root
    password: "${FLEET_TEST_S9_PASSWORD}"
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let nodes = config.node_descriptors().unwrap();
    assert_eq!(nodes[0].credential, Credential::password("from-env"));
}

#[test]
fn test_key_passphrase_from_env() {
    std::env::set_var("FLEET_TEST_KEY_PASS", "hunter2");
    let yaml = r#"
defaults:
  ssh_key: /keys/default
  ssh_key_passphrase: plain
nodes:
  - d1
  - name: k1
    host: 10.0.0.7
    ssh_key: /keys/k1
    ssh_key_passphrase: "${FLEET_TEST_KEY_PASS}"
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let nodes = config.node_descriptors().unwrap();
    assert_eq!(
        nodes[0].credential,
        Credential::key_file("/keys/default", Some("plain"))
    );
    assert_eq!(
        nodes[1].credential,
        Credential::key_file("/keys/k1", Some("hunter2"))
    );
}

#[test]
fn test_agent_is_the_fallback_credential() {
    let yaml = r#"
nodes:
  - name: a1
    host: 10.0.0.1
    user: root
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(
        config.node_descriptors().unwrap()[0].credential,
        Credential::Agent
    );
}

#[test]
fn test_registry_with_groups() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    let registry = config.registry().unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(
        registry.resolve("servers").unwrap(),
        vec!["s1.example.com".to_string(), "s2".to_string()]
    );
    assert_eq!(registry.resolve("all").unwrap().len(), 3);
}

#[test]
fn test_group_with_unknown_member_is_rejected() {
    let yaml = r#"
nodes: [s1]
groups:
  servers: [s1, ghost]
"#;
    let err = Config::from_yaml(yaml).unwrap().registry().unwrap_err();
    assert!(matches!(err, FleetError::Config(msg) if msg.contains("ghost")));
}

#[test]
fn test_duplicate_node_is_rejected() {
    let yaml = r#"
nodes:
  - s1
  - name: s1
    host: 10.0.0.1
"#;
    let err = Config::from_yaml(yaml).unwrap().registry().unwrap_err();
    assert!(matches!(err, FleetError::Config(_)));
}

#[test]
fn test_execution_settings() {
    let config = Config::from_yaml(SAMPLE).unwrap();

    let retry = config.retry_policy();
    assert_eq!(retry.max_attempts(), 3);
    assert_eq!(retry.backoff(), Some(Duration::from_millis(250)));
    assert_eq!(config.max_parallel(), Some(4));

    let transport = config.transport();
    assert_eq!(transport.strict_mode(), StrictHostKeyChecking::No);
    assert_eq!(transport.connect_timeout(), Some(Duration::from_secs(10)));

    let classifier = config.classifier();
    assert_eq!(
        classifier.command_kind(&Command::new("ctdb status")),
        CommandKind::StructuredControl
    );
}

#[test]
fn test_build_fleet() {
    let config = Config::from_yaml(SAMPLE).unwrap();
    let fleet = config.build_fleet().unwrap();
    assert_eq!(fleet.registry().len(), 3);
    assert!(fleet.fleet_reachable());
}

#[tokio::test]
async fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.yaml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = Config::load(&path).await.unwrap();
    assert_eq!(config.nodes.len(), 3);

    let explicit = Config::load_with_priority(Some(&path)).await.unwrap();
    assert_eq!(explicit.nodes.len(), 3);
}

#[tokio::test]
async fn test_load_missing_or_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(&dir.path().join("absent.yaml")).await.is_err());

    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "nodes: [unterminated").unwrap();
    assert!(Config::load(&path).await.is_err());
}
