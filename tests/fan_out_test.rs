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

//! Fan-out behavior: completeness, attribution, addressing and concurrency.

mod common;

use std::collections::HashSet;

use common::{fleet, registry, Behavior, FakeTransport};
use fleet_exec::{Fleet, FleetError, ReachabilityMode};

#[tokio::test]
async fn test_every_node_gets_one_result() {
    let transport = FakeTransport::new();
    let fleet = fleet(&["s1", "s2", "s3"], &transport);

    let results = fleet.execute_multi(&["s1", "s2", "s3"], "uptime").await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.all_succeeded());
    let nodes: HashSet<&str> = results.iter().filter_map(|r| r.node()).collect();
    assert_eq!(nodes, HashSet::from(["s1", "s2", "s3"]));
}

#[tokio::test]
async fn test_panicking_task_still_yields_a_result() {
    let transport = FakeTransport::new();
    transport.respond("s2", Behavior::Panic);
    let fleet = fleet(&["s1", "s2", "s3"], &transport);

    let results = fleet.execute_multi(&["s1", "s2", "s3"], "uptime").await.unwrap();

    assert_eq!(results.len(), 3);
    let s2 = results.get("s2").unwrap();
    assert!(!s2.flag());
    assert_eq!(s2.cmd(), Some("uptime"));
    assert_eq!(s2.error_code(), Some(-1));
    assert!(s2.error_msg().unwrap()[0].contains("panicked"));
    assert!(results.get("s1").unwrap().flag());
    assert!(results.get("s3").unwrap().flag());
    assert_eq!(results.failed_nodes(), vec!["s2"]);
}

#[tokio::test]
async fn test_mixed_failures_keep_attribution() {
    let transport = FakeTransport::new();
    transport.refuse("s2");
    transport.respond("s3", Behavior::exit(1, "boom\n"));
    transport.respond("s4", Behavior::ChannelDrop);
    let fleet = fleet(&["s1", "s2", "s3", "s4"], &transport);

    let results = fleet.execute_multi(&["all"], "uptime").await.unwrap();

    assert_eq!(results.len(), 4);
    let mut seen = HashSet::new();
    for result in &results {
        let node = result.node().expect("every fan-out result names its node");
        assert!(seen.insert(node.to_string()), "duplicate result for {node}");
    }

    let s2 = results.get("s2").unwrap();
    assert!(s2.is_unreachable());
    assert_eq!(
        serde_json::to_string(s2).unwrap(),
        r#"{"flag":false,"node":"s2"}"#
    );
    assert_eq!(results.get("s3").unwrap().error_code(), Some(1));
    assert_eq!(results.get("s4").unwrap().error_code(), Some(-1));
    assert!(results.get("s1").unwrap().flag());
}

#[tokio::test]
async fn test_aliases_expand_and_deduplicate() {
    let transport = FakeTransport::new();
    let registry = registry(&["s1", "s2", "s3"])
        .with_alias("servers", vec!["s1".to_string(), "s3".to_string()])
        .unwrap();
    let fleet = Fleet::new(registry, transport.clone());

    let results = fleet.execute_multi(&["servers", "s1"], "df -h").await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.get("s1").is_some());
    assert!(results.get("s3").is_some());
    assert!(results.get("s2").is_none());
    assert_eq!(transport.execs("s1"), 1);
}

#[tokio::test]
async fn test_resolution_is_stable() {
    let transport = FakeTransport::new();
    let registry = registry(&["s1", "s2", "s3"])
        .with_alias("servers", vec!["s3".to_string(), "s1".to_string()])
        .unwrap();
    let fleet = Fleet::new(registry, transport.clone());

    let first = fleet.resolve("servers").unwrap();
    fleet.execute_multi(&["servers"], "true").await.unwrap();
    let second = fleet.resolve("servers").unwrap();

    assert_eq!(first, vec!["s3", "s1"]);
    assert_eq!(first, second);
    assert_eq!(fleet.resolve("all").unwrap(), vec!["s1", "s2", "s3"]);
}

#[tokio::test]
async fn test_unknown_target_fails_before_any_io() {
    let transport = FakeTransport::new();
    let fleet = fleet(&["s1", "s2"], &transport);

    let err = fleet
        .execute_multi(&["s1", "nowhere"], "uptime")
        .await
        .unwrap_err();

    assert_eq!(err, FleetError::UnknownNode("nowhere".to_string()));
    assert_eq!(transport.total_connects(), 0);
}

#[tokio::test]
async fn test_fleet_mode_short_circuits_every_node() {
    let transport = FakeTransport::new();
    transport.refuse("s2");
    let fleet = fleet(&["s1", "s2", "s3"], &transport)
        .with_reachability_mode(ReachabilityMode::Fleet);
    assert!(!fleet.establish_fleet(&["all"]).await.unwrap());

    let results = fleet.execute_multi(&["all"], "uptime").await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_unreachable()));
    assert_eq!(transport.execs("s1") + transport.execs("s3"), 0);
    let nodes: HashSet<&str> = results.iter().filter_map(|r| r.node()).collect();
    assert_eq!(nodes, HashSet::from(["s1", "s2", "s3"]));
}

#[tokio::test(start_paused = true)]
async fn test_results_arrive_in_completion_order() {
    let transport = FakeTransport::new();
    transport.respond("slow", Behavior::delayed(50, "slow\n"));
    transport.respond("medium", Behavior::delayed(10, "medium\n"));
    transport.respond("fast", Behavior::ok("fast\n"));
    let fleet = fleet(&["slow", "medium", "fast"], &transport);

    let results = fleet.execute_multi(&["all"], "work").await.unwrap();

    let order: Vec<&str> = results.iter().filter_map(|r| r.node()).collect();
    assert_eq!(order, vec!["fast", "medium", "slow"]);
}

#[tokio::test(start_paused = true)]
async fn test_max_parallel_caps_concurrency() {
    let names = ["n1", "n2", "n3", "n4", "n5"];
    let transport = FakeTransport::new();
    for name in names {
        transport.respond(name, Behavior::delayed(20, "done\n"));
    }
    let fleet = fleet(&names, &transport).with_max_parallel(Some(2));

    let results = fleet.execute_multi(&["all"], "work").await.unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.all_succeeded());
    assert_eq!(transport.peak_running(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_fan_out_runs_all_nodes_at_once() {
    let names = ["n1", "n2", "n3", "n4", "n5"];
    let transport = FakeTransport::new();
    for name in names {
        transport.respond(name, Behavior::delayed(20, "done\n"));
    }
    let fleet = fleet(&names, &transport);

    let results = fleet.execute_multi(&["all"], "work").await.unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(transport.peak_running(), 5);
}

#[tokio::test]
async fn test_fan_out_result_serializes_as_array() {
    let transport = FakeTransport::new();
    let fleet = fleet(&["s1"], &transport);

    let results = fleet.execute_multi(&["s1"], "echo hi").await.unwrap();
    let value = serde_json::to_value(&results).unwrap();

    assert_eq!(
        value,
        serde_json::json!([{
            "flag": true,
            "node": "s1",
            "cmd": "echo hi",
            "error_code": 0,
            "msg": ["ok"]
        }])
    );
}
