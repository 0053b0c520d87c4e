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

//! Result types returned by the executors.

use serde::Serialize;

use crate::output::{StructuredMap, StructuredValue};

/// Decoded stdout of a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Lines(Vec<String>),
    Structured(StructuredMap),
}

impl Output {
    pub fn lines(&self) -> Option<&[String]> {
        match self {
            Self::Lines(lines) => Some(lines),
            Self::Structured(_) => None,
        }
    }

    pub fn structured(&self) -> Option<&StructuredMap> {
        match self {
            Self::Structured(map) => Some(map),
            Self::Lines(_) => None,
        }
    }

    /// Look up a top-level key of a structured payload.
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.structured().and_then(|map| map.get(key))
    }
}

/// Outcome of one command on one node.
///
/// Exactly one of `msg` (on success) and `error_msg` (on failure) is set,
/// except for the unreachable short-circuit, which carries only `flag`.
/// Serializes to `{flag, node, cmd, error_code, msg | error_msg}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cmd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<Output>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_msg: Option<Vec<String>>,
}

impl CommandResult {
    /// Remote command exited with status 0.
    pub fn success(node: &str, cmd: &str, output: Output) -> Self {
        Self {
            flag: true,
            node: Some(node.to_string()),
            cmd: Some(cmd.to_string()),
            error_code: Some(0),
            msg: Some(output),
            error_msg: None,
        }
    }

    /// Remote command ran but failed, or its output could not be used.
    pub fn failure(node: &str, cmd: &str, error_code: i32, error_msg: Vec<String>) -> Self {
        Self {
            flag: false,
            node: Some(node.to_string()),
            cmd: Some(cmd.to_string()),
            error_code: Some(error_code),
            msg: None,
            error_msg: Some(error_msg),
        }
    }

    /// No session could be obtained; nothing ran.
    pub fn unreachable() -> Self {
        Self {
            flag: false,
            node: None,
            cmd: None,
            error_code: None,
            msg: None,
            error_msg: None,
        }
    }

    /// Fill in the node name if the result does not carry one yet.
    pub(crate) fn attributed_to(mut self, node: &str) -> Self {
        if self.node.is_none() {
            self.node = Some(node.to_string());
        }
        self
    }

    pub fn flag(&self) -> bool {
        self.flag
    }

    pub fn is_success(&self) -> bool {
        self.flag
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn cmd(&self) -> Option<&str> {
        self.cmd.as_deref()
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    pub fn msg(&self) -> Option<&Output> {
        self.msg.as_ref()
    }

    pub fn error_msg(&self) -> Option<&[String]> {
        self.error_msg.as_deref()
    }

    /// True for the short-circuit result produced when no session existed.
    pub fn is_unreachable(&self) -> bool {
        !self.flag && self.cmd.is_none()
    }

    /// Exit code for process-level reporting; 1 when nothing ran.
    pub fn exit_code(&self) -> i32 {
        match self.error_code {
            Some(code) => code,
            None => 1,
        }
    }
}

/// Per-node results of a fan-out, in completion order.
///
/// Holds exactly one entry per addressed node. Look results up by node
/// name; position carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FanOutResult {
    results: Vec<CommandResult>,
}

impl FanOutResult {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, result: CommandResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, node: &str) -> Option<&CommandResult> {
        self.results.iter().find(|r| r.node() == Some(node))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandResult> {
        self.results.iter()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(CommandResult::is_success)
    }

    /// Nodes whose command did not succeed, sorted by name.
    pub fn failed_nodes(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self
            .results
            .iter()
            .filter(|r| !r.is_success())
            .filter_map(CommandResult::node)
            .collect();
        failed.sort_unstable();
        failed
    }
}

impl IntoIterator for FanOutResult {
    type Item = CommandResult;
    type IntoIter = std::vec::IntoIter<CommandResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a FanOutResult {
    type Item = &'a CommandResult;
    type IntoIter = std::slice::Iter<'a, CommandResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let result =
            CommandResult::success("s1", "echo hi", Output::Lines(vec!["hi".to_string()]));
        assert!(result.flag());
        assert_eq!(result.error_code(), Some(0));
        assert!(result.error_msg().is_none());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"flag": true, "node": "s1", "cmd": "echo hi", "error_code": 0, "msg": ["hi"]})
        );
    }

    #[test]
    fn test_failure_shape() {
        let result = CommandResult::failure("s2", "false", 1, vec!["boom".to_string()]);
        assert!(!result.flag());
        assert!(result.msg().is_none());
        assert_eq!(result.exit_code(), 1);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"flag": false, "node": "s2", "cmd": "false", "error_code": 1, "error_msg": ["boom"]})
        );
    }

    #[test]
    fn test_unreachable_shape() {
        let result = CommandResult::unreachable();
        assert!(result.is_unreachable());
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"flag": false}));

        let attributed = result.attributed_to("s3");
        assert_eq!(attributed.node(), Some("s3"));
        assert!(attributed.is_unreachable());
    }

    #[test]
    fn test_attribution_keeps_existing_node() {
        let result = CommandResult::failure("s1", "x", 2, vec![]).attributed_to("s9");
        assert_eq!(result.node(), Some("s1"));
    }

    #[test]
    fn test_fan_out_lookup() {
        let mut fan_out = FanOutResult::with_capacity(2);
        fan_out.push(CommandResult::failure("s2", "uptime", 255, vec![]));
        fan_out.push(CommandResult::success("s1", "uptime", Output::Lines(vec![])));

        assert_eq!(fan_out.len(), 2);
        assert!(fan_out.get("s1").unwrap().flag());
        assert!(!fan_out.get("s2").unwrap().flag());
        assert!(fan_out.get("s3").is_none());
        assert!(!fan_out.all_succeeded());
        assert_eq!(fan_out.failed_nodes(), vec!["s2"]);
    }
}
