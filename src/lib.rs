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

//! Remote command execution across a fleet of test nodes.
//!
//! A [`Fleet`] keeps one reusable session per registered node and runs
//! shell or cluster-control commands on one node ([`Fleet::execute`]) or on
//! many concurrently ([`Fleet::execute_multi`]). Every outcome, including
//! connection loss, is reported as a [`CommandResult`] value; only addressing
//! mistakes surface as errors.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod fleet;
pub mod node;
pub mod output;
pub mod registry;
pub mod session;
pub mod ssh;
pub mod transport;
pub mod utils;

pub use config::Config;
pub use error::{FleetError, Result};
pub use executor::{
    CommandResult, Executor, FanOutDispatcher, FanOutResult, Output, ReachabilityMode, RetryPolicy,
};
pub use fleet::Fleet;
pub use node::{Credential, NodeDescriptor};
pub use output::{Command, CommandKind, OutputClassifier, StructuredMap, StructuredValue};
pub use registry::{NodeRegistry, Reachability, ALL_NODES_ALIAS};
pub use session::SessionManager;
pub use ssh::SshTransport;
pub use transport::{ExecError, RawOutput, Session, Transport};
