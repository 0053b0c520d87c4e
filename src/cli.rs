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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::Command;

#[derive(Parser, Debug)]
#[command(
    name = "fleet-exec",
    version,
    about = "Run shell and cluster-control commands across a fleet of test nodes",
    long_about = "fleet-exec runs commands on the nodes of a storage test fleet over SSH.\nEach node keeps one reusable session. Results are printed as one JSON object per node,\nwith structured control-command output decoded into nested mappings.",
    after_help = "EXAMPLES:\n  Check connectivity:        fleet-exec ping all\n  Run on one node:           fleet-exec exec s1 uptime\n  Run on a group:            fleet-exec exec servers \"df -h\"\n  Control command (decoded): fleet-exec exec s1 gluster --xml volume info\n  Show the inventory:        fleet-exec list"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        env = "FLEET_EXEC_CONFIG",
        help = "Inventory file path\nConfig loading priority:\n  1. This flag's value\n  2. Current directory (./fleet.yaml)\n  3. User config ($XDG_CONFIG_HOME/fleet-exec/config.yaml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)\n-vv also logs every command result"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Execute a command on nodes",
        long_about = "Executes the command on every target node simultaneously.\nEach node's result is printed as one JSON line in completion order.\n\nExit codes: 0 (all succeed), 1 (any failures)",
        after_help = "Examples:\n  fleet-exec exec s1 \"ls /mnt\"\n  fleet-exec exec s1,s2 uptime\n  fleet-exec exec --structured all my-ctl status"
    )]
    Exec {
        #[arg(help = "Comma-separated node names or aliases ('all' for every node)")]
        targets: String,

        #[arg(
            long,
            conflicts_with = "plain",
            help = "Treat the output as a structured payload regardless of the command name"
        )]
        structured: bool,

        #[arg(long, help = "Treat the output as plain lines regardless of the command name")]
        plain: bool,

        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            required = true,
            help = "Command to execute; sent to the remote shell verbatim"
        )]
        command: Vec<String>,
    },

    #[command(
        about = "Test connectivity to nodes",
        long_about = "Opens a session to every target node and reports which ones connected.\n\nExit codes: 0 (all reachable), 1 (any unreachable)"
    )]
    Ping {
        #[arg(default_value = "all", help = "Comma-separated node names or aliases")]
        targets: String,
    },

    #[command(about = "List configured nodes and aliases")]
    List,
}

/// Split a `a,b,c` target list, dropping empty entries.
pub fn split_targets(targets: &str) -> Vec<String> {
    targets
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl Commands {
    /// Build the command value for `exec`, honoring `--structured`/`--plain`.
    pub fn exec_command(words: &[String], structured: bool, plain: bool) -> Command {
        let text = words.join(" ");
        if structured {
            Command::structured(text)
        } else if plain {
            Command::plain(text)
        } else {
            Command::new(text)
        }
    }
}
