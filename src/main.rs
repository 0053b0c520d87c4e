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

use anyhow::{Context, Result};
use clap::Parser;

use fleet_exec::{
    cli::{split_targets, Cli, Commands},
    commands::{exec::execute_command, list::list_nodes, ping::ping_nodes},
    config::Config,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_with_priority(cli.config.as_deref()).await?;
    let fleet = config
        .build_fleet()
        .context("Invalid fleet configuration")?;

    let succeeded = match cli.command {
        Commands::Exec {
            targets,
            structured,
            plain,
            command,
        } => {
            let targets = split_targets(&targets);
            if targets.is_empty() {
                anyhow::bail!("No target nodes given. Use 'fleet-exec list' to see configured nodes.");
            }
            let command = Commands::exec_command(&command, structured, plain);
            let succeeded = execute_command(&fleet, &targets, command).await;
            fleet.disconnect_all().await;
            succeeded?
        }
        Commands::Ping { targets } => {
            let succeeded = ping_nodes(&fleet, &split_targets(&targets)).await;
            fleet.disconnect_all().await;
            succeeded?
        }
        Commands::List => {
            list_nodes(fleet.registry());
            true
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
