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

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::fleet::Fleet;
use crate::registry::Reachability;

/// Open a session to every target and print per-node reachability.
pub async fn ping_nodes(fleet: &Fleet, targets: &[String]) -> Result<bool> {
    let nodes = fleet.registry().resolve_all(targets)?;
    let all_connected = fleet.establish_fleet(&nodes).await?;

    println!("\n{} {}\n", "▶".cyan(), "Connection Test Results".bold());

    for node in &nodes {
        let descriptor = fleet.registry().descriptor(node)?;
        match fleet.reachability(node)? {
            Reachability::Reachable => println!(
                "  {} {} ({}) - {}",
                "●".green(),
                node.bold(),
                descriptor.address().dimmed(),
                "Connected".green()
            ),
            state => println!(
                "  {} {} ({}) - {}",
                "●".red(),
                node.bold(),
                descriptor.address().dimmed(),
                format!("{state:?}").red()
            ),
        }
    }

    let connected = nodes
        .iter()
        .filter(|n| matches!(fleet.reachability(n), Ok(Reachability::Reachable)))
        .count();
    println!(
        "\n  {} connected, {} failed\n",
        connected.to_string().green(),
        (nodes.len() - connected).to_string().red()
    );

    Ok(all_connected)
}
