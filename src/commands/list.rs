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

use owo_colors::OwoColorize;

use crate::registry::{NodeRegistry, ALL_NODES_ALIAS};

pub fn list_nodes(registry: &NodeRegistry) {
    if registry.is_empty() {
        println!("{}", "No nodes configured".dimmed());
        return;
    }

    println!("\n{} {}\n", "▶".cyan(), "Nodes".bold());
    for name in registry.node_names() {
        if let Ok(descriptor) = registry.descriptor(name) {
            println!(
                "  {} {} {}",
                "●".blue(),
                name.bold(),
                format!("{}@{}", descriptor.username, descriptor.address()).dimmed()
            );
        }
    }

    println!("\n{} {}\n", "▶".cyan(), "Aliases".bold());
    println!(
        "  {} {} ({} nodes)",
        "●".blue(),
        ALL_NODES_ALIAS.bold(),
        registry.len().to_string().yellow()
    );
    for (alias, members) in registry.aliases() {
        println!(
            "  {} {} ({} {})",
            "●".blue(),
            alias.bold(),
            members.len().to_string().yellow(),
            if members.len() == 1 { "node" } else { "nodes" }
        );
        for member in members {
            println!("    {} {}", "•".dimmed(), member.dimmed());
        }
    }
    println!();
}
