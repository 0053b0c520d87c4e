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
use owo_colors::OwoColorize;

use crate::executor::CommandResult;
use crate::fleet::Fleet;
use crate::output::Command;

/// Run `command` on `targets` and print one JSON line per node.
///
/// Returns true iff every result has `flag == true`.
pub async fn execute_command(fleet: &Fleet, targets: &[String], command: Command) -> Result<bool> {
    let results = match targets {
        // A single concrete node goes through the one-node path
        [target] if fleet.registry().descriptor(target).is_ok() => {
            vec![fleet.execute(target, command).await?]
        }
        _ => fleet
            .execute_multi(targets, command)
            .await?
            .into_iter()
            .collect(),
    };

    for result in &results {
        let line = serde_json::to_string(result).context("Failed to serialize command result")?;
        println!("{line}");
    }

    print_summary(&results);
    Ok(results.iter().all(CommandResult::flag))
}

fn print_summary(results: &[CommandResult]) {
    let failed: Vec<&str> = results
        .iter()
        .filter(|r| !r.flag())
        .map(|r| r.node().unwrap_or("?"))
        .collect();

    if failed.is_empty() {
        eprintln!(
            "{} {} of {} succeeded",
            "●".green(),
            results.len(),
            results.len()
        );
    } else {
        eprintln!(
            "{} {} of {} failed: {}",
            "●".red(),
            failed.len(),
            results.len(),
            failed.join(", ").bold()
        );
    }
}
