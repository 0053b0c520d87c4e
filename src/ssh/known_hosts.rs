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

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, add new ones automatically (TOFU)
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(format!(
                "invalid host key checking mode '{other}' (expected yes, no or accept-new)"
            )),
        }
    }
}

/// Decide whether a server key is acceptable for `host:port`.
pub(super) fn verify_server_key(
    mode: StrictHostKeyChecking,
    host: &str,
    port: u16,
    server_public_key: &russh::keys::PublicKey,
) -> bool {
    match mode {
        StrictHostKeyChecking::No => true,
        StrictHostKeyChecking::Yes => {
            match russh::keys::check_known_hosts(host, port, server_public_key) {
                Ok(known) => {
                    if !known {
                        tracing::warn!("Host key for {}:{} is not in known_hosts", host, port);
                    }
                    known
                }
                Err(e) => {
                    tracing::warn!("Host key verification failed for {}:{}: {}", host, port, e);
                    false
                }
            }
        }
        StrictHostKeyChecking::AcceptNew => {
            match russh::keys::check_known_hosts(host, port, server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) =
                        russh::keys::known_hosts::learn_known_hosts(host, port, server_public_key)
                    {
                        tracing::debug!("Could not record host key for {}:{}: {}", host, port, e);
                    } else {
                        tracing::info!("Added host key for {}:{} to known_hosts", host, port);
                    }
                    true
                }
                // A changed key is rejected even in accept-new mode
                Err(e) => {
                    tracing::warn!("Host key verification failed for {}:{}: {}", host, port, e);
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("yes".parse(), Ok(StrictHostKeyChecking::Yes));
        assert_eq!("NO".parse(), Ok(StrictHostKeyChecking::No));
        assert_eq!("tofu".parse(), Ok(StrictHostKeyChecking::AcceptNew));
        assert!("sometimes".parse::<StrictHostKeyChecking>().is_err());
    }

    #[test]
    fn test_default_mode() {
        assert_eq!(
            StrictHostKeyChecking::default(),
            StrictHostKeyChecking::AcceptNew
        );
    }

    #[test]
    fn test_no_mode_accepts_any_key() {
        let key = russh::keys::PublicKey::from_openssh(
            "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBht3wqOSPqnxMnbr90LSSYbNKxy8NuNHaw5NUBx3Q76",
        )
        .unwrap();
        assert!(verify_server_key(
            StrictHostKeyChecking::No,
            "node.invalid",
            22,
            &key
        ));
    }
}
