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

//! SSH authentication for node credentials.
//!
//! Supported methods:
//! - Password authentication
//! - Private key file, optionally encrypted
//! - SSH agent (Unix only)

use russh::client::{Handle, Handler};
use std::sync::Arc;

use super::Error;
use crate::node::Credential;

/// Authenticate `username` on an established handle using `credential`.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    credential: &Credential,
) -> Result<(), Error> {
    match credential {
        Credential::Password(password) => {
            let auth_result = handle
                .authenticate_password(username, password.as_str())
                .await?;
            if !auth_result.success() {
                return Err(Error::PasswordWrong);
            }
        }
        Credential::KeyFile { path, passphrase } => {
            let private_key = russh::keys::load_secret_key(path, passphrase.as_ref().map(|p| p.as_str()))
                .map_err(Error::KeyInvalid)?;
            let auth_result = handle
                .authenticate_publickey(
                    username,
                    russh::keys::PrivateKeyWithHashAlg::new(
                        Arc::new(private_key),
                        handle.best_supported_rsa_hash().await?.flatten(),
                    ),
                )
                .await?;
            if !auth_result.success() {
                return Err(Error::KeyAuthFailed);
            }
        }
        Credential::Agent => authenticate_with_agent(handle, username).await?,
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn authenticate_with_agent<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
) -> Result<(), Error> {
    let mut agent = russh::keys::agent::client::AgentClient::connect_env()
        .await
        .map_err(|_| Error::AgentConnectionFailed)?;

    let identities = agent
        .request_identities()
        .await
        .map_err(|_| Error::AgentRequestIdentitiesFailed)?;

    if identities.is_empty() {
        return Err(Error::AgentNoIdentities);
    }

    for identity in identities {
        let result = handle
            .authenticate_publickey_with(
                username,
                identity.clone(),
                handle.best_supported_rsa_hash().await?.flatten(),
                &mut agent,
            )
            .await;

        if let Ok(auth_result) = result {
            if auth_result.success() {
                return Ok(());
            }
        }
    }

    Err(Error::AgentAuthenticationFailed)
}

#[cfg(target_os = "windows")]
async fn authenticate_with_agent<H: Handler>(
    _handle: &mut Handle<H>,
    _username: &str,
) -> Result<(), Error> {
    Err(Error::AgentUnsupported)
}
