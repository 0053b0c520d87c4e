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

//! Reconnect policy for the single-node executor.

use std::time::Duration;

/// How many times a command may try to obtain a working session.
///
/// The default is two attempts with no pause: the initial try plus one
/// inline reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Option<Duration>,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Option<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: backoff.filter(|d| !d.is_zero()),
        }
    }

    /// Single attempt, never reconnect.
    pub fn none() -> Self {
        Self::new(1, None)
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff).filter(|d| !d.is_zero());
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Option<Duration> {
        self.backoff
    }

    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Sleep before the next attempt, if a backoff is configured.
    pub(crate) async fn pause(&self) {
        if let Some(backoff) = self.backoff {
            tokio::time::sleep(backoff).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, None)
    }
}
