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

//! Command execution on one node or fanned out across many.

mod fanout;
mod result;
mod retry;
mod single;

pub use fanout::FanOutDispatcher;
pub use result::{CommandResult, FanOutResult, Output};
pub use retry::RetryPolicy;
pub use single::{Executor, ReachabilityMode};
