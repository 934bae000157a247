// Copyright 2025 the Arbor Authors
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

//! Engine construction parameters.
//!
//! There is no global configuration lookup: the embedder builds a
//! [`CoreConfiguration`] and hands it to the engine at construction, and
//! subsystems receive the values they need from there.

use std::time::Duration;

/// Parameters fixed at engine construction.
#[derive(Debug, Clone)]
pub struct CoreConfiguration {
    /// How many frames the logic thread may run ahead of the update thread
    /// before its next flush blocks on the frame gate.
    pub maximum_update_lag_frames: u32,
    /// Target interval between update frames while content is animating.
    pub frame_interval: Duration,
    /// Initial capacity of the logic-to-update message buffer. The buffer
    /// grows past this on demand and the capacity is retained across frames.
    pub initial_message_capacity: usize,
}

impl CoreConfiguration {
    /// 60 Hz frame interval.
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_nanos(16_666_667);
}

impl Default for CoreConfiguration {
    fn default() -> Self {
        Self {
            maximum_update_lag_frames: 1,
            frame_interval: Self::DEFAULT_FRAME_INTERVAL,
            initial_message_capacity: 64,
        }
    }
}
