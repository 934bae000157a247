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

//! Minimal GPU fence contract.
//!
//! A sync object is armed at a point in the render thread's command stream
//! and becomes signaled once the GPU has executed past that point. Polling
//! never blocks; an unsignaled fence is simply re-polled next frame.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A fence armed in the GPU command stream.
pub trait SyncObject: Send + Sync + fmt::Debug {
    /// Whether the GPU has executed past the fence. Non-blocking.
    fn is_signaled(&self) -> bool;
}

/// A manually signaled fence for tests and the null backend.
///
/// Clones share the signaled state, so a test can keep one handle and give
/// another to a tracker.
#[derive(Debug, Clone, Default)]
pub struct ManualSyncObject {
    signaled: Arc<AtomicBool>,
}

impl ManualSyncObject {
    /// Creates an unsignaled fence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fence that is already signaled.
    pub fn signaled() -> Self {
        let fence = Self::new();
        fence.signal();
        fence
    }

    /// Marks the fence as passed.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }
}

impl SyncObject for ManualSyncObject {
    fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unsignaled() {
        let fence = ManualSyncObject::new();
        assert!(!fence.is_signaled());
    }

    #[test]
    fn signal_is_visible_through_clones() {
        let fence = ManualSyncObject::new();
        let observer = fence.clone();
        fence.signal();
        assert!(observer.is_signaled());
    }
}
