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

//! Fence-based frame completion tracking.
//!
//! A tracker is created on the update thread, shipped with the frame
//! submission, armed by the render consumer at the end of the frame's
//! command stream, and polled on both sides: the render thread moves fence
//! state into the tracker's flag, the update thread consumes the flag with
//! an atomic read-and-clear. Neither side ever blocks on the other.

use arbor_core::graphics::SyncObject;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Non-blocking completion flag for one frame's GPU work.
#[derive(Debug, Default)]
pub struct RenderTracker {
    /// Fence armed in the command stream; render thread only. The mutex is
    /// uncontended (the update thread never touches the fence).
    fence: Mutex<Option<Box<dyn SyncObject>>>,
    synced: AtomicBool,
}

impl RenderTracker {
    /// Creates an unarmed tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the tracker with a fence created at the current point of the
    /// render thread's command stream.
    pub fn arm(&self, fence: Box<dyn SyncObject>) {
        let mut slot = self.fence.lock().expect("render tracker poisoned");
        debug_assert!(slot.is_none(), "tracker armed twice");
        *slot = Some(fence);
    }

    /// Render-thread poll: if the fence has signaled, latches the synced
    /// flag and releases the fence. Returns whether the tracker is still
    /// pending (armed and unsignaled).
    pub fn poll(&self) -> bool {
        let mut slot = self.fence.lock().expect("render tracker poisoned");
        match slot.as_ref() {
            Some(fence) if fence.is_signaled() => {
                *slot = None;
                self.synced.store(true, Ordering::Release);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Update-thread read-and-clear: whether the frame's GPU work was
    /// observed complete since the last call. Never blocks; an unsignaled
    /// fence simply means `false` now and a re-poll next frame.
    pub fn is_synced(&self) -> bool {
        self.synced.swap(false, Ordering::AcqRel)
    }
}
