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

//! The double-buffer index pair and its once-per-frame atomic swap.
//!
//! Every double-buffered value in the engine owns two slots. At any instant
//! one slot belongs to the logic thread (the *event* index) and the other to
//! the update/render side (the *update* index). The tracker's swap, issued
//! once per frame on the update thread after render instructions have been
//! assembled, is the single synchronization edge between the two sides: no
//! property write is visible across the thread boundary until the swap that
//! follows it.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Index selecting one of the two slots of a double-buffered value.
///
/// Always `0` or `1`. The event and update indices held by a
/// [`BufferIndexTracker`] are opposite values at every instant.
pub type BufferIndex = usize;

/// Number of slots in every double-buffered value.
pub const BUFFER_COUNT: usize = 2;

/// Holds the event/update buffer index pair and performs the per-frame swap.
///
/// The swap uses release ordering and the reads use acquire ordering, so any
/// write made through the update index before a swap is visible to whichever
/// thread observes the new index pair afterwards. This ordering is the only
/// synchronization protecting double-buffered reads; there is deliberately
/// no lock on the property path.
#[derive(Debug)]
pub struct BufferIndexTracker {
    /// Index the logic thread currently writes and reads through. The update
    /// index is always the opposite slot, so a single atomic carries both.
    event_index: AtomicUsize,
}

impl BufferIndexTracker {
    /// Creates a tracker with event index 0 and update index 1.
    pub fn new() -> Self {
        Self {
            event_index: AtomicUsize::new(0),
        }
    }

    /// Returns the index the logic thread may currently access.
    #[inline]
    pub fn event_buffer_index(&self) -> BufferIndex {
        self.event_index.load(Ordering::Acquire)
    }

    /// Returns the index the update thread may currently access.
    #[inline]
    pub fn update_buffer_index(&self) -> BufferIndex {
        1 - self.event_index.load(Ordering::Acquire)
    }

    /// Exchanges the two indices. Called exactly once per frame, on the
    /// update thread, after render-instruction assembly for the frame is
    /// complete.
    ///
    /// Returns the update index for the *next* frame.
    #[inline]
    pub fn swap(&self) -> BufferIndex {
        // fetch_xor flips 0 <-> 1; AcqRel makes the swap both publish the
        // frame's writes and observe the other side's latest reads. The
        // previous event index becomes the new update index.
        self.event_index.fetch_xor(1, Ordering::AcqRel)
    }
}

impl Default for BufferIndexTracker {
    fn default() -> Self {
        Self::new()
    }
}
