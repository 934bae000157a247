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

//! Deferred destruction of owners still visible to buffered frames.

use std::collections::VecDeque;

/// How many update frames past the removal request a discarded entry is
/// held: one per buffer index, covering the frame the render thread may
/// still be consuming when destruction is requested. An entry requested in
/// frame F is released during frame F+2. This two-frame rule is the
/// invariant protecting against use-after-free across the thread boundary.
pub const DISCARD_FRAME_COUNT: u32 = 2;

/// Holds destroyed owners/resources until both buffer indices have
/// advanced past the frame the removal was requested in.
#[derive(Debug)]
pub struct DiscardQueue<T> {
    /// Entries with the frame their removal was requested in, oldest
    /// first.
    entries: VecDeque<(T, u64)>,
}

impl<T> DiscardQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Queues an entry removed during `frame`.
    pub fn push(&mut self, entry: T, frame: u64) {
        debug_assert!(
            self.entries.back().map_or(true, |(_, f)| *f <= frame),
            "discard frames must be monotonic"
        );
        self.entries.push_back((entry, frame));
    }

    /// Returns the entries whose hold has elapsed by `current_frame`,
    /// oldest first. The caller performs the actual release (dropping the
    /// owner, sending a destroy command).
    pub fn advance(&mut self, current_frame: u64) -> Vec<T> {
        let mut elapsed = Vec::new();
        while let Some((_, requested)) = self.entries.front() {
            if requested + u64::from(DISCARD_FRAME_COUNT) > current_frame {
                break;
            }
            let (entry, _) = self.entries.pop_front().expect("checked non-empty");
            elapsed.push(entry);
        }
        elapsed
    }

    /// Number of entries still held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for DiscardQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_held_for_two_frames_past_the_request() {
        let mut queue = DiscardQueue::new();
        queue.push("a", 10);
        assert!(queue.advance(10).is_empty(), "held in the request frame");
        assert!(queue.advance(11).is_empty(), "held one frame later");
        assert_eq!(queue.advance(12), vec!["a"], "released at frame F+2");
        assert!(queue.is_empty());
    }

    #[test]
    fn release_keeps_request_order() {
        let mut queue = DiscardQueue::new();
        queue.push(1, 5);
        queue.push(2, 6);
        assert_eq!(queue.advance(7), vec![1]);
        assert_eq!(queue.advance(8), vec![2]);
    }

    #[test]
    fn entries_from_the_same_frame_release_together() {
        let mut queue = DiscardQueue::new();
        queue.push("x", 3);
        queue.push("y", 3);
        assert!(queue.advance(4).is_empty());
        assert_eq!(queue.advance(5), vec!["x", "y"]);
    }

    #[test]
    fn a_late_advance_releases_everything_due() {
        let mut queue = DiscardQueue::new();
        queue.push(1, 1);
        queue.push(2, 2);
        assert_eq!(queue.advance(100), vec![1, 2]);
    }
}
