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

//! Logic-thread backpressure.
//!
//! The logic thread may run ahead of the update thread by a bounded number
//! of frames (one, by default). When it produces past that bound, its next
//! flush parks on a condition variable until the update thread has caught
//! up. This is the only place the logic thread ever blocks, and neither
//! the update nor the render thread ever waits here.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct GateState {
    produced: u64,
    consumed: u64,
    /// Set at shutdown so a parked logic thread cannot wait on a dead
    /// update thread.
    open: bool,
}

/// Bounds how far the logic thread runs ahead of the update thread.
#[derive(Debug)]
pub struct FrameGate {
    state: Mutex<GateState>,
    caught_up: Condvar,
    max_lag: u64,
}

impl FrameGate {
    /// Creates a gate allowing `max_lag` unconsumed frames before the
    /// producer parks.
    pub fn new(max_lag: u32) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            caught_up: Condvar::new(),
            max_lag: u64::from(max_lag),
        }
    }

    /// Records a produced logic frame. Never blocks; call before
    /// requesting the update so the update thread can make progress while
    /// the producer waits in [`wait_for_slack`](Self::wait_for_slack).
    pub fn announce(&self) {
        self.state.lock().expect("frame gate poisoned").produced += 1;
    }

    /// Parks the calling (logic) thread until the update thread is within
    /// the allowed lag, or the gate was opened at shutdown.
    pub fn wait_for_slack(&self) {
        let mut state = self.state.lock().expect("frame gate poisoned");
        while !state.open && state.produced.saturating_sub(state.consumed) > self.max_lag {
            state = self
                .caught_up
                .wait(state)
                .expect("frame gate poisoned");
        }
    }

    /// Like [`wait_for_slack`](Self::wait_for_slack) with a timeout;
    /// returns whether slack was reached.
    pub fn wait_for_slack_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.state.lock().expect("frame gate poisoned");
        while !state.open && state.produced.saturating_sub(state.consumed) > self.max_lag {
            let Some(remaining) = deadline.checked_duration_since(std::time::Instant::now())
            else {
                return false;
            };
            let (next, result) = self
                .caught_up
                .wait_timeout(state, remaining)
                .expect("frame gate poisoned");
            state = next;
            if result.timed_out()
                && !state.open
                && state.produced.saturating_sub(state.consumed) > self.max_lag
            {
                return false;
            }
        }
        true
    }

    /// Records a consumed update frame and wakes a parked producer.
    pub fn frame_consumed(&self) {
        self.state.lock().expect("frame gate poisoned").consumed += 1;
        self.caught_up.notify_all();
    }

    /// Permanently releases any parked producer; used at engine shutdown.
    pub fn open(&self) {
        self.state.lock().expect("frame gate poisoned").open = true;
        self.caught_up.notify_all();
    }

    /// How many produced frames are currently unconsumed.
    pub fn lead(&self) -> u64 {
        let state = self.state.lock().expect("frame gate poisoned");
        state.produced.saturating_sub(state.consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn producer_is_free_within_the_lag_bound() {
        let gate = FrameGate::new(1);
        gate.announce();
        assert!(gate.wait_for_slack_timeout(Duration::from_millis(10)));
        assert_eq!(gate.lead(), 1);
    }

    #[test]
    fn producer_parks_past_the_bound_until_consumption() {
        let gate = Arc::new(FrameGate::new(1));
        gate.announce();
        gate.announce();
        assert!(
            !gate.wait_for_slack_timeout(Duration::from_millis(20)),
            "two frames ahead must park the producer"
        );

        let consumer = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            consumer.frame_consumed();
        });
        assert!(
            gate.wait_for_slack_timeout(Duration::from_secs(2)),
            "consumption must release the producer"
        );
        handle.join().unwrap();
        assert_eq!(gate.lead(), 1);
    }

    #[test]
    fn open_releases_a_parked_producer() {
        let gate = Arc::new(FrameGate::new(0));
        gate.announce();
        let opener = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            opener.open();
        });
        gate.wait_for_slack();
        handle.join().unwrap();
    }
}
