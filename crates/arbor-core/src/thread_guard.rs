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

//! Debug-build thread-affinity assertions.
//!
//! Wrong-thread access to a single-threaded structure (enqueueing scene
//! messages off the logic thread, draining them off the update thread) is a
//! programmer error, not a runtime condition: debug builds abort on it,
//! release builds compile the checks away entirely.

use std::sync::OnceLock;
use std::thread::ThreadId;

/// Latches the first (or an explicitly bound) thread for a role and asserts
/// that every subsequent guarded call happens on that same thread.
///
/// All methods are no-ops in release builds.
#[derive(Debug)]
pub struct ThreadAffinityCell {
    role: &'static str,
    bound: OnceLock<ThreadId>,
}

impl ThreadAffinityCell {
    /// Creates an unbound cell for the named role ("logic", "update", ...).
    pub const fn new(role: &'static str) -> Self {
        Self {
            role,
            bound: OnceLock::new(),
        }
    }

    /// Binds the cell to the current thread. Binding twice from different
    /// threads is itself a programmer error.
    pub fn bind_current(&self) {
        if cfg!(debug_assertions) {
            let current = std::thread::current().id();
            let bound = *self.bound.get_or_init(|| current);
            debug_assert_eq!(
                bound, current,
                "{} role already bound to another thread",
                self.role
            );
        }
    }

    /// Asserts the current thread is the bound one, binding on first use if
    /// the cell was never bound explicitly.
    #[inline]
    #[track_caller]
    pub fn assert_current(&self) {
        if cfg!(debug_assertions) {
            let current = std::thread::current().id();
            let bound = *self.bound.get_or_init(|| current);
            assert_eq!(
                bound, current,
                "accessed a {}-thread-only structure from the wrong thread",
                self.role
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_access_is_allowed() {
        let cell = ThreadAffinityCell::new("test");
        cell.bind_current();
        cell.assert_current();
        cell.assert_current();
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore = "checks compile away in release")]
    fn cross_thread_access_panics_in_debug() {
        let cell = std::sync::Arc::new(ThreadAffinityCell::new("test"));
        cell.bind_current();
        let remote = std::sync::Arc::clone(&cell);
        let outcome = std::thread::spawn(move || remote.assert_current()).join();
        assert!(outcome.is_err(), "wrong-thread access must abort");
    }
}
