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

//! The two shared-memory cell types underpinning every property owner.
//!
//! Both are deliberately lock-free: the zero-wait contract between the
//! update thread and its readers is load-bearing, so these cells must never
//! grow a mutex. Their correctness rests on the engine-wide access
//! discipline documented on each type, with the buffer-index swap in
//! [`arbor_core::BufferIndexTracker`] acting as the release/acquire edge
//! that publishes writes across threads.

use arbor_core::buffer::{BufferIndex, BUFFER_COUNT};
use std::cell::UnsafeCell;

/// A pair of value slots selected by [`BufferIndex`].
///
/// # Safety contract
///
/// At any instant one index is the update index (written by the update
/// thread) and the other is the event index (read by the logic thread);
/// [`arbor_core::BufferIndexTracker`] guarantees they never coincide. A
/// slot is therefore accessed by exactly one thread between two swaps, and
/// the swap's AcqRel ordering publishes the frame's writes before the other
/// side can observe the new index. Accessing a slot through an index the
/// current thread does not own is a programmer error with undefined
/// behavior in release builds; the engine's entry points assert thread
/// affinity in debug builds.
#[derive(Debug)]
pub struct DoubleBuffered<T> {
    slots: [UnsafeCell<T>; 2],
}

// SAFETY: cross-thread access is serialized per slot by the buffer-index
// discipline above; values move between threads, hence T: Send.
unsafe impl<T: Send> Sync for DoubleBuffered<T> {}

impl<T: Copy> DoubleBuffered<T> {
    /// Creates a pair with both slots holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            slots: [UnsafeCell::new(value), UnsafeCell::new(value)],
        }
    }

    /// Reads the slot for `index`.
    #[inline]
    pub fn get(&self, index: BufferIndex) -> T {
        debug_assert!(index < BUFFER_COUNT);
        // SAFETY: the caller owns this index per the type's contract.
        unsafe { *self.slots[index].get() }
    }

    /// Writes the slot for `index`.
    #[inline]
    pub fn set(&self, index: BufferIndex, value: T) {
        debug_assert!(index < BUFFER_COUNT);
        // SAFETY: the caller owns this index per the type's contract.
        unsafe {
            *self.slots[index].get() = value;
        }
    }

    /// Copies the other slot's value into `index`'s slot.
    ///
    /// Used for the per-frame carry-forward of computed values (world
    /// matrices, world colors) when nothing changed.
    #[inline]
    pub fn carry_forward(&self, index: BufferIndex) {
        self.set(index, self.get(1 - index));
    }
}

/// A cell owned by the update thread.
///
/// Holds the parts of an owner that only per-frame algorithms touch
/// (tree links, dirty flag words, base values). The logic and render
/// threads never access these cells; debug builds assert the discipline at
/// the engine's entry points rather than per access.
#[derive(Debug)]
pub struct OwnedByUpdate<T> {
    value: UnsafeCell<T>,
}

// SAFETY: all access is confined to the update thread by contract.
unsafe impl<T: Send> Sync for OwnedByUpdate<T> {}

impl<T> OwnedByUpdate<T> {
    /// Wraps a value.
    pub fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    /// Shared access from the update thread.
    #[inline]
    pub fn get(&self) -> &T {
        // SAFETY: update-thread-only access per the type's contract.
        unsafe { &*self.value.get() }
    }

    /// Exclusive access from the update thread. The caller must not hold
    /// another borrow of the same cell across this call.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub fn get_mut(&self) -> &mut T {
        // SAFETY: update-thread-only access per the type's contract.
        unsafe { &mut *self.value.get() }
    }
}

impl<T: Copy> OwnedByUpdate<T> {
    /// Copies the value out.
    #[inline]
    pub fn load(&self) -> T {
        *self.get()
    }

    /// Overwrites the value.
    #[inline]
    pub fn store(&self, value: T) {
        *self.get_mut() = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_independent() {
        let pair = DoubleBuffered::new(0u32);
        pair.set(0, 10);
        pair.set(1, 20);
        assert_eq!(pair.get(0), 10);
        assert_eq!(pair.get(1), 20);
    }

    #[test]
    fn carry_forward_copies_the_other_slot() {
        let pair = DoubleBuffered::new(0u32);
        pair.set(0, 42);
        pair.carry_forward(1);
        assert_eq!(pair.get(1), 42);
    }

    #[test]
    fn owned_cell_round_trips() {
        let cell = OwnedByUpdate::new(vec![1, 2]);
        cell.get_mut().push(3);
        assert_eq!(cell.get().as_slice(), &[1, 2, 3]);
    }
}
