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

//! Double-buffered animatable property storage.

use crate::double_buffered::{DoubleBuffered, OwnedByUpdate};
use arbor_core::buffer::BufferIndex;
use arbor_core::property::PropertyData;
use std::sync::atomic::{AtomicU8, Ordering};

/// How many frames a property stays dirty after a write: one per buffer
/// slot, so both slots are re-seeded before the property goes clean.
const DIRTY_FRAME_COUNT: u8 = 2;

/// A settable scene property: two buffered value slots plus the committed
/// base value.
///
/// One slot holds the value the logic thread reads (via the event index);
/// the other may hold a value written for the in-flight frame by an
/// animator or constraint (via the update index). The base value is the
/// last *baked* (committed) value; `reset_to_base_value` re-seeds the write
/// slot from it before animators run, which makes a frame with no active
/// animator a pure carry-forward.
#[derive(Debug)]
pub struct AnimatableProperty<T> {
    values: DoubleBuffered<T>,
    /// Committed value; update thread only.
    base: OwnedByUpdate<T>,
    /// Frames remaining until clean. Update thread writes; atomic so the
    /// type stays `Sync` without a lock. Relaxed ordering suffices: the
    /// counter is never read off the update thread.
    dirty_frames: AtomicU8,
}

impl<T: PropertyData> AnimatableProperty<T> {
    /// Creates a clean property with both slots and the base at `value`.
    pub fn new(value: T) -> Self {
        Self {
            values: DoubleBuffered::new(value),
            base: OwnedByUpdate::new(value),
            dirty_frames: AtomicU8::new(0),
        }
    }

    /// Reads the slot for `index`. Logic thread passes the event index,
    /// update-side code the update index.
    #[inline]
    pub fn get(&self, index: BufferIndex) -> T {
        self.values.get(index)
    }

    /// The committed value. Update thread only.
    #[inline]
    pub fn base_value(&self) -> T {
        self.base.load()
    }

    /// Writes an animated value into the update slot without touching the
    /// base; the value lives for this frame only unless re-applied or
    /// baked.
    pub fn set_animated(&self, index: BufferIndex, value: T) {
        self.values.set(index, value);
        self.mark_dirty();
    }

    /// Commits a value: writes the update slot *and* the base, so the value
    /// survives once the dirty window has re-seeded the other slot.
    pub fn bake(&self, index: BufferIndex, value: T) {
        self.values.set(index, value);
        self.base.store(value);
        self.mark_dirty();
    }

    /// Re-seeds the update slot from the base value, consuming one frame of
    /// the dirty window. No-op by construction when the property is clean.
    ///
    /// Must be called exactly once per frame (by the property's resetter)
    /// before animators run.
    pub fn reset_to_base_value(&self, index: BufferIndex) {
        if !self.is_clean() {
            self.values.set(index, self.base.load());
            self.dirty_frames.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Whether the value did not change within the last two frames.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.dirty_frames.load(Ordering::Relaxed) == 0
    }

    /// Whether downstream consumers (world recomputation, constraints)
    /// must treat this input as changed this frame.
    #[inline]
    pub fn input_changed(&self) -> bool {
        !self.is_clean()
    }

    fn mark_dirty(&self) {
        self.dirty_frames.store(DIRTY_FRAME_COUNT, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clean_with_equal_slots() {
        let property = AnimatableProperty::new(5.0f32);
        assert!(property.is_clean());
        assert_eq!(property.get(0), 5.0);
        assert_eq!(property.get(1), 5.0);
    }

    #[test]
    fn bake_then_two_resets_reaches_clean_carry_forward() {
        let property = AnimatableProperty::new(0.0f32);

        // Frame F: update index 1.
        property.bake(1, 9.0);
        assert!(property.input_changed());
        assert_eq!(property.get(1), 9.0);

        // Frame F+1: update index 0; the resetter re-seeds the stale slot.
        property.reset_to_base_value(0);
        assert_eq!(property.get(0), 9.0);
        assert!(property.input_changed());

        // Frame F+2: update index 1 again; window closes.
        property.reset_to_base_value(1);
        assert!(property.is_clean());

        // Carry-forward law: both slots hold the committed value from now
        // on with no further resets.
        assert_eq!(property.get(0), 9.0);
        assert_eq!(property.get(1), 9.0);
        property.reset_to_base_value(0);
        assert_eq!(property.get(0), 9.0);
    }

    #[test]
    fn animated_write_does_not_move_the_base() {
        let property = AnimatableProperty::new(1.0f32);
        property.set_animated(1, 3.5);
        assert_eq!(property.get(1), 3.5);
        assert_eq!(property.base_value(), 1.0);

        // The next frame's reset restores the base into the write slot.
        property.reset_to_base_value(0);
        assert_eq!(property.get(0), 1.0);
    }

    #[test]
    fn reset_on_clean_property_is_a_no_op() {
        let property = AnimatableProperty::new(2.0f32);
        property.reset_to_base_value(0);
        property.reset_to_base_value(1);
        assert!(property.is_clean());
        assert_eq!(property.get(0), 2.0);
        assert_eq!(property.get(1), 2.0);
    }
}
