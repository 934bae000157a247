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

//! Generational arenas and handles for scene owners.
//!
//! Owners (nodes, renderers) are addressed by `Handle`s combining an index
//! with a generation counter, solving the ABA problem: when a slot is
//! recycled its generation is incremented, so handles to the destroyed
//! owner fail liveness validation instead of silently aliasing the new one.
//!
//! Handles are *reserved* on the logic thread at object creation, before
//! the install message reaches the update thread, so the allocator is the
//! one piece shared by both sides; reservation happens at object creation
//! rate, never on the per-frame property path.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// A stable, liveness-checked reference to an owner of type `T`.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Builds a handle from raw parts. Only the allocator mints meaningful
    /// handles; this exists for the allocator and for tests.
    pub(crate) fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// The slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation the handle was minted with.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: a derived Clone/Copy would demand `T: Clone`/`T: Copy`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}
impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}
impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct AllocatorState {
    /// Current generation per slot ever minted.
    generations: Vec<u32>,
    /// Slot indices available for reuse.
    free: Vec<u32>,
}

/// Mints and recycles handles for one arena.
///
/// Shared between the logic thread (reserve at creation) and the update
/// thread (release once the discard queue lets go of the owner).
#[derive(Debug)]
pub struct HandleAllocator<T> {
    state: Mutex<AllocatorState>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HandleAllocator<T> {
    /// Creates an empty allocator behind an `Arc` for sharing.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(AllocatorState::default()),
            _marker: PhantomData,
        })
    }

    /// Reserves a fresh handle, reusing a freed slot when one exists.
    pub fn reserve(&self) -> Handle<T> {
        let mut state = self.state.lock().expect("handle allocator poisoned");
        if let Some(index) = state.free.pop() {
            let generation = state.generations[index as usize];
            Handle::from_raw(index, generation)
        } else {
            let index = state.generations.len() as u32;
            state.generations.push(0);
            Handle::from_raw(index, 0)
        }
    }

    /// Retires a handle: bumps the slot generation so stale handles fail
    /// validation, then returns the slot to the free list.
    ///
    /// Called on the update thread once the discard queue has released the
    /// owner; releasing a handle twice is a programmer error.
    pub fn release(&self, handle: Handle<T>) {
        let mut state = self.state.lock().expect("handle allocator poisoned");
        let slot = handle.index as usize;
        debug_assert_eq!(
            state.generations[slot], handle.generation,
            "released a stale handle"
        );
        state.generations[slot] = state.generations[slot].wrapping_add(1);
        state.free.push(handle.index);
    }
}

struct Entry<T> {
    generation: u32,
    value: Arc<T>,
}

/// Slot storage for installed owners, indexed by [`Handle`].
///
/// Owned by the update thread; the logic thread never touches the arena
/// (it keeps its own `Arc` clones of the owners it created).
pub struct Arena<T> {
    slots: Vec<Option<Entry<T>>>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Installs an owner under a reserved handle.
    pub fn install(&mut self, handle: Handle<T>, value: Arc<T>) {
        let slot = handle.index() as usize;
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        debug_assert!(
            self.slots[slot].is_none(),
            "installed over a live owner at {handle:?}"
        );
        self.slots[slot] = Some(Entry {
            generation: handle.generation(),
            value,
        });
    }

    /// Removes an owner, returning its `Arc` for discard-queueing.
    ///
    /// Returns `None` for a stale or never-installed handle.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<Arc<T>> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        match slot {
            Some(entry) if entry.generation == handle.generation() => {
                slot.take().map(|entry| entry.value)
            }
            _ => None,
        }
    }

    /// Resolves a handle against the liveness table.
    pub fn get(&self, handle: Handle<T>) -> Option<&Arc<T>> {
        match self.slots.get(handle.index() as usize)? {
            Some(entry) if entry.generation == handle.generation() => Some(&entry.value),
            _ => None,
        }
    }

    /// Whether the handle refers to a live owner.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Iterates live owners with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &Arc<T>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|entry| (Handle::from_raw(index as u32, entry.generation), &entry.value))
        })
    }

    /// Number of live owners.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no owner is installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_install_resolve() {
        let allocator = HandleAllocator::<u32>::new();
        let mut arena = Arena::new();

        let handle = allocator.reserve();
        arena.install(handle, Arc::new(7));
        assert_eq!(**arena.get(handle).unwrap(), 7);
        assert!(arena.contains(handle));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn stale_handle_fails_liveness_after_recycle() {
        let allocator = HandleAllocator::<u32>::new();
        let mut arena = Arena::new();

        let first = allocator.reserve();
        arena.install(first, Arc::new(1));
        arena.remove(first).unwrap();
        allocator.release(first);

        // Reuse of the same slot under a new generation.
        let second = allocator.reserve();
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        arena.install(second, Arc::new(2));

        assert!(arena.get(first).is_none(), "stale handle must not resolve");
        assert_eq!(**arena.get(second).unwrap(), 2);
    }

    #[test]
    fn remove_is_idempotent_for_stale_handles() {
        let allocator = HandleAllocator::<u32>::new();
        let mut arena = Arena::new();
        let handle = allocator.reserve();
        arena.install(handle, Arc::new(3));
        assert!(arena.remove(handle).is_some());
        assert!(arena.remove(handle).is_none());
    }

    #[test]
    fn iter_visits_only_live_slots() {
        let allocator = HandleAllocator::<u32>::new();
        let mut arena = Arena::new();
        let a = allocator.reserve();
        let b = allocator.reserve();
        let c = allocator.reserve();
        arena.install(a, Arc::new(10));
        arena.install(b, Arc::new(20));
        arena.install(c, Arc::new(30));
        arena.remove(b);

        let visited: Vec<u32> = arena.iter().map(|(_, v)| **v).collect();
        assert_eq!(visited, vec![10, 30]);
    }
}
