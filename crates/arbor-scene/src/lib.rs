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

//! # Arbor Scene
//!
//! The retained scene state: a tree of nodes with double-buffered
//! properties, renderer owners attached to nodes, and the generational
//! arenas that give every owner a stable, liveness-checked handle.
//!
//! The memory discipline of this crate is the heart of the engine. A
//! property owner's double-buffered slots are written exclusively by the
//! update thread through the update buffer index and read by the logic
//! thread through the event index; the per-frame index swap in
//! [`arbor_core::BufferIndexTracker`] is the only synchronization edge
//! between the two sides.

pub mod arena;
pub mod double_buffered;
pub mod graph;
pub mod node;
pub mod owner;
pub mod property;
pub mod renderer;

pub use arena::{Arena, Handle, HandleAllocator};
pub use double_buffered::{DoubleBuffered, OwnedByUpdate};
pub use graph::SceneGraph;
pub use node::{Node, NodeDirtyFlags, NodeHandle};
pub use owner::{PropertyError, PropertyKey, PropertySlot, TargetOwner};
pub use property::AnimatableProperty;
pub use renderer::{Renderer, RendererHandle};
