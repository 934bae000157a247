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

//! Per-frame property reset bookkeeping.
//!
//! A resetter re-seeds one property's write slot from its base value at the
//! start of every frame, before animators and constraints run. Resetters
//! bound to an animation or constraint live as long as their source, then
//! age for two further frames so both buffer slots are re-seeded before the
//! resetter drops. Bake resetters are born aging: two frames cover the
//! slots a one-shot committed write left stale.

use crate::discard::DISCARD_FRAME_COUNT;
use arbor_core::buffer::BufferIndex;
use arbor_core::notification::{AnimationId, ConstraintId};
use arbor_scene::{PropertyKey, SceneGraph, TargetOwner};
use std::collections::HashSet;

/// What keeps a resetter alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetterSource {
    /// A one-shot committed write; ages from birth.
    Bake,
    /// Alive while the animation plays.
    Animation(AnimationId),
    /// Alive while the constraint is attached.
    Constraint(ConstraintId),
}

#[derive(Debug)]
struct Resetter {
    owner: TargetOwner,
    key: PropertyKey,
    source: ResetterSource,
    /// `None` while the source is alive; `Some(n)` counts remaining aging
    /// frames once the source finished.
    remaining: Option<u32>,
}

/// Owns every active resetter and runs the per-frame reset pass.
#[derive(Debug, Default)]
pub struct ResetterManager {
    resetters: Vec<Resetter>,
}

impl ResetterManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a one-shot resetter for a baked property.
    pub fn register_bake(&mut self, owner: TargetOwner, key: PropertyKey) {
        self.resetters.push(Resetter {
            owner,
            key,
            source: ResetterSource::Bake,
            remaining: Some(DISCARD_FRAME_COUNT),
        });
    }

    /// Registers a resetter that lives as long as its animation or
    /// constraint source.
    pub fn register(&mut self, owner: TargetOwner, key: PropertyKey, source: ResetterSource) {
        debug_assert!(
            source != ResetterSource::Bake,
            "bake resetters use register_bake"
        );
        self.resetters.push(Resetter {
            owner,
            key,
            source,
            remaining: None,
        });
    }

    /// Puts every resetter bound to `source` into its two-frame aging
    /// window; called when an animation finishes or a constraint detaches.
    pub fn release_source(&mut self, source: ResetterSource) {
        for resetter in &mut self.resetters {
            if resetter.source == source && resetter.remaining.is_none() {
                resetter.remaining = Some(DISCARD_FRAME_COUNT);
            }
        }
    }

    /// Drops every resetter targeting a destroyed owner immediately.
    pub fn discard_owner(&mut self, owner: TargetOwner) {
        self.resetters.retain(|resetter| resetter.owner != owner);
    }

    /// Runs the reset pass for one frame: each tracked property gets
    /// exactly one `reset_to_base_value` call (several resetters may share
    /// a property), dead owners drop their resetters, and aging windows
    /// advance.
    pub fn reset_all(&mut self, scene: &SceneGraph, index: BufferIndex) {
        let mut reset_this_frame: HashSet<(TargetOwner, PropertyKey)> = HashSet::new();
        self.resetters.retain_mut(|resetter| {
            if !scene.owner_alive(resetter.owner) {
                return false;
            }
            if reset_this_frame.insert((resetter.owner, resetter.key)) {
                match scene.resolve_property(resetter.owner, resetter.key) {
                    Ok(slot) => slot.reset_to_base_value(index),
                    Err(error) => {
                        // The owner is alive, so this is a stale key; the
                        // resetter is useless either way.
                        log::warn!("Dropping resetter: {error}");
                        return false;
                    }
                }
            }
            match &mut resetter.remaining {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    *n > 0
                }
            }
        });
    }

    /// Number of live resetters.
    pub fn len(&self) -> usize {
        self.resetters.len()
    }

    /// Whether no resetter is active.
    pub fn is_empty(&self) -> bool {
        self.resetters.is_empty()
    }
}
