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

//! The constraint engine.
//!
//! Constraints recompute one property from other properties, every frame or
//! once, after all animators have run. They are applied in registration
//! order, which makes multiple constraints on the same property
//! deterministic: a later constraint observes an earlier one's output and
//! the last write wins.

use crate::resetter::{ResetterManager, ResetterSource};
use arbor_core::buffer::BufferIndex;
use arbor_core::notification::ConstraintId;
use arbor_core::property::PropertyValue;
use arbor_scene::{PropertyKey, SceneGraph, TargetOwner};
use std::fmt;

/// The constraint function: declared input values plus the target's current
/// value, producing the target's new value.
pub type ConstraintFunction =
    Box<dyn Fn(&[PropertyValue], &PropertyValue) -> PropertyValue + Send + 'static>;

/// How often a constraint applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyRate {
    /// Recomputed every frame while attached.
    #[default]
    EveryFrame,
    /// Applied on the next frame, then moved to the deactivated set until
    /// re-activated.
    Once,
}

/// What happens to the target property when the constraint is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalAction {
    /// The last constrained value is committed into the base.
    #[default]
    Bake,
    /// The constrained value is discarded; the property returns to its
    /// base value over the following resets.
    Discard,
}

/// A constraint as described by the logic thread.
pub struct ConstraintDefinition {
    /// Owner of the constrained property.
    pub target: TargetOwner,
    /// The constrained property.
    pub key: PropertyKey,
    /// Declared inputs, read through the update index each application.
    pub inputs: Vec<(TargetOwner, PropertyKey)>,
    /// Application frequency.
    pub apply_rate: ApplyRate,
    /// Removal behavior.
    pub removal_action: RemovalAction,
    /// The recomputation.
    pub function: ConstraintFunction,
}

impl fmt::Debug for ConstraintDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDefinition")
            .field("target", &self.target)
            .field("key", &self.key)
            .field("inputs", &self.inputs)
            .field("apply_rate", &self.apply_rate)
            .field("removal_action", &self.removal_action)
            .field("function", &"<fn>")
            .finish()
    }
}

#[derive(Debug)]
struct ConstraintInstance {
    id: ConstraintId,
    definition: ConstraintDefinition,
}

/// The outcome of applying one constraint.
enum Applied {
    Ok,
    /// An input or the target died; the constraint must be removed.
    InputLost,
}

impl ConstraintInstance {
    fn apply(&self, scene: &SceneGraph, index: BufferIndex) -> Applied {
        let definition = &self.definition;
        if !scene.owner_alive(definition.target) {
            return Applied::InputLost;
        }

        let mut inputs = Vec::with_capacity(definition.inputs.len());
        for &(owner, key) in &definition.inputs {
            match scene.resolve_property(owner, key) {
                Ok(slot) => inputs.push(slot.get(index)),
                Err(error) => {
                    // A destroyed input owner is an expected lifecycle
                    // event: skip the application and schedule removal.
                    log::debug!("Constraint {:?} lost an input: {error}", self.id);
                    return Applied::InputLost;
                }
            }
        }

        let slot = match scene.resolve_property(definition.target, definition.key) {
            Ok(slot) => slot,
            Err(error) => {
                log::debug!("Constraint {:?} lost its target: {error}", self.id);
                return Applied::InputLost;
            }
        };
        let current = slot.get(index);
        let output = (definition.function)(&inputs, &current);
        if let Err(error) = slot.set_animated(index, &output) {
            log::error!("Constraint {:?} produced a mismatched value: {error}", self.id);
            return Applied::InputLost;
        }
        Applied::Ok
    }

    /// Honors the removal action before the constraint is dropped.
    fn on_removed(&self, scene: &SceneGraph, index: BufferIndex) {
        if self.definition.removal_action != RemovalAction::Bake {
            return;
        }
        if let Ok(slot) = scene.resolve_property(self.definition.target, self.definition.key) {
            let current = slot.get(index);
            if let Err(error) = slot.bake(index, &current) {
                log::error!("Baking removed constraint value failed: {error}");
            }
        }
    }
}

/// Owns attached constraints and applies them once per frame, after the
/// animation pass.
#[derive(Debug, Default)]
pub struct ConstraintEngine {
    /// Applied every frame, in registration order.
    active: Vec<ConstraintInstance>,
    /// Apply-once constraints waiting for re-activation. Kept alive, not
    /// destroyed.
    deactivated: Vec<ConstraintInstance>,
}

impl ConstraintEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a constraint at the end of the registration order and
    /// registers its resetter.
    pub fn attach(
        &mut self,
        id: ConstraintId,
        definition: ConstraintDefinition,
        resetters: &mut ResetterManager,
    ) {
        resetters.register(
            definition.target,
            definition.key,
            ResetterSource::Constraint(id),
        );
        log::debug!("Attached constraint {id:?} on {:?}", definition.target);
        self.active.push(ConstraintInstance { id, definition });
    }

    /// Detaches a constraint from either set, honoring its removal action.
    pub fn detach(
        &mut self,
        id: ConstraintId,
        scene: &SceneGraph,
        index: BufferIndex,
        resetters: &mut ResetterManager,
    ) {
        let instance = if let Some(position) = self.active.iter().position(|c| c.id == id) {
            Some(self.active.remove(position))
        } else if let Some(position) = self.deactivated.iter().position(|c| c.id == id) {
            Some(self.deactivated.remove(position))
        } else {
            None
        };
        match instance {
            Some(instance) => {
                instance.on_removed(scene, index);
                resetters.release_source(ResetterSource::Constraint(id));
            }
            None => log::debug!("Detach for unknown constraint {id:?} ignored"),
        }
    }

    /// Moves a deactivated apply-once constraint back to the end of the
    /// active order; it applies again on the next pass.
    pub fn activate(&mut self, id: ConstraintId) {
        if let Some(position) = self.deactivated.iter().position(|c| c.id == id) {
            self.active.push(self.deactivated.remove(position));
        } else {
            log::debug!("Activate for unknown constraint {id:?} ignored");
        }
    }

    /// Applies every active constraint in registration order. Constraints
    /// whose inputs died are removed (honoring their removal action);
    /// apply-once constraints move to the deactivated set. Returns the
    /// number of applications performed.
    pub fn apply_all(
        &mut self,
        scene: &SceneGraph,
        index: BufferIndex,
        resetters: &mut ResetterManager,
    ) -> usize {
        let mut applied = 0;
        let mut position = 0;
        while position < self.active.len() {
            match self.active[position].apply(scene, index) {
                Applied::Ok => {
                    applied += 1;
                    if self.active[position].definition.apply_rate == ApplyRate::Once {
                        let instance = self.active.remove(position);
                        self.deactivated.push(instance);
                    } else {
                        position += 1;
                    }
                }
                Applied::InputLost => {
                    let instance = self.active.remove(position);
                    instance.on_removed(scene, index);
                    resetters.release_source(ResetterSource::Constraint(instance.id));
                }
            }
        }
        applied
    }

    /// Number of constraints applied every frame.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of parked apply-once constraints.
    pub fn deactivated_len(&self) -> usize {
        self.deactivated.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_scene::{HandleAllocator, Node, NodeHandle};
    use glam::Vec3;
    use std::sync::Arc;

    fn graph_with_nodes(count: usize) -> (SceneGraph, Vec<NodeHandle>) {
        let mut graph = SceneGraph::new(HandleAllocator::new(), HandleAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..count {
            let handle = graph.node_handle_allocator().reserve();
            graph.install_node(handle, Arc::new(Node::new()));
            graph.add_child(graph.root(), handle);
            handles.push(handle);
        }
        (graph, handles)
    }

    fn offset_x(
        target: TargetOwner,
        source: TargetOwner,
        offset: f32,
    ) -> ConstraintDefinition {
        ConstraintDefinition {
            target,
            key: PropertyKey::Position,
            inputs: vec![(source, PropertyKey::Position)],
            apply_rate: ApplyRate::EveryFrame,
            removal_action: RemovalAction::Discard,
            function: Box::new(move |inputs, _current| match inputs[0] {
                PropertyValue::Vector3(v) => {
                    PropertyValue::Vector3(v + Vec3::new(offset, 0.0, 0.0))
                }
                other => other,
            }),
        }
    }

    #[test]
    fn constraint_follows_its_input() {
        let (graph, handles) = graph_with_nodes(2);
        let mut resetters = ResetterManager::new();
        let mut engine = ConstraintEngine::new();
        let source = TargetOwner::Node(handles[0]);
        let target = TargetOwner::Node(handles[1]);

        graph
            .node(handles[0])
            .unwrap()
            .position
            .bake(1, Vec3::new(5.0, 0.0, 0.0));
        engine.attach(ConstraintId(1), offset_x(target, source, 1.0), &mut resetters);

        assert_eq!(engine.apply_all(&graph, 1, &mut resetters), 1);
        assert_eq!(
            graph.node(handles[1]).unwrap().position.get(1),
            Vec3::new(6.0, 0.0, 0.0)
        );
    }

    #[test]
    fn registration_order_is_deterministic_last_write_wins() {
        let (graph, handles) = graph_with_nodes(1);
        let mut resetters = ResetterManager::new();
        let mut engine = ConstraintEngine::new();
        let target = TargetOwner::Node(handles[0]);

        // X writes 1.0; Y reads the target's current value and doubles it.
        // Y must observe X's output, every frame.
        let x = ConstraintDefinition {
            target,
            key: PropertyKey::Position,
            inputs: Vec::new(),
            apply_rate: ApplyRate::EveryFrame,
            removal_action: RemovalAction::Discard,
            function: Box::new(|_inputs, _current| {
                PropertyValue::Vector3(Vec3::new(1.0, 0.0, 0.0))
            }),
        };
        let y = ConstraintDefinition {
            target,
            key: PropertyKey::Position,
            inputs: Vec::new(),
            apply_rate: ApplyRate::EveryFrame,
            removal_action: RemovalAction::Discard,
            function: Box::new(|_inputs, current| match current {
                PropertyValue::Vector3(v) => PropertyValue::Vector3(*v * 2.0),
                other => *other,
            }),
        };
        engine.attach(ConstraintId(1), x, &mut resetters);
        engine.attach(ConstraintId(2), y, &mut resetters);

        for _ in 0..3 {
            engine.apply_all(&graph, 1, &mut resetters);
            assert_eq!(
                graph.node(handles[0]).unwrap().position.get(1),
                Vec3::new(2.0, 0.0, 0.0)
            );
        }
    }

    #[test]
    fn apply_once_parks_after_one_application() {
        let (graph, handles) = graph_with_nodes(2);
        let mut resetters = ResetterManager::new();
        let mut engine = ConstraintEngine::new();
        let source = TargetOwner::Node(handles[0]);
        let target = TargetOwner::Node(handles[1]);

        let mut definition = offset_x(target, source, 2.0);
        definition.apply_rate = ApplyRate::Once;
        engine.attach(ConstraintId(3), definition, &mut resetters);

        assert_eq!(engine.apply_all(&graph, 1, &mut resetters), 1);
        assert_eq!(engine.active_len(), 0);
        assert_eq!(engine.deactivated_len(), 1);
        assert_eq!(engine.apply_all(&graph, 1, &mut resetters), 0);

        // Re-activation applies once more.
        engine.activate(ConstraintId(3));
        assert_eq!(engine.apply_all(&graph, 1, &mut resetters), 1);
        assert_eq!(engine.deactivated_len(), 1);
    }

    #[test]
    fn dead_input_skips_and_removes_the_constraint() {
        let (mut graph, handles) = graph_with_nodes(2);
        let mut resetters = ResetterManager::new();
        let mut engine = ConstraintEngine::new();
        let source = TargetOwner::Node(handles[0]);
        let target = TargetOwner::Node(handles[1]);

        engine.attach(ConstraintId(4), offset_x(target, source, 1.0), &mut resetters);
        engine.apply_all(&graph, 1, &mut resetters);

        graph.remove_node(handles[0]);
        // Must not crash; the constraint leaves the active set.
        assert_eq!(engine.apply_all(&graph, 1, &mut resetters), 0);
        assert_eq!(engine.active_len(), 0);
        assert_eq!(engine.deactivated_len(), 0);
    }

    #[test]
    fn removal_action_bake_commits_the_last_value() {
        let (graph, handles) = graph_with_nodes(2);
        let mut resetters = ResetterManager::new();
        let mut engine = ConstraintEngine::new();
        let source = TargetOwner::Node(handles[0]);
        let target = TargetOwner::Node(handles[1]);

        graph
            .node(handles[0])
            .unwrap()
            .position
            .bake(1, Vec3::new(3.0, 0.0, 0.0));
        let mut definition = offset_x(target, source, 1.0);
        definition.removal_action = RemovalAction::Bake;
        engine.attach(ConstraintId(5), definition, &mut resetters);
        engine.apply_all(&graph, 1, &mut resetters);

        engine.detach(ConstraintId(5), &graph, 1, &mut resetters);
        assert_eq!(
            graph.node(handles[1]).unwrap().position.base_value(),
            Vec3::new(4.0, 0.0, 0.0)
        );
    }
}
