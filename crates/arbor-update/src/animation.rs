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

//! The animation engine.
//!
//! Animations run entirely on the update thread, writing eased values into
//! the update side of their target properties once per tick. State machine
//! per play: `Waiting` until elapsed time passes the first animator's
//! delay, `Active` while interpolating, `Finished` exactly once. Finishing
//! queues a notification to the logic thread, never a direct call.

use crate::resetter::{ResetterManager, ResetterSource};
use arbor_core::easing::AlphaFunction;
use arbor_core::notification::{self, AnimationId, Notification, NotificationSender};
use arbor_core::property::PropertyValue;
use arbor_core::buffer::BufferIndex;
use arbor_scene::{PropertyKey, SceneGraph, TargetOwner};

/// Loop count meaning "repeat until stopped".
pub const LOOP_FOREVER: u32 = 0;

/// An animator's `[delay, duration]` window within its animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePeriod {
    /// Seconds before interpolation starts.
    pub delay: f32,
    /// Seconds the interpolation runs for once started.
    pub duration: f32,
}

impl TimePeriod {
    /// A window starting after `delay` and running for `duration`.
    pub fn new(delay: f32, duration: f32) -> Self {
        Self { delay, duration }
    }

    /// A window covering `[0, duration]`.
    pub fn from_duration(duration: f32) -> Self {
        Self {
            delay: 0.0,
            duration,
        }
    }
}

/// What happens to animated properties when the animation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndAction {
    /// The final value is committed into the base value.
    #[default]
    Bake,
    /// The animated value is discarded; the property returns to its base
    /// value over the following resets.
    Discard,
}

/// One property interpolation within an animation.
#[derive(Debug, Clone)]
pub struct AnimatorDefinition {
    /// The owner of the animated property.
    pub target: TargetOwner,
    /// Which property to animate.
    pub key: PropertyKey,
    /// Destination value; the start value is captured from the property's
    /// base when the animator first activates.
    pub to: PropertyValue,
    /// Easing applied to the linear progress.
    pub alpha: AlphaFunction,
    /// The animator's window within the animation.
    pub period: TimePeriod,
}

/// A complete animation: shared clock plus its animators.
#[derive(Debug, Clone)]
pub struct AnimationDefinition {
    /// Length of one loop in seconds.
    pub duration: f32,
    /// Number of loops, or [`LOOP_FOREVER`].
    pub loop_count: u32,
    /// End behavior for the animated properties.
    pub end_action: EndAction,
    /// Playback rate multiplier.
    pub speed_factor: f32,
    /// The animators, applied in definition order each tick.
    pub animators: Vec<AnimatorDefinition>,
}

impl AnimationDefinition {
    /// A single-loop animation of the given duration with no animators
    /// yet.
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            loop_count: 1,
            end_action: EndAction::default(),
            speed_factor: 1.0,
            animators: Vec::new(),
        }
    }

    /// Adds an animator driving `key` on `target` toward `to`.
    pub fn animate_to(
        mut self,
        target: TargetOwner,
        key: PropertyKey,
        to: PropertyValue,
        alpha: AlphaFunction,
        period: TimePeriod,
    ) -> Self {
        self.animators.push(AnimatorDefinition {
            target,
            key,
            to,
            alpha,
            period,
        });
        self
    }
}

/// Play state of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Playing but before the first animator's delay has elapsed.
    Waiting,
    /// At least one animator is interpolating.
    Active,
    /// The final loop completed (or the animation was stopped). Entered
    /// exactly once per play.
    Finished,
}

#[derive(Debug)]
struct Animator {
    definition: AnimatorDefinition,
    /// Start value, captured from the property base at first activation.
    from: Option<PropertyValue>,
    /// Set when the target died or the value kind mismatched; the animator
    /// goes inert instead of failing the whole animation.
    failed: bool,
}

impl Animator {
    fn new(definition: AnimatorDefinition) -> Self {
        Self {
            definition,
            from: None,
            failed: false,
        }
    }

    /// Applies the eased value for the given animation-local time. Returns
    /// whether a write happened.
    fn apply(&mut self, scene: &SceneGraph, index: BufferIndex, elapsed: f32) -> bool {
        if self.failed || elapsed < self.definition.delay() {
            return false;
        }
        let slot = match scene
            .resolve_property(self.definition.target, self.definition.key)
        {
            Ok(slot) => slot,
            Err(error) => {
                log::debug!("Animator target gone, going inert: {error}");
                self.failed = true;
                return false;
            }
        };
        let from = match &self.from {
            Some(value) => *value,
            None => {
                let base = slot.base_value();
                self.from = Some(base);
                base
            }
        };
        let eased = self.definition.alpha.apply(self.progress(elapsed));
        match slot.animate(index, &from, &self.definition.to, eased) {
            Ok(()) => true,
            Err(error) => {
                log::error!("Animator value rejected, going inert: {error}");
                self.failed = true;
                false
            }
        }
    }

    fn progress(&self, elapsed: f32) -> f32 {
        let period = self.definition.period;
        if period.duration > 0.0 {
            ((elapsed - period.delay) / period.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Applies the end action once the animation's final loop completed.
    fn finalize(&self, scene: &SceneGraph, index: BufferIndex, end_action: EndAction) {
        if self.failed || end_action != EndAction::Bake {
            return;
        }
        if let Ok(slot) = scene.resolve_property(self.definition.target, self.definition.key) {
            if let Err(error) = slot.bake(index, &self.definition.to) {
                log::error!("Baking animation end value failed: {error}");
            }
        }
    }

}

impl AnimatorDefinition {
    fn delay(&self) -> f32 {
        self.period.delay
    }
}

/// A playing animation instance on the update thread.
#[derive(Debug)]
pub struct Animation {
    id: AnimationId,
    duration: f32,
    loop_count: u32,
    end_action: EndAction,
    speed_factor: f32,
    animators: Vec<Animator>,
    elapsed: f32,
    loops_completed: u32,
    state: PlayState,
}

impl Animation {
    fn new(id: AnimationId, definition: AnimationDefinition) -> Self {
        Self {
            id,
            duration: definition.duration.max(f32::EPSILON),
            loop_count: definition.loop_count,
            end_action: definition.end_action,
            speed_factor: definition.speed_factor,
            animators: definition.animators.into_iter().map(Animator::new).collect(),
            elapsed: 0.0,
            loops_completed: 0,
            state: PlayState::Waiting,
        }
    }

    /// The id the logic side refers to this animation by.
    pub fn id(&self) -> AnimationId {
        self.id
    }

    /// Current play state.
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Advances the animation clock and applies every animator. Returns
    /// the state after the tick; `Finished` is returned exactly once.
    fn update(&mut self, scene: &SceneGraph, index: BufferIndex, dt: f32) -> PlayState {
        if self.state == PlayState::Finished {
            return PlayState::Finished;
        }
        self.elapsed += dt * self.speed_factor;

        while self.elapsed >= self.duration {
            let on_final_loop =
                self.loop_count != LOOP_FOREVER && self.loops_completed + 1 >= self.loop_count;
            if on_final_loop {
                // Clamp the last tick to the end of the window, then apply
                // the end action.
                for animator in &mut self.animators {
                    animator.apply(scene, index, self.duration);
                }
                for animator in &self.animators {
                    animator.finalize(scene, index, self.end_action);
                }
                self.state = PlayState::Finished;
                return PlayState::Finished;
            }
            // Captured start values are kept: every loop replays the same
            // interpolation.
            self.loops_completed += 1;
            self.elapsed -= self.duration;
        }

        let mut any_applied = false;
        for animator in &mut self.animators {
            any_applied |= animator.apply(scene, index, self.elapsed);
        }
        self.state = if any_applied {
            PlayState::Active
        } else {
            PlayState::Waiting
        };
        self.state
    }

    /// Stops mid-flight: bakes current values when the end action asks for
    /// it, then finishes.
    fn stop(&mut self, scene: &SceneGraph, index: BufferIndex) {
        if self.state == PlayState::Finished {
            return;
        }
        if self.end_action == EndAction::Bake {
            for animator in &self.animators {
                if animator.failed {
                    continue;
                }
                if let Ok(slot) =
                    scene.resolve_property(animator.definition.target, animator.definition.key)
                {
                    let current = slot.get(index);
                    if let Err(error) = slot.bake(index, &current) {
                        log::error!("Baking stopped animation value failed: {error}");
                    }
                }
            }
        }
        self.state = PlayState::Finished;
    }
}

/// Owns every playing animation and drives them once per frame.
pub struct AnimationEngine {
    active: Vec<Animation>,
    notifier: NotificationSender,
}

impl AnimationEngine {
    /// Creates an engine publishing finished events through `notifier`.
    pub fn new(notifier: NotificationSender) -> Self {
        Self {
            active: Vec::new(),
            notifier,
        }
    }

    /// Starts playing a definition and registers resetters for every
    /// animated property.
    pub fn play(
        &mut self,
        id: AnimationId,
        definition: AnimationDefinition,
        resetters: &mut ResetterManager,
    ) {
        for animator in &definition.animators {
            resetters.register(animator.target, animator.key, ResetterSource::Animation(id));
        }
        log::debug!(
            "Playing animation {:?}: {} animators over {}s",
            id,
            definition.animators.len(),
            definition.duration
        );
        self.active.push(Animation::new(id, definition));
    }

    /// Stops and removes an animation; the finished notification is queued
    /// like a natural completion.
    pub fn stop(
        &mut self,
        id: AnimationId,
        scene: &SceneGraph,
        index: BufferIndex,
        resetters: &mut ResetterManager,
    ) {
        let Some(position) = self.active.iter().position(|a| a.id == id) else {
            log::debug!("Stop for unknown animation {id:?} ignored");
            return;
        };
        let mut animation = self.active.remove(position);
        animation.stop(scene, index);
        resetters.release_source(ResetterSource::Animation(id));
        notification::publish(&self.notifier, Notification::AnimationFinished { animation: id });
    }

    /// Ticks every animation, removes the finished ones, and queues their
    /// notifications. Returns how many animations remain active.
    pub fn update(
        &mut self,
        scene: &SceneGraph,
        index: BufferIndex,
        dt: f32,
        resetters: &mut ResetterManager,
    ) -> usize {
        let mut finished = Vec::new();
        for animation in &mut self.active {
            if animation.update(scene, index, dt) == PlayState::Finished {
                finished.push(animation.id);
            }
        }
        if !finished.is_empty() {
            self.active.retain(|a| a.state != PlayState::Finished);
            for id in finished {
                resetters.release_source(ResetterSource::Animation(id));
                notification::publish(
                    &self.notifier,
                    Notification::AnimationFinished { animation: id },
                );
                log::debug!("Animation {id:?} finished");
            }
        }
        self.active.len()
    }

    /// Number of playing animations.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no animation is playing.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::notification::NotificationBus;
    use arbor_scene::{HandleAllocator, Node, NodeHandle};
    use glam::Vec3;
    use std::sync::Arc;

    fn graph_with_node() -> (SceneGraph, NodeHandle) {
        let mut graph = SceneGraph::new(HandleAllocator::new(), HandleAllocator::new());
        let handle = graph.node_handle_allocator().reserve();
        graph.install_node(handle, Arc::new(Node::new()));
        graph.add_child(graph.root(), handle);
        (graph, handle)
    }

    fn move_to_x(
        target: TargetOwner,
        x: f32,
        delay: f32,
        duration: f32,
    ) -> AnimationDefinition {
        AnimationDefinition::new(delay + duration).animate_to(
            target,
            PropertyKey::Position,
            PropertyValue::Vector3(Vec3::new(x, 0.0, 0.0)),
            AlphaFunction::Linear,
            TimePeriod::new(delay, duration),
        )
    }

    #[test]
    fn waits_through_the_delay_then_interpolates() {
        let (graph, handle) = graph_with_node();
        let bus = NotificationBus::new();
        let mut resetters = ResetterManager::new();
        let mut engine = AnimationEngine::new(bus.sender());
        let target = TargetOwner::Node(handle);

        engine.play(AnimationId(1), move_to_x(target, 10.0, 0.5, 1.0), &mut resetters);

        // Still inside the delay: no write.
        engine.update(&graph, 1, 0.25, &mut resetters);
        let node = graph.node(handle).unwrap();
        assert_eq!(node.position.get(1), Vec3::ZERO);

        // 0.75s elapsed = 0.25s into the 1s window.
        engine.update(&graph, 1, 0.5, &mut resetters);
        assert_eq!(node.position.get(1), Vec3::new(2.5, 0.0, 0.0));
    }

    #[test]
    fn finishes_exactly_once_with_final_value() {
        let (graph, handle) = graph_with_node();
        let bus = NotificationBus::new();
        let mut resetters = ResetterManager::new();
        let mut engine = AnimationEngine::new(bus.sender());
        let target = TargetOwner::Node(handle);

        engine.play(AnimationId(7), move_to_x(target, 10.0, 0.0, 1.0), &mut resetters);
        engine.update(&graph, 1, 0.5, &mut resetters);
        let remaining = engine.update(&graph, 1, 0.6, &mut resetters);
        assert_eq!(remaining, 0);

        let node = graph.node(handle).unwrap();
        assert_eq!(node.position.get(1), Vec3::new(10.0, 0.0, 0.0));
        // Default end action bakes the destination.
        assert_eq!(node.position.base_value(), Vec3::new(10.0, 0.0, 0.0));

        // Exactly one finished notification, even after further ticks.
        engine.update(&graph, 1, 0.1, &mut resetters);
        let finished: Vec<_> = bus.drain();
        assert_eq!(finished.len(), 1);
        assert!(matches!(
            finished[0],
            Notification::AnimationFinished {
                animation: AnimationId(7)
            }
        ));
    }

    #[test]
    fn discard_end_action_leaves_the_base_alone() {
        let (graph, handle) = graph_with_node();
        let bus = NotificationBus::new();
        let mut resetters = ResetterManager::new();
        let mut engine = AnimationEngine::new(bus.sender());
        let target = TargetOwner::Node(handle);

        let mut definition = move_to_x(target, 4.0, 0.0, 1.0);
        definition.end_action = EndAction::Discard;
        engine.play(AnimationId(2), definition, &mut resetters);
        engine.update(&graph, 1, 2.0, &mut resetters);

        let node = graph.node(handle).unwrap();
        assert_eq!(node.position.get(1), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(node.position.base_value(), Vec3::ZERO);

        // The aging resetters restore the base into both slots.
        resetters.reset_all(&graph, 0);
        resetters.reset_all(&graph, 1);
        assert_eq!(node.position.get(0), Vec3::ZERO);
        assert_eq!(node.position.get(1), Vec3::ZERO);
    }

    #[test]
    fn looping_replays_the_same_interpolation() {
        let (graph, handle) = graph_with_node();
        let bus = NotificationBus::new();
        let mut resetters = ResetterManager::new();
        let mut engine = AnimationEngine::new(bus.sender());
        let target = TargetOwner::Node(handle);

        let mut definition = move_to_x(target, 8.0, 0.0, 1.0);
        definition.loop_count = 3;
        engine.play(AnimationId(3), definition, &mut resetters);

        // 1.25s: second loop, quarter way through.
        engine.update(&graph, 1, 1.25, &mut resetters);
        let node = graph.node(handle).unwrap();
        assert_eq!(node.position.get(1), Vec3::new(2.0, 0.0, 0.0));

        // Past the third loop: finished.
        let remaining = engine.update(&graph, 1, 2.0, &mut resetters);
        assert_eq!(remaining, 0);
        assert_eq!(node.position.get(1), Vec3::new(8.0, 0.0, 0.0));
    }

    #[test]
    fn dead_target_goes_inert_without_crashing() {
        let (mut graph, handle) = graph_with_node();
        let bus = NotificationBus::new();
        let mut resetters = ResetterManager::new();
        let mut engine = AnimationEngine::new(bus.sender());
        let target = TargetOwner::Node(handle);

        engine.play(AnimationId(4), move_to_x(target, 10.0, 0.0, 1.0), &mut resetters);
        graph.remove_node(handle);

        // Ticks past the end; the animator is inert, the animation still
        // finishes and notifies.
        let remaining = engine.update(&graph, 1, 2.0, &mut resetters);
        assert_eq!(remaining, 0);
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn stop_bakes_the_current_value_and_notifies() {
        let (graph, handle) = graph_with_node();
        let bus = NotificationBus::new();
        let mut resetters = ResetterManager::new();
        let mut engine = AnimationEngine::new(bus.sender());
        let target = TargetOwner::Node(handle);

        engine.play(AnimationId(5), move_to_x(target, 10.0, 0.0, 1.0), &mut resetters);
        engine.update(&graph, 1, 0.5, &mut resetters);
        engine.stop(AnimationId(5), &graph, 1, &mut resetters);

        let node = graph.node(handle).unwrap();
        assert_eq!(node.position.base_value(), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(bus.drain().len(), 1);
        assert!(engine.is_empty());
    }
}
