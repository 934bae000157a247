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

//! The update orchestrator: one frame, ten steps, one swap.

use crate::animation::AnimationEngine;
use crate::constraint::ConstraintEngine;
use crate::discard::{DiscardQueue, DISCARD_FRAME_COUNT};
use crate::messages::{MessageQueue, SceneMessage};
use crate::resetter::ResetterManager;
use arbor_core::buffer::{BufferIndex, BufferIndexTracker};
use arbor_core::notification::NotificationSender;
use arbor_render::{
    FrameSubmission, RenderCommand, RenderCommandSender, RenderInstruction, RenderItem,
    RenderTracker,
};
use arbor_scene::{
    HandleAllocator, Node, NodeHandle, Renderer, RendererHandle, SceneGraph, TargetOwner,
};
use bitflags::bitflags;
use glam::Mat4;
use std::collections::VecDeque;
use std::sync::Arc;

bitflags! {
    /// What the frame produced and whether another cycle is needed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateStatus: u32 {
        /// Another update cycle should be scheduled without waiting for a
        /// new request (animations mid-flight, pending discards, late
        /// messages).
        const KEEP_UPDATING = 1 << 0;
        /// At least one animation is still playing.
        const ANIMATIONS_RUNNING = 1 << 1;
        /// Messages arrived while the frame was in progress.
        const MESSAGES_PENDING = 1 << 2;
        /// Scene output changed; the frame's instructions should be
        /// rendered.
        const RENDER_NEEDED = 1 << 3;
    }
}

/// Result of one orchestrator pass.
#[derive(Debug)]
pub struct FrameOutput {
    /// Frame flags for the scheduling decision.
    pub status: UpdateStatus,
    /// The frozen frame, present when [`UpdateStatus::RENDER_NEEDED`].
    pub submission: Option<FrameSubmission>,
}

/// One render task: a camera defining the view of the default output.
#[derive(Debug, Clone, Copy, Default)]
struct RenderTask {
    camera: Option<NodeHandle>,
}

/// A GPU release waiting for its discard window and fence.
#[derive(Debug)]
struct PendingGpuRelease {
    command: RenderCommand,
    /// Frame the destroy was requested in.
    requested_frame: u64,
    /// Last frame submitted at request time; the release additionally
    /// waits until that frame's GPU work was observed complete.
    fence_frame: u64,
}

/// Runs the per-frame algorithm on the update thread.
///
/// Per frame, in order: (1) drain and apply the message queue; (2) run the
/// resetter pass; (3) run animations; (4) apply constraints; (5) propagate
/// dirty flags and recompute world state top-down; (6)+(7) collect visible
/// renderables and assemble sorted render instructions; (8) poll render
/// trackers; (9) advance discard queues and release elapsed entries;
/// (10) swap the buffer index.
pub struct UpdateManager {
    scene: SceneGraph,
    queue: Arc<MessageQueue>,
    scratch: Vec<SceneMessage>,
    tracker: Arc<BufferIndexTracker>,
    animations: AnimationEngine,
    constraints: ConstraintEngine,
    resetters: ResetterManager,
    node_discards: DiscardQueue<(NodeHandle, Arc<Node>)>,
    renderer_discards: DiscardQueue<(RendererHandle, Arc<Renderer>)>,
    gpu_releases: Vec<PendingGpuRelease>,
    render_commands: RenderCommandSender,
    render_tasks: Vec<RenderTask>,
    /// Trackers of submitted frames, oldest first.
    in_flight: VecDeque<(u64, Arc<RenderTracker>)>,
    /// Highest frame whose GPU work was observed complete.
    gpu_complete_frame: u64,
    last_submitted_frame: u64,
    frame: u64,
}

impl UpdateManager {
    /// Builds the update side of the engine around the shared pieces.
    pub fn new(
        queue: Arc<MessageQueue>,
        tracker: Arc<BufferIndexTracker>,
        node_handles: Arc<HandleAllocator<Node>>,
        renderer_handles: Arc<HandleAllocator<Renderer>>,
        render_commands: RenderCommandSender,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            scene: SceneGraph::new(node_handles, renderer_handles),
            queue,
            scratch: Vec::new(),
            tracker,
            animations: AnimationEngine::new(notifier),
            constraints: ConstraintEngine::new(),
            resetters: ResetterManager::new(),
            node_discards: DiscardQueue::new(),
            renderer_discards: DiscardQueue::new(),
            gpu_releases: Vec::new(),
            render_commands,
            render_tasks: vec![RenderTask::default()],
            in_flight: VecDeque::new(),
            gpu_complete_frame: 0,
            last_submitted_frame: 0,
            frame: 0,
        }
    }

    /// The scene, for update-side consumers and tests.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Runs one frame. `elapsed_seconds` is the time advance of the
    /// animation clock for this frame.
    pub fn update(&mut self, elapsed_seconds: f32) -> FrameOutput {
        if self.frame == 0 {
            self.queue.bind_consumer();
        }
        self.frame += 1;
        let index = self.tracker.update_buffer_index();
        log::trace!("Update frame {} (buffer index {index})", self.frame);

        // (1) Messages, in exact enqueue order.
        let mut scratch = std::mem::take(&mut self.scratch);
        self.queue.take(&mut scratch);
        let messages_applied = scratch.len();
        for message in scratch.drain(..) {
            self.process_message(message, index);
        }
        self.scratch = scratch;

        // (2) Reset written properties to their base values.
        self.resetters.reset_all(&self.scene, index);

        // (3) Animations.
        let animations_running =
            self.animations
                .update(&self.scene, index, elapsed_seconds, &mut self.resetters);

        // (4) Constraints, after all animators.
        let constraints_applied =
            self.constraints
                .apply_all(&self.scene, index, &mut self.resetters);

        // (5) Dirty propagation and world recomputation.
        let world_changed = self.scene.update_world(index);

        // (6)+(7) Collect and assemble the frame's instructions.
        let render_needed =
            messages_applied > 0 || animations_running > 0 || constraints_applied > 0 || world_changed;
        let submission = if render_needed {
            let instructions = self.build_instructions(index);
            let tracker = Arc::new(RenderTracker::new());
            self.in_flight.push_back((self.frame, tracker.clone()));
            self.last_submitted_frame = self.frame;
            Some(FrameSubmission {
                frame: self.frame,
                instructions,
                tracker,
            })
        } else {
            None
        };

        // (8) Learn which submitted frames the GPU has finished.
        while let Some((frame, tracker)) = self.in_flight.front() {
            if tracker.is_synced() {
                self.gpu_complete_frame = *frame;
                self.in_flight.pop_front();
            } else {
                break;
            }
        }

        // (9) Advance discard counters and release elapsed entries.
        self.advance_discards();

        // (10) The frame's single synchronization edge.
        self.tracker.swap();

        let mut status = UpdateStatus::empty();
        if animations_running > 0 {
            status |= UpdateStatus::ANIMATIONS_RUNNING | UpdateStatus::KEEP_UPDATING;
        }
        if !self.queue.is_empty() {
            status |= UpdateStatus::MESSAGES_PENDING | UpdateStatus::KEEP_UPDATING;
        }
        if render_needed {
            status |= UpdateStatus::RENDER_NEEDED;
        }
        if !self.node_discards.is_empty()
            || !self.renderer_discards.is_empty()
            || !self.gpu_releases.is_empty()
            || !self.in_flight.is_empty()
        {
            status |= UpdateStatus::KEEP_UPDATING;
        }
        FrameOutput { status, submission }
    }

    fn process_message(&mut self, message: SceneMessage, index: BufferIndex) {
        match message {
            SceneMessage::InstallNode { handle, node } => {
                self.scene.install_node(handle, node);
            }
            SceneMessage::AddChild { parent, child } => {
                if !self.scene.add_child(parent, child) {
                    log::warn!("AddChild dropped: {parent:?} or {child:?} not alive");
                }
            }
            SceneMessage::RemoveNode { handle } => {
                let frame = self.frame;
                for (removed_handle, node) in self.scene.remove_node(handle) {
                    self.resetters
                        .discard_owner(TargetOwner::Node(removed_handle));
                    self.node_discards.push((removed_handle, node), frame);
                }
            }
            SceneMessage::InstallRenderer { handle, renderer } => {
                self.scene.install_renderer(handle, renderer);
            }
            SceneMessage::AttachRenderer { node, renderer } => {
                if !self.scene.attach_renderer(node, renderer) {
                    log::warn!("AttachRenderer dropped: {node:?} or {renderer:?} not alive");
                }
            }
            SceneMessage::RemoveRenderer { handle } => {
                if let Some(renderer) = self.scene.remove_renderer(handle) {
                    self.resetters.discard_owner(TargetOwner::Renderer(handle));
                    self.renderer_discards.push((handle, renderer), self.frame);
                }
            }
            SceneMessage::BakeProperty { owner, key, value } => {
                match self.scene.resolve_property(owner, key) {
                    Ok(slot) => match slot.bake(index, &value) {
                        Ok(()) => self.resetters.register_bake(owner, key),
                        Err(error) => {
                            // Wrong value kind is a programmer error, not a
                            // runtime condition.
                            debug_assert!(false, "BakeProperty: {error}");
                            log::error!("BakeProperty dropped: {error}");
                        }
                    },
                    Err(error) => {
                        // The owner may have been legitimately destroyed by
                        // an earlier message this frame.
                        log::debug!("BakeProperty on {owner:?} dropped: {error}");
                    }
                }
            }
            SceneMessage::PlayAnimation { id, definition } => {
                self.animations.play(id, definition, &mut self.resetters);
            }
            SceneMessage::StopAnimation { id } => {
                self.animations
                    .stop(id, &self.scene, index, &mut self.resetters);
            }
            SceneMessage::AttachConstraint { id, definition } => {
                self.constraints.attach(id, definition, &mut self.resetters);
            }
            SceneMessage::DetachConstraint { id } => {
                self.constraints
                    .detach(id, &self.scene, index, &mut self.resetters);
            }
            SceneMessage::ActivateConstraint { id } => {
                self.constraints.activate(id);
            }
            SceneMessage::SetCamera { node } => {
                self.render_tasks[0].camera = node;
            }
            SceneMessage::CreateGeometry {
                id,
                descriptor,
                ticket,
            } => {
                self.forward_command(RenderCommand::CreateGeometry {
                    id,
                    descriptor,
                    ticket,
                });
            }
            SceneMessage::DestroyGeometry { id } => {
                self.defer_gpu_release(RenderCommand::DestroyGeometry { id });
            }
            SceneMessage::CreateTexture {
                id,
                descriptor,
                ticket,
            } => {
                self.forward_command(RenderCommand::CreateTexture {
                    id,
                    descriptor,
                    ticket,
                });
            }
            SceneMessage::DestroyTexture { id } => {
                self.defer_gpu_release(RenderCommand::DestroyTexture { id });
            }
            SceneMessage::CreateShader {
                id,
                descriptor,
                ticket,
            } => {
                self.forward_command(RenderCommand::CreateShader {
                    id,
                    descriptor,
                    ticket,
                });
            }
        }
    }

    fn forward_command(&self, command: RenderCommand) {
        if let Err(error) = self.render_commands.send(command) {
            log::warn!("Render queue disconnected, dropping command: {error}");
        }
    }

    fn defer_gpu_release(&mut self, command: RenderCommand) {
        self.gpu_releases.push(PendingGpuRelease {
            command,
            requested_frame: self.frame,
            fence_frame: self.last_submitted_frame,
        });
    }

    fn advance_discards(&mut self) {
        for (handle, node) in self.node_discards.advance(self.frame) {
            log::trace!("Releasing node {handle:?}");
            self.scene.node_handle_allocator().release(handle);
            drop(node);
        }
        for (handle, renderer) in self.renderer_discards.advance(self.frame) {
            log::trace!("Releasing renderer {handle:?}");
            self.scene.renderer_handle_allocator().release(handle);
            drop(renderer);
        }

        let frame = self.frame;
        let complete = self.gpu_complete_frame;
        let commands = &self.render_commands;
        self.gpu_releases.retain(|pending| {
            let held = frame < pending.requested_frame + u64::from(DISCARD_FRAME_COUNT)
                || complete < pending.fence_frame;
            if !held {
                if let Err(error) = commands.send(pending.command.clone()) {
                    log::warn!("Render queue disconnected, dropping release: {error}");
                }
            }
            held
        });
    }

    fn build_instructions(&self, index: BufferIndex) -> Vec<RenderInstruction> {
        let mut instructions = Vec::with_capacity(self.render_tasks.len());
        for task in &self.render_tasks {
            let view = task
                .camera
                .and_then(|camera| self.scene.node(camera))
                .map(|camera| camera.world_matrix.get(index).inverse())
                .unwrap_or(Mat4::IDENTITY);

            let mut instruction = RenderInstruction {
                view,
                ..RenderInstruction::default()
            };
            self.scene.for_each_visible(index, &mut |node| {
                let world = node.world_matrix.get(index);
                let world_color = node.world_color.get(index);
                let depth = -(view * world).w_axis.z;
                for &handle in node.renderers().iter() {
                    let Some(renderer) = self.scene.renderer(handle) else {
                        continue;
                    };
                    let item = RenderItem {
                        world,
                        color: world_color.modulate(renderer.mix_color.get(index)),
                        geometry: renderer.geometry(),
                        texture: renderer.texture(),
                        shader: renderer.shader(),
                        depth,
                    };
                    if renderer.is_opaque(index, world_color) {
                        instruction.opaque.push(item);
                    } else {
                        instruction.transparent.push(item);
                    }
                }
            });
            instruction.sort();
            instructions.push(instruction);
        }
        instructions
    }
}
