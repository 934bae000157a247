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

//! The logic-side proxy for the scene.
//!
//! The `Stage` is how the embedder's (logic) thread talks to the engine:
//! mutations become [`SceneMessage`]s applied by the update thread in FIFO
//! order, while reads go through the event buffer index of the `Arc`
//! mirrors the stage keeps for the owners it created. The stage is not a
//! public API layer; it is the minimal surface the engine's operations
//! need.

use crate::gate::FrameGate;
use arbor_core::buffer::BufferIndexTracker;
use arbor_core::color::Color;
use arbor_core::controller::RenderController;
use arbor_core::graphics::{
    GeometryDescriptor, GeometryId, ShaderDescriptor, ShaderId, TextureDescriptor, TextureId,
};
use arbor_core::notification::{
    AnimationId, ConstraintId, Notification, NotificationBus, ResourceTicket,
};
use arbor_core::property::PropertyValue;
use arbor_core::thread_guard::ThreadAffinityCell;
use arbor_scene::{
    HandleAllocator, Node, NodeHandle, PropertyKey, Renderer, RendererHandle, TargetOwner,
};
use arbor_update::{AnimationDefinition, ConstraintDefinition, MessageQueue, SceneMessage};
use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;
use std::sync::Arc;

/// Logic-thread handle to the scene. All methods must be called from the
/// thread that created the engine; debug builds abort otherwise.
pub struct Stage {
    queue: Arc<MessageQueue>,
    tracker: Arc<BufferIndexTracker>,
    node_handles: Arc<HandleAllocator<Node>>,
    renderer_handles: Arc<HandleAllocator<Renderer>>,
    root: NodeHandle,
    /// Event-side mirrors of the nodes this stage created, for committed
    /// reads through the event index.
    nodes: HashMap<NodeHandle, Arc<Node>>,
    /// Logic-side view of the tree, so destroying a node can drop the
    /// mirrors of its whole subtree.
    children: HashMap<NodeHandle, Vec<NodeHandle>>,
    renderers: HashMap<RendererHandle, Arc<Renderer>>,
    bus: Arc<NotificationBus>,
    controller: Arc<dyn RenderController>,
    gate: Arc<FrameGate>,
    next_animation: u32,
    next_constraint: u32,
    next_ticket: u32,
    next_geometry: u32,
    next_texture: u32,
    next_shader: u32,
    affinity: ThreadAffinityCell,
}

impl Stage {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        queue: Arc<MessageQueue>,
        tracker: Arc<BufferIndexTracker>,
        node_handles: Arc<HandleAllocator<Node>>,
        renderer_handles: Arc<HandleAllocator<Renderer>>,
        root: NodeHandle,
        bus: Arc<NotificationBus>,
        controller: Arc<dyn RenderController>,
        gate: Arc<FrameGate>,
    ) -> Self {
        queue.bind_producer();
        let affinity = ThreadAffinityCell::new("logic");
        affinity.bind_current();
        Self {
            queue,
            tracker,
            node_handles,
            renderer_handles,
            root,
            nodes: HashMap::new(),
            children: HashMap::new(),
            renderers: HashMap::new(),
            bus,
            controller,
            gate,
            next_animation: 0,
            next_constraint: 0,
            next_ticket: 0,
            next_geometry: 0,
            next_texture: 0,
            next_shader: 0,
            affinity,
        }
    }

    /// The root node of the scene.
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    // -- Node lifecycle --

    /// Creates a detached node. Attach it with
    /// [`add_child`](Self::add_child).
    pub fn create_node(&mut self) -> NodeHandle {
        self.affinity.assert_current();
        let handle = self.node_handles.reserve();
        let node = Arc::new(Node::new());
        self.nodes.insert(handle, node.clone());
        self.queue.enqueue(SceneMessage::InstallNode { handle, node });
        handle
    }

    /// Attaches `child` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        self.affinity.assert_current();
        self.children.entry(parent).or_default().push(child);
        self.queue.enqueue(SceneMessage::AddChild { parent, child });
    }

    /// Destroys a node and its subtree. The update side discard-queues the
    /// owners; the stage drops its mirrors immediately.
    pub fn destroy_node(&mut self, handle: NodeHandle) {
        self.affinity.assert_current();
        self.forget_subtree(handle);
        self.queue.enqueue(SceneMessage::RemoveNode { handle });
    }

    fn forget_subtree(&mut self, handle: NodeHandle) {
        self.nodes.remove(&handle);
        if let Some(children) = self.children.remove(&handle) {
            for child in children {
                self.forget_subtree(child);
            }
        }
    }

    // -- Property writes (committed via message) --

    /// Sets a node's local position.
    pub fn set_position(&mut self, node: NodeHandle, position: Vec3) {
        self.bake(TargetOwner::Node(node), PropertyKey::Position, PropertyValue::Vector3(position));
    }

    /// Sets a node's local rotation.
    pub fn set_rotation(&mut self, node: NodeHandle, rotation: Quat) {
        self.bake(
            TargetOwner::Node(node),
            PropertyKey::Rotation,
            PropertyValue::Quaternion(rotation),
        );
    }

    /// Sets a node's local scale.
    pub fn set_scale(&mut self, node: NodeHandle, scale: Vec3) {
        self.bake(TargetOwner::Node(node), PropertyKey::Scale, PropertyValue::Vector3(scale));
    }

    /// Sets a node's color.
    pub fn set_color(&mut self, node: NodeHandle, color: Color) {
        self.bake(TargetOwner::Node(node), PropertyKey::Color, PropertyValue::Color(color));
    }

    /// Shows or hides a node (and its subtree).
    pub fn set_visible(&mut self, node: NodeHandle, visible: bool) {
        self.bake(TargetOwner::Node(node), PropertyKey::Visible, PropertyValue::Bool(visible));
    }

    /// Sets a renderer's mix color.
    pub fn set_mix_color(&mut self, renderer: RendererHandle, color: Color) {
        self.bake(
            TargetOwner::Renderer(renderer),
            PropertyKey::MixColor,
            PropertyValue::Color(color),
        );
    }

    fn bake(&mut self, owner: TargetOwner, key: PropertyKey, value: PropertyValue) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::BakeProperty { owner, key, value });
    }

    // -- Committed reads (event buffer index) --

    /// The node's committed local position.
    pub fn current_position(&self, node: NodeHandle) -> Option<Vec3> {
        self.affinity.assert_current();
        let mirror = self.nodes.get(&node)?;
        Some(mirror.position.get(self.tracker.event_buffer_index()))
    }

    /// The node's committed world transform.
    pub fn current_world_matrix(&self, node: NodeHandle) -> Option<Mat4> {
        self.affinity.assert_current();
        let mirror = self.nodes.get(&node)?;
        Some(mirror.world_matrix.get(self.tracker.event_buffer_index()))
    }

    /// The node's committed color.
    pub fn current_color(&self, node: NodeHandle) -> Option<Color> {
        self.affinity.assert_current();
        let mirror = self.nodes.get(&node)?;
        Some(mirror.color.get(self.tracker.event_buffer_index()))
    }

    /// The node's committed effective visibility.
    pub fn is_visible(&self, node: NodeHandle) -> Option<bool> {
        self.affinity.assert_current();
        let mirror = self.nodes.get(&node)?;
        Some(mirror.world_visible.get(self.tracker.event_buffer_index()))
    }

    // -- Animations and constraints --

    /// Starts an animation; the returned id correlates with the finished
    /// notification.
    pub fn play_animation(&mut self, definition: AnimationDefinition) -> AnimationId {
        self.affinity.assert_current();
        self.next_animation += 1;
        let id = AnimationId(self.next_animation);
        self.queue.enqueue(SceneMessage::PlayAnimation { id, definition });
        id
    }

    /// Stops an animation; takes effect at the next update pass.
    pub fn stop_animation(&mut self, id: AnimationId) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::StopAnimation { id });
    }

    /// Attaches a constraint.
    pub fn attach_constraint(&mut self, definition: ConstraintDefinition) -> ConstraintId {
        self.affinity.assert_current();
        self.next_constraint += 1;
        let id = ConstraintId(self.next_constraint);
        self.queue.enqueue(SceneMessage::AttachConstraint { id, definition });
        id
    }

    /// Detaches a constraint, honoring its removal action.
    pub fn detach_constraint(&mut self, id: ConstraintId) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::DetachConstraint { id });
    }

    /// Re-activates a parked apply-once constraint.
    pub fn activate_constraint(&mut self, id: ConstraintId) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::ActivateConstraint { id });
    }

    // -- Renderers and resources --

    /// Installs a renderer built on the logic thread.
    pub fn create_renderer(&mut self, renderer: Renderer) -> RendererHandle {
        self.affinity.assert_current();
        let handle = self.renderer_handles.reserve();
        let renderer = Arc::new(renderer);
        self.renderers.insert(handle, renderer.clone());
        self.queue
            .enqueue(SceneMessage::InstallRenderer { handle, renderer });
        handle
    }

    /// Attaches a renderer to a node.
    pub fn attach_renderer(&mut self, node: NodeHandle, renderer: RendererHandle) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::AttachRenderer { node, renderer });
    }

    /// Destroys a renderer owner.
    pub fn destroy_renderer(&mut self, handle: RendererHandle) {
        self.affinity.assert_current();
        self.renderers.remove(&handle);
        self.queue.enqueue(SceneMessage::RemoveRenderer { handle });
    }

    /// Selects the camera node of the default render task.
    pub fn set_camera(&mut self, node: Option<NodeHandle>) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::SetCamera { node });
    }

    /// Requests a geometry resource; completion arrives as a
    /// [`Notification::ResourceReady`] with the returned ticket.
    pub fn create_geometry(
        &mut self,
        descriptor: GeometryDescriptor,
    ) -> (GeometryId, ResourceTicket) {
        self.affinity.assert_current();
        self.next_geometry += 1;
        let id = GeometryId(self.next_geometry);
        let ticket = self.next_ticket();
        self.queue
            .enqueue(SceneMessage::CreateGeometry { id, descriptor, ticket });
        (id, ticket)
    }

    /// Releases a geometry resource once in-flight frames are past it.
    pub fn destroy_geometry(&mut self, id: GeometryId) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::DestroyGeometry { id });
    }

    /// Requests a texture resource.
    pub fn create_texture(&mut self, descriptor: TextureDescriptor) -> (TextureId, ResourceTicket) {
        self.affinity.assert_current();
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        let ticket = self.next_ticket();
        self.queue
            .enqueue(SceneMessage::CreateTexture { id, descriptor, ticket });
        (id, ticket)
    }

    /// Releases a texture resource once in-flight frames are past it.
    pub fn destroy_texture(&mut self, id: TextureId) {
        self.affinity.assert_current();
        self.queue.enqueue(SceneMessage::DestroyTexture { id });
    }

    /// Requests a shader compilation.
    pub fn create_shader(&mut self, descriptor: ShaderDescriptor) -> (ShaderId, ResourceTicket) {
        self.affinity.assert_current();
        self.next_shader += 1;
        let id = ShaderId(self.next_shader);
        let ticket = self.next_ticket();
        self.queue
            .enqueue(SceneMessage::CreateShader { id, descriptor, ticket });
        (id, ticket)
    }

    fn next_ticket(&mut self) -> ResourceTicket {
        self.next_ticket += 1;
        ResourceTicket(self.next_ticket)
    }

    // -- Frame control --

    /// Publishes the queued mutations as one logic frame: requests an
    /// update and, if the logic thread is more than the configured lag
    /// ahead, parks until the update thread catches up. The only blocking
    /// point on the logic thread.
    pub fn flush(&mut self) {
        self.affinity.assert_current();
        self.gate.announce();
        self.controller.request_update();
        if !self.bus.is_empty() {
            self.controller.request_process_events_on_idle();
        }
        self.gate.wait_for_slack();
    }

    /// Drains pending notifications (animation finished, resources ready)
    /// in insertion order.
    pub fn process_notifications(&mut self) -> Vec<Notification> {
        self.affinity.assert_current();
        self.bus.drain()
    }

    /// How many logic frames the update thread has yet to consume.
    pub fn update_lag(&self) -> u64 {
        self.gate.lead()
    }
}
