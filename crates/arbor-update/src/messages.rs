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

//! The logic-to-update message queue.
//!
//! Scene mutations never touch update-side state directly from the logic
//! thread; they are described as [`SceneMessage`] values, enqueued in
//! order, and applied by the update thread at the start of the next frame.
//! FIFO order is a hard guarantee: causally ordered effects ("create node,
//! then set its property") rely on it.

use crate::animation::AnimationDefinition;
use crate::constraint::ConstraintDefinition;
use arbor_core::graphics::{
    GeometryDescriptor, GeometryId, ShaderDescriptor, ShaderId, TextureDescriptor, TextureId,
};
use arbor_core::notification::{AnimationId, ConstraintId, ResourceTicket};
use arbor_core::property::PropertyValue;
use arbor_core::thread_guard::ThreadAffinityCell;
use arbor_scene::{Node, NodeHandle, PropertyKey, Renderer, RendererHandle, TargetOwner};
use std::sync::{Arc, Mutex};

/// A deferred scene mutation, applied on the update thread.
#[derive(Debug)]
pub enum SceneMessage {
    /// Install a node created on the logic thread under its reserved
    /// handle.
    InstallNode {
        /// Handle reserved for the node.
        handle: NodeHandle,
        /// The node, ownership transfers to the scene arena.
        node: Arc<Node>,
    },
    /// Attach a node as the last child of a parent.
    AddChild {
        /// The parent node.
        parent: NodeHandle,
        /// The node to attach.
        child: NodeHandle,
    },
    /// Remove a node and its subtree; the owners go to the discard queue.
    RemoveNode {
        /// Root of the subtree to remove.
        handle: NodeHandle,
    },
    /// Install a renderer created on the logic thread.
    InstallRenderer {
        /// Handle reserved for the renderer.
        handle: RendererHandle,
        /// The renderer, ownership transfers to the scene arena.
        renderer: Arc<Renderer>,
    },
    /// Attach a renderer to a node.
    AttachRenderer {
        /// The node drawing the renderer.
        node: NodeHandle,
        /// The renderer to attach.
        renderer: RendererHandle,
    },
    /// Remove a renderer owner; it goes to the discard queue.
    RemoveRenderer {
        /// The renderer to remove.
        handle: RendererHandle,
    },
    /// Commit a property value (write-through to the base value).
    BakeProperty {
        /// The property's owner.
        owner: TargetOwner,
        /// Which property.
        key: PropertyKey,
        /// The committed value.
        value: PropertyValue,
    },
    /// Start playing an animation.
    PlayAnimation {
        /// Id the logic side refers to the animation by.
        id: AnimationId,
        /// What to animate.
        definition: AnimationDefinition,
    },
    /// Stop a playing animation; takes effect at the next orchestrator
    /// pass, never mid-pass.
    StopAnimation {
        /// The animation to stop.
        id: AnimationId,
    },
    /// Attach and activate a constraint.
    AttachConstraint {
        /// Id the logic side refers to the constraint by.
        id: ConstraintId,
        /// The constraint.
        definition: ConstraintDefinition,
    },
    /// Detach a constraint, honoring its removal action.
    DetachConstraint {
        /// The constraint to detach.
        id: ConstraintId,
    },
    /// Re-activate a deactivated apply-once constraint.
    ActivateConstraint {
        /// The constraint to re-activate.
        id: ConstraintId,
    },
    /// Select the camera node of the default render task; `None` restores
    /// the identity view.
    SetCamera {
        /// Camera node, if any.
        node: Option<NodeHandle>,
    },
    /// Create a geometry resource on the render thread.
    CreateGeometry {
        /// Pre-allocated engine-side id.
        id: GeometryId,
        /// Payload forwarded to the render queue.
        descriptor: GeometryDescriptor,
        /// Completion ticket.
        ticket: ResourceTicket,
    },
    /// Destroy a geometry resource once in-flight frames are past it.
    DestroyGeometry {
        /// Id to release.
        id: GeometryId,
    },
    /// Create a texture resource on the render thread.
    CreateTexture {
        /// Pre-allocated engine-side id.
        id: TextureId,
        /// Payload forwarded to the render queue.
        descriptor: TextureDescriptor,
        /// Completion ticket.
        ticket: ResourceTicket,
    },
    /// Destroy a texture resource once in-flight frames are past it.
    DestroyTexture {
        /// Id to release.
        id: TextureId,
    },
    /// Compile a shader on the render thread.
    CreateShader {
        /// Pre-allocated engine-side id.
        id: ShaderId,
        /// Payload forwarded to the render queue.
        descriptor: ShaderDescriptor,
        /// Completion ticket.
        ticket: ResourceTicket,
    },
}

/// Single-producer / single-consumer FIFO of [`SceneMessage`]s.
///
/// The producer (logic thread) appends under a short mutex into a growable
/// buffer; the consumer (update thread) swaps the whole buffer out once per
/// frame and hands its cleared scratch buffer back, so steady state
/// performs no allocation. Enqueueing from any other thread, or draining
/// from any thread but the update thread, aborts in debug builds.
#[derive(Debug)]
pub struct MessageQueue {
    inbox: Mutex<Vec<SceneMessage>>,
    producer: ThreadAffinityCell,
    consumer: ThreadAffinityCell,
}

impl MessageQueue {
    /// Creates a queue with the given initial buffer capacity.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            inbox: Mutex::new(Vec::with_capacity(initial_capacity)),
            producer: ThreadAffinityCell::new("logic"),
            consumer: ThreadAffinityCell::new("update"),
        }
    }

    /// Binds the producer role to the current (logic) thread.
    pub fn bind_producer(&self) {
        self.producer.bind_current();
    }

    /// Binds the consumer role to the current (update) thread.
    pub fn bind_consumer(&self) {
        self.consumer.bind_current();
    }

    /// Appends a message. Logic thread only.
    pub fn enqueue(&self, message: SceneMessage) {
        self.producer.assert_current();
        self.inbox.lock().expect("message queue poisoned").push(message);
    }

    /// Swaps the queued messages into `scratch` (which must be empty) and
    /// leaves `scratch`'s retained capacity behind for the next frame.
    /// Update thread only.
    pub fn take(&self, scratch: &mut Vec<SceneMessage>) {
        self.consumer.assert_current();
        debug_assert!(scratch.is_empty(), "scratch buffer must be drained");
        let mut inbox = self.inbox.lock().expect("message queue poisoned");
        std::mem::swap(&mut *inbox, scratch);
    }

    /// Whether messages are waiting. Callable from either side; the answer
    /// is advisory (the producer may enqueue right after).
    pub fn is_empty(&self) -> bool {
        self.inbox.lock().expect("message queue poisoned").is_empty()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.inbox.lock().expect("message queue poisoned").len()
    }
}
