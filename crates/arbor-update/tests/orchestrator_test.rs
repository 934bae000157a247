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

//! End-to-end contracts of the update orchestrator, driven with a
//! deterministic clock on a single thread (the affinity cells latch the
//! test thread for both queue roles).

use arbor_core::buffer::BufferIndexTracker;
use arbor_core::easing::AlphaFunction;
use arbor_core::graphics::{NullGraphicsController, TextureDescriptor, TextureFormat, TextureId};
use arbor_core::notification::{AnimationId, Notification, NotificationBus, ResourceTicket};
use arbor_core::property::PropertyValue;
use arbor_render::{render_command_channel, RenderCommandReceiver, RenderConsumer};
use arbor_scene::{HandleAllocator, Node, NodeHandle, PropertyKey, TargetOwner};
use arbor_update::{
    AnimationDefinition, MessageQueue, SceneMessage, TimePeriod, UpdateManager, UpdateStatus,
};
use glam::Vec3;
use std::sync::{Arc, Weak};

struct Harness {
    manager: UpdateManager,
    queue: Arc<MessageQueue>,
    tracker: Arc<BufferIndexTracker>,
    bus: NotificationBus,
    commands: RenderCommandReceiver,
    backend: Arc<NullGraphicsController>,
    consumer: RenderConsumer,
}

impl Harness {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let queue = Arc::new(MessageQueue::new(16));
        let tracker = Arc::new(BufferIndexTracker::new());
        let (sender, receiver) = render_command_channel();
        let bus = NotificationBus::new();
        let backend = Arc::new(NullGraphicsController::new());
        let consumer = RenderConsumer::new(backend.clone(), receiver.clone(), bus.sender());
        let manager = UpdateManager::new(
            queue.clone(),
            tracker.clone(),
            HandleAllocator::new(),
            HandleAllocator::new(),
            sender,
            bus.sender(),
        );
        Self {
            manager,
            queue,
            tracker,
            bus,
            commands: receiver,
            backend,
            consumer,
        }
    }

    /// One update frame plus the render thread's share of the work.
    fn frame(&mut self, dt: f32) -> UpdateStatus {
        let output = self.manager.update(dt);
        if let Some(submission) = output.submission {
            self.consumer.render_frame(submission);
        } else {
            self.consumer.process_commands();
        }
        output.status
    }

    fn create_node(&mut self) -> (NodeHandle, Arc<Node>) {
        let handle = self.manager.scene().node_handle_allocator().reserve();
        let node = Arc::new(Node::new());
        self.queue.enqueue(SceneMessage::InstallNode {
            handle,
            node: node.clone(),
        });
        self.queue.enqueue(SceneMessage::AddChild {
            parent: self.manager.scene().root(),
            child: handle,
        });
        (handle, node)
    }

    fn set_position(&mut self, handle: NodeHandle, position: Vec3) {
        self.queue.enqueue(SceneMessage::BakeProperty {
            owner: TargetOwner::Node(handle),
            key: PropertyKey::Position,
            value: PropertyValue::Vector3(position),
        });
    }

    fn event_index(&self) -> usize {
        self.tracker.event_buffer_index()
    }
}

#[test]
fn carry_forward_law_holds_for_all_following_frames() {
    let mut harness = Harness::new();
    let (handle, node) = harness.create_node();
    harness.set_position(handle, Vec3::new(3.0, 2.0, 1.0));

    // No animator or constraint targets the property: for every subsequent
    // frame, the committed value must be readable through the event index.
    for frame in 1..=6 {
        harness.frame(0.016);
        assert_eq!(
            node.position.get(harness.event_index()),
            Vec3::new(3.0, 2.0, 1.0),
            "carry-forward failed at frame {frame}"
        );
    }
}

#[test]
fn messages_apply_in_fifo_order_with_causal_effects() {
    let mut harness = Harness::new();
    // Create-then-set causality within one batch relies purely on FIFO
    // order.
    let (handle, node) = harness.create_node();
    harness.set_position(handle, Vec3::new(1.0, 0.0, 0.0));
    harness.set_position(handle, Vec3::new(2.0, 0.0, 0.0));
    harness.set_position(handle, Vec3::new(3.0, 0.0, 0.0));
    harness.frame(0.016);

    // Last enqueued write is the committed one.
    assert_eq!(node.position.base_value(), Vec3::new(3.0, 0.0, 0.0));
    assert_eq!(
        node.position.get(harness.event_index()),
        Vec3::new(3.0, 0.0, 0.0)
    );
}

#[test]
fn end_to_end_node_animation_scenario() {
    let mut harness = Harness::new();
    let (handle, node) = harness.create_node();
    harness.set_position(handle, Vec3::ZERO);
    harness.frame(0.016);

    // World transform of the freshly placed node is the identity
    // translation.
    let world = node.world_matrix.get(harness.event_index());
    assert_eq!(world.w_axis.truncate(), Vec3::ZERO);

    // Animate position to (10, 0, 0) over one second.
    harness.queue.enqueue(SceneMessage::PlayAnimation {
        id: AnimationId(1),
        definition: AnimationDefinition::new(1.0).animate_to(
            TargetOwner::Node(handle),
            PropertyKey::Position,
            PropertyValue::Vector3(Vec3::new(10.0, 0.0, 0.0)),
            AlphaFunction::Linear,
            TimePeriod::from_duration(1.0),
        ),
    });

    // Advance the update clock by 0.5s: the interpolated X must be
    // strictly between the endpoints.
    let status = harness.frame(0.5);
    assert!(status.contains(UpdateStatus::ANIMATIONS_RUNNING));
    let x = node.position.get(harness.event_index()).x;
    assert!(x > 0.0 && x < 10.0, "mid-animation X out of range: {x}");
    let world_x = node.world_matrix.get(harness.event_index()).w_axis.x;
    assert!((world_x - x).abs() < 1e-5, "world transform must follow");

    // Advance to 1.1s total: the animation completed and reported
    // Finished exactly once.
    let status = harness.frame(0.6);
    assert!(!status.contains(UpdateStatus::ANIMATIONS_RUNNING));
    assert_eq!(node.position.get(harness.event_index()).x, 10.0);

    let finished: Vec<_> = harness
        .bus
        .drain()
        .into_iter()
        .filter(|n| matches!(n, Notification::AnimationFinished { .. }))
        .collect();
    assert_eq!(finished.len(), 1, "Finished must be reported exactly once");

    // Further frames keep the baked value.
    harness.frame(0.016);
    harness.frame(0.016);
    assert_eq!(node.position.get(harness.event_index()).x, 10.0);
    assert!(harness.bus.drain().is_empty());
}

#[test]
fn destroyed_owner_is_freed_only_after_two_more_frames() {
    let mut harness = Harness::new();
    let (handle, node) = harness.create_node();
    harness.frame(0.016);

    let weak: Weak<Node> = Arc::downgrade(&node);
    drop(node);
    harness.queue.enqueue(SceneMessage::RemoveNode { handle });

    // Frame F: the removal is processed and the owner is discard-queued.
    harness.frame(0.016);
    assert!(
        weak.upgrade().is_some(),
        "owner must survive the removal frame"
    );
    assert!(!harness.manager.scene().node_alive(handle));

    // Frame F+1: still covered by the in-flight buffer index.
    harness.frame(0.016);
    assert!(weak.upgrade().is_some(), "owner must survive frame F+1");

    // Frame F+2: the discard counter elapses and the owner is freed.
    harness.frame(0.016);
    assert!(weak.upgrade().is_none(), "owner must be freed at frame F+2");
}

#[test]
fn destroy_and_immediately_pump_two_cycles_stress() {
    let mut harness = Harness::new();
    let mut weaks = Vec::new();
    for _ in 0..8 {
        let (handle, node) = harness.create_node();
        weaks.push(Arc::downgrade(&node));
        drop(node);
        harness.queue.enqueue(SceneMessage::RemoveNode { handle });
        harness.frame(0.001);
        harness.frame(0.001);
    }
    // Every owner either alive in its window or freed afterwards; the last
    // removal is exactly at its F+1 frame.
    harness.frame(0.001);
    for (i, weak) in weaks.iter().enumerate() {
        assert!(weak.upgrade().is_none(), "owner {i} leaked past its window");
    }
}

#[test]
fn stale_handle_is_rejected_after_slot_reuse() {
    let mut harness = Harness::new();
    let (old_handle, _node) = harness.create_node();
    harness.queue.enqueue(SceneMessage::RemoveNode { handle: old_handle });
    for _ in 0..3 {
        harness.frame(0.016);
    }

    // The slot is recycled under a new generation.
    let (new_handle, new_node) = harness.create_node();
    harness.set_position(old_handle, Vec3::new(9.0, 9.0, 9.0));
    harness.frame(0.016);

    if new_handle.index() == old_handle.index() {
        assert_ne!(new_handle.generation(), old_handle.generation());
    }
    // The write through the stale handle must not reach the new owner.
    assert_eq!(new_node.position.base_value(), Vec3::ZERO);
}

#[test]
fn texture_lifecycle_defers_destruction_past_in_flight_frames() {
    let mut harness = Harness::new();
    let id = TextureId(1);
    let descriptor = TextureDescriptor {
        label: Some("test".to_string()),
        width: 1,
        height: 1,
        format: TextureFormat::Rgba8,
        pixels: vec![255; 4],
    };
    harness.queue.enqueue(SceneMessage::CreateTexture {
        id,
        descriptor,
        ticket: ResourceTicket(1),
    });
    harness.frame(0.016);
    assert!(harness.backend.has_texture(id));

    // Completion notification reached the logic side.
    let ready = harness
        .bus
        .drain()
        .into_iter()
        .any(|n| matches!(n, Notification::ResourceReady { ticket, outcome: Ok(()) } if ticket == ResourceTicket(1)));
    assert!(ready);

    harness.queue.enqueue(SceneMessage::DestroyTexture { id });
    harness.frame(0.016);
    assert!(
        harness.backend.has_texture(id),
        "texture must outlive the destroy frame"
    );
    harness.frame(0.016);
    harness.frame(0.016);
    harness.frame(0.016);
    assert!(
        !harness.backend.has_texture(id),
        "texture must be released after the discard window"
    );
    assert!(harness.commands.is_empty());
}
