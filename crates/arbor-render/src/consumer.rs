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

//! The render consumer: replays frozen frames against the graphics
//! controller.

use crate::instruction::FrameSubmission;
use crate::queue::{RenderCommand, RenderCommandReceiver};
use crate::tracker::RenderTracker;
use arbor_core::graphics::GraphicsController;
use arbor_core::notification::{self, Notification, NotificationSender, ResourceTicket};
use std::sync::Arc;

/// Runs on the render thread: applies queued resource commands in FIFO
/// order, submits each instruction's draw list in order, arms the frame
/// tracker, and keeps polling armed trackers from previous frames.
///
/// Resource failures never cross the thread boundary as panics; they are
/// converted into [`Notification::ResourceReady`] outcomes for the logic
/// thread.
pub struct RenderConsumer {
    controller: Arc<dyn GraphicsController>,
    commands: RenderCommandReceiver,
    notifier: NotificationSender,
    /// Trackers from submitted frames whose fences are still pending.
    armed: Vec<Arc<RenderTracker>>,
    frames_rendered: u64,
}

impl RenderConsumer {
    /// Creates a consumer over a backend and the command stream.
    pub fn new(
        controller: Arc<dyn GraphicsController>,
        commands: RenderCommandReceiver,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            controller,
            commands,
            notifier,
            armed: Vec::new(),
            frames_rendered: 0,
        }
    }

    /// Frames rendered since construction.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Drains and applies every queued resource command, preserving enqueue
    /// order. Safe to call between frames while idle.
    pub fn process_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply_command(command);
        }
    }

    fn report(&self, ticket: ResourceTicket, outcome: Result<(), arbor_core::graphics::ResourceError>) {
        if let Err(ref error) = outcome {
            log::error!("Resource request {ticket:?} failed: {error}");
        }
        notification::publish(
            &self.notifier,
            Notification::ResourceReady { ticket, outcome },
        );
    }

    fn apply_command(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::CreateGeometry {
                id,
                descriptor,
                ticket,
            } => {
                let outcome = self.controller.create_geometry(id, &descriptor);
                self.report(ticket, outcome);
            }
            RenderCommand::DestroyGeometry { id } => {
                if let Err(error) = self.controller.destroy_geometry(id) {
                    log::warn!("Destroying geometry {}: {error}", id.0);
                }
            }
            RenderCommand::CreateTexture {
                id,
                descriptor,
                ticket,
            } => {
                let outcome = self.controller.create_texture(id, &descriptor);
                self.report(ticket, outcome);
            }
            RenderCommand::DestroyTexture { id } => {
                if let Err(error) = self.controller.destroy_texture(id) {
                    log::warn!("Destroying texture {}: {error}", id.0);
                }
            }
            RenderCommand::CreateShader {
                id,
                descriptor,
                ticket,
            } => {
                let outcome = self.controller.create_shader(id, &descriptor);
                self.report(ticket, outcome);
            }
            RenderCommand::DestroyShader { id } => {
                if let Err(error) = self.controller.destroy_shader(id) {
                    log::warn!("Destroying shader {}: {error}", id.0);
                }
            }
        }
    }

    /// Renders one frozen frame: commands first, then every instruction's
    /// draw list in instruction order, then the frame tracker is armed and
    /// previous trackers are polled.
    pub fn render_frame(&mut self, submission: FrameSubmission) {
        self.process_commands();

        for instruction in &submission.instructions {
            if instruction.is_empty() {
                continue;
            }
            if let Err(error) = self
                .controller
                .submit_draw_list(&instruction.to_submission(submission.frame))
            {
                // A failed submission loses the frame's output but must not
                // take the thread down; scene state is untouched.
                log::error!("Frame {} submission failed: {error}", submission.frame);
            }
        }

        submission.tracker.arm(self.controller.create_sync_object());
        self.armed.push(submission.tracker);
        self.frames_rendered += 1;
        log::trace!("Rendered frame {}", submission.frame);

        self.poll_trackers();
    }

    /// Polls armed trackers, dropping the ones whose fences have signaled.
    pub fn poll_trackers(&mut self) {
        self.armed.retain(|tracker| tracker.poll());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{RenderInstruction, RenderItem};
    use crate::queue::render_command_channel;
    use arbor_core::color::Color;
    use arbor_core::graphics::{
        GeometryDescriptor, GeometryId, NullGraphicsController, RecordedCall, TextureDescriptor,
        TextureFormat, TextureId,
    };
    use arbor_core::notification::NotificationBus;
    use glam::Mat4;

    fn geometry_descriptor() -> GeometryDescriptor {
        GeometryDescriptor {
            label: None,
            vertex_data: vec![0u8; 36],
            vertex_stride: 12,
            indices: None,
        }
    }

    fn harness() -> (
        Arc<NullGraphicsController>,
        crate::queue::RenderCommandSender,
        NotificationBus,
        RenderConsumer,
    ) {
        let backend = Arc::new(NullGraphicsController::new());
        let (sender, receiver) = render_command_channel();
        let bus = NotificationBus::new();
        let consumer = RenderConsumer::new(backend.clone(), receiver, bus.sender());
        (backend, sender, bus, consumer)
    }

    #[test]
    fn commands_apply_in_fifo_order_before_draws() {
        let (backend, sender, _bus, mut consumer) = harness();
        sender
            .send(RenderCommand::CreateGeometry {
                id: GeometryId(1),
                descriptor: geometry_descriptor(),
                ticket: ResourceTicket(0),
            })
            .unwrap();

        let instruction = RenderInstruction {
            view: Mat4::IDENTITY,
            opaque: vec![RenderItem {
                world: Mat4::IDENTITY,
                color: Color::WHITE,
                geometry: GeometryId(1),
                texture: None,
                shader: None,
                depth: 0.0,
            }],
            transparent: Vec::new(),
        };
        consumer.render_frame(FrameSubmission {
            frame: 1,
            instructions: vec![instruction],
            tracker: Arc::new(RenderTracker::new()),
        });

        // The geometry creation must precede the draw that references it.
        assert_eq!(
            backend.recorded_calls(),
            vec![
                RecordedCall::CreateGeometry(GeometryId(1)),
                RecordedCall::Submit { frame: 1, calls: 1 },
            ]
        );
    }

    #[test]
    fn failed_creation_is_reported_as_notification() {
        let (_backend, sender, bus, mut consumer) = harness();
        let bad = TextureDescriptor {
            label: None,
            width: 4,
            height: 4,
            format: TextureFormat::Rgba8,
            pixels: vec![0u8; 3],
        };
        sender
            .send(RenderCommand::CreateTexture {
                id: TextureId(9),
                descriptor: bad,
                ticket: ResourceTicket(42),
            })
            .unwrap();
        consumer.process_commands();

        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        match &drained[0] {
            Notification::ResourceReady { ticket, outcome } => {
                assert_eq!(*ticket, ResourceTicket(42));
                assert!(outcome.is_err());
            }
            other => panic!("Unexpected notification: {other:?}"),
        }
    }

    #[test]
    fn frame_tracker_is_armed_and_completes() {
        let (_backend, _sender, _bus, mut consumer) = harness();
        let tracker = Arc::new(RenderTracker::new());
        consumer.render_frame(FrameSubmission {
            frame: 1,
            instructions: Vec::new(),
            tracker: tracker.clone(),
        });
        // Null backend fences signal immediately and render_frame polls.
        assert!(tracker.is_synced());
        assert_eq!(consumer.frames_rendered(), 1);
    }
}
