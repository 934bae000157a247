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

//! Engine construction and the update/render thread loops.

use anyhow::Context;

use crate::gate::FrameGate;
use crate::stage::Stage;
use arbor_core::buffer::BufferIndexTracker;
use arbor_core::config::CoreConfiguration;
use arbor_core::controller::RenderController;
use arbor_core::graphics::GraphicsController;
use arbor_core::notification::NotificationBus;
use arbor_render::{render_command_channel, FrameSubmission, RenderConsumer};
use arbor_scene::HandleAllocator;
use arbor_update::{MessageQueue, UpdateManager, UpdateStatus};
use crossbeam_channel::RecvTimeoutError;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct SignalState {
    update_requested: bool,
    shutdown: bool,
}

/// Wakes the update thread for requested or self-scheduled frames.
#[derive(Debug, Default)]
struct UpdateSignal {
    state: Mutex<SignalState>,
    wake: Condvar,
}

impl UpdateSignal {
    fn request_update(&self) {
        self.state
            .lock()
            .expect("update signal poisoned")
            .update_requested = true;
        self.wake.notify_all();
    }

    fn shutdown(&self) {
        self.state.lock().expect("update signal poisoned").shutdown = true;
        self.wake.notify_all();
    }

    /// Parks until an update is requested or shutdown begins. Returns
    /// whether the loop should keep running.
    fn wait_for_request(&self) -> bool {
        let mut state = self.state.lock().expect("update signal poisoned");
        while !state.update_requested && !state.shutdown {
            state = self.wake.wait(state).expect("update signal poisoned");
        }
        state.update_requested = false;
        !state.shutdown
    }

    /// Non-blocking check used while the update loop is self-scheduling.
    fn take_request(&self) -> bool {
        let mut state = self.state.lock().expect("update signal poisoned");
        state.update_requested = false;
        !state.shutdown
    }
}

/// The platform-adaptor side of the scheduling contract, wired to the
/// update thread's wake signal.
struct SignalRenderController {
    signal: Arc<UpdateSignal>,
}

impl RenderController for SignalRenderController {
    fn request_update(&self) {
        self.signal.request_update();
    }

    fn request_process_events_on_idle(&self) {
        // The embedder drains notifications from the stage; nothing to
        // schedule beyond the next natural idle point.
        log::trace!("Idle event processing requested");
    }
}

/// A running engine instance: the update and render threads plus the
/// logic-side [`Stage`].
///
/// Dropping the engine shuts both threads down and releases any parked
/// logic-side flush.
pub struct Engine {
    stage: Stage,
    signal: Arc<UpdateSignal>,
    gate: Arc<FrameGate>,
    update_thread: Option<JoinHandle<()>>,
    render_thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// Spawns the update and render threads around the given backend. The
    /// calling thread becomes the logic thread.
    pub fn new(
        config: CoreConfiguration,
        graphics: Arc<dyn GraphicsController>,
    ) -> anyhow::Result<Self> {
        let queue = Arc::new(MessageQueue::new(config.initial_message_capacity));
        let tracker = Arc::new(BufferIndexTracker::new());
        let node_handles = HandleAllocator::new();
        let renderer_handles = HandleAllocator::new();
        let (command_sender, command_receiver) = render_command_channel();
        let bus = Arc::new(NotificationBus::new());
        let gate = Arc::new(FrameGate::new(config.maximum_update_lag_frames));
        let signal = Arc::new(UpdateSignal::default());

        let manager = UpdateManager::new(
            queue.clone(),
            tracker.clone(),
            node_handles.clone(),
            renderer_handles.clone(),
            command_sender,
            bus.sender(),
        );
        let root = manager.scene().root();

        let (frame_sender, frame_receiver) = crossbeam_channel::unbounded::<FrameSubmission>();

        let update_thread = {
            let signal = signal.clone();
            let gate = gate.clone();
            let interval = config.frame_interval;
            std::thread::Builder::new()
                .name("arbor-update".to_string())
                .spawn(move || update_loop(manager, signal, gate, frame_sender, interval))
                .context("spawning the update thread")?
        };

        let render_thread = {
            let consumer = RenderConsumer::new(graphics, command_receiver, bus.sender());
            std::thread::Builder::new()
                .name("arbor-render".to_string())
                .spawn(move || render_loop(consumer, frame_receiver))
                .context("spawning the render thread")?
        };

        let controller: Arc<dyn RenderController> = Arc::new(SignalRenderController {
            signal: signal.clone(),
        });
        let stage = Stage::new(
            queue,
            tracker,
            node_handles,
            renderer_handles,
            root,
            bus,
            controller,
            gate.clone(),
        );

        log::info!("Arbor engine started (update + render threads)");
        Ok(Self {
            stage,
            signal,
            gate,
            update_thread: Some(update_thread),
            render_thread: Some(render_thread),
        })
    }

    /// The logic-side scene proxy.
    pub fn stage(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.signal.shutdown();
        self.gate.open();
        if let Some(handle) = self.update_thread.take() {
            if handle.join().is_err() {
                log::error!("Update thread terminated with a panic");
            }
        }
        if let Some(handle) = self.render_thread.take() {
            if handle.join().is_err() {
                log::error!("Render thread terminated with a panic");
            }
        }
        log::info!("Arbor engine stopped");
    }
}

fn update_loop(
    mut manager: UpdateManager,
    signal: Arc<UpdateSignal>,
    gate: Arc<FrameGate>,
    frames: crossbeam_channel::Sender<FrameSubmission>,
    interval: Duration,
) {
    let mut keep_updating = false;
    let mut last_tick = Instant::now();
    loop {
        let running = if keep_updating {
            // Self-scheduled frame: pace to the configured interval, then
            // absorb any pending request.
            let since_last = last_tick.elapsed();
            if since_last < interval {
                std::thread::sleep(interval - since_last);
            }
            signal.take_request()
        } else {
            let running = signal.wait_for_request();
            // Idle time must not advance the animation clock.
            last_tick = Instant::now();
            running
        };
        if !running {
            break;
        }

        let now = Instant::now();
        let elapsed = (now - last_tick).as_secs_f32();
        last_tick = now;

        let output = manager.update(elapsed);
        gate.frame_consumed();
        if let Some(submission) = output.submission {
            if frames.send(submission).is_err() {
                log::warn!("Render thread gone; stopping update loop");
                break;
            }
        }
        keep_updating = output.status.contains(UpdateStatus::KEEP_UPDATING);
    }
    log::debug!(
        "Update loop exiting after {} frames",
        manager.frame_count()
    );
    // Dropping `frames` disconnects the render loop.
}

fn render_loop(
    mut consumer: RenderConsumer,
    frames: crossbeam_channel::Receiver<FrameSubmission>,
) {
    loop {
        match frames.recv_timeout(Duration::from_millis(100)) {
            Ok(submission) => consumer.render_frame(submission),
            Err(RecvTimeoutError::Timeout) => {
                // Keep resource commands and fences moving while idle.
                consumer.process_commands();
                consumer.poll_trackers();
            }
            Err(RecvTimeoutError::Disconnected) => {
                consumer.process_commands();
                break;
            }
        }
    }
    log::debug!(
        "Render loop exiting after {} frames",
        consumer.frames_rendered()
    );
}
