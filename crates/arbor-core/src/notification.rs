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

//! The notification path from the update/render threads back to the logic
//! thread.
//!
//! Nothing on the update or render thread ever calls back into logic-side
//! code directly. Completion events (an animation finishing, a GPU resource
//! becoming ready or failing) are published here and drained by the logic
//! thread when it is idle or on its next cycle. Within one drain the order
//! is insertion order; no ordering is guaranteed relative to messages the
//! logic thread enqueues afterwards.

use crate::graphics::error::ResourceError;

/// Identifies an animation across the thread boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(
    /// Raw id value, allocated by the logic side.
    pub u32,
);

/// Identifies a constraint across the thread boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(
    /// Raw id value, allocated by the logic side.
    pub u32,
);

/// Correlates an asynchronous resource request with its completion
/// notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceTicket(
    /// Raw ticket value, allocated by the logic side.
    pub u32,
);

/// An event delivered to the logic thread.
#[derive(Debug, Clone)]
pub enum Notification {
    /// An animation reached its final loop's end (or was stopped) and left
    /// the active set. Sent exactly once per play.
    AnimationFinished {
        /// The animation that finished.
        animation: AnimationId,
    },
    /// A GPU resource request submitted through the render queue completed.
    ResourceReady {
        /// The ticket issued when the resource was requested.
        ticket: ResourceTicket,
        /// Success, or the backend failure. Failures are reported here and
        /// never panic across the thread boundary.
        outcome: Result<(), ResourceError>,
    },
}

/// Many-producer, single-consumer channel carrying [`Notification`]s to the
/// logic thread.
///
/// The update and render threads each hold a [`NotificationSender`]; the
/// logic side drains with [`NotificationBus::drain`].
#[derive(Debug)]
pub struct NotificationBus {
    sender: flume::Sender<Notification>,
    receiver: flume::Receiver<Notification>,
}

/// Cloneable producer handle for the bus.
pub type NotificationSender = flume::Sender<Notification>;

impl NotificationBus {
    /// Creates an unbounded bus.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Returns a producer handle for an update- or render-side subsystem.
    pub fn sender(&self) -> NotificationSender {
        self.sender.clone()
    }

    /// Takes every notification currently queued, in insertion order.
    ///
    /// Never blocks; returns an empty vector when nothing is pending.
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }

    /// Whether any notification is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes a notification, logging instead of panicking if the logic side
/// already shut down.
pub fn publish(sender: &NotificationSender, notification: Notification) {
    if let Err(e) = sender.send(notification) {
        log::warn!("Dropping notification, logic side disconnected: {e}");
    }
}
