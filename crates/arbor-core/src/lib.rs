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

//! # Arbor Core
//!
//! Foundational crate for the Arbor engine: the double-buffer index
//! contract, the property value model, easing curves, the graphics
//! controller capability surface, and the notification path back to the
//! logic thread.
//!
//! Everything in this crate is either plain data or a trait boundary;
//! scene state and per-frame algorithms live in the higher-level crates.

#![warn(missing_docs)]

pub mod buffer;
pub mod color;
pub mod config;
pub mod controller;
pub mod easing;
pub mod graphics;
pub mod notification;
pub mod property;
pub mod thread_guard;

pub use buffer::{BufferIndex, BufferIndexTracker};
pub use color::Color;
pub use config::CoreConfiguration;
pub use controller::RenderController;
pub use easing::AlphaFunction;
pub use notification::{AnimationId, ConstraintId, Notification, NotificationBus, ResourceTicket};
pub use property::{PropertyKind, PropertyValue};
