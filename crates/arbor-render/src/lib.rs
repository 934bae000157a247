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

//! # Arbor Render
//!
//! The update-to-render handoff. The update thread freezes each frame into
//! a [`FrameSubmission`] (render instructions built from committed scene
//! state) and streams GPU resource commands through the render queue; the
//! render thread replays both against the abstract graphics controller and
//! reports fence completion back through [`RenderTracker`]s.
//!
//! Immutability of handed-over instructions is enforced by ownership: a
//! submission is moved into the channel, so the update thread cannot touch
//! it afterwards.

pub mod consumer;
pub mod instruction;
pub mod queue;
pub mod tracker;

pub use consumer::RenderConsumer;
pub use instruction::{FrameSubmission, RenderInstruction, RenderItem};
pub use queue::{render_command_channel, RenderCommand, RenderCommandReceiver, RenderCommandSender};
pub use tracker::RenderTracker;
