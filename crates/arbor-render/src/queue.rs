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

//! The update-to-render resource command stream.
//!
//! GPU resource lifecycle requests cross the thread boundary here, the
//! render-side analogue of the logic-to-update scene message queue. The
//! channel preserves FIFO order and the consumer drains it once per frame
//! before drawing, so a create always reaches the backend before any draw
//! that references the resource.

use arbor_core::graphics::{
    GeometryDescriptor, GeometryId, ShaderDescriptor, ShaderId, TextureDescriptor, TextureId,
};
use arbor_core::notification::ResourceTicket;

/// A GPU resource lifecycle request.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Create a geometry under a pre-allocated id and report completion.
    CreateGeometry {
        /// Engine-side id the backend registers the geometry under.
        id: GeometryId,
        /// Vertex/index payload.
        descriptor: GeometryDescriptor,
        /// Ticket for the completion notification.
        ticket: ResourceTicket,
    },
    /// Destroy a geometry. Only issued once the discard queue has cleared
    /// the in-flight frames that might still draw it.
    DestroyGeometry {
        /// Id to release.
        id: GeometryId,
    },
    /// Create a texture under a pre-allocated id and report completion.
    CreateTexture {
        /// Engine-side id the backend registers the texture under.
        id: TextureId,
        /// Pixel payload.
        descriptor: TextureDescriptor,
        /// Ticket for the completion notification.
        ticket: ResourceTicket,
    },
    /// Destroy a texture (discard-gated like geometry).
    DestroyTexture {
        /// Id to release.
        id: TextureId,
    },
    /// Compile a shader under a pre-allocated id and report completion.
    CreateShader {
        /// Engine-side id the backend registers the program under.
        id: ShaderId,
        /// Source payload.
        descriptor: ShaderDescriptor,
        /// Ticket for the completion notification.
        ticket: ResourceTicket,
    },
    /// Destroy a shader.
    DestroyShader {
        /// Id to release.
        id: ShaderId,
    },
}

/// Producer half, held by the update thread.
pub type RenderCommandSender = crossbeam_channel::Sender<RenderCommand>;

/// Consumer half, held by the render thread.
pub type RenderCommandReceiver = crossbeam_channel::Receiver<RenderCommand>;

/// Creates the unbounded FIFO command channel.
pub fn render_command_channel() -> (RenderCommandSender, RenderCommandReceiver) {
    crossbeam_channel::unbounded()
}
