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

//! Engine-side resource ids, descriptors, and the frozen draw submission.
//!
//! Ids are allocated on the logic thread when a resource is requested, so
//! scene objects can reference a resource before the render thread has
//! created it; the backend maps each id to its own objects when the
//! creation command reaches it through the render queue.

use crate::color::Color;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Engine-side id of a geometry (vertex + index data) resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(
    /// Raw id value, allocated by the logic side.
    pub u32,
);

/// Engine-side id of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(
    /// Raw id value, allocated by the logic side.
    pub u32,
);

/// Engine-side id of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(
    /// Raw id value, allocated by the logic side.
    pub u32,
);

/// Pixel layout of a texture upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA.
    Rgba8,
    /// 8-bit BGRA.
    Bgra8,
    /// Single 8-bit alpha channel.
    A8,
}

impl TextureFormat {
    /// Bytes per pixel for the format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::A8 => 1,
        }
    }
}

/// Creation parameters and initial contents of a geometry resource.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Raw interleaved vertex data.
    pub vertex_data: Vec<u8>,
    /// Size in bytes of one vertex.
    pub vertex_stride: u32,
    /// Index list; `None` for non-indexed geometry.
    pub indices: Option<Vec<u32>>,
}

impl GeometryDescriptor {
    /// Number of vertices described by the payload.
    pub fn vertex_count(&self) -> u32 {
        if self.vertex_stride == 0 {
            0
        } else {
            (self.vertex_data.len() / self.vertex_stride as usize) as u32
        }
    }
}

/// Creation parameters and initial contents of a texture resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout of `pixels`.
    pub format: TextureFormat,
    /// Tightly packed pixel data, `width * height * bytes_per_pixel` bytes.
    pub pixels: Vec<u8>,
}

impl TextureDescriptor {
    /// Whether the payload length matches the declared dimensions.
    pub fn payload_matches(&self) -> bool {
        self.pixels.len()
            == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Creation parameters of a shader program.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDescriptor {
    /// Optional debug label.
    pub label: Option<String>,
    /// Backend-consumed source text.
    pub source: String,
}

/// Per-draw uniform payload in GPU byte layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// World matrix, column-major.
    pub world: [f32; 16],
    /// Mix color RGBA.
    pub color: [f32; 4],
}

impl DrawUniforms {
    /// Packs a world matrix and mix color for upload.
    pub fn new(world: Mat4, color: Color) -> Self {
        Self {
            world: world.to_cols_array(),
            color: color.to_array(),
        }
    }
}

/// One draw call within a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Geometry to draw.
    pub geometry: GeometryId,
    /// Texture bound to the draw, if any.
    pub texture: Option<TextureId>,
    /// Shader program; `None` selects the backend's default pipeline.
    pub shader: Option<ShaderId>,
    /// Per-draw uniforms (world matrix + mix color).
    pub uniforms: DrawUniforms,
}

/// A frozen, ordered list of draw calls for one render instruction.
///
/// The backend must execute the calls in list order; the core relies on
/// nothing else about submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSubmission {
    /// Frame number the submission belongs to.
    pub frame: u64,
    /// View matrix for the instruction's camera.
    pub view: Mat4,
    /// Draw calls in execution order.
    pub calls: Vec<DrawCall>,
}
