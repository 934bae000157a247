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

//! Renderer owners: the drawable leaves of the scene.

use crate::arena::Handle;
use crate::double_buffered::OwnedByUpdate;
use crate::property::AnimatableProperty;
use arbor_core::buffer::BufferIndex;
use arbor_core::color::Color;
use arbor_core::graphics::{GeometryId, ShaderId, TextureId};

/// Handle to a renderer in the scene arena.
pub type RendererHandle = Handle<Renderer>;

/// A drawable attached to a node: geometry plus material inputs.
///
/// The mix color is animatable; it multiplies the owning node's world color
/// when the draw item is built. Resource ids reference GPU objects created
/// through the render queue; the ids are valid scene-side before the
/// resources exist backend-side.
#[derive(Debug)]
pub struct Renderer {
    geometry: OwnedByUpdate<GeometryId>,
    texture: OwnedByUpdate<Option<TextureId>>,
    shader: OwnedByUpdate<Option<ShaderId>>,
    /// Whether the material is opaque when its colors are; translucent
    /// materials force the blending path regardless of color.
    opaque_material: OwnedByUpdate<bool>,
    /// Color multiplied into the node's world color per draw.
    pub mix_color: AnimatableProperty<Color>,
}

impl Renderer {
    /// Creates an opaque renderer over a geometry.
    pub fn new(geometry: GeometryId) -> Self {
        Self {
            geometry: OwnedByUpdate::new(geometry),
            texture: OwnedByUpdate::new(None),
            shader: OwnedByUpdate::new(None),
            opaque_material: OwnedByUpdate::new(true),
            mix_color: AnimatableProperty::new(Color::WHITE),
        }
    }

    /// Builder-style texture assignment, for construction on the logic
    /// thread before the install message is sent.
    pub fn with_texture(self, texture: TextureId) -> Self {
        self.texture.store(Some(texture));
        self
    }

    /// Builder-style shader assignment.
    pub fn with_shader(self, shader: ShaderId) -> Self {
        self.shader.store(Some(shader));
        self
    }

    /// Builder-style blending requirement.
    pub fn with_translucent_material(self) -> Self {
        self.opaque_material.store(false);
        self
    }

    /// The geometry drawn by this renderer. Update thread only.
    pub fn geometry(&self) -> GeometryId {
        self.geometry.load()
    }

    /// Bound texture, if any. Update thread only.
    pub fn texture(&self) -> Option<TextureId> {
        self.texture.load()
    }

    /// Bound shader, if any. Update thread only.
    pub fn shader(&self) -> Option<ShaderId> {
        self.shader.load()
    }

    /// Rebinds the texture. Update thread only (via message).
    pub fn set_texture(&self, texture: Option<TextureId>) {
        self.texture.store(texture);
    }

    /// Whether a draw of this renderer is opaque given the final color the
    /// item will carry.
    pub fn is_opaque(&self, index: BufferIndex, inherited: Color) -> bool {
        self.opaque_material.load()
            && inherited.is_opaque()
            && self.mix_color.get(index).is_opaque()
    }
}
