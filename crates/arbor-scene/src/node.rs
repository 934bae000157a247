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

//! Scene nodes: the hierarchical property owners of the tree.

use crate::arena::Handle;
use crate::double_buffered::{DoubleBuffered, OwnedByUpdate};
use crate::property::AnimatableProperty;
use crate::renderer::RendererHandle;
use arbor_core::buffer::BufferIndex;
use arbor_core::color::Color;
use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};

/// Handle to a node in the scene arena.
pub type NodeHandle = Handle<Node>;

bitflags! {
    /// Structural dirtiness of a node, beyond the per-property dirty
    /// windows. Set by message handlers on the update thread, cleared once
    /// the world pass has recomputed the subtree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeDirtyFlags: u32 {
        /// The node was created, reparented, or its transform was replaced
        /// wholesale; the world matrix must be recomputed.
        const TRANSFORM = 1 << 0;
        /// Visibility changed.
        const VISIBLE = 1 << 1;
        /// Color changed.
        const COLOR = 1 << 2;
        /// A child was removed this frame; render lists must be rebuilt
        /// even though no surviving node changed.
        const CHILD_REMOVED = 1 << 3;
    }
}

/// A node of the scene tree.
///
/// Structural links (parent, children, attached renderers) are owned by the
/// update thread; the settable properties are double-buffered and readable
/// from the logic thread through the event index; the world outputs are
/// recomputed (or carried forward) every frame by the world pass.
#[derive(Debug)]
pub struct Node {
    // -- Structure (update thread only) --
    parent: OwnedByUpdate<Option<NodeHandle>>,
    children: OwnedByUpdate<Vec<NodeHandle>>,
    renderers: OwnedByUpdate<Vec<RendererHandle>>,
    dirty: OwnedByUpdate<NodeDirtyFlags>,

    // -- Settable properties --
    /// Local translation relative to the parent.
    pub position: AnimatableProperty<Vec3>,
    /// Local rotation.
    pub rotation: AnimatableProperty<Quat>,
    /// Local scale.
    pub scale: AnimatableProperty<Vec3>,
    /// Node color, modulated down the tree.
    pub color: AnimatableProperty<Color>,
    /// Local visibility; an invisible node hides its whole subtree.
    pub visible: AnimatableProperty<bool>,

    // -- World outputs (written by the world pass) --
    /// World transform for each buffer slot.
    pub world_matrix: DoubleBuffered<Mat4>,
    /// Inherited color for each buffer slot.
    pub world_color: DoubleBuffered<Color>,
    /// Effective visibility for each buffer slot.
    pub world_visible: DoubleBuffered<bool>,
}

impl Node {
    /// Creates a detached node at the origin. New nodes start with the
    /// TRANSFORM flag raised so their first world pass computes outputs.
    pub fn new() -> Self {
        Self {
            parent: OwnedByUpdate::new(None),
            children: OwnedByUpdate::new(Vec::new()),
            renderers: OwnedByUpdate::new(Vec::new()),
            dirty: OwnedByUpdate::new(NodeDirtyFlags::all()),
            position: AnimatableProperty::new(Vec3::ZERO),
            rotation: AnimatableProperty::new(Quat::IDENTITY),
            scale: AnimatableProperty::new(Vec3::ONE),
            color: AnimatableProperty::new(Color::WHITE),
            visible: AnimatableProperty::new(true),
            world_matrix: DoubleBuffered::new(Mat4::IDENTITY),
            world_color: DoubleBuffered::new(Color::WHITE),
            world_visible: DoubleBuffered::new(true),
        }
    }

    /// The local transform for the slot, in scale → rotate → translate
    /// order.
    pub fn local_matrix(&self, index: BufferIndex) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale.get(index),
            self.rotation.get(index),
            self.position.get(index),
        )
    }

    /// Whether any transform input requires a world recomputation this
    /// frame.
    pub fn transform_dirty(&self) -> bool {
        self.dirty.load().contains(NodeDirtyFlags::TRANSFORM)
            || self.position.input_changed()
            || self.rotation.input_changed()
            || self.scale.input_changed()
    }

    /// Whether the inherited color must be recomputed this frame.
    pub fn color_dirty(&self) -> bool {
        self.dirty.load().contains(NodeDirtyFlags::COLOR) || self.color.input_changed()
    }

    /// Whether effective visibility must be recomputed this frame.
    pub fn visibility_dirty(&self) -> bool {
        self.dirty.load().contains(NodeDirtyFlags::VISIBLE) || self.visible.input_changed()
    }

    /// Raises structural dirty flags. Update thread only.
    pub fn mark_dirty(&self, flags: NodeDirtyFlags) {
        self.dirty.store(self.dirty.load() | flags);
    }

    /// Clears all structural dirty flags; called by the world pass after
    /// the node's outputs are up to date.
    pub fn clear_dirty(&self) {
        self.dirty.store(NodeDirtyFlags::empty());
    }

    /// Current structural flags. Update thread only.
    pub fn dirty_flags(&self) -> NodeDirtyFlags {
        self.dirty.load()
    }

    /// The parent handle, if attached. Update thread only.
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent.load()
    }

    pub(crate) fn set_parent(&self, parent: Option<NodeHandle>) {
        self.parent.store(parent);
    }

    /// The node's children in attach order. Update thread only.
    pub fn children(&self) -> &Vec<NodeHandle> {
        self.children.get()
    }

    pub(crate) fn children_mut(&self) -> &mut Vec<NodeHandle> {
        self.children.get_mut()
    }

    /// Renderers attached to this node. Update thread only.
    pub fn renderers(&self) -> &Vec<RendererHandle> {
        self.renderers.get()
    }

    pub(crate) fn renderers_mut(&self) -> &mut Vec<RendererHandle> {
        self.renderers.get_mut()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_node_is_fully_dirty() {
        let node = Node::new();
        assert!(node.transform_dirty());
        assert!(node.color_dirty());
        assert!(node.visibility_dirty());
    }

    #[test]
    fn clear_dirty_leaves_property_windows_alone() {
        let node = Node::new();
        node.clear_dirty();
        assert!(!node.transform_dirty());

        node.position.bake(1, Vec3::new(1.0, 0.0, 0.0));
        assert!(node.transform_dirty(), "property window keeps node dirty");
    }

    #[test]
    fn local_matrix_composes_trs() {
        let node = Node::new();
        node.clear_dirty();
        node.position.bake(0, Vec3::new(2.0, 0.0, 0.0));
        node.scale.bake(0, Vec3::splat(3.0));

        let m = node.local_matrix(0);
        let transformed = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        // Scale applies before translation.
        assert_relative_eq!(transformed.x, 5.0, epsilon = 1e-5);
    }
}
