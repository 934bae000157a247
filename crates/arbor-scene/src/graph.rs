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

//! The scene graph: node and renderer arenas plus the per-frame world pass.
//!
//! All methods are update-thread-only unless noted. The logic thread never
//! touches the graph; it reaches scene state through the `Arc` clones of
//! owners it created and the event buffer index.

use crate::arena::{Arena, HandleAllocator};
use crate::node::{Node, NodeDirtyFlags, NodeHandle};
use crate::renderer::{Renderer, RendererHandle};
use arbor_core::buffer::BufferIndex;
use arbor_core::color::Color;
use glam::Mat4;
use std::sync::Arc;

/// Inherited state carried down the tree by the world pass.
#[derive(Clone, Copy)]
struct Inherited {
    world: Mat4,
    color: Color,
    visible: bool,
    transform_updated: bool,
    color_updated: bool,
    visibility_updated: bool,
}

impl Inherited {
    fn root() -> Self {
        Self {
            world: Mat4::IDENTITY,
            color: Color::WHITE,
            visible: true,
            transform_updated: false,
            color_updated: false,
            visibility_updated: false,
        }
    }
}

/// Owns the scene's node and renderer arenas and runs the world pass.
pub struct SceneGraph {
    nodes: Arena<Node>,
    renderers: Arena<Renderer>,
    node_handles: Arc<HandleAllocator<Node>>,
    renderer_handles: Arc<HandleAllocator<Renderer>>,
    root: NodeHandle,
}

impl SceneGraph {
    /// Creates a graph with an installed root node. The allocators are the
    /// same instances the logic side reserves handles from.
    pub fn new(
        node_handles: Arc<HandleAllocator<Node>>,
        renderer_handles: Arc<HandleAllocator<Renderer>>,
    ) -> Self {
        let root = node_handles.reserve();
        let mut nodes = Arena::new();
        nodes.install(root, Arc::new(Node::new()));
        Self {
            nodes,
            renderers: Arena::new(),
            node_handles,
            renderer_handles,
            root,
        }
    }

    /// The root node handle. The root is owned by the graph and cannot be
    /// removed.
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Resolves a node handle against the liveness table.
    pub fn node(&self, handle: NodeHandle) -> Option<&Arc<Node>> {
        self.nodes.get(handle)
    }

    /// Resolves a renderer handle against the liveness table.
    pub fn renderer(&self, handle: RendererHandle) -> Option<&Arc<Renderer>> {
        self.renderers.get(handle)
    }

    /// Whether the handle refers to a live node.
    pub fn node_alive(&self, handle: NodeHandle) -> bool {
        self.nodes.contains(handle)
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Installs a node created on the logic thread under its reserved
    /// handle. The node is detached until an `add_child` follows.
    pub fn install_node(&mut self, handle: NodeHandle, node: Arc<Node>) {
        self.nodes.install(handle, node);
    }

    /// Installs a renderer under its reserved handle.
    pub fn install_renderer(&mut self, handle: RendererHandle, renderer: Arc<Renderer>) {
        self.renderers.install(handle, renderer);
    }

    /// Attaches `child` as the last child of `parent`, detaching it from
    /// any previous parent first. Inherited state changes, so the child's
    /// subtree is marked for recomputation.
    pub fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> bool {
        if !self.nodes.contains(parent) || !self.nodes.contains(child) {
            return false;
        }
        self.detach(child);
        let parent_node = self.nodes.get(parent).expect("validated above");
        parent_node.children_mut().push(child);
        let child_node = self.nodes.get(child).expect("validated above");
        child_node.set_parent(Some(parent));
        child_node.mark_dirty(
            NodeDirtyFlags::TRANSFORM | NodeDirtyFlags::COLOR | NodeDirtyFlags::VISIBLE,
        );
        true
    }

    /// Unlinks a node from its parent, leaving it installed but detached.
    pub fn detach(&mut self, child: NodeHandle) {
        let Some(child_node) = self.nodes.get(child) else {
            return;
        };
        if let Some(parent) = child_node.parent() {
            if let Some(parent_node) = self.nodes.get(parent) {
                parent_node.children_mut().retain(|&c| c != child);
                parent_node.mark_dirty(NodeDirtyFlags::CHILD_REMOVED);
            }
            child_node.set_parent(None);
        }
    }

    /// Removes a node and its whole subtree from the arena, returning the
    /// removed owners for discard-queueing. The handles are *not* released
    /// back to the allocator here; that happens when the discard queue
    /// finally drops the owners.
    pub fn remove_node(&mut self, handle: NodeHandle) -> Vec<(NodeHandle, Arc<Node>)> {
        if handle == self.root {
            log::warn!("Ignoring request to remove the root node");
            return Vec::new();
        }
        self.detach(handle);
        let mut removed = Vec::new();
        self.remove_subtree(handle, &mut removed);
        removed
    }

    fn remove_subtree(&mut self, handle: NodeHandle, removed: &mut Vec<(NodeHandle, Arc<Node>)>) {
        let Some(node) = self.nodes.remove(handle) else {
            return;
        };
        let children: Vec<NodeHandle> = node.children().clone();
        removed.push((handle, node));
        for child in children {
            self.remove_subtree(child, removed);
        }
    }

    /// Removes a renderer owner, returning it for discard-queueing. Any
    /// node still referencing the handle simply stops producing draw items
    /// once liveness validation fails.
    pub fn remove_renderer(&mut self, handle: RendererHandle) -> Option<Arc<Renderer>> {
        self.renderers.remove(handle)
    }

    /// Attaches a renderer to a node.
    pub fn attach_renderer(&mut self, node: NodeHandle, renderer: RendererHandle) -> bool {
        match self.nodes.get(node) {
            Some(n) if self.renderers.contains(renderer) => {
                n.renderers_mut().push(renderer);
                true
            }
            _ => false,
        }
    }

    /// Detaches a renderer from a node without destroying it.
    pub fn detach_renderer(&mut self, node: NodeHandle, renderer: RendererHandle) {
        if let Some(n) = self.nodes.get(node) {
            n.renderers_mut().retain(|&r| r != renderer);
        }
    }

    /// The allocator node handles come from; used to release handles after
    /// discard.
    pub fn node_handle_allocator(&self) -> &Arc<HandleAllocator<Node>> {
        &self.node_handles
    }

    /// The allocator renderer handles come from.
    pub fn renderer_handle_allocator(&self) -> &Arc<HandleAllocator<Renderer>> {
        &self.renderer_handles
    }

    /// Runs the world pass: walks the tree top-down once, recomputing world
    /// transform/color/visibility for nodes whose own inputs changed or
    /// whose parent's outputs changed, and carrying the committed values
    /// forward everywhere else. Cost is amortized O(changed subtree).
    ///
    /// Returns whether any node's outputs changed this frame.
    pub fn update_world(&self, index: BufferIndex) -> bool {
        let mut changed = false;
        self.propagate(self.root, index, Inherited::root(), &mut changed);
        changed
    }

    fn propagate(
        &self,
        handle: NodeHandle,
        index: BufferIndex,
        inherited: Inherited,
        changed: &mut bool,
    ) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };

        let transform_updated = inherited.transform_updated || node.transform_dirty();
        if transform_updated {
            node.world_matrix
                .set(index, inherited.world * node.local_matrix(index));
        } else {
            node.world_matrix.carry_forward(index);
        }

        let color_updated = inherited.color_updated || node.color_dirty();
        if color_updated {
            node.world_color
                .set(index, node.color.get(index).modulate(inherited.color));
        } else {
            node.world_color.carry_forward(index);
        }

        let visibility_updated = inherited.visibility_updated || node.visibility_dirty();
        if visibility_updated {
            node.world_visible
                .set(index, inherited.visible && node.visible.get(index));
        } else {
            node.world_visible.carry_forward(index);
        }

        *changed |= transform_updated
            || color_updated
            || visibility_updated
            || node.dirty_flags().contains(NodeDirtyFlags::CHILD_REMOVED);
        node.clear_dirty();

        let next = Inherited {
            world: node.world_matrix.get(index),
            color: node.world_color.get(index),
            visible: node.world_visible.get(index),
            transform_updated,
            color_updated,
            visibility_updated,
        };
        for &child in node.children().iter() {
            self.propagate(child, index, next, changed);
        }
    }

    /// Visits every node whose effective visibility is true for the slot,
    /// parents before children. Used by render-list collection after the
    /// world pass.
    pub fn for_each_visible(&self, index: BufferIndex, visit: &mut dyn FnMut(&Node)) {
        self.visit_visible(self.root, index, visit);
    }

    fn visit_visible(&self, handle: NodeHandle, index: BufferIndex, visit: &mut dyn FnMut(&Node)) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        if !node.world_visible.get(index) {
            return;
        }
        visit(node);
        for &child in node.children().iter() {
            self.visit_visible(child, index, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn graph() -> SceneGraph {
        SceneGraph::new(HandleAllocator::new(), HandleAllocator::new())
    }

    fn spawn_child(graph: &mut SceneGraph, parent: NodeHandle) -> NodeHandle {
        let handle = graph.node_handle_allocator().reserve();
        graph.install_node(handle, Arc::new(Node::new()));
        assert!(graph.add_child(parent, handle));
        handle
    }

    #[test]
    fn world_transform_composes_down_the_tree() {
        let mut graph = graph();
        let root = graph.root();
        let parent = spawn_child(&mut graph, root);
        let child = spawn_child(&mut graph, parent);

        graph
            .node(parent)
            .unwrap()
            .position
            .bake(1, Vec3::new(10.0, 0.0, 0.0));
        graph
            .node(child)
            .unwrap()
            .position
            .bake(1, Vec3::new(0.0, 2.0, 0.0));

        assert!(graph.update_world(1));

        let world = graph.node(child).unwrap().world_matrix.get(1);
        let translation = world.w_axis;
        assert_relative_eq!(translation.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(translation.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn clean_frame_carries_world_forward() {
        let mut graph = graph();
        let root = graph.root();
        let node = spawn_child(&mut graph, root);
        graph
            .node(node)
            .unwrap()
            .position
            .bake(1, Vec3::new(5.0, 0.0, 0.0));

        // Dirty window: two frames of recomputation...
        graph.update_world(1);
        graph.node(node).unwrap().position.reset_to_base_value(0);
        graph.update_world(0);
        graph.node(node).unwrap().position.reset_to_base_value(1);

        // ...then a clean frame must still produce the committed matrix.
        let changed = graph.update_world(1);
        assert!(!changed, "clean frame must not report changes");
        let world = graph.node(node).unwrap().world_matrix.get(1);
        assert_relative_eq!(world.w_axis.x, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn reparent_marks_subtree_for_recompute() {
        let mut graph = graph();
        let root = graph.root();
        let a = spawn_child(&mut graph, root);
        let b = spawn_child(&mut graph, root);
        let child = spawn_child(&mut graph, a);
        graph
            .node(b)
            .unwrap()
            .position
            .bake(1, Vec3::new(3.0, 0.0, 0.0));
        graph.update_world(1);

        assert!(graph.add_child(b, child));
        graph.update_world(1);
        let world = graph.node(child).unwrap().world_matrix.get(1);
        assert_relative_eq!(world.w_axis.x, 3.0, epsilon = 1e-5);
        assert_eq!(graph.node(a).unwrap().children().len(), 0);
    }

    #[test]
    fn remove_node_takes_the_subtree() {
        let mut graph = graph();
        let root = graph.root();
        let parent = spawn_child(&mut graph, root);
        let child = spawn_child(&mut graph, parent);
        let grandchild = spawn_child(&mut graph, child);

        let removed = graph.remove_node(parent);
        assert_eq!(removed.len(), 3);
        assert!(!graph.node_alive(parent));
        assert!(!graph.node_alive(child));
        assert!(!graph.node_alive(grandchild));
        // Root survives.
        assert!(graph.node_alive(graph.root()));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut graph = graph();
        let removed = graph.remove_node(graph.root());
        assert!(removed.is_empty());
        assert!(graph.node_alive(graph.root()));
    }

    #[test]
    fn hidden_subtree_is_skipped_by_visibility_walk() {
        let mut graph = graph();
        let root = graph.root();
        let parent = spawn_child(&mut graph, root);
        let _child = spawn_child(&mut graph, parent);
        graph.node(parent).unwrap().visible.bake(1, false);
        graph.update_world(1);

        let mut visited = 0;
        graph.for_each_visible(1, &mut |_node| visited += 1);
        // Only the root remains visible.
        assert_eq!(visited, 1);
    }
}
