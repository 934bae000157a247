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

//! Frozen per-frame render instructions.
//!
//! An instruction is a per-camera, ordered description of what to draw,
//! built once per frame from the update-buffer side of the scene. Items
//! carry value snapshots (world matrix, final color), never references back
//! into scene state, so the render thread reads nothing double-buffered.

use crate::tracker::RenderTracker;
use arbor_core::color::Color;
use arbor_core::graphics::{DrawCall, DrawSubmission, DrawUniforms, GeometryId, ShaderId, TextureId};
use glam::Mat4;
use std::sync::Arc;

/// One draw item: a renderer snapshot taken at instruction-build time.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    /// World transform snapshot.
    pub world: Mat4,
    /// Final color (node world color modulated with the renderer's mix
    /// color).
    pub color: Color,
    /// Geometry to draw.
    pub geometry: GeometryId,
    /// Bound texture, if any.
    pub texture: Option<TextureId>,
    /// Bound shader, if any.
    pub shader: Option<ShaderId>,
    /// View-space distance from the camera; larger is farther away.
    pub depth: f32,
}

impl RenderItem {
    fn to_draw_call(&self) -> DrawCall {
        DrawCall {
            geometry: self.geometry,
            texture: self.texture,
            shader: self.shader,
            uniforms: DrawUniforms::new(self.world, self.color),
        }
    }
}

/// An ordered draw list for one render task (camera).
///
/// Opaque items are sorted front-to-back (depth ascending) to maximize
/// early-z rejection; transparent items back-to-front (depth descending)
/// for correct blending, drawn after every opaque item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderInstruction {
    /// View matrix of the task's camera.
    pub view: Mat4,
    /// Opaque items, front to back.
    pub opaque: Vec<RenderItem>,
    /// Transparent items, back to front.
    pub transparent: Vec<RenderItem>,
}

impl RenderInstruction {
    /// Sorts both lists into their required draw order. Sorting is stable
    /// so items at equal depth keep collection (tree) order.
    pub fn sort(&mut self) {
        self.opaque
            .sort_by(|a, b| a.depth.total_cmp(&b.depth));
        self.transparent
            .sort_by(|a, b| b.depth.total_cmp(&a.depth));
    }

    /// Total number of draw items.
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Whether the instruction draws nothing.
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    /// Flattens the instruction into the backend submission format, opaque
    /// items first.
    pub fn to_submission(&self, frame: u64) -> DrawSubmission {
        let calls = self
            .opaque
            .iter()
            .chain(self.transparent.iter())
            .map(RenderItem::to_draw_call)
            .collect();
        DrawSubmission {
            frame,
            view: self.view,
            calls,
        }
    }
}

/// Everything the render thread needs for one frame.
///
/// Moved (not shared) into the render channel: once handed over, the update
/// thread holds no reference to the instructions.
#[derive(Debug)]
pub struct FrameSubmission {
    /// Frame number, monotonically increasing.
    pub frame: u64,
    /// Per-render-task instructions, in task order.
    pub instructions: Vec<RenderInstruction>,
    /// Tracker the consumer arms after submitting this frame's draws; the
    /// update thread polls it to learn when the frame's GPU work finished.
    pub tracker: Arc<RenderTracker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(depth: f32, geometry: u32) -> RenderItem {
        RenderItem {
            world: Mat4::IDENTITY,
            color: Color::WHITE,
            geometry: GeometryId(geometry),
            texture: None,
            shader: None,
            depth,
        }
    }

    #[test]
    fn opaque_sorts_front_to_back() {
        let mut instruction = RenderInstruction::default();
        instruction.opaque = vec![item(5.0, 0), item(1.0, 1), item(3.0, 2)];
        instruction.sort();
        let order: Vec<u32> = instruction.opaque.iter().map(|i| i.geometry.0).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn transparent_sorts_back_to_front() {
        let mut instruction = RenderInstruction::default();
        instruction.transparent = vec![item(5.0, 0), item(1.0, 1), item(3.0, 2)];
        instruction.sort();
        let order: Vec<u32> = instruction.transparent.iter().map(|i| i.geometry.0).collect();
        assert_eq!(order, vec![0, 2, 1]);
    }

    #[test]
    fn submission_draws_opaque_before_transparent() {
        let mut instruction = RenderInstruction::default();
        instruction.opaque = vec![item(1.0, 10)];
        instruction.transparent = vec![item(2.0, 20)];
        let submission = instruction.to_submission(7);
        assert_eq!(submission.frame, 7);
        let order: Vec<u32> = submission.calls.iter().map(|c| c.geometry.0).collect();
        assert_eq!(order, vec![10, 20]);
    }
}
