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

//! Linear-space RGBA color.
//!
//! Node and renderer colors are stored and blended in linear space; world
//! colors are the componentwise product of a node's own color with its
//! parent's world color.

use bytemuck::{Pod, Zeroable};

/// An RGBA color in linear space, components in `[0, 1]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Color {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
    /// Alpha (opacity) component.
    pub a: f32,
}

impl Color {
    /// Opaque white; the multiplicative identity for color inheritance.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a color from linear components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from linear components.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Returns a copy with the given alpha.
    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Componentwise product; how a node's color combines with its parent's
    /// world color.
    #[inline]
    pub fn modulate(self, rhs: Self) -> Self {
        Self {
            r: self.r * rhs.r,
            g: self.g * rhs.g,
            b: self.b * rhs.b,
            a: self.a * rhs.a,
        }
    }

    /// Linear interpolation between two colors, `t` in `[0, 1]`.
    #[inline]
    pub fn lerp(self, rhs: Self, t: f32) -> Self {
        Self {
            r: self.r + (rhs.r - self.r) * t,
            g: self.g + (rhs.g - self.g) * t,
            b: self.b + (rhs.b - self.b) * t,
            a: self.a + (rhs.a - self.a) * t,
        }
    }

    /// Whether the color is fully opaque.
    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a >= 1.0
    }

    /// The color as a `[r, g, b, a]` array, e.g. for uniform upload.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::ops::Mul for Color {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.modulate(rhs)
    }
}
