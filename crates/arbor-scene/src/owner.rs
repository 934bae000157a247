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

//! Type-erased property addressing and dispatch.
//!
//! Messages, animators, and constraints address a property as an owner
//! handle plus a [`PropertyKey`]; resolution validates liveness and yields
//! a [`PropertySlot`] that dispatches type-erased reads and writes onto the
//! typed storage. The value set is closed, so dispatch is a plain match
//! rather than virtual calls per property.

use crate::graph::SceneGraph;
use crate::node::NodeHandle;
use crate::property::AnimatableProperty;
use crate::renderer::RendererHandle;
use arbor_core::buffer::BufferIndex;
use arbor_core::color::Color;
use arbor_core::property::{PropertyData, PropertyKind, PropertyValue};
use glam::{Quat, Vec3};
use std::fmt;

/// A property owner addressed across the thread boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOwner {
    /// A scene node.
    Node(NodeHandle),
    /// A renderer attached to a node.
    Renderer(RendererHandle),
}

/// Names a settable property on an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Node local translation (`Vector3`).
    Position,
    /// Node local rotation (`Quaternion`).
    Rotation,
    /// Node local scale (`Vector3`).
    Scale,
    /// Node color (`Color`).
    Color,
    /// Node visibility (`Bool`).
    Visible,
    /// Renderer mix color (`Color`).
    MixColor,
}

/// A property operation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The owner handle failed liveness validation.
    DeadOwner,
    /// The key does not exist on the owner kind (e.g. `MixColor` on a
    /// node).
    UnknownProperty {
        /// The key that failed to resolve.
        key: PropertyKey,
    },
    /// The value's type does not match the property's.
    KindMismatch {
        /// Kind the property stores.
        expected: PropertyKind,
        /// Kind that was supplied.
        actual: PropertyKind,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::DeadOwner => write!(f, "Property owner is no longer alive"),
            PropertyError::UnknownProperty { key } => {
                write!(f, "Owner has no property {key:?}")
            }
            PropertyError::KindMismatch { expected, actual } => {
                write!(f, "Property expects {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

/// A resolved, typed view of one property.
#[derive(Debug)]
pub enum PropertySlot<'a> {
    /// A boolean property.
    Bool(&'a AnimatableProperty<bool>),
    /// A three-component vector property.
    Vector3(&'a AnimatableProperty<Vec3>),
    /// A quaternion property.
    Quaternion(&'a AnimatableProperty<Quat>),
    /// A color property.
    Color(&'a AnimatableProperty<Color>),
}

macro_rules! dispatch {
    ($slot:expr, $property:ident => $body:expr) => {
        match $slot {
            PropertySlot::Bool($property) => $body,
            PropertySlot::Vector3($property) => $body,
            PropertySlot::Quaternion($property) => $body,
            PropertySlot::Color($property) => $body,
        }
    };
}

impl<'a> PropertySlot<'a> {
    /// The stored value kind.
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertySlot::Bool(_) => PropertyKind::Bool,
            PropertySlot::Vector3(_) => PropertyKind::Vector3,
            PropertySlot::Quaternion(_) => PropertyKind::Quaternion,
            PropertySlot::Color(_) => PropertyKind::Color,
        }
    }

    /// Reads the slot for the buffer index as a type-erased value.
    pub fn get(&self, index: BufferIndex) -> PropertyValue {
        dispatch!(self, property => property.get(index).into_value())
    }

    /// The committed base value. Update thread only.
    pub fn base_value(&self) -> PropertyValue {
        dispatch!(self, property => property.base_value().into_value())
    }

    /// Commits a value through the update index.
    pub fn bake(&self, index: BufferIndex, value: &PropertyValue) -> Result<(), PropertyError> {
        fn typed<T: PropertyData>(
            property: &AnimatableProperty<T>,
            index: BufferIndex,
            value: &PropertyValue,
        ) -> Result<(), PropertyError> {
            let v = T::from_value(value).ok_or(PropertyError::KindMismatch {
                expected: T::KIND,
                actual: value.kind(),
            })?;
            property.bake(index, v);
            Ok(())
        }
        dispatch!(self, property => typed(property, index, value))
    }

    /// Writes a frame-local animated value through the update index.
    pub fn set_animated(
        &self,
        index: BufferIndex,
        value: &PropertyValue,
    ) -> Result<(), PropertyError> {
        fn typed<T: PropertyData>(
            property: &AnimatableProperty<T>,
            index: BufferIndex,
            value: &PropertyValue,
        ) -> Result<(), PropertyError> {
            let v = T::from_value(value).ok_or(PropertyError::KindMismatch {
                expected: T::KIND,
                actual: value.kind(),
            })?;
            property.set_animated(index, v);
            Ok(())
        }
        dispatch!(self, property => typed(property, index, value))
    }

    /// Interpolates between two type-erased endpoints with an eased
    /// fraction and writes the result as an animated value.
    pub fn animate(
        &self,
        index: BufferIndex,
        from: &PropertyValue,
        to: &PropertyValue,
        fraction: f32,
    ) -> Result<(), PropertyError> {
        fn typed<T: PropertyData>(
            property: &AnimatableProperty<T>,
            index: BufferIndex,
            from: &PropertyValue,
            to: &PropertyValue,
            fraction: f32,
        ) -> Result<(), PropertyError> {
            let mismatch = |value: &PropertyValue| PropertyError::KindMismatch {
                expected: T::KIND,
                actual: value.kind(),
            };
            let a = T::from_value(from).ok_or_else(|| mismatch(from))?;
            let b = T::from_value(to).ok_or_else(|| mismatch(to))?;
            property.set_animated(index, T::interpolate(a, b, fraction));
            Ok(())
        }
        dispatch!(self, property => typed(property, index, from, to, fraction))
    }

    /// Re-seeds the write slot from the base value.
    pub fn reset_to_base_value(&self, index: BufferIndex) {
        dispatch!(self, property => property.reset_to_base_value(index));
    }

    /// Whether the value changed within the dirty window.
    pub fn is_clean(&self) -> bool {
        dispatch!(self, property => property.is_clean())
    }
}

impl SceneGraph {
    /// Resolves an owner/key pair to its typed slot, validating owner
    /// liveness first.
    pub fn resolve_property(
        &self,
        owner: TargetOwner,
        key: PropertyKey,
    ) -> Result<PropertySlot<'_>, PropertyError> {
        match owner {
            TargetOwner::Node(handle) => {
                let node = self.node(handle).ok_or(PropertyError::DeadOwner)?;
                match key {
                    PropertyKey::Position => Ok(PropertySlot::Vector3(&node.position)),
                    PropertyKey::Rotation => Ok(PropertySlot::Quaternion(&node.rotation)),
                    PropertyKey::Scale => Ok(PropertySlot::Vector3(&node.scale)),
                    PropertyKey::Color => Ok(PropertySlot::Color(&node.color)),
                    PropertyKey::Visible => Ok(PropertySlot::Bool(&node.visible)),
                    PropertyKey::MixColor => Err(PropertyError::UnknownProperty { key }),
                }
            }
            TargetOwner::Renderer(handle) => {
                let renderer = self.renderer(handle).ok_or(PropertyError::DeadOwner)?;
                match key {
                    PropertyKey::MixColor => Ok(PropertySlot::Color(&renderer.mix_color)),
                    _ => Err(PropertyError::UnknownProperty { key }),
                }
            }
        }
    }

    /// Whether an owner handle is still alive.
    pub fn owner_alive(&self, owner: TargetOwner) -> bool {
        match owner {
            TargetOwner::Node(handle) => self.node_alive(handle),
            TargetOwner::Renderer(handle) => self.renderer(handle).is_some(),
        }
    }
}
