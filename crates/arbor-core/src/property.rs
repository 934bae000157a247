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

//! The closed property value model.
//!
//! Scene properties carry one of a fixed set of value types. Type-erased
//! code (messages, animators, constraint functions) works in terms of
//! [`PropertyValue`]; typed storage dispatches through the sealed
//! [`PropertyData`] trait. The set is closed on purpose: adding a value
//! type is an engine change, not an extension point.

use crate::color::Color;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use std::fmt;

/// Discriminant of a [`PropertyValue`], used for type checks before a write
/// reaches typed storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// A boolean flag.
    Bool,
    /// A 32-bit signed integer.
    Integer,
    /// A 32-bit float.
    Float,
    /// A 2-component vector.
    Vector2,
    /// A 3-component vector.
    Vector3,
    /// A 4-component vector.
    Vector4,
    /// A rotation quaternion.
    Quaternion,
    /// A 4x4 matrix.
    Matrix4,
    /// A linear RGBA color.
    Color,
}

/// A value of one of the supported property types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    /// A boolean flag.
    Bool(bool),
    /// A 32-bit signed integer.
    Integer(i32),
    /// A 32-bit float.
    Float(f32),
    /// A 2-component vector.
    Vector2(Vec2),
    /// A 3-component vector.
    Vector3(Vec3),
    /// A 4-component vector.
    Vector4(Vec4),
    /// A rotation quaternion.
    Quaternion(Quat),
    /// A 4x4 matrix.
    Matrix4(Mat4),
    /// A linear RGBA color.
    Color(Color),
}

impl PropertyValue {
    /// Returns the value's type discriminant.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Integer(_) => PropertyKind::Integer,
            Self::Float(_) => PropertyKind::Float,
            Self::Vector2(_) => PropertyKind::Vector2,
            Self::Vector3(_) => PropertyKind::Vector3,
            Self::Vector4(_) => PropertyKind::Vector4,
            Self::Quaternion(_) => PropertyKind::Quaternion,
            Self::Matrix4(_) => PropertyKind::Matrix4,
            Self::Color(_) => PropertyKind::Color,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "Bool",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Quaternion => "Quaternion",
            Self::Matrix4 => "Matrix4",
            Self::Color => "Color",
        };
        f.write_str(name)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for glam::Vec2 {}
    impl Sealed for glam::Vec3 {}
    impl Sealed for glam::Vec4 {}
    impl Sealed for glam::Quat {}
    impl Sealed for glam::Mat4 {}
    impl Sealed for crate::color::Color {}
}

/// A concrete type storable in an animatable property slot.
///
/// Sealed: the supported set is exactly the [`PropertyValue`] variants.
pub trait PropertyData: Copy + PartialEq + Send + Sync + 'static + sealed::Sealed {
    /// The discriminant this type maps to.
    const KIND: PropertyKind;

    /// Wraps the value in its [`PropertyValue`] variant.
    fn into_value(self) -> PropertyValue;

    /// Extracts the typed value, or `None` on a kind mismatch.
    fn from_value(value: &PropertyValue) -> Option<Self>;

    /// Interpolates between two values with an eased fraction in `[0, 1]`.
    ///
    /// Discrete types (bool, integer step behavior aside) switch to `to`
    /// only when the fraction reaches 1.
    fn interpolate(from: Self, to: Self, fraction: f32) -> Self;
}

impl PropertyData for bool {
    const KIND: PropertyKind = PropertyKind::Bool;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Bool(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        if fraction >= 1.0 {
            to
        } else {
            from
        }
    }
}

impl PropertyData for i32 {
    const KIND: PropertyKind = PropertyKind::Integer;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Integer(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from + ((to - from) as f32 * fraction).round() as i32
    }
}

impl PropertyData for f32 {
    const KIND: PropertyKind = PropertyKind::Float;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Float(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from + (to - from) * fraction
    }
}

impl PropertyData for Vec2 {
    const KIND: PropertyKind = PropertyKind::Vector2;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Vector2(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Vector2(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.lerp(to, fraction)
    }
}

impl PropertyData for Vec3 {
    const KIND: PropertyKind = PropertyKind::Vector3;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Vector3(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.lerp(to, fraction)
    }
}

impl PropertyData for Vec4 {
    const KIND: PropertyKind = PropertyKind::Vector4;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Vector4(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Vector4(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.lerp(to, fraction)
    }
}

impl PropertyData for Quat {
    const KIND: PropertyKind = PropertyKind::Quaternion;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Quaternion(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Quaternion(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.slerp(to, fraction)
    }
}

impl PropertyData for Mat4 {
    const KIND: PropertyKind = PropertyKind::Matrix4;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Matrix4(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Matrix4(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        // Matrices are not meaningfully interpolated componentwise; treat
        // them as discrete like bool.
        if fraction >= 1.0 {
            to
        } else {
            from
        }
    }
}

impl PropertyData for Color {
    const KIND: PropertyKind = PropertyKind::Color;

    fn into_value(self) -> PropertyValue {
        PropertyValue::Color(self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.lerp(to, fraction)
    }
}

/// Interpolates two type-erased values of the same kind.
///
/// Returns `None` when the kinds differ; animators treat that as a
/// programmer error caught at registration, so a mismatch here means a
/// message slipped past validation.
pub fn interpolate_value(
    from: &PropertyValue,
    to: &PropertyValue,
    fraction: f32,
) -> Option<PropertyValue> {
    fn typed<T: PropertyData>(
        from: &PropertyValue,
        to: &PropertyValue,
        fraction: f32,
    ) -> Option<PropertyValue> {
        let a = T::from_value(from)?;
        let b = T::from_value(to)?;
        Some(T::interpolate(a, b, fraction).into_value())
    }

    match from.kind() {
        PropertyKind::Bool => typed::<bool>(from, to, fraction),
        PropertyKind::Integer => typed::<i32>(from, to, fraction),
        PropertyKind::Float => typed::<f32>(from, to, fraction),
        PropertyKind::Vector2 => typed::<Vec2>(from, to, fraction),
        PropertyKind::Vector3 => typed::<Vec3>(from, to, fraction),
        PropertyKind::Vector4 => typed::<Vec4>(from, to, fraction),
        PropertyKind::Quaternion => typed::<Quat>(from, to, fraction),
        PropertyKind::Matrix4 => typed::<Mat4>(from, to, fraction),
        PropertyKind::Color => typed::<Color>(from, to, fraction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(PropertyValue::Float(1.0).kind(), PropertyKind::Float);
        assert_eq!(
            PropertyValue::Vector3(Vec3::ZERO).kind(),
            PropertyKind::Vector3
        );
        assert_eq!(PropertyValue::Color(Color::WHITE).kind(), PropertyKind::Color);
    }

    #[test]
    fn typed_round_trip() {
        let value = Vec3::new(1.0, 2.0, 3.0).into_value();
        assert_eq!(Vec3::from_value(&value), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(f32::from_value(&value), None);
    }

    #[test]
    fn float_interpolation_is_linear() {
        assert_relative_eq!(f32::interpolate(0.0, 10.0, 0.25), 2.5);
    }

    #[test]
    fn bool_switches_only_at_completion() {
        assert!(!bool::interpolate(false, true, 0.99));
        assert!(bool::interpolate(false, true, 1.0));
    }

    #[test]
    fn erased_interpolation_rejects_kind_mismatch() {
        let from = PropertyValue::Float(0.0);
        let to = PropertyValue::Vector3(Vec3::ONE);
        assert_eq!(interpolate_value(&from, &to, 0.5), None);
    }

    #[test]
    fn erased_interpolation_matches_typed() {
        let from = PropertyValue::Vector3(Vec3::ZERO);
        let to = PropertyValue::Vector3(Vec3::new(10.0, 0.0, 0.0));
        let mid = interpolate_value(&from, &to, 0.5).unwrap();
        assert_eq!(mid, PropertyValue::Vector3(Vec3::new(5.0, 0.0, 0.0)));
    }
}
