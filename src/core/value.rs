use glam::{Vec2, Vec3, Vec4};
use serde_derive::{Deserialize, Serialize};

use super::types::{TypeRegistry, ValueType};

/// Literal host value that a node can inline into generated code.
///
/// Serialized with an explicit `__class` discriminant; an unknown discriminant
/// fails deserialization instead of silently picking a variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class", content = "value")]
pub enum ConstantValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Color(Vec4),
}

impl Default for ConstantValue {
    fn default() -> Self {
        Self::Float(0.0)
    }
}

impl ConstantValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ConstantValue::Bool(_) => ValueType::Bool,
            ConstantValue::Int(_) => ValueType::Int,
            ConstantValue::Float(_) => ValueType::Float,
            ConstantValue::Vector2(_) => ValueType::Vector2,
            ConstantValue::Vector3(_) => ValueType::Vector3,
            ConstantValue::Vector4(_) => ValueType::Vector4,
            ConstantValue::Color(_) => ValueType::Color,
        }
    }

    pub fn zero(value_type: ValueType) -> Option<Self> {
        Some(match value_type {
            ValueType::Bool => Self::Bool(false),
            ValueType::Int => Self::Int(0),
            ValueType::Float => Self::Float(0.0),
            ValueType::Vector2 => Self::Vector2(Vec2::ZERO),
            ValueType::Vector3 => Self::Vector3(Vec3::ZERO),
            ValueType::Vector4 => Self::Vector4(Vec4::ZERO),
            ValueType::Color => Self::Color(Vec4::new(0.0, 0.0, 0.0, 1.0)),
            _ => return None,
        })
    }

    /// Float components, bools and ints promoted.
    pub fn components(&self) -> Vec<f32> {
        match *self {
            ConstantValue::Bool(x) => vec![if x { 1.0 } else { 0.0 }],
            ConstantValue::Int(x) => vec![x as f32],
            ConstantValue::Float(x) => vec![x],
            ConstantValue::Vector2(v) => v.to_array().to_vec(),
            ConstantValue::Vector3(v) => v.to_array().to_vec(),
            ConstantValue::Vector4(v) | ConstantValue::Color(v) => v.to_array().to_vec(),
        }
    }

    /// Source literal for this value, typed through the registry.
    pub fn to_literal(&self, types: &TypeRegistry) -> String {
        match *self {
            ConstantValue::Bool(x) => x.to_string(),
            ConstantValue::Int(x) => x.to_string(),
            ConstantValue::Float(x) => format_float(x),
            _ => format_vector(types.hlsl_name(self.value_type()), &self.components()),
        }
    }

    /// Components as written in annotation lists such as `Default3( 1, 0, 0 )`.
    pub fn to_annotation(&self) -> String {
        self.components()
            .into_iter()
            .map(format_component)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Scalar float literal: shortest round-trip digits, always with a decimal
/// point and an `f` suffix.
pub fn format_float(value: f32) -> String {
    let mut text = format_component(value);
    if !text.contains(['.', 'e', 'E']) {
        text.push_str(".0");
    }
    text.push('f');
    text
}

/// Vector component: shortest round-trip digits, no suffix.
pub fn format_component(value: f32) -> String {
    if value.is_nan() {
        "0".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 {
            "3.402823466e+38".to_owned()
        } else {
            "-3.402823466e+38".to_owned()
        }
    } else if value == 0.0 {
        // drops the sign of negative zero
        "0".to_owned()
    } else {
        value.to_string()
    }
}

pub fn format_vector(type_name: &str, components: &[f32]) -> String {
    let list = components
        .iter()
        .copied()
        .map(format_component)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{type_name}( {list} )")
}

impl From<bool> for ConstantValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ConstantValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for ConstantValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<Vec2> for ConstantValue {
    fn from(value: Vec2) -> Self {
        Self::Vector2(value)
    }
}

impl From<Vec3> for ConstantValue {
    fn from(value: Vec3) -> Self {
        Self::Vector3(value)
    }
}

impl From<Vec4> for ConstantValue {
    fn from(value: Vec4) -> Self {
        Self::Vector4(value)
    }
}

impl From<[f32; 2]> for ConstantValue {
    fn from(value: [f32; 2]) -> Self {
        Self::Vector2(value.into())
    }
}

impl From<[f32; 3]> for ConstantValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vector3(value.into())
    }
}

impl From<[f32; 4]> for ConstantValue {
    fn from(value: [f32; 4]) -> Self {
        Self::Vector4(value.into())
    }
}
