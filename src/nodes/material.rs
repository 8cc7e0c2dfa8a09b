use glam::Vec3;
use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::{context::CompilerContext, ShaderStage},
    core::{ConstantValue, ValueType},
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, NodeRole, ShaderNode};

/// Surface property written to the `Material` struct, or the vertex offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialChannel {
    Albedo,
    Emission,
    Opacity,
    Normal,
    Roughness,
    Metalness,
    AmbientOcclusion,
    PositionOffset,
}

impl MaterialChannel {
    pub const ALL: [MaterialChannel; 8] = [
        MaterialChannel::Albedo,
        MaterialChannel::Emission,
        MaterialChannel::Opacity,
        MaterialChannel::Normal,
        MaterialChannel::Roughness,
        MaterialChannel::Metalness,
        MaterialChannel::AmbientOcclusion,
        MaterialChannel::PositionOffset,
    ];

    pub fn port(self) -> &'static str {
        match self {
            MaterialChannel::Albedo => "albedo",
            MaterialChannel::Emission => "emission",
            MaterialChannel::Opacity => "opacity",
            MaterialChannel::Normal => "normal",
            MaterialChannel::Roughness => "roughness",
            MaterialChannel::Metalness => "metalness",
            MaterialChannel::AmbientOcclusion => "ambient_occlusion",
            MaterialChannel::PositionOffset => "position_offset",
        }
    }

    pub fn from_port(port: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|x| x.port() == port)
    }

    /// Field of the `Material` struct.
    pub fn field(self) -> &'static str {
        match self {
            MaterialChannel::Albedo => "Albedo",
            MaterialChannel::Emission => "Emission",
            MaterialChannel::Opacity => "Opacity",
            MaterialChannel::Normal => "Normal",
            MaterialChannel::Roughness => "Roughness",
            MaterialChannel::Metalness => "Metalness",
            MaterialChannel::AmbientOcclusion => "AmbientOcclusion",
            MaterialChannel::PositionOffset => "PositionOffset",
        }
    }

    pub fn value_type(self) -> ValueType {
        match self {
            MaterialChannel::Albedo
            | MaterialChannel::Emission
            | MaterialChannel::Normal
            | MaterialChannel::PositionOffset => ValueType::Vector3,
            MaterialChannel::Opacity
            | MaterialChannel::Roughness
            | MaterialChannel::Metalness
            | MaterialChannel::AmbientOcclusion => ValueType::Float,
        }
    }

    pub fn stage(self) -> ShaderStage {
        match self {
            MaterialChannel::PositionOffset => ShaderStage::Vertex,
            _ => ShaderStage::Pixel,
        }
    }

    /// Value used when the connected input cannot be resolved.
    pub fn default_value(self) -> ConstantValue {
        match self {
            MaterialChannel::Albedo => ConstantValue::Vector3(Vec3::ONE),
            MaterialChannel::Emission | MaterialChannel::PositionOffset => {
                ConstantValue::Vector3(Vec3::ZERO)
            }
            MaterialChannel::Normal => ConstantValue::Vector3(Vec3::Z),
            MaterialChannel::Opacity
            | MaterialChannel::Roughness
            | MaterialChannel::AmbientOcclusion => ConstantValue::Float(1.0),
            MaterialChannel::Metalness => ConstantValue::Float(0.0),
        }
    }
}

/// Root of a material graph. Each connected input becomes one field write
/// in the generated pixel shader, `position_offset` moves the vertex.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialResultNode {
    pub albedo: NodeInput,
    pub emission: NodeInput,
    pub opacity: NodeInput,
    pub normal: NodeInput,
    pub roughness: NodeInput,
    pub metalness: NodeInput,
    pub ambient_occlusion: NodeInput,
    pub position_offset: NodeInput,
}

impl MaterialResultNode {
    pub fn input_for(&self, channel: MaterialChannel) -> &NodeInput {
        match channel {
            MaterialChannel::Albedo => &self.albedo,
            MaterialChannel::Emission => &self.emission,
            MaterialChannel::Opacity => &self.opacity,
            MaterialChannel::Normal => &self.normal,
            MaterialChannel::Roughness => &self.roughness,
            MaterialChannel::Metalness => &self.metalness,
            MaterialChannel::AmbientOcclusion => &self.ambient_occlusion,
            MaterialChannel::PositionOffset => &self.position_offset,
        }
    }
}

impl NodeDefinition for MaterialResultNode {
    fn name() -> &'static str {
        "MaterialResult"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[
            ("albedo", Vector3),
            ("emission", Vector3),
            ("opacity", Float),
            ("normal", Vector3),
            ("roughness", Float),
            ("metalness", Float),
            ("ambient_occlusion", Float),
            ("position_offset", Vector3),
        ]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[]
    }
}

impl ShaderNode for MaterialResultNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        let channel =
            MaterialChannel::from_port(output).ok_or_else(|| unknown_output("MaterialResult", output))?;

        let value = ctx.result_or_default(channel.port(), self.input_for(channel), channel.default_value());
        value.cast_to(channel.value_type(), ctx.types())
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        MaterialChannel::ALL
            .into_iter()
            .map(|x| (x.port(), self.input_for(x)))
            .collect()
    }

    fn role(&self) -> NodeRole<'_> {
        NodeRole::MaterialRoot
    }
}
