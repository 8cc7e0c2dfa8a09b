use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::{context::CompilerContext, globals::ParameterRequest},
    core::{sanitize_identifier, ValueType},
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixSource {
    /// Render attribute set by game code, declared under the node's name.
    #[default]
    Attribute,
    ObjectToWorld,
    WorldToView,
    ViewToProjection,
}

impl MatrixSource {
    pub fn builtin(self) -> Option<&'static str> {
        match self {
            MatrixSource::Attribute => None,
            MatrixSource::ObjectToWorld => Some("g_matObjectToWorld"),
            MatrixSource::WorldToView => Some("g_matWorldToView"),
            MatrixSource::ViewToProjection => Some("g_matViewToProjection"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixAttributeNode {
    pub source: MatrixSource,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl NodeDefinition for MatrixAttributeNode {
    fn name() -> &'static str {
        "MatrixAttribute"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Matrix4)]
    }
}

impl ShaderNode for MatrixAttributeNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("MatrixAttribute", output));
        }

        match self.source.builtin() {
            Some(global) => Ok(ShaderExpr::new(ValueType::Matrix4, global)),
            None => ctx.result_parameter(ParameterRequest::new(&self.name, ValueType::Matrix4).attribute()),
        }
    }

    fn errors(&self) -> Vec<String> {
        if self.source == MatrixSource::Attribute && sanitize_identifier(&self.name).is_empty() {
            vec!["matrix attribute requires a name".to_owned()]
        } else {
            Vec::new()
        }
    }
}

/// Multiplies a vector by a matrix. With a 4x4 matrix the vector is extended
/// by `w`: 1 transforms a position, 0 a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformVectorNode {
    pub matrix: NodeInput,
    pub vector: NodeInput,
    pub w: f32,
}

impl Default for TransformVectorNode {
    fn default() -> Self {
        Self {
            matrix: NodeInput::disconnected(),
            vector: NodeInput::disconnected(),
            w: 1.0,
        }
    }
}

impl NodeDefinition for TransformVectorNode {
    fn name() -> &'static str {
        "TransformVector"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[("matrix", ValueType::Matrix4), ("vector", ValueType::Vector3)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Vector3)]
    }
}

impl ShaderNode for TransformVectorNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("TransformVector", output));
        }

        let matrix = ctx.required("matrix", &self.matrix)?;
        let vector = ctx
            .result_or_default("vector", &self.vector, [0.0f32, 0.0, 0.0])
            .cast(3, ctx.types())?;

        let code = match matrix.result_type {
            ValueType::Matrix4 => {
                let w = ctx.result_value(self.w);
                format!(
                    "mul( {}, float4( {}, {} ) ).xyz",
                    matrix.code, vector.code, w.code
                )
            }
            ValueType::Matrix3 => format!("mul( {}, {} )", matrix.code, vector.code),
            other => {
                return Err(NodeError::TypeMismatch(format!(
                    "{other} cannot transform a vector3"
                )))
            }
        };

        Ok(ShaderExpr::new(ValueType::Vector3, code))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("matrix", &self.matrix), ("vector", &self.vector)]
    }
}
