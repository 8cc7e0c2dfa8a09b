use glam::Vec4;
use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::context::CompilerContext,
    core::ValueType,
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitVectorNode {
    pub input: NodeInput,
    pub default: Vec4,
}

impl NodeDefinition for SplitVectorNode {
    fn name() -> &'static str {
        "SplitVector"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[("input", ValueType::Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[("x", Float), ("y", Float), ("z", Float), ("w", Float)]
    }
}

impl ShaderNode for SplitVectorNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        let index = COMPONENTS
            .iter()
            .position(|x| *x == output)
            .ok_or_else(|| unknown_output("SplitVector", output))?;

        let input = ctx.result_or_default("input", &self.input, self.default);
        let components = input
            .components()
            .ok_or_else(|| NodeError::invalid_cast(input.result_type, ValueType::Float))?;

        if index >= components as usize {
            return Err(NodeError::TypeMismatch(format!(
                "{} has no {output} component",
                input.result_type
            )));
        }

        Ok(
            ShaderExpr::new(ValueType::Float, format!("{}.{output}", input.operand()))
                .with_constant(input.is_constant),
        )
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("input", &self.input)]
    }
}

/// Builds a float vector from scalar inputs. Vector inputs contribute their
/// first component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineVectorNode {
    pub x: NodeInput,
    pub y: NodeInput,
    pub z: NodeInput,
    pub w: NodeInput,
    pub components: u8,
    pub default: Vec4,
}

impl Default for CombineVectorNode {
    fn default() -> Self {
        Self {
            x: NodeInput::disconnected(),
            y: NodeInput::disconnected(),
            z: NodeInput::disconnected(),
            w: NodeInput::disconnected(),
            components: 4,
            default: Vec4::ZERO,
        }
    }
}

impl NodeDefinition for CombineVectorNode {
    fn name() -> &'static str {
        "CombineVector"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[("x", Float), ("y", Float), ("z", Float), ("w", Float)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for CombineVectorNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("CombineVector", output));
        }

        let result_type = ValueType::vector(self.components)
            .filter(|_| self.components >= 2)
            .ok_or_else(|| NodeError::message("CombineVector needs 2 to 4 components"))?;

        let inputs = self.connections();
        let defaults = self.default.to_array();
        let mut is_constant = true;
        let mut parts = Vec::with_capacity(self.components as usize);
        for ((port, input), default) in inputs
            .into_iter()
            .zip(defaults)
            .take(self.components as usize)
        {
            let value = ctx
                .result_or_default(port, input, default)
                .cast(1, ctx.types())?;
            is_constant &= value.is_constant;
            parts.push(value.code);
        }

        let code = format!("{}( {} )", ctx.types().hlsl_name(result_type), parts.join(", "));
        Ok(ShaderExpr::new(result_type, code).with_constant(is_constant))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("x", &self.x), ("y", &self.y), ("z", &self.z), ("w", &self.w)]
    }

    fn errors(&self) -> Vec<String> {
        if (2..=4).contains(&self.components) {
            Vec::new()
        } else {
            vec![format!("{} is not a vector width", self.components)]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwizzleNode {
    pub input: NodeInput,
    /// One to four of `xyzw` or `rgba`.
    pub mask: String,
}

impl Default for SwizzleNode {
    fn default() -> Self {
        Self {
            input: NodeInput::disconnected(),
            mask: "xyz".to_owned(),
        }
    }
}

impl SwizzleNode {
    /// Component indices of the mask, `None` when it is malformed.
    fn indices(&self) -> Option<Vec<usize>> {
        if self.mask.is_empty() || self.mask.len() > 4 {
            return None;
        }

        let xyzw: Option<Vec<usize>> = self.mask.chars().map(|c| "xyzw".find(c)).collect();
        xyzw.or_else(|| self.mask.chars().map(|c| "rgba".find(c)).collect())
    }
}

impl NodeDefinition for SwizzleNode {
    fn name() -> &'static str {
        "Swizzle"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[("input", ValueType::Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for SwizzleNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("Swizzle", output));
        }

        let indices = self
            .indices()
            .ok_or_else(|| NodeError::message(format!("invalid swizzle \"{}\"", self.mask)))?;

        let input = ctx.result_or_default("input", &self.input, Vec4::ZERO);
        let components = input
            .components()
            .ok_or_else(|| NodeError::invalid_cast(input.result_type, ValueType::Vector4))?;

        if let Some(index) = indices.iter().find(|x| **x >= components as usize) {
            return Err(NodeError::TypeMismatch(format!(
                "{} has no {} component",
                input.result_type, COMPONENTS[*index]
            )));
        }

        let result_type = ValueType::vector(indices.len() as u8)
            .ok_or_else(|| NodeError::message("invalid swizzle width"))?;
        let mask: String = indices.iter().map(|x| COMPONENTS[*x]).collect();

        Ok(
            ShaderExpr::new(result_type, format!("{}.{mask}", input.operand()))
                .with_constant(input.is_constant),
        )
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("input", &self.input)]
    }

    fn errors(&self) -> Vec<String> {
        match self.indices() {
            Some(_) => Vec::new(),
            None => vec![format!("invalid swizzle \"{}\"", self.mask)],
        }
    }
}
