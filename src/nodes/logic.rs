use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::context::CompilerContext,
    core::{sanitize_identifier, ValueType},
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl Comparison {
    pub fn to_str(self) -> &'static str {
        match self {
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::Greater => ">",
            Comparison::GreaterEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessEqual => "<=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol.trim() {
            "==" => Comparison::Equal,
            "!=" => Comparison::NotEqual,
            ">" => Comparison::Greater,
            ">=" => Comparison::GreaterEqual,
            "<" => Comparison::Less,
            "<=" => Comparison::LessEqual,
            _ => return None,
        })
    }
}

/// Both values at the width of their combined type.
fn select_operands(
    ctx: &CompilerContext<'_>,
    on: ShaderExpr,
    off: ShaderExpr,
) -> Result<(ValueType, ShaderExpr, ShaderExpr), NodeError> {
    let result_type = on
        .result_type
        .combine(off.result_type)
        .ok_or_else(|| NodeError::invalid_cast(off.result_type, on.result_type))?;
    let on = on.cast_to(result_type, ctx.types())?;
    let off = off.cast_to(result_type, ctx.types())?;
    Ok((result_type, on, off))
}

/// Runtime selection from a comparison of two scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchNode {
    pub a: NodeInput,
    pub b: NodeInput,
    pub on_true: NodeInput,
    pub on_false: NodeInput,
    pub operator: Comparison,
    pub default_a: f32,
    pub default_b: f32,
    pub default_true: f32,
    pub default_false: f32,
}

impl Default for BranchNode {
    fn default() -> Self {
        Self {
            a: NodeInput::disconnected(),
            b: NodeInput::disconnected(),
            on_true: NodeInput::disconnected(),
            on_false: NodeInput::disconnected(),
            operator: Comparison::Equal,
            default_a: 0.0,
            default_b: 0.0,
            default_true: 1.0,
            default_false: 0.0,
        }
    }
}

impl NodeDefinition for BranchNode {
    fn name() -> &'static str {
        "Branch"
    }

    fn version() -> u32 {
        2
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[("a", Float), ("b", Float), ("on_true", Any), ("on_false", Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for BranchNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("Branch", output));
        }

        let a = ctx.result_or_default("a", &self.a, self.default_a);
        let b = ctx.result_or_default("b", &self.b, self.default_b);
        for x in [&a, &b] {
            if x.components() != Some(1) {
                return Err(NodeError::TypeMismatch(format!(
                    "branch compares scalars, got {}",
                    x.result_type
                )));
            }
        }

        let on = ctx.result_or_default("on_true", &self.on_true, self.default_true);
        let off = ctx.result_or_default("on_false", &self.on_false, self.default_false);
        let is_constant = a.is_constant && b.is_constant && on.is_constant && off.is_constant;
        let (result_type, on, off) = select_operands(ctx, on, off)?;

        let code = format!(
            "( {} {} {} ) ? {} : {}",
            a.code,
            self.operator.to_str(),
            b.code,
            on.operand(),
            off.operand()
        );
        Ok(ShaderExpr::new(result_type, code).with_constant(is_constant))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![
            ("a", &self.a),
            ("b", &self.b),
            ("on_true", &self.on_true),
            ("on_false", &self.on_false),
        ]
    }
}

/// Compile time switch.
///
/// Final builds declare a feature with a static combo and select the branch
/// with `#if`. Previews read a bool attribute at runtime so toggling the
/// switch does not need a recompile. Switches sharing a name share the
/// feature, and in previews the attribute.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSwitchNode {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    pub on_true: NodeInput,
    pub on_false: NodeInput,
    /// Attribute default used by previews.
    pub preview_value: bool,
}

impl NodeDefinition for StaticSwitchNode {
    fn name() -> &'static str {
        "StaticSwitch"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[("on_true", ValueType::Any), ("on_false", ValueType::Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for StaticSwitchNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("StaticSwitch", output));
        }

        let on = ctx.result_or_default("on_true", &self.on_true, 0.0f32);
        let off = ctx.result_or_default("on_false", &self.on_false, 0.0f32);
        let (result_type, on, off) = select_operands(ctx, on, off)?;

        if ctx.is_preview() {
            let toggle = ctx.result_feature_toggle(&self.name, self.preview_value)?;
            let code = format!("{} ? {} : {}", toggle.code, on.operand(), off.operand());
            return Ok(ShaderExpr::new(result_type, code));
        }

        let feature = ctx.register_feature(&self.name, &self.group)?;
        Ok(ctx.static_select(&feature, result_type, &on, &off))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("on_true", &self.on_true), ("on_false", &self.on_false)]
    }

    fn errors(&self) -> Vec<String> {
        if sanitize_identifier(&self.name).is_empty() {
            vec!["static switch requires a name".to_owned()]
        } else {
            Vec::new()
        }
    }

    fn metadata(&self) -> Vec<(&'static str, String)> {
        vec![("feature", self.name.clone())]
    }
}
