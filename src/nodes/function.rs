use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::context::CompilerContext,
    core::{ConstantValue, ValueType},
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{
    geometry::{view_direction, world_normal},
    unknown_output, ShaderNode,
};

fn is_identifier(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionArgument {
    pub name: String,
    pub value_type: ValueType,
    pub input: NodeInput,
}

/// User written function. The body is wrapped in a declaration built from
/// the arguments and emitted once however many nodes use it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFunctionNode {
    pub name: String,
    pub body: String,
    pub result_type: ValueType,
    pub arguments: Vec<FunctionArgument>,
}

impl CustomFunctionNode {
    pub fn declaration(&self, ctx: &CompilerContext<'_>) -> String {
        let types = ctx.types();
        let arguments = self
            .arguments
            .iter()
            .map(|x| format!("{} {}", types.hlsl_name(x.value_type), x.name))
            .collect::<Vec<_>>();

        let body = self
            .body
            .trim()
            .lines()
            .map(|x| {
                if x.trim().is_empty() {
                    String::new()
                } else {
                    format!("    {}", x.trim_end())
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let signature = if arguments.is_empty() {
            format!("{} {}()", types.hlsl_name(self.result_type), self.name)
        } else {
            format!(
                "{} {}( {} )",
                types.hlsl_name(self.result_type),
                self.name,
                arguments.join(", ")
            )
        };

        format!("{signature}\n{{\n{body}\n}}")
    }
}

impl NodeDefinition for CustomFunctionNode {
    fn name() -> &'static str {
        "CustomFunction"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for CustomFunctionNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("CustomFunction", output));
        }

        let declaration = self.declaration(ctx);
        let name = ctx.register_function(&declaration)?;

        let mut arguments = Vec::with_capacity(self.arguments.len());
        for argument in self.arguments.iter() {
            let value = match ConstantValue::zero(argument.value_type) {
                Some(zero) => ctx.result_or_default(&argument.name, &argument.input, zero),
                None => ctx.required(&argument.name, &argument.input)?,
            };
            arguments.push(value.cast_to(argument.value_type, ctx.types())?);
        }

        let arguments: Vec<&ShaderExpr> = arguments.iter().collect();
        Ok(ctx.result_function(&name, &arguments, self.result_type))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        self.arguments
            .iter()
            .map(|x| (x.name.as_str(), &x.input))
            .collect()
    }

    fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !is_identifier(&self.name) {
            errors.push(format!("\"{}\" is not a valid function name", self.name));
        }
        if self.result_type == ValueType::Any || self.result_type.is_object() {
            errors.push(format!("{} cannot be returned", self.result_type));
        }
        for (index, argument) in self.arguments.iter().enumerate() {
            if !is_identifier(&argument.name) {
                errors.push(format!("\"{}\" is not a valid argument name", argument.name));
            }
            if self.arguments[..index].iter().any(|x| x.name == argument.name) {
                errors.push(format!("duplicate argument \"{}\"", argument.name));
            }
        }
        errors
    }

    fn warnings(&self) -> Vec<String> {
        if self.body.contains("return") {
            Vec::new()
        } else {
            vec![format!("{} has no return statement", self.name)]
        }
    }
}

const FRESNEL_FUNCTION: &str = "float Fresnel( float3 vNormal, float3 vView, float flPower )
{
    return pow( 1.0f - saturate( dot( normalize( vNormal ), normalize( vView ) ) ), flPower );
}";

/// Rim term `pow( 1 - N.V, power )`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FresnelNode {
    pub normal: NodeInput,
    pub view: NodeInput,
    pub power: NodeInput,
    pub default_power: f32,
}

impl Default for FresnelNode {
    fn default() -> Self {
        Self {
            normal: NodeInput::disconnected(),
            view: NodeInput::disconnected(),
            power: NodeInput::disconnected(),
            default_power: 5.0,
        }
    }
}

impl NodeDefinition for FresnelNode {
    fn name() -> &'static str {
        "Fresnel"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[("normal", Vector3), ("view", Vector3), ("power", Float)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Float)]
    }
}

impl ShaderNode for FresnelNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("Fresnel", output));
        }

        let name = ctx.register_function(FRESNEL_FUNCTION)?;
        let normal = match ctx.optional("normal", &self.normal)? {
            Some(normal) => normal.cast(3, ctx.types())?,
            None => world_normal(ctx.stage()),
        };
        let view = match ctx.optional("view", &self.view)? {
            Some(view) => view.cast(3, ctx.types())?,
            None => view_direction(ctx.stage()),
        };
        let power = ctx
            .result_or_default("power", &self.power, self.default_power)
            .cast(1, ctx.types())?;

        Ok(ctx.result_function(&name, &[&normal, &view, &power], ValueType::Float))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![
            ("normal", &self.normal),
            ("view", &self.view),
            ("power", &self.power),
        ]
    }
}
