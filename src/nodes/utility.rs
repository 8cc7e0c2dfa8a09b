use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::context::CompilerContext,
    core::ValueType,
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

/// Pass-through used to tidy up wires.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerouteNode {
    pub input: NodeInput,
}

impl NodeDefinition for RerouteNode {
    fn name() -> &'static str {
        "Reroute"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[("input", ValueType::Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for RerouteNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("Reroute", output));
        }
        ctx.required("input", &self.input)
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("input", &self.input)]
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl NodeDefinition for CommentNode {
    fn name() -> &'static str {
        "Comment"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[]
    }
}

impl ShaderNode for CommentNode {
    fn resolve(&self, output: &str, _ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        Err(unknown_output("Comment", output))
    }
}
