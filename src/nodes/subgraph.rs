use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::context::{CompilerContext, SUBGRAPH_OUTPUT_PORT},
    core::{ConstantValue, ValueType},
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{material::MaterialChannel, unknown_output, NodeRole, ShaderNode};

/// Named argument of a subgraph.
///
/// Inside a call it yields the value bound at the call site, resolved in the
/// caller's scope. Unbound, or when the subgraph is compiled on its own, it
/// yields `default`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgraphInputNode {
    pub name: String,
    pub value_type: ValueType,
    pub default: ConstantValue,
    /// Call sites must bind this input.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl NodeDefinition for SubgraphInputNode {
    fn name() -> &'static str {
        "SubgraphInput"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Any)]
    }
}

impl ShaderNode for SubgraphInputNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("SubgraphInput", output));
        }

        let value = match ctx.subgraph_argument(&self.name) {
            Some(result) => result.into_expr(&self.name)?,
            None if self.required && !ctx.current_scope().is_empty() => {
                return Err(NodeError::MissingInput(self.name.clone()))
            }
            None => ctx.result_value(self.default),
        };

        value.cast_to(self.value_type, ctx.types())
    }

    fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.is_empty() {
            errors.push("subgraph input requires a name".to_owned());
        }
        if self.value_type == ValueType::Any {
            errors.push(format!("subgraph input \"{}\" requires a type", self.name));
        }
        errors
    }

    fn role(&self) -> NodeRole<'_> {
        NodeRole::SubgraphInput { name: &self.name }
    }
}

/// Named result of a subgraph, optionally wired to a material channel when
/// the subgraph is compiled on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgraphOutputNode {
    pub name: String,
    pub value: NodeInput,
    /// `Any` keeps the type of the connected value.
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<MaterialChannel>,
}

impl Default for SubgraphOutputNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: NodeInput::disconnected(),
            value_type: ValueType::Any,
            preview: None,
        }
    }
}

impl NodeDefinition for SubgraphOutputNode {
    fn name() -> &'static str {
        "SubgraphOutput"
    }

    fn version() -> u32 {
        2
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[(SUBGRAPH_OUTPUT_PORT, ValueType::Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[(SUBGRAPH_OUTPUT_PORT, ValueType::Any)]
    }
}

impl ShaderNode for SubgraphOutputNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != SUBGRAPH_OUTPUT_PORT {
            return Err(unknown_output("SubgraphOutput", output));
        }

        let value = ctx.required(SUBGRAPH_OUTPUT_PORT, &self.value)?;
        value.cast_to(self.value_type, ctx.types())
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![(SUBGRAPH_OUTPUT_PORT, &self.value)]
    }

    fn errors(&self) -> Vec<String> {
        if self.name.is_empty() {
            vec!["subgraph output requires a name".to_owned()]
        } else {
            Vec::new()
        }
    }

    fn warnings(&self) -> Vec<String> {
        if self.value.is_connected() {
            Vec::new()
        } else {
            vec![format!("subgraph output \"{}\" is not connected", self.name)]
        }
    }

    fn role(&self) -> NodeRole<'_> {
        NodeRole::SubgraphOutput {
            name: &self.name,
            channel: self.preview,
        }
    }
}

/// Call of the subgraph document at `path`. Its outputs are the subgraph's
/// output names, its inputs the subgraph's input names.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgraphNode {
    pub path: String,
    pub inputs: BTreeMap<String, NodeInput>,
}

impl NodeDefinition for SubgraphNode {
    fn name() -> &'static str {
        "Subgraph"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[]
    }
}

impl ShaderNode for SubgraphNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        ctx.call_subgraph(output)
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }

    fn errors(&self) -> Vec<String> {
        if self.path.is_empty() {
            vec!["subgraph path is empty".to_owned()]
        } else {
            Vec::new()
        }
    }

    fn metadata(&self) -> Vec<(&'static str, String)> {
        vec![("subgraph", self.path.clone())]
    }

    fn role(&self) -> NodeRole<'_> {
        NodeRole::SubgraphCall { path: &self.path }
    }
}
