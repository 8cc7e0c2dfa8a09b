use glam::{Vec2, Vec3, Vec4};
use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::{
        context::CompilerContext,
        globals::{ParameterRequest, UiSettings},
    },
    core::{sanitize_identifier, ConstantValue, ValueType},
    model::NodeDefinition,
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

pub const CONSTANT_OUTPUT: &str = "result";

fn name_errors(name: &str) -> Vec<String> {
    if !name.is_empty() && sanitize_identifier(name).is_empty() {
        vec![format!("\"{name}\" is not a usable parameter name")]
    } else {
        Vec::new()
    }
}

/// Literal value, or a parameter once it has a name.
macro_rules! constant_node {
    ($(#[$doc:meta])* $node:ident, $name:literal, $value:ty, $variant:ident) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $node {
            pub value: $value,
            #[serde(skip_serializing_if = "String::is_empty")]
            pub name: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub range: Option<($value, $value)>,
            /// Exposed as a render attribute instead of a material parameter.
            #[serde(skip_serializing_if = "std::ops::Not::not")]
            pub attribute: bool,
            pub ui: UiSettings,
        }

        impl NodeDefinition for $node {
            fn name() -> &'static str {
                $name
            }

            fn input() -> &'static [(&'static str, ValueType)] {
                &[]
            }

            fn output() -> &'static [(&'static str, ValueType)] {
                &[(CONSTANT_OUTPUT, ValueType::$variant)]
            }
        }

        impl ShaderNode for $node {
            fn resolve(
                &self,
                output: &str,
                ctx: &mut CompilerContext<'_>,
            ) -> Result<ShaderExpr, NodeError> {
                if output != CONSTANT_OUTPUT {
                    return Err(unknown_output($name, output));
                }

                let value = ConstantValue::$variant(self.value);
                if self.name.is_empty() {
                    return Ok(ctx.result_value(value));
                }

                let mut request = ParameterRequest::new(&self.name, ValueType::$variant)
                    .with_default(value)
                    .with_ui(self.ui.clone());
                if let Some((min, max)) = self.range {
                    request = request
                        .with_range(ConstantValue::$variant(min), ConstantValue::$variant(max));
                }
                if self.attribute {
                    request = request.attribute();
                }

                ctx.result_parameter(request)
            }

            fn errors(&self) -> Vec<String> {
                name_errors(&self.name)
            }
        }
    };
}

constant_node!(FloatNode, "Float", f32, Float);
constant_node!(IntNode, "Int", i32, Int);
constant_node!(Vector2Node, "Vector2", Vec2, Vector2);
constant_node!(Vector3Node, "Vector3", Vec3, Vector3);
constant_node!(Vector4Node, "Vector4", Vec4, Vector4);
constant_node!(
    /// Linear RGBA color, shown with a color picker when exposed.
    ColorNode,
    "Color",
    Vec4,
    Color
);

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoolNode {
    pub value: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub attribute: bool,
    pub ui: UiSettings,
}

impl NodeDefinition for BoolNode {
    fn name() -> &'static str {
        "Bool"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[(CONSTANT_OUTPUT, ValueType::Bool)]
    }
}

impl ShaderNode for BoolNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != CONSTANT_OUTPUT {
            return Err(unknown_output("Bool", output));
        }

        if self.name.is_empty() {
            return Ok(ctx.result_value(self.value));
        }

        let mut request = ParameterRequest::new(&self.name, ValueType::Bool)
            .with_default(self.value)
            .with_ui(self.ui.clone());
        if self.attribute {
            request = request.attribute();
        }
        ctx.result_parameter(request)
    }

    fn errors(&self) -> Vec<String> {
        name_errors(&self.name)
    }
}
