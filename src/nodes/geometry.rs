//! Interpolated vertex data and engine globals.
//!
//! Every node here reads a different source in each stage: the pixel stage
//! uses the interpolated `PixelInput` fields, the vertex stage derives them
//! from the object space `VertexInput`.

use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::{context::CompilerContext, ShaderStage},
    core::ValueType,
    model::NodeDefinition,
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

pub const GEOMETRY_OUTPUT: &str = "result";

pub(crate) fn tex_coord(stage: ShaderStage) -> ShaderExpr {
    match stage {
        ShaderStage::Pixel => ShaderExpr::new(ValueType::Vector2, "i.vTextureCoords.xy"),
        ShaderStage::Vertex => ShaderExpr::new(ValueType::Vector2, "i.vTexCoord.xy"),
    }
}

pub(crate) fn world_position(stage: ShaderStage) -> ShaderExpr {
    match stage {
        ShaderStage::Pixel => ShaderExpr::new(ValueType::Vector3, "i.vPositionWithOffsetWs.xyz"),
        ShaderStage::Vertex => ShaderExpr::new(
            ValueType::Vector3,
            "mul( g_matObjectToWorld, float4( i.vPositionOs, 1 ) ).xyz",
        ),
    }
}

pub(crate) fn world_normal(stage: ShaderStage) -> ShaderExpr {
    match stage {
        ShaderStage::Pixel => ShaderExpr::new(ValueType::Vector3, "i.vNormalWs"),
        ShaderStage::Vertex => ShaderExpr::new(
            ValueType::Vector3,
            "normalize( mul( (float3x3)g_matObjectToWorld, i.vNormalOs ) )",
        ),
    }
}

pub(crate) fn view_direction(stage: ShaderStage) -> ShaderExpr {
    let position = world_position(stage);
    ShaderExpr::new(
        ValueType::Vector3,
        format!("normalize( g_vCameraPositionWs - {} )", position.operand()),
    )
}

macro_rules! geometry_node {
    ($(#[$doc:meta])* $node:ident, $name:literal, $value_type:ident, |$stage:ident| $code:expr) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $node {}

        impl NodeDefinition for $node {
            fn name() -> &'static str {
                $name
            }

            fn input() -> &'static [(&'static str, ValueType)] {
                &[]
            }

            fn output() -> &'static [(&'static str, ValueType)] {
                &[(GEOMETRY_OUTPUT, ValueType::$value_type)]
            }
        }

        impl ShaderNode for $node {
            fn resolve(
                &self,
                output: &str,
                ctx: &mut CompilerContext<'_>,
            ) -> Result<ShaderExpr, NodeError> {
                if output != GEOMETRY_OUTPUT {
                    return Err(unknown_output($name, output));
                }

                let $stage = ctx.stage();
                $code
            }
        }
    };
}

geometry_node!(TexCoordNode, "TexCoord", Vector2, |stage| Ok(tex_coord(stage)));
geometry_node!(WorldPositionNode, "WorldPosition", Vector3, |stage| Ok(
    world_position(stage)
));
geometry_node!(WorldNormalNode, "WorldNormal", Vector3, |stage| Ok(world_normal(
    stage
)));
geometry_node!(
    /// Normalized direction from the surface towards the camera.
    ViewDirectionNode,
    "ViewDirection",
    Vector3,
    |stage| Ok(view_direction(stage))
);
geometry_node!(VertexColorNode, "VertexColor", Vector4, |stage| Ok(
    match stage {
        ShaderStage::Pixel => ShaderExpr::new(ValueType::Vector4, "i.vVertexColor"),
        ShaderStage::Vertex => ShaderExpr::new(ValueType::Vector4, "i.vColor"),
    }
));
geometry_node!(TimeNode, "Time", Float, |_stage| Ok(ShaderExpr::new(
    ValueType::Float,
    "g_flTime"
)));
geometry_node!(
    /// Pixel position in screen space, only available to the pixel stage.
    ScreenPositionNode,
    "ScreenPosition",
    Vector2,
    |stage| match stage {
        ShaderStage::Pixel => Ok(ShaderExpr::new(ValueType::Vector2, "i.vPositionSs.xy")),
        ShaderStage::Vertex => Err(NodeError::message(
            "screen position is not available in the vertex stage"
        )),
    }
);
