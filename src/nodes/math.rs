use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::context::CompilerContext,
    core::ValueType,
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{unknown_output, ShaderNode};

pub const MATH_OUTPUT: &str = "result";

/// Component-wise result type of two operands.
fn combined(a: &ShaderExpr, b: &ShaderExpr) -> Result<ValueType, NodeError> {
    if !a.result_type.is_numeric() {
        return Err(NodeError::TypeMismatch(format!(
            "{} is not a numeric value",
            a.result_type
        )));
    }
    if !b.result_type.is_numeric() {
        return Err(NodeError::TypeMismatch(format!(
            "{} is not a numeric value",
            b.result_type
        )));
    }
    a.result_type
        .combine(b.result_type)
        .ok_or_else(|| NodeError::invalid_cast(b.result_type, a.result_type))
}

fn numeric(x: &ShaderExpr) -> Result<ValueType, NodeError> {
    if x.result_type.is_numeric() {
        Ok(x.result_type)
    } else {
        Err(NodeError::TypeMismatch(format!(
            "{} is not a numeric value",
            x.result_type
        )))
    }
}

/// Both operands at their common width, for intrinsics that do not broadcast.
fn widened(
    a: &ShaderExpr,
    b: &ShaderExpr,
    ctx: &CompilerContext<'_>,
) -> Result<(ShaderExpr, ShaderExpr), NodeError> {
    let width = combined(a, b)?
        .components()
        .ok_or_else(|| NodeError::invalid_cast(a.result_type, b.result_type))?;
    Ok((a.cast(width, ctx.types())?, b.cast(width, ctx.types())?))
}

macro_rules! binary_node {
    (
        $(#[$doc:meta])*
        $node:ident, $name:literal, ($default_a:expr, $default_b:expr),
        |$ctx:ident, $a:ident, $b:ident| $code:expr
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $node {
            pub a: NodeInput,
            pub b: NodeInput,
            pub default_a: f32,
            pub default_b: f32,
        }

        impl Default for $node {
            fn default() -> Self {
                Self {
                    a: NodeInput::disconnected(),
                    b: NodeInput::disconnected(),
                    default_a: $default_a,
                    default_b: $default_b,
                }
            }
        }

        impl NodeDefinition for $node {
            fn name() -> &'static str {
                $name
            }

            fn input() -> &'static [(&'static str, ValueType)] {
                &[("a", ValueType::Any), ("b", ValueType::Any)]
            }

            fn output() -> &'static [(&'static str, ValueType)] {
                &[(MATH_OUTPUT, ValueType::Any)]
            }
        }

        impl ShaderNode for $node {
            fn resolve(
                &self,
                output: &str,
                $ctx: &mut CompilerContext<'_>,
            ) -> Result<ShaderExpr, NodeError> {
                if output != MATH_OUTPUT {
                    return Err(unknown_output($name, output));
                }

                let $a = $ctx.result_or_default("a", &self.a, self.default_a);
                let $b = $ctx.result_or_default("b", &self.b, self.default_b);
                let is_constant = $a.is_constant && $b.is_constant;
                let (result_type, code): (ValueType, String) = $code;
                Ok(ShaderExpr::new(result_type, code).with_constant(is_constant))
            }

            fn connections(&self) -> Vec<(&str, &NodeInput)> {
                vec![("a", &self.a), ("b", &self.b)]
            }
        }
    };
}

macro_rules! unary_node {
    (
        $(#[$doc:meta])*
        $node:ident, $name:literal, $default:expr,
        |$x:ident| $code:expr
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $node {
            pub input: NodeInput,
            pub default: f32,
        }

        impl Default for $node {
            fn default() -> Self {
                Self {
                    input: NodeInput::disconnected(),
                    default: $default,
                }
            }
        }

        impl NodeDefinition for $node {
            fn name() -> &'static str {
                $name
            }

            fn input() -> &'static [(&'static str, ValueType)] {
                &[("input", ValueType::Any)]
            }

            fn output() -> &'static [(&'static str, ValueType)] {
                &[(MATH_OUTPUT, ValueType::Any)]
            }
        }

        impl ShaderNode for $node {
            fn resolve(
                &self,
                output: &str,
                ctx: &mut CompilerContext<'_>,
            ) -> Result<ShaderExpr, NodeError> {
                if output != MATH_OUTPUT {
                    return Err(unknown_output($name, output));
                }

                let $x = ctx.result_or_default("input", &self.input, self.default);
                let (result_type, code): (ValueType, String) = $code;
                Ok(ShaderExpr::new(result_type, code).with_constant($x.is_constant))
            }

            fn connections(&self) -> Vec<(&str, &NodeInput)> {
                vec![("input", &self.input)]
            }
        }
    };
}

binary_node!(AddNode, "Add", (0.0, 0.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("{} + {}", a.operand(), b.operand())
));
binary_node!(SubtractNode, "Subtract", (0.0, 0.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("{} - {}", a.operand(), b.operand())
));
binary_node!(MultiplyNode, "Multiply", (1.0, 1.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("{} * {}", a.operand(), b.operand())
));
binary_node!(DivideNode, "Divide", (1.0, 1.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("{} / {}", a.operand(), b.operand())
));
binary_node!(MinNode, "Min", (0.0, 0.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("min( {}, {} )", a.code, b.code)
));
binary_node!(MaxNode, "Max", (0.0, 0.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("max( {}, {} )", a.code, b.code)
));
binary_node!(PowerNode, "Power", (1.0, 1.0), |ctx, a, b| (
    combined(&a, &b)?,
    format!("pow( {}, {} )", a.code, b.code)
));
binary_node!(
    /// Dot product, scalars broadcast to the other operand's width.
    DotNode,
    "Dot",
    (0.0, 0.0),
    |ctx, a, b| {
        let (a, b) = widened(&a, &b, ctx)?;
        (ValueType::Float, format!("dot( {}, {} )", a.code, b.code))
    }
);
binary_node!(CrossNode, "Cross", (0.0, 0.0), |ctx, a, b| {
    let types = ctx.types();
    (
        ValueType::Vector3,
        format!(
            "cross( {}, {} )",
            a.cast(3, types)?.code,
            b.cast(3, types)?.code
        ),
    )
});
binary_node!(DistanceNode, "Distance", (0.0, 0.0), |ctx, a, b| {
    let (a, b) = widened(&a, &b, ctx)?;
    (ValueType::Float, format!("distance( {}, {} )", a.code, b.code))
});

unary_node!(AbsNode, "Abs", 0.0, |x| (numeric(&x)?, format!("abs( {} )", x.code)));
unary_node!(NegateNode, "Negate", 0.0, |x| (numeric(&x)?, format!("-{}", x.operand())));
unary_node!(OneMinusNode, "OneMinus", 0.0, |x| (
    numeric(&x)?,
    format!("1 - {}", x.operand())
));
unary_node!(SaturateNode, "Saturate", 0.0, |x| (
    numeric(&x)?,
    format!("saturate( {} )", x.code)
));
unary_node!(NormalizeNode, "Normalize", 0.0, |x| (
    numeric(&x)?,
    format!("normalize( {} )", x.code)
));
unary_node!(LengthNode, "Length", 0.0, |x| {
    numeric(&x)?;
    (ValueType::Float, format!("length( {} )", x.code))
});
unary_node!(SinNode, "Sin", 0.0, |x| (numeric(&x)?, format!("sin( {} )", x.code)));
unary_node!(CosNode, "Cos", 0.0, |x| (numeric(&x)?, format!("cos( {} )", x.code)));
unary_node!(FracNode, "Frac", 0.0, |x| (numeric(&x)?, format!("frac( {} )", x.code)));
unary_node!(FloorNode, "Floor", 0.0, |x| (numeric(&x)?, format!("floor( {} )", x.code)));
unary_node!(CeilNode, "Ceil", 0.0, |x| (numeric(&x)?, format!("ceil( {} )", x.code)));
unary_node!(SqrtNode, "Sqrt", 0.0, |x| (numeric(&x)?, format!("sqrt( {} )", x.code)));

/// Linear interpolation, `t` is either a scalar or matches the operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LerpNode {
    pub a: NodeInput,
    pub b: NodeInput,
    pub t: NodeInput,
    pub default_a: f32,
    pub default_b: f32,
    pub default_t: f32,
}

impl Default for LerpNode {
    fn default() -> Self {
        Self {
            a: NodeInput::disconnected(),
            b: NodeInput::disconnected(),
            t: NodeInput::disconnected(),
            default_a: 0.0,
            default_b: 1.0,
            default_t: 0.5,
        }
    }
}

impl NodeDefinition for LerpNode {
    fn name() -> &'static str {
        "Lerp"
    }

    fn version() -> u32 {
        2
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[
            ("a", ValueType::Any),
            ("b", ValueType::Any),
            ("t", ValueType::Any),
        ]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[(MATH_OUTPUT, ValueType::Any)]
    }
}

impl ShaderNode for LerpNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != MATH_OUTPUT {
            return Err(unknown_output("Lerp", output));
        }

        let a = ctx.result_or_default("a", &self.a, self.default_a);
        let b = ctx.result_or_default("b", &self.b, self.default_b);
        let t = ctx.result_or_default("t", &self.t, self.default_t);

        let (a, b) = widened(&a, &b, ctx)?;
        let result_type = combined(&a, &b)?;
        if t.components() != Some(1) {
            combined(&a, &t)?;
        }

        let is_constant = a.is_constant && b.is_constant && t.is_constant;
        Ok(
            ShaderExpr::new(result_type, format!("lerp( {}, {}, {} )", a.code, b.code, t.code))
                .with_constant(is_constant),
        )
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("a", &self.a), ("b", &self.b), ("t", &self.t)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClampNode {
    pub input: NodeInput,
    pub min: NodeInput,
    pub max: NodeInput,
    pub default_min: f32,
    pub default_max: f32,
}

impl Default for ClampNode {
    fn default() -> Self {
        Self {
            input: NodeInput::disconnected(),
            min: NodeInput::disconnected(),
            max: NodeInput::disconnected(),
            default_min: 0.0,
            default_max: 1.0,
        }
    }
}

impl NodeDefinition for ClampNode {
    fn name() -> &'static str {
        "Clamp"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[
            ("input", ValueType::Any),
            ("min", ValueType::Any),
            ("max", ValueType::Any),
        ]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[(MATH_OUTPUT, ValueType::Any)]
    }
}

impl ShaderNode for ClampNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != MATH_OUTPUT {
            return Err(unknown_output("Clamp", output));
        }

        let x = ctx.result_or_default("input", &self.input, 0.0f32);
        let min = ctx.result_or_default("min", &self.min, self.default_min);
        let max = ctx.result_or_default("max", &self.max, self.default_max);

        let result_type = combined(&x, &min)?;
        numeric(&max)?;
        let result_type = result_type
            .combine(max.result_type)
            .ok_or_else(|| NodeError::invalid_cast(max.result_type, result_type))?;
        let is_constant = x.is_constant && min.is_constant && max.is_constant;

        Ok(ShaderExpr::new(
            result_type,
            format!("clamp( {}, {}, {} )", x.code, min.code, max.code),
        )
        .with_constant(is_constant))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("input", &self.input), ("min", &self.min), ("max", &self.max)]
    }
}

/// Maps `input` from one range onto another without clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemapNode {
    pub input: NodeInput,
    pub in_min: f32,
    pub in_max: f32,
    pub out_min: f32,
    pub out_max: f32,
}

impl Default for RemapNode {
    fn default() -> Self {
        Self {
            input: NodeInput::disconnected(),
            in_min: 0.0,
            in_max: 1.0,
            out_min: 0.0,
            out_max: 1.0,
        }
    }
}

impl NodeDefinition for RemapNode {
    fn name() -> &'static str {
        "Remap"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[("input", ValueType::Any)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[(MATH_OUTPUT, ValueType::Any)]
    }
}

impl ShaderNode for RemapNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != MATH_OUTPUT {
            return Err(unknown_output("Remap", output));
        }

        let x = ctx.result_or_default("input", &self.input, 0.0f32);
        let result_type = numeric(&x)?;

        let in_min = ctx.result_value(self.in_min);
        let in_max = ctx.result_value(self.in_max);
        let out_min = ctx.result_value(self.out_min);
        let out_max = ctx.result_value(self.out_max);

        let code = format!(
            "{} + ( {} - {} ) * ( {} - {} ) / ( {} - {} )",
            out_min.code, x.operand(), in_min.code, out_max.code, out_min.code, in_max.code, in_min.code
        );
        Ok(ShaderExpr::new(result_type, code).with_constant(x.is_constant))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![("input", &self.input)]
    }

    fn errors(&self) -> Vec<String> {
        if self.in_min == self.in_max {
            vec!["input range is empty".to_owned()]
        } else {
            Vec::new()
        }
    }
}
