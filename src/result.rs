use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::{is_atomic_expression, TypeRegistry, ValueType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: ValueType, to: String },
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("unknown output: {0}")]
    UnknownOutput(String),
    #[error("input {0} could not be resolved")]
    InvalidUpstream(String),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("dependency cycle: {0}")]
    Cycle(String),
    #[error("{0}")]
    Message(String),
}

impl NodeError {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    pub fn invalid_cast(from: ValueType, to: impl ToString) -> Self {
        Self::InvalidCast {
            from,
            to: to.to_string(),
        }
    }
}

/// A compiled, valid expression for one node output at one call site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderExpr {
    pub result_type: ValueType,
    pub code: String,
    pub is_constant: bool,
    pub metadata: BTreeMap<String, String>,
}

impl ShaderExpr {
    pub fn new(result_type: ValueType, code: impl Into<String>) -> Self {
        Self {
            result_type,
            code: code.into(),
            is_constant: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn constant(result_type: ValueType, code: impl Into<String>) -> Self {
        Self {
            is_constant: true,
            ..Self::new(result_type, code)
        }
    }

    #[must_use]
    pub fn with_constant(mut self, is_constant: bool) -> Self {
        self.is_constant = is_constant;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }

    pub fn components(&self) -> Option<u8> {
        self.result_type.components()
    }

    /// Code usable as an operand of a larger expression.
    pub fn operand(&self) -> String {
        if is_atomic_expression(&self.code) {
            self.code.clone()
        } else {
            format!("( {} )", self.code)
        }
    }

    /// Coerces this value to an `n` component float vector.
    ///
    /// Same width is a no-op, a scalar broadcasts to any width and a wider
    /// vector truncates through a swizzle. Every other combination is an
    /// `InvalidCast`, including widening one vector to another.
    pub fn cast(&self, components: u8, types: &TypeRegistry) -> Result<ShaderExpr, NodeError> {
        let target = ValueType::vector(components)
            .ok_or_else(|| NodeError::invalid_cast(self.result_type, components))?;

        let current = self
            .components()
            .ok_or_else(|| NodeError::invalid_cast(self.result_type, target))?;

        let code = if current == components {
            return Ok(self.clone());
        } else if current == 1 {
            let operand = self.operand();
            let list = vec![operand.as_str(); components as usize].join(", ");
            format!("{}( {list} )", types.hlsl_name(target))
        } else if current > components {
            let swizzle = &"xyzw"[..components as usize];
            format!("{}.{swizzle}", self.operand())
        } else {
            return Err(NodeError::invalid_cast(self.result_type, target));
        };

        Ok(ShaderExpr {
            result_type: target,
            code,
            is_constant: self.is_constant,
            metadata: self.metadata.clone(),
        })
    }

    /// Casts to the component count of `value_type`, keeping `Color` and
    /// integer identities where the width already matches.
    pub fn cast_to(
        &self,
        value_type: ValueType,
        types: &TypeRegistry,
    ) -> Result<ShaderExpr, NodeError> {
        if value_type == self.result_type || value_type == ValueType::Any {
            return Ok(self.clone());
        }

        let components = value_type
            .components()
            .ok_or_else(|| NodeError::invalid_cast(self.result_type, value_type))?;

        let mut result = self.cast(components, types)?;
        if result.components() == value_type.components() {
            result.result_type = value_type;
        }
        Ok(result)
    }
}

/// Outcome of resolving one node output.
///
/// The invalid variants carry a diagnostic and no code, so an invalid result
/// cannot end up in emitted text.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResult {
    Valid(ShaderExpr),
    Error(String),
    MissingInput(String),
}

impl NodeResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn missing_input(port: impl Into<String>) -> Self {
        Self::MissingInput(port.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn expr(&self) -> Option<&ShaderExpr> {
        match self {
            Self::Valid(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn result_type(&self) -> Option<ValueType> {
        self.expr().map(|x| x.result_type)
    }

    pub fn components(&self) -> Option<u8> {
        self.expr().and_then(|x| x.components())
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Valid(_) => None,
            Self::Error(message) | Self::MissingInput(message) => Some(message),
        }
    }

    pub fn into_expr(self, port: &str) -> Result<ShaderExpr, NodeError> {
        match self {
            Self::Valid(expr) => Ok(expr),
            Self::Error(_) => Err(NodeError::InvalidUpstream(port.to_owned())),
            Self::MissingInput(_) => Err(NodeError::MissingInput(port.to_owned())),
        }
    }
}

impl From<ShaderExpr> for NodeResult {
    fn from(value: ShaderExpr) -> Self {
        Self::Valid(value)
    }
}

impl From<NodeError> for NodeResult {
    fn from(value: NodeError) -> Self {
        match value {
            NodeError::MissingInput(port) => Self::MissingInput(port),
            other => Self::Error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn types() -> TypeRegistry {
        TypeRegistry::default()
    }

    #[test]
    fn test_cast_same_width_is_noop() {
        let value = ShaderExpr::new(ValueType::Vector3, "l_0");
        assert_eq!(value.cast(3, &types()).unwrap(), value);
    }

    #[test]
    fn test_cast_scalar_broadcast() {
        let value = ShaderExpr::new(ValueType::Float, "l_1");
        let cast = value.cast(3, &types()).unwrap();
        assert_eq!(cast.code, "float3( l_1, l_1, l_1 )");
        assert_eq!(cast.components(), Some(3));

        let sum = ShaderExpr::constant(ValueType::Float, "a + b");
        assert_eq!(
            sum.cast(2, &types()).unwrap().code,
            "float2( ( a + b ), ( a + b ) )"
        );
    }

    #[test]
    fn test_cast_truncation() {
        let value = ShaderExpr::new(ValueType::Color, "l_2");
        assert_eq!(value.cast(3, &types()).unwrap().code, "l_2.xyz");
        assert_eq!(value.cast(1, &types()).unwrap().code, "l_2.x");

        let sum = ShaderExpr::new(ValueType::Vector4, "a + b");
        assert_eq!(sum.cast(2, &types()).unwrap().code, "( a + b ).xy");
    }

    #[test]
    fn test_cast_widening_vectors_fails() {
        let value = ShaderExpr::new(ValueType::Vector2, "l_3");
        assert!(matches!(
            value.cast(4, &types()),
            Err(NodeError::InvalidCast { .. })
        ));
    }

    #[test]
    fn test_cast_objects_fail() {
        let texture = ShaderExpr::new(ValueType::Texture2D, "g_tColor");
        assert!(texture.cast(3, &types()).is_err());
        let matrix = ShaderExpr::new(ValueType::Matrix4, "g_mWorld");
        assert!(matrix.cast(4, &types()).is_err());
        assert!(matrix.components().is_none());
    }

    #[test]
    fn test_cast_to_keeps_color_identity() {
        let value = ShaderExpr::new(ValueType::Float, "x");
        let color = value.cast_to(ValueType::Color, &types()).unwrap();
        assert_eq!(color.result_type, ValueType::Color);
        assert_eq!(color.code, "float4( x, x, x, x )");
    }

    #[test]
    fn test_invalid_results_have_no_code() {
        let result = NodeResult::missing_input("B");
        assert!(!result.is_valid());
        assert!(result.expr().is_none());
        assert_eq!(
            result.into_expr("B"),
            Err(NodeError::MissingInput("B".to_owned()))
        );
    }
}
