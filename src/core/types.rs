use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    #[default]
    Float,
    Vector2,
    Vector3,
    Vector4,
    Color,
    Matrix2,
    Matrix3,
    Matrix4,
    Sampler,
    Texture2D,
    TextureCube,
    Any,
}

impl ValueType {
    pub const ALL: [ValueType; 14] = [
        ValueType::Bool,
        ValueType::Int,
        ValueType::Float,
        ValueType::Vector2,
        ValueType::Vector3,
        ValueType::Vector4,
        ValueType::Color,
        ValueType::Matrix2,
        ValueType::Matrix3,
        ValueType::Matrix4,
        ValueType::Sampler,
        ValueType::Texture2D,
        ValueType::TextureCube,
        ValueType::Any,
    ];

    /// Number of scalar components, `None` for matrices and objects.
    pub const fn components(self) -> Option<u8> {
        match self {
            ValueType::Bool | ValueType::Int | ValueType::Float => Some(1),
            ValueType::Vector2 => Some(2),
            ValueType::Vector3 => Some(3),
            ValueType::Vector4 | ValueType::Color => Some(4),
            ValueType::Matrix2
            | ValueType::Matrix3
            | ValueType::Matrix4
            | ValueType::Sampler
            | ValueType::Texture2D
            | ValueType::TextureCube
            | ValueType::Any => None,
        }
    }

    /// Float vector type with the given component count.
    pub const fn vector(components: u8) -> Option<ValueType> {
        match components {
            1 => Some(ValueType::Float),
            2 => Some(ValueType::Vector2),
            3 => Some(ValueType::Vector3),
            4 => Some(ValueType::Vector4),
            _ => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        self.components().is_some()
    }

    pub const fn is_scalar(self) -> bool {
        matches!(self, ValueType::Bool | ValueType::Int | ValueType::Float)
    }

    pub const fn is_matrix(self) -> bool {
        matches!(
            self,
            ValueType::Matrix2 | ValueType::Matrix3 | ValueType::Matrix4
        )
    }

    pub const fn is_object(self) -> bool {
        matches!(
            self,
            ValueType::Sampler | ValueType::Texture2D | ValueType::TextureCube
        )
    }

    pub fn to_str(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Vector2 => "vector2",
            ValueType::Vector3 => "vector3",
            ValueType::Vector4 => "vector4",
            ValueType::Color => "color",
            ValueType::Matrix2 => "matrix2",
            ValueType::Matrix3 => "matrix3",
            ValueType::Matrix4 => "matrix4",
            ValueType::Sampler => "sampler",
            ValueType::Texture2D => "texture2d",
            ValueType::TextureCube => "texture_cube",
            ValueType::Any => "any",
        }
    }

    /// Result type of a component-wise binary operation.
    ///
    /// Scalars broadcast against anything numeric. Two vectors must agree
    /// on width, a `Color` combined with a `Vector4` gives a `Vector4`.
    pub fn combine(self, other: ValueType) -> Option<ValueType> {
        let (a, b) = (self.components()?, other.components()?);
        match (a, b) {
            (1, 1) => Some(match (self, other) {
                (ValueType::Int, ValueType::Int) => ValueType::Int,
                (ValueType::Bool, ValueType::Bool) => ValueType::Bool,
                _ => ValueType::Float,
            }),
            (1, _) => Some(other),
            (_, 1) => Some(self),
            (a, b) if a == b => {
                if self == other {
                    Some(self)
                } else {
                    ValueType::vector(a)
                }
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub value_type: ValueType,
    pub hlsl_name: String,
    pub global_prefix: String,
    pub material_editor: bool,
    pub render_attribute: bool,
    pub editor_only: bool,
}

impl TypeEntry {
    pub fn new(value_type: ValueType, hlsl_name: &str, global_prefix: &str) -> Self {
        Self {
            value_type,
            hlsl_name: hlsl_name.to_owned(),
            global_prefix: global_prefix.to_owned(),
            material_editor: false,
            render_attribute: false,
            editor_only: false,
        }
    }

    #[must_use]
    pub fn material_editor(mut self) -> Self {
        self.material_editor = true;
        self
    }

    #[must_use]
    pub fn render_attribute(mut self) -> Self {
        self.render_attribute = true;
        self
    }

    #[must_use]
    pub fn editor_only(mut self) -> Self {
        self.editor_only = true;
        self
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TypeRegistryError {
    #[error("duplicate type registry entry for {0}")]
    DuplicateEntry(ValueType),
    #[error("missing type registry entry for {0}")]
    MissingEntry(ValueType),
}

/// Immutable table of shader-visible type information.
///
/// Built once and borrowed by every compile session. Code generation takes
/// type names and global prefixes from here and nowhere else.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
}

impl TypeRegistry {
    pub fn new(entries: impl Into<Vec<TypeEntry>>) -> Result<Self, TypeRegistryError> {
        let mut entries: Vec<TypeEntry> = entries.into();
        entries.sort_by_key(|x| x.value_type);

        for pair in entries.windows(2) {
            if pair[0].value_type == pair[1].value_type {
                return Err(TypeRegistryError::DuplicateEntry(pair[0].value_type));
            }
        }

        for value_type in ValueType::ALL {
            if !entries.iter().any(|x| x.value_type == value_type) {
                return Err(TypeRegistryError::MissingEntry(value_type));
            }
        }

        Ok(Self { entries })
    }

    pub fn builtin_entries() -> Vec<TypeEntry> {
        use ValueType::*;
        vec![
            TypeEntry::new(Bool, "bool", "g_b")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Int, "int", "g_n")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Float, "float", "g_fl")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Vector2, "float2", "g_v")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Vector3, "float3", "g_v")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Vector4, "float4", "g_v")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Color, "float4", "g_v")
                .material_editor()
                .render_attribute(),
            TypeEntry::new(Matrix2, "float2x2", "g_m").render_attribute(),
            TypeEntry::new(Matrix3, "float3x3", "g_m").render_attribute(),
            TypeEntry::new(Matrix4, "float4x4", "g_m").render_attribute(),
            TypeEntry::new(Sampler, "SamplerState", "g_s"),
            TypeEntry::new(Texture2D, "Texture2D", "g_t").material_editor(),
            TypeEntry::new(TextureCube, "TextureCube", "g_t").material_editor(),
            TypeEntry::new(Any, "float4", "g_v").editor_only(),
        ]
    }

    pub fn get(&self, value_type: ValueType) -> &TypeEntry {
        // `new` keeps exactly one entry per variant, sorted by variant order.
        match self
            .entries
            .binary_search_by_key(&value_type, |x| x.value_type)
        {
            Ok(index) | Err(index) => &self.entries[index.min(self.entries.len() - 1)],
        }
    }

    pub fn hlsl_name(&self, value_type: ValueType) -> &str {
        &self.get(value_type).hlsl_name
    }

    pub fn global_prefix(&self, value_type: ValueType) -> &str {
        &self.get(value_type).global_prefix
    }

    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut entries = Self::builtin_entries();
        entries.sort_by_key(|x| x.value_type);
        Self { entries }
    }
}
