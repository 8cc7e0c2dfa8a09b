use glam::Vec4;
use indexmap::{IndexMap, IndexSet};
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    assets::TextureRequest,
    core::{format_component, sanitize_identifier, ConstantValue, TypeRegistry, ValueType},
    result::NodeError,
};

const INDENT: &str = "    ";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    #[default]
    Slider,
    Color,
    CheckBox,
    VectorText,
}

impl UiType {
    pub fn to_str(self) -> &'static str {
        match self {
            UiType::Slider => "Slider",
            UiType::Color => "Color",
            UiType::CheckBox => "CheckBox",
            UiType::VectorText => "VectorText",
        }
    }

    pub fn for_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => UiType::CheckBox,
            ValueType::Color => UiType::Color,
            ValueType::Vector2 | ValueType::Vector3 | ValueType::Vector4 => UiType::VectorText,
            _ => UiType::Slider,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ui_type: Option<UiType>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub group: String,
}

/// A shader-visible parameter a node wants to expose.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRequest {
    pub name: String,
    pub value_type: ValueType,
    pub default: Option<ConstantValue>,
    pub range: Option<(ConstantValue, ConstantValue)>,
    pub attribute: bool,
    pub ui: UiSettings,
}

impl ParameterRequest {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_owned(),
            value_type,
            default: None,
            range: None,
            attribute: false,
            ui: UiSettings::default(),
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<ConstantValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_range(mut self, min: impl Into<ConstantValue>, max: impl Into<ConstantValue>) -> Self {
        self.range = Some((min.into(), max.into()));
        self
    }

    #[must_use]
    pub fn attribute(mut self) -> Self {
        self.attribute = true;
        self
    }

    #[must_use]
    pub fn with_ui(mut self, ui: UiSettings) -> Self {
        self.ui = ui;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterEntry {
    pub name: String,
    pub global: String,
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ConstantValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(ConstantValue, ConstantValue)>,
    pub attribute: bool,
    pub ui: UiSettings,
    #[serde(skip)]
    pub node: Uuid,
}

impl ParameterEntry {
    pub fn declaration(&self, types: &TypeRegistry) -> String {
        let mut annotations = Vec::new();
        if self.attribute {
            annotations.push(format!("Attribute( \"{}\" );", self.name));
        } else {
            let ui_type = self
                .ui
                .ui_type
                .unwrap_or_else(|| UiType::for_type(self.value_type));
            annotations.push(format!("UiType( {} );", ui_type.to_str()));
            if !self.ui.group.is_empty() {
                annotations.push(format!("UiGroup( \"{}\" );", self.ui.group));
            }
        }

        if let Some(default) = self.default.as_ref() {
            annotations.push(format!(
                "Default{}( {} );",
                default.components().len(),
                default.to_annotation()
            ));
        }

        if let Some((min, max)) = self.range.as_ref() {
            annotations.push(format!(
                "Range{}( {}, {} );",
                min.components().len(),
                min.to_annotation(),
                max.to_annotation()
            ));
        }

        declaration(types.hlsl_name(self.value_type), &self.global, &annotations)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerFilter {
    #[default]
    Aniso,
    Bilinear,
    Trilinear,
    Point,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
    Border,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SamplerDesc {
    #[serde(default)]
    pub filter: SamplerFilter,
    #[serde(default)]
    pub address_u: AddressMode,
    #[serde(default)]
    pub address_v: AddressMode,
}

impl SamplerFilter {
    pub fn to_str(self) -> &'static str {
        match self {
            SamplerFilter::Aniso => "ANISO",
            SamplerFilter::Bilinear => "BILINEAR",
            SamplerFilter::Trilinear => "TRILINEAR",
            SamplerFilter::Point => "POINT",
        }
    }
}

impl AddressMode {
    pub fn to_str(self) -> &'static str {
        match self {
            AddressMode::Wrap => "WRAP",
            AddressMode::Mirror => "MIRROR",
            AddressMode::Clamp => "CLAMP",
            AddressMode::Border => "BORDER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerEntry {
    pub global: String,
    pub desc: SamplerDesc,
}

impl SamplerEntry {
    pub fn declaration(&self, types: &TypeRegistry) -> String {
        declaration(
            types.hlsl_name(ValueType::Sampler),
            &self.global,
            &[
                format!("Filter( {} );", self.desc.filter.to_str()),
                format!("AddressU( {} );", self.desc.address_u.to_str()),
                format!("AddressV( {} );", self.desc.address_v.to_str()),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureEntry {
    pub name: String,
    pub global: String,
    pub request: TextureRequest,
    /// Compiled asset path, `None` when the default texture is bound instead.
    pub asset: Option<String>,
    pub default_color: Vec4,
    #[serde(skip)]
    pub node: Uuid,
}

impl TextureEntry {
    pub fn value_type(&self) -> ValueType {
        if self.request.cube {
            ValueType::TextureCube
        } else {
            ValueType::Texture2D
        }
    }

    pub fn declaration(&self, types: &TypeRegistry) -> String {
        let default = self
            .default_color
            .to_array()
            .into_iter()
            .map(format_component)
            .collect::<Vec<_>>()
            .join(", ");

        declaration(
            types.hlsl_name(self.value_type()),
            &self.global,
            &[
                format!("Attribute( \"{}\" );", self.name),
                format!(
                    "SrgbRead( {} );",
                    if self.request.is_srgb() { "True" } else { "False" }
                ),
                format!("Default4( {default} );"),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureEntry {
    pub name: String,
    pub feature: String,
    pub combo: String,
    pub group: String,
}

impl FeatureEntry {
    pub fn declaration(&self) -> String {
        format!(
            "Feature( {}, 0..1, \"{}\" );",
            self.feature,
            if self.group.is_empty() { "Material" } else { &self.group }
        )
    }

    pub fn combo_declaration(&self) -> String {
        format!("StaticCombo( {}, {}, Sys( ALL ) );", self.combo, self.feature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionEntry {
    pub name: String,
    pub body: String,
}

fn declaration(type_name: &str, global: &str, annotations: &[String]) -> String {
    if annotations.is_empty() {
        format!("{type_name} {global};")
    } else {
        format!("{type_name} {global} < {} >;", annotations.join(" "))
    }
}

/// `UseDetail` becomes `USE_DETAIL`.
pub fn feature_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() && !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_uppercase());
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }
    result.trim_end_matches('_').to_owned()
}

/// Name of the function declared by a source body such as
/// `float3 Tint( float3 c ) { ... }`.
pub fn function_name(body: &str) -> Option<&str> {
    let head = &body[..body.find('(')?];
    let name = head.split_whitespace().last()?;
    let valid = name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

/// Every global a compile session registered, each table in first
/// registration order.
#[derive(Debug, Default, Clone)]
pub struct GlobalTable {
    pub declarations: IndexSet<String>,
    pub parameters: IndexMap<String, ParameterEntry>,
    /// Owning node of each parameter name, whatever its type.
    pub parameter_names: IndexMap<String, Uuid>,
    /// Owner of the preview attribute standing in for each feature.
    pub toggles: IndexMap<String, Uuid>,
    pub samplers: IndexMap<SamplerDesc, SamplerEntry>,
    pub textures: IndexMap<TextureRequest, TextureEntry>,
    pub features: IndexMap<String, FeatureEntry>,
    pub functions: IndexMap<String, FunctionEntry>,
}

impl GlobalTable {
    /// Returns false when the exact text was already registered.
    pub fn add_declaration(&mut self, text: impl Into<String>) -> bool {
        self.declarations.insert(text.into())
    }

    pub fn add_parameter(
        &mut self,
        request: ParameterRequest,
        node: Uuid,
        types: &TypeRegistry,
    ) -> Result<&ParameterEntry, NodeError> {
        let entry = types.get(request.value_type);
        if request.attribute && !entry.render_attribute {
            return Err(NodeError::TypeMismatch(format!(
                "{} cannot be a render attribute",
                request.value_type
            )));
        }
        if !request.attribute && !entry.material_editor {
            return Err(NodeError::TypeMismatch(format!(
                "{} cannot be exposed to the material editor",
                request.value_type
            )));
        }

        let name = sanitize_identifier(&request.name);
        if name.is_empty() {
            return Err(NodeError::message(format!(
                "invalid parameter name \"{}\"",
                request.name
            )));
        }

        let owner = *self.parameter_names.entry(name.clone()).or_insert(node);
        if owner != node {
            return Err(NodeError::DuplicateName(request.name));
        }

        let global = format!("{}{name}", entry.global_prefix);
        if let Some(existing) = self.parameters.get(&global) {
            if existing.node != node {
                return Err(NodeError::DuplicateName(request.name));
            }
        } else {
            self.parameters.insert(
                global.clone(),
                ParameterEntry {
                    name,
                    global: global.clone(),
                    value_type: request.value_type,
                    default: request.default,
                    range: request.range,
                    attribute: request.attribute,
                    ui: request.ui,
                    node,
                },
            );
        }

        self.parameters
            .get(&global)
            .ok_or_else(|| NodeError::DuplicateName(global.clone()))
    }

    pub fn add_sampler(&mut self, desc: SamplerDesc, types: &TypeRegistry) -> &SamplerEntry {
        let index = self.samplers.len();
        self.samplers.entry(desc).or_insert_with(|| SamplerEntry {
            global: format!("{}Sampler{index}", types.global_prefix(ValueType::Sampler)),
            desc,
        })
    }

    /// Registers a texture by its identity. A different texture under an
    /// already used name is a `DuplicateName`.
    pub fn add_texture(
        &mut self,
        name: &str,
        request: &TextureRequest,
        default_color: Vec4,
        node: Uuid,
        types: &TypeRegistry,
    ) -> Result<(&mut TextureEntry, bool), NodeError> {
        let index = self.textures.len();
        let value_type = if request.cube {
            ValueType::TextureCube
        } else {
            ValueType::Texture2D
        };

        let is_new = !self.textures.contains_key(request);
        if is_new {
            let mut attribute = sanitize_identifier(name);
            if attribute.is_empty() {
                attribute = format!("Texture{index}");
            }
            let global = format!("{}{attribute}", types.global_prefix(value_type));
            if self.textures.values().any(|x| x.global == global) {
                return Err(NodeError::DuplicateName(attribute));
            }

            self.textures.insert(
                request.clone(),
                TextureEntry {
                    name: attribute,
                    global,
                    request: request.clone(),
                    asset: None,
                    default_color,
                    node,
                },
            );
        }

        let entry = self
            .textures
            .get_mut(request)
            .ok_or_else(|| NodeError::message("texture registration failed"))?;
        Ok((entry, is_new))
    }

    pub fn add_feature(&mut self, name: &str, group: &str) -> Result<FeatureEntry, NodeError> {
        let identifier = feature_identifier(name);
        if identifier.is_empty() {
            return Err(NodeError::message(format!("invalid feature name \"{name}\"")));
        }

        let feature = self
            .features
            .entry(identifier.clone())
            .or_insert_with(|| FeatureEntry {
                name: sanitize_identifier(name),
                feature: format!("F_{identifier}"),
                combo: format!("S_{identifier}"),
                group: group.to_owned(),
            })
            .clone();

        self.add_declaration(feature.combo_declaration());
        Ok(feature)
    }

    /// Registers a function body. The same name with a different body is a
    /// `DuplicateName`.
    pub fn add_function(&mut self, body: &str) -> Result<String, NodeError> {
        let body = body.trim();
        let name = function_name(body)
            .ok_or_else(|| NodeError::message("function body has no valid declaration"))?
            .to_owned();

        match self.functions.get(&name) {
            Some(existing) if existing.body != body => Err(NodeError::DuplicateName(name)),
            Some(_) => Ok(name),
            None => {
                self.functions.insert(
                    name.clone(),
                    FunctionEntry {
                        name: name.clone(),
                        body: body.to_owned(),
                    },
                );
                Ok(name)
            }
        }
    }

    pub fn features_block(&self) -> String {
        indent_lines(self.features.values().map(|x| x.declaration()))
    }

    pub fn common_block(&self, types: &TypeRegistry) -> String {
        let lines = self
            .declarations
            .iter()
            .cloned()
            .chain(self.parameters.values().map(|x| x.declaration(types)))
            .chain(self.samplers.values().map(|x| x.declaration(types)))
            .chain(self.textures.values().map(|x| x.declaration(types)));

        let mut block = indent_lines(lines);
        for function in self.functions.values() {
            if !block.is_empty() {
                block.push_str("\n\n");
            }
            block.push_str(&indent_lines(function.body.lines().map(str::to_owned)));
        }
        block
    }
}

pub(crate) fn indent_lines(lines: impl IntoIterator<Item = String>) -> String {
    lines
        .into_iter()
        .map(|x| {
            if x.is_empty() {
                x
            } else {
                format!("{INDENT}{x}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
