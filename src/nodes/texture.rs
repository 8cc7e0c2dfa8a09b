use glam::Vec4;
use serde_derive::{Deserialize, Serialize};

use crate::{
    assets::{ColorSpace, TextureFormat, TextureRequest},
    compiler::{context::CompilerContext, globals::SamplerDesc, ShaderStage},
    core::ValueType,
    model::{NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

use super::{
    geometry::{tex_coord, world_normal},
    unknown_output, ShaderNode,
};

/// Source image settings shared by the nodes that declare a texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSource {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Attribute name of the texture global.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub color_space: ColorSpace,
    pub format: TextureFormat,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub processor: String,
    /// Bound when no image is set or the image fails to compile.
    pub default_color: Vec4,
}

impl Default for TextureSource {
    fn default() -> Self {
        Self {
            image: String::new(),
            name: String::new(),
            color_space: ColorSpace::Srgb,
            format: TextureFormat::Dxt5,
            processor: String::new(),
            default_color: Vec4::ONE,
        }
    }
}

impl TextureSource {
    pub fn request(&self, cube: bool) -> TextureRequest {
        TextureRequest {
            image: self.image.clone(),
            color_space: self.color_space,
            format: self.format,
            processor: self.processor.clone(),
            cube,
        }
    }

    fn resolve(&self, cube: bool, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        ctx.result_texture(&self.request(cube), &self.name, self.default_color)
    }
}

/// Texture object that can feed several samplers.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureObjectNode {
    #[serde(flatten)]
    pub source: TextureSource,
    pub cube: bool,
}

impl NodeDefinition for TextureObjectNode {
    fn name() -> &'static str {
        "TextureObject"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Texture2D)]
    }
}

impl ShaderNode for TextureObjectNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("TextureObject", output));
        }
        self.source.resolve(self.cube, ctx)
    }

    fn metadata(&self) -> Vec<(&'static str, String)> {
        image_metadata(&self.source)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerStateNode {
    #[serde(flatten)]
    pub state: SamplerDesc,
}

impl NodeDefinition for SamplerStateNode {
    fn name() -> &'static str {
        "SamplerState"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        &[]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        &[("result", ValueType::Sampler)]
    }
}

impl ShaderNode for SamplerStateNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if output != "result" {
            return Err(unknown_output("SamplerState", output));
        }
        Ok(ctx.result_sampler(self.state))
    }
}

fn image_metadata(source: &TextureSource) -> Vec<(&'static str, String)> {
    if source.image.is_empty() {
        Vec::new()
    } else {
        vec![("image", source.image.clone())]
    }
}

/// Texture object from the `texture` input, or the node's own texture when
/// it is unconnected.
fn texture_input(
    ctx: &mut CompilerContext<'_>,
    input: &NodeInput,
    source: &TextureSource,
    expected: ValueType,
) -> Result<ShaderExpr, NodeError> {
    let texture = match ctx.optional("texture", input)? {
        Some(texture) => texture,
        None => source.resolve(expected == ValueType::TextureCube, ctx)?,
    };

    if texture.result_type != expected {
        return Err(NodeError::TypeMismatch(format!(
            "expected {expected}, got {}",
            texture.result_type
        )));
    }
    Ok(texture)
}

fn sampler_input(
    ctx: &mut CompilerContext<'_>,
    input: &NodeInput,
    state: SamplerDesc,
) -> Result<ShaderExpr, NodeError> {
    match ctx.optional("sampler", input)? {
        Some(sampler) if sampler.result_type == ValueType::Sampler => Ok(sampler),
        Some(sampler) => Err(NodeError::TypeMismatch(format!(
            "expected sampler, got {}",
            sampler.result_type
        ))),
        None => Ok(ctx.result_sampler(state)),
    }
}

fn sample(
    ctx: &CompilerContext<'_>,
    texture: &ShaderExpr,
    sampler: &ShaderExpr,
    coords: &ShaderExpr,
) -> ShaderExpr {
    // The vertex stage has no derivatives to pick a mip with.
    let code = match ctx.stage() {
        ShaderStage::Pixel => format!("{}.Sample( {}, {} )", texture.code, sampler.code, coords.code),
        ShaderStage::Vertex => format!(
            "{}.SampleLevel( {}, {}, 0 )",
            texture.code, sampler.code, coords.code
        ),
    };
    ShaderExpr::new(ValueType::Vector4, code)
}

/// Channel outputs read the sampled color through the node's own `result`.
fn channel(ctx: &mut CompilerContext<'_>, output: &str) -> Result<ShaderExpr, NodeError> {
    let color = ctx.own_output("result")?;
    Ok(ShaderExpr::new(
        ValueType::Float,
        format!("{}.{output}", color.operand()),
    ))
}

const SAMPLE_OUTPUTS: [&str; 4] = ["r", "g", "b", "a"];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSampleNode {
    pub texture: NodeInput,
    pub sampler: NodeInput,
    pub coords: NodeInput,
    #[serde(flatten)]
    pub source: TextureSource,
    pub sampler_state: SamplerDesc,
}

impl NodeDefinition for TextureSampleNode {
    fn name() -> &'static str {
        "TextureSample"
    }

    fn version() -> u32 {
        2
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[("texture", Texture2D), ("sampler", Sampler), ("coords", Vector2)]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[
            ("result", Vector4),
            ("r", Float),
            ("g", Float),
            ("b", Float),
            ("a", Float),
        ]
    }
}

impl ShaderNode for TextureSampleNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if SAMPLE_OUTPUTS.contains(&output) {
            return channel(ctx, output);
        }
        if output != "result" {
            return Err(unknown_output("TextureSample", output));
        }

        let texture = texture_input(ctx, &self.texture, &self.source, ValueType::Texture2D)?;
        let sampler = sampler_input(ctx, &self.sampler, self.sampler_state)?;
        let coords = match ctx.optional("coords", &self.coords)? {
            Some(coords) => coords.cast(2, ctx.types())?,
            None => tex_coord(ctx.stage()),
        };

        Ok(sample(ctx, &texture, &sampler, &coords))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![
            ("texture", &self.texture),
            ("sampler", &self.sampler),
            ("coords", &self.coords),
        ]
    }

    fn metadata(&self) -> Vec<(&'static str, String)> {
        image_metadata(&self.source)
    }
}

/// Cube map lookup along `direction`, the surface normal by default.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureCubeSampleNode {
    pub texture: NodeInput,
    pub sampler: NodeInput,
    pub direction: NodeInput,
    #[serde(flatten)]
    pub source: TextureSource,
    pub sampler_state: SamplerDesc,
}

impl NodeDefinition for TextureCubeSampleNode {
    fn name() -> &'static str {
        "TextureCubeSample"
    }

    fn input() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[
            ("texture", TextureCube),
            ("sampler", Sampler),
            ("direction", Vector3),
        ]
    }

    fn output() -> &'static [(&'static str, ValueType)] {
        use ValueType::*;
        &[
            ("result", Vector4),
            ("r", Float),
            ("g", Float),
            ("b", Float),
            ("a", Float),
        ]
    }
}

impl ShaderNode for TextureCubeSampleNode {
    fn resolve(&self, output: &str, ctx: &mut CompilerContext<'_>) -> Result<ShaderExpr, NodeError> {
        if SAMPLE_OUTPUTS.contains(&output) {
            return channel(ctx, output);
        }
        if output != "result" {
            return Err(unknown_output("TextureCubeSample", output));
        }

        let texture = texture_input(ctx, &self.texture, &self.source, ValueType::TextureCube)?;
        let sampler = sampler_input(ctx, &self.sampler, self.sampler_state)?;
        let direction = match ctx.optional("direction", &self.direction)? {
            Some(direction) => direction.cast(3, ctx.types())?,
            None => world_normal(ctx.stage()),
        };

        Ok(sample(ctx, &texture, &sampler, &direction))
    }

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        vec![
            ("texture", &self.texture),
            ("sampler", &self.sampler),
            ("direction", &self.direction),
        ]
    }

    fn metadata(&self) -> Vec<(&'static str, String)> {
        image_metadata(&self.source)
    }
}
