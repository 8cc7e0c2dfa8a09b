use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    #[default]
    Dxt5,
    Dxt1,
    Bc7,
    Ati2n,
    Rgba8888,
    Rgba16161616f,
}

impl TextureFormat {
    pub fn to_str(self) -> &'static str {
        match self {
            TextureFormat::Dxt5 => "DXT5",
            TextureFormat::Dxt1 => "DXT1",
            TextureFormat::Bc7 => "BC7",
            TextureFormat::Ati2n => "ATI2N",
            TextureFormat::Rgba8888 => "RGBA8888",
            TextureFormat::Rgba16161616f => "RGBA16161616F",
        }
    }
}

/// Everything that makes two texture globals the same texture.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureRequest {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub image: String,
    #[serde(default)]
    pub color_space: ColorSpace,
    #[serde(default)]
    pub format: TextureFormat,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub processor: String,
    #[serde(default)]
    pub cube: bool,
}

impl TextureRequest {
    pub fn new(image: &str) -> Self {
        Self {
            image: image.to_owned(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    #[must_use]
    pub fn cube(mut self) -> Self {
        self.cube = true;
        self
    }

    pub fn is_srgb(&self) -> bool {
        self.color_space == ColorSpace::Srgb
    }
}

/// External texture compiler. Returns the compiled asset path, or `None`
/// when compilation failed.
pub trait TextureCompiler {
    fn compile_texture(&self, request: &TextureRequest) -> Option<String>;
}

impl<F> TextureCompiler for F
where
    F: Fn(&TextureRequest) -> Option<String>,
{
    fn compile_texture(&self, request: &TextureRequest) -> Option<String> {
        self(request)
    }
}

/// Treats every source image as already compiled.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTextureCompiler;

impl TextureCompiler for PassthroughTextureCompiler {
    fn compile_texture(&self, request: &TextureRequest) -> Option<String> {
        Some(request.image.clone())
    }
}
