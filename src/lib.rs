pub mod assets;
pub mod compiler;
pub mod nodes;
pub mod result;
pub mod template;
pub mod upgrade;

mod core;
mod data;

pub use crate::core::*;
pub use crate::data::*;
pub use crate::result::*;
pub use crate::upgrade::*;

pub use crate::compiler::{
    compile, find_node_of_class, BlendMode, CompileMode, CompileOutput, CompilerOptions,
    ShaderCompiler, ShaderProgram, ShaderStage, ShadingModel,
};

pub use anyhow;
pub use glam;
pub use serde;
pub use serde_derive;
pub use serde_json;
pub use uuid;
