use std::collections::{BTreeMap, BTreeSet};

use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    assets::{PassthroughTextureCompiler, TextureCompiler},
    core::{TypeRegistry, ValueType},
    model::{NodeInput, ShaderGraph},
    nodes::{default_nodes, MaterialChannel, NodeRegistry, NodeRole},
    result::{NodeError, NodeResult, ShaderExpr},
    template::{ShaderTemplate, TemplateSlot, TemplateSlots},
    EmptySubgraphProvider, SubgraphProvider,
};

use self::{
    context::{CompilerContext, SessionOutput, SUBGRAPH_OUTPUT_PORT},
    diagnostics::{CompileError, Diagnostic, DiagnosticKind},
    globals::{indent_lines, FeatureEntry, ParameterEntry, SamplerEntry, TextureEntry},
};

pub mod context;
pub mod diagnostics;
pub mod globals;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use super::context::*;
    pub use super::diagnostics::*;
    pub use super::globals::*;
    pub use crate::assets::*;
    pub use crate::nodes::*;
    pub use crate::result::*;
    pub use crate::*;

    pub use crate::data::model::*;

    pub use super::{
        CompileMode, CompileOutput, CompilerOptions, ShaderCompiler, ShaderProgram, ShaderStage,
    };
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    #[default]
    Pixel,
}

impl ShaderStage {
    pub const fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileMode {
    /// Static combos and `#if` branching.
    #[default]
    Final,
    /// One variant with runtime conditionals.
    Preview,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingModel {
    #[default]
    Lit,
    Unlit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    Translucent,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub mode: CompileMode,
    pub shading_model: ShadingModel,
    pub blend_mode: BlendMode,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Replaces the built-in template when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl CompilerOptions {
    pub fn preview() -> Self {
        Self {
            mode: CompileMode::Preview,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderProgram {
    pub source: String,
    pub parameters: Vec<ParameterEntry>,
    pub textures: Vec<TextureEntry>,
    pub samplers: Vec<SamplerEntry>,
    pub features: Vec<FeatureEntry>,
    pub functions: Vec<String>,
    pub metadata: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// `None` when a fatal diagnostic was reported.
    pub program: Option<ShaderProgram>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn source(&self) -> Option<&str> {
        self.program.as_ref().map(|x| x.source.as_str())
    }

    /// A program exists and nothing above a warning was reported.
    pub fn is_shippable(&self) -> bool {
        self.program.is_some()
            && self
                .diagnostics
                .iter()
                .all(|x| x.severity == diagnostics::Severity::Warning)
    }
}

/// Compiles graph documents into shader programs.
///
/// The compiler only borrows its configuration and each call builds its own
/// session. The type and node registries are `Sync`, so threads compiling in
/// parallel each wrap the same registries in their own compiler.
pub struct ShaderCompiler<'a> {
    pub types: &'a TypeRegistry,
    pub nodes: &'a NodeRegistry,
    pub subgraphs: &'a dyn SubgraphProvider,
    pub textures: &'a dyn TextureCompiler,
}

const STATEMENT_INDENT: &str = "        ";

impl<'a> ShaderCompiler<'a> {
    pub fn new(types: &'a TypeRegistry, nodes: &'a NodeRegistry) -> Self {
        Self {
            types,
            nodes,
            subgraphs: &EmptySubgraphProvider,
            textures: &PassthroughTextureCompiler,
        }
    }

    #[must_use]
    pub fn with_subgraphs(mut self, subgraphs: &'a dyn SubgraphProvider) -> Self {
        self.subgraphs = subgraphs;
        self
    }

    #[must_use]
    pub fn with_textures(mut self, textures: &'a dyn TextureCompiler) -> Self {
        self.textures = textures;
        self
    }

    fn session<'b>(&'b self, graph: &'b ShaderGraph, mode: CompileMode) -> CompilerContext<'b>
    where
        'a: 'b,
    {
        CompilerContext::new(
            self.types,
            self.nodes,
            self.subgraphs,
            self.textures,
            mode,
            graph,
        )
    }

    /// Full material compile. Material graphs are rooted at their first
    /// `MaterialResult` node, subgraph documents at their channel tagged
    /// outputs.
    #[tracing::instrument(skip_all, fields(nodes = graph.nodes.len(), mode = ?options.mode))]
    pub fn compile(
        &self,
        graph: &ShaderGraph,
        options: &CompilerOptions,
    ) -> Result<CompileOutput, CompileError> {
        let template = match options.template.as_deref() {
            Some(source) => ShaderTemplate::parse(source)?,
            None => ShaderTemplate::material()?,
        };

        let mut ctx = self.session(graph, options.mode);
        match options.blend_mode {
            BlendMode::Opaque => {}
            BlendMode::Masked => {
                ctx.register_global("#define S_ALPHA_TEST 1");
            }
            BlendMode::Translucent => {
                ctx.register_global("#define S_TRANSLUCENT 1");
            }
        }

        let channels = if graph.is_subgraph {
            self.resolve_subgraph_channels(&mut ctx)?
        } else {
            self.resolve_material_channels(&mut ctx)?
        };

        let mut vertex_result = Vec::new();
        let mut pixel_result = Vec::new();
        for (channel, expr) in channels {
            if channel == MaterialChannel::PositionOffset {
                vertex_result.push(format!("o.vPositionWs += {};", expr.code));
            } else {
                pixel_result.push(format!("m.{} = {};", channel.field(), expr.code));
            }
        }

        pixel_result.push(match options.shading_model {
            ShadingModel::Lit => "return ShadingModelStandard::Shade( i, m );".to_owned(),
            ShadingModel::Unlit => "return float4( m.Albedo + m.Emission, m.Opacity );".to_owned(),
        });

        let session = ctx.finish();
        Ok(self.assemble(&template, options, session, vertex_result, pixel_result, false))
    }

    /// Compiles only what feeds `target` and returns it as a display color
    /// from the preview template.
    #[tracing::instrument(skip_all, fields(nodes = graph.nodes.len(), target = %target.node))]
    pub fn compile_preview(
        &self,
        graph: &ShaderGraph,
        options: &CompilerOptions,
        target: &NodeInput,
    ) -> Result<CompileOutput, CompileError> {
        if !target.is_connected() {
            return Err(CompileError::PreviewTargetDisconnected);
        }
        if target.subgraph_path.is_empty() && graph.find_node(target.node).is_none() {
            return Err(CompileError::UnknownPreviewTarget(target.node));
        }

        let template = match options.template.as_deref() {
            Some(source) => ShaderTemplate::parse(source)?,
            None => ShaderTemplate::preview()?,
        };

        let mut ctx = self.session(graph, CompileMode::Preview);
        ctx.root_graph();

        let result = ctx.resolve_in_stage(
            ShaderStage::Pixel,
            target.subgraph_path.clone(),
            target.node,
            &target.output,
        );

        let color = match result {
            NodeResult::Valid(expr) => match preview_color(&expr, self.types) {
                Ok(code) => Some(code),
                Err(err) => {
                    ctx.push_diagnostic(Diagnostic::error(
                        DiagnosticKind::InvalidCast,
                        target.node,
                        err.to_string(),
                    ));
                    None
                }
            },
            _ => None,
        };

        let pixel_result = vec![format!(
            "return {};",
            color.as_deref().unwrap_or("float4( 1, 0, 1, 1 )")
        )];

        let session = ctx.finish();
        Ok(self.assemble(&template, options, session, Vec::new(), pixel_result, true))
    }

    fn resolve_material_channels(
        &self,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Vec<(MaterialChannel, ShaderExpr)>, CompileError> {
        let graph = ctx.root_graph();
        let mut roots = graph
            .ordered()
            .filter(|(_, x)| x.node.role() == NodeRole::MaterialRoot)
            .map(|(id, x)| (id, x.node.clone()));

        let (root, node) = roots
            .next()
            .ok_or(CompileError::MissingRoot("MaterialResult"))?;

        for (id, _) in roots {
            ctx.push_diagnostic(Diagnostic::warning(
                DiagnosticKind::Validation,
                id,
                "additional MaterialResult node is ignored",
            ));
        }

        let mut result = Vec::new();
        for (port, input) in node.connections() {
            let Some(channel) = MaterialChannel::from_port(port) else {
                continue;
            };
            if !input.is_connected() {
                continue;
            }

            if let NodeResult::Valid(expr) =
                ctx.resolve_in_stage(channel.stage(), Vec::new(), root, channel.port())
            {
                result.push((channel, expr));
            }
        }

        Ok(result)
    }

    fn resolve_subgraph_channels(
        &self,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Vec<(MaterialChannel, ShaderExpr)>, CompileError> {
        let outputs = ctx.channel_outputs();
        if outputs.is_empty() {
            return Err(CompileError::MissingRoot("channel tagged SubgraphOutput"));
        }

        let mut result = Vec::new();
        for (id, channel) in outputs {
            let resolved =
                ctx.resolve_in_stage(channel.stage(), Vec::new(), id, SUBGRAPH_OUTPUT_PORT);
            let NodeResult::Valid(expr) = resolved else {
                continue;
            };

            match expr.cast_to(channel.value_type(), self.types) {
                Ok(expr) => result.push((channel, expr)),
                Err(err) => {
                    if let Some(diagnostic) = Diagnostic::from_node_error(id, &err) {
                        ctx.push_diagnostic(diagnostic);
                    }
                }
            }
        }

        Ok(result)
    }

    fn assemble(
        &self,
        template: &ShaderTemplate,
        options: &CompilerOptions,
        session: SessionOutput,
        vertex_result: Vec<String>,
        pixel_result: Vec<String>,
        preview: bool,
    ) -> CompileOutput {
        let SessionOutput {
            globals,
            statements,
            diagnostics,
            metadata,
        } = session;

        if diagnostics.has_fatal() {
            return CompileOutput {
                program: None,
                diagnostics: diagnostics.into_vec(),
            };
        }

        let description = if options.description.is_empty() {
            "Shader Graph"
        } else {
            options.description.as_str()
        };

        let modes = if preview {
            vec!["Forward();".to_owned()]
        } else if options.blend_mode == BlendMode::Translucent {
            vec![
                "Forward();".to_owned(),
                "ToolsVis( S_MODE_TOOLS_VIS );".to_owned(),
            ]
        } else {
            vec![
                "Forward();".to_owned(),
                "Depth();".to_owned(),
                "ToolsVis( S_MODE_TOOLS_VIS );".to_owned(),
            ]
        };

        let [vertex, pixel] = statements;

        let mut slots = TemplateSlots::default();
        slots.set(
            TemplateSlot::Header,
            indent_lines([format!("Description = \"{}\";", description.replace('"', "'"))]),
        );
        slots.set(TemplateSlot::Features, globals.features_block());
        slots.set(TemplateSlot::Modes, indent_lines(modes));
        slots.set(TemplateSlot::Common, globals.common_block(self.types));
        slots.set(
            TemplateSlot::VertexBody,
            statement_block(vertex.into_iter().chain(vertex_result)),
        );
        slots.set(
            TemplateSlot::PixelBody,
            statement_block(
                std::iter::once("Material m = Material::Init();".to_owned())
                    .filter(|_| !preview)
                    .chain(pixel),
            ),
        );
        slots.set(TemplateSlot::PixelResult, statement_block(pixel_result));

        let program = ShaderProgram {
            source: template.assemble(&slots),
            parameters: globals.parameters.into_values().collect(),
            textures: globals.textures.into_values().collect(),
            samplers: globals.samplers.into_values().collect(),
            features: globals.features.into_values().collect(),
            functions: globals.functions.into_keys().collect(),
            metadata,
        };

        CompileOutput {
            program: Some(program),
            diagnostics: diagnostics.into_vec(),
        }
    }
}

fn statement_block(lines: impl IntoIterator<Item = String>) -> String {
    lines
        .into_iter()
        .map(|x| format!("{STATEMENT_INDENT}{x}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pads a previewed value to a color. This is a display rule, not a cast.
fn preview_color(expr: &ShaderExpr, types: &TypeRegistry) -> Result<String, NodeError> {
    let to_float = |expr: &ShaderExpr| match expr.result_type {
        ValueType::Int | ValueType::Bool => format!("(float){}", expr.operand()),
        _ => expr.code.clone(),
    };

    let float4 = types.hlsl_name(ValueType::Vector4);
    match expr.components() {
        Some(1) => {
            let x = to_float(expr);
            Ok(format!("{float4}( {x}, {x}, {x}, 1 )"))
        }
        Some(2) => Ok(format!("{float4}( {}, 0, 1 )", expr.code)),
        Some(3) => Ok(format!("{float4}( {}, 1 )", expr.code)),
        Some(4) => Ok(expr.code.clone()),
        _ => Err(NodeError::invalid_cast(expr.result_type, ValueType::Vector4)),
    }
}

/// Compiles with the built-in types and nodes, no subgraphs and pass-through
/// texture compilation.
pub fn compile(graph: &ShaderGraph, options: &CompilerOptions) -> Result<CompileOutput, CompileError> {
    let types = TypeRegistry::default();
    let nodes = default_nodes();
    ShaderCompiler::new(&types, &nodes).compile(graph, options)
}

/// Identifier of the first node of a class, handy when picking preview
/// targets.
pub fn find_node_of_class(graph: &ShaderGraph, class: &str) -> Option<Uuid> {
    graph.nodes_of_class(class).next().map(|x| x.id)
}
