use std::{cell::Cell, collections::HashMap};

use glam::{Vec3, Vec4};
use uuid::Uuid;

use super::prelude::*;
use crate::template::TemplateError;

fn add<T: NodeDefinition>(graph: &mut ShaderGraph, node: T) -> Uuid {
    graph.add(Node::new(node).unwrap())
}

fn named_float(name: &str, value: f32) -> FloatNode {
    FloatNode {
        value,
        name: name.to_owned(),
        ..Default::default()
    }
}

fn float(value: f32) -> FloatNode {
    FloatNode {
        value,
        ..Default::default()
    }
}

/// Only the pixel shader body, which keeps expectations exact.
fn pixel_only() -> CompilerOptions {
    CompilerOptions {
        template: Some("{7}\n{8}".to_owned()),
        ..Default::default()
    }
}

fn find(output: &CompileOutput, kind: DiagnosticKind) -> Option<&Diagnostic> {
    output.diagnostics.iter().find(|x| x.kind == kind)
}

#[test]
fn test_scalar_add() {
    let mut graph = ShaderGraph::new();
    let a = add(&mut graph, float(2.0));
    let b = add(&mut graph, float(3.0));
    let sum = add(
        &mut graph,
        AddNode {
            a: connect(a, "result"),
            b: connect(b, "result"),
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(sum, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &pixel_only()).unwrap();
    assert!(output.diagnostics.is_empty());
    assert!(output.is_shippable());
    assert_eq!(
        output.source().unwrap(),
        "        Material m = Material::Init();\n        m.Roughness = 2.0f + 3.0f;\n        return ShadingModelStandard::Shade( i, m );"
    );
}

#[test]
fn test_unconnected_input_uses_default() {
    let mut graph = ShaderGraph::new();
    let x = add(&mut graph, named_float("X", 0.5));
    let sum = add(
        &mut graph,
        AddNode {
            a: connect(x, "result"),
            default_b: 1.0,
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(sum, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &pixel_only()).unwrap();
    assert!(output.diagnostics.is_empty());
    assert_eq!(
        output.source().unwrap(),
        "        Material m = Material::Init();\n        float l_0 = g_flX + 1.0f;\n        m.Roughness = l_0;\n        return ShadingModelStandard::Shade( i, m );"
    );
}

#[test]
fn test_fan_out_is_evaluated_once() {
    let mut graph = ShaderGraph::new();
    let x = add(&mut graph, named_float("X", 0.5));
    let sum = add(
        &mut graph,
        AddNode {
            a: connect(x, "result"),
            default_b: 1.0,
            ..Default::default()
        },
    );
    let scaled = add(
        &mut graph,
        MultiplyNode {
            a: connect(sum, "result"),
            b: connect(sum, "result"),
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(sum, "result"),
            metalness: connect(sum, "result"),
            opacity: connect(scaled, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let source = output.source().unwrap();
    assert_eq!(source.matches("g_flX + 1.0f").count(), 1);
    assert!(source.contains("float l_1 = l_0 * l_0;"));
    assert!(source.contains("m.Opacity = l_1;"));
    assert!(source.contains("m.Roughness = l_0;"));
    assert!(source.contains("m.Metalness = l_0;"));
    assert_eq!(output.program.unwrap().parameters.len(), 1);
}

#[test]
fn test_compile_is_deterministic() {
    let mut graph = ShaderGraph::new();
    let color = add(
        &mut graph,
        TextureSampleNode {
            source: TextureSource {
                image: "materials/rock_color.png".to_owned(),
                name: "Color".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let tint = add(
        &mut graph,
        ColorNode {
            value: Vec4::new(1.0, 0.5, 0.25, 1.0),
            name: "Tint".to_owned(),
            ..Default::default()
        },
    );
    let albedo = add(
        &mut graph,
        MultiplyNode {
            a: connect(color, "result"),
            b: connect(tint, "result"),
            ..Default::default()
        },
    );
    let rim = add(&mut graph, FresnelNode::default());
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(albedo, "result"),
            emission: connect(rim, "result"),
            roughness: connect(color, "g"),
            ..Default::default()
        },
    );

    let first = compile(&graph, &CompilerOptions::default()).unwrap();

    let serialized = serde_json::to_string(&graph).unwrap();
    let reloaded: ShaderGraph = serde_json::from_str(&serialized).unwrap();
    let second = compile(&reloaded, &CompilerOptions::default()).unwrap();

    assert_eq!(first.source(), second.source());
    assert_eq!(first.program, second.program);
    assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
}

#[test]
fn test_parallel_compiles() {
    let types = TypeRegistry::default();
    let nodes = default_nodes();

    let mut graph = ShaderGraph::new();
    let x = add(&mut graph, named_float("X", 0.5));
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(x, "result"),
            ..Default::default()
        },
    );

    let sources: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = [CompileMode::Final, CompileMode::Preview]
            .into_iter()
            .map(|mode| {
                let (types, nodes, graph) = (&types, &nodes, &graph);
                scope.spawn(move || {
                    let compiler = ShaderCompiler::new(types, nodes);
                    let options = CompilerOptions {
                        mode,
                        ..pixel_only()
                    };
                    compiler
                        .compile(graph, &options)
                        .unwrap()
                        .source()
                        .unwrap()
                        .to_owned()
                })
            })
            .collect();
        handles.into_iter().map(|x| x.join().unwrap()).collect()
    });

    assert_eq!(sources[0], sources[1]);
}

#[test]
fn test_cycle_is_fatal() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut graph = ShaderGraph::new();
    graph.add(
        Node::new(AddNode {
            a: connect(b, "result"),
            ..Default::default()
        })
        .unwrap()
        .with_id(a),
    );
    graph.add(
        Node::new(AddNode {
            a: connect(a, "result"),
            ..Default::default()
        })
        .unwrap()
        .with_id(b),
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(a, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert!(output.program.is_none());

    let cycle = find(&output, DiagnosticKind::CycleDetected).unwrap();
    assert_eq!(cycle.severity, Severity::Fatal);
    assert!(cycle.message.contains(&format!("{a} -> {b} -> {a}")));
}

#[test]
fn test_self_reference_is_a_cycle() {
    let a = Uuid::new_v4();
    let mut graph = ShaderGraph::new();
    graph.add(
        Node::new(RerouteNode {
            input: connect(a, "result"),
        })
        .unwrap()
        .with_id(a),
    );
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(a, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert!(output.program.is_none());
    assert!(find(&output, DiagnosticKind::CycleDetected).is_some());
}

#[test]
fn test_texture_is_compiled_once() {
    let calls = Cell::new(0);
    let textures = |request: &TextureRequest| {
        calls.set(calls.get() + 1);
        Some(format!("{}.vtex", request.image))
    };

    let source = TextureSource {
        image: "materials/rock_color.png".to_owned(),
        name: "Color".to_owned(),
        ..Default::default()
    };

    let mut graph = ShaderGraph::new();
    let first = add(
        &mut graph,
        TextureSampleNode {
            source: source.clone(),
            ..Default::default()
        },
    );
    let uv = add(&mut graph, TexCoordNode::default());
    let tiled = add(
        &mut graph,
        MultiplyNode {
            a: connect(uv, "result"),
            default_b: 4.0,
            ..Default::default()
        },
    );
    let second = add(
        &mut graph,
        TextureSampleNode {
            source,
            coords: connect(tiled, "result"),
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(first, "result"),
            emission: connect(second, "result"),
            ..Default::default()
        },
    );

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let output = ShaderCompiler::new(&types, &nodes)
        .with_textures(&textures)
        .compile(&graph, &CompilerOptions::default())
        .unwrap();

    assert_eq!(calls.get(), 1);
    let source = output.source().unwrap();
    assert_eq!(source.matches("Texture2D g_tColor").count(), 1);
    assert!(source.contains("float2 l_1 = i.vTextureCoords.xy * 4.0f;"));
    assert!(source.contains("g_tColor.Sample( g_sSampler0, l_1 )"));

    let program = output.program.unwrap();
    assert_eq!(program.textures.len(), 1);
    assert_eq!(program.samplers.len(), 1);
    assert_eq!(
        program.textures[0].asset.as_deref(),
        Some("materials/rock_color.png.vtex")
    );
}

#[test]
fn test_texture_failure_is_a_warning() {
    let textures = |_: &TextureRequest| -> Option<String> { None };

    let mut graph = ShaderGraph::new();
    let sample = add(
        &mut graph,
        TextureSampleNode {
            source: TextureSource {
                image: "materials/missing.png".to_owned(),
                name: "Color".to_owned(),
                default_color: Vec4::ZERO,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(sample, "result"),
            ..Default::default()
        },
    );

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let output = ShaderCompiler::new(&types, &nodes)
        .with_textures(&textures)
        .compile(&graph, &CompilerOptions::default())
        .unwrap();

    let warning = find(&output, DiagnosticKind::AssetCompilationFailure).unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.node, sample);
    assert_eq!(
        warning.message,
        "failed to compile texture \"materials/missing.png\""
    );
    assert!(output.is_shippable());

    let program = output.program.unwrap();
    assert_eq!(program.textures[0].asset, None);
    assert_eq!(program.textures[0].default_color, Vec4::ONE);
    assert!(program.source.contains("Default4( 1, 1, 1, 1 );"));
}

#[test]
fn test_duplicate_parameter_is_fatal() {
    let mut graph = ShaderGraph::new();
    let first = add(&mut graph, named_float("Roughness", 0.5));
    let second = add(&mut graph, named_float("Roughness", 0.7));
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(first, "result"),
            metalness: connect(second, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert!(output.program.is_none());
    let duplicate = find(&output, DiagnosticKind::DuplicateName).unwrap();
    assert_eq!(duplicate.severity, Severity::Fatal);
    assert_eq!(duplicate.node, second);
}

#[test]
fn test_globals_are_deduplicated() {
    let mut graph = ShaderGraph::new();
    let a = add(&mut graph, FresnelNode::default());
    let b = add(
        &mut graph,
        FresnelNode {
            default_power: 2.0,
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            emission: connect(a, "result"),
            opacity: connect(b, "result"),
            ..Default::default()
        },
    );

    let options = CompilerOptions {
        blend_mode: BlendMode::Masked,
        ..Default::default()
    };
    let output = compile(&graph, &options).unwrap();
    let source = output.source().unwrap();
    assert_eq!(source.matches("float Fresnel(").count(), 1);
    assert_eq!(source.matches("#define S_ALPHA_TEST 1").count(), 1);
    assert_eq!(output.program.unwrap().functions, vec!["Fresnel".to_owned()]);
}

#[test]
fn test_program_header_and_modes() {
    let mut graph = ShaderGraph::new();
    let value = add(&mut graph, float(0.5));
    add(
        &mut graph,
        MaterialResultNode {
            opacity: connect(value, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let source = output.source().unwrap();
    assert!(source.starts_with("HEADER\n{\n    Description = \"Shader Graph\";\n}"));
    assert!(source.contains("    Forward();\n    Depth();\n    ToolsVis( S_MODE_TOOLS_VIS );"));
    assert!(source.contains("return ShadingModelStandard::Shade( i, m );"));

    let options = CompilerOptions {
        blend_mode: BlendMode::Translucent,
        shading_model: ShadingModel::Unlit,
        description: "Glass".to_owned(),
        ..Default::default()
    };
    let output = compile(&graph, &options).unwrap();
    let source = output.source().unwrap();
    assert!(source.contains("Description = \"Glass\";"));
    assert!(source.contains("#define S_TRANSLUCENT 1"));
    assert!(!source.contains("Depth();"));
    assert!(source.contains("return float4( m.Albedo + m.Emission, m.Opacity );"));
}

#[test]
fn test_root_selection() {
    let mut graph = ShaderGraph::new();
    add(&mut graph, float(1.0));
    assert!(matches!(
        compile(&graph, &CompilerOptions::default()),
        Err(CompileError::MissingRoot(_))
    ));

    add(&mut graph, MaterialResultNode::default());
    let extra = add(&mut graph, MaterialResultNode::default());
    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let warning = find(&output, DiagnosticKind::Validation).unwrap();
    assert_eq!(warning.node, extra);
    assert_eq!(warning.severity, Severity::Warning);
    assert!(output.is_shippable());
}

#[test]
fn test_invalid_template_is_an_error() {
    let mut graph = ShaderGraph::new();
    add(&mut graph, MaterialResultNode::default());
    let options = CompilerOptions {
        template: Some("{7".to_owned()),
        ..Default::default()
    };
    assert!(matches!(
        compile(&graph, &options),
        Err(CompileError::TemplateError(TemplateError::UnclosedSlot(0)))
    ));
}

fn tint_subgraph() -> ShaderGraph {
    let mut graph = ShaderGraph::subgraph();
    let color = add(
        &mut graph,
        SubgraphInputNode {
            name: "Color".to_owned(),
            value_type: ValueType::Vector3,
            default: ConstantValue::Vector3(Vec3::ONE),
            required: false,
        },
    );
    let scaled = add(
        &mut graph,
        MultiplyNode {
            a: connect(color, "result"),
            default_b: 0.5,
            ..Default::default()
        },
    );
    add(
        &mut graph,
        SubgraphOutputNode {
            name: "Result".to_owned(),
            value: connect(scaled, "result"),
            ..Default::default()
        },
    );
    graph
}

fn call(path: &str, inputs: &[(&str, NodeInput)]) -> SubgraphNode {
    SubgraphNode {
        path: path.to_owned(),
        inputs: inputs
            .iter()
            .map(|(name, input)| (name.to_string(), input.clone()))
            .collect(),
    }
}

#[test]
fn test_subgraph_call_sites_are_independent() {
    let mut subgraphs = HashMap::new();
    subgraphs.insert("tint.sg".to_owned(), tint_subgraph());

    let mut graph = ShaderGraph::new();
    let a = add(
        &mut graph,
        Vector3Node {
            name: "A".to_owned(),
            ..Default::default()
        },
    );
    let b = add(
        &mut graph,
        Vector3Node {
            name: "B".to_owned(),
            ..Default::default()
        },
    );
    let first = add(&mut graph, call("tint.sg", &[("Color", connect(a, "result"))]));
    let second = add(&mut graph, call("tint.sg", &[("Color", connect(b, "result"))]));
    let unbound = add(&mut graph, call("tint.sg", &[]));
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(first, "Result"),
            emission: connect(second, "Result"),
            normal: connect(unbound, "Result"),
            ..Default::default()
        },
    );

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let output = ShaderCompiler::new(&types, &nodes)
        .with_subgraphs(&subgraphs)
        .compile(&graph, &CompilerOptions::default())
        .unwrap();

    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    let source = output.source().unwrap();
    assert!(source.contains("float3 l_0 = g_vA * 0.5f;"));
    assert!(source.contains("m.Albedo = l_0;"));
    assert!(source.contains("float3 l_1 = g_vB * 0.5f;"));
    assert!(source.contains("m.Emission = l_1;"));
    assert!(source.contains("m.Normal = float3( 1, 1, 1 ) * 0.5f;"));

    let program = output.program.unwrap();
    assert!(program.metadata["subgraph"].contains("tint.sg"));
}

#[test]
fn test_missing_subgraph() {
    let mut graph = ShaderGraph::new();
    let missing = add(&mut graph, call("missing.sg", &[]));
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(missing, "Result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let error = find(&output, DiagnosticKind::Node).unwrap();
    assert_eq!(error.node, missing);
    assert!(error.message.contains("missing.sg"));
    assert!(output.source().unwrap().contains("m.Albedo = float3( 1, 1, 1 );"));
}

#[test]
fn test_recursive_subgraph_is_fatal() {
    let mut recursive = ShaderGraph::subgraph();
    let inner = add(&mut recursive, call("loop.sg", &[]));
    add(
        &mut recursive,
        SubgraphOutputNode {
            name: "Result".to_owned(),
            value: connect(inner, "Result"),
            ..Default::default()
        },
    );

    let mut subgraphs = HashMap::new();
    subgraphs.insert("loop.sg".to_owned(), recursive);

    let mut graph = ShaderGraph::new();
    let outer = add(&mut graph, call("loop.sg", &[]));
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(outer, "Result"),
            ..Default::default()
        },
    );

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let output = ShaderCompiler::new(&types, &nodes)
        .with_subgraphs(&subgraphs)
        .compile(&graph, &CompilerOptions::default())
        .unwrap();

    assert!(output.program.is_none());
    let cycle = find(&output, DiagnosticKind::CycleDetected).unwrap();
    assert_eq!(cycle.severity, Severity::Fatal);
    assert!(cycle.message.contains("loop.sg -> loop.sg"));
}

#[test]
fn test_subgraph_compiled_on_its_own() {
    let mut graph = ShaderGraph::subgraph();
    let amount = add(
        &mut graph,
        SubgraphInputNode {
            name: "Amount".to_owned(),
            value_type: ValueType::Float,
            default: ConstantValue::Float(0.25),
            required: true,
        },
    );
    add(
        &mut graph,
        SubgraphOutputNode {
            name: "Roughness".to_owned(),
            value: connect(amount, "result"),
            preview: Some(MaterialChannel::Roughness),
            ..Default::default()
        },
    );
    let duplicate = add(
        &mut graph,
        SubgraphOutputNode {
            name: "Other".to_owned(),
            value: connect(amount, "result"),
            preview: Some(MaterialChannel::Roughness),
            ..Default::default()
        },
    );

    let output = compile(&graph, &pixel_only()).unwrap();
    assert_eq!(
        output.source().unwrap(),
        "        Material m = Material::Init();\n        m.Roughness = 0.25f;\n        return ShadingModelStandard::Shade( i, m );"
    );
    let error = find(&output, DiagnosticKind::DuplicateChannel).unwrap();
    assert_eq!(error.node, duplicate);
    assert_eq!(error.severity, Severity::Error);
}

#[test]
fn test_subgraph_without_channels() {
    let graph = tint_subgraph();
    assert!(matches!(
        compile(&graph, &CompilerOptions::default()),
        Err(CompileError::MissingRoot(_))
    ));
}

#[test]
fn test_duplicate_subgraph_names_are_fatal() {
    let mut graph = ShaderGraph::subgraph();
    let input = SubgraphInputNode {
        name: "Amount".to_owned(),
        value_type: ValueType::Float,
        ..Default::default()
    };
    let first = add(&mut graph, input.clone());
    add(&mut graph, input);
    add(
        &mut graph,
        SubgraphOutputNode {
            name: "Roughness".to_owned(),
            value: connect(first, "result"),
            preview: Some(MaterialChannel::Roughness),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert!(output.program.is_none());
    let duplicate = find(&output, DiagnosticKind::DuplicateName).unwrap();
    assert_eq!(duplicate.severity, Severity::Fatal);
    assert!(duplicate.message.contains("Amount"));
}

#[test]
fn test_preview_padding() {
    let mut graph = ShaderGraph::new();
    let scalar = add(&mut graph, float(0.5));
    let vector = add(
        &mut graph,
        Vector3Node {
            value: Vec3::X,
            ..Default::default()
        },
    );
    let uv = add(&mut graph, TexCoordNode::default());
    let texture = add(&mut graph, TextureObjectNode::default());

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let compiler = ShaderCompiler::new(&types, &nodes);
    let options = CompilerOptions {
        template: Some("{7}\n{8}".to_owned()),
        ..CompilerOptions::preview()
    };
    let preview = |target: Uuid| {
        compiler
            .compile_preview(&graph, &options, &connect(target, "result"))
            .unwrap()
    };

    let output = preview(scalar);
    assert!(output.diagnostics.is_empty());
    assert_eq!(
        output.source().unwrap(),
        "\n        return float4( 0.5f, 0.5f, 0.5f, 1 );"
    );

    let output = preview(vector);
    assert!(output
        .source()
        .unwrap()
        .contains("return float4( float3( 1, 0, 0 ), 1 );"));

    let output = preview(uv);
    assert!(output
        .source()
        .unwrap()
        .contains("return float4( i.vTextureCoords.xy, 0, 1 );"));

    let output = preview(texture);
    assert_eq!(
        find(&output, DiagnosticKind::InvalidCast).unwrap().node,
        texture
    );
    assert!(output
        .source()
        .unwrap()
        .contains("return float4( 1, 0, 1, 1 );"));
}

#[test]
fn test_preview_target_errors() {
    let mut graph = ShaderGraph::new();
    add(&mut graph, float(0.5));

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let compiler = ShaderCompiler::new(&types, &nodes);
    let options = CompilerOptions::preview();

    assert!(matches!(
        compiler.compile_preview(&graph, &options, &NodeInput::disconnected()),
        Err(CompileError::PreviewTargetDisconnected)
    ));

    let missing = Uuid::new_v4();
    assert!(matches!(
        compiler.compile_preview(&graph, &options, &connect(missing, "result")),
        Err(CompileError::UnknownPreviewTarget(id)) if id == missing
    ));
}

#[test]
fn test_preview_uses_its_own_template() {
    let mut graph = ShaderGraph::new();
    let value = add(&mut graph, float(0.5));

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let output = ShaderCompiler::new(&types, &nodes)
        .compile_preview(&graph, &CompilerOptions::preview(), &connect(value, "result"))
        .unwrap();

    let source = output.source().unwrap();
    assert!(!source.contains("FEATURES"));
    assert!(!source.contains("Material::Init()"));
    assert!(!source.contains("Depth();"));
    assert!(source.contains("    Forward();"));
}

fn switch_graph() -> (ShaderGraph, Uuid) {
    let mut graph = ShaderGraph::new();
    let on = add(&mut graph, float(1.0));
    let off = add(&mut graph, float(0.0));
    let switch = add(
        &mut graph,
        StaticSwitchNode {
            name: "UseDetail".to_owned(),
            on_true: connect(on, "result"),
            on_false: connect(off, "result"),
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(switch, "result"),
            ..Default::default()
        },
    );
    (graph, switch)
}

#[test]
fn test_static_switch_final() {
    let (graph, _) = switch_graph();
    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

    let source = output.source().unwrap();
    assert!(source.contains("    Feature( F_USE_DETAIL, 0..1, \"Material\" );"));
    assert!(source.contains("    StaticCombo( S_USE_DETAIL, F_USE_DETAIL, Sys( ALL ) );"));
    assert!(source.contains(
        "        float l_0;\n        #if S_USE_DETAIL\n            l_0 = 1.0f;\n        #else\n            l_0 = 0.0f;\n        #endif"
    ));
    assert!(source.contains("m.Roughness = l_0;"));

    let program = output.program.unwrap();
    assert_eq!(program.features.len(), 1);
    assert_eq!(program.features[0].combo, "S_USE_DETAIL");
    assert!(program.metadata["feature"].contains("UseDetail"));
}

#[test]
fn test_static_switch_preview() {
    let (graph, switch) = switch_graph();

    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let output = ShaderCompiler::new(&types, &nodes)
        .compile_preview(&graph, &CompilerOptions::preview(), &connect(switch, "result"))
        .unwrap();

    let source = output.source().unwrap();
    assert!(!source.contains("#if"));
    assert!(source.contains("float l_0 = g_bUseDetail ? 1.0f : 0.0f;"));
    assert!(source.contains("return float4( l_0, l_0, l_0, 1 );"));

    let program = output.program.unwrap();
    assert!(program.features.is_empty());
    assert_eq!(program.parameters[0].global, "g_bUseDetail");
    assert!(program.parameters[0].attribute);
}

#[test]
fn test_dangling_reference() {
    let mut graph = ShaderGraph::new();
    let missing = Uuid::new_v4();
    let root = add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(missing, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let dangling = find(&output, DiagnosticKind::DanglingReference).unwrap();
    assert_eq!(dangling.node, root);
    assert!(dangling.message.contains(&missing.to_string()));
    assert_eq!(
        output
            .diagnostics
            .iter()
            .filter(|x| x.kind == DiagnosticKind::DanglingReference)
            .count(),
        1
    );
    assert!(find(&output, DiagnosticKind::MissingInput).is_some());
    assert!(output.source().unwrap().contains("m.Roughness = 1.0f;"));
}

#[test]
fn test_unknown_node_and_future_version() {
    let mut graph = ShaderGraph::new();
    let unknown = graph.add(Node {
        class: "Bogus".to_owned(),
        ..Default::default()
    });
    let mut future = Node::new(float(0.5)).unwrap();
    future.version = 9;
    let future = graph.add(future);
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(unknown, "result"),
            metalness: connect(future, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let error = find(&output, DiagnosticKind::UnknownNode).unwrap();
    assert_eq!(error.node, unknown);
    assert_eq!(error.severity, Severity::Error);
    let warning = find(&output, DiagnosticKind::FutureVersion).unwrap();
    assert_eq!(warning.node, future);
    assert_eq!(warning.severity, Severity::Warning);

    let source = output.source().unwrap();
    assert!(source.contains("m.Roughness = 1.0f;"));
    assert!(source.contains("m.Metalness = 0.5f;"));
}

#[test]
fn test_invalid_settings() {
    let mut graph = ShaderGraph::new();
    let mut broken = Node::new(float(0.5)).unwrap();
    broken.settings = serde_json::json!({ "value": "half" });
    let broken = graph.add(broken);
    add(
        &mut graph,
        MaterialResultNode {
            opacity: connect(broken, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert_eq!(
        find(&output, DiagnosticKind::InvalidSettings).unwrap().node,
        broken
    );
    assert!(output.program.is_some());
}

#[test]
fn test_upgraded_graph_compiles() {
    let output_id = Uuid::new_v4();
    let value_id = Uuid::new_v4();
    let document = serde_json::json!({
        "version": 1,
        "is_subgraph": true,
        "nodes": [
            {
                "id": value_id,
                "__class": "Float",
                "settings": { "value": 0.75 }
            },
            {
                "id": output_id,
                "__class": "FunctionResult",
                "settings": {
                    "Name": "Opacity",
                    "Value": { "node": value_id, "output": "result" },
                    "PreviewType": "Opacity"
                }
            }
        ]
    });

    let graph = GraphUpgrader::default().upgrade(document).unwrap();
    let output = compile(&graph, &pixel_only()).unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert!(output.source().unwrap().contains("m.Opacity = 0.75f;"));
}

#[test]
fn test_parameter_names_are_unique_across_types() {
    let mut graph = ShaderGraph::new();
    let scalar = add(&mut graph, named_float("Roughness", 0.5));
    let vector = add(
        &mut graph,
        Vector3Node {
            name: "Roughness".to_owned(),
            ..Default::default()
        },
    );
    let sum = add(
        &mut graph,
        AddNode {
            a: connect(scalar, "result"),
            b: connect(vector, "result"),
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            albedo: connect(sum, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    assert!(output.program.is_none());
    let duplicate = find(&output, DiagnosticKind::DuplicateName).unwrap();
    assert_eq!(duplicate.severity, Severity::Fatal);
    assert_eq!(duplicate.node, vector);
}

#[test]
fn test_switches_sharing_a_name_agree_across_modes() {
    let mut graph = ShaderGraph::new();
    let mut switches = Vec::new();
    for (on, off) in [(1.0, 0.0), (0.5, 0.25)] {
        let on = add(&mut graph, float(on));
        let off = add(&mut graph, float(off));
        switches.push(add(
            &mut graph,
            StaticSwitchNode {
                name: "UseDetail".to_owned(),
                on_true: connect(on, "result"),
                on_false: connect(off, "result"),
                ..Default::default()
            },
        ));
    }
    let sum = add(
        &mut graph,
        AddNode {
            a: connect(switches[0], "result"),
            b: connect(switches[1], "result"),
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(sum, "result"),
            ..Default::default()
        },
    );

    let final_build = compile(&graph, &CompilerOptions::default()).unwrap();
    let preview = compile(&graph, &CompilerOptions::preview()).unwrap();

    assert!(final_build.is_shippable(), "{:?}", final_build.diagnostics);
    assert!(preview.is_shippable(), "{:?}", preview.diagnostics);
    assert_eq!(final_build.diagnostics, preview.diagnostics);

    let final_build = final_build.program.unwrap();
    assert_eq!(final_build.features.len(), 1);
    assert_eq!(final_build.source.matches("Feature( F_USE_DETAIL").count(), 1);

    let preview = preview.program.unwrap();
    assert!(preview.features.is_empty());
    assert_eq!(preview.parameters.len(), 1);
    assert_eq!(preview.parameters[0].global, "g_bUseDetail");
    assert_eq!(preview.parameters[0].node, switches[0]);
    assert!(preview.source.contains("float l_0 = g_bUseDetail ? 1.0f : 0.0f;"));
    assert!(preview.source.contains("float l_1 = g_bUseDetail ? 0.5f : 0.25f;"));
}

#[test]
fn test_invalid_subgraph_path_is_a_dangling_reference() {
    let mut graph = ShaderGraph::new();
    let sum = add(
        &mut graph,
        AddNode {
            a: connect(Uuid::new_v4(), "result").in_subgraph(vec![Uuid::new_v4()]),
            default_a: 7.0,
            ..Default::default()
        },
    );
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(sum, "result"),
            ..Default::default()
        },
    );

    let output = compile(&graph, &CompilerOptions::default()).unwrap();
    let dangling = find(&output, DiagnosticKind::DanglingReference).unwrap();
    assert_eq!(dangling.node, sum);
    assert_eq!(dangling.severity, Severity::Error);
    assert_eq!(find(&output, DiagnosticKind::MissingInput).unwrap().node, sum);
    assert!(!output.is_shippable());
    assert!(output.source().unwrap().contains("m.Roughness = 7.0f + 0.0f;"));
}

fn reroute_chain(length: usize) -> ShaderGraph {
    let mut graph = ShaderGraph::new();
    let mut previous = add(&mut graph, float(0.5));
    for _ in 0..length {
        previous = add(
            &mut graph,
            RerouteNode {
                input: connect(previous, "result"),
            },
        );
    }
    add(
        &mut graph,
        MaterialResultNode {
            roughness: connect(previous, "result"),
            ..Default::default()
        },
    );
    graph
}

#[test]
fn test_resolution_depth_is_bounded() {
    let output = compile(&reroute_chain(32), &CompilerOptions::default()).unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert!(output.source().unwrap().contains("m.Roughness = 0.5f;"));

    let output = compile(
        &reroute_chain(MAX_RESOLVE_DEPTH + 8),
        &CompilerOptions::default(),
    )
    .unwrap();
    assert!(output.program.is_none());
    let depth = find(&output, DiagnosticKind::DepthExceeded).unwrap();
    assert_eq!(depth.severity, Severity::Fatal);
}
