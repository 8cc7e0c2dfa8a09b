//! Example showing how to construct, serialize and compile a material graph

use shadergraph::compiler::prelude::*;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    fn construct_data() -> anyhow::Result<ShaderGraph> {
        let mut graph = ShaderGraph::new();

        let color = graph.add(Node::new(TextureSampleNode {
            source: TextureSource {
                image: "materials/rock_color.png".to_owned(),
                name: "Color".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        })?);

        let tint = graph.add(Node::new(ColorNode {
            value: glam::Vec4::new(1.0, 0.9, 0.8, 1.0),
            name: "Tint".to_owned(),
            ..Default::default()
        })?);

        let albedo = graph.add(Node::new(MultiplyNode {
            a: connect(color, "result"),
            b: connect(tint, "result"),
            ..Default::default()
        })?);

        let roughness = graph.add(Node::new(FloatNode {
            value: 0.6,
            name: "Roughness".to_owned(),
            range: Some((0.0, 1.0)),
            ..Default::default()
        })?);

        let rim = graph.add(Node::new(FresnelNode::default())?);

        graph.add(Node::new(MaterialResultNode {
            albedo: connect(albedo, "result"),
            emission: connect(rim, "result"),
            roughness: connect(roughness, "result"),
            ..Default::default()
        })?);

        Ok(graph)
    }

    // 1. Serialize
    let serialized = serde_json::to_string_pretty(&construct_data()?)?;

    // 2. Deserialize
    let graph: ShaderGraph = serde_json::from_str(&serialized)?;

    // 3. Compile
    let types = TypeRegistry::default();
    let nodes = default_nodes();
    let compiler = ShaderCompiler::new(&types, &nodes);
    let output = compiler.compile(
        &graph,
        &CompilerOptions {
            description: "Tinted rock".to_owned(),
            ..Default::default()
        },
    )?;

    for diagnostic in output.diagnostics.iter() {
        eprintln!("{diagnostic}");
    }

    if let Some(program) = output.program {
        println!("{}", program.source);
        for parameter in program.parameters {
            println!("parameter {} ({})", parameter.name, parameter.value_type);
        }
    }

    Ok(())
}
