pub mod constant;
pub mod function;
pub mod geometry;
pub mod logic;
pub mod material;
pub mod math;
pub mod matrix;
pub mod subgraph;
pub mod texture;
pub mod utility;
pub mod vector;


use std::{collections::HashMap, fmt::Debug, marker::PhantomData, sync::Arc};

use serde_json::Value;
use thiserror::Error;

use crate::{
    compiler::context::CompilerContext,
    core::ValueType,
    model::{Node, NodeDefinition, NodeInput},
    result::{NodeError, ShaderExpr},
};

pub use constant::*;
pub use function::*;
pub use geometry::*;
pub use logic::*;
pub use material::*;
pub use math::*;
pub use matrix::*;
pub use subgraph::*;
pub use texture::*;
pub use utility::*;
pub use vector::*;

/// Structural part a node plays beyond producing expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole<'a> {
    Expression,
    MaterialRoot,
    SubgraphInput {
        name: &'a str,
    },
    SubgraphOutput {
        name: &'a str,
        channel: Option<MaterialChannel>,
    },
    SubgraphCall {
        path: &'a str,
    },
}

/// A deserialized node instance.
///
/// `resolve` is a pure function of the node's settings and the compiler
/// state: it may register globals and pull upstream results through `ctx`,
/// but it never mutates the node.
pub trait ShaderNode: Debug + Send + Sync {
    fn resolve(
        &self,
        output: &str,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<ShaderExpr, NodeError>;

    fn connections(&self) -> Vec<(&str, &NodeInput)> {
        Vec::new()
    }

    fn errors(&self) -> Vec<String> {
        Vec::new()
    }

    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }

    fn metadata(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn role(&self) -> NodeRole<'_> {
        NodeRole::Expression
    }
}

#[derive(Error, Debug)]
pub enum NodeBuildError {
    #[error("serialization error for {0}: {1:?}")]
    SettingsSerializationError(String, serde_json::Error),
}

pub trait NodeMeta: Send + Sync {
    fn name(&self) -> &'static str;
    fn version(&self) -> u32;
    fn input(&self) -> &'static [(&'static str, ValueType)];
    fn output(&self) -> &'static [(&'static str, ValueType)];
    fn instantiate_default(&self) -> anyhow::Result<Node>;
    fn build(&self, settings: &Value) -> Result<Arc<dyn ShaderNode>, NodeBuildError>;
}

struct NodeDefinitionMeta<T: NodeDefinition + ShaderNode>(PhantomData<fn() -> T>);

impl<T: NodeDefinition + ShaderNode + 'static> NodeMeta for NodeDefinitionMeta<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn version(&self) -> u32 {
        T::version()
    }

    fn input(&self) -> &'static [(&'static str, ValueType)] {
        T::input()
    }

    fn output(&self) -> &'static [(&'static str, ValueType)] {
        T::output()
    }

    fn instantiate_default(&self) -> anyhow::Result<Node> {
        Node::new(T::default())
    }

    fn build(&self, settings: &Value) -> Result<Arc<dyn ShaderNode>, NodeBuildError> {
        // Absent settings mean every field takes its default.
        let node = if settings.is_null() {
            T::default()
        } else {
            serde_json::from_value(settings.clone()).map_err(|err| {
                NodeBuildError::SettingsSerializationError(T::name().to_owned(), err)
            })?
        };
        Ok(Arc::new(node))
    }
}

/// Maps a serialized `__class` to its node definition.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    pub nodes: HashMap<String, Arc<dyn NodeMeta>>,
}

impl NodeRegistry {
    pub fn get(&self, name: &str) -> Option<&dyn NodeMeta> {
        self.nodes.get(name).map(|x| x.as_ref())
    }

    pub fn register<T: NodeDefinition + ShaderNode + 'static>(&mut self) {
        self.nodes.insert(
            T::name().to_owned(),
            Arc::new(NodeDefinitionMeta::<T>(PhantomData)),
        );
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(|x| x.as_str()).collect();
        names.sort_unstable();
        names
    }
}

pub fn add_default_nodes(meta: &mut NodeRegistry) {
    meta.register::<FloatNode>();
    meta.register::<IntNode>();
    meta.register::<BoolNode>();
    meta.register::<Vector2Node>();
    meta.register::<Vector3Node>();
    meta.register::<Vector4Node>();
    meta.register::<ColorNode>();

    meta.register::<AddNode>();
    meta.register::<SubtractNode>();
    meta.register::<MultiplyNode>();
    meta.register::<DivideNode>();
    meta.register::<MinNode>();
    meta.register::<MaxNode>();
    meta.register::<PowerNode>();
    meta.register::<DotNode>();
    meta.register::<CrossNode>();
    meta.register::<DistanceNode>();
    meta.register::<LerpNode>();
    meta.register::<ClampNode>();
    meta.register::<RemapNode>();
    meta.register::<AbsNode>();
    meta.register::<NegateNode>();
    meta.register::<OneMinusNode>();
    meta.register::<SaturateNode>();
    meta.register::<NormalizeNode>();
    meta.register::<LengthNode>();
    meta.register::<SinNode>();
    meta.register::<CosNode>();
    meta.register::<FracNode>();
    meta.register::<FloorNode>();
    meta.register::<CeilNode>();
    meta.register::<SqrtNode>();

    meta.register::<SplitVectorNode>();
    meta.register::<CombineVectorNode>();
    meta.register::<SwizzleNode>();

    meta.register::<TexCoordNode>();
    meta.register::<WorldPositionNode>();
    meta.register::<WorldNormalNode>();
    meta.register::<ViewDirectionNode>();
    meta.register::<VertexColorNode>();
    meta.register::<TimeNode>();
    meta.register::<ScreenPositionNode>();

    meta.register::<MatrixAttributeNode>();
    meta.register::<TransformVectorNode>();

    meta.register::<TextureObjectNode>();
    meta.register::<SamplerStateNode>();
    meta.register::<TextureSampleNode>();
    meta.register::<TextureCubeSampleNode>();

    meta.register::<BranchNode>();
    meta.register::<StaticSwitchNode>();

    meta.register::<CustomFunctionNode>();
    meta.register::<FresnelNode>();

    meta.register::<SubgraphInputNode>();
    meta.register::<SubgraphOutputNode>();
    meta.register::<SubgraphNode>();

    meta.register::<MaterialResultNode>();

    meta.register::<RerouteNode>();
    meta.register::<CommentNode>();
}

pub fn default_nodes() -> NodeRegistry {
    let mut registry = NodeRegistry::default();
    add_default_nodes(&mut registry);
    registry
}

/// Shared check used by every node for an output name it does not have.
pub(crate) fn unknown_output(node: &str, output: &str) -> NodeError {
    NodeError::UnknownOutput(format!("{node}.{output}"))
}
