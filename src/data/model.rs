use serde::{de::DeserializeOwned, Serialize};
use serde_derive::{Deserialize, Serialize};

pub type Extras = Value;

pub use serde_json;
pub use serde_json::{to_value, Value};
use uuid::Uuid;

use crate::core::ValueType;

/// Schema version written by this crate. Documents with an older graph
/// version go through [`crate::GraphUpgrader`] first.
pub const GRAPH_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderGraph {
    #[serde(skip_serializing_if = "Uuid::is_nil", default)]
    pub id: Uuid,
    #[serde(default = "current_graph_version")]
    pub version: u32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,
    #[serde(default)]
    pub is_subgraph: bool,
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub extras: Extras,
}

fn current_graph_version() -> u32 {
    GRAPH_VERSION
}

impl Default for ShaderGraph {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            version: GRAPH_VERSION,
            description: String::new(),
            is_subgraph: false,
            nodes: Vec::new(),
            extras: Value::Null,
        }
    }
}

impl ShaderGraph {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            ..Default::default()
        }
    }

    pub fn subgraph() -> Self {
        Self {
            is_subgraph: true,
            ..Self::new()
        }
    }

    /// Adds a node and returns its identifier, assigning one if the node has none.
    pub fn add(&mut self, mut node: Node) -> Uuid {
        if node.id.is_nil() {
            node.id = Uuid::new_v4();
        }
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn find_node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.iter().find(|x| x.id == id)
    }

    pub fn find_node_mut(&mut self, id: Uuid) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|x| x.id == id)
    }

    pub fn nodes_of_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |x| x.class == class)
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Uuid::is_nil", default)]
    pub id: Uuid,
    #[serde(rename = "__class")]
    pub class: String,
    #[serde(default = "first_node_version")]
    pub version: u32,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub settings: Extras,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub extras: Extras,
}

fn first_node_version() -> u32 {
    1
}

impl Node {
    pub fn new<T: NodeDefinition>(settings: T) -> anyhow::Result<Node> {
        Ok(Self {
            id: Uuid::new_v4(),
            class: T::name().to_owned(),
            version: T::version(),
            settings: settings.build()?,
            extras: Value::Null,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn settings<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.settings.clone())
    }
}

/// Edge reference from a consuming input port to an upstream output.
///
/// A nil `node` means the port is unconnected. An empty `subgraph_path`
/// resolves the node in the scope of the consumer; otherwise it lists the
/// chain of subgraph call nodes starting at the root graph.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeInput {
    #[serde(skip_serializing_if = "Uuid::is_nil", default)]
    pub node: Uuid,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub output: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub subgraph_path: Vec<Uuid>,
}

impl NodeInput {
    pub const fn disconnected() -> Self {
        Self {
            node: Uuid::nil(),
            output: String::new(),
            subgraph_path: Vec::new(),
        }
    }

    pub fn new(node: Uuid, output: &str) -> Self {
        Self {
            node,
            output: output.to_owned(),
            subgraph_path: Vec::new(),
        }
    }

    #[must_use]
    pub fn in_subgraph(mut self, path: impl Into<Vec<Uuid>>) -> Self {
        self.subgraph_path = path.into();
        self
    }

    pub fn is_connected(&self) -> bool {
        !self.node.is_nil()
    }

    pub fn clear(&mut self) {
        self.node = Uuid::nil();
        self.output.clear();
        self.subgraph_path.clear();
    }
}

/// Static description of a node class and its serialized settings.
pub trait NodeDefinition: Default + Serialize + DeserializeOwned {
    fn name() -> &'static str;
    fn version() -> u32 {
        1
    }
    fn input() -> &'static [(&'static str, ValueType)];
    fn output() -> &'static [(&'static str, ValueType)];
    fn build(self) -> anyhow::Result<Extras> {
        Ok(serde_json::to_value(self)?)
    }
}

pub fn connect(node: Uuid, output: &str) -> NodeInput {
    NodeInput::new(node, output)
}

pub fn disconnected() -> NodeInput {
    NodeInput::disconnected()
}
