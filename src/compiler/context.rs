use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use glam::Vec4;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    assets::{TextureCompiler, TextureRequest},
    core::{is_reference, ConstantValue, TypeRegistry},
    model::{NodeInput, ShaderGraph},
    nodes::{MaterialChannel, NodeRegistry, NodeRole, ShaderNode},
    result::{NodeError, NodeResult, ShaderExpr},
    SubgraphProvider, ValueType,
};

use super::{
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    globals::{feature_identifier, FeatureEntry, GlobalTable, ParameterRequest, SamplerDesc},
    CompileMode, ShaderStage,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    scope: Vec<Uuid>,
    node: Uuid,
    output: String,
    stage: ShaderStage,
}

/// Per node output state within one pass. Absent keys have not been visited.
#[derive(Debug, Clone)]
enum MemoEntry {
    InProgress,
    Resolved(NodeResult),
}

#[derive(Clone)]
pub(crate) struct NodeInstance {
    pub class: String,
    pub node: Arc<dyn ShaderNode>,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub(crate) enum NodeSlot {
    Ready(NodeInstance),
    Broken(String),
}

pub(crate) struct GraphInstance<'a> {
    pub graph: &'a ShaderGraph,
    pub nodes: HashMap<Uuid, NodeSlot>,
}

impl<'a> GraphInstance<'a> {
    pub fn instance(&self, id: Uuid) -> Option<&NodeInstance> {
        match self.nodes.get(&id) {
            Some(NodeSlot::Ready(instance)) => Some(instance),
            _ => None,
        }
    }

    /// Ready instances in document order.
    pub fn ordered(&self) -> impl Iterator<Item = (Uuid, &NodeInstance)> + '_ {
        let mut seen = HashSet::new();
        self.graph.nodes.iter().filter_map(move |x| {
            if !seen.insert(x.id) {
                return None;
            }
            self.instance(x.id).map(|instance| (x.id, instance))
        })
    }
}

/// Everything a finished pass hands back to the program assembly.
pub(crate) struct SessionOutput {
    pub globals: GlobalTable,
    pub statements: [Vec<String>; 2],
    pub diagnostics: Diagnostics,
    pub metadata: BTreeMap<String, BTreeSet<String>>,
}

/// Mutable state of one compile pass.
///
/// Nodes receive the context while resolving an output and use it to pull
/// upstream results, register globals and emit statements. Every result is
/// memoized per node output, subgraph scope and stage, which is what shares
/// a fanned out expression between its consumers.
pub struct CompilerContext<'a> {
    types: &'a TypeRegistry,
    registry: &'a NodeRegistry,
    subgraphs: &'a dyn SubgraphProvider,
    textures: &'a dyn TextureCompiler,
    mode: CompileMode,
    root: &'a ShaderGraph,
    graphs: HashMap<String, Arc<GraphInstance<'a>>>,
    scopes: HashMap<Vec<Uuid>, Arc<GraphInstance<'a>>>,
    memo: HashMap<MemoKey, MemoEntry>,
    stack: Vec<MemoKey>,
    scope: Vec<Uuid>,
    stage: ShaderStage,
    statements: [Vec<String>; 2],
    locals: usize,
    globals: GlobalTable,
    diagnostics: Diagnostics,
    metadata: BTreeMap<String, BTreeSet<String>>,
}

const ROOT_GRAPH: &str = "";

/// Nested output resolutions allowed before a pass gives up.
pub const MAX_RESOLVE_DEPTH: usize = 128;

impl<'a> CompilerContext<'a> {
    pub(crate) fn new(
        types: &'a TypeRegistry,
        registry: &'a NodeRegistry,
        subgraphs: &'a dyn SubgraphProvider,
        textures: &'a dyn TextureCompiler,
        mode: CompileMode,
        root: &'a ShaderGraph,
    ) -> Self {
        Self {
            types,
            registry,
            subgraphs,
            textures,
            mode,
            root,
            graphs: HashMap::new(),
            scopes: HashMap::new(),
            memo: HashMap::new(),
            stack: Vec::new(),
            scope: Vec::new(),
            stage: ShaderStage::Pixel,
            statements: Default::default(),
            locals: 0,
            globals: GlobalTable::default(),
            diagnostics: Diagnostics::default(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    pub fn is_preview(&self) -> bool {
        self.mode == CompileMode::Preview
    }

    /// Node whose output is currently being resolved, nil outside a node.
    pub fn current_node(&self) -> Uuid {
        self.stack.last().map(|x| x.node).unwrap_or_default()
    }

    pub fn current_scope(&self) -> &[Uuid] {
        &self.scope
    }

    /// Resolves the upstream output feeding `port`. Unconnected ports give
    /// `MissingInput`.
    pub fn result(&mut self, port: &str, input: &NodeInput) -> NodeResult {
        if !input.is_connected() {
            return NodeResult::missing_input(port);
        }

        let scope = if input.subgraph_path.is_empty() {
            self.scope.clone()
        } else {
            input.subgraph_path.clone()
        };

        self.resolve_output(scope, input.node, &input.output)
    }

    /// Like [`Self::result`], substituting the literal `default` for an
    /// unconnected or invalid input.
    pub fn result_or_default(
        &mut self,
        port: &str,
        input: &NodeInput,
        default: impl Into<ConstantValue>,
    ) -> ShaderExpr {
        match self.result(port, input) {
            NodeResult::Valid(expr) => expr,
            NodeResult::MissingInput(_) if input.is_connected() => {
                let node = self.current_node();
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::MissingInput,
                    node,
                    format!("missing input: {port}"),
                ));
                self.result_value(default)
            }
            _ => self.result_value(default),
        }
    }

    /// Input without a usable default.
    pub fn required(&mut self, port: &str, input: &NodeInput) -> Result<ShaderExpr, NodeError> {
        self.result(port, input).into_expr(port)
    }

    /// `None` when unconnected, an error when connected to something invalid.
    pub fn optional(
        &mut self,
        port: &str,
        input: &NodeInput,
    ) -> Result<Option<ShaderExpr>, NodeError> {
        if input.is_connected() {
            self.required(port, input).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn result_value(&self, value: impl Into<ConstantValue>) -> ShaderExpr {
        let value = value.into();
        ShaderExpr::constant(value.value_type(), value.to_literal(self.types))
    }

    /// Another output of the node being resolved, memoized like any input.
    pub fn own_output(&mut self, output: &str) -> Result<ShaderExpr, NodeError> {
        let current = self
            .stack
            .last()
            .cloned()
            .ok_or_else(|| NodeError::message("no node is being resolved"))?;

        self.resolve_output(current.scope, current.node, output)
            .into_expr(output)
    }

    pub fn result_parameter(&mut self, request: ParameterRequest) -> Result<ShaderExpr, NodeError> {
        let node = self.current_node();
        let entry = self.globals.add_parameter(request, node, self.types)?;
        debug!(global = %entry.global, "parameter");
        Ok(ShaderExpr::new(entry.value_type, entry.global.clone()))
    }

    /// Returns false when the same declaration text was already registered.
    pub fn register_global(&mut self, declaration: impl Into<String>) -> bool {
        self.globals.add_declaration(declaration)
    }

    /// Registers a free function and returns its name.
    pub fn register_function(&mut self, body: &str) -> Result<String, NodeError> {
        self.globals.add_function(body)
    }

    pub fn result_function(
        &self,
        name: &str,
        args: &[&ShaderExpr],
        result_type: ValueType,
    ) -> ShaderExpr {
        let code = if args.is_empty() {
            format!("{name}()")
        } else {
            let args: Vec<&str> = args.iter().map(|x| x.code.as_str()).collect();
            format!("{name}( {} )", args.join(", "))
        };

        ShaderExpr::new(result_type, code)
    }

    /// Registers a texture global, compiling the source image the first time
    /// the texture is seen. A failed compile binds the default white texture
    /// and reports a warning.
    pub fn result_texture(
        &mut self,
        request: &TextureRequest,
        name: &str,
        default_color: Vec4,
    ) -> Result<ShaderExpr, NodeError> {
        let node = self.current_node();
        let (entry, is_new) =
            self.globals
                .add_texture(name, request, default_color, node, self.types)?;

        let mut failed = false;
        if is_new && !request.image.is_empty() {
            match self.textures.compile_texture(request) {
                Some(asset) => entry.asset = Some(asset),
                None => {
                    entry.default_color = Vec4::ONE;
                    failed = true;
                }
            }
        }

        let expr = ShaderExpr::new(entry.value_type(), entry.global.clone())
            .with_metadata("texture", entry.name.clone());

        if failed {
            warn!(image = %request.image, "texture compilation failed");
            self.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::AssetCompilationFailure,
                node,
                format!("failed to compile texture \"{}\"", request.image),
            ));
        }

        Ok(expr)
    }

    pub fn result_sampler(&mut self, desc: SamplerDesc) -> ShaderExpr {
        let entry = self.globals.add_sampler(desc, self.types);
        ShaderExpr::new(ValueType::Sampler, entry.global.clone())
    }

    pub fn register_feature(&mut self, name: &str, group: &str) -> Result<FeatureEntry, NodeError> {
        self.globals.add_feature(name, group)
    }

    /// Runtime stand-in for a feature. Every switch naming the same feature
    /// reads one bool attribute, whose default comes from the first switch.
    pub fn result_feature_toggle(
        &mut self,
        name: &str,
        default: bool,
    ) -> Result<ShaderExpr, NodeError> {
        let identifier = feature_identifier(name);
        if identifier.is_empty() {
            return Err(NodeError::message(format!("invalid feature name \"{name}\"")));
        }

        let node = self.current_node();
        let owner = *self.globals.toggles.entry(identifier).or_insert(node);
        let request = ParameterRequest::new(name, ValueType::Bool)
            .with_default(default)
            .attribute();
        let entry = self.globals.add_parameter(request, owner, self.types)?;
        Ok(ShaderExpr::new(entry.value_type, entry.global.clone()))
    }

    /// Selects between two values with a static combo, both branches already
    /// resolved in the current stage.
    pub fn static_select(
        &mut self,
        feature: &FeatureEntry,
        result_type: ValueType,
        on: &ShaderExpr,
        off: &ShaderExpr,
    ) -> ShaderExpr {
        let local = self.next_local();
        let type_name = self.types.hlsl_name(result_type);
        let block = [
            format!("{type_name} {local};"),
            format!("#if {}", feature.combo),
            format!("    {local} = {};", on.code),
            "#else".to_owned(),
            format!("    {local} = {};", off.code),
            "#endif".to_owned(),
        ];
        self.statements[self.stage.index()].extend(block);
        ShaderExpr::new(result_type, local)
    }

    /// Reports a warning against the node being resolved.
    pub fn warn(&mut self, message: impl Into<String>) {
        let node = self.current_node();
        self.diagnostics
            .push(Diagnostic::warning(DiagnosticKind::Node, node, message));
    }

    /// Resolves `output` of the subgraph called by the node being resolved.
    pub fn call_subgraph(&mut self, output: &str) -> Result<ShaderExpr, NodeError> {
        let caller = self
            .stack
            .last()
            .cloned()
            .ok_or_else(|| NodeError::message("no node is being resolved"))?;

        let mut scope = caller.scope;
        scope.push(caller.node);

        let graph = self.graph_for_scope(&scope)?;
        let target = graph
            .ordered()
            .find(|(_, x)| matches!(x.node.role(), NodeRole::SubgraphOutput { name, .. } if name == output))
            .map(|(id, _)| id)
            .ok_or_else(|| NodeError::UnknownOutput(output.to_owned()))?;

        self.resolve_output(scope, target, SUBGRAPH_OUTPUT_PORT)
            .into_expr(output)
    }

    /// Value bound to the subgraph input `name` at the call site of the
    /// current scope, resolved in the caller's scope. `None` outside a call
    /// or when the call site leaves the input unconnected.
    pub fn subgraph_argument(&mut self, name: &str) -> Option<NodeResult> {
        let scope = self.scope.clone();
        let (call, parent) = scope.split_last()?;
        let graph = self.graph_for_scope(parent).ok()?;
        let caller = graph.instance(*call)?;

        let input = caller
            .node
            .connections()
            .into_iter()
            .find(|(port, _)| *port == name)
            .map(|(_, input)| input.clone())
            .filter(|x| x.is_connected())?;

        let outer = std::mem::replace(&mut self.scope, parent.to_vec());
        let result = self.result(name, &input);
        self.scope = outer;
        Some(result)
    }

    fn next_local(&mut self) -> String {
        let name = format!("l_{}", self.locals);
        self.locals += 1;
        name
    }

    /// Moves a non trivial expression into a stage local so that consumers
    /// share one evaluation.
    fn hoist(&mut self, expr: ShaderExpr) -> ShaderExpr {
        if expr.is_constant
            || is_reference(&expr.code)
            || expr.result_type.is_object()
            || expr.result_type == ValueType::Any
        {
            return expr;
        }

        let local = self.next_local();
        let type_name = self.types.hlsl_name(expr.result_type);
        debug!(%local, stage = ?self.stage, "hoisted");
        self.statements[self.stage.index()].push(format!("{type_name} {local} = {};", expr.code));

        ShaderExpr { code: local, ..expr }
    }

    fn resolve_output(&mut self, scope: Vec<Uuid>, node: Uuid, output: &str) -> NodeResult {
        let key = MemoKey {
            scope,
            node,
            output: output.to_owned(),
            stage: self.stage,
        };

        match self.memo.get(&key) {
            Some(MemoEntry::Resolved(result)) => return result.clone(),
            Some(MemoEntry::InProgress) => return self.report_cycle(&key),
            None => {}
        }

        let graph = match self.graph_for_scope(&key.scope) {
            Ok(graph) => graph,
            Err(err @ NodeError::Cycle(_)) => return NodeResult::from(err),
            Err(err) => {
                let consumer = self.current_node();
                let message =
                    format!("reference to node {node} through an invalid subgraph path: {err}");
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::DanglingReference,
                    consumer,
                    message.clone(),
                ));
                return NodeResult::missing_input(message);
            }
        };

        let instance = match graph.nodes.get(&node) {
            Some(NodeSlot::Ready(instance)) => instance.clone(),
            Some(NodeSlot::Broken(message)) => return NodeResult::error(message.clone()),
            None => {
                let consumer = self.current_node();
                let message = format!("reference to missing node {node}");
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::DanglingReference,
                    consumer,
                    message.clone(),
                ));
                return NodeResult::missing_input(message);
            }
        };

        if let Some(message) = instance.errors.first() {
            let result = NodeResult::error(message.clone());
            self.memo.insert(key, MemoEntry::Resolved(result.clone()));
            return result;
        }

        if self.stack.len() >= MAX_RESOLVE_DEPTH {
            return self.report_depth(&key);
        }

        self.memo.insert(key.clone(), MemoEntry::InProgress);
        self.stack.push(key.clone());
        let outer = std::mem::replace(&mut self.scope, key.scope.clone());

        let resolved = instance.node.resolve(output, self);

        self.scope = outer;
        self.stack.pop();

        let result = match resolved {
            // channel writes are consumed exactly once
            Ok(expr) if instance.node.role() == NodeRole::MaterialRoot => {
                NodeResult::Valid(expr)
            }
            Ok(expr) => NodeResult::Valid(self.hoist(expr)),
            Err(err) => {
                debug!(class = %instance.class, %node, %err, "node failed");
                if let Some(diagnostic) = Diagnostic::from_node_error(node, &err) {
                    self.diagnostics.push(diagnostic);
                }
                NodeResult::from(err)
            }
        };

        self.memo.insert(key, MemoEntry::Resolved(result.clone()));
        result
    }

    fn report_cycle(&mut self, key: &MemoKey) -> NodeResult {
        let start = self.stack.iter().position(|x| x == key).unwrap_or(0);
        let chain = self.stack[start..]
            .iter()
            .map(|x| x.node)
            .chain(std::iter::once(key.node))
            .map(|x| x.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");

        warn!(%chain, "dependency cycle");
        self.diagnostics.push(Diagnostic::fatal(
            DiagnosticKind::CycleDetected,
            key.node,
            format!("dependency cycle: {chain}"),
        ));

        NodeResult::error(NodeError::Cycle(chain).to_string())
    }

    fn report_depth(&mut self, key: &MemoKey) -> NodeResult {
        warn!(node = %key.node, depth = self.stack.len(), "resolution depth exceeded");
        self.diagnostics.push(Diagnostic::fatal(
            DiagnosticKind::DepthExceeded,
            key.node,
            format!("dependency chain is deeper than {MAX_RESOLVE_DEPTH} nodes"),
        ));
        NodeResult::error(format!("dependency chain too deep at {}", key.node))
    }

    pub(crate) fn root_graph(&mut self) -> Arc<GraphInstance<'a>> {
        let root = self.root;
        self.instantiate_graph(ROOT_GRAPH, root)
    }

    pub(crate) fn graph_for_scope(&mut self, scope: &[Uuid]) -> Result<Arc<GraphInstance<'a>>, NodeError> {
        if let Some(graph) = self.scopes.get(scope) {
            return Ok(graph.clone());
        }

        let mut graph = self.root_graph();
        let mut chain: Vec<String> = Vec::new();
        let provider = self.subgraphs;

        for (depth, call) in scope.iter().enumerate() {
            let path = match graph.instance(*call).map(|x| x.node.role()) {
                Some(NodeRole::SubgraphCall { path }) => path.to_owned(),
                Some(_) => {
                    return Err(NodeError::message(format!(
                        "node {call} is not a subgraph call"
                    )))
                }
                None => {
                    return Err(NodeError::message(format!(
                        "missing subgraph call node {call}"
                    )))
                }
            };

            if chain.contains(&path) {
                chain.push(path);
                let message = format!("recursive subgraph: {}", chain.join(" -> "));
                self.diagnostics.push(Diagnostic::fatal(
                    DiagnosticKind::CycleDetected,
                    *call,
                    message.clone(),
                ));
                return Err(NodeError::Cycle(message));
            }

            let document = provider
                .subgraph(&path)
                .ok_or_else(|| NodeError::message(format!("missing subgraph \"{path}\"")))?;

            graph = self.instantiate_graph(&path, document);
            chain.push(path);
            self.scopes.insert(scope[..=depth].to_vec(), graph.clone());
        }

        self.scopes.insert(scope.to_vec(), graph.clone());
        Ok(graph)
    }

    /// Builds node instances for a document once per pass and reports
    /// everything that can be checked without resolving outputs.
    fn instantiate_graph(&mut self, key: &str, graph: &'a ShaderGraph) -> Arc<GraphInstance<'a>> {
        if let Some(instance) = self.graphs.get(key) {
            return instance.clone();
        }

        debug!(graph = %key, nodes = graph.nodes.len(), "instantiate graph");

        let mut nodes = HashMap::with_capacity(graph.nodes.len());
        for node in graph.nodes.iter() {
            if nodes.contains_key(&node.id) {
                self.diagnostics.push(Diagnostic::fatal(
                    DiagnosticKind::DuplicateName,
                    node.id,
                    format!("duplicate node id {}", node.id),
                ));
                continue;
            }

            let Some(meta) = self.registry.get(&node.class) else {
                let message = format!("unknown node class \"{}\"", node.class);
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::UnknownNode,
                    node.id,
                    message.clone(),
                ));
                nodes.insert(node.id, NodeSlot::Broken(message));
                continue;
            };

            if node.version > meta.version() {
                self.diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::FutureVersion,
                    node.id,
                    format!(
                        "{} version {} is newer than the supported version {}",
                        node.class,
                        node.version,
                        meta.version()
                    ),
                ));
            }

            let instance = match meta.build(&node.settings) {
                Ok(instance) => instance,
                Err(err) => {
                    let message = err.to_string();
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::InvalidSettings,
                        node.id,
                        message.clone(),
                    ));
                    nodes.insert(node.id, NodeSlot::Broken(message));
                    continue;
                }
            };

            let errors = instance.errors();
            for error in errors.iter() {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::Validation,
                    node.id,
                    error.clone(),
                ));
            }
            for warning in instance.warnings() {
                self.diagnostics
                    .push(Diagnostic::warning(DiagnosticKind::Validation, node.id, warning));
            }
            for (key, value) in instance.metadata() {
                self.metadata.entry(key.to_owned()).or_default().insert(value);
            }

            nodes.insert(
                node.id,
                NodeSlot::Ready(NodeInstance {
                    class: node.class.clone(),
                    node: instance,
                    errors,
                }),
            );
        }

        let instance = Arc::new(GraphInstance { graph, nodes });
        self.validate_graph(&instance);
        self.graphs.insert(key.to_owned(), instance.clone());
        instance
    }

    fn validate_graph(&mut self, graph: &GraphInstance<'a>) {
        let mut inputs = HashSet::new();
        let mut outputs = HashSet::new();

        for (id, instance) in graph.ordered() {
            for (port, input) in instance.node.connections() {
                if input.is_connected()
                    && input.subgraph_path.is_empty()
                    && !graph.nodes.contains_key(&input.node)
                {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::DanglingReference,
                        id,
                        format!("reference to missing node {}", input.node),
                    ));
                    debug!(%port, "dangling reference");
                }
            }

            match instance.node.role() {
                NodeRole::SubgraphInput { name } if !inputs.insert(name) => {
                    self.diagnostics.push(Diagnostic::fatal(
                        DiagnosticKind::DuplicateName,
                        id,
                        format!("duplicate subgraph input \"{name}\""),
                    ));
                }
                NodeRole::SubgraphOutput { name, .. } if !outputs.insert(name) => {
                    self.diagnostics.push(Diagnostic::fatal(
                        DiagnosticKind::DuplicateName,
                        id,
                        format!("duplicate subgraph output \"{name}\""),
                    ));
                }
                _ => {}
            }
        }
    }

    /// Channel tagged outputs of the root document. The first output tagged
    /// with a channel wins; later ones are reported.
    pub(crate) fn channel_outputs(&mut self) -> Vec<(Uuid, MaterialChannel)> {
        let graph = self.root_graph();
        let mut result: Vec<(Uuid, MaterialChannel)> = Vec::new();

        for (id, instance) in graph.ordered() {
            if let NodeRole::SubgraphOutput {
                channel: Some(channel),
                ..
            } = instance.node.role()
            {
                if result.iter().any(|x| x.1 == channel) {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::DuplicateChannel,
                        id,
                        format!("{channel:?} is already provided by another output"),
                    ));
                } else {
                    result.push((id, channel));
                }
            }
        }

        result
    }

    /// Top level resolution of `output` on a root scope node.
    pub(crate) fn resolve_in_stage(
        &mut self,
        stage: ShaderStage,
        scope: Vec<Uuid>,
        node: Uuid,
        output: &str,
    ) -> NodeResult {
        let outer = std::mem::replace(&mut self.stage, stage);
        let result = self.resolve_output(scope, node, output);
        self.stage = outer;
        result
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn finish(self) -> SessionOutput {
        SessionOutput {
            globals: self.globals,
            statements: self.statements,
            diagnostics: self.diagnostics,
            metadata: self.metadata,
        }
    }
}

/// Output name `SubgraphOutput` resolves its value under.
pub const SUBGRAPH_OUTPUT_PORT: &str = "value";
