use std::collections::{BTreeMap, HashMap};

pub mod model;

pub use model::*;

/// Lookup of subgraph documents referenced by `Subgraph` call nodes.
pub trait SubgraphProvider {
    fn subgraph(&self, path: &str) -> Option<&ShaderGraph>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubgraphProvider;

impl SubgraphProvider for EmptySubgraphProvider {
    fn subgraph(&self, _path: &str) -> Option<&ShaderGraph> {
        None
    }
}

impl SubgraphProvider for HashMap<String, ShaderGraph> {
    fn subgraph(&self, path: &str) -> Option<&ShaderGraph> {
        self.get(path)
    }
}

impl SubgraphProvider for BTreeMap<String, ShaderGraph> {
    fn subgraph(&self, path: &str) -> Option<&ShaderGraph> {
        self.get(path)
    }
}
