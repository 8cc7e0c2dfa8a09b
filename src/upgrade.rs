use std::collections::HashMap;

use anyhow::{bail, Context};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    model::{ShaderGraph, GRAPH_VERSION},
    nodes::Comparison,
};

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("invalid graph document: {0}")]
    InvalidDocument(String),
    #[error("deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rewrites the settings object of one node in place.
pub type MigrationFn = fn(&mut Map<String, Value>) -> anyhow::Result<()>;

#[derive(Clone)]
struct Migration {
    to_class: &'static str,
    to_version: u32,
    apply: MigrationFn,
}

/// Brings serialized graphs saved by older editors up to the current node
/// versions before they are deserialized.
///
/// Migrations are keyed by the `__class` and version they apply to and are
/// chained until no migration matches.
#[derive(Clone)]
pub struct GraphUpgrader {
    migrations: HashMap<(String, u32), Migration>,
}

impl Default for GraphUpgrader {
    fn default() -> Self {
        let mut upgrader = Self::new();
        upgrader.register("FunctionResult", 1, "SubgraphOutput", 2, upgrade_function_result);
        upgrader.register("Lerp", 1, "Lerp", 2, upgrade_lerp);
        upgrader.register("TextureSample", 1, "TextureSample", 2, upgrade_texture_sample);
        upgrader.register("Branch", 1, "Branch", 2, upgrade_branch);
        upgrader
    }
}

impl GraphUpgrader {
    pub fn new() -> Self {
        Self {
            migrations: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        class: &str,
        version: u32,
        to_class: &'static str,
        to_version: u32,
        apply: MigrationFn,
    ) {
        self.migrations.insert(
            (class.to_owned(), version),
            Migration {
                to_class,
                to_version,
                apply,
            },
        );
    }

    /// Upgrades a document in place and returns how many migrations ran.
    pub fn upgrade_value(&self, document: &mut Value) -> Result<usize, UpgradeError> {
        let root = document
            .as_object_mut()
            .ok_or_else(|| UpgradeError::InvalidDocument("expected an object".to_owned()))?;

        let nodes = root
            .get_mut("nodes")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| UpgradeError::InvalidDocument("missing nodes".to_owned()))?;

        let mut count = 0;
        for node in nodes.iter_mut() {
            let node = node
                .as_object_mut()
                .ok_or_else(|| UpgradeError::InvalidDocument("node is not an object".to_owned()))?;
            count += self.upgrade_node(node)?;
        }

        root.insert("version".to_owned(), Value::from(GRAPH_VERSION));
        Ok(count)
    }

    pub fn upgrade(&self, mut document: Value) -> Result<ShaderGraph, UpgradeError> {
        let count = self.upgrade_value(&mut document)?;
        if count > 0 {
            tracing::info!(count, "upgraded graph nodes");
        }
        Ok(serde_json::from_value(document)?)
    }

    fn upgrade_node(&self, node: &mut Map<String, Value>) -> Result<usize, UpgradeError> {
        let mut count = 0;
        loop {
            let class = node
                .get("__class")
                .and_then(Value::as_str)
                .ok_or_else(|| UpgradeError::InvalidDocument("node without __class".to_owned()))?
                .to_owned();
            let version = match node.get("version") {
                None | Some(Value::Null) => 1,
                Some(value) => value
                    .as_u64()
                    .and_then(|x| u32::try_from(x).ok())
                    .ok_or_else(|| {
                        UpgradeError::InvalidDocument(format!("{class} has invalid version {value}"))
                    })?,
            };

            let Some(migration) = self.migrations.get(&(class.clone(), version)) else {
                return Ok(count);
            };

            let settings = node
                .entry("settings")
                .or_insert_with(|| Value::Object(Map::new()));
            if settings.is_null() {
                *settings = Value::Object(Map::new());
            }
            let settings = settings.as_object_mut().ok_or_else(|| {
                UpgradeError::InvalidDocument(format!("{class} settings is not an object"))
            })?;

            (migration.apply)(settings)
                .with_context(|| format!("upgrading {class} version {version}"))?;

            tracing::debug!(
                from = %class,
                to = migration.to_class,
                version = migration.to_version,
                "node migrated"
            );
            node.insert("__class".to_owned(), Value::from(migration.to_class));
            node.insert("version".to_owned(), Value::from(migration.to_version));
            count += 1;
        }
    }
}

fn rename_key(settings: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = settings.remove(from) {
        settings.insert(to.to_owned(), value);
    }
}

fn upgrade_function_result(settings: &mut Map<String, Value>) -> anyhow::Result<()> {
    rename_key(settings, "Name", "name");
    rename_key(settings, "Value", "value");

    match settings.remove("PreviewType") {
        None | Some(Value::Null) => {}
        Some(Value::String(preview)) if preview == "None" => {}
        Some(Value::String(preview)) => {
            let mut channel = String::with_capacity(preview.len() + 2);
            for c in preview.chars() {
                if c.is_ascii_uppercase() && !channel.is_empty() {
                    channel.push('_');
                }
                channel.push(c.to_ascii_lowercase());
            }
            settings.insert("preview".to_owned(), Value::String(channel));
        }
        Some(other) => bail!("unexpected PreviewType {other}"),
    }
    Ok(())
}

fn upgrade_lerp(settings: &mut Map<String, Value>) -> anyhow::Result<()> {
    rename_key(settings, "Fraction", "t");
    rename_key(settings, "DefaultFraction", "default_t");
    Ok(())
}

fn upgrade_texture_sample(settings: &mut Map<String, Value>) -> anyhow::Result<()> {
    let color_space = match settings.get("color_space") {
        None => return Ok(()),
        Some(Value::String(x)) if x == "Gamma" => "srgb",
        Some(Value::String(x)) if x == "Linear" => "linear",
        Some(other) => bail!("unknown color space {other}"),
    };
    settings.insert("color_space".to_owned(), Value::from(color_space));
    Ok(())
}

fn upgrade_branch(settings: &mut Map<String, Value>) -> anyhow::Result<()> {
    let operator = match settings.get("operator") {
        None => return Ok(()),
        Some(Value::String(symbol)) => Comparison::from_symbol(symbol)
            .with_context(|| format!("unknown operator \"{symbol}\""))?,
        Some(other) => bail!("unexpected operator {other}"),
    };
    settings.insert("operator".to_owned(), serde_json::to_value(operator)?);
    Ok(())
}
