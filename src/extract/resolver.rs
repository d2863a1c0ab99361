use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::document::{DocumentNode, NodePath};
use super::error::{ExtractError, Result};
use super::walker::{ExtractionTask, TaskValue};

const REFERENCES_SEGMENT: &str = "references";

/// Semantic column names shared by every plot layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKey {
    XBin,
    YBin,
    CustomerX,
    CustomerY,
    Thickness,
    Color,
    Image,
    PlotX,
    PlotY,
    Angle,
    Radius,
    WallName,
}

impl ColumnKey {
    /// Raw document names the normalization table accepts.
    pub const SOURCE_NAMES: [&'static str; 18] = [
        "x",
        "y",
        "best_value",
        "thickness",
        "image",
        "customer_tube",
        "height",
        "customer_x",
        "customer_y",
        "best_value_color",
        "wall_name",
        "x_bin",
        "y_bin",
        "color",
        "plot_x",
        "plot_y",
        "angle",
        "radius",
    ];

    pub fn from_source_name(name: &str) -> Option<Self> {
        let key = match name {
            "x" | "x_bin" => ColumnKey::XBin,
            "y" | "y_bin" => ColumnKey::YBin,
            "best_value" | "thickness" => ColumnKey::Thickness,
            "image" => ColumnKey::Image,
            "customer_tube" | "customer_x" => ColumnKey::CustomerX,
            "height" | "customer_y" => ColumnKey::CustomerY,
            "best_value_color" | "color" => ColumnKey::Color,
            "wall_name" => ColumnKey::WallName,
            "plot_x" => ColumnKey::PlotX,
            "plot_y" => ColumnKey::PlotY,
            "angle" => ColumnKey::Angle,
            "radius" => ColumnKey::Radius,
            _ => return None,
        };
        Some(key)
    }

    pub fn is_source_name(name: &str) -> bool {
        Self::SOURCE_NAMES.contains(&name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKey::XBin => "x_bin",
            ColumnKey::YBin => "y_bin",
            ColumnKey::CustomerX => "customer_x",
            ColumnKey::CustomerY => "customer_y",
            ColumnKey::Thickness => "thickness",
            ColumnKey::Color => "color",
            ColumnKey::Image => "image",
            ColumnKey::PlotX => "plot_x",
            ColumnKey::PlotY => "plot_y",
            ColumnKey::Angle => "angle",
            ColumnKey::Radius => "radius",
            ColumnKey::WallName => "wall_name",
        }
    }
}

/// A resolved column cell. Columns themselves are always `Sequence`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Sequence(Vec<ColumnValue>),
    /// Structured cells, kept as found.
    Object(Map<String, Value>),
}

impl ColumnValue {
    fn from_nodes(nodes: &[DocumentNode]) -> Self {
        ColumnValue::Sequence(nodes.iter().map(ColumnValue::from_node).collect())
    }

    pub fn from_node(node: &DocumentNode) -> Self {
        match node {
            DocumentNode::Null => ColumnValue::Null,
            DocumentNode::Bool(flag) => ColumnValue::Bool(*flag),
            DocumentNode::Number(number) => ColumnValue::Number(*number),
            DocumentNode::String(text) => ColumnValue::Text(text.clone()),
            DocumentNode::Sequence(items) => ColumnValue::from_nodes(items),
            DocumentNode::Mapping(_) | DocumentNode::EncodedArray(_) => match node.to_json() {
                Value::Object(map) => ColumnValue::Object(map),
                _ => ColumnValue::Null,
            },
        }
    }

    pub fn items(&self) -> &[ColumnValue] {
        match self {
            ColumnValue::Sequence(items) => items,
            _ => &[],
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            ColumnValue::Sequence(items) => Some(items.len()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric cells, skipping anything else.
    pub fn numbers(&self) -> Vec<f64> {
        self.items()
            .iter()
            .filter_map(ColumnValue::as_f64)
            .collect()
    }
}

/// All columns that belong to one rendered plot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReferenceRecord {
    columns: BTreeMap<ColumnKey, ColumnValue>,
}

impl ReferenceRecord {
    pub fn get(&self, key: ColumnKey) -> Option<&ColumnValue> {
        self.columns.get(&key)
    }

    pub fn insert(&mut self, key: ColumnKey, value: ColumnValue) -> Option<ColumnValue> {
        self.columns.insert(key, value)
    }

    pub fn remove(&mut self, key: ColumnKey) -> Option<ColumnValue> {
        self.columns.remove(&key)
    }

    /// Writes `value` under `key`, or clears `key` when there is nothing to write.
    pub fn set_or_remove(&mut self, key: ColumnKey, value: Option<ColumnValue>) {
        match value {
            Some(value) => {
                self.columns.insert(key, value);
            }
            None => {
                self.columns.remove(&key);
            }
        }
    }

    pub fn contains(&self, key: ColumnKey) -> bool {
        self.columns.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.columns.keys().copied()
    }
}

impl FromIterator<(ColumnKey, ColumnValue)> for ReferenceRecord {
    fn from_iter<T: IntoIterator<Item = (ColumnKey, ColumnValue)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Everything the resolver recovered from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDocument {
    pub title: Option<String>,
    pub bin_size_candidates: Option<Vec<String>>,
    /// Reference records keyed by identifier, index-like identifiers first.
    pub references: Vec<(String, ReferenceRecord)>,
}

#[derive(Debug, Default)]
pub struct NodeResolver {
    resolved: ResolvedDocument,
}

impl NodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, task: ExtractionTask) -> Result<()> {
        let value = match task.value {
            TaskValue::Text(_) => return Ok(()),
            TaskValue::Title(title) => {
                self.resolved.title = Some(title);
                return Ok(());
            }
            TaskValue::BinSizes(candidates) => {
                self.resolved.bin_size_candidates = Some(candidates);
                return Ok(());
            }
            TaskValue::Column(value) => value,
        };

        let key = ColumnKey::from_source_name(&task.key)
            .ok_or_else(|| ExtractError::UnknownColumn(task.key.clone()))?;
        let reference_id = reference_id(&task.path)?;

        let references = &mut self.resolved.references;
        let index = match references.iter().position(|(id, _)| id == reference_id) {
            Some(index) => index,
            None => {
                references.push((reference_id.to_string(), ReferenceRecord::default()));
                references.len() - 1
            }
        };
        references[index].1.insert(key, value);

        Ok(())
    }

    pub fn finish(mut self) -> ResolvedDocument {
        self.resolved
            .references
            .sort_by_key(|(id, _)| match id.parse::<u64>() {
                Ok(index) => (0, index),
                Err(_) => (1, 0),
            });
        self.resolved
    }
}

/// Identifier segment that follows `references` in a path.
pub fn reference_id(path: &NodePath) -> Result<&str> {
    if path.is_empty() {
        return Err(ExtractError::InvalidPath(path.to_string()));
    }

    let segments = path.segments();
    let position = segments
        .iter()
        .position(|segment| segment == REFERENCES_SEGMENT)
        .ok_or_else(|| ExtractError::InvalidPath(path.to_string()))?;

    segments
        .get(position + 1)
        .filter(|segment| !segment.is_empty())
        .map(String::as_str)
        .ok_or_else(|| ExtractError::MissingReferenceId(path.to_string()))
}

/// Groups settled tasks into reference records.
pub fn resolve_tasks(tasks: Vec<ExtractionTask>) -> Result<ResolvedDocument> {
    if tasks.is_empty() {
        return Err(ExtractError::NoResults);
    }

    let mut resolver = NodeResolver::new();
    for task in tasks {
        resolver.apply(task)?;
    }
    Ok(resolver.finish())
}
