use anyhow::{Context, Result};
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use super::codec::{NumericCodec, reshape};
use super::document::{DocumentNode, EncodedArray, NodePath};
use super::error::ExtractError;
use super::resolver::{ColumnKey, ColumnValue};

pub const TEXT_MARKER: &str = "text";
pub const TITLE_TAG: &str = "plotTitle";
pub const BIN_SIZES_TAG: &str = "binSizes";
const CODE_FIELD: &str = "code";
const ATTRIBUTES_FIELD: &str = "attributes";
const BIN_SIZE_PATTERN: &str = r"size\s=\sparseFloat\(([\s\S]*?)\);";

/// Settled value carried by an extraction task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskValue {
    Column(ColumnValue),
    Text(DocumentNode),
    Title(String),
    BinSizes(Vec<String>),
}

/// One settled `(key, value, path)` triple, ready for the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionTask {
    pub key: String,
    pub value: TaskValue,
    pub path: NodePath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskSource {
    Ready(TaskValue),
    Pending(PendingCell),
}

/// Column content that still holds encoded arrays, at any depth.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCell {
    Ready(ColumnValue),
    Encoded(EncodedArray),
    Sequence(Vec<PendingCell>),
}

impl PendingCell {
    fn from_node(node: &DocumentNode) -> Self {
        match node {
            DocumentNode::EncodedArray(array) => PendingCell::Encoded(array.clone()),
            DocumentNode::Sequence(items) => {
                PendingCell::Sequence(items.iter().map(PendingCell::from_node).collect())
            }
            other => PendingCell::Ready(ColumnValue::from_node(other)),
        }
    }

    fn has_encoded(&self) -> bool {
        match self {
            PendingCell::Ready(_) => false,
            PendingCell::Encoded(_) => true,
            PendingCell::Sequence(cells) => cells.iter().any(PendingCell::has_encoded),
        }
    }

    fn settle(self, codec: &dyn NumericCodec) -> Result<ColumnValue> {
        match self {
            PendingCell::Ready(value) => Ok(value),
            PendingCell::Encoded(array) => Ok(reshape(codec.decode(&array)?, &array.shape)),
            PendingCell::Sequence(cells) => cells
                .into_iter()
                .map(|cell| cell.settle(codec))
                .collect::<Result<Vec<_>>>()
                .map(ColumnValue::Sequence),
        }
    }
}

/// A task as emitted by the walk; encoded arrays still await the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTask {
    pub key: String,
    pub source: TaskSource,
    pub path: NodePath,
}

impl PendingTask {
    fn ready(key: &str, value: TaskValue, path: &NodePath) -> Self {
        Self {
            key: key.to_string(),
            source: TaskSource::Ready(value),
            path: path.clone(),
        }
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self.source, TaskSource::Pending(_))
    }
}

/// Recursive scan of a document tree for data columns, titles and embedded
/// bin-size constants.
#[derive(Debug)]
pub struct TreeWalker {
    bin_size_pattern: Regex,
}

impl TreeWalker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bin_size_pattern: Regex::new(BIN_SIZE_PATTERN)
                .context("failed to compile bin size regex")?,
        })
    }

    pub fn walk(&self, root: &DocumentNode) -> Vec<PendingTask> {
        self.walk_node(root, &NodePath::root())
    }

    fn walk_node(&self, node: &DocumentNode, path: &NodePath) -> Vec<PendingTask> {
        match node {
            DocumentNode::Mapping(entries) => self.walk_properties(
                entries.iter().map(|(name, value)| (name.clone(), value)),
                path,
            ),
            DocumentNode::Sequence(items) => self.walk_properties(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, value)| (index.to_string(), value)),
                path,
            ),
            _ => Vec::new(),
        }
    }

    fn walk_properties<'a>(
        &self,
        properties: impl Iterator<Item = (String, &'a DocumentNode)>,
        path: &NodePath,
    ) -> Vec<PendingTask> {
        let mut tasks = Vec::new();

        for (name, value) in properties {
            if value.is_falsy() {
                continue;
            }

            if name == TEXT_MARKER {
                tasks.push(PendingTask::ready(
                    &name,
                    TaskValue::Text(value.clone()),
                    path,
                ));
                continue;
            }

            if ColumnKey::is_source_name(&name) {
                match value {
                    DocumentNode::Sequence(_) | DocumentNode::EncodedArray(_) => {
                        let cell = PendingCell::from_node(value);
                        let source = if cell.has_encoded() {
                            TaskSource::Pending(cell)
                        } else {
                            TaskSource::Ready(TaskValue::Column(ColumnValue::from_node(value)))
                        };
                        tasks.push(PendingTask {
                            key: name.clone(),
                            source,
                            path: path.clone(),
                        });
                    }
                    _ => {
                        debug!(column = %name, path = %path, "decoy column, skipping remaining siblings");
                        break;
                    }
                }
            } else if name == CODE_FIELD {
                if let Some(candidates) = value.as_str().and_then(|code| self.scan_bin_sizes(code))
                {
                    tasks.push(PendingTask::ready(
                        BIN_SIZES_TAG,
                        TaskValue::BinSizes(candidates),
                        path,
                    ));
                }
            } else if name == ATTRIBUTES_FIELD {
                if let Some(title) = plot_title(value) {
                    tasks.push(PendingTask::ready(TITLE_TAG, TaskValue::Title(title), path));
                }
            }

            if matches!(value, DocumentNode::Mapping(_) | DocumentNode::Sequence(_)) {
                tasks.extend(self.walk_node(value, &path.child(&name)));
            }
        }

        tasks
    }

    /// Literal arguments of every `size = parseFloat(...);` assignment.
    pub fn scan_bin_sizes(&self, code: &str) -> Option<Vec<String>> {
        let candidates: Vec<String> = self
            .bin_size_pattern
            .captures_iter(code)
            .filter_map(|captures| captures.get(1))
            .map(|literal| literal.as_str().to_string())
            .collect();

        (!candidates.is_empty()).then_some(candidates)
    }
}

/// Title labels are attribute blocks detached from any plot.
fn plot_title(attributes: &DocumentNode) -> Option<String> {
    if !matches!(attributes.get("plot"), Some(DocumentNode::Null)) {
        return None;
    }

    attributes
        .get(TEXT_MARKER)
        .and_then(DocumentNode::as_str)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

/// Decodes every pending encoded array and joins on the results. Any codec
/// failure fails the whole batch.
pub fn settle_tasks(
    pending: Vec<PendingTask>,
    codec: &dyn NumericCodec,
) -> Result<Vec<ExtractionTask>, ExtractError> {
    pending
        .into_par_iter()
        .map(|task| {
            let value = match task.source {
                TaskSource::Ready(value) => value,
                TaskSource::Pending(cell) => {
                    let value = cell.settle(codec).map_err(|err| ExtractError::Codec {
                        column: task.key.clone(),
                        reason: format!("{err:#}"),
                    })?;
                    TaskValue::Column(value)
                }
            };

            Ok(ExtractionTask {
                key: task.key,
                value,
                path: task.path,
            })
        })
        .collect()
}
