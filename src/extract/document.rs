//! Typed model of the scene-graph document embedded in a report file, and
//! the heuristics that dig it out of the surrounding HTML.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{ExtractError, Result};

const PRIMARY_START: &str = "Bokeh.safely(function() {";
const PRIMARY_END: &str = "Bokeh.embed.embed_items(docs_json, render_items);";
const PRIMARY_MIN_CHARS: usize = 5000;
const DOCS_JSON_BINDING: &str = "docs_json";
const FALLBACK_START: &str = "<script type=\"application/json\"";
const FALLBACK_TAG_SCAN: usize = 100;
const SCRIPT_END: &str = "</script>";
const ENCODED_ARRAY_MARKER: &str = "__ndarray__";
const EXCEL_PATH_MARKER: &str = "excel";
const EXCEL_TEXT_MARKER: &str = "excel_download";

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<DocumentNode>),
    /// Properties in document order.
    Mapping(Vec<(String, DocumentNode)>),
    EncodedArray(EncodedArray),
}

impl DocumentNode {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => DocumentNode::Null,
            Value::Bool(flag) => DocumentNode::Bool(flag),
            Value::Number(number) => DocumentNode::Number(number.as_f64().unwrap_or(f64::NAN)),
            Value::String(text) => DocumentNode::String(text),
            Value::Array(items) => {
                DocumentNode::Sequence(items.into_iter().map(DocumentNode::from_json).collect())
            }
            Value::Object(map) => match EncodedArray::from_object(&map) {
                Some(array) => DocumentNode::EncodedArray(array),
                None => DocumentNode::Mapping(
                    map.into_iter()
                        .map(|(key, value)| (key, DocumentNode::from_json(value)))
                        .collect(),
                ),
            },
        }
    }

    /// Values a report would treat as "nothing here".
    pub fn is_falsy(&self) -> bool {
        match self {
            DocumentNode::Null => true,
            DocumentNode::Bool(flag) => !flag,
            DocumentNode::Number(number) => *number == 0.0 || number.is_nan(),
            DocumentNode::String(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&DocumentNode> {
        match self {
            DocumentNode::Mapping(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocumentNode::String(text) => Some(text),
            _ => None,
        }
    }

    /// Plain JSON form, with encoded arrays kept as their descriptor.
    pub fn to_json(&self) -> Value {
        match self {
            DocumentNode::Null => Value::Null,
            DocumentNode::Bool(flag) => Value::Bool(*flag),
            DocumentNode::Number(number) => {
                serde_json::Number::from_f64(*number).map_or(Value::Null, Value::Number)
            }
            DocumentNode::String(text) => Value::String(text.clone()),
            DocumentNode::Sequence(items) => {
                Value::Array(items.iter().map(DocumentNode::to_json).collect())
            }
            DocumentNode::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            DocumentNode::EncodedArray(array) => {
                serde_json::to_value(array).unwrap_or(Value::Null)
            }
        }
    }
}

/// Byte order of an encoded payload. Older exports omit it; those are
/// little-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// A numeric array stored as a base64 payload with a dtype and shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedArray {
    #[serde(rename = "__ndarray__")]
    pub payload: String,
    pub dtype: String,
    pub shape: Vec<usize>,
    pub order: ByteOrder,
}

impl EncodedArray {
    fn from_object(map: &Map<String, Value>) -> Option<Self> {
        let payload = map.get(ENCODED_ARRAY_MARKER)?;
        let payload = payload.as_str().unwrap_or_default().to_string();
        let dtype = map
            .get("dtype")
            .and_then(Value::as_str)
            .unwrap_or("float64")
            .to_string();
        let shape = map
            .get("shape")
            .and_then(Value::as_array)
            .map(|dims| {
                dims.iter()
                    .filter_map(Value::as_u64)
                    .map(|dim| dim as usize)
                    .collect()
            })
            .unwrap_or_default();
        let order = match map.get("order").and_then(Value::as_str) {
            Some("big") => ByteOrder::Big,
            _ => ByteOrder::Little,
        };

        Some(Self {
            payload,
            dtype,
            shape,
            order,
        })
    }
}

/// Structural trail from the walk root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NodePath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Placeholder reports only link to a spreadsheet download.
pub fn is_excel_placeholder(source_path: &str, text: &str) -> bool {
    source_path.contains(EXCEL_PATH_MARKER) || text.contains(EXCEL_TEXT_MARKER)
}

/// Locates the embedded document and returns the node the walk starts at.
///
/// Two layouts are recognized: the inline `docs_json` script of older
/// exports, and the `application/json` script element of newer ones.
pub fn locate_document(text: &str) -> Result<DocumentNode> {
    let primary_error = match primary_script(text) {
        Some(script) => match parse_docs_json(script) {
            Ok(Value::Object(map)) => {
                let root = map.into_iter().next().map(|(_, value)| value);
                return Ok(DocumentNode::from_json(root.unwrap_or(Value::Null)));
            }
            Ok(_) => "docs_json is not an object".to_string(),
            Err(reason) => reason,
        },
        None => "inline docs_json script not found".to_string(),
    };

    let body = fallback_script(text).ok_or_else(|| {
        ExtractError::UnrecognizedFormat(format!(
            "{primary_error}; application/json script not found"
        ))
    })?;

    serde_json::from_str::<Value>(body)
        .map(DocumentNode::from_json)
        .map_err(|err| {
            ExtractError::UnrecognizedFormat(format!(
                "{primary_error}; application/json script is not valid JSON: {err}"
            ))
        })
}

fn primary_script(text: &str) -> Option<&str> {
    let start = text.rfind(PRIMARY_START)? + PRIMARY_START.len();
    let end = text.rfind(PRIMARY_END)?;
    let script = text.get(start..end)?;
    (script.len() > PRIMARY_MIN_CHARS).then_some(script)
}

fn fallback_script(text: &str) -> Option<&str> {
    let tag_start = text.find(FALLBACK_START)?;
    let tag_len = text[tag_start..].find('>')?;
    if tag_len > FALLBACK_START.len() + FALLBACK_TAG_SCAN {
        return None;
    }
    let body_start = tag_start + tag_len + 1;
    let body_len = text[body_start..].find(SCRIPT_END)?;
    Some(&text[body_start..body_start + body_len])
}

/// Parses the value bound to `docs_json`, either an object literal or a
/// single-quoted JSON string.
fn parse_docs_json(script: &str) -> std::result::Result<Value, String> {
    let binding = script
        .find(DOCS_JSON_BINDING)
        .ok_or_else(|| "docs_json binding not found".to_string())?;
    let after_binding = &script[binding + DOCS_JSON_BINDING.len()..];
    let equals = after_binding
        .find('=')
        .ok_or_else(|| "docs_json assignment not found".to_string())?;
    let literal = after_binding[equals + 1..].trim_start();

    if let Some(quoted) = literal.strip_prefix('\'') {
        let json = unescape_single_quoted(quoted)?;
        return serde_json::from_str(&json).map_err(|err| format!("docs_json string: {err}"));
    }

    serde_json::Deserializer::from_str(literal)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| "docs_json literal is empty".to_string())?
        .map_err(|err| format!("docs_json literal: {err}"))
}

/// Reads a JS single-quoted string body up to its closing quote.
fn unescape_single_quoted(body: &str) -> std::result::Result<String, String> {
    let mut output = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(character) = chars.next() {
        match character {
            '\'' => return Ok(output),
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "unterminated escape in docs_json".to_string())?;
                match escaped {
                    'n' => output.push('\n'),
                    't' => output.push('\t'),
                    'r' => output.push('\r'),
                    'b' => output.push('\u{0008}'),
                    'f' => output.push('\u{000C}'),
                    '0' => output.push('\0'),
                    'x' => {
                        let hex: String = chars.by_ref().take(2).collect();
                        let decoded = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| format!("invalid escape sequence: \\x{hex}"))?;
                        output.push(decoded);
                    }
                    'u' => {
                        // Surrogate halves stay escaped so the JSON parser pairs them.
                        let hex: String = chars.by_ref().take(4).collect();
                        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                            Some(decoded) => output.push(decoded),
                            None => {
                                output.push_str("\\u");
                                output.push_str(&hex);
                            }
                        }
                    }
                    other => output.push(other),
                }
            }
            other => output.push(other),
        }
    }

    Err("unterminated docs_json string".to_string())
}
