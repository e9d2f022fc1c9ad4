use serde_json::Value;

use crate::error::GraphError;

pub const SCHEMA_ORG: &str = "https://schema.org";

/// A `@context` + `@graph` document. Nodes are kept as raw JSON objects.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonLdGraph {
    pub context: String,
    pub graph: Vec<Value>,
}

impl JsonLdGraph {
    pub fn new(context: impl Into<String>, graph: Vec<Value>) -> Self {
        JsonLdGraph {
            context: context.into(),
            graph,
        }
    }

    /// Reads the document shape. A missing or non-string `@context` is left
    /// for the validator to warn about; only a missing or non-array `@graph`
    /// is fatal.
    pub fn from_value(doc: &Value) -> Result<Self, GraphError> {
        let obj = doc
            .as_object()
            .ok_or(GraphError::NotAnObject(kind_of(doc)))?;
        let graph = obj.get("@graph").ok_or(GraphError::MissingGraph)?;
        let nodes = graph
            .as_array()
            .ok_or(GraphError::GraphNotArray(kind_of(graph)))?;
        let context = obj
            .get("@context")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(JsonLdGraph::new(context, nodes.clone()))
    }

    pub fn context_is_schema_org(&self) -> bool {
        let c = self.context.trim_end_matches('/');
        c == SCHEMA_ORG || c == "http://schema.org"
    }
}

/// `@type` as a list; it may be a single string or an array of strings.
pub fn node_types(node: &Value) -> Vec<&str> {
    match node.get("@type") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(arr)) => arr.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

pub fn has_type(node: &Value, ty: &str) -> bool {
    node_types(node).contains(&ty)
}

/// Human handle for a node: its `url`, else `@id`, else `#<index>`.
pub fn node_label(node: &Value, index: usize) -> String {
    ["url", "@id"]
        .iter()
        .find_map(|k| node.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index))
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
