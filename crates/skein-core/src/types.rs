use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data flowing between nodes. A collection payload is a JSON array.
pub type Payload = serde_json::Value;

/// Unique identifier for one `run` / `run_parallel` call.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A payload waiting in a node's input buffer, tagged with the node whose
/// transition delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub source: String,
    pub payload: Payload,
}

impl Arrival {
    pub fn new(source: impl Into<String>, payload: Payload) -> Self {
        Self {
            source: source.into(),
            payload,
        }
    }
}

/// Most recent output of every node that has produced one in a run.
///
/// Writes overwrite: a node that runs more than once (cycles, split
/// elements) keeps only its last output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Results {
    data: HashMap<String, Payload>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last output of a node.
    pub fn get(&self, node: &str) -> Option<&Payload> {
        self.data.get(node)
    }

    /// Whether the node has produced an output.
    pub fn contains(&self, node: &str) -> bool {
        self.data.contains_key(node)
    }

    /// Record an output, replacing any earlier one.
    pub fn insert(&mut self, node: impl Into<String>, output: Payload) {
        self.data.insert(node.into(), output);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Payload)> {
        self.data.iter()
    }

    pub fn into_inner(self) -> HashMap<String, Payload> {
        self.data
    }
}

impl From<HashMap<String, Payload>> for Results {
    fn from(data: HashMap<String, Payload>) -> Self {
        Self { data }
    }
}

impl<K: Into<String>> FromIterator<(K, Payload)> for Results {
    fn from_iter<I: IntoIterator<Item = (K, Payload)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_overwrite_keeps_last() {
        let mut results = Results::new();
        results.insert("a", json!(1));
        results.insert("a", json!(2));
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("a"), Some(&json!(2)));
    }

    #[test]
    fn results_serialize_as_plain_map() {
        let results: Results = [("a", json!(10))].into_iter().collect();
        let text = serde_json::to_string(&results).unwrap();
        assert_eq!(text, r#"{"a":10}"#);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
