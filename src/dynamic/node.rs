//! Ordered document tree.

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

/// A scalar, sequence or mapping node.
///
/// Mappings keep insertion order; serialisation never re-sorts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    Scalar(String),
    Sequence(Vec<ConfigNode>),
    Mapping(IndexMap<String, ConfigNode>),
}

impl ConfigNode {
    pub fn mapping() -> Self {
        ConfigNode::Mapping(IndexMap::new())
    }

    pub fn scalar(value: impl Into<String>) -> Self {
        ConfigNode::Scalar(value.into())
    }

    pub fn sequence<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConfigNode::Sequence(items.into_iter().map(ConfigNode::scalar).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, ConfigNode>> {
        match self {
            ConfigNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.as_mapping()?.get(key)
    }

    /// Follow a key path through nested mappings.
    pub fn get_path(&self, path: &[&str]) -> Option<&ConfigNode> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The mapping behind this node, turning any other node into an empty mapping.
    pub fn mapping_mut(&mut self) -> &mut IndexMap<String, ConfigNode> {
        match self {
            ConfigNode::Mapping(map) => map,
            _ => {
                *self = ConfigNode::mapping();
                self.mapping_mut()
            }
        }
    }

    /// Get or create the child mapping under `key`.
    pub fn child_mut(&mut self, key: &str) -> &mut ConfigNode {
        let map = self.mapping_mut();
        let child = map.entry(key.to_string()).or_insert_with(ConfigNode::mapping);
        child.mapping_mut();
        child
    }

    /// Get or create the sequence under `key`.
    pub fn sequence_mut(&mut self, key: &str) -> &mut Vec<ConfigNode> {
        let map = self.mapping_mut();
        let child = map
            .entry(key.to_string())
            .or_insert_with(|| ConfigNode::Sequence(Vec::new()));
        child.as_sequence_mut()
    }

    /// The items behind this node, turning any other node into an empty sequence.
    pub fn as_sequence_mut(&mut self) -> &mut Vec<ConfigNode> {
        match self {
            ConfigNode::Sequence(items) => items,
            _ => {
                *self = ConfigNode::Sequence(Vec::new());
                self.as_sequence_mut()
            }
        }
    }

    /// Set `value` at `path`, creating intermediate mappings.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: ConfigNode) {
        let Some((last, parents)) = path.split_last() else {
            *self = value;
            return;
        };
        let target = parents
            .iter()
            .fold(self, |node, key| node.child_mut(key.as_ref()));
        target.mapping_mut().insert(last.as_ref().to_string(), value);
    }

    /// Insert `value` under `key` unless the key is already present.
    pub fn insert_default(&mut self, key: &str, value: ConfigNode) {
        self.mapping_mut().entry(key.to_string()).or_insert(value);
    }
}

impl Default for ConfigNode {
    fn default() -> Self {
        ConfigNode::mapping()
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigNode::Scalar(s) => serializer.serialize_str(s),
            ConfigNode::Sequence(items) => serializer.collect_seq(items),
            ConfigNode::Mapping(map) => serializer.collect_map(map),
        }
    }
}
