use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Value of a template input variable.
///
/// Mappings are `BTreeMap`s so serialization is canonical at every nesting level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<VariableValue>),
    Mapping(BTreeMap<String, VariableValue>),
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::String(value)
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Integer(value)
    }
}

impl From<i32> for VariableValue {
    fn from(value: i32) -> Self {
        VariableValue::Integer(value as i64)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Float(value)
    }
}

impl<T: Into<VariableValue>> From<Vec<T>> for VariableValue {
    fn from(values: Vec<T>) -> Self {
        VariableValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<VariableValue>> From<BTreeMap<K, V>> for VariableValue {
    fn from(values: BTreeMap<K, V>) -> Self {
        VariableValue::Mapping(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl VariableValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Named inputs of a plan.
///
/// Variables can be added or overridden but never removed, a defaults file always stays the base of a set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    variables: BTreeMap<String, VariableValue>,
}

impl VariableSet {
    pub fn new() -> VariableSet {
        VariableSet::default()
    }

    /// Loads a variable set from a `.json`, `.tfvars.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<VariableSet, ConfigError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let variables = match extension {
            "json" => serde_json::from_str::<VariableSet>(&content).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str::<VariableSet>(&content).map_err(|e| e.to_string()),
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        variables.map_err(|raw_message| ConfigError::InvalidContent {
            path: path.to_path_buf(),
            raw_message,
        })
    }

    /// Adds or overrides a variable.
    pub fn set<K: Into<String>, V: Into<VariableValue>>(&mut self, name: K, value: V) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn with<K: Into<String>, V: Into<VariableValue>>(mut self, name: K, value: V) -> VariableSet {
        self.set(name, value);
        self
    }

    /// Applies every variable of `overrides` on top of this set.
    pub fn merge(mut self, overrides: &VariableSet) -> VariableSet {
        for (name, value) in overrides.iter() {
            self.variables.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableValue)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Canonical JSON text: keys sorted at every level, no insignificant whitespace.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.variables).unwrap_or_else(|err| {
            // only non finite floats can't be represented, keep them distinct anyway
            error!("cannot serialize variable set to json: {}", err);
            format!("{:?}", self.variables)
        })
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey(self.canonical_json())
    }
}

/// Identity of a variable set, two sets serializing identically share one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short stable fingerprint for logs.
    pub fn short(&self) -> String {
        // FNV-1a, stable across runs unlike the std hasher
        let hash = self
            .0
            .bytes()
            .fold(0xcbf29ce484222325u64, |hash, byte| (hash ^ byte as u64).wrapping_mul(0x100000001b3));
        format!("{:016x}", hash)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short())
    }
}
