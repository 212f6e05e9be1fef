use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

/// An ordered set of string key/value pairs handed to a migration writer.
///
/// Insertion order is kept so rendered diagnostics stay stable. Inserting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: IndexMap<String, String>,
}

/// Artifact-wide values supplied once at writer setup.
pub type CompositionContext = Context;

/// Per-script values supplied with every script write.
pub type ScriptContext = Context;

impl Context {
    pub fn new() -> Self {
        Context {
            values: IndexMap::new(),
        }
    }

    /// Builder style insert.
    pub fn with<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<V: ToString>(&mut self, key: &str, value: V) -> Option<String> {
        self.values.insert(key.to_string(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a new context holding this context's entries overlaid with
    /// `other`'s. Entries of `other` win on key collisions.
    pub fn merged_with(&self, other: &Context) -> Context {
        let mut values = self.values.clone();
        for (key, value) in &other.values {
            values.insert(key.clone(), value.clone());
        }
        Context { values }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Context {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
