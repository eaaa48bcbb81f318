//! Access to the hierarchy service.
//!
//! The evaluator only talks to a [`Backend`]: [`HttpBackend`] for the real
//! API and [`MemoryBackend`] for tests and offline sessions. Objects are
//! addressed by their virtual path, see [`crate::path`].

mod http;
mod memory;

use regex::Regex;
use thiserror::Error;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use crate::{ast::EntityKind, value::Object};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error("object {0} already exists")]
    AlreadyExists(String),
    #[error("{0} cannot be reached through the API")]
    Unsupported(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("cannot reach the API: {0}")]
    Transport(String),
    #[error("invalid response from the API: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Decode(e.to_string())
    }
}

/// Restricts the children returned by [`Backend::get_children`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub category: Option<EntityKind>,
    /// `key=value` pairs, values may contain `*` wildcards
    pub attributes: Vec<(String, String)>,
    /// Whole subtree instead of direct children
    pub recursive: bool,
}

impl Filters {
    pub fn matches(&self, object: &Object) -> bool {
        if let Some(category) = self.category {
            if object.get("category").and_then(|c| c.as_str()) != Some(category.as_str()) {
                return false;
            }
        }
        self.attributes.iter().all(|(key, pattern)| {
            attribute(object, key).is_some_and(|value| wildcard_match(pattern, &value))
        })
    }
}

/// A top-level field of the object, or one of its `attributes`, as text.
pub fn attribute(object: &Object, key: &str) -> Option<String> {
    let value = object.get(key).or_else(|| {
        object
            .get("attributes")
            .and_then(|attrs| attrs.as_object())
            .and_then(|attrs| attrs.get(key))
    })?;
    Some(match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Matches `text` against a pattern where `*` stands for any sequence.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    match Regex::new(&format!("^{}$", escaped.join(".*"))) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

/// CRUD and traversal over the hierarchy.
pub trait Backend {
    /// Human-readable location of the service, shown by `lsog`.
    fn describe(&self) -> String;

    fn get_object(&mut self, path: &str) -> Result<Object, BackendError>;

    /// Children of `path` with their own paths.
    fn get_children(
        &mut self,
        path: &str,
        filters: &Filters,
    ) -> Result<Vec<(String, Object)>, BackendError>;

    fn create_object(
        &mut self,
        path: &str,
        kind: EntityKind,
        payload: Object,
    ) -> Result<Object, BackendError>;

    /// Merges `patch` into the object and returns the updated object.
    fn update_object(&mut self, path: &str, patch: Object) -> Result<Object, BackendError>;

    /// Deletes the object and its subtree, returning the deleted paths.
    fn delete_object(&mut self, path: &str) -> Result<Vec<String>, BackendError>;

    /// Moves a stray object under `dest`.
    fn link_object(&mut self, source: &str, dest: &str, slot: Option<&str>)
    -> Result<(), BackendError>;

    /// Moves an object out of the hierarchy, into the stray objects.
    fn unlink_object(&mut self, source: &str, dest: Option<&str>) -> Result<(), BackendError>;

    fn create_template(&mut self, template: Object) -> Result<(), BackendError>;

    /// Whether `path` names an object. Paths the service cannot serve count
    /// as missing.
    fn exists(&mut self, path: &str) -> Result<bool, BackendError> {
        match self.get_object(path) {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound(_) | BackendError::Unsupported(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("R*", "R12"));
        assert!(wildcard_match("*.1", "a.1"));
        assert!(!wildcard_match("R*", "A1"));
        assert!(wildcard_match("R1", "R1"));
    }

    #[test]
    fn test_filters_look_into_attributes() {
        let rack = object(json!({
            "name": "R1",
            "category": "rack",
            "attributes": {"height": 42, "vendor": "acme"}
        }));
        let filters = Filters {
            category: Some(EntityKind::Rack),
            attributes: vec![("vendor".into(), "ac*".into()), ("height".into(), "42".into())],
            recursive: false,
        };
        assert!(filters.matches(&rack));

        let filters = Filters {
            category: Some(EntityKind::Device),
            ..Filters::default()
        };
        assert!(!filters.matches(&rack));
    }
}
