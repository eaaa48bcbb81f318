use std::collections::BTreeMap;

use serde_json::Value as Json;

use super::{Backend, BackendError, Filters};
use crate::{
    ast::EntityKind,
    path::{self, BLDG_TEMPLATES, OBJECT_TEMPLATES, PHYSICAL, ROOM_TEMPLATES, STRAY},
    value::Object,
};

/// Hierarchy kept in memory, indexed by virtual path.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: BTreeMap<String, Object>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object as is, replacing any previous one.
    pub fn insert(&mut self, path: &str, object: Object) {
        self.objects.insert(path::clean(path), object);
    }

    pub fn objects(&self) -> &BTreeMap<String, Object> {
        &self.objects
    }

    fn subtree(&self, root: &str) -> Vec<String> {
        self.objects
            .keys()
            .filter(|p| path::is_under(p, root))
            .cloned()
            .collect()
    }

    /// Re-roots the subtree at `from` to `to`.
    fn move_subtree(&mut self, from: &str, to: &str) -> Result<(), BackendError> {
        if self.objects.contains_key(to) {
            return Err(BackendError::AlreadyExists(to.to_string()));
        }
        for old in self.subtree(from) {
            if let Some(object) = self.objects.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                self.objects.insert(new, object);
            }
        }
        Ok(())
    }

    fn parent_exists(&self, path: &str) -> bool {
        let parent = path::parent(path);
        path::is_namespace(&parent) || self.objects.contains_key(&parent)
    }
}

impl Backend for MemoryBackend {
    fn describe(&self) -> String {
        "in-memory hierarchy".to_string()
    }

    fn get_object(&mut self, path: &str) -> Result<Object, BackendError> {
        self.objects
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(path.to_string()))
    }

    fn get_children(
        &mut self,
        path: &str,
        filters: &Filters,
    ) -> Result<Vec<(String, Object)>, BackendError> {
        if !path::is_namespace(path) && !self.objects.contains_key(path) {
            return Err(BackendError::NotFound(path.to_string()));
        }
        Ok(self
            .objects
            .iter()
            .filter(|(p, _)| {
                let below = path::is_under(p, path) && p.as_str() != path;
                below && (filters.recursive || path::parent(p) == path)
            })
            .filter(|(_, object)| filters.matches(object))
            .map(|(p, object)| (p.clone(), object.clone()))
            .collect())
    }

    fn create_object(
        &mut self,
        path: &str,
        kind: EntityKind,
        mut payload: Object,
    ) -> Result<Object, BackendError> {
        if self.objects.contains_key(path) {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        if !self.parent_exists(path) {
            return Err(BackendError::NotFound(path::parent(path)));
        }
        payload
            .entry("name")
            .or_insert_with(|| Json::String(path::base_name(path).to_string()));
        payload.insert("category".into(), Json::String(kind.as_str().to_string()));
        self.objects.insert(path.to_string(), payload.clone());
        Ok(payload)
    }

    fn update_object(&mut self, path: &str, patch: Object) -> Result<Object, BackendError> {
        let object = self
            .objects
            .get_mut(path)
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
        // null values remove the key, at the top level or in attributes
        for (key, value) in patch {
            let merge =
                key == "attributes" && value.is_object() && object.get(&key).is_some_and(Json::is_object);
            if value.is_null() {
                object.remove(&key);
            } else if !merge {
                object.insert(key, value);
            } else if let (Some(Json::Object(current)), Json::Object(update)) =
                (object.get_mut(&key), value)
            {
                for (name, value) in update {
                    if value.is_null() {
                        current.remove(&name);
                    } else {
                        current.insert(name, value);
                    }
                }
            }
        }
        Ok(object.clone())
    }

    fn delete_object(&mut self, path: &str) -> Result<Vec<String>, BackendError> {
        let deleted = self.subtree(path);
        if deleted.is_empty() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        for p in &deleted {
            self.objects.remove(p);
        }
        Ok(deleted)
    }

    fn link_object(
        &mut self,
        source: &str,
        dest: &str,
        slot: Option<&str>,
    ) -> Result<(), BackendError> {
        if !path::is_under(source, STRAY) || !self.objects.contains_key(source) {
            return Err(BackendError::Invalid(format!(
                "{} is not a stray object",
                source
            )));
        }
        if !self.objects.contains_key(dest) {
            return Err(BackendError::NotFound(dest.to_string()));
        }
        let target = path::join(dest, path::base_name(source));
        self.move_subtree(source, &target)?;
        if let Some(slot) = slot {
            let mut patch = Object::new();
            patch.insert(
                "attributes".into(),
                serde_json::json!({ "slot": slot }),
            );
            self.update_object(&target, patch)?;
        }
        Ok(())
    }

    fn unlink_object(&mut self, source: &str, dest: Option<&str>) -> Result<(), BackendError> {
        if !path::is_under(source, PHYSICAL) || path::is_under(source, STRAY) {
            return Err(BackendError::Invalid(format!(
                "{} is not in the physical hierarchy",
                source
            )));
        }
        if !self.objects.contains_key(source) {
            return Err(BackendError::NotFound(source.to_string()));
        }
        let parent = dest.unwrap_or(STRAY);
        let target = path::join(parent, path::base_name(source));
        self.move_subtree(source, &target)
    }

    fn create_template(&mut self, template: Object) -> Result<(), BackendError> {
        let slug = template
            .get("slug")
            .and_then(Json::as_str)
            .ok_or_else(|| BackendError::Invalid("template has no slug".to_string()))?;
        let namespace = match template.get("category").and_then(Json::as_str) {
            Some("rack" | "device") => OBJECT_TEMPLATES,
            Some("room") => ROOM_TEMPLATES,
            Some("building" | "bldg") => BLDG_TEMPLATES,
            _ => {
                return Err(BackendError::Invalid(
                    "template category must be rack, device, room or building".to_string(),
                ));
            }
        };
        let target = path::join(namespace, slug);
        if self.objects.contains_key(&target) {
            return Err(BackendError::AlreadyExists(target));
        }
        self.objects.insert(target, template);
        Ok(())
    }
}
