use std::time::Duration;

use serde_json::{Value as Json, json};
use tracing::debug;
use ureq::{Agent, AgentBuilder};

use super::{Backend, BackendError, Filters};
use crate::{
    ast::EntityKind,
    path::{self, BLDG_TEMPLATES, DOMAINS, GROUPS, OBJECT_TEMPLATES, PHYSICAL, ROOM_TEMPLATES, STRAY, TAGS},
    value::Object,
};

/// Client of the hierarchy REST API.
pub struct HttpBackend {
    agent: Agent,
    base_url: String,
    token: String,
}

/// Collections addressed by a dotted id, longest namespace first.
const COLLECTIONS: [(&str, &str); 8] = [
    (STRAY, "stray_objects"),
    (OBJECT_TEMPLATES, "obj_templates"),
    (ROOM_TEMPLATES, "room_templates"),
    (BLDG_TEMPLATES, "bldg_templates"),
    (GROUPS, "groups"),
    (TAGS, "tags"),
    (DOMAINS, "domains"),
    (PHYSICAL, "hierarchy_objects"),
];

impl HttpBackend {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Self {
        HttpBackend {
            agent: AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Collection and dotted id of the object at `path`.
    fn locate(&self, path: &str) -> Result<(&'static str, String), BackendError> {
        for (namespace, collection) in COLLECTIONS {
            if let Some(id) = path::object_id(path, namespace) {
                return Ok((collection, id));
            }
        }
        Err(BackendError::Unsupported(path.to_string()))
    }

    fn collection_of(path: &str) -> Option<&'static str> {
        COLLECTIONS
            .iter()
            .find(|(namespace, _)| *namespace == path)
            .map(|(_, collection)| *collection)
    }

    fn request(&self, method: &str, endpoint: &str, body: Option<&Json>) -> Result<Json, BackendError> {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        debug!(method, url = %url, "backend request");
        let request = self
            .agent
            .request(method, &url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Content-Type", "application/json");
        let response = match body {
            Some(body) => request.send_string(&body.to_string()),
            None => request.call(),
        };
        match response {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|e| BackendError::Transport(e.to_string()))?;
                if text.trim().is_empty() {
                    return Ok(Json::Null);
                }
                Ok(serde_json::from_str(&text)?)
            }
            Err(ureq::Error::Status(status, response)) => {
                let message = response
                    .into_string()
                    .ok()
                    .and_then(|text| serde_json::from_str::<Json>(&text).ok())
                    .and_then(|body| body.get("message").and_then(Json::as_str).map(str::to_string))
                    .unwrap_or_else(|| format!("API responded with status {}", status));
                debug!(status, message = %message, "backend error");
                Err(BackendError::Api { status, message })
            }
            Err(e) => Err(BackendError::Transport(e.to_string())),
        }
    }

    fn not_found(path: &str, error: BackendError) -> BackendError {
        match error {
            BackendError::Api { status: 404, .. } => BackendError::NotFound(path.to_string()),
            other => other,
        }
    }
}

/// The `data` member of a response envelope.
fn data(body: Json) -> Result<Json, BackendError> {
    match body {
        Json::Object(mut envelope) => envelope
            .remove("data")
            .ok_or_else(|| BackendError::Decode("missing data".to_string())),
        _ => Err(BackendError::Decode("expected an object".to_string())),
    }
}

fn into_object(value: Json) -> Result<Object, BackendError> {
    match value {
        Json::Object(object) => Ok(object),
        _ => Err(BackendError::Decode("expected an object".to_string())),
    }
}

/// Flattens the nested `children` of an object fetched with `/all`.
fn collect_children(parent: &str, object: &Object, filters: &Filters, out: &mut Vec<(String, Object)>) {
    let Some(Json::Array(children)) = object.get("children") else {
        return;
    };
    for child in children {
        let Some(child) = child.as_object() else {
            continue;
        };
        let Some(name) = child.get("name").and_then(Json::as_str) else {
            continue;
        };
        let child_path = path::join(parent, name);
        if filters.recursive {
            collect_children(&child_path, child, filters, out);
        }
        if filters.matches(child) {
            let mut child = child.clone();
            child.remove("children");
            out.push((child_path, child));
        }
    }
}

impl Backend for HttpBackend {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn get_object(&mut self, path: &str) -> Result<Object, BackendError> {
        let (collection, id) = self.locate(path)?;
        let body = self
            .request("GET", &format!("{}/{}", collection, id), None)
            .map_err(|e| Self::not_found(path, e))?;
        into_object(data(body)?)
    }

    fn get_children(
        &mut self,
        path: &str,
        filters: &Filters,
    ) -> Result<Vec<(String, Object)>, BackendError> {
        let mut children = Vec::new();

        // a whole collection
        if let Some(collection) = Self::collection_of(path) {
            let endpoint = match collection {
                "hierarchy_objects" => "sites".to_string(),
                other => other.to_string(),
            };
            let body = self.request("GET", &endpoint, None)?;
            let objects = data(body)?
                .get("objects")
                .cloned()
                .unwrap_or(Json::Array(Vec::new()));
            let Json::Array(objects) = objects else {
                return Err(BackendError::Decode("expected a list of objects".to_string()));
            };
            for object in objects {
                let object = into_object(object)?;
                let key = object
                    .get("slug")
                    .or_else(|| object.get("name"))
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string();
                let child_path = path::join(path, &key);
                if filters.recursive {
                    collect_children(&child_path, &object, filters, &mut children);
                }
                if filters.matches(&object) {
                    children.push((child_path, object));
                }
            }
            return Ok(children);
        }

        let (collection, id) = self.locate(path)?;
        let limit = if filters.recursive { 999 } else { 1 };
        let body = self
            .request("GET", &format!("{}/{}/all?limit={}", collection, id, limit), None)
            .map_err(|e| Self::not_found(path, e))?;
        let object = into_object(data(body)?)?;
        collect_children(path, &object, filters, &mut children);
        Ok(children)
    }

    fn create_object(
        &mut self,
        path: &str,
        kind: EntityKind,
        mut payload: Object,
    ) -> Result<Object, BackendError> {
        payload
            .entry("name")
            .or_insert_with(|| Json::String(path::base_name(path).to_string()));
        payload.insert("category".into(), Json::String(kind.as_str().to_string()));
        let parent = path::parent(path);
        if !path::is_namespace(&parent) {
            let (_, parent_id) = self.locate(&parent)?;
            payload.insert("parentId".into(), Json::String(parent_id));
        }
        let collection = match kind {
            EntityKind::Stray => "stray_objects".to_string(),
            EntityKind::ObjectTemplate => "obj_templates".to_string(),
            EntityKind::RoomTemplate => "room_templates".to_string(),
            EntityKind::BldgTemplate => "bldg_templates".to_string(),
            EntityKind::AirConditioner => "acs".to_string(),
            other => format!("{}s", other.as_str()),
        };
        let body = self.request("POST", &collection, Some(&Json::Object(payload)))?;
        into_object(data(body)?)
    }

    fn update_object(&mut self, path: &str, patch: Object) -> Result<Object, BackendError> {
        let (collection, id) = self.locate(path)?;
        let body = self
            .request("PATCH", &format!("{}/{}", collection, id), Some(&Json::Object(patch)))
            .map_err(|e| Self::not_found(path, e))?;
        into_object(data(body)?)
    }

    fn delete_object(&mut self, path: &str) -> Result<Vec<String>, BackendError> {
        let (collection, id) = self.locate(path)?;
        self.request("DELETE", &format!("{}/{}", collection, id), None)
            .map_err(|e| Self::not_found(path, e))?;
        Ok(vec![path.to_string()])
    }

    fn link_object(
        &mut self,
        source: &str,
        dest: &str,
        slot: Option<&str>,
    ) -> Result<(), BackendError> {
        let (collection, id) = self.locate(source)?;
        if collection != "stray_objects" {
            return Err(BackendError::Invalid(format!("{} is not a stray object", source)));
        }
        let (_, parent_id) = self.locate(dest)?;
        let mut body = json!({ "parentId": parent_id });
        if let Some(slot) = slot {
            body["slot"] = Json::String(slot.to_string());
        }
        self.request("PATCH", &format!("{}/{}/link", collection, id), Some(&body))
            .map_err(|e| Self::not_found(source, e))?;
        Ok(())
    }

    fn unlink_object(&mut self, source: &str, dest: Option<&str>) -> Result<(), BackendError> {
        let (collection, id) = self.locate(source)?;
        if collection != "hierarchy_objects" {
            return Err(BackendError::Invalid(format!(
                "{} is not in the physical hierarchy",
                source
            )));
        }
        let body = match dest {
            Some(dest) => json!({ "parentId": self.locate(dest)?.1 }),
            None => json!({}),
        };
        self.request("PATCH", &format!("{}/{}/unlink", collection, id), Some(&body))
            .map_err(|e| Self::not_found(source, e))?;
        Ok(())
    }

    fn create_template(&mut self, template: Object) -> Result<(), BackendError> {
        let collection = match template.get("category").and_then(Json::as_str) {
            Some("rack" | "device") => "obj_templates",
            Some("room") => "room_templates",
            Some("building" | "bldg") => "bldg_templates",
            _ => {
                return Err(BackendError::Invalid(
                    "template category must be rack, device, room or building".to_string(),
                ));
            }
        };
        self.request("POST", collection, Some(&Json::Object(template)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new("http://localhost:3001/", "", Duration::from_millis(10))
    }

    #[test]
    fn test_locate() {
        let backend = backend();
        assert_eq!(
            backend.locate("/Physical/S/B").unwrap(),
            ("hierarchy_objects", "S.B".to_string())
        );
        assert_eq!(
            backend.locate("/Physical/Stray/dev").unwrap(),
            ("stray_objects", "dev".to_string())
        );
        assert_eq!(
            backend.locate("/Logical/ObjectTemplates/t1").unwrap(),
            ("obj_templates", "t1".to_string())
        );
        assert!(matches!(
            backend.locate("/Logical"),
            Err(BackendError::Unsupported(_))
        ));
    }

    #[test]
    fn test_collect_children_recursive() {
        let object: Object = serde_json::from_value(json!({
            "name": "S",
            "children": [
                {"name": "B", "category": "building", "children": [
                    {"name": "R", "category": "room"}
                ]}
            ]
        }))
        .unwrap();
        let filters = Filters {
            recursive: true,
            ..Filters::default()
        };
        let mut out = Vec::new();
        collect_children("/Physical/S", &object, &filters, &mut out);
        let paths: Vec<&str> = out.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["/Physical/S/B/R", "/Physical/S/B"]);
        assert!(!out[1].1.contains_key("children"));
    }
}
