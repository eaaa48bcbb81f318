use serde_json::{Value as Json, json};

use super::{EvalError, EvalResult, Session, commands::viz_id, type_error};
use crate::{
    ast::{CreateCommand, EntityKind, Node},
    path::{self, BLDG_TEMPLATES, DOMAINS, OBJECT_TEMPLATES, ROOM_TEMPLATES, STRAY, TAGS},
    value::{Object, Value},
    viz::message,
};

const RACK_ROTATIONS: [(&str, [f64; 3]); 6] = [
    ("front", [0.0, 0.0, 180.0]),
    ("rear", [0.0, 0.0, 0.0]),
    ("left", [0.0, 90.0, 0.0]),
    ("right", [0.0, -90.0, 0.0]),
    ("top", [90.0, 0.0, 0.0]),
    ("bottom", [-90.0, 0.0, 0.0]),
];

const AXIS_ORIENTATIONS: [&str; 4] = ["+x+y", "+x-y", "-x-y", "-x+y"];
const FLOOR_UNITS: [&str; 3] = ["t", "m", "f"];
const DEVICE_SIDES: [&str; 4] = ["front", "rear", "frontflipped", "rearflipped"];
const TEMPERATURES: [&str; 2] = ["cold", "warm"];

pub(super) fn is_color(text: &str) -> bool {
    text.len() == 6 && text.chars().all(|c| c.is_ascii_hexdigit())
}

fn one_of(value: String, allowed: &[&str], what: &str) -> Result<String, EvalError> {
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        type_error(format!("{} should be one of {}", what, allowed.join(", ")))
    }
}

fn attributes(entries: Object) -> Object {
    let mut payload = Object::new();
    payload.insert("attributes".into(), Json::Object(entries));
    payload
}

/// Size given literally, or the name of a template.
enum SizeOrTemplate {
    Size(Vec<f64>),
    Template(String),
}

impl Session {
    pub(super) fn eval_color(&mut self, node: &Node) -> Result<String, EvalError> {
        let color = self.eval_string(node)?;
        if is_color(&color) {
            Ok(color)
        } else {
            type_error("Please provide a valid 6 length hex value for the color")
        }
    }

    /// Path given by `node`, taken relative to `namespace` unless absolute.
    fn path_in(&mut self, node: &Node, namespace: &str) -> Result<String, EvalError> {
        let raw = self.eval_raw_path(node)?;
        if raw.starts_with('/') {
            Ok(self.resolve(&raw))
        } else {
            Ok(path::join(namespace, &raw))
        }
    }

    /// Path of a sibling named relative to `parent`.
    fn sibling(&mut self, node: &Node, parent: &str) -> Result<String, EvalError> {
        let raw = self.eval_raw_path(node)?;
        let target = if raw.starts_with('/') {
            self.resolve(&raw)
        } else {
            path::join(parent, &raw)
        };
        if !self.path_exists(&target)? {
            return Err(EvalError::InvalidPath(format!("{} does not exist", target)));
        }
        Ok(target)
    }

    fn size_or_template(
        &mut self,
        node: &Node,
        namespace: &str,
    ) -> Result<SizeOrTemplate, EvalError> {
        let value = node.execute(self)?;
        match (value.as_vector(), value) {
            (Some(size), _) if size.len() == 3 => Ok(SizeOrTemplate::Size(size)),
            (None, Value::Str(name)) => {
                if !self.path_exists(&path::join(namespace, &name))? {
                    return Err(EvalError::Runtime(format!("template {} not found", name)));
                }
                Ok(SizeOrTemplate::Template(name))
            }
            _ => type_error("vector3 (size) or string (template) expected"),
        }
    }

    fn insert_size(&mut self, entries: &mut Object, node: &Node, namespace: &str) -> Result<(), EvalError> {
        match self.size_or_template(node, namespace)? {
            SizeOrTemplate::Size(size) => entries.insert("size".into(), json!(size)),
            SizeOrTemplate::Template(name) => entries.insert("template".into(), Json::String(name)),
        };
        Ok(())
    }

    fn rack_rotation(&mut self, node: &Node) -> Result<Vec<f64>, EvalError> {
        let value = node.execute(self)?;
        if let Value::Str(name) = &value {
            if let Some((_, rotation)) = RACK_ROTATIONS.iter().find(|(n, _)| n == name) {
                return Ok(rotation.to_vec());
            }
        }
        match value.as_vector() {
            Some(rotation) if rotation.len() == 3 => Ok(rotation),
            _ => type_error(
                "rotation should be a vector3, or one of front, rear, left, right, top, bottom",
            ),
        }
    }

    fn position(&mut self, node: &Node) -> Result<Vec<f64>, EvalError> {
        match node.execute(self)?.as_vector() {
            Some(position) if matches!(position.len(), 2 | 3) => Ok(position),
            _ => type_error("position should be a vector2 or a vector3"),
        }
    }

    pub(super) fn create(&mut self, command: &CreateCommand) -> EvalResult {
        let (target, kind, payload) = match command {
            CreateCommand::Domain { path, color } => {
                let target = self.path_in(path, DOMAINS)?;
                let color = self.eval_color(color)?;
                let mut entries = Object::new();
                entries.insert("color".into(), Json::String(color));
                (target, EntityKind::Domain, attributes(entries))
            }
            CreateCommand::Site { path } => {
                (self.eval_path(path)?, EntityKind::Site, attributes(Object::new()))
            }
            CreateCommand::Building {
                path,
                position,
                rotation,
                size_or_template,
            } => {
                let target = self.eval_path(path)?;
                let mut entries = Object::new();
                entries.insert("posXY".into(), json!(self.eval_vector(position, "posXY", 2)?));
                entries.insert("rotation".into(), json!(self.eval_float(rotation, "rotation")?));
                self.insert_size(&mut entries, size_or_template, BLDG_TEMPLATES)?;
                (target, EntityKind::Building, attributes(entries))
            }
            CreateCommand::Room {
                path,
                position,
                rotation,
                size_or_template,
                axis_orientation,
                floor_unit,
            } => {
                let target = self.eval_path(path)?;
                let mut entries = Object::new();
                entries.insert("posXY".into(), json!(self.eval_vector(position, "posXY", 2)?));
                entries.insert("rotation".into(), json!(self.eval_float(rotation, "rotation")?));
                self.insert_size(&mut entries, size_or_template, ROOM_TEMPLATES)?;
                if let Some(axis) = axis_orientation {
                    let axis = self.eval_string(axis)?;
                    let axis = one_of(axis, &AXIS_ORIENTATIONS, "axisOrientation")?;
                    entries.insert("axisOrientation".into(), Json::String(axis));
                }
                if let Some(unit) = floor_unit {
                    let unit = self.eval_string(unit)?;
                    let unit = one_of(unit, &FLOOR_UNITS, "floorUnit")?;
                    entries.insert("floorUnit".into(), Json::String(unit));
                }
                (target, EntityKind::Room, attributes(entries))
            }
            CreateCommand::Rack {
                path,
                position,
                rotation,
                size_or_template,
            } => {
                let target = self.eval_path(path)?;
                let mut entries = Object::new();
                entries.insert("posXYZ".into(), json!(self.position(position)?));
                entries.insert("rotation".into(), json!(self.rack_rotation(rotation)?));
                self.insert_size(&mut entries, size_or_template, OBJECT_TEMPLATES)?;
                (target, EntityKind::Rack, attributes(entries))
            }
            CreateCommand::Device {
                path,
                pos_u_or_slot,
                size_u_or_template,
                side,
            } => {
                let target = self.eval_path(path)?;
                let mut entries = Object::new();
                let pos = pos_u_or_slot.execute(self)?;
                match pos.as_int() {
                    Some(u) => entries.insert("posU".into(), json!(u)),
                    None => {
                        let slots: Vec<String> =
                            pos.to_string().split(',').map(|s| s.trim().to_string()).collect();
                        entries.insert("slot".into(), json!(slots))
                    }
                };
                let size = size_u_or_template.execute(self)?;
                match size.as_int() {
                    Some(size_u) => {
                        entries.insert("sizeU".into(), json!(size_u));
                    }
                    None => {
                        let name = size.to_string();
                        if !self.path_exists(&path::join(OBJECT_TEMPLATES, &name))? {
                            return Err(EvalError::Runtime(format!("template {} not found", name)));
                        }
                        entries.insert("template".into(), Json::String(name));
                    }
                }
                if let Some(side) = side {
                    let side = self.eval_string(side)?;
                    let side = one_of(side, &DEVICE_SIDES, "side")?;
                    entries.insert("orientation".into(), Json::String(side));
                }
                (target, EntityKind::Device, attributes(entries))
            }
            CreateCommand::Group { path, children } => {
                let target = self.eval_path(path)?;
                let parent = path::parent(&target);
                let mut content = Vec::with_capacity(children.len());
                for child in children {
                    let child = self.sibling(child, &parent)?;
                    content.push(path::base_name(&child).to_string());
                }
                let mut entries = Object::new();
                entries.insert("content".into(), Json::String(content.join(",")));
                (target, EntityKind::Group, attributes(entries))
            }
            CreateCommand::Corridor {
                path,
                left_rack,
                right_rack,
                temperature,
            } => {
                let target = self.eval_path(path)?;
                let parent = path::parent(&target);
                let left = self.sibling(left_rack, &parent)?;
                let right = self.sibling(right_rack, &parent)?;
                let temperature = self.eval_string(temperature)?;
                let temperature = one_of(temperature, &TEMPERATURES, "temperature")?;
                let mut entries = Object::new();
                entries.insert(
                    "content".into(),
                    Json::String(format!("{},{}", path::base_name(&left), path::base_name(&right))),
                );
                entries.insert("temperature".into(), Json::String(temperature));
                (target, EntityKind::Corridor, attributes(entries))
            }
            CreateCommand::Tag { slug, color } => {
                let slug = self.eval_string(slug)?;
                let color = self.eval_color(color)?;
                let mut payload = Object::new();
                payload.insert("slug".into(), Json::String(slug.clone()));
                payload.insert("color".into(), Json::String(color));
                payload.insert("description".into(), Json::String(slug.clone()));
                (path::join(TAGS, &slug), EntityKind::Tag, payload)
            }
            CreateCommand::Orphan { path, template } => {
                let target = self.path_in(path, STRAY)?;
                let template = self.eval_string(template)?;
                if !self.path_exists(&path::join(OBJECT_TEMPLATES, &template))? {
                    return Err(EvalError::Runtime(format!("template {} not found", template)));
                }
                let mut entries = Object::new();
                entries.insert("template".into(), Json::String(template));
                (target, EntityKind::Stray, attributes(entries))
            }
        };

        let created = self.backend.create_object(&target, kind, payload)?;
        if self.is_drawable(&created) {
            let mut object = created.clone();
            object.insert("id".into(), Json::String(viz_id(&target)));
            self.notify(message::create(Json::Object(object)));
        }
        self.output.line(format!("{} successfully created", target));
        Ok(Value::Object(created))
    }
}
