use serde_json::{Value as Json, json};

use super::{EvalError, EvalResult, Session, commands::viz_id, create::is_color, type_error};
use crate::{
    ast::Node,
    backend::{Filters, attribute},
    path::{self, TAGS},
    value::{Object, Value},
    viz::message,
};

/// Boolean display toggles forwarded to the 3D peer.
const INTERACT_TOGGLES: [&str; 7] = [
    "displayContent",
    "alpha",
    "tilesName",
    "tilesColor",
    "U",
    "slots",
    "localCS",
];

const TOP_LEVEL: [&str; 3] = ["description", "domain", "tags"];

const AREA_SIDES: [&str; 4] = ["top", "bottom", "right", "left"];

const FONT_HELP: &str = "The font can only be bold or italic or be in the form of color@[colorValue]";

fn patch(key: &str, value: Json) -> Object {
    let mut patch = Object::new();
    patch.insert(key.to_string(), value);
    patch
}

fn attribute_patch(key: &str, value: Json) -> Object {
    patch("attributes", json!({ key: value }))
}

/// A named map kept in the attributes, stored either as an object or as
/// its JSON text.
fn named_map(object: &Object, key: &str) -> Object {
    match object.get("attributes").and_then(|a| a.get(key)) {
        Some(Json::Object(map)) => map.clone(),
        Some(Json::String(text)) => serde_json::from_str(text).unwrap_or_default(),
        _ => Object::new(),
    }
}

fn single<'a>(values: &'a [Value], attr: &str) -> Result<&'a Value, EvalError> {
    match values {
        [value] => Ok(value),
        _ => type_error(format!("a single value is expected to update {}", attr)),
    }
}

fn text(value: &Value) -> String {
    value.to_string()
}

fn vector(value: &Value, what: &str, len: usize) -> Result<Vec<f64>, EvalError> {
    match value.as_vector() {
        Some(v) if v.len() == len => Ok(v),
        _ => type_error(format!("{} should be a vector of {} numbers", what, len)),
    }
}

fn areas(values: &[Value]) -> Result<Object, EvalError> {
    let [reserved, technical] = values else {
        return type_error("2 values (reserved, technical) expected to set room areas");
    };
    let mut entries = Object::new();
    for (name, value) in [("reserved", reserved), ("technical", technical)] {
        let sides = vector(value, name, 4)?;
        let map: Object = AREA_SIDES
            .iter()
            .zip(sides)
            .map(|(side, n)| (side.to_string(), json!(n)))
            .collect();
        entries.insert(name.to_string(), Json::Object(map));
    }
    Ok(patch("attributes", Json::Object(entries)))
}

impl Session {
    fn send_interact(&mut self, target: &str, param: &str, value: Json) -> Result<(), EvalError> {
        self.require_viz()?;
        self.viz
            .send(&message::interact(&viz_id(target), param, value))?;
        Ok(())
    }

    fn add_named(
        &mut self,
        target: &str,
        key: &str,
        name: String,
        entry: Json,
    ) -> Result<Object, EvalError> {
        let object = self.backend.get_object(target)?;
        let mut map = named_map(&object, key);
        if map.insert(name.clone(), entry).is_some() {
            self.output.line(format!("{} {} replaced", key, name));
        }
        Ok(attribute_patch(key, Json::Object(map)))
    }

    fn remove_named(&mut self, target: &str, key: &str, name: &str) -> Result<Object, EvalError> {
        let object = self.backend.get_object(target)?;
        let mut map = named_map(&object, key);
        if map.remove(name).is_none() {
            return Err(EvalError::Runtime(format!(
                "{} {} does not exist in {}",
                key, name, target
            )));
        }
        Ok(attribute_patch(key, Json::Object(map)))
    }

    fn update_tags(&mut self, target: &str, slug: String, add: bool) -> Result<Object, EvalError> {
        let object = self.backend.get_object(target)?;
        let mut tags: Vec<Json> = object
            .get("tags")
            .and_then(Json::as_array)
            .cloned()
            .unwrap_or_default();
        let present = tags.iter().any(|t| t.as_str() == Some(slug.as_str()));
        if add {
            if !self.path_exists(&path::join(TAGS, &slug))? {
                return Err(EvalError::InvalidPath(format!("tag {} does not exist", slug)));
            }
            if !present {
                tags.push(Json::String(slug));
            }
        } else {
            if !present {
                return Err(EvalError::Runtime(format!("{} is not tagged {}", target, slug)));
            }
            tags.retain(|t| t.as_str() != Some(slug.as_str()));
        }
        Ok(patch("tags", Json::Array(tags)))
    }

    /// Builds the patch for one target, `None` when the update only talks
    /// to the 3D peer.
    fn update_patch(
        &mut self,
        target: &str,
        attr: &str,
        values: &[Value],
        sharp: bool,
    ) -> Result<Option<Object>, EvalError> {
        if path::is_under(target, TAGS) {
            return match attr {
                "slug" | "description" => Ok(Some(patch(attr, single(values, attr)?.to_json()))),
                "color" => {
                    let color = text(single(values, attr)?);
                    if !is_color(&color) {
                        return type_error("Please provide a valid 6 length hex value for the color");
                    }
                    Ok(Some(patch(attr, Json::String(color))))
                }
                _ => type_error("only slug, color and description can be set on a tag"),
            };
        }

        let patch = match attr {
            "tags" | "separators" | "pillars" => {
                return type_error(format!(
                    "{} cannot be set directly, use {}+ and {}-",
                    attr, attr, attr
                ));
            }
            "areas" => areas(values)?,
            "separators+" => {
                let [name, start, end, kind] = values else {
                    return type_error(
                        "4 values (name, startPos, endPos, type) expected to add a separator",
                    );
                };
                let entry = json!({
                    "startPosXYm": vector(start, "startPos", 2)?,
                    "endPosXYm": vector(end, "endPos", 2)?,
                    "type": text(kind),
                });
                self.add_named(target, "separators", text(name), entry)?
            }
            "pillars+" => {
                let [name, center, size, rotation] = values else {
                    return type_error(
                        "4 values (name, centerXY, sizeXY, rotation) expected to add a pillar",
                    );
                };
                let Some(rotation) = rotation.as_float() else {
                    return type_error("rotation should be a number");
                };
                let entry = json!({
                    "centerXY": vector(center, "centerXY", 2)?,
                    "sizeXY": vector(size, "sizeXY", 2)?,
                    "rotation": rotation,
                });
                self.add_named(target, "pillars", text(name), entry)?
            }
            "separators-" => {
                let name = text(single(values, attr)?);
                self.remove_named(target, "separators", &name)?
            }
            "pillars-" => {
                let name = text(single(values, attr)?);
                self.remove_named(target, "pillars", &name)?
            }
            "label" => {
                let value = text(single(values, attr)?);
                let label = if sharp {
                    let object = self.backend.get_object(target)?;
                    attribute(&object, &value).ok_or_else(|| {
                        EvalError::Runtime(format!("{} has no attribute {}", target, value))
                    })?
                } else {
                    value
                };
                self.send_interact(target, "label", Json::String(label))?;
                return Ok(None);
            }
            "labelFont" => {
                let font = match values {
                    [style] if matches!(text(style).as_str(), "bold" | "italic") => text(style),
                    [kind, color] if text(kind) == "color" => {
                        let color = text(color);
                        if !is_color(&color) {
                            return type_error(
                                "Please provide a valid 6 length hex value for the color",
                            );
                        }
                        format!("color@{}", color)
                    }
                    _ => return type_error(FONT_HELP),
                };
                self.send_interact(target, "labelFont", Json::String(font))?;
                return Ok(None);
            }
            "labelBackground" => {
                let color = text(single(values, attr)?);
                if !is_color(&color) {
                    return type_error("Please provide a valid 6 length hex value for the color");
                }
                self.send_interact(target, "labelBackground", Json::String(color))?;
                return Ok(None);
            }
            toggle if INTERACT_TOGGLES.contains(&toggle) => {
                let Some(enable) = single(values, attr)?.as_bool() else {
                    return type_error(format!("{} should be a boolean", attr));
                };
                self.send_interact(target, attr, Json::Bool(enable))?;
                return Ok(None);
            }
            "tags+" => {
                let slug = text(single(values, attr)?);
                self.update_tags(target, slug, true)?
            }
            "tags-" => {
                let slug = text(single(values, attr)?);
                self.update_tags(target, slug, false)?
            }
            "description" => patch(attr, Json::String(text(single(values, attr)?))),
            "domain" => {
                let (domain, recursive) = match values {
                    [domain] => (text(domain), false),
                    [domain, recursive] => match recursive.as_bool() {
                        Some(recursive) => (text(domain), recursive),
                        None => {
                            return type_error("the recursive flag of domain should be a boolean");
                        }
                    },
                    _ => return type_error("domain expects a name and an optional recursive flag"),
                };
                let domain = Json::String(domain);
                if recursive {
                    let filters = Filters {
                        recursive: true,
                        ..Filters::default()
                    };
                    for (child, _) in self.backend.get_children(target, &filters)? {
                        self.backend.update_object(&child, patch("domain", domain.clone()))?;
                    }
                }
                patch("domain", domain)
            }
            _ => attribute_patch(attr, single(values, attr)?.to_json()),
        };
        Ok(Some(patch))
    }

    pub(super) fn update(
        &mut self,
        node: &Node,
        attr: &str,
        values: &[Node],
        sharp: bool,
    ) -> EvalResult {
        let mut evaluated = Vec::with_capacity(values.len());
        for value in values {
            evaluated.push(value.execute(self)?);
        }
        let targets = self.eval_targets(node)?;
        let targets = match targets.as_slice() {
            [only] if path::base_name(only).contains('*') => self.wildcard_targets(only)?,
            _ => targets,
        };

        let mut updated = Vec::new();
        for target in targets {
            let Some(patch) = self.update_patch(&target, attr, &evaluated, sharp)? else {
                continue;
            };
            let mut object = self.backend.update_object(&target, patch)?;
            if self.is_drawable(&object) {
                let mut sent = object.clone();
                sent.insert("id".into(), Json::String(viz_id(&target)));
                self.notify(message::modify(Json::Object(sent)));
            }
            object.remove("children");
            updated.push(Value::Object(object));
        }
        Ok(match updated.len() {
            1 => updated.remove(0),
            0 => Value::Null,
            _ => Value::List(updated),
        })
    }

    pub(super) fn unset_attribute(
        &mut self,
        node: &Node,
        attr: &str,
        index: Option<&Node>,
    ) -> EvalResult {
        let top_level = TOP_LEVEL.contains(&attr);
        for target in self.eval_targets(node)? {
            let patch = match index {
                None if top_level => patch(attr, Json::Null),
                None => attribute_patch(attr, Json::Null),
                Some(index) => {
                    let index = self.eval_int(index, "index")?;
                    let object = self.backend.get_object(&target)?;
                    let current = if top_level {
                        object.get(attr)
                    } else {
                        object.get("attributes").and_then(|a| a.get(attr))
                    };
                    let mut items = match current.map(Value::from_json) {
                        Some(Value::Vector(v)) => v.into_iter().map(Json::from).collect::<Vec<_>>(),
                        Some(Value::List(items)) => items.iter().map(Value::to_json).collect(),
                        _ => return type_error(format!("{} is not a vector", attr)),
                    };
                    let len = items.len();
                    if index < 0 || index as usize >= len {
                        return Err(EvalError::Index { len, index });
                    }
                    items.remove(index as usize);
                    if top_level {
                        patch(attr, Json::Array(items))
                    } else {
                        attribute_patch(attr, Json::Array(items))
                    }
                }
            };
            let object = self.backend.update_object(&target, patch)?;
            if self.is_drawable(&object) {
                let mut sent = object;
                sent.insert("id".into(), Json::String(viz_id(&target)));
                self.notify(message::modify(Json::Object(sent)));
            }
        }
        Ok(Value::Null)
    }
}
