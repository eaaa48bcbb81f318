use std::{cmp::Ordering, fs, path::Path};

use serde_json::Value as Json;
use tracing::{info, warn};

use super::{EvalError, EvalResult, Session, type_error};
use crate::{
    ast::{CameraCommand, EntityKind, LsArgs, Node, UiCommand},
    backend::{Filters, attribute, wildcard_match},
    cli::docs,
    output::render,
    path::{
        self, BLDG_TEMPLATES, LOGICAL, OBJECT_TEMPLATES, ORGANISATION, PHYSICAL, ROOM_TEMPLATES,
        STRAY, TAGS,
    },
    script,
    value::{Object, Value},
    viz::{VizError, message},
};

/// Collections whose objects `cp` can duplicate.
const COPYABLE: [&str; 4] = [TAGS, OBJECT_TEMPLATES, ROOM_TEMPLATES, BLDG_TEMPLATES];

/// Nested `.cmds:` calls allowed before giving up.
const MAX_SCRIPT_DEPTH: usize = 16;

/// Id of an object for the 3D peer.
pub(super) fn viz_id(target: &str) -> String {
    path::object_id(target, STRAY)
        .or_else(|| path::object_id(target, PHYSICAL))
        .unwrap_or_else(|| path::base_name(target).to_string())
}

fn namespace_object(namespace: &str) -> Object {
    let mut object = Object::new();
    object.insert("name".into(), Json::String(path::base_name(namespace).to_string()));
    object.insert("category".into(), Json::String("namespace".to_string()));
    object
}

/// Attribute values compared as numbers when both are numeric, objects
/// lacking the attribute last.
fn compare_attributes(a: Option<String>, b: Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.cmp(&b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn relative_name<'a>(child: &'a str, root: &str) -> &'a str {
    child
        .strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(child)
}

fn number_attribute(object: &Object, key: &str) -> Option<f64> {
    attribute(object, key).and_then(|v| v.trim_matches('"').parse::<f64>().ok())
}

impl Session {
    /// Children of `target`, the well-known namespaces included.
    pub(super) fn list_children(
        &mut self,
        target: &str,
        filters: &Filters,
    ) -> Result<Vec<(String, Object)>, EvalError> {
        let mut entries = Vec::new();
        if filters.category.is_none() && filters.attributes.is_empty() {
            for namespace in path::NAMESPACES {
                if namespace != "/" && path::parent(namespace) == target {
                    entries.push((namespace.to_string(), namespace_object(namespace)));
                }
            }
        }
        if !matches!(target, "/" | LOGICAL | ORGANISATION) {
            entries.extend(self.backend.get_children(target, filters)?);
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Sends a live update when updates are enabled and a peer listens.
    pub(super) fn notify(&mut self, message: Json) {
        if !self.env.settings.updates || !self.viz.is_connected() {
            return;
        }
        if let Err(e) = self.viz.send(&message) {
            warn!(error = %e, "cannot forward update to OGrEE-3D");
        }
    }

    pub(super) fn require_viz(&self) -> Result<(), EvalError> {
        if self.viz.is_connected() {
            Ok(())
        } else {
            Err(VizError::NotConnected.into())
        }
    }

    pub(super) fn is_drawable(&self, object: &Object) -> bool {
        object
            .get("category")
            .and_then(Json::as_str)
            .is_some_and(|c| self.env.settings.drawable.iter().any(|d| d == c))
    }

    fn change_dir(&mut self, target: String) -> EvalResult {
        let target = if target == path::SELECTION {
            match self.env.selection.as_slice() {
                [only] => only.clone(),
                _ => {
                    return Err(EvalError::InvalidPath(
                        "cannot cd into a selection of several objects".to_string(),
                    ));
                }
            }
        } else {
            target
        };
        if !self.path_exists(&target)? {
            return Err(EvalError::InvalidPath(format!("{} does not exist", target)));
        }
        self.env.change_dir(target);
        Ok(Value::Null)
    }

    fn ls(&mut self, args: &LsArgs) -> EvalResult {
        let target = self.eval_target(&args.path)?;
        let mut filters = Filters {
            category: args.category,
            attributes: Vec::new(),
            recursive: args.recursive,
        };
        for (key, value) in &args.filters {
            let value = self.eval_string(value)?;
            if key == "category" {
                let Some(kind) = EntityKind::from_category(&value) else {
                    return type_error(format!("unknown category {}", value));
                };
                filters.category = Some(kind);
            } else {
                filters.attributes.push((key.clone(), value));
            }
        }

        let mut entries = self.list_children(&target, &filters)?;
        if let Some(sort) = &args.sort {
            entries.sort_by(|a, b| compare_attributes(attribute(&a.1, sort), attribute(&b.1, sort)));
        }

        let mut names = Vec::with_capacity(entries.len());
        for (child, object) in &entries {
            let name = relative_name(child, &target);
            let mut line = name.to_string();
            for attr in &args.attrs {
                let value = attribute(object, attr).unwrap_or_else(|| "-".to_string());
                line.push_str(&format!("    {}: {}", attr, value));
            }
            self.output.line(line);
            names.push(Value::Str(name.to_string()));
        }
        Ok(Value::List(names))
    }

    fn tree_lines(
        &mut self,
        target: &str,
        depth: i64,
        prefix: &str,
        lines: &mut Vec<String>,
    ) -> Result<(), EvalError> {
        if depth <= 0 {
            return Ok(());
        }
        let children = self.list_children(target, &Filters::default())?;
        let count = children.len();
        for (i, (child, _)) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            lines.push(format!("{}{}{}", prefix, connector, path::base_name(&child)));
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            self.tree_lines(&child, depth - 1, &next, lines)?;
        }
        Ok(())
    }

    fn get(&mut self, node: &Node) -> EvalResult {
        let target = self.eval_path(node)?;
        let pattern = path::base_name(&target).to_string();
        let targets = if target == path::SELECTION {
            self.eval_targets(node)?
        } else if pattern.contains('*') {
            self.wildcard_targets(&target)?
        } else {
            let object = self.backend.get_object(&target)?;
            let value = Value::Object(object);
            self.output.line(render(&value));
            return Ok(value);
        };

        let mut objects = Vec::with_capacity(targets.len());
        for target in targets {
            let value = Value::Object(self.backend.get_object(&target)?);
            self.output.line(render(&value));
            objects.push(value);
        }
        Ok(Value::List(objects))
    }

    /// Siblings whose name matches the `*` pattern ending `target`.
    pub(super) fn wildcard_targets(&mut self, target: &str) -> Result<Vec<String>, EvalError> {
        let pattern = path::base_name(target);
        let matched: Vec<String> = self
            .list_children(&path::parent(target), &Filters::default())?
            .into_iter()
            .map(|(child, _)| child)
            .filter(|child| wildcard_match(pattern, path::base_name(child)))
            .collect();
        if matched.is_empty() {
            return Err(EvalError::InvalidPath(format!("no object matches {}", target)));
        }
        Ok(matched)
    }

    fn devices_of(&mut self, rack: &str) -> Result<Vec<(String, Object)>, EvalError> {
        let filters = Filters {
            category: Some(EntityKind::Device),
            ..Filters::default()
        };
        self.list_children(rack, &filters)
    }

    fn found_device(&mut self, device: Option<(String, Object)>, missing: String) -> EvalResult {
        match device {
            Some((child, object)) => {
                self.output.line(path::base_name(&child));
                Ok(Value::Object(object))
            }
            None => {
                self.output.line(missing);
                Ok(Value::Null)
            }
        }
    }

    fn getu(&mut self, rack: &Node, u: &Node) -> EvalResult {
        let rack = self.eval_target(rack)?;
        let u = self.eval_int(u, "U")?;
        if u < 0 {
            return type_error("The U value must be positive");
        }
        let u = u as f64;
        let device = self.devices_of(&rack)?.into_iter().find(|(_, object)| {
            match (number_attribute(object, "posU"), number_attribute(object, "sizeU")) {
                (Some(pos), Some(size)) => pos <= u && u < pos + size.max(1.0),
                (Some(pos), None) => pos == u,
                _ => false,
            }
        });
        self.found_device(device, format!("no device at U{} in {}", u, rack))
    }

    fn getslot(&mut self, rack: &Node, slot: &Node) -> EvalResult {
        let rack = self.eval_target(rack)?;
        let slot = self.eval_string(slot)?;
        let device = self.devices_of(&rack)?.into_iter().find(|(_, object)| {
            let slots = object
                .get("attributes")
                .and_then(|a| a.get("slot"))
                .cloned()
                .unwrap_or(Json::Null);
            match slots {
                Json::String(s) => s == slot,
                Json::Array(items) => items.iter().any(|i| i.as_str() == Some(slot.as_str())),
                _ => false,
            }
        });
        self.found_device(device, format!("no device in slot {} of {}", slot, rack))
    }

    fn select(&mut self, targets: Vec<String>) -> EvalResult {
        for target in &targets {
            if !self.path_exists(target)? {
                return Err(EvalError::InvalidPath(format!("{} does not exist", target)));
            }
        }
        if let [only] = targets.as_slice() {
            self.env.change_dir(only.clone());
        }
        self.env.selection = targets.clone();
        self.output.line(format!("Selection made : {}", targets.join(", ")));
        Ok(Value::List(targets.into_iter().map(Value::Str).collect()))
    }

    fn delete(&mut self, target: &str) -> Result<Vec<String>, EvalError> {
        let deleted = self.backend.delete_object(target)?;
        self.env.selection.retain(|s| !path::is_under(s, target));
        if path::is_under(&self.env.current_path, target) {
            self.env.current_path = path::parent(target);
        }
        self.notify(message::delete(&viz_id(target)));
        for d in &deleted {
            self.output.line(format!("{} deleted", d));
        }
        Ok(deleted)
    }

    fn draw(&mut self, node: &Node, depth: Option<&Node>, force: bool) -> EvalResult {
        self.require_viz()?;
        let depth = match depth {
            Some(depth) => self.eval_int(depth, "depth")?,
            None => 0,
        };
        let mut objects = Vec::new();
        for target in self.eval_targets(node)? {
            objects.push((target.clone(), self.backend.get_object(&target)?));
            if depth > 0 {
                let filters = Filters {
                    recursive: true,
                    ..Filters::default()
                };
                for (child, object) in self.backend.get_children(&target, &filters)? {
                    let level = relative_name(&child, &target).split('/').count() as i64;
                    if level <= depth {
                        objects.push((child, object));
                    }
                }
            }
        }
        objects.retain(|(_, object)| self.is_drawable(object));

        let limit = self.env.settings.draw_limit;
        if !force && objects.len() as i64 > limit {
            return Err(EvalError::Runtime(format!(
                "{} objects to draw, above the limit of {}; use draw -f to draw them anyway",
                objects.len(),
                limit
            )));
        }
        for (target, mut object) in objects {
            object
                .entry("id")
                .or_insert_with(|| Json::String(viz_id(&target)));
            self.viz.send(&message::create(Json::Object(object)))?;
        }
        Ok(Value::Null)
    }

    fn ui(&mut self, command: &UiCommand) -> EvalResult {
        self.require_viz()?;
        let message = match command {
            UiCommand::Delay(delay) => {
                let delay = self.eval_float(delay, "delay")?;
                message::ui("delay", Json::from(delay))
            }
            UiCommand::Toggle { feature, enable } => {
                let enable = self.eval_bool(enable, feature)?;
                message::ui(feature, Json::Bool(enable))
            }
            UiCommand::Highlight(node) => {
                let target = self.eval_target(node)?;
                if !self.path_exists(&target)? {
                    return Err(EvalError::InvalidPath(format!("{} does not exist", target)));
                }
                message::ui("highlight", Json::String(viz_id(&target)))
            }
            UiCommand::ClearCache => message::ui("clearcache", Json::String(String::new())),
        };
        self.viz.send(&message)?;
        Ok(Value::Null)
    }

    fn camera(&mut self, command: &CameraCommand) -> EvalResult {
        self.require_viz()?;
        let message = match command {
            CameraCommand::Move {
                command,
                position,
                rotation,
            } => {
                let position = self.eval_vector(position, "position", 3)?;
                let rotation = self.eval_vector(rotation, "rotation", 2)?;
                message::camera(
                    command,
                    [position[0], position[1], position[2]],
                    [rotation[0], rotation[1]],
                )
            }
            CameraCommand::Wait(delay) => {
                let delay = self.eval_float(delay, "delay")?;
                message::camera("wait", [0.0; 3], [delay, 0.0])
            }
        };
        self.viz.send(&message)?;
        Ok(Value::Null)
    }

    fn load_script(&mut self, file: &Node) -> EvalResult {
        let file = self.eval_string(file)?;
        if self.script_depth >= MAX_SCRIPT_DEPTH {
            return Err(EvalError::Runtime(format!(
                "cannot load {}: too many nested scripts",
                file
            )));
        }
        info!(file = %file, "loading script");
        self.script_depth += 1;
        let result = script::run_file(self, Path::new(&file));
        self.script_depth -= 1;
        result?;
        Ok(Value::Null)
    }

    fn dry_run(&mut self, file: &Node) -> EvalResult {
        let file = self.eval_string(file)?;
        let errors = script::check_file(Path::new(&file))?;
        info!(file = %file, errors = errors.len(), "script checked");
        self.output.line("####################");
        self.output.line(format!("Errors found: {}", errors.len()));
        for (i, (number, text, error)) in errors.iter().enumerate() {
            self.output.line(format!("# Error {}", i));
            self.output.line(format!("  LINE#: {}\tCOMMAND:{}", number, text));
            self.output.line(format!("  Error : {}", error.message));
        }
        Ok(Value::Null)
    }

    fn copy(&mut self, source: &Node, dest: &Node) -> EvalResult {
        let source = self.eval_target(source)?;
        let dest = self.eval_string(dest)?;
        let collection = path::parent(&source);
        if !COPYABLE.contains(&collection.as_str()) {
            return Err(EvalError::Runtime(format!(
                "{} cannot be copied, only tags and templates can",
                source
            )));
        }
        let target = if dest.contains('/') {
            self.resolve(&dest)
        } else {
            path::join(&collection, &dest)
        };
        if path::parent(&target) != collection {
            return Err(EvalError::InvalidPath(format!(
                "a copy of {} must stay in {}",
                source, collection
            )));
        }

        let mut object = self.backend.get_object(&source)?;
        for key in ["id", "name", "createdDate", "lastUpdated"] {
            object.remove(key);
        }
        object.insert(
            "slug".into(),
            Json::String(path::base_name(&target).to_string()),
        );
        if collection == TAGS {
            self.backend.create_object(&target, EntityKind::Tag, object)?;
        } else {
            self.backend.create_template(object)?;
        }
        self.output.line(format!("{} copied to {}", source, target));
        Ok(Value::Null)
    }

    fn load_template(&mut self, file: &Node) -> EvalResult {
        let file = self.eval_string(file)?;
        let text = fs::read_to_string(&file)?;
        let template = match serde_json::from_str::<Json>(&text) {
            Ok(Json::Object(template)) => template,
            Ok(_) => return type_error(format!("{} does not hold a JSON object", file)),
            Err(e) => return type_error(format!("invalid template {}: {}", file, e)),
        };
        self.backend.create_template(template)?;
        self.output.line(format!("Template {} loaded", file));
        Ok(Value::Null)
    }
}

impl Node {
    /// Commands acting on the hierarchy, the 3D peer or the session.
    pub(super) fn execute_command(&self, session: &mut Session) -> EvalResult {
        match self {
            Node::Cd(node) => {
                let target = session.eval_path(node)?;
                session.change_dir(target)
            }
            Node::Pwd => {
                let current = session.env.current_path.clone();
                session.output.line(current.clone());
                Ok(Value::Str(current))
            }
            Node::Ls(args) => session.ls(args),
            Node::Tree { path: node, depth } => {
                let target = session.eval_target(node)?;
                let depth = match depth {
                    Some(depth) => session.eval_int(depth, "depth")?,
                    None => 1,
                };
                let mut lines = vec![target.clone()];
                session.tree_lines(&target, depth, "", &mut lines)?;
                for line in lines {
                    session.output.line(line);
                }
                Ok(Value::Null)
            }
            Node::Get(node) => session.get(node),
            Node::GetU { path: rack, u } => session.getu(rack, u),
            Node::GetSlot { path: rack, slot } => session.getslot(rack, slot),

            Node::Select(None) => {
                session.env.selection.clear();
                session.output.line("Selection cleared");
                Ok(Value::Null)
            }
            Node::Select(Some(node)) => {
                let targets = session.eval_targets(node)?;
                session.select(targets)
            }
            Node::SelectChildren(nodes) => {
                let mut targets = Vec::with_capacity(nodes.len());
                for node in nodes {
                    targets.push(session.eval_path(node)?);
                }
                session.select(targets)
            }
            Node::PrintSelection => {
                let selection = session.env.selection.clone();
                if selection.is_empty() {
                    session.output.line("Empty selection");
                }
                for target in &selection {
                    session.output.line(target.clone());
                }
                Ok(Value::List(selection.into_iter().map(Value::Str).collect()))
            }

            Node::Create(command) => session.create(command),
            Node::Update {
                path: node,
                attr,
                values,
                sharp,
            } => session.update(node, attr, values, *sharp),
            Node::UnsetAttr {
                path: node,
                attr,
                index,
            } => session.unset_attribute(node, attr, index.as_deref()),
            Node::Delete(node) => {
                let mut deleted = Vec::new();
                for target in session.eval_targets(node)? {
                    deleted.extend(session.delete(&target)?);
                }
                Ok(Value::List(deleted.into_iter().map(Value::Str).collect()))
            }
            Node::DeleteSelection => {
                let selection = std::mem::take(&mut session.env.selection);
                if selection.is_empty() {
                    return Err(EvalError::Runtime("no object selected".to_string()));
                }
                let mut deleted = Vec::new();
                for target in selection {
                    deleted.extend(session.delete(&target)?);
                }
                Ok(Value::List(deleted.into_iter().map(Value::Str).collect()))
            }
            Node::Link { source, dest, slot } => {
                let source = session.eval_target(source)?;
                let dest = session.eval_target(dest)?;
                let slot = match slot {
                    Some(slot) => Some(session.eval_string(slot)?),
                    None => None,
                };
                session
                    .backend
                    .link_object(&source, &dest, slot.as_deref())?;
                session.output.line(format!("{} linked to {}", source, dest));
                Ok(Value::Null)
            }
            Node::Unlink { source, dest } => {
                let source = session.eval_target(source)?;
                let dest = match dest {
                    Some(dest) => Some(session.eval_target(dest)?),
                    None => None,
                };
                session.backend.unlink_object(&source, dest.as_deref())?;
                session.notify(message::delete(&viz_id(&source)));
                session.output.line(format!("{} unlinked", source));
                Ok(Value::Null)
            }

            Node::Draw { path: node, depth, force } => session.draw(node, depth.as_deref(), *force),
            Node::Undraw(node) => {
                session.require_viz()?;
                let ids: Vec<String> = match node {
                    Some(node) => session.eval_targets(node)?.iter().map(|t| viz_id(t)).collect(),
                    None => vec![String::new()],
                };
                for id in ids {
                    session.viz.send(&message::delete(&id))?;
                }
                Ok(Value::Null)
            }
            Node::Drawable { path: node, attr } => {
                let target = session.eval_target(node)?;
                let object = session.backend.get_object(&target)?;
                let drawable = session.is_drawable(&object)
                    && attr.as_ref().is_none_or(|attr| attribute(&object, attr).is_some());
                session.output.line(drawable.to_string());
                Ok(Value::Bool(drawable))
            }
            Node::Ui(command) => session.ui(command),
            Node::Camera(command) => session.camera(command),
            Node::Focus(node) => {
                session.require_viz()?;
                let Some(node) = node else {
                    session.viz.send(&message::focus(""))?;
                    return Ok(Value::Null);
                };
                let target = session.eval_target(node)?;
                if !session.path_exists(&target)? {
                    return Err(EvalError::InvalidPath(format!("{} does not exist", target)));
                }
                session.viz.send(&message::focus(&viz_id(&target)))?;
                session.env.change_dir(target);
                Ok(Value::Null)
            }
            Node::Connect3D(url) => {
                let url = match url {
                    Some(url) => session.eval_string(url)?,
                    None => session.viz.describe(),
                };
                session.viz.connect(&url)?;
                session.output.line(format!("Connected to OGrEE-3D at {}", url));
                Ok(Value::Null)
            }
            Node::Disconnect3D => {
                session.viz.disconnect();
                session.output.line("Disconnected from OGrEE-3D");
                Ok(Value::Null)
            }

            Node::LoadScript(file) => session.load_script(file),
            Node::DryRun(file) => session.dry_run(file),
            Node::Copy { source, dest } => session.copy(source, dest),
            Node::LoadTemplate(file) => session.load_template(file),
            Node::Man(topic) => {
                let page = match topic {
                    Some(topic) => docs::get_manual_page(topic)
                        .map_err(|e| EvalError::Runtime(e.to_string()))?,
                    None => docs::get_manual_overview(),
                };
                session.output.line(page.trim_end());
                Ok(Value::Null)
            }
            Node::Lsog => {
                let lines = [
                    format!("API URL : {}", session.backend.describe()),
                    format!("OGrEE-3D URL : {}", session.viz.describe()),
                    format!("OGrEE-3D connected : {}", session.viz.is_connected()),
                ];
                for line in lines {
                    session.output.line(line);
                }
                Ok(Value::Null)
            }
            Node::Clear => {
                session.output.line("\x1b[2J\x1b[H");
                Ok(Value::Null)
            }

            other => Err(EvalError::Runtime(format!("{:?} cannot be executed", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viz_id() {
        assert_eq!(viz_id("/Physical/S/B/R"), "S.B.R");
        assert_eq!(viz_id("/Physical/Stray/dev"), "dev");
        assert_eq!(viz_id("/Logical/Tags/red"), "red");
    }

    #[test]
    fn test_compare_attributes() {
        let s = |v: &str| Some(v.to_string());
        assert_eq!(compare_attributes(s("9"), s("10")), Ordering::Less);
        assert_eq!(compare_attributes(s("b"), s("a")), Ordering::Greater);
        assert_eq!(compare_attributes(None, s("a")), Ordering::Greater);
    }
}
