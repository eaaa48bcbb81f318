use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::{ast::Node, value::Value};

const DEFAULT_DRAW_LIMIT: i64 = 50;

/// Errors raised when changing a runtime setting with `env name=value`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingError {
    #[error("unknown setting {0}, expected one of updates, drawLimit, drawable")]
    Unknown(String),
    #[error("{name} expects {expected}")]
    Invalid { name: String, expected: &'static str },
}

/// Runtime settings of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Maximum number of objects `draw` sends without `-f`
    pub draw_limit: i64,
    /// Whether updates are forwarded to the 3D peer
    pub updates: bool,
    /// Categories the 3D peer is asked to draw
    pub drawable: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            draw_limit: DEFAULT_DRAW_LIMIT,
            updates: true,
            drawable: [
                "site", "building", "room", "rack", "device", "ac", "panel", "cabinet", "corridor",
                "group",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Settings {
    pub fn set(&mut self, name: &str, value: &Value) -> Result<(), SettingError> {
        let invalid = |expected| SettingError::Invalid {
            name: name.to_string(),
            expected,
        };
        match name {
            "updates" => self.updates = value.as_bool().ok_or_else(|| invalid("a boolean"))?,
            "drawLimit" => {
                self.draw_limit = value
                    .as_int()
                    .filter(|n| *n >= 0)
                    .ok_or_else(|| invalid("a positive integer"))?
            }
            "drawable" => {
                self.drawable = match value {
                    Value::Str(s) => s
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect(),
                    Value::List(items) => items.iter().map(Value::to_string).collect(),
                    _ => return Err(invalid("a comma-separated list of categories")),
                }
            }
            _ => return Err(SettingError::Unknown(name.to_string())),
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("updates", self.updates.to_string()),
            ("drawLimit", self.draw_limit.to_string()),
            ("drawable", self.drawable.join(",")),
        ]
    }
}

/// Symbol table and navigation state of a session.
///
/// There is a single flat scope: loop variables and alias bodies read and
/// write the same variables as the top level.
#[derive(Debug, Clone)]
pub struct Environment {
    variables: BTreeMap<String, Value>,
    aliases: HashMap<String, Node>,
    pub current_path: String,
    pub previous_path: String,
    pub selection: Vec<String>,
    pub settings: Settings,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            variables: BTreeMap::new(),
            aliases: HashMap::new(),
            current_path: "/".to_string(),
            previous_path: "/".to_string(),
            selection: Vec::new(),
            settings: Settings::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Stores a variable, overwriting any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    /// Variables sorted by name.
    pub fn variables(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    pub fn alias(&self, name: &str) -> Option<&Node> {
        self.aliases.get(name)
    }

    pub fn define_alias(&mut self, name: impl Into<String>, body: Node) {
        self.aliases.insert(name.into(), body);
    }

    pub fn remove_alias(&mut self, name: &str) -> Option<Node> {
        self.aliases.remove(name)
    }

    pub fn alias_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Moves to `path`, remembering where we came from for `cd -`.
    pub fn change_dir(&mut self, path: String) {
        self.previous_path = std::mem::replace(&mut self.current_path, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_dir_keeps_previous() {
        let mut env = Environment::new();
        env.change_dir("/Physical".to_string());
        env.change_dir("/Logical".to_string());
        assert_eq!(env.current_path, "/Logical");
        assert_eq!(env.previous_path, "/Physical");
    }

    #[test]
    fn test_redefinition_overwrites() {
        let mut env = Environment::new();
        env.set("a", Value::Int(1));
        env.set("a", Value::Int(2));
        assert_eq!(env.get("a"), Some(&Value::Int(2)));
        assert_eq!(env.variables().count(), 1);
    }

    #[test]
    fn test_settings() {
        let mut settings = Settings::default();
        settings.set("drawLimit", &Value::Int(10)).unwrap();
        settings.set("updates", &Value::from("false")).unwrap();
        settings.set("drawable", &Value::from("rack, device")).unwrap();
        assert_eq!(settings.draw_limit, 10);
        assert!(!settings.updates);
        assert_eq!(settings.drawable, vec!["rack", "device"]);
        assert!(matches!(
            settings.set("drawLimit", &Value::Int(-1)),
            Err(SettingError::Invalid { .. })
        ));
        assert!(matches!(
            settings.set("colour", &Value::Int(1)),
            Err(SettingError::Unknown(_))
        ));
    }
}
