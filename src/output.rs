//! What commands print.
//!
//! Commands never write to stdout directly: they go through an [`Output`],
//! which either prints or keeps the lines for the caller. Objects fetched
//! from the backend are rendered as indented JSON with sorted keys.
//!
//! # Examples
//!
//! ```
//! use ogree_cli::output::render;
//! use ogree_cli::Value;
//! use serde_json::json;
//!
//! let object = Value::from_json(&json!({"name": "R1", "category": "rack"}));
//! assert_eq!(
//!     render(&object),
//!     "{\n  \"category\": \"rack\",\n  \"name\": \"R1\"\n}"
//! );
//! ```

use crate::value::Value;

/// Destination of printed lines.
#[derive(Debug, Clone, Default)]
pub struct Output {
    captured: Option<Vec<String>>,
}

impl Output {
    pub fn stdout() -> Self {
        Output { captured: None }
    }

    /// Keeps lines in memory instead of printing them.
    pub fn captured() -> Self {
        Output {
            captured: Some(Vec::new()),
        }
    }

    pub fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        match &mut self.captured {
            Some(lines) => lines.push(text),
            None => println!("{}", text),
        }
    }

    pub fn lines(&self) -> &[String] {
        self.captured.as_deref().unwrap_or_default()
    }

    /// Empties the captured lines.
    pub fn take(&mut self) -> Vec<String> {
        self.captured.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

/// Text shown for a command result: JSON for objects, plain text otherwise.
pub fn render(value: &Value) -> String {
    match value {
        Value::Object(object) => {
            serde_json::to_string_pretty(object).unwrap_or_else(|_| value.to_string())
        }
        Value::List(items) => items.iter().map(render).collect::<Vec<_>>().join("\n"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_objects_render_with_sorted_keys() {
        let object = Value::from_json(&json!({"b": [1, 2], "a": {"d": null, "c": "x\"y"}}));
        assert_eq!(
            render(&object),
            "{\n  \"a\": {\n    \"c\": \"x\\\"y\",\n    \"d\": null\n  },\n  \"b\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn test_lists_render_one_item_per_line() {
        let list = Value::List(vec![Value::from("R1"), Value::Int(2)]);
        assert_eq!(render(&list), "R1\n2");
    }

    #[test]
    fn test_captured_lines() {
        let mut output = Output::captured();
        output.line("one");
        output.line(String::from("two"));
        assert_eq!(output.lines(), ["one", "two"]);
        assert_eq!(output.take().len(), 2);
        assert!(output.lines().is_empty());
    }
}
