use std::fmt;

use serde_json::{Map, Number};

/// An object as returned by the hierarchy backend.
pub type Object = Map<String, serde_json::Value>;

/// A runtime value of the command language.
///
/// Every expression and statement evaluates to a `Value`. Statements that
/// produce nothing evaluate to [`Value::Null`], which can never be stored in
/// a variable.
///
/// # Numbers
///
/// Integers and floats are kept apart: arithmetic on two integers stays an
/// integer except for `/`, which always yields a float.
///
/// # Examples
///
/// ```
/// use ogree_cli::Value;
///
/// let size = Value::Vector(vec![60.0, 120.0, 42.0]);
/// assert_eq!(size.to_string(), "[60 120 42]");
///
/// let name = Value::Str("rack01".to_string());
/// assert_eq!(name.type_name(), "string");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of statements that produce nothing
    Null,

    Bool(bool),

    Int(i64),

    Float(f64),

    Str(String),

    /// Array literal (`[1, 2.5]`), always made of floats
    Vector(Vec<f64>),

    /// Object fetched from the backend
    Object(Object),

    /// Several values, e.g. the objects matched by a wildcard `get`
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Vector(_) => "vector",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /// Values a variable may hold.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Str(_)
                | Value::Vector(_)
                | Value::Object(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Str(s) if s == "true" => Some(true),
            Value::Str(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    /// Numeric view of the value. Strings holding a number are accepted.
    pub fn as_num(&self) -> Option<Value> {
        match self {
            Value::Int(_) | Value::Float(_) => Some(self.clone()),
            Value::Str(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.as_num()? {
            Value::Int(n) => Some(n as f64),
            Value::Float(n) => Some(n),
            _ => None,
        }
    }

    /// Integer view; floats are accepted only when they hold a whole number.
    pub fn as_int(&self) -> Option<i64> {
        match self.as_num()? {
            Value::Int(n) => Some(n),
            Value::Float(n) if n.fract() == 0.0 => Some(n as i64),
            _ => None,
        }
    }

    /// Vector view. A string such as `[1,2,3]` is accepted.
    pub fn as_vector(&self) -> Option<Vec<f64>> {
        match self {
            Value::Vector(v) => Some(v.clone()),
            Value::List(items) => items.iter().map(Value::as_float).collect(),
            Value::Str(s) => {
                let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
                if inner.trim().is_empty() {
                    return Some(Vec::new());
                }
                inner
                    .split(',')
                    .map(|part| part.trim().parse::<f64>().ok())
                    .collect()
            }
            _ => None,
        }
    }

    /// Converts the value into JSON for the backend and the 3D peer.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::Number(Number::from(*n)),
            Value::Float(n) => float_to_json(*n),
            Value::Str(s) => Json::String(s.clone()),
            Value::Vector(v) => Json::Array(v.iter().map(|n| float_to_json(*n)).collect()),
            Value::Object(obj) => Json::Object(obj.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => {
                let floats: Option<Vec<f64>> = items.iter().map(|v| v.as_f64()).collect();
                match floats {
                    Some(v) if !items.is_empty() => Value::Vector(v),
                    _ => Value::List(items.iter().map(Value::from_json).collect()),
                }
            }
            Json::Object(obj) => Value::Object(obj.clone()),
        }
    }
}

fn float_to_json(n: f64) -> serde_json::Value {
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Parses an int or float literal, as the lexer would read it.
pub fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::Int(n));
    }
    if s.chars().any(|c| c.is_ascii_digit()) && !s.contains(['i', 'I', 'n', 'N']) {
        if let Ok(n) = s.parse::<f64>() {
            return Some(Value::Float(n));
        }
    }
    None
}

/// Formats a float without a trailing `.0` for whole numbers.
pub fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("<nil>"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => f.write_str(&format_float(*n)),
            Value::Str(s) => f.write_str(s),
            Value::Vector(v) => {
                let items: Vec<String> = v.iter().map(|n| format_float(*n)).collect();
                write!(f, "[{}]", items.join(" "))
            }
            Value::Object(obj) => {
                let json = serde_json::to_string(obj).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(" "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings_coerce() {
        assert_eq!(Value::from("5").as_num(), Some(Value::Int(5)));
        assert_eq!(Value::from("2.5").as_num(), Some(Value::Float(2.5)));
        assert_eq!(Value::from("rack").as_num(), None);
        assert_eq!(Value::from("inf").as_num(), None);
    }

    #[test]
    fn test_as_int_rejects_fractions() {
        assert_eq!(Value::Float(3.0).as_int(), Some(3));
        assert_eq!(Value::Float(3.5).as_int(), None);
    }

    #[test]
    fn test_vector_from_string() {
        assert_eq!(Value::from("[1, 2,3]").as_vector(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(Value::from("[1,x]").as_vector(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(7.0).to_string(), "7");
        assert_eq!(Value::Float(0.75).to_string(), "0.75");
        assert_eq!(Value::Vector(vec![1.0, 2.5]).to_string(), "[1 2.5]");
    }

    #[test]
    fn test_json_round_trip_of_object() {
        let json = serde_json::json!({"name": "R1", "attributes": {"height": 42}});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), json);
    }
}
