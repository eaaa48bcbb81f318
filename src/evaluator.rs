use std::{fmt, io};

use tracing::debug;

use crate::{
    ast::{ArithOp, CompareOp, EqualityOp, LogicOp, Node},
    backend::{Backend, BackendError},
    cli::CliError,
    env::{Environment, SettingError},
    format::{FormatError, sprintf},
    output::{Output, render},
    parser,
    path,
    script::ScriptError,
    value::Value,
    viz::{Viz, VizError},
};

mod commands;
mod create;
mod update;

/// Errors raised while executing a command.
#[derive(Debug)]
pub enum EvalError {
    UndefinedVariable(String),
    UndefinedFunction(String),

    /// Operand or argument of the wrong type
    Type(String),

    Index { len: usize, index: i64 },

    DivisionByZero,

    /// Path that does not designate a usable object
    InvalidPath(String),

    /// Any other runtime failure
    Runtime(String),

    Backend(BackendError),
    Viz(VizError),
    Format(FormatError),
    Setting(SettingError),
    Io(io::Error),
    Script(ScriptError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedVariable(name) => write!(f, "undefined variable {}", name),
            EvalError::UndefinedFunction(name) => write!(f, "undefined function {}", name),
            EvalError::Type(msg) | EvalError::InvalidPath(msg) | EvalError::Runtime(msg) => {
                write!(f, "{}", msg)
            }
            EvalError::Index { len, index } => write!(
                f,
                "Index out of range\nArray length : {}\nBut desired index at : {}",
                len, index
            ),
            EvalError::DivisionByZero => write!(f, "cannot divide by 0"),
            EvalError::Backend(e) => write!(f, "{}", e),
            EvalError::Viz(e) => write!(f, "{}", e),
            EvalError::Format(e) => write!(f, "{}", e),
            EvalError::Setting(e) => write!(f, "{}", e),
            EvalError::Io(e) => write!(f, "{}", e),
            EvalError::Script(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Backend(e) => Some(e),
            EvalError::Viz(e) => Some(e),
            EvalError::Format(e) => Some(e),
            EvalError::Setting(e) => Some(e),
            EvalError::Io(e) => Some(e),
            EvalError::Script(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for EvalError {
    fn from(e: BackendError) -> Self {
        EvalError::Backend(e)
    }
}

impl From<VizError> for EvalError {
    fn from(e: VizError) -> Self {
        EvalError::Viz(e)
    }
}

impl From<FormatError> for EvalError {
    fn from(e: FormatError) -> Self {
        EvalError::Format(e)
    }
}

impl From<SettingError> for EvalError {
    fn from(e: SettingError) -> Self {
        EvalError::Setting(e)
    }
}

impl From<io::Error> for EvalError {
    fn from(e: io::Error) -> Self {
        EvalError::Io(e)
    }
}

impl From<ScriptError> for EvalError {
    fn from(e: ScriptError) -> Self {
        EvalError::Script(e)
    }
}

pub type EvalResult = Result<Value, EvalError>;

fn type_error<T>(msg: impl Into<String>) -> Result<T, EvalError> {
    Err(EvalError::Type(msg.into()))
}

/// Everything a command can act on: the symbol table, the hierarchy
/// backend, the 3D peer and the output.
pub struct Session {
    pub env: Environment,
    pub backend: Box<dyn Backend>,
    pub viz: Box<dyn Viz>,
    pub output: Output,
    /// Set by `exit`
    pub exit_requested: bool,
    script_depth: usize,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>, viz: Box<dyn Viz>, output: Output) -> Self {
        Session {
            env: Environment::new(),
            backend,
            viz,
            output,
            exit_requested: false,
            script_depth: 0,
        }
    }

    /// Parses and executes one command line.
    pub fn run(&mut self, line: &str) -> Result<Value, CliError> {
        let node = parser::parse(line)?;
        debug!(?node, "executing");
        Ok(node.execute(self)?)
    }

    fn eval_string(&mut self, node: &Node) -> Result<String, EvalError> {
        match node.execute(self)? {
            Value::Str(s) => Ok(s),
            Value::Null => type_error("a value was expected"),
            other => Ok(other.to_string()),
        }
    }

    /// Text of a path node, before resolution.
    fn eval_raw_path(&mut self, node: &Node) -> Result<String, EvalError> {
        match node {
            Node::Path(inner) => self.eval_string(inner),
            other => self.eval_string(other),
        }
    }

    /// Absolute path designated by `node`; may be the `_` selection sentinel.
    pub fn eval_path(&mut self, node: &Node) -> Result<String, EvalError> {
        let raw = self.eval_raw_path(node)?;
        Ok(self.resolve(&raw))
    }

    fn resolve(&self, raw: &str) -> String {
        path::resolve(raw, &self.env.current_path, &self.env.previous_path)
    }

    /// Paths a command applies to, `_` standing for every selected object.
    fn eval_targets(&mut self, node: &Node) -> Result<Vec<String>, EvalError> {
        let target = self.eval_path(node)?;
        if target != path::SELECTION {
            return Ok(vec![target]);
        }
        if self.env.selection.is_empty() {
            return Err(EvalError::Runtime("no object selected".to_string()));
        }
        Ok(self.env.selection.clone())
    }

    /// A single target, the selection being accepted when it holds one object.
    fn eval_target(&mut self, node: &Node) -> Result<String, EvalError> {
        let mut targets = self.eval_targets(node)?;
        if targets.len() > 1 {
            return Err(EvalError::Runtime(
                "this command applies to a single object".to_string(),
            ));
        }
        Ok(targets.remove(0))
    }

    fn path_exists(&mut self, target: &str) -> Result<bool, EvalError> {
        if path::is_namespace(target) {
            return Ok(true);
        }
        Ok(self.backend.exists(target)?)
    }

    fn eval_bool(&mut self, node: &Node, what: &str) -> Result<bool, EvalError> {
        match node.execute(self)?.as_bool() {
            Some(b) => Ok(b),
            None => type_error(format!("{} should be a boolean", what)),
        }
    }

    fn eval_int(&mut self, node: &Node, what: &str) -> Result<i64, EvalError> {
        match node.execute(self)?.as_int() {
            Some(n) => Ok(n),
            None => type_error(format!("{} should be an integer", what)),
        }
    }

    fn eval_float(&mut self, node: &Node, what: &str) -> Result<f64, EvalError> {
        match node.execute(self)?.as_float() {
            Some(n) => Ok(n),
            None => type_error(format!("{} should be a number", what)),
        }
    }

    fn eval_vector(&mut self, node: &Node, what: &str, len: usize) -> Result<Vec<f64>, EvalError> {
        match node.execute(self)?.as_vector() {
            Some(v) if v.len() == len => Ok(v),
            _ => type_error(format!("{} should be a vector of {} numbers", what, len)),
        }
    }
}

impl Node {
    /// Executes the node against the session.
    ///
    /// Statements that produce nothing return [`Value::Null`]. The first
    /// error stops execution; changes made before it are kept.
    pub fn execute(&self, session: &mut Session) -> EvalResult {
        match self {
            Node::Nop => Ok(Value::Null),

            // Expressions
            Node::Literal(value) => Ok(value.clone()),
            Node::Symbol(name) => session
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Node::ArrayRef { name, index } => {
                let array = session
                    .env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))?;
                let index = session.eval_int(index, "index")?;
                array_index(&array, index)
            }
            Node::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.execute(session)?);
                }
                let floats: Option<Vec<f64>> = values.iter().map(Value::as_float).collect();
                Ok(match floats {
                    Some(v) => Value::Vector(v),
                    None => Value::List(values),
                })
            }
            Node::Format { template, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.execute(session)?);
                }
                Ok(Value::Str(sprintf(template, &values)?))
            }
            Node::Printf { format, args } => {
                let format = session.eval_string(format)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.execute(session)?);
                }
                Ok(Value::Str(sprintf(&format, &values)?))
            }
            Node::Path(_) => Ok(Value::Str(session.eval_path(self)?)),
            Node::Arith { op, left, right } => {
                let left = left.execute(session)?;
                let right = right.execute(session)?;
                arith(*op, &left, &right)
            }
            Node::Compare { op, left, right } => {
                let left = left.execute(session)?;
                let right = right.execute(session)?;
                compare(*op, &left, &right)
            }
            Node::Equality { op, left, right } => {
                let equal = values_equal(&left.execute(session)?, &right.execute(session)?);
                Ok(Value::Bool(match op {
                    EqualityOp::Equal => equal,
                    EqualityOp::NotEqual => !equal,
                }))
            }
            Node::Logic { op, left, right } => {
                let left = left.execute(session)?.as_bool();
                let right = right.execute(session)?.as_bool();
                let (Some(left), Some(right)) = (left, right) else {
                    return type_error("expected boolean values for logical operation");
                };
                Ok(Value::Bool(match op {
                    LogicOp::And => left && right,
                    LogicOp::Or => left || right,
                }))
            }
            Node::Negate(operand) => match operand.execute(session)?.as_num() {
                Some(Value::Int(n)) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::Runtime("integer overflow".to_string())),
                Some(Value::Float(n)) => Ok(Value::Float(-n)),
                _ => type_error("cannot negate non numeric value"),
            },
            Node::Not(operand) => match operand.execute(session)?.as_bool() {
                Some(b) => Ok(Value::Bool(!b)),
                None => type_error("cannot apply ! to a non boolean value"),
            },

            // Variables and aliases
            Node::Assign { name, value } => {
                let value = value.execute(session)?;
                if !value.is_assignable() {
                    return type_error(format!("Invalid type to assign variable {}", name));
                }
                session.env.set(name.clone(), value);
                Ok(Value::Null)
            }
            Node::FuncDef { name, body } => {
                session.env.define_alias(name.clone(), (**body).clone());
                Ok(Value::Null)
            }
            Node::FuncCall(name) => {
                let body = session
                    .env
                    .alias(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedFunction(name.clone()))?;
                body.execute(session)
            }
            Node::UnsetVar(name) => match session.env.remove(name) {
                Some(_) => Ok(Value::Null),
                None => Err(EvalError::UndefinedVariable(name.clone())),
            },
            Node::UnsetFunc(name) => match session.env.remove_alias(name) {
                Some(_) => Ok(Value::Null),
                None => Err(EvalError::UndefinedFunction(name.clone())),
            },
            Node::Len(name) => {
                let value = session
                    .env
                    .get(name)
                    .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))?;
                let len = match value {
                    Value::Vector(v) => v.len(),
                    Value::List(items) => items.len(),
                    _ => return type_error(format!("{} is not an array", name)),
                };
                let len = Value::Int(len as i64);
                session.output.line(len.to_string());
                Ok(len)
            }
            Node::Print(value) => {
                let value = value.execute(session)?;
                session.output.line(render(&value));
                Ok(Value::Null)
            }
            Node::Env => {
                let mut lines = Vec::new();
                for (name, value) in session.env.variables() {
                    lines.push(format!("{} = {}", name, value));
                }
                for (name, value) in session.env.settings.entries() {
                    lines.push(format!("{} : {}", name, value));
                }
                for line in lines {
                    session.output.line(line);
                }
                Ok(Value::Null)
            }
            Node::SetEnv { name, value } => {
                let value = value.execute(session)?;
                session.env.settings.set(name, &value)?;
                Ok(Value::Null)
            }

            // Control flow
            Node::Sequence(statements) => {
                let mut last = Value::Null;
                for statement in statements {
                    last = statement.execute(session)?;
                    if session.exit_requested {
                        break;
                    }
                }
                Ok(last)
            }
            Node::If {
                condition,
                body,
                otherwise,
            } => {
                if session.eval_bool(condition, "condition")? {
                    body.execute(session)
                } else if let Some(otherwise) = otherwise {
                    otherwise.execute(session)
                } else {
                    Ok(Value::Null)
                }
            }
            Node::While { condition, body } => {
                while session.eval_bool(condition, "condition")? {
                    body.execute(session)?;
                    if session.exit_requested {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            Node::For {
                init,
                condition,
                step,
                body,
            } => {
                init.execute(session)?;
                while session.eval_bool(condition, "condition")? {
                    body.execute(session)?;
                    if session.exit_requested {
                        break;
                    }
                    step.execute(session)?;
                }
                Ok(Value::Null)
            }
            Node::ForRange {
                var,
                start,
                end,
                body,
            } => {
                let start = session.eval_int(start, "range start")?;
                let end = session.eval_int(end, "range end")?;
                if start > end {
                    return Err(EvalError::Runtime(
                        "start index should be lower than end index".to_string(),
                    ));
                }
                for i in start..=end {
                    session.env.set(var.clone(), Value::Int(i));
                    body.execute(session)?;
                    if session.exit_requested {
                        break;
                    }
                }
                Ok(Value::Null)
            }
            Node::ForArray { var, array, body } => {
                let items = match array.execute(session)? {
                    Value::Vector(v) => v.into_iter().map(Value::Float).collect(),
                    Value::List(items) => items,
                    _ => return type_error("only an array can be iterated"),
                };
                for item in items {
                    session.env.set(var.clone(), item);
                    body.execute(session)?;
                    if session.exit_requested {
                        break;
                    }
                }
                Ok(Value::Null)
            }

            Node::Exit => {
                session.exit_requested = true;
                Ok(Value::Null)
            }

            other => other.execute_command(session),
        }
    }
}

fn array_index(array: &Value, index: i64) -> EvalResult {
    let len = match array {
        Value::Vector(v) => v.len(),
        Value::List(items) => items.len(),
        _ => return type_error("only an array can be indexed"),
    };
    let position = usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(EvalError::Index { len, index })?;
    Ok(match array {
        Value::Vector(v) => Value::Float(v[position]),
        Value::List(items) => items[position].clone(),
        _ => Value::Null,
    })
}

/// Applies an arithmetic operator.
///
/// Numeric strings are read as numbers. `+` with a non numeric string
/// concatenates.
pub fn arith(op: ArithOp, left: &Value, right: &Value) -> EvalResult {
    if let (Some(a), Some(b)) = (left.as_num(), right.as_num()) {
        return numeric(op, a, b);
    }
    let scalar = |v: &Value| matches!(v, Value::Str(_) | Value::Int(_) | Value::Float(_));
    let textual = matches!(left, Value::Str(_)) || matches!(right, Value::Str(_));
    if textual && scalar(left) && scalar(right) {
        return match op {
            ArithOp::Add => Ok(Value::Str(format!("{}{}", left, right))),
            _ => type_error("invalid operator for string operands"),
        };
    }
    type_error("invalid arithmetic operation attempted")
}

fn numeric(op: ArithOp, a: Value, b: Value) -> EvalResult {
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        let (x, y) = (*x, *y);
        let overflow = || EvalError::Runtime("integer overflow".to_string());
        return match op {
            ArithOp::Add => x.checked_add(y).map(Value::Int).ok_or_else(overflow),
            ArithOp::Sub => x.checked_sub(y).map(Value::Int).ok_or_else(overflow),
            ArithOp::Mul => x.checked_mul(y).map(Value::Int).ok_or_else(overflow),
            _ if y == 0 => Err(EvalError::DivisionByZero),
            ArithOp::Div => Ok(Value::Float(x as f64 / y as f64)),
            ArithOp::IntDiv => {
                let q = x.checked_div(y).ok_or_else(overflow)?;
                let floor = if x % y != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q };
                Ok(Value::Int(floor))
            }
            ArithOp::Mod => x.checked_rem(y).map(Value::Int).ok_or_else(overflow),
        };
    }

    let (Some(x), Some(y)) = (a.as_float(), b.as_float()) else {
        return type_error("invalid arithmetic operation attempted");
    };
    match op {
        ArithOp::Add => Ok(Value::Float(x + y)),
        ArithOp::Sub => Ok(Value::Float(x - y)),
        ArithOp::Mul => Ok(Value::Float(x * y)),
        ArithOp::Mod => type_error("invalid operator for float operands"),
        _ if y == 0.0 => Err(EvalError::DivisionByZero),
        ArithOp::Div => Ok(Value::Float(x / y)),
        ArithOp::IntDiv => Ok(Value::Int((x / y).floor() as i64)),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> EvalResult {
    let ordering = match (left.as_num(), right.as_num()) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => a.partial_cmp(&b),
        (Some(a), Some(b)) => a.as_float().zip(b.as_float()).and_then(|(a, b)| a.partial_cmp(&b)),
        _ => return type_error("cannot compare non numeric values"),
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        CompareOp::Less => ordering.is_lt(),
        CompareOp::LessEqual => ordering.is_le(),
        CompareOp::Greater => ordering.is_gt(),
        CompareOp::GreaterEqual => ordering.is_ge(),
    }))
}

/// Structural equality, ints and floats comparing by value.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => left == right,
    }
}
