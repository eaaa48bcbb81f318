pub mod ast;
pub mod backend;
pub mod cli;
#[cfg(feature = "cli")]
pub mod completer;
pub mod env;
pub mod evaluator;
pub mod format;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod path;
#[cfg(feature = "cli")]
pub mod repl;
pub mod script;
pub mod value;
pub mod viz;

pub use ast::{EntityKind, Node};
pub use env::Environment;
pub use evaluator::{EvalError, Session};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, parse};
pub use value::Value;
