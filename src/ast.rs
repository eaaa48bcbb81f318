//! # OGrEE Command Language - Abstract Syntax Tree
//!
//! This module defines the tokens and the syntax tree of the command language
//! used to explore and edit a datacenter digital twin: a hierarchy of sites,
//! buildings, rooms, racks and devices, plus logical objects such as groups,
//! tags and templates.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[operators]** - Arithmetic, comparison, equality and logical operators
//! - **[node]** - The [`Node`] sum type, one variant per syntactic form
//! - **[statements]** - Payloads of the larger commands (creation, `ls`, UI)
//!
//! ## Quick Start
//!
//! ```text
//! cd /P/SITE/BLDG/ROOM
//! +rack:R1@[1,2]@front@[60,120,42]
//! R1:color=ff0000
//! ```
//!
//! ## Core Concepts
//!
//! ### Paths
//!
//! Objects are addressed by slash-separated virtual paths. Relative paths are
//! resolved against the current path, `..` goes up one level, `-` is the
//! previous path and `_` the current selection. The first segment may be
//! abbreviated: `P` for `Physical`, `L` for `Logical`, `O` for
//! `Organisation`.
//!
//! ### Values and variables
//!
//! Arguments are unquoted text by default. `$name` and `${name}` insert a
//! variable, `$((expr))` an evaluated expression:
//!
//! ```text
//! .var:n=3
//! +rack:R$(($n+1))@[0,0]@front@[60,120,42]
//! ```
//!
//! ### Control flow
//!
//! ```text
//! for i in 1..4 { +rack:R$i@[$i,0]@front@[60,120,42] }
//! while $n > 0 { .var:n=$n-1 }
//! if $n == 0 { print done } elif $n < 0 { print negative } else { print more }
//! alias reset { cd /; = }
//! ```
//!
//! Statements are separated with `;` and a `//` starts a comment.
pub mod node;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use node::Node;
pub use operators::{ArithOp, BinOp, CompareOp, EqualityOp, LogicOp};
pub use statements::{CameraCommand, CreateCommand, EntityKind, LsArgs, UiCommand};
pub use tokens::{Literal, Token, TokenKind};
