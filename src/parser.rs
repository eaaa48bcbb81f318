use std::fmt;

use crate::{
    ast::{BinOp, Literal, Node, Token, TokenKind},
    lexer::{Lexer, is_alphanumeric},
    value::Value,
};

mod commands;

pub(crate) use commands::KEYWORDS;

pub type PResult<T> = Result<T, ParseError>;

/// A syntax error, with the offset of the offending character and the
/// named parse routines that were active when it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Offset in characters
    pub position: usize,
    pub trail: Vec<String>,
    pub input: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.input)?;
        writeln!(f, "{}^", " ".repeat(self.position))?;
        if !self.trail.is_empty() {
            writeln!(f, "parsing stack : {}", self.trail.join(" -> "))?;
        }
        write!(f, "Error : {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Which lexing function reads a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Unquoted,
    Quoted,
    Path,
}

/// Parses one command line.
///
/// A `//` comment is stripped first. Statements joined by `;` give a
/// [`Node::Sequence`] only when there are at least two of them.
///
/// # Examples
///
/// ```
/// use ogree_cli::parser::parse;
/// use ogree_cli::ast::Node;
///
/// let node = parse("cd /P/site // go to the site").unwrap();
/// assert!(matches!(node, Node::Cd(_)));
///
/// let node = parse(".var:a=1; .var:a=2").unwrap();
/// assert!(matches!(node, Node::Sequence(ref s) if s.len() == 2));
/// ```
pub fn parse(text: &str) -> PResult<Node> {
    Parser::new(strip_comment(text)).parse()
}

/// Parses a standalone expression, e.g. `${r} + 1`.
pub fn parse_expression(text: &str) -> PResult<Node> {
    let mut parser = Parser::new(strip_comment(text));
    let node = parser.parse_expr("")?;
    if !parser.lexer.is_at_end() {
        return parser.error("unexpected character");
    }
    Ok(node)
}

pub fn strip_comment(text: &str) -> &str {
    match text.find("//") {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Recursive-descent parser over a single command line.
///
/// Each parse routine runs inside [`Parser::traced`], which records a named
/// frame of the parsing stack; optional constructs save the cursor and move
/// back to it when they do not match.
pub struct Parser {
    lexer: Lexer,
    input: String,
    /// Names of the active parse routines, empty for anonymous ones
    trail: Vec<String>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Parser {
            lexer: Lexer::new(input),
            input: input.to_string(),
            trail: Vec::new(),
        }
    }

    pub fn parse(&mut self) -> PResult<Node> {
        let node = self.parse_command("")?;
        if !self.command_end() {
            return self.error("unexpected character");
        }
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Cursor, trail and errors
    // ------------------------------------------------------------------

    fn pos(&self) -> usize {
        self.lexer.position()
    }

    fn seek(&mut self, position: usize) {
        self.lexer.set_position(position);
    }

    fn traced<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let depth = self.trail.len();
        self.trail.push(name.to_string());
        let result = f(self);
        self.trail.truncate(depth);
        result
    }

    fn error<T>(&self, message: impl Into<String>) -> PResult<T> {
        Err(ParseError {
            message: message.into(),
            position: self.pos(),
            trail: self
                .trail
                .iter()
                .filter(|name| !name.is_empty())
                .cloned()
                .collect(),
            input: self.input.clone(),
        })
    }

    fn error_at<T>(&mut self, position: usize, message: impl Into<String>) -> PResult<T> {
        self.seek(position);
        self.error(message)
    }

    // ------------------------------------------------------------------
    // Low-level matching
    // ------------------------------------------------------------------

    fn skip_whitespace(&mut self) {
        self.lexer.skip_whitespace();
    }

    /// Skips whitespace and tells whether the command ends here.
    fn command_end(&mut self) -> bool {
        self.skip_whitespace();
        match self.lexer.current_char() {
            None => true,
            Some(c) => ";})".contains(c),
        }
    }

    /// Like [`Parser::command_end`], `@` also ends a value.
    fn value_end(&mut self) -> bool {
        self.command_end() || self.lexer.current_char() == Some('@')
    }

    fn peek_is(&self, word: &str) -> bool {
        self.lexer.starts_with(word)
    }

    /// Consumes `word` if the input continues with it.
    fn parse_exact(&mut self, word: &str) -> bool {
        if self.lexer.starts_with(word) {
            self.lexer.advance_by(word.chars().count());
            true
        } else {
            false
        }
    }

    fn expect(&mut self, word: &str) -> PResult<()> {
        if self.parse_exact(word) {
            Ok(())
        } else {
            self.error(format!("{} expected", word))
        }
    }

    /// Longest candidate that is a prefix of the input.
    ///
    /// A keyword ending with a letter or digit must not run into another
    /// identifier character, so `lsx` is not `ls`.
    fn parse_keyword(&mut self, candidates: &[&str]) -> Option<String> {
        let start = self.pos();
        let mut end = start;
        while end < self.lexer.len() {
            let prefix = self.lexer.slice(start, end + 1);
            if !candidates.iter().any(|c| c.starts_with(prefix.as_str())) {
                break;
            }
            end += 1;
        }
        let word = self.lexer.slice(start, end);
        if !candidates.contains(&word.as_str()) {
            return None;
        }
        self.seek(end);
        let ends_with_identifier = word.chars().last().is_some_and(is_alphanumeric);
        if ends_with_identifier && self.lexer.current_char().is_some_and(is_alphanumeric) {
            self.seek(start);
            return None;
        }
        Some(word)
    }

    /// Letters, digits and underscores, surrounded by optional whitespace.
    fn parse_simple_word(&mut self, name: &str) -> PResult<String> {
        self.traced(name, |p| {
            p.skip_whitespace();
            let start = p.pos();
            while p.lexer.current_char().is_some_and(is_alphanumeric) {
                p.lexer.advance();
            }
            let word = p.lexer.slice(start, p.pos());
            p.skip_whitespace();
            Ok(word)
        })
    }

    /// Like a simple word, `-` and `+` are allowed too (`separators+`).
    fn parse_complex_word(&mut self, name: &str) -> PResult<String> {
        self.traced(name, |p| {
            p.skip_whitespace();
            let start = p.pos();
            while p
                .lexer
                .current_char()
                .is_some_and(|c| is_alphanumeric(c) || c == '-' || c == '+')
            {
                p.lexer.advance();
            }
            let word = p.lexer.slice(start, p.pos());
            p.skip_whitespace();
            Ok(word)
        })
    }

    // ------------------------------------------------------------------
    // Text, paths and values
    // ------------------------------------------------------------------

    fn next_text_token(&mut self, mode: TextMode) -> Token {
        match mode {
            TextMode::Unquoted => self.lexer.next_unquoted_token(),
            TextMode::Quoted => self.lexer.next_quoted_token(),
            TextMode::Path => self.lexer.next_path_token(),
        }
    }

    /// Reads text in the given mode. Interpolations turn it into a
    /// [`Node::Format`], plain text stays a string literal.
    fn parse_text(&mut self, mode: TextMode, trim: bool) -> PResult<Node> {
        self.traced("", |p| {
            let mut plain = String::new();
            let mut template = String::new();
            let mut args = Vec::new();
            loop {
                let token = p.next_text_token(mode);
                match token.kind {
                    TokenKind::Text => {
                        plain.push_str(&token.text);
                        template.push_str(&token.text.replace('%', "%%"));
                    }
                    TokenKind::Deref => {
                        let Some(Literal::Name(name)) = token.value else {
                            return p.error_at(token.start, "identifier expected");
                        };
                        template.push_str("%v");
                        args.push(Node::Symbol(name));
                    }
                    TokenKind::LeftEval => {
                        template.push_str("%v");
                        args.push(p.parse_expr("")?);
                        p.expect("))")?;
                    }
                    TokenKind::Eof => break,
                    _ => return p.error_at(token.start, "unexpected token"),
                }
            }
            if args.is_empty() {
                let text = if trim { trim_blanks(&plain) } else { plain };
                return Ok(Node::string(text));
            }
            let template = if trim { trim_blanks(&template) } else { template };
            Ok(Node::Format { template, args })
        })
    }

    fn parse_path(&mut self, name: &str) -> PResult<Node> {
        let name = if name.is_empty() {
            "path".to_string()
        } else {
            format!("{} path", name)
        };
        self.traced(&name, |p| {
            p.skip_whitespace();
            let text = p.parse_text(TextMode::Path, true)?;
            p.skip_whitespace();
            Ok(Node::Path(text.boxed()))
        })
    }

    /// `{path1, path2, ...}`
    fn parse_path_group(&mut self) -> PResult<Vec<Node>> {
        self.traced("path group", |p| {
            let mut paths = Vec::new();
            p.skip_whitespace();
            p.expect("{")?;
            loop {
                p.skip_whitespace();
                paths.push(p.parse_path("")?);
                p.skip_whitespace();
                if p.parse_exact("}") {
                    break;
                }
                if !p.parse_exact(",") {
                    return p.error(", or } expected");
                }
            }
            p.skip_whitespace();
            Ok(paths)
        })
    }

    /// Quoted strings and `format(...)` are expressions, anything else is
    /// unquoted text.
    fn parse_string(&mut self, name: &str) -> PResult<Node> {
        self.traced(name, |p| {
            p.skip_whitespace();
            if p.peek_is("\"") || p.peek_is("format(") {
                return p.parse_expr("");
            }
            let node = p.parse_text(TextMode::Unquoted, true)?;
            p.skip_whitespace();
            Ok(node)
        })
    }

    /// A command argument.
    ///
    /// `eval expr` and `[...]` are expressions, `$(command)` is the result of
    /// a command. Otherwise the argument is read as an expression when it
    /// is one up to the end of the value, and as text when it is not.
    fn parse_value(&mut self) -> PResult<Node> {
        self.traced("value", |p| {
            p.skip_whitespace();
            if p.parse_exact("eval ") {
                return p.parse_expr("");
            }
            if p.peek_is("[") {
                return p.parse_expr("");
            }
            if p.peek_is("$(") && !p.peek_is("$((") {
                p.lexer.advance_by(2);
                let node = p.parse_command("")?;
                p.expect(")")?;
                return Ok(node);
            }
            let start = p.pos();
            if let Ok(node) = p.parse_expr("") {
                if p.value_end() {
                    // `001122` is a color, not the number 1122
                    let raw = trim_blanks(&p.lexer.slice(start, p.pos()));
                    let padded = raw.len() > 1
                        && raw.starts_with('0')
                        && raw.chars().nth(1).is_some_and(|c| c.is_ascii_digit());
                    if padded && matches!(node, Node::Literal(Value::Int(_))) {
                        return Ok(Node::string(raw));
                    }
                    return Ok(node);
                }
            }
            p.seek(start);
            p.parse_string("")
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn parse_expr(&mut self, name: &str) -> PResult<Node> {
        self.traced(name, |p| {
            let node = p.parse_binary(1)?;
            p.skip_whitespace();
            Ok(node)
        })
    }

    fn parse_binary(&mut self, precedence: u8) -> PResult<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let save = self.pos();
            let operator = self.lexer.next_expr_token();
            let op_precedence = operator.precedence();
            let op = match BinOp::from_token(operator.kind) {
                Some(op) if op_precedence >= precedence => op,
                _ => {
                    self.seek(save);
                    return Ok(left);
                }
            };
            let right = self.parse_binary(op_precedence + 1)?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> PResult<Node> {
        let save = self.pos();
        let token = self.lexer.next_expr_token();
        match token.kind {
            TokenKind::Add => self.parse_unary(),
            TokenKind::Sub => Ok(Node::Negate(self.parse_unary()?.boxed())),
            TokenKind::Not => Ok(Node::Not(self.parse_unary()?.boxed())),
            _ => {
                self.seek(save);
                self.parse_primary()
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<Node> {
        let token = self.lexer.next_expr_token();
        match (token.kind, token.value) {
            (TokenKind::Bool, Some(Literal::Bool(b))) => Ok(Node::Literal(Value::Bool(b))),
            (TokenKind::Int, Some(Literal::Int(n))) => Ok(Node::Literal(Value::Int(n))),
            (TokenKind::Float, Some(Literal::Float(n))) => Ok(Node::Literal(Value::Float(n))),
            (TokenKind::DoubleQuote, _) => {
                let node = self.parse_text(TextMode::Quoted, false)?;
                self.expect("\"")?;
                Ok(node)
            }
            (TokenKind::Deref, Some(Literal::Name(name))) => {
                let save = self.pos();
                let next = self.lexer.next_expr_token();
                if next.kind != TokenKind::LeftBrac {
                    self.seek(save);
                    return Ok(Node::Symbol(name));
                }
                let index = self.parse_expr("index")?;
                if self.lexer.next_expr_token().kind != TokenKind::RightBrac {
                    return self.error("square bracket opened but not closed");
                }
                Ok(Node::ArrayRef {
                    name,
                    index: index.boxed(),
                })
            }
            (TokenKind::LeftEval, _) => {
                let node = self.parse_expr("")?;
                self.expect("))")?;
                Ok(node)
            }
            (TokenKind::LeftParen, _) => {
                let node = self.parse_expr("")?;
                let end = self.lexer.next_expr_token();
                if end.kind != TokenKind::RightParen {
                    return self.error_at(end.start, format!(") expected, got {}", end.text));
                }
                Ok(node)
            }
            (TokenKind::LeftBrac, _) => {
                let save = self.pos();
                if self.lexer.next_expr_token().kind == TokenKind::RightBrac {
                    return Ok(Node::Array(Vec::new()));
                }
                self.seek(save);
                let mut items = Vec::new();
                loop {
                    items.push(self.parse_expr("array element")?);
                    let next = self.lexer.next_expr_token();
                    match next.kind {
                        TokenKind::RightBrac => return Ok(Node::Array(items)),
                        TokenKind::Comma => continue,
                        _ => return self.error_at(next.start, "] or comma expected"),
                    }
                }
            }
            (TokenKind::Format, _) => {
                self.skip_whitespace();
                self.expect("(")?;
                let args = self.parse_expr_list(")")?;
                let mut args = args.into_iter();
                let Some(format) = args.next() else {
                    return self.error("format expects at least one argument");
                };
                Ok(Node::Printf {
                    format: format.boxed(),
                    args: args.collect(),
                })
            }
            _ => self.error_at(token.start, format!("unexpected token : {}", token.text)),
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn parse_expr_list(&mut self, close: &str) -> PResult<Vec<Node>> {
        self.traced("expression list", |p| {
            let mut items = Vec::new();
            p.skip_whitespace();
            if p.parse_exact(close) {
                return Ok(items);
            }
            loop {
                items.push(p.parse_expr("")?);
                if p.parse_exact(close) {
                    return Ok(items);
                }
                if !p.parse_exact(",") {
                    return p.error(format!(", or {} expected", close));
                }
            }
        })
    }
}

fn binary(op: BinOp, left: Node, right: Node) -> Node {
    let (left, right) = (left.boxed(), right.boxed());
    match op {
        BinOp::Arith(op) => Node::Arith { op, left, right },
        BinOp::Compare(op) => Node::Compare { op, left, right },
        BinOp::Equality(op) => Node::Equality { op, left, right },
        BinOp::Logic(op) => Node::Logic { op, left, right },
    }
}

fn trim_blanks(s: &str) -> String {
    s.trim_matches(|c| c == ' ' || c == '\t').to_string()
}
