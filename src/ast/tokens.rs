/// Kind of a lexical token.
///
/// The lexer produces tokens on demand, one lexing function per context, so
/// a given kind is only ever produced by the modes listed in its doc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input, or anything the current mode does not recognise.
    Eof,

    /// Variable dereference
    ///
    /// # Examples
    /// ```text
    /// $rack
    /// ${rack}
    /// ```
    Deref,

    /// Integer constant
    Int,

    /// Floating-point constant
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// .5
    /// 1e3
    /// ```
    Float,

    /// `true` or `false`
    Bool,

    /// Opening of a quoted string (`"`)
    DoubleQuote,

    /// `[`
    LeftBrac,
    /// `]`
    RightBrac,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,

    // Operators
    /// `!`
    Not,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `\` (integer division)
    IntDiv,
    /// `%`
    Mod,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `<=`
    Leq,
    /// `>=`
    Geq,
    /// `>`
    Gtr,
    /// `<`
    Lss,

    /// Literal run of characters in a text mode
    Text,

    /// Start of a nested expression inside text (`$((`)
    ///
    /// # Examples
    /// ```text
    /// rack$(($i + 1))
    /// ```
    LeftEval,

    /// `format` keyword, starts a `format(fmt, args...)` call
    Format,
}

/// Decoded value carried by literal and dereference tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Name of a dereferenced variable
    Name(String),
}

/// A token together with its source text and start offset (in characters).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: Option<Literal>,
    pub start: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            value: None,
            start,
        }
    }

    pub fn with_value(mut self, value: Literal) -> Self {
        self.value = Some(value);
        self
    }

    /// Binding power of the token when used as a binary operator, 0 otherwise.
    pub fn precedence(&self) -> u8 {
        use TokenKind::*;
        match self.kind {
            Or => 1,
            And => 2,
            Eq | Neq | Lss | Leq | Gtr | Geq => 3,
            Add | Sub => 4,
            Mul | Div | IntDiv | Mod => 5,
            Not => 6,
            _ => 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}
