use crate::ast::{Literal, Token, TokenKind};

/// Stop characters of unquoted text (command arguments).
const UNQUOTED_STOPS: &str = "@;,})";
/// Stop characters of the body of a quoted string.
const QUOTED_STOPS: &str = "\"";
/// Stop characters of a path.
const PATH_STOPS: &str = " @;,}):";

/// On-demand tokenizer over a command line.
///
/// The lexer has no persistent mode: the parser calls the lexing function
/// matching the context it is in (`next_expr_token`, `next_unquoted_token`,
/// `next_quoted_token` or `next_path_token`) and may move the cursor back
/// to any earlier offset with [`Lexer::set_position`].
///
/// Lexing never fails. Input a mode cannot make sense of yields an
/// [`TokenKind::Eof`] token and leaves the cursor on the offending character.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.input.len());
    }

    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    pub fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    pub fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    pub fn advance_by(&mut self, n: usize) {
        self.set_position(self.position + n);
    }

    /// Text between two offsets.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.input.len());
        let start = start.min(end);
        self.input[start..end].iter().collect()
    }

    /// Whether the input at the cursor starts with `word`.
    pub fn starts_with(&self, word: &str) -> bool {
        let mut offset = 0;
        for ch in word.chars() {
            if self.peek_char(offset) != Some(ch) {
                return false;
            }
            offset += 1;
        }
        true
    }

    /// Skips spaces and tabs.
    pub fn skip_whitespace(&mut self) {
        while matches!(self.current_char(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    fn emit(&self, kind: TokenKind, start: usize) -> Token {
        let text = if kind == TokenKind::Eof {
            "eof".to_string()
        } else {
            self.slice(start, self.position)
        };
        Token::new(kind, text, start)
    }

    /// Eof token at `start`, with the cursor moved back there.
    fn eof_at(&mut self, start: usize) -> Token {
        self.position = start;
        self.emit(TokenKind::Eof, start)
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.advance();
        self.emit(kind, start)
    }

    /// Two-character operator, or `fallback` when only the first matches.
    fn double(
        &mut self,
        second: char,
        kind: TokenKind,
        fallback: Option<TokenKind>,
        start: usize,
    ) -> Token {
        if self.peek_char(1) == Some(second) {
            self.advance_by(2);
            return self.emit(kind, start);
        }
        match fallback {
            Some(kind) => self.single(kind, start),
            None => self.eof_at(start),
        }
    }

    fn accept_digits(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_alphanumeric(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Lexes a token in expression mode.
    pub fn next_expr_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return self.emit(TokenKind::Eof, start);
        };

        match ch {
            '$' => {
                self.advance();
                match self.lex_deref(start) {
                    Some(token) => token,
                    None => self.eof_at(start),
                }
            }
            '"' => self.single(TokenKind::DoubleQuote, start),
            '[' => self.single(TokenKind::LeftBrac, start),
            ']' => self.single(TokenKind::RightBrac, start),
            ',' => self.single(TokenKind::Comma, start),
            '(' => self.single(TokenKind::LeftParen, start),
            ')' => self.single(TokenKind::RightParen, start),
            '+' => self.single(TokenKind::Add, start),
            '-' => self.single(TokenKind::Sub, start),
            '*' => self.single(TokenKind::Mul, start),
            '/' => self.single(TokenKind::Div, start),
            '\\' => self.single(TokenKind::IntDiv, start),
            '%' => self.single(TokenKind::Mod, start),
            '|' => self.double('|', TokenKind::Or, None, start),
            '&' => self.double('&', TokenKind::And, None, start),
            '=' => self.double('=', TokenKind::Eq, None, start),
            '!' => self.double('=', TokenKind::Neq, Some(TokenKind::Not), start),
            '<' => self.double('=', TokenKind::Leq, Some(TokenKind::Lss), start),
            '>' => self.double('=', TokenKind::Geq, Some(TokenKind::Gtr), start),
            c if c.is_ascii_digit() || c == '.' => self.lex_number(start),
            _ => {
                for (word, kind) in [
                    ("true", TokenKind::Bool),
                    ("false", TokenKind::Bool),
                    ("format", TokenKind::Format),
                ] {
                    if self.starts_with(word) {
                        self.advance_by(word.len());
                        let token = self.emit(kind, start);
                        return match kind {
                            TokenKind::Bool => token.with_value(Literal::Bool(word == "true")),
                            _ => token,
                        };
                    }
                }
                self.emit(TokenKind::Eof, start)
            }
        }
    }

    /// Lexes what follows a `$`: `name`, `{name}` or `((`.
    ///
    /// Returns `None` when no reference starts here; the cursor is then
    /// unspecified and must be restored by the caller.
    fn lex_deref(&mut self, start: usize) -> Option<Token> {
        if self.current_char() == Some('{') {
            self.advance();
            self.skip_whitespace();
            let name = self.read_identifier();
            self.skip_whitespace();
            if name.is_empty() || self.current_char() != Some('}') {
                return None;
            }
            self.advance();
            return Some(self.emit(TokenKind::Deref, start).with_value(Literal::Name(name)));
        }
        if self.starts_with("((") {
            self.advance_by(2);
            return Some(self.emit(TokenKind::LeftEval, start));
        }
        let name = self.read_identifier();
        if name.is_empty() {
            return None;
        }
        Some(self.emit(TokenKind::Deref, start).with_value(Literal::Name(name)))
    }

    /// Lexes an int or a float. `42..` stops before the dots.
    fn lex_number(&mut self, start: usize) -> Token {
        self.accept_digits();
        let mut is_float = false;

        if self.current_char() == Some('.') {
            if self.peek_char(1) == Some('.') {
                if self.position == start {
                    return self.eof_at(start);
                }
                return self.end_number(start, false);
            }
            self.advance();
            self.accept_digits();
            is_float = true;
        }

        if matches!(self.current_char(), Some('e') | Some('E')) {
            let digit_at = match self.peek_char(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.advance_by(digit_at);
                self.accept_digits();
                is_float = true;
            }
        }

        self.end_number(start, is_float)
    }

    fn end_number(&mut self, start: usize, is_float: bool) -> Token {
        if self.current_char().is_some_and(is_letter) {
            return self.lex_text_from(start, UNQUOTED_STOPS);
        }

        let digits: String = self.slice(start, self.position).replace('_', "");
        let literal = if is_float {
            digits.parse::<f64>().ok().map(Literal::Float)
        } else {
            match digits.parse::<i64>() {
                Ok(n) => Some(Literal::Int(n)),
                Err(_) => digits.parse::<f64>().ok().map(Literal::Float),
            }
        };

        match literal {
            Some(Literal::Int(n)) => self.emit(TokenKind::Int, start).with_value(Literal::Int(n)),
            Some(Literal::Float(n)) => {
                self.emit(TokenKind::Float, start).with_value(Literal::Float(n))
            }
            _ => self.eof_at(start),
        }
    }

    /// Lexes a token of unquoted text (command arguments).
    pub fn next_unquoted_token(&mut self) -> Token {
        self.lex_text(UNQUOTED_STOPS)
    }

    /// Lexes a token of the body of a quoted string.
    pub fn next_quoted_token(&mut self) -> Token {
        self.lex_text(QUOTED_STOPS)
    }

    /// Lexes a token of a path.
    pub fn next_path_token(&mut self) -> Token {
        self.lex_text(PATH_STOPS)
    }

    fn lex_text(&mut self, stops: &str) -> Token {
        let start = self.position;
        if self.current_char() == Some('$') {
            self.advance();
            if let Some(token) = self.lex_deref(start) {
                return token;
            }
            // not a reference: the `$` is plain text
            self.position = start + 1;
        }
        self.lex_text_from(start, stops)
    }

    fn lex_text_from(&mut self, start: usize, stops: &str) -> Token {
        while let Some(ch) = self.current_char() {
            if ch == '$' || stops.contains(ch) {
                break;
            }
            self.advance();
        }
        if self.position == start {
            return self.eof_at(start);
        }
        self.emit(TokenKind::Text, start)
    }
}

pub fn is_letter(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

pub fn is_alphanumeric(ch: char) -> bool {
    is_letter(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_expr_token();
            if token.is_eof() {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_int_followed_by_range_dots() {
        let mut lexer = Lexer::new("42..");
        let token = lexer.next_expr_token();
        assert_eq!(token.kind, TokenKind::Int);
        assert_eq!(token.value, Some(Literal::Int(42)));
        assert_eq!(lexer.position(), 2);
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(expr_tokens("3.14")[0].value, Some(Literal::Float(3.14)));
        assert_eq!(expr_tokens(".5")[0].value, Some(Literal::Float(0.5)));
        assert_eq!(expr_tokens("1e3")[0].value, Some(Literal::Float(1000.0)));
        assert_eq!(expr_tokens("1_000")[0].value, Some(Literal::Int(1000)));
    }

    #[test]
    fn test_number_followed_by_letter_is_text() {
        let tokens = expr_tokens("3rack");
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].text, "3rack");
    }

    #[test]
    fn test_lone_dollar_is_eof_in_expression() {
        let mut lexer = Lexer::new("$ + 1");
        let token = lexer.next_expr_token();
        assert!(token.is_eof());
        assert_eq!(lexer.position(), 0);
    }

    #[test]
    fn test_operators() {
        let kinds: Vec<TokenKind> = expr_tokens("|| && == != <= >= < > ! \\")
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Or,
                TokenKind::And,
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Leq,
                TokenKind::Geq,
                TokenKind::Lss,
                TokenKind::Gtr,
                TokenKind::Not,
                TokenKind::IntDiv,
            ]
        );
    }

    #[test]
    fn test_single_pipe_is_eof() {
        let mut lexer = Lexer::new("| 2");
        assert!(lexer.next_expr_token().is_eof());
        assert_eq!(lexer.position(), 0);
    }
}
