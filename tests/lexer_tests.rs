// tests/lexer_tests.rs

use ogree_cli::ast::{Literal, Token, TokenKind};
use ogree_cli::lexer::Lexer;

fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
    tokens.iter().map(|t| t.kind).collect()
}

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

// ============================================================================
// Expression mode
// ============================================================================

#[test]
fn test_arithmetic_expression() {
    let tokens = expr_tokens("$a + 2 * (3.5 - $b)");
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Deref,
            TokenKind::Add,
            TokenKind::Int,
            TokenKind::Mul,
            TokenKind::LeftParen,
            TokenKind::Float,
            TokenKind::Sub,
            TokenKind::Deref,
            TokenKind::RightParen,
        ]
    );
    assert_eq!(tokens[0].value, Some(Literal::Name("a".to_string())));
    assert_eq!(tokens[5].value, Some(Literal::Float(3.5)));
}

#[test]
fn test_braced_deref() {
    let tokens = expr_tokens("${rack}");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Deref);
    assert_eq!(tokens[0].value, Some(Literal::Name("rack".to_string())));
}

#[test]
fn test_unclosed_brace_is_not_a_deref() {
    let mut lexer = Lexer::new("${rack");
    assert!(lexer.next_expr_token().is_eof());
    assert_eq!(lexer.position(), 0);
}

#[test]
fn test_left_eval() {
    let tokens = expr_tokens("$((1))");
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::LeftEval,
            TokenKind::Int,
            TokenKind::RightParen,
            TokenKind::RightParen,
        ]
    );
}

#[test]
fn test_booleans_and_format() {
    let tokens = expr_tokens("true false format");
    assert_eq!(tokens[0].value, Some(Literal::Bool(true)));
    assert_eq!(tokens[1].value, Some(Literal::Bool(false)));
    assert_eq!(tokens[2].kind, TokenKind::Format);
}

#[test]
fn test_range_bounds() {
    let mut lexer = Lexer::new("1..10");
    let first = lexer.next_expr_token();
    assert_eq!(first.value, Some(Literal::Int(1)));
    assert_eq!(lexer.position(), 1);
    lexer.set_position(3);
    let last = lexer.next_expr_token();
    assert_eq!(last.value, Some(Literal::Int(10)));
}

#[test]
fn test_token_offsets() {
    let tokens = expr_tokens("  12 <= 13");
    assert_eq!(tokens[0].start, 2);
    assert_eq!(tokens[1].start, 5);
    assert_eq!(tokens[1].text, "<=");
}

#[test]
fn test_precedence() {
    let tokens = expr_tokens("|| && == + *");
    let levels: Vec<u8> = tokens.iter().map(Token::precedence).collect();
    assert_eq!(levels, vec![1, 2, 3, 4, 5]);
}

// ============================================================================
// Text modes
// ============================================================================

#[test]
fn test_unquoted_text_stops_at_at_sign() {
    let mut lexer = Lexer::new("front@[1,2]");
    let token = lexer.next_unquoted_token();
    assert_eq!(token.kind, TokenKind::Text);
    assert_eq!(token.text, "front");
    assert_eq!(lexer.current_char(), Some('@'));
}

#[test]
fn test_unquoted_text_splits_on_deref() {
    let mut lexer = Lexer::new("rack$i-a");
    let first = lexer.next_unquoted_token();
    let second = lexer.next_unquoted_token();
    let third = lexer.next_unquoted_token();
    assert_eq!(first.text, "rack");
    assert_eq!(second.kind, TokenKind::Deref);
    assert_eq!(second.value, Some(Literal::Name("i".to_string())));
    assert_eq!(third.text, "-a");
    assert!(lexer.next_unquoted_token().is_eof());
}

#[test]
fn test_lone_dollar_is_text() {
    let mut lexer = Lexer::new("$ 5");
    let token = lexer.next_unquoted_token();
    assert_eq!(token.kind, TokenKind::Text);
    assert_eq!(token.text, "$ 5");
}

#[test]
fn test_path_text_stops_at_space_and_colon() {
    let mut lexer = Lexer::new("/P/site/rack:color");
    let token = lexer.next_path_token();
    assert_eq!(token.text, "/P/site/rack");
    assert_eq!(lexer.current_char(), Some(':'));

    let mut lexer = Lexer::new("B1 2");
    assert_eq!(lexer.next_path_token().text, "B1");
}

#[test]
fn test_quoted_body() {
    let mut lexer = Lexer::new("a, b; $x\"");
    assert_eq!(lexer.next_quoted_token().text, "a, b; ");
    assert_eq!(lexer.next_quoted_token().kind, TokenKind::Deref);
    assert!(lexer.next_quoted_token().is_eof());
    assert_eq!(lexer.current_char(), Some('"'));
}

#[test]
fn test_lexer_handles_unicode_offsets() {
    let mut lexer = Lexer::new("salle-é@1");
    let token = lexer.next_unquoted_token();
    assert_eq!(token.text, "salle-é");
    assert_eq!(lexer.position(), 7);
}
