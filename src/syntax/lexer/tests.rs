use super::*;

fn lex(source: &str) -> Vec<Lexeme> {
    Lexer::new(source, 0)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|t| t.node)
        .collect()
}

fn lex_err(source: &str) -> LexError {
    Lexer::new(source, 0).tokenize().unwrap_err()
}

#[test]
fn test_keywords_and_idents() {
    assert_eq!(
        lex("coin Token { action send_to }"),
        vec![
            Lexeme::Coin,
            Lexeme::Ident("Token".into()),
            Lexeme::LBrace,
            Lexeme::Action,
            Lexeme::Ident("send_to".into()),
            Lexeme::RBrace,
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        lex("42 0xAAbb 0x1"),
        vec![
            Lexeme::Integer(BigInt::from(42)),
            Lexeme::Hex(vec![0xaa, 0xbb]),
            Lexeme::Hex(vec![0x01]),
            Lexeme::Eof,
        ]
    );
    let big = lex("340282366920938463463374607431768211456");
    assert_eq!(
        big[0],
        Lexeme::Integer("340282366920938463463374607431768211456".parse().unwrap())
    );
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        lex(r#""a\n\t\"b\x41" 'it\'s'"#),
        vec![
            Lexeme::Str("a\n\t\"bA".into()),
            Lexeme::Str("it's".into()),
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_operators() {
    assert_eq!(
        lex("== != <= >= && || += -= *= /= %= << >> >s -> ! ~ & | ^"),
        vec![
            Lexeme::EqEq,
            Lexeme::NotEq,
            Lexeme::LtEq,
            Lexeme::GtEq,
            Lexeme::AndAnd,
            Lexeme::OrOr,
            Lexeme::PlusEq,
            Lexeme::MinusEq,
            Lexeme::StarEq,
            Lexeme::SlashEq,
            Lexeme::PercentEq,
            Lexeme::Shl,
            Lexeme::Shr,
            Lexeme::StrGt,
            Lexeme::Arrow,
            Lexeme::Bang,
            Lexeme::Tilde,
            Lexeme::Amp,
            Lexeme::Pipe,
            Lexeme::Caret,
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_gt_before_identifier_starting_with_s() {
    assert_eq!(
        lex("a >sum"),
        vec![
            Lexeme::Ident("a".into()),
            Lexeme::Gt,
            Lexeme::Ident("sum".into()),
            Lexeme::Eof,
        ]
    );
}

#[test]
fn test_comments_skipped_positions_kept() {
    let tokens = Lexer::new("// line\n/* block\n */ coin", 0)
        .tokenize()
        .unwrap();
    assert_eq!(tokens[0].node, Lexeme::Coin);
    assert_eq!(tokens[0].span.start, 21);
    assert_eq!(tokens[0].span.end, 25);
}

#[test]
fn test_spans() {
    let tokens = Lexer::new("let x = 10;", 0).tokenize().unwrap();
    let spans: Vec<(u32, u32)> = tokens.iter().map(|t| (t.span.start, t.span.end)).collect();
    assert_eq!(spans, vec![(0, 3), (4, 5), (6, 7), (8, 10), (10, 11), (11, 11)]);
}

#[test]
fn test_errors() {
    let err = lex_err("coin # C");
    assert_eq!(err.ch, '#');
    assert_eq!(err.span.start, 5);

    assert_eq!(lex_err("\"open").message, "unterminated string literal");
    assert_eq!(lex_err("/* never closed").message, "unterminated block comment");
    assert_eq!(lex_err("0x").ch, 'x');
    assert_eq!(lex_err("0xzz").ch, 'z');
    assert_eq!(lex_err("12ab").ch, 'a');
    assert_eq!(lex_err("\"\\q\"").ch, 'q');
    assert_eq!(lex_err("é").ch, 'é');
}
