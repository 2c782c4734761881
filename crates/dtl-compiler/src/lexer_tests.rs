use crate::lexer::{Token, lex};

fn tokens(source: &str) -> Vec<Token<'_>> {
    lex(source)
        .unwrap()
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

#[test]
fn keywords_and_symbols() {
    let tokens = tokens("WITH x AS SELECT * FROM y;");
    insta::assert_yaml_snapshot!(tokens, @r#"
    - With
    - Name: x
    - As
    - Select
    - Star
    - From
    - Name: y
    - Semicolon
    "#);
}

#[test]
fn keywords_are_case_sensitive() {
    // Lower-case keywords lex as plain names.
    let tokens = tokens("select with");
    insta::assert_yaml_snapshot!(tokens, @r#"
    - Name: select
    - Name: with
    "#);
}

#[test]
fn literals() {
    assert_eq!(
        tokens(r#"42 3.25 'text' b'bytes' true false"#),
        vec![
            Token::Integer("42"),
            Token::Float("3.25"),
            Token::String("'text'"),
            Token::ByteString("b'bytes'"),
            Token::True,
            Token::False,
        ]
    );
}

#[test]
fn operators() {
    let tokens = tokens("+ - * / = != < <= > >=");
    insta::assert_yaml_snapshot!(tokens, @r"
    - Plus
    - Minus
    - Star
    - Slash
    - Eq
    - NotEq
    - LessThan
    - LessThanEq
    - GreaterThan
    - GreaterThanEq
    ");
}

#[test]
fn qualified_reference() {
    let tokens = tokens("input.a");
    insta::assert_yaml_snapshot!(tokens, @r#"
    - Name: input
    - Dot
    - Name: a
    "#);
}

#[test]
fn comments_and_whitespace_are_skipped() {
    let tokens = tokens("a // line comment\n /* block\ncomment */ b");
    insta::assert_yaml_snapshot!(tokens, @r#"
    - Name: a
    - Name: b
    "#);
}

#[test]
fn quoted_names() {
    assert_eq!(
        tokens(r#""quoted name""#),
        vec![Token::QuotedName(r#""quoted name""#)]
    );
}

#[test]
fn spans_are_byte_ranges() {
    let spanned = lex("WITH x").unwrap();
    assert_eq!(spanned[0].1.start, 0);
    assert_eq!(spanned[0].1.end, 4);
    assert_eq!(spanned[1].1.start, 5);
    assert_eq!(spanned[1].1.end, 6);
}

#[test]
fn unknown_characters_fail() {
    let err = lex("a ^ b").unwrap_err();
    assert!(err.message.contains('^'), "message: {}", err.message);
    assert_eq!(err.span.start, 2);
}
