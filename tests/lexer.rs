use kiln::interpreter::lexer::{KEYWORDS, TokenKind, TokenStream};

fn kinds(src: &str) -> Vec<TokenKind> {
    TokenStream::new("test", src).map(|token| token.kind).collect()
}

#[test]
fn canonical_lexemes_lex_back_to_their_kind() {
    use TokenKind::{
        AndAnd, Arrow, Assign, Bang, BangEqual, Colon, Comma, Dot, EqualEqual, Greater, GreaterEqual,
        LBrace, LBracket, LParen, Less, LessEqual, Minus, OrOr, Pipe, Plus, RBrace, RBracket, RParen,
        Slash, Star,
    };
    let fixed = [LParen, RParen, LBrace, RBrace, LBracket, RBracket, Comma, Colon, Dot, Plus, Minus,
                 Star, Slash, Assign, EqualEqual, BangEqual, Less, Greater, LessEqual, GreaterEqual,
                 AndAnd, OrOr, Bang, Pipe, Arrow];

    for kind in fixed.into_iter().chain(KEYWORDS.iter().map(|(_, kind)| *kind)) {
        let lexeme = kind.lexeme()
                         .unwrap_or_else(|| panic!("{kind:?} has no lexeme"));
        assert_eq!(kinds(lexeme), vec![kind, TokenKind::Eof], "re-lexing {lexeme:?}");
    }
}

#[test]
fn literal_kinds() {
    assert_eq!(kinds("42 4.2 \"text\" name_1 true"),
               vec![TokenKind::Int,
                    TokenKind::Float,
                    TokenKind::String,
                    TokenKind::Identifier,
                    TokenKind::True,
                    TokenKind::Eof]);
    assert_eq!(TokenKind::Int.lexeme(), None);
    assert_eq!(TokenKind::Identifier.lexeme(), None);
}

#[test]
fn keywords_need_whole_words() {
    assert_eq!(kinds("letter iffy"),
               vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn method_call_on_integer_is_not_a_float() {
    assert_eq!(kinds("7.size"),
               vec![TokenKind::Int, TokenKind::Dot, TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn comments_are_dropped_and_newlines_kept() {
    assert_eq!(kinds("a // trailing\n/* spans\nlines */ b"),
               vec![TokenKind::Identifier,
                    TokenKind::NewLine,
                    TokenKind::Identifier,
                    TokenKind::Eof]);
}

#[test]
fn positions_are_line_and_column() {
    let tokens = TokenStream::tokenize("unit.kiln", "let a = 1\n  a + 2");
    let b = &tokens[5];
    assert_eq!(b.literal, "a");
    assert_eq!((b.position.line, b.position.column), (2, 2));
    assert_eq!(&*b.position.source, "unit.kiln");
    assert_eq!(b.position.to_string(), "unit.kiln:2:2");

    let plus = &tokens[6];
    assert!(plus.is(TokenKind::Plus));
    assert_eq!(plus.position.column, 4);
}

#[test]
fn columns_count_characters() {
    let tokens = TokenStream::tokenize("test", "\"é\" x");
    assert_eq!(tokens[1].literal, "x");
    assert_eq!(tokens[1].position.column, 4);
}

#[test]
fn strings_keep_their_escapes_until_parsed() {
    let tokens = TokenStream::tokenize("test", r#""say \"hi\"""#);
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].literal, r#""say \"hi\"""#);
}

#[test]
fn unterminated_string_runs_to_end_of_input() {
    assert_eq!(kinds("\"open"), vec![TokenKind::String, TokenKind::Eof]);
}

#[test]
fn illegal_characters_become_tokens() {
    let tokens = TokenStream::tokenize("test", "a $ b");
    assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
               vec![TokenKind::Identifier,
                    TokenKind::Illegal,
                    TokenKind::Identifier,
                    TokenKind::Eof]);
    assert_eq!(tokens[1].literal, "$");
    assert_eq!(tokens[1].position.column, 2);
}

#[test]
fn exactly_one_end_of_input() {
    let tokens = TokenStream::tokenize("test", "");
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].is(TokenKind::Eof));
}

#[test]
fn fragments_shift_lines_and_omit_end_of_input() {
    let tokens = TokenStream::fragment("stdin".into(), "a + b\n", 4).collect::<Vec<_>>();
    assert!(tokens.iter().all(|t| t.position.line == 5));
    assert!(tokens.iter().all(|t| !t.is(TokenKind::Eof)));
    assert!(tokens.last().is_some_and(|t| t.is(TokenKind::NewLine)));
}
