use std::{fmt, sync::Arc};

use logos::Logos;

/// The kind of a lexical token.
///
/// Fixed-lexeme kinds (brackets, operators, keywords) are produced directly by
/// the logos state machine. Keywords carry no pattern of their own: the lexer
/// first matches an identifier and then looks the lexeme up in [`KEYWORDS`].
/// `Eof` and `Illegal` are synthesized by [`TokenStream`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `,`
    #[token(",")]
    Comma,
    /// `:`
    #[token(":")]
    Colon,
    /// `.`
    #[token(".")]
    Dot,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// `=`
    #[token("=")]
    Assign,
    /// `==`
    #[token("==")]
    EqualEqual,
    /// `!=`
    #[token("!=")]
    BangEqual,
    /// `<`
    #[token("<")]
    Less,
    /// `>`
    #[token(">")]
    Greater,
    /// `<=`
    #[token("<=")]
    LessEqual,
    /// `>=`
    #[token(">=")]
    GreaterEqual,
    /// `&&`
    #[token("&&")]
    AndAnd,
    /// `||`
    #[token("||")]
    OrOr,
    /// `!`
    #[token("!")]
    Bang,
    /// `|`
    #[token("|")]
    Pipe,
    /// `=>`
    #[token("=>")]
    Arrow,
    /// `let`
    Let,
    /// `mut`
    Mut,
    /// `lazy`
    Lazy,
    /// `restricted`
    Restricted,
    /// `while`
    While,
    /// `if`
    If,
    /// `else`
    Else,
    /// `return`
    Return,
    /// `struct`
    Struct,
    /// `extend`
    Extend,
    /// `as`
    As,
    /// `is`
    Is,
    /// `import`
    Import,
    /// `namespace`
    Namespace,
    /// `true`
    True,
    /// `false`
    False,
    /// Integer literals such as `42`.
    #[regex(r"[0-9]+")]
    Int,
    /// Float literals such as `3.14`.
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    /// String literals. An unterminated literal runs to the end of input.
    #[regex(r#""([^"\\]|\\.)*""#, allow_greedy = true)]
    #[regex(r#""([^"\\]|\\.)*"#, allow_greedy = true)]
    String,
    /// Identifiers such as `fact` or `Person`.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    /// Statement separator.
    #[token("\n")]
    NewLine,
    /// `// Comments.` Never emitted.
    #[regex(r"//[^\n]*", logos::skip, allow_greedy = true)]
    Comment,
    /// `/* Multi line comments. */` Never emitted.
    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    MultiLineComment,
    /// End of input.
    Eof,
    /// A character the lexer does not recognize.
    Illegal,
}

/// Keyword table, consulted only for lexemes that already matched the
/// identifier pattern.
pub const KEYWORDS: &[(&str, TokenKind)] = &[("let", TokenKind::Let),
                                             ("mut", TokenKind::Mut),
                                             ("lazy", TokenKind::Lazy),
                                             ("restricted", TokenKind::Restricted),
                                             ("while", TokenKind::While),
                                             ("if", TokenKind::If),
                                             ("else", TokenKind::Else),
                                             ("return", TokenKind::Return),
                                             ("struct", TokenKind::Struct),
                                             ("extend", TokenKind::Extend),
                                             ("as", TokenKind::As),
                                             ("is", TokenKind::Is),
                                             ("import", TokenKind::Import),
                                             ("namespace", TokenKind::Namespace),
                                             ("true", TokenKind::True),
                                             ("false", TokenKind::False)];

/// Looks up the keyword kind for an identifier lexeme.
///
/// # Example
/// ```
/// use kiln::interpreter::lexer::{TokenKind, lookup_keyword};
///
/// assert_eq!(lookup_keyword("while"), Some(TokenKind::While));
/// assert_eq!(lookup_keyword("whilst"), None);
/// ```
#[must_use]
pub fn lookup_keyword(lexeme: &str) -> Option<TokenKind> {
    KEYWORDS.iter()
            .find(|(keyword, _)| *keyword == lexeme)
            .map(|(_, kind)| *kind)
}

impl TokenKind {
    /// Returns the canonical source text of kinds with a fixed lexeme.
    ///
    /// Literal, identifier and synthetic kinds return `None`.
    #[must_use]
    pub fn lexeme(self) -> Option<&'static str> {
        use TokenKind::{
            AndAnd, Arrow, Assign, BangEqual, Bang, Colon, Comma, Dot, EqualEqual, Greater,
            GreaterEqual, LBrace, LBracket, LParen, Less, LessEqual, Minus, OrOr, Pipe, Plus,
            RBrace, RBracket, RParen, Slash, Star,
        };
        let lexeme = match self {
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Comma => ",",
            Colon => ":",
            Dot => ".",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Assign => "=",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            AndAnd => "&&",
            OrOr => "||",
            Bang => "!",
            Pipe => "|",
            Arrow => "=>",
            keyword => {
                return KEYWORDS.iter()
                               .find(|(_, kind)| *kind == keyword)
                               .map(|(lexeme, _)| *lexeme);
            },
        };
        Some(lexeme)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lexeme) = self.lexeme() {
            return write!(f, "'{lexeme}'");
        }
        let class = match self {
            Self::Int => "integer literal",
            Self::Float => "float literal",
            Self::String => "string literal",
            Self::Identifier => "identifier",
            Self::NewLine => "newline",
            Self::Eof => "end of input",
            Self::Comment | Self::MultiLineComment => "comment",
            _ => "illegal character",
        };
        write!(f, "{class}")
    }
}

/// A location in a source unit: 1-based line, 0-based column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// The name of the source unit (usually a file name).
    pub source: Arc<str>,
    /// The line, starting at 1.
    pub line:   usize,
    /// The column of the first character, starting at 0.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

/// A lexical token: its kind, the exact source text and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What the token is.
    pub kind:     TokenKind,
    /// The source text the token was produced from.
    pub literal:  String,
    /// Where the token starts.
    pub position: Position,
}

impl Token {
    /// Returns `true` if the token is of the given kind.
    #[must_use]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::NewLine | TokenKind::Eof => write!(f, "{}", self.kind),
            _ => write!(f, "'{}'", self.literal),
        }
    }
}

/// Byte offsets of line starts, used to turn spans into line/column pairs.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0).chain(source.match_indices('\n').map(|(i, _)| i + 1))
                                       .collect();
        Self { starts }
    }

    fn locate(&self, source: &str, offset: usize) -> (usize, usize) {
        let index = self.starts.partition_point(|&start| start <= offset) - 1;
        let column = source[self.starts[index]..offset].chars().count();
        (index + 1, column)
    }
}

/// Converts source text into a sequence of [`Token`]s.
///
/// Whitespace and comments are dropped; line breaks are kept as
/// [`TokenKind::NewLine`]. Characters the lexer does not recognize become
/// [`TokenKind::Illegal`] tokens instead of stopping the stream.
///
/// A stream created with [`TokenStream::new`] ends with exactly one
/// [`TokenKind::Eof`] token. Fragments (see [`TokenStream::fragment`]) do not,
/// so that several fragments can feed one incremental parse.
///
/// # Example
/// ```
/// use kiln::interpreter::lexer::{TokenKind, TokenStream};
///
/// let kinds = TokenStream::new("demo", "let a = 3")
///     .map(|token| token.kind)
///     .collect::<Vec<_>>();
///
/// assert_eq!(kinds,
///            vec![TokenKind::Let,
///                 TokenKind::Identifier,
///                 TokenKind::Assign,
///                 TokenKind::Int,
///                 TokenKind::Eof]);
/// ```
pub struct TokenStream<'source> {
    lexer:       logos::Lexer<'source, TokenKind>,
    lines:       LineIndex,
    source_name: Arc<str>,
    line_offset: usize,
    emit_eof:    bool,
    finished:    bool,
}

impl<'source> TokenStream<'source> {
    /// Creates a stream over a complete source unit.
    #[must_use]
    pub fn new(source_name: &str, source: &'source str) -> Self {
        Self { lexer:       TokenKind::lexer(source),
               lines:       LineIndex::new(source),
               source_name: Arc::from(source_name),
               line_offset: 0,
               emit_eof:    true,
               finished:    false, }
    }

    /// Creates a stream over one fragment of a larger, incrementally arriving
    /// source. Line numbers are shifted by `line_offset` and no end-of-input
    /// token is produced.
    #[must_use]
    pub fn fragment(source_name: Arc<str>, source: &'source str, line_offset: usize) -> Self {
        Self { lexer: TokenKind::lexer(source),
               lines: LineIndex::new(source),
               source_name,
               line_offset,
               emit_eof: false,
               finished: false }
    }

    /// Lexes a whole source unit eagerly.
    #[must_use]
    pub fn tokenize(source_name: &str, source: &str) -> Vec<Token> {
        TokenStream::new(source_name, source).collect()
    }

    fn position_at(&self, offset: usize) -> Position {
        let (line, column) = self.lines.locate(self.lexer.source(), offset);
        Position { source: Arc::clone(&self.source_name),
                   line: line + self.line_offset,
                   column }
    }
}

impl Iterator for TokenStream<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let Some(result) = self.lexer.next() else {
            self.finished = true;
            if !self.emit_eof {
                return None;
            }
            let position = self.position_at(self.lexer.source().len());
            return Some(Token { kind: TokenKind::Eof,
                                literal: String::new(),
                                position });
        };

        let literal = self.lexer.slice();
        let kind = match result {
            Ok(TokenKind::Identifier) => lookup_keyword(literal).unwrap_or(TokenKind::Identifier),
            Ok(kind) => kind,
            Err(()) => TokenKind::Illegal,
        };

        Some(Token { kind,
                     literal: literal.to_string(),
                     position: self.position_at(self.lexer.span().start) })
    }
}
