use logos::Logos;
use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::span::Span;
use crate::consts::BUILT_IN_IDENTIFIERS;

/// Why the scanner could not produce a regular token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    IllegalCharacter,
    UnterminatedString,
    UnterminatedComment,
}

/// Token kinds
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r\n\x0C]+")]
pub enum Token {
    // Keywords
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("catch")]
    Catch,
    #[token("class")]
    Class,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("extends")]
    Extends,
    #[token("false")]
    False,
    #[token("final")]
    Final,
    #[token("finally")]
    Finally,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("new")]
    New,
    #[token("null")]
    Null,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("switch")]
    Switch,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("true")]
    True,
    #[token("try")]
    Try,
    #[token("var")]
    Var,
    #[token("void")]
    Void,
    #[token("while")]
    While,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("~/=")]
    TruncDivAssign,
    #[token("%=")]
    ModAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    LShiftAssign,
    #[token(">>=")]
    RShiftAssign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("~/")]
    TildeSlash,
    #[token("%")]
    Percent,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("===")]
    EqStrict,
    #[token("!==")]
    NeStrict,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=>")]
    Arrow,
    #[token("..")]
    DotDot,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("#")]
    Hash,

    // Literals
    #[token("\"", scan_string)]
    #[token("'", scan_string)]
    #[token("\"\"\"", scan_string)]
    #[token("'''", scan_string)]
    #[token("@\"", scan_string)]
    #[token("@'", scan_string)]
    #[token("@\"\"\"", scan_string)]
    #[token("@'''", scan_string)]
    #[token("r\"", scan_string)]
    #[token("r'", scan_string)]
    #[token("r\"\"\"", scan_string)]
    #[token("r'''", scan_string)]
    StringLiteral,
    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexInteger,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Double,

    // Identifiers (built-in identifiers included)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    // Comments
    #[regex(r"//[^\n\r]*")]
    LineComment,
    #[token("/*", scan_block_comment)]
    BlockComment,
    #[regex(r"#![^\n\r]*")]
    ScriptTag,

    #[regex(r"[^\x00-\x7F]")]
    NonAscii,

    // Produced by the `Lexer` wrapper, never by the scanner itself
    Illegal,
    Eof,
}

static BUILT_INS: Lazy<HashSet<&'static str>> = Lazy::new(|| BUILT_IN_IDENTIFIERS.iter().copied().collect());

/// Whether `name` is a built-in identifier (legal everywhere except as a type name)
pub fn is_built_in_identifier(name: &str) -> bool {
    BUILT_INS.contains(name)
}

impl Token {
    /// Operators that may be declared with `operator`
    pub fn is_user_definable_operator(&self) -> bool {
        matches!(self,
            Token::Plus | Token::Minus | Token::Star | Token::Slash |
            Token::TildeSlash | Token::Percent | Token::Tilde |
            Token::Amp | Token::Pipe | Token::Caret | Token::LShift |
            Token::RShift | Token::Eq | Token::Lt | Token::Gt |
            Token::Le | Token::Ge
        )
    }

    /// Human readable description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Identifier => "identifier",
            Token::StringLiteral => "string literal",
            Token::HexInteger | Token::Integer => "integer literal",
            Token::Double => "double literal",
            Token::Eof => "end of input",
            Token::Illegal | Token::NonAscii => "illegal token",
            Token::LineComment | Token::BlockComment => "comment",
            Token::ScriptTag => "script tag",
            other => other.symbol(),
        }
    }

    /// Fixed source text of keyword and punctuation tokens
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::Break => "break",
            Token::Case => "case",
            Token::Catch => "catch",
            Token::Class => "class",
            Token::Const => "const",
            Token::Continue => "continue",
            Token::Default => "default",
            Token::Do => "do",
            Token::Else => "else",
            Token::Extends => "extends",
            Token::False => "false",
            Token::Final => "final",
            Token::Finally => "finally",
            Token::For => "for",
            Token::If => "if",
            Token::In => "in",
            Token::Is => "is",
            Token::New => "new",
            Token::Null => "null",
            Token::Return => "return",
            Token::Super => "super",
            Token::Switch => "switch",
            Token::This => "this",
            Token::Throw => "throw",
            Token::True => "true",
            Token::Try => "try",
            Token::Var => "var",
            Token::Void => "void",
            Token::While => "while",
            Token::Assign => "=",
            Token::AddAssign => "+=",
            Token::SubAssign => "-=",
            Token::MulAssign => "*=",
            Token::DivAssign => "/=",
            Token::TruncDivAssign => "~/=",
            Token::ModAssign => "%=",
            Token::AndAssign => "&=",
            Token::OrAssign => "|=",
            Token::XorAssign => "^=",
            Token::LShiftAssign => "<<=",
            Token::RShiftAssign => ">>=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::TildeSlash => "~/",
            Token::Percent => "%",
            Token::Inc => "++",
            Token::Dec => "--",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::LShift => "<<",
            Token::RShift => ">>",
            Token::AndAnd => "&&",
            Token::PipePipe => "||",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::EqStrict => "===",
            Token::NeStrict => "!==",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Question => "?",
            Token::Colon => ":",
            Token::Arrow => "=>",
            Token::DotDot => "..",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Hash => "#",
            _ => "",
        }
    }
}

/// Scan the rest of a string literal whose opening delimiter was just matched
fn scan_string(lex: &mut logos::Lexer<Token>) -> Result<(), LexErrorKind> {
    let opening = lex.slice().as_bytes();
    let raw = matches!(opening[0], b'@' | b'r');
    let quote = opening[opening.len() - 1];
    let triple = opening.len() >= 3 && opening[opening.len() - 3..].iter().all(|b| *b == quote);
    let rest = lex.remainder().as_bytes();
    match scan_string_body(rest, 0, quote, triple, raw) {
        Ok(end) => {
            lex.bump(end);
            Ok(())
        }
        Err(end) => {
            lex.bump(end);
            Err(LexErrorKind::UnterminatedString)
        }
    }
}

/// Returns the index just past the closing quote, or `Err(end)` when the
/// literal is unterminated (`end` is where scanning stopped).
pub(crate) fn scan_string_body(bytes: &[u8], mut i: usize, quote: u8, triple: bool, raw: bool) -> Result<usize, usize> {
    while i < bytes.len() {
        let b = bytes[i];
        if b == quote {
            if !triple {
                return Ok(i + 1);
            }
            if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                return Ok(i + 3);
            }
            i += 1;
            continue;
        }
        match b {
            b'\n' | b'\r' if !triple => return Err(i),
            b'\\' if !raw => {
                // an escaped line break is still a break in a single-line string
                match bytes.get(i + 1) {
                    Some(b'\n') | Some(b'\r') if !triple => return Err(i + 1),
                    Some(_) => i += 2,
                    None => return Err(bytes.len()),
                }
            }
            b'$' if !raw && bytes.get(i + 1) == Some(&b'{') => {
                i = scan_interpolation(bytes, i + 2)?;
            }
            _ => i += 1,
        }
    }
    Err(bytes.len())
}

/// Skip a `${ ... }` hole starting just after the `{`; returns the index past `}`.
pub(crate) fn scan_interpolation(bytes: &[u8], mut i: usize) -> Result<usize, usize> {
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Ok(i + 1);
                }
                depth -= 1;
                i += 1;
            }
            q @ (b'"' | b'\'') => {
                let raw = i > 0 && matches!(bytes[i - 1], b'@' | b'r');
                let triple = bytes.get(i + 1) == Some(&q) && bytes.get(i + 2) == Some(&q);
                let start = if triple { i + 3 } else { i + 1 };
                i = scan_string_body(bytes, start, q, triple, raw)?;
            }
            _ => i += 1,
        }
    }
    Err(bytes.len())
}

/// Scan a possibly nested block comment after its opening `/*`
fn scan_block_comment(lex: &mut logos::Lexer<Token>) -> Result<(), LexErrorKind> {
    let bytes = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return Ok(());
            }
        } else if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    lex.bump(bytes.len());
    Err(LexErrorKind::UnterminatedComment)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
    DocLine,
    DocBlock,
}

/// A comment recorded outside the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub span: Span,
}

impl Comment {
    pub fn is_doc(&self) -> bool {
        matches!(self.kind, CommentKind::DocLine | CommentKind::DocBlock)
    }
}

/// Lexical token with location information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalToken<'a> {
    pub token: Token,
    pub lexeme: &'a str,
    pub span: Span,
    /// A line terminator occurs between the previous token and this one
    pub newline_before: bool,
    /// Set on `Token::Illegal`
    pub error: Option<LexErrorKind>,
}

impl<'a> LexicalToken<'a> {
    pub fn new(token: Token, lexeme: &'a str, span: Span) -> Self {
        Self { token, lexeme, span, newline_before: false, error: None }
    }

    /// Get the token type
    pub fn token_type(&self) -> &Token {
        &self.token
    }

    /// Get the lexeme (actual text)
    pub fn lexeme(&self) -> &'a str {
        self.lexeme
    }

    /// Check if this token matches the given token type
    pub fn is(&self, token_type: &Token) -> bool {
        self.token == *token_type
    }
}

/// Lazy token stream over one compilation unit.
///
/// Comments are diverted to a side list; malformed input becomes
/// `Token::Illegal` and scanning continues. The stream always ends with
/// exactly one `Token::Eof`.
pub struct Lexer<'a> {
    source: &'a str,
    lexer: logos::Lexer<'a, Token>,
    comments: Vec<Comment>,
    prev_end: usize,
    end: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_range(source, 0, source.len())
    }

    /// Scan only `source[start..end]`, keeping offsets absolute.
    ///
    /// Used for the expression holes of string interpolations.
    pub fn with_range(source: &'a str, start: usize, end: usize) -> Self {
        let end = end.min(source.len());
        let start = start.min(end);
        let mut lexer = Token::lexer(&source[..end]);
        lexer.bump(start);
        Self {
            source,
            lexer,
            comments: Vec::new(),
            prev_end: start,
            end,
            finished: false,
        }
    }

    /// Comments seen so far, in source order
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Offset at which this stream ends (the `Eof` offset)
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn take_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.comments)
    }

    /// Get the next token, or `None` after `Eof` has been produced
    pub fn next_token(&mut self) -> Option<LexicalToken<'a>> {
        if self.finished {
            return None;
        }
        loop {
            let Some(result) = self.lexer.next() else {
                self.finished = true;
                let end = self.end;
                let mut eof = LexicalToken::new(Token::Eof, "", Span::empty(end));
                eof.newline_before = self.gap_has_newline(end);
                return Some(eof);
            };
            let range = self.lexer.span();
            let span = Span::from_to(range.start, range.end);
            let lexeme = self.source.get(range.clone()).unwrap_or("");
            let token = match result {
                Ok(Token::LineComment) => {
                    let kind = if lexeme.starts_with("///") { CommentKind::DocLine } else { CommentKind::Line };
                    self.comments.push(Comment { kind, span });
                    continue;
                }
                Ok(Token::BlockComment) => {
                    self.comments.push(Comment { kind: block_kind(lexeme), span });
                    continue;
                }
                Ok(Token::ScriptTag) if range.start == 0 => {
                    self.prev_end = range.end;
                    continue;
                }
                Ok(Token::NonAscii) if lexeme == "\u{FEFF}" => {
                    self.prev_end = range.end;
                    continue;
                }
                Ok(Token::ScriptTag) | Ok(Token::NonAscii) => {
                    self.illegal(lexeme, span, LexErrorKind::IllegalCharacter)
                }
                Ok(token) => LexicalToken::new(token, lexeme, span),
                Err(LexErrorKind::UnterminatedComment) => {
                    self.comments.push(Comment { kind: block_kind(lexeme), span });
                    self.illegal(lexeme, Span::empty(range.end), LexErrorKind::UnterminatedComment)
                }
                Err(kind) => self.illegal(lexeme, span, kind),
            };
            let mut token = token;
            token.newline_before = self.gap_has_newline(range.start);
            self.prev_end = range.end;
            return Some(token);
        }
    }

    fn illegal(&self, lexeme: &'a str, span: Span, kind: LexErrorKind) -> LexicalToken<'a> {
        log::trace!("illegal token at {}: {:?}", span, kind);
        let mut token = LexicalToken::new(Token::Illegal, lexeme, span);
        token.error = Some(kind);
        token
    }

    fn gap_has_newline(&self, start: usize) -> bool {
        let from = self.prev_end.min(start);
        self.source
            .get(from..start)
            .map_or(false, |gap| gap.contains('\n') || gap.contains('\r'))
    }

    /// Get all tokens (including the final `Eof`) from the source
    pub fn tokenize(mut self) -> (Vec<LexicalToken<'a>>, Vec<Comment>) {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        (tokens, self.comments)
    }
}

fn block_kind(lexeme: &str) -> CommentKind {
    if lexeme.starts_with("/**") && lexeme != "/**/" {
        CommentKind::DocBlock
    } else {
        CommentKind::Block
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexicalToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source).map(|t| t.token).collect()
    }

    #[test]
    fn test_lexer_keywords_and_built_ins() {
        let tokens = kinds("class A extends B implements C");
        assert_eq!(tokens, vec![
            Token::Class, Token::Identifier, Token::Extends, Token::Identifier,
            Token::Identifier, Token::Identifier, Token::Eof,
        ]);
        assert!(is_built_in_identifier("implements"));
        assert!(!is_built_in_identifier("assert"));
    }

    #[test]
    fn test_lexer_operators() {
        let tokens = kinds("=== !== ~/ ~/= .. => >> >>=");
        assert_eq!(tokens, vec![
            Token::EqStrict, Token::NeStrict, Token::TildeSlash, Token::TruncDivAssign,
            Token::DotDot, Token::Arrow, Token::RShift, Token::RShiftAssign, Token::Eof,
        ]);
    }

    #[test]
    fn test_lexer_numbers() {
        let (tokens, _) = Lexer::new("42 0xFF 1.5 .5 1e10 1.foo").tokenize();
        let kinds: Vec<_> = tokens.iter().map(|t| t.token).collect();
        assert_eq!(kinds, vec![
            Token::Integer, Token::HexInteger, Token::Double, Token::Double, Token::Double,
            Token::Integer, Token::Dot, Token::Identifier, Token::Eof,
        ]);
    }

    #[test]
    fn test_lexer_strings_with_nested_interpolation() {
        let source = r#"'a ${ {"k": "${x}"}["k"] } b' "x" @"raw\" """tri"ple""""#;
        let (tokens, _) = Lexer::new(source).tokenize();
        let lexemes: Vec<_> = tokens.iter().filter(|t| t.token == Token::StringLiteral).map(|t| t.lexeme).collect();
        assert_eq!(lexemes, vec![r#"'a ${ {"k": "${x}"}["k"] } b'"#, r#""x""#, r#"@"raw\""#, r#""""tri"ple""""#]);
    }

    #[test]
    fn test_lexer_unterminated_string_is_illegal_and_continues() {
        let (tokens, _) = Lexer::new("x = 'abc\ny;").tokenize();
        assert_eq!(tokens[2].token, Token::Illegal);
        assert_eq!(tokens[2].error, Some(LexErrorKind::UnterminatedString));
        assert_eq!(tokens[3].token, Token::Identifier);
        assert!(tokens[3].newline_before);
    }

    #[test]
    fn test_lexer_comments_are_recorded() {
        let source = "#!/usr/bin/env dart\n/// doc\n/* a /* nested */ b */ class /** d */ A {}";
        let (tokens, comments) = Lexer::new(source).tokenize();
        assert_eq!(tokens[0].token, Token::Class);
        let kinds: Vec<_> = comments.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CommentKind::DocLine, CommentKind::Block, CommentKind::DocBlock]);
    }

    #[test]
    fn test_lexer_illegal_characters_do_not_stop_scanning() {
        let tokens = kinds("a ` b é c");
        assert_eq!(tokens, vec![
            Token::Identifier, Token::Illegal, Token::Identifier, Token::Illegal,
            Token::Identifier, Token::Eof,
        ]);
    }

    #[test]
    fn test_lexer_unterminated_comment() {
        let (tokens, comments) = Lexer::new("a /* never closed").tokenize();
        assert_eq!(tokens[1].token, Token::Illegal);
        assert_eq!(tokens[1].error, Some(LexErrorKind::UnterminatedComment));
        assert_eq!(comments.len(), 1);
        assert_eq!(tokens.last().map(|t| t.token), Some(Token::Eof));
    }
}
