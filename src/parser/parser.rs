//! Parser implementation
//!
//! A recursive descent parser over a lazily scanned token stream. Every
//! syntax problem is recorded in an [`ErrorRecovery`] and parsing continues
//! after token insertion, token deletion or resynchronization, so a
//! best-effort [`CompilationUnit`] is always produced.

use std::collections::VecDeque;

use super::error::{ErrorRecovery, ParseError, ParseResult};
use super::lexer::{is_built_in_identifier, LexErrorKind, Lexer, LexicalToken, Token};
use super::span::Span;
use crate::ast::*;
use crate::config::Config;
use crate::consts::{PARSER_GAS_PER_TOKEN, PARSER_MAX_DEPTH, PARSER_MIN_GAS};
use crate::diagnostics::ErrorCode;
use crate::source::Source;

/// Output of a full parse
#[derive(Debug)]
pub struct ParseOutput {
    pub unit: CompilationUnit,
    pub errors: Vec<ParseError>,
    /// Errors beyond the budget that were not recorded
    pub dropped: usize,
}

/// Parser for one compilation unit
pub struct Parser<'a> {
    pub(super) text: &'a str,
    source_name: String,
    pub(super) lexer: Lexer<'a>,
    /// Lookahead buffer; `buffer[0]` is the current token and is always present
    pub(super) buffer: VecDeque<LexicalToken<'a>>,
    /// End offset of the last consumed token
    pub(super) prev_end: usize,
    /// Furthest offset any finished node has reached; node ends never go below it
    pub(super) high_water: usize,
    consumed: usize,
    unit: u32,
    next_index: u32,
    pub(super) diet: bool,
    depth: usize,
    gas: usize,
    aborted: bool,
    pub(super) recovery: ErrorRecovery,
    pub(super) class_name: Option<String>,
    pub(super) seen_declaration: bool,
    pub(super) seen_library: bool,
}

impl<'a> Parser<'a> {
    /// Create a parser for `source`; `unit` namespaces the node ids it allocates
    pub fn new(source: &'a Source, unit: u32, config: &Config) -> Self {
        let text = source.text();
        let gas = PARSER_MIN_GAS.max(text.len().saturating_add(1).saturating_mul(PARSER_GAS_PER_TOKEN));
        let mut parser = Self {
            text,
            source_name: source.name().to_string(),
            lexer: Lexer::new(text),
            buffer: VecDeque::new(),
            prev_end: 0,
            high_water: 0,
            consumed: 0,
            unit,
            next_index: 0,
            diet: config.diet,
            depth: 0,
            gas,
            aborted: false,
            recovery: ErrorRecovery::new(config.max_errors),
            class_name: None,
            seen_declaration: false,
            seen_library: false,
        };
        parser.fill(0);
        parser
    }

    /// Parse the whole unit
    pub fn parse_compilation_unit(mut self) -> ParseOutput {
        log::debug!("parse start: {} ({} bytes, diet={})", self.source_name, self.text.len(), self.diet);
        let id = self.next_id();
        let mut directives = Vec::new();
        let mut declarations = Vec::new();

        loop {
            self.tick();
            if self.check(&Token::Eof) {
                break;
            }
            let before = self.position();
            if self.check(&Token::Hash) {
                if let Some(directive) = self.parse_directive() {
                    directives.push(directive);
                }
            } else {
                match self.parse_top_level_declaration() {
                    Ok(decl) => {
                        self.seen_declaration = true;
                        declarations.push(decl);
                    }
                    Err(e) => {
                        self.report_error(e);
                        self.synchronize_top_level();
                    }
                }
            }
            if self.position() == before {
                let e = ParseError::invalid(
                    ErrorCode::ExpectedTopLevelDeclaration(self.describe_current()),
                    self.current().span,
                );
                self.report_error(e);
                self.advance();
            }
        }

        let unit = CompilationUnit {
            id,
            span: Span::new(0, self.text.len()),
            source_name: self.source_name.clone(),
            directives,
            declarations,
            comments: self.lexer.take_comments(),
        };
        log::debug!(
            "parse end: {} declarations={} directives={} errors={} tokens={}",
            self.source_name,
            unit.declarations.len(),
            unit.directives.len(),
            self.recovery.len(),
            self.consumed
        );
        let dropped = self.recovery.dropped();
        ParseOutput { unit, errors: self.recovery.into_errors(), dropped }
    }

    // ---------------------------------------------------------------------
    // Token buffer
    // ---------------------------------------------------------------------

    fn fill(&mut self, n: usize) {
        while self.buffer.len() <= n {
            match self.lexer.next_token() {
                Some(token) => self.push_token(token),
                None => {
                    let end = self.lexer.end();
                    let eof = self
                        .buffer
                        .back()
                        .copied()
                        .filter(|t| t.token == Token::Eof)
                        .unwrap_or_else(|| LexicalToken::new(Token::Eof, "", Span::empty(end)));
                    self.buffer.push_back(eof);
                }
            }
        }
    }

    fn push_token(&mut self, mut token: LexicalToken<'a>) {
        if token.token == Token::Illegal {
            let kind = token.error.unwrap_or_default();
            self.recovery.add_error(ParseError::lexical(kind, token.lexeme, token.span));
            if kind != LexErrorKind::UnterminatedString {
                return;
            }
            token.token = Token::StringLiteral;
        }
        self.buffer.push_back(token);
    }

    pub(super) fn current(&self) -> &LexicalToken<'a> {
        &self.buffer[0]
    }

    pub(super) fn kind(&self) -> Token {
        self.buffer[0].token
    }

    pub(super) fn peek(&mut self, n: usize) -> LexicalToken<'a> {
        self.fill(n);
        self.buffer[n]
    }

    pub(super) fn peek_kind(&mut self, n: usize) -> Token {
        self.peek(n).token
    }

    /// Number of tokens consumed so far; used for forward-progress checks
    pub(super) fn position(&self) -> usize {
        self.consumed
    }

    pub(super) fn check(&self, token: &Token) -> bool {
        self.buffer[0].token == *token
    }

    pub(super) fn check_at(&mut self, n: usize, token: &Token) -> bool {
        self.peek_kind(n) == *token
    }

    /// Current token is the identifier `name` (used for built-in identifiers)
    pub(super) fn check_identifier(&self, name: &str) -> bool {
        let t = self.current();
        t.token == Token::Identifier && t.lexeme == name
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.check(&Token::Eof)
    }

    pub(super) fn advance(&mut self) -> LexicalToken<'a> {
        self.tick();
        let token = self.buffer[0];
        if token.token != Token::Eof {
            self.buffer.pop_front();
            self.fill(0);
            self.consumed += 1;
            self.prev_end = token.span.end();
            self.high_water = self.high_water.max(self.prev_end);
        }
        token
    }

    pub(super) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `token`, deleting one stray token in front of it if that helps
    pub(super) fn consume(&mut self, token: &Token, expected: &str) -> ParseResult<LexicalToken<'a>> {
        if self.check(token) {
            return Ok(self.advance());
        }
        if !self.is_at_end() && !is_structural(self.kind()) && self.peek_kind(1) == *token {
            let e = self.unexpected(expected);
            self.report_error(e);
            self.advance();
            return Ok(self.advance());
        }
        Err(self.unexpected(expected))
    }

    /// Like `consume`, but a missing token is reported and assumed inserted
    pub(super) fn expect(&mut self, token: &Token, expected: &str) -> bool {
        match self.consume(token, expected) {
            Ok(_) => true,
            Err(e) => {
                self.report_error(e);
                false
            }
        }
    }

    pub(super) fn expect_semicolon(&mut self) {
        if self.match_token(&Token::Semicolon) {
            return;
        }
        // report at the end of the previous token, where the ';' belongs
        let at = Span::empty(self.prev_end);
        let e = if self.is_at_end() {
            ParseError::unexpected_end_of_input("';'", at)
        } else {
            ParseError::unexpected_token("';'", &self.describe_current(), at)
        };
        self.report_error(e);
    }

    /// Split a `>>` token so that its first `>` closes a type argument list
    pub(super) fn split_shift(&mut self) {
        let token = self.buffer[0];
        let offset = token.span.offset + 1;
        let rest = token.lexeme.get(1..).unwrap_or(">");
        let mut gt = LexicalToken::new(Token::Gt, rest, Span::new(offset, 1));
        gt.newline_before = false;
        self.buffer[0] = gt;
        self.consumed += 1;
        self.prev_end = offset;
        self.high_water = self.high_water.max(offset);
    }

    // ---------------------------------------------------------------------
    // Limits
    // ---------------------------------------------------------------------

    pub(super) fn tick(&mut self) {
        if self.gas == 0 {
            self.abort_to_eof(ErrorCode::ParserGasExhausted);
        } else {
            self.gas -= 1;
        }
    }

    /// Increase nesting depth; false (after aborting the parse) when too deep
    pub(super) fn enter(&mut self) -> bool {
        self.depth += 1;
        if self.depth > PARSER_MAX_DEPTH {
            self.abort_to_eof(ErrorCode::NestingTooDeep);
            false
        } else {
            true
        }
    }

    pub(super) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Report `code` once and skip everything up to the end of input
    fn abort_to_eof(&mut self, code: ErrorCode) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        log::warn!("{}: {}; skipping rest of unit", self.source_name, code);
        let span = self.current().span;
        self.report(span, code);
        self.drain_to_eof();
    }

    pub(super) fn drain_to_eof(&mut self) {
        while self.lexer.next_token().is_some() {}
        let end = self.lexer.end();
        self.buffer.clear();
        self.buffer.push_back(LexicalToken::new(Token::Eof, "", Span::empty(end)));
    }

    pub(super) fn is_aborted(&self) -> bool {
        self.aborted
    }

    // ---------------------------------------------------------------------
    // Nodes and errors
    // ---------------------------------------------------------------------

    pub(super) fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(self.unit, self.next_index);
        self.next_index += 1;
        id
    }

    /// Offset of the current token, the start of a node about to be parsed
    pub(super) fn start_offset(&self) -> usize {
        self.current().span.offset
    }

    /// Span of a node that started at `start` and ends here
    pub(super) fn finish(&mut self, start: usize) -> Span {
        let end = self.high_water.max(start);
        self.high_water = end;
        Span::from_to(start, end)
    }

    /// Zero-length span at the current token for a synthetic node
    pub(super) fn synthetic_span(&mut self) -> Span {
        let at = self.start_offset();
        self.high_water = self.high_water.max(at);
        Span::empty(at)
    }

    pub(super) fn error_expr(&mut self) -> Expr {
        let span = self.synthetic_span();
        Expr { id: self.next_id(), span, kind: ExprKind::Error }
    }

    pub(super) fn report(&mut self, span: Span, code: ErrorCode) {
        self.recovery.add_error(ParseError::invalid(code, span));
    }

    pub(super) fn report_error(&mut self, error: ParseError) {
        self.recovery.add_error(error);
    }

    pub(super) fn describe_current(&self) -> String {
        let t = self.current();
        match t.token {
            Token::Identifier => format!("identifier '{}'", t.lexeme),
            Token::StringLiteral | Token::Integer | Token::HexInteger | Token::Double | Token::Eof => {
                t.token.describe().to_string()
            }
            _ => format!("'{}'", t.lexeme),
        }
    }

    pub(super) fn unexpected(&self, expected: &str) -> ParseError {
        let span = self.current().span;
        if self.is_at_end() {
            ParseError::unexpected_end_of_input(expected, span)
        } else {
            ParseError::unexpected_token(expected, &self.describe_current(), span)
        }
    }

    pub(super) fn identifier_from(&mut self, token: LexicalToken<'a>) -> Identifier {
        Identifier { id: self.next_id(), span: token.span, name: token.lexeme.to_string() }
    }

    pub(super) fn parse_identifier(&mut self, what: &str) -> ParseResult<Identifier> {
        if self.check(&Token::Identifier) {
            let token = self.advance();
            return Ok(self.identifier_from(token));
        }
        if self.is_at_end() {
            return Err(ParseError::unexpected_end_of_input(what, self.current().span));
        }
        Err(ParseError::invalid(ErrorCode::ExpectedIdentifier(self.describe_current()), self.current().span))
    }

    /// Doc comment between the previous token and the current one
    pub(super) fn doc_comment(&self) -> Option<Span> {
        let start = self.start_offset();
        self.lexer
            .comments()
            .iter()
            .rev()
            .skip_while(|c| c.span.offset >= start)
            .take_while(|c| c.span.offset >= self.prev_end)
            .find(|c| c.is_doc())
            .map(|c| c.span)
    }

    // ---------------------------------------------------------------------
    // Recovery
    // ---------------------------------------------------------------------

    /// Whether the current token starts a class, interface or typedef
    pub(super) fn at_type_declaration_start(&mut self) -> bool {
        if self.check(&Token::Class) || self.check(&Token::Hash) {
            return true;
        }
        if self.check_identifier("abstract") {
            return self.check_at(1, &Token::Class);
        }
        if self.check_identifier("interface") || self.check_identifier("typedef") {
            return self.peek_kind(1) == Token::Identifier || self.peek_kind(1) == Token::Void;
        }
        false
    }

    /// Skip to the next plausible top-level declaration
    pub(super) fn synchronize_top_level(&mut self) {
        let mut depth = 0usize;
        let mut skipped = 0usize;
        while !self.is_at_end() {
            self.tick();
            if depth == 0 && skipped > 0 {
                if self.at_type_declaration_start() {
                    return;
                }
                let t = *self.current();
                if t.newline_before
                    && matches!(t.token, Token::Identifier | Token::Var | Token::Final | Token::Const | Token::Void)
                {
                    return;
                }
            }
            match self.kind() {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    if depth <= 1 {
                        self.advance();
                        return;
                    }
                    depth -= 1;
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
            skipped += 1;
        }
    }

    /// Skip to the end of a broken class member
    pub(super) fn synchronize_member(&mut self) {
        let mut depth = 0usize;
        let mut skipped = 0usize;
        while !self.is_at_end() {
            self.tick();
            if depth == 0 {
                if self.check(&Token::RBrace) || self.at_type_declaration_start() {
                    return;
                }
                let t = *self.current();
                if skipped > 0 && t.newline_before && starts_member(t.token) {
                    return;
                }
            }
            match self.kind() {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
            skipped += 1;
        }
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn parse_top_level_declaration(&mut self) -> ParseResult<TopLevelDecl> {
        let doc = self.doc_comment();
        let start = self.start_offset();
        if self.check(&Token::Class) {
            return self.parse_class(start, doc, false, false).map(TopLevelDecl::Class);
        }
        if self.check_identifier("abstract") && self.check_at(1, &Token::Class) {
            self.advance();
            return self.parse_class(start, doc, false, true).map(TopLevelDecl::Class);
        }
        if self.check_identifier("interface") && self.check_at(1, &Token::Identifier) {
            return self.parse_class(start, doc, true, false).map(TopLevelDecl::Class);
        }
        if self.check_identifier("typedef") && matches!(self.peek_kind(1), Token::Identifier | Token::Void) {
            return self.parse_typedef(start, doc).map(TopLevelDecl::TypeAlias);
        }
        if !starts_member(self.kind()) {
            return Err(ParseError::invalid(
                ErrorCode::ExpectedTopLevelDeclaration(self.describe_current()),
                self.current().span,
            ));
        }
        match self.parse_member(start, doc)? {
            ClassMember::Field(f) => Ok(TopLevelDecl::Variables(f)),
            ClassMember::Method(m) => Ok(TopLevelDecl::Function(m)),
        }
    }

    /// `class`/`interface` declaration; the current token is `class` or `interface`
    fn parse_class(&mut self, start: usize, doc: Option<Span>, is_interface: bool, is_abstract: bool) -> ParseResult<ClassDecl> {
        self.advance();
        let name = self.parse_identifier("class name")?;
        if is_built_in_identifier(&name.name) {
            self.report(name.span, ErrorCode::BuiltInIdentifierAsType(name.name.clone()));
        }
        // A broken header still yields a class; the failed clause is left empty.
        let mut header_failed = false;
        let result = self.parse_type_parameters();
        let type_params = self.header_clause(result, &mut header_failed);

        let mut superclass = None;
        let mut interfaces = Vec::new();
        let mut default_class = None;
        if is_interface {
            if self.match_token(&Token::Extends) {
                let result = self.parse_type_list();
                interfaces = self.header_clause(result, &mut header_failed);
            }
            if self.check(&Token::Default) || self.check_identifier("factory") {
                self.advance();
                let result = self.parse_type().map(Some);
                default_class = self.header_clause(result, &mut header_failed);
            }
        } else {
            if self.match_token(&Token::Extends) {
                let result = self.parse_type().map(Some);
                superclass = self.header_clause(result, &mut header_failed);
            }
            if self.check_identifier("implements") {
                self.advance();
                let result = self.parse_type_list();
                interfaces = self.header_clause(result, &mut header_failed);
            }
        }

        // a missing '{' is assumed inserted; one report per broken header
        let opened = match self.consume(&Token::LBrace, "'{'") {
            Ok(_) => true,
            Err(e) => {
                if !header_failed {
                    self.report_error(e);
                }
                false
            }
        };
        let saved = self.class_name.replace(name.name.clone());
        let mut members = Vec::new();
        loop {
            self.tick();
            if self.check(&Token::RBrace) || self.is_at_end() {
                break;
            }
            if self.at_type_declaration_start() {
                // missing '}': leave the next declaration to the top level
                break;
            }
            let before = self.position();
            let member_doc = self.doc_comment();
            let member_start = self.start_offset();
            match self.parse_member(member_start, member_doc) {
                Ok(member) => members.push(member),
                Err(e) => {
                    self.report_error(e);
                    self.synchronize_member();
                }
            }
            if self.position() == before && !self.check(&Token::RBrace) && !self.at_type_declaration_start() {
                let e = ParseError::invalid(ErrorCode::ExpectedClassMember(self.describe_current()), self.current().span);
                self.report_error(e);
                self.advance();
            }
        }
        self.class_name = saved;
        if opened {
            self.expect(&Token::RBrace, "'}'");
        } else {
            self.match_token(&Token::RBrace);
        }

        Ok(ClassDecl {
            id: self.next_id(),
            span: self.finish(start),
            doc,
            is_interface,
            is_abstract,
            name,
            type_params,
            superclass,
            interfaces,
            default_class,
            members,
        })
    }

    /// Keep a parsed header clause, or report its error and skip to the next clause or the body
    fn header_clause<T: Default>(&mut self, result: ParseResult<T>, failed: &mut bool) -> T {
        let error = match result {
            Ok(value) => return value,
            Err(e) => e,
        };
        if !*failed {
            self.report_error(error);
        }
        *failed = true;
        while !self.is_at_end() {
            self.tick();
            if matches!(self.kind(), Token::LBrace | Token::RBrace | Token::Extends | Token::Default)
                || self.check_identifier("implements")
                || self.at_type_declaration_start()
            {
                break;
            }
            if self.current().newline_before && starts_member(self.kind()) {
                break;
            }
            self.advance();
        }
        T::default()
    }

    fn parse_typedef(&mut self, start: usize, doc: Option<Span>) -> ParseResult<FunctionTypeAlias> {
        self.advance();
        let return_type = if self.looks_like_type_then_name() { Some(self.parse_type()?) } else { None };
        let name = self.parse_identifier("typedef name")?;
        let type_params = self.parse_type_parameters()?;
        let params = self.parse_formal_parameters()?;
        self.expect_semicolon();
        Ok(FunctionTypeAlias {
            id: self.next_id(),
            span: self.finish(start),
            doc,
            return_type,
            name,
            type_params,
            params,
        })
    }

    /// Class member or top-level function/variable
    fn parse_member(&mut self, start: usize, doc: Option<Span>) -> ParseResult<ClassMember> {
        let modifiers = self.parse_modifiers();

        if self.check(&Token::Var) {
            self.advance();
            let name = self.parse_identifier("variable name")?;
            return self.parse_field_rest(start, doc, modifiers, None, name).map(ClassMember::Field);
        }
        if self.at_constructor(&modifiers) {
            return self.parse_constructor(start, doc, modifiers, None).map(ClassMember::Method);
        }
        if let Some(kind) = self.accessor_kind() {
            return self.parse_method(start, doc, modifiers, None, kind).map(ClassMember::Method);
        }

        let type_node = if self.looks_like_type_then_name() { Some(self.parse_type()?) } else { None };
        if type_node.is_some() && self.at_constructor(&modifiers) {
            return self.parse_constructor(start, doc, modifiers, type_node).map(ClassMember::Method);
        }
        if let Some(kind) = self.accessor_kind() {
            return self.parse_method(start, doc, modifiers, type_node, kind).map(ClassMember::Method);
        }
        if type_node.is_none() && !self.check(&Token::Identifier) {
            return Err(ParseError::invalid(
                ErrorCode::ExpectedClassMember(self.describe_current()),
                self.current().span,
            ));
        }
        if self.check(&Token::Identifier) && self.check_at(1, &Token::LParen) {
            return self.parse_method(start, doc, modifiers, type_node, MethodKind::Method).map(ClassMember::Method);
        }
        let name = self.parse_identifier("member name")?;
        self.parse_field_rest(start, doc, modifiers, type_node, name).map(ClassMember::Field)
    }

    pub(super) fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            match self.kind() {
                Token::Final => modifiers.is_final = true,
                Token::Const => modifiers.is_const = true,
                Token::Identifier => {
                    let continues = matches!(
                        self.peek_kind(1),
                        Token::Identifier | Token::Final | Token::Const | Token::Var | Token::Void
                    );
                    if !continues {
                        break;
                    }
                    match self.current().lexeme {
                        "static" => modifiers.is_static = true,
                        "abstract" => modifiers.is_abstract = true,
                        "factory" => modifiers.is_factory = true,
                        _ => break,
                    }
                }
                _ => break,
            }
            self.advance();
        }
        modifiers
    }

    /// `Name(`, `Name.named(` inside class `Name`, or any such head after `factory`
    fn at_constructor(&mut self, modifiers: &Modifiers) -> bool {
        if !self.check(&Token::Identifier) {
            return false;
        }
        let named_class = self.class_name.as_deref() == Some(self.current().lexeme);
        if !named_class && !modifiers.is_factory {
            return false;
        }
        match self.peek_kind(1) {
            Token::LParen => true,
            Token::Dot => self.peek_kind(2) == Token::Identifier && self.peek_kind(3) == Token::LParen,
            _ => false,
        }
    }

    /// Getter, setter or operator head at the current token
    fn accessor_kind(&mut self) -> Option<MethodKind> {
        if !self.check(&Token::Identifier) {
            return None;
        }
        let lexeme = self.current().lexeme;
        match lexeme {
            "get" if self.peek_kind(1) == Token::Identifier => {
                matches!(self.peek_kind(2), Token::LParen | Token::Arrow | Token::LBrace | Token::Semicolon)
                    .then_some(MethodKind::Getter)
            }
            "set" if self.peek_kind(1) == Token::Identifier => {
                (self.peek_kind(2) == Token::LParen).then_some(MethodKind::Setter)
            }
            "operator" => {
                let next = self.peek(1);
                let ok = next.token.is_user_definable_operator()
                    || next.token == Token::LBracket
                    || (next.token == Token::Identifier && next.lexeme == "negate");
                ok.then_some(MethodKind::Operator)
            }
            _ => None,
        }
    }

    fn parse_constructor(
        &mut self,
        start: usize,
        doc: Option<Span>,
        modifiers: Modifiers,
        return_type: Option<TypeNode>,
    ) -> ParseResult<MethodDecl> {
        let name = self.parse_identifier("constructor name")?;
        let constructor_name = if self.match_token(&Token::Dot) {
            Some(self.parse_identifier("constructor name")?)
        } else {
            None
        };
        let params = self.parse_formal_parameters()?;
        let initializers = if self.match_token(&Token::Colon) { self.parse_initializers()? } else { Vec::new() };
        let body = self.parse_function_body(true)?;
        Ok(MethodDecl {
            id: self.next_id(),
            span: self.finish(start),
            doc,
            modifiers,
            kind: MethodKind::Constructor,
            return_type,
            name,
            constructor_name,
            params,
            initializers,
            body,
        })
    }

    fn parse_method(
        &mut self,
        start: usize,
        doc: Option<Span>,
        modifiers: Modifiers,
        return_type: Option<TypeNode>,
        kind: MethodKind,
    ) -> ParseResult<MethodDecl> {
        let name = match kind {
            MethodKind::Getter | MethodKind::Setter => {
                self.advance();
                self.parse_identifier("accessor name")?
            }
            MethodKind::Operator => {
                self.advance();
                self.parse_operator_name()?
            }
            _ => self.parse_identifier("method name")?,
        };
        let params = if kind == MethodKind::Getter && !self.check(&Token::LParen) {
            Vec::new()
        } else {
            self.parse_formal_parameters()?
        };
        let body = self.parse_function_body(true)?;
        Ok(MethodDecl {
            id: self.next_id(),
            span: self.finish(start),
            doc,
            modifiers,
            kind,
            return_type,
            name,
            constructor_name: None,
            params,
            initializers: Vec::new(),
            body,
        })
    }

    /// Operator symbol after `operator`, as an identifier node
    fn parse_operator_name(&mut self) -> ParseResult<Identifier> {
        let start = self.start_offset();
        let name = if self.match_token(&Token::LBracket) {
            self.consume(&Token::RBracket, "']'")?;
            if self.match_token(&Token::Assign) { "[]=".to_string() } else { "[]".to_string() }
        } else if self.check_identifier("negate") || self.kind().is_user_definable_operator() {
            self.advance().lexeme.to_string()
        } else {
            return Err(self.unexpected("operator"));
        };
        Ok(Identifier { id: self.next_id(), span: self.finish(start), name })
    }

    fn parse_field_rest(
        &mut self,
        start: usize,
        doc: Option<Span>,
        modifiers: Modifiers,
        type_node: Option<TypeNode>,
        first: Identifier,
    ) -> ParseResult<FieldDecl> {
        let mut variables = vec![self.parse_declarator_rest(first)];
        while self.match_token(&Token::Comma) {
            let name = self.parse_identifier("variable name")?;
            variables.push(self.parse_declarator_rest(name));
        }
        self.expect_semicolon();
        Ok(FieldDecl { id: self.next_id(), span: self.finish(start), doc, modifiers, type_node, variables })
    }

    /// Optional `= init` after a declared name
    pub(super) fn parse_declarator_rest(&mut self, name: Identifier) -> VarDeclarator {
        let start = name.span.offset;
        let init = if self.match_token(&Token::Assign) { Some(self.parse_expression_without_cascade()) } else { None };
        VarDeclarator { id: self.next_id(), span: self.finish(start), name, init }
    }

    fn parse_initializers(&mut self) -> ParseResult<Vec<Initializer>> {
        let mut initializers = Vec::new();
        loop {
            self.tick();
            let start = self.start_offset();
            let kind = if self.match_token(&Token::Super) {
                let name = if self.match_token(&Token::Dot) { Some(self.parse_identifier("constructor name")?) } else { None };
                let args = self.parse_arguments()?;
                InitializerKind::Super { name, args }
            } else if self.match_token(&Token::This) {
                if self.check(&Token::LParen) {
                    InitializerKind::Redirect { name: None, args: self.parse_arguments()? }
                } else {
                    self.consume(&Token::Dot, "'.'")?;
                    let name = self.parse_identifier("field or constructor name")?;
                    if self.check(&Token::LParen) {
                        InitializerKind::Redirect { name: Some(name), args: self.parse_arguments()? }
                    } else {
                        self.consume(&Token::Assign, "'='")?;
                        let value = self.parse_expression_without_cascade();
                        InitializerKind::Field { explicit_this: true, name, value }
                    }
                }
            } else {
                let name = self.parse_identifier("field name")?;
                self.consume(&Token::Assign, "'='")?;
                let value = self.parse_expression_without_cascade();
                InitializerKind::Field { explicit_this: false, name, value }
            };
            initializers.push(Initializer { id: self.next_id(), span: self.finish(start), kind });
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(initializers)
    }

    /// Body of a function; `declaration` bodies end with `;` after `=>` and may be skipped in diet mode
    pub(super) fn parse_function_body(&mut self, declaration: bool) -> ParseResult<FunctionBody> {
        if self.check(&Token::LBrace) {
            if self.diet && declaration {
                return Ok(self.skip_block_body());
            }
            return Ok(FunctionBody::Block(self.parse_block()));
        }
        if self.match_token(&Token::Arrow) {
            if self.diet && declaration {
                let span = self.skip_expression_body();
                self.expect_semicolon();
                return Ok(FunctionBody::Skipped(span));
            }
            let expr = self.parse_expression();
            if declaration {
                self.expect_semicolon();
            }
            return Ok(FunctionBody::Expression(Box::new(expr)));
        }
        if declaration && self.check_identifier("native") {
            self.advance();
            let name = if self.check(&Token::StringLiteral) {
                let token = self.advance();
                let mut errors = Vec::new();
                let parts = super::strings::decode(token.lexeme, token.span.offset, &mut errors);
                Some(parts.strings.concat())
            } else {
                None
            };
            self.expect_semicolon();
            return Ok(FunctionBody::Native(name));
        }
        if declaration && self.match_token(&Token::Semicolon) {
            return Ok(FunctionBody::None);
        }
        Err(self.unexpected("function body"))
    }

    /// Diet mode: skip a balanced `{ ... }` body
    fn skip_block_body(&mut self) -> FunctionBody {
        let start = self.start_offset();
        self.advance();
        let mut depth = 1usize;
        loop {
            match self.kind() {
                Token::Eof | Token::Class => {
                    let e = self.unexpected("'}'");
                    self.report_error(e);
                    break;
                }
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }
        FunctionBody::Skipped(Span::from_to(start, self.prev_end.max(start)))
    }

    /// Diet mode: skip an `=> expr` body up to its `;`
    fn skip_expression_body(&mut self) -> Span {
        let start = self.start_offset();
        let mut depth = 0usize;
        loop {
            match self.kind() {
                Token::Eof | Token::Class => break,
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::Semicolon if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
        Span::from_to(start, self.prev_end.max(start))
    }

    // ---------------------------------------------------------------------
    // Parameters and types
    // ---------------------------------------------------------------------

    pub(super) fn parse_formal_parameters(&mut self) -> ParseResult<Vec<Parameter>> {
        self.consume(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        let mut optional = false;
        while !self.check(&Token::RParen) && !self.is_at_end() {
            self.tick();
            if !optional && self.match_token(&Token::LBracket) {
                optional = true;
                continue;
            }
            params.push(self.parse_formal_parameter(optional)?);
            if optional && self.match_token(&Token::RBracket) {
                self.match_token(&Token::Comma);
                break;
            }
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'");
        Ok(params)
    }

    pub(super) fn parse_formal_parameter(&mut self, optional: bool) -> ParseResult<Parameter> {
        let start = self.start_offset();
        let mut modifiers = Modifiers::default();
        if self.match_token(&Token::Final) {
            modifiers.is_final = true;
        } else if self.match_token(&Token::Const) {
            modifiers.is_const = true;
        } else {
            self.match_token(&Token::Var);
        }

        let mut type_node = None;
        let mut is_field = false;
        if self.match_token(&Token::This) {
            self.consume(&Token::Dot, "'.'")?;
            is_field = true;
        } else if self.looks_like_type_then_name()
            || (self.check(&Token::Identifier) && self.check_at(1, &Token::This))
        {
            type_node = Some(self.parse_type()?);
            if self.match_token(&Token::This) {
                self.consume(&Token::Dot, "'.'")?;
                is_field = true;
            }
        }

        let name = self.parse_identifier("parameter name")?;
        let function_params = if self.check(&Token::LParen) { Some(self.parse_formal_parameters()?) } else { None };
        let default = if optional && self.match_token(&Token::Assign) {
            Some(self.parse_expression_without_cascade())
        } else {
            None
        };
        Ok(Parameter {
            id: self.next_id(),
            span: self.finish(start),
            modifiers,
            type_node,
            name,
            is_field,
            is_optional: optional,
            default,
            function_params,
        })
    }

    pub(super) fn parse_type(&mut self) -> ParseResult<TypeNode> {
        let start = self.start_offset();
        if self.check(&Token::Void) {
            let token = self.advance();
            let name = self.identifier_from(token);
            return Ok(TypeNode { id: self.next_id(), span: self.finish(start), prefix: None, name, type_args: Vec::new() });
        }
        let first = match self.parse_identifier("type") {
            Ok(first) => first,
            Err(_) => {
                return Err(ParseError::invalid(ErrorCode::ExpectedType(self.describe_current()), self.current().span))
            }
        };
        let (prefix, name) = if self.check(&Token::Dot) && self.check_at(1, &Token::Identifier) {
            self.advance();
            (Some(first), self.parse_identifier("type")?)
        } else {
            (None, first)
        };
        if prefix.is_none() && is_built_in_identifier(&name.name) {
            self.report(name.span, ErrorCode::BuiltInIdentifierAsType(name.name.clone()));
        }
        let type_args = if self.check(&Token::Lt) { self.parse_type_arguments()? } else { Vec::new() };
        Ok(TypeNode { id: self.next_id(), span: self.finish(start), prefix, name, type_args })
    }

    pub(super) fn parse_type_arguments(&mut self) -> ParseResult<Vec<TypeNode>> {
        self.consume(&Token::Lt, "'<'")?;
        let mut args = Vec::new();
        loop {
            self.tick();
            args.push(self.parse_type()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        if self.check(&Token::RShift) {
            self.split_shift();
        } else {
            self.consume(&Token::Gt, "'>'")?;
        }
        Ok(args)
    }

    fn parse_type_list(&mut self) -> ParseResult<Vec<TypeNode>> {
        let mut types = vec![self.parse_type()?];
        while self.match_token(&Token::Comma) {
            types.push(self.parse_type()?);
        }
        Ok(types)
    }

    fn parse_type_parameters(&mut self) -> ParseResult<Vec<TypeParameter>> {
        if !self.match_token(&Token::Lt) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            self.tick();
            let start = self.start_offset();
            let name = self.parse_identifier("type parameter")?;
            let bound = if self.match_token(&Token::Extends) { Some(self.parse_type()?) } else { None };
            params.push(TypeParameter { id: self.next_id(), span: self.finish(start), name, bound });
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        if self.check(&Token::RShift) {
            self.split_shift();
        } else {
            self.consume(&Token::Gt, "'>'")?;
        }
        Ok(params)
    }

    /// Bounded lookahead: does a type followed by a name start here?
    pub(super) fn looks_like_type_then_name(&mut self) -> bool {
        if self.check(&Token::Void) {
            return self.peek_kind(1) == Token::Identifier;
        }
        self.type_end(0).map_or(false, |i| self.peek_kind(i) == Token::Identifier)
    }

    /// Index just past a type starting at lookahead position `i`, if one is there
    pub(super) fn type_end(&mut self, mut i: usize) -> Option<usize> {
        if self.peek_kind(i) != Token::Identifier {
            return None;
        }
        i += 1;
        if self.peek_kind(i) == Token::Dot && self.peek_kind(i + 1) == Token::Identifier {
            i += 2;
        }
        if self.peek_kind(i) != Token::Lt {
            return Some(i);
        }
        let mut depth: i32 = 0;
        let limit = i + 64;
        loop {
            match self.peek_kind(i) {
                Token::Lt => depth += 1,
                Token::Gt => depth -= 1,
                Token::RShift => depth -= 2,
                Token::Identifier | Token::Comma | Token::Dot | Token::Extends | Token::Void => {}
                _ => return None,
            }
            i += 1;
            if depth <= 0 {
                return (depth == 0).then_some(i);
            }
            if i > limit {
                return None;
            }
        }
    }
}

/// Tokens recovery never deletes
fn is_structural(token: Token) -> bool {
    matches!(
        token,
        Token::LBrace | Token::RBrace | Token::LParen | Token::RParen | Token::Semicolon | Token::Class | Token::Eof
    )
}

/// Tokens that can begin a class member or top-level function/variable
fn starts_member(token: Token) -> bool {
    matches!(token, Token::Identifier | Token::Var | Token::Final | Token::Const | Token::Void)
}

/// Parse `source` as unit 0 with the given configuration
pub fn parse(source: &Source, config: &Config) -> ParseOutput {
    Parser::new(source, 0, config).parse_compilation_unit()
}
