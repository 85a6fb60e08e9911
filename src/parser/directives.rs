//! `#library`, `#import`, `#source`, `#native` and `#resource` directives

use super::lexer::Token;
use super::parser::Parser;
use super::strings;
use crate::ast::{CompilationUnit, Directive, DirectiveKind};
use crate::diagnostics::ErrorCode;

impl<'a> Parser<'a> {
    /// `#name("value"[, prefix: "p"]);`; the current token is `#`
    pub(super) fn parse_directive(&mut self) -> Option<Directive> {
        let start = self.start_offset();
        self.advance();
        let name = match self.parse_identifier("directive name") {
            Ok(name) => name,
            Err(e) => {
                self.report_error(e);
                self.skip_directive();
                return None;
            }
        };
        let Some(kind) = DirectiveKind::from_name(&name.name) else {
            self.report(name.span, ErrorCode::UnknownDirective(name.name.clone()));
            self.skip_directive();
            return None;
        };

        self.expect(&Token::LParen, "'('");
        let value = self.parse_directive_string().unwrap_or_default();
        let mut prefix = None;
        if self.match_token(&Token::Comma) {
            if self.check_identifier("prefix") {
                self.advance();
                self.expect(&Token::Colon, "':'");
                prefix = self.parse_directive_string();
            } else {
                let e = self.unexpected("'prefix'");
                self.report_error(e);
                self.parse_expression_without_cascade();
            }
        }
        self.expect(&Token::RParen, "')'");
        self.expect_semicolon();
        let span = self.finish(start);

        if self.seen_declaration {
            self.report(span, ErrorCode::DirectiveAfterDeclaration);
        }
        if kind == DirectiveKind::Library {
            if self.seen_library {
                self.report(span, ErrorCode::DuplicateLibraryDirective);
            }
            self.seen_library = true;
        }
        Some(Directive { id: self.next_id(), span, kind, value, prefix })
    }

    /// A plain string literal argument; anything else is reported and skipped
    fn parse_directive_string(&mut self) -> Option<String> {
        if !self.check(&Token::StringLiteral) {
            let span = self.current().span;
            self.report(span, ErrorCode::DirectiveArgumentNotString);
            if !matches!(self.kind(), Token::RParen | Token::Comma | Token::Semicolon) {
                self.parse_expression_without_cascade();
            }
            return None;
        }
        let mut value = String::new();
        let mut errors = Vec::new();
        let start = self.start_offset();
        let mut interpolated = false;
        while self.check(&Token::StringLiteral) {
            let token = self.advance();
            let parts = strings::decode(token.lexeme, token.span.offset, &mut errors);
            interpolated |= !parts.holes.is_empty();
            value.push_str(&parts.strings.concat());
        }
        for (code, span) in errors {
            self.report(span, code);
        }
        if interpolated {
            let span = self.finish(start);
            self.report(span, ErrorCode::DirectiveArgumentNotString);
        }
        Some(value)
    }

    fn skip_directive(&mut self) {
        while !self.is_at_end() && !self.check(&Token::Semicolon) {
            if self.check(&Token::Hash) || (self.current().newline_before && self.at_type_declaration_start()) {
                return;
            }
            self.advance();
        }
        self.match_token(&Token::Semicolon);
    }
}

/// An import as listed in a library's directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryImport {
    pub path: String,
    pub prefix: Option<String>,
}

/// Directive summary of one unit, used to discover the rest of a library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryUnit {
    pub name: Option<String>,
    pub imports: Vec<LibraryImport>,
    pub sources: Vec<String>,
    pub natives: Vec<String>,
    pub resources: Vec<String>,
}

impl LibraryUnit {
    /// Collect the directives of a parsed unit
    pub fn from_unit(unit: &CompilationUnit) -> Self {
        Self::from_directives(&unit.directives)
    }

    /// Collect a directive list, e.g. from a directives-only parse
    pub fn from_directives(directives: &[Directive]) -> Self {
        let mut library = LibraryUnit::default();
        for directive in directives {
            let value = directive.value.clone();
            match directive.kind {
                DirectiveKind::Library => {
                    if library.name.is_none() {
                        library.name = Some(value);
                    }
                }
                DirectiveKind::Import => {
                    library.imports.push(LibraryImport { path: value, prefix: directive.prefix.clone() })
                }
                DirectiveKind::Source => library.sources.push(value),
                DirectiveKind::Native => library.natives.push(value),
                DirectiveKind::Resource => library.resources.push(value),
            }
        }
        library
    }

    /// Whether the unit declares itself a library
    pub fn is_library(&self) -> bool {
        self.name.is_some()
    }
}

/// Result of parsing only the leading directives of a unit
#[derive(Debug)]
pub struct DirectivesOutput {
    pub directives: Vec<Directive>,
    pub errors: Vec<super::error::ParseError>,
}

impl<'a> Parser<'a> {
    /// Parse the leading directive list and stop at the first declaration
    pub fn parse_directives(mut self) -> DirectivesOutput {
        let mut directives = Vec::new();
        while self.check(&Token::Hash) {
            self.tick();
            let before = self.position();
            if let Some(directive) = self.parse_directive() {
                directives.push(directive);
            }
            if self.position() == before {
                break;
            }
        }
        log::debug!("parsed {} leading directives", directives.len());
        DirectivesOutput { directives, errors: self.recovery.into_errors() }
    }
}
