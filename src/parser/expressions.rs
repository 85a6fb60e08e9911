//! Expression parsing
//!
//! Expressions never fail outright: problems are reported and an
//! `ExprKind::Error` node stands in for the missing piece.

use super::lexer::{Lexer, Token};
use super::parser::Parser;
use super::span::Span;
use super::strings::{self, Hole, StringParts};
use crate::ast::*;
use crate::diagnostics::ErrorCode;

/// Lookahead limit when deciding whether `(` starts a function literal
const MAX_PAREN_SCAN: usize = 256;

impl<'a> Parser<'a> {
    /// Full expression, cascades included
    pub(super) fn parse_expression(&mut self) -> Expr {
        self.parse_expression_inner(true)
    }

    /// Expression where a trailing `..` belongs to an enclosing construct
    pub(super) fn parse_expression_without_cascade(&mut self) -> Expr {
        self.parse_expression_inner(false)
    }

    fn parse_expression_inner(&mut self, cascade: bool) -> Expr {
        if !self.enter() {
            return self.error_expr();
        }
        let start = self.start_offset();
        let target = self.parse_conditional();
        let expr = if let Some(op) = assign_op(self.kind()) {
            self.advance();
            self.check_assignable(&target);
            let value = self.parse_expression_inner(cascade);
            let span = self.finish(start);
            Expr {
                id: self.next_id(),
                span,
                kind: ExprKind::Assign { op, target: Box::new(target), value: Box::new(value) },
            }
        } else if cascade && self.check(&Token::DotDot) {
            self.parse_cascade(start, target)
        } else {
            target
        };
        self.exit();
        expr
    }

    fn check_assignable(&mut self, target: &Expr) {
        if !target.is_assignable() && !target.is_error() {
            self.report(target.span, ErrorCode::IllegalAssignmentTarget);
        }
    }

    /// `target..a()..b = 1`
    fn parse_cascade(&mut self, start: usize, target: Expr) -> Expr {
        let mut sections = Vec::new();
        while self.check(&Token::DotDot) {
            self.tick();
            let section_start = self.start_offset();
            self.advance();
            let receiver = Expr {
                id: self.next_id(),
                span: Span::empty(section_start),
                kind: ExprKind::CascadeReceiver,
            };
            let head = match self.parse_identifier("member name") {
                Ok(name) => self.parse_member_selector(section_start, receiver, name),
                Err(e) => {
                    self.report_error(e);
                    receiver
                }
            };
            let section = self.parse_selectors(section_start, head);
            let section = if let Some(op) = assign_op(self.kind()) {
                self.advance();
                self.check_assignable(&section);
                let value = self.parse_expression_without_cascade();
                let span = self.finish(section_start);
                Expr {
                    id: self.next_id(),
                    span,
                    kind: ExprKind::Assign { op, target: Box::new(section), value: Box::new(value) },
                }
            } else {
                section
            };
            sections.push(section);
        }
        let span = self.finish(start);
        Expr { id: self.next_id(), span, kind: ExprKind::Cascade { target: Box::new(target), sections } }
    }

    fn parse_conditional(&mut self) -> Expr {
        let start = self.start_offset();
        let cond = self.parse_binary(1);
        if !self.match_token(&Token::Question) {
            return cond;
        }
        let then_expr = self.parse_expression_without_cascade();
        self.expect(&Token::Colon, "':'");
        let else_expr = self.parse_expression_without_cascade();
        let span = self.finish(start);
        Expr {
            id: self.next_id(),
            span,
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
        }
    }

    /// Precedence climbing over binary operators; `is` binds at relational level
    ///
    /// Relational operators do not associate: `a < b < c` is reported and
    /// then parsed left to right.
    fn parse_binary(&mut self, min_prec: u8) -> Expr {
        let start = self.start_offset();
        let mut left = self.parse_unary();
        let mut relational_left = false;
        loop {
            self.tick();
            if self.check(&Token::Is) && min_prec <= RELATIONAL {
                self.check_non_associative(relational_left);
                relational_left = true;
                self.advance();
                let negated = self.match_token(&Token::Bang);
                let type_node = match self.parse_type() {
                    Ok(t) => t,
                    Err(e) => {
                        self.report_error(e);
                        return left;
                    }
                };
                let span = self.finish(start);
                left = Expr {
                    id: self.next_id(),
                    span,
                    kind: ExprKind::Is { expr: Box::new(left), type_node, negated },
                };
                continue;
            }
            let Some(op) = binary_op(self.kind()) else { break };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            if prec == RELATIONAL {
                self.check_non_associative(relational_left);
            }
            relational_left = prec == RELATIONAL;
            self.advance();
            let right = self.parse_binary(prec + 1);
            let span = self.finish(start);
            left = Expr {
                id: self.next_id(),
                span,
                kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
            };
        }
        left
    }

    fn check_non_associative(&mut self, relational_left: bool) {
        if relational_left {
            let token = *self.current();
            self.report(token.span, ErrorCode::NonAssociativeOperator(token.lexeme.to_string()));
        }
    }

    fn parse_unary(&mut self) -> Expr {
        let op = match self.kind() {
            Token::Minus => Some(UnaryOp::Neg),
            Token::Bang => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::BitNot),
            Token::Inc => Some(UnaryOp::Inc),
            Token::Dec => Some(UnaryOp::Dec),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix();
        };
        if !self.enter() {
            return self.error_expr();
        }
        let start = self.start_offset();
        self.advance();
        let operand = self.parse_unary();
        if matches!(op, UnaryOp::Inc | UnaryOp::Dec) {
            self.check_assignable(&operand);
        }
        let span = self.finish(start);
        self.exit();
        Expr { id: self.next_id(), span, kind: ExprKind::Unary { op, prefix: true, operand: Box::new(operand) } }
    }

    fn parse_postfix(&mut self) -> Expr {
        let start = self.start_offset();
        let primary = self.parse_primary();
        let mut expr = self.parse_selectors(start, primary);
        while matches!(self.kind(), Token::Inc | Token::Dec) {
            let op = if self.check(&Token::Inc) { UnaryOp::Inc } else { UnaryOp::Dec };
            self.advance();
            self.check_assignable(&expr);
            let span = self.finish(start);
            expr = Expr { id: self.next_id(), span, kind: ExprKind::Unary { op, prefix: false, operand: Box::new(expr) } };
        }
        expr
    }

    /// `.name`, `.name(args)`, `[index]` and `(args)` after a primary
    pub(super) fn parse_selectors(&mut self, start: usize, mut expr: Expr) -> Expr {
        loop {
            self.tick();
            match self.kind() {
                Token::Dot => {
                    self.advance();
                    match self.parse_identifier("member name") {
                        Ok(name) => expr = self.parse_member_selector(start, expr, name),
                        Err(e) => {
                            self.report_error(e);
                            return expr;
                        }
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expression();
                    self.expect(&Token::RBracket, "']'");
                    let span = self.finish(start);
                    expr = Expr {
                        id: self.next_id(),
                        span,
                        kind: ExprKind::Index { target: Box::new(expr), index: Box::new(index) },
                    };
                }
                Token::LParen => {
                    let args = self.parse_arguments_or_empty();
                    let span = self.finish(start);
                    let callee_name = match &expr.kind {
                        ExprKind::Identifier(name) => Some(name.clone()),
                        _ => None,
                    };
                    let kind = match callee_name {
                        Some(name) => {
                            let name = Identifier { id: self.next_id(), span: expr.span, name };
                            ExprKind::MethodCall { target: None, name, args }
                        }
                        None => ExprKind::FunctionCall { callee: Box::new(expr), args },
                    };
                    expr = Expr { id: self.next_id(), span, kind };
                }
                _ => return expr,
            }
        }
    }

    /// `target.name` or `target.name(args)`
    fn parse_member_selector(&mut self, start: usize, target: Expr, name: Identifier) -> Expr {
        let kind = if self.check(&Token::LParen) {
            let args = self.parse_arguments_or_empty();
            ExprKind::MethodCall { target: Some(Box::new(target)), name, args }
        } else {
            ExprKind::PropertyAccess { target: Box::new(target), name }
        };
        let span = self.finish(start);
        Expr { id: self.next_id(), span, kind }
    }

    pub(super) fn parse_arguments(&mut self) -> super::error::ParseResult<Vec<Expr>> {
        self.consume(&Token::LParen, "'('")?;
        Ok(self.parse_argument_list())
    }

    fn parse_arguments_or_empty(&mut self) -> Vec<Expr> {
        self.advance();
        self.parse_argument_list()
    }

    /// Arguments after an already consumed `(`, through the closing `)`
    fn parse_argument_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        while !self.check(&Token::RParen) && !self.is_at_end() {
            let before = self.position();
            args.push(self.parse_expression());
            if !self.match_token(&Token::Comma) || self.position() == before {
                break;
            }
        }
        self.expect(&Token::RParen, "')'");
        args
    }

    fn parse_primary(&mut self) -> Expr {
        let start = self.start_offset();
        let kind = match self.kind() {
            Token::Null => {
                self.advance();
                ExprKind::Null
            }
            Token::True | Token::False => ExprKind::Bool(self.advance().token == Token::True),
            Token::This => {
                self.advance();
                ExprKind::This
            }
            Token::Super => {
                self.advance();
                ExprKind::Super
            }
            Token::Integer | Token::HexInteger => self.parse_integer(),
            Token::Double => {
                let token = self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(value) => ExprKind::Double { value, text: token.lexeme.to_string() },
                    Err(_) => {
                        self.report(token.span, ErrorCode::MalformedNumber(token.lexeme.to_string()));
                        ExprKind::Error
                    }
                }
            }
            Token::StringLiteral => return self.parse_string_literal(),
            Token::Identifier => {
                let token = self.advance();
                ExprKind::Identifier(token.lexeme.to_string())
            }
            Token::New => return self.parse_new(false),
            Token::Const => match self.peek_kind(1) {
                Token::LBracket | Token::LBrace | Token::Lt => return self.parse_collection(),
                _ => return self.parse_new(true),
            },
            Token::LBracket | Token::LBrace | Token::Lt => return self.parse_collection(),
            Token::LParen => {
                if self.at_function_literal() {
                    return self.parse_function_literal();
                }
                self.advance();
                let inner = self.parse_expression();
                self.expect(&Token::RParen, "')'");
                ExprKind::Paren(Box::new(inner))
            }
            _ => {
                let e = super::error::ParseError::invalid(
                    ErrorCode::ExpectedExpression(self.describe_current()),
                    self.current().span,
                );
                self.report_error(e);
                return self.error_expr();
            }
        };
        let span = self.finish(start);
        Expr { id: self.next_id(), span, kind }
    }

    fn parse_integer(&mut self) -> ExprKind {
        let token = self.advance();
        let (digits, radix) = match token.token {
            Token::HexInteger => (&token.lexeme[2..], 16),
            _ => (token.lexeme, 10),
        };
        // range is checked where a value is needed, during constant folding
        let value = i64::from_str_radix(digits, radix).ok();
        ExprKind::Int { value, text: token.lexeme.to_string(), radix }
    }

    /// One or more adjacent string literals, joined into a single value
    fn parse_string_literal(&mut self) -> Expr {
        let start = self.start_offset();
        let mut parts: Option<StringParts> = None;
        let mut errors = Vec::new();
        while self.check(&Token::StringLiteral) {
            let token = self.advance();
            let decoded = strings::decode(token.lexeme, token.span.offset, &mut errors);
            match parts.as_mut() {
                Some(parts) => parts.append(decoded),
                None => parts = Some(decoded),
            }
        }
        for (code, span) in errors {
            self.report(span, code);
        }
        let parts = parts.unwrap_or_default();
        let kind = if parts.holes.is_empty() {
            ExprKind::String(parts.strings.concat())
        } else {
            let exprs = parts.holes.into_iter().map(|hole| self.parse_hole(hole)).collect();
            ExprKind::Interpolation { strings: parts.strings, exprs }
        };
        let span = self.finish(start);
        Expr { id: self.next_id(), span, kind }
    }

    /// Parse one interpolation hole by re-lexing its text in place
    fn parse_hole(&mut self, hole: Hole) -> Expr {
        let (start, end) = match hole {
            Hole::Identifier { name, span } => {
                let kind = if name == "this" { ExprKind::This } else { ExprKind::Identifier(name) };
                return Expr { id: self.next_id(), span, kind };
            }
            Hole::Expr { start, end } => (start, end),
        };

        let inner = Lexer::with_range(self.text, start, end);
        let saved_lexer = std::mem::replace(&mut self.lexer, inner);
        let saved_buffer = std::mem::take(&mut self.buffer);
        let (saved_prev, saved_high) = (self.prev_end, self.high_water);
        self.prev_end = start;
        self.high_water = start;
        let _ = self.peek(0);

        let expr = self.parse_expression();
        if !self.is_at_end() {
            let e = self.unexpected("'}'");
            self.report_error(e);
        }

        self.lexer = saved_lexer;
        self.buffer = saved_buffer;
        self.prev_end = saved_prev;
        self.high_water = saved_high;
        if self.is_aborted() {
            self.drain_to_eof();
        }
        expr
    }

    /// `new T(...)`, `new T.named(...)`, `const T(...)`
    fn parse_new(&mut self, is_const: bool) -> Expr {
        let start = self.start_offset();
        self.advance();
        let type_start = self.start_offset();
        let first = match self.parse_identifier("type") {
            Ok(first) => first,
            Err(e) => {
                self.report_error(e);
                return self.error_expr();
            }
        };
        let mut second = None;
        if self.check(&Token::Dot) && self.check_at(1, &Token::Identifier) {
            self.advance();
            second = self.parse_identifier("type").ok();
        }
        let type_args = if self.check(&Token::Lt) {
            match self.parse_type_arguments() {
                Ok(args) => args,
                Err(e) => {
                    self.report_error(e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        // `p.T<A>`, `p.T.c`: prefixed type; `T.c` without type arguments: named constructor
        let explicit_ctor = self.check(&Token::Dot);
        let (prefix, name, mut constructor) = match second {
            Some(second) if !type_args.is_empty() || explicit_ctor => (Some(first), second, None),
            Some(second) => (None, first, Some(second)),
            None => (None, first, None),
        };
        let type_end = match &constructor {
            Some(_) => name.span.end(),
            None => self.prev_end,
        };
        if explicit_ctor {
            self.advance();
            match self.parse_identifier("constructor name") {
                Ok(ctor) => constructor = Some(ctor),
                Err(e) => self.report_error(e),
            }
        }
        let type_span = Span::from_to(type_start, type_end.max(type_start));
        let type_node = TypeNode { id: self.next_id(), span: type_span, prefix, name, type_args };

        let args = if self.check(&Token::LParen) {
            self.parse_arguments_or_empty()
        } else {
            let e = self.unexpected("'('");
            self.report_error(e);
            Vec::new()
        };
        let span = self.finish(start);
        Expr { id: self.next_id(), span, kind: ExprKind::New { is_const, type_node, constructor, args } }
    }

    /// List or map literal, optionally `const` and with type arguments
    fn parse_collection(&mut self) -> Expr {
        let start = self.start_offset();
        let is_const = self.match_token(&Token::Const);
        let type_args = if self.check(&Token::Lt) {
            match self.parse_type_arguments() {
                Ok(args) => args,
                Err(e) => {
                    self.report_error(e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let kind = match self.kind() {
            Token::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&Token::RBracket) && !self.is_at_end() {
                    let before = self.position();
                    elements.push(self.parse_expression());
                    if !self.match_token(&Token::Comma) || self.position() == before {
                        break;
                    }
                }
                self.expect(&Token::RBracket, "']'");
                ExprKind::List { is_const, type_args, elements }
            }
            Token::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(&Token::RBrace) && !self.is_at_end() {
                    let before = self.position();
                    let entry_start = self.start_offset();
                    let key = self.parse_expression();
                    self.expect(&Token::Colon, "':'");
                    let value = self.parse_expression();
                    let span = self.finish(entry_start);
                    entries.push(MapEntry { id: self.next_id(), span, key, value });
                    if !self.match_token(&Token::Comma) || self.position() == before {
                        break;
                    }
                }
                self.expect(&Token::RBrace, "'}'");
                ExprKind::Map { is_const, type_args, entries }
            }
            _ => {
                let e = self.unexpected("'[' or '{'");
                self.report_error(e);
                ExprKind::Error
            }
        };
        let span = self.finish(start);
        Expr { id: self.next_id(), span, kind }
    }

    /// `(` whose matching `)` is followed by `{` or `=>`
    pub(super) fn at_function_literal(&mut self) -> bool {
        self.paren_then_body(0)
    }

    /// Whether the parenthesized group at lookahead `i` is followed by a body
    pub(super) fn paren_then_body(&mut self, mut i: usize) -> bool {
        if self.peek_kind(i) != Token::LParen {
            return false;
        }
        let limit = i + MAX_PAREN_SCAN;
        let mut depth = 0usize;
        loop {
            match self.peek_kind(i) {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.peek_kind(i + 1), Token::LBrace | Token::Arrow);
                    }
                }
                Token::Eof | Token::Semicolon | Token::LBrace | Token::RBrace => return false,
                _ => {}
            }
            i += 1;
            if i > limit {
                return false;
            }
        }
    }

    fn parse_function_literal(&mut self) -> Expr {
        let start = self.start_offset();
        let params = match self.parse_formal_parameters() {
            Ok(params) => params,
            Err(e) => {
                self.report_error(e);
                Vec::new()
            }
        };
        let body = match self.parse_function_body(false) {
            Ok(body) => body,
            Err(e) => {
                self.report_error(e);
                FunctionBody::None
            }
        };
        let span = self.finish(start);
        let function = FunctionExpr { return_type: None, name: None, params, body };
        Expr { id: self.next_id(), span, kind: ExprKind::Function(Box::new(function)) }
    }
}

const RELATIONAL: u8 = 4;

fn binary_op(token: Token) -> Option<BinaryOp> {
    Some(match token {
        Token::PipePipe => BinaryOp::Or,
        Token::AndAnd => BinaryOp::And,
        Token::Eq => BinaryOp::Eq,
        Token::Ne => BinaryOp::Ne,
        Token::EqStrict => BinaryOp::EqStrict,
        Token::NeStrict => BinaryOp::NeStrict,
        Token::Lt => BinaryOp::Lt,
        Token::Gt => BinaryOp::Gt,
        Token::Le => BinaryOp::Le,
        Token::Ge => BinaryOp::Ge,
        Token::Pipe => BinaryOp::BitOr,
        Token::Caret => BinaryOp::BitXor,
        Token::Amp => BinaryOp::BitAnd,
        Token::LShift => BinaryOp::Shl,
        Token::RShift => BinaryOp::Shr,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::TildeSlash => BinaryOp::TruncDiv,
        Token::Percent => BinaryOp::Mod,
        _ => return None,
    })
}

fn assign_op(token: Token) -> Option<AssignOp> {
    Some(match token {
        Token::Assign => AssignOp::Assign,
        Token::AddAssign => AssignOp::Add,
        Token::SubAssign => AssignOp::Sub,
        Token::MulAssign => AssignOp::Mul,
        Token::DivAssign => AssignOp::Div,
        Token::TruncDivAssign => AssignOp::TruncDiv,
        Token::ModAssign => AssignOp::Mod,
        Token::AndAssign => AssignOp::BitAnd,
        Token::OrAssign => AssignOp::BitOr,
        Token::XorAssign => AssignOp::BitXor,
        Token::LShiftAssign => AssignOp::Shl,
        Token::RShiftAssign => AssignOp::Shr,
        _ => return None,
    })
}

/// Tokens that can begin an expression
pub(super) fn can_start_expression(token: Token) -> bool {
    matches!(
        token,
        Token::Null
            | Token::True
            | Token::False
            | Token::This
            | Token::Super
            | Token::Integer
            | Token::HexInteger
            | Token::Double
            | Token::StringLiteral
            | Token::Identifier
            | Token::New
            | Token::Const
            | Token::LBracket
            | Token::LBrace
            | Token::Lt
            | Token::LParen
            | Token::Minus
            | Token::Bang
            | Token::Tilde
            | Token::Inc
            | Token::Dec
    )
}
