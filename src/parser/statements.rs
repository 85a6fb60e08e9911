//! Statement parsing

use super::error::ParseError;
use super::expressions::can_start_expression;
use super::lexer::Token;
use super::parser::Parser;
use crate::ast::*;
use crate::diagnostics::ErrorCode;

impl<'a> Parser<'a> {
    /// `{ statements }`; a missing `{` yields an empty block
    pub(super) fn parse_block(&mut self) -> Block {
        let start = self.start_offset();
        if !self.check(&Token::LBrace) {
            let e = self.unexpected("'{'");
            self.report_error(e);
            let span = self.synthetic_span();
            return Block { id: self.next_id(), span, statements: Vec::new() };
        }
        self.advance();
        let statements = self.parse_statements_until(|t| t == Token::RBrace);
        self.expect(&Token::RBrace, "'}'");
        let span = self.finish(start);
        Block { id: self.next_id(), span, statements }
    }

    /// Statements up to (not including) a token accepted by `stop`, `}` or a class start
    fn parse_statements_until(&mut self, stop: impl Fn(Token) -> bool) -> Vec<Stmt> {
        let mut statements = Vec::new();
        loop {
            self.tick();
            let kind = self.kind();
            if stop(kind) || matches!(kind, Token::RBrace | Token::Eof | Token::Class) {
                break;
            }
            let before = self.position();
            statements.push(self.parse_statement());
            if self.position() == before {
                let e = ParseError::invalid(ErrorCode::ExpectedExpression(self.describe_current()), self.current().span);
                self.report_error(e);
                self.advance();
            }
        }
        statements
    }

    pub(super) fn parse_statement(&mut self) -> Stmt {
        if !self.enter() {
            let span = self.synthetic_span();
            return Stmt { id: self.next_id(), span, kind: StmtKind::Error };
        }
        let start = self.start_offset();
        let kind = match self.kind() {
            Token::LBrace => StmtKind::Block(self.parse_block()),
            Token::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            Token::If => self.parse_if(),
            Token::For => self.parse_for(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do_while(),
            Token::Switch => self.parse_switch(),
            Token::Try => self.parse_try(),
            Token::Break | Token::Continue => {
                let is_break = self.advance().token == Token::Break;
                let label = if self.check(&Token::Identifier) {
                    let token = self.advance();
                    Some(self.identifier_from(token))
                } else {
                    None
                };
                self.expect_semicolon();
                if is_break { StmtKind::Break(label) } else { StmtKind::Continue(label) }
            }
            Token::Return | Token::Throw => {
                let is_return = self.advance().token == Token::Return;
                let value = if self.check(&Token::Semicolon) { None } else { Some(self.parse_expression()) };
                self.expect_semicolon();
                if is_return { StmtKind::Return(value) } else { StmtKind::Throw(value) }
            }
            Token::Var | Token::Final => {
                let decl = self.parse_local_variables();
                self.expect_semicolon();
                StmtKind::Variables(decl)
            }
            Token::Const if !matches!(self.peek_kind(1), Token::LBracket | Token::LBrace | Token::Lt)
                && !(self.peek_kind(1) == Token::Identifier && self.peek_kind(2) == Token::LParen) =>
            {
                let decl = self.parse_local_variables();
                self.expect_semicolon();
                StmtKind::Variables(decl)
            }
            Token::Identifier if self.check_at(1, &Token::Colon) => {
                let token = self.advance();
                let label = self.identifier_from(token);
                self.advance();
                let body = self.parse_statement();
                StmtKind::Labeled { label, body: Box::new(body) }
            }
            _ if self.at_local_function() => self.parse_local_function(),
            _ if self.looks_like_type_then_name() => {
                let decl = self.parse_local_variables();
                self.expect_semicolon();
                StmtKind::Variables(decl)
            }
            kind if can_start_expression(kind) => {
                let expr = self.parse_expression();
                self.expect_semicolon();
                StmtKind::Expr(expr)
            }
            _ => {
                let e = ParseError::invalid(ErrorCode::ExpectedExpression(self.describe_current()), self.current().span);
                self.report_error(e);
                self.synchronize_statement();
                StmtKind::Error
            }
        };
        let span = self.finish(start);
        self.exit();
        Stmt { id: self.next_id(), span, kind }
    }

    /// Skip to the end of a broken statement
    fn synchronize_statement(&mut self) {
        let mut first = true;
        while !self.is_at_end() {
            self.tick();
            let t = *self.current();
            if !first && (matches!(t.token, Token::RBrace | Token::Class) || t.newline_before) {
                return;
            }
            self.advance();
            if t.token == Token::Semicolon {
                return;
            }
            first = false;
        }
    }

    /// `var x`, `final T x = 1, y`, `const x = 1`; no trailing `;`
    fn parse_local_variables(&mut self) -> FieldDecl {
        let start = self.start_offset();
        let modifiers = self.parse_modifiers();
        self.match_token(&Token::Var);
        let type_node = if self.looks_like_type_then_name() {
            match self.parse_type() {
                Ok(t) => Some(t),
                Err(e) => {
                    self.report_error(e);
                    None
                }
            }
        } else {
            None
        };
        let mut variables = Vec::new();
        loop {
            match self.parse_identifier("variable name") {
                Ok(name) => variables.push(self.parse_declarator_rest(name)),
                Err(e) => {
                    self.report_error(e);
                    break;
                }
            }
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        let span = self.finish(start);
        FieldDecl { id: self.next_id(), span, doc: None, modifiers, type_node, variables }
    }

    /// `T name(` / `name(` followed by a function body
    fn at_local_function(&mut self) -> bool {
        if self.check(&Token::Void) {
            return self.peek_kind(1) == Token::Identifier && self.paren_then_body(2);
        }
        if !self.check(&Token::Identifier) {
            return false;
        }
        if self.paren_then_body(1) {
            return true;
        }
        match self.type_end(0) {
            Some(i) => self.peek_kind(i) == Token::Identifier && self.paren_then_body(i + 1),
            None => false,
        }
    }

    fn parse_local_function(&mut self) -> StmtKind {
        let return_type = if self.looks_like_type_then_name() {
            match self.parse_type() {
                Ok(t) => Some(t),
                Err(e) => {
                    self.report_error(e);
                    None
                }
            }
        } else {
            None
        };
        let name = match self.parse_identifier("function name") {
            Ok(name) => Some(name),
            Err(e) => {
                self.report_error(e);
                None
            }
        };
        let params = match self.parse_formal_parameters() {
            Ok(p) => p,
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
        if matches!(body, FunctionBody::Expression(_)) {
            self.expect_semicolon();
        }
        StmtKind::Function(FunctionExpr { return_type, name, params, body })
    }

    /// `( expr )` after a statement keyword
    fn parse_condition(&mut self) -> Expr {
        self.expect(&Token::LParen, "'('");
        let cond = self.parse_expression();
        self.expect(&Token::RParen, "')'");
        cond
    }

    fn parse_if(&mut self) -> StmtKind {
        self.advance();
        let cond = self.parse_condition();
        let then_branch = Box::new(self.parse_statement());
        let else_branch = if self.match_token(&Token::Else) { Some(Box::new(self.parse_statement())) } else { None };
        StmtKind::If { cond, then_branch, else_branch }
    }

    fn parse_while(&mut self) -> StmtKind {
        self.advance();
        let cond = self.parse_condition();
        let body = Box::new(self.parse_statement());
        StmtKind::While { cond, body }
    }

    fn parse_do_while(&mut self) -> StmtKind {
        self.advance();
        let body = Box::new(self.parse_statement());
        self.expect(&Token::While, "'while'");
        let cond = self.parse_condition();
        self.expect_semicolon();
        StmtKind::DoWhile { body, cond }
    }

    fn parse_for(&mut self) -> StmtKind {
        self.advance();
        self.expect(&Token::LParen, "'('");

        if let Some(declared) = self.for_in_kind() {
            let variable = if declared {
                ForInVariable::Declared(self.parse_local_variables())
            } else {
                let token = self.advance();
                ForInVariable::Existing(self.identifier_from(token))
            };
            self.expect(&Token::In, "'in'");
            let iterable = self.parse_expression();
            self.expect(&Token::RParen, "')'");
            let body = Box::new(self.parse_statement());
            return StmtKind::ForIn { variable, iterable, body };
        }

        let init = if self.check(&Token::Semicolon) {
            None
        } else {
            let start = self.start_offset();
            let kind = if matches!(self.kind(), Token::Var | Token::Final | Token::Const) || self.looks_like_type_then_name() {
                StmtKind::Variables(self.parse_local_variables())
            } else {
                StmtKind::Expr(self.parse_expression())
            };
            let span = self.finish(start);
            Some(Box::new(Stmt { id: self.next_id(), span, kind }))
        };
        self.expect(&Token::Semicolon, "';'");
        let cond = if self.check(&Token::Semicolon) { None } else { Some(self.parse_expression()) };
        self.expect(&Token::Semicolon, "';'");
        let mut update = Vec::new();
        while !self.check(&Token::RParen) && !self.is_at_end() {
            let before = self.position();
            update.push(self.parse_expression());
            if !self.match_token(&Token::Comma) || self.position() == before {
                break;
            }
        }
        self.expect(&Token::RParen, "')'");
        let body = Box::new(self.parse_statement());
        StmtKind::For { init, cond, update, body }
    }

    /// After `for (`: `Some(true)` for a declared loop variable, `Some(false)`
    /// for an existing one, `None` for a classic three-part loop
    fn for_in_kind(&mut self) -> Option<bool> {
        let mut i = 0;
        let mut declared = false;
        if matches!(self.peek_kind(0), Token::Var | Token::Final | Token::Const) {
            i = 1;
            declared = true;
        }
        if self.peek_kind(i) == Token::Identifier && self.peek_kind(i + 1) == Token::In {
            return Some(declared);
        }
        let end = self.type_end(i)?;
        (self.peek_kind(end) == Token::Identifier && self.peek_kind(end + 1) == Token::In).then_some(true)
    }

    fn parse_switch(&mut self) -> StmtKind {
        self.advance();
        let expr = self.parse_condition();
        let mut cases = Vec::new();
        if !self.expect(&Token::LBrace, "'{'") {
            return StmtKind::Switch { expr, cases };
        }
        loop {
            self.tick();
            if matches!(self.kind(), Token::RBrace | Token::Eof | Token::Class) {
                break;
            }
            let before = self.position();
            let start = self.start_offset();
            let mut labels = Vec::new();
            while self.check(&Token::Identifier) && self.check_at(1, &Token::Colon) {
                let token = self.advance();
                labels.push(self.identifier_from(token));
                self.advance();
            }
            let mut exprs = Vec::new();
            let mut is_default = false;
            loop {
                if self.match_token(&Token::Case) {
                    exprs.push(self.parse_expression());
                    self.expect(&Token::Colon, "':'");
                } else if self.match_token(&Token::Default) {
                    is_default = true;
                    self.expect(&Token::Colon, "':'");
                } else {
                    break;
                }
            }
            if exprs.is_empty() && !is_default {
                let e = self.unexpected("'case' or 'default'");
                self.report_error(e);
                self.synchronize_statement();
                if self.position() == before {
                    self.advance();
                }
                continue;
            }
            let body = self.parse_statements_until(|t| matches!(t, Token::Case | Token::Default));
            let span = self.finish(start);
            cases.push(SwitchCase { id: self.next_id(), span, labels, exprs, is_default, body });
        }
        self.expect(&Token::RBrace, "'}'");
        StmtKind::Switch { expr, cases }
    }

    fn parse_try(&mut self) -> StmtKind {
        self.advance();
        let body = self.parse_block();
        let mut catches = Vec::new();
        while self.check(&Token::Catch) {
            self.tick();
            let start = self.start_offset();
            self.advance();
            self.expect(&Token::LParen, "'('");
            let exception = match self.parse_formal_parameter(false) {
                Ok(p) => p,
                Err(e) => {
                    self.report_error(e);
                    self.synchronize_statement();
                    continue;
                }
            };
            let stack_trace = if self.match_token(&Token::Comma) {
                match self.parse_formal_parameter(false) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        self.report_error(e);
                        None
                    }
                }
            } else {
                None
            };
            self.expect(&Token::RParen, "')'");
            let block = self.parse_block();
            let span = self.finish(start);
            catches.push(CatchClause { id: self.next_id(), span, exception, stack_trace, body: block });
        }
        let finally = if self.match_token(&Token::Finally) { Some(self.parse_block()) } else { None };
        if catches.is_empty() && finally.is_none() {
            let e = self.unexpected("'catch' or 'finally'");
            self.report_error(e);
        }
        StmtKind::Try { body, catches, finally }
    }
}
