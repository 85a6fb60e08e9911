//! Name pass
//!
//! Walks every executable construct: method and function bodies, constructor
//! initializer lists, field initializers and parameter defaults. Bare names
//! resolve innermost first: locals and parameters, then members of the
//! enclosing class, its type variables, the library and finally imports.

use std::collections::HashSet;

use super::members::{build_parameters, own_field};
use super::{Context, TypeEnv};
use crate::ast::{
    Block, ClassDecl, ClassMember, Expr, ExprKind, FieldDecl, ForInVariable, FunctionBody, FunctionExpr, Identifier,
    InitializerKind, MethodDecl, NodeId, Parameter, Stmt, StmtKind, SwitchCase, TopLevelDecl, TypeNode,
};
use crate::diagnostics::ErrorCode;
use crate::element::{ElementId, ElementKind, FunctionInfo, Type};
use crate::parser::span::Span;
use crate::scope::{self, ScopeChain, ScopeKind};

const AT_TOP_LEVEL: &str = "at top level";
const IN_STATIC_METHOD: &str = "in a static method";
const IN_FACTORY: &str = "in a factory constructor";
const IN_FIELD_INITIALIZER: &str = "in a field initializer";

/// What the code being resolved may see
#[derive(Debug, Clone, Copy)]
struct Frame {
    library: ElementId,
    class: Option<ElementId>,
    /// Element owning locals declared here
    member: Option<ElementId>,
    /// Class type variables are unavailable
    is_static: bool,
    /// Instance members are unreachable
    no_instance: bool,
    /// Why `this` and `super` are illegal here
    this_reason: Option<&'static str>,
}

impl Frame {
    fn top_level(library: ElementId, member: Option<ElementId>) -> Self {
        Self {
            library,
            class: None,
            member,
            is_static: true,
            no_instance: true,
            this_reason: Some(AT_TOP_LEVEL),
        }
    }

    fn type_env(&self) -> TypeEnv {
        TypeEnv { library: self.library, owner: self.class, is_static: self.is_static }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Loop,
    Switch,
    SwitchCase,
    Statement,
}

#[derive(Debug, Clone)]
struct Label {
    name: String,
    kind: LabelKind,
}

/// Result of resolving `target.name` for the target forms the resolver
/// understands statically
enum Qualified {
    /// Prefix, class, `this` or `super` target; the member if one was found
    Resolved(Option<ElementId>),
    /// Any other target expression
    Dynamic,
}

/// How a constructor name resolved in a class
enum ConstructorLookup {
    Found(ElementId),
    /// No constructors declared; the class has an implicit `A()`
    Implicit,
    Missing,
}

pub(super) struct Names {
    frame: Frame,
    scopes: ScopeChain,
    labels: Vec<Label>,
    loop_depth: usize,
    switch_depth: usize,
    bodies: usize,
}

impl Names {
    pub fn new() -> Self {
        Self {
            frame: Frame::top_level(ElementId::default(), None),
            scopes: ScopeChain::new(),
            labels: Vec::new(),
            loop_depth: 0,
            switch_depth: 0,
            bodies: 0,
        }
    }

    pub fn process(&mut self, ctx: &mut Context<'_, '_, '_>) {
        let libraries = ctx.libraries;
        for (index, library) in libraries.iter().enumerate() {
            let lib = ctx.library_elements[index];
            for parsed in &library.units {
                for decl in &parsed.unit.declarations {
                    match decl {
                        TopLevelDecl::Class(class) => self.resolve_class(ctx, lib, class),
                        TopLevelDecl::Function(function) => {
                            let member = ctx.declared(function.id);
                            self.frame = Frame::top_level(lib, member);
                            self.resolve_method(ctx, function);
                        }
                        TopLevelDecl::Variables(fields) => {
                            self.frame = Frame::top_level(lib, None);
                            self.field_initializers(ctx, fields);
                        }
                        TopLevelDecl::TypeAlias(_) => {}
                    }
                }
            }
        }
        log::debug!("names: {} bodies, {} references", self.bodies, ctx.resolution.reference_count());
    }

    fn resolve_class(&mut self, ctx: &mut Context<'_, '_, '_>, library: ElementId, decl: &ClassDecl) {
        let Some(class) = ctx.declared(decl.id) else { return };
        for member in &decl.members {
            match member {
                ClassMember::Field(fields) => {
                    let is_static = fields.modifiers.is_static;
                    self.frame = Frame {
                        library,
                        class: Some(class),
                        member: None,
                        is_static,
                        no_instance: true,
                        this_reason: Some(IN_FIELD_INITIALIZER),
                    };
                    self.field_initializers(ctx, fields);
                }
                ClassMember::Method(method) => {
                    let modifiers = method.modifiers;
                    let this_reason = if modifiers.is_static {
                        Some(IN_STATIC_METHOD)
                    } else if modifiers.is_factory {
                        Some(IN_FACTORY)
                    } else {
                        None
                    };
                    self.frame = Frame {
                        library,
                        class: Some(class),
                        member: ctx.declared(method.id),
                        is_static: modifiers.is_static,
                        no_instance: modifiers.is_static || modifiers.is_factory,
                        this_reason,
                    };
                    self.resolve_method(ctx, method);
                }
            }
        }
        self.check_redirect_cycles(ctx, class);
    }

    fn reset(&mut self) {
        self.scopes = ScopeChain::new();
        self.labels.clear();
        self.loop_depth = 0;
        self.switch_depth = 0;
    }

    fn field_initializers(&mut self, ctx: &mut Context<'_, '_, '_>, fields: &FieldDecl) {
        self.reset();
        for variable in &fields.variables {
            if let Some(init) = &variable.init {
                self.frame.member = ctx.declared(variable.id);
                self.expr(ctx, init);
            }
        }
    }

    fn resolve_method(&mut self, ctx: &mut Context<'_, '_, '_>, method: &MethodDecl) {
        self.reset();
        self.bodies += 1;
        let params = self
            .frame
            .member
            .and_then(|m| ctx.elements.get(m).function_info().map(|f| f.params.clone()))
            .unwrap_or_default();

        self.scopes.push(ScopeKind::Function);
        self.declare_parameters(ctx, &method.params, &params);
        if method.is_constructor() {
            self.resolve_initializers(ctx, method);
        }
        self.body(ctx, &method.body);
        self.scopes.pop();
    }

    fn declare_parameters(&mut self, ctx: &mut Context<'_, '_, '_>, params: &[Parameter], elements: &[ElementId]) {
        for (param, id) in params.iter().zip(elements) {
            if let Some(default) = &param.default {
                self.expr(ctx, default);
            }
            // Duplicates were reported when the signature was built.
            let _ = self.scopes.declare(&param.name.name, *id);
        }
    }

    /// Body statements share the parameter scope
    fn body(&mut self, ctx: &mut Context<'_, '_, '_>, body: &FunctionBody) {
        match body {
            FunctionBody::Block(block) => {
                for stmt in &block.statements {
                    self.stmt(ctx, stmt);
                }
            }
            FunctionBody::Expression(expr) => self.expr(ctx, expr),
            FunctionBody::Native(_) | FunctionBody::Skipped(_) | FunctionBody::None => {}
        }
    }

    fn resolve_initializers(&mut self, ctx: &mut Context<'_, '_, '_>, method: &MethodDecl) {
        let (Some(class), Some(constructor)) = (self.frame.class, self.frame.member) else {
            return;
        };
        let saved = self.frame;
        self.frame.no_instance = true;
        self.frame.this_reason = Some(IN_FIELD_INITIALIZER);

        let mut supers = 0;
        for init in &method.initializers {
            match &init.kind {
                InitializerKind::Field { name, value, .. } => {
                    match own_field(ctx, class, &name.name) {
                        Some(field) => ctx.record(name.id, field),
                        None => ctx.report(name.id, name.span, ErrorCode::NotAField(name.name.clone())),
                    }
                    self.expr(ctx, value);
                }
                InitializerKind::Super { name, args } => {
                    supers += 1;
                    if supers == 2 {
                        ctx.report(init.id, init.span, ErrorCode::MultipleSuperInitializers);
                    }
                    for arg in args {
                        self.expr(ctx, arg);
                    }
                    self.super_constructor(ctx, class, init.id, init.span, name.as_ref(), args.len());
                }
                InitializerKind::Redirect { name, args } => {
                    let has_body = !matches!(method.body, FunctionBody::None);
                    if method.initializers.len() > 1 || has_body {
                        ctx.report(init.id, init.span, ErrorCode::RedirectingConstructorNotAlone);
                    }
                    for arg in args {
                        self.expr(ctx, arg);
                    }
                    let key = name.as_ref().map_or(String::new(), |n| n.name.clone());
                    match lookup_constructor(ctx, class, &key) {
                        ConstructorLookup::Found(target) => {
                            ctx.record(init.id, target);
                            if let Some(info) = ctx.elements.get_mut(constructor).function_info_mut() {
                                info.redirect = Some(target);
                            }
                            self.check_arguments(ctx, target, args.len(), init.id, init.span);
                        }
                        ConstructorLookup::Implicit | ConstructorLookup::Missing => {
                            let full = constructor_name(&ctx.elements.get(class).name, name.as_ref());
                            ctx.report(init.id, init.span, ErrorCode::NoSuchConstructor(full));
                        }
                    }
                }
            }
        }
        self.frame = saved;
    }

    fn super_constructor(
        &mut self,
        ctx: &mut Context<'_, '_, '_>,
        class: ElementId,
        node: NodeId,
        span: Span,
        name: Option<&Identifier>,
        count: usize,
    ) {
        let superclass = ctx.elements.get(class).class_info().and_then(|info| info.superclass.clone());
        let Some(Type::Interface { element: superclass, .. }) = superclass else {
            // No extends clause, or one that already failed to resolve
            return;
        };
        let key = name.map_or(String::new(), |n| n.name.clone());
        match lookup_constructor(ctx, superclass, &key) {
            ConstructorLookup::Found(target) => {
                ctx.record(node, target);
                self.check_arguments(ctx, target, count, node, span);
            }
            ConstructorLookup::Implicit => {
                if count != 0 {
                    let name = ctx.elements.get(superclass).name.clone();
                    let code = ErrorCode::WrongArgumentCount { name, expected: "0".to_string(), found: count };
                    ctx.report(node, span, code);
                }
            }
            ConstructorLookup::Missing => {
                if !is_incomplete(ctx, superclass) {
                    let full = constructor_name(&ctx.elements.get(superclass).name, name);
                    ctx.report(node, span, ErrorCode::NoSuchConstructor(full));
                }
            }
        }
    }

    /// Report every constructor whose redirect chain never reaches a real constructor
    fn check_redirect_cycles(&mut self, ctx: &mut Context<'_, '_, '_>, class: ElementId) {
        let Some(info) = ctx.elements.get(class).class_info() else { return };
        let mut constructors: Vec<ElementId> = info.constructors.values().copied().collect();
        constructors.sort();
        for &start in &constructors {
            let mut seen = HashSet::new();
            let mut current = start;
            while seen.insert(current) {
                match ctx.elements.get(current).function_info().and_then(|f| f.redirect) {
                    Some(next) => current = next,
                    None => break,
                }
            }
            if ctx.elements.get(current).function_info().and_then(|f| f.redirect).is_some() {
                let name = ctx.elements.get(start).name.clone();
                ctx.report_at(start, ErrorCode::RedirectCycle(name));
            }
        }
    }

    // Statements

    fn block(&mut self, ctx: &mut Context<'_, '_, '_>, block: &Block) {
        self.scopes.push(ScopeKind::Block);
        for stmt in &block.statements {
            self.stmt(ctx, stmt);
        }
        self.scopes.pop();
    }

    fn loop_body(&mut self, ctx: &mut Context<'_, '_, '_>, body: &Stmt) {
        self.loop_depth += 1;
        self.stmt(ctx, body);
        self.loop_depth -= 1;
    }

    fn stmt(&mut self, ctx: &mut Context<'_, '_, '_>, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(ctx, block),
            StmtKind::Variables(fields) => self.local_variables(ctx, fields),
            StmtKind::Expr(expr) => self.expr(ctx, expr),
            StmtKind::If { cond, then_branch, else_branch } => {
                self.expr(ctx, cond);
                self.stmt(ctx, then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(ctx, else_branch);
                }
            }
            StmtKind::For { init, cond, update, body } => {
                self.scopes.push(ScopeKind::Block);
                if let Some(init) = init {
                    self.stmt(ctx, init);
                }
                if let Some(cond) = cond {
                    self.expr(ctx, cond);
                }
                for expr in update {
                    self.expr(ctx, expr);
                }
                self.loop_body(ctx, body);
                self.scopes.pop();
            }
            StmtKind::ForIn { variable, iterable, body } => {
                self.expr(ctx, iterable);
                self.scopes.push(ScopeKind::Block);
                match variable {
                    ForInVariable::Declared(fields) => self.local_variables(ctx, fields),
                    ForInVariable::Existing(name) => {
                        self.reference(ctx, name.id, name.span, &name.name);
                    }
                }
                self.loop_body(ctx, body);
                self.scopes.pop();
            }
            StmtKind::While { cond, body } => {
                self.expr(ctx, cond);
                self.loop_body(ctx, body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.loop_body(ctx, body);
                self.expr(ctx, cond);
            }
            StmtKind::Switch { expr, cases } => {
                self.expr(ctx, expr);
                self.switch(ctx, cases);
            }
            StmtKind::Break(label) => self.jump(ctx, stmt, label.as_ref(), false),
            StmtKind::Continue(label) => self.jump(ctx, stmt, label.as_ref(), true),
            StmtKind::Return(value) | StmtKind::Throw(value) => {
                if let Some(value) = value {
                    self.expr(ctx, value);
                }
            }
            StmtKind::Try { body, catches, finally } => {
                self.block(ctx, body);
                for catch in catches {
                    self.scopes.push(ScopeKind::Catch);
                    self.catch_parameter(ctx, &catch.exception);
                    if let Some(trace) = &catch.stack_trace {
                        self.catch_parameter(ctx, trace);
                    }
                    self.block(ctx, &catch.body);
                    self.scopes.pop();
                }
                if let Some(finally) = finally {
                    self.block(ctx, finally);
                }
            }
            StmtKind::Labeled { label, body } => {
                let kind = match body.kind {
                    StmtKind::For { .. } | StmtKind::ForIn { .. } | StmtKind::While { .. } | StmtKind::DoWhile { .. } => {
                        LabelKind::Loop
                    }
                    StmtKind::Switch { .. } => LabelKind::Switch,
                    _ => LabelKind::Statement,
                };
                let pushed = self.push_label(ctx, label, kind);
                self.stmt(ctx, body);
                if pushed {
                    self.labels.pop();
                }
            }
            StmtKind::Function(function) => {
                let name = function.name.as_ref();
                let (text, span) = name.map_or((String::new(), stmt.span), |n| (n.name.clone(), n.span));
                let id = ctx.add_element(ElementKind::Function, &text, span, self.frame.member, stmt.id);
                if let Some(name) = name {
                    self.declare_local(ctx, id, name);
                }
                self.function(ctx, id, function);
            }
            StmtKind::Empty | StmtKind::Error => {}
        }
    }

    fn switch(&mut self, ctx: &mut Context<'_, '_, '_>, cases: &[SwitchCase]) {
        let mark = self.labels.len();
        for case in cases {
            for label in &case.labels {
                self.push_label(ctx, label, LabelKind::SwitchCase);
            }
        }
        self.switch_depth += 1;
        for case in cases {
            for expr in &case.exprs {
                self.expr(ctx, expr);
            }
            self.scopes.push(ScopeKind::Block);
            for stmt in &case.body {
                self.stmt(ctx, stmt);
            }
            self.scopes.pop();
        }
        self.switch_depth -= 1;
        self.labels.truncate(mark);
    }

    /// Returns false if the label duplicates one already in scope
    fn push_label(&mut self, ctx: &mut Context<'_, '_, '_>, label: &Identifier, kind: LabelKind) -> bool {
        if self.labels.iter().any(|l| l.name == label.name) {
            ctx.report(label.id, label.span, ErrorCode::DuplicateLabel(label.name.clone()));
            return false;
        }
        self.labels.push(Label { name: label.name.clone(), kind });
        true
    }

    fn jump(&mut self, ctx: &mut Context<'_, '_, '_>, stmt: &Stmt, label: Option<&Identifier>, is_continue: bool) {
        let Some(label) = label else {
            if is_continue && self.loop_depth == 0 {
                ctx.report(stmt.id, stmt.span, ErrorCode::ContinueOutsideLoop);
            } else if !is_continue && self.loop_depth == 0 && self.switch_depth == 0 {
                ctx.report(stmt.id, stmt.span, ErrorCode::BreakOutsideLoop);
            }
            return;
        };
        let Some(target) = self.labels.iter().rev().find(|l| l.name == label.name) else {
            ctx.report(label.id, label.span, ErrorCode::UnresolvedLabel(label.name.clone()));
            return;
        };
        if is_continue {
            match target.kind {
                LabelKind::Switch => {
                    ctx.report(label.id, label.span, ErrorCode::ContinueTargetsSwitch(label.name.clone()))
                }
                LabelKind::Statement => ctx.report(stmt.id, stmt.span, ErrorCode::ContinueOutsideLoop),
                LabelKind::Loop | LabelKind::SwitchCase => {}
            }
        }
    }

    fn catch_parameter(&mut self, ctx: &mut Context<'_, '_, '_>, param: &Parameter) {
        let ty = match &param.type_node {
            Some(node) => ctx.resolve_type(node, self.frame.type_env()),
            None => Type::Dynamic,
        };
        let name = &param.name;
        let id = ctx.add_element(ElementKind::Parameter, &name.name, name.span, self.frame.member, param.id);
        let element = ctx.elements.get_mut(id);
        element.modifiers = param.modifiers;
        element.ty = ty;
        self.declare_local(ctx, id, name);
    }

    fn local_variables(&mut self, ctx: &mut Context<'_, '_, '_>, fields: &FieldDecl) {
        let ty = match &fields.type_node {
            Some(node) => ctx.resolve_type(node, self.frame.type_env()),
            None => Type::Dynamic,
        };
        for variable in &fields.variables {
            if let Some(init) = &variable.init {
                self.expr(ctx, init);
            }
            let name = &variable.name;
            let id = ctx.add_element(ElementKind::Variable, &name.name, name.span, self.frame.member, variable.id);
            let element = ctx.elements.get_mut(id);
            element.modifiers = fields.modifiers;
            element.ty = ty.clone();
            self.declare_local(ctx, id, name);
        }
    }

    /// Declare a local; same-scope duplicates are errors, hiding is a warning
    fn declare_local(&mut self, ctx: &mut Context<'_, '_, '_>, id: ElementId, name: &Identifier) {
        if self.scopes.declare(&name.name, id).is_err() {
            ctx.report(name.id, name.span, ErrorCode::DuplicateLocalVariable(name.name.clone()));
            return;
        }
        if let Some(hidden) = self.hidden_by_local(ctx, &name.name) {
            let hidden = ctx.elements.get(hidden).describe();
            ctx.report(name.id, name.span, ErrorCode::Shadows { name: name.name.clone(), hidden });
        }
    }

    /// Element a new local named `name` hides, if any
    fn hidden_by_local(&self, ctx: &Context<'_, '_, '_>, name: &str) -> Option<ElementId> {
        if let Some(outer) = self.scopes.lookup_enclosing(name) {
            return Some(outer);
        }
        if let Some(class) = self.frame.class {
            if let Some(member) = ctx.elements.lookup_member(class, name) {
                return Some(member);
            }
            if let Some(variable) = class_type_variable(ctx, class, name) {
                return Some(variable);
            }
        }
        scope::lookup_library(&ctx.elements, self.frame.library, name)
            .filter(|found| ctx.elements.get(*found).enclosing != Some(ctx.core))
    }

    /// Function literal or local function body
    fn function(&mut self, ctx: &mut Context<'_, '_, '_>, id: ElementId, function: &FunctionExpr) {
        let env = self.frame.type_env();
        let ty = match &function.return_type {
            Some(node) => ctx.resolve_type(node, env),
            None => Type::Dynamic,
        };
        ctx.elements.get_mut(id).ty = ty;
        let (params, required, optional) = build_parameters(ctx, id, &function.params, env, None);
        if let Some(info) = ctx.elements.get_mut(id).function_info_mut() {
            *info = FunctionInfo { params: params.clone(), required, optional, ..FunctionInfo::default() };
        }

        // Labels and loops do not cross function boundaries.
        let labels = std::mem::take(&mut self.labels);
        let depths = (self.loop_depth, self.switch_depth);
        let member = self.frame.member;
        self.loop_depth = 0;
        self.switch_depth = 0;
        self.frame.member = Some(id);

        self.scopes.push(ScopeKind::Function);
        self.declare_parameters(ctx, &function.params, &params);
        self.body(ctx, &function.body);
        self.scopes.pop();

        self.frame.member = member;
        (self.loop_depth, self.switch_depth) = depths;
        self.labels = labels;
    }

    // Expressions

    fn expr(&mut self, ctx: &mut Context<'_, '_, '_>, expr: &Expr) {
        match &expr.kind {
            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Int { .. }
            | ExprKind::Double { .. }
            | ExprKind::String(_)
            | ExprKind::CascadeReceiver
            | ExprKind::Error => {}
            ExprKind::Interpolation { exprs, .. } => {
                for e in exprs {
                    self.expr(ctx, e);
                }
            }
            ExprKind::Identifier(name) => {
                self.reference(ctx, expr.id, expr.span, name);
            }
            ExprKind::This => self.check_this(ctx, expr, false),
            ExprKind::Super => self.check_this(ctx, expr, true),
            ExprKind::PropertyAccess { target, name } => {
                if let Qualified::Dynamic = self.qualified(ctx, expr.id, target, name) {
                    self.expr(ctx, target);
                }
            }
            ExprKind::Index { target, index } => {
                self.expr(ctx, target);
                self.expr(ctx, index);
            }
            ExprKind::MethodCall { target, name, args } => {
                for arg in args {
                    self.expr(ctx, arg);
                }
                let callee = match target {
                    None => self.reference(ctx, expr.id, name.span, &name.name),
                    Some(target) => match self.qualified(ctx, expr.id, target, name) {
                        Qualified::Resolved(callee) => callee,
                        Qualified::Dynamic => {
                            self.expr(ctx, target);
                            None
                        }
                    },
                };
                if let Some(callee) = callee {
                    self.check_arguments(ctx, callee, args.len(), expr.id, name.span);
                }
            }
            ExprKind::FunctionCall { callee, args } => {
                self.expr(ctx, callee);
                for arg in args {
                    self.expr(ctx, arg);
                }
            }
            ExprKind::New { type_node, constructor, args, .. } => {
                for arg in args {
                    self.expr(ctx, arg);
                }
                self.new_expr(ctx, expr, type_node, constructor.as_ref(), args.len());
            }
            ExprKind::Unary { operand, .. } => self.expr(ctx, operand),
            ExprKind::Binary { left, right, .. } => {
                self.expr(ctx, left);
                self.expr(ctx, right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.expr(ctx, target);
                self.expr(ctx, value);
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                self.expr(ctx, cond);
                self.expr(ctx, then_expr);
                self.expr(ctx, else_expr);
            }
            ExprKind::Is { expr: operand, type_node, .. } => {
                self.expr(ctx, operand);
                ctx.resolve_type(type_node, self.frame.type_env());
            }
            ExprKind::List { type_args, elements, .. } => {
                for arg in type_args {
                    ctx.resolve_type(arg, self.frame.type_env());
                }
                for element in elements {
                    self.expr(ctx, element);
                }
            }
            ExprKind::Map { type_args, entries, .. } => {
                for arg in type_args {
                    ctx.resolve_type(arg, self.frame.type_env());
                }
                for entry in entries {
                    self.expr(ctx, &entry.key);
                    self.expr(ctx, &entry.value);
                }
            }
            ExprKind::Function(function) => {
                let (text, span) = function.name.as_ref().map_or((String::new(), expr.span), |n| (n.name.clone(), n.span));
                let id = ctx.add_element(ElementKind::Function, &text, span, self.frame.member, expr.id);
                // A named function literal sees its own name.
                self.scopes.push(ScopeKind::Block);
                if !text.is_empty() {
                    let _ = self.scopes.declare(&text, id);
                }
                self.function(ctx, id, function);
                self.scopes.pop();
            }
            ExprKind::Paren(inner) => self.expr(ctx, inner),
            ExprKind::Cascade { target, sections } => {
                self.expr(ctx, target);
                for section in sections {
                    self.expr(ctx, section);
                }
            }
        }
    }

    fn check_this(&mut self, ctx: &mut Context<'_, '_, '_>, expr: &Expr, is_super: bool) {
        if let Some(reason) = self.frame.this_reason {
            let code = if is_super {
                ErrorCode::SuperNotAllowed(reason.to_string())
            } else {
                ErrorCode::ThisNotAllowed(reason.to_string())
            };
            ctx.report(expr.id, expr.span, code);
        }
    }

    /// Resolve a bare name and record it on `node`
    fn reference(&mut self, ctx: &mut Context<'_, '_, '_>, node: NodeId, span: Span, name: &str) -> Option<ElementId> {
        if let Some(local) = self.scopes.lookup(name) {
            ctx.record(node, local);
            return Some(local);
        }
        if let Some(class) = self.frame.class {
            if let Some(member) = ctx.elements.lookup_member(class, name) {
                if self.frame.no_instance && ctx.elements.is_instance_member(member) {
                    if let Some(top) = scope::lookup_library(&ctx.elements, self.frame.library, name) {
                        ctx.record(node, top);
                        return Some(top);
                    }
                    ctx.report(node, span, ErrorCode::InstanceMemberFromStatic(name.to_string()));
                }
                ctx.record(node, member);
                return Some(member);
            }
            if let Some(variable) = class_type_variable(ctx, class, name) {
                if self.frame.is_static {
                    ctx.report(node, span, ErrorCode::TypeVariableInStaticContext(name.to_string()));
                }
                ctx.record(node, variable);
                return Some(variable);
            }
        }
        if let Some(top) = scope::lookup_library(&ctx.elements, self.frame.library, name) {
            ctx.record(node, top);
            return Some(top);
        }
        if !self.frame.class.map_or(false, |class| is_incomplete(ctx, class)) {
            ctx.report(node, span, ErrorCode::CannotResolve(name.to_string()));
        }
        None
    }

    /// Bare name lookup without recording or reporting
    fn lookup_quiet(&self, ctx: &Context<'_, '_, '_>, name: &str) -> Option<ElementId> {
        if let Some(local) = self.scopes.lookup(name) {
            return Some(local);
        }
        if let Some(class) = self.frame.class {
            if let Some(member) = ctx.elements.lookup_member(class, name) {
                return Some(member);
            }
            if let Some(variable) = class_type_variable(ctx, class, name) {
                return Some(variable);
            }
        }
        scope::lookup_library(&ctx.elements, self.frame.library, name)
    }

    /// A name that only an import prefix gives meaning to
    fn is_import_prefix(&self, ctx: &Context<'_, '_, '_>, name: &str) -> bool {
        self.lookup_quiet(ctx, name).is_none() && scope::is_prefix(&ctx.elements, self.frame.library, name)
    }

    /// `target.name` where the target is a prefix, a class, `this` or `super`
    fn qualified(&mut self, ctx: &mut Context<'_, '_, '_>, node: NodeId, target: &Expr, name: &Identifier) -> Qualified {
        match &target.kind {
            ExprKind::Identifier(first) => {
                if self.is_import_prefix(ctx, first) {
                    let member = scope::lookup_prefixed(&ctx.elements, self.frame.library, first, &name.name);
                    match member {
                        Some(member) => ctx.record(node, member),
                        None => {
                            let code = ErrorCode::CannotResolve(format!("{}.{}", first, name.name));
                            ctx.report(name.id, name.span, code);
                        }
                    }
                    return Qualified::Resolved(member);
                }
                match self.lookup_quiet(ctx, first) {
                    Some(class) if ctx.elements.get(class).kind.is_class_like() => {
                        ctx.record(target.id, class);
                        Qualified::Resolved(self.static_member(ctx, node, class, name))
                    }
                    _ => Qualified::Dynamic,
                }
            }
            ExprKind::This => {
                self.check_this(ctx, target, false);
                let Some(class) = self.frame.class else {
                    return Qualified::Resolved(None);
                };
                let member = ctx.elements.lookup_member(class, &name.name);
                if let Some(member) = member {
                    if ctx.elements.get(member).is_static() {
                        ctx.report(name.id, name.span, ErrorCode::StaticMemberThroughInstance(name.name.clone()));
                    }
                    ctx.record(node, member);
                }
                Qualified::Resolved(member)
            }
            ExprKind::Super => {
                self.check_this(ctx, target, true);
                let superclass = self
                    .frame
                    .class
                    .and_then(|class| ctx.elements.get(class).class_info())
                    .and_then(|info| info.superclass.as_ref())
                    .and_then(Type::element);
                let member = superclass.and_then(|s| ctx.elements.lookup_member(s, &name.name));
                if let Some(member) = member {
                    ctx.record(node, member);
                }
                Qualified::Resolved(member)
            }
            _ => Qualified::Dynamic,
        }
    }

    /// `A.name` through the class: only static members qualify
    fn static_member(
        &mut self,
        ctx: &mut Context<'_, '_, '_>,
        node: NodeId,
        class: ElementId,
        name: &Identifier,
    ) -> Option<ElementId> {
        let info = ctx.elements.get(class).class_info()?;
        let member = info.member_index.get(&name.name).or_else(|| info.setters.get(&name.name)).copied();
        match member {
            Some(member) if ctx.elements.get(member).is_static() => {
                ctx.record(node, member);
                Some(member)
            }
            None if is_incomplete(ctx, class) => None,
            _ => {
                let class_name = ctx.elements.get(class).name.clone();
                let code = ErrorCode::NotAStaticMember { class: class_name, name: name.name.clone() };
                ctx.report(name.id, name.span, code);
                None
            }
        }
    }

    fn check_arguments(&mut self, ctx: &mut Context<'_, '_, '_>, callee: ElementId, count: usize, node: NodeId, span: Span) {
        let element = ctx.elements.get(callee);
        if !element.kind.is_callable() {
            return;
        }
        let Some(info) = element.function_info() else { return };
        if !info.accepts(count) {
            let code = ErrorCode::WrongArgumentCount { name: element.name.clone(), expected: info.expected(), found: count };
            ctx.report(node, span, code);
        }
    }

    fn new_expr(
        &mut self,
        ctx: &mut Context<'_, '_, '_>,
        expr: &Expr,
        type_node: &TypeNode,
        constructor: Option<&Identifier>,
        count: usize,
    ) {
        // `new p.T()` parses as class `p` with constructor `T`
        let prefixed;
        let (type_node, constructor) = match constructor {
            Some(ctor) if type_node.prefix.is_none() && self.is_import_prefix(ctx, &type_node.name.name) => {
                prefixed = TypeNode {
                    id: type_node.id,
                    span: Span::from_to(type_node.span.offset, ctor.span.end()),
                    prefix: Some(type_node.name.clone()),
                    name: ctor.clone(),
                    type_args: Vec::new(),
                };
                (&prefixed, None)
            }
            _ => (type_node, constructor),
        };
        let ty = ctx.resolve_type(type_node, self.frame.type_env());
        let class = match ty {
            Type::TypeVariable(variable) => {
                ctx.record(expr.id, variable);
                return;
            }
            Type::Interface { element, .. } => element,
            _ => return,
        };
        let class_name = ctx.elements.get(class).name.clone();
        let span = constructor.map_or(type_node.span, |c| c.span);

        let mut target = class;
        let mut keys = Vec::with_capacity(2);
        if ctx.elements.get(class).kind == ElementKind::Interface {
            let default = ctx.elements.get(class).class_info().and_then(|info| info.default_class.clone());
            match default {
                Some(Type::Interface { element, .. }) => {
                    target = element;
                    keys.push(constructor_name(&class_name, constructor));
                }
                Some(_) => return,
                None => {
                    ctx.report(type_node.id, type_node.span, ErrorCode::InstantiateInterface(class_name));
                    return;
                }
            }
        }
        keys.push(constructor.map_or(String::new(), |c| c.name.clone()));

        let is_abstract = ctx.elements.get(class).class_info().map_or(false, |info| info.is_abstract);
        let mut lookup = ConstructorLookup::Missing;
        for key in &keys {
            lookup = lookup_constructor(ctx, target, key);
            if !matches!(lookup, ConstructorLookup::Missing) {
                break;
            }
        }
        match lookup {
            ConstructorLookup::Found(ctor) => {
                if is_abstract && !ctx.elements.get(ctor).modifiers.is_factory {
                    ctx.report(type_node.id, type_node.span, ErrorCode::InstantiateAbstractClass(class_name));
                }
                ctx.record(expr.id, ctor);
                self.check_arguments(ctx, ctor, count, expr.id, span);
            }
            ConstructorLookup::Implicit => {
                if is_abstract {
                    ctx.report(type_node.id, type_node.span, ErrorCode::InstantiateAbstractClass(class_name.clone()));
                }
                if count != 0 {
                    let code = ErrorCode::WrongArgumentCount { name: class_name, expected: "0".to_string(), found: count };
                    ctx.report(expr.id, span, code);
                }
            }
            ConstructorLookup::Missing => {
                if !is_incomplete(ctx, target) {
                    let full = constructor_name(&class_name, constructor);
                    ctx.report(expr.id, span, ErrorCode::NoSuchConstructor(full));
                }
            }
        }
    }
}

fn lookup_constructor(ctx: &Context<'_, '_, '_>, class: ElementId, key: &str) -> ConstructorLookup {
    let Some(info) = ctx.elements.get(class).class_info() else {
        return ConstructorLookup::Missing;
    };
    match info.constructor(key) {
        Some(ctor) => ConstructorLookup::Found(ctor),
        None if key.is_empty() && info.constructors.is_empty() => ConstructorLookup::Implicit,
        None => ConstructorLookup::Missing,
    }
}

/// `A` or `A.named`
fn constructor_name(class: &str, constructor: Option<&Identifier>) -> String {
    match constructor {
        Some(c) => format!("{}.{}", class, c.name),
        None => class.to_string(),
    }
}

fn class_type_variable(ctx: &Context<'_, '_, '_>, class: ElementId, name: &str) -> Option<ElementId> {
    let info = ctx.elements.get(class).class_info()?;
    info.type_params.iter().copied().find(|tv| ctx.elements.get(*tv).name == name)
}

fn is_incomplete(ctx: &Context<'_, '_, '_>, class: ElementId) -> bool {
    ctx.elements.get(class).class_info().map_or(false, |info| info.incomplete)
}

