use std::collections::HashMap;

use super::*;
use crate::parser::span::Span;

/// Borrowed reference to any AST node
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Unit(&'a CompilationUnit),
    Directive(&'a Directive),
    Class(&'a ClassDecl),
    TypeAlias(&'a FunctionTypeAlias),
    Method(&'a MethodDecl),
    Field(&'a FieldDecl),
    Variable(&'a VarDeclarator),
    Parameter(&'a Parameter),
    TypeParameter(&'a TypeParameter),
    Type(&'a TypeNode),
    Identifier(&'a Identifier),
    Initializer(&'a Initializer),
    Block(&'a Block),
    Stmt(&'a Stmt),
    SwitchCase(&'a SwitchCase),
    Catch(&'a CatchClause),
    Expr(&'a Expr),
    MapEntry(&'a MapEntry),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Unit(n) => n.id,
            NodeRef::Directive(n) => n.id,
            NodeRef::Class(n) => n.id,
            NodeRef::TypeAlias(n) => n.id,
            NodeRef::Method(n) => n.id,
            NodeRef::Field(n) => n.id,
            NodeRef::Variable(n) => n.id,
            NodeRef::Parameter(n) => n.id,
            NodeRef::TypeParameter(n) => n.id,
            NodeRef::Type(n) => n.id,
            NodeRef::Identifier(n) => n.id,
            NodeRef::Initializer(n) => n.id,
            NodeRef::Block(n) => n.id,
            NodeRef::Stmt(n) => n.id,
            NodeRef::SwitchCase(n) => n.id,
            NodeRef::Catch(n) => n.id,
            NodeRef::Expr(n) => n.id,
            NodeRef::MapEntry(n) => n.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NodeRef::Unit(n) => n.span,
            NodeRef::Directive(n) => n.span,
            NodeRef::Class(n) => n.span,
            NodeRef::TypeAlias(n) => n.span,
            NodeRef::Method(n) => n.span,
            NodeRef::Field(n) => n.span,
            NodeRef::Variable(n) => n.span,
            NodeRef::Parameter(n) => n.span,
            NodeRef::TypeParameter(n) => n.span,
            NodeRef::Type(n) => n.span,
            NodeRef::Identifier(n) => n.span,
            NodeRef::Initializer(n) => n.span,
            NodeRef::Block(n) => n.span,
            NodeRef::Stmt(n) => n.span,
            NodeRef::SwitchCase(n) => n.span,
            NodeRef::Catch(n) => n.span,
            NodeRef::Expr(n) => n.span,
            NodeRef::MapEntry(n) => n.span,
        }
    }

    /// Short kind name for diagnostics and dumps
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Unit(_) => "unit",
            NodeRef::Directive(_) => "directive",
            NodeRef::Class(_) => "class",
            NodeRef::TypeAlias(_) => "typedef",
            NodeRef::Method(_) => "method",
            NodeRef::Field(_) => "field",
            NodeRef::Variable(_) => "variable",
            NodeRef::Parameter(_) => "parameter",
            NodeRef::TypeParameter(_) => "type parameter",
            NodeRef::Type(_) => "type",
            NodeRef::Identifier(_) => "identifier",
            NodeRef::Initializer(_) => "initializer",
            NodeRef::Block(_) => "block",
            NodeRef::Stmt(_) => "statement",
            NodeRef::SwitchCase(_) => "switch case",
            NodeRef::Catch(_) => "catch",
            NodeRef::Expr(_) => "expression",
            NodeRef::MapEntry(_) => "map entry",
        }
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match *self {
            NodeRef::Unit(u) => {
                out.extend(u.directives.iter().map(NodeRef::Directive));
                for decl in &u.declarations {
                    out.push(match decl {
                        TopLevelDecl::Class(c) => NodeRef::Class(c),
                        TopLevelDecl::TypeAlias(t) => NodeRef::TypeAlias(t),
                        TopLevelDecl::Function(m) => NodeRef::Method(m),
                        TopLevelDecl::Variables(f) => NodeRef::Field(f),
                    });
                }
            }
            NodeRef::Directive(_) => {}
            NodeRef::Class(c) => {
                out.push(NodeRef::Identifier(&c.name));
                out.extend(c.type_params.iter().map(NodeRef::TypeParameter));
                out.extend(c.superclass.iter().map(NodeRef::Type));
                out.extend(c.interfaces.iter().map(NodeRef::Type));
                out.extend(c.default_class.iter().map(NodeRef::Type));
                for member in &c.members {
                    out.push(match member {
                        ClassMember::Field(f) => NodeRef::Field(f),
                        ClassMember::Method(m) => NodeRef::Method(m),
                    });
                }
            }
            NodeRef::TypeAlias(t) => {
                out.extend(t.return_type.iter().map(NodeRef::Type));
                out.push(NodeRef::Identifier(&t.name));
                out.extend(t.type_params.iter().map(NodeRef::TypeParameter));
                out.extend(t.params.iter().map(NodeRef::Parameter));
            }
            NodeRef::Method(m) => {
                out.extend(m.return_type.iter().map(NodeRef::Type));
                out.push(NodeRef::Identifier(&m.name));
                out.extend(m.constructor_name.iter().map(NodeRef::Identifier));
                out.extend(m.params.iter().map(NodeRef::Parameter));
                out.extend(m.initializers.iter().map(NodeRef::Initializer));
                push_body(&mut out, &m.body);
            }
            NodeRef::Field(f) => {
                out.extend(f.type_node.iter().map(NodeRef::Type));
                out.extend(f.variables.iter().map(NodeRef::Variable));
            }
            NodeRef::Variable(v) => {
                out.push(NodeRef::Identifier(&v.name));
                out.extend(v.init.iter().map(NodeRef::Expr));
            }
            NodeRef::Parameter(p) => {
                out.extend(p.type_node.iter().map(NodeRef::Type));
                out.push(NodeRef::Identifier(&p.name));
                if let Some(params) = &p.function_params {
                    out.extend(params.iter().map(NodeRef::Parameter));
                }
                out.extend(p.default.iter().map(NodeRef::Expr));
            }
            NodeRef::TypeParameter(t) => {
                out.push(NodeRef::Identifier(&t.name));
                out.extend(t.bound.iter().map(NodeRef::Type));
            }
            NodeRef::Type(t) => {
                out.extend(t.prefix.iter().map(NodeRef::Identifier));
                out.push(NodeRef::Identifier(&t.name));
                out.extend(t.type_args.iter().map(NodeRef::Type));
            }
            NodeRef::Identifier(_) => {}
            NodeRef::Initializer(i) => match &i.kind {
                InitializerKind::Field { name, value, .. } => {
                    out.push(NodeRef::Identifier(name));
                    out.push(NodeRef::Expr(value));
                }
                InitializerKind::Super { name, args } | InitializerKind::Redirect { name, args } => {
                    out.extend(name.iter().map(NodeRef::Identifier));
                    out.extend(args.iter().map(NodeRef::Expr));
                }
            },
            NodeRef::Block(b) => out.extend(b.statements.iter().map(NodeRef::Stmt)),
            NodeRef::Stmt(s) => stmt_children(&mut out, s),
            NodeRef::SwitchCase(c) => {
                out.extend(c.labels.iter().map(NodeRef::Identifier));
                out.extend(c.exprs.iter().map(NodeRef::Expr));
                out.extend(c.body.iter().map(NodeRef::Stmt));
            }
            NodeRef::Catch(c) => {
                out.push(NodeRef::Parameter(&c.exception));
                out.extend(c.stack_trace.iter().map(NodeRef::Parameter));
                out.push(NodeRef::Block(&c.body));
            }
            NodeRef::Expr(e) => expr_children(&mut out, e),
            NodeRef::MapEntry(m) => {
                out.push(NodeRef::Expr(&m.key));
                out.push(NodeRef::Expr(&m.value));
            }
        }
        out
    }
}

fn push_body<'a>(out: &mut Vec<NodeRef<'a>>, body: &'a FunctionBody) {
    match body {
        FunctionBody::Block(b) => out.push(NodeRef::Block(b)),
        FunctionBody::Expression(e) => out.push(NodeRef::Expr(e)),
        FunctionBody::Native(_) | FunctionBody::Skipped(_) | FunctionBody::None => {}
    }
}

fn push_function<'a>(out: &mut Vec<NodeRef<'a>>, f: &'a FunctionExpr) {
    out.extend(f.return_type.iter().map(NodeRef::Type));
    out.extend(f.name.iter().map(NodeRef::Identifier));
    out.extend(f.params.iter().map(NodeRef::Parameter));
    push_body(out, &f.body);
}

fn stmt_children<'a>(out: &mut Vec<NodeRef<'a>>, s: &'a Stmt) {
    match &s.kind {
        StmtKind::Block(b) => out.push(NodeRef::Block(b)),
        StmtKind::Variables(f) => out.push(NodeRef::Field(f)),
        StmtKind::Expr(e) => out.push(NodeRef::Expr(e)),
        StmtKind::If { cond, then_branch, else_branch } => {
            out.push(NodeRef::Expr(cond));
            out.push(NodeRef::Stmt(then_branch));
            out.extend(else_branch.iter().map(|s| NodeRef::Stmt(s)));
        }
        StmtKind::For { init, cond, update, body } => {
            out.extend(init.iter().map(|s| NodeRef::Stmt(s)));
            out.extend(cond.iter().map(NodeRef::Expr));
            out.extend(update.iter().map(NodeRef::Expr));
            out.push(NodeRef::Stmt(body));
        }
        StmtKind::ForIn { variable, iterable, body } => {
            out.push(match variable {
                ForInVariable::Declared(f) => NodeRef::Field(f),
                ForInVariable::Existing(id) => NodeRef::Identifier(id),
            });
            out.push(NodeRef::Expr(iterable));
            out.push(NodeRef::Stmt(body));
        }
        StmtKind::While { cond, body } => {
            out.push(NodeRef::Expr(cond));
            out.push(NodeRef::Stmt(body));
        }
        StmtKind::DoWhile { body, cond } => {
            out.push(NodeRef::Stmt(body));
            out.push(NodeRef::Expr(cond));
        }
        StmtKind::Switch { expr, cases } => {
            out.push(NodeRef::Expr(expr));
            out.extend(cases.iter().map(NodeRef::SwitchCase));
        }
        StmtKind::Break(label) | StmtKind::Continue(label) => {
            out.extend(label.iter().map(NodeRef::Identifier));
        }
        StmtKind::Return(value) | StmtKind::Throw(value) => out.extend(value.iter().map(NodeRef::Expr)),
        StmtKind::Try { body, catches, finally } => {
            out.push(NodeRef::Block(body));
            out.extend(catches.iter().map(NodeRef::Catch));
            out.extend(finally.iter().map(NodeRef::Block));
        }
        StmtKind::Labeled { label, body } => {
            out.push(NodeRef::Identifier(label));
            out.push(NodeRef::Stmt(body));
        }
        StmtKind::Function(f) => push_function(out, f),
        StmtKind::Empty | StmtKind::Error => {}
    }
}

fn expr_children<'a>(out: &mut Vec<NodeRef<'a>>, e: &'a Expr) {
    match &e.kind {
        ExprKind::Null
        | ExprKind::Bool(_)
        | ExprKind::Int { .. }
        | ExprKind::Double { .. }
        | ExprKind::String(_)
        | ExprKind::Identifier(_)
        | ExprKind::This
        | ExprKind::Super
        | ExprKind::CascadeReceiver
        | ExprKind::Error => {}
        ExprKind::Interpolation { exprs, .. } => out.extend(exprs.iter().map(NodeRef::Expr)),
        ExprKind::PropertyAccess { target, name } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Identifier(name));
        }
        ExprKind::Index { target, index } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(index));
        }
        ExprKind::MethodCall { target, name, args } => {
            out.extend(target.iter().map(|t| NodeRef::Expr(t)));
            out.push(NodeRef::Identifier(name));
            out.extend(args.iter().map(NodeRef::Expr));
        }
        ExprKind::FunctionCall { callee, args } => {
            out.push(NodeRef::Expr(callee));
            out.extend(args.iter().map(NodeRef::Expr));
        }
        ExprKind::New { type_node, constructor, args, .. } => {
            out.push(NodeRef::Type(type_node));
            out.extend(constructor.iter().map(NodeRef::Identifier));
            out.extend(args.iter().map(NodeRef::Expr));
        }
        ExprKind::Unary { operand, .. } => out.push(NodeRef::Expr(operand)),
        ExprKind::Binary { left, right, .. } => {
            out.push(NodeRef::Expr(left));
            out.push(NodeRef::Expr(right));
        }
        ExprKind::Assign { target, value, .. } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        ExprKind::Conditional { cond, then_expr, else_expr } => {
            out.push(NodeRef::Expr(cond));
            out.push(NodeRef::Expr(then_expr));
            out.push(NodeRef::Expr(else_expr));
        }
        ExprKind::Is { expr, type_node, .. } => {
            out.push(NodeRef::Expr(expr));
            out.push(NodeRef::Type(type_node));
        }
        ExprKind::List { type_args, elements, .. } => {
            out.extend(type_args.iter().map(NodeRef::Type));
            out.extend(elements.iter().map(NodeRef::Expr));
        }
        ExprKind::Map { type_args, entries, .. } => {
            out.extend(type_args.iter().map(NodeRef::Type));
            out.extend(entries.iter().map(NodeRef::MapEntry));
        }
        ExprKind::Function(f) => push_function(out, f),
        ExprKind::Paren(inner) => out.push(NodeRef::Expr(inner)),
        ExprKind::Cascade { target, sections } => {
            out.push(NodeRef::Expr(target));
            out.extend(sections.iter().map(NodeRef::Expr));
        }
    }
}

/// Pre/post-order visitor over [`NodeRef`]s
pub trait AstVisitor<'a> {
    /// Called before the children; returning `false` skips them
    fn visit(&mut self, _node: NodeRef<'a>) -> bool {
        true
    }

    /// Called after the children
    fn leave(&mut self, _node: NodeRef<'a>) {}
}

/// Depth-first traversal of `node` and its subtree
pub fn walk<'a, V: AstVisitor<'a> + ?Sized>(visitor: &mut V, node: NodeRef<'a>) {
    if visitor.visit(node) {
        for child in node.children() {
            walk(visitor, child);
        }
    }
    visitor.leave(node);
}

/// Parent back-references for an owned tree (child id -> parent id)
#[derive(Debug, Default, Clone)]
pub struct ParentMap {
    parents: HashMap<NodeId, NodeId>,
}

impl ParentMap {
    pub fn build(unit: &CompilationUnit) -> Self {
        struct Builder {
            stack: Vec<NodeId>,
            parents: HashMap<NodeId, NodeId>,
        }

        impl<'a> AstVisitor<'a> for Builder {
            fn visit(&mut self, node: NodeRef<'a>) -> bool {
                if let Some(parent) = self.stack.last() {
                    self.parents.insert(node.id(), *parent);
                }
                self.stack.push(node.id());
                true
            }

            fn leave(&mut self, _node: NodeRef<'a>) {
                self.stack.pop();
            }
        }

        let mut builder = Builder { stack: Vec::new(), parents: HashMap::new() };
        walk(&mut builder, NodeRef::Unit(unit));
        Self { parents: builder.parents }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Ancestors of `id`, innermost first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
