use std::fmt;

use crate::parser::lexer::Comment;
use crate::parser::span::{HasSpan, Span};

/// Identity of an AST node, unique within one compilation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId {
    pub unit: u32,
    pub index: u32,
}

impl NodeId {
    pub fn new(unit: u32, index: u32) -> Self {
        Self { unit, index }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.unit, self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One parsed source file
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub id: NodeId,
    pub span: Span,
    pub source_name: String,
    pub directives: Vec<Directive>,
    pub declarations: Vec<TopLevelDecl>,
    pub comments: Vec<Comment>,
}

impl CompilationUnit {
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.declarations.iter().filter_map(|d| match d {
            TopLevelDecl::Class(c) => Some(c),
            _ => None,
        })
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes().find(|c| c.name.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Library,
    Import,
    Source,
    Native,
    Resource,
}

impl DirectiveKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "library" => Some(Self::Library),
            "import" => Some(Self::Import),
            "source" => Some(Self::Source),
            "native" => Some(Self::Native),
            "resource" => Some(Self::Resource),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Import => "import",
            Self::Source => "source",
            Self::Native => "native",
            Self::Resource => "resource",
        }
    }
}

/// `#library("L");`, `#import("a.dart", prefix: "p");`, ...
#[derive(Debug, Clone)]
pub struct Directive {
    pub id: NodeId,
    pub span: Span,
    pub kind: DirectiveKind,
    pub value: String,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TopLevelDecl {
    Class(ClassDecl),
    TypeAlias(FunctionTypeAlias),
    Function(MethodDecl),
    Variables(FieldDecl),
}

impl TopLevelDecl {
    pub fn id(&self) -> NodeId {
        match self {
            TopLevelDecl::Class(c) => c.id,
            TopLevelDecl::TypeAlias(t) => t.id,
            TopLevelDecl::Function(m) => m.id,
            TopLevelDecl::Variables(f) => f.id,
        }
    }
}

impl HasSpan for TopLevelDecl {
    fn span(&self) -> Span {
        match self {
            TopLevelDecl::Class(c) => c.span,
            TopLevelDecl::TypeAlias(t) => t.span,
            TopLevelDecl::Function(m) => m.span,
            TopLevelDecl::Variables(f) => f.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: NodeId,
    pub span: Span,
    pub doc: Option<Span>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub superclass: Option<TypeNode>,
    /// `implements` list of a class, `extends` list of an interface
    pub interfaces: Vec<TypeNode>,
    /// `default` clause of an interface
    pub default_class: Option<TypeNode>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
}

impl ClassMember {
    pub fn id(&self) -> NodeId {
        match self {
            ClassMember::Field(f) => f.id,
            ClassMember::Method(m) => m.id,
        }
    }
}

impl HasSpan for ClassMember {
    fn span(&self) -> Span {
        match self {
            ClassMember::Field(f) => f.span,
            ClassMember::Method(m) => m.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeParameter {
    pub id: NodeId,
    pub span: Span,
    pub name: Identifier,
    pub bound: Option<TypeNode>,
}

/// `typedef R F<T>(params);`
#[derive(Debug, Clone)]
pub struct FunctionTypeAlias {
    pub id: NodeId,
    pub span: Span,
    pub doc: Option<Span>,
    pub return_type: Option<TypeNode>,
    pub name: Identifier,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<Parameter>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_const: bool,
    pub is_abstract: bool,
    pub is_factory: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        *self == Modifiers::default()
    }
}

/// Field, top-level variable list or local variable list
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub id: NodeId,
    pub span: Span,
    pub doc: Option<Span>,
    pub modifiers: Modifiers,
    pub type_node: Option<TypeNode>,
    pub variables: Vec<VarDeclarator>,
}

#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub id: NodeId,
    pub span: Span,
    pub name: Identifier,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
    Operator,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub id: NodeId,
    pub span: Span,
    pub doc: Option<Span>,
    pub modifiers: Modifiers,
    pub kind: MethodKind,
    pub return_type: Option<TypeNode>,
    /// Class name for constructors, operator symbol for operators
    pub name: Identifier,
    /// `named` in `A.named()`
    pub constructor_name: Option<Identifier>,
    pub params: Vec<Parameter>,
    pub initializers: Vec<Initializer>,
    pub body: FunctionBody,
}

impl MethodDecl {
    /// Name under which the member is registered (`A.named` for named constructors)
    pub fn full_name(&self) -> String {
        match &self.constructor_name {
            Some(c) => format!("{}.{}", self.name.name, c.name),
            None => self.name.name.clone(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    /// Redirecting constructor target, if this is `A() : this(...)`
    pub fn redirect(&self) -> Option<&Initializer> {
        self.initializers
            .iter()
            .find(|i| matches!(i.kind, InitializerKind::Redirect { .. }))
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub id: NodeId,
    pub span: Span,
    pub modifiers: Modifiers,
    pub type_node: Option<TypeNode>,
    pub name: Identifier,
    /// `this.x` field-initializing parameter
    pub is_field: bool,
    /// Declared inside `[...]`
    pub is_optional: bool,
    pub default: Option<Expr>,
    /// Parameters of a function-typed parameter `int f(int x)`
    pub function_params: Option<Vec<Parameter>>,
}

#[derive(Debug, Clone)]
pub struct Initializer {
    pub id: NodeId,
    pub span: Span,
    pub kind: InitializerKind,
}

#[derive(Debug, Clone)]
pub enum InitializerKind {
    /// `x = e` or `this.x = e`
    Field { explicit_this: bool, name: Identifier, value: Expr },
    /// `super(...)` or `super.named(...)`
    Super { name: Option<Identifier>, args: Vec<Expr> },
    /// `this(...)` or `this.named(...)`
    Redirect { name: Option<Identifier>, args: Vec<Expr> },
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Block),
    Expression(Box<Expr>),
    Native(Option<String>),
    /// Diet parse: the body's token span was skipped
    Skipped(Span),
    /// Bodiless declaration ending in `;`
    None,
}

impl FunctionBody {
    pub fn is_present(&self) -> bool {
        !matches!(self, FunctionBody::None)
    }
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub id: NodeId,
    pub span: Span,
    pub prefix: Option<Identifier>,
    pub name: Identifier,
    pub type_args: Vec<TypeNode>,
}

impl TypeNode {
    pub fn is_void(&self) -> bool {
        self.prefix.is_none() && self.name.name == "void"
    }

    /// Name as written, including the import prefix
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}.{}", p.name, self.name.name),
            None => self.name.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub span: Span,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    Variables(FieldDecl),
    Expr(Expr),
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, update: Vec<Expr>, body: Box<Stmt> },
    ForIn { variable: ForInVariable, iterable: Expr, body: Box<Stmt> },
    While { cond: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, cond: Expr },
    Switch { expr: Expr, cases: Vec<SwitchCase> },
    Break(Option<Identifier>),
    Continue(Option<Identifier>),
    Return(Option<Expr>),
    Throw(Option<Expr>),
    Try { body: Block, catches: Vec<CatchClause>, finally: Option<Block> },
    Labeled { label: Identifier, body: Box<Stmt> },
    Function(FunctionExpr),
    Empty,
    Error,
}

#[derive(Debug, Clone)]
pub enum ForInVariable {
    /// `for (final T x in e)`, `for (var x in e)`
    Declared(FieldDecl),
    /// `for (x in e)` with an existing variable
    Existing(Identifier),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub id: NodeId,
    pub span: Span,
    pub labels: Vec<Identifier>,
    pub exprs: Vec<Expr>,
    pub is_default: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub id: NodeId,
    pub span: Span,
    pub exception: Parameter,
    pub stack_trace: Option<Parameter>,
    pub body: Block,
}

/// Function literal or local function
#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub return_type: Option<TypeNode>,
    pub name: Option<Identifier>,
    pub params: Vec<Parameter>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Null,
    Bool(bool),
    /// `value` is `None` when the literal does not fit in an `i64`
    Int { value: Option<i64>, text: String, radix: u32 },
    Double { value: f64, text: String },
    String(String),
    /// `strings.len() == exprs.len() + 1`
    Interpolation { strings: Vec<String>, exprs: Vec<Expr> },
    Identifier(String),
    This,
    Super,
    PropertyAccess { target: Box<Expr>, name: Identifier },
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `name(args)` or `target.name(args)`
    MethodCall { target: Option<Box<Expr>>, name: Identifier, args: Vec<Expr> },
    /// Invocation of a computed callee, e.g. `(f)(1)` or `fs[0](1)`
    FunctionCall { callee: Box<Expr>, args: Vec<Expr> },
    New { is_const: bool, type_node: TypeNode, constructor: Option<Identifier>, args: Vec<Expr> },
    Unary { op: UnaryOp, prefix: bool, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Assign { op: AssignOp, target: Box<Expr>, value: Box<Expr> },
    Conditional { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    Is { expr: Box<Expr>, type_node: TypeNode, negated: bool },
    List { is_const: bool, type_args: Vec<TypeNode>, elements: Vec<Expr> },
    Map { is_const: bool, type_args: Vec<TypeNode>, entries: Vec<MapEntry> },
    Function(Box<FunctionExpr>),
    Paren(Box<Expr>),
    /// `target..a()..b = 1`; each section is built on a `CascadeReceiver`
    Cascade { target: Box<Expr>, sections: Vec<Expr> },
    CascadeReceiver,
    Error,
}

impl Expr {
    /// Whether the expression may appear on the left of an assignment
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_) | ExprKind::PropertyAccess { .. } | ExprKind::Index { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub id: NodeId,
    pub span: Span,
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    Inc,
    Dec,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    EqStrict,
    NeStrict,
    Lt,
    Gt,
    Le,
    Ge,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    TruncDiv,
    Mod,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::EqStrict => "===",
            BinaryOp::NeStrict => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::TruncDiv => "~/",
            BinaryOp::Mod => "%",
        }
    }

    /// Binding power; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::EqStrict | BinaryOp::NeStrict => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::TruncDiv | BinaryOp::Mod => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    TruncDiv,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::TruncDiv => "~/=",
            AssignOp::Mod => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }
}

macro_rules! impl_has_span {
    ($($ty:ty),* $(,)?) => {
        $(impl HasSpan for $ty {
            fn span(&self) -> Span {
                self.span
            }
        })*
    };
}

impl_has_span!(
    Identifier, CompilationUnit, Directive, ClassDecl, TypeParameter, FunctionTypeAlias,
    FieldDecl, VarDeclarator, MethodDecl, Parameter, Initializer, TypeNode, Block, Stmt,
    SwitchCase, CatchClause, Expr, MapEntry,
);
