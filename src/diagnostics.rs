//! Diagnostic channel
//!
//! Every user-level problem found by the lexer, parser or resolver is an
//! [`ErrorCode`] reported through a [`Reporter`], which applies the warning
//! policy and error budget before handing a [`Diagnostic`] to the session's
//! [`DiagnosticListener`].

use std::collections::HashMap;
use std::fmt;

use crate::config::Config;
use crate::parser::span::Span;
use crate::source::Source;

/// How a diagnostic is delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    TypeError,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::TypeError => write!(f, "type error"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Broad family of an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Lexical,
    Syntax,
    Resolution,
    Constant,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ErrorCode {
    // Lexical
    #[error("illegal character '{0}'")]
    IllegalCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("malformed number literal '{0}'")]
    MalformedNumber(String),
    #[error("invalid escape sequence '{0}'")]
    InvalidEscape(String),
    #[error("expected identifier or '{{' after '$' in string")]
    InvalidInterpolation,

    // Syntax
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("expected expression, found {0}")]
    ExpectedExpression(String),
    #[error("expected identifier, found {0}")]
    ExpectedIdentifier(String),
    #[error("expected type, found {0}")]
    ExpectedType(String),
    #[error("expected class member, found {0}")]
    ExpectedClassMember(String),
    #[error("unexpected {0} at top level")]
    ExpectedTopLevelDeclaration(String),
    #[error("directives must appear before any declaration")]
    DirectiveAfterDeclaration,
    #[error("duplicate #library directive")]
    DuplicateLibraryDirective,
    #[error("unknown directive '#{0}'")]
    UnknownDirective(String),
    #[error("directive argument must be a string literal")]
    DirectiveArgumentNotString,
    #[error("built-in identifier '{0}' cannot be used as a type name")]
    BuiltInIdentifierAsType(String),
    #[error("illegal assignment target")]
    IllegalAssignmentTarget,
    #[error("relational operator '{0}' cannot follow another relational expression")]
    NonAssociativeOperator(String),
    #[error("nesting too deep")]
    NestingTooDeep,
    #[error("parser step limit exhausted; skipping rest of unit")]
    ParserGasExhausted,

    // Resolution
    #[error("duplicate declaration of '{0}'")]
    DuplicateDeclaration(String),
    #[error("duplicate local variable '{0}'")]
    DuplicateLocalVariable(String),
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
    #[error("duplicate type variable '{0}'")]
    DuplicateTypeVariable(String),
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),
    #[error("'{name}' hides {hidden}")]
    Shadows { name: String, hidden: String },
    #[error("cannot resolve '{0}'")]
    CannotResolve(String),
    #[error("cannot resolve supertype '{0}'")]
    UnresolvedSupertype(String),
    #[error("no such type '{0}'")]
    NoSuchType(String),
    #[error("'{0}' is not a type")]
    NotAType(String),
    #[error("'{0}' is not a class")]
    NotAClass(String),
    #[error("a class cannot extend interface '{0}'")]
    ExtendsInterface(String),
    #[error("default clause '{0}' must name a class")]
    DefaultMustBeClass(String),
    #[error("cyclic class hierarchy involving '{0}'")]
    CyclicClass(String),
    #[error("'{name}' expects {expected} type argument(s), found {found}")]
    WrongTypeArgumentCount { name: String, expected: usize, found: usize },
    #[error("member '{name}' conflicts with {existing}")]
    MemberConflict { name: String, existing: String },
    #[error("duplicate constructor '{0}'")]
    DuplicateConstructor(String),
    #[error("constructor cannot be {0}")]
    IllegalConstructorModifier(String),
    #[error("constructor cannot declare a return type")]
    ConstructorWithReturnType,
    #[error("constructor name '{found}' does not match class '{class}'")]
    ConstructorNameMismatch { class: String, found: String },
    #[error("interface method '{0}' cannot have a body")]
    InterfaceMethodWithBody(String),
    #[error("method '{0}' must have a body")]
    MissingMethodBody(String),
    #[error("label '{0}' is not defined")]
    UnresolvedLabel(String),
    #[error("continue cannot target switch label '{0}'")]
    ContinueTargetsSwitch(String),
    #[error("break outside of loop or switch")]
    BreakOutsideLoop,
    #[error("continue outside of loop")]
    ContinueOutsideLoop,
    #[error("'this' cannot be used {0}")]
    ThisNotAllowed(String),
    #[error("'super' cannot be used {0}")]
    SuperNotAllowed(String),
    #[error("instance member '{0}' cannot be accessed from a static context")]
    InstanceMemberFromStatic(String),
    #[error("static member '{0}' must be accessed through its class")]
    StaticMemberThroughInstance(String),
    #[error("'{name}' is not a static member of '{class}'")]
    NotAStaticMember { class: String, name: String },
    #[error("no constructor '{0}'")]
    NoSuchConstructor(String),
    #[error("'{name}' expects {expected} argument(s), found {found}")]
    WrongArgumentCount { name: String, expected: String, found: usize },
    #[error("redirect chain of constructor '{0}' is cyclic")]
    RedirectCycle(String),
    #[error("redirecting constructor cannot have other initializers or a body")]
    RedirectingConstructorNotAlone,
    #[error("at most one super initializer is allowed")]
    MultipleSuperInitializers,
    #[error("'{0}' is not a field of the enclosing class")]
    NotAField(String),
    #[error("field-initializing parameter '{0}' is only allowed in a constructor")]
    FieldParameterOutsideConstructor(String),
    #[error("cannot instantiate interface '{0}' without a default class")]
    InstantiateInterface(String),
    #[error("instantiating abstract class '{0}'")]
    InstantiateAbstractClass(String),
    #[error("type variable '{0}' referenced in a static member")]
    TypeVariableInStaticContext(String),

    // Constant
    #[error("expression is not a compile-time constant")]
    NotConstant,
    #[error("constant expression must be int")]
    ExpectedInt,
    #[error("number expected in constant expression")]
    ExpectedNumber,
    #[error("constant expression must be bool")]
    ExpectedBool,
    #[error("interpolated constant must be a string, number or bool")]
    ExpectedStringNumberBool,
    #[error("cyclic compile-time constant '{0}'")]
    CyclicConstant(String),
    #[error("const collection cannot use type variable '{0}'")]
    TypeVariableInConstCollection(String),
    #[error("'{0}' is not a const constructor")]
    NonConstConstructor(String),
    #[error("division by zero in constant expression")]
    ConstDivisionByZero,
    #[error("constant '{0}' must be initialized")]
    ConstWithoutInitializer(String),
    #[error("integer literal '{0}' does not fit in 64 bits")]
    IntegerOutOfRange(String),
}

impl ErrorCode {
    /// Stable identifier for tooling, e.g. `CYCLIC_CLASS`
    pub fn name(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            IllegalCharacter(_) => "ILLEGAL_CHARACTER",
            UnterminatedString => "UNTERMINATED_STRING",
            UnterminatedComment => "UNTERMINATED_COMMENT",
            MalformedNumber(_) => "MALFORMED_NUMBER",
            InvalidEscape(_) => "INVALID_ESCAPE",
            InvalidInterpolation => "INVALID_INTERPOLATION",
            UnexpectedToken { .. } => "UNEXPECTED_TOKEN",
            UnexpectedEof(_) => "UNEXPECTED_EOF",
            ExpectedExpression(_) => "EXPECTED_EXPRESSION",
            ExpectedIdentifier(_) => "EXPECTED_IDENTIFIER",
            ExpectedType(_) => "EXPECTED_TYPE",
            ExpectedClassMember(_) => "EXPECTED_CLASS_MEMBER",
            ExpectedTopLevelDeclaration(_) => "EXPECTED_TOP_LEVEL_DECLARATION",
            DirectiveAfterDeclaration => "DIRECTIVE_AFTER_DECLARATION",
            DuplicateLibraryDirective => "DUPLICATE_LIBRARY_DIRECTIVE",
            UnknownDirective(_) => "UNKNOWN_DIRECTIVE",
            DirectiveArgumentNotString => "DIRECTIVE_ARGUMENT_NOT_STRING",
            BuiltInIdentifierAsType(_) => "BUILT_IN_IDENTIFIER_AS_TYPE",
            IllegalAssignmentTarget => "ILLEGAL_ASSIGNMENT_TARGET",
            NonAssociativeOperator(_) => "NON_ASSOCIATIVE_OPERATOR",
            NestingTooDeep => "NESTING_TOO_DEEP",
            ParserGasExhausted => "PARSER_GAS_EXHAUSTED",
            DuplicateDeclaration(_) => "DUPLICATE_DECLARATION",
            DuplicateLocalVariable(_) => "DUPLICATE_LOCAL_VARIABLE",
            DuplicateParameter(_) => "DUPLICATE_PARAMETER",
            DuplicateTypeVariable(_) => "DUPLICATE_TYPE_VARIABLE",
            DuplicateLabel(_) => "DUPLICATE_LABEL",
            Shadows { .. } => "SHADOWS",
            CannotResolve(_) => "CANNOT_RESOLVE",
            UnresolvedSupertype(_) => "UNRESOLVED_SUPERTYPE",
            NoSuchType(_) => "NO_SUCH_TYPE",
            NotAType(_) => "NOT_A_TYPE",
            NotAClass(_) => "NOT_A_CLASS",
            ExtendsInterface(_) => "EXTENDS_INTERFACE",
            DefaultMustBeClass(_) => "DEFAULT_MUST_BE_CLASS",
            CyclicClass(_) => "CYCLIC_CLASS",
            WrongTypeArgumentCount { .. } => "WRONG_TYPE_ARGUMENT_COUNT",
            MemberConflict { .. } => "MEMBER_CONFLICT",
            DuplicateConstructor(_) => "DUPLICATE_CONSTRUCTOR",
            IllegalConstructorModifier(_) => "ILLEGAL_CONSTRUCTOR_MODIFIER",
            ConstructorWithReturnType => "CONSTRUCTOR_WITH_RETURN_TYPE",
            ConstructorNameMismatch { .. } => "CONSTRUCTOR_NAME_MISMATCH",
            InterfaceMethodWithBody(_) => "INTERFACE_METHOD_WITH_BODY",
            MissingMethodBody(_) => "MISSING_METHOD_BODY",
            UnresolvedLabel(_) => "UNRESOLVED_LABEL",
            ContinueTargetsSwitch(_) => "CONTINUE_TARGETS_SWITCH",
            BreakOutsideLoop => "BREAK_OUTSIDE_LOOP",
            ContinueOutsideLoop => "CONTINUE_OUTSIDE_LOOP",
            ThisNotAllowed(_) => "THIS_NOT_ALLOWED",
            SuperNotAllowed(_) => "SUPER_NOT_ALLOWED",
            InstanceMemberFromStatic(_) => "INSTANCE_MEMBER_FROM_STATIC",
            StaticMemberThroughInstance(_) => "STATIC_MEMBER_THROUGH_INSTANCE",
            NotAStaticMember { .. } => "NOT_A_STATIC_MEMBER",
            NoSuchConstructor(_) => "NO_SUCH_CONSTRUCTOR",
            WrongArgumentCount { .. } => "WRONG_ARGUMENT_COUNT",
            RedirectCycle(_) => "REDIRECT_CYCLE",
            RedirectingConstructorNotAlone => "REDIRECTING_CONSTRUCTOR_NOT_ALONE",
            MultipleSuperInitializers => "MULTIPLE_SUPER_INITIALIZERS",
            NotAField(_) => "NOT_A_FIELD",
            FieldParameterOutsideConstructor(_) => "FIELD_PARAMETER_OUTSIDE_CONSTRUCTOR",
            InstantiateInterface(_) => "INSTANTIATE_INTERFACE",
            InstantiateAbstractClass(_) => "INSTANTIATE_ABSTRACT_CLASS",
            TypeVariableInStaticContext(_) => "TYPE_VARIABLE_IN_STATIC_CONTEXT",
            NotConstant => "NOT_CONSTANT",
            ExpectedInt => "EXPECTED_INT",
            ExpectedNumber => "EXPECTED_NUMBER",
            ExpectedBool => "EXPECTED_BOOL",
            ExpectedStringNumberBool => "EXPECTED_STRING_NUMBER_BOOL",
            CyclicConstant(_) => "CYCLIC_CONSTANT",
            TypeVariableInConstCollection(_) => "TYPE_VARIABLE_IN_CONST_COLLECTION",
            NonConstConstructor(_) => "NON_CONST_CONSTRUCTOR",
            ConstDivisionByZero => "CONST_DIVISION_BY_ZERO",
            ConstWithoutInitializer(_) => "CONST_WITHOUT_INITIALIZER",
            IntegerOutOfRange(_) => "INTEGER_OUT_OF_RANGE",
        }
    }

    pub fn category(&self) -> Category {
        use ErrorCode::*;
        match self {
            IllegalCharacter(_) | UnterminatedString | UnterminatedComment | MalformedNumber(_)
            | InvalidEscape(_) | InvalidInterpolation => Category::Lexical,
            UnexpectedToken { .. } | UnexpectedEof(_) | ExpectedExpression(_) | ExpectedIdentifier(_)
            | ExpectedType(_) | ExpectedClassMember(_) | ExpectedTopLevelDeclaration(_)
            | DirectiveAfterDeclaration | DuplicateLibraryDirective | UnknownDirective(_)
            | DirectiveArgumentNotString | BuiltInIdentifierAsType(_) | IllegalAssignmentTarget
            | NonAssociativeOperator(_)
            | NestingTooDeep | ParserGasExhausted => Category::Syntax,
            NotConstant | ExpectedInt | ExpectedNumber | ExpectedBool | ExpectedStringNumberBool
            | CyclicConstant(_) | TypeVariableInConstCollection(_) | NonConstConstructor(_)
            | ConstDivisionByZero | ConstWithoutInitializer(_) | IntegerOutOfRange(_) => Category::Constant,
            _ => Category::Resolution,
        }
    }

    pub fn default_severity(&self) -> Severity {
        use ErrorCode::*;
        match self {
            Shadows { .. } => Severity::Warning,
            NoSuchType(_) | InstantiateAbstractClass(_) | TypeVariableInStaticContext(_)
            | WrongArgumentCount { .. } => Severity::TypeError,
            _ => Severity::Error,
        }
    }
}

/// One structured diagnostic record
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub source: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl Diagnostic {
    pub fn span(&self) -> Span {
        Span::new(self.offset, self.length)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}]: {}",
            self.source,
            self.line,
            self.column,
            self.severity,
            self.code.name(),
            self.message
        )
    }
}

/// Receives diagnostics from a compilation session
pub trait DiagnosticListener {
    fn on_compilation_error(&mut self, diagnostic: Diagnostic);
    fn on_type_error(&mut self, diagnostic: Diagnostic);
    fn on_warning(&mut self, diagnostic: Diagnostic);
    /// Called once a unit has been fully parsed and, for sessions, resolved
    fn unit_completed(&mut self, _unit: &str) {}
}

/// Listener that keeps every diagnostic in arrival order
#[derive(Debug, Default, Clone)]
pub struct CollectingListener {
    pub diagnostics: Vec<Diagnostic>,
    pub completed: Vec<String>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn type_errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::TypeError)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Codes of all diagnostics, in order
    pub fn codes(&self) -> Vec<&'static str> {
        self.diagnostics.iter().map(|d| d.code.name()).collect()
    }
}

impl DiagnosticListener for CollectingListener {
    fn on_compilation_error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn on_type_error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn on_warning(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn unit_completed(&mut self, unit: &str) {
        self.completed.push(unit.to_string());
    }
}

fn deliver(listener: &mut dyn DiagnosticListener, diagnostic: Diagnostic) {
    match diagnostic.severity {
        Severity::Error => listener.on_compilation_error(diagnostic),
        Severity::TypeError => listener.on_type_error(diagnostic),
        Severity::Warning => listener.on_warning(diagnostic),
    }
}

/// Front door of the diagnostic channel for one session.
///
/// Maps spans to line/column, applies `warnings_as_errors` /
/// `suppress_warnings`, and enforces the per-unit error budget.
pub struct Reporter<'l> {
    listener: &'l mut dyn DiagnosticListener,
    warnings_as_errors: bool,
    suppress_warnings: bool,
    max_errors: usize,
    unit_errors: HashMap<String, usize>,
    errors: usize,
    warnings: usize,
    dropped: usize,
}

impl<'l> Reporter<'l> {
    pub fn new(listener: &'l mut dyn DiagnosticListener, config: &Config) -> Self {
        Self {
            listener,
            warnings_as_errors: config.warnings_as_errors,
            suppress_warnings: config.suppress_warnings,
            max_errors: config.max_errors,
            unit_errors: HashMap::new(),
            errors: 0,
            warnings: 0,
            dropped: 0,
        }
    }

    /// Report `code` at `span` of `source` with the code's default severity
    pub fn report(&mut self, source: &Source, span: Span, code: ErrorCode) {
        let severity = code.default_severity();
        self.report_with_severity(source, span, code, severity);
    }

    pub fn report_with_severity(&mut self, source: &Source, span: Span, code: ErrorCode, severity: Severity) {
        let loc = source.location(span.offset);
        let diagnostic = Diagnostic {
            message: code.to_string(),
            code,
            severity,
            source: source.name().to_string(),
            line: loc.line,
            column: loc.column,
            offset: span.offset,
            length: span.len,
        };
        self.emit(diagnostic);
    }

    /// Deliver an already-built diagnostic (e.g. one collected on a worker thread)
    pub fn emit(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Warning && self.suppress_warnings {
            self.dropped += 1;
            return;
        }
        if diagnostic.severity != Severity::Error && self.warnings_as_errors {
            diagnostic.severity = Severity::Error;
        }
        if diagnostic.severity == Severity::Error {
            let count = self.unit_errors.entry(diagnostic.source.clone()).or_insert(0);
            if *count >= self.max_errors {
                self.dropped += 1;
                return;
            }
            *count += 1;
            self.errors += 1;
        } else {
            self.warnings += 1;
        }
        log::trace!("diagnostic: {}", diagnostic);
        deliver(self.listener, diagnostic);
    }

    pub fn unit_completed(&mut self, unit: &str) {
        self.listener.unit_completed(unit);
    }

    /// Whether `unit` has used up its error budget
    pub fn budget_exhausted(&self, unit: &str) -> bool {
        self.unit_errors.get(unit).map_or(false, |n| *n >= self.max_errors)
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Source {
        Source::new("t.dart", "class A {}\nclass B {}\n")
    }

    #[test]
    fn maps_offsets_to_lines() {
        let mut sink = CollectingListener::new();
        let mut reporter = Reporter::new(&mut sink, &Config::default());
        reporter.report(&source(), Span::new(17, 1), ErrorCode::CyclicClass("B".into()));
        drop(reporter);
        let d = &sink.diagnostics[0];
        assert_eq!((d.line, d.column), (2, 7));
        assert_eq!(d.message, "cyclic class hierarchy involving 'B'");
        assert_eq!(d.code.category(), Category::Resolution);
    }

    #[test]
    fn warning_policy_is_applied() {
        let shadow = || ErrorCode::Shadows { name: "x".into(), hidden: "field 'x'".into() };

        let mut sink = CollectingListener::new();
        let config = Config::default().warnings_as_errors(true);
        let mut reporter = Reporter::new(&mut sink, &config);
        reporter.report(&source(), Span::new(0, 1), shadow());
        assert_eq!(reporter.error_count(), 1);
        drop(reporter);
        assert!(sink.has_errors());

        let mut sink = CollectingListener::new();
        let config = Config::default().suppress_warnings(true);
        let mut reporter = Reporter::new(&mut sink, &config);
        reporter.report(&source(), Span::new(0, 1), shadow());
        assert_eq!(reporter.dropped_count(), 1);
        drop(reporter);
        assert!(sink.diagnostics.is_empty());
    }

    #[test]
    fn error_budget_is_per_unit() {
        let mut sink = CollectingListener::new();
        let config = Config::default().max_errors(2);
        let mut reporter = Reporter::new(&mut sink, &config);
        for _ in 0..5 {
            reporter.report(&source(), Span::new(0, 1), ErrorCode::NotConstant);
        }
        assert!(reporter.budget_exhausted("t.dart"));
        let other = Source::new("u.dart", "x");
        reporter.report(&other, Span::new(0, 1), ErrorCode::NotConstant);
        assert_eq!(reporter.error_count(), 3);
        assert_eq!(reporter.dropped_count(), 3);
    }
}
