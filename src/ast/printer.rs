use super::nodes::*;
use crate::parser::strings::quote;

/// Renders an AST back to source text that parses to the same tree.
///
/// In signatures-only mode function bodies are elided, which makes the
/// output of a diet parse and a full parse directly comparable.
pub struct AstPrinter {
    indent_level: usize,
    output: String,
    signatures_only: bool,
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
            signatures_only: false,
        }
    }

    /// Print declarations and signatures only, every body as `{}`
    pub fn signatures_only(mut self, on: bool) -> Self {
        self.signatures_only = on;
        self
    }

    pub fn print(&mut self, unit: &CompilationUnit) -> String {
        self.output.clear();
        self.indent_level = 0;
        for directive in &unit.directives {
            self.directive(directive);
        }
        if !unit.directives.is_empty() && !unit.declarations.is_empty() {
            self.output.push('\n');
        }
        for decl in &unit.declarations {
            self.top_level(decl);
        }
        std::mem::take(&mut self.output)
    }

    pub fn print_expr(&mut self, expr: &Expr) -> String {
        self.output.clear();
        self.expr(expr);
        std::mem::take(&mut self.output)
    }

    pub fn print_stmt(&mut self, stmt: &Stmt) -> String {
        self.output.clear();
        self.stmt(stmt);
        std::mem::take(&mut self.output)
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 2 {
            self.indent_level -= 2;
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn push(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn comma_separated<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            each(self, item);
        }
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn directive(&mut self, directive: &Directive) {
        let mut line = format!("#{}({}", directive.kind.name(), quote(&directive.value));
        if let Some(prefix) = &directive.prefix {
            line.push_str(&format!(", prefix: {}", quote(prefix)));
        }
        line.push_str(");");
        self.writeln(&line);
    }

    fn top_level(&mut self, decl: &TopLevelDecl) {
        match decl {
            TopLevelDecl::Class(c) => self.class(c),
            TopLevelDecl::TypeAlias(t) => self.typedef(t),
            TopLevelDecl::Function(m) => self.method(m),
            TopLevelDecl::Variables(f) => {
                self.write_indent();
                self.variables(f);
                self.push(";\n");
            }
        }
    }

    fn class(&mut self, class: &ClassDecl) {
        self.write_indent();
        if class.is_abstract {
            self.push("abstract ");
        }
        self.push(if class.is_interface { "interface " } else { "class " });
        self.push(&class.name.name);
        self.type_parameters(&class.type_params);
        if let Some(superclass) = &class.superclass {
            self.push(" extends ");
            self.type_node(superclass);
        }
        if !class.interfaces.is_empty() {
            self.push(if class.is_interface { " extends " } else { " implements " });
            self.comma_separated(&class.interfaces, |p, t| p.type_node(t));
        }
        if let Some(default) = &class.default_class {
            self.push(" default ");
            self.type_node(default);
        }
        self.push(" {\n");
        self.indent();
        for member in &class.members {
            match member {
                ClassMember::Field(f) => {
                    self.write_indent();
                    self.variables(f);
                    self.push(";\n");
                }
                ClassMember::Method(m) => self.method(m),
            }
        }
        self.dedent();
        self.writeln("}");
        self.output.push('\n');
    }

    fn typedef(&mut self, alias: &FunctionTypeAlias) {
        self.write_indent();
        self.push("typedef ");
        if let Some(rt) = &alias.return_type {
            self.type_node(rt);
            self.push(" ");
        }
        self.push(&alias.name.name);
        self.type_parameters(&alias.type_params);
        self.parameters(&alias.params);
        self.push(";\n");
    }

    fn modifiers(&mut self, modifiers: &Modifiers) {
        if modifiers.is_static {
            self.push("static ");
        }
        if modifiers.is_abstract {
            self.push("abstract ");
        }
        if modifiers.is_factory {
            self.push("factory ");
        }
        if modifiers.is_final {
            self.push("final ");
        }
        if modifiers.is_const {
            self.push("const ");
        }
    }

    /// Variable or field declaration without the trailing `;`
    fn variables(&mut self, decl: &FieldDecl) {
        self.modifiers(&decl.modifiers);
        match &decl.type_node {
            Some(t) => {
                self.type_node(t);
                self.push(" ");
            }
            None if !decl.modifiers.is_final && !decl.modifiers.is_const => self.push("var "),
            None => {}
        }
        self.comma_separated(&decl.variables, |p, v| {
            p.push(&v.name.name);
            if let Some(init) = &v.init {
                p.push(" = ");
                p.expr(init);
            }
        });
    }

    fn method(&mut self, method: &MethodDecl) {
        self.write_indent();
        self.modifiers(&method.modifiers);
        if let Some(rt) = &method.return_type {
            self.type_node(rt);
            self.push(" ");
        }
        match method.kind {
            MethodKind::Getter => self.push("get "),
            MethodKind::Setter => self.push("set "),
            MethodKind::Operator => self.push("operator "),
            MethodKind::Method | MethodKind::Constructor => {}
        }
        self.push(&method.name.name);
        if let Some(ctor) = &method.constructor_name {
            self.push(".");
            self.push(&ctor.name);
        }
        if method.kind != MethodKind::Getter || !method.params.is_empty() {
            self.parameters(&method.params);
        }
        if !method.initializers.is_empty() {
            self.push(" : ");
            self.comma_separated(&method.initializers, |p, i| p.initializer(i));
        }
        self.body(&method.body, true);
        self.push("\n");
    }

    fn initializer(&mut self, init: &Initializer) {
        match &init.kind {
            InitializerKind::Field { explicit_this, name, value } => {
                if *explicit_this {
                    self.push("this.");
                }
                self.push(&name.name);
                self.push(" = ");
                self.expr(value);
            }
            InitializerKind::Super { name, args } => {
                self.push("super");
                if let Some(name) = name {
                    self.push(".");
                    self.push(&name.name);
                }
                self.arguments(args);
            }
            InitializerKind::Redirect { name, args } => {
                self.push("this");
                if let Some(name) = name {
                    self.push(".");
                    self.push(&name.name);
                }
                self.arguments(args);
            }
        }
    }

    /// Function body; `declaration` bodies terminate `=>` with `;`
    fn body(&mut self, body: &FunctionBody, declaration: bool) {
        if self.signatures_only
            && matches!(body, FunctionBody::Block(_) | FunctionBody::Expression(_) | FunctionBody::Skipped(_))
        {
            self.push(" {}");
            return;
        }
        match body {
            FunctionBody::Block(block) => {
                self.push(" ");
                self.block(block);
            }
            FunctionBody::Expression(expr) => {
                self.push(" => ");
                self.expr(expr);
                if declaration {
                    self.push(";");
                }
            }
            FunctionBody::Native(name) => {
                self.push(" native");
                if let Some(name) = name {
                    self.push(" ");
                    self.push(&quote(name));
                }
                self.push(";");
            }
            FunctionBody::Skipped(_) => self.push(" {}"),
            FunctionBody::None => self.push(";"),
        }
    }

    fn parameters(&mut self, params: &[Parameter]) {
        self.push("(");
        let mut in_optional = false;
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if param.is_optional && !in_optional {
                self.push("[");
                in_optional = true;
            }
            self.parameter(param);
        }
        if in_optional {
            self.push("]");
        }
        self.push(")");
    }

    fn parameter(&mut self, param: &Parameter) {
        if param.modifiers.is_final {
            self.push("final ");
        } else if param.modifiers.is_const {
            self.push("const ");
        }
        if let Some(t) = &param.type_node {
            self.type_node(t);
            self.push(" ");
        }
        if param.is_field {
            self.push("this.");
        }
        self.push(&param.name.name);
        if let Some(params) = &param.function_params {
            self.parameters(params);
        }
        if let Some(default) = &param.default {
            self.push(" = ");
            self.expr(default);
        }
    }

    fn type_parameters(&mut self, params: &[TypeParameter]) {
        if params.is_empty() {
            return;
        }
        self.push("<");
        self.comma_separated(params, |p, param| {
            p.push(&param.name.name);
            if let Some(bound) = &param.bound {
                p.push(" extends ");
                p.type_node(bound);
            }
        });
        self.push(">");
    }

    fn type_node(&mut self, t: &TypeNode) {
        self.push(&t.qualified_name());
        self.type_arguments(&t.type_args);
    }

    fn type_arguments(&mut self, args: &[TypeNode]) {
        if args.is_empty() {
            return;
        }
        self.push("<");
        self.comma_separated(args, |p, t| p.type_node(t));
        self.push(">");
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn block(&mut self, block: &Block) {
        if block.statements.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{\n");
        self.indent();
        for stmt in &block.statements {
            self.write_indent();
            self.stmt(stmt);
            self.push("\n");
        }
        self.dedent();
        self.write_indent();
        self.push("}");
    }

    /// One statement starting at the current column, without a trailing newline
    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Variables(decl) => {
                self.variables(decl);
                self.push(";");
            }
            StmtKind::Expr(expr) => {
                self.expr(expr);
                self.push(";");
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.push("if (");
                self.expr(cond);
                self.push(") ");
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.push(" else ");
                    self.stmt(else_branch);
                }
            }
            StmtKind::For { init, cond, update, body } => {
                self.push("for (");
                if let Some(init) = init {
                    match &init.kind {
                        StmtKind::Variables(decl) => self.variables(decl),
                        StmtKind::Expr(expr) => self.expr(expr),
                        _ => {}
                    }
                }
                self.push("; ");
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.push("; ");
                self.comma_separated(update, |p, e| p.expr(e));
                self.push(") ");
                self.stmt(body);
            }
            StmtKind::ForIn { variable, iterable, body } => {
                self.push("for (");
                match variable {
                    ForInVariable::Declared(decl) => self.variables(decl),
                    ForInVariable::Existing(name) => self.push(&name.name),
                }
                self.push(" in ");
                self.expr(iterable);
                self.push(") ");
                self.stmt(body);
            }
            StmtKind::While { cond, body } => {
                self.push("while (");
                self.expr(cond);
                self.push(") ");
                self.stmt(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.push("do ");
                self.stmt(body);
                self.push(" while (");
                self.expr(cond);
                self.push(");");
            }
            StmtKind::Switch { expr, cases } => {
                self.push("switch (");
                self.expr(expr);
                self.push(") {\n");
                self.indent();
                for case in cases {
                    self.switch_case(case);
                }
                self.dedent();
                self.write_indent();
                self.push("}");
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                self.push(if matches!(stmt.kind, StmtKind::Break(_)) { "break" } else { "continue" });
                if let Some(label) = label {
                    self.push(" ");
                    self.push(&label.name);
                }
                self.push(";");
            }
            StmtKind::Return(value) | StmtKind::Throw(value) => {
                self.push(if matches!(stmt.kind, StmtKind::Return(_)) { "return" } else { "throw" });
                if let Some(value) = value {
                    self.push(" ");
                    self.expr(value);
                }
                self.push(";");
            }
            StmtKind::Try { body, catches, finally } => {
                self.push("try ");
                self.block(body);
                for catch in catches {
                    self.push(" catch (");
                    self.parameter(&catch.exception);
                    if let Some(st) = &catch.stack_trace {
                        self.push(", ");
                        self.parameter(st);
                    }
                    self.push(") ");
                    self.block(&catch.body);
                }
                if let Some(finally) = finally {
                    self.push(" finally ");
                    self.block(finally);
                }
            }
            StmtKind::Labeled { label, body } => {
                self.push(&label.name);
                self.push(": ");
                self.stmt(body);
            }
            StmtKind::Function(function) => {
                self.function(function);
                if matches!(function.body, FunctionBody::Expression(_)) {
                    self.push(";");
                }
            }
            StmtKind::Empty | StmtKind::Error => self.push(";"),
        }
    }

    fn switch_case(&mut self, case: &SwitchCase) {
        self.write_indent();
        for label in &case.labels {
            self.push(&label.name);
            self.push(": ");
        }
        for (i, expr) in case.exprs.iter().enumerate() {
            if i > 0 {
                self.push(" ");
            }
            self.push("case ");
            self.expr(expr);
            self.push(":");
        }
        if case.is_default {
            if !case.exprs.is_empty() {
                self.push(" ");
            }
            self.push("default:");
        }
        self.push("\n");
        self.indent();
        for stmt in &case.body {
            self.write_indent();
            self.stmt(stmt);
            self.push("\n");
        }
        self.dedent();
    }

    fn function(&mut self, function: &FunctionExpr) {
        if let Some(rt) = &function.return_type {
            self.type_node(rt);
            self.push(" ");
        }
        if let Some(name) = &function.name {
            self.push(&name.name);
        }
        self.parameters(&function.params);
        let saved = std::mem::replace(&mut self.signatures_only, false);
        self.body(&function.body, false);
        self.signatures_only = saved;
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn arguments(&mut self, args: &[Expr]) {
        self.push("(");
        self.comma_separated(args, |p, e| p.expr(e));
        self.push(")");
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Null => self.push("null"),
            // never valid source, so a reparse reports the hole again
            ExprKind::Error => self.push("/* error */"),
            ExprKind::Bool(b) => self.push(if *b { "true" } else { "false" }),
            ExprKind::Int { text, .. } | ExprKind::Double { text, .. } => self.push(text),
            ExprKind::String(s) => self.push(&quote(s)),
            ExprKind::Interpolation { strings, exprs } => {
                self.push("\"");
                for (i, segment) in strings.iter().enumerate() {
                    let quoted = quote(segment);
                    self.push(&quoted[1..quoted.len() - 1]);
                    if let Some(hole) = exprs.get(i) {
                        self.push("${");
                        self.expr(hole);
                        self.push("}");
                    }
                }
                self.push("\"");
            }
            ExprKind::Identifier(name) => self.push(name),
            ExprKind::This => self.push("this"),
            ExprKind::Super => self.push("super"),
            ExprKind::CascadeReceiver => {}
            ExprKind::PropertyAccess { target, name } => {
                self.expr(target);
                self.push(".");
                self.push(&name.name);
            }
            ExprKind::Index { target, index } => {
                self.expr(target);
                self.push("[");
                self.expr(index);
                self.push("]");
            }
            ExprKind::MethodCall { target, name, args } => {
                if let Some(target) = target {
                    self.expr(target);
                    self.push(".");
                }
                self.push(&name.name);
                self.arguments(args);
            }
            ExprKind::FunctionCall { callee, args } => {
                self.expr(callee);
                self.arguments(args);
            }
            ExprKind::New { is_const, type_node, constructor, args } => {
                self.push(if *is_const { "const " } else { "new " });
                self.type_node(type_node);
                if let Some(ctor) = constructor {
                    self.push(".");
                    self.push(&ctor.name);
                }
                self.arguments(args);
            }
            ExprKind::Unary { op, prefix: true, operand } => {
                self.push(op.symbol());
                // `- -x` must not print as `--x`
                if matches!(operand.kind, ExprKind::Unary { prefix: true, .. }) {
                    self.push(" ");
                }
                self.expr(operand);
            }
            ExprKind::Unary { op, operand, .. } => {
                self.expr(operand);
                self.push(op.symbol());
            }
            ExprKind::Binary { op, left, right } => {
                self.expr(left);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.expr(right);
            }
            ExprKind::Assign { op, target, value } => {
                self.expr(target);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.expr(value);
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                self.expr(cond);
                self.push(" ? ");
                self.expr(then_expr);
                self.push(" : ");
                self.expr(else_expr);
            }
            ExprKind::Is { expr, type_node, negated } => {
                self.expr(expr);
                self.push(if *negated { " is! " } else { " is " });
                self.type_node(type_node);
            }
            ExprKind::List { is_const, type_args, elements } => {
                if *is_const {
                    self.push("const ");
                }
                self.type_arguments(type_args);
                self.push("[");
                self.comma_separated(elements, |p, e| p.expr(e));
                self.push("]");
            }
            ExprKind::Map { is_const, type_args, entries } => {
                if *is_const {
                    self.push("const ");
                }
                self.type_arguments(type_args);
                self.push("{");
                self.comma_separated(entries, |p, entry| {
                    p.expr(&entry.key);
                    p.push(": ");
                    p.expr(&entry.value);
                });
                self.push("}");
            }
            ExprKind::Function(function) => self.function(function),
            ExprKind::Paren(inner) => {
                self.push("(");
                self.expr(inner);
                self.push(")");
            }
            ExprKind::Cascade { target, sections } => {
                self.expr(target);
                for section in sections {
                    // sections print as `.name...` off an empty receiver
                    self.push(".");
                    self.expr(section);
                }
            }
        }
    }
}

/// Render a whole unit as source text
pub fn print_unit(unit: &CompilationUnit) -> String {
    AstPrinter::new().print(unit)
}

/// Render only declarations and signatures, for outline comparisons
pub fn print_signatures(unit: &CompilationUnit) -> String {
    AstPrinter::new().signatures_only(true).print(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser;
    use crate::source::Source;

    fn roundtrip(text: &str) -> String {
        let source = Source::new("t.dart", text);
        let output = parser::parse(&source, &Config::default());
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        print_unit(&output.unit)
    }

    #[test]
    fn prints_nested_negation_with_space() {
        let printed = roundtrip("f() => - -x;");
        assert!(printed.contains("- -x"), "{}", printed);
    }

    #[test]
    fn prints_hex_and_double_literals_verbatim() {
        let printed = roundtrip("var a = 0xFF, b = 1.50;");
        assert!(printed.contains("0xFF"), "{}", printed);
        assert!(printed.contains("1.50"), "{}", printed);
    }

    #[test]
    fn prints_interpolation_holes_braced() {
        let printed = roundtrip("var s = 'a $b ${c + 1}';");
        assert!(printed.contains(r#""a ${b} ${c + 1}""#), "{}", printed);
    }

    #[test]
    fn prints_a_single_expression() {
        let source = Source::new("t.dart", "var a = x ? f(1, 2) : new A.b();");
        let output = parser::parse(&source, &Config::default());
        let TopLevelDecl::Variables(fields) = &output.unit.declarations[0] else { panic!("expected variables") };
        let init = fields.variables[0].init.as_ref().expect("initializer");
        assert_eq!(AstPrinter::new().print_expr(init), "x ? f(1, 2) : new A.b()");
    }

    #[test]
    fn signature_mode_elides_bodies() {
        let source = Source::new("t.dart", "class A { foo() { return 1; } get x => 2; }");
        let output = parser::parse(&source, &Config::default());
        let printed = print_signatures(&output.unit);
        assert!(!printed.contains("return"));
        assert!(printed.contains("foo() {}"));
        assert!(printed.contains("get x {}"));
    }
}
