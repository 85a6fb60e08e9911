mod common;

use common::{codes, compile, count, find_exprs};
use dartc::ast::ExprKind;
use dartc::Severity;

#[test]
fn redirect_cycle_reports_every_constructor_on_it() {
    let text = "class A {\n  A() : this.b();\n  A.b() : this.c();\n  A.c() : this();\n}\n";
    assert_eq!(codes(text), vec!["REDIRECT_CYCLE"; 3]);
}

#[test]
fn constructor_leading_into_a_cycle_is_reported() {
    let text = "class A {\n  A() : this.named1();\n  A.named1() : this.named2();\n  A.named2() : this.named1();\n  A.ok() : this.other();\n  A.other();\n}\n";
    let (_, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["REDIRECT_CYCLE"; 3]);
    assert!(listener.diagnostics.iter().all(|d| !d.message.contains("ok")));
}

#[test]
fn redirect_target_is_recorded() {
    let (compilation, listener) = compile("class A {\n  A(x);\n  A.zero() : this(0);\n}\n");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
    let program = &compilation.program;
    let a = program.top_level(0, "A").expect("class A");
    let zero = program.member(a, "zero").expect("A.zero");
    let unnamed = program.member(a, "").expect("A()");
    let info = program.elements.get(zero).function_info().expect("constructor info");
    assert_eq!(info.redirect, Some(unnamed));
}

#[test]
fn redirecting_constructor_must_stand_alone() {
    let found = codes("class A {\n  var x;\n  A() : this.b(), x = 1;\n  A.c() : this.b() {}\n  A.b();\n}\n");
    assert_eq!(found, vec!["REDIRECTING_CONSTRUCTOR_NOT_ALONE"; 2]);
}

#[test]
fn redirect_to_a_missing_constructor() {
    let (_, listener) = compile("class A {\n  A() : this.nope();\n}\n");
    assert_eq!(listener.codes(), vec!["NO_SUCH_CONSTRUCTOR"]);
    assert_eq!(listener.diagnostics[0].message, "no constructor 'A.nope'");
}

#[test]
fn only_one_super_initializer() {
    let text = "class S {\n  S();\n  S.n();\n}\nclass A extends S {\n  A() : super(), super.n();\n}\n";
    assert_eq!(codes(text), vec!["MULTIPLE_SUPER_INITIALIZERS"]);
}

#[test]
fn super_initializers_are_checked_against_the_superclass() {
    let text = "class S {\n  S(x);\n}\nclass A extends S {\n  A() : super(1);\n  A.b() : super();\n  A.c() : super.missing();\n}\n";
    assert_eq!(codes(text), vec!["WRONG_ARGUMENT_COUNT", "NO_SUCH_CONSTRUCTOR"]);
}

#[test]
fn field_initializers_name_own_fields() {
    let found = codes("class A {\n  var x;\n  A(this.y);\n  A.b() : z = 1;\n  A.c(this.x) ;\n  A.d() : x = 2;\n}\n");
    assert_eq!(found, vec!["NOT_A_FIELD", "NOT_A_FIELD"]);
}

#[test]
fn field_parameters_belong_to_constructors() {
    let found = codes("class A {\n  var x;\n  foo(this.x) {}\n}\nbar(this.x) {}\n");
    assert_eq!(found, vec!["FIELD_PARAMETER_OUTSIDE_CONSTRUCTOR"; 2]);
}

#[test]
fn duplicate_constructors() {
    let found = codes("class A {\n  A();\n  A(x);\n  A.n();\n  A.n();\n}\n");
    assert_eq!(found, vec!["DUPLICATE_CONSTRUCTOR"; 2]);
}

#[test]
fn constructor_shape_is_checked() {
    let found = codes("class A {\n  factory B() { return null; }\n}\nclass C {\n  static C();\n}\nclass D {\n  int D();\n}\n");
    assert_eq!(
        found,
        vec!["CONSTRUCTOR_NAME_MISMATCH", "ILLEGAL_CONSTRUCTOR_MODIFIER", "CONSTRUCTOR_WITH_RETURN_TYPE"]
    );
}

#[test]
fn interface_instantiation_goes_through_the_default_class() {
    let text = "interface Shape default ShapeFactory {\n  Shape(num size);\n}\n\
                class ShapeFactory {\n  factory Shape(num size) { return null; }\n}\n\
                main() { new Shape(1); }\n";
    let (compilation, listener) = compile(text);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    let program = &compilation.program;
    let factory_class = program.top_level(0, "ShapeFactory").expect("ShapeFactory");
    let factory = program.member(factory_class, "Shape").expect("factory keyed by the interface name");
    let news = find_exprs(&compilation, |e| matches!(e.kind, ExprKind::New { .. }));
    assert_eq!(program.resolution.referenced(news[0].id), Some(factory));
}

#[test]
fn interface_without_default_cannot_be_instantiated() {
    assert_eq!(codes("interface I {}\nmain() { new I(); }\n"), vec!["INSTANTIATE_INTERFACE"]);
}

#[test]
fn abstract_class_instantiation_is_a_type_error() {
    let (_, listener) = compile("abstract class A {}\nabstract class B {\n  factory B() { return null; }\n}\nmain() { new A(); new B(); }\n");
    assert_eq!(listener.codes(), vec!["INSTANTIATE_ABSTRACT_CLASS"]);
    assert_eq!(listener.diagnostics[0].severity, Severity::TypeError);
}

#[test]
fn missing_named_constructor() {
    let (_, listener) = compile("class A {\n  A();\n}\nmain() { new A.named(); }\n");
    assert_eq!(listener.codes(), vec!["NO_SUCH_CONSTRUCTOR"]);
    assert_eq!(listener.diagnostics[0].message, "no constructor 'A.named'");
}

#[test]
fn argument_counts_are_checked() {
    let (_, listener) = compile("class A {\n  A(x, [y]);\n}\nmain() { new A(); new A(1, 2, 3); new A(1); new A(1, 2); }\n");
    assert_eq!(listener.codes(), vec!["WRONG_ARGUMENT_COUNT"; 2]);
    assert_eq!(listener.diagnostics[0].message, "'A' expects 1 to 2 argument(s), found 0");
    assert_eq!(listener.diagnostics[0].severity, Severity::TypeError);
}

#[test]
fn implicit_and_core_constructors() {
    let found = codes("class A {}\nmain() {\n  new A();\n  new A(1);\n  new List();\n  new List(3);\n  new List(1, 2);\n}\n");
    assert_eq!(count(&found, "WRONG_ARGUMENT_COUNT"), 2, "{:?}", found);
    assert_eq!(found.len(), 2);
}
