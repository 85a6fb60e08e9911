mod common;

use common::{codes, compile, count, find_exprs};
use dartc::ast::ExprKind;
use dartc::element::ElementKind;
use dartc::Severity;

#[test]
fn type_variable_hiding_a_class_warns_and_wins() {
    let (compilation, listener) = compile("class A {}\nclass C<A> {\n  static foo() { new A(); }\n}\n");
    assert_eq!(listener.codes(), vec!["SHADOWS", "TYPE_VARIABLE_IN_STATIC_CONTEXT"]);

    let shadow = &listener.diagnostics[0];
    assert_eq!(shadow.severity, Severity::Warning);
    assert_eq!(shadow.message, "'A' hides class 'A'");
    assert_eq!(listener.diagnostics[1].severity, Severity::TypeError);

    let news = find_exprs(&compilation, |e| matches!(e.kind, ExprKind::New { .. }));
    assert_eq!(news.len(), 1);
    let target = compilation.program.resolution.referenced(news[0].id).expect("new resolves");
    assert_eq!(compilation.program.elements.get(target).kind, ElementKind::TypeVariable);
}

#[test]
fn local_hiding_a_field_warns() {
    let (_, listener) = compile("class A {\n  var x;\n  foo() { var x = 1; return x; }\n}\n");
    assert_eq!(listener.codes(), vec!["SHADOWS"]);
    assert_eq!(listener.diagnostics[0].message, "'x' hides field 'x'");
}

#[test]
fn nested_local_hiding_an_outer_local_warns() {
    let (_, listener) = compile("main() {\n  var x = 1;\n  { var x = 2; print(x); }\n  print(x);\n}\n");
    assert_eq!(listener.codes(), vec!["SHADOWS"]);
    assert_eq!(listener.diagnostics[0].message, "'x' hides variable 'x'");
}

#[test]
fn core_names_never_warn() {
    let found = codes("main() {\n  var print = 1;\n  var int = 2;\n  return print + int;\n}\n");
    assert_eq!(count(&found, "SHADOWS"), 0, "{:?}", found);
}

#[test]
fn same_scope_duplicates_are_errors() {
    let found = codes("main() {\n  var x = 1;\n  var x = 2;\n}\n");
    assert_eq!(found, vec!["DUPLICATE_LOCAL_VARIABLE"]);
}

#[test]
fn parameter_and_body_local_share_a_scope() {
    let found = codes("f(a) {\n  var a = 1;\n  return a;\n}\n");
    assert_eq!(count(&found, "DUPLICATE_LOCAL_VARIABLE"), 1, "{:?}", found);
    assert_eq!(count(&found, "SHADOWS"), 0);
}

#[test]
fn duplicate_parameters_and_type_variables() {
    let found = codes("f(a, a) {}\nclass G<T, T> {}\n");
    assert!(found.contains(&"DUPLICATE_PARAMETER"), "{:?}", found);
    assert!(found.contains(&"DUPLICATE_TYPE_VARIABLE"), "{:?}", found);
}

#[test]
fn duplicate_top_level_declarations() {
    let found = codes("class A {}\nclass A {}\nfoo() {}\nvar foo;\n");
    assert_eq!(count(&found, "DUPLICATE_DECLARATION"), 2, "{:?}", found);
}

#[test]
fn for_in_variable_is_scoped_to_the_loop() {
    let found = codes("main() {\n  for (var i in [1, 2]) { print(i); }\n  print(i);\n}\n");
    assert_eq!(found, vec!["CANNOT_RESOLVE"]);
}

#[test]
fn locals_resolve_to_their_declarations() {
    let (compilation, listener) = compile("main() {\n  var total = 0;\n  total = total + 1;\n}\n");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
    let program = &compilation.program;
    let variables: Vec<_> = program.elements.of_kind(ElementKind::Variable).filter(|e| e.name == "total").collect();
    assert_eq!(variables.len(), 1);
    assert!(program.resolution.reference_count() >= 2);
}
