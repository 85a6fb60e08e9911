mod common;

use common::{codes, compile, count, find_exprs};
use dartc::ast::ExprKind;
use dartc::element::ElementKind;

#[test]
fn this_is_rejected_outside_instance_code() {
    let text = "class A {\n  var y = this;\n  static foo() { return this; }\n  factory A() { return this; }\n  bar() => this;\n}\n";
    let (_, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["THIS_NOT_ALLOWED"; 3]);
    let messages: Vec<_> = listener.diagnostics.iter().map(|d| d.message.as_str()).collect();
    for reason in ["in a field initializer", "in a static method", "in a factory constructor"] {
        assert!(messages.iter().any(|m| m.ends_with(reason)), "{:?}", messages);
    }
}

#[test]
fn this_and_super_at_top_level() {
    let found = codes("f() => super.foo();\ng() => this;\n");
    assert_eq!(count(&found, "SUPER_NOT_ALLOWED"), 1, "{:?}", found);
    assert_eq!(count(&found, "THIS_NOT_ALLOWED"), 1, "{:?}", found);
}

#[test]
fn instance_members_are_out_of_reach_of_static_code() {
    let found = codes("class A {\n  var x;\n  static foo() => x;\n  bar() => x;\n}\n");
    assert_eq!(found, vec!["INSTANCE_MEMBER_FROM_STATIC"]);
}

#[test]
fn static_code_falls_back_to_top_level_names() {
    let (compilation, listener) = compile("var x;\nclass A {\n  var x;\n  static foo() => x;\n}\n");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
    let program = &compilation.program;
    let top = program.top_level(0, "x").expect("top-level x");
    let uses = find_exprs(&compilation, |e| matches!(&e.kind, ExprKind::Identifier(name) if name == "x"));
    assert_eq!(uses.len(), 1);
    assert_eq!(program.resolution.referenced(uses[0].id), Some(top));
}

#[test]
fn static_members_go_through_the_class() {
    let text = "class A {\n  var x;\n  static var s;\n  foo() => this.s;\n}\nmain() {\n  A.s;\n  A.x;\n}\n";
    let (_, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["STATIC_MEMBER_THROUGH_INSTANCE", "NOT_A_STATIC_MEMBER"]);
    assert_eq!(listener.diagnostics[1].message, "'x' is not a static member of 'A'");
}

#[test]
fn unresolved_names() {
    let (_, listener) = compile("main() {\n  foo();\n  var y = z + 1;\n}\n");
    assert_eq!(listener.codes(), vec!["CANNOT_RESOLVE"; 2]);
    assert_eq!(listener.diagnostics[0].message, "cannot resolve 'foo'");
}

#[test]
fn members_and_top_level_names_are_recorded() {
    let text = "helper(a) => a;\nclass A {\n  var field;\n  method() => helper(field);\n}\n";
    let (compilation, listener) = compile(text);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    let program = &compilation.program;
    let helper = program.top_level(0, "helper").expect("helper");
    let a = program.top_level(0, "A").expect("class A");
    let field = program.member(a, "field").expect("A.field");
    assert_eq!(program.elements.get(field).kind, ElementKind::Field);

    let calls = find_exprs(&compilation, |e| matches!(e.kind, ExprKind::MethodCall { .. }));
    assert_eq!(program.resolution.referenced(calls[0].id), Some(helper));
    let uses = find_exprs(&compilation, |e| matches!(&e.kind, ExprKind::Identifier(name) if name == "field"));
    assert_eq!(program.resolution.referenced(uses[0].id), Some(field));
}

#[test]
fn call_argument_counts() {
    let found = codes("foo(a) {}\nmain() {\n  foo();\n  print(1, 2);\n  foo(1);\n  print('ok');\n}\n");
    assert_eq!(found, vec!["WRONG_ARGUMENT_COUNT"; 2]);
}

#[test]
fn unlabeled_jumps_need_a_target() {
    let found = codes("main() {\n  break;\n  continue;\n  while (true) { break; }\n  switch (1) { case 1: break; }\n}\n");
    assert_eq!(found, vec!["BREAK_OUTSIDE_LOOP", "CONTINUE_OUTSIDE_LOOP"]);
}

#[test]
fn continue_in_switch_without_loop() {
    let found = codes("main() {\n  switch (1) { case 1: continue; }\n}\n");
    assert_eq!(found, vec!["CONTINUE_OUTSIDE_LOOP"]);
}

#[test]
fn labeled_jumps() {
    let text = "main() {\n  L: { continue L; }\n  S: switch (1) { case 1: continue S; }\n  M: while (true) { break M; }\n  break N;\n}\n";
    let found = codes(text);
    assert_eq!(found, vec!["CONTINUE_OUTSIDE_LOOP", "CONTINUE_TARGETS_SWITCH", "UNRESOLVED_LABEL"]);
}

#[test]
fn switch_case_labels_are_continue_targets() {
    let found = codes("main() {\n  switch (1) {\n    L: case 1: break;\n    case 2: continue L;\n  }\n}\n");
    assert!(found.is_empty(), "{:?}", found);
}

#[test]
fn labels_do_not_cross_function_boundaries() {
    let text = "main() {\n  L: while (true) {\n    var f = () { break L; };\n    var g = () { break; };\n  }\n}\n";
    assert_eq!(codes(text), vec!["UNRESOLVED_LABEL", "BREAK_OUTSIDE_LOOP"]);
}

#[test]
fn nested_duplicate_labels() {
    let found = codes("main() {\n  L: while (true) {\n    L: while (true) { break L; }\n  }\n}\n");
    assert_eq!(found, vec!["DUPLICATE_LABEL"]);
}
