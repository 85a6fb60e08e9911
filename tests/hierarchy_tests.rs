mod common;

use common::{codes, compile, count};
use dartc::element::{ElementKind, Type};

#[test]
fn cycle_reports_each_member_once() {
    let (_, listener) = compile("class A extends B {}\nclass B extends A {}\nclass C extends A {}\n");
    assert_eq!(listener.codes(), vec!["CYCLIC_CLASS", "CYCLIC_CLASS"]);
    let messages: Vec<_> = listener.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert!(messages.iter().all(|m| !m.contains("'C'")), "{:?}", messages);
}

#[test]
fn class_extending_itself_is_cyclic() {
    let (compilation, listener) = compile("class A extends A {}\n");
    assert_eq!(listener.codes(), vec!["CYCLIC_CLASS"]);
    let a = compilation.program.top_level(0, "A").expect("class A");
    let info = compilation.program.elements.get(a).class_info().expect("class info");
    assert!(info.is_cyclic);
}

#[test]
fn interface_cycles_are_detected_too() {
    let found = codes("interface I extends J {}\ninterface J extends I {}\n");
    assert_eq!(count(&found, "CYCLIC_CLASS"), 2, "{:?}", found);
}

#[test]
fn unresolved_supertype_suppresses_member_errors() {
    let text = "class A extends Missing {\n  foo() { bar(); }\n}\nmain() { new A.named(); }\n";
    let (compilation, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["UNRESOLVED_SUPERTYPE"]);
    let a = compilation.program.top_level(0, "A").expect("class A");
    assert!(compilation.program.elements.get(a).class_info().map_or(false, |info| info.incomplete));
}

#[test]
fn subclass_of_incomplete_class_is_incomplete() {
    let (compilation, listener) = compile("class A extends Missing {}\nclass B extends A {\n  foo() => bar;\n}\n");
    assert_eq!(listener.codes(), vec!["UNRESOLVED_SUPERTYPE"]);
    let b = compilation.program.top_level(0, "B").expect("class B");
    assert!(compilation.program.elements.get(b).class_info().map_or(false, |info| info.incomplete));
}

#[test]
fn broken_header_clause_does_not_cascade() {
    let found = codes("class A extends Object implements {\n  foo() {}\n}\nmain() { new A().foo(); }\n");
    assert_eq!(found, vec!["EXPECTED_TYPE"]);
}

#[test]
fn class_cannot_extend_an_interface() {
    let found = codes("interface I {}\nclass A extends I {}\nclass B implements I {}\n");
    assert_eq!(found, vec!["EXTENDS_INTERFACE"]);
}

#[test]
fn supertypes_must_be_classes() {
    let found = codes("var x;\ntypedef void F();\nclass A extends x {}\nclass B implements F {}\n");
    assert_eq!(found, vec!["NOT_A_CLASS", "NOT_A_CLASS"]);
}

#[test]
fn default_clause_must_name_a_class() {
    let found = codes("interface I default J {}\ninterface J {}\n");
    assert_eq!(found, vec!["DEFAULT_MUST_BE_CLASS"]);
}

#[test]
fn type_argument_count_is_checked() {
    let found = codes("class G<T> {}\nclass A extends G<int, int> {}\nclass B extends G<int> {}\nG<String> g;\n");
    assert_eq!(found, vec!["WRONG_TYPE_ARGUMENT_COUNT"]);
}

#[test]
fn unknown_and_non_type_annotations() {
    let found = codes("var v;\nclass A {\n  Missing m;\n  v w;\n}\n");
    assert_eq!(found, vec!["NO_SUCH_TYPE", "NOT_A_TYPE"]);
}

#[test]
fn supertype_closure_is_flattened() {
    let text = "interface I {}\nclass A {}\nclass B extends A {}\nclass C extends B implements I {}\n";
    let (compilation, listener) = compile(text);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    let program = &compilation.program;
    let lookup = |name: &str| program.top_level(0, name).expect(name);
    let (i, a, b, c) = (lookup("I"), lookup("A"), lookup("B"), lookup("C"));
    let supertypes = &program.elements.get(c).class_info().expect("class info").supertypes;
    assert_eq!(supertypes.len(), 3);
    assert!(supertypes.contains(&a) && supertypes.contains(&b) && supertypes.contains(&i));

    assert!(Type::interface(c).is_subtype_of(a, &program.elements));
    assert!(!Type::interface(a).is_subtype_of(c, &program.elements));
    assert_eq!(program.elements.get(i).kind, ElementKind::Interface);
}

#[test]
fn core_numbers_extend_num() {
    let (compilation, _) = compile("");
    let program = &compilation.program;
    let core = |name: &str| dartc::scope::lookup_own(&program.elements, program.core, name).expect(name);
    assert!(Type::interface(core("int")).is_subtype_of(core("num"), &program.elements));
    assert!(Type::interface(core("double")).is_subtype_of(core("num"), &program.elements));
    assert!(!Type::interface(core("String")).is_subtype_of(core("num"), &program.elements));
}

#[test]
fn getter_and_setter_may_share_a_name() {
    let found = codes("class A {\n  var x;\n  x() {}\n  get y() => 1;\n  set y(v) {}\n}\n");
    assert_eq!(found, vec!["MEMBER_CONFLICT"]);
}

#[test]
fn method_bodies_follow_the_declaration_kind() {
    let text = "interface I {\n  foo() {}\n}\nclass A {\n  bar();\n}\nabstract class B {\n  baz();\n}\nclass C {\n  abstract qux();\n}\n";
    let found = codes(text);
    assert_eq!(found, vec!["INTERFACE_METHOD_WITH_BODY", "MISSING_METHOD_BODY"]);
}
