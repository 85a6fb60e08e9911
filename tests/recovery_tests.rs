use dartc::ast::{print_signatures, validate_positions, ClassMember, ParentMap, TopLevelDecl};
use dartc::parser::{parse, ParseOutput};
use dartc::{Config, Source};
use proptest::prelude::*;

fn parse_text(text: &str) -> ParseOutput {
    parse(&Source::new("test.dart", text), &Config::default().validate_positions(false))
}

fn member_names(output: &ParseOutput, class: &str) -> Vec<String> {
    let class = output.unit.class(class).unwrap_or_else(|| panic!("class {} missing", class));
    class
        .members
        .iter()
        .map(|m| match m {
            ClassMember::Method(m) => m.name.name.clone(),
            ClassMember::Field(f) => f.variables[0].name.name.clone(),
        })
        .collect()
}

#[test]
fn missing_class_brace_keeps_both_classes() {
    let output = parse_text("class A {\n  foo() {}\n  int x;\n\nclass B {\n  bar() {}\n}\n");
    assert!(!output.errors.is_empty());
    assert_eq!(output.unit.declarations.len(), 2);
    assert_eq!(member_names(&output, "A"), vec!["foo", "x"]);
    assert_eq!(member_names(&output, "B"), vec!["bar"]);
}

#[test]
fn missing_method_brace_keeps_next_class() {
    let output = parse_text("class A {\n  foo() {\n    print(1);\n\nclass B {\n  bar() {}\n}\n");
    assert!(!output.errors.is_empty());
    assert_eq!(member_names(&output, "A"), vec!["foo"]);
    assert_eq!(member_names(&output, "B"), vec!["bar"]);
}

#[test]
fn broken_class_header_keeps_the_body() {
    let output = parse_text("class A extends Object implements {\n  foo() {}\n}\nclass B {}\n");
    assert_eq!(output.errors.len(), 1, "{:?}", output.errors);
    let class = output.unit.class("A").expect("class A");
    assert!(class.superclass.is_some());
    assert!(class.interfaces.is_empty());
    assert_eq!(member_names(&output, "A"), vec!["foo"]);
    assert!(output.unit.class("B").is_some());
}

#[test]
fn missing_open_brace_is_assumed() {
    let output = parse_text("class A\n  foo() {}\n  var x;\n}\nclass B {}\n");
    assert_eq!(output.errors.len(), 1, "{:?}", output.errors);
    assert_eq!(member_names(&output, "A"), vec!["foo", "x"]);
    assert!(output.unit.class("B").is_some());
}

#[test]
fn truncated_headers_still_declare_the_class() {
    let cases = [
        ("class A extends B", "A"),
        ("class A<T", "A"),
        ("interface I default", "I"),
        ("class A implements I, {\n}\n", "A"),
        ("class A<T\n  foo() {}\n}\n", "A"),
    ];
    for (text, name) in cases {
        let output = parse_text(text);
        assert_eq!(output.errors.len(), 1, "{}: {:?}", text, output.errors);
        assert_eq!(output.unit.declarations.len(), 1, "{}", text);
        assert!(output.unit.class(name).is_some(), "{}", text);
    }
    assert_eq!(member_names(&parse_text(cases[4].0), "A"), vec!["foo"]);
}

#[test]
fn broken_member_does_not_swallow_the_next_one() {
    let output = parse_text("class A {\n  int foo(;\n  bar() {}\n}\n");
    assert!(!output.errors.is_empty());
    assert!(member_names(&output, "A").contains(&"bar".to_string()));
}

#[test]
fn broken_statement_resynchronizes_at_next_line() {
    let output = parse_text("main() {\n  var x = ;\n  ) ) foo(\n  print(2);\n}\nclass After {}\n");
    assert!(!output.errors.is_empty());
    assert!(output.unit.class("After").is_some());
    assert!(matches!(output.unit.declarations[0], TopLevelDecl::Function(_)));
}

#[test]
fn garbage_at_top_level_is_skipped() {
    let output = parse_text("+ + ) ;\nclass A {}\n} }\nclass B {}\n");
    assert!(!output.errors.is_empty());
    assert!(output.unit.class("A").is_some());
    assert!(output.unit.class("B").is_some());
}

#[test]
fn unterminated_string_and_comment_terminate() {
    for text in ["class A { var s = \"abc", "class A { /* never closed", "main() { print('${x", "#library(\"L"] {
        let output = parse_text(text);
        assert!(!output.errors.is_empty(), "{:?} parsed cleanly", text);
        validate_positions(&output.unit, text.len()).expect("spans stay inside the unit");
    }
}

#[test]
fn deep_nesting_is_cut_off() {
    let text = format!("main() {{ var x = {}1{}; }}", "(".repeat(5000), ")".repeat(5000));
    let output = parse_text(&text);
    let codes: Vec<_> = output.errors.iter().map(|e| e.code().name()).collect();
    assert!(codes.contains(&"NESTING_TOO_DEEP"), "{:?}", codes);
}

#[test]
fn error_budget_limits_recorded_errors() {
    let text = format!("class A {{\n{}}}\n", "  int foo(;\n".repeat(20));
    let config = Config::default().validate_positions(false).max_errors(3);
    let output = parse(&Source::new("test.dart", text.as_str()), &config);
    assert_eq!(output.errors.len(), 3);
    assert!(output.dropped > 0);
}

#[test]
fn parent_map_links_children_to_parents() {
    let output = parse_text("class A { foo() { return 1 + 2; } }");
    let parents = ParentMap::build(&output.unit);
    let class = output.unit.class("A").expect("class A");
    assert_eq!(parents.parent(class.id), Some(output.unit.id));
    let ClassMember::Method(method) = &class.members[0] else { panic!("expected method") };
    assert_eq!(parents.parent(method.id), Some(class.id));
    let chain: Vec<_> = parents.ancestors(method.id).collect();
    assert_eq!(chain, vec![class.id, output.unit.id]);
}

const FRAGMENTS: &[&str] = &[
    "class", "A", "B", "extends", "implements", "interface", "default", "{", "}", "(", ")", "[", "]", "<", ">",
    ";", ",", ".", "..", "=", "=>", "+", "-", "*", "~/", "==", "===", "!", "?", ":", "var", "final", "const",
    "static", "factory", "get", "set", "operator", "new", "this", "super", "return", "if", "else", "for", "in",
    "while", "do", "switch", "case", "default", "break", "continue", "try", "catch", "finally", "throw", "is",
    "1", "0x1F", "2.5", "'s'", "\"a$b\"", "\"${", "'''x", "@\"raw", "/*", "*/", "//\n", "#library", "#import",
    "#source", "typedef", "void", "int", "x", "\n", " ",
];

fn fragment_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..120).prop_map(|parts| parts.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn parsing_terminates_on_arbitrary_text(text in "\\PC{0,300}") {
        let output = parse_text(&text);
        prop_assert!(validate_positions(&output.unit, text.len()).is_ok());
    }

    #[test]
    fn spans_nest_for_token_soup(text in fragment_soup()) {
        let output = parse_text(&text);
        let checked = validate_positions(&output.unit, text.len());
        prop_assert!(checked.is_ok(), "{:?} for {:?}", checked, text);
    }

    #[test]
    fn diet_parse_terminates_on_token_soup(text in fragment_soup()) {
        let source = Source::new("test.dart", text.as_str());
        let output = parse(&source, &Config::default().diet(true).validate_positions(false));
        prop_assert!(validate_positions(&output.unit, text.len()).is_ok());
    }

    #[test]
    fn diet_and_full_parses_agree_on_signatures(text in fragment_soup()) {
        let source = Source::new("test.dart", text.as_str());
        let full = parse(&source, &Config::default().validate_positions(false));
        let diet = parse(&source, &Config::default().diet(true).validate_positions(false));
        prop_assert_eq!(print_signatures(&full.unit), print_signatures(&diet.unit), "for {:?}", text);
    }
}
