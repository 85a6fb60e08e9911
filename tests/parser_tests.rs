use dartc::ast::{print_signatures, print_unit, ClassMember, ExprKind, FunctionBody, MethodKind, StmtKind, TopLevelDecl};
use dartc::parser::{parse, LibraryUnit, ParseOutput};
use dartc::{parse_library_directives, Config, Source};

fn parse_text(text: &str) -> ParseOutput {
    parse(&Source::new("test.dart", text), &Config::default())
}

fn parse_diet(text: &str) -> ParseOutput {
    parse(&Source::new("test.dart", text), &Config::default().diet(true))
}

const SAMPLE: &str = r#"
#library("shapes");
#import("util.dart", prefix: "u");

/** A point on the plane. */
class Point {
  final num x, y;
  static final ORIGIN = const Point(0, 0);

  const Point(this.x, this.y);
  Point.polar(num r, num theta) : this(r * theta, r / theta);

  num get length() => x * x + y * y;
  Point operator +(Point other) => new Point(x + other.x, y + other.y);
  bool operator ==(other) => other is Point && x == other.x && y == other.y;

  String toString() {
    var parts = <String>[];
    for (var i = 0; i < 2; i++) {
      parts.add(i == 0 ? "$x" : "${y + 1}");
    }
    return "(${parts[0]}, ${parts[1]})";
  }
}

interface Shape extends Comparable default ShapeFactory {
  Shape(num size);
  num area();
}

typedef bool Predicate<T>(T value);

abstract class Base<T> implements Shape {
  abstract num area();
  static int count = 0;
  T value;
  set size(num s) { value = null; }
}

int twice(int x) => x * 2;

main() {
  outer: for (var p in [1, 2, 3]) {
    switch (p) {
      case 1:
        continue outer;
      default:
        break outer;
    }
  }
  try {
    throw "oops";
  } catch (var e) {
    print(e);
  } finally {
    print('done');
  }
  var f = (a, [b = 2]) { return a + b; };
  int local(int y) => y + 1;
  print(f(1) + local(2));
  var m = const {"a": 1, "b": 2};
  m..remove("a")..remove("b");
}
"#;

#[test]
fn sample_parses_without_errors() {
    let output = parse_text(SAMPLE);
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    let unit = &output.unit;
    assert_eq!(unit.directives.len(), 2);
    assert!(unit.class("Point").is_some());
    assert!(unit.class("Shape").map_or(false, |c| c.is_interface));
    assert!(unit.class("Base").map_or(false, |c| c.is_abstract));
    assert!(matches!(unit.declarations[2], TopLevelDecl::TypeAlias(_)));
}

#[test]
fn members_keep_their_shape() {
    let output = parse_text(SAMPLE);
    let point = output.unit.class("Point").expect("class Point");
    let methods: Vec<_> = point
        .members
        .iter()
        .filter_map(|m| match m {
            ClassMember::Method(m) => Some(m),
            ClassMember::Field(_) => None,
        })
        .collect();

    let constructors: Vec<_> = methods.iter().filter(|m| m.is_constructor()).collect();
    assert_eq!(constructors.len(), 2);
    assert!(constructors[0].modifiers.is_const);
    assert_eq!(constructors[1].full_name(), "Point.polar");
    assert!(constructors[1].redirect().is_some());

    let getter = methods.iter().find(|m| m.name.name == "length").expect("getter");
    assert_eq!(getter.kind, MethodKind::Getter);
    assert!(matches!(getter.body, FunctionBody::Expression(_)));

    let operators = methods.iter().filter(|m| m.kind == MethodKind::Operator).count();
    assert_eq!(operators, 2);
}

#[test]
fn doc_comment_attaches_to_class() {
    let output = parse_text(SAMPLE);
    let point = output.unit.class("Point").expect("class Point");
    let doc = point.doc.expect("doc comment");
    assert!(SAMPLE[doc.offset..doc.end()].starts_with("/**"));
}

#[test]
fn statements_in_main() {
    let output = parse_text(SAMPLE);
    let main = output
        .unit
        .declarations
        .iter()
        .find_map(|d| match d {
            TopLevelDecl::Function(f) if f.name.name == "main" => Some(f),
            _ => None,
        })
        .expect("main");
    let FunctionBody::Block(block) = &main.body else { panic!("main has a block body") };
    assert!(matches!(block.statements[0].kind, StmtKind::Labeled { .. }));
    assert!(matches!(block.statements[1].kind, StmtKind::Try { .. }));
    assert!(matches!(block.statements[3].kind, StmtKind::Function(_)));
    match &block.statements[6].kind {
        StmtKind::Expr(e) => assert!(matches!(e.kind, ExprKind::Cascade { .. })),
        other => panic!("expected cascade, got {:?}", other),
    }
}

#[test]
fn diet_parse_skips_bodies_but_keeps_signatures() {
    let full = parse_text(SAMPLE);
    let diet = parse_diet(SAMPLE);
    assert!(diet.errors.is_empty(), "unexpected errors: {:?}", diet.errors);
    assert_eq!(print_signatures(&full.unit), print_signatures(&diet.unit));

    let point = diet.unit.class("Point").expect("class Point");
    let skipped = point
        .members
        .iter()
        .filter(|m| matches!(m, ClassMember::Method(m) if matches!(m.body, FunctionBody::Skipped(_))))
        .count();
    assert!(skipped >= 3);
}

#[test]
fn both_modes_recover_the_next_class() {
    let text = "class A { foo() { if (x { bar(; } int y; baz() => 1 +; }\nclass B { qux(int a) {} }\n";
    let full = parse_text(text);
    let diet = parse_diet(text);
    assert!(!full.errors.is_empty());
    for name in ["A", "B"] {
        assert!(full.unit.class(name).is_some());
        assert!(diet.unit.class(name).is_some());
    }
}

#[test]
fn printed_source_reparses_to_the_same_tree() {
    let first = parse_text(SAMPLE);
    let printed = print_unit(&first.unit);
    let second = parse_text(&printed);
    assert!(second.errors.is_empty(), "printed text has errors: {:?}\n{}", second.errors, printed);
    let reprinted = print_unit(&second.unit);
    assert_eq!(printed, reprinted);
}

const ROUND_TRIP_CORPUS: &[&str] = &[
    r"var s = 'tab\t quote\' dollar\$ hex\x41 \u{1F600} back\\slash \b';",
    r#"var t = "a${b}c$d" 'e';"#,
    "f(a) { a..b()..c = 1; return a..d(2); }",
    "f(a, b) => -a + b * (a - b) ~/ 2 % 3 << 1 >> 2 & 4 | 5 ^ ~6;",
    "g(a, b) => a === b || a !== b && !(a is! int) && a <= b;",
    "h(x) { x += 1; x ~/= 2; x++; --x; return x > 0 ? x : -x; }",
    "class P extends Q {\n  final x;\n  var y;\n  const P(this.x) : super(), y = 1;\n  P.named(x) : this(x);\n  factory P.make() { return new P(1); }\n}\n",
    "var n = [0, 42, 0xFF, 1.5, 2e10, .5, -9223372036854775808, 99999999999999999999];",
];

#[test]
fn corpus_round_trips_through_the_printer() {
    for text in ROUND_TRIP_CORPUS {
        let first = parse_text(text);
        assert!(first.errors.is_empty(), "{}: {:?}", text, first.errors);
        let printed = print_unit(&first.unit);
        let second = parse_text(&printed);
        assert!(second.errors.is_empty(), "printed text has errors: {:?}\n{}", second.errors, printed);
        assert_eq!(printed, print_unit(&second.unit), "{}", text);
    }
}

#[test]
fn integer_literals_print_as_written() {
    let output = parse_text("var n = -9223372036854775808;\nvar big = 99999999999999999999;\nvar h = 0xFF;\n");
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    let printed = print_unit(&output.unit);
    for literal in ["-9223372036854775808", "99999999999999999999", "0xFF"] {
        assert!(printed.contains(literal), "{} missing from {}", literal, printed);
    }
    match initializers(&output)[1] {
        ExprKind::Int { value, text, radix } => {
            assert_eq!(*value, None);
            assert_eq!(text, "99999999999999999999");
            assert_eq!(*radix, 10);
        }
        other => panic!("expected an int literal, got {:?}", other),
    }
}

#[test]
fn relational_operators_do_not_chain() {
    for text in ["f(a, b, c) => a<b>(c);", "f(a, b, c) => a < b < c;", "f(a, b) => a < b is bool;"] {
        let output = parse_text(text);
        let codes: Vec<_> = output.errors.iter().map(|e| e.code().name()).collect();
        assert_eq!(codes, vec!["NON_ASSOCIATIVE_OPERATOR"], "{}", text);
    }
    let output = parse_text("f(a, b, c, d) => a < b == c < d && a is int;");
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
}

#[test]
fn library_directives_are_summarized() {
    let source = Source::new(
        "lib.dart",
        "#library(\"L\");\n#import(\"a.dart\", prefix:\"p\");\n#source(\"b.dart\");\nclass A {}\n",
    );
    let library = parse_library_directives(&source, &Config::default());
    assert_eq!(library.name.as_deref(), Some("L"));
    assert_eq!(library.imports.len(), 1);
    assert_eq!(library.imports[0].path, "a.dart");
    assert_eq!(library.imports[0].prefix.as_deref(), Some("p"));
    assert_eq!(library.sources, vec!["b.dart".to_string()]);

    let full = parse(&source, &Config::default());
    assert_eq!(LibraryUnit::from_unit(&full.unit), library);
}

#[test]
fn native_and_resource_directives() {
    let source = Source::new("lib.dart", "#native(\"impl.js\");\n#resource(\"data.txt\");\n");
    let library = parse_library_directives(&source, &Config::default());
    assert!(!library.is_library());
    assert_eq!(library.natives, vec!["impl.js".to_string()]);
    assert_eq!(library.resources, vec!["data.txt".to_string()]);
}

#[test]
fn directive_after_declaration_is_reported() {
    let output = parse_text("class A {}\n#import(\"a.dart\");\n");
    let codes: Vec<_> = output.errors.iter().map(|e| e.code().name()).collect();
    assert!(codes.contains(&"DIRECTIVE_AFTER_DECLARATION"), "{:?}", codes);
}

#[test]
fn generic_less_than_is_disambiguated() {
    let output = parse_text("f(a, b, c) { var x = a < b; List<int> y = null; g(a < b, c > 2); }");
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
}

#[test]
fn built_in_identifiers_are_plain_names() {
    let output = parse_text("class A { var get; abstract() => 1; static factory(negate) => negate; }");
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);

    let output = parse_text("class abstract {}");
    let codes: Vec<_> = output.errors.iter().map(|e| e.code().name()).collect();
    assert_eq!(codes, vec!["BUILT_IN_IDENTIFIER_AS_TYPE"]);
}

fn initializers(output: &ParseOutput) -> Vec<&ExprKind> {
    output
        .unit
        .declarations
        .iter()
        .filter_map(|d| match d {
            TopLevelDecl::Variables(fields) => fields.variables[0].init.as_ref().map(|e| &e.kind),
            _ => None,
        })
        .collect()
}

#[test]
fn string_literals_are_decoded() {
    let text = r#"var a = 'x\ty\x41\u{1F600}';
var b = @"raw\n$x";
var c = 'ab' "cd";
var d = '''
line''';
var e = "n=$n and ${n + 1}!";
"#;
    let output = parse_text(text);
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    let values = initializers(&output);
    let strings: Vec<_> = values[..4]
        .iter()
        .map(|kind| match kind {
            ExprKind::String(s) => s.as_str(),
            other => panic!("expected a plain string, got {:?}", other),
        })
        .collect();
    assert_eq!(strings, vec!["x\tyA\u{1F600}", "raw\\n$x", "abcd", "line"]);

    let ExprKind::Interpolation { strings, exprs } = values[4] else { panic!("expected interpolation") };
    assert_eq!(strings, &vec!["n=".to_string(), " and ".to_string(), "!".to_string()]);
    assert!(matches!(&exprs[0].kind, ExprKind::Identifier(name) if name == "n"));
    assert!(matches!(exprs[1].kind, ExprKind::Binary { .. }));
}

#[test]
fn malformed_escapes_are_reported() {
    let output = parse_text("var a = '\\x4';\nvar b = 'cost: $';\n");
    let codes: Vec<_> = output.errors.iter().map(|e| e.code().name()).collect();
    assert_eq!(codes, vec!["INVALID_ESCAPE", "INVALID_INTERPOLATION"]);
}
