mod common;

use common::{codes, compile};
use dartc::ast::{Expr, TopLevelDecl};
use dartc::resolver::{ConstError, ConstValue, ConstantEvaluator};
use dartc::{Compilation, ErrorCode};

/// Value of the top-level constant `name` of the root library
fn top_level_value<'c>(compilation: &'c Compilation, name: &str) -> Option<&'c ConstValue> {
    let id = compilation.program.top_level(0, name)?;
    compilation.program.constants.element_value(id)
}

/// Initializer of the top-level variable `name`
fn initializer<'c>(compilation: &'c Compilation, name: &str) -> &'c Expr {
    compilation
        .units()
        .flat_map(|parsed| parsed.unit.declarations.iter())
        .find_map(|decl| match decl {
            TopLevelDecl::Variables(fields) => {
                fields.variables.iter().find(|v| v.name.name == name).and_then(|v| v.init.as_ref())
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no initializer for {}", name))
}

fn sorted(mut codes: Vec<&'static str>) -> Vec<&'static str> {
    codes.sort();
    codes
}

#[test]
fn static_finals_fold_through_references() {
    let text = "class A {\n  static final INT_LIT = 5;\n  static final X = INT_LIT + 1;\n  static final Y = 'a' + 1;\n}\n";
    let (compilation, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["EXPECTED_NUMBER"]);

    let program = &compilation.program;
    let a = program.top_level(0, "A").expect("class A");
    let x = program.member(a, "X").expect("A.X");
    assert_eq!(program.constants.element_value(x), Some(&ConstValue::Int(6)));
    let y = program.member(a, "Y").expect("A.Y");
    assert_eq!(program.constants.element_value(y), None);
}

#[test]
fn arithmetic_and_logic_fold() {
    let text = "final D = 7 / 2;\nfinal T = 7 ~/ 2;\nfinal M = -7 % 3;\nfinal S = 'ab' + 'c';\n\
                final B = 1 < 2 && !false;\nfinal C = false ? 1 : 2.5;\nfinal I = \"v${1 + 1}\";\nfinal N = null;\n";
    let (compilation, listener) = compile(text);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    assert_eq!(top_level_value(&compilation, "D"), Some(&ConstValue::Double(3.5)));
    assert_eq!(top_level_value(&compilation, "T"), Some(&ConstValue::Int(3)));
    assert_eq!(top_level_value(&compilation, "M"), Some(&ConstValue::Int(2)));
    assert_eq!(top_level_value(&compilation, "S"), Some(&ConstValue::String("abc".into())));
    assert_eq!(top_level_value(&compilation, "B"), Some(&ConstValue::Bool(true)));
    assert_eq!(top_level_value(&compilation, "C"), Some(&ConstValue::Double(2.5)));
    assert_eq!(top_level_value(&compilation, "I"), Some(&ConstValue::String("v2".into())));
    assert_eq!(top_level_value(&compilation, "N"), Some(&ConstValue::Null));
}

#[test]
fn integer_literals_outside_64_bits() {
    let text = "final MIN = -9223372036854775808;\nfinal HEX_MIN = -0x8000000000000000;\n\
                final BIG = 99999999999999999999;\nvar plain = 99999999999999999999;\n";
    let (compilation, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["INTEGER_OUT_OF_RANGE"]);
    assert_eq!(listener.diagnostics[0].message, "integer literal '99999999999999999999' does not fit in 64 bits");
    assert_eq!(top_level_value(&compilation, "MIN"), Some(&ConstValue::Int(i64::MIN)));
    assert_eq!(top_level_value(&compilation, "HEX_MIN"), Some(&ConstValue::Int(i64::MIN)));
    assert_eq!(top_level_value(&compilation, "BIG"), None);
}

#[test]
fn const_collections_keep_their_elements() {
    let (compilation, listener) = compile("final L = const [1, 'a'];\nfinal M = const {'k': true};\n");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
    assert_eq!(
        top_level_value(&compilation, "L"),
        Some(&ConstValue::List(vec![ConstValue::Int(1), ConstValue::String("a".into())]))
    );
    assert_eq!(
        top_level_value(&compilation, "M"),
        Some(&ConstValue::Map(vec![(ConstValue::String("k".into()), ConstValue::Bool(true))]))
    );
}

#[test]
fn operand_errors_are_reported() {
    let text = "var v = 1;\nfinal A = 1 ~/ 0;\nfinal B = 1 & 2.0;\nfinal C = !1;\nfinal D = v + 1;\nconst E;\n";
    let found = codes(text);
    assert_eq!(
        sorted(found),
        sorted(vec![
            "CONST_DIVISION_BY_ZERO",
            "EXPECTED_INT",
            "EXPECTED_BOOL",
            "NOT_CONSTANT",
            "CONST_WITHOUT_INITIALIZER",
        ])
    );
}

#[test]
fn cyclic_constants_report_once() {
    let (compilation, listener) = compile("final A = B;\nfinal B = A;\nfinal C = A + 1;\n");
    assert_eq!(listener.codes(), vec!["CYCLIC_CONSTANT"]);
    assert_eq!(top_level_value(&compilation, "C"), None);
}

#[test]
fn const_objects_need_const_constructors() {
    let text = "class P {\n  final x;\n  const P(this.x);\n}\nclass Q {\n  Q();\n}\nclass R {}\n\
                final a = const P(1);\nfinal b = const Q();\nfinal c = const R();\n";
    let (compilation, listener) = compile(text);
    assert_eq!(listener.codes(), vec!["NON_CONST_CONSTRUCTOR"; 2]);
    let messages: Vec<_> = listener.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["'Q' is not a const constructor", "'R' is not a const constructor"]);

    let program = &compilation.program;
    let p = program.top_level(0, "P").expect("class P");
    match top_level_value(&compilation, "a") {
        Some(ConstValue::Object { class, constructor, args }) => {
            assert_eq!(*class, p);
            assert_eq!(program.member(p, ""), Some(*constructor));
            assert_eq!(args, &vec![ConstValue::Int(1)]);
        }
        other => panic!("expected a const object, got {:?}", other),
    }
}

#[test]
fn const_collection_cannot_use_type_variables() {
    let found = codes("class G<T> {\n  foo() { return const <T>[]; }\n  bar() { return const <int>[]; }\n}\n");
    assert_eq!(found, vec!["TYPE_VARIABLE_IN_CONST_COLLECTION"]);
}

#[test]
fn parameter_defaults_must_be_constant() {
    let found = codes("f([x = 1, y = foo()]) {}\nfoo() => 1;\n");
    assert_eq!(found, vec!["NOT_CONSTANT"]);
}

#[test]
fn evaluator_works_on_any_resolved_expression() {
    let text = "final K = 4;\nvar v = 2 * 3;\nvar w = K + 1;\nvar z = v;\n";
    let (compilation, listener) = compile(text);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    let mut evaluator = ConstantEvaluator::for_program(&compilation.program, &compilation.libraries);
    assert_eq!(evaluator.evaluate(initializer(&compilation, "v")), Ok(ConstValue::Int(6)));
    assert_eq!(evaluator.evaluate(initializer(&compilation, "w")), Ok(ConstValue::Int(5)));

    let error = evaluator.evaluate(initializer(&compilation, "z")).expect_err("v is not constant");
    assert!(matches!(error, ConstError::Invalid { .. }));
    assert_eq!(error.code(), Some(&ErrorCode::NotConstant));
    assert!(evaluator.take_errors().is_empty());
}
