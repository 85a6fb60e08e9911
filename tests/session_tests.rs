mod common;

use std::fs;

use common::{compile_with, find_exprs};
use dartc::ast::ExprKind;
use dartc::element::ElementKind;
use dartc::{CollectingListener, Compilation, Compiler, Config, Error, FileSources, MemorySources, Severity, SourceProvider};

const MAIN: &str = r#"#library("app");
#import("lib.dart", prefix: "lib");
#import("util.dart");
#source("part.dart");

main() {
  var p = new lib.Point(1, 2);
  var o = lib.origin();
  helper(twice(p.x));
}
"#;

const LIB: &str = r#"#library("lib");
class Point {
  var x, y;
  Point(this.x, this.y);
}
origin() => new Point(0, 0);
"#;

fn app_sources() -> MemorySources {
    MemorySources::new()
        .with("main.dart", MAIN)
        .with("part.dart", "helper(x) => x;\n")
        .with("lib.dart", LIB)
        .with("util.dart", "#library(\"util\");\ntwice(x) => x * 2;\n")
}

fn run(provider: &dyn SourceProvider, root: &str, config: Config) -> (dartc::Result<Compilation>, CollectingListener) {
    let mut listener = CollectingListener::new();
    let result = Compiler::new(config, provider).compile(root, &mut listener);
    (result, listener)
}

#[test]
fn imports_prefixes_and_parts_resolve() {
    let (result, listener) = run(&app_sources(), "main.dart", Config::default());
    let compilation = result.expect("all sources load");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    assert_eq!(compilation.libraries.len(), 3);
    assert_eq!(compilation.library_index("main.dart"), Some(0));
    assert_eq!(compilation.library_index("lib.dart"), Some(1));
    assert_eq!(compilation.library_index("util.dart"), Some(2));
    assert_eq!(compilation.libraries[0].units.len(), 2);
    assert_eq!(compilation.units().count(), 4);
    assert_eq!(listener.completed.len(), 4);
    assert!(listener.completed.contains(&"part.dart".to_string()));

    let program = &compilation.program;
    let point = program.top_level(1, "Point").expect("lib.Point");
    let constructor = program.member(point, "").expect("Point()");
    let news = find_exprs(&compilation, |e| matches!(&e.kind, ExprKind::New { .. }));
    assert_eq!(program.resolution.referenced(news[0].id), Some(constructor));

    let origin = program.top_level(1, "origin").expect("lib.origin");
    let calls = find_exprs(&compilation, |e| matches!(&e.kind, ExprKind::MethodCall { name, .. } if name.name == "origin"));
    assert_eq!(program.resolution.referenced(calls[0].id), Some(origin));

    // The part's declarations belong to the main library.
    let helper = program.top_level(0, "helper").expect("helper from the part");
    assert_eq!(program.elements.get(helper).kind, ElementKind::Function);
    assert!(program.top_level(0, "origin").is_none());
}

#[test]
fn many_parts_keep_their_unit_order() {
    let mut main = String::from("#library(\"big\");\n");
    let mut sources = MemorySources::new();
    for i in 0..40 {
        main.push_str(&format!("#source(\"p{}.dart\");\n", i));
        sources = sources.with(&format!("p{}.dart", i), &format!("f{}() => {};\n", i, i));
    }
    main.push_str("main() => f0() + f39();\n");
    let sources = sources.with("main.dart", &main);

    let (result, listener) = run(&sources, "main.dart", Config::default());
    let compilation = result.expect("all parts load");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
    assert_eq!(listener.completed.len(), 41);
    let units = &compilation.libraries[0].units;
    assert_eq!(units.len(), 41);
    for (i, parsed) in units.iter().enumerate().skip(1) {
        assert_eq!(parsed.source.name(), format!("p{}.dart", i - 1));
        assert_eq!(parsed.unit.id.unit, i as u32);
    }
    assert!(compilation.program.top_level(0, "f39").is_some());
}

#[test]
fn prefixed_names_only_come_from_the_prefix() {
    let sources = app_sources().with(
        "main.dart",
        "#import(\"lib.dart\", prefix: \"lib\");\nmain() {\n  lib.nothing();\n  origin();\n}\n",
    );
    let (result, listener) = run(&sources, "main.dart", Config::default());
    assert!(result.is_ok());
    assert_eq!(listener.codes(), vec!["CANNOT_RESOLVE", "CANNOT_RESOLVE"]);
    assert_eq!(listener.diagnostics[0].message, "cannot resolve 'lib.nothing'");
    assert_eq!(listener.diagnostics[1].message, "cannot resolve 'origin'");
}

#[test]
fn missing_import_fails_the_session() {
    let sources = MemorySources::new().with("main.dart", "#import(\"missing.dart\");\nmain() {}\n");
    let (result, _) = run(&sources, "main.dart", Config::default());
    match result {
        Err(Error::SourceNotFound { name }) => assert_eq!(name, "missing.dart"),
        other => panic!("expected a missing source, got {:?}", other.map(|c| c.libraries.len())),
    }
}

#[test]
fn missing_root_fails_the_session() {
    let (result, listener) = run(&MemorySources::new(), "main.dart", Config::default());
    assert!(matches!(result, Err(Error::SourceNotFound { .. })));
    assert!(listener.completed.is_empty());
}

#[test]
fn built_in_imports_are_not_loaded() {
    let sources = MemorySources::new().with("main.dart", "#import(\"dart:core\");\nmain() { print(new List(2)); }\n");
    let (result, listener) = run(&sources, "main.dart", Config::default());
    let compilation = result.expect("dart:core is built in");
    assert_eq!(compilation.libraries.len(), 1);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
}

#[test]
fn import_cycles_are_loaded_once() {
    let sources = MemorySources::new()
        .with("a.dart", "#library(\"a\");\n#import(\"b.dart\");\nclass A extends B {}\n")
        .with("b.dart", "#library(\"b\");\n#import(\"a.dart\");\nclass B {\n  make() => new A();\n}\n");
    let (result, listener) = run(&sources, "a.dart", Config::default());
    let compilation = result.expect("both sources load");
    assert_eq!(compilation.libraries.len(), 2);
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());

    let program = &compilation.program;
    let a = program.top_level(0, "A").expect("A");
    let b = program.top_level(1, "B").expect("B");
    let supertypes = &program.elements.get(a).class_info().expect("class info").supertypes;
    assert_eq!(supertypes, &vec![b]);
}

#[test]
fn duplicates_across_parts_are_reported_in_the_part() {
    let sources = MemorySources::new()
        .with("main.dart", "#library(\"m\");\n#source(\"p.dart\");\nclass A {}\n")
        .with("p.dart", "\nclass A {}\n");
    let (_, listener) = run(&sources, "main.dart", Config::default());
    assert_eq!(listener.codes(), vec!["DUPLICATE_DECLARATION"]);
    let diagnostic = &listener.diagnostics[0];
    assert_eq!(diagnostic.source, "p.dart");
    assert_eq!((diagnostic.line, diagnostic.column), (2, 7));
}

#[test]
fn diagnostics_carry_positions_in_their_own_unit() {
    let sources = app_sources().with("lib.dart", "#library(\"lib\");\nclass L {\n  foo() => missing;\n}\n");
    let (_, listener) = run(&sources, "main.dart", Config::default());
    let diagnostic = listener
        .diagnostics
        .iter()
        .find(|d| d.source == "lib.dart")
        .expect("diagnostic in lib.dart");
    assert_eq!(diagnostic.code.name(), "CANNOT_RESOLVE");
    assert_eq!((diagnostic.line, diagnostic.column), (3, 12));
    assert_eq!(diagnostic.length, "missing".len());
    assert_eq!(diagnostic.to_string(), "lib.dart:3:12: error [CANNOT_RESOLVE]: cannot resolve 'missing'");
}

#[test]
fn syntax_and_resolution_errors_share_the_channel() {
    let sources = MemorySources::new()
        .with("main.dart", "#source(\"p.dart\");\nmain() { var x = ; }\n")
        .with("p.dart", "f() => unknown;\n");
    let (result, listener) = run(&sources, "main.dart", Config::default());
    assert!(result.is_ok());
    let sources: Vec<_> = listener.diagnostics.iter().map(|d| d.source.as_str()).collect();
    assert!(sources.contains(&"main.dart") && sources.contains(&"p.dart"), "{:?}", sources);
    assert_eq!(listener.error_count(), listener.diagnostics.len());
}

#[test]
fn files_are_loaded_relative_to_the_importing_unit() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::create_dir(dir.path().join("lib")).expect("lib dir");
    fs::write(dir.path().join("main.dart"), "#import(\"lib/dep.dart\");\nmain() => new Dep().other();\n").expect("main");
    fs::write(
        dir.path().join("lib/dep.dart"),
        "#library(\"dep\");\n#import(\"other.dart\");\nclass Dep {\n  other() => new Other();\n}\n",
    )
    .expect("dep");
    fs::write(dir.path().join("lib/other.dart"), "#library(\"other\");\nclass Other {}\n").expect("other");

    let provider = FileSources::new(dir.path());
    let (result, listener) = run(&provider, "main.dart", Config::default());
    let compilation = result.expect("files load");
    assert!(listener.diagnostics.is_empty(), "{:?}", listener.codes());
    assert_eq!(compilation.library_index("lib/other.dart"), Some(2));
}

#[test]
fn missing_file_is_source_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = FileSources::new(dir.path());
    let (result, _) = run(&provider, "absent.dart", Config::default());
    assert!(matches!(result, Err(Error::SourceNotFound { .. })));
}

const WARNING_AND_TYPE_ERROR: &str = "abstract class A {\n  var x;\n  foo() { var x; }\n}\nmain() { new A(); }\n";

#[test]
fn default_severities() {
    let (_, listener) = compile_with(WARNING_AND_TYPE_ERROR, &Config::default());
    let severities: Vec<_> = listener.diagnostics.iter().map(|d| d.severity).collect();
    assert_eq!(severities, vec![Severity::Warning, Severity::TypeError]);
    assert_eq!(listener.type_errors().count(), 1);
    assert!(!listener.has_errors());
}

#[test]
fn warnings_as_errors_promotes_everything() {
    let (_, listener) = compile_with(WARNING_AND_TYPE_ERROR, &Config::default().warnings_as_errors(true));
    assert_eq!(listener.codes(), vec!["SHADOWS", "INSTANTIATE_ABSTRACT_CLASS"]);
    assert_eq!(listener.error_count(), 2);
}

#[test]
fn suppressed_warnings_are_dropped() {
    let (_, listener) = compile_with(WARNING_AND_TYPE_ERROR, &Config::default().suppress_warnings(true));
    assert_eq!(listener.codes(), vec!["INSTANTIATE_ABSTRACT_CLASS"]);
    assert_eq!(listener.warnings().count(), 0);
}

#[test]
fn error_budget_is_per_unit() {
    let text = "main() {\n  a();\n  b();\n  c();\n}\n";
    let (_, listener) = compile_with(text, &Config::default().max_errors(2));
    assert_eq!(listener.codes(), vec!["CANNOT_RESOLVE"; 2]);
}
