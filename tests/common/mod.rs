// Common test utilities
#![allow(dead_code)]

use dartc::ast::{walk, AstVisitor, Expr, NodeRef};
use dartc::{compile_source, CollectingListener, Compilation, Config};

/// Compile `text` as a single library named `test.dart`
pub fn compile(text: &str) -> (Compilation, CollectingListener) {
    compile_with(text, &Config::default())
}

pub fn compile_with(text: &str, config: &Config) -> (Compilation, CollectingListener) {
    let mut listener = CollectingListener::new();
    let compilation = compile_source("test.dart", text, config, &mut listener).expect("in-memory source must load");
    (compilation, listener)
}

/// Diagnostic codes produced by compiling `text`
pub fn codes(text: &str) -> Vec<&'static str> {
    compile(text).1.codes()
}

/// Number of diagnostics with code `code`
pub fn count(codes: &[&str], code: &str) -> usize {
    codes.iter().filter(|c| **c == code).count()
}

/// Every expression of the compiled units matching `filter`, in tree order
pub fn find_exprs<'a>(compilation: &'a Compilation, filter: impl Fn(&Expr) -> bool) -> Vec<&'a Expr> {
    struct Finder<'a, F> {
        filter: F,
        found: Vec<&'a Expr>,
    }

    impl<'a, F: Fn(&Expr) -> bool> AstVisitor<'a> for Finder<'a, F> {
        fn visit(&mut self, node: NodeRef<'a>) -> bool {
            if let NodeRef::Expr(expr) = node {
                if (self.filter)(expr) {
                    self.found.push(expr);
                }
            }
            true
        }
    }

    let mut finder = Finder { filter, found: Vec::new() };
    for parsed in compilation.units() {
        walk(&mut finder, NodeRef::Unit(&parsed.unit));
    }
    finder.found
}
