//! Parser module
//!
//! Lexical analysis and parsing of source units into the AST.

pub mod directives;
pub mod error;
mod expressions;
pub mod lexer;
pub mod parser;
pub mod span;
mod statements;
pub mod strings;

pub use directives::{DirectivesOutput, LibraryImport, LibraryUnit};
pub use error::{ErrorRecovery, ParseError, ParseResult};
pub use lexer::{Comment, CommentKind, Lexer, LexicalToken, Token};
pub use parser::{ParseOutput, Parser};
pub use span::{HasSpan, LineMap, Location, Span};

use crate::config::Config;
use crate::source::Source;

/// Parse a whole unit with the given configuration
pub fn parse(source: &Source, config: &Config) -> ParseOutput {
    parser::parse(source, config)
}

/// Parse only the leading directives of `source`
pub fn parse_directives(source: &Source, config: &Config) -> DirectivesOutput {
    Parser::new(source, 0, config).parse_directives()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn parse_ok(text: &str) -> CompilationUnit {
        let source = Source::new("test.dart", text);
        let output = parse(&source, &Config::default());
        assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
        output.unit
    }

    #[test]
    fn test_parse_simple_class() {
        let unit = parse_ok(
            r#"
class HelloWorld {
  static void main() {
    print("Hello, World!");
  }
}
"#,
        );
        let class = unit.class("HelloWorld").expect("class");
        assert_eq!(class.members.len(), 1);
        match &class.members[0] {
            ClassMember::Method(m) => {
                assert_eq!(m.name.name, "main");
                assert!(m.modifiers.is_static);
                assert!(m.return_type.as_ref().map_or(false, |t| t.is_void()));
            }
            other => panic!("expected method, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_with_directives() {
        let unit = parse_ok(
            r#"
#library("app");
#import("dart:coreimpl", prefix: "impl");
#source("part.dart");

class TestClass {}
"#,
        );
        assert_eq!(unit.directives.len(), 3);
        assert_eq!(unit.directives[1].kind, DirectiveKind::Import);
        assert_eq!(unit.directives[1].prefix.as_deref(), Some("impl"));
    }

    #[test]
    fn test_parse_interface_and_typedef() {
        let unit = parse_ok("interface I extends J default C { foo(); }\ntypedef int F(int x);\n");
        let i = unit.class("I").expect("interface");
        assert!(i.is_interface);
        assert_eq!(i.interfaces.len(), 1);
        assert_eq!(i.default_class.as_ref().map(|t| t.name.name.as_str()), Some("C"));
        assert!(matches!(unit.declarations[1], TopLevelDecl::TypeAlias(_)));
    }

    #[test]
    fn test_directives_only_stops_at_declarations() {
        let source = Source::new("lib.dart", "#library('L');\n#source('b.dart');\nclass A { broken(( }");
        let output = parse_directives(&source, &Config::default());
        assert_eq!(output.directives.len(), 2);
        assert!(output.errors.is_empty());
    }
}
