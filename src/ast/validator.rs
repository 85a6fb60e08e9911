//! Source position self-check
//!
//! Every node's span must lie inside its parent's span and inside the unit.
//! A violation is a parser bug, so it surfaces as `Error::Internal`.

use super::*;
use crate::error::{Error, Result};
use crate::parser::span::Span;

struct PositionValidator {
    stack: Vec<(Span, &'static str)>,
    violation: Option<String>,
}

impl<'a> AstVisitor<'a> for PositionValidator {
    fn visit(&mut self, node: NodeRef<'a>) -> bool {
        if self.violation.is_some() {
            return false;
        }
        let span = node.span();
        if let Some((parent, parent_kind)) = self.stack.last() {
            if !parent.contains(span) {
                self.violation = Some(format!(
                    "{} {} at {} escapes its parent {} at {}",
                    node.kind_name(),
                    node.id(),
                    span,
                    parent_kind,
                    parent
                ));
                return false;
            }
        }
        self.stack.push((span, node.kind_name()));
        true
    }

    fn leave(&mut self, _node: NodeRef<'a>) {
        self.stack.pop();
    }
}

/// Check span containment over the whole unit.
///
/// `source_len` is the byte length of the unit's text; the unit node itself
/// must cover exactly `0..source_len`.
pub fn validate_positions(unit: &CompilationUnit, source_len: usize) -> Result<()> {
    if unit.span != Span::new(0, source_len) {
        return Err(Error::internal(format!(
            "unit span {} does not cover the source (length {})",
            unit.span, source_len
        )));
    }
    let mut validator = PositionValidator { stack: Vec::new(), violation: None };
    walk(&mut validator, NodeRef::Unit(unit));
    match validator.violation {
        Some(message) => Err(Error::internal(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(index: u32, offset: usize, len: usize) -> Identifier {
        Identifier { id: NodeId::new(0, index), span: Span::new(offset, len), name: "A".into() }
    }

    fn unit_with_class(name: Identifier, class_span: Span) -> CompilationUnit {
        let class = ClassDecl {
            id: NodeId::new(0, 1),
            span: class_span,
            doc: None,
            is_interface: false,
            is_abstract: false,
            name,
            type_params: vec![],
            superclass: None,
            interfaces: vec![],
            default_class: None,
            members: vec![],
        };
        CompilationUnit {
            id: NodeId::new(0, 0),
            span: Span::new(0, 10),
            source_name: "t.dart".into(),
            directives: vec![],
            declarations: vec![TopLevelDecl::Class(class)],
            comments: vec![],
        }
    }

    #[test]
    fn accepts_nested_spans() {
        let unit = unit_with_class(ident(2, 6, 1), Span::new(0, 10));
        assert!(validate_positions(&unit, 10).is_ok());
    }

    #[test]
    fn rejects_escaping_child() {
        let unit = unit_with_class(ident(2, 8, 4), Span::new(0, 10));
        let err = validate_positions(&unit, 10).unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
        assert!(err.to_string().contains("escapes its parent"));
    }

    #[test]
    fn rejects_short_unit_span() {
        let unit = unit_with_class(ident(2, 6, 1), Span::new(0, 10));
        assert!(validate_positions(&unit, 12).is_err());
    }
}
