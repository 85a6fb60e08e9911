//! Lexical scopes
//!
//! Local scopes (parameters, blocks, catch clauses) form a [`ScopeChain`]
//! that the name pass pushes and pops while walking a body. Library level
//! lookup goes through the library element: own top-level declarations
//! first, then unprefixed imports in directive order, and `p.Name` through
//! the import prefix table.

use std::collections::HashMap;

use crate::element::{ElementId, ElementKind, Elements};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Parameters and the outermost block of a function body
    Function,
    Block,
    Catch,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    names: HashMap<String, ElementId>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self { kind, names: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).copied()
    }
}

/// Stack of local scopes, innermost last
#[derive(Debug, Default, Clone)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare `name` in the innermost scope.
    ///
    /// Returns the element already declared under that name in the same
    /// scope, in which case the scope is left unchanged.
    pub fn declare(&mut self, name: &str, element: ElementId) -> Result<(), ElementId> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if let Some(existing) = scope.get(name) {
            return Err(existing);
        }
        scope.names.insert(name.to_string(), element);
        Ok(())
    }

    /// Innermost declaration of `name`
    pub fn lookup(&self, name: &str) -> Option<ElementId> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// Declaration of `name` in the innermost scope only
    pub fn lookup_local(&self, name: &str) -> Option<ElementId> {
        self.scopes.last().and_then(|s| s.get(name))
    }

    /// Declaration of `name` in any scope enclosing the innermost one
    pub fn lookup_enclosing(&self, name: &str) -> Option<ElementId> {
        let outer = self.scopes.len().saturating_sub(1);
        self.scopes[..outer].iter().rev().find_map(|s| s.get(name))
    }
}

/// Top-level declaration of `library` itself (getters before setters)
pub fn lookup_own(elements: &Elements, library: ElementId, name: &str) -> Option<ElementId> {
    let info = elements.get(library).library_info()?;
    info.top_level.get(name).or_else(|| info.setters.get(name)).copied()
}

/// Bare top-level name as seen from `library`: own declarations, then
/// unprefixed imports in order
pub fn lookup_library(elements: &Elements, library: ElementId, name: &str) -> Option<ElementId> {
    if let Some(found) = lookup_own(elements, library, name) {
        return Some(found);
    }
    let info = elements.get(library).library_info()?;
    info.imports.iter().find_map(|imported| lookup_own(elements, *imported, name))
}

/// Whether `name` is an import prefix of `library`
pub fn is_prefix(elements: &Elements, library: ElementId, name: &str) -> bool {
    elements
        .get(library)
        .library_info()
        .map_or(false, |info| info.prefixes.contains_key(name))
}

/// `prefix.name` through the libraries imported under `prefix`
pub fn lookup_prefixed(elements: &Elements, library: ElementId, prefix: &str, name: &str) -> Option<ElementId> {
    let info = elements.get(library).library_info()?;
    info.prefixes
        .get(prefix)?
        .iter()
        .find_map(|imported| lookup_own(elements, *imported, name))
}

/// Whether two top-level or member kinds may share one name
pub fn kinds_conflict(existing: ElementKind, new: ElementKind) -> bool {
    !matches!(
        (existing, new),
        (ElementKind::Getter, ElementKind::Setter) | (ElementKind::Setter, ElementKind::Getter)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scopes_hide_outer_ones() {
        let mut elements = Elements::new();
        let a = elements.add(ElementKind::Variable, "x", None);
        let b = elements.add(ElementKind::Variable, "x", None);

        let mut chain = ScopeChain::new();
        chain.push(ScopeKind::Function);
        chain.declare("x", a).unwrap();
        chain.push(ScopeKind::Block);
        assert_eq!(chain.lookup_enclosing("x"), Some(a));
        assert_eq!(chain.lookup_local("x"), None);
        chain.declare("x", b).unwrap();
        assert_eq!(chain.lookup("x"), Some(b));
        assert_eq!(chain.declare("x", a), Err(b));
        chain.pop();
        assert_eq!(chain.lookup("x"), Some(a));
    }

    #[test]
    fn library_lookup_prefers_own_declarations() {
        let mut elements = Elements::new();
        let main = elements.add(ElementKind::Library, "main", None);
        let other = elements.add(ElementKind::Library, "other", None);
        let own = elements.add(ElementKind::Class, "A", Some(main));
        let imported = elements.add(ElementKind::Class, "A", Some(other));
        let b = elements.add(ElementKind::Class, "B", Some(other));
        {
            let info = elements.get_mut(other).library_info_mut().unwrap();
            info.top_level.insert("A".into(), imported);
            info.top_level.insert("B".into(), b);
        }
        {
            let info = elements.get_mut(main).library_info_mut().unwrap();
            info.top_level.insert("A".into(), own);
            info.imports.push(other);
            info.prefixes.insert("o".into(), vec![other]);
        }

        assert_eq!(lookup_library(&elements, main, "A"), Some(own));
        assert_eq!(lookup_library(&elements, main, "B"), Some(b));
        assert_eq!(lookup_prefixed(&elements, main, "o", "A"), Some(imported));
        assert!(is_prefix(&elements, main, "o"));
        assert_eq!(lookup_prefixed(&elements, main, "p", "A"), None);
    }

    #[test]
    fn only_getter_setter_pairs_share_names() {
        assert!(!kinds_conflict(ElementKind::Getter, ElementKind::Setter));
        assert!(kinds_conflict(ElementKind::Field, ElementKind::Method));
        assert!(kinds_conflict(ElementKind::Getter, ElementKind::Getter));
    }
}
