//! Elements: the named entities the resolver builds
//!
//! Elements live in one arena per compilation session and are referred to by
//! `ElementId`. AST nodes never own elements; the resolver records which
//! element a node declares or references in side tables keyed by `NodeId`.

pub mod types;

use std::collections::HashMap;
use std::fmt;

use crate::ast::{Modifiers, NodeId};
use crate::parser::span::Span;
pub use types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ElementId(u32);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Library,
    Class,
    Interface,
    TypeVariable,
    FunctionTypeAlias,
    Field,
    Method,
    Getter,
    Setter,
    Operator,
    Constructor,
    /// Top-level or local function
    Function,
    Parameter,
    Variable,
    /// Placeholder for a name that failed to resolve
    Dynamic,
}

impl ElementKind {
    /// Word used in diagnostics, e.g. "field 'x'"
    pub fn describe(&self) -> &'static str {
        match self {
            ElementKind::Library => "library",
            ElementKind::Class => "class",
            ElementKind::Interface => "interface",
            ElementKind::TypeVariable => "type variable",
            ElementKind::FunctionTypeAlias => "function type alias",
            ElementKind::Field => "field",
            ElementKind::Method => "method",
            ElementKind::Getter => "getter",
            ElementKind::Setter => "setter",
            ElementKind::Operator => "operator",
            ElementKind::Constructor => "constructor",
            ElementKind::Function => "function",
            ElementKind::Parameter => "parameter",
            ElementKind::Variable => "variable",
            ElementKind::Dynamic => "unresolved name",
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            ElementKind::Class | ElementKind::Interface | ElementKind::TypeVariable | ElementKind::FunctionTypeAlias
        )
    }

    pub fn is_class_like(&self) -> bool {
        matches!(self, ElementKind::Class | ElementKind::Interface)
    }

    /// Members that are invoked with an argument list
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ElementKind::Method | ElementKind::Operator | ElementKind::Constructor | ElementKind::Function
        )
    }
}

/// Class and interface specific data
#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub is_abstract: bool,
    pub type_params: Vec<ElementId>,
    pub superclass: Option<Type>,
    pub interfaces: Vec<Type>,
    /// `default` class of an interface
    pub default_class: Option<Type>,
    /// Every class and interface reachable through the supertype clauses
    pub supertypes: Vec<ElementId>,
    pub is_cyclic: bool,
    /// Some supertype failed to resolve, so member lookups may be incomplete
    pub incomplete: bool,
    /// Members in declaration order
    pub members: Vec<ElementId>,
    /// Name -> field, method, getter or operator
    pub member_index: HashMap<String, ElementId>,
    /// Name -> setter, kept apart so a getter and setter can share a name
    pub setters: HashMap<String, ElementId>,
    /// Constructor name ("" for the unnamed one) -> constructor
    pub constructors: HashMap<String, ElementId>,
}

impl ClassInfo {
    pub fn constructor(&self, name: &str) -> Option<ElementId> {
        self.constructors.get(name).copied()
    }
}

/// Parameter shape of anything callable
#[derive(Debug, Clone, Default)]
pub struct FunctionInfo {
    /// Type variables of a function type alias
    pub type_params: Vec<ElementId>,
    pub params: Vec<ElementId>,
    pub required: usize,
    pub optional: usize,
    /// Resolved target of a redirecting constructor
    pub redirect: Option<ElementId>,
}

impl FunctionInfo {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required && count <= self.required + self.optional
    }

    /// Expected argument count for diagnostics, e.g. "2" or "1 to 3"
    pub fn expected(&self) -> String {
        if self.optional == 0 {
            self.required.to_string()
        } else {
            format!("{} to {}", self.required, self.required + self.optional)
        }
    }
}

/// Library specific data
#[derive(Debug, Clone, Default)]
pub struct LibraryInfo {
    /// Top-level declarations of all units of the library
    pub top_level: HashMap<String, ElementId>,
    /// Top-level setters, kept apart like class setters
    pub setters: HashMap<String, ElementId>,
    /// Unprefixed imports, in directive order
    pub imports: Vec<ElementId>,
    /// Import prefix -> imported libraries
    pub prefixes: HashMap<String, Vec<ElementId>>,
}

#[derive(Debug, Clone)]
pub enum ElementData {
    None,
    Library(Box<LibraryInfo>),
    Class(Box<ClassInfo>),
    Function(FunctionInfo),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    /// Owning element: library for top-level elements, class for members
    pub enclosing: Option<ElementId>,
    pub modifiers: Modifiers,
    /// Declaring node, if the element comes from source
    pub node: Option<NodeId>,
    /// Span of the declared name
    pub span: Span,
    /// Declared type; return type for callables, bound for type variables
    pub ty: Type,
    pub data: ElementData,
}

impl Element {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    pub fn class_info(&self) -> Option<&ClassInfo> {
        match &self.data {
            ElementData::Class(info) => Some(&**info),
            _ => None,
        }
    }

    pub fn class_info_mut(&mut self) -> Option<&mut ClassInfo> {
        match &mut self.data {
            ElementData::Class(info) => Some(&mut **info),
            _ => None,
        }
    }

    pub fn function_info(&self) -> Option<&FunctionInfo> {
        match &self.data {
            ElementData::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn function_info_mut(&mut self) -> Option<&mut FunctionInfo> {
        match &mut self.data {
            ElementData::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn library_info(&self) -> Option<&LibraryInfo> {
        match &self.data {
            ElementData::Library(info) => Some(&**info),
            _ => None,
        }
    }

    pub fn library_info_mut(&mut self) -> Option<&mut LibraryInfo> {
        match &mut self.data {
            ElementData::Library(info) => Some(&mut **info),
            _ => None,
        }
    }

    /// "class 'A'", "field 'x'", ...
    pub fn describe(&self) -> String {
        format!("{} '{}'", self.kind.describe(), self.name)
    }
}

/// Arena of all elements of a compilation session
#[derive(Debug, Default)]
pub struct Elements {
    elements: Vec<Element>,
}

impl Elements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ElementKind, name: &str, enclosing: Option<ElementId>) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        let data = match kind {
            ElementKind::Library => ElementData::Library(Box::default()),
            ElementKind::Class | ElementKind::Interface => ElementData::Class(Box::default()),
            ElementKind::Method
            | ElementKind::Getter
            | ElementKind::Setter
            | ElementKind::Operator
            | ElementKind::Constructor
            | ElementKind::Function
            | ElementKind::FunctionTypeAlias => ElementData::Function(FunctionInfo::default()),
            _ => ElementData::None,
        };
        self.elements.push(Element {
            id,
            kind,
            name: name.to_string(),
            enclosing,
            modifiers: Modifiers::default(),
            node: None,
            span: Span::default(),
            ty: Type::Dynamic,
            data,
        });
        id
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements of the given kind, in creation order
    pub fn of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }

    /// Class enclosing a member, if any
    pub fn enclosing_class(&self, id: ElementId) -> Option<ElementId> {
        let mut current = self.get(id).enclosing;
        while let Some(e) = current {
            let element = self.get(e);
            if element.kind.is_class_like() {
                return Some(e);
            }
            current = element.enclosing;
        }
        None
    }

    /// Whether `id` is an instance member of a class
    pub fn is_instance_member(&self, id: ElementId) -> bool {
        let element = self.get(id);
        matches!(
            element.kind,
            ElementKind::Field | ElementKind::Method | ElementKind::Getter | ElementKind::Setter | ElementKind::Operator
        ) && !element.modifiers.is_static
            && element.enclosing.map_or(false, |c| self.get(c).kind.is_class_like())
    }

    /// Find a member by name in `class` or its supertypes (getters before setters)
    pub fn lookup_member(&self, class: ElementId, name: &str) -> Option<ElementId> {
        let info = self.get(class).class_info()?;
        if let Some(found) = info.member_index.get(name).or_else(|| info.setters.get(name)) {
            return Some(*found);
        }
        info.supertypes.iter().find_map(|s| {
            let sinfo = self.get(*s).class_info()?;
            sinfo.member_index.get(name).or_else(|| sinfo.setters.get(name)).copied()
        })
    }

    /// Human readable qualified name, e.g. `A.foo`
    pub fn qualified_name(&self, id: ElementId) -> String {
        let element = self.get(id);
        match element.enclosing.map(|e| self.get(e)) {
            Some(owner) if owner.kind.is_class_like() && element.kind != ElementKind::Constructor => {
                format!("{}.{}", owner.name, element.name)
            }
            _ => element.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_lookup_walks_supertypes() {
        let mut elements = Elements::new();
        let lib = elements.add(ElementKind::Library, "L", None);
        let a = elements.add(ElementKind::Class, "A", Some(lib));
        let b = elements.add(ElementKind::Class, "B", Some(lib));
        let foo = elements.add(ElementKind::Method, "foo", Some(a));
        elements.get_mut(a).class_info_mut().unwrap().member_index.insert("foo".into(), foo);
        elements.get_mut(b).class_info_mut().unwrap().supertypes.push(a);

        assert_eq!(elements.lookup_member(b, "foo"), Some(foo));
        assert_eq!(elements.lookup_member(b, "bar"), None);
        assert!(elements.is_instance_member(foo));
        assert_eq!(elements.qualified_name(foo), "A.foo");
        assert_eq!(elements.enclosing_class(foo), Some(a));
    }

    #[test]
    fn argument_count_ranges() {
        let info = FunctionInfo { required: 1, optional: 2, ..Default::default() };
        assert!(info.accepts(1));
        assert!(info.accepts(3));
        assert!(!info.accepts(4));
        assert_eq!(info.expected(), "1 to 3");
    }
}
