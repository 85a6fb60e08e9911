//! Resolver pipeline
//!
//! The resolver runs over every library of a compilation session in a fixed
//! order of passes, each finishing for all libraries before the next starts:
//!
//! - Enter: library, top-level and type-variable elements, import wiring
//! - Supertypes: `extends`/`implements`/`default` clauses, cycles, flattening
//! - Members: fields, methods, accessors, constructors and their signatures
//! - Names: bodies and initializers, locals, labels, `this`/`super`, calls
//! - Constants: compile-time constant evaluation
//!
//! The AST is never modified. Results live in side tables keyed by `NodeId`.

pub mod constants;
mod enter;
mod members;
mod names;
mod supertypes;

use std::collections::HashMap;

use crate::ast::{ClassDecl, CompilationUnit, NodeId, TypeNode};
use crate::diagnostics::{ErrorCode, Reporter};
use crate::element::types::type_for_element;
use crate::element::{ElementId, ElementKind, Elements, Type};
use crate::parser::span::Span;
use crate::scope;
use crate::source::Source;

pub use constants::{ConstError, ConstValue, ConstantEvaluator, ConstantTable};

/// One parsed unit together with its source
#[derive(Debug)]
pub struct ParsedUnit {
    pub source: Source,
    pub unit: CompilationUnit,
}

/// Import edge between two libraries of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Index of the imported library in the session's library list
    pub library: usize,
    pub prefix: Option<String>,
}

/// A library: its defining unit first, then its `#source` parts
#[derive(Debug)]
pub struct Library {
    pub name: String,
    pub units: Vec<ParsedUnit>,
    pub imports: Vec<Import>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), units: Vec::new(), imports: Vec::new() }
    }

    /// Single-unit library without imports
    pub fn single(source: Source, unit: CompilationUnit) -> Self {
        let mut library = Self::new(source.name().to_string());
        library.units.push(ParsedUnit { source, unit });
        library
    }
}

/// Node to element side tables
#[derive(Debug, Default, Clone)]
pub struct Resolution {
    /// Declaring node -> element it declares
    declarations: HashMap<NodeId, ElementId>,
    /// Referencing node (identifier, call, `new`, type, initializer) -> element
    references: HashMap<NodeId, ElementId>,
    /// Type annotation node -> resolved type
    types: HashMap<NodeId, Type>,
}

impl Resolution {
    pub fn declared(&self, node: NodeId) -> Option<ElementId> {
        self.declarations.get(&node).copied()
    }

    pub fn referenced(&self, node: NodeId) -> Option<ElementId> {
        self.references.get(&node).copied()
    }

    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }
}

/// Everything the resolver computed for one session
#[derive(Debug)]
pub struct ResolvedProgram {
    pub elements: Elements,
    pub resolution: Resolution,
    pub constants: ConstantTable,
    /// Library elements, parallel to the input library list
    pub libraries: Vec<ElementId>,
    /// Built-in core library implicitly imported by every library
    pub core: ElementId,
}

impl ResolvedProgram {
    /// Top-level element `name` declared by library `index`
    pub fn top_level(&self, index: usize, name: &str) -> Option<ElementId> {
        scope::lookup_own(&self.elements, *self.libraries.get(index)?, name)
    }

    /// Class member or constructor of the class `class` named `name`
    pub fn member(&self, class: ElementId, name: &str) -> Option<ElementId> {
        let info = self.elements.get(class).class_info()?;
        info.member_index
            .get(name)
            .or_else(|| info.setters.get(name))
            .or_else(|| info.constructors.get(name))
            .copied()
    }
}

/// Where a type annotation appears
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeEnv {
    pub library: ElementId,
    /// Class or function type alias whose type variables are visible
    pub owner: Option<ElementId>,
    /// Static member or top level: class type variables are unavailable
    pub is_static: bool,
}

impl TypeEnv {
    pub fn top_level(library: ElementId) -> Self {
        Self { library, owner: None, is_static: true }
    }
}

/// Shared state of all passes
pub(crate) struct Context<'a, 'r, 'l> {
    pub libraries: &'a [Library],
    pub elements: Elements,
    pub resolution: Resolution,
    pub constants: ConstantTable,
    pub library_elements: Vec<ElementId>,
    pub core: ElementId,
    /// Declaration of every source class and interface
    pub class_decls: HashMap<ElementId, &'a ClassDecl>,
    /// Source classes and interfaces in declaration order
    pub classes: Vec<ElementId>,
    sources: HashMap<u32, &'a Source>,
    reporter: &'r mut Reporter<'l>,
}

impl<'a, 'r, 'l> Context<'a, 'r, 'l> {
    fn new(libraries: &'a [Library], reporter: &'r mut Reporter<'l>) -> Self {
        let sources = libraries
            .iter()
            .flat_map(|l| l.units.iter())
            .map(|u| (u.unit.id.unit, &u.source))
            .collect();
        let mut elements = Elements::new();
        let core = elements.add(ElementKind::Library, enter::CORE_LIBRARY, None);
        Self {
            libraries,
            elements,
            resolution: Resolution::default(),
            constants: ConstantTable::default(),
            library_elements: Vec::new(),
            core,
            class_decls: HashMap::new(),
            classes: Vec::new(),
            sources,
            reporter,
        }
    }

    pub fn report(&mut self, node: NodeId, span: Span, code: ErrorCode) {
        match self.sources.get(&node.unit) {
            Some(source) => self.reporter.report(source, span, code),
            None => log::warn!("dropping diagnostic for unknown unit {}: {}", node.unit, code),
        }
    }

    /// Report at the declared name of `element`
    pub fn report_at(&mut self, element: ElementId, code: ErrorCode) {
        let e = self.elements.get(element);
        if let Some(node) = e.node {
            let span = e.span;
            self.report(node, span, code);
        }
    }

    /// Create a source element declared by `node`
    pub fn add_element(
        &mut self,
        kind: ElementKind,
        name: &str,
        span: Span,
        enclosing: Option<ElementId>,
        node: NodeId,
    ) -> ElementId {
        let id = self.elements.add(kind, name, enclosing);
        let element = self.elements.get_mut(id);
        element.node = Some(node);
        element.span = span;
        self.resolution.declarations.insert(node, id);
        id
    }

    pub fn declared(&self, node: NodeId) -> Option<ElementId> {
        self.resolution.declared(node)
    }

    pub fn record(&mut self, node: NodeId, element: ElementId) {
        self.resolution.references.insert(node, element);
    }

    /// Library element of a source element
    pub fn library_of(&self, element: ElementId) -> ElementId {
        let mut current = element;
        loop {
            let e = self.elements.get(current);
            match e.enclosing {
                Some(next) if e.kind != ElementKind::Library => current = next,
                _ => return current,
            }
        }
    }

    /// Type variables visible through `owner`
    fn type_variables(&self, owner: ElementId) -> &[ElementId] {
        let element = self.elements.get(owner);
        if let Some(info) = element.class_info() {
            info.type_params.as_slice()
        } else if let Some(info) = element.function_info() {
            info.type_params.as_slice()
        } else {
            &[]
        }
    }

    /// Element named by a type annotation, without reporting
    pub fn lookup_type_name(&self, node: &TypeNode, env: TypeEnv) -> Option<ElementId> {
        if let Some(prefix) = &node.prefix {
            return scope::lookup_prefixed(&self.elements, env.library, &prefix.name, &node.name.name);
        }
        let name = node.name.name.as_str();
        if let Some(owner) = env.owner {
            let found = self
                .type_variables(owner)
                .iter()
                .copied()
                .find(|tv| self.elements.get(*tv).name == name);
            if found.is_some() {
                return found;
            }
        }
        scope::lookup_library(&self.elements, env.library, name)
    }

    /// Number of type parameters `element` declares
    fn type_parameter_count(&self, element: ElementId) -> usize {
        match self.elements.get(element).kind {
            ElementKind::Class | ElementKind::Interface | ElementKind::FunctionTypeAlias => {
                self.type_variables(element).len()
            }
            _ => 0,
        }
    }

    /// Resolve the type arguments of `node`, checking their count against `element`
    pub fn resolve_type_args(&mut self, element: ElementId, node: &TypeNode, env: TypeEnv) -> Vec<Type> {
        let args: Vec<Type> = node.type_args.iter().map(|arg| self.resolve_type(arg, env)).collect();
        let expected = self.type_parameter_count(element);
        if !args.is_empty() && args.len() != expected {
            let name = node.qualified_name();
            self.report(
                node.id,
                node.span,
                ErrorCode::WrongTypeArgumentCount { name, expected, found: args.len() },
            );
            return Vec::new();
        }
        args
    }

    /// Resolve a type annotation, reporting what fails and recording the result
    pub fn resolve_type(&mut self, node: &TypeNode, env: TypeEnv) -> Type {
        let ty = self.resolve_type_inner(node, env);
        self.resolution.types.insert(node.id, ty.clone());
        ty
    }

    fn resolve_type_inner(&mut self, node: &TypeNode, env: TypeEnv) -> Type {
        if node.is_void() {
            return Type::Void;
        }
        if node.prefix.is_none() && node.name.name == "Dynamic" {
            return Type::Dynamic;
        }
        let Some(element) = self.lookup_type_name(node, env) else {
            self.report(node.id, node.span, ErrorCode::NoSuchType(node.qualified_name()));
            return Type::Error;
        };
        self.record(node.id, element);
        let kind = self.elements.get(element).kind;
        if !kind.is_type() {
            self.report(node.id, node.span, ErrorCode::NotAType(node.qualified_name()));
            return Type::Error;
        }
        if kind == ElementKind::TypeVariable && env.is_static {
            let in_class = self
                .elements
                .get(element)
                .enclosing
                .map_or(false, |owner| self.elements.get(owner).kind.is_class_like());
            if in_class {
                self.report(node.id, node.span, ErrorCode::TypeVariableInStaticContext(node.name.name.clone()));
            }
        }
        let args = self.resolve_type_args(element, node, env);
        type_for_element(&self.elements, element, args).unwrap_or(Type::Error)
    }

    fn finish(self) -> ResolvedProgram {
        ResolvedProgram {
            elements: self.elements,
            resolution: self.resolution,
            constants: self.constants,
            libraries: self.library_elements,
            core: self.core,
        }
    }
}

/// Runs the resolver passes over a set of parsed libraries
#[derive(Debug, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `libraries`; diagnostics go to `reporter`
    pub fn resolve(&self, libraries: &[Library], reporter: &mut Reporter<'_>) -> ResolvedProgram {
        log::debug!("resolving {} libraries", libraries.len());
        let mut ctx = Context::new(libraries, reporter);

        enter::Enter::new().process(&mut ctx);
        supertypes::Supertypes::new().process(&mut ctx);
        members::Members::new().process(&mut ctx);
        names::Names::new().process(&mut ctx);
        constants::Constants::new().process(&mut ctx);

        log::debug!(
            "resolved {} elements, {} references, {} constants",
            ctx.elements.len(),
            ctx.resolution.reference_count(),
            ctx.constants.len()
        );
        ctx.finish()
    }
}
