//! Static types attached to elements

use super::{ElementId, ElementKind, Elements};

/// A resolved type.
///
/// `Error` stands in for a type that failed to resolve; it behaves like
/// `Dynamic` so later passes do not report follow-on problems for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Type {
    #[default]
    Dynamic,
    Void,
    /// Class or interface type with its type arguments
    Interface { element: ElementId, args: Vec<Type> },
    TypeVariable(ElementId),
    /// Function type named by a typedef
    Alias(ElementId),
    /// Anonymous function type of a method, function literal or function-typed parameter
    Function,
    Error,
}

impl Type {
    pub fn interface(element: ElementId) -> Self {
        Type::Interface { element, args: Vec::new() }
    }

    /// Class or interface element behind this type
    pub fn element(&self) -> Option<ElementId> {
        match self {
            Type::Interface { element, .. } | Type::TypeVariable(element) | Type::Alias(element) => Some(*element),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic | Type::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Whether the type mentions a type variable anywhere
    pub fn mentions_type_variable(&self) -> Option<ElementId> {
        match self {
            Type::TypeVariable(id) => Some(*id),
            Type::Interface { args, .. } => args.iter().find_map(Type::mentions_type_variable),
            _ => None,
        }
    }

    /// Render with element names, e.g. `List<T>`
    pub fn display(&self, elements: &Elements) -> String {
        match self {
            Type::Dynamic => "Dynamic".to_string(),
            Type::Void => "void".to_string(),
            Type::Error => "<error>".to_string(),
            Type::Function => "Function".to_string(),
            Type::TypeVariable(id) | Type::Alias(id) => elements.get(*id).name.clone(),
            Type::Interface { element, args } => {
                let name = &elements.get(*element).name;
                if args.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<_> = args.iter().map(|a| a.display(elements)).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
        }
    }

    /// Whether values of this type are instances of `class` or a subtype of it
    pub fn is_subtype_of(&self, class: ElementId, elements: &Elements) -> bool {
        match self {
            Type::Interface { element, .. } => {
                *element == class
                    || elements
                        .get(*element)
                        .class_info()
                        .map_or(false, |info| info.supertypes.contains(&class))
            }
            Type::TypeVariable(id) => {
                let bound = &elements.get(*id).ty;
                !matches!(bound, Type::TypeVariable(_)) && bound.is_subtype_of(class, elements)
            }
            _ => false,
        }
    }
}

/// What a type name resolved to, before it becomes a `Type`
pub fn type_for_element(elements: &Elements, id: ElementId, args: Vec<Type>) -> Option<Type> {
    match elements.get(id).kind {
        ElementKind::Class | ElementKind::Interface => Some(Type::Interface { element: id, args }),
        ElementKind::TypeVariable => Some(Type::TypeVariable(id)),
        ElementKind::FunctionTypeAlias => Some(Type::Alias(id)),
        _ => None,
    }
}
