//! Enter pass - library and top-level elements
//!
//! Creates one element per library and per top-level declaration, fills the
//! built-in core library, wires imports and prefixes, and enters the type
//! variables of classes and function type aliases.

use std::collections::HashSet;

use super::Context;
use crate::ast::{Identifier, MethodKind, TopLevelDecl, TypeParameter};
use crate::diagnostics::ErrorCode;
use crate::element::{ElementId, ElementKind, Type};
use crate::scope;

pub(super) const CORE_LIBRARY: &str = "dart:core";

/// Built-in classes of the core library with their type parameters
const CORE_CLASSES: &[(&str, &[&str])] = &[
    ("Object", &[]),
    ("bool", &[]),
    ("num", &[]),
    ("int", &[]),
    ("double", &[]),
    ("String", &[]),
    ("Function", &[]),
    ("List", &["E"]),
    ("Map", &["K", "V"]),
];

pub(super) struct Enter {
    declarations: usize,
}

impl Enter {
    pub fn new() -> Self {
        Self { declarations: 0 }
    }

    pub fn process(&mut self, ctx: &mut Context<'_, '_, '_>) {
        self.enter_core(ctx);

        let libraries = ctx.libraries;
        for library in libraries {
            let id = ctx.elements.add(ElementKind::Library, &library.name, None);
            ctx.library_elements.push(id);
        }

        for (index, library) in libraries.iter().enumerate() {
            let lib = ctx.library_elements[index];
            for parsed in &library.units {
                for decl in &parsed.unit.declarations {
                    self.enter_declaration(ctx, lib, decl);
                }
            }
        }

        self.wire_imports(ctx);

        // Type variables come last so shadowing can see every top-level name.
        for (index, library) in libraries.iter().enumerate() {
            let lib = ctx.library_elements[index];
            for parsed in &library.units {
                for decl in &parsed.unit.declarations {
                    match decl {
                        TopLevelDecl::Class(class) => {
                            let Some(id) = ctx.declared(class.id) else { continue };
                            let params = self.enter_type_variables(ctx, lib, id, &class.type_params);
                            if let Some(info) = ctx.elements.get_mut(id).class_info_mut() {
                                info.type_params = params;
                            }
                        }
                        TopLevelDecl::TypeAlias(alias) => {
                            let Some(id) = ctx.declared(alias.id) else { continue };
                            let params = self.enter_type_variables(ctx, lib, id, &alias.type_params);
                            if let Some(info) = ctx.elements.get_mut(id).function_info_mut() {
                                info.type_params = params;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        log::debug!(
            "enter: {} libraries, {} top-level declarations, {} classes",
            libraries.len(),
            self.declarations,
            ctx.classes.len()
        );
    }

    fn enter_core(&mut self, ctx: &mut Context<'_, '_, '_>) {
        let core = ctx.core;
        for (name, params) in CORE_CLASSES {
            let class = ctx.elements.add(ElementKind::Class, name, Some(core));
            let type_params = params
                .iter()
                .map(|p| ctx.elements.add(ElementKind::TypeVariable, p, Some(class)))
                .collect();
            if let Some(info) = ctx.elements.get_mut(class).class_info_mut() {
                info.type_params = type_params;
            }
            if let Some(info) = ctx.elements.get_mut(core).library_info_mut() {
                info.top_level.insert(name.to_string(), class);
            }
        }

        if let Some(num) = scope::lookup_own(&ctx.elements, core, "num") {
            for name in ["int", "double"] {
                if let Some(class) = scope::lookup_own(&ctx.elements, core, name) {
                    if let Some(info) = ctx.elements.get_mut(class).class_info_mut() {
                        info.superclass = Some(Type::interface(num));
                        info.supertypes.push(num);
                    }
                }
            }
        }

        // `new List(n)` takes an optional length
        if let Some(list) = scope::lookup_own(&ctx.elements, core, "List") {
            let ctor = ctx.elements.add(ElementKind::Constructor, "List", Some(list));
            let length = ctx.elements.add(ElementKind::Parameter, "length", Some(ctor));
            if let Some(info) = ctx.elements.get_mut(ctor).function_info_mut() {
                info.params.push(length);
                info.optional = 1;
            }
            if let Some(info) = ctx.elements.get_mut(list).class_info_mut() {
                info.constructors.insert(String::new(), ctor);
            }
        }

        let print = ctx.elements.add(ElementKind::Function, "print", Some(core));
        let object = ctx.elements.add(ElementKind::Parameter, "object", Some(print));
        if let Some(info) = ctx.elements.get_mut(print).function_info_mut() {
            info.params.push(object);
            info.required = 1;
        }
        ctx.elements.get_mut(print).ty = Type::Void;
        if let Some(info) = ctx.elements.get_mut(core).library_info_mut() {
            info.top_level.insert("print".to_string(), print);
        }
    }

    fn enter_declaration<'a>(&mut self, ctx: &mut Context<'a, '_, '_>, library: ElementId, decl: &'a TopLevelDecl) {
        match decl {
            TopLevelDecl::Class(class) => {
                let kind = if class.is_interface { ElementKind::Interface } else { ElementKind::Class };
                let id = ctx.add_element(kind, &class.name.name, class.name.span, Some(library), class.id);
                let element = ctx.elements.get_mut(id);
                element.modifiers.is_abstract = class.is_abstract;
                if let Some(info) = element.class_info_mut() {
                    info.is_abstract = class.is_abstract;
                }
                ctx.class_decls.insert(id, class);
                ctx.classes.push(id);
                self.register(ctx, library, id, &class.name);
            }
            TopLevelDecl::TypeAlias(alias) => {
                let id = ctx.add_element(
                    ElementKind::FunctionTypeAlias,
                    &alias.name.name,
                    alias.name.span,
                    Some(library),
                    alias.id,
                );
                self.register(ctx, library, id, &alias.name);
            }
            TopLevelDecl::Function(function) => {
                let kind = match function.kind {
                    MethodKind::Getter => ElementKind::Getter,
                    MethodKind::Setter => ElementKind::Setter,
                    _ => ElementKind::Function,
                };
                let id = ctx.add_element(kind, &function.name.name, function.name.span, Some(library), function.id);
                ctx.elements.get_mut(id).modifiers = function.modifiers;
                self.register(ctx, library, id, &function.name);
            }
            TopLevelDecl::Variables(fields) => {
                for variable in &fields.variables {
                    let id = ctx.add_element(
                        ElementKind::Variable,
                        &variable.name.name,
                        variable.name.span,
                        Some(library),
                        variable.id,
                    );
                    ctx.elements.get_mut(id).modifiers = fields.modifiers;
                    self.register(ctx, library, id, &variable.name);
                }
            }
        }
    }

    /// Add a top-level element to the library namespace
    fn register(&mut self, ctx: &mut Context<'_, '_, '_>, library: ElementId, id: ElementId, name: &Identifier) {
        self.declarations += 1;
        let kind = ctx.elements.get(id).kind;
        let existing = ctx.elements.get(library).library_info().and_then(|info| {
            let (first, second) = if kind == ElementKind::Setter {
                (&info.setters, &info.top_level)
            } else {
                (&info.top_level, &info.setters)
            };
            first.get(&name.name).or_else(|| second.get(&name.name)).copied()
        });
        if let Some(existing) = existing {
            if scope::kinds_conflict(ctx.elements.get(existing).kind, kind) {
                ctx.report(name.id, name.span, ErrorCode::DuplicateDeclaration(name.name.clone()));
                return;
            }
        }
        if let Some(info) = ctx.elements.get_mut(library).library_info_mut() {
            let table = if kind == ElementKind::Setter { &mut info.setters } else { &mut info.top_level };
            table.insert(name.name.clone(), id);
        }
    }

    fn wire_imports(&mut self, ctx: &mut Context<'_, '_, '_>) {
        let libraries = ctx.libraries;
        let core = ctx.core;
        for (index, library) in libraries.iter().enumerate() {
            let lib = ctx.library_elements[index];
            let mut unprefixed = Vec::new();
            let mut prefixed = Vec::new();
            for import in &library.imports {
                let Some(target) = ctx.library_elements.get(import.library).copied() else {
                    log::warn!("library {} imports unknown library #{}", library.name, import.library);
                    continue;
                };
                if target == lib {
                    continue;
                }
                match &import.prefix {
                    Some(prefix) => prefixed.push((prefix.clone(), target)),
                    None => unprefixed.push(target),
                }
            }
            if let Some(info) = ctx.elements.get_mut(lib).library_info_mut() {
                info.imports = unprefixed;
                info.imports.push(core);
                for (prefix, target) in prefixed {
                    info.prefixes.entry(prefix).or_default().push(target);
                }
            }
        }
    }

    fn enter_type_variables(
        &mut self,
        ctx: &mut Context<'_, '_, '_>,
        library: ElementId,
        owner: ElementId,
        params: &[TypeParameter],
    ) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(params.len());
        for param in params {
            let name = &param.name;
            let id = ctx.add_element(ElementKind::TypeVariable, &name.name, name.span, Some(owner), param.id);
            if !seen.insert(name.name.clone()) {
                ctx.report(name.id, name.span, ErrorCode::DuplicateTypeVariable(name.name.clone()));
                continue;
            }
            if let Some(hidden) = scope::lookup_library(&ctx.elements, library, &name.name) {
                let hidden = ctx.elements.get(hidden).describe();
                ctx.report(name.id, name.span, ErrorCode::Shadows { name: name.name.clone(), hidden });
            }
            ids.push(id);
        }
        ids
    }
}
