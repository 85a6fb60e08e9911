//! Member pass
//!
//! Builds the member table of every class and interface, checks member name
//! conflicts and constructor legality, and resolves the signatures (return
//! types, parameters, field types) of all members and top-level functions.

use std::collections::HashSet;

use super::{Context, TypeEnv};
use crate::ast::{ClassDecl, ClassMember, Identifier, MethodDecl, MethodKind, Parameter, TopLevelDecl, TypeNode};
use crate::diagnostics::ErrorCode;
use crate::element::types::type_for_element;
use crate::element::{ElementId, ElementKind, FunctionInfo, Type};
use crate::scope;

pub(super) struct Members {
    members: usize,
    constructors: usize,
}

impl Members {
    pub fn new() -> Self {
        Self { members: 0, constructors: 0 }
    }

    pub fn process(&mut self, ctx: &mut Context<'_, '_, '_>) {
        let libraries = ctx.libraries;
        for (index, library) in libraries.iter().enumerate() {
            let lib = ctx.library_elements[index];
            for parsed in &library.units {
                for decl in &parsed.unit.declarations {
                    match decl {
                        TopLevelDecl::Class(class) => {
                            if let Some(id) = ctx.declared(class.id) {
                                self.build_class(ctx, id, class);
                            }
                        }
                        TopLevelDecl::Function(function) => {
                            if let Some(id) = ctx.declared(function.id) {
                                build_signature(ctx, id, function, TypeEnv::top_level(lib), None);
                            }
                        }
                        TopLevelDecl::TypeAlias(alias) => {
                            let Some(id) = ctx.declared(alias.id) else { continue };
                            let env = TypeEnv { library: lib, owner: Some(id), is_static: false };
                            let ty = declared_type(ctx, alias.return_type.as_ref(), env);
                            ctx.elements.get_mut(id).ty = ty;
                            let (params, required, optional) = build_parameters(ctx, id, &alias.params, env, None);
                            if let Some(info) = ctx.elements.get_mut(id).function_info_mut() {
                                info.params = params;
                                info.required = required;
                                info.optional = optional;
                            }
                        }
                        TopLevelDecl::Variables(fields) => {
                            let env = TypeEnv::top_level(lib);
                            let ty = declared_type(ctx, fields.type_node.as_ref(), env);
                            for variable in &fields.variables {
                                if let Some(id) = ctx.declared(variable.id) {
                                    ctx.elements.get_mut(id).ty = ty.clone();
                                }
                            }
                        }
                    }
                }
            }
        }
        log::debug!("members: {} members, {} constructors", self.members, self.constructors);
    }

    fn build_class<'a>(&mut self, ctx: &mut Context<'a, '_, '_>, class: ElementId, decl: &'a ClassDecl) {
        let library = ctx.library_of(class);

        // Register every member first so `this.x` parameters can see later fields.
        for member in &decl.members {
            match member {
                ClassMember::Field(fields) => {
                    let env = TypeEnv { library, owner: Some(class), is_static: fields.modifiers.is_static };
                    let ty = declared_type(ctx, fields.type_node.as_ref(), env);
                    for variable in &fields.variables {
                        let name = &variable.name;
                        let id = ctx.add_element(ElementKind::Field, &name.name, name.span, Some(class), variable.id);
                        let element = ctx.elements.get_mut(id);
                        element.modifiers = fields.modifiers;
                        element.ty = ty.clone();
                        self.add_member(ctx, class, id, name);
                    }
                }
                ClassMember::Method(method) if method.is_constructor() => {
                    self.add_constructor(ctx, class, decl, method);
                }
                ClassMember::Method(method) => {
                    let kind = match method.kind {
                        MethodKind::Getter => ElementKind::Getter,
                        MethodKind::Setter => ElementKind::Setter,
                        MethodKind::Operator => ElementKind::Operator,
                        _ => ElementKind::Method,
                    };
                    let name = &method.name;
                    let id = ctx.add_element(kind, &name.name, name.span, Some(class), method.id);
                    ctx.elements.get_mut(id).modifiers = method.modifiers;
                    self.add_member(ctx, class, id, name);
                    check_body(ctx, decl, method);
                }
            }
        }

        for member in &decl.members {
            let ClassMember::Method(method) = member else { continue };
            let Some(id) = ctx.declared(method.id) else { continue };
            let env = TypeEnv { library, owner: Some(class), is_static: method.modifiers.is_static };
            let constructor_of = method.is_constructor().then_some(class);
            build_signature(ctx, id, method, env, constructor_of);
        }
    }

    /// Add a field, method, accessor or operator to the class namespace
    fn add_member(&mut self, ctx: &mut Context<'_, '_, '_>, class: ElementId, id: ElementId, name: &Identifier) {
        self.members += 1;
        let kind = ctx.elements.get(id).kind;
        let existing = ctx.elements.get(class).class_info().and_then(|info| {
            let (first, second) = if kind == ElementKind::Setter {
                (&info.setters, &info.member_index)
            } else {
                (&info.member_index, &info.setters)
            };
            first.get(&name.name).or_else(|| second.get(&name.name)).copied()
        });
        if let Some(existing) = existing {
            let existing = ctx.elements.get(existing);
            if scope::kinds_conflict(existing.kind, kind) {
                let code = ErrorCode::MemberConflict { name: name.name.clone(), existing: existing.describe() };
                ctx.report(name.id, name.span, code);
                return;
            }
        }
        if let Some(info) = ctx.elements.get_mut(class).class_info_mut() {
            let table = if kind == ElementKind::Setter { &mut info.setters } else { &mut info.member_index };
            table.insert(name.name.clone(), id);
            info.members.push(id);
        }
    }

    fn add_constructor<'a>(
        &mut self,
        ctx: &mut Context<'a, '_, '_>,
        class: ElementId,
        decl: &'a ClassDecl,
        method: &'a MethodDecl,
    ) {
        self.constructors += 1;
        let name = &method.name;
        let full_name = method.full_name();
        let id = ctx.add_element(ElementKind::Constructor, &full_name, name.span, Some(class), method.id);
        ctx.elements.get_mut(id).modifiers = method.modifiers;

        // A factory may construct an interface this class is the default of.
        let own = name.name == decl.name.name;
        if !own {
            let names_class = method.modifiers.is_factory
                && scope::lookup_library(&ctx.elements, ctx.library_of(class), &name.name)
                    .map_or(false, |other| ctx.elements.get(other).kind.is_class_like());
            if !names_class {
                let code = ErrorCode::ConstructorNameMismatch { class: decl.name.name.clone(), found: name.name.clone() };
                ctx.report(name.id, name.span, code);
            }
        }
        if method.modifiers.is_abstract {
            ctx.report(name.id, name.span, ErrorCode::IllegalConstructorModifier("abstract".to_string()));
        }
        if method.modifiers.is_static {
            ctx.report(name.id, name.span, ErrorCode::IllegalConstructorModifier("static".to_string()));
        }
        if let Some(ty) = &method.return_type {
            ctx.report(ty.id, ty.span, ErrorCode::ConstructorWithReturnType);
        }

        let key = constructor_key(method, own);
        let duplicate = ctx
            .elements
            .get(class)
            .class_info()
            .map_or(false, |info| info.constructors.contains_key(&key));
        if duplicate {
            ctx.report(name.id, name.span, ErrorCode::DuplicateConstructor(full_name));
            return;
        }
        if let Some(info) = ctx.elements.get_mut(class).class_info_mut() {
            info.constructors.insert(key, id);
        }
    }
}

/// Key of a constructor in its class's constructor table.
///
/// Own constructors use the bare constructor name ("" when unnamed); factories
/// for another class keep that class's name, e.g. `I` or `I.named`.
pub(super) fn constructor_key(method: &MethodDecl, own: bool) -> String {
    match (&method.constructor_name, own) {
        (Some(ctor), true) => ctor.name.clone(),
        (None, true) => String::new(),
        (_, false) => method.full_name(),
    }
}

fn check_body(ctx: &mut Context<'_, '_, '_>, class: &ClassDecl, method: &MethodDecl) {
    let name = &method.name;
    if class.is_interface {
        if method.body.is_present() {
            ctx.report(name.id, name.span, ErrorCode::InterfaceMethodWithBody(name.name.clone()));
        }
    } else if !method.body.is_present() && !method.modifiers.is_abstract && !class.is_abstract {
        ctx.report(name.id, name.span, ErrorCode::MissingMethodBody(name.name.clone()));
    }
}

fn declared_type(ctx: &mut Context<'_, '_, '_>, node: Option<&TypeNode>, env: TypeEnv) -> Type {
    node.map_or(Type::Dynamic, |node| ctx.resolve_type(node, env))
}

/// Resolve the return type and parameters of a method, accessor, constructor
/// or top-level function
fn build_signature(
    ctx: &mut Context<'_, '_, '_>,
    id: ElementId,
    method: &MethodDecl,
    env: TypeEnv,
    constructor_of: Option<ElementId>,
) {
    let ty = match constructor_of {
        Some(class) => type_for_element(&ctx.elements, class, Vec::new()).unwrap_or_default(),
        None => declared_type(ctx, method.return_type.as_ref(), env),
    };
    ctx.elements.get_mut(id).ty = ty;
    let (params, required, optional) = build_parameters(ctx, id, &method.params, env, constructor_of);
    if let Some(info) = ctx.elements.get_mut(id).function_info_mut() {
        *info = FunctionInfo { params, required, optional, ..FunctionInfo::default() };
    }
}

/// Create parameter elements for `params` owned by `owner`.
///
/// Returns the parameter elements with the required and optional counts.
/// `constructor_of` names the class when `owner` is a constructor, which is
/// the only place `this.x` parameters are allowed.
pub(super) fn build_parameters(
    ctx: &mut Context<'_, '_, '_>,
    owner: ElementId,
    params: &[Parameter],
    env: TypeEnv,
    constructor_of: Option<ElementId>,
) -> (Vec<ElementId>, usize, usize) {
    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(params.len());
    let (mut required, mut optional) = (0, 0);
    for param in params {
        let name = &param.name;
        if !seen.insert(name.name.as_str()) {
            ctx.report(name.id, name.span, ErrorCode::DuplicateParameter(name.name.clone()));
        }
        if param.is_optional {
            optional += 1;
        } else {
            required += 1;
        }

        let mut ty = match &param.function_params {
            Some(inner) => {
                resolve_parameter_types(ctx, param.type_node.as_ref(), inner, env);
                Type::Function
            }
            None => declared_type(ctx, param.type_node.as_ref(), env),
        };

        if param.is_field {
            match constructor_of {
                None => {
                    ctx.report(name.id, name.span, ErrorCode::FieldParameterOutsideConstructor(name.name.clone()))
                }
                Some(class) => match own_field(ctx, class, &name.name) {
                    Some(field) => {
                        ctx.record(name.id, field);
                        if param.type_node.is_none() {
                            ty = ctx.elements.get(field).ty.clone();
                        }
                    }
                    None => ctx.report(name.id, name.span, ErrorCode::NotAField(name.name.clone())),
                },
            }
        }

        let id = ctx.add_element(ElementKind::Parameter, &name.name, name.span, Some(owner), param.id);
        let element = ctx.elements.get_mut(id);
        element.modifiers = param.modifiers;
        element.ty = ty;
        ids.push(id);
    }
    (ids, required, optional)
}

/// Types mentioned by a function-typed parameter `R f(A a, B b)`
fn resolve_parameter_types(ctx: &mut Context<'_, '_, '_>, result: Option<&TypeNode>, params: &[Parameter], env: TypeEnv) {
    declared_type(ctx, result, env);
    for param in params {
        match &param.function_params {
            Some(inner) => resolve_parameter_types(ctx, param.type_node.as_ref(), inner, env),
            None => {
                declared_type(ctx, param.type_node.as_ref(), env);
            }
        }
    }
}

/// Field `name` declared by `class` itself
pub(super) fn own_field(ctx: &Context<'_, '_, '_>, class: ElementId, name: &str) -> Option<ElementId> {
    let field = *ctx.elements.get(class).class_info()?.member_index.get(name)?;
    (ctx.elements.get(field).kind == ElementKind::Field).then_some(field)
}
