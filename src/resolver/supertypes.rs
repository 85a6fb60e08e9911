//! Supertype pass
//!
//! Resolves `extends`, `implements` and interface `default` clauses, reports
//! cyclic hierarchies once per class on the cycle, and records the flattened
//! set of supertypes of every class and interface.

use std::collections::{HashSet, VecDeque};

use super::{Context, TypeEnv};
use crate::ast::TypeNode;
use crate::consts::RESOLVER_MAX_HIERARCHY_STEPS;
use crate::diagnostics::ErrorCode;
use crate::element::{ElementId, ElementKind, Elements, Type};

pub(super) struct Supertypes {
    cycles: usize,
}

impl Supertypes {
    pub fn new() -> Self {
        Self { cycles: 0 }
    }

    pub fn process(&mut self, ctx: &mut Context<'_, '_, '_>) {
        let classes = ctx.classes.clone();
        for &class in &classes {
            self.resolve_clauses(ctx, class);
        }
        for &class in &classes {
            self.check_cycle(ctx, class);
        }
        for &class in &classes {
            flatten(&mut ctx.elements, class);
        }
        log::debug!("supertypes: {} classes, {} on cycles", classes.len(), self.cycles);
    }

    fn resolve_clauses(&mut self, ctx: &mut Context<'_, '_, '_>, class: ElementId) {
        let Some(decl) = ctx.class_decls.get(&class).copied() else {
            return;
        };
        let env = TypeEnv { library: ctx.library_of(class), owner: Some(class), is_static: false };

        for param in &decl.type_params {
            if let (Some(bound), Some(variable)) = (&param.bound, ctx.declared(param.id)) {
                let ty = ctx.resolve_type(bound, env);
                ctx.elements.get_mut(variable).ty = ty;
            }
        }

        let superclass = decl.superclass.as_ref().map(|node| {
            let ty = self.resolve_supertype(ctx, node, env);
            match ty.element() {
                Some(element) if !decl.is_interface && ctx.elements.get(element).kind == ElementKind::Interface => {
                    ctx.report(node.id, node.span, ErrorCode::ExtendsInterface(node.qualified_name()));
                    Type::Error
                }
                _ => ty,
            }
        });

        let interfaces: Vec<Type> = decl
            .interfaces
            .iter()
            .map(|node| self.resolve_supertype(ctx, node, env))
            .collect();

        let default_class = decl.default_class.as_ref().and_then(|node| {
            let ty = self.resolve_supertype(ctx, node, env);
            match ty.element() {
                Some(element) if ctx.elements.get(element).kind != ElementKind::Class => {
                    ctx.report(node.id, node.span, ErrorCode::DefaultMustBeClass(node.qualified_name()));
                    None
                }
                _ => Some(ty),
            }
        });

        let incomplete = superclass.as_ref().map_or(false, Type::is_error) || interfaces.iter().any(Type::is_error);
        if let Some(info) = ctx.elements.get_mut(class).class_info_mut() {
            info.superclass = superclass;
            info.interfaces = interfaces;
            info.default_class = default_class;
            info.incomplete = incomplete;
        }
    }

    /// Resolve one supertype clause; failures degrade to `Type::Error`
    fn resolve_supertype(&mut self, ctx: &mut Context<'_, '_, '_>, node: &TypeNode, env: TypeEnv) -> Type {
        let Some(element) = ctx.lookup_type_name(node, env) else {
            ctx.report(node.id, node.span, ErrorCode::UnresolvedSupertype(node.qualified_name()));
            return Type::Error;
        };
        ctx.record(node.id, element);
        if !ctx.elements.get(element).kind.is_class_like() {
            ctx.report(node.id, node.span, ErrorCode::NotAClass(node.qualified_name()));
            return Type::Error;
        }
        let args = ctx.resolve_type_args(element, node, env);
        Type::Interface { element, args }
    }

    fn check_cycle(&mut self, ctx: &mut Context<'_, '_, '_>, class: ElementId) {
        if !reaches(&ctx.elements, class, class) {
            return;
        }
        self.cycles += 1;
        if let Some(info) = ctx.elements.get_mut(class).class_info_mut() {
            info.is_cyclic = true;
        }
        let name = ctx.elements.get(class).name.clone();
        ctx.report_at(class, ErrorCode::CyclicClass(name));
    }
}

/// Classes and interfaces named directly by the supertype clauses of `class`
fn direct_supertypes(elements: &Elements, class: ElementId) -> Vec<ElementId> {
    let Some(info) = elements.get(class).class_info() else {
        return Vec::new();
    };
    info.superclass
        .iter()
        .chain(info.interfaces.iter())
        .filter_map(|ty| match ty {
            Type::Interface { element, .. } => Some(*element),
            _ => None,
        })
        .collect()
}

/// Whether `target` is reachable from the supertypes of `from`
fn reaches(elements: &Elements, from: ElementId, target: ElementId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = direct_supertypes(elements, from);
    let mut steps = 0;
    while let Some(next) = stack.pop() {
        steps += 1;
        if steps > RESOLVER_MAX_HIERARCHY_STEPS {
            log::warn!("supertype walk from {} exceeded its step limit", elements.get(from).name);
            return false;
        }
        if next == target {
            return true;
        }
        if visited.insert(next) {
            stack.extend(direct_supertypes(elements, next));
        }
    }
    false
}

/// Breadth-first supertype closure of `class`, excluding the class itself
fn flatten(elements: &mut Elements, class: ElementId) {
    let mut seen = HashSet::from([class]);
    let mut order = Vec::new();
    let mut incomplete = elements.get(class).class_info().map_or(false, |info| info.incomplete);
    let mut queue: VecDeque<ElementId> = direct_supertypes(elements, class).into();
    while let Some(next) = queue.pop_front() {
        if order.len() >= RESOLVER_MAX_HIERARCHY_STEPS {
            break;
        }
        if !seen.insert(next) {
            continue;
        }
        order.push(next);
        if let Some(info) = elements.get(next).class_info() {
            incomplete |= info.incomplete;
            // Core classes come with their closure precomputed.
            queue.extend(info.supertypes.iter().copied());
        }
        queue.extend(direct_supertypes(elements, next));
    }
    if let Some(info) = elements.get_mut(class).class_info_mut() {
        info.supertypes = order;
        info.incomplete = incomplete;
    }
}
