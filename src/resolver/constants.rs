//! Compile-time constant evaluation
//!
//! [`ConstantEvaluator`] folds an already resolved expression into a
//! [`ConstValue`] or explains why it is not constant. The resolver runs it over
//! every `const` field and variable, every static or top-level `final`, every
//! parameter default and every `const` constructor call or collection literal;
//! it can also be driven on its own over a [`ResolvedProgram`].

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::{Context, Library, Resolution, ResolvedProgram};
use crate::ast::{walk, AstVisitor, BinaryOp, Expr, ExprKind, NodeId, NodeRef, TypeNode, UnaryOp};
use crate::consts::CONST_MAX_DEPTH;
use crate::diagnostics::ErrorCode;
use crate::element::{ElementId, ElementKind, Elements, Type};
use crate::parser::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// Instance created by a const constructor
    Object { class: ElementId, constructor: ElementId, args: Vec<ConstValue> },
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

impl ConstValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value of an int or double
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, ConstValue::Int(_) | ConstValue::Double(_))
    }

    /// Text spliced into an interpolated string
    fn interpolated(&self) -> Option<String> {
        match self {
            ConstValue::String(s) => Some(s.clone()),
            ConstValue::Int(v) => Some(v.to_string()),
            ConstValue::Double(v) => Some(format_double(*v)),
            ConstValue::Bool(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Source-like rendering, e.g. `const Point(1, 2)`
    pub fn display(&self, elements: &Elements) -> String {
        match self {
            ConstValue::Null => "null".to_string(),
            ConstValue::Bool(v) => v.to_string(),
            ConstValue::Int(v) => v.to_string(),
            ConstValue::Double(v) => format_double(*v),
            ConstValue::String(s) => format!("\"{}\"", s.escape_default()),
            ConstValue::Object { constructor, args, .. } => {
                let mut out = format!("const {}(", elements.get(*constructor).name);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&arg.display(elements));
                }
                out.push(')');
                out
            }
            ConstValue::List(values) => {
                let items: Vec<String> = values.iter().map(|v| v.display(elements)).collect();
                format!("[{}]", items.join(", "))
            }
            ConstValue::Map(entries) => {
                let mut out = String::from("{");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}: {}", key.display(elements), value.display(elements));
                }
                out.push('}');
                out
            }
        }
    }
}

/// `-9223372036854775808`: the one negative literal whose magnitude overflows
fn is_negated_min(operand: &Expr) -> bool {
    match &operand.kind {
        ExprKind::Int { value: None, text, radix } => {
            let digits = if *radix == 16 { &text[2..] } else { text.as_str() };
            i128::from_str_radix(digits, *radix).map_or(false, |v| v == -(i64::MIN as i128))
        }
        _ => false,
    }
}

/// Doubles always carry a fraction part: `1.0`, not `1`
fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Why an expression has no constant value
#[derive(Debug, Clone, PartialEq)]
pub enum ConstError {
    /// The expression breaks a constant rule at `span`
    Invalid { node: NodeId, span: Span, code: ErrorCode },
    /// A subexpression already failed and was reported elsewhere
    Upstream,
}

impl ConstError {
    fn at(expr: &Expr, code: ErrorCode) -> Self {
        ConstError::Invalid { node: expr.id, span: expr.span, code }
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            ConstError::Invalid { code, .. } => Some(code),
            ConstError::Upstream => None,
        }
    }
}

/// Constant values by expression node and by constant element
#[derive(Debug, Default, Clone)]
pub struct ConstantTable {
    values: HashMap<NodeId, ConstValue>,
    elements: HashMap<ElementId, ConstValue>,
}

impl ConstantTable {
    /// Value of a constant root expression (initializer, default, const literal)
    pub fn value(&self, node: NodeId) -> Option<&ConstValue> {
        self.values.get(&node)
    }

    /// Value of a const or final field or variable
    pub fn element_value(&self, element: ElementId) -> Option<&ConstValue> {
        self.elements.get(&element)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Which operand a folding failure blames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blame {
    Left,
    Right,
    Whole,
}

/// Fold `left op right`; errors name the operand at fault
fn fold_binary(op: BinaryOp, left: &ConstValue, right: &ConstValue) -> Result<ConstValue, (Blame, ErrorCode)> {
    use ConstValue::{Bool, Double, Int};

    let numbers = || -> Result<(), (Blame, ErrorCode)> {
        if !left.is_number() {
            return Err((Blame::Left, ErrorCode::ExpectedNumber));
        }
        if !right.is_number() {
            return Err((Blame::Right, ErrorCode::ExpectedNumber));
        }
        Ok(())
    };
    let ints = || -> Result<(i64, i64), (Blame, ErrorCode)> {
        let l = left.as_int().ok_or((Blame::Left, ErrorCode::ExpectedInt))?;
        let r = right.as_int().ok_or((Blame::Right, ErrorCode::ExpectedInt))?;
        Ok((l, r))
    };
    let bools = || -> Result<(bool, bool), (Blame, ErrorCode)> {
        let l = left.as_bool().ok_or((Blame::Left, ErrorCode::ExpectedBool))?;
        let r = right.as_bool().ok_or((Blame::Right, ErrorCode::ExpectedBool))?;
        Ok((l, r))
    };
    let (lf, rf) = (left.as_number().unwrap_or(0.0), right.as_number().unwrap_or(0.0));

    let value = match op {
        BinaryOp::Add => {
            if let (ConstValue::String(l), ConstValue::String(r)) = (left, right) {
                return Ok(ConstValue::String(format!("{}{}", l, r)));
            }
            numbers()?;
            match (left, right) {
                (Int(l), Int(r)) => Int(l.wrapping_add(*r)),
                _ => Double(lf + rf),
            }
        }
        BinaryOp::Sub | BinaryOp::Mul => {
            numbers()?;
            match (left, right, op) {
                (Int(l), Int(r), BinaryOp::Sub) => Int(l.wrapping_sub(*r)),
                (Int(l), Int(r), _) => Int(l.wrapping_mul(*r)),
                (_, _, BinaryOp::Sub) => Double(lf - rf),
                _ => Double(lf * rf),
            }
        }
        BinaryOp::Div => {
            numbers()?;
            Double(lf / rf)
        }
        BinaryOp::TruncDiv | BinaryOp::Mod => {
            numbers()?;
            if rf == 0.0 {
                return Err((Blame::Right, ErrorCode::ConstDivisionByZero));
            }
            match (left, right, op) {
                (Int(l), Int(r), BinaryOp::TruncDiv) => Int(l.wrapping_div(*r)),
                (Int(l), Int(r), _) => Int(l.wrapping_rem_euclid(*r)),
                (_, _, BinaryOp::TruncDiv) => {
                    let q = (lf / rf).trunc();
                    if !q.is_finite() || q.abs() >= i64::MAX as f64 {
                        return Err((Blame::Whole, ErrorCode::NotConstant));
                    }
                    Int(q as i64)
                }
                _ => Double(lf.rem_euclid(rf)),
            }
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            let (l, r) = ints()?;
            Int(match op {
                BinaryOp::BitAnd => l & r,
                BinaryOp::BitOr => l | r,
                _ => l ^ r,
            })
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            let (l, r) = ints()?;
            let Some(count) = u32::try_from(r).ok().filter(|c| *c < 64) else {
                return Err((Blame::Right, ErrorCode::NotConstant));
            };
            Int(if op == BinaryOp::Shl { l.wrapping_shl(count) } else { l >> count })
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            numbers()?;
            let ordering = match (left, right) {
                (Int(l), Int(r)) => l.partial_cmp(r),
                _ => lf.partial_cmp(&rf),
            };
            let Some(ordering) = ordering else {
                return Ok(Bool(false));
            };
            Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Le => ordering.is_le(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = if left.is_number() && right.is_number() { lf == rf } else { left == right };
            Bool(equal == (op == BinaryOp::Eq))
        }
        BinaryOp::EqStrict | BinaryOp::NeStrict => Bool((left == right) == (op == BinaryOp::EqStrict)),
        BinaryOp::And | BinaryOp::Or => {
            let (l, r) = bools()?;
            Bool(if op == BinaryOp::And { l && r } else { l || r })
        }
    };
    Ok(value)
}

/// Standalone evaluator over resolved expressions.
///
/// References to constant fields and variables are evaluated on demand from
/// their initializers and memoized; a reference back into an initializer
/// still being evaluated is a cyclic constant.
pub struct ConstantEvaluator<'a> {
    elements: &'a Elements,
    resolution: &'a Resolution,
    initializers: HashMap<ElementId, &'a Expr>,
    in_progress: HashSet<ElementId>,
    /// Finished element evaluations; `None` if the initializer failed
    done: HashMap<ElementId, Option<ConstValue>>,
    table: ConstantTable,
    errors: Vec<ConstError>,
    depth: usize,
}

impl<'a> ConstantEvaluator<'a> {
    /// Evaluator without initializers: references to other constants fail
    pub fn new(elements: &'a Elements, resolution: &'a Resolution) -> Self {
        Self {
            elements,
            resolution,
            initializers: HashMap::new(),
            in_progress: HashSet::new(),
            done: HashMap::new(),
            table: ConstantTable::default(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Evaluator that can follow references into the variable initializers of `libraries`
    pub fn with_initializers(elements: &'a Elements, resolution: &'a Resolution, libraries: &'a [Library]) -> Self {
        struct Collector<'a, 'r> {
            resolution: &'r Resolution,
            initializers: HashMap<ElementId, &'a Expr>,
        }

        impl<'a> AstVisitor<'a> for Collector<'a, '_> {
            fn visit(&mut self, node: NodeRef<'a>) -> bool {
                if let NodeRef::Variable(variable) = node {
                    if let (Some(id), Some(init)) = (self.resolution.declared(variable.id), &variable.init) {
                        self.initializers.insert(id, init);
                    }
                }
                true
            }
        }

        let mut collector = Collector { resolution, initializers: HashMap::new() };
        for parsed in libraries.iter().flat_map(|l| l.units.iter()) {
            walk(&mut collector, NodeRef::Unit(&parsed.unit));
        }
        let mut evaluator = Self::new(elements, resolution);
        evaluator.initializers = collector.initializers;
        evaluator
    }

    pub fn for_program(program: &'a ResolvedProgram, libraries: &'a [Library]) -> Self {
        Self::with_initializers(&program.elements, &program.resolution, libraries)
    }

    /// Errors found in the initializers of referenced constants
    pub fn take_errors(&mut self) -> Vec<ConstError> {
        std::mem::take(&mut self.errors)
    }

    pub fn into_table(self) -> ConstantTable {
        self.table
    }

    /// Value of a constant field or variable, evaluating its initializer once
    pub fn evaluate_element(&mut self, id: ElementId) -> Result<ConstValue, ConstError> {
        if let Some(done) = self.done.get(&id) {
            return done.clone().ok_or(ConstError::Upstream);
        }
        let Some(init) = self.initializers.get(&id).copied() else {
            return Err(ConstError::Upstream);
        };
        self.in_progress.insert(id);
        let result = self.evaluate(init);
        self.in_progress.remove(&id);

        match result {
            Ok(value) => {
                self.table.values.insert(init.id, value.clone());
                self.table.elements.insert(id, value.clone());
                self.done.insert(id, Some(value.clone()));
                Ok(value)
            }
            Err(error) => {
                log::trace!("constant {} failed: {:?}", self.elements.get(id).name, error);
                if let ConstError::Invalid { .. } = error {
                    self.errors.push(error);
                }
                self.done.insert(id, None);
                Err(ConstError::Upstream)
            }
        }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<ConstValue, ConstError> {
        if self.depth >= CONST_MAX_DEPTH {
            return Err(ConstError::at(expr, ErrorCode::NotConstant));
        }
        self.depth += 1;
        let result = self.evaluate_inner(expr);
        self.depth -= 1;
        result
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> Result<ConstValue, ConstError> {
        match &expr.kind {
            ExprKind::Null => Ok(ConstValue::Null),
            ExprKind::Bool(v) => Ok(ConstValue::Bool(*v)),
            ExprKind::Int { value: Some(value), .. } => Ok(ConstValue::Int(*value)),
            ExprKind::Int { text, .. } => Err(ConstError::at(expr, ErrorCode::IntegerOutOfRange(text.clone()))),
            ExprKind::Double { value, .. } => Ok(ConstValue::Double(*value)),
            ExprKind::String(s) => Ok(ConstValue::String(s.clone())),
            ExprKind::Interpolation { strings, exprs } => {
                let mut out = String::new();
                for (i, text) in strings.iter().enumerate() {
                    out.push_str(text);
                    if let Some(part) = exprs.get(i) {
                        let value = self.evaluate(part)?;
                        let text = value
                            .interpolated()
                            .ok_or_else(|| ConstError::at(part, ErrorCode::ExpectedStringNumberBool))?;
                        out.push_str(&text);
                    }
                }
                Ok(ConstValue::String(out))
            }
            ExprKind::Identifier(_) | ExprKind::PropertyAccess { .. } => self.reference(expr),
            ExprKind::Paren(inner) => self.evaluate(inner),
            ExprKind::Unary { op: UnaryOp::Neg, operand, .. } if is_negated_min(operand) => {
                Ok(ConstValue::Int(i64::MIN))
            }
            ExprKind::Unary { op, operand, .. } => {
                let value = self.evaluate(operand)?;
                match (op, &value) {
                    (UnaryOp::Neg, ConstValue::Int(v)) => Ok(ConstValue::Int(v.wrapping_neg())),
                    (UnaryOp::Neg, ConstValue::Double(v)) => Ok(ConstValue::Double(-v)),
                    (UnaryOp::Neg, _) => Err(ConstError::at(operand, ErrorCode::ExpectedNumber)),
                    (UnaryOp::Not, ConstValue::Bool(v)) => Ok(ConstValue::Bool(!v)),
                    (UnaryOp::Not, _) => Err(ConstError::at(operand, ErrorCode::ExpectedBool)),
                    (UnaryOp::BitNot, ConstValue::Int(v)) => Ok(ConstValue::Int(!v)),
                    (UnaryOp::BitNot, _) => Err(ConstError::at(operand, ErrorCode::ExpectedInt)),
                    (UnaryOp::Inc | UnaryOp::Dec, _) => Err(ConstError::at(expr, ErrorCode::NotConstant)),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                fold_binary(*op, &l, &r).map_err(|(blame, code)| match blame {
                    Blame::Left => ConstError::at(left, code),
                    Blame::Right => ConstError::at(right, code),
                    Blame::Whole => ConstError::at(expr, code),
                })
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                let condition = self.evaluate(cond)?;
                let condition = condition.as_bool().ok_or_else(|| ConstError::at(cond, ErrorCode::ExpectedBool))?;
                let then_value = self.evaluate(then_expr)?;
                let else_value = self.evaluate(else_expr)?;
                Ok(if condition { then_value } else { else_value })
            }
            ExprKind::New { is_const: true, type_node, args, .. } => self.const_instance(expr, type_node, args),
            ExprKind::List { is_const: true, type_args, elements } => {
                self.check_type_args(type_args)?;
                let values = elements.iter().map(|e| self.evaluate(e)).collect::<Result<_, _>>()?;
                Ok(ConstValue::List(values))
            }
            ExprKind::Map { is_const: true, type_args, entries } => {
                self.check_type_args(type_args)?;
                let mut values = Vec::with_capacity(entries.len());
                for entry in entries {
                    let key = self.evaluate(&entry.key)?;
                    let value = self.evaluate(&entry.value)?;
                    values.push((key, value));
                }
                Ok(ConstValue::Map(values))
            }
            ExprKind::Error => Err(ConstError::Upstream),
            _ => Err(ConstError::at(expr, ErrorCode::NotConstant)),
        }
    }

    /// A name or qualified name: only constant fields and variables qualify
    fn reference(&mut self, expr: &Expr) -> Result<ConstValue, ConstError> {
        let Some(id) = self.resolution.referenced(expr.id) else {
            return match &expr.kind {
                // Unresolved bare names were already reported
                ExprKind::Identifier(_) => Err(ConstError::Upstream),
                _ => Err(ConstError::at(expr, ErrorCode::NotConstant)),
            };
        };
        if !is_constant_element(self.elements, id) {
            return Err(ConstError::at(expr, ErrorCode::NotConstant));
        }
        if self.in_progress.contains(&id) {
            let name = self.elements.get(id).name.clone();
            return Err(ConstError::at(expr, ErrorCode::CyclicConstant(name)));
        }
        self.evaluate_element(id)
    }

    fn const_instance(&mut self, expr: &Expr, type_node: &TypeNode, args: &[Expr]) -> Result<ConstValue, ConstError> {
        let Some(constructor) = self.resolution.referenced(expr.id) else {
            // Implicit constructors are never const
            return match self.resolution.type_of(type_node.id) {
                Some(Type::Interface { element, .. }) => {
                    let name = self.elements.get(*element).name.clone();
                    Err(ConstError::at(expr, ErrorCode::NonConstConstructor(name)))
                }
                _ => Err(ConstError::Upstream),
            };
        };
        let element = self.elements.get(constructor);
        if element.kind != ElementKind::Constructor || !element.modifiers.is_const {
            let name = element.name.clone();
            return Err(ConstError::at(expr, ErrorCode::NonConstConstructor(name)));
        }
        let class = self.elements.enclosing_class(constructor).unwrap_or(constructor);
        let args = args.iter().map(|a| self.evaluate(a)).collect::<Result<_, _>>()?;
        Ok(ConstValue::Object { class, constructor, args })
    }

    fn check_type_args(&self, type_args: &[TypeNode]) -> Result<(), ConstError> {
        for arg in type_args {
            let Some(ty) = self.resolution.type_of(arg.id) else { continue };
            if let Some(variable) = ty.mentions_type_variable() {
                let name = self.elements.get(variable).name.clone();
                return Err(ConstError::Invalid {
                    node: arg.id,
                    span: arg.span,
                    code: ErrorCode::TypeVariableInConstCollection(name),
                });
            }
        }
        Ok(())
    }
}

/// Expressions that must be constant
#[derive(Default)]
struct Roots<'a> {
    /// Const and final fields and variables with an initializer
    elements: Vec<ElementId>,
    /// `const` declarations without an initializer
    uninitialized: Vec<(NodeId, Span, String)>,
    /// Parameter defaults and const literals outside constant declarations
    exprs: Vec<&'a Expr>,
}

struct RootCollector<'a, 'c> {
    elements: &'c Elements,
    resolution: &'c Resolution,
    roots: Roots<'a>,
}

impl<'a> AstVisitor<'a> for RootCollector<'a, '_> {
    fn visit(&mut self, node: NodeRef<'a>) -> bool {
        match node {
            NodeRef::Field(fields) => {
                let mut constant = false;
                for variable in &fields.variables {
                    let Some(id) = self.resolution.declared(variable.id) else { continue };
                    if !is_constant_element(self.elements, id) {
                        continue;
                    }
                    constant = true;
                    match &variable.init {
                        Some(_) => self.roots.elements.push(id),
                        None if fields.modifiers.is_const => {
                            let name = &variable.name;
                            self.roots.uninitialized.push((name.id, name.span, name.name.clone()));
                        }
                        None => {}
                    }
                }
                !constant
            }
            NodeRef::Parameter(param) => match &param.default {
                Some(default) => {
                    self.roots.exprs.push(default);
                    false
                }
                None => true,
            },
            NodeRef::Expr(expr) => match expr.kind {
                ExprKind::New { is_const: true, .. }
                | ExprKind::List { is_const: true, .. }
                | ExprKind::Map { is_const: true, .. } => {
                    self.roots.exprs.push(expr);
                    false
                }
                _ => true,
            },
            _ => true,
        }
    }
}

/// Const fields and variables, static final fields and top-level finals
fn is_constant_element(elements: &Elements, id: ElementId) -> bool {
    let element = elements.get(id);
    let m = element.modifiers;
    match element.kind {
        ElementKind::Field => m.is_const || (m.is_static && m.is_final),
        ElementKind::Variable => {
            let top_level = element.enclosing.map_or(false, |e| elements.get(e).kind == ElementKind::Library);
            m.is_const || (m.is_final && top_level)
        }
        _ => false,
    }
}

pub(super) struct Constants;

impl Constants {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&mut self, ctx: &mut Context<'_, '_, '_>) {
        let libraries = ctx.libraries;
        let mut diagnostics = Vec::new();

        let table = {
            let mut collector =
                RootCollector { elements: &ctx.elements, resolution: &ctx.resolution, roots: Roots::default() };
            for parsed in libraries.iter().flat_map(|l| l.units.iter()) {
                walk(&mut collector, NodeRef::Unit(&parsed.unit));
            }
            let roots = collector.roots;
            for (node, span, name) in roots.uninitialized {
                diagnostics.push((node, span, ErrorCode::ConstWithoutInitializer(name)));
            }

            let mut evaluator = ConstantEvaluator::with_initializers(&ctx.elements, &ctx.resolution, libraries);
            for &id in &roots.elements {
                // Failures land in the evaluator's error list.
                let _ = evaluator.evaluate_element(id);
            }
            let mut values = Vec::new();
            for expr in &roots.exprs {
                match evaluator.evaluate(expr) {
                    Ok(value) => values.push((expr.id, value)),
                    Err(ConstError::Invalid { node, span, code }) => diagnostics.push((node, span, code)),
                    Err(ConstError::Upstream) => {}
                }
            }
            for error in evaluator.take_errors() {
                if let ConstError::Invalid { node, span, code } = error {
                    diagnostics.push((node, span, code));
                }
            }
            log::debug!(
                "constants: {} declarations, {} expressions, {} failures",
                roots.elements.len(),
                roots.exprs.len(),
                diagnostics.len()
            );
            let mut table = evaluator.into_table();
            table.values.extend(values);
            table
        };

        for (node, span, code) in diagnostics {
            ctx.report(node, span, code);
        }
        ctx.constants = table;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_mixes_ints_and_doubles() {
        let sum = fold_binary(BinaryOp::Add, &ConstValue::Int(5), &ConstValue::Int(1));
        assert_eq!(sum, Ok(ConstValue::Int(6)));
        let mixed = fold_binary(BinaryOp::Mul, &ConstValue::Int(2), &ConstValue::Double(1.5));
        assert_eq!(mixed, Ok(ConstValue::Double(3.0)));
        let div = fold_binary(BinaryOp::Div, &ConstValue::Int(7), &ConstValue::Int(2));
        assert_eq!(div, Ok(ConstValue::Double(3.5)));
        let trunc = fold_binary(BinaryOp::TruncDiv, &ConstValue::Int(7), &ConstValue::Int(2));
        assert_eq!(trunc, Ok(ConstValue::Int(3)));
        let rem = fold_binary(BinaryOp::Mod, &ConstValue::Int(-7), &ConstValue::Int(3));
        assert_eq!(rem, Ok(ConstValue::Int(2)));
    }

    #[test]
    fn operand_kinds_are_checked() {
        let string = ConstValue::String("a".into());
        assert_eq!(
            fold_binary(BinaryOp::Add, &string, &ConstValue::Int(1)),
            Err((Blame::Left, ErrorCode::ExpectedNumber))
        );
        assert_eq!(
            fold_binary(BinaryOp::BitAnd, &ConstValue::Int(1), &ConstValue::Double(1.0)),
            Err((Blame::Right, ErrorCode::ExpectedInt))
        );
        assert_eq!(
            fold_binary(BinaryOp::And, &ConstValue::Bool(true), &ConstValue::Int(1)),
            Err((Blame::Right, ErrorCode::ExpectedBool))
        );
        assert_eq!(
            fold_binary(BinaryOp::TruncDiv, &ConstValue::Int(1), &ConstValue::Int(0)),
            Err((Blame::Right, ErrorCode::ConstDivisionByZero))
        );
    }

    #[test]
    fn equality_and_strings() {
        let eq = fold_binary(BinaryOp::Eq, &ConstValue::Int(1), &ConstValue::Double(1.0));
        assert_eq!(eq, Ok(ConstValue::Bool(true)));
        let strict = fold_binary(BinaryOp::EqStrict, &ConstValue::Int(1), &ConstValue::Double(1.0));
        assert_eq!(strict, Ok(ConstValue::Bool(false)));
        let joined = fold_binary(BinaryOp::Add, &ConstValue::String("a".into()), &ConstValue::String("b".into()));
        assert_eq!(joined, Ok(ConstValue::String("ab".into())));
        let shift = fold_binary(BinaryOp::Shl, &ConstValue::Int(1), &ConstValue::Int(70));
        assert_eq!(shift, Err((Blame::Right, ErrorCode::NotConstant)));
    }

    #[test]
    fn doubles_keep_a_fraction() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(2.5), "2.5");
        assert_eq!(ConstValue::Double(3.0).interpolated().as_deref(), Some("3.0"));
    }
}
