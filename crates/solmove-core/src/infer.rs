//! Expression-level type inference over the Move AST.
//!
//! The engine annotates `inferred_type` on every node it can resolve and inserts explicit
//! widening casts where two integer operands of the same signedness differ in width. It never
//! harmonizes differing signedness; those sites are reported as [`TypeConflict`]s for the
//! caller to resolve. Running it twice over the same tree is a no-op: a cast is only inserted
//! when the operand's type structurally differs from the target.

use crate::move_ast::{ExprKind, MoveBlock, MoveBinOp, MoveExpr, MoveStmt, MoveUnOp};
use crate::types::MoveType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier, field and call lookups supplied by the caller.
pub trait TypeEnv {
    fn lookup(&self, name: &str) -> Option<MoveType>;

    fn field_type(&self, struct_name: &str, field: &str) -> Option<MoveType>;

    fn call_return(&self, module: Option<&str>, name: &str) -> Option<MoveType>;

    fn call_params(&self, _module: Option<&str>, _name: &str) -> Option<Vec<MoveType>> {
        None
    }
}

/// An environment that knows nothing.
pub struct EmptyEnv;

impl TypeEnv for EmptyEnv {
    fn lookup(&self, _name: &str) -> Option<MoveType> {
        None
    }

    fn field_type(&self, _struct_name: &str, _field: &str) -> Option<MoveType> {
        None
    }

    fn call_return(&self, _module: Option<&str>, _name: &str) -> Option<MoveType> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConflict {
    pub lhs: MoveType,
    pub rhs: MoveType,
    pub context: String,
}

impl std::fmt::Display for TypeConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mixed signedness in {}: {} vs {}",
            self.context, self.lhs, self.rhs
        )
    }
}

pub struct TypeInference<'a> {
    env: &'a dyn TypeEnv,
    scopes: Vec<HashMap<String, MoveType>>,
    conflicts: Vec<TypeConflict>,
    return_type: Option<MoveType>,
}

impl<'a> TypeInference<'a> {
    pub fn new(env: &'a dyn TypeEnv) -> Self {
        Self {
            env,
            scopes: vec![HashMap::new()],
            conflicts: Vec::new(),
            return_type: None,
        }
    }

    /// Coerces `return` values and the body result to `ty`.
    pub fn expecting_return(mut self, ty: MoveType) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn conflicts(&self) -> &[TypeConflict] {
        &self.conflicts
    }

    pub fn take_conflicts(&mut self) -> Vec<TypeConflict> {
        std::mem::take(&mut self.conflicts)
    }

    pub fn declare(&mut self, name: &str, ty: MoveType) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn lookup(&self, name: &str) -> Option<MoveType> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name).cloned())
            .or_else(|| self.env.lookup(name))
    }

    pub fn infer_block(&mut self, block: &mut MoveBlock) -> Option<MoveType> {
        self.scopes.push(HashMap::new());
        for stmt in &mut block.stmts {
            self.infer_stmt(stmt);
        }
        let result = block.result.as_mut().and_then(|r| self.infer(r));
        self.scopes.pop();
        result
    }

    /// Infers a function body, coercing its trailing result to the expected return type.
    pub fn infer_body(&mut self, block: &mut MoveBlock) {
        self.scopes.push(HashMap::new());
        for stmt in &mut block.stmts {
            self.infer_stmt(stmt);
        }
        if let Some(result) = block.result.as_mut() {
            match self.return_type.clone() {
                Some(t) => self.coerce(result, &t),
                None => {
                    self.infer(result);
                }
            }
        }
        self.scopes.pop();
    }

    pub fn infer_stmt(&mut self, stmt: &mut MoveStmt) {
        match stmt {
            MoveStmt::Let { pattern, ty, value } => {
                let value_ty = match (value.as_mut(), ty.as_ref()) {
                    (Some(v), Some(t)) => {
                        self.coerce(v, t);
                        Some(t.clone())
                    }
                    (Some(v), None) => self.infer(v),
                    (None, t) => t.cloned(),
                };
                match (pattern.len(), value_ty) {
                    (1, Some(t)) => self.declare(&pattern[0].clone(), t),
                    (n, Some(MoveType::Tuple(items))) if n == items.len() => {
                        let names = pattern.clone();
                        for (name, t) in names.iter().zip(items) {
                            self.declare(name, t);
                        }
                    }
                    _ => {}
                }
            }
            MoveStmt::Assign { target, value } => {
                match self.infer(target) {
                    Some(t) => self.coerce(value, t.dereferenced()),
                    None => {
                        self.infer(value);
                    }
                }
            }
            MoveStmt::Expr(e) | MoveStmt::Abort(e) => {
                self.infer(e);
            }
            MoveStmt::Return(Some(e)) => match self.return_type.clone() {
                Some(t) => self.coerce(e, &t),
                None => {
                    self.infer(e);
                }
            },
            MoveStmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.infer(cond);
                self.infer_block(then);
                if let Some(o) = otherwise {
                    self.infer_block(o);
                }
            }
            MoveStmt::While { cond, body } => {
                self.infer(cond);
                self.infer_block(body);
            }
            MoveStmt::Loop(body) | MoveStmt::Block(body) => {
                self.infer_block(body);
            }
            MoveStmt::Assert { cond, code } => {
                self.infer(cond);
                self.coerce(code, &MoveType::u64());
            }
            _ => {}
        }
    }

    /// Annotates `expr` and its children; returns the resolved type.
    pub fn infer(&mut self, expr: &mut MoveExpr) -> Option<MoveType> {
        let ty = match &mut expr.kind {
            ExprKind::Int { suffix, .. } => match suffix {
                Some(s) => Some(s.clone()),
                None => expr.inferred_type.clone(),
            },
            ExprKind::Bool(_) => Some(MoveType::Bool),
            ExprKind::Address(_) => Some(MoveType::Address),
            ExprKind::Bytes(_) | ExprKind::ByteString(_) => Some(MoveType::bytes()),
            ExprKind::Var(name) => {
                let name = name.clone();
                self.lookup(&name)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                self.infer_binary(op, lhs, rhs)
            }
            ExprKind::Unary { op, operand } => {
                let inner = self.infer(operand);
                match op {
                    MoveUnOp::Not => Some(MoveType::Bool),
                    MoveUnOp::Neg => inner,
                }
            }
            ExprKind::Cast { expr: inner, ty } => {
                let target = ty.clone();
                self.infer(inner);
                Some(target)
            }
            ExprKind::Call {
                module, name, args, ..
            } => {
                let module = module.clone();
                let name = name.clone();
                let params = self.env.call_params(module.as_deref(), &name);
                match params {
                    Some(params) if params.len() == args.len() => {
                        for (arg, p) in args.iter_mut().zip(params.iter()) {
                            self.coerce(arg, p);
                        }
                    }
                    _ => {
                        for arg in args.iter_mut() {
                            self.infer(arg);
                        }
                    }
                }
                self.env
                    .call_return(module.as_deref(), &name)
                    .or_else(|| expr.inferred_type.clone())
            }
            ExprKind::BorrowGlobal {
                mutable,
                resource,
                address,
            } => {
                let ty = MoveType::reference(MoveType::local_struct(resource.clone()), *mutable);
                self.infer(address);
                Some(ty)
            }
            ExprKind::Field { base, field } => {
                let field = field.clone();
                let base_ty = self.infer(base);
                let resolved = match base_ty.as_ref().map(|t| t.dereferenced()) {
                    Some(MoveType::Struct { name, .. }) => self.env.field_type(name, &field),
                    _ => None,
                };
                resolved.or_else(|| expr.inferred_type.clone())
            }
            ExprKind::Borrow { mutable, expr: inner } => {
                let mutable = *mutable;
                self.infer(inner)
                    .map(|t| MoveType::reference(t.dereferenced().clone(), mutable))
            }
            ExprKind::Deref(inner) => self.infer(inner).map(|t| t.dereferenced().clone()),
            ExprKind::Pack { name, fields } => {
                let name = name.clone();
                for (field, value) in fields.iter_mut() {
                    match self.env.field_type(&name, field) {
                        Some(t) => self.coerce(value, &t),
                        None => {
                            self.infer(value);
                        }
                    }
                }
                Some(MoveType::local_struct(name))
            }
            ExprKind::Vector { elem_ty, items } => {
                let declared = elem_ty.clone();
                let mut elem = declared.clone();
                for item in items.iter_mut() {
                    match &elem {
                        Some(t) => {
                            let t = t.clone();
                            self.coerce(item, &t);
                        }
                        None => elem = self.infer(item),
                    }
                }
                elem.map(|t| MoveType::Vector(Box::new(t)))
            }
            ExprKind::Tuple(items) => {
                let types: Vec<Option<MoveType>> =
                    items.iter_mut().map(|i| self.infer(i)).collect();
                types
                    .into_iter()
                    .collect::<Option<Vec<_>>>()
                    .map(MoveType::Tuple)
            }
            ExprKind::IfElse {
                cond,
                then,
                otherwise,
            } => {
                self.infer(cond);
                self.harmonize(then, otherwise, "if/else branches")
            }
            ExprKind::Abort(code) => {
                self.coerce(code, &MoveType::u64());
                None
            }
            ExprKind::Stub { .. } => None,
        };
        if ty.is_some() {
            expr.inferred_type = ty.clone();
        }
        ty
    }

    fn infer_binary(
        &mut self,
        op: MoveBinOp,
        lhs: &mut MoveExpr,
        rhs: &mut MoveExpr,
    ) -> Option<MoveType> {
        if op.is_logical() {
            self.coerce(lhs, &MoveType::Bool);
            self.coerce(rhs, &MoveType::Bool);
            return Some(MoveType::Bool);
        }
        if op.is_shift() {
            let left = self.infer(lhs);
            self.coerce(rhs, &MoveType::u8());
            return left;
        }
        let operand = self.harmonize(lhs, rhs, op.symbol());
        if op.is_comparison() {
            Some(MoveType::Bool)
        } else {
            operand
        }
    }

    /// Brings two operands to a common type, widening the narrower one.
    fn harmonize(
        &mut self,
        lhs: &mut MoveExpr,
        rhs: &mut MoveExpr,
        context: &str,
    ) -> Option<MoveType> {
        let lt = self.infer(lhs);
        let rt = self.infer(rhs);
        match (lt, rt) {
            (Some(l), Some(r)) if l == r => Some(l),
            (Some(l), Some(r)) if l.is_integer() && r.is_integer() => {
                if l.is_signed() != r.is_signed() {
                    self.conflicts.push(TypeConflict {
                        lhs: l.clone(),
                        rhs: r,
                        context: context.to_string(),
                    });
                    return Some(l);
                }
                let lw = l.integer_width().unwrap_or(0);
                let rw = r.integer_width().unwrap_or(0);
                if lw >= rw {
                    self.coerce(rhs, &l);
                    Some(l)
                } else {
                    self.coerce(lhs, &r);
                    Some(r)
                }
            }
            (Some(l), None) => {
                self.coerce(rhs, &l);
                Some(l)
            }
            (None, Some(r)) => {
                self.coerce(lhs, &r);
                Some(r)
            }
            (l, _) => l,
        }
    }

    /// Makes `expr` have type `target`: unresolved literals adopt it, narrower integers of the
    /// same signedness get an explicit cast. Nothing happens when the types already match.
    pub fn coerce(&mut self, expr: &mut MoveExpr, target: &MoveType) {
        if let (ExprKind::Tuple(items), MoveType::Tuple(targets)) = (&mut expr.kind, target) {
            if items.len() == targets.len() {
                for (item, t) in items.iter_mut().zip(targets) {
                    self.coerce(item, t);
                }
                expr.inferred_type = Some(target.clone());
                return;
            }
        }
        let current = self.infer(expr);
        match current {
            Some(ref t) if t == target => {}
            None => self.adopt(expr, target),
            Some(t) => {
                if !(t.is_integer() && target.is_integer()) {
                    return;
                }
                if expr.is_unsuffixed_literal() {
                    expr.inferred_type = Some(target.clone());
                    return;
                }
                if t.is_signed() != target.is_signed() {
                    self.conflicts.push(TypeConflict {
                        lhs: target.clone(),
                        rhs: t,
                        context: "conversion".to_string(),
                    });
                    return;
                }
                let inner = std::mem::replace(expr, MoveExpr::bool(false));
                *expr = MoveExpr::cast(inner, target.clone());
            }
        }
    }

    /// Pushes a contextual type into nodes that had none.
    fn adopt(&mut self, expr: &mut MoveExpr, target: &MoveType) {
        match &mut expr.kind {
            ExprKind::Int { .. } if target.is_integer() => {
                expr.inferred_type = Some(target.clone());
            }
            ExprKind::IfElse {
                then, otherwise, ..
            } => {
                self.coerce(then, target);
                self.coerce(otherwise, target);
                expr.inferred_type = Some(target.clone());
            }
            ExprKind::Binary { op, lhs, rhs } if !op.is_comparison() && !op.is_logical() => {
                let shift = op.is_shift();
                self.coerce(lhs, target);
                if !shift {
                    self.coerce(rhs, target);
                }
                expr.inferred_type = Some(target.clone());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Locals(HashMap<String, MoveType>);

    impl TypeEnv for Locals {
        fn lookup(&self, name: &str) -> Option<MoveType> {
            self.0.get(name).cloned()
        }

        fn field_type(&self, _struct_name: &str, _field: &str) -> Option<MoveType> {
            None
        }

        fn call_return(&self, _module: Option<&str>, _name: &str) -> Option<MoveType> {
            None
        }
    }

    fn env() -> Locals {
        let mut m = HashMap::new();
        m.insert("a".to_string(), MoveType::u64());
        m.insert("b".to_string(), MoveType::u128());
        m.insert("s".to_string(), MoveType::Int(64));
        Locals(m)
    }

    #[test]
    fn test_widening_inserts_single_cast() {
        let env = env();
        let mut expr = MoveExpr::binary(MoveBinOp::Add, MoveExpr::var("a"), MoveExpr::var("b"));
        let mut inference = TypeInference::new(&env);
        assert_eq!(inference.infer(&mut expr), Some(MoveType::u128()));
        match &expr.kind {
            ExprKind::Binary { lhs, .. } => {
                assert!(matches!(lhs.kind, ExprKind::Cast { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_inference_is_idempotent() {
        let env = env();
        let mut expr = MoveExpr::binary(
            MoveBinOp::Lt,
            MoveExpr::binary(MoveBinOp::Add, MoveExpr::var("a"), MoveExpr::int(1u32)),
            MoveExpr::var("b"),
        );
        TypeInference::new(&env).infer(&mut expr);
        let once = expr.clone();
        TypeInference::new(&env).infer(&mut expr);
        assert_eq!(expr, once);
    }

    #[test]
    fn test_literal_adopts_context() {
        let env = env();
        let mut expr = MoveExpr::binary(MoveBinOp::Add, MoveExpr::int(5u32), MoveExpr::var("a"));
        TypeInference::new(&env).infer(&mut expr);
        match &expr.kind {
            ExprKind::Binary { lhs, .. } => assert_eq!(lhs.inferred_type, Some(MoveType::u64())),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mixed_signedness_is_reported_not_cast() {
        let env = env();
        let mut expr = MoveExpr::binary(MoveBinOp::Add, MoveExpr::var("s"), MoveExpr::var("a"));
        let mut inference = TypeInference::new(&env);
        inference.infer(&mut expr);
        assert_eq!(inference.conflicts().len(), 1);
        match &expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                assert!(matches!(lhs.kind, ExprKind::Var(_)));
                assert!(matches!(rhs.kind, ExprKind::Var(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shift_count_is_u8() {
        let env = env();
        let mut expr = MoveExpr::binary(MoveBinOp::Shl, MoveExpr::var("b"), MoveExpr::var("a"));
        let ty = TypeInference::new(&env).infer(&mut expr);
        assert_eq!(ty, Some(MoveType::u128()));
        match &expr.kind {
            ExprKind::Binary { rhs, .. } => assert!(matches!(
                &rhs.kind,
                ExprKind::Cast { ty, .. } if *ty == MoveType::u8()
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comparison_yields_bool() {
        let env = env();
        let mut expr = MoveExpr::binary(MoveBinOp::Eq, MoveExpr::var("a"), MoveExpr::int(0u32));
        assert_eq!(TypeInference::new(&env).infer(&mut expr), Some(MoveType::Bool));
    }
}
