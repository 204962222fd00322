//! Reads and writes of storage paths: state variables, mapping entries, array elements and
//! struct fields, in whatever resource the plan put them.
//!
//! A read walks the path outward from its root and collects a `table::contains` guard for every
//! mapping step, so a missing entry yields the Solidity zero value instead of aborting. A write
//! resolves the path to a [`Loc`] that can be assigned directly or through a mutable reference.

use super::context::{call_kind, TranspileContext};
use super::helpers::Helper;
use crate::errors::{Result, TranspileError};
use solmove_core::ir::{IRType, IRTypeKind};
use solmove_core::move_ast::{ExprKind, MoveBinOp, MoveExpr, MoveStmt};
use solmove_core::naming::move_identifier;
use solmove_core::source::{BinaryOp, Expr};
use solmove_core::types::MoveType;
use solmove_core::VarRepr;

/// A resolved rvalue path.
#[derive(Debug, Clone)]
pub(crate) struct Access {
    /// A place expression (`g.total`, `local.f`) or, when `is_ref`, an expression of type `&T`.
    pub expr: MoveExpr,
    pub is_ref: bool,
    pub ty: IRType,
    /// Conditions under which the path exists.
    pub guards: Vec<MoveExpr>,
}

impl Access {
    fn reference(&self) -> MoveExpr {
        if self.is_ref {
            self.expr.clone()
        } else {
            MoveExpr::borrow(self.expr.clone(), false)
        }
    }

    fn value(&self, target: MoveType) -> MoveExpr {
        let mut value = if self.is_ref {
            MoveExpr::deref(self.expr.clone())
        } else {
            self.expr.clone()
        };
        if value.inferred_type.is_none() {
            value.inferred_type = Some(target);
        }
        value
    }
}

/// A resolved lvalue.
#[derive(Debug, Clone)]
pub(crate) enum Loc {
    /// Assignable directly: `g.total = v`.
    Path(MoveExpr),
    /// An expression of type `&mut T`: `*r = v`.
    Ref(MoveExpr),
}

impl Loc {
    pub fn mut_ref(&self) -> MoveExpr {
        match self {
            Loc::Path(p) => MoveExpr::borrow(p.clone(), true),
            Loc::Ref(r) => r.clone(),
        }
    }

    fn field(&self, name: &str) -> Loc {
        match self {
            Loc::Path(p) | Loc::Ref(p) => Loc::Path(MoveExpr::field(p.clone(), name)),
        }
    }

    fn store(&self, value: MoveExpr) -> MoveStmt {
        match self {
            Loc::Path(p) => MoveStmt::assign(p.clone(), value),
            Loc::Ref(r) => MoveStmt::assign(MoveExpr::deref(r.clone()), value),
        }
    }
}

pub(crate) fn platform_call(module: &str, name: &str, args: Vec<MoveExpr>, ty: MoveType) -> MoveExpr {
    MoveExpr::typed(call_kind(module, name, args), ty)
}

fn u64_index(index: MoveExpr) -> MoveExpr {
    MoveExpr::cast(index, MoveType::u64())
}

fn is_simple(expr: &MoveExpr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Var(_)
            | ExprKind::Int { .. }
            | ExprKind::Bool(_)
            | ExprKind::Address(_)
            | ExprKind::ByteString(_)
            | ExprKind::Bytes(_)
    )
}

impl<'c, 'a> TranspileContext<'c, 'a> {
    /// Evaluates `key` once, hoisting it into a local when it is not trivially repeatable.
    pub(crate) fn stable(&mut self, key: MoveExpr) -> MoveExpr {
        if is_simple(&key) {
            return key;
        }
        let name = self.fresh("k");
        let ty = key.inferred_type.clone();
        self.hoist(MoveStmt::let_(name.clone(), ty.clone(), key));
        let mut var = MoveExpr::var(name);
        var.inferred_type = ty;
        var
    }

    pub(crate) fn is_state_root(&self, name: &str) -> bool {
        self.local(name).is_none() && self.info.state_var(name).is_some()
    }

    /// Resolves an rvalue path. `None` when `expr` is not a path.
    pub(crate) fn access(&mut self, expr: &Expr) -> Result<Option<Access>> {
        match expr {
            Expr::Ident(name) => {
                if let Some(path) = self.storage_alias(name) {
                    return self.access(&path);
                }
                if let Some(local) = self.local(name) {
                    let ty = match local.ty.clone() {
                        Some(ty) => ty,
                        None => return Ok(None),
                    };
                    let move_name = local.move_name.clone();
                    let target = self.info.move_type(&ty);
                    return Ok(Some(Access {
                        expr: MoveExpr::typed(ExprKind::Var(move_name), target),
                        is_ref: false,
                        ty,
                        guards: Vec::new(),
                    }));
                }
                let Some(var) = self.info.state_var(name) else {
                    return Ok(None);
                };
                let ty = var.ty.clone();
                let target = self.info.move_type(&ty);
                match self.info.plan.repr_of(name).clone() {
                    VarRepr::Field => {
                        let group = self.group_ref(name)?;
                        let mut path = MoveExpr::field(group, move_identifier(name));
                        path.inferred_type = Some(target);
                        Ok(Some(Access {
                            expr: path,
                            is_ref: false,
                            ty,
                            guards: Vec::new(),
                        }))
                    }
                    VarRepr::Aggregator { .. } => {
                        let group = self.group_ref(name)?;
                        let field = MoveExpr::field(group, move_identifier(name));
                        let read = MoveExpr::call(
                            Some("aggregator_v2"),
                            "read",
                            vec![MoveExpr::borrow(field, false)],
                        );
                        Ok(Some(Access {
                            expr: MoveExpr::cast(read, target),
                            is_ref: false,
                            ty,
                            guards: Vec::new(),
                        }))
                    }
                    VarRepr::Distributed { .. } => Err(TranspileError::UnsupportedFeature(format!(
                        "{} is stored per caller and cannot be read as a whole in {}",
                        name, self.function
                    ))),
                }
            }
            Expr::Index {
                base,
                index: Some(index),
            } => {
                if let Some(root) = self.distributed_root(base) {
                    let key = self.expr(index)?;
                    let value_ty = self.mapping_value_of(&root)?;
                    let target = self.info.move_type(&value_ty);
                    let helper = self.parts.helpers.request(Helper::StoreOf {
                        variable: root.clone(),
                    });
                    let call = MoveExpr::typed(
                        ExprKind::Call {
                            module: None,
                            name: helper,
                            type_args: Vec::new(),
                            args: vec![key],
                        },
                        target,
                    );
                    return Ok(Some(Access {
                        expr: call,
                        is_ref: false,
                        ty: value_ty,
                        guards: Vec::new(),
                    }));
                }
                let Some(base) = self.access(base)? else {
                    return Ok(None);
                };
                let base = self.materialize(base);
                match base.ty.kind.clone() {
                    IRTypeKind::Mapping { value, .. } => {
                        let key = self.expr(index)?;
                        let key = self.stable(key);
                        let table = base.reference();
                        let mut guards = base.guards.clone();
                        guards.push(platform_call(
                            "table",
                            "contains",
                            vec![table.clone(), key.clone()],
                            MoveType::Bool,
                        ));
                        let target = self.info.move_type(&value);
                        Ok(Some(Access {
                            expr: platform_call(
                                "table",
                                "borrow",
                                vec![table, key],
                                MoveType::reference(target, false),
                            ),
                            is_ref: true,
                            ty: (*value).clone(),
                            guards,
                        }))
                    }
                    IRTypeKind::Array { element, .. } => {
                        let index = self.expr(index)?;
                        let target = self.info.move_type(&element);
                        Ok(Some(Access {
                            expr: platform_call(
                                "vector",
                                "borrow",
                                vec![base.reference(), u64_index(index)],
                                MoveType::reference(target, false),
                            ),
                            is_ref: true,
                            ty: (*element).clone(),
                            guards: base.guards,
                        }))
                    }
                    IRTypeKind::Bytes { .. } | IRTypeKind::String => {
                        let index = self.expr(index)?;
                        Ok(Some(Access {
                            expr: platform_call(
                                "vector",
                                "borrow",
                                vec![base.reference(), u64_index(index)],
                                MoveType::reference(MoveType::u8(), false),
                            ),
                            is_ref: true,
                            ty: IRType::uint(8),
                            guards: base.guards,
                        }))
                    }
                    _ => Ok(None),
                }
            }
            Expr::Member { object, member } => {
                if let Expr::Ident(owner) = object.as_ref() {
                    if self.local(owner).is_none() && self.info.state_var(owner).is_none() {
                        return Ok(None);
                    }
                }
                let Some(base) = self.access(object)? else {
                    return Ok(None);
                };
                let IRTypeKind::Struct(name) = base.ty.kind.clone() else {
                    return Ok(None);
                };
                let Some(field_ty) = self
                    .info
                    .contract
                    .struct_def(&name)
                    .and_then(|def| def.fields.iter().find(|f| &f.name == member))
                    .map(|f| f.ty.clone())
                else {
                    return Err(TranspileError::SymbolNotFound(format!("{}.{}", name, member)));
                };
                let base = self.materialize(base);
                let target = self.info.move_type(&field_ty);
                let mut path = MoveExpr::field(base.expr, move_identifier(member));
                path.inferred_type = Some(target);
                Ok(Some(Access {
                    expr: path,
                    is_ref: false,
                    ty: field_ty,
                    guards: base.guards,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Field and index steps need a place; a call result is bound to a local first.
    fn materialize(&mut self, access: Access) -> Access {
        if access.is_ref
            || matches!(access.expr.kind, ExprKind::Var(_) | ExprKind::Field { .. })
        {
            return access;
        }
        let name = self.fresh("v");
        let target = self.info.move_type(&access.ty);
        self.hoist(MoveStmt::let_(name.clone(), Some(target.clone()), access.expr));
        Access {
            expr: MoveExpr::typed(ExprKind::Var(name), target),
            is_ref: false,
            ty: access.ty,
            guards: access.guards,
        }
    }

    /// Reads a path as a value, substituting the zero value behind missing mapping entries.
    pub(crate) fn read_path(&mut self, expr: &Expr) -> Result<Option<MoveExpr>> {
        let Some(access) = self.access(expr)? else {
            return Ok(None);
        };
        let target = self.info.move_type(&access.ty);
        let value = access.value(target.clone());
        Ok(Some(self.guarded(access.guards, value, &access.ty)))
    }

    fn guarded(&mut self, guards: Vec<MoveExpr>, value: MoveExpr, ty: &IRType) -> MoveExpr {
        let Some(cond) = guards
            .into_iter()
            .reduce(|a, b| MoveExpr::binary(MoveBinOp::And, a, b))
        else {
            return value;
        };
        let target = self.info.move_type(ty);
        let mut read = MoveExpr::if_else(cond, value, self.info.default_value(ty));
        read.inferred_type = Some(target);
        read
    }

    /// `x.length` for arrays, bytes and strings held anywhere.
    pub(crate) fn length_of(&mut self, object: &Expr) -> Result<Option<MoveExpr>> {
        let Some(access) = self.access(object)? else {
            return Ok(None);
        };
        let (module, name) = match (&access.ty.kind, self.info.move_type(&access.ty)) {
            (_, MoveType::String) => ("string", "length"),
            (IRTypeKind::Array { .. }, _) | (IRTypeKind::Bytes { .. }, _) => ("vector", "length"),
            (IRTypeKind::String, _) => ("vector", "length"),
            _ => return Ok(None),
        };
        let length = platform_call(module, name, vec![access.reference()], MoveType::u64());
        let length = MoveExpr::cast(length, MoveType::u256());
        Ok(Some(self.guarded(access.guards, length, &IRType::uint(256))))
    }

    pub(crate) fn distributed_root(&self, expr: &Expr) -> Option<String> {
        let Expr::Ident(name) = expr else {
            return None;
        };
        if !self.is_state_root(name) {
            return None;
        }
        matches!(self.info.plan.repr_of(name), VarRepr::Distributed { .. }).then(|| name.clone())
    }

    fn mapping_value_of(&self, variable: &str) -> Result<IRType> {
        self.info
            .state_var(variable)
            .and_then(|v| v.ty.mapping_value().cloned())
            .ok_or_else(|| TranspileError::Plan(format!("{} is not a mapping", variable)))
    }

    /// Resolves an lvalue path; per-caller entries are copied into a local and written back
    /// after the statement.
    pub(crate) fn place(&mut self, expr: &Expr) -> Result<(Loc, IRType)> {
        match expr {
            Expr::Ident(name) => {
                if let Some(path) = self.storage_alias(name) {
                    return self.place(&path);
                }
                if let Some(local) = self.local(name) {
                    let ty = local.ty.clone().ok_or_else(|| {
                        TranspileError::TypeMapping(format!("type of local {} is unknown", name))
                    })?;
                    let mut path = MoveExpr::var(local.move_name.clone());
                    path.inferred_type = Some(self.info.move_type(&ty));
                    return Ok((Loc::Path(path), ty));
                }
                let Some(var) = self.info.state_var(name) else {
                    return Err(TranspileError::SymbolNotFound(name.clone()));
                };
                let ty = var.ty.clone();
                match self.info.plan.repr_of(name) {
                    VarRepr::Field => {
                        let group = self.group_ref(name)?;
                        let mut path = MoveExpr::field(group, move_identifier(name));
                        path.inferred_type = Some(self.info.move_type(&ty));
                        Ok((Loc::Path(path), ty))
                    }
                    _ => Err(TranspileError::Plan(format!(
                        "{} cannot be updated in place in {}",
                        name, self.function
                    ))),
                }
            }
            Expr::Index {
                base,
                index: Some(index),
            } => {
                if let Some(root) = self.distributed_root(base) {
                    return self.distributed_place(&root, index);
                }
                let (base_loc, base_ty) = self.place(base)?;
                match base_ty.kind.clone() {
                    IRTypeKind::Mapping { value, .. } => {
                        let key = self.expr(index)?;
                        let key = self.stable(key);
                        let table = base_loc.mut_ref();
                        let target = self.info.move_type(&value);
                        if value.is_mapping() {
                            // nested tables are created on first touch
                            let missing = MoveExpr::not(platform_call(
                                "table",
                                "contains",
                                vec![table.clone(), key.clone()],
                                MoveType::Bool,
                            ));
                            let create = platform_call(
                                "table",
                                "add",
                                vec![
                                    table.clone(),
                                    key.clone(),
                                    platform_call("table", "new", Vec::new(), target.clone()),
                                ],
                                MoveType::Unit,
                            );
                            self.hoist(MoveStmt::If {
                                cond: missing,
                                then: solmove_core::move_ast::MoveBlock::new(vec![MoveStmt::Expr(
                                    create,
                                )]),
                                otherwise: None,
                            });
                            let entry = platform_call(
                                "table",
                                "borrow_mut",
                                vec![table, key],
                                MoveType::reference(target, true),
                            );
                            return Ok((Loc::Ref(entry), (*value).clone()));
                        }
                        let default = self.info.default_value(&value);
                        let entry = platform_call(
                            "table",
                            "borrow_mut_with_default",
                            vec![table, key, default],
                            MoveType::reference(target, true),
                        );
                        Ok((Loc::Ref(entry), (*value).clone()))
                    }
                    IRTypeKind::Array { element, .. } => {
                        let index = self.expr(index)?;
                        let target = self.info.move_type(&element);
                        let entry = platform_call(
                            "vector",
                            "borrow_mut",
                            vec![base_loc.mut_ref(), u64_index(index)],
                            MoveType::reference(target, true),
                        );
                        Ok((Loc::Ref(entry), (*element).clone()))
                    }
                    IRTypeKind::Bytes { .. } => {
                        let index = self.expr(index)?;
                        let entry = platform_call(
                            "vector",
                            "borrow_mut",
                            vec![base_loc.mut_ref(), u64_index(index)],
                            MoveType::reference(MoveType::u8(), true),
                        );
                        Ok((Loc::Ref(entry), IRType::uint(8)))
                    }
                    _ => Err(TranspileError::UnsupportedFeature(format!(
                        "index assignment into {} in {}",
                        base_ty.source_name, self.function
                    ))),
                }
            }
            Expr::Member { object, member } => {
                let (base_loc, base_ty) = self.place(object)?;
                let IRTypeKind::Struct(name) = &base_ty.kind else {
                    return Err(TranspileError::UnsupportedFeature(format!(
                        "assignment to .{} of {} in {}",
                        member, base_ty.source_name, self.function
                    )));
                };
                let field_ty = self
                    .info
                    .contract
                    .struct_def(name)
                    .and_then(|def| def.fields.iter().find(|f| &f.name == member))
                    .map(|f| f.ty.clone())
                    .ok_or_else(|| TranspileError::SymbolNotFound(format!("{}.{}", name, member)))?;
                Ok((base_loc.field(&move_identifier(member)), field_ty))
            }
            Expr::Tuple(items) if items.len() == 1 => match &items[0] {
                Some(inner) => self.place(inner),
                None => Err(TranspileError::UnsupportedFeature("empty assignment target".to_string())),
            },
            other => Err(TranspileError::UnsupportedFeature(format!(
                "assignment to {:?} in {}",
                std::mem::discriminant(other),
                self.function
            ))),
        }
    }

    fn distributed_place(&mut self, root: &str, index: &Expr) -> Result<(Loc, IRType)> {
        let value_ty = self.mapping_value_of(root)?;
        let key = self.expr(index)?;
        if !index.is_msg_sender() {
            self.warn(format!(
                "{} is stored per caller; the write in {} goes to the caller's entry",
                root, self.function
            ));
        }
        let Some(signer) = self.signer() else {
            let stub = self.unsupported(&format!("write to per-caller {} without a signer", root))?;
            let name = self.fresh("d");
            let target = self.info.move_type(&value_ty);
            self.hoist(MoveStmt::let_(name.clone(), Some(target), stub));
            return Ok((Loc::Path(MoveExpr::var(name)), value_ty));
        };
        let target = self.info.move_type(&value_ty);
        let reader = self.parts.helpers.request(Helper::StoreOf {
            variable: root.to_string(),
        });
        let writer = self.parts.helpers.request(Helper::StoreSet {
            variable: root.to_string(),
        });
        let name = self.fresh("d");
        let current = MoveExpr::typed(
            ExprKind::Call {
                module: None,
                name: reader,
                type_args: Vec::new(),
                args: vec![key],
            },
            target.clone(),
        );
        self.hoist(MoveStmt::let_(name.clone(), Some(target.clone()), current));
        self.defer(MoveStmt::Expr(MoveExpr::call(
            None,
            &writer,
            vec![signer, MoveExpr::var(name.clone())],
        )));
        Ok((
            Loc::Path(MoveExpr::typed(ExprKind::Var(name), target)),
            value_ty,
        ))
    }

    /// Lowers `target op= value` (or plain `=` when `op` is `None`) into statements.
    pub(crate) fn assign(
        &mut self,
        target: &Expr,
        op: Option<BinaryOp>,
        value: &Expr,
    ) -> Result<Vec<MoveStmt>> {
        let value = self.expr(value)?;
        self.assign_lowered(target, op, value)
    }

    pub(crate) fn assign_lowered(
        &mut self,
        target: &Expr,
        op: Option<BinaryOp>,
        value: MoveExpr,
    ) -> Result<Vec<MoveStmt>> {
        if let Expr::Ident(name) = target {
            if self.is_state_root(name) {
                if let VarRepr::Aggregator { element } = self.info.plan.repr_of(name).clone() {
                    return self.aggregator_update(name, op, value, element);
                }
            }
        }
        if let Expr::Index {
            base,
            index: Some(index),
        } = target
        {
            if let (Some(root), None) = (self.distributed_root(base), op) {
                if let Some(signer) = self.signer() {
                    self.key_for_write(root.as_str(), index)?;
                    let writer = self.parts.helpers.request(Helper::StoreSet { variable: root });
                    return Ok(vec![MoveStmt::Expr(MoveExpr::call(
                        None,
                        &writer,
                        vec![signer, value],
                    ))]);
                }
            }
            if op.is_none() && self.is_table_leaf(base)? {
                let (loc, _) = self.place(base)?;
                let key = self.expr(index)?;
                let value = self.unshare(value);
                return Ok(vec![MoveStmt::Expr(platform_call(
                    "table",
                    "upsert",
                    vec![loc.mut_ref(), key, value],
                    MoveType::Unit,
                ))]);
            }
        }

        let (loc, _) = self.place(target)?;
        match op {
            None => Ok(vec![loc.store(value)]),
            Some(op) => {
                let op = super::expression::binary_op(op).ok_or_else(|| {
                    TranspileError::UnsupportedFeature(format!("compound {:?} assignment", op))
                })?;
                match loc {
                    Loc::Path(path) => Ok(vec![MoveStmt::assign(
                        path.clone(),
                        MoveExpr::binary(op, path, value),
                    )]),
                    Loc::Ref(reference) => {
                        let slot = self.fresh("slot");
                        let slot_var = MoveExpr::var(slot.clone());
                        Ok(vec![
                            MoveStmt::let_(slot, None, reference),
                            MoveStmt::assign(
                                MoveExpr::deref(slot_var.clone()),
                                MoveExpr::binary(op, MoveExpr::deref(slot_var), value),
                            ),
                        ])
                    }
                }
            }
        }
    }

    fn key_for_write(&mut self, root: &str, index: &Expr) -> Result<()> {
        if !index.is_msg_sender() {
            self.warn(format!(
                "{} is stored per caller; the write in {} goes to the caller's entry",
                root, self.function
            ));
        }
        Ok(())
    }

    /// Whether `base` is a mapping whose values are not themselves mappings.
    fn is_table_leaf(&self, base: &Expr) -> Result<bool> {
        let ty = self.ir_type_of(base);
        Ok(matches!(
            ty.as_ref().map(|t| &t.kind),
            Some(IRTypeKind::Mapping { value, .. }) if !value.is_mapping()
        ))
    }

    /// A value that reads resource fields is bound first so no field is borrowed twice.
    fn unshare(&mut self, value: MoveExpr) -> MoveExpr {
        let mut touches_storage = false;
        value.walk(&mut |e| {
            if matches!(e.kind, ExprKind::Field { .. } | ExprKind::Call { .. }) {
                touches_storage = true;
            }
        });
        if !touches_storage {
            return value;
        }
        let name = self.fresh("v");
        let ty = value.inferred_type.clone();
        self.hoist(MoveStmt::let_(name.clone(), ty.clone(), value));
        let mut var = MoveExpr::var(name);
        var.inferred_type = ty;
        var
    }

    fn aggregator_update(
        &mut self,
        name: &str,
        op: Option<BinaryOp>,
        value: MoveExpr,
        element: MoveType,
    ) -> Result<Vec<MoveStmt>> {
        let group = self.group_ref(name)?;
        let field = MoveExpr::field(group, move_identifier(name));
        let handle = MoveExpr::borrow(field.clone(), true);
        let amount = MoveExpr::cast(value, element.clone());
        let call = |f: &str, args: Vec<MoveExpr>| {
            MoveStmt::Expr(platform_call("aggregator_v2", f, args, MoveType::Unit))
        };
        match op {
            Some(BinaryOp::Add) => Ok(vec![call("add", vec![handle, amount])]),
            Some(BinaryOp::Sub) => Ok(vec![call("sub", vec![handle, amount])]),
            other => {
                let current = platform_call(
                    "aggregator_v2",
                    "read",
                    vec![MoveExpr::borrow(field.clone(), false)],
                    element.clone(),
                );
                let next = match other {
                    None => amount,
                    Some(op) => {
                        let op = super::expression::binary_op(op).ok_or_else(|| {
                            TranspileError::UnsupportedFeature(format!("compound {:?} assignment", op))
                        })?;
                        MoveExpr::binary(op, current.clone(), amount)
                    }
                };
                let old = self.fresh("cur");
                let new = self.fresh("next");
                Ok(vec![
                    MoveStmt::let_(new.clone(), Some(element.clone()), next),
                    MoveStmt::let_(old.clone(), Some(element), current),
                    call("sub", vec![handle.clone(), MoveExpr::var(old)]),
                    call("add", vec![handle, MoveExpr::var(new)]),
                ])
            }
        }
    }

    /// `arr.push(v)`, `arr.push()` and `arr.pop()` on any array path.
    pub(crate) fn array_update(&mut self, object: &Expr, member: &str, args: &[Expr]) -> Result<MoveExpr> {
        let (loc, ty) = self.place(object)?;
        let element = match &ty.kind {
            IRTypeKind::Array { element, .. } => (**element).clone(),
            IRTypeKind::Bytes { .. } => IRType::uint(8),
            _ => {
                return Err(TranspileError::UnsupportedFeature(format!(
                    "{} on {} in {}",
                    member, ty.source_name, self.function
                )))
            }
        };
        let target = self.info.move_type(&element);
        match member {
            "push" => {
                let value = match args.first() {
                    Some(arg) => self.expr(arg)?,
                    None => self.info.default_value(&element),
                };
                Ok(platform_call(
                    "vector",
                    "push_back",
                    vec![loc.mut_ref(), value],
                    MoveType::Unit,
                ))
            }
            _ => Ok(platform_call("vector", "pop_back", vec![loc.mut_ref()], target)),
        }
    }

    /// `delete x`: resets the path to its zero value.
    pub(crate) fn delete(&mut self, target: &Expr) -> Result<Vec<MoveStmt>> {
        if let Expr::Index {
            base,
            index: Some(index),
        } = target
        {
            if self.is_table_leaf(base)? && self.distributed_root(base).is_none() {
                let (loc, _) = self.place(base)?;
                let key = self.expr(index)?;
                let key = self.stable(key);
                let table = loc.mut_ref();
                let contains = platform_call(
                    "table",
                    "contains",
                    vec![table.clone(), key.clone()],
                    MoveType::Bool,
                );
                let remove = platform_call("table", "remove", vec![table, key], MoveType::Unit);
                return Ok(vec![MoveStmt::If {
                    cond: contains,
                    then: solmove_core::move_ast::MoveBlock::new(vec![MoveStmt::Expr(remove)]),
                    otherwise: None,
                }]);
            }
        }
        let ty = self.ir_type_of(target).ok_or_else(|| {
            TranspileError::TypeMapping(format!("cannot resolve the type deleted in {}", self.function))
        })?;
        if ty.is_mapping() {
            return Err(TranspileError::UnsupportedFeature(format!(
                "delete of a whole mapping in {}",
                self.function
            )));
        }
        let zero = self.info.default_value(&ty);
        self.assign_lowered(target, None, zero)
    }
}
