//! Target-side AST mirroring the surface syntax of an Aptos Move module. The emitter prints it
//! verbatim; every semantic decision has been made by the time a tree of these nodes exists.

use crate::types::MoveType;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveModule {
    pub address: String,
    pub name: String,
    pub doc: Vec<String>,
    pub uses: Vec<UseDecl>,
    pub constants: Vec<MoveConstant>,
    pub structs: Vec<MoveStruct>,
    pub functions: Vec<MoveFunction>,
}

impl MoveModule {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            doc: Vec::new(),
            uses: Vec::new(),
            constants: Vec::new(),
            structs: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&MoveFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&MoveStruct> {
        self.structs.iter().find(|s| s.name == name)
    }
}

/// `use std::signer;` when `members` is empty, `use aptos_std::table::{Self, Table};` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UseDecl {
    pub path: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveConstant {
    pub name: String,
    pub ty: MoveType,
    pub value: MoveExpr,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    Copy,
    Drop,
    Store,
    Key,
}

impl Ability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ability::Copy => "copy",
            Ability::Drop => "drop",
            Ability::Store => "store",
            Ability::Key => "key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveField {
    pub name: String,
    pub ty: MoveType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveStruct {
    pub name: String,
    pub abilities: Vec<Ability>,
    pub fields: Vec<MoveField>,
    /// Attributes printed as `#[name]` above the declaration.
    pub attributes: Vec<String>,
    pub doc: Option<String>,
}

impl MoveStruct {
    pub fn is_resource(&self) -> bool {
        self.abilities.contains(&Ability::Key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunVisibility {
    Private,
    Public,
    Friend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveParam {
    pub name: String,
    pub ty: MoveType,
}

impl MoveParam {
    pub fn new(name: impl Into<String>, ty: MoveType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveFunction {
    pub name: String,
    pub visibility: FunVisibility,
    pub is_entry: bool,
    pub is_inline: bool,
    pub attributes: Vec<String>,
    pub params: Vec<MoveParam>,
    pub returns: Vec<MoveType>,
    pub acquires: Vec<String>,
    pub body: MoveBlock,
    pub doc: Vec<String>,
}

impl MoveFunction {
    pub fn new(name: impl Into<String>, visibility: FunVisibility) -> Self {
        Self {
            name: name.into(),
            visibility,
            is_entry: false,
            is_inline: false,
            attributes: Vec::new(),
            params: Vec::new(),
            returns: Vec::new(),
            acquires: Vec::new(),
            body: MoveBlock::default(),
            doc: Vec::new(),
        }
    }

    pub fn is_view(&self) -> bool {
        self.attributes.iter().any(|a| a == "view")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveBlock {
    pub stmts: Vec<MoveStmt>,
    /// Trailing expression without a semicolon.
    pub result: Option<Box<MoveExpr>>,
}

impl MoveBlock {
    pub fn new(stmts: Vec<MoveStmt>) -> Self {
        Self {
            stmts,
            result: None,
        }
    }

    pub fn with_result(stmts: Vec<MoveStmt>, result: MoveExpr) -> Self {
        Self {
            stmts,
            result: Some(Box::new(result)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty() && self.result.is_none()
    }

    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a MoveExpr)) {
        for stmt in &self.stmts {
            stmt.walk_exprs(f);
        }
        if let Some(result) = &self.result {
            result.walk(f);
        }
    }

    pub fn walk_exprs_mut(&mut self, f: &mut dyn FnMut(&mut MoveExpr)) {
        for stmt in &mut self.stmts {
            stmt.walk_exprs_mut(f);
        }
        if let Some(result) = &mut self.result {
            result.walk_mut(f);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveStmt {
    /// `let a: T = v;` or `let (a, b) = v;`
    Let {
        pattern: Vec<String>,
        ty: Option<MoveType>,
        value: Option<MoveExpr>,
    },
    Assign {
        target: MoveExpr,
        value: MoveExpr,
    },
    Expr(MoveExpr),
    If {
        cond: MoveExpr,
        then: MoveBlock,
        otherwise: Option<MoveBlock>,
    },
    While {
        cond: MoveExpr,
        body: MoveBlock,
    },
    Loop(MoveBlock),
    Return(Option<MoveExpr>),
    Abort(MoveExpr),
    Assert {
        cond: MoveExpr,
        code: MoveExpr,
    },
    Break,
    Continue,
    Comment(String),
    Block(MoveBlock),
}

impl MoveStmt {
    pub fn let_(name: impl Into<String>, ty: Option<MoveType>, value: MoveExpr) -> Self {
        MoveStmt::Let {
            pattern: vec![name.into()],
            ty,
            value: Some(value),
        }
    }

    pub fn assign(target: MoveExpr, value: MoveExpr) -> Self {
        MoveStmt::Assign { target, value }
    }

    /// `true` when control never falls through this statement.
    pub fn diverges(&self) -> bool {
        match self {
            MoveStmt::Return(_) | MoveStmt::Abort(_) => true,
            MoveStmt::Expr(e) => matches!(e.kind, ExprKind::Abort(_) | ExprKind::Stub { .. }),
            MoveStmt::If {
                then,
                otherwise: Some(otherwise),
                ..
            } => then.diverges() && otherwise.diverges(),
            MoveStmt::Block(b) => b.diverges(),
            _ => false,
        }
    }

    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a MoveExpr)) {
        match self {
            MoveStmt::Let { value, .. } => {
                if let Some(v) = value {
                    v.walk(f);
                }
            }
            MoveStmt::Assign { target, value } => {
                target.walk(f);
                value.walk(f);
            }
            MoveStmt::Expr(e) | MoveStmt::Abort(e) => e.walk(f),
            MoveStmt::Return(Some(e)) => e.walk(f),
            MoveStmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.walk_exprs(f);
                if let Some(o) = otherwise {
                    o.walk_exprs(f);
                }
            }
            MoveStmt::While { cond, body } => {
                cond.walk(f);
                body.walk_exprs(f);
            }
            MoveStmt::Loop(body) | MoveStmt::Block(body) => body.walk_exprs(f),
            MoveStmt::Assert { cond, code } => {
                cond.walk(f);
                code.walk(f);
            }
            _ => {}
        }
    }

    pub fn walk_exprs_mut(&mut self, f: &mut dyn FnMut(&mut MoveExpr)) {
        match self {
            MoveStmt::Let { value, .. } => {
                if let Some(v) = value {
                    v.walk_mut(f);
                }
            }
            MoveStmt::Assign { target, value } => {
                target.walk_mut(f);
                value.walk_mut(f);
            }
            MoveStmt::Expr(e) | MoveStmt::Abort(e) => e.walk_mut(f),
            MoveStmt::Return(Some(e)) => e.walk_mut(f),
            MoveStmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.walk_mut(f);
                then.walk_exprs_mut(f);
                if let Some(o) = otherwise {
                    o.walk_exprs_mut(f);
                }
            }
            MoveStmt::While { cond, body } => {
                cond.walk_mut(f);
                body.walk_exprs_mut(f);
            }
            MoveStmt::Loop(body) | MoveStmt::Block(body) => body.walk_exprs_mut(f),
            MoveStmt::Assert { cond, code } => {
                cond.walk_mut(f);
                code.walk_mut(f);
            }
            _ => {}
        }
    }
}

impl MoveBlock {
    pub fn diverges(&self) -> bool {
        self.result
            .as_ref()
            .map(|r| matches!(r.kind, ExprKind::Abort(_) | ExprKind::Stub { .. }))
            .unwrap_or(false)
            || self.stmts.last().map(|s| s.diverges()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl MoveBinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            MoveBinOp::Add => "+",
            MoveBinOp::Sub => "-",
            MoveBinOp::Mul => "*",
            MoveBinOp::Div => "/",
            MoveBinOp::Mod => "%",
            MoveBinOp::Shl => "<<",
            MoveBinOp::Shr => ">>",
            MoveBinOp::BitAnd => "&",
            MoveBinOp::BitOr => "|",
            MoveBinOp::BitXor => "^",
            MoveBinOp::And => "&&",
            MoveBinOp::Or => "||",
            MoveBinOp::Eq => "==",
            MoveBinOp::Ne => "!=",
            MoveBinOp::Lt => "<",
            MoveBinOp::Le => "<=",
            MoveBinOp::Gt => ">",
            MoveBinOp::Ge => ">=",
        }
    }

    /// Binding strength used by the printer to decide on parentheses.
    pub fn precedence(&self) -> u8 {
        match self {
            MoveBinOp::Or => 1,
            MoveBinOp::And => 2,
            MoveBinOp::Eq
            | MoveBinOp::Ne
            | MoveBinOp::Lt
            | MoveBinOp::Le
            | MoveBinOp::Gt
            | MoveBinOp::Ge => 3,
            MoveBinOp::BitOr => 4,
            MoveBinOp::BitXor => 5,
            MoveBinOp::BitAnd => 6,
            MoveBinOp::Shl | MoveBinOp::Shr => 7,
            MoveBinOp::Add | MoveBinOp::Sub => 8,
            MoveBinOp::Mul | MoveBinOp::Div | MoveBinOp::Mod => 9,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            MoveBinOp::Eq
                | MoveBinOp::Ne
                | MoveBinOp::Lt
                | MoveBinOp::Le
                | MoveBinOp::Gt
                | MoveBinOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, MoveBinOp::And | MoveBinOp::Or)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, MoveBinOp::Shl | MoveBinOp::Shr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveUnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveExpr {
    pub kind: ExprKind,
    /// Filled in by type inference.
    pub inferred_type: Option<MoveType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Int {
        value: BigUint,
        suffix: Option<MoveType>,
    },
    Bool(bool),
    /// `@addr`
    Address(String),
    /// `x"0a1b"`
    Bytes(Vec<u8>),
    /// `b"text"`
    ByteString(String),
    Var(String),
    Binary {
        op: MoveBinOp,
        lhs: Box<MoveExpr>,
        rhs: Box<MoveExpr>,
    },
    Unary {
        op: MoveUnOp,
        operand: Box<MoveExpr>,
    },
    Cast {
        expr: Box<MoveExpr>,
        ty: MoveType,
    },
    /// `module::name<T>(args)`; `module` is `None` for same-module calls and builtins.
    Call {
        module: Option<String>,
        name: String,
        type_args: Vec<MoveType>,
        args: Vec<MoveExpr>,
    },
    BorrowGlobal {
        mutable: bool,
        resource: String,
        address: Box<MoveExpr>,
    },
    Field {
        base: Box<MoveExpr>,
        field: String,
    },
    Borrow {
        mutable: bool,
        expr: Box<MoveExpr>,
    },
    Deref(Box<MoveExpr>),
    Pack {
        name: String,
        fields: Vec<(String, MoveExpr)>,
    },
    Vector {
        elem_ty: Option<MoveType>,
        items: Vec<MoveExpr>,
    },
    Tuple(Vec<MoveExpr>),
    IfElse {
        cond: Box<MoveExpr>,
        then: Box<MoveExpr>,
        otherwise: Box<MoveExpr>,
    },
    Abort(Box<MoveExpr>),
    /// Placeholder for a construct with no Move counterpart; aborts with `E_UNSUPPORTED`.
    Stub {
        marker: String,
    },
}

impl From<ExprKind> for MoveExpr {
    fn from(kind: ExprKind) -> Self {
        MoveExpr {
            kind,
            inferred_type: None,
        }
    }
}

impl MoveExpr {
    pub fn typed(kind: ExprKind, ty: MoveType) -> Self {
        MoveExpr {
            kind,
            inferred_type: Some(ty),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        ExprKind::Var(name.into()).into()
    }

    pub fn int(value: impl Into<BigUint>) -> Self {
        ExprKind::Int {
            value: value.into(),
            suffix: None,
        }
        .into()
    }

    pub fn int_suffixed(value: impl Into<BigUint>, ty: MoveType) -> Self {
        MoveExpr::typed(
            ExprKind::Int {
                value: value.into(),
                suffix: Some(ty.clone()),
            },
            ty,
        )
    }

    pub fn bool(value: bool) -> Self {
        MoveExpr::typed(ExprKind::Bool(value), MoveType::Bool)
    }

    pub fn address(value: impl Into<String>) -> Self {
        MoveExpr::typed(ExprKind::Address(value.into()), MoveType::Address)
    }

    pub fn byte_string(value: impl Into<String>) -> Self {
        MoveExpr::typed(ExprKind::ByteString(value.into()), MoveType::bytes())
    }

    pub fn bytes(value: Vec<u8>) -> Self {
        MoveExpr::typed(ExprKind::Bytes(value), MoveType::bytes())
    }

    pub fn binary(op: MoveBinOp, lhs: MoveExpr, rhs: MoveExpr) -> Self {
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
        .into()
    }

    pub fn not(operand: MoveExpr) -> Self {
        ExprKind::Unary {
            op: MoveUnOp::Not,
            operand: Box::new(operand),
        }
        .into()
    }

    pub fn cast(expr: MoveExpr, ty: MoveType) -> Self {
        MoveExpr::typed(
            ExprKind::Cast {
                expr: Box::new(expr),
                ty: ty.clone(),
            },
            ty,
        )
    }

    pub fn call(module: Option<&str>, name: &str, args: Vec<MoveExpr>) -> Self {
        ExprKind::Call {
            module: module.map(str::to_string),
            name: name.to_string(),
            type_args: Vec::new(),
            args,
        }
        .into()
    }

    pub fn call_generic(
        module: Option<&str>,
        name: &str,
        type_args: Vec<MoveType>,
        args: Vec<MoveExpr>,
    ) -> Self {
        ExprKind::Call {
            module: module.map(str::to_string),
            name: name.to_string(),
            type_args,
            args,
        }
        .into()
    }

    pub fn field(base: MoveExpr, field: impl Into<String>) -> Self {
        ExprKind::Field {
            base: Box::new(base),
            field: field.into(),
        }
        .into()
    }

    pub fn borrow(expr: MoveExpr, mutable: bool) -> Self {
        ExprKind::Borrow {
            mutable,
            expr: Box::new(expr),
        }
        .into()
    }

    pub fn deref(expr: MoveExpr) -> Self {
        ExprKind::Deref(Box::new(expr)).into()
    }

    pub fn borrow_global(resource: impl Into<String>, address: MoveExpr, mutable: bool) -> Self {
        ExprKind::BorrowGlobal {
            mutable,
            resource: resource.into(),
            address: Box::new(address),
        }
        .into()
    }

    pub fn abort(code: MoveExpr) -> Self {
        ExprKind::Abort(Box::new(code)).into()
    }

    pub fn stub(marker: impl Into<String>) -> Self {
        ExprKind::Stub {
            marker: marker.into(),
        }
        .into()
    }

    pub fn if_else(cond: MoveExpr, then: MoveExpr, otherwise: MoveExpr) -> Self {
        ExprKind::IfElse {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
        .into()
    }

    pub fn is_unsuffixed_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Int { suffix: None, .. })
    }

    pub fn as_var(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a MoveExpr)) {
        f(self);
        match &self.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::Unary { operand, .. } => operand.walk(f),
            ExprKind::Cast { expr, .. }
            | ExprKind::Borrow { expr, .. }
            | ExprKind::Deref(expr)
            | ExprKind::Abort(expr) => expr.walk(f),
            ExprKind::Call { args, .. } => args.iter().for_each(|a| a.walk(f)),
            ExprKind::BorrowGlobal { address, .. } => address.walk(f),
            ExprKind::Field { base, .. } => base.walk(f),
            ExprKind::Pack { fields, .. } => fields.iter().for_each(|(_, e)| e.walk(f)),
            ExprKind::Vector { items, .. } | ExprKind::Tuple(items) => {
                items.iter().for_each(|e| e.walk(f))
            }
            ExprKind::IfElse {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.walk(f);
                otherwise.walk(f);
            }
            _ => {}
        }
    }

    /// Post-order traversal with mutable access.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut MoveExpr)) {
        match &mut self.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk_mut(f);
                rhs.walk_mut(f);
            }
            ExprKind::Unary { operand, .. } => operand.walk_mut(f),
            ExprKind::Cast { expr, .. }
            | ExprKind::Borrow { expr, .. }
            | ExprKind::Deref(expr)
            | ExprKind::Abort(expr) => expr.walk_mut(f),
            ExprKind::Call { args, .. } => args.iter_mut().for_each(|a| a.walk_mut(f)),
            ExprKind::BorrowGlobal { address, .. } => address.walk_mut(f),
            ExprKind::Field { base, .. } => base.walk_mut(f),
            ExprKind::Pack { fields, .. } => fields.iter_mut().for_each(|(_, e)| e.walk_mut(f)),
            ExprKind::Vector { items, .. } | ExprKind::Tuple(items) => {
                items.iter_mut().for_each(|e| e.walk_mut(f))
            }
            ExprKind::IfElse {
                cond,
                then,
                otherwise,
            } => {
                cond.walk_mut(f);
                then.walk_mut(f);
                otherwise.walk_mut(f);
            }
            _ => {}
        }
        f(self);
    }
}

impl MoveFunction {
    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a MoveExpr)) {
        self.body.walk_exprs(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_nested_borrows() {
        let expr = MoveExpr::field(
            MoveExpr::borrow_global("VaultState", MoveExpr::address("solmove"), false),
            "total",
        );
        let mut resources = Vec::new();
        expr.walk(&mut |e| {
            if let ExprKind::BorrowGlobal { resource, .. } = &e.kind {
                resources.push(resource.clone());
            }
        });
        assert_eq!(resources, vec!["VaultState".to_string()]);
    }

    #[test]
    fn test_divergence() {
        let block = MoveBlock::new(vec![MoveStmt::If {
            cond: MoveExpr::var("c"),
            then: MoveBlock::new(vec![MoveStmt::Return(None)]),
            otherwise: Some(MoveBlock::new(vec![MoveStmt::Abort(MoveExpr::int(1u32))])),
        }]);
        assert!(block.diverges());
        assert!(!MoveBlock::new(vec![MoveStmt::Break]).diverges());
    }
}
