//! Expression lowering.
//!
//! Side effects nested inside expressions (assignments, `++`, guards, buffer building) are
//! hoisted into the context prelude so the returned [`MoveExpr`] is always side-effect free
//! apart from calls.

use super::context::{call_kind, ContractInfo, TranspileContext};
use super::helpers::Helper;
use super::storage::platform_call;
use crate::errors::{Result, TranspileError};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use solmove_core::ir::{IRType, IRTypeKind};
use solmove_core::literal::{
    fold_pow, parse_number, signed_max, signed_min_magnitude, to_be_bytes_padded, unsigned_max,
};
use solmove_core::move_ast::{ExprKind, MoveBinOp, MoveExpr, MoveStmt, MoveUnOp};
use solmove_core::naming::{move_constant_name, to_upper_snake};
use solmove_core::source::{BinaryOp, Expr, SourceType, UnaryOp};
use solmove_core::types::MoveType;
use tiny_keccak::{Hasher, Keccak};

pub(crate) fn binary_op(op: BinaryOp) -> Option<MoveBinOp> {
    Some(match op {
        BinaryOp::Add => MoveBinOp::Add,
        BinaryOp::Sub => MoveBinOp::Sub,
        BinaryOp::Mul => MoveBinOp::Mul,
        BinaryOp::Div => MoveBinOp::Div,
        BinaryOp::Mod => MoveBinOp::Mod,
        BinaryOp::Shl => MoveBinOp::Shl,
        BinaryOp::Shr => MoveBinOp::Shr,
        BinaryOp::BitAnd => MoveBinOp::BitAnd,
        BinaryOp::BitOr => MoveBinOp::BitOr,
        BinaryOp::BitXor => MoveBinOp::BitXor,
        BinaryOp::And => MoveBinOp::And,
        BinaryOp::Or => MoveBinOp::Or,
        BinaryOp::Eq => MoveBinOp::Eq,
        BinaryOp::Ne => MoveBinOp::Ne,
        BinaryOp::Lt => MoveBinOp::Lt,
        BinaryOp::Le => MoveBinOp::Le,
        BinaryOp::Gt => MoveBinOp::Gt,
        BinaryOp::Ge => MoveBinOp::Ge,
        BinaryOp::Pow => return None,
    })
}

/// Module constant holding an enum variant's discriminant.
pub fn enum_constant(enum_name: &str, variant: &str) -> String {
    to_upper_snake(&format!("{}_{}", enum_name, variant))
}

pub(crate) fn unit() -> MoveExpr {
    MoveExpr::typed(ExprKind::Tuple(Vec::new()), MoveType::Unit)
}

pub(crate) fn is_unit(expr: &MoveExpr) -> bool {
    matches!(&expr.kind, ExprKind::Tuple(items) if items.is_empty())
}

pub(crate) fn aptos_coin() -> MoveType {
    MoveType::Struct {
        module: Some("aptos_coin".to_string()),
        name: "AptosCoin".to_string(),
        type_args: Vec::new(),
    }
}

pub(crate) fn keccak(data: &[u8]) -> Vec<u8> {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out.to_vec()
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

fn address_literal(text: &str) -> Option<String> {
    let hex = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    (hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| format!("0x{}", hex.to_ascii_lowercase()))
}

fn int_typed(value: BigUint, ty: MoveType) -> MoveExpr {
    MoveExpr::typed(ExprKind::Int { value, suffix: None }, ty)
}

/// Transpile-time integer value of `expr`, following contract constants.
pub(crate) fn const_int(info: &ContractInfo<'_>, expr: &Expr) -> Option<BigUint> {
    const_int_depth(info, expr, 0)
}

fn const_int_depth(info: &ContractInfo<'_>, expr: &Expr, depth: usize) -> Option<BigUint> {
    if depth > 16 {
        return None;
    }
    let eval = |e: &Expr| const_int_depth(info, e, depth + 1);
    match expr {
        Expr::Number(text) => {
            if address_literal(text).is_some() {
                return None;
            }
            parse_number(text)
        }
        Expr::Ident(name) => info
            .contract
            .constant(name)
            .filter(|c| c.ty.is_numeric())
            .and_then(|c| eval(&c.value)),
        Expr::Tuple(items) if items.len() == 1 => items[0].as_ref().and_then(eval),
        Expr::Binary { op, lhs, rhs } => {
            let (a, b) = (eval(lhs)?, eval(rhs)?);
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub if a >= b => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if !b.is_zero() => a / b,
                BinaryOp::Mod if !b.is_zero() => a % b,
                BinaryOp::Pow => fold_pow(&a, &b)?,
                BinaryOp::Shl => a << b.to_usize()?,
                BinaryOp::Shr => a >> b.to_usize()?,
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => return None,
            };
            (value.bits() <= 256).then_some(value)
        }
        Expr::Call { callee, args, .. } if args.len() == 1 => match callee.as_ref() {
            Expr::ElementaryType(SourceType::Elementary(name))
                if name.starts_with("uint") || name.starts_with("int") =>
            {
                eval(&args[0])
            }
            _ => None,
        },
        Expr::Member { object, member } => match (object.as_ref(), member.as_str()) {
            (Expr::TypeInfo(ty), "max") => type_bound(info, ty, true).map(|(v, _)| v),
            (Expr::TypeInfo(ty), "min") => type_bound(info, ty, false)
                .filter(|(_, negative)| !negative)
                .map(|(v, _)| v),
            _ => None,
        },
        _ => None,
    }
}

/// `type(T).max` / `type(T).min` as `(magnitude, is_negative)`.
fn type_bound(info: &ContractInfo<'_>, ty: &SourceType, max: bool) -> Option<(BigUint, bool)> {
    let ir = info.map_type(ty).ok()?;
    match ir.kind {
        IRTypeKind::Primitive { width, signed } => Some(match (signed, max) {
            (false, true) => (unsigned_max(width), false),
            (false, false) => (BigUint::zero(), false),
            (true, true) => (signed_max(width), false),
            (true, false) => (signed_min_magnitude(width), true),
        }),
        IRTypeKind::Enum(name) => {
            let count = info.contract.enum_def(&name)?.variants.len();
            Some(match max {
                true => (BigUint::from(count.saturating_sub(1)), false),
                false => (BigUint::zero(), false),
            })
        }
        _ => None,
    }
}

/// The literal a Solidity constant folds to, when it can be declared as a Move `const`.
pub fn fold_constant(info: &ContractInfo<'_>, value: &Expr, ty: &IRType) -> Option<MoveExpr> {
    let target = info.move_type(ty);
    match &ty.kind {
        IRTypeKind::Primitive { .. } | IRTypeKind::Enum(_) => {
            let value = const_int(info, value)?;
            let width = target.integer_width()?;
            (value.bits() <= width as u64).then(|| int_typed(value, target))
        }
        IRTypeKind::Bool => match value {
            Expr::Bool(b) => Some(MoveExpr::bool(*b)),
            _ => None,
        },
        IRTypeKind::Address | IRTypeKind::Contract(_) => match value {
            Expr::Number(text) => {
                let n = parse_number(text)?;
                Some(MoveExpr::address(format!("0x{:x}", n)))
            }
            Expr::Call { callee, args, .. } if args.len() == 1 => match callee.as_ref() {
                Expr::ElementaryType(SourceType::Elementary(name)) if name == "address" => {
                    fold_constant(info, &args[0], ty)
                }
                _ => None,
            },
            _ => None,
        },
        IRTypeKind::String => match value {
            Expr::Str(text) => Some(MoveExpr::byte_string(text.clone())),
            _ => None,
        },
        IRTypeKind::Bytes { fixed } => {
            let bytes = const_bytes(info, value)?;
            match fixed {
                Some(n) if bytes.len() <= *n as usize => {
                    let mut padded = bytes;
                    padded.resize(*n as usize, 0);
                    Some(MoveExpr::bytes(padded))
                }
                Some(_) => None,
                None => Some(MoveExpr::bytes(bytes)),
            }
        }
        _ => None,
    }
}

fn const_bytes(info: &ContractInfo<'_>, value: &Expr) -> Option<Vec<u8>> {
    match value {
        Expr::HexStr(hex) => decode_hex(hex),
        Expr::Str(text) => Some(text.as_bytes().to_vec()),
        Expr::Number(text) if text.starts_with("0x") => {
            let digits = text.len() - 2;
            let n = parse_number(text)?;
            Some(to_be_bytes_padded(&n, digits.div_ceil(2)))
        }
        Expr::Call { callee, args, .. } if args.len() == 1 => match callee.as_ref() {
            Expr::Ident(name) if name == "keccak256" => {
                packed_literal(&args[0]).map(|data| keccak(&data))
            }
            Expr::ElementaryType(SourceType::Elementary(name)) if name.starts_with("bytes") => {
                const_bytes(info, &args[0])
            }
            _ => None,
        },
        Expr::Ident(name) => info
            .contract
            .constant(name)
            .and_then(|c| const_bytes(info, &c.value)),
        _ => None,
    }
}

/// Bytes of a string literal or of `abi.encodePacked` over string literals.
fn packed_literal(expr: &Expr) -> Option<Vec<u8>> {
    match expr {
        Expr::Str(text) => Some(text.as_bytes().to_vec()),
        Expr::Call { callee, args, .. } => match callee.as_ref() {
            Expr::Member { object, member }
                if member == "encodePacked"
                    && matches!(object.as_ref(), Expr::Ident(o) if o == "abi") =>
            {
                let mut out = Vec::new();
                for arg in args {
                    out.extend(packed_literal(arg)?);
                }
                Some(out)
            }
            _ => None,
        },
        _ => None,
    }
}

impl<'c, 'a> TranspileContext<'c, 'a> {
    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<MoveExpr> {
        match expr {
            Expr::Number(text) => {
                if let Some(address) = address_literal(text) {
                    return Ok(MoveExpr::address(address));
                }
                match parse_number(text) {
                    Some(value) => Ok(MoveExpr::int(value)),
                    None => self.unsupported(&format!("non-integer literal {}", text)),
                }
            }
            Expr::Bool(b) => Ok(MoveExpr::bool(*b)),
            Expr::Str(text) => Ok(self.info.string_literal(text)),
            Expr::HexStr(hex) => match decode_hex(hex) {
                Some(bytes) => Ok(MoveExpr::bytes(bytes)),
                None => Err(TranspileError::Parse {
                    line: 0,
                    column: 0,
                    message: format!("malformed hex literal hex\"{}\"", hex),
                }),
            },
            Expr::Ident(name) => self.ident(name),
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Unary { op, operand } => self.unary(*op, operand),
            Expr::Assign { op, target, value } => {
                let stmts = self.assign(target, *op, value)?;
                for stmt in stmts {
                    self.hoist(stmt);
                }
                self.expr(target)
            }
            Expr::Call {
                callee,
                args,
                options,
                named,
            } => self.call(callee, args, options, named),
            Expr::Member { object, member } => self.member(expr, object, member),
            Expr::Index { .. } => match self.read_path(expr)? {
                Some(value) => Ok(value),
                None => self.unsupported("indexing a non-storage value"),
            },
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => self.ternary(cond, then, otherwise),
            Expr::Tuple(items) => match items.as_slice() {
                [Some(single)] => self.expr(single),
                _ => {
                    let mut lowered = Vec::new();
                    for item in items {
                        match item {
                            Some(item) => lowered.push(self.expr(item)?),
                            None => return self.unsupported("tuple with an omitted component"),
                        }
                    }
                    Ok(ExprKind::Tuple(lowered).into())
                }
            },
            Expr::InlineArray(items) => {
                let elem_ty = items
                    .first()
                    .and_then(|first| self.ir_type_of(first))
                    .map(|t| self.info.move_type(&t));
                let mut lowered = Vec::new();
                for item in items {
                    lowered.push(self.expr(item)?);
                }
                Ok(ExprKind::Vector {
                    elem_ty,
                    items: lowered,
                }
                .into())
            }
            Expr::ElementaryType(ty) | Expr::TypeInfo(ty) | Expr::New(ty) => {
                self.unsupported(&format!("type expression {}", ty.name()))
            }
            Expr::Unsupported { construct, .. } => self.unsupported(construct),
        }
    }

    fn ident(&mut self, name: &str) -> Result<MoveExpr> {
        if self.local(name).is_some() || self.is_state_root(name) {
            if let Some(value) = self.read_path(&Expr::ident(name))? {
                return Ok(value);
            }
        }
        if let Some(local) = self.local(name) {
            return Ok(MoveExpr::var(local.move_name.clone()));
        }
        if let Some(constant) = self.info.contract.constant(name) {
            let (value, ty) = (constant.value.clone(), constant.ty.clone());
            return self.constant_ref(name, &value, &ty);
        }
        match name {
            "this" => Ok(self.info.module_address()),
            "now" => Ok(self.timestamp()),
            _ => Err(TranspileError::SymbolNotFound(format!(
                "{} in {}",
                name, self.function
            ))),
        }
    }

    /// A folded constant is referenced by name; anything else is inlined.
    fn constant_ref(&mut self, name: &str, value: &Expr, ty: &IRType) -> Result<MoveExpr> {
        if fold_constant(self.info, value, ty).is_none() {
            return self.expr(value);
        }
        let target = self.info.move_type(ty);
        let constant = MoveExpr::var(move_constant_name(name));
        if target == MoveType::String {
            return Ok(MoveExpr::typed(
                call_kind("string", "utf8", vec![constant]),
                MoveType::String,
            ));
        }
        let mut constant = constant;
        constant.inferred_type = Some(target);
        Ok(constant)
    }

    fn timestamp(&self) -> MoveExpr {
        MoveExpr::cast(
            platform_call("timestamp", "now_seconds", Vec::new(), MoveType::u64()),
            MoveType::u256(),
        )
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<MoveExpr> {
        if op == BinaryOp::Pow {
            if let Some(value) = const_int(self.info, &Expr::binary(op, lhs.clone(), rhs.clone())) {
                return Ok(MoveExpr::int(value));
            }
            let width = self
                .ir_type_of(lhs)
                .and_then(|t| self.info.move_type(&t).integer_width())
                .unwrap_or(256);
            let base = self.expr(lhs)?;
            let exponent = self.expr(rhs)?;
            let helper = self.parts.helpers.request(Helper::Pow { width });
            return Ok(MoveExpr::typed(
                ExprKind::Call {
                    module: None,
                    name: helper,
                    type_args: Vec::new(),
                    args: vec![base, MoveExpr::cast(exponent, MoveType::u256())],
                },
                MoveType::Uint(width),
            ));
        }
        let lowered_op = binary_op(op).ok_or_else(|| {
            TranspileError::UnsupportedFeature(format!("operator {}", op.symbol()))
        })?;
        if op.is_logical() {
            // the right operand must not be evaluated eagerly
            let lhs = self.expr(lhs)?;
            let saved = self.take_prelude();
            let rhs_value = self.expr(rhs)?;
            let rhs_prelude = self.take_prelude();
            for stmt in saved {
                self.hoist(stmt);
            }
            if rhs_prelude.is_empty() {
                return Ok(MoveExpr::binary(lowered_op, lhs, rhs_value));
            }
            let name = self.fresh("c");
            self.hoist(MoveStmt::let_(name.clone(), Some(MoveType::Bool), lhs));
            let mut block = rhs_prelude;
            block.push(MoveStmt::assign(MoveExpr::var(name.clone()), rhs_value));
            let cond = match op {
                BinaryOp::And => MoveExpr::var(name.clone()),
                _ => MoveExpr::not(MoveExpr::var(name.clone())),
            };
            self.hoist(MoveStmt::If {
                cond,
                then: solmove_core::move_ast::MoveBlock::new(block),
                otherwise: None,
            });
            return Ok(MoveExpr::typed(ExprKind::Var(name), MoveType::Bool));
        }
        let lhs = self.expr(lhs)?;
        let rhs = self.expr(rhs)?;
        Ok(MoveExpr::binary(lowered_op, lhs, rhs))
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<MoveExpr> {
        match op {
            UnaryOp::Not => Ok(MoveExpr::not(self.expr(operand)?)),
            UnaryOp::Neg => {
                let value = self.expr(operand)?;
                let ty = value.inferred_type.clone();
                let negated: MoveExpr = ExprKind::Unary {
                    op: MoveUnOp::Neg,
                    operand: Box::new(value),
                }
                .into();
                Ok(MoveExpr {
                    inferred_type: ty,
                    ..negated
                })
            }
            UnaryOp::BitNot => {
                let width = self
                    .ir_type_of(operand)
                    .and_then(|t| self.info.move_type(&t).integer_width())
                    .unwrap_or(256);
                let value = self.expr(operand)?;
                Ok(MoveExpr::binary(
                    MoveBinOp::BitXor,
                    value,
                    int_typed(unsigned_max(width), MoveType::Uint(width)),
                ))
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let step = if op.is_increment() {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                let post = matches!(op, UnaryOp::PostInc | UnaryOp::PostDec);
                let old = if post {
                    let current = self.expr(operand)?;
                    let name = self.fresh("old");
                    let ty = self.ir_type_of(operand).map(|t| self.info.move_type(&t));
                    self.hoist(MoveStmt::let_(name.clone(), ty.clone(), current));
                    let mut var = MoveExpr::var(name);
                    var.inferred_type = ty;
                    Some(var)
                } else {
                    None
                };
                let stmts = self.assign_lowered(operand, Some(step), MoveExpr::int(1u32))?;
                for stmt in stmts {
                    self.hoist(stmt);
                }
                match old {
                    Some(old) => Ok(old),
                    None => self.expr(operand),
                }
            }
            UnaryOp::Delete => {
                let stmts = self.delete(operand)?;
                for stmt in stmts {
                    self.hoist(stmt);
                }
                Ok(unit())
            }
        }
    }

    fn ternary(&mut self, cond: &Expr, then: &Expr, otherwise: &Expr) -> Result<MoveExpr> {
        let cond = self.expr(cond)?;
        let saved = self.take_prelude();
        let then_value = self.expr(then)?;
        let then_prelude = self.take_prelude();
        let else_value = self.expr(otherwise)?;
        let else_prelude = self.take_prelude();
        for stmt in saved {
            self.hoist(stmt);
        }
        if then_prelude.is_empty() && else_prelude.is_empty() {
            return Ok(MoveExpr::if_else(cond, then_value, else_value));
        }
        let ty = self
            .ir_type_of(then)
            .or_else(|| self.ir_type_of(otherwise))
            .map(|t| self.info.move_type(&t))
            .or_else(|| then_value.inferred_type.clone());
        let name = self.fresh("t");
        self.hoist(MoveStmt::Let {
            pattern: vec![name.clone()],
            ty: ty.clone(),
            value: None,
        });
        let branch = |mut stmts: Vec<MoveStmt>, value: MoveExpr| {
            stmts.push(MoveStmt::assign(MoveExpr::var(name.clone()), value));
            solmove_core::move_ast::MoveBlock::new(stmts)
        };
        self.hoist(MoveStmt::If {
            cond,
            then: branch(then_prelude, then_value),
            otherwise: Some(branch(else_prelude, else_value)),
        });
        let mut var = MoveExpr::var(name);
        var.inferred_type = ty;
        Ok(var)
    }

    fn member(&mut self, whole: &Expr, object: &Expr, member: &str) -> Result<MoveExpr> {
        if whole.is_msg_sender() {
            return self.sender();
        }
        if let Expr::TypeInfo(ty) = object {
            return self.type_info(ty, member);
        }
        if let Expr::Ident(owner) = object {
            let shadowed = self.local(owner).is_some() || self.info.state_var(owner).is_some();
            if !shadowed {
                match (owner.as_str(), member) {
                    ("tx", "origin") => {
                        self.warn(format!(
                            "tx.origin in {} is translated as the transaction signer",
                            self.function
                        ));
                        return self.sender();
                    }
                    ("block", "timestamp") => return Ok(self.timestamp()),
                    ("block", "number") => {
                        return Ok(MoveExpr::cast(
                            platform_call(
                                "block",
                                "get_current_block_height",
                                Vec::new(),
                                MoveType::u64(),
                            ),
                            MoveType::u256(),
                        ))
                    }
                    ("block", "chainid") => {
                        return Ok(MoveExpr::cast(
                            platform_call("chain_id", "get", Vec::new(), MoveType::u8()),
                            MoveType::u256(),
                        ))
                    }
                    ("msg", _) | ("block", _) | ("tx", _) => {
                        return self.unsupported(&format!("{}.{}", owner, member))
                    }
                    _ => {}
                }
                if let Some(def) = self.info.contract.enum_def(owner) {
                    if def.variants.iter().any(|v| v == member) {
                        return Ok(MoveExpr::typed(
                            ExprKind::Var(enum_constant(owner, member)),
                            MoveType::u8(),
                        ));
                    }
                }
                if let Some(value) = self.library_constant(owner, member)? {
                    return Ok(value);
                }
            }
        }
        match member {
            "length" => {
                if let Some(length) = self.length_of(object)? {
                    return Ok(length);
                }
                let value = self.expr(object)?;
                let length = match self.ir_type_of(object).map(|t| self.info.move_type(&t)) {
                    Some(MoveType::String) => platform_call(
                        "string",
                        "length",
                        vec![MoveExpr::borrow(value, false)],
                        MoveType::u64(),
                    ),
                    _ => platform_call(
                        "vector",
                        "length",
                        vec![MoveExpr::borrow(value, false)],
                        MoveType::u64(),
                    ),
                };
                Ok(MoveExpr::cast(length, MoveType::u256()))
            }
            "balance" => {
                let owner = self.expr(object)?;
                Ok(MoveExpr::cast(
                    MoveExpr::typed(
                        ExprKind::Call {
                            module: Some("coin".to_string()),
                            name: "balance".to_string(),
                            type_args: vec![aptos_coin()],
                            args: vec![owner],
                        },
                        MoveType::u64(),
                    ),
                    MoveType::u256(),
                ))
            }
            _ => match self.read_path(whole)? {
                Some(value) => Ok(value),
                None => {
                    let value = self.expr(object)?;
                    match self.ir_type_of(object).map(|t| t.kind) {
                        Some(IRTypeKind::Struct(_)) => Ok(MoveExpr::field(
                            value,
                            solmove_core::naming::move_identifier(member),
                        )),
                        _ => self.unsupported(&format!("member access .{}", member)),
                    }
                }
            },
        }
    }

    fn type_info(&mut self, ty: &SourceType, member: &str) -> Result<MoveExpr> {
        let ir = self.info.map_type(ty)?;
        let target = self.info.move_type(&ir);
        let bound = match member {
            "max" => type_bound(self.info, ty, true),
            "min" => type_bound(self.info, ty, false),
            _ => None,
        };
        match bound {
            Some((value, false)) => Ok(int_typed(value, target)),
            Some((value, true)) => Ok(MoveExpr::typed(
                ExprKind::Unary {
                    op: MoveUnOp::Neg,
                    operand: Box::new(int_typed(value, target.clone())),
                },
                target,
            )),
            None => self.unsupported(&format!("type({}).{}", ty.name(), member)),
        }
    }

    /// `Lib.CONSTANT` for a constant declared in another contract or library.
    fn library_constant(&mut self, owner: &str, member: &str) -> Result<Option<MoveExpr>> {
        let Some(source) = self.info.symbols.contract(owner) else {
            return Ok(None);
        };
        let Some(decl) = source
            .state_vars
            .iter()
            .find(|v| v.name == member && v.constant)
        else {
            return Ok(None);
        };
        let Some(value) = decl.value.clone() else {
            return Ok(None);
        };
        let ty = self.info.map_type(&decl.ty)?;
        match fold_constant(self.info, &value, &ty) {
            Some(mut literal) => {
                if self.info.move_type(&ty) == MoveType::String {
                    return Ok(Some(MoveExpr::typed(
                        call_kind("string", "utf8", vec![literal]),
                        MoveType::String,
                    )));
                }
                literal.inferred_type = Some(self.info.move_type(&ty));
                Ok(Some(literal))
            }
            None => self.expr(&value).map(Some),
        }
    }

    /// `vector<u8>` view of a value, as hashing and packed encoding see it.
    pub(crate) fn bytes_of(&mut self, expr: &Expr) -> Result<MoveExpr> {
        if let Expr::Str(text) = expr {
            return Ok(MoveExpr::byte_string(text.clone()));
        }
        if let Expr::Call { callee, args, .. } = expr {
            if let Expr::Member { object, member } = callee.as_ref() {
                if matches!(object.as_ref(), Expr::Ident(o) if o == "abi")
                    && (member == "encodePacked" || member == "encode")
                {
                    return self.encode(args);
                }
            }
        }
        let ty = self.ir_type_of(expr);
        let value = self.expr(expr)?;
        let target = ty.as_ref().map(|t| self.info.move_type(t));
        match (ty.map(|t| t.kind), target) {
            (_, Some(MoveType::String)) => Ok(MoveExpr::typed(
                ExprKind::Deref(Box::new(platform_call(
                    "string",
                    "bytes",
                    vec![MoveExpr::borrow(value, false)],
                    MoveType::reference(MoveType::bytes(), false),
                ))),
                MoveType::bytes(),
            )),
            (Some(IRTypeKind::Bytes { .. }), _) | (Some(IRTypeKind::String), _) => Ok(value),
            _ => Ok(MoveExpr::typed(
                call_kind("bcs", "to_bytes", vec![MoveExpr::borrow(value, false)]),
                MoveType::bytes(),
            )),
        }
    }

    /// `abi.encode(..)` / `abi.encodePacked(..)`: the BCS bytes of each argument, concatenated.
    pub(crate) fn encode(&mut self, args: &[Expr]) -> Result<MoveExpr> {
        match args {
            [] => Ok(MoveExpr::typed(
                ExprKind::Vector {
                    elem_ty: Some(MoveType::u8()),
                    items: Vec::new(),
                },
                MoveType::bytes(),
            )),
            [single] => self.bytes_of(single),
            [first, rest @ ..] => {
                let head = self.bytes_of(first)?;
                let buffer = self.fresh("buf");
                self.hoist(MoveStmt::let_(buffer.clone(), Some(MoveType::bytes()), head));
                for arg in rest {
                    let part = self.bytes_of(arg)?;
                    self.hoist(MoveStmt::Expr(platform_call(
                        "vector",
                        "append",
                        vec![MoveExpr::borrow(MoveExpr::var(buffer.clone()), true), part],
                        MoveType::Unit,
                    )));
                }
                Ok(MoveExpr::typed(ExprKind::Var(buffer), MoveType::bytes()))
            }
        }
    }

    /// Explicit conversions `uint128(x)`, `address(x)`, `bytes(s)`, `string(b)`, ...
    pub(crate) fn conversion(&mut self, ty: &SourceType, arg: &Expr) -> Result<MoveExpr> {
        let name = ty.name();
        if name == "address" || name == "address payable" || name == "payable" {
            return self.to_address(arg);
        }
        let target_ir = self.info.map_type(ty)?;
        let target = self.info.move_type(&target_ir);
        let source = self.ir_type_of(arg);
        match &target_ir.kind {
            IRTypeKind::Primitive { .. } => {
                if let Some(value) = const_int(self.info, arg) {
                    return Ok(int_typed(value, target));
                }
                match source.as_ref().map(|t| &t.kind) {
                    Some(IRTypeKind::Address) | Some(IRTypeKind::Contract(_)) => {
                        self.unsupported("address to integer conversion")
                    }
                    Some(IRTypeKind::Bytes { .. }) => {
                        self.unsupported("bytes to integer conversion")
                    }
                    _ => {
                        let value = self.expr(arg)?;
                        Ok(MoveExpr::cast(value, target))
                    }
                }
            }
            IRTypeKind::Bool => self.expr(arg),
            IRTypeKind::Enum(_) => {
                let value = self.expr(arg)?;
                Ok(MoveExpr::cast(value, MoveType::u8()))
            }
            IRTypeKind::Bytes { fixed } => {
                if let Expr::Str(text) = arg {
                    let mut bytes = text.as_bytes().to_vec();
                    if let Some(n) = fixed {
                        bytes.resize(*n as usize, 0);
                    }
                    return Ok(MoveExpr::bytes(bytes));
                }
                match source.as_ref().map(|t| &t.kind) {
                    Some(IRTypeKind::String) | Some(IRTypeKind::Bytes { .. }) | None => {
                        self.bytes_of(arg)
                    }
                    _ => self.unsupported(&format!("conversion to {}", name)),
                }
            }
            IRTypeKind::String => match source.as_ref().map(|t| &t.kind) {
                Some(IRTypeKind::String) => self.expr(arg),
                _ => {
                    let value = self.expr(arg)?;
                    if target == MoveType::String {
                        Ok(MoveExpr::typed(
                            call_kind("string", "utf8", vec![value]),
                            MoveType::String,
                        ))
                    } else {
                        Ok(value)
                    }
                }
            },
            _ => self.unsupported(&format!("conversion to {}", name)),
        }
    }

    pub(crate) fn to_address(&mut self, arg: &Expr) -> Result<MoveExpr> {
        match arg {
            Expr::Ident(name) if name == "this" && self.local(name).is_none() => {
                return Ok(self.info.module_address())
            }
            Expr::Number(text) => {
                if let Some(address) = address_literal(text) {
                    return Ok(MoveExpr::address(address));
                }
                if let Some(n) = parse_number(text) {
                    return Ok(MoveExpr::address(format!("0x{:x}", n)));
                }
            }
            _ => {}
        }
        match self.ir_type_of(arg).map(|t| t.kind) {
            Some(IRTypeKind::Primitive { .. }) => self.unsupported("integer to address conversion"),
            _ => self.expr(arg),
        }
    }
}
