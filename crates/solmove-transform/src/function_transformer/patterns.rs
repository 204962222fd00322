//! Calls: Solidity builtins and their platform counterparts, guards, library and `using for`
//! dispatch, struct construction and calls between functions of the same contract.

use super::context::{ContractInfo, TranspileContext};
use super::expression::{aptos_coin, unit};
use super::signature::{CallerNeed, Shape};
use super::storage::platform_call;
use crate::config::{GuardStyle, StringRepr};
use crate::error_codes::Builtin;
use crate::errors::{Result, TranspileError};
use solmove_core::ir::{IRFunction, IRTypeKind};
use solmove_core::move_ast::{ExprKind, MoveBinOp, MoveBlock, MoveExpr, MoveStmt};
use solmove_core::naming::move_identifier;
use solmove_core::source::{Expr, SourceType};
use solmove_core::types::MoveType;

/// Library methods that collapse to a native operator.
fn native_library_op(library: &str, function: &str) -> Option<MoveBinOp> {
    let name = library.rsplit('.').next().unwrap_or(library);
    if !name.contains("SafeMath") && !name.starts_with("SafeCast") && name != "Math" {
        return None;
    }
    Some(match function {
        "add" => MoveBinOp::Add,
        "sub" => MoveBinOp::Sub,
        "mul" => MoveBinOp::Mul,
        "div" => MoveBinOp::Div,
        "mod" => MoveBinOp::Mod,
        _ => return None,
    })
}

impl<'c, 'a> TranspileContext<'c, 'a> {
    pub(crate) fn call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        options: &[(String, Expr)],
        named: &[(String, Expr)],
    ) -> Result<MoveExpr> {
        if !options.is_empty() {
            let keys: Vec<&str> = options.iter().map(|(k, _)| k.as_str()).collect();
            return self.unsupported(&format!("call options {{{}}}", keys.join(", ")));
        }
        match callee {
            Expr::Ident(name) => self.call_ident(name, args, named),
            Expr::ElementaryType(ty) => match args {
                [arg] => self.conversion(ty, arg),
                _ => self.unsupported(&format!("{} conversion arity", ty.name())),
            },
            Expr::Member { object, member } => self.call_member(object, member, args),
            Expr::New(ty) => self.allocate(ty, args),
            Expr::Tuple(items) if items.len() == 1 => match &items[0] {
                Some(inner) => self.call(inner, args, options, named),
                None => self.unsupported("call of an empty expression"),
            },
            _ => self.unsupported("call through a function value"),
        }
    }

    fn call_ident(&mut self, name: &str, args: &[Expr], named: &[(String, Expr)]) -> Result<MoveExpr> {
        if self.local(name).is_some() {
            return self.unsupported("call through a function-typed variable");
        }
        if let Some(function) = self.info.contract.resolve_call(name, args.len() + named.len()) {
            let names: Vec<String> = function.params.iter().map(|p| p.name.clone()).collect();
            let args = ordered_args(&names, args, named)?;
            return self.internal_call(function, &args);
        }
        match (name, args) {
            ("require", [cond]) => {
                let code = self.abort_code(Builtin::RequirementFailed);
                self.guard_expr(cond, code)
            }
            ("require", [cond, reason]) => {
                let code = self.reason_code(cond, reason)?;
                self.guard_expr(cond, code)
            }
            ("assert", [cond]) => {
                let code = self.abort_code(Builtin::AssertionFailed);
                self.guard_expr(cond, code)
            }
            ("revert", _) => {
                let stmt = self.revert(None, args)?;
                self.hoist(stmt);
                Ok(unit())
            }
            ("keccak256", [arg]) => self.hash("aptos_hash", "keccak256", arg),
            ("sha256", [arg]) => self.hash("hash", "sha2_256", arg),
            ("addmod", [a, b, m]) | ("mulmod", [a, b, m]) => {
                let op = if name == "addmod" {
                    MoveBinOp::Add
                } else {
                    MoveBinOp::Mul
                };
                let (a, b, m) = (self.expr(a)?, self.expr(b)?, self.expr(m)?);
                Ok(MoveExpr::binary(
                    MoveBinOp::Mod,
                    MoveExpr::binary(op, a, b),
                    m,
                ))
            }
            ("_msgSender", []) => self.sender(),
            ("payable", [arg]) => self.to_address(arg),
            _ => {
                if let Some(def) = self.info.contract.struct_def(name) {
                    let fields: Vec<String> = def.fields.iter().map(|f| f.name.clone()).collect();
                    let args = ordered_args(&fields, args, named)?;
                    let mut lowered = Vec::new();
                    for (field, arg) in fields.iter().zip(&args) {
                        lowered.push((move_identifier(field), self.expr(arg)?));
                    }
                    return Ok(MoveExpr::typed(
                        ExprKind::Pack {
                            name: name.to_string(),
                            fields: lowered,
                        },
                        MoveType::local_struct(name),
                    ));
                }
                if self.info.contract.enum_def(name).is_some() {
                    if let [arg] = args {
                        let value = self.expr(arg)?;
                        return Ok(MoveExpr::cast(value, MoveType::u8()));
                    }
                }
                if let [arg] = args {
                    if self.info.symbols.contract(name).is_some() {
                        // `IERC20(token)`: contract references are plain addresses
                        return self.to_address(arg);
                    }
                }
                match self.info.contract.functions_named(name).next() {
                    Some(_) => Err(TranspileError::SymbolNotFound(format!(
                        "no overload of {} takes {} arguments",
                        name,
                        args.len()
                    ))),
                    None => self.unsupported(&format!("call to {}", name)),
                }
            }
        }
    }

    fn call_member(&mut self, object: &Expr, member: &str, args: &[Expr]) -> Result<MoveExpr> {
        if let Expr::Ident(owner) = object {
            let shadowed = self.local(owner).is_some() || self.info.state_var(owner).is_some();
            if !shadowed {
                match owner.as_str() {
                    "abi" => {
                        return match member {
                            "encode" | "encodePacked" => self.encode(args),
                            _ => self.unsupported(&format!("abi.{}", member)),
                        }
                    }
                    "string" | "bytes" if member == "concat" => return self.concat(owner, args),
                    "this" => {
                        if let Some(function) = self.info.contract.resolve_call(member, args.len()) {
                            self.warn(format!(
                                "this.{} in {} is translated as an internal call",
                                member, self.function
                            ));
                            return self.internal_call(function, args);
                        }
                        return self.unsupported(&format!("this.{}", member));
                    }
                    "super" => return self.unsupported(&format!("super.{} without a base body", member)),
                    _ => {}
                }
                if self.info.symbols.is_library(owner)
                    || (self.info.symbols.contract(owner).is_none()
                        && self.info.contract.using_for.iter().any(|u| u.library == *owner))
                {
                    return self.library_call(owner, member, None, args);
                }
            }
        }

        let object_ty = self.ir_type_of(object);
        let kind = object_ty.as_ref().map(|t| t.kind.clone());
        match member {
            "push" | "pop"
                if matches!(kind, Some(IRTypeKind::Array { .. }) | Some(IRTypeKind::Bytes { fixed: None })) =>
            {
                return self.array_update(object, member, args);
            }
            "transfer" | "send"
                if args.len() == 1
                    && matches!(kind, Some(IRTypeKind::Address) | None) =>
            {
                return self.coin_transfer(object, &args[0], member == "send");
            }
            "call" | "delegatecall" | "staticcall" => {
                return self.unsupported(&format!("low-level {}", member));
            }
            _ => {}
        }

        if let Some(library) = self.using_library(object_ty.as_ref().map(|t| t.source_name.as_str()), member) {
            return self.library_call(&library, member, Some(object), args);
        }
        match kind {
            Some(IRTypeKind::Contract(name)) => {
                self.unsupported(&format!("external call {}.{}", name, member))
            }
            Some(IRTypeKind::Address) => self.unsupported(&format!("external call .{}", member)),
            _ => self.unsupported(&format!("method call .{}", member)),
        }
    }

    /// The library a `using L for T` directive attaches `member` from, for a receiver of type `T`.
    fn using_library(&self, receiver: Option<&str>, member: &str) -> Option<String> {
        self.info
            .contract
            .using_for
            .iter()
            .filter(|u| match (&u.target, receiver) {
                (None, _) => true,
                (Some(target), Some(receiver)) => type_matches(target, receiver),
                (Some(_), None) => false,
            })
            .find(|u| match self.info.symbols.contract(&u.library) {
                Some(library) => library.functions.iter().any(|f| f.name == member),
                None => native_library_op(&u.library, member).is_some(),
            })
            .map(|u| u.library.clone())
    }

    fn library_call(
        &mut self,
        library: &str,
        member: &str,
        receiver: Option<&Expr>,
        args: &[Expr],
    ) -> Result<MoveExpr> {
        let mut all: Vec<Expr> = receiver.into_iter().cloned().collect();
        all.extend(args.iter().cloned());

        if let (Some(op), [a, b]) = (native_library_op(library, member), all.as_slice()) {
            let (a, b) = (self.expr(a)?, self.expr(b)?);
            return Ok(MoveExpr::binary(op, a, b));
        }
        if library.rsplit('.').next() == Some("Math") && all.len() == 2 && (member == "max" || member == "min") {
            let a = self.expr(&all[0])?;
            let a = self.stable(a);
            let b = self.expr(&all[1])?;
            let b = self.stable(b);
            let op = if member == "max" {
                MoveBinOp::Ge
            } else {
                MoveBinOp::Le
            };
            return Ok(MoveExpr::if_else(
                MoveExpr::binary(op, a.clone(), b.clone()),
                a,
                b,
            ));
        }

        let module = ContractInfo::library_module(library);
        if module == solmove_core::naming::module_name(&self.info.contract.name) {
            if let Some(function) = self.info.contract.resolve_call(member, all.len()) {
                return self.internal_call(function, &all);
            }
        }
        let (name, returns) = self.library_function(library, member, all.len());
        let mut lowered = Vec::new();
        for arg in &all {
            lowered.push(self.expr(arg)?);
        }
        let call = MoveExpr::call(Some(module.as_str()), &name, lowered);
        Ok(MoveExpr {
            inferred_type: returns,
            ..call
        })
    }

    /// Move name and return type of a library function, replicating how the library's own
    /// module disambiguates overloads.
    fn library_function(&self, library: &str, member: &str, arity: usize) -> (String, Option<MoveType>) {
        let Some(source) = self.info.symbols.contract(library) else {
            return (move_identifier(member), None);
        };
        let overloads: Vec<_> = source.functions.iter().filter(|f| f.name == member).collect();
        let chosen = overloads.iter().find(|f| f.params.len() == arity).copied();
        let name = match (overloads.first(), chosen) {
            (Some(first), Some(chosen)) if !std::ptr::eq(*first, chosen) => {
                move_identifier(&format!("{}_{}", member, arity))
            }
            _ => move_identifier(member),
        };
        let returns = chosen
            .and_then(|f| match f.returns.as_slice() {
                [single] => self.info.map_type(&single.ty).ok(),
                _ => None,
            })
            .map(|t| self.info.move_type(&t));
        (name, returns)
    }

    /// Calls another function of this contract, passing the caller and borrowed resources
    /// the callee's signature asks for.
    pub(crate) fn internal_call(&mut self, function: &IRFunction, args: &[Expr]) -> Result<MoveExpr> {
        let signature = self
            .info
            .signatures
            .get(&function.ident)
            .cloned()
            .ok_or_else(|| TranspileError::SymbolNotFound(function.ident.clone()))?;
        let mut lowered = Vec::new();
        if signature.shape != Shape::Library && signature.takes_context() {
            match signature.caller {
                CallerNeed::None => {}
                CallerNeed::Address => lowered.push(self.sender()?),
                CallerNeed::Signer => match self.signer() {
                    Some(signer) => lowered.push(signer),
                    None => {
                        let stub = self.unsupported(&format!(
                            "call to {} that needs the transaction signer",
                            function.name
                        ))?;
                        return Ok(stub);
                    }
                },
            }
            for (group, _) in &signature.groups {
                lowered.push(MoveExpr::var(ContractInfo::group_local(group)));
            }
        }
        for (arg, param) in args.iter().zip(&function.params) {
            let value = self.expr(arg)?;
            lowered.push(self.pass_argument(value, &param.ty));
        }
        let ty = match function.returns.as_slice() {
            [] => MoveType::Unit,
            [single] => self.info.move_type(&single.ty),
            many => MoveType::Tuple(many.iter().map(|r| self.info.move_type(&r.ty)).collect()),
        };
        let name = match signature.shape {
            Shape::Library => signature.name.clone(),
            _ => signature.callable_name().to_string(),
        };
        Ok(MoveExpr::typed(
            ExprKind::Call {
                module: None,
                name,
                type_args: Vec::new(),
                args: lowered,
            },
            ty,
        ))
    }

    /// Mapping-typed parameters are storage references and cannot be passed by value.
    fn pass_argument(&mut self, value: MoveExpr, ty: &solmove_core::ir::IRType) -> MoveExpr {
        if ty.is_mapping() {
            self.warn(format!(
                "mapping argument in {} is passed by value and will not compile",
                self.function
            ));
        }
        value
    }

    fn hash(&mut self, module: &str, function: &str, arg: &Expr) -> Result<MoveExpr> {
        if module == "aptos_hash" {
            if let Some(data) = literal_bytes(arg) {
                return Ok(MoveExpr::bytes(super::expression::keccak(&data)));
            }
        }
        let data = self.bytes_of(arg)?;
        Ok(platform_call(module, function, vec![data], MoveType::bytes()))
    }

    fn concat(&mut self, kind: &str, args: &[Expr]) -> Result<MoveExpr> {
        let string = kind == "string" && self.info.config.string_repr == StringRepr::String;
        let Some((first, rest)) = args.split_first() else {
            return Ok(if string {
                self.info.string_literal("")
            } else {
                MoveExpr::bytes(Vec::new())
            });
        };
        let head = self.expr(first)?;
        let name = self.fresh("cat");
        let ty = if string { MoveType::String } else { MoveType::bytes() };
        self.hoist(MoveStmt::let_(name.clone(), Some(ty.clone()), head));
        for arg in rest {
            let part = self.expr(arg)?;
            let (module, function) = if string {
                ("string", "append")
            } else {
                ("vector", "append")
            };
            self.hoist(MoveStmt::Expr(platform_call(
                module,
                function,
                vec![MoveExpr::borrow(MoveExpr::var(name.clone()), true), part],
                MoveType::Unit,
            )));
        }
        Ok(MoveExpr::typed(ExprKind::Var(name), ty))
    }

    fn coin_transfer(&mut self, recipient: &Expr, amount: &Expr, returns_bool: bool) -> Result<MoveExpr> {
        let Some(signer) = self.signer() else {
            return self.unsupported("native transfer without a signer");
        };
        let to = self.expr(recipient)?;
        let amount = self.expr(amount)?;
        let transfer = MoveExpr::typed(
            ExprKind::Call {
                module: Some("coin".to_string()),
                name: "transfer".to_string(),
                type_args: vec![aptos_coin()],
                args: vec![signer, to, MoveExpr::cast(amount, MoveType::u64())],
            },
            MoveType::Unit,
        );
        if !returns_bool {
            return Ok(transfer);
        }
        // `send` reports failure instead of reverting; a failed coin transfer aborts
        self.hoist(MoveStmt::Expr(transfer));
        Ok(MoveExpr::bool(true))
    }

    /// `new T[](n)` and `new bytes(n)`: a vector of `n` zero values.
    fn allocate(&mut self, ty: &SourceType, args: &[Expr]) -> Result<MoveExpr> {
        let element = match ty {
            SourceType::Array(element, None) => self.info.map_type(element)?,
            SourceType::Elementary(name) if name == "bytes" => solmove_core::ir::IRType::uint(8),
            SourceType::Elementary(name) if name == "string" => {
                return Ok(self.info.string_literal(""));
            }
            other => return self.unsupported(&format!("contract creation new {}", other.name())),
        };
        let element_ty = self.info.move_type(&element);
        let vector_ty = MoveType::Vector(Box::new(element_ty.clone()));
        let empty = MoveExpr::typed(
            ExprKind::Vector {
                elem_ty: Some(element_ty),
                items: Vec::new(),
            },
            vector_ty.clone(),
        );
        let [length] = args else {
            return Ok(empty);
        };
        let length = self.expr(length)?;
        let name = self.fresh("vec");
        let counter = self.fresh("i");
        let length_var = self.fresh("n");
        self.hoist(MoveStmt::let_(name.clone(), Some(vector_ty.clone()), empty));
        self.hoist(MoveStmt::let_(length_var.clone(), Some(MoveType::u64()), MoveExpr::cast(length, MoveType::u64())));
        self.hoist(MoveStmt::let_(counter.clone(), Some(MoveType::u64()), MoveExpr::int_suffixed(0u32, MoveType::u64())));
        let zero = self.info.default_value(&element);
        self.hoist(MoveStmt::While {
            cond: MoveExpr::binary(
                MoveBinOp::Lt,
                MoveExpr::var(counter.clone()),
                MoveExpr::var(length_var),
            ),
            body: MoveBlock::new(vec![
                MoveStmt::Expr(platform_call(
                    "vector",
                    "push_back",
                    vec![MoveExpr::borrow(MoveExpr::var(name.clone()), true), zero],
                    MoveType::Unit,
                )),
                MoveStmt::assign(
                    MoveExpr::var(counter.clone()),
                    MoveExpr::binary(
                        MoveBinOp::Add,
                        MoveExpr::var(counter),
                        MoveExpr::int_suffixed(1u32, MoveType::u64()),
                    ),
                ),
            ]),
        });
        Ok(MoveExpr::typed(ExprKind::Var(name), vector_ty))
    }

    /// Abort constant for a `require` reason: a string, or a custom error (`require(c, E())`).
    fn reason_code(&mut self, cond: &Expr, reason: &Expr) -> Result<MoveExpr> {
        match reason {
            Expr::Str(message) => {
                let access = is_access_check(cond);
                let name = self.parts.errors.for_message(message, access);
                Ok(self.parts.errors.abort_value(&name))
            }
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Ident(error) => {
                    let name = self.parts.errors.for_custom_error(error);
                    Ok(self.parts.errors.abort_value(&name))
                }
                _ => Ok(self.abort_code(Builtin::RequirementFailed)),
            },
            _ => Ok(self.abort_code(Builtin::RequirementFailed)),
        }
    }

    fn guard_expr(&mut self, cond: &Expr, code: MoveExpr) -> Result<MoveExpr> {
        let cond = self.expr(cond)?;
        let stmt = self.guard(cond, code);
        self.hoist(stmt);
        Ok(unit())
    }

    /// `assert!(cond, code)` or `if (!cond) abort code`, per the configured guard style.
    pub(crate) fn guard(&self, cond: MoveExpr, code: MoveExpr) -> MoveStmt {
        match self.info.config.guard_style {
            GuardStyle::Assert => MoveStmt::Assert { cond, code },
            GuardStyle::IfAbort => MoveStmt::If {
                cond: MoveExpr::not(cond),
                then: MoveBlock::new(vec![MoveStmt::Abort(code)]),
                otherwise: None,
            },
        }
    }

    /// `revert()`, `revert("reason")` and `revert CustomError(..)`.
    pub(crate) fn revert(&mut self, error: Option<&str>, args: &[Expr]) -> Result<MoveStmt> {
        let code = match (error, args) {
            (Some(error), _) => {
                let name = self.parts.errors.for_custom_error(error);
                self.parts.errors.abort_value(&name)
            }
            (None, [Expr::Str(message)]) => {
                let name = self.parts.errors.for_message(message, false);
                self.parts.errors.abort_value(&name)
            }
            (None, [Expr::Call { callee, .. }]) => match callee.as_ref() {
                Expr::Ident(error) => {
                    let name = self.parts.errors.for_custom_error(error);
                    self.parts.errors.abort_value(&name)
                }
                _ => self.abort_code(Builtin::Reverted),
            },
            _ => self.abort_code(Builtin::Reverted),
        };
        Ok(MoveStmt::Abort(code))
    }

    /// `emit E(args)`: packs the `#[event]` struct and hands it to `event::emit`.
    pub(crate) fn emit(&mut self, event: &str, args: &[Expr]) -> Result<MoveStmt> {
        let name = event.rsplit('.').next().unwrap_or(event);
        let Some(def) = self.info.contract.event(name) else {
            return Err(TranspileError::SymbolNotFound(format!("event {}", event)));
        };
        let fields: Vec<String> = def.fields.iter().map(|f| f.name.clone()).collect();
        let mut packed = Vec::new();
        for (field, arg) in fields.iter().zip(args) {
            packed.push((move_identifier(field), self.expr(arg)?));
        }
        Ok(MoveStmt::Expr(platform_call(
            "event",
            "emit",
            vec![MoveExpr::typed(
                ExprKind::Pack {
                    name: name.to_string(),
                    fields: packed,
                },
                MoveType::local_struct(name),
            )],
            MoveType::Unit,
        )))
    }
}

/// Positional arguments in declaration order, whether given positionally or by name.
fn ordered_args(names: &[String], args: &[Expr], named: &[(String, Expr)]) -> Result<Vec<Expr>> {
    if named.is_empty() {
        return Ok(args.to_vec());
    }
    names
        .iter()
        .map(|name| {
            named
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, e)| e.clone())
                .ok_or_else(|| TranspileError::SymbolNotFound(format!("named argument {}", name)))
        })
        .collect()
}

fn type_matches(target: &SourceType, receiver: &str) -> bool {
    let target = target.name();
    target == receiver
        || (target == "uint" && receiver == "uint256")
        || (target == "uint256" && receiver == "uint")
        || (target == "address payable" && receiver == "address")
        || target.rsplit('.').next() == Some(receiver)
}

/// Guards that compare against the caller get codes from the access range.
fn is_access_check(cond: &Expr) -> bool {
    cond.any(&|e| e.is_msg_sender())
}

fn literal_bytes(expr: &Expr) -> Option<Vec<u8>> {
    match expr {
        Expr::Str(text) => Some(text.as_bytes().to_vec()),
        Expr::Call { callee, args, .. } => match callee.as_ref() {
            Expr::Member { object, member }
                if member == "encodePacked"
                    && matches!(object.as_ref(), Expr::Ident(o) if o == "abi") =>
            {
                let mut out = Vec::new();
                for arg in args {
                    out.extend(literal_bytes(arg)?);
                }
                Some(out)
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_native_library_ops() {
        assert_eq!(native_library_op("SafeMath", "add"), Some(MoveBinOp::Add));
        assert_eq!(native_library_op("SafeMathUpgradeable", "mod"), Some(MoveBinOp::Mod));
        assert_eq!(native_library_op("Strings", "add"), None);
        assert_eq!(native_library_op("SafeMath", "tryAdd"), None);
    }

    #[test]
    fn test_named_arguments_follow_declaration_order() {
        let names = vec!["to".to_string(), "amount".to_string()];
        let named = vec![
            ("amount".to_string(), Expr::num("5")),
            ("to".to_string(), Expr::ident("bob")),
        ];
        let args = ordered_args(&names, &[], &named).unwrap();
        assert_eq!(args, vec![Expr::ident("bob"), Expr::num("5")]);
        assert!(ordered_args(&names, &[], &named[..1]).is_err());
    }

    #[test]
    fn test_using_for_type_matching() {
        assert!(type_matches(&SourceType::elementary("uint256"), "uint256"));
        assert!(type_matches(&SourceType::elementary("uint"), "uint256"));
        assert!(!type_matches(&SourceType::elementary("address"), "uint256"));
    }
}
