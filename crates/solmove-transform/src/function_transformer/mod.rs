//! Rewrites IR functions into Move functions.
//!
//! Each function gets the shape its [`Signature`] prescribes. Entry and view functions borrow
//! their resources once with `borrow_global[_mut]`, everything they call receives references.
//! Public functions that are also called from inside the contract are split into a thin public
//! wrapper and a private `<name>_inner` that carries the body.

mod context;
mod expression;
mod helpers;
pub mod modifier;
mod patterns;
pub mod signature;
mod statement;
mod storage;

pub use context::{CallerAccess, ContractInfo, Local, ModuleParts, TranspileContext};
pub use expression::{enum_constant, fold_constant};
pub use helpers::{Helper, HelperSet};
pub use signature::{CallerNeed, Shape, Signature, Signatures};

use crate::config::ViewStyle;
use crate::error_codes::Builtin;
use crate::errors::{Result, TranspileError};
use context::{call_kind, DEPLOYER_PARAM, SENDER_PARAM, SIGNER_PARAM};
use modifier::ModifierInliner;
use solmove_core::analysis::visit::INITIALIZER;
use solmove_core::ir::{IRFunction, IRParam, IRReturn, IRType};
use solmove_core::literal::unsigned_max;
use solmove_core::move_ast::{
    ExprKind, FunVisibility, MoveBinOp, MoveBlock, MoveExpr, MoveFunction, MoveParam, MoveStmt,
};
use solmove_core::naming::move_identifier;
use solmove_core::source::{Expr, FunctionKind, Stmt};
use solmove_core::types::MoveType;
use solmove_core::VarRepr;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A function body lowered to Move, before it is given a shape.
struct Lowered {
    params: Vec<MoveParam>,
    returns: Vec<MoveType>,
    body: MoveBlock,
}

pub struct FunctionTransformer<'c, 'a> {
    info: &'c ContractInfo<'a>,
    parts: &'c mut ModuleParts,
}

impl<'c, 'a> FunctionTransformer<'c, 'a> {
    pub fn new(info: &'c ContractInfo<'a>, parts: &'c mut ModuleParts) -> Self {
        Self { info, parts }
    }

    /// The initializer followed by every function of the contract, in declaration order.
    pub fn transform_all(&mut self) -> Result<Vec<MoveFunction>> {
        let mut out = Vec::new();
        if let Some(init) = self.initializer()? {
            out.push(init);
        }
        let contract = self.info.contract;
        for function in contract.functions.iter().filter(|f| !f.is_initializer()) {
            out.extend(self.transform(function)?);
        }
        Ok(out)
    }

    pub fn transform(&mut self, function: &IRFunction) -> Result<Vec<MoveFunction>> {
        if !function.has_body {
            debug!(function = %function.name, "skipping function without a body");
            return Ok(Vec::new());
        }
        if matches!(function.kind, FunctionKind::Fallback | FunctionKind::Receive) {
            self.note(format!(
                "{:?} function of {} has no Move counterpart and was dropped",
                function.kind, self.info.contract.name
            ));
            return Ok(Vec::new());
        }
        let signature = self
            .info
            .signatures
            .get(&function.ident)
            .cloned()
            .ok_or_else(|| TranspileError::SymbolNotFound(function.ident.clone()))?;
        let body = self.inline_modifiers(function)?;

        let mut functions = match (signature.shape, signature.inner.clone()) {
            (Shape::Library, _) => vec![self.library(function, &signature, &body)?],
            (Shape::Internal, _) => {
                vec![self.internal(function, &signature, &signature.name, &body)?]
            }
            (Shape::Entry | Shape::View, Some(inner)) => {
                let inner_fn = self.internal(function, &signature, &inner, &body)?;
                vec![self.wrapper(function, &signature, &inner)?, inner_fn]
            }
            (Shape::Entry, None) => vec![self.entry(function, &signature, &body)?],
            (Shape::View, None) => vec![self.view(function, &signature, &body)?],
        };
        if self.info.config.source_comments {
            if let Some(first) = functions.first_mut() {
                first.doc.push(format!(
                    "{}:{}",
                    self.info.contract.source_file, function.line
                ));
            }
        }
        Ok(functions)
    }

    fn inline_modifiers(&mut self, function: &IRFunction) -> Result<Vec<Stmt>> {
        let mut inliner = ModifierInliner::new(self.info.contract);
        let body = inliner
            .inline(function)
            .map_err(|e| TranspileError::UnsupportedFeature(e.0))?;
        for note in inliner.take_notes() {
            self.note(note);
        }
        Ok(body)
    }

    fn note(&mut self, message: String) {
        warn!(contract = %self.info.contract.name, "{}", message);
        self.parts.warnings.push(message);
    }

    /// Lowers a body with `caller` and `groups` in scope. Parameters become the first locals.
    fn lower(
        &mut self,
        name: &str,
        params: &[IRParam],
        returns: &[IRReturn],
        caller: CallerAccess,
        groups: &[(String, bool)],
        body: &[Stmt],
    ) -> Result<Lowered> {
        let info = self.info;
        let mut ctx = TranspileContext::new(info, self.parts, name);
        ctx.caller = caller;
        ctx.returns = returns.iter().map(|r| r.ty.clone()).collect();
        for (group, mutable) in groups {
            ctx.bind_group(group, *mutable);
        }

        let params = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let local = ctx.declare(&param_name(p, i), Some(p.ty.clone()));
                MoveParam::new(local, info.move_type(&p.ty))
            })
            .collect();

        let mut stmts = Vec::new();
        if returns.iter().any(|r| r.name.is_some()) {
            for ret in returns {
                let local = match &ret.name {
                    Some(n) => ctx.declare(n, Some(ret.ty.clone())),
                    None => ctx.fresh("ret"),
                };
                stmts.push(MoveStmt::let_(
                    local.clone(),
                    Some(info.move_type(&ret.ty)),
                    info.default_value(&ret.ty),
                ));
                ctx.named_returns.push(local);
            }
        }
        stmts.extend(ctx.block(body)?);
        let fallthrough = ctx.named_result();

        Ok(Lowered {
            params,
            returns: returns.iter().map(|r| info.move_type(&r.ty)).collect(),
            body: finish(stmts, fallthrough),
        })
    }

    fn borrows(&self, groups: &[(String, bool)]) -> Vec<MoveStmt> {
        groups
            .iter()
            .map(|(group, mutable)| {
                MoveStmt::let_(
                    ContractInfo::group_local(group),
                    None,
                    MoveExpr::borrow_global(group.clone(), self.info.module_address(), *mutable),
                )
            })
            .collect()
    }

    fn entry(&mut self, function: &IRFunction, sig: &Signature, body: &[Stmt]) -> Result<MoveFunction> {
        let lowered = self.lower(
            &function.name,
            &function.params,
            &function.returns,
            CallerAccess::signer(SIGNER_PARAM),
            &sig.groups,
            body,
        )?;
        let mut f = MoveFunction::new(sig.name.clone(), FunVisibility::Public);
        f.is_entry = true;
        f.params = vec![signer_param(SIGNER_PARAM)];
        f.params.extend(lowered.params);
        f.body = prepend(self.borrows(&sig.groups), lowered.body);
        Ok(f)
    }

    fn view(&mut self, function: &IRFunction, sig: &Signature, body: &[Stmt]) -> Result<MoveFunction> {
        let caller = self.view_caller(function, sig);
        let mut f = MoveFunction::new(sig.name.clone(), FunVisibility::Public);
        if let Some(sender) = &caller.sender {
            f.params.push(MoveParam::new(sender.clone(), MoveType::Address));
        }
        let lowered = self.lower(
            &function.name,
            &function.params,
            &function.returns,
            caller,
            &sig.groups,
            body,
        )?;
        f.params.extend(lowered.params);
        f.returns = lowered.returns;
        f.body = prepend(self.borrows(&sig.groups), lowered.body);
        self.mark_view(&mut f);
        Ok(f)
    }

    fn view_caller(&mut self, function: &IRFunction, sig: &Signature) -> CallerAccess {
        match sig.caller {
            CallerNeed::None => CallerAccess::default(),
            CallerNeed::Address => CallerAccess::sender(SENDER_PARAM),
            CallerNeed::Signer => {
                self.note(format!(
                    "view function {} needs the transaction signer, which views never receive",
                    function.name
                ));
                CallerAccess::sender(SENDER_PARAM)
            }
        }
    }

    fn mark_view(&self, f: &mut MoveFunction) {
        match self.info.config.view_style {
            ViewStyle::Attribute => f.attributes.push("view".to_string()),
            ViewStyle::Comment => f.doc.push("view".to_string()),
            ViewStyle::None => {}
        }
    }

    /// Private function handed its caller and resources by the call site.
    fn internal(
        &mut self,
        function: &IRFunction,
        sig: &Signature,
        name: &str,
        body: &[Stmt],
    ) -> Result<MoveFunction> {
        let mut f = MoveFunction::new(name, FunVisibility::Private);
        let caller = match sig.caller {
            CallerNeed::None => CallerAccess::default(),
            CallerNeed::Address => {
                f.params.push(MoveParam::new(SENDER_PARAM, MoveType::Address));
                CallerAccess::sender(SENDER_PARAM)
            }
            CallerNeed::Signer => {
                f.params.push(signer_param(SIGNER_PARAM));
                CallerAccess::signer(SIGNER_PARAM)
            }
        };
        for (group, mutable) in &sig.groups {
            f.params.push(MoveParam::new(
                ContractInfo::group_local(group),
                MoveType::reference(MoveType::local_struct(group.clone()), *mutable),
            ));
        }
        let lowered = self.lower(
            &function.name,
            &function.params,
            &function.returns,
            caller,
            &sig.groups,
            body,
        )?;
        f.params.extend(lowered.params);
        f.returns = lowered.returns;
        f.body = lowered.body;
        Ok(f)
    }

    /// Public face of a split function: borrows the resources and forwards to the body.
    fn wrapper(&mut self, function: &IRFunction, sig: &Signature, inner: &str) -> Result<MoveFunction> {
        let mut f = MoveFunction::new(sig.name.clone(), FunVisibility::Public);
        let mut args = Vec::new();
        match sig.shape {
            Shape::Entry => {
                f.is_entry = true;
                f.params.push(signer_param(SIGNER_PARAM));
                match sig.caller {
                    CallerNeed::None => {}
                    CallerNeed::Address => args.push(MoveExpr::typed(
                        call_kind("signer", "address_of", vec![MoveExpr::var(SIGNER_PARAM)]),
                        MoveType::Address,
                    )),
                    CallerNeed::Signer => args.push(MoveExpr::var(SIGNER_PARAM)),
                }
            }
            _ => {
                if sig.caller == CallerNeed::Signer {
                    return Err(TranspileError::UnsupportedFeature(format!(
                        "view function {} calls code that needs the transaction signer",
                        function.name
                    )));
                }
                if sig.caller == CallerNeed::Address {
                    f.params.push(MoveParam::new(SENDER_PARAM, MoveType::Address));
                    args.push(MoveExpr::var(SENDER_PARAM));
                }
                self.mark_view(&mut f);
            }
        }
        for (group, _) in &sig.groups {
            args.push(MoveExpr::var(ContractInfo::group_local(group)));
        }
        for (i, param) in function.params.iter().enumerate() {
            let name = self.info.local_name(&param_name(param, i));
            args.push(MoveExpr::var(name.clone()));
            f.params.push(MoveParam::new(name, self.info.move_type(&param.ty)));
        }

        let returns: Vec<MoveType> = function
            .returns
            .iter()
            .map(|r| self.info.move_type(&r.ty))
            .collect();
        let call = MoveExpr::typed(
            ExprKind::Call {
                module: None,
                name: inner.to_string(),
                type_args: Vec::new(),
                args,
            },
            match returns.as_slice() {
                [] => MoveType::Unit,
                [single] => single.clone(),
                many => MoveType::Tuple(many.to_vec()),
            },
        );
        let mut stmts = self.borrows(&sig.groups);
        f.body = match (sig.shape, returns.len()) {
            (Shape::View, 0) | (Shape::Entry, 0) => {
                stmts.push(MoveStmt::Expr(call));
                MoveBlock::new(stmts)
            }
            (Shape::Entry, n) => {
                stmts.push(MoveStmt::Let {
                    pattern: vec!["_".to_string(); n],
                    ty: None,
                    value: Some(call),
                });
                MoveBlock::new(stmts)
            }
            _ => {
                f.returns = returns;
                MoveBlock::with_result(stmts, call)
            }
        };
        Ok(f)
    }

    fn library(&mut self, function: &IRFunction, sig: &Signature, body: &[Stmt]) -> Result<MoveFunction> {
        let lowered = self.lower(
            &function.name,
            &function.params,
            &function.returns,
            CallerAccess::default(),
            &[],
            body,
        )?;
        let visibility = if sig.public {
            FunVisibility::Public
        } else {
            FunVisibility::Private
        };
        let mut f = MoveFunction::new(sig.name.clone(), visibility);
        f.params = lowered.params;
        f.returns = lowered.returns;
        f.body = lowered.body;
        Ok(f)
    }

    /// Publishes the shared resources under the module address and runs the constructor.
    ///
    /// A parameterless constructor becomes `init_module`, which the chain runs on publish.
    /// Otherwise the module gets an `initialize` entry only the deployer may call, once.
    pub fn initializer(&mut self) -> Result<Option<MoveFunction>> {
        let info = self.info;
        if info.is_library() {
            return Ok(None);
        }
        let constructor = info.contract.initializer.as_ref();
        let shared: Vec<_> = info.plan.shared_groups().cloned().collect();
        if shared.is_empty() && constructor.map_or(true, |c| c.body.is_empty()) {
            return Ok(None);
        }

        let mut body = Vec::new();
        let mut packs = Vec::new();
        let mut initialized: Vec<&str> = Vec::new();
        for group in &shared {
            let mut fields = Vec::new();
            for variable in &group.variables {
                let Some(state) = info.state_var(variable) else {
                    continue;
                };
                let value = match info.plan.repr_of(variable) {
                    VarRepr::Aggregator { element } => {
                        if let Some(init) = &state.initializer {
                            body.push(Stmt::expr(Expr::assign(Expr::ident(variable), init.clone())));
                            initialized.push(&group.name);
                        }
                        new_aggregator(&state.ty, element)
                    }
                    _ => match &state.initializer {
                        Some(init) => match fold_constant(info, init, &state.ty) {
                            Some(folded) => folded,
                            None => {
                                body.push(Stmt::expr(Expr::assign(
                                    Expr::ident(variable),
                                    init.clone(),
                                )));
                                initialized.push(&group.name);
                                info.default_value(&state.ty)
                            }
                        },
                        None => info.default_value(&state.ty),
                    },
                };
                fields.push((move_identifier(variable), value));
            }
            packs.push(MoveStmt::Expr(MoveExpr::call(
                None,
                "move_to",
                vec![
                    MoveExpr::var(DEPLOYER_PARAM),
                    ExprKind::Pack {
                        name: group.name.clone(),
                        fields,
                    }
                    .into(),
                ],
            )));
        }

        let mut needed: BTreeMap<String, bool> = info
            .plan
            .borrowed_groups(INITIALIZER)
            .into_iter()
            .collect();
        for group in initialized {
            needed.insert(group.to_string(), true);
        }
        let groups: Vec<(String, bool)> = shared
            .iter()
            .filter_map(|g| needed.get(&g.name).map(|m| (g.name.clone(), *m)))
            .collect();

        let params: &[IRParam] = constructor.map(|c| c.params.as_slice()).unwrap_or_default();
        if let Some(constructor) = constructor {
            body.extend(self.inline_modifiers(constructor)?);
        }

        let parameterless = params.is_empty();
        let name = if parameterless { "init_module" } else { "initialize" };
        let mut f = MoveFunction::new(
            name,
            if parameterless {
                FunVisibility::Private
            } else {
                FunVisibility::Public
            },
        );
        f.is_entry = !parameterless;
        f.params.push(signer_param(DEPLOYER_PARAM));

        let mut stmts = if parameterless {
            Vec::new()
        } else {
            self.deploy_guards(shared.first().map(|g| g.name.as_str()))
        };
        stmts.extend(packs);
        stmts.extend(self.borrows(&groups));

        let lowered = self.lower(
            name,
            params,
            &[],
            CallerAccess::signer(DEPLOYER_PARAM),
            &groups,
            &body,
        )?;
        f.params.extend(lowered.params);
        f.body = prepend(stmts, lowered.body);
        if info.config.source_comments {
            if let Some(constructor) = constructor {
                f.doc.push(format!("{}:{}", info.contract.source_file, constructor.line));
            }
        }
        Ok(Some(f))
    }

    /// Only the publishing account may initialize, and only once.
    fn deploy_guards(&mut self, first_group: Option<&str>) -> Vec<MoveStmt> {
        let mut ctx = TranspileContext::new(self.info, self.parts, "initialize");
        let deployer = MoveExpr::typed(
            call_kind("signer", "address_of", vec![MoveExpr::var(DEPLOYER_PARAM)]),
            MoveType::Address,
        );
        let code = ctx.abort_code(Builtin::NotDeployer);
        let mut stmts = vec![ctx.guard(
            MoveExpr::binary(MoveBinOp::Eq, deployer, ctx.info.module_address()),
            code,
        )];
        if let Some(group) = first_group {
            let exists = MoveExpr::typed(
                ExprKind::Call {
                    module: None,
                    name: "exists".to_string(),
                    type_args: vec![MoveType::local_struct(group.to_string())],
                    args: vec![ctx.info.module_address()],
                },
                MoveType::Bool,
            );
            let code = ctx.abort_code(Builtin::AlreadyInitialized);
            stmts.push(ctx.guard(MoveExpr::not(exists), code));
        }
        stmts
    }
}

fn signer_param(name: &str) -> MoveParam {
    MoveParam::new(name, MoveType::reference(MoveType::Signer, false))
}

fn param_name(param: &IRParam, index: usize) -> String {
    if param.name.is_empty() {
        format!("_arg{}", index)
    } else {
        param.name.clone()
    }
}

fn prepend(mut stmts: Vec<MoveStmt>, body: MoveBlock) -> MoveBlock {
    stmts.extend(body.stmts);
    MoveBlock {
        stmts,
        result: body.result,
    }
}

/// An aggregator for a counter of type `ty`. Counters narrower than the element keep their own
/// overflow bound, so `add` aborts where the Solidity arithmetic would.
fn new_aggregator(ty: &IRType, element: &MoveType) -> MoveExpr {
    match (ty.width(), element.integer_width()) {
        (Some(width), Some(bound)) if width < bound => MoveExpr::call_generic(
            Some("aggregator_v2"),
            "create_aggregator",
            vec![element.clone()],
            vec![MoveExpr::int_suffixed(unsigned_max(width), element.clone())],
        ),
        _ => MoveExpr::call_generic(
            Some("aggregator_v2"),
            "create_unbounded_aggregator",
            vec![element.clone()],
            Vec::new(),
        ),
    }
}

/// Turns a trailing `return` into the block result and supplies the fall-through value.
fn finish(mut stmts: Vec<MoveStmt>, fallthrough: Option<MoveExpr>) -> MoveBlock {
    match stmts.pop() {
        Some(MoveStmt::Return(Some(value))) => return MoveBlock::with_result(stmts, value),
        Some(MoveStmt::Return(None)) => return MoveBlock::new(stmts),
        Some(last) => stmts.push(last),
        None => {}
    }
    match fallthrough {
        Some(value) if !stmts.last().is_some_and(MoveStmt::diverges) => {
            MoveBlock::with_result(stmts, value)
        }
        _ => MoveBlock::new(stmts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trailing_return_becomes_result() {
        let block = finish(
            vec![
                MoveStmt::let_("x", None, MoveExpr::int(1u32)),
                MoveStmt::Return(Some(MoveExpr::var("x"))),
            ],
            None,
        );
        assert_eq!(block.stmts.len(), 1);
        assert_eq!(block.result.as_deref().and_then(|r| r.as_var()), Some("x"));
    }

    #[test]
    fn test_fallthrough_is_skipped_after_abort() {
        let block = finish(
            vec![MoveStmt::Abort(MoveExpr::int(1u32))],
            Some(MoveExpr::int(0u32)),
        );
        assert!(block.result.is_none());

        let block = finish(Vec::new(), Some(MoveExpr::int(0u32)));
        assert!(block.result.is_some());
    }

    #[test]
    fn test_narrow_counters_keep_their_bound() {
        let bounded = new_aggregator(&IRType::uint(8), &MoveType::u64());
        let ExprKind::Call { name, args, .. } = &bounded.kind else {
            panic!("expected call, got {:?}", bounded);
        };
        assert_eq!(name, "create_aggregator");
        assert_eq!(args, &vec![MoveExpr::int_suffixed(255u32, MoveType::u64())]);

        let unbounded = new_aggregator(&IRType::uint(64), &MoveType::u64());
        assert!(matches!(
            &unbounded.kind,
            ExprKind::Call { name, args, .. } if name == "create_unbounded_aggregator" && args.is_empty()
        ));
    }

    #[test]
    fn test_unnamed_parameters_get_positional_names() {
        let param = IRParam {
            name: String::new(),
            ty: solmove_core::ir::IRType::uint(256),
        };
        assert_eq!(param_name(&param, 2), "_arg2");
    }
}
