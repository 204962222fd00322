use super::helpers::HelperSet;
use super::signature::Signatures;
use crate::config::{StringRepr, TranspileConfig};
use crate::error_codes::{Builtin, ErrorTable};
use crate::errors::{Result, TranspileError};
use crate::ir_builder::{ContractScope, SymbolTable};
use solmove_core::ir::{IRContract, IRStateVariable, IRType, IRTypeKind};
use solmove_core::move_ast::{ExprKind, MoveExpr, MoveStmt};
use solmove_core::naming::{module_name, move_identifier};
use solmove_core::source::{Expr, SourceType};
use solmove_core::type_mapper::TypeMapper;
use solmove_core::types::MoveType;
use solmove_core::ResourcePlan;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Parameter names the generated code claims for itself.
pub(crate) const SIGNER_PARAM: &str = "account";
pub(crate) const SENDER_PARAM: &str = "sender";
pub(crate) const DEPLOYER_PARAM: &str = "deployer";

/// Everything about the contract that stays fixed while its functions are rewritten.
pub struct ContractInfo<'a> {
    pub contract: &'a IRContract,
    pub plan: &'a ResourcePlan,
    pub config: &'a TranspileConfig,
    pub symbols: &'a SymbolTable<'a>,
    pub signatures: Signatures,
    reserved: BTreeSet<String>,
}

impl<'a> ContractInfo<'a> {
    pub fn new(
        contract: &'a IRContract,
        plan: &'a ResourcePlan,
        config: &'a TranspileConfig,
        symbols: &'a SymbolTable<'a>,
    ) -> Self {
        let mut reserved: BTreeSet<String> = [SIGNER_PARAM, SENDER_PARAM, DEPLOYER_PARAM]
            .iter()
            .map(|s| s.to_string())
            .collect();
        reserved.extend(plan.groups.iter().map(|g| move_identifier(&g.name)));
        Self {
            contract,
            plan,
            config,
            symbols,
            signatures: Signatures::default(),
            reserved,
        }
    }

    pub fn is_library(&self) -> bool {
        self.contract.is_library()
    }

    pub fn module_address(&self) -> MoveExpr {
        MoveExpr::address(self.config.module_address.clone())
    }

    /// Move name for a Solidity local or parameter, renamed away from generated names.
    pub fn local_name(&self, name: &str) -> String {
        let ident = move_identifier(name);
        if self.reserved.contains(&ident) {
            format!("{}_", ident)
        } else {
            ident
        }
    }

    pub fn group_local(group: &str) -> String {
        move_identifier(group)
    }

    pub fn library_module(name: &str) -> String {
        module_name(name.rsplit('.').next().unwrap_or(name))
    }

    pub fn state_var(&self, name: &str) -> Option<&'a IRStateVariable> {
        self.contract.state_var(name)
    }

    pub fn map_type(&self, ty: &SourceType) -> Result<IRType> {
        let scope = ContractScope::new(
            self.contract.structs.iter().map(|s| s.name.clone()),
            self.contract.enums.iter().map(|e| e.name.clone()),
            self.symbols,
        );
        Ok(TypeMapper::map(ty, &scope)?)
    }

    /// Target type honouring the configured string representation.
    pub fn move_type(&self, ty: &IRType) -> MoveType {
        self.adjust(&ty.target)
    }

    pub fn adjust(&self, ty: &MoveType) -> MoveType {
        if self.config.string_repr == StringRepr::String {
            return ty.clone();
        }
        match ty {
            MoveType::String => MoveType::bytes(),
            MoveType::Vector(inner) => MoveType::Vector(Box::new(self.adjust(inner))),
            MoveType::Table(k, v) => {
                MoveType::Table(Box::new(self.adjust(k)), Box::new(self.adjust(v)))
            }
            MoveType::Tuple(items) => MoveType::Tuple(items.iter().map(|t| self.adjust(t)).collect()),
            other => other.clone(),
        }
    }

    /// The value a Solidity variable of type `ty` holds before its first assignment.
    pub fn default_value(&self, ty: &IRType) -> MoveExpr {
        let target = self.move_type(ty);
        match &ty.kind {
            IRTypeKind::Primitive { .. } | IRTypeKind::Enum(_) => MoveExpr::typed(
                ExprKind::Int {
                    value: 0u32.into(),
                    suffix: None,
                },
                target,
            ),
            IRTypeKind::Bool => MoveExpr::bool(false),
            IRTypeKind::Address | IRTypeKind::Contract(_) => MoveExpr::address("0x0"),
            IRTypeKind::String => self.string_literal(""),
            IRTypeKind::Bytes { fixed: Some(n) } => MoveExpr::bytes(vec![0; *n as usize]),
            IRTypeKind::Bytes { fixed: None } => MoveExpr::typed(
                ExprKind::Vector {
                    elem_ty: Some(MoveType::u8()),
                    items: Vec::new(),
                },
                MoveType::bytes(),
            ),
            IRTypeKind::Array { element, length } => {
                let items = match length {
                    Some(n) => (0..*n).map(|_| self.default_value(element)).collect(),
                    None => Vec::new(),
                };
                MoveExpr::typed(
                    ExprKind::Vector {
                        elem_ty: Some(self.move_type(element)),
                        items,
                    },
                    target,
                )
            }
            IRTypeKind::Mapping { .. } => {
                MoveExpr::typed(call_kind("table", "new", Vec::new()), target)
            }
            IRTypeKind::Struct(name) => {
                let fields = self
                    .contract
                    .struct_def(name)
                    .map(|def| {
                        def.fields
                            .iter()
                            .map(|f| (move_identifier(&f.name), self.default_value(&f.ty)))
                            .collect()
                    })
                    .unwrap_or_default();
                MoveExpr::typed(
                    ExprKind::Pack {
                        name: name.clone(),
                        fields,
                    },
                    target,
                )
            }
        }
    }

    pub fn string_literal(&self, text: &str) -> MoveExpr {
        match self.config.string_repr {
            StringRepr::String => MoveExpr::typed(
                call_kind("string", "utf8", vec![MoveExpr::byte_string(text)]),
                MoveType::String,
            ),
            StringRepr::Bytes => MoveExpr::byte_string(text),
        }
    }

    /// Whether a struct of this name may carry `copy` and `drop`.
    pub fn struct_is_copyable(&self, name: &str) -> bool {
        self.contract
            .struct_def(name)
            .map(|def| def.fields.iter().all(|f| self.move_type(&f.ty).has_copy()))
            .unwrap_or(true)
    }
}

pub(crate) fn call_kind(module: &str, name: &str, args: Vec<MoveExpr>) -> ExprKind {
    ExprKind::Call {
        module: Some(module.to_string()),
        name: name.to_string(),
        type_args: Vec::new(),
        args,
    }
}

/// Accumulated across all functions of one module.
#[derive(Debug)]
pub struct ModuleParts {
    pub errors: ErrorTable,
    pub helpers: HelperSet,
    pub warnings: Vec<String>,
}

impl ModuleParts {
    pub fn new(config: &TranspileConfig) -> Self {
        Self {
            errors: ErrorTable::new(config.error_style),
            helpers: HelperSet::default(),
            warnings: Vec::new(),
        }
    }
}

/// How the function being rewritten reaches the transaction sender.
#[derive(Debug, Clone, Default)]
pub struct CallerAccess {
    /// Local holding `&signer`.
    pub signer: Option<String>,
    /// Local holding the sender address, when there is no signer.
    pub sender: Option<String>,
}

impl CallerAccess {
    pub fn signer(name: &str) -> Self {
        Self {
            signer: Some(name.to_string()),
            sender: None,
        }
    }

    pub fn sender(name: &str) -> Self {
        Self {
            signer: None,
            sender: Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Local {
    pub move_name: String,
    pub ty: Option<IRType>,
    /// `storage` locals name a storage path rather than hold a value.
    pub alias: Option<Expr>,
}

/// What a `continue` has to do before jumping back to the loop head.
#[derive(Debug, Clone)]
pub(crate) enum LoopExit {
    Plain,
    /// `for` loops run their update clause.
    Update(Expr),
    /// `do { } while (c)` loops re-check their condition.
    Recheck(Expr),
}

/// Per-function lowering state: scopes, borrowed resources, pending hoisted statements.
pub struct TranspileContext<'c, 'a> {
    pub info: &'c ContractInfo<'a>,
    pub parts: &'c mut ModuleParts,
    /// Solidity name of the function, for messages.
    pub function: String,
    pub caller: CallerAccess,
    pub returns: Vec<IRType>,
    /// Move names of named return variables.
    pub named_returns: Vec<String>,
    scopes: Vec<Vec<(String, Local)>>,
    groups: BTreeMap<String, bool>,
    prelude: Vec<MoveStmt>,
    /// Write-backs that run after the statement being lowered.
    deferred: Vec<MoveStmt>,
    next_temp: usize,
    loops: Vec<LoopExit>,
}

impl<'c, 'a> TranspileContext<'c, 'a> {
    pub fn new(info: &'c ContractInfo<'a>, parts: &'c mut ModuleParts, function: &str) -> Self {
        Self {
            info,
            parts,
            function: function.to_string(),
            caller: CallerAccess::default(),
            returns: Vec::new(),
            named_returns: Vec::new(),
            scopes: vec![Vec::new()],
            groups: BTreeMap::new(),
            prelude: Vec::new(),
            deferred: Vec::new(),
            next_temp: 0,
            loops: Vec::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declares a Solidity local and returns its Move name.
    pub fn declare(&mut self, name: &str, ty: Option<IRType>) -> String {
        self.bind(name, ty, None)
    }

    /// Declares a `storage` local that stands for `path`.
    pub fn declare_storage(&mut self, name: &str, ty: IRType, path: Expr) {
        self.bind(name, Some(ty), Some(path));
    }

    fn bind(&mut self, name: &str, ty: Option<IRType>, alias: Option<Expr>) -> String {
        let move_name = self.info.local_name(name);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((
                name.to_string(),
                Local {
                    move_name: move_name.clone(),
                    ty,
                    alias,
                },
            ));
        }
        move_name
    }

    pub(crate) fn storage_alias(&self, name: &str) -> Option<Expr> {
        self.local(name).and_then(|l| l.alias.clone())
    }

    pub fn local(&self, name: &str) -> Option<&Local> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().rev().find(|(n, _)| n == name).map(|(_, l)| l))
    }

    pub fn bind_group(&mut self, group: &str, mutable: bool) {
        self.groups.insert(group.to_string(), mutable);
    }

    /// The local holding the resource that stores `variable`.
    pub fn group_ref(&self, variable: &str) -> Result<MoveExpr> {
        let group = self.info.plan.group_of(variable).ok_or_else(|| {
            TranspileError::Plan(format!("{} is not assigned to any resource", variable))
        })?;
        if !self.groups.contains_key(&group.name) {
            return Err(TranspileError::Plan(format!(
                "{} touches {} without a borrow of {}",
                self.function, variable, group.name
            )));
        }
        Ok(MoveExpr::var(ContractInfo::group_local(&group.name)))
    }

    pub fn fresh(&mut self, stem: &str) -> String {
        self.next_temp += 1;
        format!("__{}{}", stem, self.next_temp)
    }

    pub fn hoist(&mut self, stmt: MoveStmt) {
        self.prelude.push(stmt);
    }

    pub fn take_prelude(&mut self) -> Vec<MoveStmt> {
        std::mem::take(&mut self.prelude)
    }

    pub fn has_prelude(&self) -> bool {
        !self.prelude.is_empty()
    }

    pub fn defer(&mut self, stmt: MoveStmt) {
        self.deferred.push(stmt);
    }

    pub fn take_deferred(&mut self) -> Vec<MoveStmt> {
        std::mem::take(&mut self.deferred)
    }

    pub(crate) fn enter_loop(&mut self, exit: LoopExit) {
        self.loops.push(exit);
    }

    pub(crate) fn exit_loop(&mut self) {
        self.loops.pop();
    }

    pub(crate) fn current_loop(&self) -> Option<&LoopExit> {
        self.loops.last()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(function = %self.function, "{}", message);
        self.parts.warnings.push(message);
    }

    /// A construct with no Move counterpart: an error in strict mode, an aborting stub otherwise.
    pub fn unsupported(&mut self, construct: &str) -> Result<MoveExpr> {
        if self.info.config.strict {
            return Err(TranspileError::UnsupportedFeature(format!(
                "{} in {}",
                construct, self.function
            )));
        }
        self.warn(format!(
            "{} in {} has no Move counterpart; it was replaced by an aborting stub",
            construct, self.function
        ));
        self.parts.errors.builtin(Builtin::Unsupported);
        Ok(MoveExpr::stub(construct))
    }

    pub fn abort_code(&mut self, builtin: Builtin) -> MoveExpr {
        let name = self.parts.errors.builtin(builtin);
        self.parts.errors.abort_value(&name)
    }

    /// Expression for `msg.sender`.
    pub fn sender(&mut self) -> Result<MoveExpr> {
        if let Some(signer) = &self.caller.signer {
            return Ok(MoveExpr::typed(
                call_kind("signer", "address_of", vec![MoveExpr::var(signer.clone())]),
                MoveType::Address,
            ));
        }
        if let Some(sender) = &self.caller.sender {
            return Ok(MoveExpr::var(sender.clone()));
        }
        self.unsupported("msg.sender outside a transaction context")
    }

    pub fn signer(&self) -> Option<MoveExpr> {
        self.caller.signer.as_ref().map(MoveExpr::var)
    }

    /// Best-effort Solidity type of an expression, used where Move needs it spelled out.
    pub fn ir_type_of(&self, expr: &Expr) -> Option<IRType> {
        match expr {
            Expr::Ident(name) => self
                .local(name)
                .and_then(|l| l.ty.clone())
                .or_else(|| self.info.state_var(name).map(|v| v.ty.clone()))
                .or_else(|| self.info.contract.constant(name).map(|c| c.ty.clone())),
            Expr::Bool(_) => Some(IRType::bool()),
            Expr::Str(_) => Some(IRType::new("string", MoveType::String, IRTypeKind::String)),
            Expr::Index {
                base,
                index: Some(_),
            } => {
                let base = self.ir_type_of(base)?;
                match &base.kind {
                    IRTypeKind::Mapping { value, .. } => Some((**value).clone()),
                    IRTypeKind::Array { element, .. } => Some((**element).clone()),
                    IRTypeKind::Bytes { .. } => Some(IRType::uint(8)),
                    _ => None,
                }
            }
            Expr::Member { object, member } => {
                if expr.is_msg_sender() {
                    return Some(IRType::address());
                }
                if let Expr::Ident(owner) = object.as_ref() {
                    if self.local(owner).is_none() && self.info.state_var(owner).is_none() {
                        if let Some(def) = self.info.contract.enum_def(owner) {
                            return Some(IRType::new(
                                def.name.clone(),
                                MoveType::u8(),
                                IRTypeKind::Enum(def.name.clone()),
                            ));
                        }
                        if owner == "block" || owner == "tx" || owner == "msg" {
                            return match member.as_str() {
                                "origin" | "coinbase" => Some(IRType::address()),
                                _ => Some(IRType::uint(256)),
                            };
                        }
                    }
                }
                if member == "length" {
                    return Some(IRType::uint(256));
                }
                let object = self.ir_type_of(object)?;
                match &object.kind {
                    IRTypeKind::Struct(name) => self
                        .info
                        .contract
                        .struct_def(name)?
                        .fields
                        .iter()
                        .find(|f| &f.name == member)
                        .map(|f| f.ty.clone()),
                    IRTypeKind::Address | IRTypeKind::Contract(_) if member == "balance" => {
                        Some(IRType::uint(256))
                    }
                    _ => None,
                }
            }
            Expr::Call { callee, args, .. } => match callee.as_ref() {
                Expr::Ident(name) => {
                    if let Some(f) = self.info.contract.resolve_call(name, args.len()) {
                        return f.returns.first().map(|r| r.ty.clone());
                    }
                    if self.info.contract.struct_def(name).is_some() {
                        return Some(IRType::new(
                            name.clone(),
                            MoveType::local_struct(name.clone()),
                            IRTypeKind::Struct(name.clone()),
                        ));
                    }
                    None
                }
                Expr::ElementaryType(ty) => self.info.map_type(ty).ok(),
                _ => None,
            },
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    Some(IRType::bool())
                } else {
                    self.ir_type_of(lhs).or_else(|| self.ir_type_of(rhs))
                }
            }
            Expr::Unary { operand, .. } => self.ir_type_of(operand),
            Expr::Ternary { then, otherwise, .. } => {
                self.ir_type_of(then).or_else(|| self.ir_type_of(otherwise))
            }
            Expr::Assign { target, .. } => self.ir_type_of(target),
            _ => None,
        }
    }
}
