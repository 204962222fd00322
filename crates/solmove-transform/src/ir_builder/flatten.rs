use super::getters::synthesize_getters;
use super::symbols::{last_segment, ContractScope, SymbolTable};
use crate::errors::{Result, TranspileError, Warning};
use indexmap::IndexMap;
use solmove_core::ir::{
    IRConstant, IRContract, IREnum, IRError, IREvent, IRFunction, IRModifier, IRParam, IRReturn,
    IRStateVariable, IRStruct, IRType,
};
use solmove_core::source::{
    EnumDecl, Expr, FunctionDecl, FunctionKind, LocalDecl, ModifierDecl, Mutability, Param,
    SourceContract, SourceType, Stmt, StructDecl, Visibility,
};
use solmove_core::type_mapper::{TypeMapper, TypeScope};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Flattens one contract's inheritance hierarchy into a single [`IRContract`].
///
/// Bases are linearized depth-first in declaration order with the contract itself first; the
/// first definition seen for a member wins. Function bodies come out with `super` calls bound to
/// private helpers, named arguments reordered, and `storage` aliases replaced by the state path
/// they point at.
pub struct IrBuilder<'a, 'u> {
    symbols: &'a SymbolTable<'u>,
    warnings: Vec<Warning>,
    contract: String,
}

impl<'a, 'u> IrBuilder<'a, 'u> {
    pub fn new(symbols: &'a SymbolTable<'u>) -> Self {
        Self {
            symbols,
            warnings: Vec::new(),
            contract: String::new(),
        }
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn warn(&mut self, message: impl Into<String>) {
        let contract = self.contract.clone();
        self.warnings.push(Warning::new(Some(&contract), message));
    }

    pub fn build(&mut self, contract: &'u SourceContract) -> Result<IRContract> {
        self.contract = contract.name.clone();
        let lin = self.linearize(contract);
        debug!(
            contract = %contract.name,
            linearization = ?lin.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "flattening"
        );

        let mut ir = IRContract::new(&contract.name, contract.kind);
        ir.is_abstract = contract.is_abstract;
        ir.bases = lin.iter().skip(1).map(|c| c.name.clone()).collect();
        ir.source_file = self
            .symbols
            .file_of(&contract.name)
            .unwrap_or_default()
            .to_string();

        let (structs, enums) = self.collect_types(&lin);
        let scope = ContractScope::new(structs.keys().cloned(), enums.keys().cloned(), self.symbols);

        for def in structs.values() {
            ir.structs.push(IRStruct {
                name: def.name.clone(),
                fields: map_params(&def.fields, &scope)?,
            });
        }
        for def in enums.values() {
            ir.enums.push(IREnum {
                name: def.name.clone(),
                variants: def.variants.clone(),
            });
        }

        self.collect_declarations(&lin, &scope, &mut ir)?;
        self.collect_state(&lin, &scope, &mut ir)?;

        let mut functions = self.collect_functions(&lin);
        let helpers = self.bind_super_calls(&lin, &mut functions);
        functions.extend(helpers);
        for (decl, origin) in &functions {
            ir.functions.push(lower_function(decl, origin, &scope)?);
        }
        assign_overload_idents(&mut ir.functions);

        ir.initializer = self.initializer(contract, &lin, &scope)?;

        let getters = synthesize_getters(&ir);
        ir.functions.extend(getters);

        self.normalize_bodies(&mut ir);
        self.import_file_constants(&mut ir, &scope)?;
        Ok(ir)
    }

    /// Depth-first, declaration order, self first. A base reached twice keeps its first
    /// position and raises a warning.
    fn linearize(&mut self, contract: &'u SourceContract) -> Vec<&'u SourceContract> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![contract];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.name.clone()) {
                self.warn(format!(
                    "{} is inherited through more than one path; its first position in the \
                     depth-first order is used",
                    current.name
                ));
                continue;
            }
            order.push(current);
            for base in current.bases.iter().rev() {
                match self.symbols.contract(&base.name) {
                    Some(found) => stack.push(found),
                    None => self.warn(format!(
                        "base contract {} of {} was not found; its members are skipped",
                        base.name, current.name
                    )),
                }
            }
        }
        order
    }

    /// True when `derived` has `base` anywhere among its ancestors.
    fn inherits(&self, derived: &str, base: &str) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![derived.to_string()];
        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(contract) = self.symbols.contract(&name) else {
                continue;
            };
            for spec in &contract.bases {
                if last_segment(&spec.name) == base {
                    return true;
                }
                stack.push(last_segment(&spec.name).to_string());
            }
        }
        false
    }

    /// Structs and enums of the hierarchy plus any referenced ones declared elsewhere.
    fn collect_types(
        &mut self,
        lin: &[&'u SourceContract],
    ) -> (IndexMap<String, StructDecl>, IndexMap<String, EnumDecl>) {
        let mut structs: IndexMap<String, StructDecl> = IndexMap::new();
        let mut enums: IndexMap<String, EnumDecl> = IndexMap::new();
        for contract in lin {
            for def in &contract.structs {
                structs.entry(def.name.clone()).or_insert_with(|| def.clone());
            }
            for def in &contract.enums {
                enums.entry(def.name.clone()).or_insert_with(|| def.clone());
            }
        }

        let mut pending: Vec<String> = Vec::new();
        for contract in lin {
            referenced_user_types(contract, &mut pending);
        }
        for def in structs.values() {
            for field in &def.fields {
                user_types(&field.ty, &mut pending);
            }
        }
        while let Some(name) = pending.pop() {
            let local = last_segment(&name).to_string();
            if structs.contains_key(&local) || enums.contains_key(&local) {
                continue;
            }
            if let Some(def) = self.symbols.struct_def(&name) {
                for field in &def.fields {
                    user_types(&field.ty, &mut pending);
                }
                structs.insert(local, def.clone());
            } else if let Some(def) = self.symbols.enum_def(&name) {
                enums.insert(local, def.clone());
            }
        }
        (structs, enums)
    }

    fn collect_declarations(
        &mut self,
        lin: &[&'u SourceContract],
        scope: &dyn TypeScope,
        ir: &mut IRContract,
    ) -> Result<()> {
        for contract in lin {
            for event in &contract.events {
                if ir.event(&event.name).is_some() {
                    continue;
                }
                let mut fields = Vec::new();
                for (i, param) in event.params.iter().enumerate() {
                    fields.push(IRParam {
                        name: param.name.clone().unwrap_or_else(|| format!("arg{}", i)),
                        ty: map_type(&param.ty, scope)?,
                    });
                }
                ir.events.push(IREvent {
                    name: event.name.clone(),
                    fields,
                });
            }
            for error in &contract.errors {
                if ir.errors.iter().any(|e| e.name == error.name) {
                    continue;
                }
                ir.errors.push(IRError {
                    name: error.name.clone(),
                    params: map_params(&error.params, scope)?,
                });
            }
            for modifier in &contract.modifiers {
                if ir.modifier(&modifier.name).is_some() {
                    continue;
                }
                ir.modifiers.push(lower_modifier(modifier, &contract.name, scope)?);
            }
            for using in &contract.using_for {
                if !ir.using_for.contains(using) {
                    ir.using_for.push(using.clone());
                }
            }
        }
        Ok(())
    }

    /// State variables first-wins over the linearization; `constant` ones become module
    /// constants. A name declared by two unrelated bases keeps the first and warns.
    fn collect_state(
        &mut self,
        lin: &[&'u SourceContract],
        scope: &dyn TypeScope,
        ir: &mut IRContract,
    ) -> Result<()> {
        for contract in lin {
            for var in &contract.state_vars {
                let existing = ir
                    .state_var(&var.name)
                    .map(|v| &v.origin)
                    .or_else(|| ir.constant(&var.name).map(|c| &c.origin));
                if let Some(existing) = existing {
                    if existing != &contract.name && !self.inherits(existing, &contract.name) {
                        let existing = existing.clone();
                        self.warn(format!(
                            "state variable {} is declared by both {} and {}; the declaration from {} is kept",
                            var.name, existing, contract.name, existing
                        ));
                    }
                    continue;
                }
                let ty = map_type(&var.ty, scope)?;
                if var.constant {
                    match &var.value {
                        Some(value) => ir.constants.push(IRConstant {
                            name: var.name.clone(),
                            ty,
                            value: value.clone(),
                            origin: contract.name.clone(),
                        }),
                        None => {
                            return Err(TranspileError::UnsupportedFeature(format!(
                                "constant {} has no value",
                                var.name
                            )))
                        }
                    }
                    continue;
                }
                ir.state_vars.push(IRStateVariable {
                    name: var.name.clone(),
                    ty,
                    visibility: var.visibility,
                    constant: false,
                    immutable: var.immutable,
                    initializer: var.value.clone(),
                    origin: contract.name.clone(),
                    line: var.line,
                });
            }
        }
        Ok(())
    }

    /// Implemented functions keyed by name and arity. A derived definition silently overrides
    /// its ancestors'; two unrelated bases defining the same key keep the first and warn.
    fn collect_functions(&mut self, lin: &[&'u SourceContract]) -> Vec<(FunctionDecl, String)> {
        let mut chosen: IndexMap<(String, usize), (FunctionDecl, String)> = IndexMap::new();
        let mut entry_points = BTreeSet::new();
        for contract in lin {
            for function in &contract.functions {
                match function.kind {
                    FunctionKind::Constructor => continue,
                    FunctionKind::Fallback | FunctionKind::Receive => {
                        entry_points.insert(format!("{:?}", function.kind).to_lowercase());
                        continue;
                    }
                    FunctionKind::Function => {}
                }
                if function.body.is_none() {
                    continue;
                }
                let key = (function.name.clone(), function.params.len());
                if let Some((_, existing)) = chosen.get(&key) {
                    if existing != &contract.name && !self.inherits(existing, &contract.name) {
                        let existing = existing.clone();
                        self.warn(format!(
                            "{} is defined by both {} and {}; the definition from {} is kept",
                            function.name, existing, contract.name, existing
                        ));
                    }
                    continue;
                }
                chosen.insert(key, (function.clone(), contract.name.clone()));
            }
        }
        for kind in entry_points {
            self.warn(format!("{} function has no Move counterpart and is dropped", kind));
        }
        chosen.into_values().collect()
    }

    /// Rewrites `super.f(..)` to a call of a private copy of the next implementation of `f` up
    /// the linearization, named `f_<Base>`. Copies are themselves rewritten relative to their
    /// own position.
    fn bind_super_calls(
        &mut self,
        lin: &[&'u SourceContract],
        functions: &mut [(FunctionDecl, String)],
    ) -> Vec<(FunctionDecl, String)> {
        let mut helpers: IndexMap<String, (FunctionDecl, String)> = IndexMap::new();
        let mut queue: Vec<(FunctionDecl, String)> = Vec::new();

        for (decl, origin) in functions.iter_mut() {
            self.rewrite_super(decl, origin, lin, &mut helpers, &mut queue);
        }
        while let Some((mut decl, origin)) = queue.pop() {
            self.rewrite_super(&mut decl, &origin, lin, &mut helpers, &mut queue);
            helpers.insert(decl.name.clone(), (decl, origin));
        }
        helpers.into_values().collect()
    }

    fn rewrite_super(
        &mut self,
        decl: &mut FunctionDecl,
        origin: &str,
        lin: &[&'u SourceContract],
        helpers: &mut IndexMap<String, (FunctionDecl, String)>,
        queue: &mut Vec<(FunctionDecl, String)>,
    ) {
        let Some(body) = decl.body.as_mut() else {
            return;
        };
        let mut wanted: BTreeSet<(String, usize)> = BTreeSet::new();
        for stmt in body.iter() {
            stmt.walk_exprs(&mut |e| {
                e.walk(&mut |inner| {
                    if let Some((name, arity)) = super_call(inner) {
                        wanted.insert((name.to_string(), arity));
                    }
                })
            });
        }
        if wanted.is_empty() {
            return;
        }

        let start = lin
            .iter()
            .position(|c| c.name == origin)
            .map(|p| p + 1)
            .unwrap_or(lin.len());
        let mut targets: HashMap<(String, usize), Option<String>> = HashMap::new();
        for (name, arity) in wanted {
            let found = lin[start..].iter().find_map(|c| {
                c.functions
                    .iter()
                    .find(|f| f.name == name && f.params.len() == arity && f.body.is_some())
                    .map(|f| (*c, f))
            });
            let target = match found {
                Some((base, implementation)) => {
                    let ident = format!("{}_{}", name, base.name);
                    let pending = queue.iter().any(|(d, _)| d.name == ident);
                    if !helpers.contains_key(&ident) && !pending {
                        let mut copy = implementation.clone();
                        copy.name = ident.clone();
                        copy.visibility = Visibility::Private;
                        queue.push((copy, base.name.clone()));
                    }
                    Some(ident)
                }
                None => {
                    self.warn(format!(
                        "super.{} in {} has no implementation further up the hierarchy",
                        name, origin
                    ));
                    None
                }
            };
            targets.insert((name, arity), target);
        }

        for stmt in body.iter_mut() {
            stmt.walk_exprs_mut(&mut |e| {
                let Some((name, arity)) = super_call(e) else {
                    return;
                };
                let key = (name.to_string(), arity);
                match targets.get(&key) {
                    Some(Some(ident)) => {
                        if let Expr::Call { callee, .. } = e {
                            **callee = Expr::Ident(ident.clone());
                        }
                    }
                    _ => {
                        *e = Expr::Unsupported {
                            construct: "super call".to_string(),
                            text: format!("super.{}", key.0),
                        }
                    }
                }
            });
        }
    }

    /// Concatenates the hierarchy's constructors base-first. Each base body runs in its own
    /// block with its parameters bound to the arguments the derived side passed; parameters of
    /// bases that received no arguments are promoted to the initializer's own.
    fn initializer(
        &mut self,
        contract: &'u SourceContract,
        lin: &[&'u SourceContract],
        scope: &dyn TypeScope,
    ) -> Result<Option<IRFunction>> {
        let constructors: Vec<(&'u SourceContract, &'u FunctionDecl)> = lin
            .iter()
            .rev()
            .filter_map(|c| c.constructor().map(|f| (*c, f)))
            .collect();
        if constructors.is_empty() {
            return Ok(None);
        }

        let base_names: BTreeSet<&str> = lin.iter().skip(1).map(|c| c.name.as_str()).collect();
        let mut own_params = Vec::new();
        let mut promoted: Vec<IRParam> = Vec::new();
        let mut modifiers = Vec::new();
        let mut body = Vec::new();
        let mut mutability = Mutability::NonPayable;
        let mut line = 0;

        for (owner, ctor) in constructors {
            let ctor_body = ctor.body.clone().unwrap_or_default();
            let real_modifiers = ctor
                .modifiers
                .iter()
                .filter(|m| !base_names.contains(last_segment(&m.name)))
                .cloned();
            if owner.name == contract.name {
                own_params = map_params(&ctor.params, scope)?;
                modifiers.extend(real_modifiers);
                body.extend(ctor_body);
                mutability = ctor.mutability;
                line = ctor.line;
                continue;
            }

            let mut block = Vec::new();
            match self.base_arguments(&owner.name, lin) {
                Some(args) if args.len() == ctor.params.len() => {
                    for (param, arg) in ctor.params.iter().zip(args) {
                        let Some(name) = &param.name else {
                            continue;
                        };
                        block.push(Stmt::VarDecl {
                            decls: vec![Some(LocalDecl {
                                name: name.clone(),
                                ty: Some(param.ty.clone()),
                                storage: false,
                            })],
                            value: Some(arg),
                        });
                    }
                }
                other => {
                    if other.is_some() {
                        self.warn(format!(
                            "argument count for the {} constructor does not match; its \
                             parameters become initializer parameters",
                            owner.name
                        ));
                    }
                    for param in map_params(&ctor.params, scope)? {
                        if promoted.iter().any(|p| p.name == param.name) {
                            self.warn(format!(
                                "constructor parameter {} of {} collides with another promoted \
                                 parameter",
                                param.name, owner.name
                            ));
                            continue;
                        }
                        promoted.push(param);
                    }
                }
            }
            modifiers.extend(real_modifiers);
            block.extend(ctor_body);
            body.push(Stmt::Block(block));
        }

        for param in promoted {
            if own_params.iter().any(|p: &IRParam| p.name == param.name) {
                self.warn(format!(
                    "promoted constructor parameter {} shadows a parameter of {}",
                    param.name, contract.name
                ));
                continue;
            }
            own_params.push(param);
        }

        Ok(Some(IRFunction {
            name: "constructor".to_string(),
            ident: "constructor".to_string(),
            kind: FunctionKind::Constructor,
            visibility: Visibility::Public,
            mutability,
            params: own_params,
            returns: Vec::new(),
            modifiers,
            body,
            has_body: true,
            origin: contract.name.clone(),
            is_virtual: false,
            synthetic: false,
            line,
        }))
    }

    /// Arguments some contract in the hierarchy passes to `base`'s constructor, either in its
    /// inheritance list or as a constructor modifier.
    fn base_arguments(&self, base: &str, lin: &[&'u SourceContract]) -> Option<Vec<Expr>> {
        for contract in lin {
            if let Some(spec) = contract
                .bases
                .iter()
                .find(|b| last_segment(&b.name) == base && !b.args.is_empty())
            {
                return Some(spec.args.clone());
            }
            if let Some(invocation) = contract.constructor().and_then(|c| {
                c.modifiers
                    .iter()
                    .find(|m| last_segment(&m.name) == base)
            }) {
                return Some(invocation.args.clone());
            }
        }
        None
    }

    fn normalize_bodies(&mut self, ir: &mut IRContract) {
        let order = parameter_orders(ir, self.symbols);
        let state: BTreeSet<String> = ir.state_vars.iter().map(|v| v.name.clone()).collect();
        let mut notes = Vec::new();

        let normalize = |body: &mut Vec<Stmt>, notes: &mut Vec<String>| {
            for stmt in body.iter_mut() {
                stmt.walk_exprs_mut(&mut |e| reorder_named_args(e, &order));
            }
            inline_storage_aliases(body, &state, notes);
        };

        for function in ir.functions.iter_mut().chain(ir.initializer.iter_mut()) {
            normalize(&mut function.body, &mut notes);
        }
        for modifier in ir.modifiers.iter_mut() {
            normalize(&mut modifier.body, &mut notes);
        }
        for var in ir.state_vars.iter_mut() {
            if let Some(value) = var.initializer.as_mut() {
                value.walk_mut(&mut |e| reorder_named_args(e, &order));
            }
        }
        for note in notes {
            self.warn(note);
        }
    }

    /// File-level constants referenced anywhere in the contract become module constants.
    fn import_file_constants(&mut self, ir: &mut IRContract, scope: &dyn TypeScope) -> Result<()> {
        let mut referenced = BTreeSet::new();
        let mut collect = |e: &Expr| {
            e.walk(&mut |inner| {
                if let Expr::Ident(name) = inner {
                    referenced.insert(name.clone());
                }
            })
        };
        for function in ir.all_functions() {
            for stmt in &function.body {
                stmt.walk_exprs(&mut |e| collect(e));
            }
        }
        for modifier in &ir.modifiers {
            for stmt in &modifier.body {
                stmt.walk_exprs(&mut |e| collect(e));
            }
        }
        for var in &ir.state_vars {
            if let Some(value) = &var.initializer {
                collect(value);
            }
        }
        for constant in &ir.constants {
            collect(&constant.value);
        }

        for name in referenced {
            if ir.constant(&name).is_some() || ir.state_var(&name).is_some() {
                continue;
            }
            if let Some(decl) = self.symbols.constant(&name) {
                let Some(value) = decl.value.clone() else {
                    continue;
                };
                ir.constants.push(IRConstant {
                    name: decl.name.clone(),
                    ty: map_type(&decl.ty, scope)?,
                    value,
                    origin: String::new(),
                });
            }
        }
        Ok(())
    }
}

fn map_type(ty: &SourceType, scope: &dyn TypeScope) -> Result<IRType> {
    Ok(TypeMapper::map(ty, scope)?)
}

fn map_params(params: &[Param], scope: &dyn TypeScope) -> Result<Vec<IRParam>> {
    params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Ok(IRParam {
                name: p.name.clone().unwrap_or_else(|| format!("arg{}", i)),
                ty: map_type(&p.ty, scope)?,
            })
        })
        .collect()
}

fn lower_function(decl: &FunctionDecl, origin: &str, scope: &dyn TypeScope) -> Result<IRFunction> {
    let mut returns = Vec::new();
    for ret in &decl.returns {
        returns.push(IRReturn {
            name: ret.name.clone(),
            ty: map_type(&ret.ty, scope)?,
        });
    }
    Ok(IRFunction {
        name: decl.name.clone(),
        ident: decl.name.clone(),
        kind: decl.kind,
        visibility: decl.visibility,
        mutability: decl.mutability,
        params: map_params(&decl.params, scope)?,
        returns,
        modifiers: decl.modifiers.clone(),
        body: decl.body.clone().unwrap_or_default(),
        has_body: decl.body.is_some(),
        origin: origin.to_string(),
        is_virtual: decl.is_virtual,
        synthetic: false,
        line: decl.line,
    })
}

fn lower_modifier(decl: &ModifierDecl, origin: &str, scope: &dyn TypeScope) -> Result<IRModifier> {
    Ok(IRModifier {
        name: decl.name.clone(),
        params: map_params(&decl.params, scope)?,
        body: decl.body.clone(),
        origin: origin.to_string(),
    })
}

/// The first function with a given name keeps it; further overloads get an arity suffix.
fn assign_overload_idents(functions: &mut [IRFunction]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for function in functions.iter() {
        *counts.entry(function.name.clone()).or_default() += 1;
    }
    let mut seen = BTreeSet::new();
    for function in functions.iter_mut() {
        let overloaded = counts.get(&function.name).copied().unwrap_or(0) > 1;
        function.ident = if overloaded && !seen.insert(function.name.clone()) {
            format!("{}_{}", function.name, function.arity())
        } else {
            function.name.clone()
        };
    }
}

fn super_call(expr: &Expr) -> Option<(&str, usize)> {
    let Expr::Call { callee, args, .. } = expr else {
        return None;
    };
    match callee.as_ref() {
        Expr::Member { object, member } if matches!(object.as_ref(), Expr::Ident(o) if o == "super") => {
            Some((member.as_str(), args.len()))
        }
        _ => None,
    }
}

fn user_types(ty: &SourceType, out: &mut Vec<String>) {
    match ty {
        SourceType::UserDefined(name) => out.push(name.clone()),
        SourceType::Array(inner, _) => user_types(inner, out),
        SourceType::Mapping(key, value) => {
            user_types(key, out);
            user_types(value, out);
        }
        SourceType::Elementary(_) => {}
    }
}

fn referenced_user_types(contract: &SourceContract, out: &mut Vec<String>) {
    for var in &contract.state_vars {
        user_types(&var.ty, out);
    }
    for event in &contract.events {
        event.params.iter().for_each(|p| user_types(&p.ty, out));
    }
    for error in &contract.errors {
        error.params.iter().for_each(|p| user_types(&p.ty, out));
    }
    for modifier in &contract.modifiers {
        modifier.params.iter().for_each(|p| user_types(&p.ty, out));
    }
    for function in &contract.functions {
        function
            .params
            .iter()
            .chain(function.returns.iter())
            .for_each(|p| user_types(&p.ty, out));
        for stmt in function.body.iter().flatten() {
            stmt.walk(&mut |s| {
                if let Stmt::VarDecl { decls, .. } = s {
                    for decl in decls.iter().flatten() {
                        if let Some(ty) = &decl.ty {
                            user_types(ty, out);
                        }
                    }
                }
            });
        }
    }
}

/// Parameter names for everything a call can target by name: functions of the contract,
/// struct constructors, and library functions reached as `Lib.f`.
fn parameter_orders(ir: &IRContract, symbols: &SymbolTable) -> HashMap<(String, usize), Vec<String>> {
    let mut order = HashMap::new();
    for function in ir.all_functions() {
        order
            .entry((function.name.clone(), function.arity()))
            .or_insert_with(|| function.params.iter().map(|p| p.name.clone()).collect());
    }
    for def in &ir.structs {
        order
            .entry((def.name.clone(), def.fields.len()))
            .or_insert_with(|| def.fields.iter().map(|f| f.name.clone()).collect());
    }
    for using in &ir.using_for {
        if let Some(library) = symbols.contract(&using.library) {
            for function in &library.functions {
                let names: Vec<String> = function
                    .params
                    .iter()
                    .filter_map(|p| p.name.clone())
                    .collect();
                if names.len() == function.params.len() {
                    order
                        .entry((
                            format!("{}.{}", library.name, function.name),
                            function.params.len(),
                        ))
                        .or_insert(names);
                }
            }
        }
    }
    order
}

fn reorder_named_args(expr: &mut Expr, order: &HashMap<(String, usize), Vec<String>>) {
    let Expr::Call {
        callee, args, named, ..
    } = expr
    else {
        return;
    };
    if named.is_empty() {
        return;
    }
    let key = match callee.as_ref() {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, member } => match object.as_ref() {
            Expr::Ident(owner) => format!("{}.{}", owner, member),
            _ => member.clone(),
        },
        _ => return,
    };
    let Some(names) = order.get(&(key, named.len())) else {
        return;
    };
    let mut by_name: HashMap<String, Expr> = named.iter().cloned().collect();
    let mut positional = Vec::with_capacity(names.len());
    for name in names {
        match by_name.remove(name) {
            Some(value) => positional.push(value),
            None => return,
        }
    }
    args.extend(positional);
    named.clear();
}

/// `state.a[k].b` style paths: identifiers, member access and keyed indexing only.
fn is_storage_path(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) => true,
        Expr::Member { object, .. } => is_storage_path(object),
        Expr::Index {
            base,
            index: Some(_),
        } => is_storage_path(base),
        _ => false,
    }
}

/// Replaces `T storage x = <state path>;` aliases with the path itself in the rest of the
/// enclosing block. Other storage locals stay as value copies and are reported.
fn inline_storage_aliases(
    stmts: &mut Vec<Stmt>,
    state: &BTreeSet<String>,
    notes: &mut Vec<String>,
) {
    let mut aliases: HashMap<String, Expr> = HashMap::new();
    let mut out = Vec::with_capacity(stmts.len());
    for mut stmt in stmts.drain(..) {
        if !aliases.is_empty() {
            stmt.walk_exprs_mut(&mut |e| {
                if let Expr::Ident(name) = e {
                    if let Some(path) = aliases.get(name.as_str()) {
                        *e = path.clone();
                    }
                }
            });
        }
        if let Stmt::VarDecl {
            decls,
            value: Some(value),
        } = &stmt
        {
            if let [Some(decl)] = decls.as_slice() {
                if decl.storage {
                    let rooted = value
                        .root_ident()
                        .map(|root| state.contains(root))
                        .unwrap_or(false);
                    if rooted && is_storage_path(value) {
                        aliases.insert(decl.name.clone(), value.clone());
                        continue;
                    }
                    notes.push(format!(
                        "storage reference {} does not point at a state path; it is copied",
                        decl.name
                    ));
                }
            }
        }
        inline_nested(&mut stmt, state, notes);
        out.push(stmt);
    }
    *stmts = out;
}

fn inline_nested(stmt: &mut Stmt, state: &BTreeSet<String>, notes: &mut Vec<String>) {
    match stmt {
        Stmt::Block(body) | Stmt::Unchecked(body) => inline_storage_aliases(body, state, notes),
        Stmt::If {
            then, otherwise, ..
        } => {
            inline_nested(then, state, notes);
            if let Some(otherwise) = otherwise {
                inline_nested(otherwise, state, notes);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => {
            inline_nested(body, state, notes)
        }
        _ => {}
    }
}
